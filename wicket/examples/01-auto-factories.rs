use fxhash::FxHashMap;
use wicket::application::ApplicationBuilder;
use wicket::factory::AutoFactory;
use wicket::register_auto_factory;
use wicket::runner::{ApplicationRunner, ErrorPtr};
use wicket_di::instance_provider::InstancePtr;
use wicket_di::registry::{Binding, TypeKey};
use wicket_di::Injectable;

trait Connection: Send + Sync {
    fn url(&self) -> &str;
}

struct Pool {
    url: String,
}

impl Connection for Pool {
    fn url(&self) -> &str {
        &self.url
    }
}

// acquires a connection pool, but only if it's configured
#[derive(Injectable, Default)]
struct PoolFactory {
    #[inject("value='${db.url:}'")]
    url: String,
    pool: Option<InstancePtr<Pool>>,
}

impl AutoFactory for PoolFactory {
    fn name(&self) -> &str {
        "pool"
    }

    fn condition(&self) -> bool {
        !self.url.is_empty()
    }

    fn on_start(&mut self) -> Result<(), ErrorPtr> {
        println!("Connecting to {}", self.url);
        self.pool = Some(InstancePtr::new(Pool {
            url: self.url.clone(),
        }));
        Ok(())
    }

    fn on_stop(&mut self) -> Result<(), ErrorPtr> {
        println!("Disconnecting from {}", self.url);
        self.pool = None;
        Ok(())
    }

    fn typed(&self) -> FxHashMap<TypeKey, Binding> {
        self.pool
            .iter()
            .map(|pool| {
                (
                    TypeKey::of::<dyn Connection>(),
                    Binding::new(pool.clone() as InstancePtr<dyn Connection>),
                )
            })
            .collect()
    }
}

// factories registered this way are picked up by with_registered_factories()
register_auto_factory!(PoolFactory);

struct Cache {
    connection: Option<InstancePtr<dyn Connection>>,
}

// uses the pool if available, so it starts afterwards
#[derive(Injectable, Default)]
struct CacheFactory {
    #[inject("default='zero'")]
    connection: Option<InstancePtr<dyn Connection>>,
    cache: Option<InstancePtr<Cache>>,
}

impl AutoFactory for CacheFactory {
    fn name(&self) -> &str {
        "cache"
    }

    fn priority(&self) -> i32 {
        10
    }

    fn on_start(&mut self) -> Result<(), ErrorPtr> {
        self.cache = Some(InstancePtr::new(Cache {
            connection: self.connection.clone(),
        }));
        Ok(())
    }

    fn on_stop(&mut self) -> Result<(), ErrorPtr> {
        Ok(())
    }

    fn named(&self) -> FxHashMap<String, Binding> {
        self.cache
            .iter()
            .map(|cache| ("cache".to_string(), Binding::new(cache.clone())))
            .collect()
    }
}

register_auto_factory!(CacheFactory);

#[derive(Injectable, Default)]
struct Report {
    #[inject("name='cache'")]
    cache: Option<InstancePtr<Cache>>,
}

impl ApplicationRunner for Report {
    fn run(&self) -> Result<(), ErrorPtr> {
        let url = self
            .cache
            .as_ref()
            .and_then(|cache| cache.connection.as_ref())
            .map(|connection| connection.url())
            .unwrap_or("<no database>");
        println!("Cache backed by {url}");
        Ok(())
    }
}

// run with WICKET_DB_URL=postgres://localhost to start the pool factory
fn main() {
    let mut application = ApplicationBuilder::default()
        .with_registered_factories()
        .with_runner(Report::default())
        .with_shutdown_hook(|| {
            println!("Shutting down");
            Ok(())
        })
        .build()
        .expect("unable to create application");

    application.run().expect("error running application");
}
