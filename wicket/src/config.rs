//! Configuration consists of two parts: [ApplicationConfig], which configures the framework
//! itself, and [Environment], which is the default source of values for `${...}` placeholders in
//! injected fields.
//!
//! [ApplicationConfig] is created with opinionated default values, which can then be overwritten by
//! environment variables prefixed with `WICKET_` or the `wicket.json` file.
//!
//! [Environment] is loaded from the following sources, in ascending precedence:
//!
//! 1. `application.{yml,yaml,json,toml}` in the working directory,
//! 2. `config/application.{yml,yaml,json,toml}`,
//! 3. files listed in the `WICKET_CONFIG_FILES` variable (comma separated),
//! 4. environment variables named by [variable_name]: `WICKET_` followed by the upper-cased key
//!    with `.` and `-` replaced by `_`. E.g. `WICKET_SERVER_MAX_CONN` overrides both
//!    `server.max_conn` and `server.max-conn`. Variables are looked up when a key is read and empty
//!    ones are ignored.
//!
//! Values containing secrets can be kept encrypted by wrapping the environment in a
//! [DecipherEnvironment], which passes every resolved value through a [Decipher].

use config::{Config, ConfigError, Environment as EnvironmentSource, File};
#[cfg(test)]
use mockall::automock;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::env;
use std::fmt::{Debug, Formatter};
use tracing::{debug, error};
use wicket_di::component::Injectable;
use wicket_di::injector::ValueResolver;
use wicket_di::instance_provider::{ErrorPtr, InstancePtr};

const CONFIG_ENV_PREFIX: &str = "WICKET";

/// Name of the default framework config file.
pub const CONFIG_FILE: &str = "wicket.json";

/// Variable holding additional environment files.
pub const CONFIG_FILES_VARIABLE: &str = "WICKET_CONFIG_FILES";

/// Default environment files, without extensions.
pub const DEFAULT_ENVIRONMENT_FILES: [&str; 2] = ["application", "config/application"];

/// Name of the environment variable overriding given [Environment] key.
pub fn variable_name(key: &str) -> String {
    format!(
        "{CONFIG_ENV_PREFIX}_{}",
        key.to_uppercase().replace(['.', '-'], "_")
    )
}

fn variable(key: &str) -> Option<String> {
    env::var(variable_name(key))
        .ok()
        .filter(|value| !value.is_empty())
}

/// Framework configuration.
#[non_exhaustive]
#[derive(Clone, Debug)]
pub struct ApplicationConfig {
    /// Should a default tracing logger be installed in the scope of the application.
    pub install_tracing_logger: bool,
    /// Default log filter used when `RUST_LOG` is not set.
    pub log_level: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            install_tracing_logger: true,
            log_level: "info".to_string(),
        }
    }
}

impl From<OptionalApplicationConfig> for ApplicationConfig {
    fn from(value: OptionalApplicationConfig) -> Self {
        let default = Self::default();
        Self {
            install_tracing_logger: value
                .install_tracing_logger
                .unwrap_or(default.install_tracing_logger),
            log_level: value.log_level.unwrap_or(default.log_level),
        }
    }
}

impl ApplicationConfig {
    pub fn init_from_environment() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(EnvironmentSource::with_prefix(CONFIG_ENV_PREFIX))
            .build()
            .and_then(|config| config.try_deserialize::<OptionalApplicationConfig>())
            .map(|config| config.into())
    }
}

impl Injectable for ApplicationConfig {}

#[derive(Deserialize)]
struct OptionalApplicationConfig {
    install_tracing_logger: Option<bool>,
    log_level: Option<String>,
}

/// Hierarchical configuration values addressed by dotted keys. Environment variables take
/// precedence over loaded sources for every key.
#[derive(Clone, Default)]
pub struct Environment {
    config: Config,
}

impl Environment {
    /// Loads the environment from default files and extra files.
    pub fn init_from_environment() -> Result<Self, ConfigError> {
        let extra_files = env::var(CONFIG_FILES_VARIABLE).unwrap_or_default();
        let extra_files = extra_files
            .split(',')
            .map(str::trim)
            .filter(|file| !file.is_empty());

        let mut builder = Config::builder();
        for file in DEFAULT_ENVIRONMENT_FILES {
            builder = builder.add_source(File::with_name(file).required(false));
        }

        for file in extra_files {
            debug!(file, "Adding environment file");
            builder = builder.add_source(File::with_name(file).required(false));
        }

        builder.build().map(Self::from_config)
    }

    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    /// Returns a deserialized value, if present and convertible.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.try_get(key).ok()
    }

    pub fn try_get<T: DeserializeOwned>(&self, key: &str) -> Result<T, ConfigError> {
        match variable(key) {
            Some(value) => config::Value::new(None, value).try_deserialize(),
            None => self.config.get(key),
        }
    }

    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    /// Returns the value as a string. Numbers and booleans are converted.
    pub fn get_string(&self, key: &str) -> Option<String> {
        variable(key).or_else(|| self.config.get_string(key).ok())
    }

    /// Checks if given key is present, either as a value or a table.
    pub fn contains(&self, key: &str) -> bool {
        variable(key).is_some() || self.config.get::<config::Value>(key).is_ok()
    }
}

impl Debug for Environment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment").finish_non_exhaustive()
    }
}

impl Injectable for Environment {}

impl ValueResolver for Environment {
    #[inline]
    fn resolve(&self, key: &str) -> Option<String> {
        self.get_string(key)
    }
}

/// Decrypts configuration values.
#[cfg_attr(test, automock)]
pub trait Decipher {
    fn decrypt(&self, value: &str) -> Result<String, ErrorPtr>;
}

/// [ValueResolver] passing every value of the wrapped resolver through a [Decipher]. Values which
/// cannot be decrypted are treated as missing.
pub struct DecipherEnvironment {
    resolver: InstancePtr<dyn ValueResolver>,
    decipher: InstancePtr<dyn Decipher + Send + Sync>,
}

impl DecipherEnvironment {
    pub fn new(
        resolver: InstancePtr<dyn ValueResolver>,
        decipher: InstancePtr<dyn Decipher + Send + Sync>,
    ) -> Self {
        Self { resolver, decipher }
    }
}

impl ValueResolver for DecipherEnvironment {
    fn resolve(&self, key: &str) -> Option<String> {
        let value = self.resolver.resolve(key)?;
        match self.decipher.decrypt(&value) {
            Ok(value) => Some(value),
            Err(error) => {
                error!(key, %error, "Failed to decrypt configuration value");
                None
            }
        }
    }
}
