use syn::{Attribute, Error, LitStr, Meta};

pub struct FieldAttributes {
    pub annotation: LitStr,
}

impl TryFrom<&Attribute> for FieldAttributes {
    type Error = Error;

    fn try_from(value: &Attribute) -> Result<Self, Self::Error> {
        let annotation = match &value.meta {
            Meta::Path(path) => LitStr::new("", path.segments[0].ident.span()),
            Meta::List(list) => list.parse_args()?,
            Meta::NameValue(name_value) => {
                return Err(Error::new_spanned(
                    name_value,
                    "Expected #[inject] or #[inject(\"key='value',...\")]!",
                ))
            }
        };

        Ok(Self { annotation })
    }
}

pub struct InjectableAttributes {
    pub init: bool,
}

impl TryFrom<&Attribute> for InjectableAttributes {
    type Error = Error;

    fn try_from(value: &Attribute) -> Result<Self, Self::Error> {
        let mut init = false;
        value.parse_nested_meta(|meta| {
            if meta.path.is_ident("init") {
                init = true;
                Ok(())
            } else {
                Err(meta.error("Unsupported injectable attribute!"))
            }
        })?;

        Ok(Self { init })
    }
}
