use crate::registry::BindingKey;
use crate::value::ScalarKind;
use thiserror::Error;

/// Malformed field annotation.
#[derive(Error, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
#[error("Annotation syntax error at offset {offset}: {annotation}")]
pub struct SyntaxError {
    pub annotation: String,
    pub offset: usize,
}

/// A literal which cannot be represented by the requested scalar type.
#[derive(Error, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
#[error("Cannot convert '{literal}' to {kind}")]
pub struct ConversionError {
    pub literal: String,
    pub kind: ScalarKind,
}

/// Errors related to binding registries.
#[derive(Error, Clone, Eq, PartialEq, Hash, Debug)]
pub enum RegistryError {
    #[error("Attempted to register a duplicated binding for {0}")]
    DuplicateBinding(BindingKey),
}

/// Reasons for failing to populate a single field.
#[derive(Error, Clone, Eq, PartialEq, Debug)]
pub enum ResolutionError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    #[error("Cannot resolve value {0} and no default is present")]
    ResolutionFailed(String),
    #[error("Cannot find binding of type {type_name} (name: {name:?})")]
    BindingNotFound {
        name: Option<String>,
        type_name: &'static str,
    },
    #[error("Binding of {found} cannot be used as {expected}")]
    IncompatibleBinding {
        expected: &'static str,
        found: &'static str,
    },
    #[error("Annotation key '{key}' is not supported on {shape} fields")]
    UnsupportedKey {
        key: &'static str,
        shape: &'static str,
    },
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Errors related to injecting object graphs.
#[derive(Error, Clone, Eq, PartialEq, Debug)]
pub enum InjectError {
    #[error("Cannot inject field '{field}' of {owner}: {reason}")]
    Field {
        owner: &'static str,
        field: &'static str,
        reason: ResolutionError,
    },
    #[error("Injecting {owner} panicked: {message}")]
    Panicked {
        owner: &'static str,
        message: String,
    },
}

impl InjectError {
    /// Returns the underlying field resolution error, if any.
    pub fn reason(&self) -> Option<&ResolutionError> {
        match self {
            InjectError::Field { reason, .. } => Some(reason),
            InjectError::Panicked { .. } => None,
        }
    }
}
