use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Truncated buffer, bad magic, out-of-bounds offset or nonsensical count
    #[error("Malformed input in {context}: {reason}")]
    MalformedInput { context: String, reason: String },

    /// A dispatch key (format code, version tag) without a registered handler
    #[error("Unsupported {kind}: {value}")]
    UnsupportedVariant { kind: &'static str, value: String },

    #[error("Unknown field `{field}` in schema {schema}")]
    UnknownField {
        schema: &'static str,
        field: String,
    },

    /// A value or accessor does not fit the declared shape of a field
    #[error("Field `{field}` in schema {schema}: {reason}")]
    SchemaMismatch {
        schema: &'static str,
        field: &'static str,
        reason: String,
    },

    #[error("Value {value} does not fit in {target}")]
    ValueOutOfRange { value: String, target: &'static str },
}

impl DataError {
    pub fn malformed(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            context: context.into(),
            reason: reason.into(),
        }
    }

    pub fn unsupported(kind: &'static str, value: impl ToString) -> Self {
        Self::UnsupportedVariant {
            kind,
            value: value.to_string(),
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedInput { .. })
    }
}

pub type Result<T> = std::result::Result<T, DataError>;
