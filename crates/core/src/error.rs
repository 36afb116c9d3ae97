//! Error types for Ordex operations.
//!
//! Every variant is a synchronous precondition violation raised at the call
//! that violated it; the engine has no transient-failure surface.

use alloc::string::String;
use core::fmt;

/// Result type alias for Ordex operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error types for Ordex operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A missing, empty or sentinel key where a concrete key is required.
    InvalidKey { message: String },
    /// An empty property name where a plain property set is used.
    InvalidProperty { name: String },
    /// A malformed patch or a value routed to the wrong property kind.
    InvalidValue { message: String },
    /// A reducer contribution for a key with no owner record.
    OrphanedReducer { property: String },
    /// An operation declared but intentionally unimplemented.
    Unsupported { operation: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidKey { message } => write!(f, "Invalid key: {}", message),
            Error::InvalidProperty { name } => write!(f, "Invalid property name: {:?}", name),
            Error::InvalidValue { message } => write!(f, "Invalid value: {}", message),
            Error::OrphanedReducer { property } => {
                write!(f, "Reducer contribution to {} has no owner record", property)
            }
            Error::Unsupported { operation } => write!(f, "Unsupported operation: {}", operation),
        }
    }
}

impl Error {
    /// Creates an invalid key error.
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Error::InvalidKey {
            message: message.into(),
        }
    }

    /// Creates an invalid property error.
    pub fn invalid_property(name: impl Into<String>) -> Self {
        Error::InvalidProperty { name: name.into() }
    }

    /// Creates an invalid value error.
    pub fn invalid_value(message: impl Into<String>) -> Self {
        Error::InvalidValue {
            message: message.into(),
        }
    }

    /// Creates an orphaned reducer error.
    pub fn orphaned_reducer(property: impl Into<String>) -> Self {
        Error::OrphanedReducer {
            property: property.into(),
        }
    }

    /// Creates an unsupported operation error.
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Error::Unsupported {
            operation: operation.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_error_display() {
        let err = Error::invalid_key("empty tuple key");
        assert!(err.to_string().contains("Invalid key"));

        let err = Error::orphaned_reducer("avgwidth");
        assert!(err.to_string().contains("avgwidth"));

        let err = Error::unsupported("delete");
        assert!(err.to_string().contains("delete"));
    }

    #[test]
    fn test_error_constructors() {
        match Error::invalid_property("") {
            Error::InvalidProperty { name } => assert_eq!(name, ""),
            _ => panic!("Wrong error type"),
        }
    }
}
