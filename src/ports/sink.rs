//! Key-value sink port - abstraction for the store the monitor reads
//!
//! A sink is opened at one key path up front; after that the pipeline only
//! sets named string fields on it.

use std::io;

use thiserror::Error;

/// Error type for sink operations
#[derive(Debug, Error)]
pub enum SinkError {
    /// Key path could not be created or opened
    #[error("cannot open key path {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },
    /// Field name is empty or would escape the key path
    #[error("invalid field name {0:?}")]
    InvalidField(String),
    /// Reading a field back failed
    #[error("failed to read field {field}: {source}")]
    Read {
        field: String,
        #[source]
        source: io::Error,
    },
    /// Writing a field failed
    #[error("failed to write field {field}: {source}")]
    Write {
        field: String,
        #[source]
        source: io::Error,
    },
}

/// Port for publishing values to an externally readable store
///
/// Redundant writes are tolerated by implementations but callers avoid
/// them: every write may wake up whatever watches the store.
pub trait KeyValueSink {
    /// Set `field` to `value`
    fn set(&mut self, field: &str, value: &str) -> Result<(), SinkError>;

    /// Human readable location of the key for logs
    fn location(&self) -> String;
}

impl<K: KeyValueSink + ?Sized> KeyValueSink for Box<K> {
    fn set(&mut self, field: &str, value: &str) -> Result<(), SinkError> {
        (**self).set(field, value)
    }

    fn location(&self) -> String {
        (**self).location()
    }
}
