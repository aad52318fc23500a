//! Ports (interfaces) defining the boundaries of the application
//!
//! Ports are traits that define how the pipeline interacts with external
//! systems, so the core stays independent of specific implementations.
//!
//! - **ByteSource**: where sensor bytes come from (serial port, stdin, mock)
//! - **KeyValueSink**: where validated values go (file store, mock)

pub mod sink;
pub mod source;

pub use sink::{KeyValueSink, SinkError};
pub use source::{classify_read, ByteSource, SourceError};
