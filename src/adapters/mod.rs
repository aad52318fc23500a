//! Adapters - concrete implementations of ports
//!
//! Adapters connect the pipeline to the outside world by implementing
//! the port traits.
//!
//! # Available Adapters
//!
//! - **serial**: serial port byte source (`serialport`)
//! - **reader**: byte source over any `std::io::Read`
//! - **file_store**: directory-per-key, file-per-field store
//! - **memory**: scripted source and recording sink for tests

pub mod file_store;
pub mod memory;
pub mod reader;
pub mod serial;

pub use file_store::FileKeyValueStore;
pub use memory::{MemorySink, MemorySinkHandle, ReadStep, ScriptedSource};
pub use reader::ReaderSource;
pub use serial::SerialSource;
