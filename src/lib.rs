//! Serial sensor to key-value store bridge
//!
//! This library reads newline-terminated numeric readings from a byte
//! source (typically a serial port), validates them, and publishes each new
//! value to a key-value store that an external monitoring application
//! reads. Unchanged values are never rewritten.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Domain Layer                                 │
//! │  - LineFramer: raw bytes -> complete lines                      │
//! │  - Reading: validated numeric line                              │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Pipeline + Shutdown                          │
//! │  - PublishPipeline: read, frame, validate, dedupe, publish      │
//! │  - ShutdownController: signals -> ShutdownToken                 │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Ports (Traits)                               │
//! │  - ByteSource: bounded blocking reads                           │
//! │  - KeyValueSink: set string fields on one key                   │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Adapters                                     │
//! │  - SerialSource / ReaderSource                                  │
//! │  - FileKeyValueStore                                            │
//! │  - ScriptedSource / MemorySink (tests)                          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod adapters;
pub mod bridge;
pub mod config;
pub mod domain;
pub mod pipeline;
pub mod ports;
pub mod shutdown;

pub use bridge::{assemble, BridgeError};
pub use config::{BridgeConfig, ConfigError, PipelineConfig, SerialConfig, StoreConfig};
pub use domain::{parse_line, parse_reading, LineFramer, Reading, ReadingError};
pub use pipeline::{LineOutcome, PipelineState, PipelineStats, PublishPipeline, RunSummary};
pub use ports::{ByteSource, KeyValueSink, SinkError, SourceError};
pub use shutdown::{ShutdownController, ShutdownToken};
