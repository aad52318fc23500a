//! Bridge startup
//!
//! Opens the sink, opens the source, writes the static metadata and hands
//! both to a [`PublishPipeline`]. Any failure here is fatal and aborts
//! before the loop starts. Whatever was already opened is released on the
//! way out.

use thiserror::Error;
use tracing::{info, warn};

use crate::adapters::{FileKeyValueStore, SerialSource};
use crate::config::{BridgeConfig, SerialConfig, StoreConfig};
use crate::pipeline::PublishPipeline;
use crate::ports::sink::{KeyValueSink, SinkError};
use crate::ports::source::ByteSource;

/// Fatal startup errors
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Serial device absent, busy or misconfigured
    #[error("cannot open serial port {port}: {source}")]
    OpenSource {
        port: String,
        #[source]
        source: serialport::Error,
    },
    /// Key path could not be created or opened
    #[error("cannot open key-value store: {0}")]
    OpenSink(#[from] SinkError),
}

/// Open the serial port from config
pub fn open_serial(config: &SerialConfig) -> Result<SerialSource, BridgeError> {
    SerialSource::open(config).map_err(|source| BridgeError::OpenSource {
        port: config.port.clone(),
        source,
    })
}

/// Open the file store from config
pub fn open_store(config: &StoreConfig) -> Result<FileKeyValueStore, BridgeError> {
    Ok(FileKeyValueStore::open(&config.root, &config.key_path)?)
}

/// Write the sensor label once
///
/// Failure is only a warning: the monitor can still show the value.
pub fn write_metadata<K: KeyValueSink>(sink: &mut K, config: &StoreConfig) -> bool {
    match sink.set(&config.name_field, &config.sensor_name) {
        Ok(()) => true,
        Err(e) => {
            warn!(field = %config.name_field, error = %e, "Failed to write sensor name");
            false
        }
    }
}

/// Assemble a pipeline from fallible openers
///
/// The sink is opened first. If the source then fails, the sink is
/// dropped before the error is returned and nothing has been written to it.
pub fn assemble<S, K, SinkOpener, SourceOpener>(
    config: &BridgeConfig,
    open_sink: SinkOpener,
    open_source: SourceOpener,
) -> Result<PublishPipeline<S, K>, BridgeError>
where
    S: ByteSource,
    K: KeyValueSink,
    SinkOpener: FnOnce(&StoreConfig) -> Result<K, BridgeError>,
    SourceOpener: FnOnce(&SerialConfig) -> Result<S, BridgeError>,
{
    let mut sink = open_sink(&config.store)?;
    info!(location = %sink.location(), "Key-value store ready");

    let source = open_source(&config.serial)?;
    write_metadata(&mut sink, &config.store);

    Ok(PublishPipeline::new(
        source,
        sink,
        config.store.value_field.clone(),
        config.pipeline.clone(),
    ))
}
