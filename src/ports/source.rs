//! Byte source port - abstraction for where sensor bytes come from
//!
//! This trait allows the pipeline to read bytes without knowing the
//! specific transport (serial port, stdin, socket, etc.)

use std::io;

use thiserror::Error;

/// Error type for byte source operations
#[derive(Debug, Error)]
pub enum SourceError {
    /// Read was aborted, usually because the process is shutting down
    #[error("read interrupted")]
    Interrupted,
    /// Any other read failure; not fatal, the read is retried
    #[error("read failed: {0}")]
    Io(#[source] io::Error),
}

impl SourceError {
    /// Whether this error is the benign abort case
    pub fn is_interrupted(&self) -> bool {
        matches!(self, SourceError::Interrupted)
    }
}

/// Port for reading raw bytes from the sensor
///
/// # Example Implementation
///
/// ```ignore
/// struct SerialSource {
///     port: Box<dyn serialport::SerialPort>,
/// }
///
/// impl ByteSource for SerialSource {
///     fn read(&mut self, buf: &mut [u8]) -> Result<usize, SourceError> {
///         classify_read(self.port.read(buf))
///     }
///
///     fn name(&self) -> &str { "COM4" }
/// }
/// ```
pub trait ByteSource {
    /// Read whatever bytes are available into `buf`
    ///
    /// Blocks for at most the source's read timeout. `Ok(0)` means the
    /// timeout elapsed with no data, which is the normal idle case.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SourceError>;

    /// Human readable identifier for logs (device path, "stdin", ...)
    fn name(&self) -> &str;
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SourceError> {
        (**self).read(buf)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Map a `std::io::Read` result onto the byte source contract
///
/// Timeouts become `Ok(0)` and `Interrupted` becomes the benign abort.
pub fn classify_read(result: io::Result<usize>) -> Result<usize, SourceError> {
    match result {
        Ok(n) => Ok(n),
        Err(e) => match e.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Ok(0),
            io::ErrorKind::Interrupted => Err(SourceError::Interrupted),
            _ => Err(SourceError::Io(e)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_is_idle() {
        let timed_out = io::Error::new(io::ErrorKind::TimedOut, "Operation timed out");
        assert_eq!(classify_read(Err(timed_out)).unwrap(), 0);
        let would_block = io::Error::from(io::ErrorKind::WouldBlock);
        assert_eq!(classify_read(Err(would_block)).unwrap(), 0);
    }

    #[test]
    fn test_interrupted_is_benign() {
        let err = classify_read(Err(io::Error::from(io::ErrorKind::Interrupted))).unwrap_err();
        assert!(err.is_interrupted());
    }

    #[test]
    fn test_other_errors_pass_through() {
        let err = classify_read(Err(io::Error::from(io::ErrorKind::BrokenPipe))).unwrap_err();
        assert!(matches!(err, SourceError::Io(ref e) if e.kind() == io::ErrorKind::BrokenPipe));
        assert!(!err.is_interrupted());
    }
}
