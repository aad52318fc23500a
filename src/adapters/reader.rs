//! Generic reader byte source adapter
//!
//! Wraps any `std::io::Read` (stdin, a socket, a pipe) so it can feed the
//! pipeline. End of input is reported as an idle read: the pipeline keeps
//! polling until it is told to stop.

use std::io::Read;

use crate::ports::source::{classify_read, ByteSource, SourceError};

/// Byte source over an arbitrary reader
pub struct ReaderSource<R> {
    reader: R,
    name: String,
}

impl<R: Read> ReaderSource<R> {
    /// Wrap `reader`, labelled `name` in logs
    pub fn new(reader: R, name: impl Into<String>) -> Self {
        Self {
            reader,
            name: name.into(),
        }
    }

    /// Unwrap the underlying reader
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> ByteSource for ReaderSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SourceError> {
        classify_read(self.reader.read(buf))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
