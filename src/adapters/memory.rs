//! In-memory adapters for tests and dry runs
//!
//! `ScriptedSource` replays a fixed sequence of read outcomes and
//! `MemorySink` records every write. Both count how many times they were
//! released so tests can check resources are dropped exactly once.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::ports::sink::{KeyValueSink, SinkError};
use crate::ports::source::{ByteSource, SourceError};
use crate::shutdown::ShutdownToken;

/// One scripted read outcome
#[derive(Clone, Debug)]
pub enum ReadStep {
    /// Return these bytes (must fit in the caller's buffer)
    Data(Vec<u8>),
    /// Timeout with no data
    Idle,
    /// Benign abort
    Interrupted,
    /// Transient failure of the given kind
    Error(io::ErrorKind),
}

impl ReadStep {
    /// Shorthand for `ReadStep::Data`
    pub fn data(bytes: impl AsRef<[u8]>) -> Self {
        ReadStep::Data(bytes.as_ref().to_vec())
    }
}

/// Byte source that replays a script
///
/// Once the script runs out every read is idle, after optionally
/// cancelling a shutdown token so a pipeline driven by it stops.
pub struct ScriptedSource {
    steps: VecDeque<ReadStep>,
    cancel_when_exhausted: Option<ShutdownToken>,
    reads: Arc<AtomicUsize>,
    releases: Arc<AtomicUsize>,
}

impl ScriptedSource {
    /// Source that replays `steps` in order
    pub fn new(steps: impl IntoIterator<Item = ReadStep>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
            cancel_when_exhausted: None,
            reads: Arc::new(AtomicUsize::new(0)),
            releases: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Cancel `token` on the first read after the script is exhausted
    pub fn cancel_when_exhausted(mut self, token: ShutdownToken) -> Self {
        self.cancel_when_exhausted = Some(token);
        self
    }

    /// Counter of read calls, shared with the source
    pub fn reads(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.reads)
    }

    /// Counter of drops, shared with the source
    pub fn releases(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.releases)
    }
}

impl ByteSource for ScriptedSource {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SourceError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        match self.steps.pop_front() {
            Some(ReadStep::Data(bytes)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                if n < bytes.len() {
                    self.steps.push_front(ReadStep::Data(bytes[n..].to_vec()));
                }
                Ok(n)
            }
            Some(ReadStep::Idle) => Ok(0),
            Some(ReadStep::Interrupted) => Err(SourceError::Interrupted),
            Some(ReadStep::Error(kind)) => Err(SourceError::Io(io::Error::from(kind))),
            None => {
                if let Some(token) = &self.cancel_when_exhausted {
                    token.cancel();
                }
                Ok(0)
            }
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

impl Drop for ScriptedSource {
    fn drop(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
struct SinkState {
    writes: Vec<(String, String)>,
    failures_remaining: usize,
}

/// Shared view of a [`MemorySink`]'s recorded state
#[derive(Clone, Debug, Default)]
pub struct MemorySinkHandle {
    state: Arc<Mutex<SinkState>>,
    releases: Arc<AtomicUsize>,
}

impl MemorySinkHandle {
    fn lock(&self) -> MutexGuard<'_, SinkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every successful write, in order
    pub fn writes(&self) -> Vec<(String, String)> {
        self.lock().writes.clone()
    }

    /// Successful writes to one field, in order
    pub fn values(&self, field: &str) -> Vec<String> {
        self.lock()
            .writes
            .iter()
            .filter(|(f, _)| f == field)
            .map(|(_, v)| v.clone())
            .collect()
    }

    /// Make the next `count` writes fail
    pub fn fail_next(&self, count: usize) {
        self.lock().failures_remaining = count;
    }

    /// How many times the sink was dropped
    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

/// Key-value sink that records writes in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    handle: MemorySinkHandle,
}

impl MemorySink {
    /// Empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for inspecting the sink after it has been moved
    pub fn handle(&self) -> MemorySinkHandle {
        self.handle.clone()
    }
}

impl KeyValueSink for MemorySink {
    fn set(&mut self, field: &str, value: &str) -> Result<(), SinkError> {
        let mut state = self.handle.lock();
        if state.failures_remaining > 0 {
            state.failures_remaining -= 1;
            return Err(SinkError::Write {
                field: field.to_string(),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "injected failure"),
            });
        }
        state.writes.push((field.to_string(), value.to_string()));
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

impl Drop for MemorySink {
    fn drop(&mut self) {
        self.handle.releases.fetch_add(1, Ordering::SeqCst);
    }
}
