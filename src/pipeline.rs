//! Publish pipeline - read, frame, validate, dedupe, publish
//!
//! One pipeline owns one byte source and one key-value sink. Each loop
//! iteration does a single bounded read, frames whatever arrived, and
//! pushes every new valid reading to the sink. A value equal to the last
//! one published is never written again, so the store (and whatever
//! watches it) only sees real changes.
//!
//! ```text
//! Idle -> Reading -> Framing -> Validating -> Publishing -> Idle
//!                                          \-> Skipping  -/
//! (token cancelled) -> ShuttingDown -> Stopped
//! ```
//!
//! No in-loop error is fatal. Read failures back off and retry, invalid
//! lines are logged and dropped, failed writes are logged and the loop
//! moves on.

use std::thread;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::config::PipelineConfig;
use crate::domain::{parse_line, LineFramer, ReadingError};
use crate::ports::sink::KeyValueSink;
use crate::ports::source::{ByteSource, SourceError};
use crate::shutdown::ShutdownToken;

/// Where the pipeline currently is in its loop
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    /// Between iterations
    Idle,
    /// Blocked in a source read
    Reading,
    /// Feeding bytes to the framer
    Framing,
    /// Checking a framed line
    Validating,
    /// Writing a new value to the sink
    Publishing,
    /// Dropping a value equal to the last one published
    Skipping,
    /// Cancellation observed, releasing resources
    ShuttingDown,
    /// Resources released
    Stopped,
}

/// What happened to a single framed line
#[derive(Clone, Debug, PartialEq)]
pub enum LineOutcome {
    /// Blank after trimming, dropped silently
    Empty,
    /// Not a number, dropped
    Rejected(ReadingError),
    /// Same as the last published value, no write
    Unchanged,
    /// Written to the sink
    Published,
    /// Sink write failed
    WriteFailed,
}

/// Running counters, logged at exit
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Reads that returned data
    pub reads: u64,
    /// Reads that timed out with no data
    pub idle_reads: u64,
    /// Reads aborted benignly
    pub interrupted_reads: u64,
    /// Reads that failed
    pub read_errors: u64,
    /// Complete lines framed
    pub lines: u64,
    /// Lines that were blank
    pub empty_lines: u64,
    /// Lines that failed validation
    pub rejected_lines: u64,
    /// Valid lines equal to the last published value
    pub unchanged: u64,
    /// Successful sink writes
    pub published: u64,
    /// Failed sink writes
    pub write_failures: u64,
}

/// Final report from [`PublishPipeline::run`]
#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    /// Always [`PipelineState::Stopped`]
    pub state: PipelineState,
    /// Counters at exit
    pub stats: PipelineStats,
    /// Last value successfully written, if any
    pub last_published: Option<String>,
}

/// Read loop from a byte source to a key-value sink
pub struct PublishPipeline<S, K> {
    source: S,
    sink: K,
    /// Field the readings are written to
    value_field: String,
    config: PipelineConfig,
    framer: LineFramer,
    read_buf: Vec<u8>,
    /// Only updated after a successful write
    last_published: Option<String>,
    state: PipelineState,
    stats: PipelineStats,
}

impl<S: ByteSource, K: KeyValueSink> PublishPipeline<S, K> {
    /// Build a pipeline writing readings to `value_field` of `sink`
    pub fn new(source: S, sink: K, value_field: impl Into<String>, config: PipelineConfig) -> Self {
        let read_buf = vec![0u8; config.read_buffer_size.max(1)];
        Self {
            source,
            sink,
            value_field: value_field.into(),
            framer: LineFramer::with_capacity(config.read_buffer_size.saturating_mul(2)),
            read_buf,
            config,
            last_published: None,
            state: PipelineState::Idle,
            stats: PipelineStats::default(),
        }
    }

    /// Current loop state
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Counters so far
    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    /// Last value successfully written
    pub fn last_published(&self) -> Option<&str> {
        self.last_published.as_deref()
    }

    /// Run until `token` is cancelled, then release source and sink
    ///
    /// The token is checked before every read, never during one.
    pub fn run(mut self, token: &ShutdownToken) -> RunSummary {
        info!(
            source = self.source.name(),
            sink = %self.sink.location(),
            field = %self.value_field,
            "Listening for sensor lines"
        );

        while token.is_running() {
            self.step();
        }

        self.shutdown()
    }

    /// One loop iteration: a single read and everything it yields
    pub fn step(&mut self) {
        self.state = PipelineState::Reading;
        match self.source.read(&mut self.read_buf) {
            Ok(0) => {
                self.stats.idle_reads += 1;
                self.state = PipelineState::Idle;
                backoff(self.config.idle_backoff());
            }
            Ok(n) => {
                self.stats.reads += 1;
                self.state = PipelineState::Framing;
                self.framer.feed(&self.read_buf[..n]);
                while let Some(line) = self.framer.next_line() {
                    self.stats.lines += 1;
                    self.process_line(&line);
                }
                self.state = PipelineState::Idle;
            }
            Err(SourceError::Interrupted) => {
                self.stats.interrupted_reads += 1;
                self.state = PipelineState::Idle;
                debug!(source = self.source.name(), "Read interrupted");
            }
            Err(e) => {
                self.stats.read_errors += 1;
                self.state = PipelineState::Idle;
                warn!(source = self.source.name(), error = %e, "Read failed, retrying");
                backoff(self.config.error_backoff());
            }
        }
    }

    /// Validate one framed line and publish it if it is a new value
    pub fn process_line(&mut self, line: &[u8]) -> LineOutcome {
        self.state = PipelineState::Validating;
        let reading = match parse_line(line) {
            Ok(reading) => reading,
            Err(ReadingError::Empty) => {
                self.stats.empty_lines += 1;
                return LineOutcome::Empty;
            }
            Err(reason) => {
                self.stats.rejected_lines += 1;
                info!(
                    line = %String::from_utf8_lossy(line.trim_ascii()),
                    %reason,
                    "Ignored non-numeric line"
                );
                return LineOutcome::Rejected(reason);
            }
        };

        if self.last_published.as_deref() == Some(reading.text()) {
            self.state = PipelineState::Skipping;
            self.stats.unchanged += 1;
            return LineOutcome::Unchanged;
        }

        self.state = PipelineState::Publishing;
        match self.sink.set(&self.value_field, reading.text()) {
            Ok(()) => {
                self.stats.published += 1;
                info!(value = reading.text(), field = %self.value_field, "Wrote value");
                self.last_published = Some(reading.into_text());
                LineOutcome::Published
            }
            Err(e) => {
                self.stats.write_failures += 1;
                error!(value = reading.text(), error = %e, "Failed to write value");
                LineOutcome::WriteFailed
            }
        }
    }

    /// Release source and sink and report
    pub fn shutdown(mut self) -> RunSummary {
        self.state = PipelineState::ShuttingDown;
        info!("Shutting down...");
        if !self.framer.is_empty() {
            debug!(
                pending = self.framer.buffered().len(),
                "Discarding unterminated partial line"
            );
        }

        let Self {
            source,
            sink,
            stats,
            last_published,
            ..
        } = self;
        drop(source);
        drop(sink);

        info!(?stats, "Exit complete");
        RunSummary {
            state: PipelineState::Stopped,
            stats,
            last_published,
        }
    }
}

fn backoff(delay: Duration) {
    if !delay.is_zero() {
        thread::sleep(delay);
    }
}
