use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serial_kv_bridge::adapters::{
    FileKeyValueStore, MemorySink, MemorySinkHandle, ReadStep, ScriptedSource,
};
use serial_kv_bridge::bridge::{assemble, open_store};
use serial_kv_bridge::{
    BridgeConfig, ByteSource, PipelineConfig, PipelineState, PublishPipeline, ShutdownController,
    ShutdownToken, SourceError, StoreConfig,
};

fn run_chunks(chunks: &[&str]) -> MemorySinkHandle {
    let token = ShutdownToken::new();
    let source = ScriptedSource::new(chunks.iter().map(ReadStep::data))
        .cancel_when_exhausted(token.clone());
    let sink = MemorySink::new();
    let handle = sink.handle();

    let summary =
        PublishPipeline::new(source, sink, "Value", PipelineConfig::no_backoff()).run(&token);
    assert_eq!(summary.state, PipelineState::Stopped);
    handle
}

#[test]
fn repeated_value_is_suppressed() {
    let sink = run_chunks(&["23.5\n23.5\n24.0\n"]);
    assert_eq!(sink.values("Value"), vec!["23.5", "24.0"]);
}

#[test]
fn garbage_empty_and_blank_lines_are_dropped() {
    let sink = run_chunks(&["ab\n\n  \n42\n"]);
    assert_eq!(sink.values("Value"), vec!["42"]);
}

#[test]
fn value_split_across_reads_is_published_once() {
    let sink = run_chunks(&["12.", "3\n"]);
    assert_eq!(sink.values("Value"), vec!["12.3"]);
}

#[test]
fn crlf_sensor_output() {
    let sink = run_chunks(&["21.0\r\n21.0\r", "\n21.5\r\n"]);
    assert_eq!(sink.values("Value"), vec!["21.0", "21.5"]);
}

#[test]
fn unterminated_tail_is_never_published() {
    let sink = run_chunks(&["10\n", "11"]);
    assert_eq!(sink.values("Value"), vec!["10"]);
    assert_eq!(sink.releases(), 1);
}

#[test]
fn transient_errors_do_not_stop_the_loop() {
    let token = ShutdownToken::new();
    let source = ScriptedSource::new([
        ReadStep::Error(std::io::ErrorKind::BrokenPipe),
        ReadStep::Idle,
        ReadStep::data("1"),
        ReadStep::Interrupted,
        ReadStep::data("9\n"),
    ])
    .cancel_when_exhausted(token.clone());
    let sink = MemorySink::new();
    let handle = sink.handle();

    let summary =
        PublishPipeline::new(source, sink, "Value", PipelineConfig::no_backoff()).run(&token);

    assert_eq!(handle.values("Value"), vec!["19"]);
    assert_eq!(summary.stats.read_errors, 1);
    assert_eq!(summary.stats.interrupted_reads, 1);
    assert_eq!(summary.last_published.as_deref(), Some("19"));
}

#[test]
fn end_to_end_into_file_store() {
    let root = tempfile::tempdir().unwrap();
    let token = ShutdownToken::new();
    let config = BridgeConfig {
        store: StoreConfig {
            root: root.path().to_path_buf(),
            key_path: r"Software\HWiNFO64\Sensors\Custom\PC Water Sensor\Temp0".to_string(),
            ..StoreConfig::default()
        },
        pipeline: PipelineConfig::no_backoff(),
        ..BridgeConfig::default()
    };

    let source_token = token.clone();
    let pipeline = assemble(&config, open_store, move |_| {
        Ok(ScriptedSource::new([ReadStep::data("22.5\n22.5\nerr\n23\n")])
            .cancel_when_exhausted(source_token))
    })
    .unwrap();
    let summary = pipeline.run(&token);
    assert_eq!(summary.stats.published, 2);

    let store = FileKeyValueStore::open(root.path(), &config.store.key_path).unwrap();
    assert_eq!(store.get("Name").unwrap().as_deref(), Some("Temperature"));
    assert_eq!(store.get("Value").unwrap().as_deref(), Some("23"));
}

/// Source that behaves like an idle serial port: every read blocks for the
/// timeout and returns nothing.
struct IdlePort {
    timeout: Duration,
    releases: Arc<AtomicUsize>,
}

impl ByteSource for IdlePort {
    fn read(&mut self, _buf: &mut [u8]) -> Result<usize, SourceError> {
        thread::sleep(self.timeout);
        Ok(0)
    }

    fn name(&self) -> &str {
        "idle"
    }
}

impl Drop for IdlePort {
    fn drop(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn shutdown_while_idle_releases_resources_once() {
    let controller = ShutdownController::new();
    let token = controller.token();
    let releases = Arc::new(AtomicUsize::new(0));
    let source = IdlePort {
        timeout: Duration::from_millis(50),
        releases: Arc::clone(&releases),
    };
    let sink = MemorySink::new();
    let handle = sink.handle();

    let worker = thread::spawn(move || {
        PublishPipeline::new(source, sink, "Value", PipelineConfig::default()).run(&token)
    });

    thread::sleep(Duration::from_millis(120));
    let requested = Instant::now();
    assert!(controller.trigger("SIGINT"));
    assert!(!controller.trigger("SIGTERM"));
    let summary = worker.join().unwrap();

    // One read timeout plus one idle backoff, with slack for slow machines
    assert!(requested.elapsed() < Duration::from_secs(2));
    assert_eq!(summary.state, PipelineState::Stopped);
    assert!(summary.stats.idle_reads >= 1);
    assert_eq!(releases.load(Ordering::SeqCst), 1);
    assert_eq!(handle.releases(), 1);
    assert!(handle.writes().is_empty());
}
