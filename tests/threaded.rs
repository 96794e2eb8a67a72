//! Background loading: completion handoff, cancellation, teardown.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use flipbook::{DecodeError, FrameDecoder, ImageSequence, PixelBuffer, PixelData, PixelKind};

/// Decoder that takes a fixed amount of wall time per frame.
struct SlowDecoder {
    delay: Duration,
    calls: AtomicUsize,
}

impl SlowDecoder {
    fn new(delay_ms: u64) -> Self {
        Self { delay: Duration::from_millis(delay_ms), calls: AtomicUsize::new(0) }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl FrameDecoder for SlowDecoder {
    fn decode(&self, _path: &Path, _kind: PixelKind) -> Result<PixelBuffer, DecodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.delay);
        Ok(PixelBuffer::new(2, 2, PixelData::U8(vec![0; 2 * 2 * 4])))
    }
}

/// Tick `update()` until `done` holds, like an owner polling per frame.
fn poll_until(seq: &mut ImageSequence, what: &str, done: fn(&ImageSequence) -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !done(seq) {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        seq.update();
        thread::sleep(Duration::from_millis(2));
    }
}

/// Wait without polling `update()`, so the load can never finalize.
fn wait_until(what: &str, mut done: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !done() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(1));
    }
}

fn threaded_sequence(decoder: Arc<SlowDecoder>) -> ImageSequence {
    let mut seq = ImageSequence::new(PixelKind::Byte);
    seq.set_decoder(decoder);
    seq.enable_threaded_load(true);
    seq
}

#[test]
fn threaded_load_completes_through_update() {
    let decoder = Arc::new(SlowDecoder::new(1));
    let mut seq = threaded_sequence(Arc::clone(&decoder));

    seq.load_range("img", "png", 0, 9, 0).unwrap();

    // The load call itself does not block or finalize.
    assert!(!seq.is_loaded());

    poll_until(&mut seq, "threaded load to finish", |s| s.is_loaded());

    assert!(!seq.is_loading());
    assert_eq!(seq.total_frames(), 10);
    assert_eq!(seq.percent_loaded(), 1.0);
    assert_eq!((seq.width(), seq.height()), (2, 2));
    assert!(seq.texture().is_some());
    // All ten frames decoded exactly once; the finalize pass hit the cache.
    assert_eq!(decoder.calls(), 10);
}

#[test]
fn cancel_freezes_progress_and_unload_resets() {
    let decoder = Arc::new(SlowDecoder::new(15));
    let mut seq = threaded_sequence(decoder);

    seq.load_range("img", "png", 0, 9, 0).unwrap();

    wait_until("three frames to decode", || seq.percent_loaded() >= 0.3);
    seq.cancel_load();

    let frozen = seq.percent_loaded();
    assert!(!seq.is_loaded());
    assert!(!seq.is_loading());
    assert!(frozen >= 0.3 && frozen < 1.0, "frozen at {frozen}");

    // Progress does not move once the worker has been joined.
    thread::sleep(Duration::from_millis(100));
    seq.update();
    assert_eq!(seq.percent_loaded(), frozen);
    assert!(!seq.is_loaded());

    seq.unload();
    assert_eq!(seq.total_frames(), 0);
    assert_eq!(seq.current_frame(), 0);
    assert_eq!((seq.width(), seq.height()), (0, 0));
    assert_eq!(seq.percent_loaded(), 0.0);
    assert!(seq.texture().is_none());
}

#[test]
fn immediate_cancel_decodes_at_most_one_frame() {
    let decoder = Arc::new(SlowDecoder::new(15));
    let mut seq = threaded_sequence(Arc::clone(&decoder));

    seq.load_range("img", "png", 0, 9, 0).unwrap();
    seq.cancel_load();

    assert!(!seq.is_loaded());
    assert!(!seq.is_loading());
    // A decode already in flight runs to completion; nothing more starts.
    assert!(decoder.calls() <= 1, "decoded {} frames", decoder.calls());

    // Cancelling again is a no-op, and unload stays safe.
    seq.cancel_load();
    seq.unload();
    assert_eq!(seq.total_frames(), 0);
}

#[test]
fn threaded_resolve_failure_never_loads() {
    let mut seq = ImageSequence::new(PixelKind::Byte);
    seq.enable_threaded_load(true);
    seq.load_folder("/nonexistent/frames").unwrap(); // failure surfaces via polling

    poll_until(&mut seq, "worker to stop", |s| !s.is_loading());
    seq.update();

    assert!(!seq.is_loaded());
    assert_eq!(seq.total_frames(), 0);
    assert_eq!(seq.percent_loaded(), 0.0);
    assert!(seq.spec().is_none());
}

#[test]
fn drop_while_loading_joins_the_worker() {
    let decoder = Arc::new(SlowDecoder::new(5));
    let mut seq = threaded_sequence(decoder);
    seq.load_range("img", "png", 0, 19, 0).unwrap();

    let started = Instant::now();
    drop(seq); // must cancel + join, not hang or race
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn reload_after_cancel_works() {
    let decoder = Arc::new(SlowDecoder::new(10));
    let mut seq = threaded_sequence(Arc::clone(&decoder));

    seq.load_range("img", "png", 0, 9, 0).unwrap();
    wait_until("first frame to decode", || seq.percent_loaded() > 0.0);
    seq.cancel_load();
    assert!(!seq.is_loaded());

    // A new load replaces the cancelled one.
    seq.load_range("img", "png", 0, 2, 0).unwrap();
    poll_until(&mut seq, "reload to finish", |s| s.is_loaded());
    assert_eq!(seq.total_frames(), 3);
    assert_eq!(seq.percent_loaded(), 1.0);
}
