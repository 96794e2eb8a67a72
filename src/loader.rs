//! Background sequence loader
//!
//! One worker thread per threaded load: it resolves the sequence spec,
//! registers the frame entries, then decodes every frame in index order into
//! the shared store. The owning side keeps reading (progress, entry status)
//! and never blocks on the worker; the worker never touches the texture or
//! the cursor. Completion is handed back by polling
//! [`ImageSequence::update`](crate::sequence::ImageSequence::update).
//!
//! Cancellation is cooperative. The flag lives behind a mutex shared by
//! [`SequenceLoader::cancel`] (writer) and the worker's per-frame check
//! (reader); a decode already in flight runs to completion before the worker
//! stops. `cancel` joins the thread, so once it returns the worker has
//! observably exited. Dropping the loader routes through the same path.

use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::decode::FrameDecoder;
use crate::error::SequenceError;
use crate::frame::{Frame, PixelKind};
use crate::index::{DirLister, SequenceSpec};
use crate::sequence::Store;

/// Pause between frame decodes so the worker yields CPU to the owner.
const LOAD_YIELD: Duration = Duration::from_millis(2);

struct LoadShared {
    cancel: Mutex<bool>,
    running: AtomicBool,
    resolved: AtomicBool,
}

/// Owned handle to the single worker of a threaded load.
pub struct SequenceLoader {
    shared: Arc<LoadShared>,
    handle: Option<JoinHandle<()>>,
}

impl SequenceLoader {
    pub(crate) fn spawn(
        store: Arc<Store>,
        spec: SequenceSpec,
        decoder: Arc<dyn FrameDecoder>,
        lister: Arc<dyn DirLister>,
        kind: PixelKind,
        max_frames: usize,
    ) -> Self {
        let shared = Arc::new(LoadShared {
            cancel: Mutex::new(false),
            running: AtomicBool::new(true),
            resolved: AtomicBool::new(false),
        });
        let worker_shared = Arc::clone(&shared);
        let handle = thread::spawn(move || {
            run_load(store, spec, decoder, lister, kind, max_frames, worker_shared);
        });

        Self { shared, handle: Some(handle) }
    }

    /// True until the worker has finished, been cancelled, or failed.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    pub(crate) fn cancelled(&self) -> bool {
        *self.shared.cancel.lock().unwrap()
    }

    pub(crate) fn resolved(&self) -> bool {
        self.shared.resolved.load(Ordering::Acquire)
    }

    /// Request a cooperative stop and block until the worker has exited.
    /// Safe to call repeatedly; after the first join this is a no-op.
    pub fn cancel(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        *self.shared.cancel.lock().unwrap() = true;
        if handle.join().is_err() {
            error!("sequence loader worker panicked");
        }
        self.shared.running.store(false, Ordering::Release);
    }
}

impl Drop for SequenceLoader {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn run_load(
    store: Arc<Store>,
    spec: SequenceSpec,
    decoder: Arc<dyn FrameDecoder>,
    lister: Arc<dyn DirLister>,
    kind: PixelKind,
    max_frames: usize,
    shared: Arc<LoadShared>,
) {
    // Resolving
    let paths = match spec.resolve(&*lister, max_frames) {
        Ok(paths) => paths,
        Err(e) => {
            error!("threaded load failed to resolve: {}", e);
            shared.running.store(false, Ordering::Release);
            return;
        }
    };
    store.replace_entries(paths.into_iter().map(Frame::new).collect());
    shared.resolved.store(true, Ordering::Release);

    if *shared.cancel.lock().unwrap() {
        debug!("threaded load cancelled before decoding");
        shared.running.store(false, Ordering::Release);
        return;
    }

    // Decoding, in index order, checking for cancellation between frames.
    let entries = store.entries();
    let total = entries.len();
    for (index, frame) in entries.iter().enumerate() {
        if *shared.cancel.lock().unwrap() {
            info!("threaded load cancelled at frame {}/{}", index, total);
            break;
        }
        if let Err(source) = frame.ensure_decoded(&*decoder, kind) {
            warn!("{}", SequenceError::Decode {
                index,
                path: frame.path().to_path_buf(),
                source,
            });
        }
        store.note_processed(index + 1);
        thread::sleep(LOAD_YIELD);
    }

    shared.running.store(false, Ordering::Release);
}
