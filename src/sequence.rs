//! Image sequence engine: frame cache, loading, playback addressing
//!
//! [`ImageSequence`] plays a folder (or numeric range) of still images as if
//! they were frames of a movie. Frames decode lazily through the frame
//! cache, or all at once via [`ImageSequence::preload_all`] or a threaded
//! load, and the current frame is addressable by index, elapsed time, or
//! percent of duration.
//!
//! # Ownership and threading
//!
//! The sequence itself lives on one owning context: the texture slot and the
//! cursor are plain fields only that context touches. Frame storage sits in
//! a shared [`Store`] so a background worker can resolve and decode while
//! the owner keeps reading. While a worker is decoding, the owner's side is
//! read-only; it takes over again in [`ImageSequence::update`] once the
//! worker has finished, which is where the finalize step (and the first
//! texture upload) runs. Texture uploads never happen on the worker.

use log::{info, warn};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use crate::decode::{FrameDecoder, ImageDecoder};
use crate::error::SequenceError;
use crate::frame::{Frame, PixelBuffer, PixelKind};
use crate::index::{DirLister, FsDirLister, SequenceSpec};
use crate::loader::SequenceLoader;
use crate::textures::{FilterMode, SoftwareTextures, TextureFilter, TextureHandle, TextureUploader};

/// Frame storage shared between a sequence and its background worker.
///
/// The entry list is written once per load (by whichever side resolves the
/// spec) and is fixed in length and order until the next unload. During a
/// threaded decode only the worker writes frame slots; the owner reads.
pub(crate) struct Store {
    entries: RwLock<Vec<Frame>>,
    processed: AtomicUsize,
}

impl Store {
    pub(crate) fn new() -> Self {
        Self { entries: RwLock::new(Vec::new()), processed: AtomicUsize::new(0) }
    }

    pub(crate) fn replace_entries(&self, frames: Vec<Frame>) {
        *self.entries.write().unwrap() = frames;
        self.processed.store(0, Ordering::Release);
    }

    pub(crate) fn clear(&self) {
        self.entries.write().unwrap().clear();
        self.processed.store(0, Ordering::Release);
    }

    /// Cheap clones of every entry (the pixel slots are shared).
    pub(crate) fn entries(&self) -> Vec<Frame> {
        self.entries.read().unwrap().clone()
    }

    pub(crate) fn entry(&self, index: usize) -> Option<Frame> {
        self.entries.read().unwrap().get(index).cloned()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    /// Record that the first `count` frames of the current preload run have
    /// been processed (decoded or failed).
    pub(crate) fn note_processed(&self, count: usize) {
        self.processed.store(count, Ordering::Release);
    }

    pub(crate) fn processed(&self) -> usize {
        self.processed.load(Ordering::Acquire)
    }
}

/// An image sequence addressed like a movie.
///
/// Configuration (threaded load, max frames, extension filter, filtering,
/// frame rate, collaborators) is set before a load; loader-mode setters
/// after a load has started are reported usage errors and ignored.
pub struct ImageSequence {
    store: Arc<Store>,
    loader: Option<SequenceLoader>,
    decoder: Arc<dyn FrameDecoder>,
    lister: Arc<dyn DirLister>,
    textures: Box<dyn TextureUploader>,

    texture: Option<TextureHandle>,
    filter: TextureFilter,
    kind: PixelKind,
    spec: Option<SequenceSpec>,
    extension: String,
    max_frames: usize,
    use_thread: bool,
    loaded: bool,
    frame_rate: f32,
    current_frame: usize,
    last_decoded: i32,
    width: usize,
    height: usize,
}

impl ImageSequence {
    /// New empty sequence decoding to the given pixel kind.
    pub fn new(kind: PixelKind) -> Self {
        Self {
            store: Arc::new(Store::new()),
            loader: None,
            decoder: Arc::new(ImageDecoder),
            lister: Arc::new(FsDirLister),
            textures: Box::new(SoftwareTextures::default()),
            texture: None,
            filter: TextureFilter::default(),
            kind,
            spec: None,
            extension: String::new(),
            max_frames: 0,
            use_thread: false,
            loaded: false,
            frame_rate: 30.0,
            current_frame: 0,
            last_decoded: -1,
            width: 0,
            height: 0,
        }
    }

    // ----- configuration -----

    fn config_guard(&self, what: &'static str) -> bool {
        if self.loaded || self.is_loading() {
            warn!("{}", SequenceError::UsageOrder(what));
            return false;
        }
        true
    }

    /// Extension filter for folder scans, e.g. "png". Empty = no filter.
    pub fn set_extension(&mut self, extension: &str) {
        self.extension = extension.trim_start_matches('.').to_string();
    }

    /// Limit the number of frames discovered by a folder scan. 0 = no limit.
    /// Has no effect on explicit ranges. Must be set before load.
    pub fn set_max_frames(&mut self, max_frames: usize) {
        if !self.config_guard("set_max_frames must be called before load") {
            return;
        }
        self.max_frames = max_frames;
    }

    /// Decode on a background worker instead of blocking the load call.
    /// Must be set before load.
    pub fn enable_threaded_load(&mut self, enable: bool) {
        if !self.config_guard("enable_threaded_load must be called before load") {
            return;
        }
        self.use_thread = enable;
    }

    /// Frame rate used for time addressing and duration. Default 30.
    pub fn set_frame_rate(&mut self, rate: f32) {
        if rate <= 0.0 {
            warn!("ignoring non-positive frame rate {}", rate);
            return;
        }
        self.frame_rate = rate;
    }

    /// Min/mag filtering for the display texture.
    pub fn set_min_mag_filter(&mut self, min: FilterMode, mag: FilterMode) {
        self.filter = TextureFilter { min, mag };
        if let Some(texture) = self.texture {
            self.textures.apply_filter(texture, self.filter);
        }
    }

    /// Replace the decode collaborator. Must be set before load.
    pub fn set_decoder(&mut self, decoder: Arc<dyn FrameDecoder>) {
        if !self.config_guard("set_decoder must be called before load") {
            return;
        }
        self.decoder = decoder;
    }

    /// Replace the directory-listing collaborator. Must be set before load.
    pub fn set_lister(&mut self, lister: Arc<dyn DirLister>) {
        if !self.config_guard("set_lister must be called before load") {
            return;
        }
        self.lister = lister;
    }

    /// Replace the texture-upload collaborator. Must be set before load.
    pub fn set_textures(&mut self, textures: Box<dyn TextureUploader>) {
        if !self.config_guard("set_textures must be called before load") {
            return;
        }
        self.textures = textures;
    }

    // ----- loading -----

    /// Load an explicit numeric range, `prefix` + frame number + `.` + `ext`.
    ///
    /// `digits == 0` formats frame numbers unpadded; otherwise they are
    /// zero-padded to `digits`. Nothing is read from disk here; missing
    /// files surface at decode time.
    pub fn load_range(
        &mut self,
        prefix: &str,
        extension: &str,
        start: i32,
        end: i32,
        digits: usize,
    ) -> Result<(), SequenceError> {
        self.load(SequenceSpec::Range {
            prefix: prefix.to_string(),
            extension: extension.trim_start_matches('.').to_string(),
            start,
            end,
            digits,
        })
    }

    /// Load every matching file in a folder, in sorted order, honoring the
    /// extension filter and max-frame cap.
    pub fn load_folder(&mut self, dir: impl Into<PathBuf>) -> Result<(), SequenceError> {
        self.load(SequenceSpec::Folder { dir: dir.into(), extension: self.extension.clone() })
    }

    fn load(&mut self, spec: SequenceSpec) -> Result<(), SequenceError> {
        self.unload();
        self.spec = Some(spec.clone());

        if self.use_thread {
            self.loader = Some(SequenceLoader::spawn(
                Arc::clone(&self.store),
                spec,
                Arc::clone(&self.decoder),
                Arc::clone(&self.lister),
                self.kind,
                self.max_frames,
            ));
            return Ok(());
        }

        let paths = match spec.resolve(&*self.lister, self.max_frames) {
            Ok(paths) => paths,
            Err(e) => {
                self.spec = None;
                return Err(e);
            }
        };
        self.store.replace_entries(paths.into_iter().map(Frame::new).collect());
        self.complete_loading()
    }

    /// Finalize a load: runs on the owning context because it uploads the
    /// first texture. Called directly for synchronous loads and from
    /// [`ImageSequence::update`] once a worker has finished.
    fn complete_loading(&mut self) -> Result<(), SequenceError> {
        let total = self.store.len();
        if total == 0 {
            let e = SequenceError::OutOfRange { index: 0, len: 0 };
            warn!("load finished with an empty sequence: {}", e);
            self.spec = None;
            return Err(e);
        }

        self.loaded = true;
        self.last_decoded = -1;
        self.current_frame = 0;
        self.load_frame(0);
        if let Some((w, h)) = self.store.entry(0).and_then(|f| f.resolution()) {
            self.width = w;
            self.height = h;
        }
        info!("sequence loaded: {} frames, {}x{}", total, self.width, self.height);
        Ok(())
    }

    /// Poll a threaded load. Call once per tick on the owning context.
    ///
    /// When the worker has finished, the finalize step runs here exactly
    /// once. A cancelled or failed load is reaped silently; the sequence
    /// simply never becomes loaded.
    pub fn update(&mut self) {
        let finished = self.loader.as_ref().is_some_and(|l| !l.is_running());
        if !finished {
            return;
        }

        let Some(mut loader) = self.loader.take() else {
            return;
        };
        let cancelled = loader.cancelled();
        let resolved = loader.resolved();
        loader.cancel(); // worker already exited; this just joins

        if cancelled || !resolved {
            self.spec = None;
            return;
        }
        let _ = self.complete_loading();
    }

    /// Cancel an in-flight threaded load. Blocks until the worker has
    /// stopped. Safe to call when no load is active.
    pub fn cancel_load(&mut self) {
        if let Some(mut loader) = self.loader.take() {
            loader.cancel();
        }
    }

    /// Decode every frame in index order, continuing past per-frame
    /// failures. Memory heavy, but gives stutter-free scrubbing.
    pub fn preload_all(&mut self) {
        let entries = self.store.entries();
        if entries.is_empty() {
            warn!("preload_all called on an empty sequence");
            return;
        }
        for (index, frame) in entries.iter().enumerate() {
            if let Err(source) = frame.ensure_decoded(&*self.decoder, self.kind) {
                warn!("{}", SequenceError::Decode {
                    index,
                    path: frame.path().to_path_buf(),
                    source,
                });
            }
            self.store.note_processed(index + 1);
        }
    }

    /// Drop all frames, buffers and the texture, returning the sequence to
    /// its unloaded state. Cancels any active threaded load first.
    /// Idempotent, always safe.
    pub fn unload(&mut self) {
        if let Some(mut loader) = self.loader.take() {
            loader.cancel();
        }
        self.store.clear();
        if let Some(texture) = self.texture.take() {
            self.textures.release(texture);
        }
        self.spec = None;
        self.loaded = false;
        self.width = 0;
        self.height = 0;
        self.current_frame = 0;
        self.last_decoded = -1;
    }

    /// Decode one frame ahead of use and show it on the shared texture.
    ///
    /// No-op when the frame is already displayed; a logged no-op when the
    /// index is out of bounds. A failed decode leaves the previously
    /// displayed texture untouched.
    pub fn load_frame(&mut self, index: i32) {
        if index >= 0 && self.last_decoded == index {
            return;
        }

        let total = self.store.len();
        if index < 0 || index as usize >= total {
            warn!("frame index {} out of range (sequence has {} frames)", index, total);
            return;
        }
        let index = index as usize;

        let Some(frame) = self.store.entry(index) else {
            return;
        };
        if let Err(source) = frame.ensure_decoded(&*self.decoder, self.kind) {
            warn!("{}", SequenceError::Decode {
                index,
                path: frame.path().to_path_buf(),
                source,
            });
        }
        if frame.decode_failed() {
            return;
        }
        if let Some(buffer) = frame.buffer() {
            self.texture = Some(self.textures.upload(&buffer, self.texture, self.filter));
            self.last_decoded = index as i32;
        }
    }

    // ----- playback addressing -----

    /// Map a percent of duration to a frame index. Values outside `[0, 1]`
    /// wrap by their fractional part, negative values included, so -0.25
    /// addresses like 0.75.
    pub fn frame_index_at_percent(&self, percent: f32) -> usize {
        let total = self.total_frames();
        if total == 0 {
            return 0;
        }
        let mut p = percent;
        if !(0.0..=1.0).contains(&p) {
            p -= p.floor();
        }
        ((p * total as f32) as usize).min(total - 1)
    }

    /// Linear map of a frame index onto `[0, 1]`, clamped.
    pub fn percent_at_frame_index(&self, index: i32) -> f32 {
        let total = self.total_frames();
        if total <= 1 {
            return 0.0;
        }
        (index as f32 / (total - 1) as f32).clamp(0.0, 1.0)
    }

    /// Move the cursor to `index` (wrapped modulo the frame count) and
    /// decode that frame on demand. Reported no-op when the sequence is not
    /// loaded or `index` is negative.
    pub fn set_frame(&mut self, index: i32) {
        if !self.loaded {
            warn!("set_frame called on an unloaded sequence");
            return;
        }
        if index < 0 {
            warn!("set_frame called with negative index {}", index);
            return;
        }

        let index = index % self.total_frames() as i32;
        self.load_frame(index);
        self.current_frame = index as usize;
    }

    /// Move the cursor to the frame at `time` seconds, per the frame rate.
    pub fn set_frame_for_time(&mut self, time: f32) {
        let total_time = self.total_frames() as f32 / self.frame_rate;
        self.set_frame_at_percent(time / total_time);
    }

    /// Move the cursor to the frame at a percent of duration.
    pub fn set_frame_at_percent(&mut self, percent: f32) {
        self.set_frame(self.frame_index_at_percent(percent) as i32);
    }

    // ----- accessors -----

    /// The shared display texture, reflecting the last successfully decoded
    /// frame. Never cleared just because a later decode failed.
    pub fn texture(&self) -> Option<&TextureHandle> {
        self.texture.as_ref()
    }

    pub fn texture_for_frame(&mut self, index: i32) -> Option<&TextureHandle> {
        self.set_frame(index);
        self.texture()
    }

    pub fn texture_for_time(&mut self, time: f32) -> Option<&TextureHandle> {
        self.set_frame_for_time(time);
        self.texture()
    }

    pub fn texture_for_percent(&mut self, percent: f32) -> Option<&TextureHandle> {
        self.set_frame_at_percent(percent);
        self.texture()
    }

    fn displayed_pixels(&self) -> Option<PixelBuffer> {
        if self.last_decoded < 0 {
            return None;
        }
        self.store.entry(self.last_decoded as usize).and_then(|f| f.buffer())
    }

    pub fn pixels_for_frame(&mut self, index: i32) -> Option<PixelBuffer> {
        self.set_frame(index);
        self.displayed_pixels()
    }

    pub fn pixels_for_time(&mut self, time: f32) -> Option<PixelBuffer> {
        self.set_frame_for_time(time);
        self.displayed_pixels()
    }

    pub fn pixels_for_percent(&mut self, percent: f32) -> Option<PixelBuffer> {
        self.set_frame_at_percent(percent);
        self.displayed_pixels()
    }

    // ----- queries -----

    pub fn total_frames(&self) -> usize {
        self.store.len()
    }

    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    /// Sequence duration in seconds at the configured frame rate.
    pub fn length_in_seconds(&self) -> f32 {
        self.total_frames() as f32 / self.frame_rate
    }

    pub fn frame_rate(&self) -> f32 {
        self.frame_rate
    }

    /// Source path of a frame. Logged no-op (None) when out of range.
    pub fn file_path(&self, index: usize) -> Option<PathBuf> {
        let total = self.store.len();
        if index >= total {
            warn!("{}", SequenceError::OutOfRange { index, len: total });
            return None;
        }
        self.store.entry(index).map(|f| f.path().to_path_buf())
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// True while a background worker is resolving or decoding.
    pub fn is_loading(&self) -> bool {
        self.loader.as_ref().is_some_and(|l| l.is_running())
    }

    /// Load progress as a fraction. 1.0 once loaded, otherwise frames
    /// processed over frame count; a cancelled preload stays frozen at its
    /// partial fraction until unload.
    pub fn percent_loaded(&self) -> f32 {
        if self.loaded {
            return 1.0;
        }
        let total = self.store.len();
        if total == 0 {
            return 0.0;
        }
        self.store.processed() as f32 / total as f32
    }

    /// Width of the sequence, from frame 0's buffer. 0 before any decode.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Indices of frames that failed to decode this session.
    pub fn failed_frames(&self) -> Vec<usize> {
        self.store
            .entries()
            .iter()
            .enumerate()
            .filter(|(_, f)| f.decode_failed())
            .map(|(i, _)| i)
            .collect()
    }

    /// The spec the current (or pending) load was resolved from.
    pub fn spec(&self) -> Option<&SequenceSpec> {
        self.spec.as_ref()
    }
}

impl Default for ImageSequence {
    fn default() -> Self {
        Self::new(PixelKind::Byte)
    }
}

impl Drop for ImageSequence {
    fn drop(&mut self) {
        // Joins any active worker before cache state goes away.
        self.unload();
    }
}
