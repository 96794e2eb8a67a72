//! Per-frame pixel storage
//!
//! A sequence owns one [`Frame`] per discovered file. Each frame keeps its
//! source path (immutable) and a lazily filled slot holding the decoded
//! buffer and a failure flag. The slot sits behind `Arc<Mutex<..>>` so the
//! background loader can decode while the owning side holds cheap clones.
//!
//! Decode discipline: at most one decode attempt per frame per load session.
//! A successful decode sets the buffer once; it is never cleared
//! individually (only a whole-sequence unload drops frames). A failed decode
//! marks the frame unavailable for the rest of the session.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::decode::FrameDecoder;
use crate::error::DecodeError;

/// Pixel element kind for a sequence, chosen at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelKind {
    /// 8-bit RGBA
    Byte,
    /// 16-bit RGBA
    Short,
    /// 32-bit float RGBA
    Float,
}

/// Decoded pixel payload, RGBA row-major.
#[derive(Debug, Clone, PartialEq)]
pub enum PixelData {
    U8(Vec<u8>),
    U16(Vec<u16>),
    F32(Vec<f32>),
}

/// A decoded image: dimensions plus the pixel payload.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    data: PixelData,
}

impl PixelBuffer {
    pub fn new(width: usize, height: usize, data: PixelData) -> Self {
        Self { width, height, data }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn kind(&self) -> PixelKind {
        match self.data {
            PixelData::U8(_) => PixelKind::Byte,
            PixelData::U16(_) => PixelKind::Short,
            PixelData::F32(_) => PixelKind::Float,
        }
    }

    pub fn data(&self) -> &PixelData {
        &self.data
    }

    /// Payload size in bytes.
    pub fn mem(&self) -> usize {
        match &self.data {
            PixelData::U8(v) => v.len(),
            PixelData::U16(v) => v.len() * 2,
            PixelData::F32(v) => v.len() * 4,
        }
    }
}

#[derive(Debug, Default)]
struct Slot {
    buffer: Option<PixelBuffer>,
    failed: bool,
}

/// One frame of a sequence: source path plus the lazily decoded buffer.
///
/// Cloning is cheap (the slot is shared). Exactly one side decodes at a
/// time: the background worker during a threaded preload, the owning side
/// otherwise. The sequence enforces that split.
#[derive(Debug, Clone)]
pub struct Frame {
    slot: Arc<Mutex<Slot>>,
    path: PathBuf,
}

impl Frame {
    pub fn new(path: PathBuf) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot::default())),
            path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_decoded(&self) -> bool {
        self.slot.lock().unwrap().buffer.is_some()
    }

    pub fn decode_failed(&self) -> bool {
        self.slot.lock().unwrap().failed
    }

    /// Decoded buffer, cloned out of the slot.
    pub fn buffer(&self) -> Option<PixelBuffer> {
        self.slot.lock().unwrap().buffer.clone()
    }

    /// Dimensions of the decoded buffer, if any.
    pub fn resolution(&self) -> Option<(usize, usize)> {
        let slot = self.slot.lock().unwrap();
        slot.buffer.as_ref().map(|b| (b.width(), b.height()))
    }

    /// Decode this frame through `decoder` unless it already has a buffer or
    /// already failed. Idempotent: repeat calls never re-decode.
    ///
    /// Returns `Err` only for a fresh failure; the caller decides how to
    /// report it. The failure is remembered and later calls return `Ok`.
    pub fn ensure_decoded(
        &self,
        decoder: &dyn FrameDecoder,
        kind: PixelKind,
    ) -> Result<(), DecodeError> {
        {
            let slot = self.slot.lock().unwrap();
            if slot.buffer.is_some() || slot.failed {
                return Ok(());
            }
        }

        // Decode outside the lock so readers are not held up by I/O.
        match decoder.decode(&self.path, kind) {
            Ok(buffer) => {
                let mut slot = self.slot.lock().unwrap();
                if slot.buffer.is_none() {
                    slot.buffer = Some(buffer);
                }
                Ok(())
            }
            Err(e) => {
                self.slot.lock().unwrap().failed = true;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingDecoder {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingDecoder {
        fn new(fail: bool) -> Self {
            Self { calls: AtomicUsize::new(0), fail }
        }
    }

    impl FrameDecoder for CountingDecoder {
        fn decode(&self, _path: &Path, _kind: PixelKind) -> Result<PixelBuffer, DecodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(DecodeError::Decode("synthetic failure".into()))
            } else {
                Ok(PixelBuffer::new(2, 2, PixelData::U8(vec![0; 2 * 2 * 4])))
            }
        }
    }

    #[test]
    fn new_frame_is_undecoded() {
        let frame = Frame::new(PathBuf::from("img0.png"));
        assert!(!frame.is_decoded());
        assert!(!frame.decode_failed());
        assert!(frame.buffer().is_none());
        assert_eq!(frame.path(), Path::new("img0.png"));
    }

    #[test]
    fn ensure_decoded_decodes_once() {
        let frame = Frame::new(PathBuf::from("img0.png"));
        let decoder = CountingDecoder::new(false);

        frame.ensure_decoded(&decoder, PixelKind::Byte).unwrap();
        frame.ensure_decoded(&decoder, PixelKind::Byte).unwrap();

        assert_eq!(decoder.calls.load(Ordering::SeqCst), 1);
        assert!(frame.is_decoded());
        assert_eq!(frame.resolution(), Some((2, 2)));
    }

    #[test]
    fn failed_decode_is_not_retried() {
        let frame = Frame::new(PathBuf::from("img0.png"));
        let decoder = CountingDecoder::new(true);

        assert!(frame.ensure_decoded(&decoder, PixelKind::Byte).is_err());
        assert!(frame.decode_failed());

        // Second call reports nothing and does not decode again.
        assert!(frame.ensure_decoded(&decoder, PixelKind::Byte).is_ok());
        assert_eq!(decoder.calls.load(Ordering::SeqCst), 1);
        assert!(!frame.is_decoded());
    }

    #[test]
    fn buffer_mem_by_kind() {
        let px = 4 * 3 * 4; // rgba elements
        assert_eq!(PixelBuffer::new(4, 3, PixelData::U8(vec![0; px])).mem(), px);
        assert_eq!(PixelBuffer::new(4, 3, PixelData::U16(vec![0; px])).mem(), px * 2);
        assert_eq!(PixelBuffer::new(4, 3, PixelData::F32(vec![0.0; px])).mem(), px * 4);
        assert_eq!(PixelBuffer::new(4, 3, PixelData::U16(vec![0; px])).kind(), PixelKind::Short);
    }
}
