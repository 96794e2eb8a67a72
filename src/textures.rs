//! Texture upload collaborator
//!
//! The sequence displays through a single mutable texture slot that is
//! re-uploaded whenever the current frame changes. Decoded buffers (one per
//! frame, retained for the session) and the displayed texture (one, reused)
//! have deliberately different lifetimes; the slot bounds GPU memory for the
//! display path no matter how long the sequence is.
//!
//! Uploads go through [`TextureUploader`] and must only ever happen on the
//! execution context that owns the GPU resources. The default
//! [`SoftwareTextures`] backend keeps the engine fully functional headless
//! and lets tests observe upload traffic.

use serde::{Deserialize, Serialize};

use crate::frame::PixelBuffer;

/// Filtering mode for the display texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterMode {
    Nearest,
    Linear,
}

/// Minification/magnification filter pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureFilter {
    pub min: FilterMode,
    pub mag: FilterMode,
}

impl Default for TextureFilter {
    fn default() -> Self {
        Self { min: FilterMode::Linear, mag: FilterMode::Linear }
    }
}

/// Opaque handle to an uploaded texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureHandle {
    pub id: u64,
    pub width: usize,
    pub height: usize,
}

/// Uploads pixel buffers into textures. Caller-context only.
pub trait TextureUploader {
    /// Upload `buffer`, reusing the slot of `existing` when given.
    fn upload(
        &mut self,
        buffer: &PixelBuffer,
        existing: Option<TextureHandle>,
        filter: TextureFilter,
    ) -> TextureHandle;

    /// Re-apply filtering to an already uploaded texture.
    fn apply_filter(&mut self, handle: TextureHandle, filter: TextureFilter);

    /// Release a texture.
    fn release(&mut self, handle: TextureHandle);
}

/// CPU-side uploader: tracks slots and upload counts without a GPU.
#[derive(Debug, Default)]
pub struct SoftwareTextures {
    next_id: u64,
    uploads: u64,
}

impl SoftwareTextures {
    /// Total uploads performed, across all slots.
    pub fn uploads(&self) -> u64 {
        self.uploads
    }
}

impl TextureUploader for SoftwareTextures {
    fn upload(
        &mut self,
        buffer: &PixelBuffer,
        existing: Option<TextureHandle>,
        _filter: TextureFilter,
    ) -> TextureHandle {
        self.uploads += 1;
        let id = existing.map(|t| t.id).unwrap_or_else(|| {
            self.next_id += 1;
            self.next_id
        });
        TextureHandle { id, width: buffer.width(), height: buffer.height() }
    }

    fn apply_filter(&mut self, _handle: TextureHandle, _filter: TextureFilter) {}

    fn release(&mut self, _handle: TextureHandle) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::PixelData;

    #[test]
    fn upload_reuses_the_existing_slot() {
        let mut tex = SoftwareTextures::default();
        let a = PixelBuffer::new(4, 4, PixelData::U8(vec![0; 4 * 4 * 4]));
        let b = PixelBuffer::new(8, 2, PixelData::U8(vec![0; 8 * 2 * 4]));

        let first = tex.upload(&a, None, TextureFilter::default());
        let second = tex.upload(&b, Some(first), TextureFilter::default());

        assert_eq!(first.id, second.id);
        assert_eq!(second.width, 8);
        assert_eq!(tex.uploads(), 2);

        let third = tex.upload(&a, None, TextureFilter::default());
        assert_ne!(third.id, first.id);
    }
}
