//! Image decoding collaborator
//!
//! Decoding is a seam: the engine calls [`FrameDecoder`] and never touches
//! file formats itself. The default [`ImageDecoder`] is backed by the
//! `image` crate and converts every file to RGBA at the sequence's pixel
//! kind. Implementations must be safe to call from the background worker
//! (`Send + Sync`, no GPU work).

use log::debug;
use std::path::Path;

use crate::error::DecodeError;
use crate::frame::{PixelBuffer, PixelData, PixelKind};

/// Decodes one image file into a pixel buffer.
pub trait FrameDecoder: Send + Sync {
    fn decode(&self, path: &Path, kind: PixelKind) -> Result<PixelBuffer, DecodeError>;
}

/// Default decoder backed by the `image` crate (PNG, JPEG, TIFF, TGA).
#[derive(Debug, Default)]
pub struct ImageDecoder;

impl FrameDecoder for ImageDecoder {
    fn decode(&self, path: &Path, kind: PixelKind) -> Result<PixelBuffer, DecodeError> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase())
            .unwrap_or_default();

        if !matches!(ext.as_str(), "png" | "jpg" | "jpeg" | "tif" | "tiff" | "tga") {
            return Err(DecodeError::Unsupported(format!(".{}", ext)));
        }

        debug!("decoding {}", path.display());
        let img = image::open(path).map_err(|e| match e {
            image::ImageError::IoError(io) => DecodeError::Open(io.to_string()),
            other => DecodeError::Decode(other.to_string()),
        })?;

        let width = img.width() as usize;
        let height = img.height() as usize;
        let data = match kind {
            PixelKind::Byte => PixelData::U8(img.to_rgba8().into_raw()),
            PixelKind::Short => PixelData::U16(img.to_rgba16().into_raw()),
            PixelKind::Float => PixelData::F32(img.to_rgba32f().into_raw()),
        };

        Ok(PixelBuffer::new(width, height, data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn unknown_extension_is_unsupported() {
        let err = ImageDecoder
            .decode(Path::new("frame.webm"), PixelKind::Byte)
            .unwrap_err();
        assert!(matches!(err, DecodeError::Unsupported(_)));
    }

    #[test]
    fn missing_file_is_an_open_error() {
        let err = ImageDecoder
            .decode(&PathBuf::from("/nonexistent/frame.png"), PixelKind::Byte)
            .unwrap_err();
        assert!(matches!(err, DecodeError::Open(_)));
    }
}
