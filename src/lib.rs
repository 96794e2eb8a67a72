//! flipbook - image sequence playback engine
//!
//! Plays a directory (or explicit numeric range) of still images like frames
//! of a movie: lazy per-frame decoding into a retained cache, an optional
//! background preloading worker with cooperative cancellation, a single
//! shared display texture, and frame/time/percent addressing.

pub mod cli;
pub mod decode;
pub mod error;
pub mod frame;
pub mod index;
pub mod loader;
pub mod sequence;
pub mod textures;

pub use decode::{FrameDecoder, ImageDecoder};
pub use error::{DecodeError, SequenceError};
pub use frame::{Frame, PixelBuffer, PixelData, PixelKind};
pub use index::{DirLister, FsDirLister, SequenceSpec};
pub use loader::SequenceLoader;
pub use sequence::ImageSequence;
pub use textures::{FilterMode, SoftwareTextures, TextureFilter, TextureHandle, TextureUploader};
