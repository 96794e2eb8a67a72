//! Error types for sequence loading and decoding

use std::fmt;
use std::path::PathBuf;

/// Errors produced by a [`FrameDecoder`](crate::decode::FrameDecoder) collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The file could not be opened or read.
    Open(String),
    /// The file was read but could not be decoded.
    Decode(String),
    /// The file extension is not handled by this decoder.
    Unsupported(String),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Open(e) => write!(f, "open error: {}", e),
            DecodeError::Decode(e) => write!(f, "decode error: {}", e),
            DecodeError::Unsupported(e) => write!(f, "unsupported format: {}", e),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Errors produced by the sequence engine.
///
/// Structural variants (`EmptyRange`, `FolderNotFound`, `EmptyDirectory`,
/// and an empty-sequence `OutOfRange`) abort a load and leave the sequence
/// unloaded. `Decode` is recoverable per frame. `UsageOrder` and the
/// in-bounds `OutOfRange` are logged and the offending call is a no-op.
#[derive(Debug)]
pub enum SequenceError {
    /// Explicit range with `end < start`.
    EmptyRange { start: i32, end: i32 },
    /// Folder-scan load on a directory that does not exist.
    FolderNotFound(PathBuf),
    /// Folder exists but no file matched the extension filter.
    EmptyDirectory(PathBuf),
    /// A single frame failed to decode; the frame stays unavailable for the session.
    Decode {
        index: usize,
        path: PathBuf,
        source: DecodeError,
    },
    /// Configuration changed after a load started.
    UsageOrder(&'static str),
    /// Frame index outside `[0, len)`, or a finalize attempt on an empty sequence.
    OutOfRange { index: usize, len: usize },
}

impl fmt::Display for SequenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SequenceError::EmptyRange { start, end } => {
                write!(f, "empty frame range: start {} > end {}", start, end)
            }
            SequenceError::FolderNotFound(path) => {
                write!(f, "folder not found: {}", path.display())
            }
            SequenceError::EmptyDirectory(path) => {
                write!(f, "no matching files in {}", path.display())
            }
            SequenceError::Decode { index, path, source } => {
                write!(f, "frame {} failed to decode ({}): {}", index, path.display(), source)
            }
            SequenceError::UsageOrder(msg) => write!(f, "usage error: {}", msg),
            SequenceError::OutOfRange { index, len } => {
                write!(f, "frame index {} out of range (sequence has {} frames)", index, len)
            }
        }
    }
}

impl std::error::Error for SequenceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SequenceError::Decode { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_context() {
        let e = SequenceError::EmptyRange { start: 10, end: 8 };
        assert!(e.to_string().contains("10"));
        assert!(e.to_string().contains("8"));

        let e = SequenceError::Decode {
            index: 4,
            path: PathBuf::from("img4.png"),
            source: DecodeError::Decode("bad header".into()),
        };
        let msg = e.to_string();
        assert!(msg.contains("frame 4"));
        assert!(msg.contains("img4.png"));
        assert!(msg.contains("bad header"));
    }

    #[test]
    fn decode_source_is_exposed() {
        let e = SequenceError::Decode {
            index: 0,
            path: PathBuf::from("a.png"),
            source: DecodeError::Open("missing".into()),
        };
        assert!(std::error::Error::source(&e).is_some());
        assert!(std::error::Error::source(&SequenceError::UsageOrder("x")).is_none());
    }
}
