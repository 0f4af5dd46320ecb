use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::io;

#[derive(Debug)]
pub enum ApngError {
    IoError(io::Error),
    EmptyBuffer,
    InvalidSignature,
    MissingHeader,
    UnsupportedFormat(String),
    TruncatedChunk {
        offset: usize,
        declared: usize,
        available: usize,
    },
    CorruptChunk {
        chunk: String,
        reason: String,
    },
    InflateFailure(io::Error),
    FrameOutOfBounds {
        frame: usize,
        x_offset: u32,
        y_offset: u32,
        width: u32,
        height: u32,
        canvas_width: u32,
        canvas_height: u32,
    },
    FrameIndexOutOfRange {
        index: usize,
        frame_count: usize,
    },
    UseAfterDispose,
    InvalidArgument(String),
}

impl ApngError {
    pub(crate) fn corrupt(chunk: impl Into<String>, reason: impl Into<String>) -> Self {
        ApngError::CorruptChunk {
            chunk: chunk.into(),
            reason: reason.into(),
        }
    }

    /// Errors produced while turning bytes into an `AnimationSequence`.
    pub fn is_decode_error(&self) -> bool {
        !matches!(
            self,
            ApngError::FrameIndexOutOfRange { .. }
                | ApngError::UseAfterDispose
                | ApngError::InvalidArgument(_)
                | ApngError::IoError(_)
        )
    }
}

impl Error for ApngError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ApngError::IoError(err) => Some(err),
            ApngError::InflateFailure(err) => Some(err),
            _ => None,
        }
    }
}

impl Display for ApngError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ApngError::IoError(err) => write!(f, "I/O error: {}", err),
            ApngError::EmptyBuffer => write!(f, "Input buffer is empty"),
            ApngError::InvalidSignature => write!(f, "Input does not start with the PNG signature"),
            ApngError::MissingHeader => write!(f, "First chunk is not an IHDR header"),
            ApngError::UnsupportedFormat(format) => write!(f, "Unsupported image format: {}", format),
            ApngError::TruncatedChunk { offset, declared, available } => write!(
                f,
                "Chunk at offset {} declares {} bytes but only {} are available",
                offset, declared, available
            ),
            ApngError::CorruptChunk { chunk, reason } => write!(f, "Corrupt {} chunk: {}", chunk, reason),
            ApngError::InflateFailure(err) => write!(f, "Failed to inflate image data: {}", err),
            ApngError::FrameOutOfBounds {
                frame,
                x_offset,
                y_offset,
                width,
                height,
                canvas_width,
                canvas_height,
            } => write!(
                f,
                "Frame {} region {}x{} at ({}, {}) exceeds the {}x{} canvas",
                frame, width, height, x_offset, y_offset, canvas_width, canvas_height
            ),
            ApngError::FrameIndexOutOfRange { index, frame_count } => write!(
                f,
                "Frame index out of range, expecting 0 to {}, got {}",
                frame_count.saturating_sub(1),
                index
            ),
            ApngError::UseAfterDispose => write!(f, "Playback engine used after dispose"),
            ApngError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
        }
    }
}

impl From<io::Error> for ApngError {
    fn from(error: io::Error) -> Self {
        ApngError::IoError(error)
    }
}

// Result type alias for decode and playback operations
pub type ApngResult<T> = Result<T, ApngError>;
