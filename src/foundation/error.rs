use crate::foundation::core::{Canvas, FrameBounds};

/// Convenience result type used across the player.
pub type PlayerResult<T> = Result<T, PlayerError>;

/// Malformations detected while parsing a GIF byte stream.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The stream does not start with `GIF87a` or `GIF89a`.
    #[error("bad signature: expected GIF87a or GIF89a")]
    BadSignature,

    /// The stream ended in the middle of a block.
    #[error("truncated stream while reading {context}")]
    Truncated {
        /// What was being read when the bytes ran out.
        context: &'static str,
    },

    /// A block was fully present but its declared layout is invalid.
    #[error("malformed {context}")]
    MalformedBlock {
        /// Which block.
        context: &'static str,
    },

    /// A top-level block introducer that is neither an extension, an image nor the trailer.
    #[error("unknown block introducer 0x{byte:02x} at offset {offset}")]
    UnknownBlock {
        /// Offending byte.
        byte: u8,
        /// Byte offset in the stream.
        offset: usize,
    },

    /// An LZW code referenced a dictionary entry that does not exist yet.
    #[error("invalid LZW code {code} (next free code is {next})")]
    InvalidCode {
        /// Code read from the stream.
        code: u16,
        /// First unassigned dictionary slot at that point.
        next: u16,
    },

    /// The image data declares a minimum code size outside `1..=8`.
    #[error("unsupported color depth: minimum LZW code size {min_code_size}")]
    UnsupportedColorDepth {
        /// Declared minimum code size.
        min_code_size: u8,
    },

    /// Decompression produced a different number of indices than the frame declares.
    #[error("decompressed {actual} pixel indices, frame declares {expected}")]
    PixelCountMismatch {
        /// `width * height` from the image descriptor.
        expected: usize,
        /// Indices actually produced.
        actual: usize,
    },

    /// A frame has neither a local nor a global color table.
    #[error("frame {frame} has no color table")]
    MissingColorTable {
        /// Zero-based frame index in stream order.
        frame: usize,
    },

    /// The canvas or a frame exceeds the configured pixel limit.
    #[error("image of {pixels} pixels exceeds limit of {limit}")]
    ImageTooLarge {
        /// Requested pixel count.
        pixels: u64,
        /// Configured limit.
        limit: u64,
    },

    /// The stream is well-formed but contains no image.
    #[error("stream contains no frames")]
    NoFrames,
}

/// Failures while compositing logical frames onto the canvas.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CompositeError {
    /// A frame's rectangle leaves the canvas. Frames are never clipped.
    #[error("frame {frame} bounds {bounds:?} exceed canvas {canvas:?}")]
    OutOfBounds {
        /// Zero-based frame index.
        frame: usize,
        /// Declared frame rectangle.
        bounds: FrameBounds,
        /// Canvas the frame was placed on.
        canvas: Canvas,
    },

    /// A frame's index buffer does not match `bounds.width * bounds.height`.
    #[error("frame {frame} carries {actual} pixel indices, bounds require {expected}")]
    PatchSizeMismatch {
        /// Zero-based frame index.
        frame: usize,
        /// Length implied by the bounds.
        expected: usize,
        /// Length of `pixel_indices`.
        actual: usize,
    },
}

/// Transport failures while obtaining source bytes.
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    /// The byte source has nothing under this locator.
    #[error("source not found: {locator}")]
    NotFound {
        /// Locator that was requested.
        locator: String,
    },

    /// The locator cannot name anything inside the source.
    #[error("invalid locator '{locator}': {reason}")]
    InvalidLocator {
        /// Locator that was requested.
        locator: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// IO failure while reading the source.
    #[error("io error reading '{locator}': {source}")]
    Io {
        /// Locator that was requested.
        locator: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// Top-level error taxonomy used by player APIs.
#[derive(thiserror::Error, Debug)]
pub enum PlayerError {
    /// Fetching the source bytes failed.
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// The source bytes are not a well-formed animation.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// A decoded frame could not be placed on the canvas.
    #[error("composite error: {0}")]
    Composite(#[from] CompositeError),

    /// Invalid player configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Data handed to the player violates an invariant (e.g. an empty frame set).
    #[error("validation error: {0}")]
    Validation(String),

    /// The display surface rejected an operation.
    #[error("surface error: {0}")]
    Surface(String),

    /// The clock violated its contract (e.g. time went backwards).
    #[error("clock error: {0}")]
    Clock(String),

    /// The background decode worker failed outside of decoding itself.
    #[error("worker error: {0}")]
    Worker(String),

    /// The load was superseded or the player was torn down.
    #[error("load cancelled")]
    Cancelled,

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PlayerError {
    /// Build a [`PlayerError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a [`PlayerError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`PlayerError::Surface`] value.
    pub fn surface(msg: impl Into<String>) -> Self {
        Self::Surface(msg.into())
    }

    /// Build a [`PlayerError::Clock`] value.
    pub fn clock(msg: impl Into<String>) -> Self {
        Self::Clock(msg.into())
    }

    /// Build a [`PlayerError::Worker`] value.
    pub fn worker(msg: impl Into<String>) -> Self {
        Self::Worker(msg.into())
    }

    /// Whether this error came from the source bytes themselves (decode or composite).
    pub fn is_malformed_source(&self) -> bool {
        matches!(self, Self::Decode(_) | Self::Composite(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
