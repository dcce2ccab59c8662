use std::sync::Arc;

use crate::foundation::core::FrameBounds;

/// How a frame's region is treated before the next frame is drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisposalMethod {
    /// No disposal specified; the canvas is left as-is.
    #[default]
    None,
    /// Leave the frame in place; the next frame draws on top.
    DoNotDispose,
    /// Clear the frame's rectangle to transparent.
    RestoreToBackground,
    /// Put back what was under the frame's rectangle before it was drawn.
    RestoreToPrevious,
}

impl DisposalMethod {
    /// Map the 3-bit wire value. Reserved values 4..=7 behave like [`DisposalMethod::None`].
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Self::DoNotDispose,
            2 => Self::RestoreToBackground,
            3 => Self::RestoreToPrevious,
            0 => Self::None,
            other => {
                tracing::debug!(code = other, "reserved disposal code treated as none");
                Self::None
            }
        }
    }
}

/// Palette mapping indices to RGB triples.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColorTable {
    entries: Vec<[u8; 3]>,
}

impl ColorTable {
    /// Build a table from RGB triples.
    pub fn new(entries: Vec<[u8; 3]>) -> Self {
        Self { entries }
    }

    /// Build a table from packed `r, g, b, r, g, b, ...` bytes. A trailing partial triple is dropped.
    pub fn from_rgb_bytes(bytes: &[u8]) -> Self {
        Self {
            entries: bytes
                .chunks_exact(3)
                .map(|c| [c[0], c[1], c[2]])
                .collect(),
        }
    }

    /// Color for `index`, or `None` past the end of the table.
    pub fn get(&self, index: u8) -> Option<[u8; 3]> {
        self.entries.get(index as usize).copied()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One encoded animation frame as extracted from the stream.
///
/// Invariant: `pixel_indices.len() == bounds.width * bounds.height`, rows top to bottom.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogicalFrame {
    /// Row-major palette indices covering `bounds`.
    pub pixel_indices: Vec<u8>,
    /// Local color table if the frame has one, else the stream's global table.
    pub color_table: Arc<ColorTable>,
    /// Index drawn as "no color".
    pub transparent_index: Option<u8>,
    /// Disposal applied before the next frame is drawn.
    pub disposal: DisposalMethod,
    /// Time the frame stays visible, in milliseconds.
    pub delay_ms: u32,
    /// Placement within the canvas.
    pub bounds: FrameBounds,
}

/// Loop count declared by a NETSCAPE2.0 application extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopCount {
    /// Wire value 0.
    Infinite,
    /// Repeat this many times.
    Finite(u16),
}

impl LoopCount {
    pub(crate) fn from_wire(n: u16) -> Self {
        if n == 0 { Self::Infinite } else { Self::Finite(n) }
    }
}
