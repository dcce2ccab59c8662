use rayon::prelude::*;

use crate::{
    decode::{DisposalMethod, LogicalFrame},
    foundation::core::{Canvas, FrameBounds, FrameRGBA},
    foundation::error::{CompositeError, PlayerError, PlayerResult},
};

/// A canvas-sized bitmap ready to display, paired with how long it stays visible.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompositedFrame {
    /// Full-canvas straight-alpha RGBA8 pixels.
    pub bitmap: FrameRGBA,
    /// Display time in milliseconds. Zero advances on the next tick.
    pub delay_ms: u32,
}

/// Disposal owed by the previously drawn frame, applied before the next one is drawn.
#[derive(Debug)]
enum PendingDisposal {
    Clear(FrameBounds),
    Restore { bounds: FrameBounds, saved: Vec<u8> },
}

/// Streaming compositor: feed logical frames in stream order and get one full-canvas bitmap
/// per frame.
///
/// The accumulation bitmap starts fully transparent. Every emitted [`CompositedFrame`] owns a
/// copy of it, so later disposals never alter a bitmap already handed out.
#[derive(Debug)]
pub struct FrameCompositor {
    canvas: Canvas,
    accum: Vec<u8>,
    pending: Option<PendingDisposal>,
    index: usize,
}

impl FrameCompositor {
    /// New compositor over a transparent canvas.
    pub fn new(canvas: Canvas) -> Self {
        Self {
            canvas,
            accum: vec![0; canvas.rgba_len()],
            pending: None,
            index: 0,
        }
    }

    /// Canvas being composited onto.
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Number of frames composited so far.
    pub fn frames_composited(&self) -> usize {
        self.index
    }

    /// Composite the next frame. On error the compositor state is unchanged.
    pub fn push(&mut self, frame: &LogicalFrame) -> Result<CompositedFrame, CompositeError> {
        let patch = expand_patch(self.index, self.canvas, frame)?;
        Ok(self.push_patch(frame, &patch))
    }

    fn push_patch(&mut self, frame: &LogicalFrame, patch: &[u8]) -> CompositedFrame {
        let bounds = frame.bounds;

        match self.pending.take() {
            Some(PendingDisposal::Clear(prev)) => {
                tracing::debug!(frame = self.index, ?prev, "restore to background");
                self.clear_region(prev);
            }
            Some(PendingDisposal::Restore { bounds: prev, saved }) => {
                tracing::debug!(frame = self.index, ?prev, "restore to previous");
                self.write_region(prev, &saved);
            }
            None => {}
        }

        let saved = (frame.disposal == DisposalMethod::RestoreToPrevious)
            .then(|| self.read_region(bounds));

        self.draw_patch(bounds, patch);

        self.pending = match frame.disposal {
            DisposalMethod::RestoreToBackground => Some(PendingDisposal::Clear(bounds)),
            DisposalMethod::RestoreToPrevious => saved.map(|saved| PendingDisposal::Restore {
                bounds,
                saved,
            }),
            DisposalMethod::None | DisposalMethod::DoNotDispose => None,
        };
        self.index += 1;

        CompositedFrame {
            bitmap: FrameRGBA {
                width: self.canvas.width,
                height: self.canvas.height,
                data: self.accum.clone(),
            },
            delay_ms: frame.delay_ms,
        }
    }

    fn row_range(&self, bounds: FrameBounds, row: u32) -> std::ops::Range<usize> {
        let stride = self.canvas.width as usize * 4;
        let start = (bounds.top + row) as usize * stride + bounds.left as usize * 4;
        start..start + bounds.width as usize * 4
    }

    fn read_region(&self, bounds: FrameBounds) -> Vec<u8> {
        let mut out = Vec::with_capacity(bounds.pixel_count() * 4);
        for row in 0..bounds.height {
            out.extend_from_slice(&self.accum[self.row_range(bounds, row)]);
        }
        out
    }

    fn write_region(&mut self, bounds: FrameBounds, pixels: &[u8]) {
        let row_len = bounds.width as usize * 4;
        if row_len == 0 {
            return;
        }
        for (row, src) in (0..bounds.height).zip(pixels.chunks_exact(row_len)) {
            let range = self.row_range(bounds, row);
            self.accum[range].copy_from_slice(src);
        }
    }

    fn clear_region(&mut self, bounds: FrameBounds) {
        for row in 0..bounds.height {
            let range = self.row_range(bounds, row);
            self.accum[range].fill(0);
        }
    }

    /// Opaque patch pixels overwrite the canvas; transparent ones leave it showing through.
    fn draw_patch(&mut self, bounds: FrameBounds, patch: &[u8]) {
        let row_len = bounds.width as usize * 4;
        if row_len == 0 {
            return;
        }
        for (row, src) in (0..bounds.height).zip(patch.chunks_exact(row_len)) {
            let range = self.row_range(bounds, row);
            for (dst, px) in self.accum[range]
                .chunks_exact_mut(4)
                .zip(src.chunks_exact(4))
            {
                if px[3] != 0 {
                    dst.copy_from_slice(px);
                }
            }
        }
    }
}

/// Validate a frame against the canvas and translate its indices to RGBA.
///
/// The transparent index and indices past the end of the color table become alpha 0; every
/// other index is opaque.
pub(crate) fn expand_patch(
    index: usize,
    canvas: Canvas,
    frame: &LogicalFrame,
) -> Result<Vec<u8>, CompositeError> {
    if !frame.bounds.fits_within(canvas) {
        return Err(CompositeError::OutOfBounds {
            frame: index,
            bounds: frame.bounds,
            canvas,
        });
    }
    let expected = frame.bounds.pixel_count();
    if frame.pixel_indices.len() != expected {
        return Err(CompositeError::PatchSizeMismatch {
            frame: index,
            expected,
            actual: frame.pixel_indices.len(),
        });
    }

    let mut patch = Vec::with_capacity(expected * 4);
    for &idx in &frame.pixel_indices {
        let rgba = match frame.color_table.get(idx) {
            Some([r, g, b]) if frame.transparent_index != Some(idx) => [r, g, b, 255],
            _ => [0; 4],
        };
        patch.extend_from_slice(&rgba);
    }
    Ok(patch)
}

/// Composite a whole sequence on the calling thread.
#[tracing::instrument(skip(frames), fields(frames = frames.len()))]
pub fn composite(
    canvas: Canvas,
    frames: &[LogicalFrame],
) -> Result<Vec<CompositedFrame>, CompositeError> {
    let mut compositor = FrameCompositor::new(canvas);
    frames.iter().map(|f| compositor.push(f)).collect()
}

/// Threading controls for [`composite_with`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompositeThreading {
    /// Expand palettes of all frames in parallel before the sequential disposal pass.
    pub parallel: bool,
    /// Optional explicit worker thread count.
    pub threads: Option<usize>,
}

/// Composite a whole sequence, optionally expanding palettes on a rayon pool.
///
/// Disposal is inherently sequential, so only the per-frame index-to-RGBA translation runs in
/// parallel. Output is identical to [`composite`], including which error is reported first.
#[tracing::instrument(skip(frames), fields(frames = frames.len()))]
pub fn composite_with(
    canvas: Canvas,
    frames: &[LogicalFrame],
    threading: &CompositeThreading,
) -> PlayerResult<Vec<CompositedFrame>> {
    if !threading.parallel {
        return Ok(composite(canvas, frames)?);
    }

    let pool = build_thread_pool(threading.threads)?;
    let patches: Vec<Result<Vec<u8>, CompositeError>> = pool.install(|| {
        frames
            .par_iter()
            .enumerate()
            .map(|(i, f)| expand_patch(i, canvas, f))
            .collect()
    });

    let mut compositor = FrameCompositor::new(canvas);
    let mut out = Vec::with_capacity(frames.len());
    for (frame, patch) in frames.iter().zip(patches) {
        out.push(compositor.push_patch(frame, &patch?));
    }
    Ok(out)
}

pub(crate) fn build_thread_pool(threads: Option<usize>) -> PlayerResult<rayon::ThreadPool> {
    if threads == Some(0) {
        return Err(PlayerError::config("'threads' must be >= 1 when set"));
    }
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| PlayerError::worker(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/composite/compositor.rs"]
mod tests;
