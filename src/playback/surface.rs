use std::path::PathBuf;

use anyhow::Context;

use crate::foundation::core::FrameRGBA;
use crate::foundation::error::{PlayerError, PlayerResult};

/// Display target for composited frames.
pub trait Surface {
    /// Draw a canvas-sized bitmap, replacing whatever was shown before.
    fn blit(&mut self, frame: &FrameRGBA) -> PlayerResult<()>;
    /// Output dimensions changed. The scheduler re-blits the current frame afterwards.
    fn resize(&mut self, width: u32, height: u32) -> PlayerResult<()>;
}

/// Surface that discards everything.
#[derive(Debug, Default)]
pub struct NullSurface;

impl Surface for NullSurface {
    fn blit(&mut self, _frame: &FrameRGBA) -> PlayerResult<()> {
        Ok(())
    }

    fn resize(&mut self, _width: u32, _height: u32) -> PlayerResult<()> {
        Ok(())
    }
}

/// In-memory surface for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySurface {
    size: Option<(u32, u32)>,
    blits: Vec<FrameRGBA>,
    resizes: Vec<(u32, u32)>,
}

impl InMemorySurface {
    /// Create an empty surface.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every bitmap blitted so far, oldest first.
    pub fn blits(&self) -> &[FrameRGBA] {
        &self.blits
    }

    /// Most recent bitmap.
    pub fn last(&self) -> Option<&FrameRGBA> {
        self.blits.last()
    }

    /// Every resize received, oldest first.
    pub fn resizes(&self) -> &[(u32, u32)] {
        &self.resizes
    }

    /// Current output size, if a resize has been received.
    pub fn size(&self) -> Option<(u32, u32)> {
        self.size
    }

    /// Forget recorded blits and resizes.
    pub fn clear(&mut self) {
        self.blits.clear();
        self.resizes.clear();
    }
}

impl Surface for InMemorySurface {
    fn blit(&mut self, frame: &FrameRGBA) -> PlayerResult<()> {
        self.blits.push(frame.clone());
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) -> PlayerResult<()> {
        self.size = Some((width, height));
        self.resizes.push((width, height));
        Ok(())
    }
}

/// Writes every blit to `<dir>/blit_NNNNN.png`.
#[derive(Debug)]
pub struct PngSequenceSurface {
    dir: PathBuf,
    written: usize,
}

impl PngSequenceSurface {
    /// Create the output directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> PlayerResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("create output dir '{}'", dir.display()))?;
        Ok(Self { dir, written: 0 })
    }

    /// Number of PNGs written so far.
    pub fn written(&self) -> usize {
        self.written
    }
}

impl Surface for PngSequenceSurface {
    fn blit(&mut self, frame: &FrameRGBA) -> PlayerResult<()> {
        let path = self.dir.join(format!("blit_{:05}.png", self.written));
        write_png(&path, frame)?;
        self.written += 1;
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) -> PlayerResult<()> {
        if width == 0 || height == 0 {
            return Err(PlayerError::surface(format!(
                "cannot write {width}x{height} PNGs"
            )));
        }
        Ok(())
    }
}

/// Write one bitmap as an RGBA PNG.
pub fn write_png(path: &std::path::Path, frame: &FrameRGBA) -> PlayerResult<()> {
    image::save_buffer_with_format(
        path,
        &frame.data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", path.display()))?;
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/playback/surface.rs"]
mod tests;
