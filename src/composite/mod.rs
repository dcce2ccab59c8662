//! Disposal-correct compositing of logical frames into full-canvas bitmaps.

pub(crate) mod compositor;

pub use compositor::{
    CompositeThreading, CompositedFrame, FrameCompositor, composite, composite_with,
};
