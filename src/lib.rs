//! Animated GIF decoding, disposal-correct compositing and tick-driven playback.
//!
//! # Pipeline overview
//!
//! 1. **Fetch**: a [`ByteSource`] turns a locator into raw bytes.
//! 2. **Decode**: [`GifDecoder`] lazily yields one [`LogicalFrame`] per image block
//!    (index buffer, palette, disposal, delay, placement).
//! 3. **Composite**: [`FrameCompositor`] applies each frame's disposal method to a persistent
//!    transparent canvas and emits one canvas-sized [`CompositedFrame`] per frame.
//! 4. **Play**: [`PlaybackScheduler`] advances through the frames on [`Clock`] ticks, at most
//!    one frame per tick, and hands the visible bitmap to a [`Surface`].
//!
//! [`Player`] ties the four together, optionally decoding on a background worker so that a
//! late result for a superseded load is dropped instead of overwriting a newer one.
//!
//! # Design constraints
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Strict decoding**: malformed streams, out-of-canvas frames and LZW errors fail the
//!   whole load. Nothing is clipped or partially shown.
//! - **Straight-alpha RGBA8** everywhere: transparent pixels are `[0, 0, 0, 0]`.
//! - **Host-driven time**: the scheduler never sleeps or spawns; the [`Clock`] decides when a
//!   tick is due.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod composite;
mod decode;
mod foundation;
mod load;
mod playback;
mod session;

pub use composite::{
    CompositeThreading, CompositedFrame, FrameCompositor, composite, composite_with,
};
pub use decode::{
    ColorTable, DecodeOpts, DecodedStream, DisposalMethod, GifDecoder, LogicalFrame, LoopCount,
    ScreenDescriptor, decode, decode_with,
};
pub use foundation::core::{Canvas, FrameBounds, FrameRGBA};
pub use foundation::error::{CompositeError, DecodeError, FetchError, PlayerError, PlayerResult};
pub use load::{ByteSource, FileSource, MemorySource, PlayerOpts, normalize_locator};
pub use playback::{
    AnimationState, Clock, InMemorySurface, ManualClock, NullSurface, PlaybackScheduler,
    PlaybackStatus, PngSequenceSurface, Surface, SystemClock, Tick, TickHandle, Timestamp,
    write_png,
};
pub use session::{Player, prepare_animation};
