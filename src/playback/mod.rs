//! Tick-driven playback: clocks, display surfaces and the frame scheduler.

pub(crate) mod clock;
pub(crate) mod scheduler;
pub(crate) mod surface;

pub use clock::{Clock, ManualClock, SystemClock, Tick, TickHandle, Timestamp};
pub use scheduler::{AnimationState, PlaybackScheduler, PlaybackStatus};
pub use surface::{InMemorySurface, NullSurface, PngSequenceSurface, Surface, write_png};
