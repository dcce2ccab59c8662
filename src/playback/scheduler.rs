use std::sync::Arc;
use std::time::Duration;

use crate::{
    composite::CompositedFrame,
    decode::LoopCount,
    foundation::core::Canvas,
    foundation::error::{DecodeError, PlayerError, PlayerResult},
    playback::clock::{Clock, Tick, TickHandle, Timestamp},
    playback::surface::Surface,
};

/// A fully loaded animation: non-empty, every bitmap canvas-sized.
///
/// Replaced wholesale on the next successful load and never mutated in place.
#[derive(Clone, Debug)]
pub struct AnimationState {
    canvas: Canvas,
    frames: Vec<CompositedFrame>,
    loop_count: Option<LoopCount>,
}

impl AnimationState {
    /// Validate and wrap a composited frame sequence.
    pub fn new(
        canvas: Canvas,
        frames: Vec<CompositedFrame>,
        loop_count: Option<LoopCount>,
    ) -> PlayerResult<Self> {
        if frames.is_empty() {
            return Err(DecodeError::NoFrames.into());
        }
        if let Some((i, f)) = frames
            .iter()
            .enumerate()
            .find(|(_, f)| {
                f.bitmap.canvas() != canvas || f.bitmap.data.len() != canvas.rgba_len()
            })
        {
            return Err(PlayerError::validation(format!(
                "frame {i} is {}x{}, canvas is {}x{}",
                f.bitmap.width, f.bitmap.height, canvas.width, canvas.height
            )));
        }
        Ok(Self {
            canvas,
            frames,
            loop_count,
        })
    }

    /// Canvas dimensions shared by every frame.
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Frames in display order.
    pub fn frames(&self) -> &[CompositedFrame] {
        &self.frames
    }

    /// Number of frames. Always at least one.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Loop count declared by the source, if any.
    pub fn loop_count(&self) -> Option<LoopCount> {
        self.loop_count
    }

    /// Sum of all frame delays.
    pub fn total_duration_ms(&self) -> u64 {
        self.frames.iter().map(|f| u64::from(f.delay_ms)).sum()
    }
}

/// Read-only snapshot of what a host can observe.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct PlaybackStatus {
    /// Canvas width, 0 when empty.
    pub width: u32,
    /// Canvas height, 0 when empty.
    pub height: u32,
    /// Whether ticks advance frames.
    pub playing: bool,
    /// Index of the visible frame, `None` when empty.
    pub current_frame_index: Option<usize>,
    /// Number of loaded frames.
    pub frame_count: usize,
}

/// Tick-driven frame scheduler.
///
/// Frames advance on clock ticks once the visible frame's delay has elapsed since it became
/// visible, at most one frame per tick, wrapping after the last frame. Every operation on an
/// empty scheduler is a no-op.
pub struct PlaybackScheduler<S: Surface, C: Clock> {
    surface: S,
    clock: C,
    animation: Option<Arc<AnimationState>>,
    current: usize,
    playing: bool,
    // `None` means "take the next tick's timestamp".
    baseline: Option<Timestamp>,
    armed: Option<TickHandle>,
}

impl<S: Surface, C: Clock> PlaybackScheduler<S, C> {
    /// Empty, paused scheduler.
    pub fn new(surface: S, clock: C) -> Self {
        Self {
            surface,
            clock,
            animation: None,
            current: 0,
            playing: false,
            baseline: None,
            armed: None,
        }
    }

    /// Swap in a newly loaded animation, show frame 0 and either start playing with the load
    /// instant as timing baseline or stay paused.
    ///
    /// The surface is resized and handed frame 0 before any state changes, so an error leaves
    /// the previous animation, position and tick subscription as they were.
    pub fn set_animation(
        &mut self,
        animation: Arc<AnimationState>,
        autoplay: bool,
    ) -> PlayerResult<()> {
        let canvas = animation.canvas();
        if self.animation.as_ref().map(|a| a.canvas()) != Some(canvas) {
            self.surface.resize(canvas.width, canvas.height)?;
        }
        self.surface.blit(&animation.frames[0].bitmap)?;

        self.animation = Some(animation);
        self.current = 0;
        if autoplay {
            self.playing = true;
            self.baseline = Some(self.clock.now());
            self.arm();
        } else {
            self.pause();
        }
        Ok(())
    }

    /// Drop the loaded animation and return to the empty state.
    pub fn unload(&mut self) {
        self.pause();
        self.animation = None;
        self.current = 0;
        self.baseline = None;
    }

    /// Start advancing on ticks. Time spent paused never counts toward the visible frame's delay.
    pub fn play(&mut self) {
        if self.animation.is_none() || self.playing {
            return;
        }
        self.playing = true;
        self.baseline = None;
        self.arm();
    }

    /// Stop advancing and release the tick subscription.
    pub fn pause(&mut self) {
        self.playing = false;
        self.disarm();
    }

    /// Jump back to frame 0 and show it. While playing, timing restarts from the next tick.
    pub fn restart(&mut self) -> PlayerResult<()> {
        if self.animation.is_none() {
            return Ok(());
        }
        self.current = 0;
        if self.playing {
            self.baseline = None;
            self.arm();
        }
        self.emit_current()
    }

    /// Forward new output dimensions to the surface and re-show the current frame.
    pub fn resize(&mut self, width: u32, height: u32) -> PlayerResult<()> {
        self.surface.resize(width, height)?;
        self.emit_current()
    }

    /// Deliver a tick. Returns whether the frame advanced.
    ///
    /// Ticks carrying a handle other than the armed one are ignored.
    pub fn on_tick(&mut self, tick: Tick) -> PlayerResult<bool> {
        if self.armed != Some(tick.handle) {
            tracing::trace!(handle = tick.handle.0, "ignoring tick for stale handle");
            return Ok(false);
        }
        self.armed = None;

        let Some(animation) = self.animation.clone() else {
            return Ok(false);
        };
        if !self.playing {
            return Ok(false);
        }
        self.arm();

        let baseline = *self.baseline.get_or_insert(tick.timestamp);
        let elapsed = tick.timestamp.checked_sub(baseline).ok_or_else(|| {
            PlayerError::clock(format!(
                "tick at {:?} precedes baseline {:?}",
                tick.timestamp, baseline
            ))
        })?;

        let delay = Duration::from_millis(u64::from(animation.frames[self.current].delay_ms));
        if elapsed < delay {
            return Ok(false);
        }

        self.baseline = Some(tick.timestamp);
        self.current = (self.current + 1) % animation.frame_count();
        tracing::trace!(frame = self.current, ?elapsed, "advance");
        self.emit_current()?;
        Ok(true)
    }

    /// Deliver the clock's due tick, if any. Returns whether the frame advanced.
    pub fn pump(&mut self) -> PlayerResult<bool> {
        match self.clock.take_due() {
            Some(tick) => self.on_tick(tick),
            None => Ok(false),
        }
    }

    /// Observable state.
    pub fn status(&self) -> PlaybackStatus {
        match &self.animation {
            Some(a) => PlaybackStatus {
                width: a.canvas().width,
                height: a.canvas().height,
                playing: self.playing,
                current_frame_index: Some(self.current),
                frame_count: a.frame_count(),
            },
            None => PlaybackStatus {
                playing: self.playing,
                ..PlaybackStatus::default()
            },
        }
    }

    /// Canvas width, 0 when empty.
    pub fn width(&self) -> u32 {
        self.animation.as_ref().map_or(0, |a| a.canvas().width)
    }

    /// Canvas height, 0 when empty.
    pub fn height(&self) -> u32 {
        self.animation.as_ref().map_or(0, |a| a.canvas().height)
    }

    /// Whether ticks advance frames.
    pub fn playing(&self) -> bool {
        self.playing
    }

    /// Index of the visible frame, `None` when empty.
    pub fn current_frame_index(&self) -> Option<usize> {
        self.animation.as_ref().map(|_| self.current)
    }

    /// Number of loaded frames.
    pub fn frame_count(&self) -> usize {
        self.animation.as_ref().map_or(0, |a| a.frame_count())
    }

    /// Loaded animation, if any.
    pub fn animation(&self) -> Option<&Arc<AnimationState>> {
        self.animation.as_ref()
    }

    /// Whether a tick subscription is currently held.
    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Borrow the surface.
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Mutably borrow the surface.
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Borrow the clock.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Mutably borrow the clock.
    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    fn arm(&mut self) {
        if self.armed.is_none() {
            self.armed = Some(self.clock.request_tick());
        }
    }

    fn disarm(&mut self) {
        if let Some(handle) = self.armed.take() {
            self.clock.cancel_tick(handle);
        }
    }

    fn emit_current(&mut self) -> PlayerResult<()> {
        let Some(animation) = &self.animation else {
            return Ok(());
        };
        self.surface.blit(&animation.frames[self.current].bitmap)
    }
}

impl<S: Surface, C: Clock> Drop for PlaybackScheduler<S, C> {
    fn drop(&mut self) {
        self.disarm();
    }
}

impl<S: Surface, C: Clock> std::fmt::Debug for PlaybackScheduler<S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackScheduler")
            .field("status", &self.status())
            .field("baseline", &self.baseline)
            .field("armed", &self.armed)
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/playback/scheduler.rs"]
mod tests;
