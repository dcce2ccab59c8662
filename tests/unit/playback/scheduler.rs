use std::cell::RefCell;
use std::rc::Rc;

use super::*;
use crate::foundation::core::FrameRGBA;
use crate::playback::clock::ManualClock;
use crate::playback::surface::InMemorySurface;

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

fn solid(canvas: Canvas, shade: u8, delay_ms: u32) -> CompositedFrame {
    let mut bitmap = FrameRGBA::transparent(canvas);
    for px in bitmap.data.chunks_exact_mut(4) {
        px.copy_from_slice(&[shade, shade, shade, 255]);
    }
    CompositedFrame { bitmap, delay_ms }
}

fn animation(delays: &[u32]) -> Arc<AnimationState> {
    let canvas = Canvas::new(2, 2);
    let frames = delays
        .iter()
        .enumerate()
        .map(|(i, &d)| solid(canvas, i as u8, d))
        .collect();
    Arc::new(AnimationState::new(canvas, frames, None).unwrap())
}

fn scheduler() -> PlaybackScheduler<InMemorySurface, ManualClock> {
    PlaybackScheduler::new(InMemorySurface::new(), ManualClock::new())
}

fn tick_after(s: &mut PlaybackScheduler<InMemorySurface, ManualClock>, by: u64) -> bool {
    s.clock_mut().advance(ms(by));
    s.pump().unwrap()
}

fn shown(s: &PlaybackScheduler<InMemorySurface, ManualClock>) -> u8 {
    s.surface().last().unwrap().data[0]
}

#[test]
fn animation_state_rejects_empty_and_mismatched_frames() {
    let canvas = Canvas::new(2, 2);
    let err = AnimationState::new(canvas, Vec::new(), None).unwrap_err();
    assert!(matches!(err, PlayerError::Decode(DecodeError::NoFrames)));

    let frames = vec![solid(canvas, 0, 10), solid(Canvas::new(3, 2), 0, 10)];
    let err = AnimationState::new(canvas, frames, None).unwrap_err();
    assert!(matches!(err, PlayerError::Validation(_)));
    assert!(err.to_string().contains("frame 1 is 3x2"));
}

#[test]
fn animation_state_sums_delays() {
    let a = animation(&[100, 200, 50]);
    assert_eq!(a.frame_count(), 3);
    assert_eq!(a.total_duration_ms(), 350);
    assert_eq!(a.loop_count(), None);
}

#[test]
fn empty_scheduler_ignores_every_operation() {
    let mut s = scheduler();
    s.play();
    assert!(!s.playing());
    assert!(!s.is_armed());
    s.restart().unwrap();
    assert!(!s.pump().unwrap());
    s.pause();
    assert_eq!(s.status(), PlaybackStatus::default());
    assert_eq!(s.current_frame_index(), None);
    assert!(s.surface().blits().is_empty());
}

#[test]
fn load_shows_first_frame_and_resizes_once_per_canvas() {
    let mut s = scheduler();
    s.set_animation(animation(&[100, 100]), true).unwrap();
    assert_eq!(s.surface().resizes(), &[(2, 2)]);
    assert_eq!(s.surface().blits().len(), 1);
    assert_eq!(shown(&s), 0);
    assert!(s.playing());
    assert!(s.is_armed());

    s.set_animation(animation(&[100]), false).unwrap();
    assert_eq!(s.surface().resizes().len(), 1);
    assert_eq!(s.surface().blits().len(), 2);
    assert!(!s.playing());
    assert!(!s.is_armed());
    assert_eq!(
        s.status(),
        PlaybackStatus {
            width: 2,
            height: 2,
            playing: false,
            current_frame_index: Some(0),
            frame_count: 1,
        }
    );
}

#[test]
fn frames_advance_only_once_their_delay_has_elapsed() {
    let mut s = scheduler();
    s.set_animation(animation(&[100, 200, 50]), true).unwrap();

    // ticks at 50, 110, 220, 250, 450
    let advanced: Vec<bool> = [50, 60, 110, 30, 200]
        .into_iter()
        .map(|d| tick_after(&mut s, d))
        .collect();
    assert_eq!(advanced, vec![false, true, false, false, true]);
    assert_eq!(s.current_frame_index(), Some(2));
    assert_eq!(shown(&s), 2);
}

#[test]
fn a_late_tick_advances_a_single_frame() {
    let mut s = scheduler();
    s.set_animation(animation(&[10, 10, 10, 10]), true).unwrap();
    assert!(tick_after(&mut s, 1000));
    assert_eq!(s.current_frame_index(), Some(1));
}

#[test]
fn zero_delay_frames_advance_on_every_tick() {
    let mut s = scheduler();
    s.set_animation(animation(&[0, 0, 0]), true).unwrap();
    for expected in [1, 2, 0, 1] {
        assert!(tick_after(&mut s, 0));
        assert_eq!(s.current_frame_index(), Some(expected));
    }
}

#[test]
fn playback_wraps_after_the_last_frame() {
    let mut s = scheduler();
    s.set_animation(animation(&[20, 20]), true).unwrap();
    assert!(tick_after(&mut s, 20));
    assert!(tick_after(&mut s, 20));
    assert_eq!(s.current_frame_index(), Some(0));
    assert_eq!(shown(&s), 0);
}

#[test]
fn paused_time_does_not_count_toward_the_delay() {
    let mut s = scheduler();
    s.set_animation(animation(&[100, 100]), true).unwrap();
    assert!(!tick_after(&mut s, 80));

    s.pause();
    assert!(!s.is_armed());
    s.clock_mut().advance(ms(5000));
    assert!(!s.pump().unwrap());

    s.play();
    assert!(s.is_armed());
    // first tick after resuming only sets the baseline
    assert!(!tick_after(&mut s, 0));
    assert!(!tick_after(&mut s, 50));
    assert!(tick_after(&mut s, 50));
    assert_eq!(s.current_frame_index(), Some(1));
}

#[test]
fn play_twice_keeps_a_single_subscription() {
    let mut s = scheduler();
    s.set_animation(animation(&[100]), false).unwrap();
    s.play();
    s.play();
    assert_eq!(s.clock().requests(), 1);
}

#[test]
fn restart_while_paused_emits_frame_zero_once() {
    let mut s = scheduler();
    s.set_animation(animation(&[10, 10, 10]), true).unwrap();
    tick_after(&mut s, 10);
    tick_after(&mut s, 10);
    s.pause();
    let before = s.surface().blits().len();

    s.restart().unwrap();
    assert_eq!(s.surface().blits().len(), before + 1);
    assert_eq!(shown(&s), 0);
    assert_eq!(s.current_frame_index(), Some(0));
    assert!(!s.playing());
    assert!(!s.is_armed());
}

#[test]
fn restart_while_playing_times_frame_zero_from_the_next_tick() {
    let mut s = scheduler();
    s.set_animation(animation(&[100, 100]), true).unwrap();
    assert!(tick_after(&mut s, 100));
    s.clock_mut().advance(ms(90));

    s.restart().unwrap();
    assert_eq!(shown(&s), 0);
    assert!(s.playing());
    assert!(!s.pump().unwrap());
    assert!(!tick_after(&mut s, 99));
    assert!(tick_after(&mut s, 1));
}

#[test]
fn resize_reshows_the_current_frame_without_advancing() {
    let mut s = scheduler();
    s.set_animation(animation(&[10, 10]), true).unwrap();
    tick_after(&mut s, 10);
    let before = s.surface().blits().len();

    s.resize(8, 8).unwrap();
    assert_eq!(s.surface().size(), Some((8, 8)));
    assert_eq!(s.surface().blits().len(), before + 1);
    assert_eq!(s.current_frame_index(), Some(1));
}

#[test]
fn stale_ticks_are_ignored() {
    let mut s = scheduler();
    s.set_animation(animation(&[0, 0]), true).unwrap();
    let stale = Tick {
        handle: TickHandle(999),
        timestamp: ms(10),
    };
    assert!(!s.on_tick(stale).unwrap());
    assert!(s.is_armed());
    assert_eq!(s.current_frame_index(), Some(0));
}

#[test]
fn tick_before_baseline_is_a_clock_error() {
    let mut s = scheduler();
    s.clock_mut().advance(ms(100));
    s.set_animation(animation(&[10]), true).unwrap();
    let handle = s.clock().armed().unwrap();
    let err = s
        .on_tick(Tick {
            handle,
            timestamp: ms(50),
        })
        .unwrap_err();
    assert!(matches!(err, PlayerError::Clock(_)));
    assert!(s.is_armed());
}

#[test]
fn unload_returns_to_empty_and_releases_the_tick() {
    let mut s = scheduler();
    s.set_animation(animation(&[10]), true).unwrap();
    s.unload();
    assert!(!s.is_armed());
    assert_eq!(s.clock().cancels(), 1);
    assert_eq!(s.frame_count(), 0);
    assert_eq!(s.width(), 0);
}

#[derive(Clone, Default)]
struct SharedClock(Rc<RefCell<ManualClock>>);

impl Clock for SharedClock {
    fn now(&self) -> Timestamp {
        self.0.borrow().now()
    }

    fn request_tick(&mut self) -> TickHandle {
        self.0.borrow_mut().request_tick()
    }

    fn cancel_tick(&mut self, handle: TickHandle) {
        self.0.borrow_mut().cancel_tick(handle)
    }

    fn take_due(&mut self) -> Option<Tick> {
        self.0.borrow_mut().take_due()
    }
}

#[test]
fn dropping_the_scheduler_cancels_the_armed_tick() {
    let clock = SharedClock::default();
    let mut s = PlaybackScheduler::new(InMemorySurface::new(), clock.clone());
    s.set_animation(animation(&[10]), true).unwrap();
    assert!(clock.0.borrow().armed().is_some());

    drop(s);
    assert!(clock.0.borrow().armed().is_none());
    assert_eq!(clock.0.borrow().cancels(), 1);
}

#[derive(Default)]
struct FailingSurface {
    fail_blit: bool,
    fail_resize: bool,
    blits: usize,
}

impl Surface for FailingSurface {
    fn blit(&mut self, _frame: &FrameRGBA) -> PlayerResult<()> {
        if self.fail_blit {
            return Err(PlayerError::surface("gone"));
        }
        self.blits += 1;
        Ok(())
    }

    fn resize(&mut self, _width: u32, _height: u32) -> PlayerResult<()> {
        if self.fail_resize {
            return Err(PlayerError::surface("cannot resize"));
        }
        Ok(())
    }
}

#[test]
fn surface_failure_keeps_the_subscription_alive() {
    let mut s = PlaybackScheduler::new(FailingSurface::default(), ManualClock::new());
    s.set_animation(animation(&[0, 0]), true).unwrap();
    s.surface_mut().fail_blit = true;

    let err = s.pump().unwrap_err();
    assert!(matches!(err, PlayerError::Surface(_)));
    assert!(s.is_armed());
    assert_eq!(s.current_frame_index(), Some(1));
}

#[test]
fn failed_resize_leaves_the_scheduler_empty() {
    let surface = FailingSurface {
        fail_resize: true,
        ..FailingSurface::default()
    };
    let mut s = PlaybackScheduler::new(surface, ManualClock::new());

    let err = s.set_animation(animation(&[100, 100]), true).unwrap_err();
    assert!(matches!(err, PlayerError::Surface(_)));
    assert_eq!(s.frame_count(), 0);
    assert_eq!(s.current_frame_index(), None);
    assert!(!s.playing());
    assert!(!s.is_armed());
    assert_eq!(s.clock().requests(), 0);
    assert_eq!(s.surface().blits, 0);
}

#[test]
fn failed_swap_keeps_the_previous_animation_playing() {
    let mut s = PlaybackScheduler::new(FailingSurface::default(), ManualClock::new());
    s.set_animation(animation(&[0, 0, 0]), true).unwrap();
    s.clock_mut().advance(ms(1));
    assert!(s.pump().unwrap());
    assert_eq!(s.current_frame_index(), Some(1));

    let wider = Canvas::new(3, 2);
    let next = Arc::new(AnimationState::new(wider, vec![solid(wider, 9, 50)], None).unwrap());
    s.surface_mut().fail_blit = true;
    assert!(s.set_animation(next, false).is_err());

    assert_eq!(s.frame_count(), 3);
    assert_eq!(s.width(), 2);
    assert_eq!(s.current_frame_index(), Some(1));
    assert!(s.playing());
    assert!(s.is_armed());
}
