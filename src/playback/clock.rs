use std::time::{Duration, Instant};

/// Monotonic time since the clock's origin.
pub type Timestamp = Duration;

/// Identifies one armed tick request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TickHandle(pub u64);

/// A tick that is due for delivery.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tick {
    /// Handle returned by the matching [`Clock::request_tick`].
    pub handle: TickHandle,
    /// Time of the tick.
    pub timestamp: Timestamp,
}

/// Source of one-shot timestamped notifications, in the style of an animation-frame callback.
///
/// `request_tick` arms a single delivery; once [`Clock::take_due`] has handed that tick out the
/// handle is spent and a new request is needed for the next one.
pub trait Clock {
    /// Current time. Never decreases.
    fn now(&self) -> Timestamp;
    /// Arm a tick. At most one tick is armed at a time; re-requesting replaces the old handle.
    fn request_tick(&mut self) -> TickHandle;
    /// Disarm `handle` if it is still armed.
    fn cancel_tick(&mut self, handle: TickHandle);
    /// Hand out the armed tick if it is due.
    fn take_due(&mut self) -> Option<Tick>;
}

/// Deterministic clock driven by the caller. Armed ticks are due immediately at the current time.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Timestamp,
    armed: Option<TickHandle>,
    next_id: u64,
    requests: u64,
    cancels: u64,
}

impl ManualClock {
    /// Clock at time zero with nothing armed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward by `by`.
    pub fn advance(&mut self, by: Duration) {
        self.now += by;
    }

    /// Jump to an absolute time. Times earlier than `now` are ignored.
    pub fn set_now(&mut self, at: Timestamp) {
        self.now = self.now.max(at);
    }

    /// Currently armed handle.
    pub fn armed(&self) -> Option<TickHandle> {
        self.armed
    }

    /// Number of `request_tick` calls so far.
    pub fn requests(&self) -> u64 {
        self.requests
    }

    /// Number of `cancel_tick` calls that disarmed something.
    pub fn cancels(&self) -> u64 {
        self.cancels
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now
    }

    fn request_tick(&mut self) -> TickHandle {
        self.next_id += 1;
        self.requests += 1;
        let handle = TickHandle(self.next_id);
        self.armed = Some(handle);
        handle
    }

    fn cancel_tick(&mut self, handle: TickHandle) {
        if self.armed == Some(handle) {
            self.armed = None;
            self.cancels += 1;
        }
    }

    fn take_due(&mut self) -> Option<Tick> {
        let handle = self.armed.take()?;
        Some(Tick {
            handle,
            timestamp: self.now,
        })
    }
}

/// Wall-clock ticks at a fixed interval (a display refresh stand-in).
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
    interval: Duration,
    armed: Option<TickHandle>,
    last_delivered: Option<Timestamp>,
    next_id: u64,
}

impl SystemClock {
    /// Clock delivering at most one tick per `interval`.
    pub fn new(interval: Duration) -> Self {
        Self {
            origin: Instant::now(),
            interval,
            armed: None,
            last_delivered: None,
            next_id: 0,
        }
    }

    /// Clock ticking at roughly 60 Hz.
    pub fn sixty_hz() -> Self {
        Self::new(Duration::from_micros(16_667))
    }

    /// Time until the armed tick becomes due, `None` when nothing is armed.
    pub fn until_due(&self) -> Option<Duration> {
        self.armed?;
        let due_at = self
            .last_delivered
            .map_or(Duration::ZERO, |t| t + self.interval);
        Some(due_at.saturating_sub(self.now()))
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        self.origin.elapsed()
    }

    fn request_tick(&mut self) -> TickHandle {
        self.next_id += 1;
        let handle = TickHandle(self.next_id);
        self.armed = Some(handle);
        handle
    }

    fn cancel_tick(&mut self, handle: TickHandle) {
        if self.armed == Some(handle) {
            self.armed = None;
        }
    }

    fn take_due(&mut self) -> Option<Tick> {
        if self.until_due()? > Duration::ZERO {
            return None;
        }
        let handle = self.armed.take()?;
        let timestamp = self.now();
        self.last_delivered = Some(timestamp);
        Some(Tick { handle, timestamp })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/playback/clock.rs"]
mod tests;
