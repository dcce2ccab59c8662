use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::{
    composite::{FrameCompositor, composite_with},
    decode::GifDecoder,
    foundation::error::{PlayerError, PlayerResult},
    load::{ByteSource, PlayerOpts},
    playback::{AnimationState, Clock, PlaybackScheduler, PlaybackStatus, Surface},
};

/// How often [`Player::wait_load`] checks whether the worker died without reporting.
const WORKER_POLL: Duration = Duration::from_millis(25);

struct LoadMsg {
    generation: u64,
    result: PlayerResult<AnimationState>,
}

struct PendingLoad {
    generation: u64,
    locator: String,
    cancel: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl PendingLoad {
    fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }
}

/// Host-facing animated GIF player.
///
/// Owns a [`PlaybackScheduler`] and turns locators into [`AnimationState`]s, optionally on a
/// background worker. Only the most recent load can take effect: results of superseded loads
/// are discarded when they arrive. A failed load leaves whatever was shown before untouched.
pub struct Player<S: Surface, C: Clock> {
    source: Arc<dyn ByteSource>,
    opts: PlayerOpts,
    scheduler: PlaybackScheduler<S, C>,
    generation: u64,
    pending: Option<PendingLoad>,
    tx: mpsc::Sender<LoadMsg>,
    rx: mpsc::Receiver<LoadMsg>,
    discarded: u64,
}

impl<S: Surface, C: Clock> Player<S, C> {
    /// Create an empty player. Fails if `opts` is invalid.
    pub fn new(
        source: Arc<dyn ByteSource>,
        surface: S,
        clock: C,
        opts: PlayerOpts,
    ) -> PlayerResult<Self> {
        opts.validate()?;
        let (tx, rx) = mpsc::channel();
        Ok(Self {
            source,
            opts,
            scheduler: PlaybackScheduler::new(surface, clock),
            generation: 0,
            pending: None,
            tx,
            rx,
            discarded: 0,
        })
    }

    /// Load `locator` and block until it is applied or fails.
    pub fn load(&mut self, locator: &str) -> PlayerResult<()> {
        self.begin_load(locator);
        self.wait_load()
    }

    /// Start loading `locator`, superseding any load still in flight. Returns the load's
    /// generation.
    pub fn begin_load(&mut self, locator: &str) -> u64 {
        if let Some(prev) = self.pending.take() {
            tracing::debug!(
                generation = prev.generation,
                locator = %prev.locator,
                "superseding pending load"
            );
            prev.cancel();
        }

        self.generation += 1;
        let generation = self.generation;
        let cancel = Arc::new(AtomicBool::new(false));

        let worker = if self.opts.background_decode {
            let source = Arc::clone(&self.source);
            let opts = self.opts.clone();
            let locator = locator.to_owned();
            let cancel = Arc::clone(&cancel);
            let tx = self.tx.clone();
            let spawned = std::thread::Builder::new()
                .name(format!("gif-decode-{generation}"))
                .spawn(move || {
                    let result = fetch_and_prepare(source.as_ref(), &locator, &opts, &cancel);
                    if cancel.load(Ordering::Relaxed) {
                        return;
                    }
                    let _ = tx.send(LoadMsg { generation, result });
                });
            match spawned {
                Ok(handle) => Some(handle),
                Err(e) => {
                    let result = Err(PlayerError::worker(format!("spawn decode worker: {e}")));
                    let _ = self.tx.send(LoadMsg { generation, result });
                    None
                }
            }
        } else {
            let result = fetch_and_prepare(self.source.as_ref(), locator, &self.opts, &cancel);
            let _ = self.tx.send(LoadMsg { generation, result });
            None
        };

        self.pending = Some(PendingLoad {
            generation,
            locator: locator.to_owned(),
            cancel,
            worker,
        });
        generation
    }

    /// Apply a finished load without blocking.
    ///
    /// Returns `None` while the current load is still running or when nothing is pending,
    /// otherwise the outcome of the current load.
    pub fn poll_load(&mut self) -> Option<PlayerResult<()>> {
        while let Ok(msg) = self.rx.try_recv() {
            if let Some(outcome) = self.accept(msg) {
                return Some(outcome);
            }
        }
        None
    }

    /// Block until the current load is applied or fails. Returns `Ok(())` when nothing is pending.
    pub fn wait_load(&mut self) -> PlayerResult<()> {
        loop {
            let Some(pending) = &self.pending else {
                return Ok(());
            };
            match self.rx.recv_timeout(WORKER_POLL) {
                Ok(msg) => {
                    if let Some(outcome) = self.accept(msg) {
                        return outcome;
                    }
                }
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    let generation = pending.generation;
                    let dead = pending.worker.as_ref().is_some_and(|w| w.is_finished());
                    if dead {
                        // The result may have landed between the timeout and the check.
                        if let Some(outcome) = self.poll_load() {
                            return outcome;
                        }
                        self.pending = None;
                        return Err(PlayerError::worker(format!(
                            "decode worker for load {generation} exited without a result"
                        )));
                    }
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    return Err(PlayerError::worker("load channel disconnected"));
                }
            }
        }
    }

    fn accept(&mut self, msg: LoadMsg) -> Option<PlayerResult<()>> {
        let current = self.pending.as_ref().map(|p| p.generation);
        if current != Some(msg.generation) {
            self.discarded += 1;
            tracing::debug!(
                generation = msg.generation,
                current = ?current,
                "discarding stale load result"
            );
            return None;
        }

        let pending = self.pending.take()?;
        Some(match msg.result {
            Ok(animation) => {
                tracing::info!(
                    generation = msg.generation,
                    locator = %pending.locator,
                    width = animation.canvas().width,
                    height = animation.canvas().height,
                    frames = animation.frame_count(),
                    "load applied"
                );
                self.scheduler
                    .set_animation(Arc::new(animation), self.opts.autoplay)
            }
            Err(e) => {
                tracing::warn!(
                    generation = msg.generation,
                    locator = %pending.locator,
                    error = %e,
                    "load failed"
                );
                Err(e)
            }
        })
    }

    /// Start playback.
    pub fn play(&mut self) {
        self.scheduler.play();
    }

    /// Pause playback.
    pub fn pause(&mut self) {
        self.scheduler.pause();
    }

    /// Show frame 0 again.
    pub fn restart(&mut self) -> PlayerResult<()> {
        self.scheduler.restart()
    }

    /// Output dimensions changed.
    pub fn resize(&mut self, width: u32, height: u32) -> PlayerResult<()> {
        self.scheduler.resize(width, height)
    }

    /// Apply any finished load, then deliver the clock's due tick. Returns whether the frame
    /// advanced.
    ///
    /// A failed background load is reported here once.
    pub fn pump(&mut self) -> PlayerResult<bool> {
        if let Some(outcome) = self.poll_load() {
            outcome?;
        }
        self.scheduler.pump()
    }

    /// Observable state.
    pub fn status(&self) -> PlaybackStatus {
        self.scheduler.status()
    }

    /// Canvas width, 0 when empty.
    pub fn width(&self) -> u32 {
        self.scheduler.width()
    }

    /// Canvas height, 0 when empty.
    pub fn height(&self) -> u32 {
        self.scheduler.height()
    }

    /// Whether playback is running.
    pub fn playing(&self) -> bool {
        self.scheduler.playing()
    }

    /// Index of the visible frame, `None` when empty.
    pub fn current_frame_index(&self) -> Option<usize> {
        self.scheduler.current_frame_index()
    }

    /// Number of loaded frames.
    pub fn frame_count(&self) -> usize {
        self.scheduler.frame_count()
    }

    /// Loaded animation, if any.
    pub fn animation(&self) -> Option<&Arc<AnimationState>> {
        self.scheduler.animation()
    }

    /// Whether a load is in flight.
    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Generation of the most recent `begin_load`, 0 before the first.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Results of superseded loads dropped on arrival.
    pub fn discarded_results(&self) -> u64 {
        self.discarded
    }

    /// Options in effect.
    pub fn opts(&self) -> &PlayerOpts {
        &self.opts
    }

    /// Borrow the scheduler.
    pub fn scheduler(&self) -> &PlaybackScheduler<S, C> {
        &self.scheduler
    }

    /// Mutably borrow the scheduler.
    pub fn scheduler_mut(&mut self) -> &mut PlaybackScheduler<S, C> {
        &mut self.scheduler
    }
}

impl<S: Surface, C: Clock> Drop for Player<S, C> {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.cancel();
        }
    }
}

impl<S: Surface, C: Clock> std::fmt::Debug for Player<S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("opts", &self.opts)
            .field("scheduler", &self.scheduler)
            .field("generation", &self.generation)
            .field("loading", &self.is_loading())
            .field("discarded", &self.discarded)
            .finish()
    }
}

fn fetch_and_prepare(
    source: &dyn ByteSource,
    locator: &str,
    opts: &PlayerOpts,
    cancel: &AtomicBool,
) -> PlayerResult<AnimationState> {
    let bytes = source.fetch(locator)?;
    if cancel.load(Ordering::Relaxed) {
        return Err(PlayerError::Cancelled);
    }
    prepare_animation(&bytes, opts, cancel)
}

/// Decode and composite a whole GIF into a ready-to-play [`AnimationState`].
///
/// `cancel` is checked between frames; once set the work stops with [`PlayerError::Cancelled`].
#[tracing::instrument(skip(bytes, opts, cancel), fields(len = bytes.len()))]
pub fn prepare_animation(
    bytes: &[u8],
    opts: &PlayerOpts,
    cancel: &AtomicBool,
) -> PlayerResult<AnimationState> {
    let mut decoder = GifDecoder::with_opts(bytes, opts.decode_opts())?;
    let canvas = decoder.canvas();

    let frames = if opts.parallel_expand {
        let mut logical = Vec::new();
        for frame in decoder.by_ref() {
            logical.push(frame?);
            if cancel.load(Ordering::Relaxed) {
                return Err(PlayerError::Cancelled);
            }
        }
        composite_with(canvas, &logical, &opts.threading())?
    } else {
        let mut compositor = FrameCompositor::new(canvas);
        let mut out = Vec::new();
        for frame in decoder.by_ref() {
            out.push(compositor.push(&frame?)?);
            if cancel.load(Ordering::Relaxed) {
                return Err(PlayerError::Cancelled);
            }
        }
        out
    };

    AnimationState::new(canvas, frames, decoder.loop_count())
}

#[cfg(test)]
#[path = "../../tests/unit/session/player.rs"]
mod tests;
