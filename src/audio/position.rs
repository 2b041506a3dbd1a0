use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::{self, ThreadId};
use std::time::Duration;

use log::{debug, info, warn};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::audio::{PlaybackEngine, SharedEngine};

/// Display collaborator fed by [`PositionSync`].
///
/// A display may report a value change from inside `push_position` (a slider
/// firing its change listener on `set_value`); such echoes are recognised and
/// dropped.
pub trait PositionDisplay: Send + Sync {
    fn push_position(&self, current_micros: u64, total_micros: u64);

    /// `Some(total)` when a track is loaded, `None` to clear and disable
    fn show_loaded(&self, _total_micros: Option<u64>) {}
}

/// Which side currently owns the display value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    /// Engine position is being pushed; value changes are echoes
    Pushing,
    /// User is dragging; pushes are dropped and seeks held back
    Dragging,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Pushed { position: u64, duration: u64 },
    SkippedDragging,
    SkippedUnloaded,
    /// Tick from a cancelled timer
    Discarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOutcome {
    Applied { micros: u64 },
    /// Held until the drag ends
    Deferred,
    IgnoredEcho,
}

/// Identifies the timer a tick was scheduled by and the engine generation
/// it was started against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TimerTicket {
    timer: u64,
    engine: u64,
}

#[derive(Debug)]
struct SyncState {
    phase: SyncPhase,
    pusher: Option<ThreadId>,
    pending_seek: Option<u64>,
    deferred_seek: Option<u64>,
    timer_generation: u64,
}

struct SyncInner {
    engine: SharedEngine,
    display: Arc<dyn PositionDisplay>,
    state: Mutex<SyncState>,
    timer: Mutex<Option<JoinHandle<()>>>,
    poll_interval: Duration,
    unit_micros: u64,
}

/// Keeps a display's position indicator in step with the engine without
/// letting engine pushes read back as user seeks.
///
/// Lock order is engine, then sync state. Pushes and user seeks both run
/// under the engine lock, so they never overlap and a tick cannot reach a
/// resource that `close` has released.
#[derive(Clone)]
pub struct PositionSync {
    inner: Arc<SyncInner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl PositionSync {
    /// `unit_micros` is the size of one display unit (1_000_000 for a
    /// slider that counts seconds).
    pub fn new(
        engine: SharedEngine,
        display: Arc<dyn PositionDisplay>,
        poll_interval: Duration,
        unit_micros: u64,
    ) -> Self {
        Self {
            inner: Arc::new(SyncInner {
                engine,
                display,
                state: Mutex::new(SyncState {
                    phase: SyncPhase::Idle,
                    pusher: None,
                    pending_seek: None,
                    deferred_seek: None,
                    timer_generation: 0,
                }),
                timer: Mutex::new(None),
                poll_interval,
                unit_micros: unit_micros.max(1),
            }),
        }
    }

    pub fn phase(&self) -> SyncPhase {
        lock(&self.inner.state).phase
    }

    pub fn poll_interval(&self) -> Duration {
        self.inner.poll_interval
    }

    pub fn is_timer_running(&self) -> bool {
        lock(&self.inner.timer)
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }

    /// Start ticking every poll interval, replacing any running timer.
    /// Needs a tokio runtime; without one the display is only updated on
    /// explicit `tick` calls.
    pub fn start_timer(&self) {
        let mut timer = lock(&self.inner.timer);
        if let Some(handle) = timer.take() {
            handle.abort();
        }

        let ticket = TimerTicket {
            timer: {
                let mut state = lock(&self.inner.state);
                state.timer_generation += 1;
                state.timer_generation
            },
            engine: lock(&self.inner.engine).generation(),
        };

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!("No async runtime available; position timer not started");
                return;
            }
        };

        // Held weakly; the task ends once the last sync is dropped
        let weak: Weak<SyncInner> = Arc::downgrade(&self.inner);
        let period = self.inner.poll_interval;
        *timer = Some(runtime.spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let sync = PositionSync { inner };
                if sync.tick_for(Some(ticket)) == TickOutcome::Discarded {
                    break;
                }
            }
        }));
        info!("Starting playback timer ({}ms)", period.as_millis());
    }

    /// Cancel the timer. Immediate and idempotent; a tick already past its
    /// await point sees the bumped generation and is discarded. A timer
    /// also stops by itself once the engine loads or closes a track.
    pub fn cancel_timer(&self) {
        let mut timer = lock(&self.inner.timer);
        lock(&self.inner.state).timer_generation += 1;
        if let Some(handle) = timer.take() {
            handle.abort();
            info!("Stopping playback timer");
        }
    }

    /// Push the engine position to the display now
    pub fn tick(&self) -> TickOutcome {
        self.tick_for(None)
    }

    fn tick_for(&self, ticket: Option<TimerTicket>) -> TickOutcome {
        let mut engine = lock(&self.inner.engine);

        let (position, duration) = {
            let mut state = lock(&self.inner.state);
            if let Some(ticket) = ticket {
                if ticket.timer != state.timer_generation || ticket.engine != engine.generation() {
                    debug!("Discarding stale timer tick");
                    return TickOutcome::Discarded;
                }
            }
            if state.phase == SyncPhase::Dragging {
                debug!("Skipping tick during drag");
                return TickOutcome::SkippedDragging;
            }
            if !engine.is_loaded() {
                return TickOutcome::SkippedUnloaded;
            }
            state.phase = SyncPhase::Pushing;
            state.pusher = Some(thread::current().id());
            (engine.position(), engine.duration())
        };

        debug!("Updating display position: {}us / {}us", position, duration);
        self.inner.display.push_position(position, duration);

        let deferred = {
            let mut state = lock(&self.inner.state);
            state.pusher = None;
            if state.phase == SyncPhase::Pushing {
                state.phase = SyncPhase::Idle;
            }
            state.deferred_seek.take()
        };
        if let Some(value) = deferred {
            self.apply_seek(&mut engine, value);
        }

        TickOutcome::Pushed { position, duration }
    }

    /// Tell the display whether a track is loaded, then push its position
    pub fn refresh_display(&self) {
        let total = {
            let engine = lock(&self.inner.engine);
            engine.is_loaded().then(|| engine.duration())
        };
        self.inner.display.show_loaded(total);
        self.tick();
    }

    pub fn on_user_seek_start(&self) {
        let mut state = lock(&self.inner.state);
        state.phase = SyncPhase::Dragging;
        state.pending_seek = None;
        debug!("User drag started");
    }

    /// A value change reported by the display, in display units
    pub fn on_user_seek_commit(&self, value: u64) -> SeekOutcome {
        {
            let mut state = lock(&self.inner.state);
            match state.phase {
                SyncPhase::Pushing => {
                    debug!("Ignoring display echo: {}", value);
                    return SeekOutcome::IgnoredEcho;
                }
                SyncPhase::Dragging => {
                    state.pending_seek = Some(value);
                    return SeekOutcome::Deferred;
                }
                SyncPhase::Idle => {}
            }
        }

        let mut engine = lock(&self.inner.engine);
        let micros = self.apply_seek(&mut engine, value);
        SeekOutcome::Applied { micros }
    }

    /// End of a drag: one seek with the last committed value, if any
    pub fn on_user_seek_end(&self) -> Option<u64> {
        let value = {
            let mut state = lock(&self.inner.state);
            let value = state.pending_seek.take();
            if state.pusher == Some(thread::current().id()) {
                // Reported from inside push_position; the tick applies it
                // once the push completes.
                state.phase = SyncPhase::Pushing;
                state.deferred_seek = value;
                return None;
            }
            state.phase = SyncPhase::Idle;
            value
        };
        debug!("User drag ended");

        let value = value?;
        let mut engine = lock(&self.inner.engine);
        Some(self.apply_seek(&mut engine, value))
    }

    fn apply_seek(&self, engine: &mut PlaybackEngine, value: u64) -> u64 {
        let micros = value.saturating_mul(self.inner.unit_micros);
        info!("User updated clip position: {}us", micros);
        engine.set_position(micros);
        engine.position()
    }
}

impl Drop for SyncInner {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.timer).take() {
            handle.abort();
        }
    }
}
