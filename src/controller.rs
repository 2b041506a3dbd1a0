use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{info, log};

use crate::audio::{AudioBackend, PlaybackEngine, PositionDisplay, PositionSync, SharedEngine};
use crate::config::PlayerConfig;
use crate::error::PlayerError;
use crate::models::{PlayerStatus, StatusMessage};

/// Façade the display side talks to.
///
/// Every command is forwarded to the engine and then the position display
/// is brought up to date. Failures never propagate as `Err`; they are logged
/// and kept as the last [`StatusMessage`].
pub struct PlayerController {
    engine: SharedEngine,
    sync: PositionSync,
    skip_step_micros: AtomicU64,
    last_status: Mutex<Option<StatusMessage>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl PlayerController {
    pub fn new(
        backend: Arc<dyn AudioBackend>,
        display: Arc<dyn PositionDisplay>,
        config: &PlayerConfig,
    ) -> Self {
        let engine = PlaybackEngine::new(backend).into_shared();
        let sync = PositionSync::new(
            Arc::clone(&engine),
            display,
            config.poll_interval(),
            config.display_unit_micros(),
        );
        info!("PlayerController initialized");
        Self {
            engine,
            sync,
            skip_step_micros: AtomicU64::new(config.skip_step_micros()),
            last_status: Mutex::new(None),
        }
    }

    pub fn engine(&self) -> &SharedEngine {
        &self.engine
    }

    /// Position sync, for displays that report user drags
    pub fn sync(&self) -> &PositionSync {
        &self.sync
    }

    /// Load `path` stopped at 0. Returns whether the load succeeded.
    ///
    /// A failed load leaves the previous track as it was, still playing if
    /// it was, so the timer follows whatever the engine ended up doing.
    pub fn load(&self, path: &Path) -> bool {
        self.sync.cancel_timer();
        let (result, playing) = {
            let mut engine = lock(&self.engine);
            let result = engine.load(path);
            (result, engine.is_playing())
        };
        let loaded = match result {
            Ok(()) => {
                info!("Loaded audio file: {}", path.display());
                true
            }
            Err(e) => {
                self.report(e.into());
                false
            }
        };
        if playing {
            self.sync.start_timer();
        }
        self.sync.refresh_display();
        loaded
    }

    pub fn play(&self) {
        let playing = {
            let mut engine = lock(&self.engine);
            engine.play();
            engine.is_playing()
        };
        if playing {
            self.sync.start_timer();
        }
        self.sync.refresh_display();
    }

    pub fn pause(&self) {
        lock(&self.engine).pause();
        self.sync.cancel_timer();
        self.sync.refresh_display();
    }

    /// Stop, rewind to 0 and push that final position
    pub fn stop(&self) {
        lock(&self.engine).stop();
        self.sync.cancel_timer();
        self.sync.refresh_display();
    }

    pub fn fast_forward(&self, delta_micros: u64) {
        lock(&self.engine).fast_forward(delta_micros);
        self.sync.tick();
    }

    pub fn rewind(&self, delta_micros: u64) {
        lock(&self.engine).rewind(delta_micros);
        self.sync.tick();
    }

    pub fn skip_forward(&self) {
        self.fast_forward(self.skip_step_micros());
    }

    pub fn skip_back(&self) {
        self.rewind(self.skip_step_micros());
    }

    pub fn set_position(&self, micros: u64) {
        lock(&self.engine).set_position(micros);
        self.sync.tick();
    }

    pub fn close(&self) {
        self.sync.cancel_timer();
        lock(&self.engine).close();
        self.sync.refresh_display();
    }

    pub fn status(&self) -> PlayerStatus {
        lock(&self.engine).status()
    }

    pub fn last_status(&self) -> Option<StatusMessage> {
        lock(&self.last_status).clone()
    }

    pub fn take_last_status(&self) -> Option<StatusMessage> {
        lock(&self.last_status).take()
    }

    /// Log `error` at its severity and keep it for the display
    pub fn report(&self, error: PlayerError) {
        let message = StatusMessage::from_error(&error);
        log!(message.severity.log_level(), "{}", error);
        *lock(&self.last_status) = Some(message);
    }

    pub fn skip_step_micros(&self) -> u64 {
        self.skip_step_micros.load(Ordering::Relaxed)
    }

    pub fn set_skip_step_micros(&self, step_micros: u64) {
        self.skip_step_micros.store(step_micros, Ordering::Relaxed);
    }
}

impl Drop for PlayerController {
    fn drop(&mut self) {
        self.sync.cancel_timer();
    }
}
