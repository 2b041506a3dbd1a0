use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use log::{debug, info, warn};

use crate::audio::{AudioBackend, SourceFormat, Track};
use crate::error::AudioError;
use crate::models::{PlaybackState, PlayerStatus};

/// The engine's single owner. Commands and poll ticks all go through this
/// mutex, which also queues concurrent `load` calls.
pub type SharedEngine = Arc<Mutex<PlaybackEngine>>;

/// What is needed to put a track back after a failed replacement load
struct RestorePoint {
    source: PathBuf,
    position: u64,
    playing: bool,
}

/// Owns the single track slot and mediates every transport command.
///
/// Commands other than `load` on an unloaded engine are logged and treated
/// as successful no-ops.
pub struct PlaybackEngine {
    backend: Arc<dyn AudioBackend>,
    current: Box<dyn Track>,
    generation: u64,
}

impl PlaybackEngine {
    pub fn new(backend: Arc<dyn AudioBackend>) -> Self {
        let current = SourceFormat::Wav.create_track(Arc::clone(&backend));
        info!("PlaybackEngine instance created");
        Self {
            backend,
            current,
            generation: 0,
        }
    }

    pub fn into_shared(self) -> SharedEngine {
        Arc::new(Mutex::new(self))
    }

    /// Bumped on every successful load and every close
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Replace the current track with `path`.
    ///
    /// The old resource is fully closed before the new one is opened. If
    /// the new open fails, the previous source is reopened at its old
    /// position so the engine is left as it was.
    pub fn load(&mut self, path: &Path) -> Result<(), AudioError> {
        let format = SourceFormat::from_path(path)?;
        let restore = self.restore_point();

        if self.current.is_loaded() {
            self.current.close();
            self.generation += 1;
        }

        self.current = format.create_track(Arc::clone(&self.backend));
        match self.current.open(path) {
            Ok(()) => {
                self.generation += 1;
                info!("Loaded {} file: {}", format, path.display());
                Ok(())
            }
            Err(e) => {
                warn!("Failed to load {}: {}", path.display(), e);
                if let Some(point) = restore {
                    self.restore(point);
                }
                Err(e)
            }
        }
    }

    fn restore_point(&self) -> Option<RestorePoint> {
        let source = self.current.source()?.to_path_buf();
        Some(RestorePoint {
            source,
            position: self.current.position(),
            playing: self.current.is_playing(),
        })
    }

    fn restore(&mut self, point: RestorePoint) {
        let track = SourceFormat::from_path(&point.source)
            .map(|format| format.create_track(Arc::clone(&self.backend)));
        let mut track = match track {
            Ok(track) => track,
            Err(e) => {
                warn!("Cannot restore {}: {}", point.source.display(), e);
                return;
            }
        };

        if let Err(e) = track.open(&point.source) {
            warn!("Cannot restore {}: {}", point.source.display(), e);
            return;
        }
        track.set_position(point.position);
        if point.playing {
            track.play();
        }
        self.current = track;
        self.generation += 1;
        info!("Restored previous track: {}", point.source.display());
    }

    /// Run a transport command against the loaded track, or log and skip it
    fn transport<R: Default>(&mut self, command: &str, op: impl FnOnce(&mut dyn Track) -> R) -> R {
        if !self.current.is_loaded() {
            warn!("{} attempted without a loaded audio clip", command);
            return R::default();
        }
        op(self.current.as_mut())
    }

    fn query<R: Default>(&self, op: impl FnOnce(&dyn Track) -> R) -> R {
        if !self.current.is_loaded() {
            debug!("Query on unloaded engine");
            return R::default();
        }
        op(self.current.as_ref())
    }

    /// Release the loaded track. Closing an unloaded engine is a silent no-op.
    pub fn close(&mut self) {
        if !self.current.is_loaded() {
            debug!("Close on unloaded engine");
            return;
        }
        self.current.close();
        self.generation += 1;
    }

    pub fn play(&mut self) {
        self.transport("Playback", |track| track.play())
    }

    pub fn pause(&mut self) {
        self.transport("Pause", |track| track.pause())
    }

    pub fn stop(&mut self) {
        self.transport("Stop", |track| track.stop())
    }

    pub fn fast_forward(&mut self, delta_micros: u64) {
        self.transport("Fast forward", |track| track.fast_forward(delta_micros))
    }

    pub fn rewind(&mut self, delta_micros: u64) {
        self.transport("Rewind", |track| track.rewind(delta_micros))
    }

    pub fn set_position(&mut self, micros: u64) {
        self.transport("Setting playback position", |track| track.set_position(micros))
    }

    pub fn position(&self) -> u64 {
        self.query(|track| track.position())
    }

    pub fn duration(&self) -> u64 {
        self.query(|track| track.duration())
    }

    pub fn is_playing(&self) -> bool {
        self.query(|track| track.is_playing())
    }

    pub fn is_loaded(&self) -> bool {
        self.current.is_loaded()
    }

    pub fn state(&self) -> PlaybackState {
        self.query(|track| track.state())
    }

    pub fn source(&self) -> Option<PathBuf> {
        self.current.source().map(Path::to_path_buf)
    }

    pub fn status(&self) -> PlayerStatus {
        if !self.current.is_loaded() {
            return PlayerStatus::unloaded();
        }
        PlayerStatus {
            loaded: true,
            state: self.current.state(),
            source: self.source(),
            position_micros: self.current.position(),
            duration_micros: self.current.duration(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::tests::mock::{MockBackend, OpenFailure};

    fn engine_with(duration: u64) -> (PlaybackEngine, Arc<MockBackend>) {
        let backend = Arc::new(MockBackend::with_duration(duration));
        (PlaybackEngine::new(backend.clone()), backend)
    }

    #[test]
    fn test_commands_on_unloaded_engine_are_noops() {
        let (mut engine, backend) = engine_with(10_000_000);

        engine.play();
        engine.pause();
        engine.stop();
        engine.fast_forward(1_000_000);
        engine.rewind(1_000_000);
        engine.set_position(5_000_000);
        engine.close();

        assert!(!engine.is_loaded());
        assert!(!engine.is_playing());
        assert_eq!(engine.position(), 0);
        assert_eq!(engine.duration(), 0);
        assert_eq!(engine.state(), PlaybackState::Stopped);
        assert_eq!(engine.status(), PlayerStatus::unloaded());
        assert_eq!(backend.opened(), 0);
    }

    #[test]
    fn test_load_moves_to_loaded_stopped() {
        let (mut engine, _backend) = engine_with(10_000_000);
        let before = engine.generation();

        engine.load(Path::new("/music/a.wav")).unwrap();

        assert!(engine.is_loaded());
        assert_eq!(engine.state(), PlaybackState::Stopped);
        assert_eq!(engine.duration(), 10_000_000);
        assert_eq!(engine.source(), Some(PathBuf::from("/music/a.wav")));
        assert!(engine.generation() > before);
    }

    #[test]
    fn test_reload_opens_one_and_closes_one() {
        let (mut engine, backend) = engine_with(10_000_000);
        engine.load(Path::new("/music/a.wav")).unwrap();
        engine.play();

        engine.load(Path::new("/music/b.wav")).unwrap();

        assert_eq!(backend.opened(), 2);
        assert_eq!(backend.closed(), 1);
        assert_eq!(backend.max_live(), 1);
        assert_eq!(engine.state(), PlaybackState::Stopped);
        assert_eq!(engine.source(), Some(PathBuf::from("/music/b.wav")));
    }

    #[test]
    fn test_unsupported_load_leaves_previous_track_untouched() {
        let (mut engine, backend) = engine_with(10_000_000);
        engine.load(Path::new("/music/a.wav")).unwrap();
        engine.set_position(2_000_000);
        engine.play();

        let result = engine.load(Path::new("/music/b.ogg"));

        assert!(matches!(result, Err(AudioError::UnsupportedFormat { .. })));
        assert!(engine.is_playing());
        assert_eq!(engine.position(), 2_000_000);
        assert_eq!(backend.closed(), 0);
    }

    #[test]
    fn test_failed_open_restores_previous_track() {
        let (mut engine, backend) = engine_with(10_000_000);
        engine.load(Path::new("/music/a.wav")).unwrap();
        engine.set_position(3_000_000);
        engine.play();

        backend.fail_next_open(OpenFailure::Unavailable);
        let result = engine.load(Path::new("/music/b.wav"));

        assert!(matches!(result, Err(AudioError::ResourceUnavailable(_))));
        assert!(engine.is_loaded());
        assert!(engine.is_playing());
        assert_eq!(engine.source(), Some(PathBuf::from("/music/a.wav")));
        assert_eq!(engine.position(), 3_000_000);
        assert_eq!(backend.max_live(), 1);
        assert_eq!(backend.live(), 1);
    }

    #[test]
    fn test_failed_open_on_empty_engine_stays_unloaded() {
        let (mut engine, backend) = engine_with(10_000_000);
        backend.fail_next_open(OpenFailure::Io);

        let result = engine.load(Path::new("/music/missing.wav"));

        assert!(matches!(result, Err(AudioError::IoFailure { .. })));
        assert!(!engine.is_loaded());
        assert_eq!(backend.live(), 0);
    }

    #[test]
    fn test_close_unloads_and_bumps_generation() {
        let (mut engine, backend) = engine_with(10_000_000);
        engine.load(Path::new("/music/a.wav")).unwrap();
        let generation = engine.generation();

        engine.close();
        assert!(!engine.is_loaded());
        assert_eq!(backend.live(), 0);
        assert!(engine.generation() > generation);

        let closed_generation = engine.generation();
        engine.close();
        assert_eq!(backend.closed(), 1);
        assert_eq!(engine.generation(), closed_generation);
    }

    #[test]
    fn test_close_on_fresh_engine_is_noop() {
        let (mut engine, backend) = engine_with(10_000_000);
        engine.close();
        engine.close();
        assert_eq!(engine.generation(), 0);
        assert_eq!(backend.closed(), 0);
        assert!(!engine.is_loaded());
    }

    #[test]
    fn test_position_stays_within_bounds() {
        let (mut engine, _backend) = engine_with(10_000_000);
        engine.load(Path::new("/music/a.wav")).unwrap();

        let steps: [(&str, u64); 6] = [
            ("ff", 7_000_000),
            ("ff", 7_000_000),
            ("rew", 3_000_000),
            ("set", 99_000_000),
            ("rew", 50_000_000),
            ("set", 1),
        ];
        for (op, value) in steps {
            match op {
                "ff" => engine.fast_forward(value),
                "rew" => engine.rewind(value),
                _ => engine.set_position(value),
            }
            assert!(engine.position() <= engine.duration());
        }
        assert_eq!(engine.position(), 1);
    }

    #[test]
    fn test_stop_always_rewinds_to_zero() {
        let (mut engine, _backend) = engine_with(10_000_000);
        engine.load(Path::new("/music/a.wav")).unwrap();

        engine.set_position(4_000_000);
        engine.stop();
        assert_eq!(engine.position(), 0);

        engine.play();
        engine.set_position(6_000_000);
        engine.pause();
        engine.stop();
        assert_eq!(engine.position(), 0);
        assert_eq!(engine.state(), PlaybackState::Stopped);
    }

    #[test]
    fn test_concurrent_loads_never_overlap_resources() {
        let (engine, backend) = engine_with(10_000_000);
        let shared = engine.into_shared();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let shared = Arc::clone(&shared);
                std::thread::spawn(move || {
                    let path = PathBuf::from(format!("/music/{}.wav", i));
                    shared.lock().unwrap().load(&path).unwrap();
                    shared.lock().unwrap().play();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(backend.opened(), 8);
        assert_eq!(backend.closed(), 7);
        assert_eq!(backend.max_live(), 1);
        assert!(shared.lock().unwrap().is_loaded());
    }
}
