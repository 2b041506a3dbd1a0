use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info, warn};

use crate::audio::{AudioBackend, AudioResource, SourceFormat};
use crate::error::AudioError;
use crate::models::PlaybackState;

/// Transport capability over one exclusively owned audio resource.
///
/// Every method except `open` is a no-op (or returns zero/false) while no
/// resource is loaded. Positions are microseconds, always clamped to
/// `[0, duration]`.
pub trait Track: Send {
    /// Open `path`, releasing any resource already held first
    fn open(&mut self, path: &Path) -> Result<(), AudioError>;

    /// Stop and release the resource. Idempotent.
    fn close(&mut self);

    fn is_loaded(&self) -> bool;

    /// Path of the loaded source
    fn source(&self) -> Option<&Path>;

    /// Start or resume from the current position
    fn play(&mut self);

    /// Halt output, keeping the position
    fn pause(&mut self);

    /// Halt output and rewind to 0
    fn stop(&mut self);

    fn fast_forward(&mut self, delta_micros: u64);

    fn rewind(&mut self, delta_micros: u64);

    fn set_position(&mut self, micros: u64);

    fn duration(&self) -> u64;

    fn position(&self) -> u64;

    fn is_playing(&self) -> bool;

    fn state(&self) -> PlaybackState;
}

struct LoadedClip {
    resource: Box<dyn AudioResource>,
    source: PathBuf,
    duration_micros: u64,
    state: PlaybackState,
}

/// Track backed by a fully decoded clip from an [`AudioBackend`].
///
/// One implementation serves every [`SourceFormat`]; the backend is
/// responsible for decoding.
pub struct ClipTrack {
    backend: Arc<dyn AudioBackend>,
    loaded: Option<LoadedClip>,
}

impl ClipTrack {
    pub fn new(backend: Arc<dyn AudioBackend>) -> Self {
        Self {
            backend,
            loaded: None,
        }
    }

    fn seek_to(clip: &mut LoadedClip, micros: u64) -> u64 {
        let target = micros.min(clip.duration_micros);
        clip.resource.set_position_micros(target);
        target
    }
}

impl Track for ClipTrack {
    fn open(&mut self, path: &Path) -> Result<(), AudioError> {
        SourceFormat::from_path(path)?;

        if self.loaded.is_some() {
            self.close();
        }

        info!("Opening audio file: {}", path.display());
        let resource = self.backend.open(path)?;
        let duration_micros = resource.duration_micros();

        self.loaded = Some(LoadedClip {
            resource,
            source: path.to_path_buf(),
            duration_micros,
            state: PlaybackState::Stopped,
        });
        info!(
            "Audio file opened and ready for playback ({:.2}s)",
            duration_micros as f64 / 1_000_000.0
        );
        Ok(())
    }

    fn close(&mut self) {
        let Some(mut clip) = self.loaded.take() else {
            return;
        };

        clip.resource.stop();
        match clip.resource.close() {
            Ok(()) => info!("Clip closed: {}", clip.source.display()),
            Err(e) => warn!("Failed to close {} cleanly: {}", clip.source.display(), e),
        }
    }

    fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    fn source(&self) -> Option<&Path> {
        self.loaded.as_ref().map(|clip| clip.source.as_path())
    }

    fn play(&mut self) {
        if let Some(clip) = self.loaded.as_mut() {
            clip.resource.start();
            clip.state = PlaybackState::Playing;
            info!("Playback started");
        }
    }

    fn pause(&mut self) {
        if let Some(clip) = self.loaded.as_mut() {
            if !clip.resource.is_running() {
                return;
            }
            clip.resource.stop();
            clip.state = PlaybackState::Paused;
            info!("Playback paused");
        }
    }

    fn stop(&mut self) {
        if let Some(clip) = self.loaded.as_mut() {
            clip.resource.stop();
            clip.resource.set_position_micros(0);
            clip.state = PlaybackState::Stopped;
            info!("Playback stopped and reset");
        }
    }

    fn fast_forward(&mut self, delta_micros: u64) {
        if let Some(clip) = self.loaded.as_mut() {
            let current = clip.resource.position_micros();
            let target = Self::seek_to(clip, current.saturating_add(delta_micros));
            debug!("Fast forward by {}us to {}us", delta_micros, target);
        }
    }

    fn rewind(&mut self, delta_micros: u64) {
        if let Some(clip) = self.loaded.as_mut() {
            let current = clip.resource.position_micros().min(clip.duration_micros);
            let target = Self::seek_to(clip, current.saturating_sub(delta_micros));
            debug!("Rewind by {}us to {}us", delta_micros, target);
        }
    }

    fn set_position(&mut self, micros: u64) {
        if let Some(clip) = self.loaded.as_mut() {
            let target = Self::seek_to(clip, micros);
            debug!("Playback position set to {}us", target);
        }
    }

    fn duration(&self) -> u64 {
        self.loaded.as_ref().map_or(0, |clip| clip.duration_micros)
    }

    fn position(&self) -> u64 {
        self.loaded
            .as_ref()
            .map_or(0, |clip| clip.resource.position_micros().min(clip.duration_micros))
    }

    fn is_playing(&self) -> bool {
        self.loaded
            .as_ref()
            .map_or(false, |clip| clip.resource.is_running())
    }

    fn state(&self) -> PlaybackState {
        match self.loaded.as_ref() {
            None => PlaybackState::Stopped,
            // The clip halted itself at the end of the data
            Some(clip) if clip.state == PlaybackState::Playing && !clip.resource.is_running() => {
                PlaybackState::Stopped
            }
            Some(clip) => clip.state,
        }
    }
}

impl Drop for ClipTrack {
    fn drop(&mut self) {
        self.close();
    }
}
