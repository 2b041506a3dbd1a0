//! Counting test doubles for the audio backend and the position display.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::audio::{AudioBackend, AudioResource, PositionDisplay};
use crate::error::AudioError;

/// Failure to inject into the next `open`
#[derive(Debug, Clone, Copy)]
pub enum OpenFailure {
    Unavailable,
    Io,
}

#[derive(Debug, Default)]
struct Counters {
    opened: usize,
    closed: usize,
    live: usize,
    max_live: usize,
    opened_paths: Vec<PathBuf>,
    fail_next_open: Option<OpenFailure>,
    fail_next_close: bool,
}

#[derive(Debug, Default)]
struct ClipState {
    position: u64,
    duration: u64,
    running: bool,
}

impl ClipState {
    fn advance(&mut self, micros: u64) {
        if !self.running {
            return;
        }
        self.position = self.position.saturating_add(micros).min(self.duration);
        if self.position == self.duration {
            self.running = false;
        }
    }
}

/// Backend whose resources only move a cursor. Playback time advances
/// through [`MockBackend::advance`].
pub struct MockBackend {
    duration: Mutex<u64>,
    counters: Arc<Mutex<Counters>>,
    current: Mutex<Option<Arc<Mutex<ClipState>>>>,
}

impl MockBackend {
    pub fn with_duration(duration_micros: u64) -> Self {
        Self {
            duration: Mutex::new(duration_micros),
            counters: Arc::new(Mutex::new(Counters::default())),
            current: Mutex::new(None),
        }
    }

    /// Duration given to resources opened from now on
    pub fn set_duration(&self, duration_micros: u64) {
        *self.duration.lock().unwrap() = duration_micros;
    }

    pub fn opened(&self) -> usize {
        self.counters.lock().unwrap().opened
    }

    pub fn closed(&self) -> usize {
        self.counters.lock().unwrap().closed
    }

    pub fn live(&self) -> usize {
        self.counters.lock().unwrap().live
    }

    /// Highest number of simultaneously open resources ever observed
    pub fn max_live(&self) -> usize {
        self.counters.lock().unwrap().max_live
    }

    pub fn opened_paths(&self) -> Vec<PathBuf> {
        self.counters.lock().unwrap().opened_paths.clone()
    }

    pub fn fail_next_open(&self, failure: OpenFailure) {
        self.counters.lock().unwrap().fail_next_open = Some(failure);
    }

    pub fn fail_next_close(&self) {
        self.counters.lock().unwrap().fail_next_close = true;
    }

    /// Let `micros` of playback elapse on the most recently opened resource
    pub fn advance(&self, micros: u64) {
        if let Some(clip) = self.current.lock().unwrap().as_ref() {
            clip.lock().unwrap().advance(micros);
        }
    }

    pub fn run_to_end(&self) {
        self.advance(u64::MAX);
    }
}

impl AudioBackend for MockBackend {
    fn open(&self, path: &Path) -> Result<Box<dyn AudioResource>, AudioError> {
        let mut counters = self.counters.lock().unwrap();
        match counters.fail_next_open.take() {
            Some(OpenFailure::Unavailable) => {
                return Err(AudioError::ResourceUnavailable("mock line busy".to_string()));
            }
            Some(OpenFailure::Io) => {
                return Err(AudioError::io(
                    path,
                    std::io::Error::new(std::io::ErrorKind::NotFound, "mock missing"),
                ));
            }
            None => {}
        }

        counters.opened += 1;
        counters.live += 1;
        counters.max_live = counters.max_live.max(counters.live);
        counters.opened_paths.push(path.to_path_buf());

        let clip = Arc::new(Mutex::new(ClipState {
            duration: *self.duration.lock().unwrap(),
            ..ClipState::default()
        }));
        *self.current.lock().unwrap() = Some(Arc::clone(&clip));

        Ok(Box::new(MockResource {
            clip,
            counters: Arc::clone(&self.counters),
        }))
    }
}

struct MockResource {
    clip: Arc<Mutex<ClipState>>,
    counters: Arc<Mutex<Counters>>,
}

impl AudioResource for MockResource {
    fn start(&mut self) {
        let mut clip = self.clip.lock().unwrap();
        if clip.position < clip.duration {
            clip.running = true;
        }
    }

    fn stop(&mut self) {
        self.clip.lock().unwrap().running = false;
    }

    fn is_running(&self) -> bool {
        self.clip.lock().unwrap().running
    }

    fn position_micros(&self) -> u64 {
        self.clip.lock().unwrap().position
    }

    fn set_position_micros(&mut self, micros: u64) {
        self.clip.lock().unwrap().position = micros;
    }

    fn duration_micros(&self) -> u64 {
        self.clip.lock().unwrap().duration
    }

    fn close(self: Box<Self>) -> Result<(), AudioError> {
        let mut counters = self.counters.lock().unwrap();
        counters.closed += 1;
        counters.live -= 1;
        if std::mem::take(&mut counters.fail_next_close) {
            return Err(AudioError::AlreadyClosedWarning("mock stream error".to_string()));
        }
        Ok(())
    }
}

/// Display that records every call it receives
#[derive(Default)]
pub struct RecordingDisplay {
    pushes: Mutex<Vec<(u64, u64)>>,
    loaded: Mutex<Vec<Option<u64>>>,
}

impl RecordingDisplay {
    pub fn pushes(&self) -> Vec<(u64, u64)> {
        self.pushes.lock().unwrap().clone()
    }

    pub fn push_count(&self) -> usize {
        self.pushes.lock().unwrap().len()
    }

    pub fn last_push(&self) -> Option<(u64, u64)> {
        self.pushes.lock().unwrap().last().copied()
    }

    pub fn loaded_events(&self) -> Vec<Option<u64>> {
        self.loaded.lock().unwrap().clone()
    }
}

impl PositionDisplay for RecordingDisplay {
    fn push_position(&self, current_micros: u64, total_micros: u64) {
        self.pushes.lock().unwrap().push((current_micros, total_micros));
    }

    fn show_loaded(&self, total_micros: Option<u64>) {
        self.loaded.lock().unwrap().push(total_micros);
    }
}
