use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ErrorSeverity, PlayerError};

/// Transport state of the loaded track as seen from outside the engine
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl PlaybackState {
    /// Get a human-readable string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackState::Stopped => "Stopped",
            PlaybackState::Playing => "Playing",
            PlaybackState::Paused => "Paused",
        }
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Point-in-time snapshot of the engine, taken under the engine lock
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PlayerStatus {
    pub loaded: bool,
    pub state: PlaybackState,
    pub source: Option<PathBuf>,
    pub position_micros: u64,
    pub duration_micros: u64,
}

impl PlayerStatus {
    pub fn unloaded() -> Self {
        Self {
            loaded: false,
            state: PlaybackState::Stopped,
            source: None,
            position_micros: 0,
            duration_micros: 0,
        }
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.state, PlaybackState::Playing)
    }

    /// Get progress as a fraction (0.0 to 1.0)
    pub fn progress(&self) -> f32 {
        if self.duration_micros > 0 {
            self.position_micros as f32 / self.duration_micros as f32
        } else {
            0.0
        }
    }

    pub fn remaining_micros(&self) -> u64 {
        self.duration_micros.saturating_sub(self.position_micros)
    }

    /// File stem of the loaded source, or "No track loaded"
    pub fn display_name(&self) -> String {
        self.source
            .as_ref()
            .and_then(|p| p.file_stem())
            .and_then(|s| s.to_str())
            .map(str::to_string)
            .unwrap_or_else(|| "No track loaded".to_string())
    }
}

impl Default for PlayerStatus {
    fn default() -> Self {
        Self::unloaded()
    }
}

/// User-visible outcome of a failed command
#[derive(Debug, Clone, Serialize)]
pub struct StatusMessage {
    pub severity: ErrorSeverity,
    pub text: String,
    pub suggestions: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl StatusMessage {
    pub fn from_error(error: &PlayerError) -> Self {
        Self {
            severity: error.severity(),
            text: error.user_message(),
            suggestions: error.recovery_suggestions(),
            timestamp: Utc::now(),
        }
    }
}
