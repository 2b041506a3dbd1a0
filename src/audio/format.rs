use std::path::Path;
use std::sync::Arc;

use crate::audio::{AudioBackend, ClipTrack, Track};
use crate::error::AudioError;

/// Container formats the player can open, selected by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Wav,
}

impl SourceFormat {
    /// Every format in dispatch order
    pub const ALL: [SourceFormat; 1] = [SourceFormat::Wav];

    /// Map a path's extension (case-insensitive) to a format
    pub fn from_path(path: &Path) -> Result<Self, AudioError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|s| s.to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "wav" => Ok(SourceFormat::Wav),
            "" => Err(AudioError::UnsupportedFormat {
                format: "no file extension".to_string(),
            }),
            other => Err(AudioError::UnsupportedFormat {
                format: other.to_string(),
            }),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            SourceFormat::Wav => "wav",
        }
    }

    pub fn supported_extensions() -> Vec<&'static str> {
        Self::ALL.iter().map(SourceFormat::extension).collect()
    }

    /// Build an unloaded track able to open this format
    pub fn create_track(&self, backend: Arc<dyn AudioBackend>) -> Box<dyn Track> {
        match self {
            SourceFormat::Wav => Box::new(ClipTrack::new(backend)),
        }
    }
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension().to_uppercase())
    }
}
