pub mod engine;
pub mod format;
pub mod track;
pub mod position;
pub mod decoder;
pub mod resampler;
pub mod output;

#[cfg(test)]
pub mod tests;

use std::path::Path;
use crate::error::AudioError;

pub use engine::{PlaybackEngine, SharedEngine};
pub use format::SourceFormat;
pub use track::{ClipTrack, Track};
pub use position::{PositionDisplay, PositionSync, SeekOutcome, SyncPhase, TickOutcome};
pub use decoder::{ClipTiming, DecodedClip, WavDecoder};
pub use resampler::LinearResampler;
pub use output::ClipBackend;

/// One open platform audio stream: a decoded clip bound to an output line.
///
/// The handle is exclusively owned; `close` consumes it so a released
/// resource cannot be touched again.
pub trait AudioResource: Send {
    /// Start or resume output from the current cursor
    fn start(&mut self);

    /// Halt output, keeping the cursor where it is
    fn stop(&mut self);

    /// Whether output is currently running
    fn is_running(&self) -> bool;

    fn position_micros(&self) -> u64;

    /// Move the cursor. Callers clamp to `[0, duration_micros]`.
    fn set_position_micros(&mut self, micros: u64);

    fn duration_micros(&self) -> u64;

    /// Release the output line and decoded data
    fn close(self: Box<Self>) -> Result<(), AudioError>;
}

/// Platform capability that turns a source path into an open resource
pub trait AudioBackend: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn AudioResource>, AudioError>;
}
