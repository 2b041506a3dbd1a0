use std::fs::File;
use std::path::Path;

use log::{debug, warn};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::AudioError;

/// A whole clip decoded into memory as interleaved f32 samples
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedClip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
    pub frames: usize,
}

impl DecodedClip {
    pub fn timing(&self) -> ClipTiming {
        ClipTiming {
            sample_rate: self.sample_rate,
            frames: self.frames,
        }
    }

    pub fn duration_micros(&self) -> u64 {
        self.timing().duration_micros()
    }
}

/// Frame/time conversions for a clip of known length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipTiming {
    pub sample_rate: u32,
    pub frames: usize,
}

impl ClipTiming {
    pub fn duration_micros(&self) -> u64 {
        self.micros_at(self.frames)
    }

    /// Frame index for a position, clamped to the clip
    pub fn frame_at(&self, micros: u64) -> usize {
        let frame = micros as u128 * self.sample_rate as u128 / 1_000_000;
        frame.min(self.frames as u128) as usize
    }

    pub fn micros_at(&self, frame: usize) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        (frame.min(self.frames) as u128 * 1_000_000 / self.sample_rate as u128) as u64
    }
}

/// WAV decoder built on symphonia's probe and codec registry
pub struct WavDecoder;

impl WavDecoder {
    /// Decode the first audio track of `path` in full
    pub fn decode_file(path: &Path) -> Result<DecodedClip, AudioError> {
        let file = File::open(path).map_err(|e| AudioError::io(path, e))?;
        let media_source = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext_str) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext_str);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, media_source, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| Self::map_error(path, e))?;
        let mut format_reader = probed.format;

        let track = format_reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| AudioError::UnsupportedFormat {
                format: "no audio track found in WAV file".to_string(),
            })?;
        let track_id = track.id;
        let mut sample_rate = track.codec_params.sample_rate.unwrap_or(44100);
        let mut channels = track.codec_params.channels.map(|c| c.count() as u16).unwrap_or(2);

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| Self::map_error(path, e))?;

        let mut samples = Vec::new();
        loop {
            let packet = match format_reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref err))
                    if err.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(e) => return Err(Self::map_error(path, e)),
            };
            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(msg)) => {
                    warn!("Skipping undecodable packet in {}: {}", path.display(), msg);
                    continue;
                }
                Err(e) => return Err(Self::map_error(path, e)),
            };

            let spec = *decoded.spec();
            sample_rate = spec.rate;
            channels = spec.channels.count() as u16;

            let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
            sample_buf.copy_interleaved_ref(decoded);
            samples.extend_from_slice(sample_buf.samples());
        }

        let frames = if channels > 0 {
            samples.len() / channels as usize
        } else {
            0
        };
        debug!(
            "Decoded {}: {} frames, {}Hz, {} channels",
            path.display(),
            frames,
            sample_rate,
            channels
        );

        Ok(DecodedClip {
            samples,
            sample_rate,
            channels,
            frames,
        })
    }

    fn map_error(path: &Path, error: SymphoniaError) -> AudioError {
        match error {
            SymphoniaError::IoError(e) => AudioError::io(path, e),
            SymphoniaError::Unsupported(what) => AudioError::UnsupportedFormat {
                format: what.to_string(),
            },
            other => AudioError::UnsupportedFormat {
                format: format!("unreadable WAV data ({})", other),
            },
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Write a 16-bit PCM WAV with a constant sample value
    pub(crate) fn write_pcm_wav(
        path: &PathBuf,
        sample_rate: u32,
        channels: u16,
        frames: u32,
        value: i16,
    ) {
        let mut file = File::create(path).unwrap();
        let block_align = channels * 2;
        let data_size = frames * block_align as u32;

        file.write_all(b"RIFF").unwrap();
        file.write_all(&(36 + data_size).to_le_bytes()).unwrap();
        file.write_all(b"WAVE").unwrap();
        file.write_all(b"fmt ").unwrap();
        file.write_all(&16u32.to_le_bytes()).unwrap();
        file.write_all(&1u16.to_le_bytes()).unwrap();
        file.write_all(&channels.to_le_bytes()).unwrap();
        file.write_all(&sample_rate.to_le_bytes()).unwrap();
        file.write_all(&(sample_rate * block_align as u32).to_le_bytes()).unwrap();
        file.write_all(&block_align.to_le_bytes()).unwrap();
        file.write_all(&16u16.to_le_bytes()).unwrap();
        file.write_all(b"data").unwrap();
        file.write_all(&data_size.to_le_bytes()).unwrap();
        for _ in 0..frames * channels as u32 {
            file.write_all(&value.to_le_bytes()).unwrap();
        }
    }

    #[test]
    fn test_decode_stereo_wav() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tone.wav");
        write_pcm_wav(&path, 8000, 2, 8000, 16384);

        let clip = WavDecoder::decode_file(&path).unwrap();

        assert_eq!(clip.sample_rate, 8000);
        assert_eq!(clip.channels, 2);
        assert_eq!(clip.frames, 8000);
        assert_eq!(clip.samples.len(), 16000);
        assert_eq!(clip.duration_micros(), 1_000_000);
        assert!((clip.samples[0] - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_missing_file_is_io_failure() {
        let result = WavDecoder::decode_file(Path::new("/nonexistent/file.wav"));
        assert!(matches!(result, Err(AudioError::IoFailure { .. })));
    }

    #[test]
    fn test_garbage_is_unsupported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("noise.wav");
        std::fs::write(&path, b"definitely not a riff header").unwrap();

        let result = WavDecoder::decode_file(&path);
        assert!(matches!(result, Err(AudioError::UnsupportedFormat { .. })));
    }

    #[test]
    fn test_frame_and_micros_conversion() {
        let clip = DecodedClip {
            samples: vec![0.0; 88200],
            sample_rate: 44100,
            channels: 2,
            frames: 44100,
        };
        assert_eq!(clip.timing().frame_at(500_000), 22050);
        assert_eq!(clip.timing().frame_at(u64::MAX), 44100);
        assert_eq!(clip.timing().micros_at(22050), 500_000);
        assert_eq!(clip.timing().micros_at(usize::MAX), 1_000_000);
    }
}
