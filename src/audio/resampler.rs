/*!
Linear resampling and channel mapping for whole decoded clips.

The output device runs at its own rate and channel count; a clip is fitted
to it once at open time so the output callback only copies frames.

```ignore
use crate::audio::resampler::LinearResampler;

let rs = LinearResampler::new(44_100, 48_000, 2);
let output = rs.process(&input_interleaved_f32);
```
*/

use crate::audio::DecodedClip;

#[derive(Debug, Clone)]
pub struct LinearResampler {
    src_rate: u32,
    dst_rate: u32,
    channels: usize,
    // Source frames advanced per output frame
    step: f64,
}

impl LinearResampler {
    pub fn new(src_rate: u32, dst_rate: u32, channels: usize) -> Self {
        let step = if dst_rate == 0 { 0.0 } else { src_rate as f64 / dst_rate as f64 };
        Self {
            src_rate,
            dst_rate,
            channels,
            step,
        }
    }

    /// Resample a complete interleaved block. The last source frame is
    /// held for interpolation past the end, so output length is
    /// `ceil(frames * dst / src)`.
    pub fn process(&self, input: &[f32]) -> Vec<f32> {
        if self.channels == 0 || self.dst_rate == 0 || self.src_rate == 0 {
            return Vec::new();
        }
        if self.src_rate == self.dst_rate {
            return input.to_vec();
        }

        let ch = self.channels;
        let in_frames = input.len() / ch;
        if in_frames == 0 {
            return Vec::new();
        }

        let out_frames =
            ((in_frames as u128 * self.dst_rate as u128 + self.src_rate as u128 - 1) / self.src_rate as u128) as usize;
        let mut out = Vec::with_capacity(out_frames * ch);

        for n in 0..out_frames {
            let pos = n as f64 * self.step;
            let i = (pos.floor() as usize).min(in_frames - 1);
            let next = (i + 1).min(in_frames - 1);
            let frac = (pos - i as f64) as f32;

            out.extend((0..ch).map(|c| {
                let s0 = input[i * ch + c];
                let s1 = input[next * ch + c];
                s0 + (s1 - s0) * frac
            }));
        }
        out
    }

    /// Fit a clip to an output line's rate and channel count
    pub fn fit_clip(clip: &DecodedClip, dst_rate: u32, dst_channels: u16) -> DecodedClip {
        let remapped = remap_channels(&clip.samples, clip.channels as usize, dst_channels as usize);
        let resampler = LinearResampler::new(clip.sample_rate, dst_rate, dst_channels as usize);
        let samples = resampler.process(&remapped);
        let frames = if dst_channels == 0 {
            0
        } else {
            samples.len() / dst_channels as usize
        };
        DecodedClip {
            samples,
            sample_rate: dst_rate,
            channels: dst_channels,
            frames,
        }
    }
}

/// Duplicate mono across every output channel, otherwise truncate extra
/// channels or pad missing ones with silence
pub fn remap_channels(samples: &[f32], from: usize, to: usize) -> Vec<f32> {
    if from == to || from == 0 {
        return samples.to_vec();
    }
    let frames = samples.len() / from;
    let mut remapped = Vec::with_capacity(frames * to);
    for frame in samples.chunks_exact(from) {
        if from == 1 {
            remapped.extend(std::iter::repeat(frame[0]).take(to));
        } else if to <= from {
            remapped.extend_from_slice(&frame[..to]);
        } else {
            remapped.extend_from_slice(frame);
            remapped.extend(std::iter::repeat(0.0).take(to - from));
        }
    }
    remapped
}
