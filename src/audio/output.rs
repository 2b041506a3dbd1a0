use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
use log::{debug, error, info, warn};

use crate::audio::{AudioBackend, AudioResource, ClipTiming, DecodedClip, LinearResampler, WavDecoder};
use crate::error::AudioError;

/// Opens clips on the system's cpal output.
///
/// Each open decodes the whole file, fits it to the device's native rate
/// and channel count, then binds it to a stream owned by a dedicated
/// "audio-output" thread.
#[derive(Debug, Default)]
pub struct ClipBackend {
    preferred_device: Mutex<Option<String>>,
}

impl ClipBackend {
    pub fn new(preferred_device: Option<String>) -> Self {
        Self {
            preferred_device: Mutex::new(preferred_device),
        }
    }

    /// Device used from the next `open` on; `None` means the host default
    pub fn set_preferred_device(&self, device: Option<String>) {
        info!("Preferred output device: {}", device.as_deref().unwrap_or("default"));
        *self.lock_preferred() = device;
    }

    pub fn preferred_device(&self) -> Option<String> {
        self.lock_preferred().clone()
    }

    fn lock_preferred(&self) -> MutexGuard<'_, Option<String>> {
        self.preferred_device.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Names of every output device on the default host
    pub fn list_output_devices() -> Result<Vec<String>, AudioError> {
        let host = cpal::default_host();
        let devices = host.output_devices().map_err(|e| {
            AudioError::ResourceUnavailable(format!("Failed to enumerate devices: {}", e))
        })?;
        Ok(devices.filter_map(|d| d.name().ok()).collect())
    }

    /// The preferred device by name, else the host default
    fn select_device(&self) -> Result<Device, AudioError> {
        let host = cpal::default_host();

        if let Some(name) = self.preferred_device().as_deref() {
            let found = host
                .output_devices()
                .ok()
                .and_then(|mut devices| devices.find(|d| d.name().map_or(false, |n| n == name)));
            match found {
                Some(device) => return Ok(device),
                None => warn!("Output device '{}' not found, using default", name),
            }
        }

        host.default_output_device().ok_or_else(|| {
            AudioError::ResourceUnavailable("No default output device available".to_string())
        })
    }
}

impl AudioBackend for ClipBackend {
    fn open(&self, path: &Path) -> Result<Box<dyn AudioResource>, AudioError> {
        let decoded = WavDecoder::decode_file(path)?;

        let device = self.select_device()?;
        let default_config = device.default_output_config().map_err(|e| {
            AudioError::ResourceUnavailable(format!("Failed to get default config: {}", e))
        })?;
        let sample_format = default_config.sample_format();
        let config: StreamConfig = default_config.config();

        let clip = LinearResampler::fit_clip(&decoded, config.sample_rate.0, config.channels);
        debug!(
            "Clip fitted from {}Hz/{}ch to {}Hz/{}ch",
            decoded.sample_rate, decoded.channels, clip.sample_rate, clip.channels
        );

        ClipOutput::spawn(device, config, sample_format, clip)
            .map(|output| Box::new(output) as Box<dyn AudioResource>)
    }
}

/// Cursor shared between the transport and the output callback
struct PlaybackCursor {
    frame: AtomicUsize,
    running: AtomicBool,
}

enum OutputCommand {
    Shutdown,
}

/// An open output line playing one fitted clip
struct ClipOutput {
    cursor: Arc<PlaybackCursor>,
    timing: ClipTiming,
    commands: Sender<OutputCommand>,
    thread: Option<JoinHandle<()>>,
}

impl ClipOutput {
    fn spawn(
        device: Device,
        config: StreamConfig,
        sample_format: SampleFormat,
        clip: DecodedClip,
    ) -> Result<Self, AudioError> {
        let cursor = Arc::new(PlaybackCursor {
            frame: AtomicUsize::new(0),
            running: AtomicBool::new(false),
        });
        let timing = clip.timing();
        let samples: Arc<[f32]> = clip.samples.into();

        let (command_tx, command_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();
        let thread_cursor = Arc::clone(&cursor);

        let thread = thread::Builder::new()
            .name("audio-output".to_string())
            .spawn(move || {
                raise_thread_priority();
                let stream = match sample_format {
                    SampleFormat::F32 => build_stream::<f32>(&device, &config, samples, thread_cursor),
                    SampleFormat::I16 => build_stream::<i16>(&device, &config, samples, thread_cursor),
                    SampleFormat::U16 => build_stream::<u16>(&device, &config, samples, thread_cursor),
                    other => Err(AudioError::ResourceUnavailable(format!(
                        "Unsupported sample format: {:?}",
                        other
                    ))),
                };
                run_output_thread(stream, ready_tx, command_rx);
            })
            .map_err(|e| {
                AudioError::ResourceUnavailable(format!("Failed to create audio thread: {}", e))
            })?;

        let ready = ready_rx.recv().unwrap_or_else(|_| {
            Err(AudioError::ResourceUnavailable(
                "Audio thread exited before the stream was ready".to_string(),
            ))
        });
        if let Err(e) = ready {
            let _ = thread.join();
            return Err(e);
        }

        info!("Output line open: {}Hz, {} frames", timing.sample_rate, timing.frames);
        Ok(Self {
            cursor,
            timing,
            commands: command_tx,
            thread: Some(thread),
        })
    }

    fn shutdown(&mut self) -> Result<(), AudioError> {
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };
        self.cursor.running.store(false, Ordering::SeqCst);
        // A send error means the thread is already gone; join reports why
        let _ = self.commands.send(OutputCommand::Shutdown);
        thread.join().map_err(|_| {
            AudioError::AlreadyClosedWarning("audio output thread panicked".to_string())
        })
    }
}

impl AudioResource for ClipOutput {
    fn start(&mut self) {
        if self.cursor.frame.load(Ordering::SeqCst) < self.timing.frames {
            self.cursor.running.store(true, Ordering::SeqCst);
        }
    }

    fn stop(&mut self) {
        self.cursor.running.store(false, Ordering::SeqCst);
    }

    fn is_running(&self) -> bool {
        self.cursor.running.load(Ordering::SeqCst)
    }

    fn position_micros(&self) -> u64 {
        self.timing.micros_at(self.cursor.frame.load(Ordering::SeqCst))
    }

    fn set_position_micros(&mut self, micros: u64) {
        self.cursor
            .frame
            .store(self.timing.frame_at(micros), Ordering::SeqCst);
    }

    fn duration_micros(&self) -> u64 {
        self.timing.duration_micros()
    }

    fn close(mut self: Box<Self>) -> Result<(), AudioError> {
        self.shutdown()
    }
}

impl Drop for ClipOutput {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!("{}", e);
        }
    }
}

/// Body of the output thread: report readiness, then hold the stream until
/// shutdown. The stream is not `Send`, so it never leaves this thread.
fn run_output_thread(
    stream: Result<Stream, AudioError>,
    ready: Sender<Result<(), AudioError>>,
    commands: Receiver<OutputCommand>,
) {
    let stream = match stream {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };
    if let Err(e) = stream.play() {
        let _ = ready.send(Err(AudioError::ResourceUnavailable(format!(
            "Failed to start audio stream: {}",
            e
        ))));
        return;
    }
    let _ = ready.send(Ok(()));

    // Blocks until shutdown or until the owning handle is dropped
    while let Ok(command) = commands.recv() {
        match command {
            OutputCommand::Shutdown => break,
        }
    }

    let _ = stream.pause();
    debug!("Audio output thread finished");
}

fn build_stream<T>(
    device: &Device,
    config: &StreamConfig,
    samples: Arc<[f32]>,
    cursor: Arc<PlaybackCursor>,
) -> Result<Stream, AudioError>
where
    T: SizedSample + FromSample<f32> + Send + 'static,
{
    let channels = config.channels.max(1) as usize;
    let total_frames = samples.len() / channels;

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let silence: T = cpal::Sample::from_sample(0.0f32);
                if !cursor.running.load(Ordering::SeqCst) {
                    data.iter_mut().for_each(|s| *s = silence);
                    return;
                }

                let start = cursor.frame.load(Ordering::SeqCst).min(total_frames);
                let wanted = data.len() / channels;
                let end = (start + wanted).min(total_frames);
                let source = &samples[start * channels..end * channels];

                for (i, sample) in data.iter_mut().enumerate() {
                    *sample = source.get(i).map_or(silence, |&s| cpal::Sample::from_sample(s));
                }

                // A seek landing mid-callback wins over this advance
                let _ = cursor
                    .frame
                    .compare_exchange(start, end, Ordering::SeqCst, Ordering::SeqCst);
                if end >= total_frames {
                    cursor.running.store(false, Ordering::SeqCst);
                }
            },
            move |err| {
                error!("Audio stream error: {}", err);
            },
            None,
        )
        .map_err(|e| AudioError::ResourceUnavailable(format!("Failed to build output stream: {}", e)))
}

#[cfg(target_os = "macos")]
fn raise_thread_priority() {
    unsafe {
        let thread = libc::pthread_self();
        let mut policy: libc::c_int = 0;
        let mut param: libc::sched_param = std::mem::zeroed();

        if libc::pthread_getschedparam(thread, &mut policy, &mut param) == 0 {
            param.sched_priority = 63;
            let _ = libc::pthread_setschedparam(thread, libc::SCHED_FIFO, &param);
        }
    }
}

#[cfg(not(target_os = "macos"))]
fn raise_thread_priority() {}
