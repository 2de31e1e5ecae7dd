//! cpal audio output for the PSG.
//!
//! The emulation thread pushes each frame's samples into a shared ring; the
//! device callback pops them, playing silence on underrun. The stream is
//! built at the PSG's native 22 050 Hz mono format and owned by a dedicated
//! thread (cpal streams are not `Send`), which parks until shutdown. If no
//! output device accepts the format the machine simply runs silent; a
//! missing audio device is never fatal.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use vectrex_core::core::audio::AudioSink;
use vectrex_core::device::ay38912::SAMPLE_RATE;

/// Number of samples over which to fade in (~12 ms at 22 050 Hz), masking
/// the power-on click.
const FADE_SAMPLES: u32 = 256;

/// Ring capacity: ~4 frames of audio. Beyond this the producer drops the
/// oldest samples rather than letting latency grow.
const MAX_BUFFERED_SAMPLES: usize = 2048;

type SampleRing = Arc<Mutex<VecDeque<i16>>>;

pub struct CpalSink {
    ring: SampleRing,
    shutdown: Arc<AtomicBool>,
}

impl CpalSink {
    /// Acquire the default output device at the PSG's sample rate. Returns
    /// `None` (after logging) when no usable device exists; callers then run
    /// in silent mode.
    pub fn open() -> Option<Self> {
        let ring: SampleRing = Arc::new(Mutex::new(VecDeque::with_capacity(MAX_BUFFERED_SAMPLES)));
        let shutdown = Arc::new(AtomicBool::new(false));

        let (result_tx, result_rx) = std::sync::mpsc::sync_channel::<Result<(), String>>(1);
        let thread_ring = Arc::clone(&ring);
        let thread_shutdown = Arc::clone(&shutdown);

        // A dedicated thread owns the stream; cpal streams are not Send.
        let spawned = std::thread::Builder::new()
            .name("vectrex-audio".into())
            .spawn(move || {
                let result = (|| -> Result<cpal::Stream, String> {
                    let host = cpal::default_host();
                    let device = host
                        .default_output_device()
                        .ok_or_else(|| "no audio output device".to_string())?;
                    let name = device.name().unwrap_or_else(|_| "unknown".into());

                    let config = cpal::StreamConfig {
                        channels: 1,
                        sample_rate: cpal::SampleRate(SAMPLE_RATE),
                        buffer_size: cpal::BufferSize::Default,
                    };
                    log::info!("audio device: '{name}', {SAMPLE_RATE} Hz mono");

                    let ring = thread_ring;
                    let mut fade_in = 0u32;
                    let stream = device
                        .build_output_stream(
                            &config,
                            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                                let mut buf = ring.lock().unwrap();
                                for out in data.iter_mut() {
                                    // Underrun plays silence.
                                    let raw = buf.pop_front().unwrap_or(0);
                                    let mut sample = raw as f32 / 32768.0;
                                    if fade_in < FADE_SAMPLES {
                                        sample *= fade_in as f32 / FADE_SAMPLES as f32;
                                        fade_in += 1;
                                    }
                                    *out = sample;
                                }
                            },
                            move |err| log::warn!("audio stream error: {err}"),
                            None,
                        )
                        .map_err(|e| format!("build_output_stream: {e}"))?;
                    stream.play().map_err(|e| format!("stream.play: {e}"))?;
                    Ok(stream)
                })();

                match result {
                    Ok(stream) => {
                        let _ = result_tx.send(Ok(()));
                        while !thread_shutdown.load(Ordering::Relaxed) {
                            std::thread::park_timeout(std::time::Duration::from_millis(100));
                        }
                        drop(stream);
                    }
                    Err(e) => {
                        let _ = result_tx.send(Err(e));
                    }
                }
            });

        if spawned.is_err() {
            log::warn!("audio thread failed to spawn; running silent");
            return None;
        }

        match result_rx.recv() {
            Ok(Ok(())) => Some(Self { ring, shutdown }),
            Ok(Err(e)) => {
                log::warn!("audio unavailable ({e}); running silent");
                None
            }
            Err(_) => {
                log::warn!("audio thread died during setup; running silent");
                None
            }
        }
    }
}

impl AudioSink for CpalSink {
    fn submit(&mut self, samples: &[i16]) {
        let mut buf = self.ring.lock().unwrap();
        // Keep latency bounded: drop the oldest samples on overflow.
        let overflow = (buf.len() + samples.len()).saturating_sub(MAX_BUFFERED_SAMPLES);
        for _ in 0..overflow {
            buf.pop_front();
        }
        buf.extend(samples.iter().copied());
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}
