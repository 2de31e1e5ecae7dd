//! The emulation thread.
//!
//! A single thread owns the machine and loops one frame at a time, throttled
//! to 50 Hz wall clock unless warp is set. Pausing parks the thread on a
//! condition variable; stopping is cooperative (the exit flag is observed at
//! the next frame boundary, and a paused thread is woken first). Completed
//! frames go out through the lock-free frame channel, and each frame's PSG
//! samples are pushed to the audio sink, if one was acquired.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use vectrex_core::core::audio::AudioSink;
use vectrex_core::core::frame::{FrameReceiver, frame_channel};
use vectrex_core::cpu::Cpu;

use crate::vectrex::{FRAME_RATE_HZ, Vectrex};

struct Shared {
    exit: AtomicBool,
    warp: AtomicBool,
    paused: Mutex<bool>,
    resume: Condvar,
}

/// Handle to a running emulation thread.
pub struct Runner {
    shared: Arc<Shared>,
    thread: Option<JoinHandle<()>>,
}

impl Runner {
    /// Spawn the emulation thread around a machine. The returned receiver
    /// yields one [`Frame`](vectrex_core::core::frame::Frame) per completed
    /// 50 Hz frame; pair it with the machine's phosphor reader for drawing.
    ///
    /// `sink` receives each frame's audio block; pass `None` to run silent.
    pub fn spawn<C>(mut machine: Vectrex<C>, mut sink: Option<Box<dyn AudioSink>>) -> (Self, FrameReceiver)
    where
        C: Cpu + Send + 'static,
    {
        let (mut sender, receiver) = frame_channel();
        let shared = Arc::new(Shared {
            exit: AtomicBool::new(false),
            warp: AtomicBool::new(false),
            paused: Mutex::new(false),
            resume: Condvar::new(),
        });
        let thread_shared = Arc::clone(&shared);

        let frame_budget = Duration::from_micros(1_000_000 / FRAME_RATE_HZ as u64);
        let thread = std::thread::Builder::new()
            .name("vectrex-emulation".into())
            .spawn(move || {
                log::debug!("emulation thread started");
                loop {
                    // Park while paused; stop() wakes us to observe exit.
                    {
                        let mut paused = thread_shared.paused.lock().unwrap();
                        while *paused && !thread_shared.exit.load(Ordering::Acquire) {
                            paused = thread_shared.resume.wait(paused).unwrap();
                        }
                    }
                    if thread_shared.exit.load(Ordering::Acquire) {
                        break;
                    }

                    let warp = thread_shared.warp.load(Ordering::Relaxed);
                    let started = Instant::now();
                    let frame = machine.run_until_frame(warp);
                    sender.publish(frame);

                    let samples = machine.drain_audio();
                    if let Some(sink) = sink.as_mut() {
                        if !samples.is_empty() {
                            sink.submit(&samples);
                        }
                    }

                    if !warp {
                        let elapsed = started.elapsed();
                        if elapsed < frame_budget {
                            std::thread::sleep(frame_budget - elapsed);
                        } else {
                            log::trace!(
                                "frame {} overran its budget: {:?}",
                                frame.number,
                                elapsed
                            );
                        }
                    }
                }
                log::debug!("emulation thread exiting");
            })
            .expect("failed to spawn emulation thread");

        (
            Self {
                shared,
                thread: Some(thread),
            },
            receiver,
        )
    }

    /// Pause or resume the emulation at the next frame boundary.
    pub fn set_paused(&self, paused: bool) {
        *self.shared.paused.lock().unwrap() = paused;
        if !paused {
            self.shared.resume.notify_one();
        }
        log::debug!("emulation {}", if paused { "paused" } else { "resumed" });
    }

    /// Run unthrottled (and without sound) when set.
    pub fn set_warp(&self, warp: bool) {
        self.shared.warp.store(warp, Ordering::Relaxed);
    }

    /// Request a cooperative stop and join the thread. The loop exits at
    /// the next frame boundary; a paused thread is woken first.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.shared.exit.store(true, Ordering::Release);
        self.shared.resume.notify_one();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for Runner {
    fn drop(&mut self) {
        self.shutdown();
    }
}
