/// Sink for the PSG's mono PCM output.
///
/// The emulation thread submits blocks of signed 16-bit samples at 22 050 Hz
/// (one frame's worth at a time, 441 samples at 50 Hz). Implementations must
/// not block for longer than a frame period or the emulation falls behind
/// wall clock.
pub trait AudioSink: Send {
    fn submit(&mut self, samples: &[i16]);
}
