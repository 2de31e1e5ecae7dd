pub mod audio;
pub mod bus;
pub mod frame;
pub mod memory;

pub use audio::AudioSink;
pub use bus::Bus;
pub use frame::{Frame, FrameReceiver, FrameSender, frame_channel};
pub use memory::{ChipSelect, MemoryMap};
