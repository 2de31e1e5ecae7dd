pub mod core;
pub mod cpu;
pub mod device;

pub mod prelude {
    pub use crate::core::{AudioSink, Bus, Frame, FrameReceiver, FrameSender, MemoryMap};
    pub use crate::cpu::Cpu;
    pub use crate::device::{Ay38912, Joystick, VectorVideo, Via6522};
}
