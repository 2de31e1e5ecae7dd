pub mod ay38912;
pub mod joystick;
pub mod phosphors;
pub mod via6522;
pub mod video;

pub use ay38912::Ay38912;
pub use joystick::{Input, Joystick};
pub use phosphors::{PHOSPHOR_CAPACITY, Phosphor, PhosphorReader, PhosphorWriter, phosphor_ring};
pub use via6522::Via6522;
pub use video::{CYCLES_PER_FRAME, VectorVideo};
