pub mod audio;
pub mod rom_loader;
pub mod runner;
pub mod vectrex;

pub use audio::CpalSink;
pub use rom_loader::{RomLoadError, load_cartridge, load_system_rom};
pub use runner::Runner;
pub use vectrex::Vectrex;
