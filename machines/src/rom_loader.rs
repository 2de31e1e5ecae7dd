//! ROM image loading and validation.
//!
//! Two image kinds exist: the 8 KiB system (BIOS) ROM mapped at
//! 0xE000-0xFFFF, and cartridge images up to 32 KiB mapped from 0x0000.
//! Both are validated here, before the machine is built; a bad image is the
//! only way this emulator refuses to start.

use std::path::Path;

pub use vectrex_core::core::memory::SYSTEM_ROM_SIZE;

/// Largest cartridge the address space can hold (0x0000-0x7FFF).
pub const MAX_CARTRIDGE_SIZE: usize = 0x8000;

/// Errors that can occur when loading a ROM image.
#[derive(Debug)]
pub enum RomLoadError {
    /// Underlying I/O error (file not found, permission denied, etc.)
    Io(std::io::Error),

    /// System ROM image is not exactly 8 KiB.
    SystemRomSize { expected: usize, actual: usize },

    /// Cartridge image exceeds the cartridge address window.
    CartridgeTooLarge { max: usize, actual: usize },

    /// Cartridge file contained no data.
    EmptyCartridge,
}

impl std::fmt::Display for RomLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::SystemRomSize { expected, actual } => {
                write!(f, "system ROM: expected {expected} bytes, got {actual}")
            }
            Self::CartridgeTooLarge { max, actual } => {
                write!(f, "cartridge: {actual} bytes exceeds the {max} byte window")
            }
            Self::EmptyCartridge => write!(f, "cartridge image is empty"),
        }
    }
}

impl std::error::Error for RomLoadError {}

impl From<std::io::Error> for RomLoadError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Read and validate the system ROM from disk.
pub fn load_system_rom(path: &Path) -> Result<Vec<u8>, RomLoadError> {
    let data = std::fs::read(path)?;
    log::info!("system ROM: {} ({} bytes)", path.display(), data.len());
    system_rom_from_bytes(data)
}

/// Validate an in-memory system ROM image.
pub fn system_rom_from_bytes(data: Vec<u8>) -> Result<Vec<u8>, RomLoadError> {
    if data.len() != SYSTEM_ROM_SIZE {
        return Err(RomLoadError::SystemRomSize {
            expected: SYSTEM_ROM_SIZE,
            actual: data.len(),
        });
    }
    Ok(data)
}

/// Read and validate a cartridge image from disk.
pub fn load_cartridge(path: &Path) -> Result<Vec<u8>, RomLoadError> {
    let data = std::fs::read(path)?;
    log::info!("cartridge: {} ({} bytes)", path.display(), data.len());
    cartridge_from_bytes(data)
}

/// Validate an in-memory cartridge image.
pub fn cartridge_from_bytes(data: Vec<u8>) -> Result<Vec<u8>, RomLoadError> {
    if data.is_empty() {
        return Err(RomLoadError::EmptyCartridge);
    }
    if data.len() > MAX_CARTRIDGE_SIZE {
        return Err(RomLoadError::CartridgeTooLarge {
            max: MAX_CARTRIDGE_SIZE,
            actual: data.len(),
        });
    }
    Ok(data)
}
