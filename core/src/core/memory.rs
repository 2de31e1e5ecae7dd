//! Console memory map: chip-select dispatch over the 16-bit address space.
//!
//! Every address decodes to exactly one [`ChipSelect`] entry in a 65536-slot
//! table, populated at construction:
//!
//! | Range           | Chip                                       |
//! |-----------------|--------------------------------------------|
//! | 0x0000-0x7FFF   | Cartridge ROM (unconnected when absent)    |
//! | 0x8000-0xC7FF   | Unconnected                                |
//! | 0xC800-0xCFFF   | 1 KiB RAM, shadowed twice                  |
//! | 0xD000-0xD7FF   | VIA, register select on the low 4 bits     |
//! | 0xD800-0xDFFF   | RAM and VIA both respond (not fully decoded)|
//! | 0xE000-0xFFFF   | 8 KiB system ROM                           |
//!
//! Accesses are total: reads always produce a byte, writes always land
//! somewhere (possibly nowhere). The VIA is borrowed per access so the
//! machine keeps ownership of all chips.

use crate::device::via6522::Via6522;

/// System ROM size in bytes (0xE000-0xFFFF).
pub const SYSTEM_ROM_SIZE: usize = 0x2000;

/// Work RAM size in bytes, shadowed across its 2 KiB window.
pub const RAM_SIZE: usize = 0x400;

/// Which chip an address selects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChipSelect {
    /// Nothing drives the bus: reads return 0, writes vanish.
    Unconnected,
    /// Cartridge ROM, mapped from 0x0000 over the image length.
    Cartridge,
    /// Work RAM, address reduced modulo its size.
    Ram,
    /// 6522 VIA, register selected by the low 4 address bits.
    Via,
    /// Non-fully-decoded region where RAM and the VIA both respond:
    /// reads AND the two responses together, writes reach both chips.
    RamVia,
    /// System (BIOS) ROM.
    SystemRom,
}

/// Byte-array ROM: reads reduce the offset modulo the image size, writes are
/// ignored by the dispatcher before they ever get here.
struct Rom {
    bytes: Vec<u8>,
}

impl Rom {
    fn read(&self, offset: u16) -> u8 {
        self.bytes[offset as usize % self.bytes.len()]
    }
}

pub struct MemoryMap {
    table: Box<[ChipSelect]>,
    ram: [u8; RAM_SIZE],
    system_rom: Rom,
    cartridge: Option<Rom>,
}

impl MemoryMap {
    /// Build the power-on map around the given system ROM image. The image
    /// length is validated by the ROM loader before it gets here; shorter
    /// images simply shadow within the 8 KiB window.
    pub fn new(system_rom: Vec<u8>) -> Self {
        let mut table = vec![ChipSelect::Unconnected; 0x10000];
        for (addr, entry) in table.iter_mut().enumerate() {
            *entry = match addr {
                0x0000..=0xC7FF => ChipSelect::Unconnected,
                0xC800..=0xCFFF => ChipSelect::Ram,
                0xD000..=0xD7FF => ChipSelect::Via,
                0xD800..=0xDFFF => ChipSelect::RamVia,
                _ => ChipSelect::SystemRom,
            };
        }
        // DRAM power-on pattern: address bit 7 selects all-ones or all-zeros.
        let mut ram = [0u8; RAM_SIZE];
        for (i, cell) in ram.iter_mut().enumerate() {
            *cell = if i & 0x80 != 0 { 0xFF } else { 0x00 };
        }

        Self {
            table: table.into_boxed_slice(),
            ram,
            system_rom: Rom { bytes: system_rom },
            cartridge: None,
        }
    }

    /// Install a cartridge image at 0x0000, replacing the unconnected
    /// entries over `[0, len)`. Addresses past the image stay unconnected.
    pub fn install_cartridge(&mut self, image: Vec<u8>) {
        let len = image.len().min(0x8000);
        for entry in self.table[..len].iter_mut() {
            *entry = ChipSelect::Cartridge;
        }
        log::info!("cartridge installed: {} bytes", len);
        self.cartridge = Some(Rom { bytes: image });
    }

    /// The chip an address decodes to.
    pub fn chip_at(&self, addr: u16) -> ChipSelect {
        self.table[addr as usize]
    }

    pub fn read(&mut self, via: &mut Via6522, addr: u16) -> u8 {
        match self.table[addr as usize] {
            ChipSelect::Unconnected => 0,
            ChipSelect::Cartridge => match &self.cartridge {
                Some(rom) => rom.read(addr),
                None => 0,
            },
            ChipSelect::Ram => self.ram[addr as usize % RAM_SIZE],
            ChipSelect::Via => via.read((addr & 0x0F) as u8),
            ChipSelect::RamVia => {
                self.ram[addr as usize % RAM_SIZE] & via.read((addr & 0x0F) as u8)
            }
            ChipSelect::SystemRom => self.system_rom.read(addr - 0xE000),
        }
    }

    pub fn write(&mut self, via: &mut Via6522, addr: u16, data: u8) {
        match self.table[addr as usize] {
            ChipSelect::Unconnected | ChipSelect::Cartridge | ChipSelect::SystemRom => {}
            ChipSelect::Ram => self.ram[addr as usize % RAM_SIZE] = data,
            ChipSelect::Via => via.write((addr & 0x0F) as u8, data),
            ChipSelect::RamVia => {
                self.ram[addr as usize % RAM_SIZE] = data;
                via.write((addr & 0x0F) as u8, data);
            }
        }
    }
}
