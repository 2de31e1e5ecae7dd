//! The console board: every chip wired together and driven in lock-step.

use vectrex_core::core::bus::Bus;
use vectrex_core::core::frame::Frame;
use vectrex_core::core::memory::MemoryMap;
use vectrex_core::cpu::Cpu;
use vectrex_core::device::ay38912::Ay38912;
use vectrex_core::device::joystick::Joystick;
use vectrex_core::device::phosphors::{PHOSPHOR_CAPACITY, PhosphorReader, phosphor_ring};
use vectrex_core::device::via6522::Via6522;
use vectrex_core::device::video::VectorVideo;

/// CPU/system clock.
pub const MASTER_CLOCK_HZ: u32 = 1_500_000;

/// Display refresh rate.
pub const FRAME_RATE_HZ: u32 = 50;

/// Adapter giving the CPU its bus view: all traffic routed through the
/// memory map, which borrows the VIA for the mapped register windows.
struct CpuBus<'a> {
    memory: &'a mut MemoryMap,
    via: &'a mut Via6522,
}

impl Bus for CpuBus<'_> {
    fn read(&mut self, addr: u16) -> u8 {
        self.memory.read(self.via, addr)
    }

    fn write(&mut self, addr: u16, data: u8) {
        self.memory.write(self.via, addr, data)
    }
}

/// Vectrex console (1982): MC6809 @ 1.5 MHz, 6522 VIA, AY-3-8912 PSG, and
/// the analog vector generator steering the CRT.
///
/// One tick advances every subsystem by one clock cycle, in a fixed order:
/// video first (it samples the VIA pins the CPU set up on earlier cycles),
/// then the CPU, then the VIA, then the PSG. Register writes therefore
/// become visible to the chips on the following cycle, matching the
/// hardware's φ2 timing.
pub struct Vectrex<C: Cpu> {
    cpu: C,
    via: Via6522,
    video: VectorVideo,
    psg: Ay38912,
    joystick: Joystick,
    memory: MemoryMap,
    phosphor_reader: Option<PhosphorReader>,
    frame_number: u64,
    clock: u64,
}

impl<C: Cpu> Vectrex<C> {
    /// Wire up a console around the given CPU, system ROM, and optional
    /// cartridge. ROM images are validated by the loader before they get
    /// here. Call [`Vectrex::reset`] before the first frame.
    pub fn new(cpu: C, system_rom: Vec<u8>, cartridge: Option<Vec<u8>>) -> Self {
        let mut memory = MemoryMap::new(system_rom);
        if let Some(image) = cartridge {
            memory.install_cartridge(image);
        }
        let (writer, reader) = phosphor_ring(PHOSPHOR_CAPACITY);
        Self {
            cpu,
            via: Via6522::new(),
            video: VectorVideo::new(writer),
            psg: Ay38912::default(),
            joystick: Joystick::new(),
            memory,
            phosphor_reader: Some(reader),
            frame_number: 0,
            clock: 0,
        }
    }

    /// Take the renderer's half of the phosphor ring. Yields `Some` once.
    pub fn take_phosphor_reader(&mut self) -> Option<PhosphorReader> {
        self.phosphor_reader.take()
    }

    /// Power-on / reset: chips back to their initial state, CPU through its
    /// reset vector. RAM contents and the phosphor trail survive, as they
    /// do on the real board.
    pub fn reset(&mut self) {
        self.via = Via6522::new();
        self.psg = Ay38912::default();
        self.video.reset();
        let mut bus = CpuBus {
            memory: &mut self.memory,
            via: &mut self.via,
        };
        self.cpu.reset(&mut bus);
        log::debug!("machine reset at cycle {}", self.clock);
    }

    /// Advance the whole board one clock cycle. Returns true when this
    /// cycle completed a frame.
    pub fn tick(&mut self, warp: bool) -> bool {
        let frame_done = self.video.emulate_cycle(&self.via, &mut self.joystick);

        // The comparator and button lines are analog inputs; refresh them
        // before the CPU can look.
        self.via.set_compare(self.joystick.compare());
        self.psg.set_io_input(self.joystick.buttons());

        {
            let mut bus = CpuBus {
                memory: &mut self.memory,
                via: &mut self.via,
            };
            self.cpu.execute_cycle(&mut bus);
        }

        self.via.emulate_cycle();
        self.cpu.signal_irq(self.via.irq());

        if !warp {
            self.psg.emulate_cycle(&mut self.via);
        }

        self.clock += 1;
        frame_done
    }

    /// Run until the video signals end-of-frame (exactly 30 000 cycles per
    /// frame). With `warp` set the PSG is skipped and no samples accumulate.
    pub fn run_until_frame(&mut self, warp: bool) -> Frame {
        loop {
            if self.tick(warp) {
                self.frame_number += 1;
                return Frame {
                    number: self.frame_number,
                    dot_end: self.video.dot_cursor(),
                };
            }
        }
    }

    /// Take the PSG samples accumulated since the last drain.
    pub fn drain_audio(&mut self) -> Vec<i16> {
        self.psg.drain_audio()
    }

    pub fn joystick(&self) -> &Joystick {
        &self.joystick
    }

    pub fn joystick_mut(&mut self) -> &mut Joystick {
        &mut self.joystick
    }

    pub fn cpu(&self) -> &C {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut C {
        &mut self.cpu
    }

    pub fn via(&self) -> &Via6522 {
        &self.via
    }

    pub fn video(&self) -> &VectorVideo {
        &self.video
    }

    pub fn psg(&self) -> &Ay38912 {
        &self.psg
    }

    /// Master clock cycles since power-on.
    pub fn clock(&self) -> u64 {
        self.clock
    }
}
