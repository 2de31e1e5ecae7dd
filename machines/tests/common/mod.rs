use std::collections::VecDeque;

use vectrex_core::core::bus::Bus;
use vectrex_core::cpu::Cpu;

/// One scripted bus operation per cycle.
#[allow(dead_code)]
pub enum Op {
    Idle,
    Read(u16),
    Write(u16, u8),
}

/// Minimal CPU for machine tests: plays back a fixed script of bus
/// operations, one per cycle, and records what it saw.
#[allow(dead_code)]
pub struct ScriptedCpu {
    script: VecDeque<Op>,
    pub reads: Vec<(u16, u8)>,
    pub irq_level: bool,
    pub irq_rises: u32,
    pub reset_count: u32,
}

#[allow(dead_code)]
impl ScriptedCpu {
    pub fn new(ops: Vec<Op>) -> Self {
        Self {
            script: ops.into(),
            reads: Vec::new(),
            irq_level: false,
            irq_rises: 0,
            reset_count: 0,
        }
    }

    /// A CPU that never touches the bus.
    pub fn idle() -> Self {
        Self::new(Vec::new())
    }
}

impl Cpu for ScriptedCpu {
    fn reset(&mut self, bus: &mut dyn Bus) {
        self.reset_count += 1;
        // Reset vector fetch, the way the real part starts up.
        let _ = bus.read(0xFFFE);
        let _ = bus.read(0xFFFF);
    }

    fn execute_cycle(&mut self, bus: &mut dyn Bus) {
        match self.script.pop_front() {
            Some(Op::Read(addr)) => {
                let value = bus.read(addr);
                self.reads.push((addr, value));
            }
            Some(Op::Write(addr, data)) => bus.write(addr, data),
            Some(Op::Idle) | None => {}
        }
    }

    fn signal_irq(&mut self, level: bool) {
        if level && !self.irq_level {
            self.irq_rises += 1;
        }
        self.irq_level = level;
    }
}

/// An 8 KiB system ROM with a recognizable fill pattern.
#[allow(dead_code)]
pub fn test_rom() -> Vec<u8> {
    (0..0x2000).map(|i| (i & 0xFF) as u8).collect()
}
