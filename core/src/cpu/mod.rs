use crate::core::bus::Bus;

/// CPU seam for the MC6809.
///
/// The instruction decoder itself lives outside this crate; the machine only
/// needs a reset entry point, a one-cycle step, and the wired IRQ line. All
/// memory traffic goes through the [`Bus`] handed in per call, which the
/// machine routes through its memory map.
pub trait Cpu {
    /// Reset vector fetch and internal state reset.
    fn reset(&mut self, bus: &mut dyn Bus);

    /// Advance exactly one clock cycle.
    fn execute_cycle(&mut self, bus: &mut dyn Bus);

    /// Drive the level-sensitive IRQ input. The machine re-asserts the
    /// current level every cycle; implementations latch it and take the
    /// interrupt when their own state allows.
    fn signal_irq(&mut self, level: bool);
}
