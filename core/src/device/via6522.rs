//! MOS 6522 Versatile Interface Adapter (VIA).

/// IFR/IER bit assignments. Bit 7 of the IFR is derived: it reads as 1
/// exactly when any enabled flag in bits 0-6 is set.
pub const IFR_CA2: u8 = 0x01;
pub const IFR_CA1: u8 = 0x02;
pub const IFR_SR: u8 = 0x04;
pub const IFR_CB2: u8 = 0x08;
pub const IFR_CB1: u8 = 0x10;
pub const IFR_T2: u8 = 0x20;
pub const IFR_T1: u8 = 0x40;
pub const IFR_IRQ: u8 = 0x80;

#[derive(Default)]
struct Timer1 {
    counter: u16,
    latch: u16,
    loaded_this_cycle: bool,
    has_shot: bool,
    pb7: bool,
    pb7_pulse_pending: bool,
}

#[derive(Default)]
struct Timer2 {
    counter: u16,
    latch: u16,
    loaded_this_cycle: bool,
    has_shot: bool,
}

#[derive(Default)]
struct ShiftRegister {
    value: u8,
    clock: bool,
    counter: u8,
    wrote_this_cycle: bool,
}

/// MOS 6522 VIA: two 8-bit ports with handshake lines, two 16-bit timers,
/// an 8-bit shift register, and the interrupt flag/enable pair.
///
/// Register map (address & 0x0F):
///
/// | Reg | Read                                   | Write                                  |
/// |-----|----------------------------------------|----------------------------------------|
/// | 0   | IRB (pins/latch per ACR), clears CB1/CB2 flags | ORB, refresh pins, clears CB1/CB2 flags |
/// | 1   | IRA, clears CA1/CA2 flags, CA2 handshake | ORA, same side effects               |
/// | 2   | DDRB                                   | DDRB                                   |
/// | 3   | DDRA                                   | DDRA                                   |
/// | 4   | T1 counter low, clears T1 flag         | T1 latch low                           |
/// | 5   | T1 counter high                        | T1 latch high, latch->counter, clears T1 flag |
/// | 6   | T1 latch low                           | T1 latch low                           |
/// | 7   | T1 latch high                          | T1 latch high, clears T1 flag          |
/// | 8   | T2 counter low, clears T2 flag         | T2 latch low                           |
/// | 9   | T2 counter high                        | T2 latch high, latch->counter, clears T2 flag |
/// | 10  | SR (clears SR flag, resets shift count) | SR (same, plus marks the write cycle) |
/// | 11  | ACR                                    | ACR + mode decode                      |
/// | 12  | PCR                                    | PCR + mode decode, manual CA2/CB2      |
/// | 13  | IFR with derived bit 7                 | clears flags where bits are set        |
/// | 14  | IER with bit 7 forced high             | bit 7 selects set/clear of flag enables |
/// | 15  | like reg 1, no CA2 handshake           | like reg 1, no CA2 handshake           |
///
/// Timing is modeled per φ2 cycle through [`Via6522::emulate_cycle`]; the
/// CPU's register accesses happen between cycles, which is why a timer load
/// defers its first decrement (`loaded_this_cycle`).
pub struct Via6522 {
    // Port A
    ora: u8,
    ira: u8,
    ddra: u8,
    input_a: u8,     // external pin levels (PSG drives these in read mode)
    port_a_pins: u8, // composited pin image

    // Port B
    orb: u8,
    irb: u8,
    ddrb: u8,
    input_b: u8,
    port_b_pins: u8,

    t1: Timer1,
    t2: Timer2,
    sr: ShiftRegister,

    // ACR and decoded fields
    acr: u8,
    t1_pb7_mode: bool,
    t1_free_run: bool,
    t2_pulse_mode: bool,
    sr_mode: u8,
    latch_a: bool,
    latch_b: bool,

    // PCR and decoded fields
    pcr: u8,
    ca1_edge_pos: bool,
    ca2_mode: u8,
    cb1_edge_pos: bool,
    cb2_mode: u8,

    ifr: u8,
    ier: u8,

    // Control line levels. For CA2/CB2 the `_ext` shadow holds the external
    // level so switching back to an input mode restores it.
    ca1: bool,
    ca2: bool,
    ca2_ext: bool,
    cb1: bool,
    cb2: bool,
    cb2_ext: bool,

    ca2_pulse_count: u8,
    cb2_pulse_count: u8,

    t2_underflow: bool, // shift-clock event produced by this cycle's T2 step
    prev_pb6: bool,     // T2 pulse-count mode edge detection
}

impl Via6522 {
    pub fn new() -> Self {
        Self {
            ora: 0,
            ira: 0,
            ddra: 0,
            input_a: 0,
            port_a_pins: 0,
            orb: 0,
            irb: 0,
            ddrb: 0,
            input_b: 0,
            port_b_pins: 0,
            // has_shot starts set so the free-wheeling power-on counters
            // cannot fire before the CPU loads them.
            t1: Timer1 {
                pb7: true,
                has_shot: true,
                ..Timer1::default()
            },
            t2: Timer2 {
                has_shot: true,
                ..Timer2::default()
            },
            sr: ShiftRegister::default(),
            acr: 0,
            t1_pb7_mode: false,
            t1_free_run: false,
            t2_pulse_mode: false,
            sr_mode: 0,
            latch_a: false,
            latch_b: false,
            pcr: 0,
            ca1_edge_pos: false,
            ca2_mode: 0,
            cb1_edge_pos: false,
            cb2_mode: 0,
            ifr: 0,
            ier: 0,
            ca1: false,
            ca2: false,
            ca2_ext: false,
            cb1: false,
            cb2: false,
            cb2_ext: false,
            ca2_pulse_count: 0,
            cb2_pulse_count: 0,
            t2_underflow: false,
            prev_pb6: false,
        }
    }

    // ----------------------------------------------------------------------
    // Register interface
    // ----------------------------------------------------------------------

    pub fn read(&mut self, reg: u8) -> u8 {
        match reg & 0x0F {
            0x00 => {
                let value = if self.latch_b {
                    (self.irb & !self.ddrb) | (self.orb & self.ddrb)
                } else {
                    self.port_b_pins
                };
                self.clear_ifr(IFR_CB1 | IFR_CB2);
                self.cb2_port_access();
                value
            }
            0x01 => {
                let value = self.input_port_a();
                self.clear_ifr(IFR_CA1 | IFR_CA2);
                self.ca2_port_access();
                value
            }
            0x02 => self.ddrb,
            0x03 => self.ddra,
            0x04 => {
                self.clear_ifr(IFR_T1);
                (self.t1.counter & 0x00FF) as u8
            }
            0x05 => (self.t1.counter >> 8) as u8,
            0x06 => (self.t1.latch & 0x00FF) as u8,
            0x07 => (self.t1.latch >> 8) as u8,
            0x08 => {
                self.clear_ifr(IFR_T2);
                (self.t2.counter & 0x00FF) as u8
            }
            0x09 => (self.t2.counter >> 8) as u8,
            0x0A => {
                if self.ifr & IFR_SR != 0 {
                    self.clear_ifr(IFR_SR);
                    self.sr.counter = 0;
                }
                self.sr.value
            }
            0x0B => self.acr,
            0x0C => self.pcr,
            0x0D => self.ifr,
            0x0E => self.ier | 0x80,
            _ => {
                // Port A without the CA2 handshake side effect.
                let value = self.input_port_a();
                self.clear_ifr(IFR_CA1 | IFR_CA2);
                value
            }
        }
    }

    pub fn write(&mut self, reg: u8, data: u8) {
        match reg & 0x0F {
            0x00 => {
                self.orb = data;
                self.refresh_ports();
                self.clear_ifr(IFR_CB1 | IFR_CB2);
                self.cb2_port_access();
            }
            0x01 => {
                self.ora = data;
                self.refresh_ports();
                self.clear_ifr(IFR_CA1 | IFR_CA2);
                self.ca2_port_access();
            }
            0x02 => {
                self.ddrb = data;
                self.refresh_ports();
            }
            0x03 => {
                self.ddra = data;
                self.refresh_ports();
            }
            0x04 | 0x06 => {
                self.t1.latch = (self.t1.latch & 0xFF00) | data as u16;
            }
            0x05 => {
                self.t1.latch = (self.t1.latch & 0x00FF) | ((data as u16) << 8);
                self.t1.counter = self.t1.latch;
                self.t1.loaded_this_cycle = true;
                self.t1.has_shot = false;
                self.clear_ifr(IFR_T1);
                if self.t1_pb7_mode {
                    // PB7 drops at the end of this cycle and stays low until
                    // the timer fires.
                    self.t1.pb7_pulse_pending = true;
                }
            }
            0x07 => {
                self.t1.latch = (self.t1.latch & 0x00FF) | ((data as u16) << 8);
                self.clear_ifr(IFR_T1);
            }
            0x08 => {
                self.t2.latch = (self.t2.latch & 0xFF00) | data as u16;
            }
            0x09 => {
                self.t2.latch = (self.t2.latch & 0x00FF) | ((data as u16) << 8);
                self.t2.counter = self.t2.latch;
                self.t2.loaded_this_cycle = true;
                self.t2.has_shot = false;
                self.clear_ifr(IFR_T2);
            }
            0x0A => {
                self.sr.value = data;
                self.sr.wrote_this_cycle = true;
                if self.ifr & IFR_SR != 0 {
                    self.clear_ifr(IFR_SR);
                    self.sr.counter = 0;
                }
            }
            0x0B => {
                self.acr = data;
                self.t1_pb7_mode = data & 0x80 != 0;
                self.t1_free_run = data & 0x40 != 0;
                self.t2_pulse_mode = data & 0x20 != 0;
                self.sr_mode = (data >> 2) & 0x07;
                self.latch_b = data & 0x02 != 0;
                self.latch_a = data & 0x01 != 0;
                self.refresh_ports();
            }
            0x0C => {
                self.pcr = data;
                self.cb2_mode = (data >> 5) & 0x07;
                self.cb1_edge_pos = data & 0x10 != 0;
                self.ca2_mode = (data >> 1) & 0x07;
                self.ca1_edge_pos = data & 0x01 != 0;
                self.ca2 = match self.ca2_mode {
                    6 => false,
                    7 => true,
                    4 | 5 => true, // output modes idle high
                    _ => self.ca2_ext,
                };
                self.cb2 = match self.cb2_mode {
                    6 => false,
                    7 => true,
                    4 | 5 => true,
                    _ => self.cb2_ext,
                };
            }
            0x0D => {
                // Writing 1s clears flags; the derived bit 7 is not writable.
                self.ifr &= !(data & 0x7F);
                self.update_irq_flag();
            }
            0x0E => {
                if data & 0x80 != 0 {
                    self.ier |= data & 0x7F;
                } else {
                    self.ier &= !(data & 0x7F);
                }
                self.update_irq_flag();
            }
            _ => {
                self.ora = data;
                self.refresh_ports();
                self.clear_ifr(IFR_CA1 | IFR_CA2);
            }
        }
    }

    // ----------------------------------------------------------------------
    // Per-cycle pipeline
    // ----------------------------------------------------------------------

    /// Advance one φ2 cycle: timer 1, timer 2 (which may toggle the shift
    /// clock), the shift register, CA2/CB2 pulse decay, the deferred PB7
    /// pulse start, and finally the SR write-cycle gate.
    pub fn emulate_cycle(&mut self) {
        self.step_timer1();
        self.step_timer2();
        self.step_shift_register();
        self.decay_pulses();
        if self.t1.pb7_pulse_pending {
            self.t1.pb7_pulse_pending = false;
            self.t1.pb7 = false;
            self.refresh_ports();
        }
        self.sr.wrote_this_cycle = false;
    }

    fn step_timer1(&mut self) {
        if self.t1.loaded_this_cycle {
            self.t1.loaded_this_cycle = false;
            return;
        }
        if self.t1_free_run && self.t1.counter == 0xFFFF {
            // Reload consumes the cycle; the interrupt and PB7 toggle ride
            // along with it, and has_shot is set even though free-run never
            // consults it again.
            self.t1.counter = self.t1.latch;
            self.t1.pb7 = !self.t1.pb7;
            self.t1.has_shot = true;
            self.set_ifr(IFR_T1);
            self.refresh_ports();
            return;
        }
        self.t1.counter = self.t1.counter.wrapping_sub(1);
        if self.t1.counter == 0xFFFF && !self.t1_free_run && !self.t1.has_shot {
            self.t1.has_shot = true;
            self.set_ifr(IFR_T1);
            if self.t1_pb7_mode {
                self.t1.pb7 = true;
                self.refresh_ports();
            }
        }
    }

    fn step_timer2(&mut self) {
        self.t2_underflow = false;
        if self.t2.loaded_this_cycle {
            self.t2.loaded_this_cycle = false;
            return;
        }
        if self.t2_pulse_mode {
            // Counting PB6 pulses instead of φ2.
            let pb6 = self.port_b_pins & 0x40 != 0;
            let falling = !pb6 && self.prev_pb6;
            self.prev_pb6 = pb6;
            if !falling {
                return;
            }
        }
        self.t2.counter = self.t2.counter.wrapping_sub(1);
        if self.t2.counter == 0 {
            if !self.t2.has_shot {
                self.t2.has_shot = true;
                self.set_ifr(IFR_T2);
            }
            if self.sr_clocked_by_t2() {
                // SR operation reloads only the low byte; otherwise the
                // counter rolls through 0xFFFF on the next decrement.
                self.t2.counter = self.t2.latch & 0x00FF;
                self.t2_underflow = true;
            }
        }
    }

    fn sr_clocked_by_t2(&self) -> bool {
        matches!(self.sr_mode, 1 | 4 | 5)
    }

    /// Modes whose clock is generated internally mirror it onto CB1.
    fn sr_internal_clock(&self) -> bool {
        matches!(self.sr_mode, 1 | 2 | 4 | 5 | 6)
    }

    fn sr_gated(&self) -> bool {
        self.sr_mode == 0 || self.ifr & IFR_SR != 0 || self.sr.wrote_this_cycle
    }

    fn step_shift_register(&mut self) {
        let toggle = match self.sr_mode {
            2 | 6 => true, // φ2 clock toggles every cycle
            1 | 4 | 5 => self.t2_underflow,
            _ => false, // disabled, or externally clocked through CB1
        };
        if !toggle || self.sr_gated() {
            return;
        }
        let level = !self.sr.clock;
        self.apply_shift_clock(level);
    }

    fn apply_shift_clock(&mut self, level: bool) {
        let falling = !level && self.sr.clock;
        self.sr.clock = level;
        if self.sr_internal_clock() {
            self.cb1 = level;
        }
        if falling {
            self.shift_once();
        }
    }

    fn shift_once(&mut self) {
        if self.sr_mode >= 4 {
            // Shifting out: MSB first onto CB2.
            self.cb2 = self.sr.value & 0x80 != 0;
        }
        // Rotate left through CB2: for output modes the driven bit re-enters
        // bit 0, for input modes the external level shifts in.
        self.sr.value = (self.sr.value << 1) | self.cb2 as u8;
        self.sr.counter = (self.sr.counter + 1) & 0x07;
        if self.sr.counter == 0 && self.sr_mode != 4 {
            // Free-running output (mode 4) never pauses for service.
            self.set_ifr(IFR_SR);
        }
    }

    fn decay_pulses(&mut self) {
        if self.ca2_pulse_count > 0 {
            self.ca2_pulse_count -= 1;
            if self.ca2_pulse_count == 0 {
                self.ca2 = true;
            }
        }
        if self.cb2_pulse_count > 0 {
            self.cb2_pulse_count -= 1;
            if self.cb2_pulse_count == 0 {
                self.cb2 = true;
            }
        }
    }

    // ----------------------------------------------------------------------
    // Control line inputs (edge detection)
    // ----------------------------------------------------------------------

    /// Update the CA1 input. The active edge (PCR bit 0) sets the CA1 flag,
    /// latches IRA when port A latching is on, and completes a CA2 handshake.
    pub fn set_ca1(&mut self, level: bool) {
        let active = if self.ca1_edge_pos {
            level && !self.ca1
        } else {
            !level && self.ca1
        };
        self.ca1 = level;
        if active {
            self.set_ifr(IFR_CA1);
            if self.latch_a {
                self.ira = self.port_a_pins;
            }
            if self.ca2_mode == 4 {
                self.ca2 = true;
            }
        }
    }

    /// Update the CB1 input. Ignored while the shift register drives CB1 as
    /// its clock output; in the external-clock SR modes the edge also
    /// advances the shifter.
    pub fn set_cb1(&mut self, level: bool) {
        if self.sr_internal_clock() {
            return;
        }
        let active = if self.cb1_edge_pos {
            level && !self.cb1
        } else {
            !level && self.cb1
        };
        self.cb1 = level;
        if matches!(self.sr_mode, 3 | 7) && !self.sr_gated() {
            self.apply_shift_clock(level);
        }
        if active {
            self.set_ifr(IFR_CB1);
            if self.latch_b {
                self.irb = (self.input_b & !self.ddrb) | (self.orb & self.ddrb);
            }
            if self.cb2_mode == 4 {
                self.cb2 = true;
            }
        }
    }

    /// Update the CA2 input level. Only modes 0-3 treat CA2 as an input;
    /// modes 2-3 flag on the positive edge, 0-1 on the negative edge.
    pub fn set_ca2_input(&mut self, level: bool) {
        self.ca2_ext = level;
        if self.ca2_mode >= 4 {
            return;
        }
        let positive = self.ca2_mode & 0x02 != 0;
        let active = if positive {
            level && !self.ca2
        } else {
            !level && self.ca2
        };
        self.ca2 = level;
        if active {
            self.set_ifr(IFR_CA2);
        }
    }

    /// Update the CB2 input level; mirrors [`Via6522::set_ca2_input`].
    pub fn set_cb2_input(&mut self, level: bool) {
        self.cb2_ext = level;
        if self.cb2_mode >= 4 {
            return;
        }
        let positive = self.cb2_mode & 0x02 != 0;
        let active = if positive {
            level && !self.cb2
        } else {
            !level && self.cb2
        };
        self.cb2 = level;
        if active {
            self.set_ifr(IFR_CB2);
        }
    }

    // ----------------------------------------------------------------------
    // Pins and external wiring
    // ----------------------------------------------------------------------

    /// Set external input pin levels for Port A (the PSG drives these when
    /// it answers a bus read).
    pub fn set_port_a_input(&mut self, data: u8) {
        self.input_a = data;
        self.refresh_ports();
    }

    /// Set external input pin levels for Port B.
    pub fn set_port_b_input(&mut self, data: u8) {
        self.input_b = data;
        self.refresh_ports();
    }

    /// Drive the joystick comparator output onto the PB5 input pin.
    pub fn set_compare(&mut self, level: bool) {
        if level {
            self.input_b |= 0x20;
        } else {
            self.input_b &= !0x20;
        }
        self.refresh_ports();
    }

    /// Current Port A pin image: output latch where DDRA drives, external
    /// levels elsewhere. This is what the DAC and the PSG bus see.
    pub fn port_a_pins(&self) -> u8 {
        self.port_a_pins
    }

    /// Current Port B pin image, with the timer-1 PB7 output overlaid when
    /// PB7 mode is on.
    pub fn port_b_pins(&self) -> u8 {
        self.port_b_pins
    }

    pub fn ca2(&self) -> bool {
        self.ca2
    }

    pub fn cb2(&self) -> bool {
        self.cb2
    }

    pub fn cb1(&self) -> bool {
        self.cb1
    }

    /// Wired-OR IRQ output: asserted while any enabled flag is set.
    pub fn irq(&self) -> bool {
        self.ifr & IFR_IRQ != 0
    }

    // ----------------------------------------------------------------------
    // Internal helpers
    // ----------------------------------------------------------------------

    fn input_port_a(&self) -> u8 {
        if self.latch_a {
            (self.ira & !self.ddra) | (self.ora & self.ddra)
        } else {
            self.port_a_pins
        }
    }

    fn refresh_ports(&mut self) {
        self.port_a_pins = (self.input_a & !self.ddra) | (self.ora & self.ddra);
        let mut b = (self.input_b & !self.ddrb) | (self.orb & self.ddrb);
        if self.t1_pb7_mode {
            b = (b & 0x7F) | ((self.t1.pb7 as u8) << 7);
        }
        self.port_b_pins = b;
    }

    /// ORA/ORB access side effect on CA2: handshake pulls the line low until
    /// the CA1 edge, pulse mode pulls it low for one cycle.
    fn ca2_port_access(&mut self) {
        match self.ca2_mode {
            4 => self.ca2 = false,
            5 => {
                self.ca2 = false;
                self.ca2_pulse_count = 2;
            }
            _ => {}
        }
    }

    fn cb2_port_access(&mut self) {
        match self.cb2_mode {
            4 => self.cb2 = false,
            5 => {
                self.cb2 = false;
                self.cb2_pulse_count = 2;
            }
            _ => {}
        }
    }

    fn set_ifr(&mut self, bits: u8) {
        self.ifr |= bits & 0x7F;
        self.update_irq_flag();
    }

    fn clear_ifr(&mut self, bits: u8) {
        self.ifr &= !(bits & 0x7F);
        self.update_irq_flag();
    }

    fn update_irq_flag(&mut self) {
        if self.ifr & self.ier & 0x7F != 0 {
            self.ifr |= IFR_IRQ;
        } else {
            self.ifr &= !IFR_IRQ;
        }
    }
}

impl Default for Via6522 {
    fn default() -> Self {
        Self::new()
    }
}
