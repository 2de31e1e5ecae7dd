//! General Instrument AY-3-8912 programmable sound generator.
//!
//! The CPU never addresses the PSG directly: the VIA carries the bus, with
//! Port A as the data/address lines and PB3/PB4 as BC1/BDIR. Each cycle the
//! chip samples those pins:
//!
//! | BDIR | BC1 | Operation                                   |
//! |------|-----|---------------------------------------------|
//! | 1    | 1   | latch register address from Port A low nibble |
//! | 1    | 0   | write Port A into the latched register        |
//! | 0    | 1   | drive Port A with the latched register        |
//! | 0    | 0   | inactive                                      |
//!
//! Register file:
//!
//! | Reg   | Contents                                        |
//! |-------|-------------------------------------------------|
//! | 0-5   | tone period per channel, 12 bits (fine+coarse)  |
//! | 6     | noise period, 5 bits                            |
//! | 7     | mixer: tone/noise inhibits (active high), I/O dir |
//! | 8-10  | channel volume; bit 4 selects envelope control  |
//! | 11-12 | envelope period, 16 bits                        |
//! | 13    | envelope shape                                  |
//! | 14    | I/O port (console buttons, active low)          |
//!
//! Synthesis integrates each channel's square wave over `STEP` sub-sample
//! units, splitting the integration at noise-LFSR events, then weights the
//! high time by the channel volume. One mono i16 sample is produced every
//! `clock / sample_rate` cycles.

use crate::device::via6522::Via6522;

/// PSG clock: the CPU clock, 1.5 MHz.
pub const PSG_CLOCK_HZ: u32 = 1_500_000;

/// Output sample rate.
pub const SAMPLE_RATE: u32 = 22_050;

/// Sub-sample integration span per output sample.
const STEP: i32 = 0x8000;

/// 16-level DAC, 3 dB per step (32767 / 1.4125^n, entry 0 silent).
const VOLUME_LEVELS: [i32; 16] = [
    0, 260, 368, 519, 734, 1036, 1464, 2068, 2921, 4126, 5827, 8231, 11627, 16423, 23198, 32767,
];

/// Valid bits per register.
const REGISTER_MASKS: [u8; 16] = [
    0xFF, 0x0F, 0xFF, 0x0F, 0xFF, 0x0F, 0x1F, 0xFF, 0x1F, 0x1F, 0x1F, 0xFF, 0xFF, 0x0F, 0xFF,
    0xFF,
];

pub struct Ay38912 {
    regs: [u8; 16],
    latched_addr: u8,

    // Tone generators: periods and counts in STEP units (pre-scaled by
    // update_step), square outputs as 0/1.
    period: [i32; 3],
    count: [i32; 3],
    output: [u8; 3],

    // Noise generator. output_n is 0x00 or 0xFF so it overlays the mixer
    // inhibit bits directly.
    period_n: i32,
    count_n: i32,
    output_n: u8,
    rng: u32,

    // Envelope generator.
    period_e: i32,
    count_e: i32,
    count_env: i32, // current step, walks 15..0 (transiently negative)
    attack: u8,     // 0x00 or 0x0F, XOR mask over the step
    hold: bool,
    alternate: bool,
    holding: bool,
    vol_e: i32,

    // Channel volumes (DAC levels) and envelope-mode flags.
    vol: [i32; 3],
    env_mode: [bool; 3],

    update_step: i32,
    cycles_per_sample: u32,
    cycle_accum: u32,

    io_input: u8,
    sample_buffer: Vec<i16>,
}

impl Ay38912 {
    pub fn new(clock_hz: u32, sample_rate: u32) -> Self {
        // Periods are programmed in units of 8 chip clocks; scaling them by
        // update_step converts register values into STEP units per sample.
        let update_step = ((STEP as i64 * 8 * sample_rate as i64) / clock_hz as i64) as i32;
        Self {
            regs: [0; 16],
            latched_addr: 0,
            period: [update_step; 3],
            count: [update_step; 3],
            output: [0; 3],
            period_n: update_step,
            count_n: update_step,
            output_n: 0xFF,
            rng: 1,
            period_e: update_step,
            count_e: update_step,
            count_env: 0,
            attack: 0,
            hold: false,
            alternate: false,
            holding: false,
            vol_e: 0,
            vol: [0; 3],
            env_mode: [false; 3],
            update_step,
            cycles_per_sample: clock_hz / sample_rate,
            cycle_accum: 0,
            io_input: 0xFF,
            sample_buffer: Vec::new(),
        }
    }

    /// One chip cycle: service the VIA bus, and emit a sample when the
    /// divider elapses.
    pub fn emulate_cycle(&mut self, via: &mut Via6522) {
        let port_b = via.port_b_pins();
        let bc1 = port_b & 0x08 != 0;
        let bdir = port_b & 0x10 != 0;
        match (bdir, bc1) {
            (true, true) => self.latched_addr = via.port_a_pins() & 0x0F,
            (true, false) => self.write_register(self.latched_addr, via.port_a_pins()),
            (false, true) => {
                let value = self.read_register(self.latched_addr);
                via.set_port_a_input(value);
            }
            (false, false) => {}
        }

        self.cycle_accum += 1;
        if self.cycle_accum >= self.cycles_per_sample {
            self.cycle_accum = 0;
            let sample = self.render_sample();
            self.sample_buffer.push(sample);
        }
    }

    pub fn read_register(&self, reg: u8) -> u8 {
        let reg = (reg & 0x0F) as usize;
        if reg == 14 && self.regs[7] & 0x40 == 0 {
            // Mixer bit 6 low: the I/O port is an input, driven by the
            // console's button lines.
            self.io_input
        } else {
            self.regs[reg]
        }
    }

    pub fn write_register(&mut self, reg: u8, data: u8) {
        let reg = (reg & 0x0F) as usize;
        let data = data & REGISTER_MASKS[reg];
        self.regs[reg] = data;
        match reg {
            0 | 1 => self.update_tone_period(0),
            2 | 3 => self.update_tone_period(1),
            4 | 5 => self.update_tone_period(2),
            6 => {
                let old = self.period_n;
                self.period_n = ((data as i32) * 2 * self.update_step).max(self.update_step);
                self.count_n += self.period_n - old;
                if self.count_n <= 0 {
                    self.count_n = 1;
                }
            }
            7 => {} // consulted during rendering
            8..=10 => {
                let ch = reg - 8;
                self.env_mode[ch] = data & 0x10 != 0;
                self.vol[ch] = if self.env_mode[ch] {
                    self.vol_e
                } else {
                    VOLUME_LEVELS[(data & 0x0F) as usize]
                };
            }
            11 | 12 => {
                let fine = self.regs[11] as i32;
                let coarse = self.regs[12] as i32;
                let old = self.period_e;
                self.period_e =
                    (((fine + (coarse << 8)) * self.update_step).max(self.update_step / 2)).max(1);
                self.count_e += self.period_e - old;
                if self.count_e <= 0 {
                    self.count_e = 1;
                }
            }
            13 => {
                // Shape: bit 3 = continue, 2 = attack, 1 = alternate, 0 = hold.
                // With continue clear the envelope runs once and holds, and
                // alternate mirrors attack (the 0-7 shapes).
                self.attack = if data & 0x04 != 0 { 0x0F } else { 0x00 };
                if data & 0x08 == 0 {
                    self.hold = true;
                    self.alternate = self.attack != 0;
                } else {
                    self.hold = data & 0x01 != 0;
                    self.alternate = data & 0x02 != 0;
                }
                self.count_e = self.period_e;
                self.count_env = 0x0F;
                self.holding = false;
                self.vol_e = VOLUME_LEVELS[((self.count_env ^ self.attack as i32) & 0x0F) as usize];
                for ch in 0..3 {
                    if self.env_mode[ch] {
                        self.vol[ch] = self.vol_e;
                    }
                }
            }
            _ => {} // 14: I/O port latch, no synthesis side effect
        }
    }

    fn update_tone_period(&mut self, ch: usize) {
        let fine = self.regs[ch * 2] as i32;
        let coarse = self.regs[ch * 2 + 1] as i32;
        let old = self.period[ch];
        self.period[ch] = (((fine + (coarse << 8)) * self.update_step).max(self.update_step)).max(1);
        self.count[ch] += self.period[ch] - old;
        if self.count[ch] <= 0 {
            self.count[ch] = 1;
        }
    }

    /// Integrate one output sample's worth of tone, noise, and envelope.
    fn render_sample(&mut self) -> i16 {
        let enable = self.regs[7];

        // A channel with its tone inhibited is locked high so the volume
        // gate still passes; its counter is topped up so it cannot toggle
        // mid-sample. A silent channel only gets the counter top-up.
        for ch in 0..3 {
            if enable & (1 << ch) != 0 {
                if self.count[ch] <= STEP {
                    self.count[ch] += STEP;
                }
                self.output[ch] = 1;
            } else if self.regs[8 + ch] == 0 && self.count[ch] <= STEP {
                self.count[ch] += STEP;
            }
        }
        if enable & 0x38 == 0x38 && self.count_n <= STEP {
            self.count_n += STEP;
        }

        // Per-channel high time within this sample, in STEP units.
        let mut cnt = [0i32; 3];
        let mut outn = self.output_n | enable;
        let mut left = STEP;
        loop {
            // Integrate only up to the next noise event; the noise state
            // gates the tone outputs through `outn`.
            let nextevent = self.count_n.min(left);

            for ch in 0..3 {
                let noise_high = outn & (0x08 << ch) != 0;
                cnt[ch] += channel_pass(
                    &mut self.count[ch],
                    self.period[ch],
                    &mut self.output[ch],
                    noise_high,
                    nextevent,
                );
            }

            self.count_n -= nextevent;
            if self.count_n <= 0 {
                // 17-bit LFSR, bit0 XOR bit3 feedback; the output flips when
                // bits 0 and 1 differ.
                if (self.rng + 1) & 2 != 0 {
                    self.output_n = !self.output_n;
                    outn = self.output_n | enable;
                }
                if self.rng & 1 != 0 {
                    self.rng ^= 0x24000;
                }
                self.rng >>= 1;
                self.count_n += self.period_n;
            }

            left -= nextevent;
            if left <= 0 {
                break;
            }
        }

        self.step_envelope();

        let mixed = (cnt[0] as i64 * self.vol[0] as i64
            + cnt[1] as i64 * self.vol[1] as i64
            + cnt[2] as i64 * self.vol[2] as i64)
            >> 13;
        mixed.min(0x7FFF) as i16
    }

    fn step_envelope(&mut self) {
        if self.holding {
            return;
        }
        self.count_e -= STEP;
        if self.count_e > 0 {
            return;
        }
        while self.count_e <= 0 {
            self.count_env -= 1;
            self.count_e += self.period_e;
        }
        if self.count_env < 0 {
            if self.hold {
                if self.alternate {
                    self.attack ^= 0x0F;
                }
                self.holding = true;
                self.count_env = 0;
            } else {
                // An odd number of wraps inverts the ramp.
                if self.alternate && self.count_env & 0x10 != 0 {
                    self.attack ^= 0x0F;
                }
                self.count_env &= 0x0F;
            }
        }
        self.vol_e = VOLUME_LEVELS[((self.count_env ^ self.attack as i32) & 0x0F) as usize];
        for ch in 0..3 {
            if self.env_mode[ch] {
                self.vol[ch] = self.vol_e;
            }
        }
    }

    /// Latch the console button lines onto the I/O port input.
    pub fn set_io_input(&mut self, data: u8) {
        self.io_input = data;
    }

    /// Take the accumulated sample buffer. The machine drains this once per
    /// frame (441 samples at 50 Hz) into the audio sink.
    pub fn drain_audio(&mut self) -> Vec<i16> {
        std::mem::take(&mut self.sample_buffer)
    }

    pub fn latched_address(&self) -> u8 {
        self.latched_addr
    }

    pub fn register(&self, reg: u8) -> u8 {
        self.regs[(reg & 0x0F) as usize]
    }

    /// Current envelope step (0-15 while running, frozen when holding).
    pub fn envelope_step(&self) -> i32 {
        self.count_env
    }
}

impl Default for Ay38912 {
    fn default() -> Self {
        Self::new(PSG_CLOCK_HZ, SAMPLE_RATE)
    }
}

/// Advance one channel across `nextevent` STEP units, returning the time the
/// gated output spent high. With noise high (or inhibited) the high time
/// accumulates; with noise low the counter still runs so the phase stays
/// correct, but no volume accumulates.
fn channel_pass(
    count: &mut i32,
    period: i32,
    output: &mut u8,
    noise_high: bool,
    nextevent: i32,
) -> i32 {
    let mut vol = 0;
    if noise_high {
        if *output != 0 {
            vol += *count;
        }
        *count -= nextevent;
        while *count <= 0 {
            *count += period;
            if *count > 0 {
                *output ^= 1;
                if *output != 0 {
                    vol += period;
                }
                break;
            }
            *count += period;
            vol += period;
        }
        if *output != 0 {
            vol -= *count;
        }
    } else {
        *count -= nextevent;
        while *count <= 0 {
            *count += period;
            if *count > 0 {
                *output ^= 1;
                break;
            }
            *count += period;
        }
    }
    vol
}
