//! Analog vector-drawing subsystem: DAC, multiplexer, integrators, and the
//! Z sample-and-hold, feeding the phosphor ring.
//!
//! VIA Port A drives the 8-bit DAC. Port B bit 0 enables the 1-of-4
//! multiplexer and bits 1-2 select its channel, routing the DAC level to the
//! Y integrator input (0), the X/Y offset (1), the Z sample-and-hold (2), or
//! the sound line (3, ignored here). Three active-low control lines shape
//! the beam each cycle: RAMP (PB7) enables integration, ZERO (CA2) snaps the
//! gun back to center, BLANK (CB2) cuts the beam.

use crate::device::joystick::Joystick;
use crate::device::phosphors::PhosphorWriter;
use crate::device::via6522::Via6522;

/// 1.5 MHz / 50 Hz: cycles between end-of-frame signals.
pub const CYCLES_PER_FRAME: u32 = 30_000;

// Screen box in internal (pre-scaled) gun units.
const SCREEN_X_BOUND: i32 = 16_384;
const SCREEN_Y_BOUND: i32 = 20_480;

pub struct VectorVideo {
    x_integrator: i32, // signed DAC level currently driving the X input
    y_hold: i32,
    xy_offset: i32,
    z_hold: i32, // beam brightness, 0..127
    gun_x: i32,  // signed 24-bit integrator sums
    gun_y: i32,
    in_stroke: bool,
    cycle_in_frame: u32,
    phosphors: PhosphorWriter,
}

impl VectorVideo {
    pub fn new(phosphors: PhosphorWriter) -> Self {
        Self {
            x_integrator: 0,
            y_hold: 0,
            xy_offset: 0,
            z_hold: 0,
            gun_x: 0,
            gun_y: 0,
            in_stroke: false,
            cycle_in_frame: 0,
            phosphors,
        }
    }

    /// Reset the analog state while keeping the phosphor ring (and whatever
    /// trail is still fading on screen).
    pub fn reset(&mut self) {
        self.x_integrator = 0;
        self.y_hold = 0;
        self.xy_offset = 0;
        self.z_hold = 0;
        self.gun_x = 0;
        self.gun_y = 0;
        self.in_stroke = false;
        self.cycle_in_frame = 0;
    }

    /// Run one cycle of the analog pipeline against the VIA's current pin
    /// state. Returns true when this cycle completes a 50 Hz frame.
    pub fn emulate_cycle(&mut self, via: &Via6522, joystick: &mut Joystick) -> bool {
        let port_a = via.port_a_pins();
        let port_b = via.port_b_pins();

        let ramp = port_b & 0x80 == 0;
        let zero = !via.ca2();
        let blank = !via.cb2();

        // Port A carries an excess-128 value; flipping the top bit yields
        // the two's-complement level on the DAC output.
        let dac_raw = port_a ^ 0x80;
        let dac = dac_raw as i8 as i32;
        self.x_integrator = dac;

        let mux_enabled = port_b & 0x01 == 0;
        let mux_channel = (port_b >> 1) & 0x03;
        if mux_enabled {
            match mux_channel {
                0 => self.y_hold = dac,
                1 => self.xy_offset = dac,
                2 => self.z_hold = (dac_raw as i32 - 128).max(0),
                _ => {} // channel 3 feeds the sound line
            }
        }
        joystick.process_mux(mux_channel, dac);

        let (dx, dy) = if zero {
            (-self.gun_x, -self.gun_y)
        } else if ramp {
            (
                self.x_integrator - self.xy_offset,
                self.y_hold - self.xy_offset,
            )
        } else {
            (0, 0)
        };
        self.move_beam(dx, dy, !blank);

        self.cycle_in_frame += 1;
        if self.cycle_in_frame >= CYCLES_PER_FRAME {
            self.cycle_in_frame = 0;
            true
        } else {
            false
        }
    }

    /// Emit a dot at the current gun position if the beam is on and inside
    /// the screen box, then integrate the deltas.
    fn move_beam(&mut self, dx: i32, dy: i32, beam_on: bool) {
        if beam_on && self.on_screen() {
            self.phosphors.append(
                (self.gun_x >> 6) as i16,
                (self.gun_y >> 6) as i16,
                self.z_hold as u8,
                !self.in_stroke,
            );
            self.in_stroke = true;
        } else {
            self.in_stroke = false;
        }
        self.gun_x += dx;
        self.gun_y += dy;
    }

    fn on_screen(&self) -> bool {
        (-SCREEN_X_BOUND..SCREEN_X_BOUND).contains(&self.gun_x)
            && (-SCREEN_Y_BOUND..SCREEN_Y_BOUND).contains(&self.gun_y)
    }

    pub fn gun_x(&self) -> i32 {
        self.gun_x
    }

    pub fn gun_y(&self) -> i32 {
        self.gun_y
    }

    pub fn z_hold(&self) -> i32 {
        self.z_hold
    }

    pub fn cycle_in_frame(&self) -> u32 {
        self.cycle_in_frame
    }

    /// Ring position of the next dot; completed frames stamp this into
    /// their [`Frame`](crate::core::frame::Frame) record.
    pub fn dot_cursor(&self) -> u32 {
        self.phosphors.cursor()
    }

    /// Number of alive dots in the ring.
    pub fn dots_alive(&self) -> usize {
        self.phosphors.alive()
    }
}
