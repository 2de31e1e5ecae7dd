use vectrex_core::device::ay38912::Ay38912;
use vectrex_core::device::via6522::Via6522;

/// Helper: run the PSG for `n` chip cycles with whatever bus state the VIA
/// currently presents.
fn run(psg: &mut Ay38912, via: &mut Via6522, n: usize) {
    for _ in 0..n {
        psg.emulate_cycle(via);
    }
}

/// A VIA with both ports as outputs and the bus idle.
fn bus_via() -> Via6522 {
    let mut via = Via6522::new();
    via.write(3, 0xFF); // DDRA
    via.write(2, 0xFF); // DDRB
    via.write(0, 0x00); // BDIR=0, BC1=0: inactive
    via
}

// =============================================================================
// VIA bus protocol
// =============================================================================

#[test]
fn test_bus_latch_write_read() {
    let mut via = bus_via();
    let mut psg = Ay38912::default();

    // Latch address 7 (mixer): BDIR=1, BC1=1 on PB4/PB3.
    via.write(1, 0x07);
    via.write(0, 0x18);
    psg.emulate_cycle(&mut via);
    assert_eq!(psg.latched_address(), 7);

    // Write 0x3E: tones enabled, noise disabled on all channels.
    via.write(1, 0x3E);
    via.write(0, 0x10);
    psg.emulate_cycle(&mut via);
    assert_eq!(psg.register(7), 0x3E);

    // Read mode drives Port A from the latched register; flip the port to
    // inputs so the pins show the PSG's value.
    via.write(3, 0x00);
    via.write(0, 0x08);
    psg.emulate_cycle(&mut via);
    assert_eq!(via.read(1), 0x3E);
    assert_eq!(via.port_a_pins(), 0x3E);
}

#[test]
fn test_bus_inactive_does_nothing() {
    let mut via = bus_via();
    let mut psg = Ay38912::default();

    via.write(1, 0x07);
    via.write(0, 0x18);
    psg.emulate_cycle(&mut via);
    via.write(1, 0x55);
    via.write(0, 0x00); // inactive
    psg.emulate_cycle(&mut via);
    assert_eq!(psg.register(7), 0x00);
    assert_eq!(psg.latched_address(), 7);
}

#[test]
fn test_register_masks() {
    let mut psg = Ay38912::default();
    psg.write_register(1, 0xFF); // coarse tone: 4 bits
    psg.write_register(6, 0xFF); // noise: 5 bits
    psg.write_register(8, 0xFF); // volume: 5 bits (envelope flag + level)
    psg.write_register(13, 0xFF); // shape: 4 bits
    assert_eq!(psg.register(1), 0x0F);
    assert_eq!(psg.register(6), 0x1F);
    assert_eq!(psg.register(8), 0x1F);
    assert_eq!(psg.register(13), 0x0F);
}

// =============================================================================
// Buttons on the I/O port
// =============================================================================

#[test]
fn test_io_port_reads_buttons_when_input() {
    let mut psg = Ay38912::default();
    psg.set_io_input(0xFE); // button 1 held (active low)

    // Mixer bit 6 low (default): port is an input.
    assert_eq!(psg.read_register(14), 0xFE);

    // Output mode returns the latch instead.
    psg.write_register(7, 0x40);
    psg.write_register(14, 0x12);
    assert_eq!(psg.read_register(14), 0x12);
}

#[test]
fn test_io_port_read_over_the_bus() {
    let mut via = bus_via();
    let mut psg = Ay38912::default();
    psg.set_io_input(0xF7);

    via.write(1, 0x0E);
    via.write(0, 0x18); // latch address 14
    psg.emulate_cycle(&mut via);
    via.write(3, 0x00);
    via.write(0, 0x08); // read mode
    psg.emulate_cycle(&mut via);
    assert_eq!(via.read(1), 0xF7);
}

// =============================================================================
// Sample generation
// =============================================================================

#[test]
fn test_sample_cadence_is_clock_over_rate() {
    let mut via = bus_via();
    let mut psg = Ay38912::default();

    // 1.5 MHz / 22 050 Hz = 68 cycles per sample; one 50 Hz frame of 30 000
    // cycles yields 441 samples.
    run(&mut psg, &mut via, 30_000);
    let samples = psg.drain_audio();
    assert_eq!(samples.len(), 441);
    assert!(psg.drain_audio().is_empty());
}

#[test]
fn test_silent_by_default() {
    let mut via = bus_via();
    let mut psg = Ay38912::default();
    run(&mut psg, &mut via, 10_000);
    assert!(psg.drain_audio().iter().all(|&s| s == 0));
}

#[test]
fn test_volume_only_channel_saturates() {
    let mut via = bus_via();
    let mut psg = Ay38912::default();

    // Everything inhibited locks the tone gates high, so volume passes
    // straight through; a full-volume channel pegs the (clamped) mixer.
    psg.write_register(7, 0x3F);
    psg.write_register(8, 0x0F);
    run(&mut psg, &mut via, 1_000);
    let samples = psg.drain_audio();
    assert!(!samples.is_empty());
    assert!(samples.iter().all(|&s| s == 0x7FFF));
}

#[test]
fn test_tone_produces_a_square_wave() {
    let mut via = bus_via();
    let mut psg = Ay38912::default();

    psg.write_register(7, 0x3E); // channel A tone on, noise off everywhere
    psg.write_register(8, 0x0F);
    psg.write_register(0, 0x10); // fast but audible period
    run(&mut psg, &mut via, 30_000);
    let samples = psg.drain_audio();

    let lo = samples.iter().copied().min().unwrap();
    let hi = samples.iter().copied().max().unwrap();
    assert!(hi > lo, "tone output should alternate");
    assert!(hi > 0);
}

#[test]
fn test_noise_varies_the_output() {
    let mut via = bus_via();
    let mut psg = Ay38912::default();

    psg.write_register(7, 0x37); // channel A: tone off, noise on
    psg.write_register(8, 0x0F);
    psg.write_register(6, 0x01);
    run(&mut psg, &mut via, 30_000);
    let samples = psg.drain_audio();

    let distinct: std::collections::HashSet<i16> = samples.iter().copied().collect();
    assert!(distinct.len() > 2, "noise should not be a pure tone");
}

// =============================================================================
// Envelope generator
// =============================================================================

#[test]
fn test_envelope_decay_shape_holds_at_zero() {
    let mut via = bus_via();
    let mut psg = Ay38912::default();

    psg.write_register(7, 0x3F); // gates locked high
    psg.write_register(8, 0x10); // channel A follows the envelope
    psg.write_register(11, 0x04); // short period
    psg.write_register(13, 0x00); // single decay, then hold

    run(&mut psg, &mut via, 68);
    let first = psg.drain_audio();
    assert!(first[0] > 0, "envelope starts loud");

    run(&mut psg, &mut via, 30_000);
    let tail = psg.drain_audio();
    assert_eq!(*tail.last().unwrap(), 0, "decay shape ends silent");
    assert_eq!(psg.envelope_step(), 0);
}

#[test]
fn test_envelope_attack_shape_rises() {
    let mut via = bus_via();
    let mut psg = Ay38912::default();

    psg.write_register(7, 0x3F);
    psg.write_register(8, 0x10);
    psg.write_register(11, 0x20);
    psg.write_register(13, 0x04); // attack, then drop to 0 and hold

    run(&mut psg, &mut via, 68);
    let first = psg.drain_audio();
    run(&mut psg, &mut via, 2_000);
    let later = psg.drain_audio();
    assert!(
        later.iter().copied().max().unwrap() > first[0],
        "attack shape should rise from quiet"
    );
}

#[test]
fn test_shape_write_restarts_the_envelope() {
    let mut via = bus_via();
    let mut psg = Ay38912::default();

    psg.write_register(7, 0x3F);
    psg.write_register(8, 0x10);
    psg.write_register(11, 0x02);
    psg.write_register(13, 0x00);
    run(&mut psg, &mut via, 30_000);
    psg.drain_audio();
    assert_eq!(psg.envelope_step(), 0);

    psg.write_register(13, 0x00);
    assert_eq!(psg.envelope_step(), 0x0F);
    run(&mut psg, &mut via, 68);
    assert!(psg.drain_audio()[0] > 0);
}
