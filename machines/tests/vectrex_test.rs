use vectrex_core::device::joystick::Input;
use vectrex_machines::Vectrex;

mod common;
use common::{Op, ScriptedCpu, test_rom};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// The VIA's registers as the CPU sees them.
const VIA_ORB: u16 = 0xD000;
const VIA_ORA: u16 = 0xD001;
const VIA_DDRB: u16 = 0xD002;
const VIA_DDRA: u16 = 0xD003;
const VIA_T1_LO: u16 = 0xD004;
const VIA_T1_HI: u16 = 0xD005;
const VIA_ACR: u16 = 0xD00B;
const VIA_IER: u16 = 0xD00E;

// =============================================================================
// Frame cadence and lock-step ordering
// =============================================================================

#[test]
fn test_frames_are_exactly_30000_cycles() {
    init_logging();
    let mut machine = Vectrex::new(ScriptedCpu::idle(), test_rom(), None);
    machine.reset();

    for expected in 1..=3u64 {
        let frame = machine.run_until_frame(true);
        assert_eq!(frame.number, expected);
        assert_eq!(machine.clock(), expected * 30_000);
    }
}

#[test]
fn test_reset_fetches_the_reset_vector() {
    init_logging();
    let mut machine = Vectrex::new(ScriptedCpu::idle(), test_rom(), None);
    machine.reset();

    let cpu = machine.cpu();
    assert_eq!(cpu.reset_count, 1);
    // The vector bytes come from the top of the system ROM image.
    assert_eq!(cpu.reads, vec![(0xFFFE, 0xFE), (0xFFFF, 0xFF)]);
}

#[test]
fn test_cartridge_is_visible_to_the_cpu() {
    init_logging();
    let script = vec![Op::Read(0x0000), Op::Read(0x4000)];
    let mut machine = Vectrex::new(
        ScriptedCpu::new(script),
        test_rom(),
        Some(vec![0xAB; 0x1000]),
    );

    machine.tick(true);
    machine.tick(true);
    // Inside the image the cartridge answers; past it the bus floats to 0.
    assert_eq!(machine.cpu().reads, vec![(0x0000, 0xAB), (0x4000, 0x00)]);
}

// =============================================================================
// VIA wiring: timer interrupt reaches the CPU
// =============================================================================

#[test]
fn test_t1_interrupt_drives_the_cpu_irq_line() {
    init_logging();
    let script = vec![
        Op::Write(VIA_IER, 0x80 | 0x40), // enable T1
        Op::Write(VIA_ACR, 0x00),
        Op::Write(VIA_T1_LO, 0x10),
        Op::Write(VIA_T1_HI, 0x00),
    ];
    let mut machine = Vectrex::new(ScriptedCpu::new(script), test_rom(), None);

    for _ in 0..40 {
        machine.tick(true);
    }
    assert_eq!(machine.cpu().irq_rises, 1);
    assert!(machine.cpu().irq_level, "unserviced IRQ stays asserted");
    assert!(machine.via().irq());
}

#[test]
fn test_masked_interrupt_stays_off_the_irq_line() {
    init_logging();
    let script = vec![
        Op::Write(VIA_ACR, 0x00),
        Op::Write(VIA_T1_LO, 0x10),
        Op::Write(VIA_T1_HI, 0x00),
    ];
    let mut machine = Vectrex::new(ScriptedCpu::new(script), test_rom(), None);

    for _ in 0..40 {
        machine.tick(true);
    }
    assert_eq!(machine.cpu().irq_rises, 0);
    assert!(!machine.via().irq());
}

// =============================================================================
// PSG over the VIA bus
// =============================================================================

#[test]
fn test_cpu_programs_the_psg_through_the_via() {
    init_logging();
    let script = vec![
        Op::Write(VIA_DDRA, 0xFF),
        Op::Write(VIA_DDRB, 0xFF),
        Op::Write(VIA_ORA, 0x07), // mixer register address
        Op::Write(VIA_ORB, 0x18), // BDIR+BC1: latch
        Op::Write(VIA_ORA, 0x3E),
        Op::Write(VIA_ORB, 0x10), // BDIR: write
        Op::Write(VIA_ORB, 0x00), // idle
    ];
    let mut machine = Vectrex::new(ScriptedCpu::new(script), test_rom(), None);

    for _ in 0..10 {
        machine.tick(false);
    }
    assert_eq!(machine.psg().latched_address(), 7);
    assert_eq!(machine.psg().register(7), 0x3E);
}

#[test]
fn test_warp_skips_sound_generation() {
    init_logging();
    let mut machine = Vectrex::new(ScriptedCpu::idle(), test_rom(), None);
    machine.reset();

    machine.run_until_frame(true);
    assert!(machine.drain_audio().is_empty());

    machine.run_until_frame(false);
    assert_eq!(machine.drain_audio().len(), 441);
}

// =============================================================================
// Joystick wiring
// =============================================================================

#[test]
fn test_compare_reaches_port_b_bit_5() {
    init_logging();
    let mut machine = Vectrex::new(ScriptedCpu::idle(), test_rom(), None);

    // Stick hard right: +127 beats the idle DAC level of -128.
    machine.joystick_mut().key_down(Input::Right);
    machine.tick(true);
    assert!(machine.via().port_b_pins() & 0x20 != 0);

    machine.joystick_mut().key_up(Input::Right);
    machine.joystick_mut().key_down(Input::Left);
    machine.tick(true);
    assert!(machine.via().port_b_pins() & 0x20 == 0);
}

#[test]
fn test_buttons_reach_the_psg_io_port() {
    init_logging();
    let mut machine = Vectrex::new(ScriptedCpu::idle(), test_rom(), None);

    machine.joystick_mut().key_down(Input::Button2);
    machine.tick(true);
    assert_eq!(machine.psg().read_register(14), 0xFD);

    machine.joystick_mut().key_up(Input::Button2);
    machine.tick(true);
    assert_eq!(machine.psg().read_register(14), 0xFF);
}

// =============================================================================
// Phosphor handoff
// =============================================================================

#[test]
fn test_frame_reports_the_dot_cursor() {
    init_logging();
    let mut machine = Vectrex::new(ScriptedCpu::idle(), test_rom(), None);
    let mut reader = machine.take_phosphor_reader().expect("first take");
    assert!(machine.take_phosphor_reader().is_none());

    // An idle CPU leaves BLANK asserted (CB2 low at power-on), so a frame
    // draws nothing.
    let frame = machine.run_until_frame(true);
    assert_eq!(frame.dot_end, 0);
    assert_eq!(reader.alive(), 0);
    reader.sweep(|_| panic!("no dots expected"));
}

#[test]
fn test_cpu_drawing_lands_dots_in_the_ring() {
    init_logging();
    let script = vec![
        Op::Write(VIA_DDRA, 0xFF),
        Op::Write(VIA_DDRB, 0xFF),
        Op::Write(0xD00C, 0xEE), // ZERO off, beam on
        Op::Write(VIA_ORA, 0x40), // brightness 64...
        Op::Write(VIA_ORB, 0x84), // ...into the Z hold
    ];
    let mut machine = Vectrex::new(ScriptedCpu::new(script), test_rom(), None);
    let mut reader = machine.take_phosphor_reader().expect("reader");

    let frame = machine.run_until_frame(true);
    assert!(frame.dot_end > 0);
    assert!(reader.alive() > 0);

    let mut max_z = 0u8;
    reader.sweep(|dot| max_z = max_z.max(dot.z));
    assert_eq!(max_z, 64);
}
