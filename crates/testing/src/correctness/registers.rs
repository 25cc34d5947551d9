use riscv_core::registers::{Registers, REG_A0, REG_ZERO};
use riscv_core::xlen::Rv64;

#[test]
fn x0_reads_zero_even_after_a_write() {
    let mut regs = Registers::<Rv64>::new();
    regs.set(REG_ZERO, 12345);
    assert_eq!(regs.get(REG_ZERO), 0);
}

#[test]
fn general_register_round_trips() {
    let mut regs = Registers::<Rv64>::new();
    regs.set(REG_A0, 0xdead_beef_u64);
    assert_eq!(regs.get(REG_A0), 0xdead_beef_u64);
}

#[test]
fn pc_advances_by_the_decoded_length() {
    let mut regs = Registers::<Rv64>::new();
    regs.set_pc(0x1000);
    regs.advance_pc(4);
    assert_eq!(regs.pc(), 0x1004);
    regs.advance_pc(2);
    assert_eq!(regs.pc(), 0x1006);
}

#[test]
fn f32_values_round_trip_through_nan_boxed_storage() {
    let mut regs = Registers::<Rv64>::new();
    regs.set_f32(10, 1.5);
    assert_eq!(regs.get_f32(10), 1.5);
    // the top 32 bits of a nan-boxed single must be all ones.
    assert_eq!(regs.fpr_raw(10).bits() >> 32, 0xffff_ffff);
}

#[test]
fn f64_values_round_trip_without_nan_boxing() {
    let mut regs = Registers::<Rv64>::new();
    regs.set_f64(11, std::f64::consts::PI);
    assert_eq!(regs.get_f64(11), std::f64::consts::PI);
}

#[test]
fn reset_clears_every_register_and_pc() {
    let mut regs = Registers::<Rv64>::new();
    regs.set(REG_A0, 42);
    regs.set_pc(0x2000);
    regs.reset();
    assert_eq!(regs.get(REG_A0), 0);
    assert_eq!(regs.pc(), 0);
}
