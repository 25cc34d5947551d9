//! Round-trips [`crate::asm`]'s encoders back through
//! `riscv_core::decoder::fields`, the same bit layouts the real decoder
//! uses to pull operands out of a fetched word.

use proptest::prelude::*;
use riscv_core::decoder::fields;

proptest! {
    #[test]
    fn addi_immediate_round_trips(imm in -2048i32..=2047) {
        let word = crate::asm::addi(5, 6, imm);
        prop_assert_eq!(fields::imm_i(word), imm as i64);
    }

    #[test]
    fn beq_offset_round_trips(half in -2048i32..=2047) {
        let offset = half * 2;
        let word = crate::asm::beq(5, 6, offset);
        prop_assert_eq!(fields::imm_b(word), offset as i64);
    }

    #[test]
    fn jal_offset_round_trips(half in -524288i32..=524287) {
        let offset = half * 2;
        let word = crate::asm::jal(1, offset);
        prop_assert_eq!(fields::imm_j(word), offset as i64);
    }

    #[test]
    fn encoded_registers_round_trip(rd in 0u32..32, rs1 in 0u32..32, rs2 in 0u32..32) {
        let word = crate::asm::add(rd, rs1, rs2);
        prop_assert_eq!(fields::rd(word) as u32, rd);
        prop_assert_eq!(fields::rs1(word) as u32, rs1);
        prop_assert_eq!(fields::rs2(word) as u32, rs2);
    }
}
