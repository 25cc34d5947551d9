use riscv_core::decoder::checksum::instruction_checksum;

#[test]
fn checksum_is_deterministic() {
    let bytes = crate::asm::assemble(&[crate::asm::li(crate::asm::A0, 1), crate::asm::ret()]);
    assert_eq!(instruction_checksum(&bytes), instruction_checksum(&bytes));
}

#[test]
fn checksum_distinguishes_different_code() {
    let a = crate::asm::assemble(&[crate::asm::li(crate::asm::A0, 1)]);
    let b = crate::asm::assemble(&[crate::asm::li(crate::asm::A0, 2)]);
    assert_ne!(instruction_checksum(&a), instruction_checksum(&b));
}

#[test]
fn empty_input_has_a_stable_checksum() {
    assert_eq!(instruction_checksum(&[]), instruction_checksum(&[]));
}
