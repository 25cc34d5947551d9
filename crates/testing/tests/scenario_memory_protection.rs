use riscv_core::error::AccessKind;
use riscv_core::memory::page::{PageAttr, PAGE_SIZE};
use riscv_core::xlen::Rv64;
use riscv_core::{Cpu, Memory, RvError};

#[test]
fn execute_only_pages_reject_reads_writes_and_decode_all_zero_content() {
    riscv_core_testing::init_tracing();
    let mut mem = Memory::new(1 << 20);
    let addr = 0x4_0000u64;

    mem.set_page_attr(addr, PAGE_SIZE, PageAttr::WRITE).unwrap();
    mem.memset(addr, 0, PAGE_SIZE).unwrap();
    mem.set_page_attr(addr, PAGE_SIZE, PageAttr::EXEC).unwrap();

    let mut cpu = Cpu::<Rv64>::new();
    cpu.regs.set_pc(addr);
    let err = cpu.simulate(&mut mem, 1).unwrap_err();
    assert!(matches!(err, RvError::IllegalOpcode { .. }), "got: {err:?}");

    let err = mem.read_u8(addr).unwrap_err();
    assert!(matches!(err, RvError::ProtectionFault { access: AccessKind::Read, .. }));

    let err = mem.write_u8(addr, 1).unwrap_err();
    assert!(matches!(err, RvError::ProtectionFault { access: AccessKind::Write, .. }));
}
