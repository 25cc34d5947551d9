use riscv_core::error::AccessKind;
use riscv_core::memory::page::{PageAttr, PAGE_SIZE};
use riscv_core::{Memory, RvError};

#[test]
fn revoking_page_attrs_invalidates_the_read_cache() {
    riscv_core_testing::init_tracing();
    let mut mem = Memory::new(1 << 20);
    let addr = 0x9_0000u64;

    mem.set_page_attr(addr, PAGE_SIZE, PageAttr::READ | PageAttr::WRITE).unwrap();
    mem.write_bytes(addr, &[1, 2, 3, 4]).unwrap();

    let mut buf = [0u8; 4];
    mem.read_bytes(addr, &mut buf).unwrap(); // populates the read cache
    assert_eq!(buf, [1, 2, 3, 4]);

    mem.set_page_attr(addr, PAGE_SIZE, PageAttr::empty()).unwrap();
    mem.invalidate_reset_cache();

    let err = mem.read_u8(addr).unwrap_err();
    assert!(matches!(err, RvError::ProtectionFault { access: AccessKind::Read, .. }));
}
