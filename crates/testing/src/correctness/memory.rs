use riscv_core::memory::page::{PageAttr, PAGE_SIZE};
use riscv_core::Memory;

#[test]
fn unmapped_addresses_read_as_the_cow_zero_page() {
    let mut mem = Memory::new(1 << 20);
    let mut buf = [0xffu8; 16];
    mem.read_bytes(0x5_0000, &mut buf).unwrap();
    assert_eq!(buf, [0u8; 16]);
}

#[test]
fn an_unmapped_address_is_writable_via_cow_zero_materialization() {
    let mut mem = Memory::new(1 << 20);
    let addr = 0x1_0000u64;
    // Unmapped addresses are backed by the CoW zero page, which is
    // READ | WRITE, so a write here succeeds and materializes a
    // private page rather than faulting.
    mem.write_u8(addr, 1).unwrap();
    assert_eq!(mem.read_u8(addr).unwrap(), 1);
}

#[test]
fn a_mapping_without_the_write_attribute_faults_on_write() {
    let mut mem = Memory::new(1 << 20);
    let addr = 0x1_0000u64;
    mem.set_page_attr(addr, PAGE_SIZE, PageAttr::READ).unwrap();
    assert!(mem.write_u8(addr, 1).is_err());
    // WRITE alone doesn't imply READ.
    mem.set_page_attr(addr, PAGE_SIZE, PageAttr::WRITE).unwrap();
    mem.write_u8(addr, 1).unwrap();
    assert!(mem.read_u8(addr).is_err());

    mem.set_page_attr(addr, PAGE_SIZE, PageAttr::READ | PageAttr::WRITE).unwrap();
    assert_eq!(mem.read_u8(addr).unwrap(), 1);
}

#[test]
fn fork_gives_the_child_an_independent_copy_on_write_view() {
    let mut parent = Memory::new(1 << 20);
    let addr = 0x2_0000u64;
    parent.set_page_attr(addr, PAGE_SIZE, PageAttr::READ | PageAttr::WRITE).unwrap();
    parent.write_u32(addr, 111).unwrap();

    let mut child = parent.fork_into_child();
    assert_eq!(child.read_u32(addr).unwrap(), 111);

    child.write_u32(addr, 222).unwrap();
    assert_eq!(child.read_u32(addr).unwrap(), 222);
    assert_eq!(parent.read_u32(addr).unwrap(), 111);
}
