use riscv_core::memory::page::{PageAttr, PAGE_SIZE};
use riscv_core::xlen::Rv64;
use riscv_core::{elf, Machine, MachineConfig};
use riscv_core_testing::asm::{assemble, ecall, li, A1, A2, A7};
use riscv_core_testing::elf_builder::{build, Segment, PF_R, PF_X};

const MSG_ADDR: u64 = 0x500;
const PATH_ADDR: u64 = 0x600;
const SYS_OPENAT: i32 = 56;
const SYS_WRITE: i32 = 64;
const O_WRONLY: i32 = 1;

/// `hello`: opens the file named at `PATH_ADDR`, writes the 12 bytes at
/// `MSG_ADDR` to it, and returns the byte count `write` reported.
fn hello_body() -> Vec<u8> {
    assemble(&[
        li(A1, PATH_ADDR as i32),
        li(A2, O_WRONLY),
        li(A7, SYS_OPENAT),
        ecall(),
        li(A1, MSG_ADDR as i32),
        li(A2, 12),
        li(A7, SYS_WRITE),
        ecall(),
        riscv_core_testing::asm::ret(),
    ])
}

#[test]
fn vmcall_invokes_an_elf_exported_symbol_that_writes_hello_world() {
    riscv_core_testing::init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hello.txt");
    let path_str = path.to_str().unwrap().to_string();

    let image = build(
        0x1000,
        &[Segment { vaddr: 0x1000, flags: PF_R | PF_X, bytes: hello_body() }],
        &[("hello", 0x1000)],
    );

    let mut machine = Machine::<Rv64>::new(MachineConfig { enable_filesystem: true, ..MachineConfig::default() });
    machine.cpu.syscalls.fd_table.allowed_paths.push(path_str.clone());

    let loaded = elf::load::<Rv64>(&image, &mut machine.mem, &mut machine.cpu, false).unwrap();
    let hello_addr = loaded.address_of("hello").expect("symbol table should resolve `hello`");

    machine.mem.set_page_attr(MSG_ADDR, PAGE_SIZE, PageAttr::READ | PageAttr::WRITE).unwrap();
    machine.mem.write_bytes(MSG_ADDR, b"Hello World!").unwrap();
    machine.mem.set_page_attr(PATH_ADDR, PAGE_SIZE, PageAttr::READ | PageAttr::WRITE).unwrap();
    machine.mem.write_bytes(PATH_ADDR, path_str.as_bytes()).unwrap();
    machine.mem.write_u8(PATH_ADDR + path_str.len() as u64, 0).unwrap();

    let written = machine.vmcall(hello_addr, &[], 1000).unwrap();
    assert_eq!(written, 12);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "Hello World!");
}
