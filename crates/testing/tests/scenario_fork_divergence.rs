use riscv_core::xlen::Rv64;
use riscv_core::{ExecSegment, Machine, MachineConfig};
use riscv_core_testing::asm::{assemble, beq, jal, li, lw, ret, sw, A0, T0, T1, T2};

const VALUE_ADDR: i32 = 0x700;

/// Checks that `mem[VALUE_ADDR] == 1` (returning 0/1 in `a0`), then
/// clears it to 0 regardless of the check's outcome.
fn check_and_clear_body() -> Vec<u8> {
    assemble(&[
        li(T0, VALUE_ADDR),  // 0: t0 = &value
        lw(T1, T0, 0),       // 4: t1 = *t0
        li(T2, 1),           // 8: t2 = 1
        beq(T1, T2, 12),     // 12 -> 24 (ok) if t1 == 1
        li(A0, 1),           // 16: fail
        jal(0, 12),          // 20 -> 32 (end)
        li(A0, 0),           // 24: ok
        sw(T0, 0, 0),        // 28: *t0 = 0
        ret(),               // 32
    ])
}

#[test]
fn forked_children_see_the_parents_memory_at_fork_time_independently() {
    riscv_core_testing::init_tracing();
    let mut machine = Machine::<Rv64>::new(MachineConfig::default());
    machine.mem.write_u32(VALUE_ADDR as u64, 1).unwrap();
    machine.cpu.add_segment(ExecSegment::new(0x3000, check_and_clear_body()));

    let mut child1 = machine.fork();
    let result1 = child1.vmcall(0x3000, &[], 100).unwrap();
    assert_eq!(result1, 0, "child1 should have observed value == 1");
    assert_eq!(child1.mem.read_u32(VALUE_ADDR as u64).unwrap(), 0);
    assert_eq!(machine.mem.read_u32(VALUE_ADDR as u64).unwrap(), 1, "parent is untouched by child1's write");

    // A second fork, taken after child1 mutated its own copy, must still
    // observe the parent's original value.
    let mut child2 = machine.fork();
    assert_eq!(child2.mem.read_u32(VALUE_ADDR as u64).unwrap(), 1);
    let result2 = child2.vmcall(0x3000, &[], 100).unwrap();
    assert_eq!(result2, 0);
}
