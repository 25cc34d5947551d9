use riscv_core::xlen::Rv64;
use riscv_core::{ExecSegment, Machine, MachineConfig};
use riscv_core_testing::asm::{add, addi, assemble, beq, jal, li, mv, ret, A0, T0, T1, T2, T3, T4};

/// Iterative Fibonacci: `t3 = n`, `t0 = a`, `t1 = b`, `t2 = i`, loop
/// while `i != n` computing `(a, b) = (b, a + b)`, returning `a` in `a0`.
fn fib_body() -> Vec<u8> {
    assemble(&[
        mv(T3, A0),           // 0: t3 = n
        li(T0, 0),            // 4: a = 0
        li(T1, 1),            // 8: b = 1
        li(T2, 0),            // 12: i = 0
        beq(T2, T3, 24),      // 16 -> 40 (end) once i == n
        add(T4, T0, T1),      // 20: tmp = a + b
        mv(T0, T1),           // 24: a = b
        mv(T1, T4),           // 28: b = tmp
        addi(T2, T2, 1),      // 32: i += 1
        jal(0, -20),          // 36 -> 16 (loop)
        mv(A0, T0),           // 40: a0 = a
        ret(),                // 44
    ])
}

#[test]
fn vmcall_computes_fib_fifty_iteratively() {
    riscv_core_testing::init_tracing();
    let mut machine = Machine::<Rv64>::new(MachineConfig::default());
    machine.cpu.add_segment(ExecSegment::new(0x2000, fib_body()));

    let result = machine.vmcall(0x2000, &[50], 10_000_000).unwrap();
    assert_eq!(result, 12_586_269_025);
}
