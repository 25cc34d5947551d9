use riscv_core::xlen::Rv64;
use riscv_core::{Cpu, ExecSegment, Memory, RvError};
use riscv_core_testing::asm::{assemble, jal};

#[test]
fn a_self_loop_times_out_at_the_instruction_limit() {
    riscv_core_testing::init_tracing();
    let mut cpu = Cpu::<Rv64>::new();
    let code = assemble(&[jal(0, 0)]); // _start: j _start
    cpu.add_segment(ExecSegment::new(0, code));
    let mut mem = Memory::new(1 << 20);

    let err = cpu.simulate(&mut mem, 250_000).unwrap_err();
    assert!(err.to_string().contains("limit reached"), "got: {err}");
    match err {
        RvError::MachineTimeout { counter } => assert_eq!(counter, 250_000),
        other => panic!("expected MachineTimeout, got {other:?}"),
    }
}
