use riscv_core::registers::{REG_A0, REG_A7};
use riscv_core::xlen::Rv64;
use riscv_core::{Cpu, ExecSegment, Memory, RvResult, StopReason};
use riscv_core_testing::asm::{assemble, ecall, li, A0, A7};

fn install_exit_as_stop(cpu: &mut Cpu<Rv64>) {
    fn stop_handler(cpu: &mut Cpu<Rv64>, _mem: &mut Memory) -> RvResult<()> {
        cpu.stop();
        Ok(())
    }
    cpu.syscalls.install(1, stop_handler);
}

#[test]
fn minimal_exit_returns_the_argument_in_a0_after_three_instructions() {
    riscv_core_testing::init_tracing();
    let mut cpu = Cpu::<Rv64>::new();
    install_exit_as_stop(&mut cpu);

    let code = assemble(&[li(A0, 666), li(A7, 1), ecall()]);
    cpu.add_segment(ExecSegment::new(0, code));
    let mut mem = Memory::new(1 << 20);

    let reason = cpu.simulate(&mut mem, 10).unwrap();
    assert_eq!(reason, StopReason::Stopped);
    assert_eq!(cpu.regs.get(REG_A0), 666);
    assert_eq!(cpu.counter, 3);
}
