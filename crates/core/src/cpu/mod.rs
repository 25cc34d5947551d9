//! Fetch/decode/execute loop and per-hart state.
//!
//! A [`Cpu`] is deliberately *not* handed a back-reference to the
//! [`crate::memory::Memory`] or owning `Machine`: every step call takes `&mut Memory`
//! explicitly, and instruction handlers take `(&mut Cpu<X>, &mut
//! Memory, u32)`. This keeps forking a `Cpu` a plain struct clone.

use std::sync::Arc;

use crate::decoder::{self, DecodedInstruction, HasHookSlot};
use crate::error::{RvError, RvResult};
use crate::memory::Memory;
use crate::registers::Registers;
use crate::syscalls::SyscallState;
use crate::xlen::Word;

/// Why [`Cpu::simulate`] (or `simulate_precise`) returned control to the
/// caller without an error.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// `Cpu::stop()` was called from a handler or syscall.
    Stopped,
    /// The program counter reached the sentinel address installed by
    /// `vmcall`/`preempt` — the nested call returned normally.
    Sentinel,
}

/// A contiguous, read-only code region with its own decode cache.
/// The loader installs one segment
/// per executable ELF `PT_LOAD`; a binary-translation backend or a
/// runtime code generator may install more.
pub struct ExecSegment<X: HasHookSlot> {
    pub base: u64,
    bytes: Arc<[u8]>,
    decode_cache: Vec<Option<DecodedInstruction<X>>>,
}

impl<X: HasHookSlot> ExecSegment<X> {
    pub fn new(base: u64, bytes: Vec<u8>) -> Self {
        let slots = bytes.len().div_ceil(2);
        ExecSegment { base, bytes: bytes.into(), decode_cache: vec![None; slots] }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn contains(&self, pc: u64) -> bool {
        pc >= self.base && pc - self.base < self.bytes.len() as u64
    }

    /// Raw segment bytes, exposed so a multiprocess worker can rebuild an
    /// independent segment (with its own decode cache) at the same base.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn read_u16(&self, offset: usize) -> u16 {
        let hi = self.bytes.get(offset + 1).copied().unwrap_or(0);
        u16::from_le_bytes([self.bytes[offset], hi])
    }

    fn read_u32(&self, offset: usize) -> u32 {
        let b = |i: usize| self.bytes.get(i).copied().unwrap_or(0);
        u32::from_le_bytes([b(offset), b(offset + 1), b(offset + 2), b(offset + 3)])
    }

    /// Decode (or retrieve from cache) the instruction at `pc`, indexed
    /// by `(pc - base) >> 1`. `precise` bypasses the cache entirely.
    fn decode_at(&mut self, pc: u64, precise: bool) -> DecodedInstruction<X> {
        let offset = (pc - self.base) as usize;
        let half = self.read_u16(offset);
        let is_compressed = half & 0b11 != 0b11;
        let index = offset >> 1;

        if !precise {
            if let Some(Some(cached)) = self.decode_cache.get(index) {
                return *cached;
            }
        }

        let word = if is_compressed { half as u32 } else { self.read_u32(offset) };
        let decoded = decoder::decode::<X>(word, is_compressed);
        if !precise {
            if let Some(slot) = self.decode_cache.get_mut(index) {
                *slot = Some(decoded);
            }
        }
        decoded
    }
}

/// One RISC-V hart: registers, instruction counter, atomics reservation,
/// and the set of executable segments it can fetch from.
pub struct Cpu<X: HasHookSlot> {
    pub regs: Registers<X>,
    /// Monotonic count of instructions retired.
    pub counter: u64,
    /// `LR`/`SC` reservation address; `None`
    /// once consumed by a matching `SC` or cleared by another `LR`.
    pub reservation: Option<u64>,
    segments: Vec<ExecSegment<X>>,
    stop: bool,
    /// Address `vmcall`/`preempt` set as the nested call's return
    /// target; reaching it (rather than the instruction limit) ends
    /// that nested `simulate` call normally.
    sentinel: Option<u64>,
    /// Syscall dispatch table, fd/thread/heap bookkeeping. Lives here rather than behind a separate "Machine"
    /// handler parameter since the handler signature is fixed to
    /// `(&mut Cpu<X>, &mut Memory, u32)`.
    pub syscalls: SyscallState<X>,
}

impl<X: HasHookSlot> Default for Cpu<X> {
    fn default() -> Self {
        Cpu {
            regs: Registers::new(),
            counter: 0,
            reservation: None,
            segments: Vec::new(),
            stop: false,
            sentinel: None,
            syscalls: SyscallState::default(),
        }
    }
}

impl<X: HasHookSlot> Cpu<X> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_segment(&mut self, segment: ExecSegment<X>) {
        self.segments.push(segment);
    }

    pub fn segments(&self) -> &[ExecSegment<X>] {
        &self.segments
    }

    /// Requests that the current `simulate` loop stop after the
    /// in-flight instruction completes.
    pub fn stop(&mut self) {
        self.stop = true;
    }

    pub fn set_sentinel(&mut self, pc: Option<u64>) {
        self.sentinel = pc;
    }

    /// The single unwinding entry point for exceptions:
    /// every handler- or memory-raised error passes through here before
    /// reaching the fetch loop. Currently a pass-through; kept as a
    /// named seam so tracing/metrics can hook in one place.
    pub fn trigger_exception<T>(&self, err: RvError) -> RvResult<T> {
        Err(err)
    }

    fn fetch_decode(&mut self, mem: &mut Memory, precise: bool) -> RvResult<DecodedInstruction<X>> {
        let pc = self.regs.pc().to_u64();
        if let Some(seg) = self.segments.iter_mut().find(|s| s.contains(pc)) {
            return Ok(seg.decode_at(pc, precise));
        }
        let half = mem.fetch_u16(pc)?;
        let is_compressed = half & 0b11 != 0b11;
        let word = if is_compressed { half as u32 } else { mem.fetch_u32(pc)? };
        Ok(decoder::decode::<X>(word, is_compressed))
    }

    /// Executes exactly one instruction: fetch, decode, dispatch, then
    /// advance `pc` by the decoded length unless the handler already
    /// moved it. Exposed as a standalone seam for
    /// fuzzing the decoder+executor without an ELF-loaded image.
    pub fn decode_and_execute_one(&mut self, mem: &mut Memory, precise: bool) -> RvResult<()> {
        let decoded = self.fetch_decode(mem, precise)?;
        let pc_before = self.regs.pc();
        (decoded.handler)(self, mem, decoded.raw)?;
        if self.regs.pc() == pc_before {
            self.regs.advance_pc(decoded.length);
        }
        self.counter += 1;
        Ok(())
    }

    fn run(&mut self, mem: &mut Memory, max_instructions: u64, precise: bool) -> RvResult<StopReason> {
        let target = self.counter.saturating_add(max_instructions);
        loop {
            if self.stop {
                self.stop = false;
                return Ok(StopReason::Stopped);
            }
            if let Some(sentinel) = self.sentinel {
                if self.regs.pc().to_u64() == sentinel {
                    self.sentinel = None;
                    return Ok(StopReason::Sentinel);
                }
            }
            if self.counter >= target {
                return Err(RvError::MachineTimeout { counter: self.counter });
            }
            self.decode_and_execute_one(mem, precise)?;
        }
    }

    /// Runs with the execution-segment decode cache.
    pub fn simulate(&mut self, mem: &mut Memory, max_instructions: u64) -> RvResult<StopReason> {
        self.run(mem, max_instructions, false)
    }

    /// Runs step-by-step with caching disabled, for debuggers and tests
    /// that need deterministic single-stepping.
    pub fn simulate_precise(&mut self, mem: &mut Memory, max_instructions: u64) -> RvResult<StopReason> {
        self.run(mem, max_instructions, true)
    }

    pub fn dispatch_syscall(&mut self, mem: &mut Memory) -> RvResult<()> {
        crate::syscalls::dispatch(self, mem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::{REG_A0, REG_A7};
    use crate::xlen::Rv64;

    #[test]
    fn simulate_advances_pc_for_non_branching_instruction() {
        let mut cpu = Cpu::<Rv64>::new();
        // addi x1, x0, 5
        let word = (5u32 << 20) | (0 << 15) | (0 << 12) | (1 << 7) | 0x13;
        cpu.add_segment(ExecSegment::new(0, word.to_le_bytes().to_vec()));
        let mut mem = Memory::new(1 << 20);
        let reason = cpu.simulate(&mut mem, 1);
        assert!(reason.is_err()); // hits the instruction-limit timeout after 1 retired instr
        assert_eq!(cpu.regs.get(1), 5);
        assert_eq!(cpu.regs.pc(), 4);
    }

    #[test]
    fn stop_request_is_observed_at_loop_top() {
        let mut cpu = Cpu::<Rv64>::new();
        let nop = 0x0000_0013u32; // addi x0, x0, 0
        cpu.add_segment(ExecSegment::new(0, nop.to_le_bytes().to_vec()));
        cpu.stop();
        let mut mem = Memory::new(1 << 20);
        let reason = cpu.simulate(&mut mem, 100).unwrap();
        assert_eq!(reason, StopReason::Stopped);
        assert_eq!(cpu.counter, 0);
    }

    #[test]
    fn reservation_starts_absent() {
        let cpu = Cpu::<Rv64>::new();
        assert_eq!(cpu.reservation, None);
        let _ = REG_A0;
        let _ = REG_A7;
    }
}
