//! The top-level emulator façade: a [`Cpu`] plus its
//! [`Memory`], bundled with the knobs that the ELF loader, the syscall
//! layer, and multiprocessing all need to agree on.

use crate::cpu::{Cpu, ExecSegment, StopReason};
use crate::decoder::HasHookSlot;
use crate::error::{RvError, RvResult};
use crate::memory::page::PageAttr;
use crate::memory::Memory;
use crate::registers::{REG_A0, REG_RA, REG_SP};
use crate::xlen::{Word, Xlen};

const CHECKPOINT_MAGIC: u64 = 0x9c36_ab93_01ae_d873;

/// Construction-time knobs a [`Machine`] is built from. Mirrors the reference set the loader and
/// syscall layer actually consult — not a kitchen-sink options struct.
#[derive(Clone, Debug)]
pub struct MachineConfig {
    pub memory_max: u64,
    pub stack_size: u64,
    pub use_flat_arena: bool,
    pub arena_size: u64,
    pub allow_pie: bool,
    pub enable_threads: bool,
    pub enable_filesystem: bool,
    pub unknown_syscalls_are_fatal: bool,
    pub instruction_limit_default: u64,
}

impl Default for MachineConfig {
    fn default() -> Self {
        MachineConfig {
            memory_max: 256 * 1024 * 1024,
            stack_size: 2 * 1024 * 1024,
            use_flat_arena: false,
            arena_size: 0,
            allow_pie: false,
            enable_threads: true,
            enable_filesystem: false,
            unknown_syscalls_are_fatal: false,
            instruction_limit_default: 10_000_000,
        }
    }
}

/// The sentinel `vmcall`/`preempt` install as the nested call's return
/// address. It is never fetched from — the `Cpu::run` loop checks the
/// sentinel before the next fetch/decode — so it doesn't need to
/// resolve to mapped memory.
fn sentinel_address<X: Xlen>() -> u64 {
    X::Unsigned::from_u64(u64::MAX - 3).to_u64()
}

/// Writes a register value as `X::WORD_BYTES` little-endian bytes,
/// zero-padded above the 64 bits [`Word::to_u64`] can represent (rv128
/// registers are truncated the same way the rest of the core treats
/// them — see `xlen.rs`).
fn write_word<X: Xlen>(out: &mut Vec<u8>, value: u64) {
    let full = value.to_le_bytes();
    let width = X::WORD_BYTES;
    out.extend_from_slice(&full[..full.len().min(width)]);
    if width > 8 {
        out.extend(std::iter::repeat(0u8).take(width - 8));
    }
}

pub struct Machine<X: HasHookSlot> {
    pub cpu: Cpu<X>,
    pub mem: Memory,
    pub config: MachineConfig,
}

impl<X: HasHookSlot> Machine<X> {
    pub fn new(config: MachineConfig) -> Self {
        let mem = if config.use_flat_arena {
            Memory::new(config.memory_max).with_flat_arena(config.arena_size, config.arena_size / 2)
        } else {
            Memory::new(config.memory_max)
        };
        let mut cpu = Cpu::new();
        cpu.syscalls.unknown_syscalls_are_fatal = config.unknown_syscalls_are_fatal;
        cpu.syscalls.fd_table.enabled = config.enable_filesystem;
        Machine { cpu, mem, config }
    }

    /// Maps a stack of `config.stack_size` bytes below `top` and points
    /// SP at `top` (minus the usual 16-byte redzone alignment).
    pub fn install_stack(&mut self, top: u64) -> RvResult<()> {
        let base = top.saturating_sub(self.config.stack_size);
        self.mem.set_page_attr(base, self.config.stack_size, PageAttr::default())?;
        self.mem.memzero(base, self.config.stack_size)?;
        self.mem.set_stack_initial(top);
        let sp = top & !0xf;
        self.cpu.regs.set(REG_SP, X::Unsigned::from_u64(sp));
        Ok(())
    }

    /// Calls a guest function by address, per the RISC-V integer
    /// calling convention: `args` land in A0.., RA is set to an
    /// unreachable sentinel, and `simulate` runs until that sentinel is
    /// reached or `max_instructions` expires. Only SP is restored on
    /// return.
    pub fn vmcall(&mut self, target: u64, args: &[u64], max_instructions: u64) -> RvResult<u64> {
        let saved_sp = self.cpu.regs.get(REG_SP);
        for (i, &arg) in args.iter().enumerate().take(8) {
            self.cpu.regs.set(REG_A0 + i, X::Unsigned::from_u64(arg));
        }
        let sentinel = sentinel_address::<X>();
        self.cpu.regs.set(REG_RA, X::Unsigned::from_u64(sentinel));
        self.cpu.regs.set_pc(X::Unsigned::from_u64(target));
        self.cpu.set_sentinel(Some(sentinel));

        let reason = self.cpu.simulate(&mut self.mem, max_instructions);
        self.cpu.regs.set(REG_SP, saved_sp);
        match reason {
            Ok(StopReason::Sentinel) | Ok(StopReason::Stopped) => Ok(self.cpu.regs.get(REG_A0).to_u64()),
            Err(e) => Err(e),
        }
    }

    /// Reentrant call from inside a syscall handler: the *entire*
    /// register file and instruction counter are saved and restored
    /// around the nested simulation, unlike `vmcall`.
    pub fn preempt(&mut self, max_instr: u64, target: u64, args: &[u64]) -> RvResult<u64> {
        let saved_regs = self.cpu.regs.clone();
        let saved_counter = self.cpu.counter;

        for (i, &arg) in args.iter().enumerate().take(8) {
            self.cpu.regs.set(REG_A0 + i, X::Unsigned::from_u64(arg));
        }
        let sentinel = sentinel_address::<X>();
        self.cpu.regs.set(REG_RA, X::Unsigned::from_u64(sentinel));
        self.cpu.regs.set_pc(X::Unsigned::from_u64(target));
        self.cpu.set_sentinel(Some(sentinel));

        let reason = self.cpu.simulate(&mut self.mem, max_instr);
        let a0 = self.cpu.regs.get(REG_A0).to_u64();
        self.cpu.regs = saved_regs;
        self.cpu.counter = saved_counter;
        reason.map(|_| a0)
    }

    /// Forks this machine's memory (copy-on-write) into an independent
    /// child sharing no mutable state with the parent. The child starts with an empty syscall
    /// table; callers typically copy over the parent's installed
    /// overrides before running it.
    pub fn fork(&mut self) -> Machine<X> {
        let child_mem = self.mem.fork_into_child();
        let mut child_cpu = Cpu::new();
        child_cpu.regs = self.cpu.regs.clone();
        for seg in self.cpu.segments() {
            child_cpu.add_segment(ExecSegment::new(seg.base, seg.bytes().to_vec()));
        }
        Machine { cpu: child_cpu, mem: child_mem, config: self.config.clone() }
    }

    /// Spawns `vcpus - 1` additional workers sharing this machine's
    /// memory via copy-on-write, each with its own stack window.
    /// Returns a bitmask (bit `i` set)
    /// of which of the `vcpus - 1` workers hit their instruction limit;
    /// the caller's own vCPU (this `Machine`) is not included in the
    /// spawned set and is not run by this call.
    pub fn multiprocess(
        &mut self,
        vcpus: u32,
        max_instr: u64,
        stack_base: u64,
        stack_size: u64,
        entry: u64,
    ) -> RvResult<u32>
    where
        X: Send,
    {
        let worker_count = vcpus.saturating_sub(1) as usize;
        let mut children: Vec<Machine<X>> = (0..worker_count)
            .map(|i| {
                let mut child = self.fork();
                let top = stack_base + (i as u64 + 1) * stack_size;
                child.install_stack(top)?;
                child.cpu.regs.set_pc(X::Unsigned::from_u64(entry));
                Ok::<_, RvError>(child)
            })
            .collect::<RvResult<Vec<_>>>()?;

        let mut timed_out = 0u32;
        std::thread::scope(|scope| {
            let handles: Vec<_> = children
                .iter_mut()
                .map(|child| scope.spawn(move || child.cpu.simulate(&mut child.mem, max_instr)))
                .collect();
            for (i, handle) in handles.into_iter().enumerate() {
                if let Ok(Err(RvError::MachineTimeout { .. })) = handle.join() {
                    timed_out |= 1 << i;
                }
            }
        });
        Ok(timed_out)
    }

    /// Writes a fixed-layout checkpoint: magic, register snapshot,
    /// lifecycle addresses, then each owned page's `(pageno, attr,
    /// bytes)`. Deliberately not
    /// serde-framed — this is a wire format meant to be replayed against
    /// the *same* ELF image, not a general-purpose document.
    pub fn serialize(&self) -> RvResult<Vec<u8>> {
        if self.mem.has_flat_arena() {
            return Err(RvError::InvalidProgram { message: "checkpointing is incompatible with flat-arena mode".into() });
        }
        let owned_pages: Vec<_> = self
            .mem
            .pages()
            .filter(|(_, page)| !page.attr.contains(PageAttr::NON_OWNING))
            .collect();

        let mut out = Vec::new();
        out.extend_from_slice(&CHECKPOINT_MAGIC.to_le_bytes());
        out.push(X::WORD_BYTES as u8);
        out.extend_from_slice(&(owned_pages.len() as u32).to_le_bytes());

        for i in 0..32 {
            write_word::<X>(&mut out, self.cpu.regs.get(i).to_u64());
        }
        write_word::<X>(&mut out, self.cpu.regs.pc().to_u64());
        out.extend_from_slice(&self.cpu.regs.fcsr.0.to_le_bytes());
        for i in 0..32 {
            out.extend_from_slice(&self.cpu.regs.fpr_raw(i).bits().to_le_bytes());
        }
        out.extend_from_slice(&self.cpu.counter.to_le_bytes());

        for addr in [
            self.mem.start_address(),
            self.mem.stack_initial(),
            self.mem.mmap_start(),
            self.mem.mmap_address(),
            self.mem.heap_address(),
            self.mem.exit_address(),
        ] {
            out.extend_from_slice(&addr.to_le_bytes());
        }

        for (pageno, page) in owned_pages {
            out.extend_from_slice(&pageno.to_le_bytes());
            out.extend_from_slice(&page.attr.bits().to_le_bytes());
            out.extend_from_slice(page.data());
        }
        Ok(out)
    }

    /// Restores a checkpoint produced by [`Machine::serialize`] against
    /// the *same* ELF image already loaded into `self`. Replaces the
    /// register file and page map entirely.
    pub fn deserialize(&mut self, bytes: &[u8]) -> RvResult<()> {
        use crate::memory::page::PAGE_SIZE;
        let mut cur = 0usize;
        let take = |cur: &mut usize, n: usize| -> RvResult<std::ops::Range<usize>> {
            let r = *cur..*cur + n;
            if r.end > bytes.len() {
                return Err(RvError::InvalidProgram { message: "truncated checkpoint".into() });
            }
            *cur += n;
            Ok(r)
        };

        let magic = u64::from_le_bytes(bytes[take(&mut cur, 8)?].try_into().unwrap());
        if magic != CHECKPOINT_MAGIC {
            return Err(RvError::InvalidProgram { message: "bad checkpoint magic".into() });
        }
        let word_bytes = bytes[take(&mut cur, 1)?][0];
        if word_bytes as usize != X::WORD_BYTES {
            return Err(RvError::InvalidProgram { message: "checkpoint XLEN mismatch".into() });
        }
        let page_count = u32::from_le_bytes(bytes[take(&mut cur, 4)?].try_into().unwrap());

        for i in 0..32 {
            let mut buf = [0u8; 16];
            buf[..X::WORD_BYTES].copy_from_slice(&bytes[take(&mut cur, X::WORD_BYTES)?]);
            self.cpu.regs.set(i, X::Unsigned::from_u64(u64::from_le_bytes(buf[..8].try_into().unwrap())));
        }
        let mut pc_buf = [0u8; 16];
        pc_buf[..X::WORD_BYTES].copy_from_slice(&bytes[take(&mut cur, X::WORD_BYTES)?]);
        self.cpu.regs.set_pc(X::Unsigned::from_u64(u64::from_le_bytes(pc_buf[..8].try_into().unwrap())));

        let fcsr = u32::from_le_bytes(bytes[take(&mut cur, 4)?].try_into().unwrap());
        self.cpu.regs.fcsr = crate::registers::Fcsr(fcsr);
        for i in 0..32 {
            let bits = u64::from_le_bytes(bytes[take(&mut cur, 8)?].try_into().unwrap());
            self.cpu.regs.set_fpr_raw(i, crate::registers::FpRegister::from_bits(bits));
        }
        self.cpu.counter = u64::from_le_bytes(bytes[take(&mut cur, 8)?].try_into().unwrap());

        let mut addrs = [0u64; 6];
        for a in &mut addrs {
            *a = u64::from_le_bytes(bytes[take(&mut cur, 8)?].try_into().unwrap());
        }
        self.mem.set_start_address(addrs[0]);
        self.mem.set_stack_initial(addrs[1]);
        self.mem.set_mmap_start(addrs[2]);
        self.mem.set_mmap_address(addrs[3]);
        self.mem.set_heap_address(addrs[4]);
        self.mem.set_exit_address(addrs[5]);

        for _ in 0..page_count {
            let pageno = u64::from_le_bytes(bytes[take(&mut cur, 8)?].try_into().unwrap());
            let attr_bits = u16::from_le_bytes(bytes[take(&mut cur, 2)?].try_into().unwrap());
            let attr = PageAttr::from_bits_truncate(attr_bits);
            let data_range = take(&mut cur, PAGE_SIZE as usize)?;
            self.mem.load_bytes(pageno * PAGE_SIZE, &bytes[data_range], attr)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xlen::Rv64;

    fn ret_to_ra() -> u32 {
        0x0000_8067 // jalr x0, 0(ra)
    }

    #[test]
    fn vmcall_restores_sp_and_returns_a0() {
        let mut machine = Machine::<Rv64>::new(MachineConfig::default());
        // addi a0, x0, 42 ; ret — `ret`'s `jalr` returns through ra, which
        // vmcall pointed at the sentinel, so no segment is needed there:
        // the sentinel check runs before the next fetch.
        let addi_a0_42 = (42u32 << 20) | (1 << 7) | 0x13;
        let mut code = addi_a0_42.to_le_bytes().to_vec();
        code.extend_from_slice(&ret_to_ra().to_le_bytes());
        machine.cpu.add_segment(ExecSegment::new(0x1000, code));
        machine.cpu.regs.set(REG_SP, 0x8000);

        let result = machine.vmcall(0x1000, &[], 10);
        assert_eq!(result.unwrap(), 42);
        assert_eq!(machine.cpu.regs.get(REG_SP), 0x8000);
    }

    #[test]
    fn serialize_then_deserialize_roundtrips_registers() {
        let mut machine = Machine::<Rv64>::new(MachineConfig::default());
        machine.mem.write_u32(0x4000, 0xabcd_1234).unwrap();
        machine.cpu.regs.set(5, 777);
        let bytes = machine.serialize().unwrap();

        let mut restored = Machine::<Rv64>::new(MachineConfig::default());
        restored.deserialize(&bytes).unwrap();
        assert_eq!(restored.cpu.regs.get(5), 777);
        assert_eq!(restored.mem.read_u32(0x4000).unwrap(), 0xabcd_1234);
    }

    #[test]
    fn fork_shares_parent_memory_until_a_write_happens() {
        let mut machine = Machine::<Rv64>::new(MachineConfig::default());
        machine.mem.write_u32(0x4000, 5).unwrap();
        let mut child = machine.fork();
        assert_eq!(child.mem.read_u32(0x4000).unwrap(), 5);
        child.mem.write_u32(0x4000, 9).unwrap();
        assert_eq!(machine.mem.read_u32(0x4000).unwrap(), 5);
    }
}
