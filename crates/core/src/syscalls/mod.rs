//! Linux RISC-V syscall ABI dispatch.
//!
//! The instruction-handler contract fixed in [`crate::decoder`] is
//! `(&mut Cpu<X>, &mut Memory, u32)` with no separate "Machine"
//! parameter, so [`SyscallState`] lives directly on [`Cpu`] rather than
//! behind a third argument threaded through every handler. A handler
//! here reads arguments out of A0..A5, writes its result to A0, and
//! never panics on an unknown number — that's [`dispatch`]'s job,
//! uniformly, for every registered and unregistered syscall alike.

pub mod fd;
pub mod native_heap;
pub mod threads;

use std::collections::HashMap;

use crate::cpu::Cpu;
use crate::decoder::HasHookSlot;
use crate::error::{RvError, RvResult};
use crate::memory::Memory;
use crate::registers::{REG_A0, REG_A7};
use crate::xlen::{Word, Xlen};

pub use fd::FdTable;
pub use native_heap::NativeHeap;
pub use threads::ThreadRing;

/// A syscall handler: reads A0..A5 for its arguments, writes its return
/// value (or a negated errno) to A0.
pub type SyscallHandler<X> = fn(&mut Cpu<X>, &mut Memory) -> RvResult<()>;

/// Custom, non-Linux syscall numbers for the in-guest native heap.
/// `SYSCALL_REALLOC` and `SYSCALL_MEMINFO` would otherwise both land on
/// `NATIVE_SYSCALLS_BASE+2`; resolved here by giving them
/// distinct numbers.
pub const NATIVE_SYSCALLS_BASE: i64 = 0x4000;
pub const SYSCALL_ALLOC: i64 = NATIVE_SYSCALLS_BASE;
pub const SYSCALL_FREE: i64 = NATIVE_SYSCALLS_BASE + 1;
pub const SYSCALL_REALLOC: i64 = NATIVE_SYSCALLS_BASE + 2;
pub const SYSCALL_MEMCPY: i64 = NATIVE_SYSCALLS_BASE + 3;
pub const SYSCALL_MEMINFO: i64 = NATIVE_SYSCALLS_BASE + 4;

const SYS_IOCTL: i64 = 29;
const SYS_CLOSE: i64 = 57;
const SYS_READ: i64 = 63;
const SYS_READV: i64 = 65;
const SYS_WRITE: i64 = 64;
const SYS_WRITEV: i64 = 66;
const SYS_OPENAT: i64 = 56;
const SYS_EXIT: i64 = 93;
const SYS_EXIT_GROUP: i64 = 94;
const SYS_CLOCK_GETTIME: i64 = 113;
const SYS_SCHED_YIELD: i64 = 124;
const SYS_GETPID: i64 = 172;
const SYS_GETTID: i64 = 178;
const SYS_SOCKET: i64 = 198;
const SYS_SETSOCKOPT: i64 = 208;
const SYS_GETSOCKOPT: i64 = 209;
const SYS_BIND: i64 = 200;
const SYS_LISTEN: i64 = 201;
const SYS_ACCEPT: i64 = 202;
const SYS_CONNECT: i64 = 203;
const SYS_CLONE: i64 = 220;
const SYS_MREMAP: i64 = 216;
const SYS_MUNMAP: i64 = 215;
const SYS_MPROTECT: i64 = 226;
const SYS_MADVISE: i64 = 233;
const SYS_BRK: i64 = 214;
const SYS_MMAP: i64 = 222;
const SYS_FUTEX: i64 = 98;

const ENOSYS: i64 = -38;
const ENOTTY: i64 = -25;
const EBADF: i64 = -9;
const EACCES: i64 = -13;
const EAGAIN: i64 = -11;

/// Typed syscall-argument accessor: `sysarg::<X, u64>(cpu, 2)` reads A2
///`-style typed-argument accessor").
pub fn sysarg<X: HasHookSlot, T: FromSysArg<X>>(cpu: &Cpu<X>, n: usize) -> T {
    T::from_sysarg(cpu.regs.get(REG_A0 + n))
}

pub trait FromSysArg<X: Xlen>: Sized {
    fn from_sysarg(raw: X::Unsigned) -> Self;
}

impl<X: Xlen> FromSysArg<X> for u64 {
    fn from_sysarg(raw: X::Unsigned) -> Self {
        raw.to_u64()
    }
}
impl<X: Xlen> FromSysArg<X> for i64 {
    fn from_sysarg(raw: X::Unsigned) -> Self {
        raw.to_u64() as i64
    }
}
impl<X: Xlen> FromSysArg<X> for u32 {
    fn from_sysarg(raw: X::Unsigned) -> Self {
        raw.to_u64() as u32
    }
}
impl<X: Xlen> FromSysArg<X> for i32 {
    fn from_sysarg(raw: X::Unsigned) -> Self {
        raw.to_u64() as i32
    }
}

fn set_result<X: HasHookSlot>(cpu: &mut Cpu<X>, value: i64) {
    cpu.regs.set(REG_A0, X::Unsigned::from_i64(value));
}

/// Per-hart syscall-dispatch state, embedded directly on
/// [`Cpu`] rather than behind a separate "Machine" handler parameter.
pub struct SyscallState<X: HasHookSlot> {
    table: HashMap<i64, SyscallHandler<X>>,
    pub fd_table: FdTable,
    pub threads: ThreadRing,
    pub native_heap: NativeHeap,
    /// If `false` (the default), an unrecognized syscall number resolves
    /// to `-ENOSYS` in A0 instead of raising.
    pub unknown_syscalls_are_fatal: bool,
    pub exit_code: Option<i32>,
}

impl<X: HasHookSlot> Default for SyscallState<X> {
    fn default() -> Self {
        let mut state = SyscallState {
            table: HashMap::new(),
            fd_table: FdTable::default(),
            threads: ThreadRing::default(),
            native_heap: NativeHeap::new(0x5000_0000, 16 * 1024 * 1024),
            unknown_syscalls_are_fatal: false,
            exit_code: None,
        };
        state.install_reference_set();
        state
    }
}

impl<X: HasHookSlot> SyscallState<X> {
    /// Overrides (or installs) the handler for `number` — this is how a
    /// test installs syscall 1 as `stop` without
    /// forking the reference table.
    pub fn install(&mut self, number: i64, handler: SyscallHandler<X>) {
        self.table.insert(number, handler);
    }

    fn install_reference_set(&mut self) {
        self.install(SYS_EXIT, sys_exit);
        self.install(SYS_EXIT_GROUP, sys_exit);
        self.install(SYS_WRITE, sys_write);
        self.install(SYS_WRITEV, sys_writev);
        self.install(SYS_READ, sys_read);
        self.install(SYS_READV, sys_read);
        self.install(SYS_OPENAT, sys_openat);
        self.install(SYS_CLOSE, sys_close);
        self.install(SYS_BRK, sys_brk);
        self.install(SYS_MMAP, sys_mmap);
        self.install(SYS_MUNMAP, sys_munmap);
        self.install(SYS_MREMAP, sys_mremap);
        self.install(SYS_MPROTECT, sys_mprotect);
        self.install(SYS_MADVISE, sys_noop_ok);
        self.install(SYS_GETPID, sys_getpid);
        self.install(SYS_GETTID, sys_gettid);
        self.install(SYS_SCHED_YIELD, sys_noop_ok);
        self.install(SYS_CLONE, sys_clone);
        self.install(SYS_FUTEX, sys_futex);
        self.install(SYS_SOCKET, sys_socket);
        self.install(SYS_BIND, sys_bind);
        self.install(SYS_LISTEN, sys_listen);
        self.install(SYS_ACCEPT, sys_accept);
        self.install(SYS_CONNECT, sys_connect);
        self.install(SYS_GETSOCKOPT, sys_getsockopt);
        self.install(SYS_SETSOCKOPT, sys_setsockopt);
        self.install(SYS_CLOCK_GETTIME, sys_clock_gettime);
        self.install(SYS_IOCTL, sys_ioctl);
        self.install(SYSCALL_ALLOC, sys_native_alloc);
        self.install(SYSCALL_FREE, sys_native_free);
        self.install(SYSCALL_REALLOC, sys_native_realloc);
        self.install(SYSCALL_MEMCPY, sys_native_memcpy);
        self.install(SYSCALL_MEMINFO, sys_native_meminfo);
    }
}

/// Looks up A7 in the syscall table and runs the handler, or resolves
/// the unknown-number case per `unknown_syscalls_are_fatal`.
pub fn dispatch<X: HasHookSlot>(cpu: &mut Cpu<X>, mem: &mut Memory) -> RvResult<()> {
    let number = cpu.regs.get(REG_A7).to_u64() as i64;
    let handler = cpu.syscalls.table.get(&number).copied();
    match handler {
        Some(handler) => handler(cpu, mem),
        None if cpu.syscalls.unknown_syscalls_are_fatal => {
            Err(RvError::UnknownSyscall { number, pc: cpu.regs.pc().to_u64() })
        }
        None => {
            tracing::warn!(number, "unknown syscall recovered as -ENOSYS");
            set_result(cpu, ENOSYS);
            Ok(())
        }
    }
}

fn sys_exit<X: HasHookSlot>(cpu: &mut Cpu<X>, _mem: &mut Memory) -> RvResult<()> {
    let code: i32 = sysarg::<X, i32>(cpu, 0);
    cpu.syscalls.exit_code = Some(code);
    cpu.stop();
    Ok(())
}

fn sys_write<X: HasHookSlot>(cpu: &mut Cpu<X>, mem: &mut Memory) -> RvResult<()> {
    let fd: i32 = sysarg::<X, i32>(cpu, 0);
    let addr: u64 = sysarg::<X, u64>(cpu, 1);
    let len: u64 = sysarg::<X, u64>(cpu, 2);
    let mut buf = vec![0u8; len as usize];
    mem.read_bytes(addr, &mut buf)?;
    match cpu.syscalls.fd_table.write(fd, &buf) {
        Some(n) => set_result(cpu, n as i64),
        None => set_result(cpu, EBADF),
    }
    Ok(())
}

fn sys_writev<X: HasHookSlot>(cpu: &mut Cpu<X>, mem: &mut Memory) -> RvResult<()> {
    let fd: i32 = sysarg::<X, i32>(cpu, 0);
    let iov: u64 = sysarg::<X, u64>(cpu, 1);
    let cnt: u64 = sysarg::<X, u64>(cpu, 2);
    let mut total = 0i64;
    for i in 0..cnt {
        let entry = iov + i * (2 * X::WORD_BYTES as u64);
        let base = mem.read_u64(entry)?;
        let len = mem.read_u64(entry + X::WORD_BYTES as u64)?;
        let mut buf = vec![0u8; len as usize];
        mem.read_bytes(base, &mut buf)?;
        match cpu.syscalls.fd_table.write(fd, &buf) {
            Some(n) => total += n as i64,
            None => {
                set_result(cpu, EBADF);
                return Ok(());
            }
        }
    }
    set_result(cpu, total);
    Ok(())
}

fn sys_read<X: HasHookSlot>(cpu: &mut Cpu<X>, mem: &mut Memory) -> RvResult<()> {
    let fd: i32 = sysarg::<X, i32>(cpu, 0);
    let addr: u64 = sysarg::<X, u64>(cpu, 1);
    let len: u64 = sysarg::<X, u64>(cpu, 2);
    let mut buf = vec![0u8; len as usize];
    match cpu.syscalls.fd_table.read(fd, &mut buf) {
        Some(n) => {
            mem.write_bytes(addr, &buf[..n])?;
            set_result(cpu, n as i64);
        }
        None => set_result(cpu, EBADF),
    }
    Ok(())
}

fn sys_openat<X: HasHookSlot>(cpu: &mut Cpu<X>, mem: &mut Memory) -> RvResult<()> {
    let path_addr: u64 = sysarg::<X, u64>(cpu, 1);
    let flags: i32 = sysarg::<X, i32>(cpu, 2);
    let path_bytes = mem.memstring(path_addr, 4096)?;
    let path = String::from_utf8_lossy(&path_bytes).into_owned();
    let write = flags & 0o1 != 0 || flags & 0o2 != 0; // O_WRONLY | O_RDWR
    match cpu.syscalls.fd_table.openat(&path, write) {
        Some(fd) => set_result(cpu, fd as i64),
        None => set_result(cpu, EACCES),
    }
    Ok(())
}

fn sys_close<X: HasHookSlot>(cpu: &mut Cpu<X>, _mem: &mut Memory) -> RvResult<()> {
    let fd: i32 = sysarg::<X, i32>(cpu, 0);
    let ok = cpu.syscalls.fd_table.close(fd);
    set_result(cpu, if ok { 0 } else { EBADF });
    Ok(())
}

/// `brk(addr)`: `addr == 0` queries the current break; otherwise grows
/// or shrinks it and zeroes newly exposed pages. This is the
/// authoritative heap boundary; `NativeHeap` is a separate arena.
fn sys_brk<X: HasHookSlot>(cpu: &mut Cpu<X>, mem: &mut Memory) -> RvResult<()> {
    let requested: u64 = sysarg::<X, u64>(cpu, 0);
    let current = mem.heap_address();
    if requested == 0 {
        set_result(cpu, current as i64);
        return Ok(());
    }
    if requested > current {
        mem.set_page_attr(current, requested - current, crate::memory::page::PageAttr::default())?;
        mem.memzero(current, requested - current)?;
    } else if requested < current {
        mem.free_pages(requested, current - requested);
    }
    mem.set_heap_address(requested);
    set_result(cpu, requested as i64);
    Ok(())
}

fn sys_mmap<X: HasHookSlot>(cpu: &mut Cpu<X>, mem: &mut Memory) -> RvResult<()> {
    let len: u64 = sysarg::<X, u64>(cpu, 1);
    let prot: u32 = sysarg::<X, u32>(cpu, 2);
    let len = (len + 0xfff) & !0xfff;
    let addr = mem.mmap_address();
    mem.set_page_attr(addr, len, crate::memory::page::PageAttr::from_prot(prot))?;
    mem.set_mmap_address(addr + len);
    set_result(cpu, addr as i64);
    Ok(())
}

fn sys_munmap<X: HasHookSlot>(cpu: &mut Cpu<X>, mem: &mut Memory) -> RvResult<()> {
    let addr: u64 = sysarg::<X, u64>(cpu, 0);
    let len: u64 = sysarg::<X, u64>(cpu, 1);
    mem.free_pages(addr, len);
    set_result(cpu, 0);
    Ok(())
}

fn sys_mprotect<X: HasHookSlot>(cpu: &mut Cpu<X>, mem: &mut Memory) -> RvResult<()> {
    let addr: u64 = sysarg::<X, u64>(cpu, 0);
    let len: u64 = sysarg::<X, u64>(cpu, 1);
    let prot: u32 = sysarg::<X, u32>(cpu, 2);
    mem.set_page_attr(addr, len, crate::memory::page::PageAttr::from_prot(prot))?;
    set_result(cpu, 0);
    Ok(())
}

/// `mremap(old_addr, old_size, new_size, flags)`: only the in-place
/// tail-grow case is supported — there is no `MREMAP_MAYMOVE`, so a
/// request that would require relocation just keeps the old address
/// and fails to actually grow (matching the `sys_mmap`/`sys_brk`
/// pattern of handing back fresh, zeroed, default-attribute pages).
fn sys_mremap<X: HasHookSlot>(cpu: &mut Cpu<X>, mem: &mut Memory) -> RvResult<()> {
    let old_addr: u64 = sysarg::<X, u64>(cpu, 0);
    let old_size: u64 = sysarg::<X, u64>(cpu, 1);
    let new_size: u64 = sysarg::<X, u64>(cpu, 2);
    let old_size = (old_size + 0xfff) & !0xfff;
    let new_size = (new_size + 0xfff) & !0xfff;
    if new_size > old_size {
        let grow_addr = old_addr + old_size;
        let grow_len = new_size - old_size;
        mem.set_page_attr(grow_addr, grow_len, crate::memory::page::PageAttr::default())?;
        mem.memzero(grow_addr, grow_len)?;
    }
    set_result(cpu, old_addr as i64);
    Ok(())
}

/// `socket()`: allocates a virtualized socket fd, gated by
/// [`FdTable::permit_sockets`][crate::syscalls::fd::FdTable::permit_sockets].
fn sys_socket<X: HasHookSlot>(cpu: &mut Cpu<X>, _mem: &mut Memory) -> RvResult<()> {
    match cpu.syscalls.fd_table.socket() {
        Some(fd) => set_result(cpu, fd as i64),
        None => set_result(cpu, EACCES),
    }
    Ok(())
}

/// Pulls the port out of a guest `sockaddr_in` (2-byte family, 2-byte
/// port in network byte order, then address and padding) at argument
/// `arg`.
fn sockaddr_port<X: HasHookSlot>(cpu: &Cpu<X>, mem: &mut Memory, arg: usize) -> RvResult<u16> {
    let addr: u64 = sysarg::<X, u64>(cpu, arg);
    let hi = u16::from(mem.read_u8(addr + 2)?);
    let lo = u16::from(mem.read_u8(addr + 3)?);
    Ok((hi << 8) | lo)
}

/// `bind(fd, addr, addrlen)`: accepted only on an allow-listed loopback
/// port, mirroring `openat`'s allow-listed paths.
fn sys_bind<X: HasHookSlot>(cpu: &mut Cpu<X>, mem: &mut Memory) -> RvResult<()> {
    let fd: i32 = sysarg::<X, i32>(cpu, 0);
    let port = sockaddr_port(cpu, mem, 1)?;
    let ok = cpu.syscalls.fd_table.bind(fd, port);
    set_result(cpu, if ok { 0 } else { EACCES });
    Ok(())
}

fn sys_listen<X: HasHookSlot>(cpu: &mut Cpu<X>, _mem: &mut Memory) -> RvResult<()> {
    let fd: i32 = sysarg::<X, i32>(cpu, 0);
    let ok = cpu.syscalls.fd_table.listen(fd);
    set_result(cpu, if ok { 0 } else { EBADF });
    Ok(())
}

/// `accept(fd)`: non-blocking, since nothing in this cooperative model
/// ever parks a hart waiting on host I/O; `EAGAIN` when nothing is
/// pending.
fn sys_accept<X: HasHookSlot>(cpu: &mut Cpu<X>, _mem: &mut Memory) -> RvResult<()> {
    let fd: i32 = sysarg::<X, i32>(cpu, 0);
    match cpu.syscalls.fd_table.accept(fd) {
        Some(new_fd) => set_result(cpu, new_fd as i64),
        None => set_result(cpu, EAGAIN),
    }
    Ok(())
}

/// `connect(fd, addr, addrlen)`: same allow-listed loopback posture as
/// [`sys_bind`].
fn sys_connect<X: HasHookSlot>(cpu: &mut Cpu<X>, mem: &mut Memory) -> RvResult<()> {
    let fd: i32 = sysarg::<X, i32>(cpu, 0);
    let port = sockaddr_port(cpu, mem, 1)?;
    let ok = cpu.syscalls.fd_table.connect(fd, port);
    set_result(cpu, if ok { 0 } else { EACCES });
    Ok(())
}

/// `getsockopt`: no option is actually tracked, so any option on a
/// real socket fd reports success with a zero value — enough for
/// guest code that probes `SO_ERROR` after a non-blocking connect.
fn sys_getsockopt<X: HasHookSlot>(cpu: &mut Cpu<X>, mem: &mut Memory) -> RvResult<()> {
    let fd: i32 = sysarg::<X, i32>(cpu, 0);
    let optval: u64 = sysarg::<X, u64>(cpu, 3);
    if cpu.syscalls.fd_table.is_socket(fd) {
        mem.write_u32(optval, 0)?;
        set_result(cpu, 0);
    } else {
        set_result(cpu, EBADF);
    }
    Ok(())
}

fn sys_setsockopt<X: HasHookSlot>(cpu: &mut Cpu<X>, _mem: &mut Memory) -> RvResult<()> {
    let fd: i32 = sysarg::<X, i32>(cpu, 0);
    let ok = cpu.syscalls.fd_table.is_socket(fd);
    set_result(cpu, if ok { 0 } else { EBADF });
    Ok(())
}

fn sys_getpid<X: HasHookSlot>(cpu: &mut Cpu<X>, _mem: &mut Memory) -> RvResult<()> {
    set_result(cpu, 1);
    Ok(())
}

fn sys_gettid<X: HasHookSlot>(cpu: &mut Cpu<X>, _mem: &mut Memory) -> RvResult<()> {
    let tid = cpu.syscalls.threads.main_tid();
    set_result(cpu, tid as i64);
    Ok(())
}

/// Cooperative `clone`: registers bookkeeping in [`ThreadRing`] and
/// returns the new tid, but does not itself spawn a second execution
/// context — the scheduling model leaves that to whatever
/// drives `simulate` for this guest thread.
fn sys_clone<X: HasHookSlot>(cpu: &mut Cpu<X>, _mem: &mut Memory) -> RvResult<()> {
    let tls: u64 = sysarg::<X, u64>(cpu, 3);
    let tid = cpu.syscalls.threads.spawn(tls);
    set_result(cpu, tid as i64);
    Ok(())
}

/// `futex`: since nothing ever actually blocks in a single-hart
/// cooperative model, `WAIT` always reports success immediately and
/// `WAKE` reports the number of other live threads, capped at the
/// requested count.
fn sys_futex<X: HasHookSlot>(cpu: &mut Cpu<X>, _mem: &mut Memory) -> RvResult<()> {
    const FUTEX_WAKE: i32 = 1;
    let op: i32 = sysarg::<X, i32>(cpu, 1) & 0x7f;
    if op == FUTEX_WAKE {
        let requested: u64 = sysarg::<X, u64>(cpu, 2);
        let woken = (cpu.syscalls.threads.wakeable() as u64).min(requested);
        set_result(cpu, woken as i64);
    } else {
        set_result(cpu, 0);
    }
    Ok(())
}

fn sys_clock_gettime<X: HasHookSlot>(cpu: &mut Cpu<X>, mem: &mut Memory) -> RvResult<()> {
    let addr: u64 = sysarg::<X, u64>(cpu, 1);
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    mem.write_u64(addr, now.as_secs())?;
    mem.write_u64(addr + 8, u64::from(now.subsec_nanos()))?;
    set_result(cpu, 0);
    Ok(())
}

fn sys_ioctl<X: HasHookSlot>(cpu: &mut Cpu<X>, _mem: &mut Memory) -> RvResult<()> {
    set_result(cpu, ENOTTY);
    Ok(())
}

fn sys_noop_ok<X: HasHookSlot>(cpu: &mut Cpu<X>, _mem: &mut Memory) -> RvResult<()> {
    set_result(cpu, 0);
    Ok(())
}

fn sys_stub_enosys<X: HasHookSlot>(cpu: &mut Cpu<X>, _mem: &mut Memory) -> RvResult<()> {
    set_result(cpu, ENOSYS);
    Ok(())
}

fn sys_native_alloc<X: HasHookSlot>(cpu: &mut Cpu<X>, _mem: &mut Memory) -> RvResult<()> {
    let len: u64 = sysarg::<X, u64>(cpu, 0);
    match cpu.syscalls.native_heap.alloc(len) {
        Some(addr) => set_result(cpu, addr as i64),
        None => set_result(cpu, 0),
    }
    Ok(())
}

fn sys_native_free<X: HasHookSlot>(cpu: &mut Cpu<X>, _mem: &mut Memory) -> RvResult<()> {
    let addr: u64 = sysarg::<X, u64>(cpu, 0);
    let len: u64 = sysarg::<X, u64>(cpu, 1);
    cpu.syscalls.native_heap.free(addr, len);
    set_result(cpu, 0);
    Ok(())
}

fn sys_native_realloc<X: HasHookSlot>(cpu: &mut Cpu<X>, mem: &mut Memory) -> RvResult<()> {
    let old_addr: u64 = sysarg::<X, u64>(cpu, 0);
    let old_len: u64 = sysarg::<X, u64>(cpu, 1);
    let new_len: u64 = sysarg::<X, u64>(cpu, 2);
    match cpu.syscalls.native_heap.alloc(new_len) {
        Some(new_addr) => {
            let copy_len = old_len.min(new_len);
            if copy_len > 0 {
                mem.memcpy(new_addr, old_addr, copy_len)?;
            }
            cpu.syscalls.native_heap.free(old_addr, old_len);
            set_result(cpu, new_addr as i64);
        }
        None => set_result(cpu, 0),
    }
    Ok(())
}

fn sys_native_memcpy<X: HasHookSlot>(cpu: &mut Cpu<X>, mem: &mut Memory) -> RvResult<()> {
    let dst: u64 = sysarg::<X, u64>(cpu, 0);
    let src: u64 = sysarg::<X, u64>(cpu, 1);
    let len: u64 = sysarg::<X, u64>(cpu, 2);
    mem.memcpy(dst, src, len)?;
    set_result(cpu, dst as i64);
    Ok(())
}

fn sys_native_meminfo<X: HasHookSlot>(cpu: &mut Cpu<X>, mem: &mut Memory) -> RvResult<()> {
    let out_addr: u64 = sysarg::<X, u64>(cpu, 0);
    let (used, free, total) = cpu.syscalls.native_heap.meminfo();
    mem.write_u64(out_addr, used)?;
    mem.write_u64(out_addr + 8, free)?;
    mem.write_u64(out_addr + 16, total)?;
    set_result(cpu, 0);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::{REG_A0, REG_A7};
    use crate::xlen::Rv64;

    #[test]
    fn unknown_syscall_recovers_as_enosys_by_default() {
        let mut cpu = Cpu::<Rv64>::new();
        let mut mem = Memory::new(1 << 20);
        cpu.regs.set(REG_A7, 0xdead);
        dispatch(&mut cpu, &mut mem).unwrap();
        assert_eq!(cpu.regs.get(REG_A0) as i64, ENOSYS);
    }

    #[test]
    fn unknown_syscall_raises_when_fatal() {
        let mut cpu = Cpu::<Rv64>::new();
        let mut mem = Memory::new(1 << 20);
        cpu.syscalls.unknown_syscalls_are_fatal = true;
        cpu.regs.set(REG_A7, 0xdead);
        let err = dispatch(&mut cpu, &mut mem).unwrap_err();
        assert!(matches!(err, RvError::UnknownSyscall { number: 0xdead, .. }));
    }

    #[test]
    fn installing_syscall_one_as_stop_matches_minimal_exit_scenario() {
        fn stop_handler<X: HasHookSlot>(cpu: &mut Cpu<X>, _mem: &mut Memory) -> RvResult<()> {
            cpu.stop();
            Ok(())
        }
        let mut cpu = Cpu::<Rv64>::new();
        cpu.syscalls.install(1, stop_handler);
        cpu.regs.set(REG_A0, 666);
        cpu.regs.set(REG_A7, 1);
        let mut mem = Memory::new(1 << 20);
        dispatch(&mut cpu, &mut mem).unwrap();
        assert_eq!(cpu.regs.get(REG_A0), 666);
    }

    #[test]
    fn native_alloc_then_meminfo_reports_usage() {
        let mut cpu = Cpu::<Rv64>::new();
        let mut mem = Memory::new(1 << 20);
        cpu.regs.set(REG_A0, 64);
        cpu.regs.set(REG_A7, SYSCALL_ALLOC as u64);
        dispatch(&mut cpu, &mut mem).unwrap();
        assert_ne!(cpu.regs.get(REG_A0), 0);

        cpu.regs.set(REG_A0, 0x1000);
        cpu.regs.set(REG_A7, SYSCALL_MEMINFO as u64);
        dispatch(&mut cpu, &mut mem).unwrap();
        let used = mem.read_u64(0x1000).unwrap();
        assert_eq!(used, 64);
    }
}
