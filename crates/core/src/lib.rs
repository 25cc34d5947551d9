//! A generic-over-XLEN RISC-V userspace emulation core: decoder, CPU,
//! paged memory, ELF loader, syscall layer, and the `Machine` façade
//! that ties them together.
//!
//! Everything here is parameterized over [`xlen::Xlen`] rather than
//! gated behind a Cargo feature per width — pick [`xlen::Rv32`],
//! [`xlen::Rv64`] or [`xlen::Rv128`] at the call site. Extension
//! support (`M`/`A`/`F`/`D`/`V`) *is* feature-gated, but checked at
//! runtime via `cfg!(feature = "...")` inside the decode tables rather
//! than with `#[cfg(...)]` module gating, so a binary can be built once
//! with every extension compiled in and still report which are
//! "enabled" for a given run.

pub mod cpu;
pub mod decoder;
pub mod elf;
pub mod error;
pub mod machine;
pub mod memory;
pub mod registers;
pub mod syscalls;
pub mod translation;
pub mod xlen;

pub use cpu::{Cpu, ExecSegment, StopReason};
pub use decoder::{set_unimplemented_hook, HasHookSlot};
pub use error::{AccessKind, RvError, RvResult};
pub use machine::{Machine, MachineConfig};
pub use memory::Memory;
pub use registers::Registers;
pub use xlen::{Rv128, Rv32, Rv64, Xlen};
