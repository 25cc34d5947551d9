//! Error taxonomy. Every fallible operation in the engine
//! returns [`RvResult`]; the fetch loop in `cpu` is the single place an
//! `Err` is caught and turned into a [`crate::cpu::StopReason`].

use thiserror::Error;

/// Structured error carrying the fault kind plus address/word context
/// as named fields, so callers can match on the specific failure
/// instead of parsing a message string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RvError {
    #[error("illegal opcode 0x{word:08x} at pc=0x{pc:x}")]
    IllegalOpcode { pc: u64, word: u32 },

    #[error("misaligned instruction fetch at pc=0x{pc:x}")]
    MisalignedInstruction { pc: u64 },

    #[error("unimplemented instruction 0x{word:08x} at pc=0x{pc:x}")]
    UnimplementedInstruction { pc: u64, word: u32 },

    #[error("protection fault: {access} access to 0x{address:x} denied")]
    ProtectionFault { address: u64, access: AccessKind },

    #[error("execution-space protection fault fetching from 0x{address:x}")]
    ExecutionSpaceProtectionFault { address: u64 },

    #[error("out of memory: could not satisfy request for {requested} bytes")]
    OutOfMemory { requested: u64 },

    #[error("invalid program: {message}")]
    InvalidProgram { message: String },

    #[error("feature disabled: {feature}")]
    FeatureDisabled { feature: &'static str },

    #[error("machine timeout: instruction limit reached (limit reached after {counter} instructions)")]
    MachineTimeout { counter: u64 },

    #[error("machine exception: {message} (data=0x{data:x})")]
    MachineException { message: String, data: u64 },

    #[error("general exception: {message}")]
    GeneralException { message: String },

    #[error("unknown syscall number {number} at pc=0x{pc:x}")]
    UnknownSyscall { number: i64, pc: u64 },
}

/// The access mode that triggered a [`RvError::ProtectionFault`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    Read,
    Write,
}

impl std::fmt::Display for AccessKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessKind::Read => write!(f, "read"),
            AccessKind::Write => write!(f, "write"),
        }
    }
}

pub type RvResult<T> = Result<T, RvError>;

impl RvError {
    /// `true` for errors the syscall layer converts into a negated errno
    /// in A0 instead of unwinding the simulation.
    pub fn is_recoverable_in_syscall(&self) -> bool {
        matches!(self, RvError::UnknownSyscall { .. })
    }
}
