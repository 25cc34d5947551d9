//! Instruction decode: turns a raw 16- or 32-bit word into a handler
//! function plus a disassembly printer. Every handler has
//! the signature `fn(&mut Cpu<X>, &mut Memory, u32) -> RvResult<()>` —
//! the raw word is re-passed rather than threaded through a parsed
//! struct, so field extraction ([`fields`]) stays a set of free
//! functions the handler calls only for the operands it needs.
//!
//! Decoding is total: [`decode`] always returns something runnable.
//! Anything the sub-decoders don't recognize first goes through the
//! process-wide unimplemented-instruction hook (if one is installed for
//! this [`crate::xlen::Xlen`]) and otherwise falls back to
//! [`illegal_instruction`].

pub mod base;
pub mod checksum;
pub mod compressed;
pub mod fields;
pub mod rv_a;
pub mod rv_f;
pub mod rv_m;

pub use checksum::instruction_checksum;

use std::sync::{OnceLock, RwLock};

use crate::cpu::Cpu;
use crate::error::{RvError, RvResult};
use crate::memory::Memory;
use crate::xlen::{Rv128, Rv32, Rv64, Word, Xlen};

/// An instruction handler: mutates CPU/memory state for one instruction.
/// If it leaves `pc` unchanged, the caller advances it by the decoded
/// length — handlers that branch/jump set `pc` themselves
/// and nothing else needs to know the difference.
pub type HandlerFn<X> = fn(&mut Cpu<X>, &mut Memory, u32) -> RvResult<()>;

/// Renders a disassembly line for a raw word, independent of `Xlen` (the
/// mnemonic/operand layout doesn't depend on register width).
pub type PrinterFn = fn(u32) -> String;

/// A fully decoded instruction ready to execute.
#[derive(Copy, Clone)]
pub struct DecodedInstruction<X: Xlen> {
    pub handler: HandlerFn<X>,
    pub printer: PrinterFn,
    /// The word actually executed: for compressed instructions this is
    /// the *expanded* 32-bit encoding, since that's what the handler and
    /// field-extraction functions operate on.
    pub raw: u32,
    /// 2 for a compressed instruction, 4 otherwise — what the caller
    /// advances `pc` by when the handler didn't branch.
    pub length: u32,
}

/// A process-wide override substituted for any word the built-in
/// decoders can't place — lets an embedder add custom opcodes (e.g. a
/// binary-translation fast path) without forking the decode tables.
pub type UnimplementedHook<X> = fn(u32) -> Option<(HandlerFn<X>, PrinterFn)>;

/// Per-`Xlen` storage for [`UnimplementedHook`]. The hook is global to
/// the process (not per-`Cpu` instance) since binary-translation
/// registration happens once at startup; implemented once per concrete
/// `Xlen` via [`hook_slot`] since a `static` can't itself be generic.
pub trait HasHookSlot: Xlen {
    #[doc(hidden)]
    fn __hook_slot() -> &'static OnceLock<RwLock<Option<UnimplementedHook<Self>>>>;
}

macro_rules! hook_slot {
    ($ty:ty) => {
        impl HasHookSlot for $ty {
            fn __hook_slot() -> &'static OnceLock<RwLock<Option<UnimplementedHook<Self>>>> {
                static SLOT: OnceLock<RwLock<Option<UnimplementedHook<$ty>>>> = OnceLock::new();
                &SLOT
            }
        }
    };
}
hook_slot!(Rv32);
hook_slot!(Rv64);
hook_slot!(Rv128);

fn slot<X: HasHookSlot>() -> &'static RwLock<Option<UnimplementedHook<X>>> {
    X::__hook_slot().get_or_init(|| RwLock::new(None))
}

/// Installs (or clears, with `None`) the unimplemented-instruction hook
/// for one `Xlen`. Affects every `Cpu<X>` of that width already running.
pub fn set_unimplemented_hook<X: HasHookSlot>(hook: Option<UnimplementedHook<X>>) {
    *slot::<X>().write().expect("hook slot poisoned") = hook;
}

fn illegal_printer(w: u32) -> String {
    format!("illegal 0x{:08x}", w)
}

fn illegal_instruction<X: Xlen>(cpu: &mut Cpu<X>, _mem: &mut Memory, w: u32) -> RvResult<()> {
    Err(RvError::IllegalOpcode { pc: cpu.regs.pc().to_u64(), word: w })
}

/// Decode one instruction word. `is_compressed` selects whether `word`
/// holds a 16-bit encoding (only the low half is meaningful) or a full
/// 32-bit one.
pub fn decode<X: HasHookSlot>(word: u32, is_compressed: bool) -> DecodedInstruction<X> {
    let length = if is_compressed { 2 } else { 4 };
    let expanded = if is_compressed {
        match compressed::expand::<X>(word as u16) {
            Some(w) => w,
            None => return unresolved::<X>(word, length),
        }
    } else {
        word
    };
    match base::decode::<X>(expanded) {
        Some((handler, printer)) => DecodedInstruction { handler, printer, raw: expanded, length },
        None => unresolved::<X>(expanded, length),
    }
}

fn unresolved<X: HasHookSlot>(word: u32, length: u32) -> DecodedInstruction<X> {
    if let Some(hook) = *slot::<X>().read().expect("hook slot poisoned") {
        if let Some((handler, printer)) = hook(word) {
            return DecodedInstruction { handler, printer, raw: word, length };
        }
    }
    DecodedInstruction { handler: illegal_instruction::<X>, printer: illegal_printer, raw: word, length }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xlen::Rv64;

    #[test]
    fn unknown_word_decodes_to_illegal() {
        let d = decode::<Rv64>(0, false);
        assert_eq!(d.length, 4);
        assert_eq!((d.printer)(0), illegal_printer(0));
    }

    #[test]
    fn hook_overrides_unresolved_word() {
        fn hook(_w: u32) -> Option<(HandlerFn<Rv64>, PrinterFn)> {
            Some((|_cpu, _mem, _w| Ok(()), |_w| "hooked".to_string()))
        }
        set_unimplemented_hook::<Rv64>(Some(hook));
        let d = decode::<Rv64>(0, false);
        assert_eq!((d.printer)(0), "hooked");
        set_unimplemented_hook::<Rv64>(None);
    }
}
