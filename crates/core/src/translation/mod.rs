//! Binary-translation registration interface. The compiler
//! that emits translated code, and the mechanism that would load it as
//! a shared object, are both out of scope here — this module only
//! defines the data layout and callback contract such a backend would
//! register against.

use crate::cpu::Cpu;
use crate::decoder::{instruction_checksum, HasHookSlot};
use crate::error::{RvError, RvResult};
use crate::memory::Memory;

/// One `(guest_pc → handler_index)` entry a translation unit declares.
#[derive(Clone, Copy, Debug)]
pub struct TranslationMapping {
    pub guest_pc: u64,
    pub handler_index: u32,
}

/// A translated instruction-block handler, sharing a
/// `(counter, max_counter, pc) → (counter, max_counter)` contract: it
/// advances the instruction counter itself (translated code may retire
/// several guest instructions per call) and reports where it left `pc`.
pub type TranslationHandler = fn(counter: u64, max_counter: u64, pc: u64) -> (u64, u64);

/// The callback table a translation unit calls back through instead of
/// touching `Cpu`/`Memory` directly.
pub struct TranslationCallbacks<X: HasHookSlot> {
    pub load: fn(&mut Cpu<X>, &mut Memory, u64, u32) -> RvResult<u64>,
    pub store: fn(&mut Cpu<X>, &mut Memory, u64, u64, u32) -> RvResult<()>,
    pub dispatch_syscall: fn(&mut Cpu<X>, &mut Memory) -> RvResult<()>,
    pub trigger_exception: fn(&Cpu<X>, RvError) -> RvResult<()>,
    pub sqrt: fn(f64) -> f64,
}

/// The full `register_translation` payload, minus the
/// shared-object loading step: a host embedder constructs this directly
/// (having already loaded its translation unit however it sees fit) and
/// hands it to [`register`].
pub struct TranslationRegistration<X: HasHookSlot> {
    pub image_hash: u32,
    pub mappings: Vec<TranslationMapping>,
    pub handlers: Vec<TranslationHandler>,
    pub init_fn: Option<fn(&TranslationCallbacks<X>)>,
}

fn load_word<X: HasHookSlot>(_cpu: &mut Cpu<X>, mem: &mut Memory, addr: u64, width: u32) -> RvResult<u64> {
    match width {
        1 => mem.read_u8(addr).map(u64::from),
        2 => mem.read_u16(addr).map(u64::from),
        4 => mem.read_u32(addr).map(u64::from),
        8 => mem.read_u64(addr),
        _ => Err(RvError::InvalidProgram { message: format!("unsupported translation load width {width}") }),
    }
}

fn store_word<X: HasHookSlot>(_cpu: &mut Cpu<X>, mem: &mut Memory, addr: u64, value: u64, width: u32) -> RvResult<()> {
    match width {
        1 => mem.write_u8(addr, value as u8),
        2 => mem.write_u16(addr, value as u16),
        4 => mem.write_u32(addr, value as u32),
        8 => mem.write_u64(addr, value),
        _ => Err(RvError::InvalidProgram { message: format!("unsupported translation store width {width}") }),
    }
}

fn dispatch_syscall<X: HasHookSlot>(cpu: &mut Cpu<X>, mem: &mut Memory) -> RvResult<()> {
    crate::syscalls::dispatch(cpu, mem)
}

fn trigger_exception<X: HasHookSlot>(cpu: &Cpu<X>, err: RvError) -> RvResult<()> {
    cpu.trigger_exception(err)
}

/// The callback table handed to a translation unit's `init_fn`.
pub fn default_callbacks<X: HasHookSlot>() -> TranslationCallbacks<X> {
    TranslationCallbacks {
        load: load_word::<X>,
        store: store_word::<X>,
        dispatch_syscall: dispatch_syscall::<X>,
        trigger_exception: trigger_exception::<X>,
        sqrt: f64::sqrt,
    }
}

/// Checks a registration's declared hash against the loaded image.
/// Matching is the only gate this interface defines — actually splicing
/// `mappings` into an `ExecSegment`'s decode slots is the accelerator's
/// job, not this core's.
pub fn matches_image<X: HasHookSlot>(registration: &TranslationRegistration<X>, image_bytes: &[u8]) -> bool {
    instruction_checksum(image_bytes) == registration.image_hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xlen::Rv64;

    #[test]
    fn hash_mismatch_rejects_registration() {
        let reg = TranslationRegistration::<Rv64> {
            image_hash: 0,
            mappings: vec![TranslationMapping { guest_pc: 0x1000, handler_index: 0 }],
            handlers: vec![|c, m, _pc| (c + 1, m)],
            init_fn: None,
        };
        assert!(!matches_image(&reg, b"some image bytes"));
    }

    #[test]
    fn hash_match_accepts_registration() {
        let bytes = b"image";
        let reg = TranslationRegistration::<Rv64> {
            image_hash: instruction_checksum(bytes),
            mappings: Vec::new(),
            handlers: Vec::new(),
            init_fn: None,
        };
        assert!(matches_image(&reg, bytes));
    }
}
