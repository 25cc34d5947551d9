//! Proptest-driven invariants: round-tripping the hand-assembler
//! ([`crate::asm`]) through `riscv_core`'s field decoders, and checking
//! the native heap's allocator bookkeeping stays internally consistent
//! under randomized operation sequences.

mod fields;
mod native_heap;
