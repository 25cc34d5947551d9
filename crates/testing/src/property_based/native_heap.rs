//! Invariants for [`riscv_core::syscalls::NativeHeap`] under randomized
//! alloc/free sequences: every live allocation stays inside the arena
//! and disjoint from every other live allocation, and accounting never
//! reports more used bytes than the arena holds.

use proptest::prelude::*;
use riscv_core::syscalls::NativeHeap;

#[derive(Clone, Debug)]
enum Op {
    Alloc(u64),
    FreeOldest,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1u64..=512).prop_map(Op::Alloc),
        Just(Op::FreeOldest),
    ]
}

proptest! {
    #[test]
    fn live_allocations_never_overlap(ops in prop::collection::vec(op_strategy(), 1..200)) {
        const BASE: u64 = 0x1000_0000;
        const SIZE: u64 = 1 << 20;
        let mut heap = NativeHeap::new(BASE, SIZE);
        let mut live: Vec<(u64, u64)> = Vec::new();

        for op in ops {
            match op {
                Op::Alloc(len) => {
                    if let Some(addr) = heap.alloc(len) {
                        prop_assert!(addr >= BASE && addr < BASE + SIZE);
                        for &(other_addr, other_len) in &live {
                            let disjoint = addr + len <= other_addr || other_addr + other_len <= addr;
                            prop_assert!(disjoint, "new allocation overlaps a live one");
                        }
                        live.push((addr, len));
                    }
                }
                Op::FreeOldest => {
                    if !live.is_empty() {
                        let (addr, len) = live.remove(0);
                        prop_assert!(heap.free(addr, len));
                    }
                }
            }
            let (used, free, total) = heap.meminfo();
            prop_assert_eq!(total, SIZE);
            prop_assert_eq!(used + free, total);
        }
    }
}
