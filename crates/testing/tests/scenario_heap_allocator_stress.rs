use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use riscv_core::syscalls::NativeHeap;
use std::collections::HashMap;

#[test]
fn ten_thousand_random_alloc_free_cycles_leave_the_arena_fully_reclaimed() {
    riscv_core_testing::init_tracing();
    const BASE: u64 = 0x1000_000;
    const SIZE: u64 = 0x1000_000;
    let mut heap = NativeHeap::new(BASE, SIZE);
    let mut live: HashMap<u64, u64> = HashMap::new();
    let mut rng = StdRng::seed_from_u64(0xC0FFEE);

    for _ in 0..10_000 {
        if live.is_empty() || rng.gen_bool(0.6) {
            let len = rng.gen_range(1..=256);
            if let Some(addr) = heap.alloc(len) {
                live.insert(addr, len);
            }
        } else {
            let keys: Vec<u64> = live.keys().copied().collect();
            let addr = keys[rng.gen_range(0..keys.len())];
            let len = live.remove(&addr).unwrap();
            assert!(heap.free(addr, len));
        }
    }

    for (addr, len) in live.drain() {
        assert!(heap.free(addr, len));
    }

    let (used, free, total) = heap.meminfo();
    assert_eq!(used, 0);
    assert_eq!(total, SIZE);
    assert_eq!(free, total);
}
