use riscv_core::syscalls::ThreadRing;

#[test]
fn main_thread_is_pre_registered_and_running() {
    let threads = ThreadRing::default();
    assert_eq!(threads.main_tid(), 1);
    assert_eq!(threads.running_count(), 1);
    assert_eq!(threads.wakeable(), 0);
}

#[test]
fn spawned_threads_get_increasing_tids_and_keep_their_tls() {
    let mut threads = ThreadRing::default();
    let a = threads.spawn(0x1000);
    let b = threads.spawn(0x2000);
    assert_ne!(a, b);
    assert_eq!(threads.tls(a), 0x1000);
    assert_eq!(threads.tls(b), 0x2000);
    assert_eq!(threads.running_count(), 3);
    assert_eq!(threads.wakeable(), 2);
}

#[test]
fn exiting_a_thread_records_its_code_and_drops_it_from_the_running_set() {
    let mut threads = ThreadRing::default();
    let tid = threads.spawn(0);
    threads.exit(tid, 7);
    assert_eq!(threads.running_count(), 1);
    assert_eq!(threads.wakeable(), 0);
}
