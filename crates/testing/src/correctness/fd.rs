use riscv_core::syscalls::FdTable;

#[test]
fn stdio_fds_cannot_be_closed() {
    let mut fds = FdTable::default();
    assert!(!fds.close(0));
    assert!(!fds.close(1));
    assert!(!fds.close(2));
}

#[test]
fn openat_is_rejected_until_enabled_and_allow_listed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("guest.txt");
    let path_str = path.to_str().unwrap().to_string();

    let mut fds = FdTable::default();
    assert!(fds.openat(&path_str, true).is_none(), "disabled by default");

    fds.enabled = true;
    assert!(fds.openat(&path_str, true).is_none(), "not on the allow-list yet");

    fds.allowed_paths.push(path_str.clone());
    let fd = fds.openat(&path_str, true).expect("now allowed");
    assert!(fd >= 3);
}

#[test]
fn writing_to_an_opened_file_round_trips_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.txt");
    let path_str = path.to_str().unwrap().to_string();

    let mut fds = FdTable::default();
    fds.enabled = true;
    fds.allowed_paths.push(path_str.clone());
    let fd = fds.openat(&path_str, true).unwrap();

    assert_eq!(fds.write(fd, b"hello"), Some(5));
    assert!(fds.close(fd));

    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents, "hello");
}
