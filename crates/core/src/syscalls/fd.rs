//! Virtualized guest file-descriptor table. Guest fd
//! numbers never touch the host directly: 0/1/2 map to the process's
//! own stdio, and opening anything else requires both
//! [`FdTable::enabled`] and a path on the allow-list. Sockets are gated
//! the same way, behind [`FdTable::permit_sockets`] and
//! [`FdTable::allowed_ports`] — mirroring the upstream `permit_sockets`
//! posture, disabled unless explicitly turned on.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};

enum HostHandle {
    Stdin,
    Stdout,
    Stderr,
    File(File),
    Socket(SocketHandle),
}

enum SocketHandle {
    Pending,
    Listener(TcpListener),
    Stream(TcpStream),
}

pub struct FdTable {
    entries: HashMap<i32, HostHandle>,
    next_fd: i32,
    pub allowed_paths: Vec<String>,
    pub enabled: bool,
    pub permit_sockets: bool,
    pub allowed_ports: Vec<u16>,
}

impl Default for FdTable {
    fn default() -> Self {
        let mut entries = HashMap::new();
        entries.insert(0, HostHandle::Stdin);
        entries.insert(1, HostHandle::Stdout);
        entries.insert(2, HostHandle::Stderr);
        FdTable {
            entries,
            next_fd: 3,
            allowed_paths: Vec::new(),
            enabled: false,
            permit_sockets: false,
            allowed_ports: Vec::new(),
        }
    }
}

impl FdTable {
    pub fn write(&mut self, fd: i32, data: &[u8]) -> Option<usize> {
        match self.entries.get_mut(&fd)? {
            HostHandle::Stdout => {
                std::io::stdout().write_all(data).ok()?;
                Some(data.len())
            }
            HostHandle::Stderr => {
                std::io::stderr().write_all(data).ok()?;
                Some(data.len())
            }
            HostHandle::File(f) => f.write(data).ok(),
            HostHandle::Socket(SocketHandle::Stream(s)) => s.write(data).ok(),
            HostHandle::Socket(_) | HostHandle::Stdin => None,
        }
    }

    pub fn read(&mut self, fd: i32, buf: &mut [u8]) -> Option<usize> {
        match self.entries.get_mut(&fd)? {
            HostHandle::Stdin => std::io::stdin().read(buf).ok(),
            HostHandle::File(f) => f.read(buf).ok(),
            HostHandle::Socket(SocketHandle::Stream(s)) => s.read(buf).ok(),
            HostHandle::Stdout | HostHandle::Stderr | HostHandle::Socket(_) => None,
        }
    }

    /// Opens `path` on the host, subject to [`FdTable::enabled`] and
    /// [`FdTable::allowed_paths`].
    pub fn openat(&mut self, path: &str, write: bool) -> Option<i32> {
        if !self.enabled || !self.allowed_paths.iter().any(|p| p == path) {
            return None;
        }
        let file = if write {
            OpenOptions::new().write(true).create(true).truncate(true).open(path).ok()?
        } else {
            OpenOptions::new().read(true).open(path).ok()?
        };
        let fd = self.next_fd;
        self.next_fd += 1;
        self.entries.insert(fd, HostHandle::File(file));
        Some(fd)
    }

    pub fn close(&mut self, fd: i32) -> bool {
        if fd <= 2 {
            return false; // stdio stays open for the process lifetime
        }
        self.entries.remove(&fd).is_some()
    }

    /// `socket()`: allocates a pending fd with no backing connection
    /// yet, subject to [`FdTable::permit_sockets`].
    pub fn socket(&mut self) -> Option<i32> {
        if !self.permit_sockets {
            return None;
        }
        let fd = self.next_fd;
        self.next_fd += 1;
        self.entries.insert(fd, HostHandle::Socket(SocketHandle::Pending));
        Some(fd)
    }

    /// `bind()`: a pending socket fd becomes a loopback `TcpListener` on
    /// `port`, if `port` is allow-listed. `std::net::TcpListener::bind`
    /// already performs the OS-level `bind`+`listen` in one call, so
    /// [`FdTable::listen`] only has to confirm the fd is in that state.
    pub fn bind(&mut self, fd: i32, port: u16) -> bool {
        if !self.permit_sockets || !self.allowed_ports.contains(&port) {
            return false;
        }
        let Some(HostHandle::Socket(state @ SocketHandle::Pending)) = self.entries.get_mut(&fd)
        else {
            return false;
        };
        match TcpListener::bind(("127.0.0.1", port)) {
            Ok(listener) => {
                let _ = listener.set_nonblocking(true);
                *state = SocketHandle::Listener(listener);
                true
            }
            Err(_) => false,
        }
    }

    /// `listen()`: a no-op once `bind` has already put the fd into the
    /// listening state.
    pub fn listen(&self, fd: i32) -> bool {
        matches!(self.entries.get(&fd), Some(HostHandle::Socket(SocketHandle::Listener(_))))
    }

    /// `accept()`: non-blocking, since nothing in this cooperative model
    /// ever parks a hart waiting on host I/O. Returns `None` (EAGAIN to
    /// the caller) if no connection is pending.
    pub fn accept(&mut self, fd: i32) -> Option<i32> {
        let HostHandle::Socket(SocketHandle::Listener(listener)) = self.entries.get(&fd)? else {
            return None;
        };
        let (stream, _) = listener.accept().ok()?;
        let new_fd = self.next_fd;
        self.next_fd += 1;
        self.entries.insert(new_fd, HostHandle::Socket(SocketHandle::Stream(stream)));
        Some(new_fd)
    }

    /// `connect()`: a pending socket fd becomes a `TcpStream` connected
    /// to loopback `port`, if `port` is allow-listed.
    pub fn connect(&mut self, fd: i32, port: u16) -> bool {
        if !self.permit_sockets || !self.allowed_ports.contains(&port) {
            return false;
        }
        let Some(HostHandle::Socket(state @ SocketHandle::Pending)) = self.entries.get_mut(&fd)
        else {
            return false;
        };
        match TcpStream::connect(("127.0.0.1", port)) {
            Ok(stream) => {
                *state = SocketHandle::Stream(stream);
                true
            }
            Err(_) => false,
        }
    }

    /// `getsockopt`/`setsockopt`: accepted only for an actual socket fd
    /// gated by [`FdTable::permit_sockets`]; no option is tracked, so
    /// both report success with a zero value, matching the common case
    /// of guest code probing `SO_ERROR` after a non-blocking connect.
    pub fn is_socket(&self, fd: i32) -> bool {
        matches!(self.entries.get(&fd), Some(HostHandle::Socket(_)))
    }
}
