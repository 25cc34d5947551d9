//! Optional contiguous-backing fast path for memory. A single buffer `[0, arena_end)`: a guard region below
//! `0x1000`, writable data/stack `[0x1000, arena_ro_end)`, and read-only
//! code `[arena_ro_end, arena_end)`. Protection faults derive from these
//! bounds instead of per-page attributes. Incompatible with serialization
//! and trap pages.

use crate::error::{AccessKind, RvError, RvResult};

pub const ARENA_GUARD_END: u64 = 0x1000;

pub struct FlatArena {
    buf: Vec<u8>,
    ro_end: u64,
    end: u64,
}

impl FlatArena {
    pub fn new(size: u64, ro_end: u64) -> Self {
        assert!(ro_end <= size, "read-only region must fit inside the arena");
        Self { buf: vec![0u8; size as usize], ro_end, end: size }
    }

    pub fn len(&self) -> u64 {
        self.end
    }

    pub fn is_empty(&self) -> bool {
        self.end == 0
    }

    pub fn ro_end(&self) -> u64 {
        self.ro_end
    }

    fn in_bounds(&self, addr: u64, len: u64) -> bool {
        addr >= ARENA_GUARD_END && addr.checked_add(len).is_some_and(|e| e <= self.end)
    }

    fn writable(&self, addr: u64, len: u64) -> bool {
        self.in_bounds(addr, len) && addr.checked_add(len).is_some_and(|e| e <= self.ro_end)
    }

    pub fn read(&self, addr: u64, buf: &mut [u8]) -> RvResult<()> {
        if !self.in_bounds(addr, buf.len() as u64) {
            return Err(RvError::ProtectionFault { address: addr, access: AccessKind::Read });
        }
        buf.copy_from_slice(&self.buf[addr as usize..addr as usize + buf.len()]);
        Ok(())
    }

    pub fn write(&mut self, addr: u64, data: &[u8]) -> RvResult<()> {
        if !self.writable(addr, data.len() as u64) {
            return Err(RvError::ProtectionFault { address: addr, access: AccessKind::Write });
        }
        self.buf[addr as usize..addr as usize + data.len()].copy_from_slice(data);
        Ok(())
    }

    pub fn memset(&mut self, addr: u64, value: u8, len: u64) -> RvResult<()> {
        if !self.writable(addr, len) {
            return Err(RvError::ProtectionFault { address: addr, access: AccessKind::Write });
        }
        self.buf[addr as usize..(addr + len) as usize].fill(value);
        Ok(())
    }

    pub fn memcpy(&mut self, dst: u64, src: u64, len: u64) -> RvResult<()> {
        if !self.writable(dst, len) || !self.in_bounds(src, len) {
            return Err(RvError::ProtectionFault { address: dst, access: AccessKind::Write });
        }
        self.buf.copy_within(src as usize..(src + len) as usize, dst as usize);
        Ok(())
    }

    /// Read a NUL-terminated string, at most `max_len` bytes.
    pub fn memstring(&self, addr: u64, max_len: u64) -> RvResult<Vec<u8>> {
        if addr < ARENA_GUARD_END || addr >= self.end {
            return Err(RvError::ProtectionFault { address: addr, access: AccessKind::Read });
        }
        let limit = ((self.end - addr).min(max_len)) as usize;
        let region = &self.buf[addr as usize..addr as usize + limit];
        match region.iter().position(|&b| b == 0) {
            Some(nul) => Ok(region[..nul].to_vec()),
            None => Err(RvError::ProtectionFault { address: addr + limit as u64, access: AccessKind::Read }),
        }
    }

    /// The executable view: a contiguous read-only slice for the decoder
    /// to fetch raw instruction bytes from directly.
    pub fn exec_view(&self) -> &[u8] {
        &self.buf[self.ro_end as usize..self.end as usize]
    }

    pub fn load_bytes(&mut self, addr: u64, bytes: &[u8]) -> RvResult<()> {
        if addr.checked_add(bytes.len() as u64).map_or(true, |e| e > self.end) {
            return Err(RvError::InvalidProgram {
                message: format!("segment at 0x{addr:x} (len {}) does not fit the flat arena", bytes.len()),
            });
        }
        self.buf[addr as usize..addr as usize + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}
