//! Paged virtual memory subsystem.
//!
//! A [`Memory`] is a sparse map from page number to [`Page`], a 16-way
//! read cache, and an optional [`FlatArena`] fast path. Copy-on-write is
//! expressed directly through `Arc<[u8; 4096]>` and [`Page::make_mut`]
//! (see `page.rs`) rather than an explicit clone step: forking a machine
//! just clones every owned page's handle into the child's map and flags
//! both copies `IS_COW`; the first write on either side transparently
//! splits the shared allocation.

pub mod cache;
pub mod flat_arena;
pub mod page;

use crate::error::{AccessKind, RvError, RvResult};
use cache::ReadCache;
use flat_arena::FlatArena;
use page::{page_base, page_number, page_offset, Page, PageAttr, TrapMode, PAGE_SIZE};
use std::collections::HashMap;

macro_rules! rw_primitive {
    ($read:ident, $write:ident, $ty:ty) => {
        pub fn $read(&mut self, addr: u64) -> RvResult<$ty> {
            let mut buf = [0u8; std::mem::size_of::<$ty>()];
            self.read_bytes(addr, &mut buf)?;
            Ok(<$ty>::from_le_bytes(buf))
        }
        pub fn $write(&mut self, addr: u64, value: $ty) -> RvResult<()> {
            self.write_bytes(addr, &value.to_le_bytes())
        }
    };
}

/// A possibly-non-contiguous view over guest memory. `Sequential` is returned whenever the requested range
/// fits in a single page, letting zero-copy consumers (`write(2)`-style
/// syscalls) skip the gather step entirely.
pub enum RvBuffer<'a> {
    Sequential(&'a [u8]),
    Gathered(Vec<u8>),
}

impl RvBuffer<'_> {
    pub fn is_sequential(&self) -> bool {
        matches!(self, RvBuffer::Sequential(_))
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            RvBuffer::Sequential(s) => s,
            RvBuffer::Gathered(v) => v,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct Memory {
    pages: HashMap<u64, Page>,
    cache: ReadCache,
    arena: Option<FlatArena>,
    memory_max: u64,

    start_address: u64,
    stack_address: u64,
    mmap_start: u64,
    mmap_address: u64,
    heap_address: u64,
    exit_address: u64,
}

impl Memory {
    pub fn new(memory_max: u64) -> Self {
        Self {
            pages: HashMap::new(),
            cache: ReadCache::new(),
            arena: None,
            memory_max,
            start_address: 0,
            stack_address: 0,
            mmap_start: 0,
            mmap_address: 0,
            heap_address: 0,
            exit_address: 0,
        }
    }

    pub fn with_flat_arena(mut self, size: u64, ro_end: u64) -> Self {
        self.arena = Some(FlatArena::new(size, ro_end));
        self
    }

    pub fn has_flat_arena(&self) -> bool {
        self.arena.is_some()
    }

    pub fn flat_arena(&self) -> Option<&FlatArena> {
        self.arena.as_ref()
    }

    pub fn flat_arena_mut(&mut self) -> Option<&mut FlatArena> {
        self.arena.as_mut()
    }

    // -- lifecycle addresses, mirroring the checkpoint header fields --

    pub fn start_address(&self) -> u64 {
        self.start_address
    }
    pub fn set_start_address(&mut self, v: u64) {
        self.start_address = v;
    }
    pub fn stack_initial(&self) -> u64 {
        self.stack_address
    }
    pub fn set_stack_initial(&mut self, v: u64) {
        self.stack_address = v;
    }
    pub fn mmap_start(&self) -> u64 {
        self.mmap_start
    }
    pub fn set_mmap_start(&mut self, v: u64) {
        self.mmap_start = v;
        self.mmap_address = v;
    }
    pub fn mmap_address(&self) -> u64 {
        self.mmap_address
    }
    pub fn set_mmap_address(&mut self, v: u64) {
        self.mmap_address = v;
    }
    pub fn heap_address(&self) -> u64 {
        self.heap_address
    }
    pub fn set_heap_address(&mut self, v: u64) {
        self.heap_address = v;
    }
    pub fn exit_address(&self) -> u64 {
        self.exit_address
    }
    pub fn set_exit_address(&mut self, v: u64) {
        self.exit_address = v;
    }
    pub fn memory_max(&self) -> u64 {
        self.memory_max
    }

    /// Number of pages this machine owns (excludes `non_owning` and
    /// `IS_COW`-shared pages): used by the checkpoint header's
    /// `page_count` and by diagnostics.
    pub fn owned_pages_active(&self) -> usize {
        self.pages
            .values()
            .filter(|p| !p.attr.contains(PageAttr::NON_OWNING) && !p.is_cow_page())
            .count()
    }

    pub fn pages(&self) -> impl Iterator<Item = (&u64, &Page)> {
        self.pages.iter()
    }

    /// Look up a page for reading, consulting (and filling) the read
    /// cache first. Unmapped addresses return the CoW zero page.
    fn page_for_read(&mut self, pageno: u64) -> Page {
        if let Some(p) = self.cache.get(pageno) {
            return p.clone();
        }
        if let Some(p) = self.pages.get(&pageno) {
            let p = p.clone();
            self.cache.insert(pageno, p.clone());
            return p;
        }
        Page::cow_zero()
    }

    /// Materialize a writable private page at `pageno`, copying out of a
    /// shared/CoW allocation if necessary. Does not itself check the `WRITE`
    /// attribute — callers that must enforce permissions (the `write<N>`
    /// family) check `PageAttr::WRITE` before calling this.
    pub fn create_writable_pageno(&mut self, pageno: u64) -> &mut Page {
        let page = self.pages.entry(pageno).or_insert_with(Page::cow_zero);
        page.make_mut();
        self.cache.invalidate_reset();
        self.pages.get_mut(&pageno).expect("just inserted")
    }

    fn check_access(&mut self, addr: u64, len: u64, access: AccessKind) -> RvResult<()> {
        if len == 0 {
            return Ok(());
        }
        let first = page_number(addr);
        let last = page_number(addr + len - 1);
        for pageno in first..=last {
            let page = self.page_for_read(pageno);
            let ok = match access {
                AccessKind::Read => page.attr.contains(PageAttr::READ),
                AccessKind::Write => page.attr.contains(PageAttr::WRITE),
            };
            if !ok {
                return Err(RvError::ProtectionFault { address: addr, access });
            }
            if let Some(trap) = &page.trap {
                let mode = match access {
                    AccessKind::Read => TrapMode::Read,
                    AccessKind::Write => TrapMode::Write,
                };
                trap(mode, page_offset(addr), 0);
            }
        }
        Ok(())
    }

    fn check_exec(&mut self, addr: u64, len: u64) -> RvResult<()> {
        if len == 0 {
            return Ok(());
        }
        let first = page_number(addr);
        let last = page_number(addr + len - 1);
        for pageno in first..=last {
            let page = self.page_for_read(pageno);
            if !page.attr.contains(PageAttr::EXEC) {
                return Err(RvError::ExecutionSpaceProtectionFault { address: addr });
            }
        }
        Ok(())
    }

    /// Fetch instruction bytes: checks `EXEC` rather than `READ`, raising
    /// `ExecutionSpaceProtectionFault` instead of a plain protection fault.
    pub fn fetch_bytes(&mut self, addr: u64, out: &mut [u8]) -> RvResult<()> {
        if let Some(arena) = &self.arena {
            return arena.read(addr, out).map_err(|_| RvError::ExecutionSpaceProtectionFault { address: addr });
        }
        self.check_exec(addr, out.len() as u64)?;
        let mut done = 0usize;
        while done < out.len() {
            let cur = addr + done as u64;
            let pageno = page_number(cur);
            let offset = page_offset(cur) as usize;
            let n = (PAGE_SIZE as usize - offset).min(out.len() - done);
            let page = self.page_for_read(pageno);
            out[done..done + n].copy_from_slice(&page.data()[offset..offset + n]);
            done += n;
        }
        Ok(())
    }

    pub fn fetch_u16(&mut self, addr: u64) -> RvResult<u16> {
        let mut buf = [0u8; 2];
        self.fetch_bytes(addr, &mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    pub fn fetch_u32(&mut self, addr: u64) -> RvResult<u32> {
        let mut buf = [0u8; 4];
        self.fetch_bytes(addr, &mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    /// Read `out.len()` bytes starting at `addr`, crossing page
    /// boundaries as needed.
    pub fn read_bytes(&mut self, addr: u64, out: &mut [u8]) -> RvResult<()> {
        self.check_access(addr, out.len() as u64, AccessKind::Read)?;
        let mut done = 0usize;
        while done < out.len() {
            let cur = addr + done as u64;
            let pageno = page_number(cur);
            let offset = page_offset(cur) as usize;
            let n = (PAGE_SIZE as usize - offset).min(out.len() - done);
            let page = self.page_for_read(pageno);
            out[done..done + n].copy_from_slice(&page.data()[offset..offset + n]);
            done += n;
        }
        Ok(())
    }

    pub fn write_bytes(&mut self, addr: u64, data: &[u8]) -> RvResult<()> {
        self.check_access(addr, data.len() as u64, AccessKind::Write)?;
        let mut done = 0usize;
        while done < data.len() {
            let cur = addr + done as u64;
            let pageno = page_number(cur);
            let offset = page_offset(cur) as usize;
            let n = (PAGE_SIZE as usize - offset).min(data.len() - done);
            let page = self.create_writable_pageno(pageno);
            page.make_mut()[offset..offset + n].copy_from_slice(&data[done..done + n]);
            done += n;
        }
        Ok(())
    }

    rw_primitive!(read_u8, write_u8, u8);
    rw_primitive!(read_u16, write_u16, u16);
    rw_primitive!(read_u32, write_u32, u32);
    rw_primitive!(read_u64, write_u64, u64);
    rw_primitive!(read_u128, write_u128, u128);

    /// Zero `len` bytes starting at `addr`, materializing CoW pages as
    /// needed.
    pub fn memzero(&mut self, addr: u64, len: u64) -> RvResult<()> {
        self.memset(addr, 0, len)
    }

    pub fn memset(&mut self, addr: u64, value: u8, len: u64) -> RvResult<()> {
        self.check_access(addr, len, AccessKind::Write)?;
        let mut done = 0u64;
        while done < len {
            let cur = addr + done;
            let pageno = page_number(cur);
            let offset = page_offset(cur) as usize;
            let n = ((PAGE_SIZE as usize - offset) as u64).min(len - done) as usize;
            let page = self.create_writable_pageno(pageno);
            page.make_mut()[offset..offset + n].fill(value);
            done += n as u64;
        }
        Ok(())
    }

    /// Gather-scatter copy within this memory.
    /// Reads the whole source range into a scratch buffer first so that
    /// overlapping regions behave like `memmove`.
    pub fn memcpy(&mut self, dst: u64, src: u64, len: u64) -> RvResult<()> {
        let mut buf = vec![0u8; len as usize];
        self.read_bytes(src, &mut buf)?;
        self.write_bytes(dst, &buf)
    }

    /// Cross-machine copy: `memcpy(dst_machine, src_machine, …)`.
    pub fn memcpy_from(&mut self, dst: u64, src_mem: &mut Memory, src: u64, len: u64) -> RvResult<()> {
        let mut buf = vec![0u8; len as usize];
        src_mem.read_bytes(src, &mut buf)?;
        self.write_bytes(dst, &buf)
    }

    /// Read a NUL-terminated string, at most `max_len` bytes, crossing
    /// pages.
    pub fn memstring(&mut self, addr: u64, max_len: u64) -> RvResult<Vec<u8>> {
        let mut out = Vec::new();
        let mut cur = addr;
        while (out.len() as u64) < max_len {
            let byte = self.read_u8(cur)?;
            if byte == 0 {
                return Ok(out);
            }
            out.push(byte);
            cur += 1;
        }
        // Ran past max_len without finding a NUL. Only a fault if the next
        // byte is actually unreadable; a string that simply runs on into
        // still-mapped memory is truncated, not an error.
        self.read_u8(cur)?;
        Ok(out)
    }

    /// A possibly-non-contiguous view over `[addr, addr+len)`, capped to
    /// `max` bytes.
    pub fn rvbuffer(&mut self, addr: u64, len: u64, max: u64) -> RvResult<RvBuffer<'_>> {
        let len = len.min(max);
        self.check_access(addr, len, AccessKind::Read)?;
        let pageno = page_number(addr);
        let offset = page_offset(addr) as usize;
        if offset as u64 + len <= PAGE_SIZE {
            // Single page: fetch (caching) then borrow straight out of
            // the canonical map so the slice can outlive this call.
            self.page_for_read(pageno);
            let page = self.pages.entry(pageno).or_insert_with(Page::cow_zero);
            let bytes = page.data();
            return Ok(RvBuffer::Sequential(&bytes[offset..offset + len as usize]));
        }
        let mut buf = vec![0u8; len as usize];
        self.read_bytes(addr, &mut buf)?;
        Ok(RvBuffer::Gathered(buf))
    }

    /// Iovec-style gather for syscalls like `writev`.
    pub fn gather_buffers(&mut self, addr: u64, len: u64) -> RvResult<Vec<Vec<u8>>> {
        // Returned as owned chunks (one per page crossed) rather than
        // borrowed slices: the page map may reallocate between calls and
        // syscalls hand these straight to host `writev`.
        self.check_access(addr, len, AccessKind::Read)?;
        let mut out = Vec::new();
        let mut done = 0u64;
        while done < len {
            let cur = addr + done;
            let pageno = page_number(cur);
            let offset = page_offset(cur) as usize;
            let n = ((PAGE_SIZE as usize - offset) as u64).min(len - done) as usize;
            let page = self.page_for_read(pageno);
            out.push(page.data()[offset..offset + n].to_vec());
            done += n as u64;
        }
        Ok(out)
    }

    /// Writable counterpart of [`Memory::gather_buffers`], used by
    /// `readv`/file-backed `mmap`.
    pub fn gather_buffers_mut(&mut self, addr: u64, len: u64) -> RvResult<Vec<(u64, usize)>> {
        self.check_access(addr, len, AccessKind::Write)?;
        let mut out = Vec::new();
        let mut done = 0u64;
        while done < len {
            let cur = addr + done;
            let pageno = page_number(cur);
            let offset = page_offset(cur) as usize;
            let n = ((PAGE_SIZE as usize - offset) as u64).min(len - done) as usize;
            self.create_writable_pageno(pageno);
            out.push((page_base(pageno) + offset as u64, n));
            done += n as u64;
        }
        Ok(out)
    }

    /// Change the attributes of every page covering `[addr, addr+len)`,
    /// creating pages as needed. Invalidates the read cache.
    pub fn set_page_attr(&mut self, addr: u64, len: u64, attr: PageAttr) -> RvResult<()> {
        if len == 0 {
            return Ok(());
        }
        let first = page_number(addr);
        let last = page_number(addr + len - 1);
        for pageno in first..=last {
            let page = self.pages.entry(pageno).or_insert_with(|| Page::zeroed(attr));
            page.attr = attr;
        }
        self.cache.invalidate_reset();
        Ok(())
    }

    /// Install a non-owning page, e.g. shared ROdata across forks.
    pub fn install_shared_page(&mut self, pageno: u64, mut page: Page) {
        page.attr |= PageAttr::NON_OWNING;
        self.pages.insert(pageno, page);
        self.cache.invalidate_reset();
    }

    /// Unmap `[addr, addr+len)`.
    pub fn free_pages(&mut self, addr: u64, len: u64) {
        if len == 0 {
            return;
        }
        let first = page_number(addr);
        let last = page_number(addr + len - 1);
        for pageno in first..=last {
            self.pages.remove(&pageno);
        }
        self.cache.invalidate_reset();
    }

    /// Load raw bytes directly into the page map, bypassing protection
    /// checks: used exclusively by the ELF loader to populate segments.
    pub fn load_bytes(&mut self, addr: u64, bytes: &[u8], attr: PageAttr) -> RvResult<()> {
        if let Some(arena) = &mut self.arena {
            return arena.load_bytes(addr, bytes).map(|_| ());
        }
        let mut done = 0usize;
        while done < bytes.len() {
            let cur = addr + done as u64;
            let pageno = page_number(cur);
            let offset = page_offset(cur) as usize;
            let n = (PAGE_SIZE as usize - offset).min(bytes.len() - done);
            let page = self.pages.entry(pageno).or_insert_with(|| Page::zeroed(attr));
            page.attr = attr;
            page.make_mut()[offset..offset + n].copy_from_slice(&bytes[done..done + n]);
            done += n;
        }
        self.cache.invalidate_reset();
        Ok(())
    }

    /// Construct a child's page map for `fork()`: every page owned by
    /// `self` is shared into the child and both copies are marked
    /// `IS_COW` (and stripped of `WRITE` is *not* necessary — see
    /// `page.rs`'s `make_mut`, which materializes lazily on first write).
    /// Pages marked `DONT_FORK` are dropped from the child.
    pub fn fork_into_child(&mut self) -> Memory {
        let mut child = Memory::new(self.memory_max);
        child.start_address = self.start_address;
        child.stack_address = self.stack_address;
        child.mmap_start = self.mmap_start;
        child.mmap_address = self.mmap_address;
        child.heap_address = self.heap_address;
        child.exit_address = self.exit_address;

        for (pageno, page) in &mut self.pages {
            if page.attr.contains(PageAttr::DONT_FORK) {
                continue;
            }
            if !page.attr.contains(PageAttr::NON_OWNING) {
                page.attr |= PageAttr::IS_COW;
            }
            child.pages.insert(*pageno, page.clone());
        }
        self.cache.invalidate_reset();
        child
    }

    pub fn invalidate_reset_cache(&mut self) {
        self.cache.invalidate_reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_after_write_roundtrip() {
        let mut mem = Memory::new(1 << 20);
        mem.write_u32(0x2000, 0xdead_beef).unwrap();
        assert_eq!(mem.read_u32(0x2000).unwrap(), 0xdead_beef);
    }

    #[test]
    fn write_crossing_page_boundary() {
        let mut mem = Memory::new(1 << 20);
        let addr = PAGE_SIZE - 2;
        mem.write_u32(addr, 0x1122_3344).unwrap();
        assert_eq!(mem.read_u32(addr).unwrap(), 0x1122_3344);
    }

    #[test]
    fn unmapped_read_is_zero() {
        let mut mem = Memory::new(1 << 20);
        assert_eq!(mem.read_u64(0x5000).unwrap(), 0);
    }

    #[test]
    fn write_without_permission_faults() {
        let mut mem = Memory::new(1 << 20);
        mem.set_page_attr(0x3000, PAGE_SIZE, PageAttr::READ).unwrap();
        let err = mem.write_u8(0x3000, 7).unwrap_err();
        assert!(matches!(err, RvError::ProtectionFault { access: AccessKind::Write, .. }));
    }

    #[test]
    fn read_without_permission_faults() {
        let mut mem = Memory::new(1 << 20);
        mem.set_page_attr(0x4000, PAGE_SIZE, PageAttr::empty()).unwrap();
        let err = mem.read_u8(0x4000).unwrap_err();
        assert!(matches!(err, RvError::ProtectionFault { access: AccessKind::Read, .. }));
    }

    #[test]
    fn set_page_attr_then_read_observes_it() {
        let mut mem = Memory::new(1 << 20);
        mem.write_u8(0x6000, 1).unwrap();
        mem.set_page_attr(0x6000, PAGE_SIZE, PageAttr::empty()).unwrap();
        assert!(mem.read_u8(0x6000).is_err());
    }

    #[test]
    fn fork_preserves_other_sides_view() {
        let mut parent = Memory::new(1 << 20);
        parent.write_u32(0x7000, 111).unwrap();
        let mut child = parent.fork_into_child();
        assert_eq!(child.read_u32(0x7000).unwrap(), 111);

        child.write_u32(0x7000, 222).unwrap();
        assert_eq!(child.read_u32(0x7000).unwrap(), 222);
        assert_eq!(parent.read_u32(0x7000).unwrap(), 111);
    }

    #[test]
    fn dont_fork_page_dropped_from_child() {
        let mut parent = Memory::new(1 << 20);
        parent.write_u32(0x8000, 1).unwrap();
        parent.set_page_attr(0x8000, PAGE_SIZE, PageAttr::READ | PageAttr::WRITE | PageAttr::DONT_FORK).unwrap();
        let mut child = parent.fork_into_child();
        assert_eq!(child.read_u32(0x8000).unwrap(), 0);
    }

    #[test]
    fn memcpy_gather_scatter() {
        let mut mem = Memory::new(1 << 20);
        mem.write_bytes(0x9000, b"hello world").unwrap();
        mem.memcpy(0xa000, 0x9000, 11).unwrap();
        let mut out = [0u8; 11];
        mem.read_bytes(0xa000, &mut out).unwrap();
        assert_eq!(&out, b"hello world");
    }

    #[test]
    fn memstring_reads_until_nul() {
        let mut mem = Memory::new(1 << 20);
        mem.write_bytes(0xb000, b"hi\0").unwrap();
        assert_eq!(mem.memstring(0xb000, 64).unwrap(), b"hi");
    }

    #[test]
    fn memstring_running_past_max_len_into_mapped_memory_truncates_without_fault() {
        let mut mem = Memory::new(1 << 20);
        mem.set_page_attr(0xc000, PAGE_SIZE, PageAttr::READ | PageAttr::WRITE).unwrap();
        mem.write_bytes(0xc000, &[1u8; PAGE_SIZE as usize]).unwrap();
        // The page after 0xc000 was never mapped, so it reads as the CoW
        // zero page (readable) rather than faulting — the string is just
        // truncated at max_len.
        let out = mem.memstring(0xc000, PAGE_SIZE).unwrap();
        assert_eq!(out, vec![1u8; PAGE_SIZE as usize]);
    }

    #[test]
    fn memstring_unterminated_faults_when_the_next_byte_is_unreadable() {
        let mut mem = Memory::new(1 << 20);
        mem.set_page_attr(0xc000, PAGE_SIZE, PageAttr::READ | PageAttr::WRITE).unwrap();
        mem.write_bytes(0xc000, &[1u8; PAGE_SIZE as usize]).unwrap();
        // Explicitly revoke READ on the following page instead of leaving
        // it unmapped, so the byte right after max_len is genuinely
        // unreadable and memstring must fault.
        mem.set_page_attr(0xc000 + PAGE_SIZE, PAGE_SIZE, PageAttr::empty()).unwrap();
        let err = mem.memstring(0xc000, PAGE_SIZE).unwrap_err();
        assert!(matches!(err, RvError::ProtectionFault { access: AccessKind::Read, .. }));
    }

    #[test]
    fn install_shared_page_is_read_only_shared() {
        let mut mem = Memory::new(1 << 20);
        let page = Page::from_bytes(PageAttr::READ, {
            let mut b = [0u8; PAGE_SIZE as usize];
            b[0] = 42;
            b
        });
        mem.install_shared_page(5, page);
        assert_eq!(mem.read_u8(page_base(5)).unwrap(), 42);
        assert!(mem.write_u8(page_base(5), 1).is_err());
    }
}
