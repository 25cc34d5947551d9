//! A single 4096-byte page frame plus its attributes.

use bitflags::bitflags;
use std::sync::Arc;

pub const PAGE_SIZE: u64 = 4096;
pub const PAGE_SHIFT: u32 = 12;

pub type PageBytes = [u8; PAGE_SIZE as usize];

bitflags! {
    /// Per-page permission and bookkeeping flags. A plain `bitflags!` set
    /// instead of six loose bools, sourced the way the
    /// pack's kernel examples model hardware/segment flags.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct PageAttr: u16 {
        const READ       = 0b0000_0001;
        const WRITE      = 0b0000_0010;
        const EXEC       = 0b0000_0100;
        const IS_COW      = 0b0000_1000;
        const NON_OWNING  = 0b0001_0000;
        const DONT_FORK   = 0b0010_0000;
        const CACHEABLE   = 0b0100_0000;
    }
}

impl Default for PageAttr {
    fn default() -> Self {
        PageAttr::READ | PageAttr::WRITE
    }
}

impl PageAttr {
    pub fn from_prot(prot: u32) -> Self {
        let mut attr = PageAttr::empty();
        if prot & 0b001 != 0 {
            attr |= PageAttr::READ;
        }
        if prot & 0b010 != 0 {
            attr |= PageAttr::WRITE;
        }
        if prot & 0b100 != 0 {
            attr |= PageAttr::EXEC;
        }
        attr
    }

    pub fn readonly() -> Self {
        PageAttr::READ
    }
    pub fn exec_only() -> Self {
        PageAttr::READ | PageAttr::EXEC
    }
}

/// Callback invoked on access to a trap page: `(mode, offset, value)` for
/// writes, `(mode, offset, 0)` for reads.
/// Trap pages defeat the read cache and the flat-arena fast path.
pub type TrapFn = Arc<dyn Fn(TrapMode, u64, u64) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapMode {
    Read,
    Write,
}

/// A page's backing bytes, uniformly `Arc`-held. Two pages can point at
/// the same allocation (fork's copy-on-write sharing, or an installed
/// shared page); a write always goes through [`Arc::make_mut`], which
/// transparently clones the buffer the first time it is shared and
/// mutates in place thereafter — this *is* the copy-on-write mechanism,
/// not a side effect of it.
#[derive(Clone)]
pub struct Page {
    pub attr: PageAttr,
    data: Arc<PageBytes>,
    pub trap: Option<TrapFn>,
}

impl Page {
    pub fn new(attr: PageAttr, data: Arc<PageBytes>) -> Self {
        Self { attr, data, trap: None }
    }

    pub fn zeroed(attr: PageAttr) -> Self {
        Self::new(attr, Arc::new([0u8; PAGE_SIZE as usize]))
    }

    pub fn from_bytes(attr: PageAttr, bytes: PageBytes) -> Self {
        Self::new(attr, Arc::new(bytes))
    }

    /// A shared, read-only page of all zeros. Writing through it
    /// materializes a private copy.
    pub fn cow_zero() -> Self {
        static ZERO: once_cell::sync::Lazy<Arc<PageBytes>> =
            once_cell::sync::Lazy::new(|| Arc::new([0u8; PAGE_SIZE as usize]));
        Self { attr: PageAttr::READ | PageAttr::WRITE | PageAttr::IS_COW, data: ZERO.clone(), trap: None }
    }

    /// A page that is never readable, writable or executable: used as
    /// the flat-arena guard and as a sentinel for unmapped middle pages.
    pub fn guard() -> Self {
        static GUARD: once_cell::sync::Lazy<Arc<PageBytes>> =
            once_cell::sync::Lazy::new(|| Arc::new([0u8; PAGE_SIZE as usize]));
        Self { attr: PageAttr::empty(), data: GUARD.clone(), trap: None }
    }

    pub fn is_cow_page(&self) -> bool {
        self.attr.contains(PageAttr::IS_COW)
    }

    pub fn data(&self) -> &PageBytes {
        &self.data
    }

    pub fn data_arc(&self) -> &Arc<PageBytes> {
        &self.data
    }

    /// Obtain a mutable view of this page's bytes, cloning the backing
    /// allocation if it is still shared with another page (fork sibling,
    /// or an installed shared page) and clearing `IS_COW` once the
    /// caller holds an exclusive copy.
    pub fn make_mut(&mut self) -> &mut PageBytes {
        let exclusive = Arc::get_mut(&mut self.data).is_some();
        if !exclusive {
            self.data = Arc::new(*self.data);
        }
        self.attr.remove(PageAttr::IS_COW);
        Arc::get_mut(&mut self.data).expect("just made exclusive")
    }
}

#[inline]
pub fn page_number(addr: u64) -> u64 {
    addr >> PAGE_SHIFT
}

#[inline]
pub fn page_offset(addr: u64) -> u64 {
    addr & (PAGE_SIZE - 1)
}

#[inline]
pub fn page_base(pageno: u64) -> u64 {
    pageno << PAGE_SHIFT
}
