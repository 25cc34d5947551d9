//! ELF32/64/128 loader. Parses just enough of the header
//! and program-header table to map `PT_LOAD` segments into a
//! [`Memory`], register executable segments on a [`Cpu`], and resolve
//! the entry point and a handful of well-known symbols.
//!
//! 128-bit targets have no real ELF class of their own; `Rv128` images
//! are loaded as ELFCLASS64 and sign/zero-extended addresses, matching
//! how the rest of the core treats rv128 as "rv64 plus wider registers"
//! rather than a distinct wire format.

use crate::cpu::{Cpu, ExecSegment};
use crate::decoder::HasHookSlot;
use crate::error::{RvError, RvResult};
use crate::memory::page::PageAttr;
use crate::memory::Memory;
use crate::xlen::{Word, Xlen};

const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];
const ET_EXEC: u16 = 2;
const ET_DYN: u16 = 3;
const PT_LOAD: u32 = 1;
const SHT_SYMTAB: u32 = 2;
const SHT_DYNSYM: u32 = 11;

/// A resolved `(name, address)` pair, e.g. from the symbol table or a
/// bracket-style `[name]` note the image carries for tooling that can't
/// read DWARF.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub address: u64,
}

/// Where the loader starts mapping a position-independent image when
/// `allow_pie` is set.
pub const DEFAULT_PIE_BASE: u64 = 0x10000;

pub struct LoadedImage {
    pub entry: u64,
    pub bss_start: u64,
    pub bss_end: u64,
    pub symbols: Vec<Symbol>,
}

impl LoadedImage {
    /// Resolve a symbol by exact name, or by the bracketed form `[name]`
    /// some guest images use to mark an exported entry point.
    pub fn address_of(&self, name: &str) -> Option<u64> {
        self.symbols
            .iter()
            .find(|s| s.name == name || s.name == format!("[{name}]"))
            .map(|s| s.address)
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
}

impl<'a> Reader<'a> {
    fn at(&self, offset: usize, len: usize) -> RvResult<&'a [u8]> {
        self.bytes
            .get(offset..offset + len)
            .ok_or_else(|| RvError::InvalidProgram { message: format!("truncated ELF at offset {offset}") })
    }
    fn u16(&self, offset: usize) -> RvResult<u16> {
        Ok(u16::from_le_bytes(self.at(offset, 2)?.try_into().unwrap()))
    }
    fn u32(&self, offset: usize) -> RvResult<u32> {
        Ok(u32::from_le_bytes(self.at(offset, 4)?.try_into().unwrap()))
    }
    fn u64(&self, offset: usize) -> RvResult<u64> {
        Ok(u64::from_le_bytes(self.at(offset, 8)?.try_into().unwrap()))
    }
    fn cstr(&self, offset: usize) -> String {
        let end = self.bytes[offset..].iter().position(|&b| b == 0).map_or(self.bytes.len(), |p| offset + p);
        String::from_utf8_lossy(&self.bytes[offset..end]).into_owned()
    }
}

/// Walks the section-header table for a `SYMTAB`/`DYNSYM` section and
/// resolves each entry's name via its linked string table. Images with no section headers (stripped, or a
/// hand-built test fixture) simply yield no symbols.
fn parse_symbols(r: &Reader, is64: bool, base_offset: u64) -> RvResult<Vec<Symbol>> {
    let (e_shoff, e_shentsize, e_shnum) = if is64 {
        (r.u64(40)?, r.u16(58)?, r.u16(60)?)
    } else {
        (u64::from(r.u32(32)?), r.u16(46)?, r.u16(48)?)
    };
    if e_shoff == 0 || e_shnum == 0 {
        return Ok(Vec::new());
    }

    let shdr = |i: usize| e_shoff as usize + i * e_shentsize as usize;
    let (sh_type_off, sh_offset_off, sh_size_off, sh_link_off) = if is64 { (4, 24, 32, 40) } else { (4, 16, 20, 24) };

    let mut symtab = None;
    for i in 0..e_shnum as usize {
        let base = shdr(i);
        let sh_type = r.u32(base + sh_type_off)?;
        if sh_type == SHT_SYMTAB || sh_type == SHT_DYNSYM {
            let sh_offset = if is64 { r.u64(base + sh_offset_off)? } else { u64::from(r.u32(base + sh_offset_off)?) };
            let sh_size = if is64 { r.u64(base + sh_size_off)? } else { u64::from(r.u32(base + sh_size_off)?) };
            let sh_link = r.u32(base + sh_link_off)?;
            symtab = Some((sh_offset, sh_size, sh_link));
            break;
        }
    }
    let Some((sym_off, sym_size, link)) = symtab else {
        return Ok(Vec::new());
    };

    let str_base = shdr(link as usize);
    let str_off = if is64 { r.u64(str_base + sh_offset_off)? } else { u64::from(r.u32(str_base + sh_offset_off)?) };

    let sym_entsize = if is64 { 24usize } else { 16usize };
    let count = sym_size as usize / sym_entsize;
    let mut symbols = Vec::new();
    for i in 0..count {
        let base = sym_off as usize + i * sym_entsize;
        let st_name = r.u32(base)?;
        if st_name == 0 {
            continue;
        }
        let st_value = if is64 { r.u64(base + 8)? } else { u64::from(r.u32(base + 4)?) };
        let name = r.cstr(str_off as usize + st_name as usize);
        symbols.push(Symbol { name, address: st_value + base_offset });
    }
    Ok(symbols)
}

/// Parses `image` and installs its `PT_LOAD` segments into `mem` and
/// `cpu`. `allow_pie` permits `ET_DYN` images, relocated to
/// [`DEFAULT_PIE_BASE`]; without it an `ET_DYN` image is an
/// `InvalidProgram`.
pub fn load<X: HasHookSlot>(
    image: &[u8],
    mem: &mut Memory,
    cpu: &mut Cpu<X>,
    allow_pie: bool,
) -> RvResult<LoadedImage> {
    let r = Reader { bytes: image };
    if image.len() < 20 || image[0..4] != ELF_MAGIC {
        return Err(RvError::InvalidProgram { message: "missing ELF magic".into() });
    }
    let class = image[4];
    let is64 = match class {
        1 => false, // ELFCLASS32
        2 => true,  // ELFCLASS64 (also used to carry Rv128 images)
        _ => return Err(RvError::InvalidProgram { message: format!("unsupported ELF class {class}") }),
    };
    if is64 != (X::WORD_BYTES >= 8) {
        return Err(RvError::InvalidProgram {
            message: format!("ELF class does not match {}", X::NAME),
        });
    }

    let e_type = r.u16(16)?;
    let mut base_offset = 0u64;
    if e_type == ET_DYN {
        if !allow_pie {
            return Err(RvError::InvalidProgram { message: "PIE image rejected (allow_pie is false)".into() });
        }
        base_offset = DEFAULT_PIE_BASE;
    } else if e_type != ET_EXEC {
        return Err(RvError::InvalidProgram { message: format!("unsupported e_type {e_type}") });
    }

    let (e_entry, e_phoff, e_phentsize, e_phnum) = if is64 {
        (r.u64(24)?, r.u64(32)?, r.u16(54)?, r.u16(56)?)
    } else {
        (u64::from(r.u32(24)?), u64::from(r.u32(28)?), r.u16(42)?, r.u16(44)?)
    };

    let mut bss_start = u64::MAX;
    let mut bss_end = 0u64;

    for i in 0..e_phnum as usize {
        let ph_off = e_phoff as usize + i * e_phentsize as usize;
        let p_type = r.u32(ph_off)?;
        if p_type != PT_LOAD {
            continue;
        }
        let (p_flags, p_offset, p_vaddr, p_filesz, p_memsz) = if is64 {
            (r.u32(ph_off + 4)?, r.u64(ph_off + 8)?, r.u64(ph_off + 16)?, r.u64(ph_off + 32)?, r.u64(ph_off + 40)?)
        } else {
            (
                r.u32(ph_off + 24)?,
                u64::from(r.u32(ph_off + 4)?),
                u64::from(r.u32(ph_off + 8)?),
                u64::from(r.u32(ph_off + 16)?),
                u64::from(r.u32(ph_off + 20)?),
            )
        };
        let vaddr = p_vaddr + base_offset;
        let file_bytes = r.at(p_offset as usize, p_filesz as usize)?;
        let attr = elf_prot_to_attr(p_flags);

        mem.load_bytes(vaddr, file_bytes, attr)?;
        if p_memsz > p_filesz {
            let zero_start = vaddr + p_filesz;
            let zero_len = p_memsz - p_filesz;
            mem.set_page_attr(zero_start, zero_len, attr)?;
            mem.memzero(zero_start, zero_len)?;
            bss_start = bss_start.min(zero_start);
            bss_end = bss_end.max(zero_start + zero_len);
        }

        if attr.contains(PageAttr::EXEC) {
            cpu.add_segment(ExecSegment::new(vaddr, file_bytes.to_vec()));
        }
    }

    if bss_start == u64::MAX {
        bss_start = 0;
        bss_end = 0;
    }

    let entry = e_entry + base_offset;
    mem.set_start_address(entry);
    let _ = X::Unsigned::from_u64(entry); // validated representable in this XLEN

    let symbols = parse_symbols(&r, is64, base_offset)?;
    Ok(LoadedImage { entry, bss_start, bss_end, symbols })
}

fn elf_prot_to_attr(p_flags: u32) -> PageAttr {
    const PF_X: u32 = 1;
    const PF_W: u32 = 2;
    const PF_R: u32 = 4;
    let mut attr = PageAttr::empty();
    if p_flags & PF_R != 0 {
        attr |= PageAttr::READ;
    }
    if p_flags & PF_W != 0 {
        attr |= PageAttr::WRITE;
    }
    if p_flags & PF_X != 0 {
        attr |= PageAttr::EXEC;
    }
    attr
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xlen::Rv64;

    fn minimal_elf64(entry: u64, code: &[u8]) -> Vec<u8> {
        let mut buf = vec![0u8; 64 + 56];
        buf[0..4].copy_from_slice(&ELF_MAGIC);
        buf[4] = 2; // ELFCLASS64
        buf[16..18].copy_from_slice(&ET_EXEC.to_le_bytes());
        buf[24..32].copy_from_slice(&entry.to_le_bytes());
        buf[32..40].copy_from_slice(&64u64.to_le_bytes()); // e_phoff
        buf[54..56].copy_from_slice(&56u16.to_le_bytes()); // e_phentsize
        buf[56..58].copy_from_slice(&1u16.to_le_bytes()); // e_phnum

        let ph = 64usize;
        buf[ph..ph + 4].copy_from_slice(&PT_LOAD.to_le_bytes());
        buf[ph + 4..ph + 8].copy_from_slice(&5u32.to_le_bytes()); // PF_R | PF_X
        let data_off = buf.len() as u64;
        buf[ph + 8..ph + 16].copy_from_slice(&data_off.to_le_bytes()); // p_offset
        buf[ph + 16..ph + 24].copy_from_slice(&entry.to_le_bytes()); // p_vaddr
        buf[ph + 32..ph + 40].copy_from_slice(&(code.len() as u64).to_le_bytes()); // p_filesz
        buf[ph + 40..ph + 48].copy_from_slice(&(code.len() as u64).to_le_bytes()); // p_memsz
        buf.extend_from_slice(code);
        buf
    }

    #[test]
    fn loads_minimal_executable_and_registers_segment() {
        let code = [0x13, 0x00, 0x00, 0x00]; // addi x0, x0, 0
        let image = minimal_elf64(0x1000, &code);
        let mut mem = Memory::new(1 << 20);
        let mut cpu = Cpu::<Rv64>::new();
        let loaded = load::<Rv64>(&image, &mut mem, &mut cpu, false).unwrap();
        assert_eq!(loaded.entry, 0x1000);
        assert_eq!(cpu.segments().len(), 1);
        assert_eq!(mem.fetch_u32(0x1000).unwrap(), 0x13);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut mem = Memory::new(1 << 20);
        let mut cpu = Cpu::<Rv64>::new();
        let err = load::<Rv64>(&[0u8; 64], &mut mem, &mut cpu, false).unwrap_err();
        assert!(matches!(err, RvError::InvalidProgram { .. }));
    }

    #[test]
    fn resolves_symbol_table_entries() {
        let code = [0x13, 0x00, 0x00, 0x00];
        let mut buf = minimal_elf64(0x1000, &code);

        // strtab: "\0hello\0"
        let strtab_off = buf.len() as u64;
        buf.extend_from_slice(b"\0hello\0");

        // symtab: one null entry, one real entry naming "hello" at 0x1000.
        let symtab_off = buf.len() as u64;
        buf.extend_from_slice(&[0u8; 24]); // null symbol
        let mut sym = [0u8; 24];
        sym[0..4].copy_from_slice(&1u32.to_le_bytes()); // st_name -> offset 1 ("hello")
        sym[8..16].copy_from_slice(&0x1000u64.to_le_bytes()); // st_value
        buf.extend_from_slice(&sym);

        // section headers: [0]=null, [1]=strtab, [2]=symtab (sh_link -> 1)
        let shoff = buf.len() as u64;
        buf.extend_from_slice(&[0u8; 64]); // null section

        let mut strtab_shdr = [0u8; 64];
        strtab_shdr[4..8].copy_from_slice(&3u32.to_le_bytes()); // SHT_STRTAB
        strtab_shdr[24..32].copy_from_slice(&strtab_off.to_le_bytes());
        strtab_shdr[32..40].copy_from_slice(&7u64.to_le_bytes());
        buf.extend_from_slice(&strtab_shdr);

        let mut symtab_shdr = [0u8; 64];
        symtab_shdr[4..8].copy_from_slice(&SHT_SYMTAB.to_le_bytes());
        symtab_shdr[24..32].copy_from_slice(&symtab_off.to_le_bytes());
        symtab_shdr[32..40].copy_from_slice(&48u64.to_le_bytes()); // two 24-byte entries
        symtab_shdr[40..44].copy_from_slice(&1u32.to_le_bytes()); // sh_link -> strtab index
        buf.extend_from_slice(&symtab_shdr);

        buf[40..48].copy_from_slice(&shoff.to_le_bytes()); // e_shoff
        buf[58..60].copy_from_slice(&64u16.to_le_bytes()); // e_shentsize
        buf[60..62].copy_from_slice(&3u16.to_le_bytes()); // e_shnum

        let mut mem = Memory::new(1 << 20);
        let mut cpu = Cpu::<Rv64>::new();
        let loaded = load::<Rv64>(&buf, &mut mem, &mut cpu, false).unwrap();
        assert_eq!(loaded.address_of("hello"), Some(0x1000));
    }
}
