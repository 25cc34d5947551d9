//! Hand-assembles minimal ELF64 images for the scenario tests, so they
//! don't need to ship or compile a real guest toolchain output. Mirrors
//! the layout `riscv_core::elf`'s own fixtures use, generalized to admit
//! an arbitrary symbol table.

const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];
const ET_EXEC: u16 = 2;
const PT_LOAD: u32 = 1;
const SHT_SYMTAB: u32 = 2;
const SHT_STRTAB: u32 = 3;

/// One `PT_LOAD` segment: code/data bytes mapped at `vaddr` with the
/// given `p_flags` (bit 0 = X, bit 1 = W, bit 2 = R, matching ELF).
pub struct Segment {
    pub vaddr: u64,
    pub flags: u32,
    pub bytes: Vec<u8>,
}

pub const PF_X: u32 = 1;
pub const PF_W: u32 = 2;
pub const PF_R: u32 = 4;

/// Builds a single-segment executable ELF64 image with an entry point
/// and an optional exported-symbol table.
pub fn build(entry: u64, segments: &[Segment], symbols: &[(&str, u64)]) -> Vec<u8> {
    let ehdr_size = 64usize;
    let phdr_size = 56usize;
    let phoff = ehdr_size as u64;
    let mut buf = vec![0u8; ehdr_size + phdr_size * segments.len()];

    buf[0..4].copy_from_slice(&ELF_MAGIC);
    buf[4] = 2; // ELFCLASS64
    buf[16..18].copy_from_slice(&ET_EXEC.to_le_bytes());
    buf[24..32].copy_from_slice(&entry.to_le_bytes());
    buf[32..40].copy_from_slice(&phoff.to_le_bytes());
    buf[54..56].copy_from_slice(&(phdr_size as u16).to_le_bytes());
    buf[56..58].copy_from_slice(&(segments.len() as u16).to_le_bytes());

    let mut data_offsets = Vec::with_capacity(segments.len());
    let mut cursor = buf.len() as u64;
    for seg in segments {
        data_offsets.push(cursor);
        cursor += seg.bytes.len() as u64;
    }

    for (i, seg) in segments.iter().enumerate() {
        let ph = ehdr_size + i * phdr_size;
        buf[ph..ph + 4].copy_from_slice(&PT_LOAD.to_le_bytes());
        buf[ph + 4..ph + 8].copy_from_slice(&seg.flags.to_le_bytes());
        buf[ph + 8..ph + 16].copy_from_slice(&data_offsets[i].to_le_bytes());
        buf[ph + 16..ph + 24].copy_from_slice(&seg.vaddr.to_le_bytes());
        buf[ph + 32..ph + 40].copy_from_slice(&(seg.bytes.len() as u64).to_le_bytes());
        buf[ph + 40..ph + 48].copy_from_slice(&(seg.bytes.len() as u64).to_le_bytes());
    }
    for seg in segments {
        buf.extend_from_slice(&seg.bytes);
    }

    if symbols.is_empty() {
        return buf;
    }

    // strtab: leading NUL, then each name NUL-terminated.
    let strtab_off = buf.len() as u64;
    let mut strtab = vec![0u8];
    let mut name_offsets = Vec::with_capacity(symbols.len());
    for (name, _) in symbols {
        name_offsets.push(strtab.len() as u32);
        strtab.extend_from_slice(name.as_bytes());
        strtab.push(0);
    }
    buf.extend_from_slice(&strtab);
    let strtab_size = strtab.len() as u64;

    let symtab_off = buf.len() as u64;
    buf.extend_from_slice(&[0u8; 24]); // null symbol
    for (i, (_, addr)) in symbols.iter().enumerate() {
        let mut sym = [0u8; 24];
        sym[0..4].copy_from_slice(&name_offsets[i].to_le_bytes());
        sym[8..16].copy_from_slice(&addr.to_le_bytes());
        buf.extend_from_slice(&sym);
    }
    let symtab_size = (symbols.len() as u64 + 1) * 24;

    let shoff = buf.len() as u64;
    buf.extend_from_slice(&[0u8; 64]); // section 0: null

    let mut strtab_shdr = [0u8; 64];
    strtab_shdr[4..8].copy_from_slice(&SHT_STRTAB.to_le_bytes());
    strtab_shdr[24..32].copy_from_slice(&strtab_off.to_le_bytes());
    strtab_shdr[32..40].copy_from_slice(&strtab_size.to_le_bytes());
    buf.extend_from_slice(&strtab_shdr);

    let mut symtab_shdr = [0u8; 64];
    symtab_shdr[4..8].copy_from_slice(&SHT_SYMTAB.to_le_bytes());
    symtab_shdr[24..32].copy_from_slice(&symtab_off.to_le_bytes());
    symtab_shdr[32..40].copy_from_slice(&symtab_size.to_le_bytes());
    symtab_shdr[40..44].copy_from_slice(&1u32.to_le_bytes()); // sh_link -> strtab (section index 1)
    buf.extend_from_slice(&symtab_shdr);

    buf[40..48].copy_from_slice(&shoff.to_le_bytes());
    buf[58..60].copy_from_slice(&64u16.to_le_bytes());
    buf[60..62].copy_from_slice(&3u16.to_le_bytes());

    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use riscv_core::elf;
    use riscv_core::xlen::Rv64;
    use riscv_core::{Cpu, Memory};

    #[test]
    fn roundtrips_through_the_loader() {
        let code = crate::asm::assemble(&[crate::asm::li(crate::asm::A0, 1), crate::asm::ret()]);
        let image = build(
            0x1000,
            &[Segment { vaddr: 0x1000, flags: PF_R | PF_X, bytes: code }],
            &[("hello", 0x1000)],
        );
        let mut mem = Memory::new(1 << 20);
        let mut cpu = Cpu::<Rv64>::new();
        let loaded = elf::load::<Rv64>(&image, &mut mem, &mut cpu, false).unwrap();
        assert_eq!(loaded.address_of("hello"), Some(0x1000));
    }
}
