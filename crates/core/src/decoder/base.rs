//! RV32I/RV64I base integer instruction set, plus `FENCE`/`FENCE.I`,
//! `ECALL`/`EBREAK`, and the RV64 `*W` word-width variants.

use super::fields::*;
use super::{HandlerFn, PrinterFn};
use crate::cpu::Cpu;
use crate::error::{RvError, RvResult};
use crate::memory::Memory;
use crate::registers::{REG_RA, REG_ZERO};
use crate::xlen::{Word, Xlen};

const OP_LOAD: u32 = 0x03;
const OP_MISC_MEM: u32 = 0x0f;
const OP_IMM: u32 = 0x13;
const OP_AUIPC: u32 = 0x17;
const OP_IMM_32: u32 = 0x1b;
const OP_STORE: u32 = 0x23;
const OP_AMO: u32 = 0x2f;
const OP_REG: u32 = 0x33;
const OP_LUI: u32 = 0x37;
const OP_32: u32 = 0x3b;
const OP_FMADD: u32 = 0x43;
const OP_FMSUB: u32 = 0x47;
const OP_FNMSUB: u32 = 0x4b;
const OP_FNMADD: u32 = 0x4f;
const OP_FP: u32 = 0x53;
const OP_BRANCH: u32 = 0x63;
const OP_JALR: u32 = 0x67;
const OP_JAL: u32 = 0x6f;
const OP_SYSTEM: u32 = 0x73;

pub fn decode<X: Xlen>(word: u32) -> Option<(HandlerFn<X>, PrinterFn)> {
    match opcode(word) {
        OP_LUI => Some((lui::<X>, |w| format!("lui x{}, 0x{:x}", rd(w), imm_u(w)))),
        OP_AUIPC => Some((auipc::<X>, |w| format!("auipc x{}, 0x{:x}", rd(w), imm_u(w)))),
        OP_JAL => Some((jal::<X>, |w| format!("jal x{}, {}", rd(w), imm_j(w)))),
        OP_JALR if funct3(word) == 0 => Some((jalr::<X>, |w| format!("jalr x{}, x{}, {}", rd(w), rs1(w), imm_i(w)))),
        OP_BRANCH => decode_branch::<X>(word),
        OP_LOAD => decode_load::<X>(word),
        OP_STORE => decode_store::<X>(word),
        OP_IMM => decode_imm::<X>(word),
        OP_IMM_32 => decode_imm32::<X>(word),
        OP_REG => super::rv_m::decode::<X>(word).or_else(|| decode_reg::<X>(word)),
        OP_32 => super::rv_m::decode_w::<X>(word).or_else(|| decode_reg32::<X>(word)),
        OP_MISC_MEM => decode_misc_mem::<X>(word),
        OP_SYSTEM => decode_system::<X>(word),
        OP_AMO => super::rv_a::decode::<X>(word),
        0x07 | 0x27 | OP_FP | OP_FMADD | OP_FMSUB | OP_FNMSUB | OP_FNMADD => super::rv_f::decode::<X>(word),
        _ => None,
    }
}

fn lui<X: Xlen>(cpu: &mut Cpu<X>, _mem: &mut Memory, w: u32) -> RvResult<()> {
    cpu.regs.set(rd(w), X::Unsigned::from_i64(imm_u(w)));
    Ok(())
}

fn auipc<X: Xlen>(cpu: &mut Cpu<X>, _mem: &mut Memory, w: u32) -> RvResult<()> {
    let pc = cpu.regs.pc();
    cpu.regs.set(rd(w), pc.wrapping_add(X::Unsigned::from_i64(imm_u(w))));
    Ok(())
}

fn jal<X: Xlen>(cpu: &mut Cpu<X>, _mem: &mut Memory, w: u32) -> RvResult<()> {
    let pc = cpu.regs.pc();
    let link = pc.wrapping_add(X::Unsigned::from_u64(4));
    cpu.regs.set(rd(w), link);
    let target = pc.wrapping_add(X::Unsigned::from_i64(imm_j(w)));
    cpu.regs.set_pc(target);
    Ok(())
}

fn jalr<X: Xlen>(cpu: &mut Cpu<X>, _mem: &mut Memory, w: u32) -> RvResult<()> {
    let pc = cpu.regs.pc();
    let link = pc.wrapping_add(X::Unsigned::from_u64(4));
    let base = cpu.regs.get(rs1(w));
    let target = base.wrapping_add(X::Unsigned::from_i64(imm_i(w))).to_u64() & !1u64;
    cpu.regs.set(rd(w), link);
    cpu.regs.set_pc(X::Unsigned::from_u64(target));
    Ok(())
}

fn decode_branch<X: Xlen>(word: u32) -> Option<(HandlerFn<X>, PrinterFn)> {
    let handler: HandlerFn<X> = match funct3(word) {
        0b000 => branch_beq::<X>,
        0b001 => branch_bne::<X>,
        0b100 => branch_blt::<X>,
        0b101 => branch_bge::<X>,
        0b110 => branch_bltu::<X>,
        0b111 => branch_bgeu::<X>,
        _ => return None,
    };
    Some((handler, |w| format!("b.. x{}, x{}, {}", rs1(w), rs2(w), imm_b(w))))
}

macro_rules! branch_fn {
    ($name:ident, $cond:expr) => {
        fn $name<X: Xlen>(cpu: &mut Cpu<X>, _mem: &mut Memory, w: u32) -> RvResult<()> {
            let a = cpu.regs.get(rs1(w));
            let b = cpu.regs.get(rs2(w));
            let taken: fn(X::Unsigned, X::Unsigned) -> bool = $cond;
            if taken(a, b) {
                let target = cpu.regs.pc().wrapping_add(X::Unsigned::from_i64(imm_b(w)));
                cpu.regs.set_pc(target);
            }
            Ok(())
        }
    };
}
branch_fn!(branch_beq, |a, b| a == b);
branch_fn!(branch_bne, |a, b| a != b);
branch_fn!(branch_bltu, |a, b| a < b);
branch_fn!(branch_bgeu, |a, b| a >= b);

fn branch_blt<X: Xlen>(cpu: &mut Cpu<X>, _mem: &mut Memory, w: u32) -> RvResult<()> {
    let a = X::to_signed(cpu.regs.get(rs1(w)));
    let b = X::to_signed(cpu.regs.get(rs2(w)));
    if a.to_i64() < b.to_i64() {
        let target = cpu.regs.pc().wrapping_add(X::Unsigned::from_i64(imm_b(w)));
        cpu.regs.set_pc(target);
    }
    Ok(())
}
fn branch_bge<X: Xlen>(cpu: &mut Cpu<X>, _mem: &mut Memory, w: u32) -> RvResult<()> {
    let a = X::to_signed(cpu.regs.get(rs1(w)));
    let b = X::to_signed(cpu.regs.get(rs2(w)));
    if a.to_i64() >= b.to_i64() {
        let target = cpu.regs.pc().wrapping_add(X::Unsigned::from_i64(imm_b(w)));
        cpu.regs.set_pc(target);
    }
    Ok(())
}

fn decode_load<X: Xlen>(word: u32) -> Option<(HandlerFn<X>, PrinterFn)> {
    let handler: HandlerFn<X> = match funct3(word) {
        0b000 => load_i8::<X>,
        0b001 => load_i16::<X>,
        0b010 => load_i32::<X>,
        0b100 => load_u8::<X>,
        0b101 => load_u16::<X>,
        0b011 if X::WORD_BYTES >= 8 => load_i64::<X>,
        0b110 if X::WORD_BYTES >= 8 => load_u32::<X>,
        _ => return None,
    };
    Some((handler, |w| format!("l.. x{}, {}(x{})", rd(w), imm_i(w), rs1(w))))
}

macro_rules! load_fn {
    ($name:ident, $mem_fn:ident, $sext:expr) => {
        fn $name<X: Xlen>(cpu: &mut Cpu<X>, mem: &mut Memory, w: u32) -> RvResult<()> {
            let addr = cpu.regs.get(rs1(w)).wrapping_add(X::Unsigned::from_i64(imm_i(w))).to_u64();
            let raw = mem.$mem_fn(addr)?;
            let sext: fn(_) -> i64 = $sext;
            cpu.regs.set(rd(w), X::Unsigned::from_i64(sext(raw)));
            Ok(())
        }
    };
}
load_fn!(load_i8, read_u8, |v: u8| v as i8 as i64);
load_fn!(load_i16, read_u16, |v: u16| v as i16 as i64);
load_fn!(load_i32, read_u32, |v: u32| v as i32 as i64);
load_fn!(load_i64, read_u64, |v: u64| v as i64);

fn load_u8<X: Xlen>(cpu: &mut Cpu<X>, mem: &mut Memory, w: u32) -> RvResult<()> {
    let addr = cpu.regs.get(rs1(w)).wrapping_add(X::Unsigned::from_i64(imm_i(w))).to_u64();
    let raw = mem.read_u8(addr)?;
    cpu.regs.set(rd(w), X::Unsigned::from_u64(raw as u64));
    Ok(())
}
fn load_u16<X: Xlen>(cpu: &mut Cpu<X>, mem: &mut Memory, w: u32) -> RvResult<()> {
    let addr = cpu.regs.get(rs1(w)).wrapping_add(X::Unsigned::from_i64(imm_i(w))).to_u64();
    let raw = mem.read_u16(addr)?;
    cpu.regs.set(rd(w), X::Unsigned::from_u64(raw as u64));
    Ok(())
}
fn load_u32<X: Xlen>(cpu: &mut Cpu<X>, mem: &mut Memory, w: u32) -> RvResult<()> {
    let addr = cpu.regs.get(rs1(w)).wrapping_add(X::Unsigned::from_i64(imm_i(w))).to_u64();
    let raw = mem.read_u32(addr)?;
    cpu.regs.set(rd(w), X::Unsigned::from_u64(raw as u64));
    Ok(())
}

fn decode_store<X: Xlen>(word: u32) -> Option<(HandlerFn<X>, PrinterFn)> {
    let handler: HandlerFn<X> = match funct3(word) {
        0b000 => store_u8::<X>,
        0b001 => store_u16::<X>,
        0b010 => store_u32::<X>,
        0b011 if X::WORD_BYTES >= 8 => store_u64::<X>,
        _ => return None,
    };
    Some((handler, |w| format!("s.. x{}, {}(x{})", rs2(w), imm_s(w), rs1(w))))
}
macro_rules! store_fn {
    ($name:ident, $mem_fn:ident, $ty:ty) => {
        fn $name<X: Xlen>(cpu: &mut Cpu<X>, mem: &mut Memory, w: u32) -> RvResult<()> {
            let addr = cpu.regs.get(rs1(w)).wrapping_add(X::Unsigned::from_i64(imm_s(w))).to_u64();
            let value = cpu.regs.get(rs2(w)).to_u64() as $ty;
            mem.$mem_fn(addr, value)
        }
    };
}
store_fn!(store_u8, write_u8, u8);
store_fn!(store_u16, write_u16, u16);
store_fn!(store_u32, write_u32, u32);
store_fn!(store_u64, write_u64, u64);

fn decode_imm<X: Xlen>(word: u32) -> Option<(HandlerFn<X>, PrinterFn)> {
    let handler: HandlerFn<X> = match funct3(word) {
        0b000 => addi::<X>,
        0b010 => slti::<X>,
        0b011 => sltiu::<X>,
        0b100 => xori::<X>,
        0b110 => ori::<X>,
        0b111 => andi::<X>,
        0b001 => slli::<X>,
        0b101 if funct7(word) >> 1 == 0 => srli::<X>,
        0b101 => srai::<X>,
        _ => return None,
    };
    Some((handler, |w| format!("..i x{}, x{}, {}", rd(w), rs1(w), imm_i(w))))
}
fn addi<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let a = cpu.regs.get(rs1(w));
    cpu.regs.set(rd(w), a.wrapping_add(X::Unsigned::from_i64(imm_i(w))));
    Ok(())
}
fn slti<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let a = X::to_signed(cpu.regs.get(rs1(w))).to_i64();
    let v = if a < imm_i(w) { 1 } else { 0 };
    cpu.regs.set(rd(w), X::Unsigned::from_u64(v));
    Ok(())
}
fn sltiu<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let a = cpu.regs.get(rs1(w));
    let imm = X::Unsigned::from_i64(imm_i(w));
    let v = if a < imm { 1 } else { 0 };
    cpu.regs.set(rd(w), X::Unsigned::from_u64(v));
    Ok(())
}
fn xori<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let a = cpu.regs.get(rs1(w));
    cpu.regs.set(rd(w), a ^ X::Unsigned::from_i64(imm_i(w)));
    Ok(())
}
fn ori<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let a = cpu.regs.get(rs1(w));
    cpu.regs.set(rd(w), a | X::Unsigned::from_i64(imm_i(w)));
    Ok(())
}
fn andi<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let a = cpu.regs.get(rs1(w));
    cpu.regs.set(rd(w), a & X::Unsigned::from_i64(imm_i(w)));
    Ok(())
}
fn shamt_for<X: Xlen>(w: u32) -> u32 {
    match X::WORD_BYTES {
        4 => shamt32(w),
        8 => shamt64(w),
        _ => shamt128(w),
    }
}
fn slli<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let a = cpu.regs.get(rs1(w));
    cpu.regs.set(rd(w), a.wrapping_shl(shamt_for::<X>(w)));
    Ok(())
}
fn srli<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let a = cpu.regs.get(rs1(w));
    cpu.regs.set(rd(w), a.wrapping_shr(shamt_for::<X>(w)));
    Ok(())
}
fn srai<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let a = X::to_signed(cpu.regs.get(rs1(w)));
    let shifted = a.arith_shr(shamt_for::<X>(w));
    cpu.regs.set(rd(w), X::from_signed(shifted));
    Ok(())
}

/// RV64/RV128 `*IW` word-immediate variants: operate on the low 32 bits,
/// sign-extend the 32-bit result to the full register width.
fn decode_imm32<X: Xlen>(word: u32) -> Option<(HandlerFn<X>, PrinterFn)> {
    if X::WORD_BYTES < 8 {
        return None;
    }
    let handler: HandlerFn<X> = match funct3(word) {
        0b000 => addiw::<X>,
        0b001 => slliw::<X>,
        0b101 if funct7(word) == 0 => srliw::<X>,
        0b101 => sraiw::<X>,
        _ => return None,
    };
    Some((handler, |w| format!("..iw x{}, x{}, {}", rd(w), rs1(w), imm_i(w))))
}
fn addiw<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let a = cpu.regs.get(rs1(w)).to_u64() as i32;
    let result = a.wrapping_add(imm_i(w) as i32);
    cpu.regs.set(rd(w), X::Unsigned::sign_extend_32(result as u32));
    Ok(())
}
fn slliw<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let a = cpu.regs.get(rs1(w)).to_u64() as u32;
    let result = a.wrapping_shl(shamt32(w));
    cpu.regs.set(rd(w), X::Unsigned::sign_extend_32(result));
    Ok(())
}
fn srliw<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let a = cpu.regs.get(rs1(w)).to_u64() as u32;
    let result = a.wrapping_shr(shamt32(w));
    cpu.regs.set(rd(w), X::Unsigned::sign_extend_32(result));
    Ok(())
}
fn sraiw<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let a = cpu.regs.get(rs1(w)).to_u64() as i32;
    let result = a.wrapping_shr(shamt32(w));
    cpu.regs.set(rd(w), X::Unsigned::sign_extend_32(result as u32));
    Ok(())
}

fn decode_reg<X: Xlen>(word: u32) -> Option<(HandlerFn<X>, PrinterFn)> {
    let handler: HandlerFn<X> = match (funct3(word), funct7(word)) {
        (0b000, 0x00) => add::<X>,
        (0b000, 0x20) => sub::<X>,
        (0b001, 0x00) => sll::<X>,
        (0b010, 0x00) => slt::<X>,
        (0b011, 0x00) => sltu::<X>,
        (0b100, 0x00) => xor::<X>,
        (0b101, 0x00) => srl::<X>,
        (0b101, 0x20) => sra::<X>,
        (0b110, 0x00) => or::<X>,
        (0b111, 0x00) => and::<X>,
        _ => return None,
    };
    Some((handler, |w| format!("r.. x{}, x{}, x{}", rd(w), rs1(w), rs2(w))))
}
macro_rules! reg_fn {
    ($name:ident, $op:tt) => {
        fn $name<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
            let a = cpu.regs.get(rs1(w));
            let b = cpu.regs.get(rs2(w));
            cpu.regs.set(rd(w), a $op b);
            Ok(())
        }
    };
}
fn add<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let a = cpu.regs.get(rs1(w));
    let b = cpu.regs.get(rs2(w));
    cpu.regs.set(rd(w), a.wrapping_add(b));
    Ok(())
}
fn sub<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let a = cpu.regs.get(rs1(w));
    let b = cpu.regs.get(rs2(w));
    cpu.regs.set(rd(w), a.wrapping_sub(b));
    Ok(())
}
fn sll<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let a = cpu.regs.get(rs1(w));
    let shamt = cpu.regs.get(rs2(w)).to_u64() as u32 & (X::WORD_BYTES as u32 * 8 - 1);
    cpu.regs.set(rd(w), a.wrapping_shl(shamt));
    Ok(())
}
fn srl<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let a = cpu.regs.get(rs1(w));
    let shamt = cpu.regs.get(rs2(w)).to_u64() as u32 & (X::WORD_BYTES as u32 * 8 - 1);
    cpu.regs.set(rd(w), a.wrapping_shr(shamt));
    Ok(())
}
fn sra<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let a = X::to_signed(cpu.regs.get(rs1(w)));
    let shamt = cpu.regs.get(rs2(w)).to_u64() as u32 & (X::WORD_BYTES as u32 * 8 - 1);
    cpu.regs.set(rd(w), X::from_signed(a.arith_shr(shamt)));
    Ok(())
}
fn slt<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let a = X::to_signed(cpu.regs.get(rs1(w))).to_i64();
    let b = X::to_signed(cpu.regs.get(rs2(w))).to_i64();
    cpu.regs.set(rd(w), X::Unsigned::from_u64(if a < b { 1 } else { 0 }));
    Ok(())
}
reg_fn!(xor, ^);
reg_fn!(or, |);
reg_fn!(and, &);
fn sltu<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let a = cpu.regs.get(rs1(w));
    let b = cpu.regs.get(rs2(w));
    cpu.regs.set(rd(w), X::Unsigned::from_u64(if a < b { 1 } else { 0 }));
    Ok(())
}

fn decode_reg32<X: Xlen>(word: u32) -> Option<(HandlerFn<X>, PrinterFn)> {
    if X::WORD_BYTES < 8 {
        return None;
    }
    let handler: HandlerFn<X> = match (funct3(word), funct7(word)) {
        (0b000, 0x00) => addw::<X>,
        (0b000, 0x20) => subw::<X>,
        (0b001, 0x00) => sllw::<X>,
        (0b101, 0x00) => srlw::<X>,
        (0b101, 0x20) => sraw::<X>,
        _ => return None,
    };
    Some((handler, |w| format!("r..w x{}, x{}, x{}", rd(w), rs1(w), rs2(w))))
}
fn addw<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let a = cpu.regs.get(rs1(w)).to_u64() as u32;
    let b = cpu.regs.get(rs2(w)).to_u64() as u32;
    cpu.regs.set(rd(w), X::Unsigned::sign_extend_32(a.wrapping_add(b)));
    Ok(())
}
fn subw<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let a = cpu.regs.get(rs1(w)).to_u64() as u32;
    let b = cpu.regs.get(rs2(w)).to_u64() as u32;
    cpu.regs.set(rd(w), X::Unsigned::sign_extend_32(a.wrapping_sub(b)));
    Ok(())
}
fn sllw<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let a = cpu.regs.get(rs1(w)).to_u64() as u32;
    let shamt = cpu.regs.get(rs2(w)).to_u64() as u32 & 0x1f;
    cpu.regs.set(rd(w), X::Unsigned::sign_extend_32(a.wrapping_shl(shamt)));
    Ok(())
}
fn srlw<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let a = cpu.regs.get(rs1(w)).to_u64() as u32;
    let shamt = cpu.regs.get(rs2(w)).to_u64() as u32 & 0x1f;
    cpu.regs.set(rd(w), X::Unsigned::sign_extend_32(a.wrapping_shr(shamt)));
    Ok(())
}
fn sraw<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let a = cpu.regs.get(rs1(w)).to_u64() as i32;
    let shamt = cpu.regs.get(rs2(w)).to_u64() as u32 & 0x1f;
    cpu.regs.set(rd(w), X::Unsigned::sign_extend_32(a.wrapping_shr(shamt) as u32));
    Ok(())
}

fn decode_misc_mem<X: Xlen>(word: u32) -> Option<(HandlerFn<X>, PrinterFn)> {
    let handler: HandlerFn<X> = match funct3(word) {
        0b000 => nop::<X>,
        0b001 => nop::<X>, // FENCE.I: single-hart emulator, no separate I$ to flush
        _ => return None,
    };
    Some((handler, |_| "fence".to_string()))
}
fn nop<X: Xlen>(_cpu: &mut Cpu<X>, _m: &mut Memory, _w: u32) -> RvResult<()> {
    Ok(())
}

fn decode_system<X: Xlen>(word: u32) -> Option<(HandlerFn<X>, PrinterFn)> {
    if funct3(word) != 0 {
        return None; // Zicsr not modeled; see DESIGN.md
    }
    match word >> 20 {
        0 => Some((ecall::<X>, |_| "ecall".to_string())),
        1 => Some((ebreak::<X>, |_| "ebreak".to_string())),
        _ => None,
    }
}
fn ecall<X: Xlen>(cpu: &mut Cpu<X>, mem: &mut Memory, _w: u32) -> RvResult<()> {
    cpu.dispatch_syscall(mem)
}
fn ebreak<X: Xlen>(cpu: &mut Cpu<X>, _mem: &mut Memory, _w: u32) -> RvResult<()> {
    Err(RvError::MachineException { message: "ebreak".to_string(), data: cpu.regs.pc().to_u64() })
}

/// `JAL x0, 0` / `JAL ra, 0`, used by the compressed expander and by the
/// vmcall sentinel writer to build a trampoline that cannot execute past
/// itself.
pub fn jal_raw(rd_index: usize, imm: i64) -> u32 {
    let imm = imm as u32 & 0x1f_ffff;
    let bit20 = (imm >> 20) & 1;
    let bits10_1 = (imm >> 1) & 0x3ff;
    let bit11 = (imm >> 11) & 1;
    let bits19_12 = (imm >> 12) & 0xff;
    (bit20 << 31) | (bits19_12 << 12) | (bit11 << 20) | (bits10_1 << 21) | ((rd_index as u32) << 7) | OP_JAL
}

pub const REG_RA_INDEX: usize = REG_RA;
pub const REG_ZERO_INDEX: usize = REG_ZERO;
