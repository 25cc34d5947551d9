//! M extension: integer multiply/divide/remainder, plus RV64/RV128 `*W`
//! word variants.

use super::fields::{funct3, funct7, rd, rs1, rs2};
use super::{HandlerFn, PrinterFn};
use crate::cpu::Cpu;
use crate::error::RvResult;
use crate::memory::Memory;
use crate::xlen::{Word, Xlen};

const MULDIV_FUNCT7: u32 = 0b0000001;

pub fn decode<X: Xlen>(word: u32) -> Option<(HandlerFn<X>, PrinterFn)> {
    if !cfg!(feature = "ext-m") || funct7(word) != MULDIV_FUNCT7 {
        return None;
    }
    let handler: HandlerFn<X> = match funct3(word) {
        0b000 => mul::<X>,
        0b001 => mulh::<X>,
        0b010 => mulhsu::<X>,
        0b011 => mulhu::<X>,
        0b100 => div::<X>,
        0b101 => divu::<X>,
        0b110 => rem::<X>,
        0b111 => remu::<X>,
        _ => return None,
    };
    Some((handler, |w| format!("m.. x{}, x{}, x{}", rd(w), rs1(w), rs2(w))))
}

pub fn decode_w<X: Xlen>(word: u32) -> Option<(HandlerFn<X>, PrinterFn)> {
    if !cfg!(feature = "ext-m") || X::WORD_BYTES < 8 || funct7(word) != MULDIV_FUNCT7 {
        return None;
    }
    let handler: HandlerFn<X> = match funct3(word) {
        0b000 => mulw::<X>,
        0b100 => divw::<X>,
        0b101 => divuw::<X>,
        0b110 => remw::<X>,
        0b111 => remuw::<X>,
        _ => return None,
    };
    Some((handler, |w| format!("m..w x{}, x{}, x{}", rd(w), rs1(w), rs2(w))))
}

fn mul<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let a = cpu.regs.get(rs1(w));
    let b = cpu.regs.get(rs2(w));
    cpu.regs.set(rd(w), a.wrapping_mul(b));
    Ok(())
}

/// Full-width multiply, upper half. Widens through `i128`/`u128` (the
/// widest the decoder supports); RV128's own high multiply is out of
/// scope (see DESIGN.md).
fn mulh<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let a = X::to_signed(cpu.regs.get(rs1(w))).to_i64() as i128;
    let b = X::to_signed(cpu.regs.get(rs2(w))).to_i64() as i128;
    let hi = ((a * b) >> 64) as u64;
    cpu.regs.set(rd(w), X::Unsigned::from_u64(hi));
    Ok(())
}
fn mulhu<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let a = cpu.regs.get(rs1(w)).to_u64() as u128;
    let b = cpu.regs.get(rs2(w)).to_u64() as u128;
    let hi = ((a * b) >> 64) as u64;
    cpu.regs.set(rd(w), X::Unsigned::from_u64(hi));
    Ok(())
}
fn mulhsu<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let a = X::to_signed(cpu.regs.get(rs1(w))).to_i64() as i128;
    let b = cpu.regs.get(rs2(w)).to_u64() as u128 as i128;
    let hi = ((a * b) >> 64) as u64;
    cpu.regs.set(rd(w), X::Unsigned::from_u64(hi));
    Ok(())
}

fn div<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let a = X::to_signed(cpu.regs.get(rs1(w))).to_i64();
    let b = X::to_signed(cpu.regs.get(rs2(w))).to_i64();
    let result = if b == 0 { -1i64 } else { a.checked_div(b).unwrap_or(a) };
    cpu.regs.set(rd(w), X::Unsigned::from_i64(result));
    Ok(())
}
fn divu<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let a = cpu.regs.get(rs1(w));
    let b = cpu.regs.get(rs2(w));
    let result = if b == X::Unsigned::ZERO { !X::Unsigned::ZERO } else { X::Unsigned::from_u64(a.to_u64().wrapping_div(b.to_u64())) };
    cpu.regs.set(rd(w), result);
    Ok(())
}
fn rem<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let a = X::to_signed(cpu.regs.get(rs1(w))).to_i64();
    let b = X::to_signed(cpu.regs.get(rs2(w))).to_i64();
    let result = if b == 0 { a } else { a.checked_rem(b).unwrap_or(0) };
    cpu.regs.set(rd(w), X::Unsigned::from_i64(result));
    Ok(())
}
fn remu<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let a = cpu.regs.get(rs1(w));
    let b = cpu.regs.get(rs2(w));
    let result = if b == X::Unsigned::ZERO { a } else { X::Unsigned::from_u64(a.to_u64().wrapping_rem(b.to_u64())) };
    cpu.regs.set(rd(w), result);
    Ok(())
}

fn mulw<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let a = cpu.regs.get(rs1(w)).to_u64() as u32;
    let b = cpu.regs.get(rs2(w)).to_u64() as u32;
    cpu.regs.set(rd(w), X::Unsigned::sign_extend_32(a.wrapping_mul(b)));
    Ok(())
}
fn divw<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let a = cpu.regs.get(rs1(w)).to_u64() as i32;
    let b = cpu.regs.get(rs2(w)).to_u64() as i32;
    let result = if b == 0 { -1i32 } else { a.checked_div(b).unwrap_or(a) };
    cpu.regs.set(rd(w), X::Unsigned::sign_extend_32(result as u32));
    Ok(())
}
fn divuw<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let a = cpu.regs.get(rs1(w)).to_u64() as u32;
    let b = cpu.regs.get(rs2(w)).to_u64() as u32;
    let result = if b == 0 { u32::MAX } else { a.wrapping_div(b) };
    cpu.regs.set(rd(w), X::Unsigned::sign_extend_32(result));
    Ok(())
}
fn remw<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let a = cpu.regs.get(rs1(w)).to_u64() as i32;
    let b = cpu.regs.get(rs2(w)).to_u64() as i32;
    let result = if b == 0 { a } else { a.checked_rem(b).unwrap_or(0) };
    cpu.regs.set(rd(w), X::Unsigned::sign_extend_32(result as u32));
    Ok(())
}
fn remuw<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let a = cpu.regs.get(rs1(w)).to_u64() as u32;
    let b = cpu.regs.get(rs2(w)).to_u64() as u32;
    let result = if b == 0 { a } else { a.wrapping_rem(b) };
    cpu.regs.set(rd(w), X::Unsigned::sign_extend_32(result));
    Ok(())
}
