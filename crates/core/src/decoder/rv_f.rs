//! F/D extensions: single- and double-precision floating point. `FLW`/`FSW`/`FLD`/`FSD`
//! live here rather than in `base.rs` since they share the FP register
//! file and rounding-mode plumbing with the rest of this module.

use super::fields::{funct3, funct7, imm_i, imm_s, rd, rm, rs1, rs2, rs3};
use super::{HandlerFn, PrinterFn};
use crate::cpu::Cpu;
use crate::error::RvResult;
use crate::memory::Memory;
use crate::xlen::{Word, Xlen};

const OP_LOAD_FP: u32 = 0x07;
const OP_STORE_FP: u32 = 0x27;

pub fn decode<X: Xlen>(word: u32) -> Option<(HandlerFn<X>, PrinterFn)> {
    match super::fields::opcode(word) {
        OP_LOAD_FP => decode_load::<X>(word),
        OP_STORE_FP => decode_store::<X>(word),
        0x43 => fused::<X>(word, fmadd_s::<X>, fmadd_d::<X>),
        0x47 => fused::<X>(word, fmsub_s::<X>, fmsub_d::<X>),
        0x4b => fused::<X>(word, fnmsub_s::<X>, fnmsub_d::<X>),
        0x4f => fused::<X>(word, fnmadd_s::<X>, fnmadd_d::<X>),
        0x53 => decode_op_fp::<X>(word),
        _ => None,
    }
}

fn fmt_ok(fmt: u32) -> bool {
    match fmt {
        0 => cfg!(feature = "ext-f"),
        1 => cfg!(feature = "ext-d"),
        _ => false,
    }
}

fn fused<X: Xlen>(word: u32, s: HandlerFn<X>, d: HandlerFn<X>) -> Option<(HandlerFn<X>, PrinterFn)> {
    let fmt = funct7(word) & 0b11;
    if !fmt_ok(fmt) {
        return None;
    }
    let handler = if fmt == 0 { s } else { d };
    Some((handler, |w| format!("fmadd.. f{}, f{}, f{}, f{}", rd(w), rs1(w), rs2(w), rs3(w))))
}

fn decode_load<X: Xlen>(word: u32) -> Option<(HandlerFn<X>, PrinterFn)> {
    let handler: HandlerFn<X> = match funct3(word) {
        2 if cfg!(feature = "ext-f") => flw::<X>,
        3 if cfg!(feature = "ext-d") => fld::<X>,
        _ => return None,
    };
    Some((handler, |w| format!("fl. f{}, {}(x{})", rd(w), imm_i(w), rs1(w))))
}
fn decode_store<X: Xlen>(word: u32) -> Option<(HandlerFn<X>, PrinterFn)> {
    let handler: HandlerFn<X> = match funct3(word) {
        2 if cfg!(feature = "ext-f") => fsw::<X>,
        3 if cfg!(feature = "ext-d") => fsd::<X>,
        _ => return None,
    };
    Some((handler, |w| format!("fs. f{}, {}(x{})", rs2(w), imm_s(w), rs1(w))))
}

fn flw<X: Xlen>(cpu: &mut Cpu<X>, mem: &mut Memory, w: u32) -> RvResult<()> {
    let addr = cpu.regs.get(rs1(w)).wrapping_add(X::Unsigned::from_i64(imm_i(w))).to_u64();
    let bits = mem.read_u32(addr)?;
    cpu.regs.set_f32(rd(w), f32::from_bits(bits));
    Ok(())
}
fn fld<X: Xlen>(cpu: &mut Cpu<X>, mem: &mut Memory, w: u32) -> RvResult<()> {
    let addr = cpu.regs.get(rs1(w)).wrapping_add(X::Unsigned::from_i64(imm_i(w))).to_u64();
    let bits = mem.read_u64(addr)?;
    cpu.regs.set_f64(rd(w), f64::from_bits(bits));
    Ok(())
}
fn fsw<X: Xlen>(cpu: &mut Cpu<X>, mem: &mut Memory, w: u32) -> RvResult<()> {
    let addr = cpu.regs.get(rs1(w)).wrapping_add(X::Unsigned::from_i64(imm_s(w))).to_u64();
    mem.write_u32(addr, cpu.regs.get_f32(rs2(w)).to_bits())
}
fn fsd<X: Xlen>(cpu: &mut Cpu<X>, mem: &mut Memory, w: u32) -> RvResult<()> {
    let addr = cpu.regs.get(rs1(w)).wrapping_add(X::Unsigned::from_i64(imm_s(w))).to_u64();
    mem.write_u64(addr, cpu.regs.get_f64(rs2(w)).to_bits())
}

macro_rules! fbin {
    ($name_s:ident, $name_d:ident, $op:tt) => {
        fn $name_s<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
            let a = cpu.regs.get_f32(rs1(w));
            let b = cpu.regs.get_f32(rs2(w));
            cpu.regs.set_f32(rd(w), a $op b);
            Ok(())
        }
        fn $name_d<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
            let a = cpu.regs.get_f64(rs1(w));
            let b = cpu.regs.get_f64(rs2(w));
            cpu.regs.set_f64(rd(w), a $op b);
            Ok(())
        }
    };
}
fbin!(fadd_s, fadd_d, +);
fbin!(fsub_s, fsub_d, -);
fbin!(fmul_s, fmul_d, *);
fbin!(fdiv_s, fdiv_d, /);

fn fsqrt_s<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let a = cpu.regs.get_f32(rs1(w));
    cpu.regs.set_f32(rd(w), a.sqrt());
    Ok(())
}
fn fsqrt_d<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let a = cpu.regs.get_f64(rs1(w));
    cpu.regs.set_f64(rd(w), a.sqrt());
    Ok(())
}

fn fsgnj_s<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let a = cpu.regs.get_f32(rs1(w));
    let b = cpu.regs.get_f32(rs2(w));
    cpu.regs.set_f32(rd(w), a.copysign(b));
    Ok(())
}
fn fsgnjn_s<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let a = cpu.regs.get_f32(rs1(w));
    let b = cpu.regs.get_f32(rs2(w));
    cpu.regs.set_f32(rd(w), a.copysign(-b));
    Ok(())
}
fn fsgnjx_s<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let a = cpu.regs.get_f32(rs1(w));
    let b = cpu.regs.get_f32(rs2(w));
    let sign = (a.to_bits() ^ b.to_bits()) & 0x8000_0000;
    cpu.regs.set_f32(rd(w), f32::from_bits((a.to_bits() & 0x7fff_ffff) | sign));
    Ok(())
}
fn fsgnj_d<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let a = cpu.regs.get_f64(rs1(w));
    let b = cpu.regs.get_f64(rs2(w));
    cpu.regs.set_f64(rd(w), a.copysign(b));
    Ok(())
}
fn fsgnjn_d<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let a = cpu.regs.get_f64(rs1(w));
    let b = cpu.regs.get_f64(rs2(w));
    cpu.regs.set_f64(rd(w), a.copysign(-b));
    Ok(())
}
fn fsgnjx_d<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let a = cpu.regs.get_f64(rs1(w));
    let b = cpu.regs.get_f64(rs2(w));
    let sign = (a.to_bits() ^ b.to_bits()) & 0x8000_0000_0000_0000;
    cpu.regs.set_f64(rd(w), f64::from_bits((a.to_bits() & 0x7fff_ffff_ffff_ffff) | sign));
    Ok(())
}

fn fmin_s<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let a = cpu.regs.get_f32(rs1(w));
    let b = cpu.regs.get_f32(rs2(w));
    cpu.regs.set_f32(rd(w), a.min(b));
    Ok(())
}
fn fmax_s<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let a = cpu.regs.get_f32(rs1(w));
    let b = cpu.regs.get_f32(rs2(w));
    cpu.regs.set_f32(rd(w), a.max(b));
    Ok(())
}
fn fmin_d<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let a = cpu.regs.get_f64(rs1(w));
    let b = cpu.regs.get_f64(rs2(w));
    cpu.regs.set_f64(rd(w), a.min(b));
    Ok(())
}
fn fmax_d<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let a = cpu.regs.get_f64(rs1(w));
    let b = cpu.regs.get_f64(rs2(w));
    cpu.regs.set_f64(rd(w), a.max(b));
    Ok(())
}

fn feq_s<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let v = cpu.regs.get_f32(rs1(w)) == cpu.regs.get_f32(rs2(w));
    cpu.regs.set(rd(w), X::Unsigned::from_u64(v as u64));
    Ok(())
}
fn flt_s<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let v = cpu.regs.get_f32(rs1(w)) < cpu.regs.get_f32(rs2(w));
    cpu.regs.set(rd(w), X::Unsigned::from_u64(v as u64));
    Ok(())
}
fn fle_s<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let v = cpu.regs.get_f32(rs1(w)) <= cpu.regs.get_f32(rs2(w));
    cpu.regs.set(rd(w), X::Unsigned::from_u64(v as u64));
    Ok(())
}
fn feq_d<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let v = cpu.regs.get_f64(rs1(w)) == cpu.regs.get_f64(rs2(w));
    cpu.regs.set(rd(w), X::Unsigned::from_u64(v as u64));
    Ok(())
}
fn flt_d<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let v = cpu.regs.get_f64(rs1(w)) < cpu.regs.get_f64(rs2(w));
    cpu.regs.set(rd(w), X::Unsigned::from_u64(v as u64));
    Ok(())
}
fn fle_d<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let v = cpu.regs.get_f64(rs1(w)) <= cpu.regs.get_f64(rs2(w));
    cpu.regs.set(rd(w), X::Unsigned::from_u64(v as u64));
    Ok(())
}

fn fclass_s<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let v = cpu.regs.get_f32(rs1(w));
    cpu.regs.set(rd(w), X::Unsigned::from_u64(fclass(v.is_nan(), v.is_infinite(), v.is_sign_negative(), v == 0.0, v.is_subnormal())));
    Ok(())
}
fn fclass_d<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let v = cpu.regs.get_f64(rs1(w));
    cpu.regs.set(rd(w), X::Unsigned::from_u64(fclass(v.is_nan(), v.is_infinite(), v.is_sign_negative(), v == 0.0, v.is_subnormal())));
    Ok(())
}
fn fclass(is_nan: bool, is_inf: bool, neg: bool, is_zero: bool, subnormal: bool) -> u64 {
    if is_nan {
        return 1 << 9; // quiet NaN bucket; this model doesn't distinguish signalling NaNs
    }
    if is_inf {
        return if neg { 1 << 0 } else { 1 << 7 };
    }
    if is_zero {
        return if neg { 1 << 3 } else { 1 << 4 };
    }
    if subnormal {
        return if neg { 1 << 2 } else { 1 << 5 };
    }
    if neg {
        1 << 1
    } else {
        1 << 6
    }
}

fn fmv_x_w<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let bits = cpu.regs.get_f32(rs1(w)).to_bits();
    cpu.regs.set(rd(w), X::Unsigned::sign_extend_32(bits));
    Ok(())
}
fn fmv_w_x<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let bits = cpu.regs.get(rs1(w)).to_u64() as u32;
    cpu.regs.set_f32(rd(w), f32::from_bits(bits));
    Ok(())
}
fn fmv_x_d<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let bits = cpu.regs.fpr_raw(rs1(w)).bits();
    cpu.regs.set(rd(w), X::Unsigned::from_u64(bits));
    Ok(())
}
fn fmv_d_x<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let bits = cpu.regs.get(rs1(w)).to_u64();
    cpu.regs.set_f64(rd(w), f64::from_bits(bits));
    Ok(())
}

fn fcvt_w_s<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let v = cpu.regs.get_f32(rs1(w));
    cpu.regs.set(rd(w), X::Unsigned::from_i64(v as i32 as i64));
    Ok(())
}
fn fcvt_wu_s<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let v = cpu.regs.get_f32(rs1(w));
    cpu.regs.set(rd(w), X::Unsigned::sign_extend_32(v as u32));
    Ok(())
}
fn fcvt_s_w<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let v = X::to_signed(cpu.regs.get(rs1(w))).to_i64() as i32;
    cpu.regs.set_f32(rd(w), v as f32);
    Ok(())
}
fn fcvt_s_wu<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let v = cpu.regs.get(rs1(w)).to_u64() as u32;
    cpu.regs.set_f32(rd(w), v as f32);
    Ok(())
}
fn fcvt_w_d<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let v = cpu.regs.get_f64(rs1(w));
    cpu.regs.set(rd(w), X::Unsigned::from_i64(v as i32 as i64));
    Ok(())
}
fn fcvt_wu_d<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let v = cpu.regs.get_f64(rs1(w));
    cpu.regs.set(rd(w), X::Unsigned::sign_extend_32(v as u32));
    Ok(())
}
fn fcvt_d_w<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let v = X::to_signed(cpu.regs.get(rs1(w))).to_i64() as i32;
    cpu.regs.set_f64(rd(w), v as f64);
    Ok(())
}
fn fcvt_d_wu<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let v = cpu.regs.get(rs1(w)).to_u64() as u32;
    cpu.regs.set_f64(rd(w), v as f64);
    Ok(())
}
fn fcvt_l_s<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let v = cpu.regs.get_f32(rs1(w));
    cpu.regs.set(rd(w), X::Unsigned::from_i64(v as i64));
    Ok(())
}
fn fcvt_lu_s<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let v = cpu.regs.get_f32(rs1(w));
    cpu.regs.set(rd(w), X::Unsigned::from_u64(v as u64));
    Ok(())
}
fn fcvt_s_l<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let v = X::to_signed(cpu.regs.get(rs1(w))).to_i64();
    cpu.regs.set_f32(rd(w), v as f32);
    Ok(())
}
fn fcvt_s_lu<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let v = cpu.regs.get(rs1(w)).to_u64();
    cpu.regs.set_f32(rd(w), v as f32);
    Ok(())
}
fn fcvt_l_d<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let v = cpu.regs.get_f64(rs1(w));
    cpu.regs.set(rd(w), X::Unsigned::from_i64(v as i64));
    Ok(())
}
fn fcvt_lu_d<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let v = cpu.regs.get_f64(rs1(w));
    cpu.regs.set(rd(w), X::Unsigned::from_u64(v as u64));
    Ok(())
}
fn fcvt_d_l<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let v = X::to_signed(cpu.regs.get(rs1(w))).to_i64();
    cpu.regs.set_f64(rd(w), v as f64);
    Ok(())
}
fn fcvt_d_lu<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let v = cpu.regs.get(rs1(w)).to_u64();
    cpu.regs.set_f64(rd(w), v as f64);
    Ok(())
}
fn fcvt_s_d<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let v = cpu.regs.get_f64(rs1(w));
    cpu.regs.set_f32(rd(w), v as f32);
    Ok(())
}
fn fcvt_d_s<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
    let v = cpu.regs.get_f32(rs1(w));
    cpu.regs.set_f64(rd(w), v as f64);
    Ok(())
}

macro_rules! fma_variant {
    ($name_s:ident, $name_d:ident, $combine:expr) => {
        fn $name_s<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
            let a = cpu.regs.get_f32(rs1(w));
            let b = cpu.regs.get_f32(rs2(w));
            let c = cpu.regs.get_f32(rs3(w));
            let combine: fn(f32, f32, f32) -> f32 = $combine;
            cpu.regs.set_f32(rd(w), combine(a, b, c));
            Ok(())
        }
        fn $name_d<X: Xlen>(cpu: &mut Cpu<X>, _m: &mut Memory, w: u32) -> RvResult<()> {
            let a = cpu.regs.get_f64(rs1(w));
            let b = cpu.regs.get_f64(rs2(w));
            let c = cpu.regs.get_f64(rs3(w));
            let combine: fn(f64, f64, f64) -> f64 = $combine;
            cpu.regs.set_f64(rd(w), combine(a, b, c));
            Ok(())
        }
    };
}
fma_variant!(fmadd_s, fmadd_d, |a, b, c| a.mul_add(b, c));
fma_variant!(fmsub_s, fmsub_d, |a, b, c| a.mul_add(b, -c));
fma_variant!(fnmsub_s, fnmsub_d, |a, b, c| -a.mul_add(b, -c));
fma_variant!(fnmadd_s, fnmadd_d, |a, b, c| -a.mul_add(b, c));

fn decode_op_fp<X: Xlen>(word: u32) -> Option<(HandlerFn<X>, PrinterFn)> {
    let fmt = funct7(word) & 0b11;
    let funct5 = funct7(word) >> 2;
    let printer: PrinterFn = |w| format!("f.. f{}, f{}, f{}", rd(w), rs1(w), rs2(w));
    if !fmt_ok(fmt) {
        // Cross-format conversions (FCVT.S.D / FCVT.D.S) need both enabled;
        // everything else needs only its own fmt.
        if funct5 != 0b01000 {
            return None;
        }
    }
    let handler: HandlerFn<X> = match (funct5, fmt, rm(word)) {
        (0b00000, 0, _) => fadd_s::<X>,
        (0b00000, 1, _) => fadd_d::<X>,
        (0b00001, 0, _) => fsub_s::<X>,
        (0b00001, 1, _) => fsub_d::<X>,
        (0b00010, 0, _) => fmul_s::<X>,
        (0b00010, 1, _) => fmul_d::<X>,
        (0b00011, 0, _) => fdiv_s::<X>,
        (0b00011, 1, _) => fdiv_d::<X>,
        (0b01011, 0, _) => fsqrt_s::<X>,
        (0b01011, 1, _) => fsqrt_d::<X>,
        (0b00100, 0, 0) => fsgnj_s::<X>,
        (0b00100, 0, 1) => fsgnjn_s::<X>,
        (0b00100, 0, 2) => fsgnjx_s::<X>,
        (0b00100, 1, 0) => fsgnj_d::<X>,
        (0b00100, 1, 1) => fsgnjn_d::<X>,
        (0b00100, 1, 2) => fsgnjx_d::<X>,
        (0b00101, 0, 0) => fmin_s::<X>,
        (0b00101, 0, 1) => fmax_s::<X>,
        (0b00101, 1, 0) => fmin_d::<X>,
        (0b00101, 1, 1) => fmax_d::<X>,
        (0b10100, 0, 2) => feq_s::<X>,
        (0b10100, 0, 1) => flt_s::<X>,
        (0b10100, 0, 0) => fle_s::<X>,
        (0b10100, 1, 2) => feq_d::<X>,
        (0b10100, 1, 1) => flt_d::<X>,
        (0b10100, 1, 0) => fle_d::<X>,
        (0b11100, 0, 1) => fclass_s::<X>,
        (0b11100, 1, 1) => fclass_d::<X>,
        (0b11100, 0, 0) => fmv_x_w::<X>,
        (0b11110, 0, 0) => fmv_w_x::<X>,
        (0b11100, 1, 0) if X::WORD_BYTES >= 8 => fmv_x_d::<X>,
        (0b11110, 1, 0) if X::WORD_BYTES >= 8 => fmv_d_x::<X>,
        (0b11000, 0, _) => match (word >> 20) & 0x1f {
            0 => fcvt_w_s::<X>,
            1 => fcvt_wu_s::<X>,
            2 if X::WORD_BYTES >= 8 => fcvt_l_s::<X>,
            3 if X::WORD_BYTES >= 8 => fcvt_lu_s::<X>,
            _ => return None,
        },
        (0b11010, 0, _) => match (word >> 20) & 0x1f {
            0 => fcvt_s_w::<X>,
            1 => fcvt_s_wu::<X>,
            2 if X::WORD_BYTES >= 8 => fcvt_s_l::<X>,
            3 if X::WORD_BYTES >= 8 => fcvt_s_lu::<X>,
            _ => return None,
        },
        (0b11000, 1, _) => match (word >> 20) & 0x1f {
            0 => fcvt_w_d::<X>,
            1 => fcvt_wu_d::<X>,
            2 if X::WORD_BYTES >= 8 => fcvt_l_d::<X>,
            3 if X::WORD_BYTES >= 8 => fcvt_lu_d::<X>,
            _ => return None,
        },
        (0b11010, 1, _) => match (word >> 20) & 0x1f {
            0 => fcvt_d_w::<X>,
            1 => fcvt_d_wu::<X>,
            2 if X::WORD_BYTES >= 8 => fcvt_d_l::<X>,
            3 if X::WORD_BYTES >= 8 => fcvt_d_lu::<X>,
            _ => return None,
        },
        (0b01000, 1, _) if rs2(word) == 0 && cfg!(feature = "ext-f") && cfg!(feature = "ext-d") => fcvt_d_s::<X>,
        (0b01000, 0, _) if rs2(word) == 1 && cfg!(feature = "ext-f") && cfg!(feature = "ext-d") => fcvt_s_d::<X>,
        _ => return None,
    };
    Some((handler, printer))
}
