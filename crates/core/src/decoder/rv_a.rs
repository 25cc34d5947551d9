//! A extension: load-reserved/store-conditional and AMOs, `.W` and `.D`
//! widths.
//!
//! The machine model is single-hart-at-a-time cooperative scheduling,
//! so these execute as plain non-atomic read-modify-write sequences;
//! `LR`/`SC` track a single reservation address per hart rather than a
//! cache-coherence protocol.

use super::fields::{funct3, funct7, rd, rs1, rs2};
use super::{HandlerFn, PrinterFn};
use crate::cpu::Cpu;
use crate::error::RvResult;
use crate::memory::Memory;
use crate::xlen::{Word, Xlen};

const F3_W: u32 = 0b010;
const F3_D: u32 = 0b011;

pub fn decode<X: Xlen>(word: u32) -> Option<(HandlerFn<X>, PrinterFn)> {
    if !cfg!(feature = "ext-a") {
        return None;
    }
    let width = funct3(word);
    if width != F3_W && !(width == F3_D && X::WORD_BYTES >= 8) {
        return None;
    }
    let funct5 = funct7(word) >> 2;
    let is64 = width == F3_D;
    let handler: HandlerFn<X> = match funct5 {
        0b00010 => if is64 { lr64::<X> } else { lr32::<X> },
        0b00011 => if is64 { sc64::<X> } else { sc32::<X> },
        0b00001 => if is64 { amoswap64::<X> } else { amoswap32::<X> },
        0b00000 => if is64 { amoadd64::<X> } else { amoadd32::<X> },
        0b00100 => if is64 { amoxor64::<X> } else { amoxor32::<X> },
        0b01100 => if is64 { amoand64::<X> } else { amoand32::<X> },
        0b01000 => if is64 { amoor64::<X> } else { amoor32::<X> },
        0b10000 => if is64 { amomin64::<X> } else { amomin32::<X> },
        0b10100 => if is64 { amomax64::<X> } else { amomax32::<X> },
        0b11000 => if is64 { amominu64::<X> } else { amominu32::<X> },
        0b11100 => if is64 { amomaxu64::<X> } else { amomaxu32::<X> },
        _ => return None,
    };
    Some((handler, |w| format!("amo.. x{}, x{}, (x{})", rd(w), rs2(w), rs1(w))))
}

fn lr32<X: Xlen>(cpu: &mut Cpu<X>, mem: &mut Memory, w: u32) -> RvResult<()> {
    let addr = cpu.regs.get(rs1(w)).to_u64();
    let v = mem.read_u32(addr)? as i32 as i64;
    cpu.regs.set(rd(w), X::Unsigned::from_i64(v));
    cpu.reservation = Some(addr);
    Ok(())
}
fn lr64<X: Xlen>(cpu: &mut Cpu<X>, mem: &mut Memory, w: u32) -> RvResult<()> {
    let addr = cpu.regs.get(rs1(w)).to_u64();
    let v = mem.read_u64(addr)? as i64;
    cpu.regs.set(rd(w), X::Unsigned::from_i64(v));
    cpu.reservation = Some(addr);
    Ok(())
}
fn sc32<X: Xlen>(cpu: &mut Cpu<X>, mem: &mut Memory, w: u32) -> RvResult<()> {
    let addr = cpu.regs.get(rs1(w)).to_u64();
    if cpu.reservation == Some(addr) {
        mem.write_u32(addr, cpu.regs.get(rs2(w)).to_u64() as u32)?;
        cpu.regs.set(rd(w), X::Unsigned::ZERO);
    } else {
        cpu.regs.set(rd(w), X::Unsigned::ONE);
    }
    cpu.reservation = None;
    Ok(())
}
fn sc64<X: Xlen>(cpu: &mut Cpu<X>, mem: &mut Memory, w: u32) -> RvResult<()> {
    let addr = cpu.regs.get(rs1(w)).to_u64();
    if cpu.reservation == Some(addr) {
        mem.write_u64(addr, cpu.regs.get(rs2(w)).to_u64())?;
        cpu.regs.set(rd(w), X::Unsigned::ZERO);
    } else {
        cpu.regs.set(rd(w), X::Unsigned::ONE);
    }
    cpu.reservation = None;
    Ok(())
}

macro_rules! amo32 {
    ($name:ident, $combine:expr) => {
        fn $name<X: Xlen>(cpu: &mut Cpu<X>, mem: &mut Memory, w: u32) -> RvResult<()> {
            let addr = cpu.regs.get(rs1(w)).to_u64();
            let old = mem.read_u32(addr)?;
            let rs2v = cpu.regs.get(rs2(w)).to_u64() as u32;
            let combine: fn(u32, u32) -> u32 = $combine;
            mem.write_u32(addr, combine(old, rs2v))?;
            cpu.regs.set(rd(w), X::Unsigned::from_i64(old as i32 as i64));
            Ok(())
        }
    };
}
macro_rules! amo64 {
    ($name:ident, $combine:expr) => {
        fn $name<X: Xlen>(cpu: &mut Cpu<X>, mem: &mut Memory, w: u32) -> RvResult<()> {
            let addr = cpu.regs.get(rs1(w)).to_u64();
            let old = mem.read_u64(addr)?;
            let rs2v = cpu.regs.get(rs2(w)).to_u64();
            let combine: fn(u64, u64) -> u64 = $combine;
            mem.write_u64(addr, combine(old, rs2v))?;
            cpu.regs.set(rd(w), X::Unsigned::from_i64(old as i64));
            Ok(())
        }
    };
}
amo32!(amoswap32, |_old, new| new);
amo32!(amoadd32, |old, new| old.wrapping_add(new));
amo32!(amoxor32, |old, new| old ^ new);
amo32!(amoand32, |old, new| old & new);
amo32!(amoor32, |old, new| old | new);
amo32!(amomin32, |old: u32, new: u32| (old as i32).min(new as i32) as u32);
amo32!(amomax32, |old: u32, new: u32| (old as i32).max(new as i32) as u32);
amo32!(amominu32, |old, new| old.min(new));
amo32!(amomaxu32, |old, new| old.max(new));

amo64!(amoswap64, |_old, new| new);
amo64!(amoadd64, |old, new| old.wrapping_add(new));
amo64!(amoxor64, |old, new| old ^ new);
amo64!(amoand64, |old, new| old & new);
amo64!(amoor64, |old, new| old | new);
amo64!(amomin64, |old: u64, new: u64| (old as i64).min(new as i64) as u64);
amo64!(amomax64, |old: u64, new: u64| (old as i64).max(new as i64) as u64);
amo64!(amominu64, |old, new| old.min(new));
amo64!(amomaxu64, |old, new| old.max(new));
