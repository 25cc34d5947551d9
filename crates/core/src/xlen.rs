//! The address-width parameter shared by every template in the original
//! C++ core (`template <int W>`). Rather than monomorphizing on an
//! integer constant, callers pick one of [`Rv32`], [`Rv64`] or [`Rv128`]
//! and every generic component (`Registers<X>`, `Cpu<X>`, `Machine<X>`)
//! specializes its arithmetic and sign-extension through this trait.

use std::fmt::{Debug, LowerHex};
use std::ops::{Add, BitAnd, BitOr, BitXor, Not, Sub};

/// An unsigned machine word: the register/address representation for one
/// XLEN. Implemented by `u32`, `u64` and `u128`.
pub trait Word:
    Copy
    + Clone
    + Debug
    + Default
    + PartialEq
    + Eq
    + PartialOrd
    + Ord
    + LowerHex
    + Add<Output = Self>
    + Sub<Output = Self>
    + BitAnd<Output = Self>
    + BitOr<Output = Self>
    + BitXor<Output = Self>
    + Not<Output = Self>
    + Send
    + Sync
    + 'static
{
    const ZERO: Self;
    const ONE: Self;
    const BITS: u32;

    fn from_u64(v: u64) -> Self;
    fn to_u64(self) -> u64;
    fn wrapping_add(self, rhs: Self) -> Self;
    fn wrapping_sub(self, rhs: Self) -> Self;
    fn wrapping_mul(self, rhs: Self) -> Self;
    /// Sign-extend a 32-bit value held in the low bits up to the full
    /// register width (used by the compressed-instruction expander and by
    /// `ADDIW`/`SLLIW`-class instructions on rv64/rv128).
    fn sign_extend_32(v: u32) -> Self;
    /// Sign-extend a 64-bit-wide immediate to the full register width: the
    /// general case used for I/S/B/U/J immediates (all of which the
    /// decoder sign-extends to `i64` before handing off).
    fn from_i64(v: i64) -> Self;
    fn wrapping_shl(self, amt: u32) -> Self;
    fn wrapping_shr(self, amt: u32) -> Self;
}

/// The signed counterpart of a [`Word`], used for arithmetic shifts and
/// signed comparisons (`SLT`, branches).
pub trait SignedWord: Copy + Clone + Debug + Ord + Send + Sync + 'static {
    fn arith_shr(self, amt: u32) -> Self;
    fn to_i64(self) -> i64;
}

macro_rules! impl_signed_word {
    ($ty:ty) => {
        impl SignedWord for $ty {
            #[inline]
            fn arith_shr(self, amt: u32) -> Self {
                <$ty>::wrapping_shr(self, amt)
            }
            #[inline]
            fn to_i64(self) -> i64 {
                self as i64
            }
        }
    };
}
impl_signed_word!(i32);
impl_signed_word!(i64);
impl_signed_word!(i128);

/// A concrete address width: rv32, rv64 or rv128.
pub trait Xlen: Copy + Clone + Debug + Default + Send + Sync + 'static {
    type Unsigned: Word;
    type Signed: SignedWord;

    /// Register width in bytes (4, 8 or 16).
    const WORD_BYTES: usize;
    /// Human-readable ISA string, e.g. `"rv64"`.
    const NAME: &'static str;

    fn to_signed(v: Self::Unsigned) -> Self::Signed;
    fn from_signed(v: Self::Signed) -> Self::Unsigned;
}

macro_rules! impl_word {
    ($ty:ty) => {
        impl Word for $ty {
            const ZERO: Self = 0;
            const ONE: Self = 1;
            const BITS: u32 = <$ty>::BITS;

            #[inline]
            fn from_u64(v: u64) -> Self {
                v as $ty
            }
            #[inline]
            fn to_u64(self) -> u64 {
                self as u64
            }
            #[inline]
            fn wrapping_add(self, rhs: Self) -> Self {
                <$ty>::wrapping_add(self, rhs)
            }
            #[inline]
            fn wrapping_sub(self, rhs: Self) -> Self {
                <$ty>::wrapping_sub(self, rhs)
            }
            #[inline]
            fn wrapping_mul(self, rhs: Self) -> Self {
                <$ty>::wrapping_mul(self, rhs)
            }
            #[inline]
            fn sign_extend_32(v: u32) -> Self {
                (v as i32) as i128 as $ty
            }
            #[inline]
            fn from_i64(v: i64) -> Self {
                v as i128 as $ty
            }
            #[inline]
            fn wrapping_shl(self, amt: u32) -> Self {
                <$ty>::wrapping_shl(self, amt)
            }
            #[inline]
            fn wrapping_shr(self, amt: u32) -> Self {
                <$ty>::wrapping_shr(self, amt)
            }
        }
    };
}
impl_word!(u32);
impl_word!(u64);
impl_word!(u128);

/// RV32: 32-bit address space, 4-byte registers.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Rv32;
/// RV64: 64-bit address space, 8-byte registers. The common case.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Rv64;
/// RV128: experimental 128-bit address space, 16-byte registers.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Rv128;

impl Xlen for Rv32 {
    type Unsigned = u32;
    type Signed = i32;
    const WORD_BYTES: usize = 4;
    const NAME: &'static str = "rv32";
    #[inline]
    fn to_signed(v: u32) -> i32 {
        v as i32
    }
    #[inline]
    fn from_signed(v: i32) -> u32 {
        v as u32
    }
}
impl Xlen for Rv64 {
    type Unsigned = u64;
    type Signed = i64;
    const WORD_BYTES: usize = 8;
    const NAME: &'static str = "rv64";
    #[inline]
    fn to_signed(v: u64) -> i64 {
        v as i64
    }
    #[inline]
    fn from_signed(v: i64) -> u64 {
        v as u64
    }
}
impl Xlen for Rv128 {
    type Unsigned = u128;
    type Signed = i128;
    const WORD_BYTES: usize = 16;
    const NAME: &'static str = "rv128";
    #[inline]
    fn to_signed(v: u128) -> i128 {
        v as i128
    }
    #[inline]
    fn from_signed(v: i128) -> u128 {
        v as u128
    }
}
