//! Scalar values decoded from debuggee memory.

use std::fmt;
use std::ops::{BitAnd, BitOr, Not};

/// Exact integer value read from (or written to) the debuggee
///
/// Debuggee integers are at most 64 bits wide, signed or unsigned. Holding
/// them in an `i128` keeps every such value exact, along with every
/// intermediate produced by bitfield shifting and masking. Bitwise `!`
/// follows two's complement semantics (`!x == -x - 1`), so masks built with
/// it behave like masks over an infinitely wide integer.
///
/// Convert to a native `f64` only with [`BigValue::to_f64`], which may lose
/// precision above 2^53.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct BigValue(i128);

impl BigValue
{
    /// Zero.
    pub const ZERO: Self = BigValue(0);

    /// One.
    pub const ONE: Self = BigValue(1);

    /// Wrap a raw `i128`.
    pub const fn new(value: i128) -> Self
    {
        BigValue(value)
    }

    /// The raw `i128`.
    pub const fn value(self) -> i128
    {
        self.0
    }

    /// Whether the value is zero.
    pub const fn is_zero(self) -> bool
    {
        self.0 == 0
    }

    /// Whether the value is negative.
    pub const fn is_negative(self) -> bool
    {
        self.0 < 0
    }

    /// Arithmetic shift right.
    #[must_use]
    pub fn shift_right(self, bits: u32) -> Self
    {
        BigValue(self.0 >> bits.min(127))
    }

    /// Shift left. Callers keep `bits` within the 64-bit scalar domain.
    #[must_use]
    pub fn shift_left(self, bits: u32) -> Self
    {
        BigValue(self.0 << bits.min(127))
    }

    /// `(1 << bits) - 1`
    pub fn low_mask(bits: u32) -> Self
    {
        BigValue::ONE.shift_left(bits).sub_one()
    }

    fn sub_one(self) -> Self
    {
        BigValue(self.0 - 1)
    }

    /// `(self >> offset) & ((1 << count) - 1)`
    #[must_use]
    pub fn extract_bits(self, offset: u32, count: u32) -> Self
    {
        self.shift_right(offset) & BigValue::low_mask(count)
    }

    /// Replace `count` bits starting at `offset` with the low bits of `bits`.
    #[must_use]
    pub fn insert_bits(self, offset: u32, count: u32, bits: BigValue) -> Self
    {
        let mask = BigValue::low_mask(count);
        (self & !mask.shift_left(offset)) | (bits & mask).shift_left(offset)
    }

    /// Convert to a native number, possibly losing precision.
    #[allow(clippy::cast_precision_loss)]
    pub fn to_f64(self) -> f64
    {
        self.0 as f64
    }

    /// The value as a `u64`, if it is in range.
    pub fn to_u64(self) -> Option<u64>
    {
        u64::try_from(self.0).ok()
    }

    /// The value as an `i64`, if it is in range.
    pub fn to_i64(self) -> Option<i64>
    {
        i64::try_from(self.0).ok()
    }
}

macro_rules! big_value_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for BigValue
            {
                fn from(value: $t) -> Self
                {
                    BigValue(i128::from(value))
                }
            }
        )*
    };
}

big_value_from!(u8, u16, u32, u64, i8, i16, i32, i64, i128);

impl fmt::Display for BigValue
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", self.0)
    }
}

impl fmt::LowerHex for BigValue
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        if self.0 < 0 {
            write!(f, "-")?;
        }
        fmt::LowerHex::fmt(&self.0.unsigned_abs(), f)
    }
}

impl BitAnd for BigValue
{
    type Output = BigValue;

    fn bitand(self, rhs: Self) -> Self::Output
    {
        BigValue(self.0 & rhs.0)
    }
}

impl BitOr for BigValue
{
    type Output = BigValue;

    fn bitor(self, rhs: Self) -> Self::Output
    {
        BigValue(self.0 | rhs.0)
    }
}

impl Not for BigValue
{
    type Output = BigValue;

    fn not(self) -> Self::Output
    {
        BigValue(!self.0)
    }
}

/// One decoded scalar: an exact integer or a floating point number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar
{
    /// Any non-float scalar, including pointers and enums.
    Integer(BigValue),
    /// `float` or `double`.
    Float(f64),
}

impl Scalar
{
    /// Native-number view of the scalar.
    pub fn to_f64(self) -> f64
    {
        match self {
            Scalar::Integer(value) => value.to_f64(),
            Scalar::Float(value) => value,
        }
    }

    /// The integer, if this is not a float.
    pub fn as_integer(self) -> Option<BigValue>
    {
        match self {
            Scalar::Integer(value) => Some(value),
            Scalar::Float(_) => None,
        }
    }
}

impl From<BigValue> for Scalar
{
    fn from(value: BigValue) -> Self
    {
        Scalar::Integer(value)
    }
}

impl From<f64> for Scalar
{
    fn from(value: f64) -> Self
    {
        Scalar::Float(value)
    }
}

impl From<i64> for Scalar
{
    fn from(value: i64) -> Self
    {
        Scalar::Integer(value.into())
    }
}

impl From<u64> for Scalar
{
    fn from(value: u64) -> Self
    {
        Scalar::Integer(value.into())
    }
}

impl From<i32> for Scalar
{
    fn from(value: i32) -> Self
    {
        Scalar::Integer(value.into())
    }
}

impl fmt::Display for Scalar
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Scalar::Integer(value) => write!(f, "{value}"),
            Scalar::Float(value) => write!(f, "{value}"),
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_extract_bits()
    {
        let raw = BigValue::from(0b0111_0000_u8);
        assert_eq!(raw.extract_bits(4, 3), BigValue::from(7));
        assert_eq!(raw.extract_bits(0, 4), BigValue::ZERO);
    }

    #[test]
    fn test_insert_bits()
    {
        let raw = BigValue::from(0xff_u8);
        assert_eq!(raw.insert_bits(4, 3, BigValue::ZERO), BigValue::from(0x8f));
        assert_eq!(BigValue::ZERO.insert_bits(1, 2, BigValue::from(0xf)), BigValue::from(0b110));
    }

    #[test]
    fn test_full_width_mask()
    {
        let all = BigValue::from(u64::MAX);
        assert_eq!(all.extract_bits(0, 64), all);
        assert_eq!(BigValue::low_mask(64), all);
    }

    #[test]
    fn test_not_is_twos_complement()
    {
        assert_eq!(!BigValue::ONE, BigValue::from(-2));
        assert_eq!(BigValue::from(0x1001) & !BigValue::ONE, BigValue::from(0x1000));
    }

    #[test]
    fn test_conversions()
    {
        assert_eq!(BigValue::from(u64::MAX).to_u64(), Some(u64::MAX));
        assert_eq!(BigValue::from(-1).to_u64(), None);
        assert_eq!(BigValue::from(u64::MAX).to_i64(), None);
        assert_eq!(format!("{:x}", BigValue::from(-255)), "-ff");
    }
}
