//! Debuggee address type.

use std::fmt;
use std::ops::{BitAnd, BitOr, Not};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{NavError, NavResult};
use crate::types::value::BigValue;

/// Strongly typed debuggee address
///
/// This wrapper around `u64` keeps addresses apart from sizes, counts and
/// decoded values. Every address the engine computes stays exact: offset
/// arithmetic that would leave the 64-bit address space fails with
/// [`NavError::AddressOverflow`] instead of wrapping.
///
/// ## Formatting
///
/// `Display` renders the zero address as `NULL` and every other address as
/// lower-case hex with a `0x` prefix.
///
/// ## Example
///
/// ```rust
/// use dbgnav_core::types::Address;
///
/// let addr = Address::from(0x1000);
/// let next_addr = addr.offset(0x100)?;
/// assert_eq!(next_addr.value(), 0x1100);
/// assert_eq!(Address::ZERO.to_string(), "NULL");
/// # Ok::<(), dbgnav_core::NavError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "AddressRepr", into = "u64")]
pub struct Address(u64);

/// Serialized form: a JSON number or a `0x`-prefixed string.
#[derive(Deserialize)]
#[serde(untagged)]
enum AddressRepr
{
    Number(u64),
    Text(String),
}

impl TryFrom<AddressRepr> for Address
{
    type Error = NavError;

    fn try_from(repr: AddressRepr) -> NavResult<Self>
    {
        match repr {
            AddressRepr::Number(value) => Ok(Address(value)),
            AddressRepr::Text(text) => text.parse(),
        }
    }
}

impl Address
{
    /// The null address (0x0)
    pub const ZERO: Self = Address(0);

    /// Create a new address from a `u64` value
    pub const fn new(value: u64) -> Self
    {
        Address(value)
    }

    /// Get the raw `u64` value of this address
    pub const fn value(self) -> u64
    {
        self.0
    }

    /// Whether this is the null address.
    pub const fn is_zero(self) -> bool
    {
        self.0 == 0
    }

    /// Add an offset to this address, checking for overflow
    ///
    /// Returns `Some(new_address)` if the addition doesn't overflow, or `None` if it does.
    ///
    /// ## Example
    ///
    /// ```rust
    /// use dbgnav_core::types::Address;
    ///
    /// let addr = Address::from(0x1000);
    /// assert_eq!(addr.checked_add(0x100), Some(Address::from(0x1100)));
    /// assert_eq!(addr.checked_add(u64::MAX), None);
    /// ```
    pub fn checked_add(self, offset: u64) -> Option<Self>
    {
        self.0.checked_add(offset).map(Address)
    }

    /// Subtract an offset from this address, checking for underflow
    pub fn checked_sub(self, offset: u64) -> Option<Self>
    {
        self.0.checked_sub(offset).map(Address)
    }

    /// Move the address by a signed byte offset.
    ///
    /// ## Errors
    ///
    /// `AddressOverflow` if the result is below zero or above `u64::MAX`.
    pub fn offset(self, offset: i64) -> NavResult<Self>
    {
        let moved = if offset >= 0 {
            self.checked_add(offset.unsigned_abs())
        } else {
            self.checked_sub(offset.unsigned_abs())
        };
        moved.ok_or_else(|| NavError::AddressOverflow(format!("{self} {offset:+}")))
    }

    /// Move the address forward by an unsigned byte count.
    ///
    /// ## Errors
    ///
    /// `AddressOverflow` if the result is above `u64::MAX`.
    pub fn add_bytes(self, bytes: u64) -> NavResult<Self>
    {
        self.checked_add(bytes)
            .ok_or_else(|| NavError::AddressOverflow(format!("{self} + {bytes:#x}")))
    }

    /// Move the address backward by an unsigned byte count.
    ///
    /// ## Errors
    ///
    /// `AddressOverflow` if the result is below zero.
    pub fn sub_bytes(self, bytes: u64) -> NavResult<Self>
    {
        self.checked_sub(bytes)
            .ok_or_else(|| NavError::AddressOverflow(format!("{self} - {bytes:#x}")))
    }

    /// Remainder of the address divided by `modulus`.
    ///
    /// ## Errors
    ///
    /// `InvalidOperation` for a zero modulus.
    pub fn modulo(self, modulus: u64) -> NavResult<u64>
    {
        self.0
            .checked_rem(modulus)
            .ok_or_else(|| NavError::invalid("address modulo zero"))
    }

    /// The address as a value in the arbitrary-precision integer domain.
    pub fn to_big(self) -> BigValue
    {
        BigValue::from(self.0)
    }
}

impl From<u64> for Address
{
    fn from(value: u64) -> Self
    {
        Address(value)
    }
}

impl From<Address> for u64
{
    fn from(address: Address) -> Self
    {
        address.0
    }
}

impl TryFrom<BigValue> for Address
{
    type Error = NavError;

    fn try_from(value: BigValue) -> NavResult<Self>
    {
        value
            .to_u64()
            .map(Address)
            .ok_or_else(|| NavError::AddressOverflow(format!("{value} is not a valid address")))
    }
}

impl FromStr for Address
{
    type Err = NavError;

    /// Parses `0x`, `0o` and `0b` prefixed literals, or decimal otherwise.
    fn from_str(s: &str) -> NavResult<Self>
    {
        let text = s.trim();
        let (digits, radix) = if let Some(rest) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            (rest, 16)
        } else if let Some(rest) = text.strip_prefix("0o") {
            (rest, 8)
        } else if let Some(rest) = text.strip_prefix("0b") {
            (rest, 2)
        } else {
            (text, 10)
        };
        u64::from_str_radix(digits, radix)
            .map(Address)
            .map_err(|e| NavError::invalid(format!("invalid address literal {s:?}: {e}")))
    }
}

impl fmt::Display for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        if self.0 == 0 {
            write!(f, "NULL")
        } else {
            write!(f, "0x{:x}", self.0)
        }
    }
}

impl BitAnd for Address
{
    type Output = Address;

    fn bitand(self, rhs: Self) -> Self::Output
    {
        Address(self.0 & rhs.0)
    }
}

impl BitOr for Address
{
    type Output = Address;

    fn bitor(self, rhs: Self) -> Self::Output
    {
        Address(self.0 | rhs.0)
    }
}

impl Not for Address
{
    type Output = Address;

    fn not(self) -> Self::Output
    {
        Address(!self.0)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_parse_literals()
    {
        assert_eq!("0xabc".parse::<Address>().unwrap(), Address::new(0xabc));
        assert_eq!("0b111".parse::<Address>().unwrap(), Address::new(7));
        assert_eq!("0o11".parse::<Address>().unwrap(), Address::new(9));
        assert_eq!("11".parse::<Address>().unwrap(), Address::new(11));
        assert!("0xzz".parse::<Address>().is_err());
    }

    #[test]
    fn test_offset_high_addresses()
    {
        let base = Address::new(0xffff_ffff_ffff_0000);
        assert_eq!(base.offset(0x1234).unwrap(), Address::new(0xffff_ffff_ffff_1234));
        let high = Address::new(0xffff_ffff_ffff_1234);
        assert_eq!(high.offset(-0x1234).unwrap(), base);
    }

    #[test]
    fn test_offset_never_wraps()
    {
        assert!(Address::new(u64::MAX).offset(1).is_err());
        assert!(Address::new(4).offset(-8).is_err());
        assert!(Address::new(4).sub_bytes(8).is_err());
    }

    #[test]
    fn test_display()
    {
        assert_eq!(Address::ZERO.to_string(), "NULL");
        assert_eq!(Address::new(0xdead_beef).to_string(), "0xdeadbeef");
    }

    #[test]
    fn test_modulo_and_bits()
    {
        assert_eq!(Address::new(0x1234).modulo(0x1000).unwrap(), 0x234);
        assert!(Address::new(1).modulo(0).is_err());
        let tagged = Address::new(0x1001);
        assert_eq!(tagged & !Address::new(1), Address::new(0x1000));
        assert_eq!(Address::new(0x1000) | Address::new(1), tagged);
    }

    #[test]
    fn test_big_value_round_trip()
    {
        let addr = Address::new(u64::MAX);
        assert_eq!(Address::try_from(addr.to_big()).unwrap(), addr);
        assert!(Address::try_from(BigValue::from(-1_i64)).is_err());
    }
}
