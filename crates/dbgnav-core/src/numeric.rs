//! # Numeric decoding
//!
//! Turns raw little-endian byte runs read from the debuggee into [`Scalar`]s,
//! and back again for writes. Integers are always decoded into the exact
//! [`BigValue`] domain; conversion to native numbers happens later, on demand.

use crate::error::{NavError, NavResult};
use crate::types::{BigValue, Scalar};

/// How to interpret one element of a memory read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberKind
{
    size: u64,
    unsigned: bool,
    float: bool,
}

impl NumberKind
{
    /// Validate a `(size, signedness, float)` triple.
    ///
    /// ## Errors
    ///
    /// `InvalidNumberSize` unless `size` is 1, 2, 4 or 8 (4 or 8 for floats).
    pub fn new(size: u64, unsigned: bool, float: bool) -> NavResult<Self>
    {
        let supported = if float {
            matches!(size, 4 | 8)
        } else {
            matches!(size, 1 | 2 | 4 | 8)
        };
        if !supported {
            return Err(NavError::InvalidNumberSize(size));
        }
        Ok(Self { size, unsigned, float })
    }

    /// Element size in bytes.
    pub fn size(self) -> u64
    {
        self.size
    }

    /// Whether integers are zero-extended.
    pub fn is_unsigned(self) -> bool
    {
        self.unsigned
    }

    /// Whether the element is a float.
    pub fn is_float(self) -> bool
    {
        self.float
    }

    /// Decode exactly one element.
    ///
    /// ## Errors
    ///
    /// `InvalidOperation` if `bytes` is not exactly one element long.
    pub fn decode(self, bytes: &[u8]) -> NavResult<Scalar>
    {
        if bytes.len() as u64 != self.size {
            return Err(NavError::invalid(format!(
                "expected {} bytes for a scalar, got {}",
                self.size,
                bytes.len()
            )));
        }

        if self.float {
            return Ok(Scalar::Float(match bytes {
                [a, b, c, d] => f64::from(f32::from_le_bytes([*a, *b, *c, *d])),
                _ => {
                    let mut raw = [0_u8; 8];
                    raw.copy_from_slice(bytes);
                    f64::from_le_bytes(raw)
                }
            }));
        }

        let mut raw = [0_u8; 8];
        raw[..bytes.len()].copy_from_slice(bytes);
        let unsigned = u64::from_le_bytes(raw);
        if self.unsigned {
            return Ok(Scalar::Integer(BigValue::from(unsigned)));
        }

        // Sign-extend from the element width.
        let bits = u32::try_from(self.size * 8).unwrap_or(64);
        let shift = 64 - bits;
        #[allow(clippy::cast_possible_wrap)]
        let signed = ((unsigned << shift) as i64) >> shift;
        Ok(Scalar::Integer(BigValue::from(signed)))
    }

    /// Decode a contiguous run of `bytes.len() / size` elements.
    ///
    /// ## Errors
    ///
    /// `InvalidOperation` if the run is not a whole number of elements.
    pub fn decode_array(self, bytes: &[u8]) -> NavResult<Vec<Scalar>>
    {
        let size = usize::try_from(self.size).map_err(|_| NavError::InvalidNumberSize(self.size))?;
        if bytes.len() % size != 0 {
            return Err(NavError::invalid(format!(
                "{} bytes is not a whole number of {}-byte elements",
                bytes.len(),
                size
            )));
        }
        bytes.chunks_exact(size).map(|chunk| self.decode(chunk)).collect()
    }

    /// Encode one element for writing.
    ///
    /// Integers must fit the element's signedness and width, so that decoding
    /// with the same kind gives the value back.
    ///
    /// ## Errors
    ///
    /// - `ValueOutOfRange` if the integer would be truncated
    /// - `InvalidOperation` when mixing floats and integers
    pub fn encode(self, value: Scalar) -> NavResult<Vec<u8>>
    {
        match (value, self.float) {
            (Scalar::Float(float), true) => Ok(if self.size == 4 {
                #[allow(clippy::cast_possible_truncation)]
                let narrow = float as f32;
                narrow.to_le_bytes().to_vec()
            } else {
                float.to_le_bytes().to_vec()
            }),
            (Scalar::Integer(integer), false) => {
                let bits = u32::try_from(self.size * 8).unwrap_or(64);
                let (min, max) = self.integer_range();
                if integer < min || integer > max {
                    return Err(NavError::ValueOutOfRange {
                        value: integer.to_string(),
                        size: self.size,
                    });
                }
                let truncated = (integer & BigValue::low_mask(bits)).to_u64().unwrap_or_default();
                let size = usize::try_from(self.size).unwrap_or(8);
                Ok(truncated.to_le_bytes()[..size].to_vec())
            }
            (Scalar::Integer(_), true) => Err(NavError::invalid("cannot write an integer to a float")),
            (Scalar::Float(_), false) => Err(NavError::invalid("cannot write a float to an integer")),
        }
    }

    /// Smallest and largest integer this kind represents.
    pub fn integer_range(self) -> (BigValue, BigValue)
    {
        let bits = u32::try_from(self.size * 8).unwrap_or(64);
        if self.unsigned {
            (BigValue::ZERO, BigValue::low_mask(bits))
        } else {
            let half = BigValue::ONE.shift_left(bits - 1).value();
            (BigValue::new(-half), BigValue::new(half - 1))
        }
    }
}
