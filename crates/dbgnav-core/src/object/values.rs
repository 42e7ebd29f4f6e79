//! Scalar reads and writes, enums and constants.
//!
//! Reads come in six flavours: `val`/`sval`/`uval` convert to native `f64`,
//! `bigval`/`sbigval`/`ubigval` keep integers exact. The unprefixed forms
//! read unsigned for `unsigned …` types, `char` and pointers, and signed
//! otherwise. Bitfields are extracted in the exact domain before any
//! conversion.

use tracing::debug;

use crate::error::{NavError, NavResult};
use crate::numeric::NumberKind;
use crate::object::{BitField, DbgObject, MAX_BULK_READ};
use crate::types::{BigValue, Scalar};

impl DbgObject
{
    fn reads_unsigned(&self) -> bool
    {
        self.ty.is_unsigned() || self.ty.is_pointer()
    }

    /// One batched read of `count` contiguous elements.
    async fn read_scalars(&self, unsigned: bool, count: u64) -> NavResult<Vec<Scalar>>
    {
        if count > MAX_BULK_READ {
            return Err(NavError::ReadLimitExceeded {
                requested: count,
                limit: MAX_BULK_READ,
            });
        }
        if count == 0 {
            return Ok(Vec::new());
        }

        let element = self.element_size().await?;
        let kind = NumberKind::new(element, unsigned, self.ty.is_float())?;
        let len = element
            .checked_mul(count)
            .ok_or_else(|| NavError::invalid(format!("reading {count} elements of {element} bytes overflows")))?;

        debug!("Reading {} x {} bytes at {}", count, element, self.address);
        let bytes = self.nav.symbols().read_memory(self.address, len).await?;
        let values = kind.decode_array(&bytes)?;

        Ok(match self.bitfield {
            Some(bits) if !kind.is_float() => values
                .into_iter()
                .map(|value| match value {
                    Scalar::Integer(raw) => Scalar::Integer(raw.extract_bits(bits.bitoffset, bits.bitcount)),
                    float @ Scalar::Float(_) => float,
                })
                .collect(),
            _ => values,
        })
    }

    async fn read_one(&self, unsigned: bool) -> NavResult<Option<Scalar>>
    {
        if self.is_null() {
            return Ok(None);
        }
        if self.ty.is_void() {
            return Ok(Some(Scalar::Integer(self.address.to_big())));
        }
        Ok(self.read_scalars(unsigned, 1).await?.into_iter().next())
    }

    async fn read_many(&self, unsigned: bool, count: Option<u64>) -> NavResult<Vec<Scalar>>
    {
        if self.is_null() {
            return Ok(Vec::new());
        }
        if self.ty.is_void() {
            return Err(NavError::invalid("cannot read multiple values from a void object"));
        }
        let count = match count {
            Some(count) => count,
            None if self.ty.is_array() => self.ty.array_length(),
            None => return Err(NavError::invalid(format!("a count is required for non-array type {}", self.ty))),
        };
        self.read_scalars(unsigned, count).await
    }

    /// The value as a native number. `None` for NULL; the address for `void`.
    pub async fn val(&self) -> NavResult<Option<f64>>
    {
        Ok(self.read_one(self.reads_unsigned()).await?.map(Scalar::to_f64))
    }

    /// [`val`](Self::val), read as unsigned.
    pub async fn uval(&self) -> NavResult<Option<f64>>
    {
        Ok(self.read_one(true).await?.map(Scalar::to_f64))
    }

    /// [`val`](Self::val), read as signed.
    pub async fn sval(&self) -> NavResult<Option<f64>>
    {
        Ok(self.read_one(false).await?.map(Scalar::to_f64))
    }

    /// The exact value. `None` for NULL; the address for `void`.
    pub async fn bigval(&self) -> NavResult<Option<Scalar>>
    {
        self.read_one(self.reads_unsigned()).await
    }

    /// [`bigval`](Self::bigval), read as unsigned.
    pub async fn ubigval(&self) -> NavResult<Option<Scalar>>
    {
        self.read_one(true).await
    }

    /// [`bigval`](Self::bigval), read as signed.
    pub async fn sbigval(&self) -> NavResult<Option<Scalar>>
    {
        self.read_one(false).await
    }

    /// `count` consecutive values as native numbers.
    ///
    /// `count` may be omitted for array types. NULL yields an empty list.
    ///
    /// ## Errors
    ///
    /// - `InvalidOperation` for `void`, or for a non-array type without a count
    /// - `ReadLimitExceeded` above [`MAX_BULK_READ`]
    pub async fn vals(&self, count: Option<u64>) -> NavResult<Vec<f64>>
    {
        Ok(to_native(self.read_many(self.reads_unsigned(), count).await?))
    }

    /// [`vals`](Self::vals), read as unsigned.
    pub async fn uvals(&self, count: Option<u64>) -> NavResult<Vec<f64>>
    {
        Ok(to_native(self.read_many(true, count).await?))
    }

    /// [`vals`](Self::vals), read as signed.
    pub async fn svals(&self, count: Option<u64>) -> NavResult<Vec<f64>>
    {
        Ok(to_native(self.read_many(false, count).await?))
    }

    /// `count` consecutive exact values.
    pub async fn bigvals(&self, count: Option<u64>) -> NavResult<Vec<Scalar>>
    {
        self.read_many(self.reads_unsigned(), count).await
    }

    /// [`bigvals`](Self::bigvals), read as unsigned.
    pub async fn ubigvals(&self, count: Option<u64>) -> NavResult<Vec<Scalar>>
    {
        self.read_many(true, count).await
    }

    /// [`bigvals`](Self::bigvals), read as signed.
    pub async fn sbigvals(&self, count: Option<u64>) -> NavResult<Vec<Scalar>>
    {
        self.read_many(false, count).await
    }

    /// Write a value, unless memory already holds it.
    ///
    /// The current bytes are re-read first and the write is skipped when
    /// nothing would change. Bitfields rewrite their whole storage unit with
    /// only the member's bits replaced. Writing to NULL does nothing.
    ///
    /// Nothing stops the debuggee from changing memory between the read and
    /// the write.
    ///
    /// ## Errors
    ///
    /// - `InvalidOperation` for `void`, or a float written to an integer
    /// - `ValueOutOfRange` if the value does not fit the field as read by
    ///   [`val`](Self::val): signed types take signed values, unsigned types
    ///   and bitfields take non-negative ones
    pub async fn setval(&self, value: impl Into<Scalar>) -> NavResult<()>
    {
        self.write_scalar(self.reads_unsigned(), value.into()).await
    }

    /// [`setval`](Self::setval), treating the location as unsigned.
    pub async fn setuval(&self, value: impl Into<Scalar>) -> NavResult<()>
    {
        self.write_scalar(true, value.into()).await
    }

    /// [`setval`](Self::setval), treating the location as signed.
    pub async fn setsval(&self, value: impl Into<Scalar>) -> NavResult<()>
    {
        self.write_scalar(false, value.into()).await
    }

    async fn write_scalar(&self, unsigned: bool, value: Scalar) -> NavResult<()>
    {
        if self.is_null() {
            return Ok(());
        }
        if self.ty.is_void() {
            return Err(NavError::invalid("cannot write to a void object"));
        }

        let float = self.ty.is_float();
        let value = match (value, float) {
            (Scalar::Integer(integer), true) => Scalar::Float(integer.to_f64()),
            (Scalar::Float(_), false) => {
                return Err(NavError::invalid(format!("cannot write a float to {}", self.ty)));
            }
            (value, _) => value,
        };
        let bitfield = self.bitfield.filter(|_| !float);

        let size = self.element_size().await?;
        let kind = NumberKind::new(size, unsigned || bitfield.is_some(), float)?;
        let current = self.nav.symbols().read_memory(self.address, size).await?;

        let replacement = match (bitfield, value) {
            (Some(bits), Scalar::Integer(new_bits)) => {
                check_bitfield_range(new_bits, bits)?;
                let word = kind.decode(&current)?.as_integer().unwrap_or_default();
                kind.encode(Scalar::Integer(word.insert_bits(bits.bitoffset, bits.bitcount, new_bits)))?
            }
            (_, value) => kind.encode(value)?,
        };

        if replacement == current {
            debug!("Skipping write of unchanged value at {}", self.address);
            return Ok(());
        }
        debug!("Writing {} bytes at {}", replacement.len(), self.address);
        self.nav.symbols().write_memory(self.address, &replacement).await
    }

    /// Whether the static type is an enumeration.
    pub async fn is_enum(&self) -> NavResult<bool>
    {
        debug!("Checking whether {} is an enum", self.ty);
        self.nav
            .symbols()
            .is_type_enum(self.ty.module(), self.ty.name())
            .await
    }

    /// Whether values of this type can have fields: not a scalar, pointer or enum.
    pub async fn is_type_with_fields(&self) -> NavResult<bool>
    {
        if self.ty.is_scalar() || self.ty.is_pointer() {
            return Ok(false);
        }
        Ok(!self.is_enum().await?)
    }

    /// Name of the enumerator matching the current value. `None` for NULL.
    ///
    /// ## Errors
    ///
    /// `InvalidConstant` if no enumerator has the value.
    pub async fn constant(&self) -> NavResult<Option<String>>
    {
        let Some(value) = self.bigval().await?.and_then(Scalar::as_integer) else {
            return Ok(None);
        };
        let names = self
            .nav
            .symbols()
            .lookup_constant_name(self.ty.module(), Some(self.ty.name()), value)
            .await?;
        names.into_iter().next().map(Some).ok_or_else(|| NavError::InvalidConstant {
            type_name: self.ty.qualified_name(),
            value: value.to_string(),
        })
    }

    /// Whether every bit of the enumerator `flag` is set in the current value.
    pub async fn has_constant_flag(&self, flag: &str) -> NavResult<bool>
    {
        let Some(value) = self.bigval().await?.and_then(Scalar::as_integer) else {
            return Ok(false);
        };
        let flag = self.nav.constant_value(&self.ty, flag).await?;
        Ok(value & flag == flag)
    }
}

fn to_native(values: Vec<Scalar>) -> Vec<f64>
{
    values.into_iter().map(Scalar::to_f64).collect()
}

/// Bitfields are always read zero-extended, so only `0..2^bitcount` round-trips.
fn check_bitfield_range(value: BigValue, bits: BitField) -> NavResult<()>
{
    if value.is_negative() || value > BigValue::low_mask(bits.bitcount) {
        return Err(NavError::ValueOutOfRange {
            value: value.to_string(),
            size: u64::from(bits.bitcount.div_ceil(8)),
        });
    }
    Ok(())
}
