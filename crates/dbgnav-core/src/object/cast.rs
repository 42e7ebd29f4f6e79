//! Inheritance-aware casts and type introspection.
//!
//! Dynamic types are discovered through the vtable pointer stored in the
//! first machine word of an object. Two symbol conventions are understood:
//!
//! - MSVC: `Derived::`vftable'` (optionally followed by `{for `Base'}`),
//!   one symbol per base sub-object, each starting exactly at the vptr target
//! - Itanium: `vtable for Derived`, one symbol per class, with vptrs pointing
//!   into its middle

use std::cmp::Ordering;

use tracing::{debug, warn};

use crate::error::{NavError, NavResult};
use crate::object::{BitField, DbgObject};
use crate::types::{BaseTypeInfo, FieldInfo, TypeDescriptor};

const MSVC_VTABLE_MARKER: &str = "::`vftable'";
const ITANIUM_VTABLE_PREFIX: &str = "vtable for ";

/// One entry of [`DbgObject::fields`].
#[derive(Debug, Clone)]
pub struct ObjectField
{
    /// Field name.
    pub name: String,
    /// Byte offset from the start of the owner.
    pub offset: u64,
    /// Field size in bytes.
    pub size: u64,
    /// The field itself.
    pub value: DbgObject,
}

impl DbgObject
{
    /// Dynamic type named by this object's vtable, or the static type when
    /// the first word does not point at a vtable.
    pub async fn vtable(&self) -> NavResult<TypeDescriptor>
    {
        if self.is_null() {
            return Ok(self.ty.clone());
        }

        let target = self.read_pointer().await?;
        let symbol = match self.nav.symbols().lookup_symbol_name(target).await {
            Ok(symbol) => symbol,
            Err(error) if error.is_lookup_failure() => {
                debug!("No symbol at {} for {}: {}", target, self, error);
                return Ok(self.ty.clone());
            }
            Err(error) => return Err(error),
        };

        let dynamic = if let Some(marker) = symbol.name.find(MSVC_VTABLE_MARKER) {
            (symbol.displacement == 0).then(|| &symbol.name[..marker])
        } else {
            symbol.name.strip_prefix(ITANIUM_VTABLE_PREFIX)
        };

        Ok(match dynamic {
            Some(name) => self
                .nav
                .registry()
                .normalize(&TypeDescriptor::new(symbol.module.as_str(), name)),
            None => self.ty.clone(),
        })
    }

    /// Cast to the dynamic type named by the vtable, adjusting the address
    /// for multiple inheritance.
    ///
    /// The dynamic type's bases are searched for the static type first
    /// (moving back to the start of the derived object), then the static
    /// type's bases for the dynamic type (moving forward to the base
    /// sub-object). Unrelated types fall back to a cast at the same address.
    pub async fn vcast(&self) -> NavResult<DbgObject>
    {
        if self.is_null() {
            return Ok(self.clone());
        }

        let dynamic = self.vtable().await?;
        if dynamic.non_array_type() == self.ty.non_array_type() {
            return Ok(self.clone());
        }

        debug!("Looking up base types of {} for vcast", dynamic);
        let dynamic_bases = self
            .nav
            .symbols()
            .lookup_base_types(dynamic.module(), dynamic.name())
            .await?;
        if let Some(base) = dynamic_bases.iter().find(|base| self.base_descriptor(&dynamic, base) == self.ty) {
            let address = self.address.sub_bytes(base.offset)?;
            return Ok(self.derive(dynamic, address, None, None));
        }

        debug!("Looking up base types of {} for vcast", self.ty);
        let static_bases = self
            .nav
            .symbols()
            .lookup_base_types(self.ty.module(), self.ty.name())
            .await?;
        if let Some(base) = static_bases.iter().find(|base| self.base_descriptor(&self.ty, base) == dynamic) {
            let address = self.address.add_bytes(base.offset)?;
            return Ok(self.derive(dynamic, address, None, None));
        }

        warn!("{} and its vtable type {} are unrelated; casting without adjustment", self.ty, dynamic);
        Ok(self.derive(dynamic, self.address, None, None))
    }

    /// `dynamic_cast`: the `target_type` view of this object, or NULL of
    /// `target_type` when the object is not one. Never fails.
    pub async fn dcast(&self, target_type: &str) -> DbgObject
    {
        let target = self.nav.registry().parse_type(target_type, &self.ty);
        match self.dcast_to(&target).await {
            Ok(Some(found)) => found,
            Ok(None) => self.null_of(target),
            Err(error) => {
                debug!("dcast of {} to {} failed: {}", self, target, error);
                self.null_of(target)
            }
        }
    }

    async fn dcast_to(&self, target: &TypeDescriptor) -> NavResult<Option<DbgObject>>
    {
        let dynamic = self.vcast().await?;
        if dynamic.ty == *target {
            return Ok(Some(dynamic));
        }
        Ok(dynamic
            .base_types()
            .await?
            .into_iter()
            .find(|base| base.ty == *target))
    }

    fn base_descriptor(&self, derived: &TypeDescriptor, base: &BaseTypeInfo) -> TypeDescriptor
    {
        let module = if base.module.is_empty() { derived.module() } else { &base.module };
        self.nav
            .registry()
            .normalize(&TypeDescriptor::new(module, &base.type_name))
    }

    /// One handle per base type, at the base sub-object's address.
    ///
    /// Bases at greater offsets come first, so the order follows the order
    /// of the members they contribute; ties keep the symbol service's order.
    pub async fn base_types(&self) -> NavResult<Vec<DbgObject>>
    {
        if self.is_null() {
            return Ok(Vec::new());
        }
        debug!("Looking up base types of {}", self.ty);
        let mut bases = self
            .nav
            .symbols()
            .lookup_base_types(self.ty.module(), self.ty.name())
            .await?;
        bases.sort_by(|a, b| b.offset.cmp(&a.offset));

        bases
            .iter()
            .map(|base| {
                let ty = self.base_descriptor(&self.ty, base);
                Ok(self.derive(ty, self.address.add_bytes(base.offset)?, None, None))
            })
            .collect()
    }

    /// Whether the static type is `target_type` or derives from it.
    pub async fn is_type(&self, target_type: &str) -> NavResult<bool>
    {
        let target = self.nav.registry().parse_type(target_type, &self.ty);
        if self.ty == target {
            return Ok(true);
        }
        if self.is_null() && self.ty.is_void() {
            return Ok(true);
        }
        if self.ty.is_scalar() || self.ty.is_pointer() {
            return Ok(false);
        }
        Ok(self
            .base_types()
            .await?
            .iter()
            .any(|base| base.ty == target))
    }

    /// Every field, sorted into approximate declaration order.
    ///
    /// Fields are ordered by bit position, then wider first (so the largest
    /// member of a union leads), then by name. This cannot always recover
    /// declaration order inside unions.
    ///
    /// ## Errors
    ///
    /// `InvalidOperation` on pointers.
    pub async fn fields(&self, include_base_types: bool) -> NavResult<Vec<ObjectField>>
    {
        if self.ty.is_pointer() {
            return Err(NavError::invalid(format!("cannot list fields of pointer type {}", self.ty)));
        }
        if self.is_null() {
            return Ok(Vec::new());
        }

        debug!("Looking up fields of {}", self.ty);
        let mut fields = self
            .nav
            .symbols()
            .lookup_fields(self.ty.module(), self.ty.name(), include_base_types)
            .await?;
        fields.sort_by(compare_fields);

        fields
            .into_iter()
            .map(|field| {
                let value = self.field_handle(
                    &field.name,
                    &field.module,
                    &field.type_name,
                    field.offset,
                    field.size,
                    BitField::from_lookup(field.bitcount, field.bitoffset),
                )?;
                Ok(ObjectField {
                    name: field.name,
                    offset: field.offset,
                    size: field.size,
                    value,
                })
            })
            .collect()
    }
}

fn bit_position(bytes: u64, bits: Option<u32>) -> u128
{
    u128::from(bytes) * 8 + u128::from(bits.unwrap_or(0))
}

fn compare_fields(a: &FieldInfo, b: &FieldInfo) -> Ordering
{
    bit_position(a.offset, a.bitoffset)
        .cmp(&bit_position(b.offset, b.bitoffset))
        .then_with(|| bit_position(b.size, b.bitcount).cmp(&bit_position(a.size, a.bitcount)))
        .then_with(|| a.name.cmp(&b.name))
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn field(name: &str, offset: u64, size: u64, bits: Option<(u32, u32)>) -> FieldInfo
    {
        FieldInfo {
            name: name.to_string(),
            module: String::new(),
            type_name: "int".to_string(),
            offset,
            size,
            bitcount: bits.map(|(count, _)| count),
            bitoffset: bits.map(|(_, offset)| offset),
        }
    }

    fn sorted(mut fields: Vec<FieldInfo>) -> Vec<String>
    {
        fields.sort_by(compare_fields);
        fields.into_iter().map(|field| field.name).collect()
    }

    #[test]
    fn test_fields_sort_by_offset()
    {
        let names = sorted(vec![field("c", 8, 4, None), field("a", 0, 4, None), field("b", 4, 4, None)]);
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_union_members_widest_first()
    {
        let names = sorted(vec![field("small", 0, 2, None), field("big", 0, 8, None), field("mid", 0, 4, None)]);
        assert_eq!(names, vec!["big", "mid", "small"]);
    }

    #[test]
    fn test_bitfields_by_bit_position()
    {
        let names = sorted(vec![
            field("high", 0, 4, Some((4, 4))),
            field("low", 0, 4, Some((4, 0))),
            field("whole", 0, 4, None),
        ]);
        // Bitfield widths count the storage unit plus the member's bits.
        assert_eq!(names, vec!["low", "whole", "high"]);
    }

    #[test]
    fn test_ties_break_alphabetically()
    {
        let names = sorted(vec![field("b", 0, 4, None), field("a", 0, 4, None)]);
        assert_eq!(names, vec!["a", "b"]);
    }
}
