//! # DbgObject
//!
//! The navigable handle: one typed location in the debuggee's memory.
//!
//! A [`DbgObject`] is an immutable value made of a [`TypeDescriptor`], an
//! [`Address`], optional [`BitField`] metadata, a lazily resolved element
//! size and a provenance flag recording whether it came from a pointer
//! dereference. Every navigation method builds a new handle; none mutates
//! the one it was called on.
//!
//! ## NULL
//!
//! A handle at address zero is NULL. Navigation on NULL (fields, paths,
//! dereferences, casts, base types) produces NULL, or an empty list, without
//! contacting the [`SymbolService`](crate::SymbolService).
//!
//! ## Module layout
//!
//! - this module: construction, size, fields, paths, pointers, indexing
//! - [`values`]: scalar reads and writes, enums and constants
//! - [`cast`]: vtables, dynamic casts, base types, field listings
//! - [`walk`]: linked lists and strings
//! - [`describe`]: extended fields and descriptions

pub mod cast;
pub mod describe;
pub mod values;
pub mod walk;

use std::fmt;

use once_cell::sync::OnceCell;
use tracing::{debug, trace};

use crate::error::{NavError, NavResult};
use crate::navigator::Navigator;
use crate::types::{Address, Scalar, TypeDescriptor};

pub use cast::ObjectField;
pub use walk::ListStep;

/// Largest number of values a single bulk read may request.
pub const MAX_BULK_READ: u64 = 1_000_000;

/// Position of a bitfield member inside its storage unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitField
{
    /// Width in bits. Never zero.
    pub bitcount: u32,
    /// Offset of the lowest bit.
    pub bitoffset: u32,
}

impl BitField
{
    /// Bitfield metadata as reported by the symbol service. A missing or zero
    /// width means "not a bitfield".
    pub fn from_lookup(bitcount: Option<u32>, bitoffset: Option<u32>) -> Option<Self>
    {
        match (bitcount, bitoffset) {
            (Some(bitcount), Some(bitoffset)) if bitcount > 0 => Some(BitField { bitcount, bitoffset }),
            _ => None,
        }
    }
}

/// A typed location in debuggee memory
///
/// See the [module documentation](self) for the data model. Methods that
/// need type metadata or memory are `async`; everything else is immediate.
#[derive(Clone)]
pub struct DbgObject
{
    nav: Navigator,
    ty: TypeDescriptor,
    address: Address,
    bitfield: Option<BitField>,
    /// Size of one element; resolved on first use.
    type_size: OnceCell<u64>,
    was_dereferenced: bool,
}

impl fmt::Debug for DbgObject
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("DbgObject")
            .field("type", &self.ty.qualified_name())
            .field("address", &self.address)
            .field("bitfield", &self.bitfield)
            .field("type_size", &self.type_size.get())
            .field("was_dereferenced", &self.was_dereferenced)
            .finish()
    }
}

impl fmt::Display for DbgObject
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "({} *){}", self.ty.qualified_name(), self.address)
    }
}

impl DbgObject
{
    /// Build a handle. `object_size` is the size of the whole object; for
    /// arrays it is divided evenly among the elements.
    pub(crate) fn from_parts(
        nav: Navigator,
        ty: TypeDescriptor,
        address: Address,
        bitfield: Option<BitField>,
        object_size: Option<u64>,
        was_dereferenced: bool,
    ) -> Self
    {
        let element_size = match object_size {
            Some(size) if size > 0 && ty.array_length() > 0 => Some(size / ty.array_length()),
            Some(size) if size > 0 => Some(size),
            _ => None,
        };
        let type_size = element_size.map_or_else(OnceCell::new, OnceCell::with_value);
        Self {
            nav,
            ty,
            address,
            bitfield,
            type_size,
            was_dereferenced,
        }
    }

    /// A sibling handle sharing this one's navigator.
    fn derive(&self, ty: TypeDescriptor, address: Address, bitfield: Option<BitField>, object_size: Option<u64>) -> Self
    {
        DbgObject::from_parts(self.nav.clone(), ty, address, bitfield, object_size, false)
    }

    /// NULL of the given type.
    fn null_of(&self, ty: TypeDescriptor) -> Self
    {
        self.derive(ty, Address::ZERO, None, None)
    }

    /// The navigator this handle came from.
    pub fn navigator(&self) -> &Navigator
    {
        &self.nav
    }

    /// Static type.
    pub fn type_descriptor(&self) -> &TypeDescriptor
    {
        &self.ty
    }

    /// Bitfield metadata, if the handle is a bitfield member.
    pub fn bitfield(&self) -> Option<BitField>
    {
        self.bitfield
    }

    /// Whether the handle was produced by dereferencing a pointer.
    pub fn was_dereferenced(&self) -> bool
    {
        self.was_dereferenced
    }

    /// Whether the handle is at address zero.
    pub fn is_null(&self) -> bool
    {
        self.address.is_zero()
    }

    /// Same address as `other`. Types are not compared.
    pub fn equals(&self, other: &DbgObject) -> bool
    {
        self.address == other.address
    }

    /// The address formatted as `0x…`, or `NULL`.
    pub fn ptr(&self) -> String
    {
        self.address.to_string()
    }

    /// The address.
    pub fn pointer_value(&self) -> Address
    {
        self.address
    }

    /// Type name including array dimensions, without the module.
    pub fn type_description(&self) -> String
    {
        self.ty.full_name()
    }

    /// Size of one element, resolving and caching it on first use.
    pub(crate) async fn element_size(&self) -> NavResult<u64>
    {
        if let Some(size) = self.type_size.get() {
            return Ok(*size);
        }
        debug!("Looking up size of {}", self.ty);
        let size = self
            .nav
            .symbols()
            .lookup_type_size(self.ty.module(), self.ty.name())
            .await?;
        Ok(*self.type_size.get_or_init(|| size))
    }

    /// Size in bytes of the whole object (all elements, for arrays).
    ///
    /// The untyped NULL handle has size zero.
    pub async fn size(&self) -> NavResult<u64>
    {
        if self.type_size.get().is_none() && self.is_null() && self.ty.is_void() {
            return Ok(0);
        }
        let element = self.element_size().await?;
        if !self.ty.is_array() {
            return Ok(element);
        }
        element
            .checked_mul(self.ty.array_length())
            .ok_or_else(|| NavError::invalid(format!("size of {} overflows", self.ty)))
    }

    /// Reinterpret the same address as another type. No round trip.
    ///
    /// `ty` is `module!type`, or a type in this handle's module. The current
    /// size (if known) carries over unless `disregard_size` is set.
    pub fn as_type(&self, ty: &str, disregard_size: bool) -> DbgObject
    {
        let ty = self.nav.registry().parse_type(ty, &self.ty);
        self.as_descriptor(ty, disregard_size)
    }

    /// [`as_type`](Self::as_type) with an already parsed type.
    pub fn as_descriptor(&self, ty: TypeDescriptor, disregard_size: bool) -> DbgObject
    {
        let object_size = if disregard_size {
            None
        } else {
            self.type_size.get().map(|size| {
                let length = self.ty.array_length();
                if length > 0 {
                    size.saturating_mul(length)
                } else {
                    *size
                }
            })
        };
        self.derive(ty, self.address, self.bitfield, object_size)
    }

    /// Follow a pointer.
    ///
    /// A NULL pointer yields NULL of the pointee type without a round trip.
    ///
    /// ## Errors
    ///
    /// `InvalidOperation` if the handle is not a pointer.
    pub async fn deref(&self) -> NavResult<DbgObject>
    {
        if !self.ty.is_pointer() {
            return Err(NavError::invalid(format!("cannot dereference non-pointer type {}", self.ty)));
        }
        if self.is_null() {
            return Ok(self.null_of(self.ty.dereferenced()));
        }
        let target = self.read_pointer().await?;
        Ok(DbgObject::from_parts(self.nav.clone(), self.ty.dereferenced(), target, None, None, true))
    }

    /// The pointer-sized word at this address.
    pub(crate) async fn read_pointer(&self) -> NavResult<Address>
    {
        let word = self
            .as_type("void*", true)
            .ubigval()
            .await?
            .and_then(Scalar::as_integer)
            .unwrap_or_default();
        Address::try_from(word)
    }

    /// Look up a field.
    ///
    /// `name` may be a dot-separated path (`"a.b"` is `field("a")` then
    /// `field("b")`, without dereferencing in between), and each part may end
    /// in `[k]` to index into the field.
    ///
    /// ## Errors
    ///
    /// - `InvalidOperation` on pointers and arrays
    /// - `LookupFailure` if the field does not exist
    pub async fn field(&self, name: &str) -> NavResult<DbgObject>
    {
        let mut current = self.clone();
        for part in name.split('.') {
            current = current.single_field(part).await?;
        }
        Ok(current)
    }

    async fn single_field(&self, name: &str) -> NavResult<DbgObject>
    {
        if self.ty.is_pointer() {
            return Err(NavError::invalid(format!("cannot look up field {name:?} on pointer type {}", self.ty)));
        }
        if self.ty.is_array() {
            return Err(NavError::invalid(format!("cannot look up field {name:?} on array type {}", self.ty)));
        }
        if self.is_null() {
            return Ok(self.nav.null());
        }

        let (field_name, index) = split_index(name);
        debug!("Looking up field {}.{}", self.ty, field_name);
        let info = self
            .nav
            .symbols()
            .lookup_field_offset(self.ty.module(), self.ty.name(), field_name)
            .await?;

        let field = self.field_handle(
            field_name,
            &info.module,
            &info.type_name,
            info.offset,
            info.size,
            BitField::from_lookup(info.bitcount, info.bitoffset),
        )?;
        match index {
            Some(index) => field.idx(index).await,
            None => Ok(field),
        }
    }

    /// Handle for a field described by the symbol service, applying overrides.
    pub(crate) fn field_handle(
        &self,
        name: &str,
        module: &str,
        type_name: &str,
        offset: u64,
        size: u64,
        bitfield: Option<BitField>,
    ) -> NavResult<DbgObject>
    {
        let registry = self.nav.registry();
        let ty = match registry.field_override(&self.ty, name) {
            Some(overridden) => overridden.clone(),
            None => {
                let module = if module.is_empty() { self.ty.module() } else { module };
                registry.normalize(&TypeDescriptor::new(module, type_name))
            }
        };
        let address = if self.is_null() { Address::ZERO } else { self.address.add_bytes(offset)? };
        Ok(self.derive(ty, address, bitfield, Some(size)))
    }

    /// Walk a dot-separated field path, dereferencing every non-array
    /// pointer field along the way. The empty path is the handle itself.
    ///
    /// ## Example
    ///
    /// ```rust,no_run
    /// # async fn run(list: dbgnav_core::DbgObject) -> dbgnav_core::NavResult<()> {
    /// // `head` is a `Node*`; the result is the `Node`'s `value` field.
    /// let value = list.f("head.value").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn f(&self, path: &str) -> NavResult<DbgObject>
    {
        if path.is_empty() {
            return Ok(self.clone());
        }
        let mut current = self.clone();
        for part in path.split('.') {
            let field = current.single_field(part).await?;
            current = if field.ty.is_pointer() && !field.ty.is_array() {
                field.deref().await?
            } else {
                field
            };
        }
        Ok(current)
    }

    /// Try each path with [`f`](Self::f) in order and return the first that
    /// succeeds, or the last failure.
    ///
    /// ## Errors
    ///
    /// `InvalidOperation` if `paths` is empty; otherwise the last path's error.
    pub async fn f_any(&self, paths: &[&str]) -> NavResult<DbgObject>
    {
        let mut last_error = NavError::invalid("at least one field path is required");
        for path in paths {
            match self.f(path).await {
                Ok(found) => return Ok(found),
                Err(error) => {
                    trace!("Field path {:?} on {} failed: {}", path, self.ty, error);
                    last_error = error;
                }
            }
        }
        Err(last_error)
    }

    /// The object of type `outer_type` that embeds this one as `field`.
    pub async fn unembed(&self, outer_type: &str, field: &str) -> NavResult<DbgObject>
    {
        if self.is_null() {
            return Ok(self.nav.null());
        }
        let outer = self.nav.registry().parse_type(outer_type, &self.ty);
        debug!("Looking up field {}.{} to unembed", outer, field);
        let info = self
            .nav
            .symbols()
            .lookup_field_offset(outer.module(), outer.name(), field)
            .await?;
        let address = self.address.sub_bytes(info.offset)?;
        Ok(self.derive(outer, address, None, None))
    }

    /// Element `index` of an array starting at this handle.
    ///
    /// Any handle can be indexed: `idx(a).idx(b)` addresses the same element
    /// as `idx(a + b)`. The result never has an array type.
    pub async fn idx(&self, index: i64) -> NavResult<DbgObject>
    {
        let element_ty = self.ty.non_array_type();
        let known_size = self.type_size.get().copied();
        if index == 0 || self.is_null() {
            return Ok(self.derive(element_ty, self.address, self.bitfield, known_size));
        }

        let element = self.element_size().await?;
        let offset = i128::from(element) * i128::from(index);
        let offset = i64::try_from(offset)
            .map_err(|_| NavError::AddressOverflow(format!("{} + {} * {}", self.address, index, element)))?;
        let address = self.address.offset(offset)?;
        Ok(self.derive(element_ty, address, self.bitfield, Some(element)))
    }

    /// Element handles of an array.
    ///
    /// `count` defaults to the declared length of an array type. Pointer
    /// elements are dereferenced, reading all pointers in one bulk read.
    ///
    /// ## Errors
    ///
    /// `InvalidOperation` if no count is given for a non-array type.
    pub async fn array(&self, count: Option<u64>) -> NavResult<Vec<DbgObject>>
    {
        let count = match count {
            Some(count) => count,
            None if self.ty.is_array() => self.ty.array_length(),
            None => return Err(NavError::invalid(format!("a count is required for non-array type {}", self.ty))),
        };
        if count == 0 || self.is_null() {
            return Ok(Vec::new());
        }
        if count > MAX_BULK_READ {
            return Err(NavError::ReadLimitExceeded {
                requested: count,
                limit: MAX_BULK_READ,
            });
        }

        if self.ty.is_pointer() {
            let pointee = self.ty.dereferenced();
            let targets = self.ubigvals(Some(count)).await?;
            return targets
                .into_iter()
                .map(|target| {
                    let target = Address::try_from(target.as_integer().unwrap_or_default())?;
                    Ok(DbgObject::from_parts(self.nav.clone(), pointee.clone(), target, None, None, true))
                })
                .collect();
        }

        let element = self.element_size().await?;
        let element_ty = self.ty.non_array_type();
        (0..count)
            .map(|index| {
                let address = self.address.add_bytes(index.saturating_mul(element))?;
                Ok(self.derive(element_ty.clone(), address, self.bitfield, Some(element)))
            })
            .collect()
    }
}

/// Split a trailing `[k]` off a field name.
fn split_index(name: &str) -> (&str, Option<i64>)
{
    let Some(inner) = name.strip_suffix(']') else {
        return (name, None);
    };
    match inner.rfind('[') {
        Some(open) => match inner[open + 1..].trim().parse() {
            Ok(index) => (&name[..open], Some(index)),
            Err(_) => (name, None),
        },
        None => (name, None),
    }
}
