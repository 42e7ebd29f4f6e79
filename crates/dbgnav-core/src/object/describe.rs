//! Extended fields, named arrays and human-readable descriptions.

use std::sync::Arc;

use futures::future::{join_all, try_join_all};
use tracing::debug;

use crate::error::{NavError, NavResult};
use crate::extensions::{ExtendedField, TypeDescription};
use crate::object::DbgObject;
use crate::types::Scalar;

impl DbgObject
{
    /// Follow a dot-separated path of extended fields.
    ///
    /// Each part is looked up on the current object's type, then on its base
    /// types (in [`base_types`](Self::base_types) order); the resolver runs on
    /// the object or base sub-object that matched.
    ///
    /// ## Errors
    ///
    /// - `LookupFailure` if no type in the hierarchy registers the field
    /// - `CastMismatch` if the resolver returns an object that is not of the
    ///   field's declared type
    pub async fn extended_field(&self, path: &str) -> NavResult<DbgObject>
    {
        let mut current = self.clone();
        for name in path.split('.') {
            current = current.single_extended_field(name).await?;
        }
        Ok(current)
    }

    async fn single_extended_field(&self, name: &str) -> NavResult<DbgObject>
    {
        let (owner, field) = self
            .find_extension(name, |object, name| object.nav.registry().extended_fields().get(&object.ty, name))
            .await?
            .ok_or_else(|| NavError::lookup(format!("no extended field {name:?} on {}", self.ty)))?;

        debug!("Resolving extended field {}.{}", owner.ty, field.name);
        let result = field.resolve(owner).await?;
        if !result.is_type(&field.result_type).await? {
            return Err(NavError::CastMismatch {
                from: result.type_description(),
                to: field.result_type.clone(),
            });
        }
        Ok(result)
    }

    /// The array registered as `name` on this type or a base type.
    ///
    /// Lookup follows [`extended_field`](Self::extended_field): the type
    /// itself first, then its base types, and the getter runs on the object
    /// or base sub-object that matched.
    ///
    /// ## Errors
    ///
    /// - `LookupFailure` if no type in the hierarchy registers the array
    /// - `CastMismatch` if an element is not of the array's item type
    pub async fn named_array(&self, name: &str) -> NavResult<Vec<DbgObject>>
    {
        let (owner, array) = self
            .find_extension(name, |object, name| object.nav.registry().array_fields().get(&object.ty, name))
            .await?
            .ok_or_else(|| NavError::lookup(format!("no array {name:?} on {}", self.ty)))?;

        debug!("Gathering array {}.{}", owner.ty, array.name);
        let items = array.resolve(owner).await?;
        let Some(item_type) = &array.item_type else {
            return Ok(items);
        };

        let matches = try_join_all(items.iter().map(|item| item.is_type(item_type))).await?;
        if let Some(item) = items.iter().zip(matches).find_map(|(item, ok)| (!ok).then_some(item)) {
            return Err(NavError::CastMismatch {
                from: item.type_description(),
                to: item_type.clone(),
            });
        }
        Ok(items)
    }

    /// The first extension found on this type or one of its base types,
    /// together with the object it applies to.
    async fn find_extension<E, F>(&self, name: &str, lookup: F) -> NavResult<Option<(DbgObject, Arc<E>)>>
    where
        F: Fn(&DbgObject, &str) -> Option<Arc<E>>,
    {
        if let Some(extension) = lookup(self, name) {
            return Ok(Some((self.clone(), extension)));
        }
        if self.ty.is_void() || self.ty.is_pointer() || self.ty.is_scalar() {
            return Ok(None);
        }
        Ok(self
            .base_types()
            .await?
            .into_iter()
            .find_map(|base| lookup(&base, name).map(|extension| (base, extension))))
    }

    /// Human-readable description of the value.
    ///
    /// The primary [`TypeDescription`] registered for the type, or for the
    /// nearest base type, is used when there is one. Otherwise:
    ///
    /// - NULL is `nullptr`
    /// - `bool` and one-bit fields are `true` or `false`
    /// - other scalars are their decimal value
    /// - pointers are the address they point to
    /// - enums are the enumerator name
    /// - anything else is its own address
    ///
    /// Arrays are described element by element, as `[a, b, …]`.
    pub async fn desc(&self) -> NavResult<String>
    {
        if self.is_null() {
            return Ok("nullptr".to_string());
        }

        let custom = self.primary_description().await?;
        if !self.ty.is_array() {
            return Ok(self.describe_one(custom.as_deref()).await);
        }

        let elements = self.array(None).await?;
        let descriptions = join_all(elements.iter().map(|element| element.describe_one(custom.as_deref()))).await;
        Ok(format!("[{}]", descriptions.join(", ")))
    }

    async fn primary_description(&self) -> NavResult<Option<Arc<TypeDescription>>>
    {
        let registry = self.nav.registry();
        if let Some(description) = registry.primary_description(&self.ty) {
            return Ok(Some(description));
        }
        if self.ty.is_void() || self.ty.is_pointer() || self.ty.is_scalar() {
            return Ok(None);
        }
        // A type without base type information simply has no inherited description.
        let bases = self.base_types().await.unwrap_or_default();
        Ok(bases
            .iter()
            .find_map(|base| registry.primary_description(&base.ty)))
    }

    /// Failures never escape: a custom description falls back to
    /// `Type???`, the default one to the address.
    async fn describe_one(&self, custom: Option<&TypeDescription>) -> String
    {
        match custom {
            Some(description) => match (description.describe)(self.clone()).await {
                Ok(text) => text,
                Err(error) => {
                    debug!("Description {:?} of {} failed: {}", description.name, self, error);
                    format!("{}???", self.ty.name())
                }
            },
            None => match self.default_description().await {
                Ok(text) => text,
                Err(error) => {
                    debug!("Default description of {} failed: {}", self, error);
                    self.ptr()
                }
            },
        }
    }

    async fn default_description(&self) -> NavResult<String>
    {
        if self.is_null() {
            return Ok("nullptr".to_string());
        }
        if self.ty.name() == "bool" || self.bitfield.is_some_and(|bits| bits.bitcount == 1) {
            let value = self.bigval().await?.and_then(Scalar::as_integer).unwrap_or_default();
            return Ok(if value.is_zero() { "false" } else { "true" }.to_string());
        }
        if self.ty.name() == "wchar_t" || self.ty.name() == "__wchar_t" {
            if self.was_dereferenced {
                if let Ok(text) = self.string(None).await {
                    return Ok(text);
                }
            }
            return self.string(Some(1)).await;
        }
        if self.ty.is_scalar() {
            return Ok(self.bigval().await?.map(|value| value.to_string()).unwrap_or_default());
        }
        if self.ty.is_pointer() {
            return Ok(self.deref().await?.ptr());
        }
        match self.is_enum().await {
            Ok(true) => Ok(self.constant().await?.unwrap_or_else(|| self.ptr())),
            _ => Ok(self.ptr()),
        }
    }
}

impl ExtendedField
{
    /// Resolve this field on `owner`, without the type check.
    pub async fn resolve(&self, owner: DbgObject) -> NavResult<DbgObject>
    {
        (self.resolver)(owner).await
    }
}
