//! # Registry
//!
//! Process-wide configuration of the navigation engine: module filters, field
//! type overrides and the extension tables.
//!
//! A [`Registry`] is assembled with a [`RegistryBuilder`] and is immutable
//! once built, so every registration necessarily happens before the
//! [`Navigator`](crate::Navigator) that consumes it, and before any handle it
//! creates.
//!
//! ## Example
//!
//! ```rust
//! use dbgnav_core::registry::RegistryBuilder;
//!
//! let registry = RegistryBuilder::new()
//!     .with_lowercase_modules()
//!     .with_module_alias("app_debug", "app")
//!     .with_type_override("app!Widget", "state", "WidgetState")
//!     .build();
//!
//! assert_eq!(registry.normalize_module("APP_DEBUG"), "app");
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::FutureExt;

use crate::error::{NavError, NavResult};
use crate::extensions::{
    ArrayField, ArrayResolver, ExtendedField, ObjectDescriber, ObjectResolver, TypeDescription, TypeExtensions,
    TypeMatcher,
};
use crate::object::DbgObject;
use crate::types::TypeDescriptor;

/// Module name transformation.
pub type ModuleFilter = Box<dyn Fn(&str) -> String + Send + Sync>;

/// A pending `(owner, field) -> type` override, stored unnormalised until build.
#[derive(Debug, Clone)]
struct PendingOverride
{
    owner: String,
    field: String,
    overridden: String,
}

/// Builder for [`Registry`].
#[derive(Default)]
pub struct RegistryBuilder
{
    filters: Vec<ModuleFilter>,
    overrides: Vec<PendingOverride>,
    extended_fields: TypeExtensions<ExtendedField>,
    array_fields: TypeExtensions<ArrayField>,
    descriptions: TypeExtensions<TypeDescription>,
}

impl fmt::Debug for RegistryBuilder
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("RegistryBuilder")
            .field("filters", &self.filters.len())
            .field("overrides", &self.overrides)
            .field("extended_fields", &self.extended_fields.len())
            .field("array_fields", &self.array_fields.len())
            .field("descriptions", &self.descriptions.len())
            .finish()
    }
}

impl RegistryBuilder
{
    /// An empty builder: no filters, overrides or extensions.
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Append a module filter.
    ///
    /// Filters run in registration order; each sees the previous one's output.
    #[must_use]
    pub fn with_module_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.filters.push(Box::new(filter));
        self
    }

    /// Append a filter that lower-cases module names.
    #[must_use]
    pub fn with_lowercase_modules(self) -> Self
    {
        self.with_module_filter(str::to_lowercase)
    }

    /// Append a filter that renames module `from` to `to`.
    #[must_use]
    pub fn with_module_alias(self, from: impl Into<String>, to: impl Into<String>) -> Self
    {
        let from = from.into();
        let to = to.into();
        self.with_module_filter(move |module| if module == from { to.clone() } else { module.to_string() })
    }

    /// Treat `field` of `owner` (`module!Type`) as type `overridden`.
    ///
    /// `overridden` may be qualified; otherwise it lives in the owner's module.
    #[must_use]
    pub fn with_type_override(
        mut self,
        owner: impl Into<String>,
        field: impl Into<String>,
        overridden: impl Into<String>,
    ) -> Self
    {
        self.overrides.push(PendingOverride {
            owner: owner.into(),
            field: field.into(),
            overridden: overridden.into(),
        });
        self
    }

    /// Register an extended field, reachable with [`DbgObject::extended_field`].
    ///
    /// ## Errors
    ///
    /// `InvalidOperation` if `name` contains a `.`.
    pub fn with_extended_field<F>(
        mut self,
        matcher: TypeMatcher,
        name: impl Into<String>,
        result_type: impl Into<String>,
        resolver: F,
    ) -> NavResult<Self>
    where
        F: Fn(DbgObject) -> futures::future::BoxFuture<'static, NavResult<DbgObject>> + Send + Sync + 'static,
    {
        let name = name.into();
        if name.contains('.') {
            return Err(NavError::invalid(format!("extended field name {name:?} may not contain '.'")));
        }
        let resolver: ObjectResolver = Arc::new(resolver);
        self.extended_fields.add(
            matcher,
            name.clone(),
            ExtendedField {
                name,
                result_type: result_type.into(),
                resolver,
            },
        );
        Ok(self)
    }

    /// Drop the latest extended field `name` registered under `matcher_name`
    /// (see [`TypeMatcher::name`]), uncovering any earlier registration.
    ///
    /// ## Errors
    ///
    /// `LookupFailure` if no such field is registered.
    pub fn without_extended_field(mut self, matcher_name: &str, name: &str) -> NavResult<Self>
    {
        self.extended_fields
            .remove(matcher_name, name)
            .ok_or_else(|| NavError::lookup(format!("no extended field {name:?} registered on {matcher_name}")))?;
        Ok(self)
    }

    /// Register a named array, reachable with [`DbgObject::named_array`].
    ///
    /// When `item_type` is given, every element the getter returns must be
    /// of that type or derive from it.
    #[must_use]
    pub fn with_array_field<F>(mut self, matcher: TypeMatcher, name: impl Into<String>, item_type: Option<&str>, getter: F) -> Self
    where
        F: Fn(DbgObject) -> futures::future::BoxFuture<'static, NavResult<Vec<DbgObject>>> + Send + Sync + 'static,
    {
        let name = name.into();
        let getter: ArrayResolver = Arc::new(getter);
        self.array_fields.add(
            matcher,
            name.clone(),
            ArrayField {
                name,
                item_type: item_type.map(str::to_string),
                getter,
            },
        );
        self
    }

    /// Rename the latest array `name` registered under `matcher_name` and
    /// replace its element type. The getter is kept.
    ///
    /// ## Errors
    ///
    /// `LookupFailure` if no such array is registered.
    pub fn with_updated_array_field(
        mut self,
        matcher_name: &str,
        name: &str,
        new_name: impl Into<String>,
        item_type: Option<&str>,
    ) -> NavResult<Self>
    {
        let new_name = new_name.into();
        let updated = self.array_fields.update(matcher_name, name, new_name.clone(), |array| ArrayField {
            name: new_name,
            item_type: item_type.map(str::to_string),
            getter: Arc::clone(&array.getter),
        });
        if !updated {
            return Err(NavError::lookup(format!("no array {name:?} registered on {matcher_name}")));
        }
        Ok(self)
    }

    /// Drop the latest array `name` registered under `matcher_name`.
    ///
    /// ## Errors
    ///
    /// `LookupFailure` if no such array is registered.
    pub fn without_array_field(mut self, matcher_name: &str, name: &str) -> NavResult<Self>
    {
        self.array_fields
            .remove(matcher_name, name)
            .ok_or_else(|| NavError::lookup(format!("no array {name:?} registered on {matcher_name}")))?;
        Ok(self)
    }

    /// Register a type description, used by [`DbgObject::desc`] when primary.
    #[must_use]
    pub fn with_type_description<F>(mut self, matcher: TypeMatcher, name: impl Into<String>, is_primary: bool, describe: F) -> Self
    where
        F: Fn(DbgObject) -> futures::future::BoxFuture<'static, NavResult<String>> + Send + Sync + 'static,
    {
        let name = name.into();
        let describe: ObjectDescriber = Arc::new(describe);
        self.descriptions.add(
            matcher,
            name.clone(),
            TypeDescription {
                name,
                is_primary,
                describe,
            },
        );
        self
    }

    /// Register a primary description from a synchronous closure.
    #[must_use]
    pub fn with_sync_description<F>(self, matcher: TypeMatcher, name: impl Into<String>, describe: F) -> Self
    where
        F: Fn(&DbgObject) -> String + Send + Sync + 'static,
    {
        let describe = Arc::new(describe);
        self.with_type_description(matcher, name, true, move |object| {
            let text = describe(&object);
            async move { Ok(text) }.boxed()
        })
    }

    /// Drop the latest description `name` registered under `matcher_name`.
    ///
    /// ## Errors
    ///
    /// `LookupFailure` if no such description is registered.
    pub fn without_type_description(mut self, matcher_name: &str, name: &str) -> NavResult<Self>
    {
        self.descriptions
            .remove(matcher_name, name)
            .ok_or_else(|| NavError::lookup(format!("no description {name:?} registered on {matcher_name}")))?;
        Ok(self)
    }

    /// Freeze the configuration.
    ///
    /// Module names of overrides and exact matchers are normalised through
    /// the complete filter chain here, so filters and the entries they affect
    /// may be registered in any order.
    pub fn build(self) -> Registry
    {
        let filters = self.filters;
        let normalize = |module: &str| apply_filters(&filters, module);

        let mut overrides = HashMap::new();
        for pending in self.overrides {
            let owner = TypeDescriptor::parse(&pending.owner, "");
            let owner = owner.with_module(normalize(owner.module()));
            let overridden = TypeDescriptor::parse(&pending.overridden, owner.module());
            let overridden = overridden.with_module(normalize(overridden.module()));
            overrides.insert(format!("{}.{}", owner.non_array_key(), pending.field), overridden);
        }

        let extended_fields = self.extended_fields.map_modules(&normalize);
        let array_fields = self.array_fields.map_modules(&normalize);
        let descriptions = self.descriptions.map_modules(&normalize);

        Registry {
            filters,
            overrides,
            extended_fields,
            array_fields,
            descriptions,
        }
    }
}

fn apply_filters(filters: &[ModuleFilter], module: &str) -> String
{
    filters
        .iter()
        .fold(module.to_string(), |name, filter| filter(&name))
}

/// Frozen engine configuration shared by every handle of a [`Navigator`](crate::Navigator).
pub struct Registry
{
    filters: Vec<ModuleFilter>,
    overrides: HashMap<String, TypeDescriptor>,
    extended_fields: TypeExtensions<ExtendedField>,
    array_fields: TypeExtensions<ArrayField>,
    descriptions: TypeExtensions<TypeDescription>,
}

impl Default for Registry
{
    fn default() -> Self
    {
        RegistryBuilder::new().build()
    }
}

impl fmt::Debug for Registry
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("Registry")
            .field("filters", &self.filters.len())
            .field("overrides", &self.overrides)
            .field("extended_fields", &self.extended_fields.len())
            .field("array_fields", &self.array_fields.len())
            .field("descriptions", &self.descriptions.len())
            .finish()
    }
}

impl Registry
{
    /// Run a module name through every filter, in registration order.
    pub fn normalize_module(&self, module: &str) -> String
    {
        apply_filters(&self.filters, module)
    }

    /// The same type with its module normalised.
    pub fn normalize(&self, ty: &TypeDescriptor) -> TypeDescriptor
    {
        ty.with_module(self.normalize_module(ty.module()))
    }

    /// Parse `module!type` (or a type relative to `context`) and normalise it.
    pub fn parse_type(&self, text: &str, context: &TypeDescriptor) -> TypeDescriptor
    {
        self.normalize(&TypeDescriptor::parse(text, context.module()))
    }

    /// The registered override for `field` of `owner`, if any.
    pub fn field_override(&self, owner: &TypeDescriptor, field: &str) -> Option<&TypeDescriptor>
    {
        self.overrides.get(&format!("{}.{}", owner.non_array_key(), field))
    }

    /// Extended field table.
    pub fn extended_fields(&self) -> &TypeExtensions<ExtendedField>
    {
        &self.extended_fields
    }

    /// Named array table.
    pub fn array_fields(&self) -> &TypeExtensions<ArrayField>
    {
        &self.array_fields
    }

    /// Type description table.
    pub fn descriptions(&self) -> &TypeExtensions<TypeDescription>
    {
        &self.descriptions
    }

    /// The primary description registered for `ty` itself.
    pub fn primary_description(&self, ty: &TypeDescriptor) -> Option<Arc<TypeDescription>>
    {
        self.descriptions
            .all_for(ty)
            .into_iter()
            .map(|(_, description)| description)
            .find(|description| description.is_primary)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_filters_apply_in_order()
    {
        let registry = RegistryBuilder::new()
            .with_module_alias("App", "core")
            .with_lowercase_modules()
            .build();
        assert_eq!(registry.normalize_module("App"), "core");
        assert_eq!(registry.normalize_module("APP"), "app");

        let reversed = RegistryBuilder::new()
            .with_lowercase_modules()
            .with_module_alias("App", "core")
            .build();
        assert_eq!(reversed.normalize_module("App"), "app");
    }

    #[test]
    fn test_aliased_modules_compare_equal()
    {
        let registry = RegistryBuilder::new()
            .with_module_alias("app_debug", "app")
            .build();
        let a = registry.normalize(&TypeDescriptor::new("app_debug", "Node"));
        let b = registry.normalize(&TypeDescriptor::new("app", "Node"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_override_is_normalised_and_relative()
    {
        let registry = RegistryBuilder::new()
            .with_type_override("APP!Widget", "state", "WidgetState")
            .with_lowercase_modules()
            .build();
        let owner = TypeDescriptor::new("app", "Widget");
        let overridden = registry.field_override(&owner, "state").unwrap();
        assert_eq!(overridden.qualified_name(), "app!WidgetState");
        assert!(registry.field_override(&owner, "other").is_none());

        let array_owner = TypeDescriptor::new("app", "Widget[3]");
        assert!(registry.field_override(&array_owner, "state").is_some());
    }

    #[test]
    fn test_extended_field_names_reject_dots()
    {
        let result = RegistryBuilder::new().with_extended_field(
            TypeMatcher::predicate("any", |_| true),
            "a.b",
            "int",
            |object| async move { Ok(object) }.boxed(),
        );
        assert!(matches!(result, Err(NavError::InvalidOperation(_))));
    }

    #[test]
    fn test_removal_uncovers_earlier_registrations()
    {
        let ty = TypeDescriptor::new("app", "Node");
        let registry = RegistryBuilder::new()
            .with_sync_description(TypeMatcher::exact(ty.clone()), "label", |_| "first".to_string())
            .with_sync_description(TypeMatcher::exact(ty.clone()), "label", |_| "second".to_string())
            .without_type_description("app!Node", "label")
            .unwrap()
            .with_extended_field(TypeMatcher::exact(ty.clone()), "self", "Node", |object| async move { Ok(object) }.boxed())
            .unwrap()
            .without_extended_field("app!Node", "self")
            .unwrap()
            .build();

        assert_eq!(registry.descriptions().len(), 1);
        assert!(registry.extended_fields().get(&ty, "self").is_none());

        let error = RegistryBuilder::new().without_type_description("app!Node", "label").unwrap_err();
        assert!(error.is_lookup_failure());
        let error = RegistryBuilder::new().without_extended_field("app!Node", "self").unwrap_err();
        assert!(error.is_lookup_failure());
    }

    #[test]
    fn test_array_fields_update_and_remove()
    {
        let ty = TypeDescriptor::new("app", "Node");
        let builder = RegistryBuilder::new()
            .with_array_field(TypeMatcher::exact(ty.clone()), "items", None, |_| async { Ok(Vec::new()) }.boxed())
            .with_updated_array_field("app!Node", "items", "children", Some("Node"))
            .unwrap();
        assert!(builder
            .with_updated_array_field("app!Node", "items", "x", None)
            .unwrap_err()
            .is_lookup_failure());

        let registry = RegistryBuilder::new()
            .with_array_field(TypeMatcher::exact(ty.clone()), "items", None, |_| async { Ok(Vec::new()) }.boxed())
            .with_updated_array_field("app!Node", "items", "children", Some("Node"))
            .unwrap()
            .build();
        let children = registry.array_fields().get(&ty, "children").unwrap();
        assert_eq!(children.item_type.as_deref(), Some("Node"));
        assert!(registry.array_fields().get(&ty, "items").is_none());

        let registry = RegistryBuilder::new()
            .with_array_field(TypeMatcher::exact(ty.clone()), "items", None, |_| async { Ok(Vec::new()) }.boxed())
            .without_array_field("app!Node", "items")
            .unwrap()
            .build();
        assert!(registry.array_fields().is_empty());
    }

    #[test]
    fn test_primary_description_skips_secondary()
    {
        let ty = TypeDescriptor::new("app", "Node");
        let registry = RegistryBuilder::new()
            .with_sync_description(TypeMatcher::exact(ty.clone()), "primary", |_| "p".to_string())
            .with_type_description(TypeMatcher::exact(ty.clone()), "secondary", false, |_| {
                async { Ok("s".to_string()) }.boxed()
            })
            .build();
        assert_eq!(registry.primary_description(&ty).unwrap().name, "primary");
        assert!(registry.primary_description(&TypeDescriptor::new("app", "Other")).is_none());
    }
}
