//! # Type Extensions
//!
//! Tables that attach code-defined behaviour to debuggee types: extended
//! fields (fields computed by a resolver instead of read from type
//! information), named arrays (collections gathered by a getter) and type
//! descriptions (human-readable renderings).
//!
//! Entries are keyed by a [`TypeMatcher`] and a name. Lookups evaluate the
//! matchers against a concrete [`TypeDescriptor`] and take the most recently
//! registered match.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::NavResult;
use crate::object::DbgObject;
use crate::types::TypeDescriptor;

/// Computes one handle from another.
pub type ObjectResolver = Arc<dyn Fn(DbgObject) -> BoxFuture<'static, NavResult<DbgObject>> + Send + Sync>;

/// Gathers the elements of a named array from the owning handle.
pub type ArrayResolver = Arc<dyn Fn(DbgObject) -> BoxFuture<'static, NavResult<Vec<DbgObject>>> + Send + Sync>;

/// Renders a handle as text.
pub type ObjectDescriber = Arc<dyn Fn(DbgObject) -> BoxFuture<'static, NavResult<String>> + Send + Sync>;

/// Type predicate signature used by [`TypeMatcher::Predicate`].
pub type TypePredicate = Arc<dyn Fn(&TypeDescriptor) -> bool + Send + Sync>;

/// Selects the types an extension applies to.
#[derive(Clone)]
pub enum TypeMatcher
{
    /// One type, compared by module and name (array dimensions are ignored).
    Exact(TypeDescriptor),
    /// Any type the predicate accepts. `name` identifies the predicate for removal.
    Predicate
    {
        /// Identifier used by [`TypeExtensions::remove`].
        name: String,
        /// The test itself.
        predicate: TypePredicate,
    },
}

impl TypeMatcher
{
    /// Match exactly one type.
    pub fn exact(ty: TypeDescriptor) -> Self
    {
        TypeMatcher::Exact(ty.non_array_type())
    }

    /// Match every type accepted by `predicate`.
    pub fn predicate<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&TypeDescriptor) -> bool + Send + Sync + 'static,
    {
        TypeMatcher::Predicate {
            name: name.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// Whether `ty` is selected.
    pub fn matches(&self, ty: &TypeDescriptor) -> bool
    {
        match self {
            TypeMatcher::Exact(expected) => expected.module() == ty.module() && expected.name() == ty.name(),
            TypeMatcher::Predicate { predicate, .. } => predicate(ty),
        }
    }

    /// Qualified type name for exact matchers, the predicate name otherwise.
    pub fn name(&self) -> String
    {
        match self {
            TypeMatcher::Exact(ty) => ty.qualified_name(),
            TypeMatcher::Predicate { name, .. } => name.clone(),
        }
    }

    /// Rewrite the module of an exact matcher.
    pub(crate) fn map_module(self, normalize: impl Fn(&str) -> String) -> Self
    {
        match self {
            TypeMatcher::Exact(ty) => {
                let module = normalize(ty.module());
                TypeMatcher::Exact(ty.with_module(module))
            }
            predicate @ TypeMatcher::Predicate { .. } => predicate,
        }
    }
}

impl fmt::Debug for TypeMatcher
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            TypeMatcher::Exact(ty) => f.debug_tuple("Exact").field(&ty.qualified_name()).finish(),
            TypeMatcher::Predicate { name, .. } => f.debug_tuple("Predicate").field(name).finish(),
        }
    }
}

/// A field computed by code rather than read from type information.
#[derive(Clone)]
pub struct ExtendedField
{
    /// Field name. Never contains a `.`.
    pub name: String,
    /// Type the resolver's result must be, or derive from.
    pub result_type: String,
    /// Computes the field from the owning object.
    pub resolver: ObjectResolver,
}

impl fmt::Debug for ExtendedField
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("ExtendedField")
            .field("name", &self.name)
            .field("result_type", &self.result_type)
            .finish_non_exhaustive()
    }
}

/// An array registered by name, reachable with [`DbgObject::named_array`].
#[derive(Clone)]
pub struct ArrayField
{
    /// Array name.
    pub name: String,
    /// Type every element must be, or derive from. `None` skips the check.
    pub item_type: Option<String>,
    /// Gathers the elements from the owning object.
    pub getter: ArrayResolver,
}

impl ArrayField
{
    /// Run the getter on `owner`, without the element type check.
    pub async fn resolve(&self, owner: DbgObject) -> NavResult<Vec<DbgObject>>
    {
        (self.getter)(owner).await
    }
}

impl fmt::Debug for ArrayField
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("ArrayField")
            .field("name", &self.name)
            .field("item_type", &self.item_type)
            .finish_non_exhaustive()
    }
}

/// A named rendering of objects of some type.
#[derive(Clone)]
pub struct TypeDescription
{
    /// Description name.
    pub name: String,
    /// Whether [`DbgObject::desc`] uses this description.
    pub is_primary: bool,
    /// Produces the text.
    pub describe: ObjectDescriber,
}

impl fmt::Debug for TypeDescription
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("TypeDescription")
            .field("name", &self.name)
            .field("is_primary", &self.is_primary)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
struct Entry<E>
{
    matcher: TypeMatcher,
    name: String,
    extension: Arc<E>,
}

/// Extensions of one kind, keyed by type matcher and name.
///
/// Registering the same `(matcher, name)` twice keeps both entries; lookups
/// see only the later one until it is removed.
#[derive(Debug, Clone)]
pub struct TypeExtensions<E>
{
    entries: Vec<Entry<E>>,
}

impl<E> Default for TypeExtensions<E>
{
    fn default() -> Self
    {
        Self { entries: Vec::new() }
    }
}

impl<E> TypeExtensions<E>
{
    /// An empty table.
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Register an extension.
    pub fn add(&mut self, matcher: TypeMatcher, name: impl Into<String>, extension: E)
    {
        self.entries.push(Entry {
            matcher,
            name: name.into(),
            extension: Arc::new(extension),
        });
    }

    /// Remove the most recent registration of `name` under the matcher named
    /// `matcher_name` (see [`TypeMatcher::name`]).
    pub fn remove(&mut self, matcher_name: &str, name: &str) -> Option<Arc<E>>
    {
        let position = self
            .entries
            .iter()
            .rposition(|entry| entry.name == name && entry.matcher.name() == matcher_name)?;
        Some(self.entries.remove(position).extension)
    }

    /// Rename the most recent registration of `name` under `matcher_name` and
    /// replace its extension with `update(old)`.
    ///
    /// Returns `false` when there is no such registration.
    pub fn update<F>(&mut self, matcher_name: &str, name: &str, new_name: impl Into<String>, update: F) -> bool
    where
        F: FnOnce(&E) -> E,
    {
        let Some(entry) = self
            .entries
            .iter_mut()
            .rev()
            .find(|entry| entry.name == name && entry.matcher.name() == matcher_name)
        else {
            return false;
        };
        entry.name = new_name.into();
        entry.extension = Arc::new(update(&entry.extension));
        true
    }

    /// The most recently registered extension called `name` that applies to `ty`.
    pub fn get(&self, ty: &TypeDescriptor, name: &str) -> Option<Arc<E>>
    {
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.name == name && entry.matcher.matches(ty))
            .map(|entry| Arc::clone(&entry.extension))
    }

    /// Every extension that applies to `ty`, most recent first, one per name.
    pub fn all_for(&self, ty: &TypeDescriptor) -> Vec<(String, Arc<E>)>
    {
        let mut found: Vec<(String, Arc<E>)> = Vec::new();
        for entry in self.entries.iter().rev() {
            if entry.matcher.matches(ty) && !found.iter().any(|(name, _)| *name == entry.name) {
                found.push((entry.name.clone(), Arc::clone(&entry.extension)));
            }
        }
        found
    }

    /// Number of registrations.
    pub fn len(&self) -> usize
    {
        self.entries.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool
    {
        self.entries.is_empty()
    }

    pub(crate) fn map_modules(self, normalize: &dyn Fn(&str) -> String) -> Self
    {
        Self {
            entries: self
                .entries
                .into_iter()
                .map(|entry| Entry {
                    matcher: entry.matcher.map_module(normalize),
                    name: entry.name,
                    extension: entry.extension,
                })
                .collect(),
        }
    }
}
