//! Canonical type descriptors.

use std::fmt;

/// Scalar type names, each also accepted with a `signed ` or `unsigned ` prefix.
const SCALAR_TYPES: &[&str] = &[
    "bool",
    "char",
    "__int8",
    "short",
    "wchar_t",
    "__wchar_t",
    "__int16",
    "int",
    "__int32",
    "long",
    "float",
    "double",
    "long double",
    "long long",
    "__int64",
];

/// A debuggee type: module, base name, and fixed array length.
///
/// The name is normalised on construction: outer whitespace and `const`
/// qualifiers are removed, and every trailing-or-embedded `[N]` dimension is
/// collapsed into a single element count (`int[2][3]` becomes `int` with
/// six elements). Pointer arity is carried by trailing `*`s in the name.
///
/// Descriptors are immutable; [`dereferenced`](Self::dereferenced) and
/// [`non_array_type`](Self::non_array_type) build new ones.
///
/// Module names are stored as given. The [`Registry`](crate::Registry)
/// normalises them before descriptors reach a [`DbgObject`](crate::DbgObject).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeDescriptor
{
    module: String,
    name: String,
    array_length: Option<u64>,
}

impl TypeDescriptor
{
    /// Build a descriptor from a module and a raw type name.
    pub fn new(module: impl Into<String>, name: &str) -> Self
    {
        let (name, array_length) = split_array_dimensions(&strip_const(name));
        Self {
            module: module.into(),
            name,
            array_length,
        }
    }

    /// Parse `module!type`, or a bare type name that lives in `context_module`.
    pub fn parse(text: &str, context_module: &str) -> Self
    {
        match text.split_once('!') {
            Some((module, name)) => TypeDescriptor::new(module, name),
            None => TypeDescriptor::new(context_module, text),
        }
    }

    /// The untyped `void` in the given module.
    pub fn void(module: impl Into<String>) -> Self
    {
        TypeDescriptor::new(module, "void")
    }

    /// Module that defines the type.
    pub fn module(&self) -> &str
    {
        &self.module
    }

    /// Type name without array dimensions.
    pub fn name(&self) -> &str
    {
        &self.name
    }

    /// Same type in another module.
    #[must_use]
    pub fn with_module(&self, module: impl Into<String>) -> Self
    {
        Self {
            module: module.into(),
            name: self.name.clone(),
            array_length: self.array_length,
        }
    }

    /// Whether the (element) type is a pointer.
    pub fn is_pointer(&self) -> bool
    {
        self.name.ends_with('*')
    }

    /// Whether the type has fixed array dimensions.
    pub fn is_array(&self) -> bool
    {
        self.array_length.is_some()
    }

    /// Total element count across all dimensions, or 0 for non-arrays.
    pub fn array_length(&self) -> u64
    {
        self.array_length.unwrap_or(0)
    }

    /// Whether the name is one of the built-in scalar types.
    pub fn is_scalar(&self) -> bool
    {
        let bare = self
            .name
            .strip_prefix("unsigned ")
            .or_else(|| self.name.strip_prefix("signed "))
            .unwrap_or(&self.name);
        SCALAR_TYPES.contains(&bare)
    }

    /// `float` or `double`.
    pub fn is_float(&self) -> bool
    {
        self.name == "float" || self.name == "double"
    }

    /// `unsigned ...` or plain `char`.
    pub fn is_unsigned(&self) -> bool
    {
        self.name.starts_with("unsigned ") || self.name == "char"
    }

    /// The untyped `void`.
    pub fn is_void(&self) -> bool
    {
        self.name == "void"
    }

    /// The pointee type, or `void` for non-pointers.
    #[must_use]
    pub fn dereferenced(&self) -> Self
    {
        match self.name.strip_suffix('*') {
            Some(pointee) => TypeDescriptor::new(self.module.clone(), pointee),
            None => TypeDescriptor::void(self.module.clone()),
        }
    }

    /// The element type of an array; the type itself otherwise.
    #[must_use]
    pub fn non_array_type(&self) -> Self
    {
        Self {
            module: self.module.clone(),
            name: self.name.clone(),
            array_length: None,
        }
    }

    /// Name including the collapsed array dimension, e.g. `int[6]`.
    pub fn full_name(&self) -> String
    {
        match self.array_length {
            Some(length) => format!("{}[{}]", self.name, length),
            None => self.name.clone(),
        }
    }

    /// `module!full_name`
    pub fn qualified_name(&self) -> String
    {
        format!("{}!{}", self.module, self.full_name())
    }

    /// Key used for per-field tables, ignoring array dimensions.
    pub(crate) fn non_array_key(&self) -> String
    {
        format!("{}!{}", self.module, self.name)
    }

    /// Top-level template arguments, e.g. `["int", "Foo<A, B>"]` for
    /// `Map<int, Foo<A, B>>`. Empty for non-template types.
    pub fn template_parameters(&self) -> Vec<String>
    {
        let (Some(open), Some(close)) = (self.name.find('<'), self.name.rfind('>')) else {
            return Vec::new();
        };
        if close <= open {
            return Vec::new();
        }

        let inner = &self.name[open + 1..close];
        let mut parameters = Vec::new();
        let mut depth = 0_i32;
        let mut start = 0;
        for (index, ch) in inner.char_indices() {
            match ch {
                '<' => depth += 1,
                '>' => depth -= 1,
                ',' if depth == 0 => {
                    parameters.push(inner[start..index].trim().to_string());
                    start = index + 1;
                }
                _ => {}
            }
        }
        parameters.push(inner[start..].trim().to_string());
        parameters
    }
}

impl fmt::Display for TypeDescriptor
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", self.qualified_name())
    }
}

/// Remove outer whitespace and `const` qualifiers.
fn strip_const(raw: &str) -> String
{
    let mut name = raw.trim();
    if let Some(rest) = name.strip_prefix("const ") {
        name = rest.trim_start();
    }
    if let Some(rest) = name.strip_suffix(" const") {
        name = rest.trim_end();
    }

    // `Foo const *` and `Foo *` both become `Foo*`.
    let stars = name.len() - name.trim_end_matches('*').len();
    if stars == 0 {
        return name.to_string();
    }
    let mut base = name[..name.len() - stars].trim_end();
    if let Some(rest) = base.strip_suffix(" const") {
        base = rest.trim_end();
    }
    format!("{}{}", base, "*".repeat(stars))
}

/// Remove every `[N]` group, returning the name and the product of the dimensions.
fn split_array_dimensions(name: &str) -> (String, Option<u64>)
{
    let mut stripped = String::with_capacity(name.len());
    let mut length: Option<u64> = None;
    let mut rest = name;

    while let Some(open) = rest.find('[') {
        let after = &rest[open + 1..];
        let dimension = after
            .find(']')
            .map(|close| &after[..close])
            .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|digits| digits.parse::<u64>().ok().map(|value| (digits.len(), value)));

        match dimension {
            Some((digit_count, value)) => {
                stripped.push_str(&rest[..open]);
                length = Some(length.unwrap_or(1).saturating_mul(value));
                rest = &after[digit_count + 1..];
            }
            None => {
                stripped.push_str(&rest[..=open]);
                rest = after;
            }
        }
    }
    stripped.push_str(rest);
    (stripped.trim().to_string(), length)
}
