//! Compound value types: struct instances and struct declarations

use indexmap::IndexMap;

use super::Value;

/// A struct instance with named fields.
///
/// Uses IndexMap to preserve field order (declaration order, and
/// predictable iteration for `fieldnames`).
#[derive(Debug, Clone)]
pub struct StructValue {
    /// The struct's type name (e.g., "Point", "Person")
    pub type_name: String,

    /// The struct's fields in declaration order
    pub fields: IndexMap<String, Value>,

    /// Whether the declaring type is `#[frozen]` (fields cannot be set)
    pub frozen: bool,
}

impl StructValue {
    /// Create a new, empty, mutable struct
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: IndexMap::new(),
            frozen: false,
        }
    }

    /// Add a field (builder pattern)
    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Mark the struct as frozen (builder pattern)
    pub fn frozen(mut self) -> Self {
        self.frozen = true;
        self
    }

    /// Get a field by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// A struct declaration registered by a `struct` item.
///
/// ```text
/// #[frozen]
/// struct Point { x: i64, y: i64 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructDecl {
    /// Type name
    pub name: String,

    /// Field names in declaration order
    pub fields: Vec<String>,

    /// Instances of a frozen struct are immutable
    pub frozen: bool,
}

impl StructDecl {
    /// Build a declaration from a parsed `struct` item.
    ///
    /// Returns `None` for tuple and unit structs, which the runtime does not model.
    pub fn from_item(item: &syn::ItemStruct) -> Option<Self> {
        let syn::Fields::Named(named) = &item.fields else {
            return None;
        };

        let fields = named
            .named
            .iter()
            .filter_map(|f| f.ident.as_ref().map(|i| i.to_string()))
            .collect();

        let frozen = item.attrs.iter().any(|attr| attr.path().is_ident("frozen"));

        Some(Self {
            name: item.ident.to_string(),
            fields,
            frozen,
        })
    }
}
