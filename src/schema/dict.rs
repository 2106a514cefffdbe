//! The dictionary of user-defined types.
//!
//! On disk it is the `"types"` object of the header:
//!
//! ```text
//! "types": { "lin_axis": [["u4","nbins"],["f8","min"],["f8","max"]] }
//! ```
//!
//! Entries may also group several fields of one subtype, `["f8","min","max"]`,
//! the same way root entries do. The writer always emits pairs.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::parser::validate_identifier;
use crate::error::{Result, ScribeError};

/// One field of a user-defined type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    /// Type name of the field.
    pub type_name: String,
    /// Field name.
    pub name: String,
}

impl FieldDef {
    /// Creates a field definition.
    pub fn new(type_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            name: name.into(),
        }
    }
}

/// Ordered field list of a user-defined type.
///
/// The order must match the order in which values of the type are written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeDef {
    fields: Vec<FieldDef>,
}

impl TypeDef {
    /// An empty definition.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field, builder style.
    pub fn field(mut self, type_name: impl Into<String>, name: impl Into<String>) -> Self {
        self.fields.push(FieldDef::new(type_name, name));
        self
    }

    /// Appends a field in place.
    pub fn push(&mut self, field: FieldDef) {
        self.fields.push(field);
    }

    /// The fields in declaration order.
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when the definition has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Expands header entries (`[subtype, field, field, ...]`) into a definition.
    pub fn from_entries(type_name: &str, entries: &[Vec<String>]) -> Result<Self> {
        let mut def = Self::new();
        for entry in entries {
            let Some((subtype, names)) = entry.split_first() else {
                return Err(ScribeError::Schema(format!(
                    "empty field entry in definition of `{type_name}`"
                )));
            };
            if names.is_empty() {
                return Err(ScribeError::Schema(format!(
                    "field entry `{subtype}` in definition of `{type_name}` has no field name"
                )));
            }
            for name in names {
                def.push(FieldDef::new(subtype.as_str(), name.as_str()));
            }
        }
        Ok(def)
    }
}

impl<T: Into<String>, N: Into<String>> FromIterator<(T, N)> for TypeDef {
    fn from_iter<I: IntoIterator<Item = (T, N)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(t, n)| FieldDef::new(t, n))
                .collect(),
        }
    }
}

/// Map from user-defined type name to its field list.
///
/// Each name is present at most once; registration is idempotent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeDict {
    types: BTreeMap<String, TypeDef>,
}

impl TypeDict {
    /// An empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `def` under `name`.
    ///
    /// Returns `Ok(true)` when the entry was added and `Ok(false)` when the same
    /// definition was already present.
    ///
    /// # Errors
    /// `Schema` when `name` is not a valid identifier or is already bound to a
    /// different definition.
    pub fn register(&mut self, name: &str, def: TypeDef) -> Result<bool> {
        validate_identifier(name)?;
        match self.types.entry(name.to_owned()) {
            Entry::Vacant(slot) => {
                slot.insert(def);
                Ok(true)
            }
            Entry::Occupied(existing) if *existing.get() == def => Ok(false),
            Entry::Occupied(_) => Err(ScribeError::Schema(format!(
                "type `{name}` is already registered with a different definition"
            ))),
        }
    }

    /// Definition of `name`.
    pub fn get(&self, name: &str) -> Option<&TypeDef> {
        self.types.get(name)
    }

    /// True when `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TypeDef)> {
        self.types.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Serialize for TypeDict {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.types.len()))?;
        for (name, def) in &self.types {
            let pairs: Vec<[&str; 2]> = def
                .fields
                .iter()
                .map(|f| [f.type_name.as_str(), f.name.as_str()])
                .collect();
            map.serialize_entry(name, &pairs)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TypeDict {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = BTreeMap::<String, Vec<Vec<String>>>::deserialize(deserializer)?;
        let mut types = BTreeMap::new();
        for (name, entries) in raw {
            let def = TypeDef::from_entries(&name, &entries).map_err(D::Error::custom)?;
            types.insert(name, def);
        }
        Ok(Self { types })
    }
}
