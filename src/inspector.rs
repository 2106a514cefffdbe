//! Tools for looking inside Scribe files: a tree report of the type graph and
//! a JSON rendering of values.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::constants::{MAX_JSON_DEPTH, MAX_TYPE_DEPTH, SELF_REFERENCE};
use crate::error::{Result, ScribeError};
use crate::schema::{ArrayLen, TypeId, TypeKind, TypeRegistry};
use crate::value::ValueNode;

/// The type graph below one node, as a printable tree.
#[derive(Debug, Serialize)]
pub struct TypeReport {
    /// The tree, starting at the reported type.
    pub tree: TypeInfo,
}

/// One node of a [`TypeReport`].
#[derive(Debug, Serialize)]
pub struct TypeInfo {
    /// Field name under the parent, if any.
    pub name: Option<String>,
    /// Canonical type name.
    pub type_name: String,
    /// Shape: "fundamental", "array", "tuple", "union", "user".
    pub kind: &'static str,
    /// Fixed byte length, if the type has one.
    pub fixed_len: Option<usize>,
    /// True when this node stands for an enclosing union (`^`) and is not expanded.
    pub self_reference: bool,
    /// Child nodes.
    pub children: Vec<TypeInfo>,
}

impl TypeReport {
    /// Builds the report for `root`.
    pub fn new(types: &TypeRegistry, root: TypeId) -> Self {
        let mut path = Vec::new();
        Self {
            tree: TypeInfo::build(types, root, None, &mut path),
        }
    }
}

impl TypeInfo {
    fn build(types: &TypeRegistry, id: TypeId, name: Option<&str>, path: &mut Vec<TypeId>) -> Self {
        let node = types.get(id);
        let kind = match node.kind() {
            TypeKind::Fundamental => "fundamental",
            TypeKind::Array(_) => "array",
            TypeKind::Tuple => "tuple",
            TypeKind::Union => "union",
            TypeKind::UserDefined => "user",
        };
        let mut info = Self {
            name: name.map(str::to_owned),
            type_name: node.name().to_owned(),
            kind,
            fixed_len: node.fixed_len(),
            self_reference: false,
            children: Vec::new(),
        };

        // Anything already on the path is a back edge: print it once, don't follow.
        if path.contains(&id) {
            info.self_reference = true;
            if node.is_union() {
                info.type_name = SELF_REFERENCE.to_owned();
            }
            return info;
        }

        // Graphs assembled from many interned names can be deeper than any
        // single parse; stop expanding past the parser's own limit.
        if path.len() >= MAX_TYPE_DEPTH {
            return info;
        }

        path.push(id);
        info.children = node
            .children()
            .iter()
            .map(|c| Self::build(types, c.ty, c.name.as_deref(), path))
            .collect();
        path.pop();
        info
    }

    fn fmt_recursive(&self, f: &mut fmt::Formatter<'_>, prefix: &str, is_last: bool) -> fmt::Result {
        let connector = if is_last { "└── " } else { "├── " };
        let child_prefix = if is_last { "    " } else { "│   " };
        let label = match &self.name {
            Some(name) => format!("{name}: {}", self.type_name),
            None => self.type_name.clone(),
        };
        let size = match self.fixed_len {
            Some(n) => format!("{n}b"),
            None => "var".to_owned(),
        };

        writeln!(f, "{prefix}{connector}{label} [{} | {size}]", self.kind)?;

        for (i, child) in self.children.iter().enumerate() {
            let is_last_child = i == self.children.len() - 1;
            child.fmt_recursive(f, &format!("{prefix}{child_prefix}"), is_last_child)?;
        }
        Ok(())
    }
}

impl fmt::Display for TypeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== SCRIBE TYPE REPORT ===")?;
        self.tree.fmt_recursive(f, "", true)
    }
}

// --- JSON RENDERING ---

impl ValueNode<'_> {
    /// Converts the value to JSON.
    ///
    /// Numbers become JSON numbers (128-bit integers that do not fit become
    /// strings), `null` becomes JSON null, and a union becomes its active
    /// alternative. Aggregates whose children all carry field names become
    /// objects; arrays and anonymous tuples become arrays, with `null` slots
    /// left out.
    ///
    /// Values nested deeper than [`MAX_JSON_DEPTH`] are refused with a
    /// [`ScribeError::Format`] error.
    pub fn to_json(&self) -> Result<Value> {
        self.json_at(0)
    }

    fn json_at(&self, depth: usize) -> Result<Value> {
        if depth > MAX_JSON_DEPTH {
            return Err(ScribeError::Format(format!(
                "value nested more than {MAX_JSON_DEPTH} levels deep"
            )));
        }
        let node = self.resolve()?;
        let ty = node.type_node();
        match ty.kind() {
            TypeKind::Fundamental => node.scalar_json(),
            TypeKind::Union => node.variant()?.json_at(depth),
            TypeKind::Array(_) => Ok(Value::Array(node.json_items(depth)?)),
            TypeKind::Tuple | TypeKind::UserDefined => {
                let named =
                    !ty.children().is_empty() && ty.children().iter().all(|c| c.name.is_some());
                if !named {
                    return Ok(Value::Array(node.json_items(depth)?));
                }
                let mut map = Map::new();
                for child in node.iter()? {
                    let child = child?;
                    map.insert(
                        child.name().unwrap_or_default().to_owned(),
                        child.json_at(depth + 1)?,
                    );
                }
                Ok(Value::Object(map))
            }
        }
    }

    fn json_items(&self, depth: usize) -> Result<Vec<Value>> {
        let mut items = Vec::new();
        for child in self.iter()? {
            let child = child?.resolve()?;
            if child.type_node().is_null() {
                continue;
            }
            items.push(child.json_at(depth + 1)?);
        }
        Ok(items)
    }

    fn scalar_json(&self) -> Result<Value> {
        if self.type_node().is_null() {
            return Ok(Value::Null);
        }
        let value = match self.type_name() {
            "f4" => float(f64::from(self.cast::<f32>()?)),
            "f8" => float(self.cast::<f64>()?),
            "i1" => Value::from(self.cast::<i8>()?),
            "i2" => Value::from(self.cast::<i16>()?),
            "i4" => Value::from(self.cast::<i32>()?),
            "i8" => Value::from(self.cast::<i64>()?),
            "u1" => Value::from(self.cast::<u8>()?),
            "u2" => Value::from(self.cast::<u16>()?),
            "u4" => Value::from(self.cast::<u32>()?),
            "u8" => Value::from(self.cast::<u64>()?),
            "i16" => wide(self.cast::<i128>()?, i64::try_from),
            "u16" => wide(self.cast::<u128>()?, u64::try_from),
            // Widths with no Rust counterpart are shown as their raw bytes.
            _ => Value::Array(self.bytes()?.iter().map(|b| Value::from(*b)).collect()),
        };
        Ok(value)
    }
}

/// Non-finite floats have no JSON form and become null.
fn float(x: f64) -> Value {
    Number::from_f64(x).map_or(Value::Null, Value::Number)
}

fn wide<T, N, E>(x: T, narrow: fn(T) -> std::result::Result<N, E>) -> Value
where
    T: Copy + ToString,
    N: Into<Value>,
{
    match narrow(x) {
        Ok(n) => n.into(),
        Err(_) => Value::String(x.to_string()),
    }
}

/// Byte-level summary of one value, for debugging layouts.
pub fn describe(node: &ValueNode<'_>) -> Result<String> {
    let ty = node.type_node();
    let detail = match ty.kind() {
        TypeKind::Array(ArrayLen::Dynamic) => format!(" count={}", node.array_size()?),
        TypeKind::Union => format!(" index={}", node.union_index()?),
        _ => String::new(),
    };
    Ok(format!(
        "{} @{} len={}{}",
        ty.name(),
        node.offset(),
        node.memlen()?,
        detail
    ))
}
