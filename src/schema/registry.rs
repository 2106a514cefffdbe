use std::collections::HashMap;

use super::dict::TypeDict;
use super::id::TypeId;
use super::node::{ArrayLen, TypeKind, TypeNode};
use super::parser::TypeParser;
use crate::constants::{SIZE_PREFIX_LEN, UNION_INDEX_LEN};
use crate::error::{Result, ScribeError};

/// Arena of type descriptors with name interning.
///
/// Every distinct type name maps to exactly one [`TypeId`]; resolving the same
/// name twice returns the same handle. Nodes are addressed by handle, so a
/// union can list itself among its alternatives without owning a cycle.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    nodes: Vec<TypeNode>,
    by_name: HashMap<String, TypeId>,
}

impl TypeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves `name` against `dict`, parsing and interning whatever is new.
    pub fn parse(&mut self, name: &str, dict: &TypeDict) -> Result<TypeId> {
        TypeParser::new(self, dict).resolve(name)
    }

    /// Handle previously interned under `name`.
    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    /// Descriptor behind `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` was issued by another registry.
    pub fn get(&self, id: TypeId) -> &TypeNode {
        self.nodes
            .get(id.index())
            .expect("TypeRegistry invariant violated: TypeId out of bounds")
    }

    /// Number of descriptors, interned or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when no descriptor has been created.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All interned names with their handles.
    pub fn interned(&self) -> impl Iterator<Item = (&str, TypeId)> {
        self.by_name.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Stores a node without interning it.
    pub(crate) fn add_node(&mut self, node: TypeNode) -> TypeId {
        let id = TypeId::new(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        self.nodes.push(node);
        id
    }

    pub(crate) fn intern(&mut self, name: &str, id: TypeId) {
        self.by_name.insert(name.to_owned(), id);
    }

    /// Drops every node created at or after `mark`, along with its interned name.
    pub(crate) fn rollback(&mut self, mark: usize) {
        self.nodes.truncate(mark);
        self.by_name.retain(|_, id| id.index() < mark);
    }

    /// Back-patches a placeholder once its children are known.
    pub(crate) fn replace_node(&mut self, id: TypeId, node: TypeNode) {
        if let Some(slot) = self.nodes.get_mut(id.index()) {
            *slot = node;
        }
    }

    /// Active alternative of union `id` for discriminant `index`.
    pub fn alternative(&self, id: TypeId, index: u8) -> Result<TypeId> {
        let node = self.get(id);
        node.child(usize::from(index))
            .map(|c| c.ty)
            .ok_or_else(|| {
                ScribeError::Format(format!(
                    "union index {index} out of range for `{}` with {} alternatives",
                    node.name,
                    node.children.len()
                ))
            })
    }

    /// Exact byte length of the instance of `id` encoded at the start of `data`.
    ///
    /// Fixed-size types answer from the schema. Everything else is walked:
    /// dynamic arrays read their count prefix, unions their discriminant, and
    /// aggregates add up their fields one by one. The walk keeps its own stack
    /// of pending instances, so its depth does not follow the nesting of the data.
    pub fn memlen(&self, id: TypeId, data: &[u8]) -> Result<usize> {
        if let Some(len) = self.get(id).fixed_len {
            return Ok(len);
        }

        let mut offset = 0usize;
        // Instances still to measure, in reverse order: (type, repetitions).
        let mut pending = vec![(id, 1usize)];
        while let Some((ty, count)) = pending.pop() {
            if count > 1 {
                pending.push((ty, count - 1));
            }
            let node = self.get(ty);
            if let Some(len) = node.fixed_len {
                offset = advance(offset, len, node)?;
                continue;
            }
            match node.kind {
                TypeKind::Fundamental => {}
                TypeKind::Array(len) => {
                    let elems = match len {
                        ArrayLen::Fixed(n) => n,
                        ArrayLen::Dynamic => {
                            let n = read_size(data, offset)? as usize;
                            offset = advance(offset, SIZE_PREFIX_LEN, node)?;
                            n
                        }
                    };
                    let elem = node.element().ok_or_else(|| missing_element(node))?;
                    match self.get(elem).fixed_len {
                        Some(elem_len) => {
                            let len = elem_len.checked_mul(elems).ok_or_else(|| overflow(node))?;
                            offset = advance(offset, len, node)?;
                        }
                        None if elems > 0 => pending.push((elem, elems)),
                        None => {}
                    }
                }
                TypeKind::Union => {
                    let index = read_union_index(data, offset)?;
                    offset = advance(offset, UNION_INDEX_LEN, node)?;
                    pending.push((self.alternative(ty, index)?, 1));
                }
                TypeKind::Tuple | TypeKind::UserDefined => {
                    pending.extend(node.children.iter().rev().map(|c| (c.ty, 1)));
                }
            }
        }
        Ok(offset)
    }

    /// Offset of field `index` of aggregate `id`, relative to the start of `data`.
    ///
    /// Walks fields `0..index`, so the cost grows with the index, not with the
    /// size of the whole value.
    pub(crate) fn field_offset(&self, id: TypeId, data: &[u8], index: usize) -> Result<usize> {
        let node = self.get(id);
        let mut offset = 0;
        for child in node.children.iter().take(index) {
            offset += self.memlen(child.ty, tail(data, offset)?)?;
        }
        Ok(offset)
    }

    /// Offset of element `index` of array `id`, relative to the start of `data`.
    pub(crate) fn element_offset(&self, id: TypeId, data: &[u8], index: usize) -> Result<usize> {
        let node = self.get(id);
        let elem = node.element().ok_or_else(|| missing_element(node))?;
        let mut offset = match node.kind {
            TypeKind::Array(ArrayLen::Dynamic) => SIZE_PREFIX_LEN,
            _ => 0,
        };
        if let Some(elem_len) = self.get(elem).fixed_len {
            return elem_len
                .checked_mul(index)
                .and_then(|n| n.checked_add(offset))
                .ok_or_else(|| overflow(node));
        }
        for _ in 0..index {
            offset += self.memlen(elem, tail(data, offset)?)?;
        }
        Ok(offset)
    }
}

fn overflow(node: &TypeNode) -> ScribeError {
    ScribeError::Format(format!("length of `{}` overflows", node.name))
}

fn advance(offset: usize, len: usize, node: &TypeNode) -> Result<usize> {
    offset.checked_add(len).ok_or_else(|| overflow(node))
}

fn missing_element(node: &TypeNode) -> ScribeError {
    ScribeError::Schema(format!("array type `{}` has no element type", node.name))
}

/// `data[offset..]`, or a `Format` error when the body is too short.
pub(crate) fn tail(data: &[u8], offset: usize) -> Result<&[u8]> {
    data.get(offset..).ok_or_else(|| truncated(offset))
}

pub(crate) fn read_size(data: &[u8], offset: usize) -> Result<u32> {
    let end = offset.saturating_add(SIZE_PREFIX_LEN);
    let bytes = data.get(offset..end).ok_or_else(|| truncated(end))?;
    let mut buf = [0u8; SIZE_PREFIX_LEN];
    buf.copy_from_slice(bytes);
    Ok(u32::from_ne_bytes(buf))
}

pub(crate) fn read_union_index(data: &[u8], offset: usize) -> Result<u8> {
    data.get(offset)
        .copied()
        .ok_or_else(|| truncated(offset.saturating_add(UNION_INDEX_LEN)))
}

pub(crate) fn truncated(needed: usize) -> ScribeError {
    ScribeError::Format(format!("data truncated: needed at least {needed} bytes"))
}
