//! Zero-copy navigation over encoded values.
//!
//! A [`ValueNode`] is a cursor: a byte offset into a borrowed buffer plus the
//! handle of the type found there. It owns nothing, copies nothing and is
//! `Copy` itself. Lookups compute child offsets on the fly with the registry's
//! variable-length resolution, touching only the fields they walk past.

use std::fmt;

use crate::codec::Scalar;
use crate::constants::{SIZE_PREFIX_LEN, UNION_INDEX_LEN};
use crate::error::{Result, ScribeError};
use crate::schema::registry::{read_size, read_union_index, tail, truncated};
use crate::schema::{ArrayLen, TypeId, TypeKind, TypeNode, TypeRegistry};

/// A read-only view of one encoded value.
#[derive(Clone, Copy)]
pub struct ValueNode<'a> {
    types: &'a TypeRegistry,
    data: &'a [u8],
    offset: usize,
    ty: TypeId,
    name: Option<&'a str>,
}

impl<'a> ValueNode<'a> {
    /// Creates a view of the value of type `ty` at `offset` in `data`.
    pub fn new(types: &'a TypeRegistry, data: &'a [u8], offset: usize, ty: TypeId) -> Self {
        Self {
            types,
            data,
            offset,
            ty,
            name: None,
        }
    }

    fn child(&self, offset: usize, ty: TypeId, name: Option<&'a str>) -> Self {
        Self {
            types: self.types,
            data: self.data,
            offset,
            ty,
            name,
        }
    }

    // --- TYPE INFORMATION ---

    /// Handle of this node's type.
    pub fn type_id(&self) -> TypeId {
        self.ty
    }

    /// Descriptor of this node's type.
    pub fn type_node(&self) -> &'a TypeNode {
        self.types.get(self.ty)
    }

    /// Canonical name of this node's type.
    pub fn type_name(&self) -> &'a str {
        self.type_node().name()
    }

    /// Type name of child `i` of this node's type.
    pub fn type_name_of(&self, i: usize) -> Option<&'a str> {
        let types = self.types;
        self.type_node()
            .child(i)
            .map(|c| types.get(c.ty).name())
    }

    /// Field name inherited from the parent, if any.
    pub fn name(&self) -> Option<&'a str> {
        self.name
    }

    /// The registry the node resolves types against.
    pub fn types(&self) -> &'a TypeRegistry {
        self.types
    }

    // --- RAW BYTES ---

    /// Offset of the value within the backing buffer.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Everything from the start of the value to the end of the buffer.
    fn rest(&self) -> Result<&'a [u8]> {
        tail(self.data, self.offset)
    }

    /// Exact byte length of this value.
    pub fn memlen(&self) -> Result<usize> {
        self.types.memlen(self.ty, self.rest()?)
    }

    /// The bytes of this value, exactly [`memlen`](Self::memlen) long.
    pub fn bytes(&self) -> Result<&'a [u8]> {
        let end = self.offset.saturating_add(self.memlen()?);
        self.data
            .get(self.offset..end)
            .ok_or_else(|| truncated(end))
    }

    // --- SIZE ---

    /// Number of elements or fields.
    ///
    /// Dynamic arrays read their runtime count; unions and fundamentals have no
    /// intrinsic size and return 0.
    pub fn size(&self) -> Result<usize> {
        let node = self.type_node();
        match node.kind() {
            TypeKind::Array(ArrayLen::Dynamic) => self.array_size(),
            TypeKind::Union => Ok(0),
            _ => Ok(node.element_count()),
        }
    }

    /// Runtime count prefix of a dynamic array.
    pub fn array_size(&self) -> Result<usize> {
        match self.type_node().kind() {
            TypeKind::Array(ArrayLen::Dynamic) => Ok(read_size(self.data, self.offset)? as usize),
            _ => Err(self.mismatch("dynamic array")),
        }
    }

    /// True when [`size`](Self::size) is zero.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.size()? == 0)
    }

    // --- UNIONS ---

    /// Discriminant of a union value.
    pub fn union_index(&self) -> Result<u8> {
        if !self.type_node().is_union() {
            return Err(self.mismatch("union"));
        }
        read_union_index(self.data, self.offset)
    }

    /// The active alternative of a union value.
    pub fn variant(&self) -> Result<Self> {
        let index = self.union_index()?;
        let alt = self.types.alternative(self.ty, index)?;
        Ok(self.child(self.offset + UNION_INDEX_LEN, alt, self.name))
    }

    /// Follows union discriminants until a non-union value is reached.
    pub fn resolve(&self) -> Result<Self> {
        let mut node = *self;
        while node.type_node().is_union() {
            node = node.variant()?;
        }
        Ok(node)
    }

    // --- LOOKUP ---

    /// Child selected by an index or a field name.
    ///
    /// ```rust,ignore
    /// let x = reader.root().get("points")?.get(3)?.get("x")?;
    /// ```
    pub fn get<K: NodeKey>(&self, key: K) -> Result<Self> {
        key.lookup(self)
    }

    /// Element or field at `index`.
    ///
    /// Unions are dereferenced first, through any number of nested unions.
    pub fn at(&self, index: usize) -> Result<Self> {
        let node = self.resolve()?;
        let size = node.size()?;
        if index >= size {
            return Err(ScribeError::OutOfBounds { index, size });
        }
        let ty = node.type_node();
        let rest = node.rest()?;
        match ty.kind() {
            TypeKind::Array(_) => {
                let elem = ty
                    .element()
                    .ok_or_else(|| node.mismatch("array with an element type"))?;
                let offset = node.types.element_offset(node.ty, rest, index)?;
                Ok(node.child(node.offset + offset, elem, None))
            }
            TypeKind::Tuple | TypeKind::UserDefined => {
                let offset = node.types.field_offset(node.ty, rest, index)?;
                let child = ty
                    .child(index)
                    .ok_or(ScribeError::OutOfBounds { index, size })?;
                Ok(node.child(node.offset + offset, child.ty, child.name.as_deref()))
            }
            TypeKind::Fundamental | TypeKind::Union => Err(ScribeError::OutOfBounds { index, size }),
        }
    }

    /// Field named `key`.
    pub fn field(&self, key: &str) -> Result<Self> {
        let node = self.resolve()?;
        let index = node
            .type_node()
            .field_index(key)
            .ok_or_else(|| ScribeError::KeyNotFound(key.to_owned()))?;
        node.at(index)
    }

    /// Iterates over the children of this value.
    pub fn iter(&self) -> Result<ValueIter<'a>> {
        ValueIter::new(*self)
    }

    // --- CASTS ---

    /// Reads the bytes at this node as `T` without looking at the schema.
    pub fn cast<T: Scalar>(&self) -> Result<T> {
        let bytes = self
            .data
            .get(self.offset..self.offset + T::WIDTH)
            .ok_or_else(|| truncated(self.offset + T::WIDTH))?;
        T::read_ne(bytes).ok_or_else(|| truncated(self.offset + T::WIDTH))
    }

    /// Reads the bytes at this node as `T` after checking that the recorded
    /// type name is `T`'s codec name.
    pub fn safe_cast<T: Scalar>(&self) -> Result<T> {
        let expected = T::type_name();
        if expected != self.type_name() {
            return Err(ScribeError::TypeMismatch {
                expected,
                found: self.type_name().to_owned(),
            });
        }
        self.cast()
    }

    /// Copies out the elements of an array of scalars.
    pub fn to_scalars<T: Scalar>(&self) -> Result<Vec<T>> {
        let node = self.resolve()?;
        let ty = node.type_node();
        let elem = ty.element().ok_or_else(|| node.mismatch("array"))?;
        let expected = T::type_name();
        if node.types.get(elem).name() != expected {
            return Err(ScribeError::TypeMismatch {
                expected: format!("{expected}#"),
                found: ty.name().to_owned(),
            });
        }
        let start = match ty.kind() {
            TypeKind::Array(ArrayLen::Dynamic) => node.offset + SIZE_PREFIX_LEN,
            _ => node.offset,
        };
        let n = node.size()?;
        let end = start + n * T::WIDTH;
        let bytes = node.data.get(start..end).ok_or_else(|| truncated(end))?;
        bytes
            .chunks_exact(T::WIDTH)
            .map(|b| T::read_ne(b).ok_or_else(|| truncated(end)))
            .collect()
    }

    /// Borrows a byte-string array (`u1#` or `i1#`) as UTF-8 text.
    pub fn as_str(&self) -> Result<&'a str> {
        let node = self.resolve()?;
        let ty = node.type_node();
        let is_byte_array = ty
            .element()
            .is_some_and(|e| matches!(node.types.get(e).name(), "u1" | "i1"));
        if !is_byte_array {
            return Err(node.mismatch("u1#"));
        }
        let start = match ty.kind() {
            TypeKind::Array(ArrayLen::Dynamic) => node.offset + SIZE_PREFIX_LEN,
            _ => node.offset,
        };
        let end = start + node.size()?;
        let bytes = node.data.get(start..end).ok_or_else(|| truncated(end))?;
        std::str::from_utf8(bytes).map_err(|e| ScribeError::Format(format!("invalid UTF-8: {e}")))
    }

    fn mismatch(&self, expected: &str) -> ScribeError {
        ScribeError::TypeMismatch {
            expected: expected.to_owned(),
            found: self.type_name().to_owned(),
        }
    }
}

/// Two nodes are equal when their encoded bytes are identical.
///
/// This is a bitwise comparison, not a structural one; nodes whose bytes cannot
/// be resolved compare unequal.
impl PartialEq for ValueNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self.bytes(), other.bytes()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for ValueNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueNode")
            .field("type", &self.type_name())
            .field("name", &self.name)
            .field("offset", &self.offset)
            .finish()
    }
}

/// Keys accepted by [`ValueNode::get`].
///
/// `usize` is the only integer key, so integer literals infer to it.
pub trait NodeKey {
    /// Selects the child of `node` this key designates.
    fn lookup<'a>(self, node: &ValueNode<'a>) -> Result<ValueNode<'a>>;
}

impl NodeKey for usize {
    fn lookup<'a>(self, node: &ValueNode<'a>) -> Result<ValueNode<'a>> {
        node.at(self)
    }
}

impl NodeKey for &str {
    fn lookup<'a>(self, node: &ValueNode<'a>) -> Result<ValueNode<'a>> {
        node.field(self)
    }
}

impl NodeKey for &String {
    fn lookup<'a>(self, node: &ValueNode<'a>) -> Result<ValueNode<'a>> {
        node.field(self)
    }
}

/// Lazy iterator over the children of a value.
///
/// Each step advances by the resolved length of the child just produced, so
/// iterating a whole aggregate is linear in its size. The iterator stops after
/// the first error.
#[derive(Debug, Clone)]
pub struct ValueIter<'a> {
    parent: ValueNode<'a>,
    index: usize,
    len: usize,
    offset: usize,
    failed: bool,
}

impl<'a> ValueIter<'a> {
    fn new(node: ValueNode<'a>) -> Result<Self> {
        let len = node.size()?;
        let offset = match node.type_node().kind() {
            TypeKind::Array(ArrayLen::Dynamic) => node.offset + SIZE_PREFIX_LEN,
            _ => node.offset,
        };
        Ok(Self {
            parent: node,
            index: 0,
            len,
            offset,
            failed: false,
        })
    }

    fn step(&mut self) -> Result<ValueNode<'a>> {
        let ty = self.parent.type_node();
        let (child_ty, name) = match ty.kind() {
            TypeKind::Array(_) => (
                ty.element()
                    .ok_or_else(|| self.parent.mismatch("array with an element type"))?,
                None,
            ),
            _ => {
                let child = ty.child(self.index).ok_or(ScribeError::OutOfBounds {
                    index: self.index,
                    size: self.len,
                })?;
                (child.ty, child.name.as_deref())
            }
        };
        let node = self.parent.child(self.offset, child_ty, name);
        self.offset += node.memlen()?;
        Ok(node)
    }
}

impl<'a> Iterator for ValueIter<'a> {
    type Item = Result<ValueNode<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.index >= self.len {
            return None;
        }
        let item = self.step();
        self.index += 1;
        if item.is_err() {
            self.failed = true;
        }
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = if self.failed { 0 } else { self.len - self.index };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ValueIter<'_> {}
