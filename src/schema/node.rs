use super::id::TypeId;
use crate::constants::NULL_TYPE;

/// Length rule of an array type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayLen {
    /// `T#N`: exactly `N` elements, no count prefix in the bytes.
    Fixed(usize),
    /// `T#`: a `u32` count prefix precedes the elements.
    Dynamic,
}

/// Shape of a type descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// Fixed-width scalar (`f8`, `i4`, `u1`, ...) or the zero-width `null`.
    Fundamental,
    /// Homogeneous sequence; the node has exactly one unnamed child, the element type.
    Array(ArrayLen),
    /// `(t1,t2,...)`: fields laid out back to back.
    Tuple,
    /// `[t1,t2,...]`: one discriminant byte followed by the active alternative.
    Union,
    /// Identifier resolved through the type dictionary; children carry field names.
    UserDefined,
}

/// One ordered child of a type descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Child {
    /// The child's type.
    pub ty: TypeId,
    /// Field name, present for user-defined types and the synthetic root.
    pub name: Option<String>,
}

/// A node of the schema graph.
///
/// Nodes are created by the parser, stored in a [`TypeRegistry`](super::TypeRegistry)
/// and never modified once the registry is handed to a reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeNode {
    pub(crate) name: String,
    pub(crate) fixed_len: Option<usize>,
    pub(crate) kind: TypeKind,
    pub(crate) children: Vec<Child>,
}

impl TypeNode {
    pub(crate) fn fundamental(name: &str, width: usize) -> Self {
        Self {
            name: name.to_owned(),
            fixed_len: Some(width),
            kind: TypeKind::Fundamental,
            children: Vec::new(),
        }
    }

    /// Stand-in stored under a handle while its children are still being resolved.
    pub(crate) fn placeholder(name: &str, kind: TypeKind) -> Self {
        Self {
            name: name.to_owned(),
            fixed_len: None,
            kind,
            children: Vec::new(),
        }
    }

    /// The canonical type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Byte length shared by every instance, or `None` when it depends on the bytes.
    pub fn fixed_len(&self) -> Option<usize> {
        self.fixed_len
    }

    /// The node's shape.
    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// Element or field count known from the schema alone.
    ///
    /// Zero for fundamentals and dynamic arrays; the declared length for fixed
    /// arrays; the number of fields or alternatives otherwise.
    pub fn element_count(&self) -> usize {
        match self.kind {
            TypeKind::Fundamental => 0,
            TypeKind::Array(ArrayLen::Fixed(n)) => n,
            TypeKind::Array(ArrayLen::Dynamic) => 0,
            TypeKind::Tuple | TypeKind::Union | TypeKind::UserDefined => self.children.len(),
        }
    }

    /// Number of stored children (1 for arrays).
    pub fn num_children(&self) -> usize {
        self.children.len()
    }

    /// Ordered children.
    pub fn children(&self) -> &[Child] {
        &self.children
    }

    /// Child at `i`, if any.
    pub fn child(&self, i: usize) -> Option<&Child> {
        self.children.get(i)
    }

    /// Element type of an array.
    pub fn element(&self) -> Option<TypeId> {
        match self.kind {
            TypeKind::Array(_) => self.children.first().map(|c| c.ty),
            _ => None,
        }
    }

    /// Position of the child carrying field name `key`.
    pub fn field_index(&self, key: &str) -> Option<usize> {
        self.children
            .iter()
            .position(|c| c.name.as_deref() == Some(key))
    }

    /// True for arrays.
    pub fn is_array(&self) -> bool {
        matches!(self.kind, TypeKind::Array(_))
    }

    /// True for unions.
    pub fn is_union(&self) -> bool {
        self.kind == TypeKind::Union
    }

    /// True for scalars and `null`.
    pub fn is_fundamental(&self) -> bool {
        self.kind == TypeKind::Fundamental
    }

    /// True for the zero-width `null` placeholder.
    pub fn is_null(&self) -> bool {
        self.kind == TypeKind::Fundamental && self.name == NULL_TYPE
    }
}
