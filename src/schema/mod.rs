//! The schema graph: type descriptors, the dictionary of user-defined types,
//! the interning registry and the type-name parser.

/// Defines the `TypeId` handle.
pub mod id;
/// Defines `TypeNode` and its shape enums.
pub mod node;
/// Defines `TypeDict`, `TypeDef` and `FieldDef`.
pub mod dict;
/// Defines the `TypeRegistry` arena and variable-length resolution.
pub mod registry;

mod parser;

pub use dict::{FieldDef, TypeDef, TypeDict};
pub use id::TypeId;
pub use node::{ArrayLen, Child, TypeKind, TypeNode};
pub use registry::TypeRegistry;
