//! # Scribe
//!
//! A self-describing binary serialization format. Every file carries its own
//! schema as a JSON header, followed by the values in a compact binary body, so
//! a reader needs no prior knowledge of what was written.
//!
//! ## Overview
//!
//! ```text
//! {"root":[["f8","x"],["lin_axis","axis"]],"types":{"lin_axis":[["u4","nbins"],["f8","min"],["f8","max"]]}}<bytes>
//! ```
//!
//! The header lists the top-level records (type name and field name, in write
//! order) and the field lists of user-defined types. Type names follow a small
//! grammar:
//!
//! | Name          | Meaning                                              |
//! |---------------|------------------------------------------------------|
//! | `f8` `i4` `u1`| float / signed / unsigned scalar of that byte width  |
//! | `null`        | zero-width placeholder                               |
//! | `T#N`         | `N` elements of `T`                                  |
//! | `T#`          | `u32` count followed by that many `T`                |
//! | `(A,B)`       | `A` then `B`                                         |
//! | `[A,B]`       | one discriminant byte, then the selected alternative |
//! | `^`           | inside a union: the union itself                     |
//! | `name`        | a user-defined type from the header's `types` map    |
//! | `name<A,B>`   | one instantiation of a parameterised user type       |
//!
//! ### Key Features
//!
//! *   **Zero-Copy Navigation:** a [`ValueNode`] is an offset and a type handle.
//!     Indexing into arrays, tuples and records computes offsets on the fly; no
//!     value is decoded until it is cast.
//! *   **Memory Mapping:** files are mapped by default, so opening a large file
//!     only touches the header.
//! *   **Interned Schemas:** each distinct type name is parsed once per reader
//!     and resolved to a single [`schema::TypeId`].
//! *   **Recursive Types:** unions may refer to themselves with `^`, and
//!     user-defined types may contain themselves through a union or a dynamic
//!     array.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use scribe::{Scribe, ScribeObject};
//!
//! #[derive(ScribeObject)]
//! struct Point {
//!     x: f64,
//!     y: f64,
//! }
//!
//! let mut w = Scribe::create("points.scribe")?;
//! w.write("points", &vec![Point { x: 1.0, y: 2.0 }])?;
//! w.close()?;
//!
//! let r = Scribe::open("points.scribe")?;
//! let y: f64 = r.get("points")?.get(0)?.get("y")?.safe_cast()?;
//! ```
//!
//! ### Safety and Error Handling
//!
//! * **Encapsulated Unsafe:** the only `unsafe` block is the memory-map call in [`io`].
//! * **No Panics:** malformed headers and truncated bodies are reported as
//!   [`ScribeError`]s; every byte read is bounds-checked. Measuring a value
//!   uses an explicit work stack, so deeply recursive data cannot exhaust the
//!   call stack.
//! * **Logging:** the crate emits `tracing` events and installs no subscriber.

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![warn(missing_docs)]

// --- PUBLIC API MODULES ---
pub mod api;
pub mod codec;
pub mod error;
pub mod format;
pub mod inspector;
pub mod reader;
pub mod schema;
pub mod value;
pub mod writer;

// --- INTERNAL IMPLEMENTATION MODULES (Hidden from Docs) ---
#[doc(hidden)]
pub mod io;

// --- MACRO SUPPORT MODULES ---

/// Runtime utilities used by the derived code.
#[doc(hidden)]
pub mod rt;

// --- RE-EXPORTS ---

pub use api::{LoadStrategy, OpenOptions, Scribe};
pub use codec::{Scalar, ScribeValue};
pub use error::{Result, ScribeError};
pub use reader::Reader;
pub use schema::{FieldDef, TypeDef, TypeDict};
pub use value::{NodeKey, ValueIter, ValueNode};
pub use writer::Writer;

// Re-export the derive macro so it is accessible as `scribe::ScribeObject`
pub use scribe_derive::ScribeObject;

/// Constants used throughout the library.
pub mod constants {
    /// Width of the element count that prefixes a dynamic array.
    pub const SIZE_PREFIX_LEN: usize = 4;
    /// Width of the discriminant that prefixes a union value.
    pub const UNION_INDEX_LEN: usize = 1;
    /// The zero-width type.
    pub const NULL_TYPE: &str = "null";
    /// Inside a union's alternative list, stands for the union itself.
    pub const SELF_REFERENCE: &str = "^";
    /// A one-byte discriminant selects among at most this many alternatives.
    pub const MAX_UNION_ALTERNATIVES: usize = 256;
    /// The default buffer size for I/O operations.
    pub const DEFAULT_BUFFER_SIZE: usize = 8 * 1024;
    /// Deepest bracket, array or user-type nesting a type name may have.
    pub const MAX_TYPE_DEPTH: usize = 256;
    /// Deepest value nesting rendered by `ValueNode::to_json`.
    pub const MAX_JSON_DEPTH: usize = 128;
}
