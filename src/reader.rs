//! The read side.
//!
//! Construction does all the work that can fail for structural reasons: it
//! finds the header, parses it, and resolves every root type name. Navigation
//! afterwards only reads the body.

use std::io::Read;
use std::path::Path;

use crate::error::Result;
use crate::format::{Header, header_end};
use crate::inspector::TypeReport;
use crate::io::Source;
use crate::schema::{Child, TypeId, TypeKind, TypeNode, TypeRegistry};
use crate::value::{NodeKey, ValueNode};

/// An open Scribe file.
///
/// The type graph is immutable once the reader is built, so a `&Reader` and
/// the [`ValueNode`]s borrowed from it can be shared across threads.
#[derive(Debug)]
pub struct Reader {
    source: Source,
    header: Header,
    header_len: usize,
    registry: TypeRegistry,
    root: TypeId,
}

impl Reader {
    /// Memory-maps the file at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_source(Source::map(path)?)
    }

    /// Reads the whole file at `path` into memory.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_source(Source::read(path)?)
    }

    /// Drains `reader` into memory and opens the result.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Self::from_source(Source::from_reader(reader)?)
    }

    /// Opens an in-memory file.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::from_source(Source::from(bytes))
    }

    /// Opens a file held in `source`.
    ///
    /// On error the source is dropped before returning, releasing the map or
    /// buffer.
    pub fn from_source(source: Source) -> Result<Self> {
        let header_len = header_end(&source)?;
        let header = Header::parse(&source[..header_len])?;
        tracing::debug!(
            header_len,
            root_entries = header.root.len(),
            types = header.types.len(),
            "parsed scribe header"
        );

        let mut registry = TypeRegistry::new();
        let mut children = Vec::new();
        for record in header.records()? {
            let ty = registry.parse(record.type_name, &header.types)?;
            children.push(Child {
                ty,
                name: Some(record.name.to_owned()),
            });
        }

        let fixed_len = children.iter().try_fold(0usize, |acc, c| {
            registry.get(c.ty).fixed_len().and_then(|n| acc.checked_add(n))
        });
        let names: Vec<&str> = children.iter().map(|c| registry.get(c.ty).name()).collect();
        let root = registry.add_node(TypeNode {
            name: format!("({})", names.join(",")),
            fixed_len,
            kind: TypeKind::Tuple,
            children,
        });

        Ok(Self {
            source,
            header,
            header_len,
            registry,
            root,
        })
    }

    /// The top-level record tuple. Its children are the written records, in
    /// write order, named by their field names.
    pub fn root(&self) -> ValueNode<'_> {
        ValueNode::new(&self.registry, self.data(), 0, self.root)
    }

    /// Shorthand for `root().get(key)`.
    pub fn get<K: NodeKey>(&self, key: K) -> Result<ValueNode<'_>> {
        self.root().get(key)
    }

    /// The parsed header.
    pub fn head(&self) -> &Header {
        &self.header
    }

    /// The raw header text.
    pub fn head_str(&self) -> Result<&str> {
        std::str::from_utf8(&self.source[..self.header_len])
            .map_err(|e| crate::error::ScribeError::Format(format!("header is not UTF-8: {e}")))
    }

    /// The binary body.
    pub fn data(&self) -> &[u8] {
        self.source.get(self.header_len..).unwrap_or_default()
    }

    /// Length of the binary body.
    pub fn data_len(&self) -> usize {
        self.source.len() - self.header_len
    }

    /// The registry holding every type resolved for this file.
    pub fn types(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Handle of the synthetic root tuple.
    pub fn root_type(&self) -> TypeId {
        self.root
    }

    /// The buffer the reader navigates.
    pub fn source(&self) -> &Source {
        &self.source
    }

    /// A tree rendering of the root type.
    pub fn print_types(&self) -> TypeReport {
        TypeReport::new(&self.registry, self.root)
    }
}

impl Drop for Reader {
    fn drop(&mut self) {
        tracing::debug!(
            len = self.source.len(),
            mapped = self.source.is_mapped(),
            "released scribe file"
        );
    }
}
