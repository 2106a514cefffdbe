//! The write side.
//!
//! A [`Writer`] collects encoded values in memory and produces the file in one
//! go when it is closed: the JSON header first, then the body.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde_json::Value;

use crate::codec::ScribeValue;
use crate::error::{Result, ScribeError};
use crate::format::Header;
use crate::schema::{TypeDef, TypeDict, TypeRegistry};

const CLOSED: &str = "writer is not in a valid state";

/// Accumulates top-level records and writes them out on [`close`](Writer::close).
///
/// Every record's type name is parsed when it is written, against the types
/// registered so far, so a file that closes successfully can always be read
/// back.
///
/// ```rust,ignore
/// let mut w = Writer::create("run.scribe")?;
/// w.write("x", &1.5f64)?.write("counts", &vec![1u32, 2, 3])?;
/// w.close()?;
/// ```
#[derive(Debug)]
pub struct Writer<W: Write = BufWriter<File>> {
    sink: Option<W>,
    body: Vec<u8>,
    records: Vec<(String, String)>,
    types: TypeDict,
    registry: TypeRegistry,
    info: Option<Value>,
}

impl Writer<BufWriter<File>> {
    /// Creates (or truncates) the file at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> Writer<W> {
    /// Wraps an arbitrary byte sink.
    pub fn new(sink: W) -> Self {
        Self {
            sink: Some(sink),
            body: Vec::with_capacity(crate::constants::DEFAULT_BUFFER_SIZE),
            records: Vec::new(),
            types: TypeDict::new(),
            registry: TypeRegistry::new(),
            info: None,
        }
    }

    /// Appends `value` under the top-level field `name`.
    ///
    /// User-defined types reachable from `T` are registered first, once the
    /// field name has been accepted.
    pub fn write<T: ScribeValue + ?Sized>(&mut self, name: &str, value: &T) -> Result<&mut Self> {
        self.ensure_open()?;
        check_field_name(name)?;
        T::register_types(&mut self.types)?;
        let type_name = T::type_name();
        self.write_with(name, &type_name, |out| value.write_value(out))
    }

    /// Appends a record of type `type_name` whose bytes are produced by `encode`.
    ///
    /// This is the entry point for components that lay out composite values
    /// themselves: register the type with [`add_type`](Self::add_type), then
    /// write each sub-value with the codec in the declared field order.
    /// If `encode` fails, nothing is recorded.
    pub fn write_with<F>(&mut self, name: &str, type_name: &str, encode: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut Vec<u8>) -> Result<()>,
    {
        self.ensure_open()?;
        check_field_name(name)?;
        self.registry.parse(type_name, &self.types)?;

        let mark = self.body.len();
        if let Err(e) = encode(&mut self.body) {
            self.body.truncate(mark);
            return Err(e);
        }
        self.records.push((type_name.to_owned(), name.to_owned()));
        Ok(self)
    }

    /// Registers a user-defined type. Registering the same definition twice is
    /// a no-op.
    pub fn add_type(&mut self, name: &str, def: TypeDef) -> Result<&mut Self> {
        self.ensure_open()?;
        self.types.register(name, def)?;
        Ok(self)
    }

    /// Registers every user-defined type reachable from `T`.
    pub fn add_type_of<T: ScribeValue + ?Sized>(&mut self) -> Result<&mut Self> {
        self.ensure_open()?;
        T::register_types(&mut self.types)?;
        Ok(self)
    }

    /// Attaches free-form metadata, stored under `"info"` in the header.
    pub fn set_info(&mut self, info: Value) -> Result<&mut Self> {
        self.ensure_open()?;
        self.info = Some(info);
        Ok(self)
    }

    /// The types registered so far.
    pub fn types(&self) -> &TypeDict {
        &self.types
    }

    /// Number of top-level records written so far.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no record has been written.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Size of the encoded body so far.
    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    /// True once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.sink.is_none()
    }

    /// Writes the header and the body, flushes, and returns the sink.
    ///
    /// Can be called once. A second call, like any write after it, fails with
    /// [`ScribeError::InvalidState`].
    pub fn close(&mut self) -> Result<W> {
        self.ensure_open()?;
        // A header that cannot be framed leaves the writer open.
        let header = Header::from_records(&self.records, self.types.clone(), self.info.clone());
        let text = header.to_text()?;

        let mut sink = self
            .sink
            .take()
            .ok_or_else(|| ScribeError::InvalidState(CLOSED.into()))?;
        sink.write_all(text.as_bytes())?;
        sink.write_all(&self.body)?;
        sink.flush()?;

        tracing::debug!(
            records = self.records.len(),
            header_len = text.len(),
            body_len = self.body.len(),
            "flushed scribe file"
        );
        self.records.clear();
        self.body = Vec::new();
        self.info = None;
        Ok(sink)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.sink.is_none() {
            return Err(ScribeError::InvalidState(CLOSED.into()));
        }
        Ok(())
    }
}

impl<W: Write> Drop for Writer<W> {
    fn drop(&mut self) {
        if self.sink.is_some() && !self.records.is_empty() {
            tracing::warn!(
                records = self.records.len(),
                "scribe writer dropped without close, records were not written"
            );
        }
    }
}

/// Field names end up as JSON strings in the header; braces would break the
/// header boundary scan.
fn check_field_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ScribeError::Schema("blank field name".into()));
    }
    if name.contains(['{', '}']) {
        return Err(ScribeError::Schema(format!(
            "field name `{name}` contains a brace character"
        )));
    }
    Ok(())
}
