//! Defines the on-disk layout of Scribe files.
//!
//! # Layout
//! A file is a JSON header immediately followed by the binary body, with no
//! separator and no length field:
//!
//! ```text
//! {"root":[["f8","x","y"],["f8#","a"]],"types":{...}}<binary body>
//! ```
//!
//! The header ends where the brace count that starts at byte 0 returns to zero.
//! Brace characters are counted raw, so the header must not contain braces
//! inside its string values; the writer refuses to produce such a header.
//!
//! ## Root list
//! `root` lists the top-level records in write order. Consecutive records that
//! share a type are grouped into one entry, `[type, field1, field2, ...]`.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScribeError};
use crate::schema::TypeDict;

/// The parsed JSON header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Header {
    /// Run-length grouped root entries: `[type-name, field-name, ...]`.
    #[serde(default)]
    pub root: Vec<Vec<String>>,
    /// User-defined type definitions.
    #[serde(default)]
    pub types: TypeDict,
    /// Free-form producer metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<serde_json::Value>,
}

/// One top-level record as listed in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootRecord<'h> {
    /// Type name of the record.
    pub type_name: &'h str,
    /// Field name the record was written under.
    pub name: &'h str,
}

impl Header {
    /// Builds a header from `(type-name, field-name)` records in write order,
    /// grouping runs of the same type.
    pub fn from_records(
        records: &[(String, String)],
        types: TypeDict,
        info: Option<serde_json::Value>,
    ) -> Self {
        let mut root: Vec<Vec<String>> = Vec::new();
        for (type_name, name) in records {
            match root.last_mut() {
                Some(entry) if entry.first() == Some(type_name) => entry.push(name.clone()),
                _ => root.push(vec![type_name.clone(), name.clone()]),
            }
        }
        Self { root, types, info }
    }

    /// Expands the grouped root list back into one record per value.
    pub fn records(&self) -> Result<Vec<RootRecord<'_>>> {
        let mut out = Vec::new();
        for entry in &self.root {
            let Some((type_name, names)) = entry.split_first() else {
                return Err(ScribeError::Format("empty entry in header root list".into()));
            };
            out.extend(names.iter().map(|name| RootRecord {
                type_name: type_name.as_str(),
                name: name.as_str(),
            }));
        }
        Ok(out)
    }

    /// Parses header text.
    pub fn parse(text: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(text)?)
    }

    /// Serializes the header and checks that the brace scan recovers its exact length.
    pub fn to_text(&self) -> Result<String> {
        let text = serde_json::to_string(self)?;
        match header_end(text.as_bytes()) {
            Ok(end) if end == text.len() => Ok(text),
            _ => Err(ScribeError::Schema(
                "header would contain brace characters inside string values".into(),
            )),
        }
    }
}

/// Length of the header at the start of `bytes`.
///
/// Counts `{` and `}` from byte 0 until the count returns to zero.
///
/// # Errors
/// `Format` if the first byte is not `{`, a `}` appears unpaired, or the data
/// ends before the count closes.
pub fn header_end(bytes: &[u8]) -> Result<usize> {
    if bytes.first() != Some(&b'{') {
        return Err(ScribeError::Format("header does not start with '{'".into()));
    }
    let mut depth = 0usize;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| ScribeError::Format("unpaired '}' in header".into()))?;
                if depth == 0 {
                    return Ok(i + 1);
                }
            }
            _ => {}
        }
    }
    Err(ScribeError::Format(
        "reached end of file while reading header".into(),
    ))
}
