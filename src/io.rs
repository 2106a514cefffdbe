//! Backing buffers for readers.
//!
//! A [`Source`] owns the bytes a reader navigates: either a read-only memory
//! map of a regular file, or a heap buffer filled from a file, a pipe, or the
//! caller. Dropping the source releases the map or the allocation exactly once.

use std::fs::File;
use std::io::{self, Read};
use std::ops::Deref;
use std::path::Path;

use memmap2::Mmap;

use crate::error::Result;

/// The bytes behind a reader.
#[derive(Debug)]
pub enum Source {
    /// A read-only memory map.
    Mapped(Mmap),
    /// An owned heap buffer.
    Owned(Vec<u8>),
}

impl Source {
    /// Memory-maps a regular file.
    pub fn map<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let meta = file.metadata()?;
        if !meta.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            )
            .into());
        }

        // Safety: the map is read-only. Another process truncating or rewriting the
        // file while it is mapped is outside what this crate can guard against.
        #[allow(unsafe_code)]
        let mmap = unsafe { Mmap::map(&file)? };

        tracing::debug!(path = %path.display(), len = mmap.len(), "mapped scribe file");
        Ok(Self::Mapped(mmap))
    }

    /// Reads a whole file into memory.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        tracing::debug!(path = %path.display(), len = bytes.len(), "read scribe file");
        Ok(Self::Owned(bytes))
    }

    /// Drains `reader` (a pipe, a socket, a decompressor...) into memory.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut bytes = Vec::with_capacity(crate::constants::DEFAULT_BUFFER_SIZE);
        reader.read_to_end(&mut bytes)?;
        Ok(Self::Owned(bytes))
    }

    /// Total length in bytes.
    pub fn len(&self) -> usize {
        self.as_ref().len()
    }

    /// True for an empty buffer.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when the bytes come from a memory map.
    pub fn is_mapped(&self) -> bool {
        matches!(self, Self::Mapped(_))
    }
}

impl From<Vec<u8>> for Source {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Owned(bytes)
    }
}

impl AsRef<[u8]> for Source {
    fn as_ref(&self) -> &[u8] {
        match self {
            Self::Mapped(m) => &m[..],
            Self::Owned(v) => v.as_slice(),
        }
    }
}

impl Deref for Source {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_ref()
    }
}
