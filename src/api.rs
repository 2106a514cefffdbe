use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::error::Result;
use crate::io::Source;
use crate::reader::Reader;
use crate::writer::Writer;

/// How a reader acquires the bytes of a file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadStrategy {
    /// Memory-map the file. Only pages that navigation touches are read.
    #[default]
    Mmap,
    /// Read the whole file into a heap buffer.
    Read,
}

/// Options for opening a file.
///
/// ```rust,ignore
/// let reader = Scribe::options().strategy(LoadStrategy::Read).open("run.scribe")?;
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenOptions {
    strategy: LoadStrategy,
}

impl OpenOptions {
    /// Default options: memory mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the load strategy.
    pub fn strategy(mut self, strategy: LoadStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Opens `path` with these options.
    pub fn open<P: AsRef<Path>>(&self, path: P) -> Result<Reader> {
        let source = match self.strategy {
            LoadStrategy::Mmap => Source::map(path)?,
            LoadStrategy::Read => Source::read(path)?,
        };
        Reader::from_source(source)
    }
}

/// The main entry point.
#[derive(Debug)]
pub struct Scribe;

impl Scribe {
    /// Opens a file by memory-mapping it.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Reader> {
        Reader::open(path)
    }

    /// Opens a file by reading it fully into memory.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Reader> {
        Reader::read(path)
    }

    /// Opens a file already held in memory.
    pub fn open_bytes(bytes: Vec<u8>) -> Result<Reader> {
        Reader::from_bytes(bytes)
    }

    /// Creates a writer for a new file at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Writer<BufWriter<File>>> {
        Writer::create(path)
    }

    /// Options for opening files.
    pub fn options() -> OpenOptions {
        OpenOptions::new()
    }
}
