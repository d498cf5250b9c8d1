//! Archive containers that serialized records are written into.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Seek, Write};
use std::path::Path;
use thiserror::Error;
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Archive is already finished")]
    Finished,

    #[error("Duplicate archive entry {0}")]
    DuplicateEntry(String),
}

/// Destination for archive entries
pub trait ArchiveSink {
    fn put(&mut self, name: &str, bytes: &[u8]) -> Result<()>;

    /// Completes the container. No entries may be added afterwards.
    fn finish(&mut self) -> Result<()>;
}

impl<S: ArchiveSink + ?Sized> ArchiveSink for &mut S {
    fn put(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        (**self).put(name, bytes)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

/// Zip container with deflated entries and fixed entry timestamps, so equal
/// content gives equal bytes
pub struct ZipSink<W: Write + Seek> {
    writer: ZipWriter<W>,
    inner: Option<W>,
}

impl ZipSink<File> {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create archive {}", path.display()))?;
        Ok(Self::new(file))
    }
}

impl<W: Write + Seek> ZipSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: ZipWriter::new(writer),
            inner: None,
        }
    }

    fn options() -> FileOptions {
        FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default())
    }

    /// Underlying writer, once the archive is finished
    pub fn into_inner(self) -> Option<W> {
        self.inner
    }
}

impl<W: Write + Seek> ArchiveSink for ZipSink<W> {
    fn put(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        if self.inner.is_some() {
            return Err(SinkError::Finished.into());
        }
        self.writer
            .start_file(name, Self::options())
            .with_context(|| format!("Failed to start archive entry {}", name))?;
        self.writer
            .write_all(bytes)
            .with_context(|| format!("Failed to write archive entry {}", name))?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if self.inner.is_some() {
            return Ok(());
        }
        let mut inner = self.writer.finish().context("Failed to finish archive")?;
        inner.flush().context("Failed to flush archive")?;
        self.inner = Some(inner);
        Ok(())
    }
}

/// In-memory container keyed by entry name
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: BTreeMap<String, Vec<u8>>,
    finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    pub fn get_json(&self, name: &str) -> Option<serde_json::Value> {
        serde_json::from_slice(self.get(name)?).ok()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Entries under one folder, e.g. `"categories"`
    pub fn folder(&self, folder: &str) -> Vec<(&str, &[u8])> {
        let prefix = format!("{}/", folder);
        self.entries
            .iter()
            .filter(|(name, _)| name.starts_with(&prefix))
            .map(|(name, bytes)| (name.as_str(), bytes.as_slice()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl ArchiveSink for MemorySink {
    fn put(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        if self.finished {
            return Err(SinkError::Finished.into());
        }
        if self.entries.contains_key(name) {
            return Err(SinkError::DuplicateEntry(name.to_string()).into());
        }
        self.entries.insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}
