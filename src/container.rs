use std::io::Write;
use std::sync::{Mutex, MutexGuard};

use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};

/// Every entry's stored region ends on this boundary, so the next entry
/// always starts aligned.
const ENTRY_ALIGNMENT: u64 = 8;

/// Zlib-compress a serialized descriptor.
pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder
        .write_all(data)
        .and_then(|_| encoder.finish())
        .map_err(|e| Error::Compression(e.to_string()))
}

/// Placement record for one packed descriptor, consumed by the external
/// container writer.
#[derive(Debug, Clone, Serialize)]
pub struct ContainerEntry {
    pub name: String,
    pub offset: u64,
    pub compressed_len: u32,
    pub stored_len: u32,
    pub raw_len: u32,
}

struct CountingWriter<W: Write> {
    inner: W,
    position: u64,
}

impl<W: Write> CountingWriter<W> {
    fn write_all(&mut self, data: &[u8]) -> std::io::Result<()> {
        self.inner.write_all(data)?;
        self.position += data.len() as u64;
        Ok(())
    }
}

/// Serializes descriptors into a shared output stream: compress, append at
/// the current end, zero-pad to 8 bytes, record the entry.
///
/// The physical writer and the entry list have independent locks. The
/// commit lock is held by a worker across one map's three appends, so a
/// map's entries are contiguous in the output.
pub struct ContainerPackager<W: Write> {
    writer: Mutex<CountingWriter<W>>,
    entries: Mutex<Vec<ContainerEntry>>,
    commit: Mutex<()>,
}

impl<W: Write> ContainerPackager<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(CountingWriter { inner: writer, position: 0 }),
            entries: Mutex::new(Vec::new()),
            commit: Mutex::new(()),
        }
    }

    /// Serialize one map's descriptors under this guard to keep its entries
    /// together.
    pub fn commit_lock(&self) -> MutexGuard<'_, ()> {
        lock(&self.commit)
    }

    pub fn append(&self, name: &str, raw: &[u8]) -> Result<ContainerEntry> {
        let compressed = compress(raw)?;
        let padding = (ENTRY_ALIGNMENT - compressed.len() as u64 % ENTRY_ALIGNMENT)
            % ENTRY_ALIGNMENT;

        let offset = {
            let mut writer = lock(&self.writer);
            let offset = writer.position;
            writer.write_all(&compressed)?;
            writer.write_all(&[0u8; 8][..padding as usize])?;
            offset
        };

        let entry = ContainerEntry {
            name: name.to_string(),
            offset,
            compressed_len: compressed.len() as u32,
            stored_len: compressed.len() as u32 + padding as u32,
            raw_len: raw.len() as u32,
        };
        debug!(
            name,
            offset,
            compressed = entry.compressed_len,
            raw = entry.raw_len,
            "entry packed"
        );
        lock(&self.entries).push(entry.clone());
        Ok(entry)
    }

    /// Snapshot of the entry list in append order.
    pub fn entries(&self) -> Vec<ContainerEntry> {
        lock(&self.entries).clone()
    }

    /// Flush and hand back the stream plus the final entry list.
    pub fn finish(self) -> Result<(W, Vec<ContainerEntry>)> {
        let mut writer = self
            .writer
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        writer.inner.flush()?;
        let entries = self
            .entries
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok((writer.inner, entries))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
