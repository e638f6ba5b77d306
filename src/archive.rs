use std::io::{Cursor, Read};

use crate::error::{Error, Result};

/// One member of a ZIP archive, as listed from the central directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub index: usize,
    pub name: String,
    pub size: u64,
    pub compressed_size: u64,
    pub method: String,
    pub is_dir: bool,
}

/// Decompression backend used by the viewers.
pub trait ZipEngine: Send + Sync {
    fn list(&self, data: &[u8]) -> Result<Vec<ArchiveEntry>>;

    /// Returns the contents of `entries[key]`.
    fn extract(&self, data: &[u8], entries: &[ArchiveEntry], key: usize) -> Result<Vec<u8>>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ZipArchiveEngine;

impl ZipArchiveEngine {
    fn open(data: &[u8]) -> Result<zip::ZipArchive<Cursor<&[u8]>>> {
        zip::ZipArchive::new(Cursor::new(data)).map_err(|e| Error::CorruptArchive(e.to_string()))
    }
}

impl ZipEngine for ZipArchiveEngine {
    fn list(&self, data: &[u8]) -> Result<Vec<ArchiveEntry>> {
        let mut archive = Self::open(data)?;
        let mut entries = Vec::with_capacity(archive.len());

        for i in 0..archive.len() {
            let entry = archive
                .by_index(i)
                .map_err(|e| Error::CorruptArchive(e.to_string()))?;
            entries.push(ArchiveEntry {
                index: i,
                name: entry.name().to_string(),
                size: entry.size(),
                compressed_size: entry.compressed_size(),
                method: format!("{:?}", entry.compression()),
                is_dir: entry.is_dir(),
            });
        }

        Ok(entries)
    }

    fn extract(&self, data: &[u8], entries: &[ArchiveEntry], key: usize) -> Result<Vec<u8>> {
        let wanted = entries
            .get(key)
            .ok_or_else(|| Error::MemberNotFound(format!("no entry with key {key}")))?;

        let mut archive = Self::open(data)?;
        let mut file = match archive.by_index(wanted.index) {
            Ok(file) => file,
            Err(zip::result::ZipError::FileNotFound) => {
                return Err(Error::MemberNotFound(wanted.name.clone()));
            }
            Err(e) => return Err(Error::CorruptArchive(e.to_string())),
        };
        if file.name() != wanted.name {
            return Err(Error::MemberNotFound(wanted.name.clone()));
        }

        let mut content = Vec::with_capacity(wanted.size.min(1 << 20) as usize);
        file.read_to_end(&mut content)
            .map_err(|e| Error::CorruptArchive(format!("{}: {e}", wanted.name)))?;
        Ok(content)
    }
}
