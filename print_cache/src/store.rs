//! Bulk file reading for the print store
//!
//! Bulk files are JSON arrays, optionally gzip-compressed. Compression is
//! detected from the magic bytes, not the file extension.

use crate::error::{CacheError, Result};
use flate2::read::GzDecoder;
use mtg_common::PrintRecord;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Open a bulk file, transparently decompressing gzip
fn open_bulk(path: &Path) -> Result<Box<dyn Read>> {
    if !path.exists() {
        return Err(CacheError::MissingFile(path.to_path_buf()));
    }
    let mut reader = BufReader::with_capacity(1 << 20, File::open(path)?);
    let is_gzip = reader.fill_buf()?.starts_with(&GZIP_MAGIC);
    if is_gzip {
        log::debug!("{} is gzip-compressed", path.display());
        Ok(Box::new(BufReader::new(GzDecoder::new(reader))))
    } else {
        Ok(Box::new(reader))
    }
}

/// Read a JSON array from disk, deserializing each element independently.
///
/// Elements that fail to deserialize are skipped (and counted in the log) so
/// that one defective record cannot discard the whole file.
pub fn read_json_array<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let reader = open_bulk(path)?;
    let value: serde_json::Value = serde_json::from_reader(reader)?;
    let serde_json::Value::Array(items) = value else {
        return Err(CacheError::NotAnArray(path.to_path_buf()));
    };

    let total = items.len();
    let mut skipped = 0usize;
    let mut out = Vec::with_capacity(total);
    for item in items {
        match serde_json::from_value::<T>(item) {
            Ok(record) => out.push(record),
            Err(e) => {
                skipped += 1;
                log::debug!("Skipping malformed record in {}: {}", path.display(), e);
            }
        }
    }
    if skipped > 0 {
        log::warn!(
            "Skipped {} of {} malformed records in {}",
            skipped,
            total,
            path.display()
        );
    }
    Ok(out)
}

/// Read the prints bulk file
pub fn read_prints(path: &Path) -> Result<Vec<PrintRecord>> {
    let prints: Vec<PrintRecord> = read_json_array(path)?;
    log::info!("Read {} prints from {}", prints.len(), path.display());
    Ok(prints)
}
