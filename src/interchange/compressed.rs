//! Transparent unwrapping of compressed or archived tables.
//!
//! Wrappers are detected by content, never by file extension.

use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

use super::MappingError;
use super::archive::{self, ZIP_MAGIC};
use crate::base::constants::TINY_ARCHIVE_PATH;

/// Member header signature of a gzip stream.
pub const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];

/// How a byte stream is wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wrapping {
    Plain,
    Gzip,
    /// A jar holding a tiny table at `mappings/mappings.tiny`.
    Zip,
}

/// Detect the wrapping of `bytes` from its leading magic number.
pub fn detect_wrapping(bytes: &[u8]) -> Wrapping {
    if bytes.starts_with(GZIP_MAGIC) {
        Wrapping::Gzip
    } else if bytes.starts_with(ZIP_MAGIC) {
        Wrapping::Zip
    } else {
        Wrapping::Plain
    }
}

/// Strip any wrapping from `bytes`.
pub fn unwrap_bytes(bytes: &[u8]) -> Result<Cow<'_, [u8]>, MappingError> {
    match detect_wrapping(bytes) {
        Wrapping::Plain => Ok(Cow::Borrowed(bytes)),
        Wrapping::Gzip => {
            let mut out = Vec::with_capacity(bytes.len() * 4);
            GzDecoder::new(bytes).read_to_end(&mut out)?;
            Ok(Cow::Owned(out))
        }
        Wrapping::Zip => archive::read_entry(bytes, TINY_ARCHIVE_PATH).map(Cow::Owned),
    }
}

/// Strip any wrapping and decode the result as UTF-8 text.
pub fn decode_text(bytes: &[u8]) -> Result<Cow<'_, str>, MappingError> {
    match unwrap_bytes(bytes)? {
        Cow::Borrowed(raw) => std::str::from_utf8(raw)
            .map(Cow::Borrowed)
            .map_err(|e| MappingError::format(0, format!("input is not UTF-8: {e}"))),
        Cow::Owned(raw) => String::from_utf8(raw)
            .map(Cow::Owned)
            .map_err(|e| MappingError::format(0, format!("input is not UTF-8: {e}"))),
    }
}

/// Read and decode a whole file, unwrapping it if needed.
pub fn read_text(path: &Path) -> Result<String, MappingError> {
    let bytes = std::fs::read(path)?;
    Ok(decode_text(&bytes)?.into_owned())
}

/// Read the first line of a possibly wrapped file without decoding the rest.
pub fn read_first_line(path: &Path) -> Result<String, MappingError> {
    let mut file = File::open(path)?;
    let mut magic = [0u8; 4];
    let read = file.read(&mut magic)?;
    let magic = &magic[..read];

    let mut line = String::new();
    match detect_wrapping(magic) {
        Wrapping::Plain => {
            BufReader::new(File::open(path)?).read_line(&mut line)?;
        }
        Wrapping::Gzip => {
            BufReader::new(GzDecoder::new(File::open(path)?)).read_line(&mut line)?;
        }
        Wrapping::Zip => {
            let bytes = std::fs::read(path)?;
            let entry = archive::read_entry(&bytes, TINY_ARCHIVE_PATH)?;
            BufReader::new(entry.as_slice()).read_line(&mut line)?;
        }
    }

    let trimmed = line.trim_end_matches(['\r', '\n']).len();
    line.truncate(trimmed);
    Ok(line)
}

/// Gzip-compress `bytes`.
pub fn gzip(bytes: &[u8]) -> Result<Vec<u8>, MappingError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    Ok(encoder.finish()?)
}
