//! Jar-wrapped mapping tables.
//!
//! Mapping distributions ship their tiny table inside a zip archive:
//!
//! ```text
//! yarn-1.14.4+build.1.jar (ZIP archive)
//! └── mappings/
//!     └── mappings.tiny      # tiny v1 or v2 table
//! ```
//!
//! Enigma distributions ship a zip of `*.mapping` files instead; those are
//! listed with [`entries_with_extension`].

use super::model::MappingModel;
use super::tiny::{WriteMode, write_tiny};
use super::{FormatCapability, MappingError, MappingFormat};
use crate::base::constants::TINY_ARCHIVE_PATH;

/// Jar-wrapped tiny table handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct TinyJar;

impl MappingFormat for TinyJar {
    fn name(&self) -> &'static str {
        "tiny-jar"
    }

    fn capabilities(&self) -> FormatCapability {
        FormatCapability::FULL
    }

    fn read(&self, input: &[u8], from: &str, to: &str) -> Result<MappingModel, MappingError> {
        let entry = read_entry(input, TINY_ARCHIVE_PATH)?;
        let text = std::str::from_utf8(&entry)
            .map_err(|e| MappingError::archive(format!("{TINY_ARCHIVE_PATH} is not UTF-8: {e}")))?;
        super::read_tiny(text, from, to)
    }

    fn write(&self, model: &MappingModel, namespaces: &[&str]) -> Result<Vec<u8>, MappingError> {
        let table = write_tiny(model, namespaces, WriteMode::Everything)?;
        write_archive(TINY_ARCHIVE_PATH, &table)
    }

    fn validate(&self, input: &[u8]) -> Result<(), MappingError> {
        if input.starts_with(ZIP_MAGIC) {
            Ok(())
        } else {
            Err(MappingError::archive("not a zip archive"))
        }
    }
}

/// Local file header signature of a zip archive.
pub const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

// ============================================================================
// ARCHIVE ACCESS (requires archive feature)
// ============================================================================

#[cfg(feature = "archive")]
mod zipped {
    use std::io::{Cursor, Read, Write};

    use zip::ZipArchive;
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    use super::MappingError;

    fn open(input: &[u8]) -> Result<ZipArchive<Cursor<&[u8]>>, MappingError> {
        ZipArchive::new(Cursor::new(input))
            .map_err(|e| MappingError::archive(format!("Failed to open archive: {e}")))
    }

    pub fn read_entry(input: &[u8], path: &str) -> Result<Vec<u8>, MappingError> {
        let mut archive = open(input)?;
        let mut file = archive
            .by_name(path)
            .map_err(|e| MappingError::archive(format!("Failed to read {path}: {e}")))?;

        let mut content = Vec::new();
        file.read_to_end(&mut content)
            .map_err(|e| MappingError::archive(format!("Failed to read {path}: {e}")))?;
        Ok(content)
    }

    pub fn entries_with_extension(
        input: &[u8],
        extension: &str,
    ) -> Result<Vec<(String, Vec<u8>)>, MappingError> {
        let mut archive = open(input)?;
        let suffix = format!(".{extension}");

        let mut names: Vec<String> = archive
            .file_names()
            .filter(|name| name.ends_with(&suffix))
            .map(str::to_string)
            .collect();
        names.sort();

        names
            .into_iter()
            .map(|name| {
                let mut file = archive
                    .by_name(&name)
                    .map_err(|e| MappingError::archive(format!("Failed to read {name}: {e}")))?;
                let mut content = Vec::new();
                file.read_to_end(&mut content)
                    .map_err(|e| MappingError::archive(format!("Failed to read {name}: {e}")))?;
                Ok((name, content))
            })
            .collect()
    }

    pub fn write_archive(path: &str, content: &[u8]) -> Result<Vec<u8>, MappingError> {
        let mut buffer = Cursor::new(Vec::new());
        let mut zip = ZipWriter::new(&mut buffer);

        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        zip.start_file(path, options)
            .map_err(|e| MappingError::archive(format!("Failed to create {path}: {e}")))?;
        zip.write_all(content)
            .map_err(|e| MappingError::archive(format!("Failed to write {path}: {e}")))?;
        zip.finish()
            .map_err(|e| MappingError::archive(format!("Failed to finalize archive: {e}")))?;

        Ok(buffer.into_inner())
    }
}

#[cfg(feature = "archive")]
pub use zipped::{entries_with_extension, read_entry, write_archive};

// Stubs when the feature is disabled
#[cfg(not(feature = "archive"))]
pub fn read_entry(_input: &[u8], _path: &str) -> Result<Vec<u8>, MappingError> {
    Err(MappingError::Unsupported(
        "reading jar archives requires the 'archive' feature".to_string(),
    ))
}

#[cfg(not(feature = "archive"))]
pub fn entries_with_extension(
    _input: &[u8],
    _extension: &str,
) -> Result<Vec<(String, Vec<u8>)>, MappingError> {
    Err(MappingError::Unsupported(
        "reading jar archives requires the 'archive' feature".to_string(),
    ))
}

#[cfg(not(feature = "archive"))]
pub fn write_archive(_path: &str, _content: &[u8]) -> Result<Vec<u8>, MappingError> {
    Err(MappingError::Unsupported(
        "writing jar archives requires the 'archive' feature".to_string(),
    ))
}
