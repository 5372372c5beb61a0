//! Mapping tables and their interchange formats.
//!
//! This module provides the in-memory model and the codecs used to move
//! name mappings between files:
//!
//! - **Tiny v1** - flat tab-separated tables
//! - **Tiny v2** - nested tab-indented tables with parameter names
//! - **Gzip / jar** - either tiny variant, compressed or archived
//! - **Enigma** - indentation trees (read-only)
//!
//! ## Architecture
//!
//! Every format decodes into a standalone [`MappingModel`] restricted to two
//! caller-chosen namespaces. Writers consume anything implementing
//! [`MappingTable`]: a model (two columns) or a [`CombinedMappings`] view
//! (three columns).
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │  tiny v1/v2  │     │  gzip / jar  │     │   enigma     │
//! └──────┬───────┘     └──────┬───────┘     └──────┬───────┘
//!        │                    │                    │
//!        ▼                    ▼                    ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │                  MappingFormat trait                      │
//! │  - read(&[u8], from, to) -> Result<MappingModel>          │
//! │  - write(&MappingModel, namespaces) -> Result<Vec<u8>>    │
//! └──────────────────────────────────────────────────────────┘
//!        │
//!        ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │                MappingModel (standalone)                  │
//! │  - classes: IndexMap<Name, ClassMapping>                  │
//! │  - invert / rename_through / merge                        │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use mapstack::interchange::{read_mappings, write_tiny, WriteMode};
//!
//! let model = read_mappings(Path::new("mappings.tiny"), "official", "named")?;
//! let bytes = write_tiny(&model, &["official", "named"], WriteMode::Compact)?;
//! ```

mod algebra;
pub mod archive;
pub mod compressed;
pub mod convert;
pub mod enigma;
mod error;
mod format;
pub mod model;
pub mod params;
pub mod tiny;
pub mod tiny_v1;
pub mod views;

use std::path::Path;

pub use algebra::{InvertScope, MergeFilter, MergeStats};
pub use archive::TinyJar;
pub use compressed::{Wrapping, detect_wrapping};
pub use convert::{Downgraded, tiny_v2_to_v1};
pub use enigma::{Enigma, read_enigma};
pub use error::MappingError;
pub use format::{FormatCapability, MappingFormat, MappingTable, TableVisitor};
pub use model::{ClassMapping, FieldMapping, MappingModel, MethodMapping};
pub use params::ParameterNames;
pub use tiny::{
    TinyHeader, TinyV2, TinyVersion, TinyWriter, WriteMode, read_headers, read_v2, write_tiny,
};
pub use tiny_v1::{TinyV1, duplicate_column, read_v1, write_v1};
pub use views::CombinedMappings;

/// Body format of a mapping file, independent of any wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectedFormat {
    TinyV1,
    TinyV2,
    Enigma,
}

impl DetectedFormat {
    /// Handler for this format.
    pub fn handler(self) -> Box<dyn MappingFormat> {
        match self {
            Self::TinyV1 => Box::new(TinyV1),
            Self::TinyV2 => Box::new(TinyV2),
            Self::Enigma => Box::new(Enigma),
        }
    }
}

/// Detect wrapping and body format from content alone.
///
/// Returns `None` when the body matches no known format. A zip is
/// reported as enigma when it holds no tiny table.
pub fn detect_format(bytes: &[u8]) -> Option<(Wrapping, DetectedFormat)> {
    let wrapping = detect_wrapping(bytes);
    let body = match compressed::unwrap_bytes(bytes) {
        Ok(body) => body,
        Err(_) if wrapping == Wrapping::Zip => return Some((wrapping, DetectedFormat::Enigma)),
        Err(_) => return None,
    };

    let head = &body[..body.len().min(4096)];
    let first = String::from_utf8_lossy(head);
    let first = first.lines().next().unwrap_or_default();

    match TinyHeader::parse(first) {
        Ok(header) if header.is_v2() => Some((wrapping, DetectedFormat::TinyV2)),
        Ok(_) => Some((wrapping, DetectedFormat::TinyV1)),
        Err(_) if enigma::looks_like_enigma(head) => Some((wrapping, DetectedFormat::Enigma)),
        Err(_) => None,
    }
}

/// Decode a tiny table of either variant, chosen by its header.
pub fn read_tiny(text: &str, from: &str, to: &str) -> Result<MappingModel, MappingError> {
    let first = text.lines().next().unwrap_or_default();
    if TinyHeader::parse(first)?.is_v2() {
        read_v2(text, from, to)
    } else {
        read_v1(text, from, to)
    }
}

/// Read the `from` → `to` columns of any mapping file on disk.
///
/// Directories are read as enigma trees; files are detected by content.
pub fn read_mappings(path: &Path, from: &str, to: &str) -> Result<MappingModel, MappingError> {
    if path.is_dir() {
        return read_enigma(path, from, to);
    }

    let bytes = std::fs::read(path)?;
    let (_, format) = detect_format(&bytes).ok_or_else(|| {
        MappingError::Unsupported(format!("unrecognised mapping file {}", path.display()))
    })?;

    tracing::debug!(format = ?format, "reading {}", path.display());
    format.handler().read(&bytes, from, to)
}
