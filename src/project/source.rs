//! Configured mapping sources and their one-time classification.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::StackError;
use crate::base::Name;
use crate::base::constants::{INTERMEDIARY, OFFICIAL};
use crate::interchange::{
    MappingError, MappingModel, TinyHeader, Wrapping, detect_wrapping, read_enigma, read_headers,
    read_mappings,
};

/// Declared on-disk format of a source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceFormat {
    /// A tiny jar of either variant; resolved by [`classify`].
    #[default]
    Tiny,
    TinyV1,
    TinyV2,
    TinyGz,
    Enigma,
}

/// A mapping source as configured.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingSource {
    pub name: String,
    pub version: String,
    /// Version of the raw namespace this source was written against.
    pub target_version: String,
    pub path: PathBuf,
    #[serde(default)]
    pub format: SourceFormat,
}

impl MappingSource {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        target_version: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            target_version: target_version.into(),
            path: path.into(),
            format: SourceFormat::Tiny,
        }
    }

    pub fn with_format(mut self, format: SourceFormat) -> Self {
        self.format = format;
        self
    }

    /// `<name>-<version> <targetVersion>`, as recorded in the stack history.
    pub fn history_entry(&self) -> String {
        format!("{}-{} {}", self.name, self.version, self.target_version)
    }
}

// ============================================================================
// Classification
// ============================================================================

/// A concrete, fully resolved source format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResolvedFormat {
    TinyV1,
    TinyV2,
    TinyGz,
    Enigma,
}

impl ResolvedFormat {
    /// Rank by how cheaply the header can be read; lower is cheaper.
    pub fn header_cost(self) -> u8 {
        match self {
            Self::TinyGz => 0,
            Self::TinyV1 => 1,
            Self::TinyV2 => 2,
            Self::Enigma => 3,
        }
    }
}

/// A source with its format resolved and its header read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassifiedSource {
    pub source: MappingSource,
    pub format: ResolvedFormat,
    /// Header of tiny sources; `None` for enigma trees.
    pub header: Option<TinyHeader>,
}

impl ClassifiedSource {
    pub fn path(&self) -> &Path {
        &self.source.path
    }

    pub fn namespaces(&self) -> &[Name] {
        self.header
            .as_ref()
            .map(|h| h.namespaces.as_slice())
            .unwrap_or_default()
    }

    pub fn has_namespace(&self, namespace: &str) -> bool {
        self.header
            .as_ref()
            .is_some_and(|h| h.index_of(namespace).is_some())
    }

    /// Returns true if this source carries an official → intermediary table.
    pub fn supplies_intermediaries(&self) -> bool {
        self.format != ResolvedFormat::Enigma
            && self.has_namespace(OFFICIAL)
            && self.has_namespace(INTERMEDIARY)
    }

    /// Decode the `from` → `to` columns. Enigma trees ignore the labels.
    pub fn read(&self, from: &str, to: &str) -> Result<MappingModel, MappingError> {
        match self.format {
            ResolvedFormat::Enigma => read_enigma(self.path(), from, to),
            _ => read_mappings(self.path(), from, to),
        }
    }
}

/// Resolve the format of one source, reading its header where needed.
pub fn classify(source: &MappingSource) -> Result<ClassifiedSource, StackError> {
    if source.format == SourceFormat::Enigma {
        return Ok(ClassifiedSource {
            source: source.clone(),
            format: ResolvedFormat::Enigma,
            header: None,
        });
    }

    let header = read_headers(&source.path).map_err(|e| match e {
        MappingError::Io(io) => StackError::Io(io),
        _ => StackError::UnknownFormat {
            path: source.path.clone(),
        },
    })?;

    let format = match source.format {
        SourceFormat::TinyGz => ResolvedFormat::TinyGz,
        SourceFormat::TinyV1 if !header.is_v2() => ResolvedFormat::TinyV1,
        SourceFormat::TinyV2 if header.is_v2() => ResolvedFormat::TinyV2,
        SourceFormat::Tiny => {
            if sniff_wrapping(&source.path)? == Wrapping::Gzip {
                ResolvedFormat::TinyGz
            } else if header.is_v2() {
                ResolvedFormat::TinyV2
            } else {
                ResolvedFormat::TinyV1
            }
        }
        _ => {
            return Err(StackError::UnknownFormat {
                path: source.path.clone(),
            });
        }
    };

    tracing::debug!(
        source = %source.history_entry(),
        format = ?format,
        "classified {}",
        source.path.display()
    );
    Ok(ClassifiedSource {
        source: source.clone(),
        format,
        header: Some(header),
    })
}

/// Classify every source, preserving order.
pub fn classify_all(sources: &[MappingSource]) -> Result<Vec<ClassifiedSource>, StackError> {
    sources.iter().map(classify).collect()
}

fn sniff_wrapping(path: &Path) -> Result<Wrapping, StackError> {
    use std::io::Read;

    let mut magic = [0u8; 4];
    let read = std::fs::File::open(path)?.read(&mut magic)?;
    Ok(detect_wrapping(&magic[..read]))
}

/// The source, if any, that should supply the intermediary table for a
/// run on `target_version`: cheapest header first.
pub fn intermediary_supplier<'s>(
    sources: &'s [ClassifiedSource],
    target_version: &str,
) -> Option<&'s ClassifiedSource> {
    let mut candidates: Vec<&ClassifiedSource> = sources
        .iter()
        .filter(|s| s.source.target_version == target_version)
        .collect();
    candidates.sort_by_key(|s| s.format.header_cost());
    candidates.into_iter().find(|s| s.supplies_intermediaries())
}
