//! Collaborators the stack calls out to.
//!
//! Downloading intermediary tables and scanning class files for member
//! descriptors both live outside this crate; a run only sees them through
//! these traits.

use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use super::StackError;
use crate::base::Name;

/// Supplies the official → intermediary table for a version of the raw
/// namespace.
pub trait IntermediaryProvider {
    /// Place the table for `version` at `destination`.
    ///
    /// `destination` is a scratch path; the caller moves it into place once
    /// this returns successfully.
    fn fetch(&self, version: &str, destination: &Path) -> Result<(), StackError>;
}

impl<F> IntermediaryProvider for F
where
    F: Fn(&str, &Path) -> Result<(), StackError>,
{
    fn fetch(&self, version: &str, destination: &Path) -> Result<(), StackError> {
        self(version, destination)
    }
}

/// Intermediary tables already on disk, one `<version>.tiny` per version.
#[derive(Clone, Debug)]
pub struct LocalIntermediaries {
    root: PathBuf,
}

impl LocalIntermediaries {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn table_path(&self, version: &str) -> PathBuf {
        self.root.join(format!("{version}.tiny"))
    }
}

impl IntermediaryProvider for LocalIntermediaries {
    fn fetch(&self, version: &str, destination: &Path) -> Result<(), StackError> {
        let source = self.table_path(version);
        if !source.is_file() {
            return Err(StackError::missing_intermediary(
                version,
                format!("{} does not exist", source.display()),
            ));
        }
        std::fs::copy(&source, destination)?;
        Ok(())
    }
}

/// Field descriptors recovered from class files, keyed by
/// `<className>/<fieldName>`.
pub trait DescriptorLookup {
    fn field_descriptor(&self, key: &str) -> Option<Name>;
}

impl DescriptorLookup for FxHashMap<String, Name> {
    fn field_descriptor(&self, key: &str) -> Option<Name> {
        self.get(key).cloned()
    }
}
