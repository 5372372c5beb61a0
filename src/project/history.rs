//! Provenance record of multi-source stacks.
//!
//! ```text
//! 2
//! \tyarn-1.14.4+build.2 1.14.4
//! \tenigma-7 1.14.3
//! 1
//! \tyarn-1.14.4+build.1 1.14.4
//! ```
//!
//! Blocks are newest first: a version line, then one tab-indented
//! `<name>-<version> <targetVersion>` line per source in priority order.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::StackError;

/// Version assigned to a stack, and whether the record already knew it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StackVersion {
    pub version: String,
    pub known: bool,
}

impl StackVersion {
    fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            known: false,
        }
    }

    fn known(version: &str) -> Self {
        Self {
            version: version.to_string(),
            known: true,
        }
    }
}

/// The provenance record file.
#[derive(Clone, Debug)]
pub struct StackHistory {
    path: PathBuf,
}

impl StackHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Find the version of the stack made of exactly `expected` entries.
    ///
    /// Unknown stacks get the newest recorded version plus one; a missing
    /// or empty record starts at `1`.
    pub fn lookup(&self, expected: &[String]) -> Result<StackVersion, StackError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(StackVersion::new("1")),
            Err(e) => return Err(e.into()),
        };

        let mut lines = content.lines();
        let Some(newest) = lines.next().filter(|l| !l.trim().is_empty()) else {
            return Ok(StackVersion::new("1"));
        };
        let newest_number: u64 = newest.trim().parse().map_err(|_| {
            StackError::history(&self.path, format!("invalid version line {newest:?}"))
        })?;

        let mut current = Some(newest);
        let mut position = 0;
        for line in lines.filter(|l| !l.is_empty()) {
            match line.strip_prefix('\t') {
                Some(entry) => {
                    if current.is_some() {
                        if expected.get(position).is_some_and(|e| e == entry) {
                            position += 1;
                        } else {
                            current = None;
                        }
                    }
                }
                None => {
                    if let Some(version) = current.filter(|_| position == expected.len()) {
                        return Ok(StackVersion::known(version));
                    }
                    current = Some(line);
                    position = 0;
                }
            }
        }
        if let Some(version) = current.filter(|_| position == expected.len()) {
            return Ok(StackVersion::known(version));
        }

        let next = newest_number
            .checked_add(1)
            .ok_or_else(|| StackError::history(&self.path, "version counter overflow"))?;
        Ok(StackVersion::new(next.to_string()))
    }

    /// Prepend a block for `version` made of `entries`.
    ///
    /// The record is replaced through a sibling file and a rename. When the
    /// rename is refused the block is shifted into the file in place.
    pub fn record(&self, version: &str, entries: &[String]) -> Result<(), StackError> {
        let capacity = 16 + entries.iter().map(|e| e.len() + 2).sum::<usize>();
        let mut block = String::with_capacity(capacity);
        block.push_str(version);
        block.push('\n');
        for entry in entries {
            block.push('\t');
            block.push_str(entry);
            block.push('\n');
        }

        let existing = match std::fs::read(&self.path) {
            Ok(existing) => existing,
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        let mut content = block.clone().into_bytes();
        content.extend_from_slice(&existing);

        let temp = super::stack::temp_sibling(&self.path);
        std::fs::write(&temp, &content)?;
        if let Err(e) = std::fs::rename(&temp, &self.path) {
            tracing::warn!(
                "Could not replace {} ({e}), updating it in place",
                self.path.display()
            );
            let _ = std::fs::remove_file(&temp);
            prepend_in_place(&self.path, block.as_bytes())?;
        }

        tracing::debug!(version, sources = entries.len(), "recorded stack history");
        Ok(())
    }
}

/// Insert `block` at the start of `path` by shifting the existing content
/// forward one block-sized chunk at a time.
///
/// Every step reads the chunk about to be overwritten before writing the
/// pending one, so the file only ever grows.
pub fn prepend_in_place(path: &Path, block: &[u8]) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;

    let chunk = block.len() as u64;
    let mut pending = block.to_vec();
    let mut position = 0u64;
    loop {
        let mut displaced = Vec::with_capacity(pending.len());
        file.seek(SeekFrom::Start(position))?;
        (&mut file).take(chunk).read_to_end(&mut displaced)?;

        file.seek(SeekFrom::Start(position))?;
        file.write_all(&pending)?;
        position += pending.len() as u64;

        if displaced.is_empty() {
            break;
        }
        pending = displaced;
    }

    file.sync_all()
}
