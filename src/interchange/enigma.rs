//! Enigma mapping trees (read-only).
//!
//! ```text
//! CLASS a net/example/Foo
//! \tFIELD b count I
//! \tMETHOD c update (La;I)V
//! \t\tARG 1 other
//! \tCLASS d Inner
//! \t\tCOMMENT nested classes resolve to a$d -> net/example/Foo$Inner
//! ```
//!
//! Trees come as one file, a directory of `*.mapping` files or a zip of
//! them. Descriptors are written in the from-namespace.

use std::path::{Path, PathBuf};

use super::archive::{self, ZIP_MAGIC};
use super::model::MappingModel;
use super::{FormatCapability, MappingError, MappingFormat};
use crate::base::constants::{ENIGMA_EXTENSION, MAX_PARAMETER_SLOT};

/// Enigma tree handler. Namespace labels are not part of the format.
#[derive(Debug, Clone, Copy, Default)]
pub struct Enigma;

impl MappingFormat for Enigma {
    fn name(&self) -> &'static str {
        "enigma"
    }

    fn capabilities(&self) -> FormatCapability {
        FormatCapability::READ_ONLY
    }

    fn read(&self, input: &[u8], from: &str, to: &str) -> Result<MappingModel, MappingError> {
        let mut model = MappingModel::between(from, to);
        if input.starts_with(ZIP_MAGIC) {
            for (name, content) in archive::entries_with_extension(input, ENIGMA_EXTENSION)? {
                let text = std::str::from_utf8(&content)
                    .map_err(|e| MappingError::archive(format!("{name} is not UTF-8: {e}")))?;
                parse_into(&mut model, text)?;
            }
        } else {
            let text = std::str::from_utf8(input)
                .map_err(|e| MappingError::format(0, format!("input is not UTF-8: {e}")))?;
            parse_into(&mut model, text)?;
        }
        Ok(model)
    }

    fn write(&self, _model: &MappingModel, _namespaces: &[&str]) -> Result<Vec<u8>, MappingError> {
        Err(MappingError::Unsupported(
            "enigma mappings are read-only".to_string(),
        ))
    }

    fn validate(&self, input: &[u8]) -> Result<(), MappingError> {
        if input.starts_with(ZIP_MAGIC) || looks_like_enigma(input) {
            Ok(())
        } else {
            Err(MappingError::header("not an enigma mapping"))
        }
    }
}

/// Returns true if the first meaningful line is an enigma `CLASS` record.
pub fn looks_like_enigma(input: &[u8]) -> bool {
    let head = &input[..input.len().min(512)];
    String::from_utf8_lossy(head)
        .lines()
        .find(|l| !l.trim().is_empty())
        .is_some_and(|l| l.starts_with("CLASS "))
}

/// Read an enigma tree from a file, a directory or a zip archive.
pub fn read_enigma(path: &Path, from: &str, to: &str) -> Result<MappingModel, MappingError> {
    if !path.is_dir() {
        let bytes = std::fs::read(path)?;
        return Enigma.read(&bytes, from, to);
    }

    let mut files = Vec::new();
    collect_mapping_files(path, &mut files)?;
    files.sort();

    let mut model = MappingModel::between(from, to);
    for file in &files {
        let text = std::fs::read_to_string(file)?;
        parse_into(&mut model, &text).map_err(|e| match e {
            MappingError::Format { line, message } => MappingError::format(
                line,
                format!("{}: {message}", file.display()),
            ),
            other => other,
        })?;
    }

    tracing::debug!(
        files = files.len(),
        classes = model.len(),
        "read enigma directory {}",
        path.display()
    );
    Ok(model)
}

fn collect_mapping_files(dir: &Path, results: &mut Vec<PathBuf>) -> Result<(), MappingError> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_mapping_files(&path, results)?;
        } else if path.extension().is_some_and(|ext| ext == ENIGMA_EXTENSION) {
            results.push(path);
        }
    }
    Ok(())
}

// ============================================================================
// PARSER
// ============================================================================

struct OpenClass {
    depth: usize,
    from: String,
    /// Mapped name, or the from-name when unmapped; used to qualify children.
    display: String,
}

struct OpenMethod {
    depth: usize,
    name: String,
    desc: String,
}

/// Parse one enigma file into `model` (first-wins).
pub fn parse_into(model: &mut MappingModel, text: &str) -> Result<(), MappingError> {
    let mut classes: Vec<OpenClass> = Vec::new();
    let mut method: Option<OpenMethod> = None;

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let content = raw.trim_end();
        if content.trim().is_empty() {
            continue;
        }

        let depth = content.bytes().take_while(|b| *b == b'\t').count();
        let tokens: Vec<&str> = content
            .split_whitespace()
            .filter(|t| !t.starts_with("ACC:"))
            .collect();
        let Some(&marker) = tokens.first() else {
            continue;
        };

        classes.retain(|c| c.depth < depth);
        if method.as_ref().is_some_and(|m| m.depth >= depth) {
            method = None;
        }

        match marker {
            "CLASS" => {
                let from = *tokens
                    .get(1)
                    .ok_or_else(|| MappingError::format(line, "CLASS without name"))?;
                let to = tokens.get(2).copied();
                let (from, to) = match classes.last() {
                    Some(outer) => (
                        qualify(&outer.from, from),
                        to.map(|to| qualify(&outer.display, to)),
                    ),
                    None => (from.to_string(), to.map(str::to_string)),
                };

                model.accept_class(&from, to.as_deref());
                classes.push(OpenClass {
                    depth,
                    display: to.unwrap_or_else(|| from.clone()),
                    from,
                });
            }
            "FIELD" | "METHOD" => {
                let owner = classes
                    .last()
                    .filter(|c| c.depth + 1 == depth)
                    .ok_or_else(|| MappingError::format(line, "member outside of a class"))?;
                let (name, to, desc) = match tokens[1..] {
                    [name, desc] => (name, None, desc),
                    [name, to, desc] => (name, Some(to), desc),
                    _ => {
                        return Err(MappingError::format(
                            line,
                            format!("expected `{marker} <name> [<to>] <desc>`"),
                        ));
                    }
                };

                if marker == "FIELD" {
                    model.accept_field(&owner.from, None, name, Some(desc), to);
                } else {
                    model.accept_method(&owner.from, None, name, desc, to);
                    method = Some(OpenMethod {
                        depth,
                        name: name.to_string(),
                        desc: desc.to_string(),
                    });
                }
            }
            "ARG" => {
                let (owner, current) = match (classes.last(), &method) {
                    (Some(owner), Some(current)) if current.depth + 1 == depth => (owner, current),
                    _ => return Err(MappingError::format(line, "ARG outside of a method")),
                };
                let (slot, name) = match tokens[1..] {
                    [slot, name, ..] => (slot, name),
                    _ => return Err(MappingError::format(line, "expected `ARG <slot> <name>`")),
                };
                let slot = slot
                    .parse::<usize>()
                    .map_err(|_| MappingError::format(line, format!("invalid slot {slot:?}")))?;
                if slot > MAX_PARAMETER_SLOT {
                    return Err(MappingError::format(line, "parameter index out of range"));
                }
                model.accept_method_arg(&owner.from, &current.name, &current.desc, slot, name);
            }
            "COMMENT" => {}
            other => {
                return Err(MappingError::format(
                    line,
                    format!("unknown record marker {other:?}"),
                ));
            }
        }
    }

    Ok(())
}

/// Qualify a nested class name against its outer class.
fn qualify(outer: &str, inner: &str) -> String {
    if inner.contains('/') || inner.starts_with(&format!("{outer}$")) {
        inner.to_string()
    } else {
        format!("{outer}${inner}")
    }
}
