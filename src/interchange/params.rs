//! Parameter-name side-file.
//!
//! Flat tables cannot carry parameter names, so they travel next to them:
//!
//! ```text
//! net/example/Foo/update(Lnet/example/Foo;I)V
//! \t2: count
//! \t1: other
//! ```
//!
//! One block per method, keyed by `<class>/<method><descriptor>`, slots in
//! descending order.

use std::fmt::Write as _;
use std::path::Path;

use indexmap::IndexMap;

use super::MappingError;
use super::views::CombinedMappings;
use crate::base::Name;
use crate::base::constants::MAX_PARAMETER_SLOT;

/// Parameter names per method key, as dense slot vectors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterNames {
    methods: IndexMap<String, Vec<Option<Name>>>,
}

impl ParameterNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the side-file for a combination view, using its to-tier names.
    pub fn from_combined(view: CombinedMappings<'_>) -> Self {
        let mut params = Self::new();
        for (class, method) in view.arg_methods() {
            let key = method_key(
                class.to,
                method.member.to,
                method.member.desc.unwrap_or_default(),
            );
            for (slot, name, _) in &method.args {
                params.insert(&key, *slot, name);
            }
        }
        params
    }

    /// Name a slot of the method `key`; first-wins per slot. Slots past
    /// [`MAX_PARAMETER_SLOT`] are refused.
    pub fn insert(&mut self, key: &str, slot: usize, name: &str) -> bool {
        if slot > MAX_PARAMETER_SLOT {
            return false;
        }
        let slots = self.methods.entry(key.to_string()).or_default();
        if slots.len() <= slot {
            slots.resize(slot + 1, None);
        }
        if slots[slot].is_some() {
            return false;
        }
        slots[slot] = Some(Name::new(name));
        true
    }

    /// Slots of the method `key`, index = slot.
    pub fn get(&self, key: &str) -> Option<&[Option<Name>]> {
        self.methods.get(key).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Option<Name>])> + '_ {
        self.methods
            .iter()
            .map(|(key, slots)| (key.as_str(), slots.as_slice()))
    }

    /// Render the side-file text.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (key, slots) in &self.methods {
            if slots.iter().all(Option::is_none) {
                continue;
            }
            out.push_str(key);
            out.push('\n');
            for (slot, name) in slots.iter().enumerate().rev() {
                if let Some(name) = name {
                    let _ = writeln!(out, "\t{slot}: {name}");
                }
            }
        }
        out
    }

    /// Parse side-file text.
    pub fn read(text: &str) -> Result<Self, MappingError> {
        let mut params = Self::new();
        let mut current: Option<&str> = None;

        for (index, line) in text.lines().enumerate() {
            let line_no = index + 1;
            if line.trim().is_empty() {
                continue;
            }

            match line.strip_prefix('\t') {
                None => {
                    current = Some(line);
                    params.methods.entry(line.to_string()).or_default();
                }
                Some(entry) => {
                    let key = current.ok_or_else(|| {
                        MappingError::format(line_no, "parameter line before any method")
                    })?;
                    let (slot, name) = entry
                        .split_once(": ")
                        .and_then(|(slot, name)| Some((slot.parse::<usize>().ok()?, name)))
                        .ok_or_else(|| {
                            MappingError::format(line_no, format!("malformed parameter {entry:?}"))
                        })?;
                    if slot > MAX_PARAMETER_SLOT {
                        return Err(MappingError::format(line_no, "parameter index out of range"));
                    }
                    params.insert(key, slot, name);
                }
            }
        }

        Ok(params)
    }

    pub fn read_from_file(path: &Path) -> Result<Self, MappingError> {
        let text = std::fs::read_to_string(path)?;
        Self::read(&text)
    }

    pub fn write_to_file(&self, path: &Path) -> Result<(), MappingError> {
        std::fs::write(path, self.render())?;
        Ok(())
    }
}

/// `<class>/<method><descriptor>`
pub fn method_key(class: &str, method: &str, desc: &str) -> String {
    format!("{class}/{method}{desc}")
}
