//! Downgrade of nested (v2) tables to the flat (v1) variant.
//!
//! The flat variant has no room for parameter names; they are collected
//! into a [`ParameterNames`] side-file keyed by the last namespace's class
//! and method names. A name missing from one column is filled from the
//! column before it.

use std::fmt::Write as _;

use super::MappingError;
use super::params::{ParameterNames, method_key};
use super::tiny::{Names, TinyRecord, TinyRecords};

/// A flat table and the parameter names it could not hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Downgraded {
    pub table: String,
    pub params: ParameterNames,
}

/// Stream a nested table into the flat variant.
pub fn tiny_v2_to_v1(text: &str) -> Result<Downgraded, MappingError> {
    let records = TinyRecords::new(text)?;

    let mut table = String::with_capacity(text.len() + text.len() / 2);
    table.push_str("v1\t");
    table.push_str(&records.header().namespaces.join("\t"));
    table.push('\n');

    let mut params = ParameterNames::new();
    // (first column, last column) of the current class
    let mut class: (String, String) = Default::default();
    let mut current_method: Option<String> = None;

    for record in records {
        let (line, record) = record?;
        match record {
            TinyRecord::Class { names } => {
                let filled = fill_forward(&names);
                class = (first(&filled, line)?.to_string(), last(&filled).to_string());
                current_method = None;
                let _ = writeln!(table, "CLASS\t{}", filled.join("\t"));
            }
            TinyRecord::Field { desc, names } => {
                let filled = fill_forward(&names);
                first(&filled, line)?;
                current_method = None;
                let _ = writeln!(table, "FIELD\t{}\t{desc}\t{}", class.0, filled.join("\t"));
            }
            TinyRecord::Method { desc, names } => {
                let filled = fill_forward(&names);
                first(&filled, line)?;
                current_method = Some(method_key(&class.1, last(&filled), &desc));
                let _ = writeln!(table, "METHOD\t{}\t{desc}\t{}", class.0, filled.join("\t"));
            }
            TinyRecord::Arg { index, names } => {
                let filled = fill_forward(&names);
                let name = last(&filled);
                if let (Some(key), false) = (&current_method, name.is_empty()) {
                    params.insert(key, index, name);
                }
            }
        }
    }

    tracing::debug!(methods = params.len(), "downgraded tiny v2 table to v1");
    Ok(Downgraded { table, params })
}

/// Replace every missing name with the one in the previous column.
fn fill_forward<'n>(names: &'n Names<'_>) -> Vec<&'n str> {
    let mut previous = "";
    names
        .iter()
        .map(|name| {
            if let Some(name) = name.as_deref() {
                previous = name;
            }
            previous
        })
        .collect()
}

fn first<'n>(filled: &[&'n str], line: usize) -> Result<&'n str, MappingError> {
    match filled.first() {
        Some(name) if !name.is_empty() => Ok(*name),
        _ => Err(MappingError::format(line, "record without a first-namespace name")),
    }
}

fn last<'n>(filled: &[&'n str]) -> &'n str {
    filled.last().copied().unwrap_or_default()
}
