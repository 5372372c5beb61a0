//! The flat (v1) tiny variant.
//!
//! ```text
//! v1\tofficial\tintermediary\tnamed
//! # comment
//! CLASS\ta\tnet/minecraft/class_1\tnet/example/Foo
//! FIELD\ta\tI\tb\tfield_1\tcount
//! METHOD\ta\t(I)V\tc\tmethod_1\tsetCount
//! ```
//!
//! Every record stands alone; members name their owner and descriptor in
//! the first namespace.

use std::io::Write;

use rustc_hash::FxHashMap;

use super::MappingError;
use super::compressed;
use super::format::{FormatCapability, MappingFormat, MappingTable, TableVisitor};
use super::model::MappingModel;
use super::tiny::{TinyHeader, TinyVersion};
use crate::base::{Name, remap_descriptor};

/// One record of a flat table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum V1Record<'a> {
    Class {
        names: Vec<Option<&'a str>>,
    },
    Field {
        owner: &'a str,
        desc: &'a str,
        names: Vec<Option<&'a str>>,
    },
    Method {
        owner: &'a str,
        desc: &'a str,
        names: Vec<Option<&'a str>>,
    },
}

/// Parse the header of `text` and return it with the remaining lines.
fn split_header(text: &str) -> Result<(TinyHeader, std::str::Lines<'_>), MappingError> {
    let mut lines = text.lines();
    let first = lines
        .next()
        .ok_or_else(|| MappingError::header("empty input"))?;
    let header = TinyHeader::parse(first)?;
    if header.version != TinyVersion::V1 {
        return Err(MappingError::header("expected a tiny v1 header"));
    }
    Ok((header, lines))
}

/// Parse one body line. Blank lines and `#` comments yield `None`.
pub fn parse_record<'a>(
    text: &'a str,
    columns: usize,
    line: usize,
) -> Result<Option<V1Record<'a>>, MappingError> {
    if text.trim().is_empty() || text.starts_with('#') {
        return Ok(None);
    }

    let parts: Vec<&str> = text.split('\t').collect();
    let names = |from: usize| -> Result<Vec<Option<&'a str>>, MappingError> {
        let names = parts.get(from..from + columns).ok_or_else(|| {
            MappingError::format(line, format!("expected {columns} names in {text:?}"))
        })?;
        Ok(names.iter().map(|n| (!n.is_empty()).then_some(*n)).collect())
    };

    let record = match parts[0] {
        "CLASS" => V1Record::Class { names: names(1)? },
        "FIELD" => {
            let names = names(3)?;
            V1Record::Field {
                owner: parts[1],
                desc: parts[2],
                names,
            }
        }
        "METHOD" => {
            let names = names(3)?;
            V1Record::Method {
                owner: parts[1],
                desc: parts[2],
                names,
            }
        }
        other => {
            return Err(MappingError::format(
                line,
                format!("unknown record marker {other:?}"),
            ));
        }
    };
    Ok(Some(record))
}

/// Streaming reader over the records of a flat table.
pub fn records(text: &str) -> Result<(TinyHeader, V1Records<'_>), MappingError> {
    let (header, lines) = split_header(text)?;
    let columns = header.namespaces.len();
    Ok((
        header,
        V1Records {
            lines: lines.enumerate(),
            columns,
        },
    ))
}

pub struct V1Records<'a> {
    lines: std::iter::Enumerate<std::str::Lines<'a>>,
    columns: usize,
}

impl<'a> Iterator for V1Records<'a> {
    type Item = Result<(usize, V1Record<'a>), MappingError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (index, text) = self.lines.next()?;
            // +2: 1-based, after the header
            let line = index + 2;
            match parse_record(text, self.columns, line) {
                Ok(Some(record)) => return Some(Ok((line, record))),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

// ============================================================================
// READER
// ============================================================================

/// Decode the `from` → `to` columns of a flat table.
pub fn read_v1(text: &str, from: &str, to: &str) -> Result<MappingModel, MappingError> {
    let (header, body) = records(text)?;
    let from_idx = header.require(from)?;
    let to_idx = header.require(to)?;

    // Owners and descriptors are in the first namespace.
    let classes: Option<FxHashMap<&str, &str>> = if from_idx == 0 {
        None
    } else {
        let (_, scan) = records(text)?;
        let mut map = FxHashMap::default();
        for record in scan {
            if let (_, V1Record::Class { names }) = record? {
                if let (Some(first), Some(target)) = (names[0], names[from_idx]) {
                    map.insert(first, target);
                }
            }
        }
        Some(map)
    };
    let owner_of = |owner: &str| -> Name {
        let mapped = classes.as_ref().and_then(|m| m.get(owner).copied());
        Name::new(mapped.unwrap_or(owner))
    };
    let desc_of = |desc: &str| -> Name {
        match &classes {
            Some(map) => Name::from(remap_descriptor(desc, |c| map.get(c).copied())),
            None => Name::new(desc),
        }
    };

    let mut model = MappingModel::between(from, to);
    for record in body {
        let (line, record) = record?;
        match record {
            V1Record::Class { names } => {
                let name = names[from_idx]
                    .or(names[0])
                    .ok_or_else(|| MappingError::format(line, "class without name"))?;
                model.accept_class(name, names[to_idx]);
            }
            V1Record::Field { owner, desc, names } => {
                let name = names[from_idx]
                    .or(names[0])
                    .ok_or_else(|| MappingError::format(line, "field without name"))?;
                let desc = (!desc.is_empty()).then(|| desc_of(desc));
                model.accept_field(&owner_of(owner), None, name, desc.as_deref(), names[to_idx]);
            }
            V1Record::Method { owner, desc, names } => {
                let name = names[from_idx]
                    .or(names[0])
                    .ok_or_else(|| MappingError::format(line, "method without name"))?;
                model.accept_method(&owner_of(owner), None, name, &desc_of(desc), names[to_idx]);
            }
        }
    }

    tracing::debug!(
        from,
        to,
        classes = model.len(),
        members = model.member_count(),
        "read tiny v1 table"
    );
    Ok(model)
}

// ============================================================================
// WRITER
// ============================================================================

/// Streams a [`MappingTable`] out as a flat table. Parameter names have no
/// place in this variant and are dropped.
pub struct V1Writer<W: Write> {
    out: W,
    columns: usize,
    owner: String,
}

impl<W: Write> V1Writer<W> {
    pub fn new(mut out: W, namespaces: &[&str]) -> Result<Self, MappingError> {
        writeln!(out, "v1\t{}", namespaces.join("\t"))?;
        Ok(Self {
            out,
            columns: namespaces.len(),
            owner: String::new(),
        })
    }

    pub fn finish(mut self) -> Result<W, MappingError> {
        self.out.flush()?;
        Ok(self.out)
    }

    fn names(&self, names: &[Option<&str>]) -> Result<String, MappingError> {
        if names.len() != self.columns {
            return Err(MappingError::Unsupported(format!(
                "row has {} names for {} namespaces",
                names.len(),
                self.columns
            )));
        }
        Ok(names
            .iter()
            .map(|n| n.unwrap_or_default())
            .collect::<Vec<_>>()
            .join("\t"))
    }
}

impl<W: Write> TableVisitor for V1Writer<W> {
    fn visit_class(&mut self, names: &[Option<&str>]) -> Result<(), MappingError> {
        let row = self.names(names)?;
        self.owner = names[0].unwrap_or_default().to_string();
        writeln!(self.out, "CLASS\t{row}")?;
        Ok(())
    }

    fn visit_field(
        &mut self,
        desc: Option<&str>,
        names: &[Option<&str>],
    ) -> Result<(), MappingError> {
        let row = self.names(names)?;
        writeln!(self.out, "FIELD\t{}\t{}\t{row}", self.owner, desc.unwrap_or_default())?;
        Ok(())
    }

    fn visit_method(&mut self, desc: &str, names: &[Option<&str>]) -> Result<(), MappingError> {
        let row = self.names(names)?;
        writeln!(self.out, "METHOD\t{}\t{desc}\t{row}", self.owner)?;
        Ok(())
    }

    fn visit_arg(&mut self, _index: usize, _names: &[Option<&str>]) -> Result<(), MappingError> {
        Ok(())
    }
}

/// Encode `table` as a flat table with the given column labels.
pub fn write_v1<T>(table: &T, namespaces: &[&str]) -> Result<Vec<u8>, MappingError>
where
    T: MappingTable + ?Sized,
{
    if namespaces.len() != table.column_count() {
        return Err(MappingError::Unsupported(format!(
            "{} namespaces given for a table with {} columns",
            namespaces.len(),
            table.column_count()
        )));
    }

    let mut writer = V1Writer::new(Vec::new(), namespaces)?;
    table.accept(&mut writer)?;
    writer.finish()
}

// ============================================================================
// COLUMN DUPLICATION
// ============================================================================

/// Copy a flat table, appending a column `target` whose values repeat the
/// column `source` verbatim.
///
/// Comments and blank lines are kept as they are.
pub fn duplicate_column(text: &str, source: &str, target: &str) -> Result<String, MappingError> {
    let (header, lines) = split_header(text)?;
    let index = header.require(source)?;
    if header.index_of(target).is_some() {
        return Err(MappingError::header(format!(
            "namespace {target:?} already present"
        )));
    }

    let mut out = String::with_capacity(text.len() + text.len() / 3);
    out.push_str("v1\t");
    out.push_str(&header.namespaces.join("\t"));
    out.push('\t');
    out.push_str(target);
    out.push('\n');

    for (i, line) in lines.enumerate() {
        if line.trim().is_empty() || line.starts_with('#') {
            out.push_str(line);
            out.push('\n');
            continue;
        }

        let parts: Vec<&str> = line.split('\t').collect();
        let offset = match parts[0] {
            "CLASS" => 1,
            "FIELD" | "METHOD" => 3,
            other => {
                return Err(MappingError::format(
                    i + 2,
                    format!("unknown record marker {other:?}"),
                ));
            }
        };
        let value = parts
            .get(offset + index)
            .ok_or_else(|| MappingError::format(i + 2, format!("missing column {source:?}")))?;

        out.push_str(line);
        out.push('\t');
        out.push_str(value);
        out.push('\n');
    }

    Ok(out)
}

// ============================================================================
// FORMAT
// ============================================================================

/// The flat tiny v1 format.
#[derive(Debug, Clone, Copy, Default)]
pub struct TinyV1;

impl MappingFormat for TinyV1 {
    fn name(&self) -> &'static str {
        "tiny-v1"
    }

    fn capabilities(&self) -> FormatCapability {
        FormatCapability {
            parameters: false,
            ..FormatCapability::FULL
        }
    }

    fn read(&self, input: &[u8], from: &str, to: &str) -> Result<MappingModel, MappingError> {
        let text = compressed::decode_text(input)?;
        read_v1(&text, from, to)
    }

    fn write(&self, model: &MappingModel, namespaces: &[&str]) -> Result<Vec<u8>, MappingError> {
        write_v1(model, namespaces)
    }

    fn validate(&self, input: &[u8]) -> Result<(), MappingError> {
        let text = compressed::decode_text(input)?;
        split_header(&text).map(|_| ())
    }
}
