//! Tiny mapping tables: header sniffing and the nested (v2) variant.
//!
//! ```text
//! tiny\t2\t0\tofficial\tnamed           header (major, minor, namespaces)
//! \tescaped-names                       optional properties
//! c\ta\tFoo                             class, one name per namespace
//! \tf\tI\tb\tcount                      field: descriptor, names
//! \tm\t(I)V\tc\tsetCount                method: descriptor, names
//! \t\tp\t1\t\tvalue                     parameter: slot, names
//! ```
//!
//! Descriptors are always expressed in the first namespace. An empty name
//! column means "no name in this namespace".

use std::borrow::Cow;
use std::io::Write;
use std::path::Path;

use rustc_hash::FxHashMap;

use super::MappingError;
use super::compressed;
use super::format::{FormatCapability, MappingFormat, MappingTable, TableVisitor};
use super::model::MappingModel;
use crate::base::constants::MAX_PARAMETER_SLOT;
use crate::base::{Name, remap_descriptor};

/// Header property enabling backslash escapes in names.
pub const ESCAPED_NAMES: &str = "escaped-names";

// ============================================================================
// HEADER
// ============================================================================

/// Which on-disk variant a tiny header announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TinyVersion {
    /// Flat `v1` tables.
    V1,
    /// Nested `tiny 2.x` tables.
    V2 { minor: u32 },
}

/// The first line of a tiny table, plus v2 properties when read from a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TinyHeader {
    pub version: TinyVersion,
    pub namespaces: Vec<Name>,
    pub properties: Vec<(Name, Option<String>)>,
}

impl TinyHeader {
    /// Parse a header line of either variant.
    pub fn parse(line: &str) -> Result<Self, MappingError> {
        let line = line.trim_end_matches(['\r', '\n']);
        let mut parts = line.split('\t');

        let version = match parts.next() {
            Some("v1") => TinyVersion::V1,
            Some("tiny") => {
                let major = parts.next();
                let minor = parts.next().and_then(|m| m.parse::<u32>().ok());
                match (major, minor) {
                    (Some("2"), Some(minor)) => TinyVersion::V2 { minor },
                    _ => {
                        return Err(MappingError::header(format!(
                            "unsupported tiny version in {line:?}"
                        )));
                    }
                }
            }
            _ => return Err(MappingError::header(format!("not a tiny header: {line:?}"))),
        };

        let namespaces: Vec<Name> = parts.map(Name::new).collect();
        if namespaces.len() < 2 || namespaces.iter().any(Name::is_empty) {
            return Err(MappingError::header(format!(
                "expected at least two namespaces in {line:?}"
            )));
        }

        Ok(Self {
            version,
            namespaces,
            properties: Vec::new(),
        })
    }

    pub fn is_v2(&self) -> bool {
        matches!(self.version, TinyVersion::V2 { .. })
    }

    /// Column of `namespace`, if present.
    pub fn index_of(&self, namespace: &str) -> Option<usize> {
        self.namespaces.iter().position(|n| n.as_str() == namespace)
    }

    /// Column of `namespace`, or a [`MappingError::MissingNamespace`].
    pub fn require(&self, namespace: &str) -> Result<usize, MappingError> {
        self.index_of(namespace)
            .ok_or_else(|| MappingError::missing_namespace(namespace, &self.namespaces))
    }

    /// Returns true if every one of `namespaces` is a column.
    pub fn has_all(&self, namespaces: &[&str]) -> bool {
        namespaces.iter().all(|ns| self.index_of(ns).is_some())
    }

    pub fn property(&self, key: &str) -> Option<&(Name, Option<String>)> {
        self.properties.iter().find(|(k, _)| k.as_str() == key)
    }

    fn escaped_names(&self) -> bool {
        self.property(ESCAPED_NAMES).is_some()
    }
}

/// Read only the header of a tiny table on disk.
///
/// Plain, gzip-compressed and jar-wrapped files are all accepted; the body
/// is never decoded.
pub fn read_headers(path: &Path) -> Result<TinyHeader, MappingError> {
    let line = compressed::read_first_line(path)?;
    TinyHeader::parse(&line)
}

// ============================================================================
// RECORDS
// ============================================================================

/// Names of one record, indexed by namespace column.
pub type Names<'a> = Vec<Option<Cow<'a, str>>>;

/// One meaningful record of a nested table. Comments and local variables
/// are skipped by [`TinyRecords`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TinyRecord<'a> {
    Class { names: Names<'a> },
    Field { desc: Cow<'a, str>, names: Names<'a> },
    Method { desc: Cow<'a, str>, names: Names<'a> },
    Arg { index: usize, names: Names<'a> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Root,
    Class,
    Field,
    Method,
}

/// Streaming reader over the body of a nested table.
///
/// Yields `(line, record)` pairs; line numbers are 1-based.
pub struct TinyRecords<'a> {
    lines: std::iter::Peekable<std::iter::Enumerate<std::str::Lines<'a>>>,
    header: TinyHeader,
    scope: Scope,
}

impl<'a> TinyRecords<'a> {
    /// Parse the header and properties of `text` and position after them.
    pub fn new(text: &'a str) -> Result<Self, MappingError> {
        let mut lines = text.lines().enumerate().peekable();
        let (_, first) = lines
            .next()
            .ok_or_else(|| MappingError::header("empty input"))?;

        let mut header = TinyHeader::parse(first)?;
        if !header.is_v2() {
            return Err(MappingError::header("expected a tiny v2 header"));
        }

        while let Some((_, line)) = lines.next_if(|(_, l)| l.starts_with('\t')) {
            let mut parts = line[1..].split('\t');
            if let Some(key) = parts.next().filter(|k| !k.is_empty()) {
                header
                    .properties
                    .push((Name::new(key), parts.next().map(str::to_string)));
            }
        }

        Ok(Self {
            lines,
            header,
            scope: Scope::Root,
        })
    }

    pub fn header(&self) -> &TinyHeader {
        &self.header
    }

    fn names(&self, parts: &[&'a str], line: usize) -> Result<Names<'a>, MappingError> {
        let columns = self.header.namespaces.len();
        if parts.len() < columns {
            return Err(MappingError::format(
                line,
                format!("expected {columns} names, found {}", parts.len()),
            ));
        }

        let escaped = self.header.escaped_names();
        parts[..columns]
            .iter()
            .map(|name| {
                if name.is_empty() {
                    Ok(None)
                } else if escaped {
                    unescape(*name).map(Some).map_err(|m| MappingError::format(line, m))
                } else {
                    Ok(Some(Cow::Borrowed(*name)))
                }
            })
            .collect()
    }

    fn parse_line(
        &mut self,
        line: usize,
        text: &'a str,
    ) -> Result<Option<TinyRecord<'a>>, MappingError> {
        let depth = text.bytes().take_while(|b| *b == b'\t').count();
        let parts: Vec<&'a str> = text[depth..].split('\t').collect();
        let marker = parts[0];

        match (depth, marker, self.scope) {
            (0, "c", _) => {
                self.scope = Scope::Class;
                let names = self.names(&parts[1..], line)?;
                Ok(Some(TinyRecord::Class { names }))
            }
            (1, "f" | "m", Scope::Class | Scope::Field | Scope::Method) => {
                let desc = parts
                    .get(1)
                    .copied()
                    .ok_or_else(|| MappingError::format(line, "missing descriptor"))?;
                let names = self.names(&parts[2..], line)?;
                if marker == "f" {
                    self.scope = Scope::Field;
                    Ok(Some(TinyRecord::Field {
                        desc: Cow::Borrowed(desc),
                        names,
                    }))
                } else {
                    if desc.is_empty() {
                        return Err(MappingError::format(line, "method without descriptor"));
                    }
                    self.scope = Scope::Method;
                    Ok(Some(TinyRecord::Method {
                        desc: Cow::Borrowed(desc),
                        names,
                    }))
                }
            }
            (1, "c", Scope::Class | Scope::Field | Scope::Method) => {
                self.scope = Scope::Class;
                Ok(None)
            }
            (2, "p", Scope::Method) => {
                let index = parts
                    .get(1)
                    .and_then(|i| i.parse::<usize>().ok())
                    .ok_or_else(|| MappingError::format(line, "invalid parameter index"))?;
                if index > MAX_PARAMETER_SLOT {
                    return Err(MappingError::format(line, "parameter index out of range"));
                }
                let names = self.names(&parts[2..], line)?;
                Ok(Some(TinyRecord::Arg { index, names }))
            }
            (2, "v", Scope::Method)
            | (2, "c", Scope::Field | Scope::Method)
            | (3, "c", Scope::Method) => Ok(None),
            _ => Err(MappingError::format(
                line,
                format!("unexpected record {marker:?} at depth {depth}"),
            )),
        }
    }
}

impl<'a> Iterator for TinyRecords<'a> {
    type Item = Result<(usize, TinyRecord<'a>), MappingError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (index, text) = self.lines.next()?;
            if text.trim().is_empty() {
                continue;
            }
            let line = index + 1;
            match self.parse_line(line, text) {
                Ok(Some(record)) => return Some(Ok((line, record))),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

fn unescape(name: &str) -> Result<Cow<'_, str>, String> {
    if !name.contains('\\') {
        return Ok(Cow::Borrowed(name));
    }

    let mut out = String::with_capacity(name.len());
    let mut chars = name.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        out.push(match chars.next() {
            Some('\\') => '\\',
            Some('n') => '\n',
            Some('r') => '\r',
            Some('t') => '\t',
            Some('0') => '\0',
            other => return Err(format!("invalid escape {other:?} in {name:?}")),
        });
    }
    Ok(Cow::Owned(out))
}

// ============================================================================
// READER
// ============================================================================

/// Decode the `from` → `to` columns of a nested table.
pub fn read_v2(text: &str, from: &str, to: &str) -> Result<MappingModel, MappingError> {
    let records = TinyRecords::new(text)?;
    let from_idx = records.header().require(from)?;
    let to_idx = records.header().require(to)?;

    // Descriptors are in the first namespace; translate them when reading
    // from any other column.
    let descriptors = if from_idx == 0 {
        None
    } else {
        Some(class_column_map(text, from_idx)?)
    };
    let remap = |desc: &str| -> Name {
        match &descriptors {
            Some(map) => Name::from(remap_descriptor(desc, |c| map.get(c).map(String::as_str))),
            None => Name::new(desc),
        }
    };

    let mut model = MappingModel::between(from, to);
    let mut class: Option<Name> = None;
    let mut method: Option<(Name, Name)> = None;

    for record in records {
        let (line, record) = record?;
        match record {
            TinyRecord::Class { names } => {
                let from_name = identity(&names, from_idx)
                    .ok_or_else(|| MappingError::format(line, "class without name"))?;
                model.accept_class(from_name, names[to_idx].as_deref());
                class = Some(Name::new(from_name));
                method = None;
            }
            TinyRecord::Field { desc, names } => {
                let owner = class.as_deref().unwrap_or_default();
                let name = identity(&names, from_idx)
                    .ok_or_else(|| MappingError::format(line, "field without name"))?;
                let desc = (!desc.is_empty()).then(|| remap(&desc));
                model.accept_field(owner, None, name, desc.as_deref(), names[to_idx].as_deref());
                method = None;
            }
            TinyRecord::Method { desc, names } => {
                let owner = class.as_deref().unwrap_or_default();
                let name = identity(&names, from_idx)
                    .ok_or_else(|| MappingError::format(line, "method without name"))?;
                let desc = remap(&desc);
                model.accept_method(owner, None, name, &desc, names[to_idx].as_deref());
                method = Some((Name::new(name), desc));
            }
            TinyRecord::Arg { index, names } => {
                if let (Some(owner), Some((name, desc)), Some(arg)) =
                    (&class, &method, names[to_idx].as_deref())
                {
                    model.accept_method_arg(owner, name, desc, index, arg);
                }
            }
        }
    }

    tracing::debug!(
        from,
        to,
        classes = model.len(),
        members = model.member_count(),
        "read tiny v2 table"
    );
    Ok(model)
}

/// The name at `column`, falling back to the first namespace's name.
fn identity<'n>(names: &'n Names<'_>, column: usize) -> Option<&'n str> {
    names[column].as_deref().or(names[0].as_deref())
}

/// Map first-namespace class names to their names in `column`.
fn class_column_map(text: &str, column: usize) -> Result<FxHashMap<String, String>, MappingError> {
    let mut map = FxHashMap::default();
    for record in TinyRecords::new(text)? {
        if let (_, TinyRecord::Class { names }) = record? {
            if let (Some(first), Some(target)) = (&names[0], &names[column]) {
                map.insert(first.to_string(), target.to_string());
            }
        }
    }
    Ok(map)
}

// ============================================================================
// WRITER
// ============================================================================

/// Which rows the writer emits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteMode {
    /// Every class and member, mapped or not (base/raw dumps).
    #[default]
    Everything,
    /// Only rows with an informative to-name, plus the parents of
    /// emitted children (final output).
    Compact,
}

/// Streams a [`MappingTable`] out as a nested table.
pub struct TinyWriter<W: Write> {
    out: W,
    mode: WriteMode,
    columns: usize,
    pending_class: Option<String>,
    pending_method: Option<String>,
}

impl<W: Write> TinyWriter<W> {
    /// Write the header for `namespaces` and return a writer for the body.
    pub fn new(mut out: W, namespaces: &[&str], mode: WriteMode) -> Result<Self, MappingError> {
        if namespaces.len() < 2 {
            return Err(MappingError::Unsupported(
                "a tiny table needs at least two namespaces".to_string(),
            ));
        }
        writeln!(out, "tiny\t2\t0\t{}", namespaces.join("\t"))?;

        Ok(Self {
            out,
            mode,
            columns: namespaces.len(),
            pending_class: None,
            pending_method: None,
        })
    }

    /// Flush and return the underlying writer.
    pub fn finish(mut self) -> Result<W, MappingError> {
        self.out.flush()?;
        Ok(self.out)
    }

    fn row(&self, prefix: &str, names: &[Option<&str>]) -> Result<String, MappingError> {
        if names.len() != self.columns {
            return Err(MappingError::Unsupported(format!(
                "row has {} names for {} namespaces",
                names.len(),
                self.columns
            )));
        }

        let mut line = String::from(prefix);
        for (i, name) in names.iter().enumerate() {
            if i > 0 {
                line.push('\t');
            }
            line.push_str(name.unwrap_or_default());
        }
        Ok(line)
    }

    fn emit(&mut self, line: &str) -> Result<(), MappingError> {
        writeln!(self.out, "{line}")?;
        Ok(())
    }

    fn flush_class(&mut self) -> Result<(), MappingError> {
        if let Some(line) = self.pending_class.take() {
            self.emit(&line)?;
        }
        Ok(())
    }

    fn flush_method(&mut self) -> Result<(), MappingError> {
        if let Some(line) = self.pending_method.take() {
            self.emit(&line)?;
        }
        Ok(())
    }
}

/// Returns true if any to-column names something other than the first column.
fn is_informative(names: &[Option<&str>]) -> bool {
    names
        .iter()
        .skip(1)
        .any(|name| name.is_some() && *name != names[0])
}

impl<W: Write> TableVisitor for TinyWriter<W> {
    fn visit_class(&mut self, names: &[Option<&str>]) -> Result<(), MappingError> {
        let line = self.row("c\t", names)?;
        self.pending_class = None;
        self.pending_method = None;

        if self.mode == WriteMode::Everything || is_informative(names) {
            self.emit(&line)
        } else {
            self.pending_class = Some(line);
            Ok(())
        }
    }

    fn visit_field(
        &mut self,
        desc: Option<&str>,
        names: &[Option<&str>],
    ) -> Result<(), MappingError> {
        let line = self.row(&format!("\tf\t{}\t", desc.unwrap_or_default()), names)?;
        self.pending_method = None;

        if self.mode == WriteMode::Everything || is_informative(names) {
            self.flush_class()?;
            self.emit(&line)?;
        }
        Ok(())
    }

    fn visit_method(&mut self, desc: &str, names: &[Option<&str>]) -> Result<(), MappingError> {
        let line = self.row(&format!("\tm\t{desc}\t"), names)?;
        self.pending_method = None;

        if self.mode == WriteMode::Everything || is_informative(names) {
            self.flush_class()?;
            self.emit(&line)
        } else {
            self.pending_method = Some(line);
            Ok(())
        }
    }

    fn visit_arg(&mut self, index: usize, names: &[Option<&str>]) -> Result<(), MappingError> {
        let line = self.row(&format!("\t\tp\t{index}\t"), names)?;

        if self.mode == WriteMode::Everything || is_informative(names) {
            self.flush_class()?;
            self.flush_method()?;
            self.emit(&line)?;
        }
        Ok(())
    }
}

/// Encode `table` as a nested table with the given column labels.
pub fn write_tiny<T>(
    table: &T,
    namespaces: &[&str],
    mode: WriteMode,
) -> Result<Vec<u8>, MappingError>
where
    T: MappingTable + ?Sized,
{
    let mut out = Vec::new();
    write_tiny_to(table, namespaces, mode, &mut out)?;
    Ok(out)
}

/// Encode `table` into any writer.
pub fn write_tiny_to<T, W>(
    table: &T,
    namespaces: &[&str],
    mode: WriteMode,
    out: W,
) -> Result<(), MappingError>
where
    T: MappingTable + ?Sized,
    W: Write,
{
    if namespaces.len() != table.column_count() {
        return Err(MappingError::Unsupported(format!(
            "{} namespaces given for a table with {} columns",
            namespaces.len(),
            table.column_count()
        )));
    }

    let mut writer = TinyWriter::new(out, namespaces, mode)?;
    table.accept(&mut writer)?;
    writer.finish()?;
    Ok(())
}

// ============================================================================
// FORMAT
// ============================================================================

/// The nested tiny v2 format.
#[derive(Debug, Clone, Copy, Default)]
pub struct TinyV2;

impl MappingFormat for TinyV2 {
    fn name(&self) -> &'static str {
        "tiny-v2"
    }

    fn capabilities(&self) -> FormatCapability {
        FormatCapability::FULL
    }

    fn read(&self, input: &[u8], from: &str, to: &str) -> Result<MappingModel, MappingError> {
        let text = compressed::decode_text(input)?;
        read_v2(&text, from, to)
    }

    fn write(&self, model: &MappingModel, namespaces: &[&str]) -> Result<Vec<u8>, MappingError> {
        write_tiny(model, namespaces, WriteMode::Everything)
    }

    fn validate(&self, input: &[u8]) -> Result<(), MappingError> {
        let text = compressed::decode_text(input)?;
        let first = text.lines().next().unwrap_or_default();
        match TinyHeader::parse(first)?.version {
            TinyVersion::V2 { .. } => Ok(()),
            TinyVersion::V1 => Err(MappingError::header("expected a tiny v2 header")),
        }
    }
}
