//! Common traits for mapping interchange formats.

use super::MappingError;
use super::model::MappingModel;

/// Capabilities supported by a format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatCapability {
    /// Can read/import mappings.
    pub read: bool,
    /// Can write/export mappings.
    pub write: bool,
    /// Carries more than two namespaces per file.
    pub multi_namespace: bool,
    /// Carries parameter names inline.
    pub parameters: bool,
}

impl FormatCapability {
    /// Full capability (read, write, any namespaces, parameters).
    pub const FULL: Self = Self {
        read: true,
        write: true,
        multi_namespace: true,
        parameters: true,
    };

    /// Read-only, single from/to pair.
    pub const READ_ONLY: Self = Self {
        read: true,
        write: false,
        multi_namespace: false,
        parameters: true,
    };
}

/// Trait for mapping file formats.
///
/// Implementations decode a byte buffer into a [`MappingModel`] restricted to
/// two namespaces chosen by column name, and encode a model back to bytes.
pub trait MappingFormat: Send + Sync {
    /// Human-readable name of the format.
    fn name(&self) -> &'static str;

    /// Capabilities of this format implementation.
    fn capabilities(&self) -> FormatCapability;

    /// Read the `from` → `to` columns of a mapping file.
    ///
    /// Formats without namespace columns ignore the labels.
    fn read(&self, input: &[u8], from: &str, to: &str) -> Result<MappingModel, MappingError>;

    /// Write a model, labelling its columns with `namespaces`.
    fn write(&self, model: &MappingModel, namespaces: &[&str]) -> Result<Vec<u8>, MappingError>;

    /// Quick check that the input looks like this format.
    fn validate(&self, input: &[u8]) -> Result<(), MappingError> {
        let _ = input;
        Ok(())
    }
}

/// Receives the rows of a mapping table, one name per namespace column.
///
/// `None` marks a column without a name. Rows arrive nested: each class is
/// followed by its fields, then its methods, each method by its arguments.
pub trait TableVisitor {
    fn visit_class(&mut self, names: &[Option<&str>]) -> Result<(), MappingError>;

    fn visit_field(&mut self, desc: Option<&str>, names: &[Option<&str>])
    -> Result<(), MappingError>;

    fn visit_method(&mut self, desc: &str, names: &[Option<&str>]) -> Result<(), MappingError>;

    fn visit_arg(&mut self, index: usize, names: &[Option<&str>]) -> Result<(), MappingError>;
}

/// Anything that can replay itself as table rows: a [`MappingModel`]
/// (two columns) or a combination view (three columns).
pub trait MappingTable {
    /// Number of namespace columns per row.
    fn column_count(&self) -> usize;

    /// Replay every row, in deterministic order, into `visitor`.
    fn accept(&self, visitor: &mut dyn TableVisitor) -> Result<(), MappingError>;
}
