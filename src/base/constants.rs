//! Well-known namespace labels and artifact names.

/// The raw (obfuscated) namespace.
pub const OFFICIAL: &str = "official";

/// The stable, version-independent namespace.
pub const INTERMEDIARY: &str = "intermediary";

/// The human-readable namespace.
pub const NAMED: &str = "named";

/// Location of the tiny file inside a mappings archive.
pub const TINY_ARCHIVE_PATH: &str = "mappings/mappings.tiny";

/// Artifact name used when the intermediary table is used verbatim.
pub const INTERMEDIARY_ARTIFACT: &str = "intermediary";

/// Artifact name used when more than one source is stacked.
pub const STACK_ARTIFACT: &str = "stack";

/// File name of the downloaded intermediary table inside a version directory.
pub const INTERMEDIARY_FILE: &str = "intermediary.tiny";

/// File name of the provenance record inside a version directory.
pub const STACK_HISTORY_FILE: &str = "stack.history";

/// Highest local-variable slot a method parameter can occupy.
pub const MAX_PARAMETER_SLOT: usize = 255;

/// Extension of enigma mapping files when read from a directory or archive.
pub const ENIGMA_EXTENSION: &str = "mapping";
