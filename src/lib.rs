//! # mapstack
//!
//! Reconciles stacked name-mapping sources for an obfuscated binary into one
//! official/named/intermediary table.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! project      → Stack runs: configuration, sources, history, cache
//!   ↓
//! interchange  → Mapping model, algebra, combination view, codecs
//!   ↓
//! base         → Primitives (Name, namespace constants, descriptors)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use mapstack::project::{LocalIntermediaries, MappingSource, MappingsStack, StackConfig};
//!
//! let config = StackConfig::new("1.14.4", cache_dir)
//!     .with_source(MappingSource::new("yarn", "1.14.4+build.1", "1.14.4", "yarn.jar"));
//! let output = MappingsStack::new(config, LocalIntermediaries::new(tables)).run()?;
//! println!("{}", output.run.base.display());
//! ```

// ============================================================================
// MODULES (dependency order: base → interchange → project)
// ============================================================================

/// Foundation types: Name, namespace labels, descriptor rewriting
pub mod base;

/// Mapping model, algebra and on-disk formats
pub mod interchange;

/// Stack orchestration
pub mod project;

// Re-export foundation types
pub use base::Name;
pub use interchange::{CombinedMappings, MappingError, MappingModel};
pub use project::{MappingsStack, StackConfig, StackError};
