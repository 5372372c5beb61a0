//! Foundation types for the mapstack toolchain.
//!
//! This module provides the primitives every other layer builds on:
//! - [`Name`] - Cheap-to-clone identifier (class, member, descriptor, namespace)
//! - [`constants`] - Well-known namespace labels and artifact file names
//! - [`descriptor`] - Type descriptor rewriting through a class-name mapping
//!
//! This module has NO dependencies on other mapstack modules.

pub mod constants;
pub mod descriptor;

/// An identifier in some namespace.
///
/// Class names, member names and descriptors are short and heavily cloned
/// between models, so they are stored inline where possible.
pub type Name = smol_str::SmolStr;

pub use descriptor::remap_descriptor;
