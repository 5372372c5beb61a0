//! Interchange layer tests
//!
//! Public-API behaviour of the mapping model and its formats:
//! - Reading any wrapped format by content
//! - Encode/decode scenarios
//! - Combination views and the parameter side-file

pub mod tests_formats;
pub mod tests_scenarios;
