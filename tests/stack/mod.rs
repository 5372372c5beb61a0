//! Stack run tests
//!
//! End-to-end runs over scratch caches:
//! - Zero, single and multi-source stacks
//! - Provenance record reuse
//! - Failure handling (consistency, missing intermediaries)

pub mod tests_history;
pub mod tests_pipeline;
pub mod tests_single_source;
