//! Stack orchestration: configuration, source classification, the stack
//! run and the artifacts it leaves behind.

mod cache;
mod config;
mod error;
mod history;
mod provider;
mod source;
mod stack;

pub use cache::MappingsCache;
pub use config::{CompiledConventions, NamingConventions, StackConfig};
pub use error::StackError;
pub use history::{StackHistory, StackVersion, prepend_in_place};
pub use provider::{DescriptorLookup, IntermediaryProvider, LocalIntermediaries};
pub use source::{
    ClassifiedSource, MappingSource, ResolvedFormat, SourceFormat, classify, classify_all,
    intermediary_supplier,
};
pub use stack::{MappingsStack, StackOutcome, StackOutput, StackRun};
