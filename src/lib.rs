pub mod errors;
pub mod branch;
pub mod record;
pub mod facade;
pub mod memory;
pub mod group_ops;
pub mod sink;
pub mod committer;
pub mod check;
pub mod config;
pub mod codec;

// Re-export key types and structs for easier access
pub use branch::{BranchId, PendingBranch};
pub use committer::XaAggregatedCommitter;
pub use config::SinkOptions;
pub use errors::{BranchFailure, Result, XaSinkError};
pub use facade::{BranchError, ResourceFacade};
pub use group_ops::{GroupCommitOperator, GroupOperationResult, GroupRollbackResult, OperationOutcome};
pub use memory::{MemoryFacade, MemoryStore};
pub use record::{AggregatedCommitRecord, CommitRecord, RecordState};
pub use sink::SinkAggregatedCommitter;

/// xa-sink Prelude
pub mod prelude {
    pub use crate::check::*;
    pub use crate::errors::*;
    pub use crate::*;
}
