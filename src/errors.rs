use std::fmt;

use thiserror::Error;

use crate::branch::BranchId;

/// A single branch that could not be finalized, with the reason reported by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchFailure {
    pub id: BranchId,
    pub reason: String,
}

impl fmt::Display for BranchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.reason)
    }
}

#[derive(Error, Debug)]
pub enum XaSinkError {
    /// The facade could not open its connection, or lost it mid-pass.
    /// No branch of the current call may be assumed resolved.
    #[error("Connection error: {0}")]
    Connection(String),

    /// One or more branches used up their commit attempts.
    #[error(
        "Commit failed for {} branch(es) after {max_attempts} attempt(s): {}",
        .branches.len(),
        join(.branches)
    )]
    FatalCommit {
        branches: Vec<BranchId>,
        max_attempts: u32,
    },

    /// Rollback failed for some branches. Every branch was still attempted.
    #[error("Rollback failed for {} branch(es): {}", .failures.len(), join(.failures))]
    Abort { failures: Vec<BranchFailure> },

    #[error("Committer is closed")]
    Closed,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, XaSinkError>;
