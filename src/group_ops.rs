use std::collections::BTreeSet;

use log::{debug, error, info, warn};

use crate::branch::{BranchId, PendingBranch};
use crate::errors::{BranchFailure, Result, XaSinkError};
use crate::facade::{BranchError, ResourceFacade};

/// Classification of one finalize attempt for one branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationOutcome {
    /// The store committed (or rolled back) the branch.
    Resolved,
    /// The store does not know the branch and unknown branches are treated
    /// as already finalized.
    UnknownTreatedAsResolved,
    /// The attempt failed and the branch has attempts left.
    RetriableFailure,
    /// The attempt failed and it was the last one allowed.
    FatalFailure,
}

/// Classifies the result of a commit attempt.
///
/// `attempts_so_far` is the number of attempts that already failed before
/// this one. Every failed attempt counts against `max_attempts`, including an
/// unknown branch when unknown branches are not treated as resolved.
pub fn classify(
    result: &std::result::Result<(), BranchError>,
    treat_unknown_as_success: bool,
    attempts_so_far: u32,
    max_attempts: u32,
) -> OperationOutcome {
    match result {
        Ok(()) => OperationOutcome::Resolved,
        Err(BranchError::Unknown) if treat_unknown_as_success => {
            OperationOutcome::UnknownTreatedAsResolved
        }
        Err(_) => {
            if attempts_so_far.saturating_add(1) >= max_attempts {
                OperationOutcome::FatalFailure
            } else {
                OperationOutcome::RetriableFailure
            }
        }
    }
}

/// Result of a group commit pass that did not hit a fatal branch.
///
/// `resolved` and `for_retry` are disjoint and together hold every input
/// branch. Branches in `for_retry` carry their incremented attempt counter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupOperationResult {
    pub resolved: BTreeSet<BranchId>,
    pub for_retry: Vec<PendingBranch>,
}

/// Result of a group rollback pass that kept its connection. Every input
/// branch was attempted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupRollbackResult {
    pub rolled_back: BTreeSet<BranchId>,
    pub failures: Vec<BranchFailure>,
}

/// Applies commit or rollback across a set of branches through one facade.
pub struct GroupCommitOperator {
    facade: Box<dyn ResourceFacade>,
}

impl GroupCommitOperator {
    pub fn new(facade: Box<dyn ResourceFacade>) -> Self {
        Self { facade }
    }

    pub fn facade(&self) -> &dyn ResourceFacade {
        &*self.facade
    }

    pub fn facade_mut(&mut self) -> &mut dyn ResourceFacade {
        &mut *self.facade
    }

    /// Runs one commit pass over `branches`.
    ///
    /// Every branch is attempted. Branches that failed with attempts left
    /// are returned in `for_retry`; the caller re-submits them on a later
    /// call.
    ///
    /// # Errors
    ///
    /// Returns [`XaSinkError::FatalCommit`] listing every branch that used up
    /// its last attempt during this pass, and [`XaSinkError::Connection`] as
    /// soon as the facade reports a lost connection.
    pub fn commit(
        &mut self,
        branches: Vec<PendingBranch>,
        treat_unknown_as_success: bool,
        max_commit_attempts: u32,
    ) -> Result<GroupOperationResult> {
        let total = branches.len();
        let mut result = GroupOperationResult::default();
        let mut fatal = Vec::new();

        for branch in branches {
            let attempt = self.facade.commit_branch(&branch.id);
            if let Err(BranchError::ConnectionLost(reason)) = &attempt {
                warn!("Lost connection while committing branch {}: {}", branch.id, reason);
                return Err(XaSinkError::Connection(format!(
                    "lost connection while committing branch {}: {}",
                    branch.id, reason
                )));
            }

            let outcome = classify(
                &attempt,
                treat_unknown_as_success,
                branch.attempts,
                max_commit_attempts,
            );
            let reason = attempt.err().map(|e| e.to_string()).unwrap_or_default();
            match outcome {
                OperationOutcome::Resolved => {
                    debug!("Committed branch {}", branch.id);
                    result.resolved.insert(branch.id);
                }
                OperationOutcome::UnknownTreatedAsResolved => {
                    warn!(
                        "Branch {} is unknown to the store, treating it as already committed",
                        branch.id
                    );
                    result.resolved.insert(branch.id);
                }
                OperationOutcome::RetriableFailure => {
                    let branch = branch.with_attempts_incremented();
                    debug!(
                        "Commit of branch {} failed (attempt {}/{}): {}",
                        branch.id, branch.attempts, max_commit_attempts, reason
                    );
                    result.for_retry.push(branch);
                }
                OperationOutcome::FatalFailure => {
                    error!(
                        "Commit of branch {} failed on its last attempt ({}/{}): {}",
                        branch.id,
                        branch.attempts.saturating_add(1),
                        max_commit_attempts,
                        reason
                    );
                    fatal.push(branch.id);
                }
            }
        }

        if !result.for_retry.is_empty() {
            info!(
                "Failed to commit {} of {} branches, keeping them for retry",
                result.for_retry.len(),
                total
            );
        }
        if !fatal.is_empty() {
            return Err(XaSinkError::FatalCommit {
                branches: fatal,
                max_attempts: max_commit_attempts,
            });
        }
        Ok(result)
    }

    /// Rolls back every branch, continuing past per-branch failures.
    ///
    /// A branch unknown to the store counts as rolled back.
    ///
    /// # Errors
    ///
    /// Returns [`XaSinkError::Connection`] as soon as the facade reports a
    /// lost connection. The message names the branches that already failed
    /// in this pass; branches after the broken one are not attempted.
    pub fn rollback<I>(&mut self, branches: I) -> Result<GroupRollbackResult>
    where
        I: IntoIterator<Item = BranchId>,
    {
        let mut result = GroupRollbackResult::default();
        for id in branches {
            match self.facade.rollback_branch(&id) {
                Ok(()) => {
                    debug!("Rolled back branch {}", id);
                    result.rolled_back.insert(id);
                }
                Err(BranchError::Unknown) => {
                    debug!("Branch {} is unknown to the store, nothing to roll back", id);
                    result.rolled_back.insert(id);
                }
                Err(BranchError::ConnectionLost(reason)) => {
                    warn!("Lost connection while rolling back branch {}: {}", id, reason);
                    let mut message =
                        format!("lost connection while rolling back branch {}: {}", id, reason);
                    if !result.failures.is_empty() {
                        let failed: Vec<String> =
                            result.failures.iter().map(ToString::to_string).collect();
                        message.push_str(&format!("; earlier failures: {}", failed.join(", ")));
                    }
                    return Err(XaSinkError::Connection(message));
                }
                Err(e) => {
                    warn!("Rollback of branch {} failed: {}", id, e);
                    result.failures.push(BranchFailure {
                        id,
                        reason: e.to_string(),
                    });
                }
            }
        }
        Ok(result)
    }
}
