use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::branch::{BranchId, PendingBranch};

/// One writer task's contribution to a checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Index of the writer task that prepared the branches.
    pub subtask_index: u32,
    /// Branches prepared by that task, in the order it prepared them.
    pub branches: Vec<BranchId>,
}

impl CommitRecord {
    pub fn new(subtask_index: u32, branches: Vec<BranchId>) -> Self {
        Self {
            subtask_index,
            branches,
        }
    }
}

/// Where an aggregated record is in its commit lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// No finalize attempt has failed yet.
    Prepared,
    /// At least one pass ran and some branches are still unresolved.
    PartiallyResolved,
    /// Every branch has been resolved.
    Resolved,
}

/// The checkpoint-level set of branches the committer operates on.
///
/// Branches are keyed by id, so a record can never hold the same branch
/// twice, and equality does not depend on the order branches were added in.
/// After creation a record only shrinks as the committer resolves branches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedCommitRecord {
    branches: BTreeMap<BranchId, u32>,
}

impl AggregatedCommitRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.branches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    pub fn contains(&self, id: &BranchId) -> bool {
        self.branches.contains_key(id)
    }

    /// Failed attempts recorded so far for `id`, if the record holds it.
    pub fn attempts(&self, id: &BranchId) -> Option<u32> {
        self.branches.get(id).copied()
    }

    /// Iterates the branch ids in their canonical order.
    pub fn branch_ids(&self) -> impl Iterator<Item = &BranchId> {
        self.branches.keys()
    }

    pub fn pending(&self) -> impl Iterator<Item = PendingBranch> + '_ {
        self.branches.iter().map(|(id, attempts)| PendingBranch {
            id: id.clone(),
            attempts: *attempts,
        })
    }

    pub fn into_pending(self) -> Vec<PendingBranch> {
        self.branches
            .into_iter()
            .map(|(id, attempts)| PendingBranch { id, attempts })
            .collect()
    }

    pub fn state(&self) -> RecordState {
        if self.branches.is_empty() {
            RecordState::Resolved
        } else if self.branches.values().all(|attempts| *attempts == 0) {
            RecordState::Prepared
        } else {
            RecordState::PartiallyResolved
        }
    }

    /// Adds a branch, returning `false` if it was already present.
    /// The existing entry is left untouched in that case.
    pub(crate) fn insert(&mut self, branch: PendingBranch) -> bool {
        match self.branches.entry(branch.id) {
            std::collections::btree_map::Entry::Occupied(_) => false,
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(branch.attempts);
                true
            }
        }
    }
}

impl FromIterator<PendingBranch> for AggregatedCommitRecord {
    fn from_iter<I: IntoIterator<Item = PendingBranch>>(iter: I) -> Self {
        let mut record = Self::new();
        for branch in iter {
            record.insert(branch);
        }
        record
    }
}

impl FromIterator<BranchId> for AggregatedCommitRecord {
    fn from_iter<I: IntoIterator<Item = BranchId>>(iter: I) -> Self {
        iter.into_iter().map(PendingBranch::new).collect()
    }
}
