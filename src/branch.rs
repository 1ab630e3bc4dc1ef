use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of one prepared transaction branch.
///
/// A `BranchId` is created upstream by a writer task during the prepare phase
/// and is never reused once the branch has been committed or rolled back.
/// It mirrors the XA transaction identifier: a format tag that lets stores
/// route transaction families, a global transaction id shared by every branch
/// of the same global transaction, and a branch qualifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BranchId {
    format_id: i32,
    global_transaction_id: Vec<u8>,
    branch_qualifier: Vec<u8>,
}

impl BranchId {
    /// Creates a new `BranchId` from its three XA components.
    pub fn new(
        format_id: i32,
        global_transaction_id: impl Into<Vec<u8>>,
        branch_qualifier: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            format_id,
            global_transaction_id: global_transaction_id.into(),
            branch_qualifier: branch_qualifier.into(),
        }
    }

    pub fn format_id(&self) -> i32 {
        self.format_id
    }

    pub fn global_transaction_id(&self) -> &[u8] {
        &self.global_transaction_id
    }

    pub fn branch_qualifier(&self) -> &[u8] {
        &self.branch_qualifier
    }
}

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.format_id)?;
        for byte in &self.global_transaction_id {
            write!(f, "{:02x}", byte)?;
        }
        f.write_str(":")?;
        for byte in &self.branch_qualifier {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// A branch that has not been finalized yet, together with the number of
/// finalize attempts that already failed for it.
///
/// The counter travels with the branch inside the aggregated record, so it
/// survives between `commit` calls and across checkpoint restores.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PendingBranch {
    pub id: BranchId,
    pub attempts: u32,
}

impl PendingBranch {
    /// A freshly prepared branch with no failed attempts.
    pub fn new(id: BranchId) -> Self {
        Self { id, attempts: 0 }
    }

    /// Returns the same branch with one more failed attempt recorded.
    pub fn with_attempts_incremented(self) -> Self {
        Self {
            id: self.id,
            attempts: self.attempts.saturating_add(1),
        }
    }
}

impl From<BranchId> for PendingBranch {
    fn from(id: BranchId) -> Self {
        Self::new(id)
    }
}
