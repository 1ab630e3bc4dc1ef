use crate::branch::BranchId;
use crate::errors::Result;

/// Error reported by a [`ResourceFacade`] for a single branch operation.
///
/// These never reach the checkpoint framework directly; the group operator
/// classifies them into outcomes and only connection-level or fatal
/// conditions are raised as [`XaSinkError`](crate::errors::XaSinkError).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BranchError {
    /// The store has no knowledge of the branch. Usually an earlier attempt
    /// already finalized it and the store has since forgotten it.
    #[error("branch is unknown to the store")]
    Unknown,
    /// Any other failure of the finalize call. Retriable by default.
    #[error("branch operation failed: {0}")]
    Failed(String),
    /// The connection broke while the operation was in flight. Ends the
    /// current commit or rollback pass.
    #[error("connection lost: {0}")]
    ConnectionLost(String),
}

/// Capability interface over one connection to a transactional store.
///
/// One implementation exists per store family and the committer is handed a
/// boxed facade at construction time, so the coordination logic never depends
/// on a concrete store. A facade is owned by exactly one committer: it is
/// `Send` so the owner can move between threads, but it is not `Sync` and all
/// operations take `&mut self`.
///
/// # Examples
///
/// A facade that commits everything it is given:
///
/// ```no_run
/// use xa_sink::prelude::*;
///
/// #[derive(Default)]
/// struct AcceptAll {
///     open: bool,
/// }
///
/// impl ResourceFacade for AcceptAll {
///     fn open(&mut self) -> Result<()> {
///         self.open = true;
///         Ok(())
///     }
///
///     fn is_open(&self) -> bool {
///         self.open
///     }
///
///     fn commit_branch(&mut self, id: &BranchId) -> std::result::Result<(), BranchError> {
///         println!("committing {}", id);
///         Ok(())
///     }
///
///     fn rollback_branch(&mut self, id: &BranchId) -> std::result::Result<(), BranchError> {
///         println!("rolling back {}", id);
///         Ok(())
///     }
///
///     fn close(&mut self) -> Result<()> {
///         self.open = false;
///         Ok(())
///     }
/// }
/// ```
pub trait ResourceFacade: Send {
    /// Establishes the connection. Calling it on an open facade is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`XaSinkError::Connection`](crate::errors::XaSinkError::Connection)
    /// if the store cannot be reached. The caller must not assume partial
    /// connectivity afterwards.
    fn open(&mut self) -> Result<()>;

    /// Whether `open` succeeded and `close` has not been called since.
    ///
    /// A facade may keep reporting `true` after an operation returned
    /// [`BranchError::ConnectionLost`]. The committer closes the facade after
    /// any connection-level failure, so the next call reopens it.
    fn is_open(&self) -> bool;

    /// Phase 2: commits exactly one prepared branch.
    fn commit_branch(&mut self, id: &BranchId) -> std::result::Result<(), BranchError>;

    /// Rolls back exactly one prepared branch.
    fn rollback_branch(&mut self, id: &BranchId) -> std::result::Result<(), BranchError>;

    /// Releases the connection. Idempotent, and safe to call when `open`
    /// never succeeded.
    fn close(&mut self) -> Result<()>;
}
