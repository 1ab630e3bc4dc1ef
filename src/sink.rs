use crate::errors::Result;

/// The committer a checkpoint framework drives once every writer task of a
/// checkpoint has prepared its work.
///
/// The framework decides when to call each operation and serializes the
/// calls; `commit`, `abort` and `close` take `&mut self` so one instance can
/// never run two of them at once.
pub trait SinkAggregatedCommitter {
    /// What one writer task hands over for one checkpoint.
    type CommitInfo;
    /// The checkpoint-level unit of work built from all `CommitInfo`s.
    type AggregatedCommitInfo;

    /// Merges every task's commit info of one checkpoint. Performs no I/O.
    fn combine(&self, commit_infos: Vec<Self::CommitInfo>) -> Self::AggregatedCommitInfo;

    /// Commits the given checkpoints and returns only what is still
    /// unresolved. Fully resolved checkpoints are not returned.
    ///
    /// # Errors
    ///
    /// An error means the state of the store is uncertain and the caller
    /// must not advance the checkpoint.
    fn commit(
        &mut self,
        aggregated_commit_infos: Vec<Self::AggregatedCommitInfo>,
    ) -> Result<Vec<Self::AggregatedCommitInfo>>;

    /// Rolls back every branch of the given checkpoints.
    fn abort(&mut self, aggregated_commit_infos: Vec<Self::AggregatedCommitInfo>) -> Result<()>;

    /// Releases the underlying connection. No further `commit` or `abort`
    /// is accepted afterwards.
    fn close(&mut self) -> Result<()>;
}
