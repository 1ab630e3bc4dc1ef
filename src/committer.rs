use log::{debug, info, warn};

use crate::branch::PendingBranch;
use crate::codec;
use crate::config::SinkOptions;
use crate::errors::{Result, XaSinkError};
use crate::facade::ResourceFacade;
use crate::group_ops::GroupCommitOperator;
use crate::record::{AggregatedCommitRecord, CommitRecord};
use crate::sink::SinkAggregatedCommitter;

/// Aggregated committer of an exactly-once sink writing through XA-style
/// transaction branches.
///
/// The committer keeps no state between calls besides its connection:
/// unresolved branches, and their attempt counters, travel back to the
/// caller inside the returned records and are retried when the caller
/// submits them again, usually with the next checkpoint.
///
/// # Examples
///
/// ```no_run
/// use xa_sink::prelude::*;
///
/// let store = MemoryStore::new("orders");
/// let options = SinkOptions::new("memory://orders").with_max_commit_attempts(3);
/// let mut committer = XaAggregatedCommitter::new(Box::new(store.connect()), &options).unwrap();
///
/// let x1 = BranchId::new(1, b"checkpoint-7".to_vec(), b"task-0".to_vec());
/// store.prepare(x1.clone(), vec!["row".to_string()]).unwrap();
///
/// let aggregated = committer.combine(vec![CommitRecord::new(0, vec![x1])]);
/// let remaining = committer.commit(vec![aggregated]).unwrap();
/// assert!(remaining.is_empty());
/// committer.close().unwrap();
/// ```
pub struct XaAggregatedCommitter {
    group_ops: GroupCommitOperator,
    max_commit_attempts: u32,
    treat_unknown_as_success: bool,
    closed: bool,
}

impl XaAggregatedCommitter {
    /// Creates a committer that owns `facade` for its whole lifetime.
    ///
    /// The facade is opened lazily by the first `commit` or `abort`.
    ///
    /// # Errors
    ///
    /// Returns [`XaSinkError::InvalidConfig`] if `max_commit_attempts` is zero.
    pub fn new(facade: Box<dyn ResourceFacade>, options: &SinkOptions) -> Result<Self> {
        if options.max_commit_attempts == 0 {
            return Err(XaSinkError::InvalidConfig(
                "max_commit_attempts must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            group_ops: GroupCommitOperator::new(facade),
            max_commit_attempts: options.max_commit_attempts,
            treat_unknown_as_success: options.treat_unknown_as_success,
            closed: false,
        })
    }

    pub fn max_commit_attempts(&self) -> u32 {
        self.max_commit_attempts
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn is_open(&self) -> bool {
        self.group_ops.facade().is_open()
    }

    /// Encodes aggregated records for a checkpoint snapshot.
    pub fn snapshot_records(records: &[AggregatedCommitRecord]) -> Result<Vec<u8>> {
        codec::encode(records)
    }

    /// Decodes aggregated records from a checkpoint snapshot.
    pub fn restore_records(bytes: &[u8]) -> Result<Vec<AggregatedCommitRecord>> {
        codec::decode(bytes)
    }

    fn try_open(&mut self) -> Result<()> {
        if self.closed {
            return Err(XaSinkError::Closed);
        }
        let facade = self.group_ops.facade_mut();
        if !facade.is_open() {
            facade.open().map_err(into_connection_error)?;
        }
        Ok(())
    }

    /// Closes the facade after a connection-level failure so the next call
    /// reopens it. Other results pass through untouched.
    fn reset_on_connection_loss<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(XaSinkError::Connection(reason)) = &result {
            warn!("Resetting connection after failure: {}", reason);
            if let Err(e) = self.group_ops.facade_mut().close() {
                warn!("Failed to close broken connection: {}", e);
            }
        }
        result
    }
}

fn into_connection_error(error: XaSinkError) -> XaSinkError {
    match error {
        XaSinkError::Connection(_) => error,
        other => XaSinkError::Connection(other.to_string()),
    }
}

impl SinkAggregatedCommitter for XaAggregatedCommitter {
    type CommitInfo = CommitRecord;
    type AggregatedCommitInfo = AggregatedCommitRecord;

    fn combine(&self, commit_infos: Vec<CommitRecord>) -> AggregatedCommitRecord {
        let mut aggregated = AggregatedCommitRecord::new();
        for record in commit_infos {
            for id in record.branches {
                if aggregated.contains(&id) {
                    warn!(
                        "Branch {} from subtask {} is already part of this checkpoint, ignoring duplicate",
                        id, record.subtask_index
                    );
                    continue;
                }
                aggregated.insert(PendingBranch::new(id));
            }
        }
        aggregated
    }

    fn commit(
        &mut self,
        aggregated_commit_infos: Vec<AggregatedCommitRecord>,
    ) -> Result<Vec<AggregatedCommitRecord>> {
        self.try_open()?;
        info!("Committing {} aggregated record(s)", aggregated_commit_infos.len());

        let mut remaining = Vec::with_capacity(aggregated_commit_infos.len());
        for record in aggregated_commit_infos {
            if record.is_empty() {
                continue;
            }
            let pass = self.group_ops.commit(
                record.into_pending(),
                self.treat_unknown_as_success,
                self.max_commit_attempts,
            );
            let result = self.reset_on_connection_loss(pass)?;
            debug!(
                "Resolved {} branch(es), {} left for retry",
                result.resolved.len(),
                result.for_retry.len()
            );
            let left: AggregatedCommitRecord = result.for_retry.into_iter().collect();
            if !left.is_empty() {
                remaining.push(left);
            }
        }
        Ok(remaining)
    }

    fn abort(&mut self, aggregated_commit_infos: Vec<AggregatedCommitRecord>) -> Result<()> {
        self.try_open()?;
        info!("Aborting {} aggregated record(s)", aggregated_commit_infos.len());

        let mut failures = Vec::new();
        for record in aggregated_commit_infos {
            let ids = record.into_pending().into_iter().map(|branch| branch.id);
            let pass = self.group_ops.rollback(ids);
            match self.reset_on_connection_loss(pass) {
                Ok(result) => failures.extend(result.failures),
                Err(XaSinkError::Connection(reason)) if !failures.is_empty() => {
                    let failed: Vec<String> = failures.iter().map(ToString::to_string).collect();
                    return Err(XaSinkError::Connection(format!(
                        "{}; earlier failures: {}",
                        reason,
                        failed.join(", ")
                    )));
                }
                Err(e) => return Err(e),
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(XaSinkError::Abort { failures })
        }
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.group_ops
            .facade_mut()
            .close()
            .map_err(into_connection_error)
    }
}

impl Drop for XaAggregatedCommitter {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.close() {
                warn!("Failed to close committer on drop: {}", e);
            }
        }
    }
}
