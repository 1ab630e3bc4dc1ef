//! Common utilities for xa-sink integration tests.
#![allow(dead_code)]

use ahash::AHashMap as HashMap;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use xa_sink::{
    errors::{Result, XaSinkError},
    BranchError, BranchId, ResourceFacade, SinkOptions, XaAggregatedCommitter,
};

// --- ScriptedFacade ---

/// One call the committer made against the facade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Open,
    Commit(BranchId),
    Rollback(BranchId),
    Close,
}

#[derive(Debug, Default)]
struct ScriptState {
    open: bool,
    broken: bool,
    failing_opens: usize,
    commit_scripts: HashMap<BranchId, VecDeque<std::result::Result<(), BranchError>>>,
    rollback_scripts: HashMap<BranchId, VecDeque<std::result::Result<(), BranchError>>>,
    calls: Vec<Call>,
}

impl ScriptState {
    fn observe(
        &mut self,
        outcome: std::result::Result<(), BranchError>,
    ) -> std::result::Result<(), BranchError> {
        if matches!(outcome, Err(BranchError::ConnectionLost(_))) {
            self.broken = true;
        }
        outcome
    }
}

fn dead_socket() -> BranchError {
    BranchError::ConnectionLost("dead socket".to_string())
}

/// Test-side handle on a [`ScriptedFacade`]: scripts outcomes and records calls.
///
/// Branches without a script (or whose script ran out) succeed. Once a branch
/// call returns [`BranchError::ConnectionLost`] the connection stays broken
/// and every branch call fails the same way until the facade is reopened.
#[derive(Debug, Clone, Default)]
pub struct FacadeScript {
    state: Arc<Mutex<ScriptState>>,
}

impl FacadeScript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn facade(&self) -> Box<dyn ResourceFacade> {
        Box::new(ScriptedFacade {
            script: self.clone(),
        })
    }

    pub fn script_commit(&self, id: &BranchId, outcomes: Vec<std::result::Result<(), BranchError>>) {
        let mut state = self.state.lock().unwrap();
        state.commit_scripts.insert(id.clone(), outcomes.into());
    }

    pub fn script_rollback(&self, id: &BranchId, outcomes: Vec<std::result::Result<(), BranchError>>) {
        let mut state = self.state.lock().unwrap();
        state.rollback_scripts.insert(id.clone(), outcomes.into());
    }

    pub fn fail_next_opens(&self, count: usize) {
        self.state.lock().unwrap().failing_opens = count;
    }

    /// Drops the connection without telling the facade.
    pub fn break_connection(&self) {
        self.state.lock().unwrap().broken = true;
    }

    pub fn open_calls(&self) -> usize {
        self.calls().iter().filter(|call| **call == Call::Open).count()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn commit_calls(&self, id: &BranchId) -> usize {
        self.calls()
            .iter()
            .filter(|call| **call == Call::Commit(id.clone()))
            .count()
    }

    pub fn rolled_back(&self) -> Vec<BranchId> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Rollback(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().unwrap().open
    }
}

/// A facade whose per-branch outcomes are scripted through a [`FacadeScript`].
pub struct ScriptedFacade {
    script: FacadeScript,
}

impl ResourceFacade for ScriptedFacade {
    fn open(&mut self) -> Result<()> {
        let mut state = self.script.state.lock().unwrap();
        state.calls.push(Call::Open);
        if state.failing_opens > 0 {
            state.failing_opens -= 1;
            return Err(XaSinkError::Connection("scripted open failure".to_string()));
        }
        state.open = true;
        state.broken = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.script.state.lock().unwrap().open
    }

    fn commit_branch(&mut self, id: &BranchId) -> std::result::Result<(), BranchError> {
        let mut state = self.script.state.lock().unwrap();
        state.calls.push(Call::Commit(id.clone()));
        if state.broken {
            return Err(dead_socket());
        }
        let outcome = state
            .commit_scripts
            .get_mut(id)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Ok(()));
        state.observe(outcome)
    }

    fn rollback_branch(&mut self, id: &BranchId) -> std::result::Result<(), BranchError> {
        let mut state = self.script.state.lock().unwrap();
        state.calls.push(Call::Rollback(id.clone()));
        if state.broken {
            return Err(dead_socket());
        }
        let outcome = state
            .rollback_scripts
            .get_mut(id)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Ok(()));
        state.observe(outcome)
    }

    fn close(&mut self) -> Result<()> {
        let mut state = self.script.state.lock().unwrap();
        state.calls.push(Call::Close);
        state.open = false;
        Ok(())
    }
}

// --- Helper Functions ---

/// Helper function to create a branch id whose global transaction id is `name`.
pub fn branch(name: &str) -> BranchId {
    BranchId::new(0x5854, name.as_bytes().to_vec(), b"0".to_vec())
}

pub fn failed(reason: &str) -> std::result::Result<(), BranchError> {
    Err(BranchError::Failed(reason.to_string()))
}

pub fn connection_lost() -> std::result::Result<(), BranchError> {
    Err(BranchError::ConnectionLost("peer reset".to_string()))
}

/// Helper function to create a committer over a scripted facade.
pub fn setup_committer(
    script: &FacadeScript,
    max_commit_attempts: u32,
    treat_unknown_as_success: bool,
) -> XaAggregatedCommitter {
    let options = SinkOptions::new("scripted://test")
        .with_max_commit_attempts(max_commit_attempts)
        .with_treat_unknown_as_success(treat_unknown_as_success);
    XaAggregatedCommitter::new(script.facade(), &options).unwrap()
}

/// Sorted branch ids of a record, for order-independent comparisons.
pub fn ids(record: &xa_sink::AggregatedCommitRecord) -> Vec<BranchId> {
    record.branch_ids().cloned().collect()
}
