//! An in-process transactional store and its [`ResourceFacade`].
//!
//! `MemoryStore` behaves like an XA resource manager: writer tasks prepare
//! branches into it, and a finalized branch is forgotten by the store, so a
//! second commit of the same branch reports [`BranchError::Unknown`]. The
//! store can be switched offline to exercise connection failures.

use std::sync::Arc;

use ahash::AHashMap as HashMap;
use log::debug;
use parking_lot::Mutex;

use crate::branch::BranchId;
use crate::errors::{Result, XaSinkError};
use crate::facade::{BranchError, ResourceFacade};

#[derive(Debug)]
struct StoreState {
    online: bool,
    prepared: HashMap<BranchId, Vec<String>>,
    committed: Vec<String>,
    open_connections: usize,
}

/// Shared handle to an in-memory transactional store.
///
/// Clones refer to the same store.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    name: Arc<str>,
    state: Arc<Mutex<StoreState>>,
}

impl MemoryStore {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(StoreState {
                online: true,
                prepared: HashMap::new(),
                committed: Vec::new(),
                open_connections: 0,
            })),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Phase 1 on behalf of a writer task: stages `rows` under `id`.
    ///
    /// # Errors
    ///
    /// Fails if the store is offline or `id` is already prepared.
    pub fn prepare(&self, id: BranchId, rows: Vec<String>) -> std::result::Result<(), BranchError> {
        let mut state = self.state.lock();
        if !state.online {
            return Err(BranchError::ConnectionLost(format!(
                "store '{}' is offline",
                self.name
            )));
        }
        if state.prepared.contains_key(&id) {
            return Err(BranchError::Failed(format!("branch {} already prepared", id)));
        }
        debug!("Prepared branch {} with {} row(s)", id, rows.len());
        state.prepared.insert(id, rows);
        Ok(())
    }

    pub fn is_prepared(&self, id: &BranchId) -> bool {
        self.state.lock().prepared.contains_key(id)
    }

    pub fn prepared_count(&self) -> usize {
        self.state.lock().prepared.len()
    }

    /// Rows of every committed branch, in commit order.
    pub fn committed_rows(&self) -> Vec<String> {
        self.state.lock().committed.clone()
    }

    pub fn set_online(&self, online: bool) {
        self.state.lock().online = online;
    }

    pub fn open_connections(&self) -> usize {
        self.state.lock().open_connections
    }

    /// Creates a facade for this store. The facade is not opened yet.
    pub fn connect(&self) -> MemoryFacade {
        MemoryFacade {
            store: self.clone(),
            open: false,
        }
    }

    fn finalize(&self, id: &BranchId, commit: bool) -> std::result::Result<(), BranchError> {
        let mut state = self.state.lock();
        if !state.online {
            return Err(BranchError::ConnectionLost(format!(
                "store '{}' is offline",
                self.name
            )));
        }
        let rows = state.prepared.remove(id).ok_or(BranchError::Unknown)?;
        if commit {
            state.committed.extend(rows);
        }
        Ok(())
    }
}

/// A single connection to a [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryFacade {
    store: MemoryStore,
    open: bool,
}

impl MemoryFacade {
    fn ensure_open(&self) -> std::result::Result<(), BranchError> {
        if self.open {
            Ok(())
        } else {
            Err(BranchError::ConnectionLost("facade is not open".to_string()))
        }
    }
}

impl ResourceFacade for MemoryFacade {
    fn open(&mut self) -> Result<()> {
        if self.open {
            return Ok(());
        }
        let mut state = self.store.state.lock();
        if !state.online {
            return Err(XaSinkError::Connection(format!(
                "cannot connect to store '{}': offline",
                self.store.name
            )));
        }
        state.open_connections += 1;
        self.open = true;
        debug!("Opened connection to store '{}'", self.store.name);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn commit_branch(&mut self, id: &BranchId) -> std::result::Result<(), BranchError> {
        self.ensure_open()?;
        self.store.finalize(id, true)
    }

    fn rollback_branch(&mut self, id: &BranchId) -> std::result::Result<(), BranchError> {
        self.ensure_open()?;
        self.store.finalize(id, false)
    }

    fn close(&mut self) -> Result<()> {
        if self.open {
            let mut state = self.store.state.lock();
            state.open_connections = state.open_connections.saturating_sub(1);
            self.open = false;
            debug!("Closed connection to store '{}'", self.store.name);
        }
        Ok(())
    }
}
