use anyhow::{Context, Result};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::github::{BackportMapping, CommitId, PrMapping};
use crate::walker::WalkState;

/// Snapshot written at the end of every run so the next one can resume
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct PersistedState {
    #[serde(default)]
    pub backports: BackportMapping,
    #[serde(default)]
    pub prs: PrMapping,
    /// Commits that still need classification
    #[serde(default)]
    pub commits: Vec<CommitId>,
    /// Set when the commit walk itself did not finish
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub walk: Option<WalkState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<Timestamp>,
}

impl PersistedState {
    /// Whether the commit walk still has to be continued
    pub fn walk_pending(&self) -> bool {
        self.walk.as_ref().is_some_and(|w| !w.complete)
    }
}

/// Durable storage for [`PersistedState`]
pub trait StateStore {
    /// Load the saved state, `None` if nothing has been saved
    fn load(&self) -> Result<Option<PersistedState>>;

    fn store(&self, state: &PersistedState) -> Result<()>;

    /// Human readable location, used in messages
    fn location(&self) -> String;
}

/// State kept as a JSON file
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStateStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for FileStateStore {
    fn load(&self) -> Result<Option<PersistedState>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read state from {:?}", self.path))?;

        let state: PersistedState = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse state from {:?}", self.path))?;

        debug!(
            "Loaded state with {} commits, {} PRs and {} backport PRs",
            state.commits.len(),
            state.prs.len(),
            state.backports.len()
        );
        Ok(Some(state))
    }

    fn store(&self, state: &PersistedState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory {:?}", parent))?;
            }
        }

        let mut state = state.clone();
        state.saved_at = Some(Timestamp::now());
        let contents = serde_json::to_string_pretty(&state).context("Failed to serialize state")?;

        std::fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write state to {:?}", self.path))?;

        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory store for tests, counting writes and optionally failing them
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStateStore {
    pub state: std::cell::RefCell<Option<PersistedState>>,
    pub stores: std::cell::RefCell<usize>,
    pub fail_store: bool,
}

#[cfg(test)]
impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: PersistedState) -> Self {
        MemoryStateStore {
            state: std::cell::RefCell::new(Some(state)),
            ..Default::default()
        }
    }

    /// The most recently stored state
    pub fn snapshot(&self) -> Option<PersistedState> {
        self.state.borrow().clone()
    }
}

#[cfg(test)]
impl StateStore for MemoryStateStore {
    fn load(&self) -> Result<Option<PersistedState>> {
        Ok(self.state.borrow().clone())
    }

    fn store(&self, state: &PersistedState) -> Result<()> {
        *self.stores.borrow_mut() += 1;
        if self.fail_store {
            return Err(anyhow::anyhow!("Permission denied"));
        }
        *self.state.borrow_mut() = Some(state.clone());
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
