use tracing::{info, warn};

use crate::error::ChangelogError;
use crate::github::{BackportMapping, CommitComparer, CommitId, PrClassifier, PrMapping};
use crate::notes::{NoteAggregator, ReleaseCategories, ReleaseNotes};
use crate::state::{PersistedState, StateStore};
use crate::time::Deadline;
use crate::walker::{CommitWalker, WalkState};

/// Classified PRs between two references
#[derive(Debug)]
pub struct ChangeLog {
    pub backports: BackportMapping,
    pub prs: PrMapping,
    /// Set when the final state could not be saved
    pub state_warning: Option<ChangelogError>,
}

impl ChangeLog {
    pub fn render(&self, categories: &ReleaseCategories, last_stable: &str) -> ReleaseNotes {
        NoteAggregator::new(categories).render(&self.backports, &self.prs, last_stable)
    }
}

/// Runs walk, classification and persistence in sequence
pub struct ChangelogGenerator<'a, C, P, S> {
    comparer: &'a C,
    classifier: &'a P,
    store: &'a S,
    deadline: Deadline,
}

impl<'a, C, P, S> ChangelogGenerator<'a, C, P, S>
where
    C: CommitComparer,
    P: PrClassifier,
    S: StateStore,
{
    pub fn new(comparer: &'a C, classifier: &'a P, store: &'a S) -> Self {
        ChangelogGenerator {
            comparer,
            classifier,
            store,
            deadline: Deadline::none(),
        }
    }

    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = deadline;
        self
    }

    /// Collect the PRs that landed between `base` and `head`.
    ///
    /// Saved state short-circuits the commit walk. State is saved exactly
    /// once, after classification or after an interrupted walk, so every
    /// failure leaves something to resume from.
    pub fn generate(&self, base: &str, head: &str) -> Result<ChangeLog, ChangelogError> {
        let saved = self
            .store
            .load()
            .map_err(|source| ChangelogError::StateRead {
                path: self.store.location(),
                source,
            })?;

        let (backports, prs, commits) = match saved {
            Some(state) if state.walk_pending() => {
                info!("Found state file with an unfinished commit walk, resuming it");
                let walk = state.walk.unwrap_or_else(|| WalkState::new(head));
                let commits = self.walk(base, walk, &state.backports, &state.prs)?;
                (state.backports, state.prs, commits)
            }
            Some(state) => {
                info!("Found state file, resuming from stored state");
                (state.backports, state.prs, state.commits)
            }
            None => {
                let commits = self.walk(
                    base,
                    WalkState::new(head),
                    &BackportMapping::new(),
                    &PrMapping::new(),
                )?;
                (BackportMapping::new(), PrMapping::new(), commits)
            }
        };

        info!("Found {} commits!", commits.len());

        let classification = self
            .classifier
            .classify(&commits, backports, prs, &self.deadline);

        if classification.error.is_some() {
            info!(
                "Storing state in {} before exiting due to error...",
                self.store.location()
            );
        }
        let state = PersistedState {
            backports: classification.backports,
            prs: classification.prs,
            commits: classification.remaining,
            ..Default::default()
        };
        let state_warning = self.persist(&state).err();

        if let Some(source) = classification.error {
            return Err(ChangelogError::Classification {
                remaining: state.commits.len(),
                source,
            });
        }

        info!(
            "Found {} PRs and {} backport PRs!",
            state.prs.len(),
            state.backports.len()
        );

        Ok(ChangeLog {
            backports: state.backports,
            prs: state.prs,
            state_warning,
        })
    }

    fn walk(
        &self,
        base: &str,
        walk: WalkState,
        backports: &BackportMapping,
        prs: &PrMapping,
    ) -> Result<Vec<CommitId>, ChangelogError> {
        match CommitWalker::new(self.comparer, base).resume(walk, &self.deadline) {
            Ok(walk) => Ok(walk.commits),
            Err(interrupted) => {
                let head = interrupted.state.head.clone();
                let state = PersistedState {
                    backports: backports.clone(),
                    prs: prs.clone(),
                    commits: interrupted.state.commits.clone(),
                    walk: Some(interrupted.state),
                    saved_at: None,
                };
                // A failed save is logged by persist, the walk error wins
                let _ = self.persist(&state);

                Err(ChangelogError::Walk {
                    base: base.to_string(),
                    head,
                    source: interrupted.source,
                })
            }
        }
    }

    fn persist(&self, state: &PersistedState) -> Result<(), ChangelogError> {
        let location = self.store.location();
        match self.store.store(state) {
            Ok(()) => {
                info!(
                    "State stored successfully in {}, use --state-file={} in the next run to continue",
                    location, location
                );
                Ok(())
            }
            Err(source) => {
                warn!("Unable to store state: {:#}", source);
                Err(ChangelogError::StateWrite {
                    path: location,
                    source,
                })
            }
        }
    }
}
