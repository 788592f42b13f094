use anyhow::Result;

mod classifier;
mod client;
mod models;

pub use classifier::{parse_upstream_prs, LabelClassifier, LabelRules};
pub use client::*;
pub use models::*;

use crate::time::Deadline;

/// Compares two references and returns the commits between them.
///
/// The list is ordered from base to head and may be truncated by the remote
/// service, in which case it holds the commits closest to `head`.
pub trait CommitComparer {
    fn compare(&self, base: &str, head: &str) -> Result<Vec<CommitId>>;
}

/// Looks up the pull requests behind commits
pub trait PullSource {
    /// Pull requests associated with a commit
    fn pulls_for_commit(&self, sha: &str) -> Result<Vec<RestPull>>;

    /// A single pull request by number
    fn pull(&self, number: u64) -> Result<RestPull>;
}

/// Maps commits to pull requests and backport chains
pub trait PrClassifier {
    /// Classify `commits` in order, merging into the given mappings.
    ///
    /// Stops at the first failure or when `deadline` expires. The commits
    /// that were not processed are returned in `remaining` so the caller can
    /// persist them and resume later.
    fn classify(
        &self,
        commits: &[CommitId],
        backports: BackportMapping,
        prs: PrMapping,
        deadline: &Deadline,
    ) -> Classification;
}

/// Result of a classification pass
#[derive(Debug, Default)]
pub struct Classification {
    pub backports: BackportMapping,
    pub prs: PrMapping,
    pub remaining: Vec<CommitId>,
    pub error: Option<anyhow::Error>,
}

impl Classification {
    pub fn is_complete(&self) -> bool {
        self.error.is_none() && self.remaining.is_empty()
    }
}
