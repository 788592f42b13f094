use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Opaque commit identifier (a SHA as returned by GitHub)
pub type CommitId = String;

/// Pull requests keyed by their number
pub type PrMapping = BTreeMap<u64, PullRequest>;

/// Backport PR number to the upstream PRs it carries
pub type BackportMapping = BTreeMap<u64, PrMapping>;

/// The subset of pull request metadata that ends up in release notes
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct PullRequest {
    pub author_name: String,
    pub release_note: String,
    pub release_label: String,
    #[serde(default)]
    pub backport_branches: Vec<String>,
}

/// Response of `GET repos/{owner}/{repo}/compare/{base}...{head}`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RestComparison {
    #[serde(default)]
    pub total_commits: Option<u64>,
    pub commits: Vec<RestCommit>,
}

/// Commit entry of a comparison, ordered base to head
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RestCommit {
    pub sha: String,
}

/// Pull request as returned by the REST API
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RestPull {
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub user: Author,
    #[serde(default)]
    pub labels: Vec<Label>,
    pub merged_at: Option<String>,
}

impl RestPull {
    pub fn is_merged(&self) -> bool {
        self.merged_at.is_some()
    }

    pub fn has_label(&self, name: &str) -> bool {
        self.labels.iter().any(|l| l.name == name)
    }
}

/// Author information
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Author {
    pub login: String,
}

/// Label on a PR
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Label {
    pub name: String,
}
