use crate::github::models::*;
use crate::github::{CommitComparer, PullSource};
use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use std::process::Command;
use tracing::debug;

/// GitHub access through the `gh` CLI, scoped to one repository
pub struct RealGitHub {
    owner: String,
    repo: String,
}

impl RealGitHub {
    /// Create a client for `owner/repo`, checking that `gh` is usable
    pub fn new(owner: &str, repo: &str) -> Result<Self> {
        let output = Command::new("gh")
            .arg("--version")
            .output()
            .context("Failed to run 'gh --version'. Is GitHub CLI installed?")?;

        if !output.status.success() {
            return Err(anyhow!("gh --version failed"));
        }

        Ok(RealGitHub {
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    /// Run `gh api <endpoint>` and decode the JSON body
    fn api<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        debug!("gh api {}", endpoint);
        let output = Command::new("gh")
            .args(["api", endpoint])
            .output()
            .context("Failed to execute gh command")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);

            if stderr.contains("404") || stderr.contains("Not Found") {
                return Err(anyhow!("Resource not found: {}", endpoint));
            }
            if stderr.contains("401") || stderr.contains("403") {
                return Err(anyhow!(
                    "Request to {} was rejected (not authenticated or rate limit). Run 'gh auth login'",
                    endpoint
                ));
            }

            return Err(anyhow!("gh command failed: {}", stderr.trim()));
        }

        let stdout = String::from_utf8(output.stdout).context("Invalid UTF-8 in gh output")?;

        serde_json::from_str(&stdout)
            .with_context(|| format!("Failed to parse gh JSON output for {}", endpoint))
    }

    fn repo_path(&self) -> String {
        format!("repos/{}/{}", self.owner, self.repo)
    }
}

impl CommitComparer for RealGitHub {
    fn compare(&self, base: &str, head: &str) -> Result<Vec<CommitId>> {
        let endpoint = format!("{}/compare/{}...{}", self.repo_path(), base, head);
        let comparison: RestComparison = self.api(&endpoint)?;

        Ok(comparison.commits.into_iter().map(|c| c.sha).collect())
    }
}

impl PullSource for RealGitHub {
    fn pulls_for_commit(&self, sha: &str) -> Result<Vec<RestPull>> {
        let endpoint = format!("{}/commits/{}/pulls", self.repo_path(), sha);
        self.api(&endpoint)
    }

    fn pull(&self, number: u64) -> Result<RestPull> {
        let endpoint = format!("{}/pulls/{}", self.repo_path(), number);
        self.api(&endpoint)
    }
}

/// Mock GitHub for testing
///
/// Holds a linear history ordered base to head. `compare` answers with at
/// most `page_size` commits, the ones closest to `head`, the way a throttled
/// comparison does.
#[cfg(test)]
pub struct MockGitHub {
    pub history: Vec<CommitId>,
    pub page_size: usize,
    /// Number of compare calls that succeed before every call fails
    pub fail_after: Option<usize>,
    /// Compare calls (by index) answered with only the head commit
    pub throttled_calls: std::collections::HashSet<usize>,
    pub compare_calls: std::cell::RefCell<Vec<(String, String)>>,
    pub commit_pulls: std::collections::HashMap<String, Vec<RestPull>>,
    pub pulls: std::collections::HashMap<u64, RestPull>,
    pub failing_commits: std::collections::HashSet<String>,
}

#[cfg(test)]
impl MockGitHub {
    pub fn new() -> Self {
        MockGitHub {
            history: vec![],
            page_size: 250,
            fail_after: None,
            throttled_calls: std::collections::HashSet::new(),
            compare_calls: std::cell::RefCell::new(vec![]),
            commit_pulls: std::collections::HashMap::new(),
            pulls: std::collections::HashMap::new(),
            failing_commits: std::collections::HashSet::new(),
        }
    }

    /// History `c0..=c{len}` where `c0` is the base
    pub fn linear(len: usize, page_size: usize) -> Self {
        let mut mock = MockGitHub::new();
        mock.history = (0..=len).map(|i| format!("c{}", i)).collect();
        mock.page_size = page_size;
        mock
    }

    /// Commits after `base` up to and including `head`, newest first
    pub fn expected_walk(&self, base: &str, head: &str) -> Vec<CommitId> {
        let b = self.position(base).unwrap();
        let h = self.position(head).unwrap();
        self.history[b + 1..=h].iter().rev().cloned().collect()
    }

    fn position(&self, sha: &str) -> Option<usize> {
        self.history.iter().position(|c| c == sha)
    }

    pub fn add_pull(&mut self, pull: RestPull) {
        self.pulls.insert(pull.number, pull);
    }

    pub fn link_commit(&mut self, sha: &str, number: u64) {
        let pull = self.pulls[&number].clone();
        self.commit_pulls
            .entry(sha.to_string())
            .or_default()
            .push(pull);
    }
}

#[cfg(test)]
impl CommitComparer for MockGitHub {
    fn compare(&self, base: &str, head: &str) -> Result<Vec<CommitId>> {
        let calls = self.compare_calls.borrow().len();
        self.compare_calls
            .borrow_mut()
            .push((base.to_string(), head.to_string()));

        if let Some(limit) = self.fail_after {
            if calls >= limit {
                return Err(anyhow!("API rate limit exceeded"));
            }
        }

        let b = self
            .position(base)
            .ok_or_else(|| anyhow!("Unknown base {}", base))?;
        let h = self
            .position(head)
            .ok_or_else(|| anyhow!("Unknown head {}", head))?;
        if h <= b {
            return Ok(vec![]);
        }
        if self.throttled_calls.contains(&calls) {
            return Ok(vec![self.history[h].clone()]);
        }

        let start = (b + 1).max((h + 1).saturating_sub(self.page_size));
        Ok(self.history[start..=h].to_vec())
    }
}

#[cfg(test)]
impl PullSource for MockGitHub {
    fn pulls_for_commit(&self, sha: &str) -> Result<Vec<RestPull>> {
        if self.failing_commits.contains(sha) {
            return Err(anyhow!("connection reset while fetching {}", sha));
        }
        Ok(self.commit_pulls.get(sha).cloned().unwrap_or_default())
    }

    fn pull(&self, number: u64) -> Result<RestPull> {
        self.pulls
            .get(&number)
            .cloned()
            .ok_or_else(|| anyhow!("PR #{} not found", number))
    }
}
