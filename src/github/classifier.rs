use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::github::models::*;
use crate::github::{Classification, PrClassifier, PullSource};
use crate::notes::ReleaseCategories;
use crate::time::Deadline;

/// Labels that drive classification
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LabelRules {
    /// Marks a PR as a backport of upstream PRs
    #[serde(default = "default_backport_label")]
    pub backport: String,
    /// Prefix of labels naming branches a PR was backported to
    #[serde(default = "default_backport_done_prefix")]
    pub backport_done_prefix: String,
    /// Prefix of labels naming branches a backport is pending for
    #[serde(default = "default_backport_pending_prefix")]
    pub backport_pending_prefix: String,
    #[serde(default = "default_release_note_prefix")]
    pub release_note_prefix: String,
}

impl Default for LabelRules {
    fn default() -> Self {
        LabelRules {
            backport: default_backport_label(),
            backport_done_prefix: default_backport_done_prefix(),
            backport_pending_prefix: default_backport_pending_prefix(),
            release_note_prefix: default_release_note_prefix(),
        }
    }
}

fn default_backport_label() -> String {
    "kind/backports".to_string()
}

fn default_backport_done_prefix() -> String {
    "backport-done/".to_string()
}

fn default_backport_pending_prefix() -> String {
    "backport-pending/".to_string()
}

fn default_release_note_prefix() -> String {
    "release-note/".to_string()
}

/// Classifies commits by the labels of the PRs that introduced them
pub struct LabelClassifier<'a, S: PullSource> {
    source: &'a S,
    rules: &'a LabelRules,
    categories: &'a ReleaseCategories,
    /// Count pending backports as if they were done
    force_move_pending: bool,
}

/// Mapping changes for a single commit, applied only once complete
#[derive(Default)]
struct CommitChanges {
    backports: BackportMapping,
    prs: PrMapping,
}

impl<'a, S: PullSource> LabelClassifier<'a, S> {
    pub fn new(
        source: &'a S,
        rules: &'a LabelRules,
        categories: &'a ReleaseCategories,
        force_move_pending: bool,
    ) -> Self {
        LabelClassifier {
            source,
            rules,
            categories,
            force_move_pending,
        }
    }

    fn classify_commit(
        &self,
        sha: &str,
        backports: &BackportMapping,
        prs: &PrMapping,
    ) -> Result<CommitChanges> {
        let mut changes = CommitChanges::default();

        let pulls = self
            .source
            .pulls_for_commit(sha)
            .with_context(|| format!("Failed to fetch PRs for commit {}", sha))?;

        for pull in pulls.into_iter().filter(RestPull::is_merged) {
            let known = backports.contains_key(&pull.number)
                || prs.contains_key(&pull.number)
                || changes.backports.contains_key(&pull.number)
                || changes.prs.contains_key(&pull.number);
            if known {
                continue;
            }

            if pull.has_label(&self.rules.backport) {
                let upstreams = self.fetch_upstreams(&pull)?;
                debug!(
                    "Commit {} belongs to backport PR #{} with {} upstream PRs",
                    sha,
                    pull.number,
                    upstreams.len()
                );
                changes.backports.insert(pull.number, upstreams);
            } else {
                debug!("Commit {} belongs to PR #{}", sha, pull.number);
                changes.prs.insert(pull.number, self.to_pull_request(&pull));
            }
        }

        Ok(changes)
    }

    fn fetch_upstreams(&self, backport: &RestPull) -> Result<PrMapping> {
        let body = backport.body.as_deref().unwrap_or_default();
        let mut upstreams = PrMapping::new();

        let numbers = parse_upstream_prs(body);
        if numbers.is_empty() {
            warn!(
                "Backport PR #{} does not list any upstream PRs, it will not appear in the release notes",
                backport.number
            );
            return Ok(upstreams);
        }

        for number in numbers {
            let pull = self.source.pull(number).with_context(|| {
                format!(
                    "Failed to fetch upstream PR #{} of backport PR #{}",
                    number, backport.number
                )
            })?;
            upstreams.insert(number, self.to_pull_request(&pull));
        }

        Ok(upstreams)
    }

    fn to_pull_request(&self, pull: &RestPull) -> PullRequest {
        let release_label = pull
            .labels
            .iter()
            .find(|l| self.categories.contains(&l.name))
            .or_else(|| {
                pull.labels
                    .iter()
                    .find(|l| l.name.starts_with(&self.rules.release_note_prefix))
            })
            .map(|l| l.name.clone())
            .unwrap_or_default();

        let mut backport_branches: Vec<String> = pull
            .labels
            .iter()
            .filter_map(|l| l.name.strip_prefix(&self.rules.backport_done_prefix))
            .map(str::to_string)
            .collect();

        if self.force_move_pending {
            backport_branches.extend(
                pull.labels
                    .iter()
                    .filter_map(|l| l.name.strip_prefix(&self.rules.backport_pending_prefix))
                    .map(str::to_string),
            );
        }

        PullRequest {
            author_name: pull.user.login.clone(),
            release_note: pull.title.trim().to_string(),
            release_label,
            backport_branches,
        }
    }
}

impl<'a, S: PullSource> PrClassifier for LabelClassifier<'a, S> {
    fn classify(
        &self,
        commits: &[CommitId],
        mut backports: BackportMapping,
        mut prs: PrMapping,
        deadline: &Deadline,
    ) -> Classification {
        for (idx, sha) in commits.iter().enumerate() {
            if deadline.is_expired() {
                return Classification {
                    backports,
                    prs,
                    remaining: commits[idx..].to_vec(),
                    error: Some(anyhow!("deadline expired")),
                };
            }

            match self.classify_commit(sha, &backports, &prs) {
                Ok(changes) => {
                    backports.extend(changes.backports);
                    prs.extend(changes.prs);
                }
                Err(error) => {
                    return Classification {
                        backports,
                        prs,
                        remaining: commits[idx..].to_vec(),
                        error: Some(error),
                    };
                }
            }

            if (idx + 1) % 50 == 0 {
                info!("Classified {}/{} commits", idx + 1, commits.len());
            }
        }

        Classification {
            backports,
            prs,
            remaining: vec![],
            error: None,
        }
    }
}

/// Upstream PR numbers listed in a backport PR body.
///
/// Backport PRs list one upstream PR per line, e.g.
/// ` * #12345 -- Fix the thing (@someone)` or `- #12345`.
pub fn parse_upstream_prs(body: &str) -> Vec<u64> {
    let mut numbers = Vec::new();

    for line in body.lines() {
        let line = line.trim_start();
        let Some(rest) = line
            .strip_prefix('*')
            .or_else(|| line.strip_prefix('-'))
        else {
            continue;
        };
        let Some(rest) = rest.trim_start().strip_prefix('#') else {
            continue;
        };

        let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        if let Ok(number) = digits.parse::<u64>() {
            if !numbers.contains(&number) {
                numbers.push(number);
            }
        }
    }

    numbers
}
