use anyhow::{anyhow, Result};
use gh_changelog::github::{
    BackportMapping, Classification, CommitComparer, CommitId, PrClassifier, PrMapping,
    PullRequest,
};
use gh_changelog::notes::ReleaseCategories;
use gh_changelog::time::Deadline;
use gh_changelog::{ChangelogError, ChangelogGenerator, Config, FileStateStore, StateStore};
use std::cell::Cell;
use tempfile::TempDir;

// MockGitHub is only available in library tests, so the fakes below
// implement the public traits directly.

/// History `h0..=h{len}` served in pages of `page_size`, newest commits first
struct PagedHistory {
    history: Vec<String>,
    page_size: usize,
    calls: Cell<usize>,
    fail_from: Option<usize>,
}

impl PagedHistory {
    fn new(len: usize, page_size: usize) -> Self {
        PagedHistory {
            history: (0..=len).map(|i| format!("h{}", i)).collect(),
            page_size,
            calls: Cell::new(0),
            fail_from: None,
        }
    }
}

impl CommitComparer for PagedHistory {
    fn compare(&self, base: &str, head: &str) -> Result<Vec<CommitId>> {
        let call = self.calls.get();
        self.calls.set(call + 1);
        if self.fail_from.is_some_and(|from| call >= from) {
            return Err(anyhow!("HTTP 502 from compare"));
        }

        let b = self.history.iter().position(|c| c == base).unwrap();
        let h = self.history.iter().position(|c| c == head).unwrap();
        let start = (b + 1).max((h + 1).saturating_sub(self.page_size));
        Ok(self.history[start..=h].to_vec())
    }
}

/// Treats every commit `hN` as the merge of PR #N
struct OnePrPerCommit;

impl PrClassifier for OnePrPerCommit {
    fn classify(
        &self,
        commits: &[CommitId],
        backports: BackportMapping,
        mut prs: PrMapping,
        _deadline: &Deadline,
    ) -> Classification {
        for sha in commits {
            let number: u64 = sha.trim_start_matches('h').parse().unwrap();
            prs.insert(
                number,
                PullRequest {
                    author_name: "dev".to_string(),
                    release_note: format!("Change {}", number),
                    release_label: "release-note/misc".to_string(),
                    backport_branches: vec![],
                },
            );
        }
        Classification {
            backports,
            prs,
            remaining: vec![],
            error: None,
        }
    }
}

/// Test a full run against a state file on disk
#[test]
fn test_run_with_file_state() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = FileStateStore::new(temp_dir.path().join("state.json"));
    let history = PagedHistory::new(30, 8);

    let changelog = ChangelogGenerator::new(&history, &OnePrPerCommit, &store)
        .generate("h0", "h30")?;

    assert_eq!(changelog.prs.len(), 30);
    assert!(changelog.prs.keys().copied().eq(1..=30));

    let saved = store.load()?.expect("state file written");
    assert!(saved.commits.is_empty());
    assert_eq!(saved.prs.len(), 30);

    // A second run renders from the saved state without comparing again
    let calls = history.calls.get();
    let again = ChangelogGenerator::new(&history, &OnePrPerCommit, &store)
        .generate("h0", "h30")?;
    assert_eq!(history.calls.get(), calls);
    assert_eq!(again.prs.len(), 30);

    Ok(())
}

/// Test that an interrupted walk resumes from its checkpoint
#[test]
fn test_interrupted_walk_resumes() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = FileStateStore::new(temp_dir.path().join("state.json"));

    let mut flaky = PagedHistory::new(30, 8);
    flaky.fail_from = Some(2);
    let err = ChangelogGenerator::new(&flaky, &OnePrPerCommit, &store)
        .generate("h0", "h30")
        .unwrap_err();
    assert!(matches!(err, ChangelogError::Walk { .. }));
    assert!(store.load()?.expect("state file written").walk_pending());

    let healthy = PagedHistory::new(30, 8);
    let changelog = ChangelogGenerator::new(&healthy, &OnePrPerCommit, &store)
        .generate("h0", "h30")?;
    assert!(changelog.prs.keys().copied().eq(1..=30));

    Ok(())
}

/// Test that a corrupt state file is reported, not overwritten
#[test]
fn test_corrupt_state_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("state.json");
    std::fs::write(&path, "not json")?;
    let store = FileStateStore::new(&path);

    let err = ChangelogGenerator::new(&PagedHistory::new(3, 8), &OnePrPerCommit, &store)
        .generate("h0", "h3")
        .unwrap_err();

    assert!(matches!(err, ChangelogError::StateRead { .. }));
    assert_eq!(std::fs::read_to_string(&path)?, "not json");

    Ok(())
}

/// Test the release notes of a run
#[test]
fn test_rendered_notes() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = FileStateStore::new(temp_dir.path().join("state.json"));
    let history = PagedHistory::new(3, 8);

    let changelog = ChangelogGenerator::new(&history, &OnePrPerCommit, &store)
        .generate("h0", "h3")?;
    let notes = changelog.render(&ReleaseCategories::default(), "");

    assert_eq!(
        notes.sections.to_string(),
        "**Misc Changes:**\n* Change 1 (#1, @dev)\n* Change 2 (#2, @dev)\n* Change 3 (#3, @dev)\n"
    );
    assert!(notes.notice().is_none());

    Ok(())
}

/// Test configuration validation through the public API
#[test]
fn test_config_validation() -> Result<()> {
    let mut config = Config::default();
    config.run.base = "v1".to_string();
    config.run.head = "v2".to_string();
    config.run.state_file = "state.json".into();
    config.run.repo = "onlyname".to_string();
    assert!(matches!(config.validate(), Err(ChangelogError::Config(_))));

    config.run.repo = "cilium/cilium".to_string();
    config.run.last_stable = "0.9v".to_string();
    assert!(matches!(config.validate(), Err(ChangelogError::Config(_))));

    config.run.last_stable = "1.0".to_string();
    let validated = config.validate()?;
    assert_eq!(validated.owner, "cilium");

    Ok(())
}

/// Test that PRs backported to the last stable branch are reported separately
#[test]
fn test_last_stable_notice() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = FileStateStore::new(temp_dir.path().join("state.json"));

    let mut changelog = ChangelogGenerator::new(&PagedHistory::new(2, 8), &OnePrPerCommit, &store)
        .generate("h0", "h2")?;
    if let Some(pr) = changelog.prs.get_mut(&2) {
        pr.backport_branches = vec!["backport-done/1.9".to_string()];
    }

    let notes = changelog.render(&ReleaseCategories::default(), "1.9");
    assert_eq!(notes.sections.to_string(), "**Misc Changes:**\n* Change 1 (#1, @dev)\n");

    let mut out = Vec::new();
    let mut err = Vec::new();
    notes.write_to(&mut out, &mut err)?;
    let out = String::from_utf8(out)?;
    let err = String::from_utf8(err)?;

    assert!(out.starts_with("Summary of Changes\n------------------\n\n"));
    assert!(!out.contains("Change 2"));
    assert!(err.contains("backported to branch 1.9"));
    assert!(err.contains("* Change 2 (#2, @dev)"));

    Ok(())
}
