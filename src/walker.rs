//! Enumerates the commits between two references through a paginating
//! comparison API.
//!
//! A comparison of `base...head` answers with the commits closest to `head`
//! when the history is longer than one page. The walker records a page from
//! head towards base, then asks again with the oldest recorded commit as the
//! new head. Consecutive pages overlap on that boundary commit, which is
//! skipped on every page after the first. The oldest commit of a page is
//! held back until two consecutive pages end on the same commit: only then is
//! the page known to reach `base`.
//!
//! Once the walk is continuing, a comparison always spans at least the held
//! back commit and `head`. A single-commit answer at that point is a
//! throttled response and is requested again.

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::github::{CommitComparer, CommitId};
use crate::time::Deadline;

/// Consecutive single-commit answers tolerated before giving up
const MAX_SHORT_PAGES: usize = 5;

/// Progress of a walk, persisted when the walk is interrupted
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct WalkState {
    /// Commits found so far, newest first
    pub commits: Vec<CommitId>,
    /// Head of the next comparison
    pub head: String,
    /// Last commit of the previous page
    pub last_tail: Option<CommitId>,
    /// Set once the first page has been recorded
    pub continuing: bool,
    pub complete: bool,
}

impl WalkState {
    /// Fresh walk starting at `head`
    pub fn new(head: &str) -> Self {
        WalkState {
            head: head.to_string(),
            ..Default::default()
        }
    }
}

/// A walk that stopped before reaching base
#[derive(Debug)]
pub struct WalkInterrupted {
    /// Everything gathered up to the failing comparison
    pub state: WalkState,
    pub source: anyhow::Error,
}

/// Drives repeated comparisons until base is reached
pub struct CommitWalker<'a, C: CommitComparer> {
    comparer: &'a C,
    base: String,
}

impl<'a, C: CommitComparer> CommitWalker<'a, C> {
    pub fn new(comparer: &'a C, base: &str) -> Self {
        CommitWalker {
            comparer,
            base: base.to_string(),
        }
    }

    /// Walk from `head` to base, newest commit first
    pub fn walk(&self, head: &str, deadline: &Deadline) -> Result<Vec<CommitId>, WalkInterrupted> {
        self.resume(WalkState::new(head), deadline)
            .map(|state| state.commits)
    }

    /// Continue a walk from a previously saved state
    pub fn resume(
        &self,
        mut state: WalkState,
        deadline: &Deadline,
    ) -> Result<WalkState, WalkInterrupted> {
        let mut seen: HashSet<CommitId> = state.commits.iter().cloned().collect();
        let mut short_pages = 0;

        while !state.complete {
            if deadline.is_expired() {
                return Err(WalkInterrupted {
                    state,
                    source: anyhow!("deadline expired"),
                });
            }

            info!("Comparing {}...{}", self.base, state.head);
            let page = match self.comparer.compare(&self.base, &state.head) {
                Ok(page) => page,
                Err(source) => return Err(WalkInterrupted { state, source }),
            };
            debug!("Received {} commits", page.len());

            if state.continuing && page.len() == 1 {
                short_pages += 1;
                if short_pages > MAX_SHORT_PAGES {
                    let source = anyhow!(
                        "comparison {}...{} returned a single commit {} times in a row",
                        self.base,
                        state.head,
                        short_pages
                    );
                    return Err(WalkInterrupted { state, source });
                }
                warn!(
                    "Comparison {}...{} returned a single commit, asking again",
                    self.base, state.head
                );
                continue;
            }
            short_pages = 0;

            self.record_page(&mut state, &mut seen, &page);
        }

        Ok(state)
    }

    fn record_page(&self, state: &mut WalkState, seen: &mut HashSet<CommitId>, page: &[CommitId]) {
        let (Some(oldest), Some(tail)) = (page.first(), page.last()) else {
            // Nothing between base and head
            state.complete = true;
            return;
        };

        if state.last_tail.as_ref() == Some(tail) || (!state.continuing && page.len() == 1) {
            push_unseen(state, seen, oldest);
            state.complete = true;
            return;
        }

        // Skip the boundary commit shared with the previous page and hold
        // back the oldest commit of this one.
        let end = if state.continuing {
            page.len() - 1
        } else {
            page.len()
        };
        for sha in page[1..end].iter().rev() {
            push_unseen(state, seen, sha);
        }

        if let Some(next) = state.commits.last() {
            state.head = next.clone();
        }
        state.continuing = true;
        state.last_tail = Some(tail.clone());
    }
}

fn push_unseen(state: &mut WalkState, seen: &mut HashSet<CommitId>, sha: &CommitId) {
    if !sha.is_empty() && seen.insert(sha.clone()) {
        state.commits.push(sha.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::MockGitHub;

    fn walk_all(mock: &MockGitHub, head: &str) -> Vec<CommitId> {
        CommitWalker::new(mock, "c0")
            .walk(head, &Deadline::none())
            .unwrap()
    }

    #[test]
    fn test_walk_single_page() {
        let mock = MockGitHub::linear(5, 250);
        assert_eq!(walk_all(&mock, "c5"), mock.expected_walk("c0", "c5"));
    }

    #[test]
    fn test_walk_paginated_histories() {
        for len in 1..40 {
            for page_size in 3..12 {
                let mock = MockGitHub::linear(len, page_size);
                let head = format!("c{}", len);
                let walked = walk_all(&mock, &head);

                assert_eq!(
                    walked,
                    mock.expected_walk("c0", &head),
                    "len={} page_size={}",
                    len,
                    page_size
                );
            }
        }
    }

    #[test]
    fn test_walk_no_duplicates() {
        let mock = MockGitHub::linear(100, 7);
        let walked = walk_all(&mock, "c100");
        let unique: HashSet<_> = walked.iter().collect();
        assert_eq!(unique.len(), walked.len());
        assert_eq!(walked.first().map(String::as_str), Some("c100"));
        assert_eq!(walked.last().map(String::as_str), Some("c1"));
    }

    #[test]
    fn test_walk_pages_request_boundary_commit() {
        let mock = MockGitHub::linear(10, 5);
        walk_all(&mock, "c10");

        let heads: Vec<String> = mock
            .compare_calls
            .borrow()
            .iter()
            .map(|(_, head)| head.clone())
            .collect();
        assert_eq!(heads, vec!["c10", "c7", "c4", "c2", "c2"]);
    }

    #[test]
    fn test_walk_retries_throttled_page() {
        let mut mock = MockGitHub::linear(10, 4);
        mock.throttled_calls.insert(1);

        assert_eq!(walk_all(&mock, "c10"), mock.expected_walk("c0", "c10"));

        let calls = mock.compare_calls.borrow();
        assert_eq!(calls[1], calls[2]);
    }

    #[test]
    fn test_walk_throttled_at_the_boundary() {
        // The page that ends on the same commit twice comes back throttled
        let mut mock = MockGitHub::linear(6, 4);
        mock.throttled_calls.extend([2, 3]);

        assert_eq!(walk_all(&mock, "c6"), mock.expected_walk("c0", "c6"));
    }

    #[test]
    fn test_walk_gives_up_when_always_throttled() {
        let mut mock = MockGitHub::linear(10, 4);
        mock.throttled_calls.extend(1..20);

        let err = CommitWalker::new(&mock, "c0")
            .walk("c10", &Deadline::none())
            .unwrap_err();

        assert!(err.source.to_string().contains("single commit"));
        assert_eq!(err.state.commits, vec!["c10", "c9", "c8"]);
        assert_eq!(err.state.head, "c8");
        assert!(!err.state.complete);
        assert_eq!(mock.compare_calls.borrow().len(), 2 + MAX_SHORT_PAGES);
    }

    #[test]
    fn test_walk_head_equals_base() {
        let mock = MockGitHub::linear(3, 10);
        assert!(walk_all(&mock, "c0").is_empty());
    }

    #[test]
    fn test_walk_error_keeps_partial_state() {
        let mut mock = MockGitHub::linear(20, 5);
        mock.fail_after = Some(2);

        let err = CommitWalker::new(&mock, "c0")
            .walk("c20", &Deadline::none())
            .unwrap_err();

        assert_eq!(err.state.commits, vec!["c20", "c19", "c18", "c17", "c16", "c15", "c14"]);
        assert_eq!(err.state.head, "c14");
        assert!(!err.state.complete);
        assert!(err.source.to_string().contains("rate limit"));
    }

    #[test]
    fn test_walk_resumes_after_error() {
        let mut mock = MockGitHub::linear(20, 5);
        mock.fail_after = Some(2);
        let interrupted = CommitWalker::new(&mock, "c0")
            .walk("c20", &Deadline::none())
            .unwrap_err();

        let healthy = MockGitHub::linear(20, 5);
        let state = CommitWalker::new(&healthy, "c0")
            .resume(interrupted.state, &Deadline::none())
            .unwrap();

        assert!(state.complete);
        assert_eq!(state.commits, healthy.expected_walk("c0", "c20"));
    }

    #[test]
    fn test_walk_expired_deadline() {
        let mock = MockGitHub::linear(5, 3);
        let deadline = Deadline::at(jiff::Timestamp::UNIX_EPOCH);

        let err = CommitWalker::new(&mock, "c0")
            .walk("c5", &deadline)
            .unwrap_err();

        assert!(err.state.commits.is_empty());
        assert_eq!(err.state.head, "c5");
        assert!(mock.compare_calls.borrow().is_empty());
    }
}
