//! Test utilities for gh-changelog
#![cfg(test)]

use crate::github::{Author, Label, PullRequest, RestPull};

/// Create a pull request entry with no backport branches
pub fn pull_request(note: &str, author: &str, label: &str) -> PullRequest {
    PullRequest {
        author_name: author.to_string(),
        release_note: note.to_string(),
        release_label: label.to_string(),
        backport_branches: vec![],
    }
}

/// Create a merged pull request as the REST API returns it
pub fn rest_pull(number: u64, title: &str, author: &str, labels: &[&str]) -> RestPull {
    RestPull {
        number,
        title: title.to_string(),
        body: None,
        user: Author {
            login: author.to_string(),
        },
        labels: labels
            .iter()
            .map(|name| Label {
                name: name.to_string(),
            })
            .collect(),
        merged_at: Some("2024-01-11T10:00:00Z".to_string()),
    }
}
