use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};
use tracing::warn;

use crate::github::{BackportMapping, PrMapping, PullRequest};

mod categories;

pub use categories::{default_categories, Category, ReleaseCategories, DEFAULT_CATCH_ALL};

/// Items listed under one category header
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub header: String,
    pub items: Vec<String>,
}

/// Sections in display order, only non-empty ones
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sections(pub Vec<Section>);

impl Sections {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of items across all sections
    pub fn item_count(&self) -> usize {
        self.0.iter().map(|s| s.items.len()).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Section> {
        self.0.iter()
    }
}

impl fmt::Display for Sections {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, section) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{}", section.header)?;
            for item in &section.items {
                writeln!(f, "{}", item)?;
            }
        }
        Ok(())
    }
}

/// Rendered release notes
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseNotes {
    pub sections: Sections,
    /// PRs left out because they already shipped on the last stable branch
    pub already_released: Sections,
    pub last_stable: String,
}

impl ReleaseNotes {
    /// Write the summary to `out` and the already-released notice to `err`
    pub fn write_to(&self, out: &mut impl Write, err: &mut impl Write) -> io::Result<()> {
        writeln!(out, "Summary of Changes")?;
        writeln!(out, "------------------")?;
        writeln!(out)?;
        write!(out, "{}", self.sections)?;

        if let Some(body) = self.notice_body() {
            writeln!(err)?;
            // ANSI bold
            write!(err, "\x1b[1mNOTICE\x1b[0m: {}", body)?;
        }
        Ok(())
    }

    /// Diagnostic block listing PRs assumed to be already released
    pub fn notice(&self) -> Option<String> {
        self.notice_body().map(|body| format!("NOTICE: {}", body))
    }

    fn notice_body(&self) -> Option<String> {
        if self.already_released.is_empty() {
            return None;
        }

        Some(format!(
            "The following PRs were not included in the changelog as they were \
             backported to branch {} and assumed to be already released.\n\n{}",
            self.last_stable, self.already_released
        ))
    }
}

/// Groups PR metadata into release-note sections
pub struct NoteAggregator<'a> {
    categories: &'a ReleaseCategories,
}

impl<'a> NoteAggregator<'a> {
    pub fn new(categories: &'a ReleaseCategories) -> Self {
        NoteAggregator { categories }
    }

    /// Render backport and regular PRs into sections.
    ///
    /// Upstream PRs are listed once per backport PR that carries them. A
    /// regular PR backported to a branch whose name contains `last_stable`
    /// goes to `already_released` instead of the main sections.
    pub fn render(
        &self,
        backports: &BackportMapping,
        prs: &PrMapping,
        last_stable: &str,
    ) -> ReleaseNotes {
        let mut buckets: HashMap<&str, Vec<String>> = HashMap::new();
        let mut released = PrMapping::new();

        for (backport, upstreams) in backports {
            for (upstream, pr) in upstreams {
                buckets
                    .entry(self.category_of(*upstream, pr))
                    .or_default()
                    .push(format!(
                        "* {} (Backport PR #{}, Upstream PR #{}, @{})",
                        pr.release_note, backport, upstream, pr.author_name
                    ));
            }
        }

        for (number, pr) in prs {
            if released_on(pr, last_stable) {
                released.insert(*number, pr.clone());
                continue;
            }
            buckets
                .entry(self.category_of(*number, pr))
                .or_default()
                .push(format_pr(*number, pr));
        }

        let sections = self.sections(buckets);
        let already_released = self.sections(self.group(&released));

        ReleaseNotes {
            sections,
            already_released,
            last_stable: last_stable.to_string(),
        }
    }

    fn group<'m>(&'m self, prs: &'m PrMapping) -> HashMap<&'m str, Vec<String>> {
        let mut buckets: HashMap<&str, Vec<String>> = HashMap::new();
        for (number, pr) in prs {
            buckets
                .entry(self.category_of(*number, pr))
                .or_default()
                .push(format_pr(*number, pr));
        }
        buckets
    }

    fn sections(&self, mut buckets: HashMap<&str, Vec<String>>) -> Sections {
        let mut sections = Vec::new();

        for category in self.categories.iter() {
            let Some(mut items) = buckets.remove(category.label.as_str()) else {
                continue;
            };
            sort_case_insensitive(&mut items);
            sections.push(Section {
                header: category.header.clone(),
                items,
            });
        }

        Sections(sections)
    }

    fn category_of<'p>(&'p self, number: u64, pr: &'p PullRequest) -> &'p str {
        if !self.categories.contains(&pr.release_label) {
            warn!(
                "PR #{} has unrecognised release label {:?}, listing it under {}",
                number,
                pr.release_label,
                self.categories.catch_all()
            );
        }
        self.categories.resolve(&pr.release_label)
    }
}

fn format_pr(number: u64, pr: &PullRequest) -> String {
    format!("* {} (#{}, @{})", pr.release_note, number, pr.author_name)
}

fn released_on(pr: &PullRequest, last_stable: &str) -> bool {
    !last_stable.is_empty()
        && pr
            .backport_branches
            .iter()
            .any(|branch| branch.contains(last_stable))
}

/// Sort by lowercased text
pub fn sort_case_insensitive(items: &mut [String]) {
    items.sort_by_cached_key(|item| item.to_lowercase());
}
