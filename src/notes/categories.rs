use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A release-note label and the header it is listed under
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Category {
    pub label: String,
    pub header: String,
}

impl Category {
    pub fn new(label: &str, header: &str) -> Self {
        Category {
            label: label.to_string(),
            header: header.to_string(),
        }
    }
}

/// Ordered set of release categories
///
/// PRs whose label is not part of the set are listed under `catch_all`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseCategories {
    categories: Vec<Category>,
    catch_all: String,
}

impl ReleaseCategories {
    pub fn new(categories: Vec<Category>, catch_all: &str) -> Result<Self> {
        if categories.is_empty() {
            return Err(anyhow!("at least one release category is required"));
        }

        let mut labels = HashSet::new();
        for category in &categories {
            if category.label.is_empty() {
                return Err(anyhow!("release category labels can't be empty"));
            }
            if !labels.insert(category.label.as_str()) {
                return Err(anyhow!("duplicate release category {}", category.label));
            }
        }

        if !labels.contains(catch_all) {
            return Err(anyhow!(
                "catch-all label {} is not one of the release categories",
                catch_all
            ));
        }

        Ok(ReleaseCategories {
            categories,
            catch_all: catch_all.to_string(),
        })
    }

    /// Categories in display order
    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.categories.iter().any(|c| c.label == label)
    }

    pub fn catch_all(&self) -> &str {
        &self.catch_all
    }

    /// Label a PR is listed under
    pub fn resolve<'a>(&'a self, label: &'a str) -> &'a str {
        if self.contains(label) {
            label
        } else {
            &self.catch_all
        }
    }
}

impl Default for ReleaseCategories {
    fn default() -> Self {
        ReleaseCategories {
            categories: default_categories(),
            catch_all: DEFAULT_CATCH_ALL.to_string(),
        }
    }
}

pub const DEFAULT_CATCH_ALL: &str = "release-note/none";

pub fn default_categories() -> Vec<Category> {
    vec![
        Category::new("release-note/major", "**Major Changes:**"),
        Category::new("release-note/minor", "**Minor Changes:**"),
        Category::new("release-note/bug", "**Bugfixes:**"),
        Category::new("release-note/ci", "**CI Changes:**"),
        Category::new("release-note/misc", "**Misc Changes:**"),
        Category::new(DEFAULT_CATCH_ALL, "**Other Changes:**"),
    ]
}
