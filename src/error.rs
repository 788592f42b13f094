use std::fmt;
use thiserror::Error;

/// Failures of a changelog run
#[derive(Debug, Error)]
pub enum ChangelogError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("unable to read state file {path}: {source:#}")]
    StateRead {
        path: String,
        source: anyhow::Error,
    },

    #[error("unable to compare commits {base}...{head}: {source:#}")]
    Walk {
        base: String,
        head: String,
        source: anyhow::Error,
    },

    #[error("unable to retrieve PRs for commits: {source:#}")]
    Classification {
        /// Commits that are still unclassified
        remaining: usize,
        source: anyhow::Error,
    },

    #[error("unable to store state in {path}: {source:#}")]
    StateWrite {
        path: String,
        source: anyhow::Error,
    },
}

impl ChangelogError {
    /// Whether the run left a state file to resume from
    pub fn is_resumable(&self) -> bool {
        matches!(
            self,
            ChangelogError::Walk { .. } | ChangelogError::Classification { .. }
        )
    }
}

/// User-friendly error wrapper
#[derive(Debug)]
pub struct UserError {
    message: String,
    details: Option<String>,
    suggestion: Option<String>,
}

impl UserError {
    pub fn new(message: impl Into<String>) -> Self {
        UserError {
            message: message.into(),
            details: None,
            suggestion: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn suggestion(&self) -> Option<&str> {
        self.suggestion.as_deref()
    }

    /// Print the error to stderr
    pub fn display(&self) {
        eprintln!("\nError: {}", self.message);

        if let Some(ref details) = self.details {
            eprintln!("\n   {}", details);
        }

        if let Some(ref suggestion) = self.suggestion {
            eprintln!("\n{}", suggestion);
        }
    }
}

impl fmt::Display for UserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref details) = self.details {
            write!(f, ": {}", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for UserError {}

/// Translate a run failure into something actionable
pub fn user_friendly_error(error: &ChangelogError, state_file: &str) -> UserError {
    let cause = error.to_string();
    let resume = format!(
        "State was saved; run again with --state-file={} to continue",
        state_file
    );

    // Causes coming back from the gh CLI
    if cause.contains("Failed to execute gh command") {
        return UserError::new("GitHub CLI is not installed")
            .with_details("The 'gh' command is required to query GitHub")
            .with_suggestion("Install GitHub CLI from https://cli.github.com/");
    }

    if cause.contains("gh auth login") {
        let suggestion = if error.is_resumable() {
            format!(
                "Run 'gh auth login', then run again with --state-file={} to continue",
                state_file
            )
        } else {
            "Run 'gh auth login' to authenticate".to_string()
        };
        return UserError::new("GitHub rejected the request")
            .with_details(cause)
            .with_suggestion(suggestion);
    }

    match error {
        ChangelogError::Config(_) => UserError::new("Invalid configuration")
            .with_details(cause)
            .with_suggestion("Check the flags or the [run] section of the configuration file"),
        ChangelogError::StateRead { path, .. } => UserError::new("State file is unreadable")
            .with_details(cause)
            .with_suggestion(format!(
                "Remove {} to start over from the commit comparison",
                path
            )),
        ChangelogError::Walk { .. } => UserError::new("Comparing commits failed")
            .with_details(cause)
            .with_suggestion(resume),
        ChangelogError::Classification { remaining, .. } => UserError::new(format!(
            "Classifying commits failed with {} commits left",
            remaining
        ))
        .with_details(cause)
        .with_suggestion(resume),
        ChangelogError::StateWrite { .. } => UserError::new("Saving state failed")
            .with_details(cause)
            .with_suggestion("Check that you have write permissions to the state file location"),
    }
}
