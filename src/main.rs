use anyhow::{Context, Result};
use clap::Parser;
use gh_changelog::cli::Cli;
use gh_changelog::config::ValidatedConfig;
use gh_changelog::error::{user_friendly_error, UserError};
use gh_changelog::github::{LabelClassifier, RealGitHub};
use gh_changelog::notes::ReleaseNotes;
use gh_changelog::time::Deadline;
use gh_changelog::{ChangelogError, ChangelogGenerator, Config, FileStateStore};
use std::io::{self, Write};
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    setup_logging(cli.verbose)?;

    info!("Loading configuration");
    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    cli.apply(&mut config);

    let config = match config.validate() {
        Ok(config) => config,
        Err(e) => {
            user_friendly_error(&e, "").display();
            return Ok(ExitCode::FAILURE);
        }
    };

    let deadline = match cli.timeout {
        Some(timeout) => {
            info!("Run will stop after {}", timeout);
            Deadline::after(timeout)
        }
        None => Deadline::none(),
    };

    let github = match RealGitHub::new(&config.owner, &config.repo) {
        Ok(github) => github,
        Err(e) => {
            error!("GitHub CLI check failed: {:#}", e);
            UserError::new("GitHub CLI is not available")
                .with_details(e.to_string())
                .with_suggestion("Install GitHub CLI from https://cli.github.com/")
                .display();
            return Ok(ExitCode::FAILURE);
        }
    };

    match generate(&config, &github, deadline) {
        Ok(code) => Ok(code),
        Err(e) => {
            error!("{}", e);
            user_friendly_error(&e, &config.state_file.display().to_string()).display();
            Ok(ExitCode::FAILURE)
        }
    }
}

fn setup_logging(verbosity: u8) -> Result<()> {
    let filter = match verbosity {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    // stdout carries the release notes only
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn generate(
    config: &ValidatedConfig,
    github: &RealGitHub,
    deadline: Deadline,
) -> Result<ExitCode, ChangelogError> {
    info!(
        "Generating release notes for {} between {} and {}",
        config.repo_name(),
        config.base,
        config.head
    );

    let classifier = LabelClassifier::new(
        github,
        &config.rules,
        &config.categories,
        config.force_move_pending,
    );
    let store = FileStateStore::new(&config.state_file);

    let changelog = ChangelogGenerator::new(github, &classifier, &store)
        .with_deadline(deadline)
        .generate(&config.base, &config.head)?;

    if let Some(warning) = &changelog.state_warning {
        warn!("{}", warning);
        user_friendly_error(warning, &config.state_file.display().to_string()).display();
    }

    let notes = changelog.render(&config.categories, &config.last_stable);
    let stdout = std::io::stdout();
    let stderr = std::io::stderr();
    if let Err(e) = print_notes(&notes, &mut stdout.lock(), &mut stderr.lock()) {
        error!("Failed to write release notes: {}", e);
        return Ok(ExitCode::FAILURE);
    }

    Ok(ExitCode::SUCCESS)
}

fn print_notes(notes: &ReleaseNotes, out: &mut impl Write, err: &mut impl Write) -> io::Result<()> {
    notes.write_to(out, err)?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gh_changelog::notes::Sections;

    /// Writer that fails like a closed pipe
    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn empty_notes() -> ReleaseNotes {
        ReleaseNotes {
            sections: Sections::default(),
            already_released: Sections::default(),
            last_stable: String::new(),
        }
    }

    #[test]
    fn test_print_notes_success() {
        let mut out = Vec::new();
        let mut err = Vec::new();

        print_notes(&empty_notes(), &mut out, &mut err).unwrap();

        assert!(String::from_utf8(out).unwrap().starts_with("Summary of Changes"));
    }

    #[test]
    fn test_print_notes_write_failure() {
        let mut err = Vec::new();

        let result = print_notes(&empty_notes(), &mut BrokenPipe, &mut err);

        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::BrokenPipe);
    }
}
