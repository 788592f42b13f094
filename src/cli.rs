use clap::Parser;
use std::path::PathBuf;

use crate::config::Config;
use crate::time::Timeout;

#[derive(Parser, Debug)]
#[command(
    name = "gh-changelog",
    about = "Generate categorized release notes between two GitHub references",
    version,
    author
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "GH_CHANGELOG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Base reference (tag, branch or commit) of the comparison
    #[arg(long)]
    pub base: Option<String>,

    /// Head reference of the comparison
    #[arg(long)]
    pub head: Option<String>,

    /// Last stable version, e.g. 1.0; PRs backported to it are left out
    #[arg(long)]
    pub last_stable: Option<String>,

    /// File used to save progress and resume interrupted runs
    #[arg(long)]
    pub state_file: Option<PathBuf>,

    /// Repository as owner/name
    #[arg(long)]
    pub repo: Option<String>,

    /// Count pending backports as backported to their branch
    #[arg(long)]
    pub force_move_pending: bool,

    /// Stop and save state after this long (e.g. 90s, 10m, 1h)
    #[arg(long)]
    pub timeout: Option<Timeout>,

    /// Verbosity level (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Override configuration values with the flags that were given
    pub fn apply(&self, config: &mut Config) {
        let run = &mut config.run;

        if let Some(base) = &self.base {
            run.base = base.clone();
        }
        if let Some(head) = &self.head {
            run.head = head.clone();
        }
        if let Some(last_stable) = &self.last_stable {
            run.last_stable = last_stable.clone();
        }
        if let Some(state_file) = &self.state_file {
            run.state_file = state_file.clone();
        }
        if let Some(repo) = &self.repo {
            run.repo = repo.clone();
        }
        if self.force_move_pending {
            run.force_move_pending = true;
        }
    }
}
