pub mod changelog;
pub mod cli;
pub mod config;
pub mod error;
pub mod github;
pub mod notes;
pub mod state;
pub mod time;
pub mod walker;

#[cfg(test)]
mod test_utils;

pub use changelog::{ChangeLog, ChangelogGenerator};
pub use config::Config;
pub use error::ChangelogError;
pub use state::{FileStateStore, PersistedState, StateStore};
