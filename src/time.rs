use anyhow::{anyhow, Result};
use jiff::{SignedDuration, Timestamp};
use std::str::FromStr;

/// Upper bound on how long a run may take
///
/// Examples:
/// - "90" or "90s" → 90 seconds (default unit)
/// - "5m" or "5M" → 5 minutes
/// - "1h" → 1 hour
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timeout {
    pub seconds: u64,
}

impl Timeout {
    pub fn as_duration(&self) -> SignedDuration {
        SignedDuration::from_secs(self.seconds as i64)
    }
}

impl FromStr for Timeout {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();

        if s.is_empty() {
            return Err(anyhow!("Timeout cannot be empty"));
        }

        let (number_part, unit) = match s.char_indices().last() {
            Some((idx, c)) if c.is_ascii_alphabetic() => {
                (&s[..idx], Some(c.to_ascii_lowercase()))
            }
            _ => (s, None),
        };

        let number: u64 = number_part
            .parse()
            .map_err(|_| anyhow!("Invalid number in timeout: '{}'", number_part))?;

        if number == 0 {
            return Err(anyhow!("Timeout must be greater than 0"));
        }

        let seconds = match unit {
            Some('s') | None => number,
            Some('m') => number * 60,
            Some('h') => number * 3600,
            Some(other) => {
                return Err(anyhow!(
                    "Invalid timeout unit '{}'. Use 's' for seconds, 'm' for minutes, or 'h' for hours",
                    other
                ))
            }
        };

        Ok(Timeout { seconds })
    }
}

impl std::fmt::Display for Timeout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}s", self.seconds)
    }
}

/// Point in time after which walking and classification stop early
#[derive(Debug, Clone, Default)]
pub struct Deadline {
    at: Option<Timestamp>,
}

impl Deadline {
    /// A deadline that never expires
    pub fn none() -> Self {
        Deadline { at: None }
    }

    pub fn at(at: Timestamp) -> Self {
        Deadline { at: Some(at) }
    }

    /// Deadline `timeout` from now
    pub fn after(timeout: Timeout) -> Self {
        Deadline::at(Timestamp::now() + timeout.as_duration())
    }

    pub fn is_expired(&self) -> bool {
        match self.at {
            Some(at) => Timestamp::now() >= at,
            None => false,
        }
    }
}
