//! Month-close status and its transitions.

use std::fmt;
use std::str::FromStr;

use coreops_shared::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::month::Month;

/// State of one month for one scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MonthCloseStatus {
    /// Writes allowed. Also the state of a month without any record.
    #[default]
    Open,
    /// Writes frozen.
    Closed,
}

impl MonthCloseStatus {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Closed => "CLOSED",
        }
    }

    /// Audit action recorded when a month moves into this status.
    #[must_use]
    pub const fn audit_action(self) -> &'static str {
        match self {
            Self::Open => "REOPEN",
            Self::Closed => "CLOSE",
        }
    }
}

impl fmt::Display for MonthCloseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown status string.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown month-close status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for MonthCloseStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OPEN" => Ok(Self::Open),
            "CLOSED" => Ok(Self::Closed),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

/// Checks that moving from `current` to `target` changes something.
///
/// # Errors
///
/// Returns `AppError::Conflict` when the month already has `target`.
pub fn check_transition(current: MonthCloseStatus, target: MonthCloseStatus) -> AppResult<()> {
    if current == target {
        return Err(AppError::Conflict(format!("Month is already {target}")));
    }
    Ok(())
}

/// Rejects writes into a closed month.
///
/// # Errors
///
/// Returns `AppError::MonthClosed` when `status` is `Closed`.
pub fn ensure_open(month: Month, status: MonthCloseStatus) -> AppResult<()> {
    match status {
        MonthCloseStatus::Open => Ok(()),
        MonthCloseStatus::Closed => Err(AppError::MonthClosed(format!("Month {month} is closed"))),
    }
}
