//! Calendar month normalized to its first day.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Month input that is not `YYYY-MM`, `YYYY-MM-DD` or RFC 3339.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid month '{0}', expected YYYY-MM or YYYY-MM-DD")]
pub struct InvalidMonth(pub String);

/// A calendar month, stored as its first day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Month(NaiveDate);

impl Month {
    /// The month containing `date`.
    #[must_use]
    pub fn containing(date: NaiveDate) -> Self {
        Self(
            date.checked_sub_days(Days::new(u64::from(date.day0())))
                .unwrap_or(date),
        )
    }

    /// The UTC month containing `now`.
    #[must_use]
    pub fn current(now: DateTime<Utc>) -> Self {
        Self::containing(now.date_naive())
    }

    /// Builds a month from a year and a 1-based month number.
    #[must_use]
    pub fn from_ym(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(Self)
    }

    /// First day of the month.
    #[must_use]
    pub const fn first_day(self) -> NaiveDate {
        self.0
    }

    /// Parses `YYYY-MM`, `YYYY-MM-DD` or an RFC 3339 timestamp (UTC).
    ///
    /// # Errors
    ///
    /// Returns `InvalidMonth` for anything else.
    pub fn parse(input: &str) -> Result<Self, InvalidMonth> {
        let trimmed = input.trim();
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            return Ok(Self::containing(date));
        }
        if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(Self::current(ts.with_timezone(&Utc)));
        }
        NaiveDate::parse_from_str(&format!("{trimmed}-01"), "%Y-%m-%d")
            .map(Self)
            .map_err(|_| InvalidMonth(input.to_string()))
    }
}

impl From<NaiveDate> for Month {
    fn from(date: NaiveDate) -> Self {
        Self::containing(date)
    }
}

impl FromStr for Month {
    type Err = InvalidMonth;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m"))
    }
}

impl Serialize for Month {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Month {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
