//! Serde helpers for calendar dates.
//!
//! The rental service may report dates as full timestamps
//! (`2021-10-08T00:00:00Z`); only the `YYYY-MM-DD` prefix is meaningful.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serializer};

const FORMAT: &str = "%Y-%m-%d";

/// Parses a calendar date, ignoring any time-of-day suffix.
pub fn parse(raw: &str) -> Result<NaiveDate, chrono::ParseError> {
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, FORMAT)
}

pub fn serialize<S>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(&date.format(FORMAT))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse(&raw).map_err(serde::de::Error::custom)
}
