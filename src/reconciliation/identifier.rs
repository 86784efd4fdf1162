//! Identifier parsing: date tokens and recency cutoffs.
//!
//! Object names look like `<prefix>/<YYYY-MM>...`, for example
//! `activity/2023-01-05_activity.csv`. The `YYYY-MM` token directly after the
//! first `/` is the only part of the name the reconciler interprets, and it is
//! compared as a plain string.

use super::ReconcileError;
use crate::utils::ID_SEPARATOR;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Length of a `YYYY-MM` token
pub const DATE_TOKEN_LEN: usize = 7;

static DATE_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-(0[1-9]|1[0-2])$").expect("date token pattern is valid"));

/// Check whether a string is a `YYYY-MM` token
pub fn is_date_token(s: &str) -> bool {
    DATE_TOKEN_RE.is_match(s)
}

/// Extract the `YYYY-MM` token that follows the first `/` of an identifier.
pub fn date_token(id: &str) -> Result<&str, ReconcileError> {
    let (_, rest) = id
        .split_once(ID_SEPARATOR)
        .ok_or_else(|| ReconcileError::malformed(id, "no '/' separator"))?;

    leading_date_token(id, rest)
}

/// Extract the `YYYY-MM` token at the start of `tail`, the part of `id` that
/// follows its category prefix. `id` must still contain a `/`.
pub fn tail_date_token<'a>(id: &str, tail: &'a str) -> Result<&'a str, ReconcileError> {
    if !id.contains(ID_SEPARATOR) {
        return Err(ReconcileError::malformed(id, "no '/' separator"));
    }

    leading_date_token(id, tail)
}

fn leading_date_token<'a>(id: &str, rest: &'a str) -> Result<&'a str, ReconcileError> {
    let token = rest
        .get(..DATE_TOKEN_LEN)
        .ok_or_else(|| ReconcileError::malformed(id, "too short to hold a YYYY-MM date"))?;

    if !is_date_token(token) {
        return Err(ReconcileError::malformed(
            id,
            format!("'{}' after the category prefix is not a YYYY-MM date", token),
        ));
    }

    Ok(token)
}

/// Exclusive lower bound on date tokens.
///
/// Ordering is lexical, which matches calendar order for zero-padded
/// `YYYY-MM` strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CutoffDate(String);

impl CutoffDate {
    pub fn parse(s: &str) -> Result<Self, ReconcileError> {
        let trimmed = s.trim();
        if !is_date_token(trimmed) {
            return Err(ReconcileError::InvalidCutoff(s.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when `token` is strictly later than the cutoff.
    pub fn admits(&self, token: &str) -> bool {
        token > self.0.as_str()
    }
}

impl FromStr for CutoffDate {
    type Err = ReconcileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CutoffDate {
    type Error = ReconcileError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CutoffDate> for String {
    fn from(value: CutoffDate) -> Self {
        value.0
    }
}

impl fmt::Display for CutoffDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Check that an identifier tail is a safe relative path: non-empty, with no
/// empty, `.` or `..` segments. Tails become staging file paths.
pub fn validate_tail<'a>(id: &str, tail: &'a str) -> Result<&'a str, ReconcileError> {
    if tail.is_empty() {
        return Err(ReconcileError::malformed(id, "nothing after the category prefix"));
    }

    let bad_segment = tail
        .split(ID_SEPARATOR)
        .any(|segment| segment.is_empty() || segment == "." || segment == "..");

    if bad_segment || tail.contains('\\') {
        return Err(ReconcileError::malformed(
            id,
            format!("'{}' is not a safe relative path", tail),
        ));
    }

    Ok(tail)
}
