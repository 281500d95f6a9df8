//! API version parsing and "latest stable" selection.
//!
//! Azure API versions are `YYYY-MM-DD`, optionally followed by a prerelease
//! suffix such as `-preview` or `-beta`. A version without a suffix is stable.

use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDate;

use crate::error::TypeLoadError;

/// A parsed API version. Equality and ordering ignore the suffix's case.
#[derive(Debug, Clone)]
pub struct ApiVersion {
    raw: String,
    date: NaiveDate,
    suffix: Option<String>,
}

impl ApiVersion {
    /// Parse a version string.
    ///
    /// # Errors
    ///
    /// Returns `TypeLoadError::InvalidApiVersion` if the string does not start with a
    /// valid calendar date or carries an empty suffix.
    pub fn parse(raw: &str) -> Result<Self, TypeLoadError> {
        let invalid = || TypeLoadError::InvalidApiVersion {
            version: raw.to_string(),
        };

        let date_part = raw.get(..10).ok_or_else(invalid)?;
        if !date_part
            .bytes()
            .enumerate()
            .all(|(i, b)| if i == 4 || i == 7 { b == b'-' } else { b.is_ascii_digit() })
        {
            return Err(invalid());
        }
        let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(|_| invalid())?;

        let suffix = match &raw[10..] {
            "" => None,
            rest => {
                let suffix = rest.strip_prefix('-').ok_or_else(invalid)?;
                let well_formed = suffix
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-');
                if suffix.is_empty() || !well_formed {
                    return Err(invalid());
                }
                Some(suffix.to_ascii_lowercase())
            }
        };

        Ok(Self {
            raw: raw.to_string(),
            date,
            suffix,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Prerelease marker, lowercased, without the leading dash.
    pub fn suffix(&self) -> Option<&str> {
        self.suffix.as_deref()
    }

    pub fn is_stable(&self) -> bool {
        self.suffix.is_none()
    }
}

impl Ord for ApiVersion {
    /// Chronological by date; on the same date a stable release sorts after its
    /// prereleases, and prereleases sort by suffix.
    fn cmp(&self, other: &Self) -> Ordering {
        self.date.cmp(&other.date).then_with(|| match (&self.suffix, &other.suffix) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a), Some(b)) => a.cmp(b),
        })
    }
}

impl PartialEq for ApiVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ApiVersion {}

impl PartialOrd for ApiVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Choose the latest stable version, falling back to the latest prerelease.
///
/// `resource_type` is only used in the error when `versions` is empty.
///
/// # Errors
///
/// Returns `TypeLoadError::NoVersionsAvailable` for an empty input and
/// `TypeLoadError::InvalidApiVersion` if any candidate is malformed.
pub fn select_latest_stable<I, S>(resource_type: &str, versions: I) -> Result<String, TypeLoadError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let parsed = versions
        .into_iter()
        .map(|v| ApiVersion::parse(v.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;

    let latest_stable = parsed.iter().filter(|v| v.is_stable()).max();
    latest_stable
        .or_else(|| parsed.iter().max())
        .map(|v| v.as_str().to_string())
        .ok_or_else(|| TypeLoadError::NoVersionsAvailable {
            name: resource_type.to_string(),
        })
}
