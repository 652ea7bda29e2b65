use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed-width canonical serial: uppercase ASCII prefix, zero padding, ASCII digits.
///
/// Only the normalizer builds these, so two codes compare equal exactly when
/// their raw inputs normalize to the same value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct NormalizedCode(String);

impl NormalizedCode {
    pub(crate) fn from_normalized(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading alphabetic run.
    pub fn prefix(&self) -> &str {
        let end = self
            .0
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(self.0.len());
        &self.0[..end]
    }

    /// Everything after the prefix: padding zeros followed by the digits.
    pub fn digits(&self) -> &str {
        &self.0[self.prefix().len()..]
    }
}

impl fmt::Display for NormalizedCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NormalizedCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SerialRange {
    pub id: i64,
    pub reference: String,
    pub description: String,
    pub start: NormalizedCode,
    pub end: NormalizedCode,
    pub issued: NaiveDate,
}

impl SerialRange {
    /// Inclusive containment under fixed-width ordering.
    pub fn contains(&self, code: &NormalizedCode) -> bool {
        &self.start <= code && code <= &self.end
    }
}

/// Block-list membership and containing ranges of one code, read from the
/// same generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SerialLookup {
    pub blocked: bool,
    pub ranges: Vec<SerialRange>,
}

/// One row of the ranges sheet, read positionally.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RangeRow {
    pub id: i64,
    pub reference: Option<String>,
    pub description: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub issued: Option<String>,
}

/// One row of the block-list sheet.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvalidRow {
    pub serial: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub ranges_inserted: usize,
    pub invalids_inserted: usize,
    /// Most recent first, capped.
    pub errors: Vec<String>,
    pub truncated: bool,
    pub total_errors: usize,
}

impl ImportReport {
    pub fn summary(&self) -> String {
        format!(
            "Inserted {} serials and {} invalids",
            self.ranges_inserted, self.invalids_inserted
        )
    }

    /// Text stored under the `import` log: summary line, then errors.
    pub fn to_log_text(&self) -> String {
        std::iter::once(self.summary())
            .chain(self.errors.iter().cloned())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    Ok,
    Failure,
    Double,
    NotFound,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Ok => "OK",
            VerificationStatus::Failure => "FAILURE",
            VerificationStatus::Double => "DOUBLE",
            VerificationStatus::NotFound => "NOT_FOUND",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "OK" => Some(VerificationStatus::Ok),
            "FAILURE" => Some(VerificationStatus::Failure),
            "DOUBLE" => Some(VerificationStatus::Double),
            "NOT_FOUND" => Some(VerificationStatus::NotFound),
            _ => None,
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// What a caller gets back from a serial check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verification {
    pub status: VerificationStatus,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationRecord {
    pub status: VerificationStatus,
    pub sender: String,
    pub raw_message: String,
    pub normalized: Option<String>,
    pub answer: String,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_and_digits_split() {
        let code = NormalizedCode::from_normalized("AB000123".to_string());
        assert_eq!(code.prefix(), "AB");
        assert_eq!(code.digits(), "000123");

        let all_digits = NormalizedCode::from_normalized("000123".to_string());
        assert_eq!(all_digits.prefix(), "");
        assert_eq!(all_digits.digits(), "000123");
    }

    #[test]
    fn test_status_round_trip_through_text() {
        for status in [
            VerificationStatus::Ok,
            VerificationStatus::Failure,
            VerificationStatus::Double,
            VerificationStatus::NotFound,
        ] {
            assert_eq!(VerificationStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(VerificationStatus::parse("MAYBE"), None);
    }

    #[test]
    fn test_report_log_text_starts_with_summary() {
        let report = ImportReport {
            ranges_inserted: 3,
            invalids_inserted: 1,
            errors: vec!["second".to_string(), "first".to_string()],
            truncated: false,
            total_errors: 2,
        };
        assert_eq!(
            report.to_log_text(),
            "Inserted 3 serials and 1 invalids\nsecond\nfirst"
        );
    }
}
