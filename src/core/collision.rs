use crate::domain::model::{NormalizedCode, SerialRange};
use serde::Serialize;
use std::collections::BTreeMap;

/// Two ranges whose intervals overlap. `first` precedes `second` in the
/// order the ranges were read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Collision {
    pub first: i64,
    pub second: i64,
}

impl Collision {
    /// Order-independent key for comparing reports.
    pub fn unordered(&self) -> (i64, i64) {
        (self.first.min(self.second), self.first.max(self.second))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollisionReport {
    /// Ranges whose start and end carry different letter prefixes.
    pub mismatched_prefix: Vec<i64>,
    /// Ranges whose start sorts after their end; they can never match.
    pub inverted: Vec<i64>,
    /// Ranges whose digits do not fit a 128-bit value.
    pub unreadable: Vec<i64>,
    pub collisions: Vec<Collision>,
}

impl CollisionReport {
    pub fn is_clean(&self) -> bool {
        self.mismatched_prefix.is_empty()
            && self.inverted.is_empty()
            && self.unreadable.is_empty()
            && self.collisions.is_empty()
    }

    /// Human-readable problems, most recent first.
    pub fn problems(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .mismatched_prefix
            .iter()
            .map(|id| {
                format!(
                    "Start serial and end serial of row {} start with different letters",
                    id
                )
            })
            .chain(
                self.unreadable
                    .iter()
                    .map(|id| format!("Serials of row {} have too many digits to compare", id)),
            )
            .chain(
                self.inverted
                    .iter()
                    .map(|id| format!("Start serial of row {} is after its end serial", id)),
            )
            .chain(self.collisions.iter().map(|c| {
                format!(
                    "there is a collision between row ids {} and {}",
                    c.first, c.second
                )
            }))
            .collect();
        lines.reverse();
        lines
    }

    pub fn to_log_text(&self) -> String {
        if self.is_clean() {
            return "No problems found".to_string();
        }
        self.problems().join("\n")
    }
}

/// `(prefix, numeric value)` of a normalized bound.
fn decompose(code: &NormalizedCode) -> Option<(&str, u128)> {
    let digits = code.digits();
    let value = if digits.is_empty() {
        0
    } else {
        digits.parse::<u128>().ok()?
    };
    Some((code.prefix(), value))
}

/// Inclusive interval overlap.
fn overlaps(a: (u128, u128), b: (u128, u128)) -> bool {
    a.0 <= b.1 && b.0 <= a.1
}

/// Post-import sanity pass over the active ranges.
///
/// Ranges are grouped by letter prefix and compared pairwise inside each
/// group. The result is advisory; nothing is rejected or removed.
#[derive(Debug, Default, Clone, Copy)]
pub struct CollisionDetector;

impl CollisionDetector {
    pub fn detect(ranges: &[SerialRange]) -> CollisionReport {
        let mut report = CollisionReport::default();
        let mut groups: BTreeMap<&str, Vec<(i64, u128, u128)>> = BTreeMap::new();

        for range in ranges {
            let (Some((start_prefix, start)), Some((end_prefix, end))) =
                (decompose(&range.start), decompose(&range.end))
            else {
                tracing::warn!("Range {} has unreadable bounds", range.id);
                report.unreadable.push(range.id);
                continue;
            };

            if start_prefix != end_prefix {
                report.mismatched_prefix.push(range.id);
                continue;
            }
            if start > end {
                report.inverted.push(range.id);
            }

            groups
                .entry(start_prefix)
                .or_default()
                .push((range.id, start, end));
        }

        for (prefix, members) in &groups {
            tracing::debug!("Checking {} ranges with prefix '{}'", members.len(), prefix);

            // 同一前綴內兩兩比對
            for (i, &(first, a_start, a_end)) in members.iter().enumerate() {
                for &(second, b_start, b_end) in &members[i + 1..] {
                    if overlaps((a_start, a_end), (b_start, b_end)) {
                        report.collisions.push(Collision { first, second });
                    }
                }
            }
        }

        if !report.is_clean() {
            tracing::warn!(
                "Database check found {} collisions and {} mismatched prefixes",
                report.collisions.len(),
                report.mismatched_prefix.len()
            );
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::normalizer::normalize;
    use chrono::NaiveDate;
    use std::collections::HashSet;

    fn range(id: i64, start: &str, end: &str) -> SerialRange {
        SerialRange {
            id,
            reference: String::new(),
            description: String::new(),
            start: normalize(start, 30).unwrap(),
            end: normalize(end, 30).unwrap(),
            issued: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        }
    }

    fn pairs(report: &CollisionReport) -> HashSet<(i64, i64)> {
        report.collisions.iter().map(Collision::unordered).collect()
    }

    #[test]
    fn test_disjoint_ranges_are_clean() {
        let report = CollisionDetector::detect(&[
            range(1, "AA100", "AA199"),
            range(2, "AA200", "AA299"),
            range(3, "BB100", "BB299"),
        ]);
        assert!(report.is_clean());
        assert_eq!(report.to_log_text(), "No problems found");
    }

    #[test]
    fn test_touching_bounds_collide() {
        let report = CollisionDetector::detect(&[
            range(1, "AA100", "AA200"),
            range(2, "AA200", "AA300"),
        ]);
        assert_eq!(report.collisions, vec![Collision { first: 1, second: 2 }]);
    }

    #[test]
    fn test_containment_and_partial_overlap() {
        let report = CollisionDetector::detect(&[
            range(1, "AA100", "AA500"),
            range(2, "AA200", "AA300"),
            range(3, "AA450", "AA600"),
            range(4, "AA700", "AA800"),
        ]);
        assert_eq!(pairs(&report), HashSet::from([(1, 2), (1, 3)]));
    }

    #[test]
    fn test_same_digits_with_different_prefix_do_not_collide() {
        let report = CollisionDetector::detect(&[
            range(1, "AA100", "AA200"),
            range(2, "AB100", "AB200"),
        ]);
        assert!(report.collisions.is_empty());
    }

    #[test]
    fn test_numeric_order_not_lexical() {
        // 9 < 10 numerically even though "9" > "10" as text
        let report = CollisionDetector::detect(&[range(1, "C1", "C9"), range(2, "C10", "C20")]);
        assert!(report.collisions.is_empty());
    }

    #[test]
    fn test_mismatched_prefix_is_flagged_and_excluded() {
        let report = CollisionDetector::detect(&[
            range(1, "AA100", "AB200"),
            range(2, "AA150", "AA160"),
        ]);
        assert_eq!(report.mismatched_prefix, vec![1]);
        assert!(report.collisions.is_empty());
        assert_eq!(
            report.problems(),
            vec!["Start serial and end serial of row 1 start with different letters".to_string()]
        );
    }

    #[test]
    fn test_inverted_range_is_flagged() {
        let report = CollisionDetector::detect(&[range(5, "AA900", "AA100")]);
        assert_eq!(report.inverted, vec![5]);
    }

    #[test]
    fn test_each_pair_reported_once_regardless_of_order() {
        let mut ranges = vec![
            range(1, "AA100", "AA500"),
            range(2, "AA200", "AA300"),
            range(3, "AA250", "AA260"),
            range(4, "BB1", "BB5"),
            range(5, "BB5", "BB9"),
        ];
        let forward = CollisionDetector::detect(&ranges);
        ranges.reverse();
        let backward = CollisionDetector::detect(&ranges);

        assert_eq!(forward.collisions.len(), 4);
        assert_eq!(backward.collisions.len(), 4);
        assert_eq!(pairs(&forward), pairs(&backward));
        assert_eq!(
            pairs(&forward),
            HashSet::from([(1, 2), (1, 3), (2, 3), (4, 5)])
        );
    }

    #[test]
    fn test_problems_are_most_recent_first() {
        let report = CollisionDetector::detect(&[
            range(1, "AA1", "BB1"),
            range(2, "CC1", "CC5"),
            range(3, "CC2", "CC3"),
        ]);
        let problems = report.problems();
        assert_eq!(problems.len(), 2);
        assert_eq!(problems[0], "there is a collision between row ids 2 and 3");
    }
}
