//! Range expansion policy
//!
//! A range reference is either expanded into one reference per cell (small
//! ranges) or collapsed into a single summary (large ranges). Summaries are
//! identified by a fingerprint of where the range lives, not by what it
//! contains, so no cells need to be read to produce one.

use crate::references::ReferenceTarget;
use depsheet_core::{CellRange, CellRef, RangeRef, WorkbookPath};
use md5::{Digest, Md5};

/// Default number of cells at or below which a range is expanded
pub const DEFAULT_EXPAND_THRESHOLD: usize = 5;

/// Number of hex digits kept from the range fingerprint
const FINGERPRINT_LEN: usize = 8;

/// A large (or malformed) range standing in for its cells
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RangeSummary {
    pub workbook: WorkbookPath,
    pub sheet: String,
    /// Range text as written in the formula (e.g. `$A$1:$B$20`)
    pub range_text: String,
    pub rows: u32,
    pub cols: u32,
    pub total_cells: u64,
    pub fingerprint: String,
    /// Set when the range bounds could not be parsed
    pub error: Option<String>,
}

impl RangeSummary {
    /// Short value text, e.g. `20Rx2C | Hash: 1a2b3c4d`
    pub fn value_text(&self) -> String {
        match &self.error {
            Some(error) => error.clone(),
            None => format!(
                "{}Rx{}C | Hash: {}",
                self.rows, self.cols, self.fingerprint
            ),
        }
    }
}

/// Decides between expanding and summarizing range references
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangePolicy {
    expand_threshold: usize,
}

impl Default for RangePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_EXPAND_THRESHOLD)
    }
}

impl RangePolicy {
    /// Ranges with at most `expand_threshold` cells are expanded
    pub fn new(expand_threshold: usize) -> Self {
        Self { expand_threshold }
    }

    pub fn expand_threshold(&self) -> usize {
        self.expand_threshold
    }

    /// Process a range written as `range_text` in `workbook`/`sheet`
    ///
    /// Returns one [`ReferenceTarget::Cell`] per cell in row-major order when
    /// the range is small enough, otherwise a single
    /// [`ReferenceTarget::RangeSummary`]. Unparsable bounds produce a summary
    /// carrying the error instead of failing.
    pub fn process_range(
        &self,
        workbook: &WorkbookPath,
        sheet: &str,
        range_text: &str,
    ) -> Vec<ReferenceTarget> {
        match CellRange::parse(range_text) {
            Ok(range) => {
                let range_ref = RangeRef::new(workbook.clone(), sheet, range);
                self.process_range_ref(&range_ref, range_text)
            }
            Err(e) => {
                log::debug!("Could not process range {range_text}: {e}");
                vec![ReferenceTarget::RangeSummary(RangeSummary {
                    workbook: workbook.clone(),
                    sheet: sheet.to_string(),
                    range_text: range_text.to_string(),
                    rows: 0,
                    cols: 0,
                    total_cells: 0,
                    fingerprint: range_fingerprint(workbook, sheet, range_text),
                    error: Some(format!("Error processing range: {e}")),
                })]
            }
        }
    }

    /// Process an already-parsed range; `range_text` is kept for provenance
    pub fn process_range_ref(&self, range: &RangeRef, range_text: &str) -> Vec<ReferenceTarget> {
        let total_cells = range.size();

        if total_cells <= self.expand_threshold as u64 {
            log::trace!("Expanding range {range_text} ({total_cells} cells)");
            return range
                .cell_refs()
                .map(|cell: CellRef| ReferenceTarget::Cell {
                    cell,
                    origin_range: Some(range_text.to_string()),
                })
                .collect();
        }

        log::trace!("Summarizing range {range_text} ({total_cells} cells)");
        vec![ReferenceTarget::RangeSummary(RangeSummary {
            workbook: range.workbook.clone(),
            sheet: range.sheet.clone(),
            range_text: range_text.to_string(),
            rows: range.range.row_count(),
            cols: range.range.col_count(),
            total_cells,
            fingerprint: range_fingerprint(&range.workbook, &range.sheet, range_text),
            error: None,
        })]
    }
}

/// Stable short fingerprint of `(workbook, sheet, range_text)`
pub fn range_fingerprint(workbook: &WorkbookPath, sheet: &str, range_text: &str) -> String {
    let digest = Md5::digest(format!("{}|{}|{}", workbook, sheet, range_text).as_bytes());
    let mut hex = format!("{:x}", digest);
    hex.truncate(FINGERPRINT_LEN);
    hex
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn book() -> WorkbookPath {
        WorkbookPath::new(r"C:\data\Main.xlsx")
    }

    fn cell_names(targets: &[ReferenceTarget]) -> Vec<String> {
        targets
            .iter()
            .map(|t| match t {
                ReferenceTarget::Cell { cell, .. } => cell.cell.to_string(),
                ReferenceTarget::RangeSummary(s) => format!("summary:{}", s.range_text),
            })
            .collect()
    }

    #[test]
    fn test_expands_at_threshold() {
        let policy = RangePolicy::new(5);
        let targets = policy.process_range(&book(), "Sheet1", "A1:A5");
        assert_eq!(cell_names(&targets), vec!["A1", "A2", "A3", "A4", "A5"]);
        for target in &targets {
            match target {
                ReferenceTarget::Cell { origin_range, .. } => {
                    assert_eq!(origin_range.as_deref(), Some("A1:A5"))
                }
                other => panic!("unexpected target {other:?}"),
            }
        }
    }

    #[test]
    fn test_expansion_is_row_major() {
        let policy = RangePolicy::new(5);
        let targets = policy.process_range(&book(), "Sheet1", "$B$2:$A$1");
        assert_eq!(cell_names(&targets), vec!["A1", "B1", "A2", "B2"]);
    }

    #[test]
    fn test_summarizes_above_threshold() {
        let policy = RangePolicy::new(5);
        let targets = policy.process_range(&book(), "Sheet1", "A1:A6");
        assert_eq!(targets.len(), 1);
        let ReferenceTarget::RangeSummary(summary) = &targets[0] else {
            panic!("expected a summary");
        };
        assert_eq!(summary.rows, 6);
        assert_eq!(summary.cols, 1);
        assert_eq!(summary.total_cells, 6);
        assert_eq!(summary.fingerprint.len(), 8);
        assert!(summary.error.is_none());
        assert_eq!(
            summary.value_text(),
            format!("6Rx1C | Hash: {}", summary.fingerprint)
        );
    }

    #[test]
    fn test_zero_threshold_always_summarizes() {
        let policy = RangePolicy::new(0);
        let targets = policy.process_range(&book(), "Sheet1", "A1:A1");
        assert!(matches!(targets[0], ReferenceTarget::RangeSummary(_)));
    }

    #[test]
    fn test_fingerprint_is_stable_and_location_sensitive() {
        let a = range_fingerprint(&book(), "Sheet1", "A1:B20");
        let b = range_fingerprint(&book(), "Sheet1", "A1:B20");
        let c = range_fingerprint(&book(), "Sheet2", "A1:B20");
        assert_eq!(a, b);
        assert!(a != c);
        assert!(a.chars().all(|ch| ch.is_ascii_hexdigit()));
    }

    #[test]
    fn test_malformed_range_falls_back_to_summary() {
        let policy = RangePolicy::default();
        let targets = policy.process_range(&book(), "Sheet1", "A0:A3");
        let ReferenceTarget::RangeSummary(summary) = &targets[0] else {
            panic!("expected a summary");
        };
        assert_eq!(summary.total_cells, 0);
        assert!(summary
            .error
            .as_deref()
            .unwrap()
            .starts_with("Error processing range"));
    }
}
