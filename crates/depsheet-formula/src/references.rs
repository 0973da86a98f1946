//! Reference extraction
//!
//! Scans formula text for the cells and ranges it mentions. Five independent
//! matchers each propose candidates with byte spans:
//!
//! 1. external references (`'C:\dir\[Book.xlsx]Sheet1'!A1`, `[Book.xlsx]Sheet1!A1`)
//! 2. quoted sheet references (`'My Sheet'!A1`)
//! 3. unquoted sheet references (`Sheet2!A1`)
//! 4. current-sheet ranges (`A1:B10`)
//! 5. current-sheet cells (`A1`)
//!
//! Candidates are ordered by start offset, longer spans first, and accepted
//! only when they do not overlap an already accepted span. A qualified
//! reference therefore always wins over the bare cell token inside it.
//!
//! The matchers are hand-written scanners over bytes rather than regexes so
//! that scanning stays linear in the formula length.

use crate::normalize::{collapse_doubled_quotes, collapse_separators};
use crate::range_policy::{RangePolicy, RangeSummary};
use depsheet_core::{CellAddress, CellKey, CellRef, WorkbookPath};
use std::collections::HashSet;
use std::ops::Range;

/// File extensions that mark a token as a workbook name rather than a sheet
const WORKBOOK_EXTENSIONS: &[&str] = &[
    ".xlsx", ".xlsm", ".xlsb", ".xls", ".xltx", ".xltm", ".xlt", ".csv", ".ods",
];

/// How a reference was written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ReferenceKind {
    /// Qualified with a workbook file (`[Book.xlsx]Sheet1!A1`)
    External,
    /// Qualified with a sheet of the current workbook (`Sheet2!A1`)
    LocalSheet,
    /// Unqualified range on the current sheet (`A1:B3`)
    CurrentRange,
    /// Unqualified cell on the current sheet (`A1`)
    CurrentSingle,
}

impl ReferenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceKind::External => "external",
            ReferenceKind::LocalSheet => "local_sheet",
            ReferenceKind::CurrentRange => "current_range",
            ReferenceKind::CurrentSingle => "current_single",
        }
    }
}

/// What a reference points at after range policy has been applied
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ReferenceTarget {
    /// A single cell; `origin_range` is set when it came from expanding a range
    Cell {
        cell: CellRef,
        origin_range: Option<String>,
    },
    /// A range too large to expand (or one whose bounds did not parse)
    RangeSummary(RangeSummary),
}

impl ReferenceTarget {
    fn dedup_key(&self) -> DedupKey {
        match self {
            ReferenceTarget::Cell { cell, .. } => DedupKey::Cell(cell.key()),
            ReferenceTarget::RangeSummary(summary) => DedupKey::Range(
                summary.workbook.normalized(),
                summary.sheet.clone(),
                summary.range_text.to_ascii_uppercase().replace('$', ""),
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum DedupKey {
    Cell(CellKey),
    Range(String, String, String),
}

/// A reference found in formula text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormulaReference {
    pub kind: ReferenceKind,
    pub target: ReferenceTarget,
    /// Byte span in the formula text after separator and quote collapsing
    pub span: Range<usize>,
}

/// Extracts references from formula text
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceParser {
    policy: RangePolicy,
}

impl ReferenceParser {
    /// Create a parser that applies `policy` to every range it finds
    pub fn new(policy: RangePolicy) -> Self {
        Self { policy }
    }

    /// Extract the deduplicated, ordered references of `formula`
    ///
    /// `workbook` and `sheet` locate the formula's own cell and qualify every
    /// unqualified reference. Text that does not start with `=` is not a
    /// formula and yields no references. Tokens that look like references but
    /// fail address validation are skipped.
    ///
    /// # Example
    /// ```rust
    /// use depsheet_core::WorkbookPath;
    /// use depsheet_formula::{ReferenceKind, ReferenceParser};
    ///
    /// let parser = ReferenceParser::default();
    /// let refs = parser.parse("=Sheet2!A1+A1", &WorkbookPath::new("Book.xlsx"), "Sheet1");
    /// assert_eq!(refs.len(), 2);
    /// assert_eq!(refs[0].kind, ReferenceKind::LocalSheet);
    /// assert_eq!(refs[1].kind, ReferenceKind::CurrentSingle);
    /// ```
    pub fn parse(
        &self,
        formula: &str,
        workbook: &WorkbookPath,
        sheet: &str,
    ) -> Vec<FormulaReference> {
        if !formula.trim_start().starts_with('=') {
            return Vec::new();
        }

        let text = collapse_doubled_quotes(&collapse_separators(formula));
        let candidates = select_candidates(scan_candidates(&text));

        let mut seen = HashSet::new();
        let mut references = Vec::new();

        for candidate in candidates {
            let (target_workbook, target_sheet) = match &candidate.qualifier {
                Qualifier::Current => (workbook.clone(), sheet.to_string()),
                Qualifier::Sheet(name) => (workbook.clone(), name.clone()),
                Qualifier::External { path, sheet } => (path.clone(), sheet.clone()),
            };
            let location = &text[candidate.location.clone()];

            let targets = if candidate.is_range {
                self.policy
                    .process_range(&target_workbook, &target_sheet, location)
            } else {
                match CellAddress::parse(location) {
                    Ok(cell) => vec![ReferenceTarget::Cell {
                        cell: CellRef::new(target_workbook, target_sheet, cell),
                        origin_range: None,
                    }],
                    Err(e) => {
                        log::trace!("Skipping token '{location}': {e}");
                        continue;
                    }
                }
            };

            for target in targets {
                if seen.insert(target.dedup_key()) {
                    references.push(FormulaReference {
                        kind: candidate.kind,
                        target,
                        span: candidate.span.clone(),
                    });
                }
            }
        }

        references
    }
}

/// Qualification of a candidate reference
#[derive(Debug, Clone, PartialEq, Eq)]
enum Qualifier {
    Current,
    Sheet(String),
    External { path: WorkbookPath, sheet: String },
}

#[derive(Debug, Clone)]
struct Candidate {
    span: Range<usize>,
    kind: ReferenceKind,
    qualifier: Qualifier,
    /// Span of the cell or range text
    location: Range<usize>,
    is_range: bool,
}

/// Sort by (start ascending, length descending) and drop overlapping spans
fn select_candidates(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        a.span
            .start
            .cmp(&b.span.start)
            .then_with(|| b.span.len().cmp(&a.span.len()))
    });

    let mut accepted = Vec::with_capacity(candidates.len());
    let mut consumed_to = 0;
    for candidate in candidates {
        // Every accepted span starts at or before this one, so overlap means
        // starting before the furthest accepted end.
        if !accepted.is_empty() && candidate.span.start < consumed_to {
            continue;
        }
        consumed_to = consumed_to.max(candidate.span.end);
        accepted.push(candidate);
    }
    accepted
}

fn scan_candidates(text: &str) -> Vec<Candidate> {
    let scanner = Scanner::new(text);
    let mut candidates = scanner.match_external();
    candidates.extend(scanner.match_quoted_sheet());
    candidates.extend(scanner.match_unquoted_sheet());
    candidates.extend(scanner.match_current_ranges());
    candidates.extend(scanner.match_current_cells());
    candidates
}

/// Qualifier text found in front of a `!`
enum RawQualifier {
    Quoted { start: usize, content: String },
    Unquoted { start: usize, content: String },
}

struct Scanner<'a> {
    text: &'a str,
    bytes: &'a [u8],
    /// Per byte: inside a `"..."` string literal
    literal_mask: Vec<bool>,
    /// Per byte: inside a `'...'` or `[...]` section outside string literals
    shield_mask: Vec<bool>,
    /// `'...'` sections in text order
    quoted: Vec<Range<usize>>,
    /// `!` positions outside string literals followed by a cell or range
    qualified: Vec<(usize, Range<usize>, bool)>,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str) -> Self {
        let bytes = text.as_bytes();
        let mut literal_mask = vec![false; bytes.len()];
        let mut shield_mask = vec![false; bytes.len()];
        let mut quoted = Vec::new();

        let mut pos = 0;
        while pos < bytes.len() {
            let (end, mask) = match bytes[pos] {
                b'"' => (closing_quote(bytes, pos, b'"'), &mut literal_mask),
                b'\'' => {
                    let end = closing_quote(bytes, pos, b'\'');
                    quoted.push(pos..end);
                    (end, &mut shield_mask)
                }
                b'[' => {
                    let end = bytes[pos..]
                        .iter()
                        .position(|&b| b == b']')
                        .map_or(bytes.len(), |off| pos + off + 1);
                    (end, &mut shield_mask)
                }
                _ => {
                    pos += 1;
                    continue;
                }
            };
            mask[pos..end].fill(true);
            pos = end;
        }

        let qualified = bytes
            .iter()
            .enumerate()
            .filter(|&(pos, &b)| b == b'!' && !literal_mask[pos])
            .filter_map(|(pos, _)| {
                let (end, is_range) = scan_location(bytes, pos + 1)?;
                Some((pos, pos + 1..end, is_range))
            })
            .collect();

        Self {
            text,
            bytes,
            literal_mask,
            shield_mask,
            quoted,
            qualified,
        }
    }

    fn in_literal(&self, pos: usize) -> bool {
        self.literal_mask[pos]
    }

    fn in_shielded(&self, pos: usize) -> bool {
        self.shield_mask[pos]
    }

    /// Start of the `'...'` section whose closing quote is at `close`
    fn quote_opened_before(&self, close: usize) -> Option<usize> {
        let index = self
            .quoted
            .binary_search_by_key(&(close + 1), |r| r.end)
            .ok()?;
        let section = &self.quoted[index];
        (section.len() >= 2).then_some(section.start)
    }

    /// Read the sheet qualifier that ends right before the `!` at `bang`
    fn qualifier_before(&self, bang: usize) -> Option<RawQualifier> {
        if bang == 0 {
            return None;
        }

        if self.bytes[bang - 1] == b'\'' {
            let close = bang - 1;
            let open = self.quote_opened_before(close)?;
            let content = self.text[open + 1..close].replace("''", "'");
            return Some(RawQualifier::Quoted {
                start: open,
                content,
            });
        }

        // Unquoted: sheet name, optionally preceded by `[file]` and a directory
        let mut start = bang;
        while start > 0 && is_sheet_byte(self.bytes[start - 1]) {
            start -= 1;
        }
        if start == bang {
            return None;
        }

        if start > 0 && self.bytes[start - 1] == b']' {
            let close = start - 1;
            let mut open = close;
            while open > 0 && is_file_byte(self.bytes[open - 1]) {
                open -= 1;
            }
            if open == 0 || self.bytes[open - 1] != b'[' {
                return None;
            }
            start = open - 1;
            while start > 0 && is_path_byte(self.bytes[start - 1]) {
                start -= 1;
            }
        }

        Some(RawQualifier::Unquoted {
            start,
            content: self.text[start..bang].to_string(),
        })
    }

    fn match_external(&self) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        for (bang, location, is_range) in self.qualified.iter().cloned() {
            let (start, content) = match self.qualifier_before(bang) {
                Some(RawQualifier::Quoted { start, content }) => (start, content),
                Some(RawQualifier::Unquoted { start, content }) => (start, content),
                None => continue,
            };
            if !(content.contains('[') && content.contains(']')) {
                continue;
            }
            let Some((path, sheet)) = split_external(&content) else {
                log::trace!("Skipping malformed external qualifier '{content}'");
                continue;
            };
            candidates.push(Candidate {
                span: start..location.end,
                kind: ReferenceKind::External,
                qualifier: Qualifier::External { path, sheet },
                location,
                is_range,
            });
        }
        candidates
    }

    fn match_quoted_sheet(&self) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        for (bang, location, is_range) in self.qualified.iter().cloned() {
            let Some(RawQualifier::Quoted { start, content }) = self.qualifier_before(bang) else {
                continue;
            };
            if content.contains('[') || content.trim().is_empty() {
                continue;
            }
            candidates.push(Candidate {
                span: start..location.end,
                kind: ReferenceKind::LocalSheet,
                qualifier: Qualifier::Sheet(content),
                location,
                is_range,
            });
        }
        candidates
    }

    fn match_unquoted_sheet(&self) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        for (bang, location, is_range) in self.qualified.iter().cloned() {
            let Some(RawQualifier::Unquoted { start, content }) = self.qualifier_before(bang)
            else {
                continue;
            };
            if content.contains('[') || has_workbook_extension(&content) {
                continue;
            }
            candidates.push(Candidate {
                span: start..location.end,
                kind: ReferenceKind::LocalSheet,
                qualifier: Qualifier::Sheet(content),
                location,
                is_range,
            });
        }
        candidates
    }

    /// Start positions of bare cell tokens: not inside literals, quotes or
    /// brackets, and not glued to reference punctuation
    fn bare_token_starts(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.bytes.len()).filter(move |&pos| {
            let b = self.bytes[pos];
            if !(b == b'$' || b.is_ascii_alphabetic()) {
                return false;
            }
            if pos > 0 && !is_bare_boundary(self.bytes[pos - 1]) {
                return false;
            }
            !self.in_literal(pos) && !self.in_shielded(pos)
        })
    }

    fn match_current_ranges(&self) -> Vec<Candidate> {
        self.bare_token_starts()
            .filter_map(|start| {
                let (end, is_range) = scan_location(self.bytes, start)?;
                if !is_range {
                    return None;
                }
                Some(Candidate {
                    span: start..end,
                    kind: ReferenceKind::CurrentRange,
                    qualifier: Qualifier::Current,
                    location: start..end,
                    is_range: true,
                })
            })
            .collect()
    }

    fn match_current_cells(&self) -> Vec<Candidate> {
        self.bare_token_starts()
            .filter_map(|start| {
                if start > 0 && self.bytes[start - 1] == b':' {
                    return None;
                }
                let end = scan_cell(self.bytes, start)?;
                if matches!(self.bytes.get(end), Some(b':')) || !is_token_end(self.bytes, end) {
                    return None;
                }
                Some(Candidate {
                    span: start..end,
                    kind: ReferenceKind::CurrentSingle,
                    qualifier: Qualifier::Current,
                    location: start..end,
                    is_range: false,
                })
            })
            .collect()
    }
}

/// Split `dir\[file]sheet` (or `[dir\file]sheet`) into a workbook path and sheet
fn split_external(content: &str) -> Option<(WorkbookPath, String)> {
    let mut content = content.trim();
    // Leftover quoting from `''path''` forms
    while let Some(inner) = content
        .strip_prefix('\'')
        .and_then(|c| c.strip_suffix('\''))
    {
        content = inner.trim();
    }

    let (workbook_part, sheet) = content.rsplit_once(']')?;
    let (directory, file_name) = workbook_part.rsplit_once('[')?;
    let sheet = sheet.trim();
    if sheet.is_empty() || file_name.trim().is_empty() {
        return None;
    }
    Some((
        WorkbookPath::join(directory, file_name),
        sheet.to_string(),
    ))
}

fn has_workbook_extension(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    WORKBOOK_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// End (exclusive) of the quoted section opened at `open`; `''`/`""` are escapes
fn closing_quote(bytes: &[u8], open: usize, quote: u8) -> usize {
    let mut pos = open + 1;
    while pos < bytes.len() {
        if bytes[pos] == quote {
            if bytes.get(pos + 1) == Some(&quote) {
                pos += 2;
                continue;
            }
            return pos + 1;
        }
        pos += 1;
    }
    bytes.len()
}

/// Scan a cell token (`$?` letters{1,3} `$?` digits{1,7}) starting at `pos`
///
/// Returns the end offset. Letter and digit runs are taken maximally, so
/// `SHEET1` or `A12345678` are rejected rather than partially matched.
fn scan_cell(bytes: &[u8], pos: usize) -> Option<usize> {
    let mut end = pos;
    if bytes.get(end) == Some(&b'$') {
        end += 1;
    }
    let letters = end;
    while end < bytes.len() && bytes[end].is_ascii_alphabetic() {
        end += 1;
    }
    if end == letters || end - letters > depsheet_core::MAX_COL_LETTERS {
        return None;
    }
    if bytes.get(end) == Some(&b'$') {
        end += 1;
    }
    let digits = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end == digits || end - digits > depsheet_core::MAX_ROW_DIGITS {
        return None;
    }
    Some(end)
}

/// Scan a cell or `cell:cell` range at `pos`, requiring a token boundary after it
fn scan_location(bytes: &[u8], pos: usize) -> Option<(usize, bool)> {
    let first = scan_cell(bytes, pos)?;
    if bytes.get(first) == Some(&b':') {
        if let Some(second) = scan_cell(bytes, first + 1) {
            if is_token_end(bytes, second) {
                return Some((second, true));
            }
        }
    }
    if is_token_end(bytes, first) {
        Some((first, false))
    } else {
        None
    }
}

/// Whether `pos` ends a reference token (not glued to an identifier, call or path)
fn is_token_end(bytes: &[u8], pos: usize) -> bool {
    match bytes.get(pos) {
        None => true,
        Some(&b) => !(is_ident_byte(b) || matches!(b, b'(' | b'!' | b'[' | b']' | b'\\')),
    }
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'.' || b == b'$' || b >= 0x80
}

/// Bytes allowed in an unquoted sheet name
fn is_sheet_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'.' || b >= 0x80
}

/// Bytes allowed in a bracketed file name
fn is_file_byte(b: u8) -> bool {
    !matches!(
        b,
        b'[' | b']'
            | b'\''
            | b'"'
            | b'!'
            | b'('
            | b')'
            | b','
            | b';'
            | b'='
            | b'&'
            | b'+'
            | b'*'
            | b'^'
            | b'<'
            | b'>'
            | b'{'
            | b'}'
    )
}

/// Bytes allowed in an unquoted directory in front of `[file]`
fn is_path_byte(b: u8) -> bool {
    is_sheet_byte(b) || matches!(b, b':' | b'\\' | b'/' | b'-' | b'~' | b'$')
}

/// Bytes that may directly precede a bare cell token
fn is_bare_boundary(b: u8) -> bool {
    !(is_ident_byte(b) || matches!(b, b'!' | b'\'' | b'[' | b']' | b'\\' | b':' | b'"'))
}
