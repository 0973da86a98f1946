//! INDIRECT resolution
//!
//! `INDIRECT` builds a reference from a string expression at evaluation time,
//! so its target cannot be read off the formula text. This module evaluates
//! the small subset of expressions such arguments are usually built from:
//!
//! - string literals (`"Sheet2"`)
//! - cell tokens, replaced by the displayed value of that cell
//! - `ROW()` and `COLUMN()` of the cell being explored, with an optional `+N` / `-N`
//! - `&` concatenation of the above
//!
//! Anything else is passed through verbatim. External link indices (`[1]`)
//! are replaced with the linked workbook path before evaluation.
//!
//! Resolution never fails the caller: errors are reported in the
//! [`IndirectResolution`] and the original formula stays usable.

use crate::error::{FormulaError, FormulaResult};
use crate::links::LinkTable;
use depsheet_core::{CellAddress, WorkbookPath};
use lazy_regex::{regex_captures, regex_is_match, regex_replace_all};
use std::ops::Range;

/// Source of cell values for cell tokens inside an INDIRECT argument
///
/// Lookups are relative to the sheet of the cell being explored.
pub trait CellLookup {
    /// Displayed text of `cell`, or `None` if it cannot be read
    fn cell_text(&self, cell: &CellAddress) -> Option<String>;
}

impl<F> CellLookup for F
where
    F: Fn(&CellAddress) -> Option<String>,
{
    fn cell_text(&self, cell: &CellAddress) -> Option<String> {
        self(cell)
    }
}

/// An `INDIRECT(...)` call found in formula text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndirectCall {
    /// Byte span of the whole call, from the function name to the closing parenthesis
    pub span: Range<usize>,
    /// The first argument expression, trimmed
    pub argument: String,
}

/// Outcome of resolving the first INDIRECT call of a formula
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct IndirectResolution {
    pub has_indirect: bool,
    pub original_formula: String,
    /// The formula with the call replaced by the computed reference
    pub resolved_formula: Option<String>,
    pub error: Option<String>,
}

impl IndirectResolution {
    fn absent(formula: &str) -> Self {
        Self {
            has_indirect: false,
            original_formula: formula.to_string(),
            resolved_formula: None,
            error: None,
        }
    }

    fn failed(formula: &str, error: FormulaError) -> Self {
        Self {
            has_indirect: true,
            original_formula: formula.to_string(),
            resolved_formula: None,
            error: Some(error.to_string()),
        }
    }

    /// Text references should be extracted from
    pub fn formula_for_parsing(&self) -> &str {
        self.resolved_formula
            .as_deref()
            .unwrap_or(&self.original_formula)
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved_formula.is_some()
    }
}

/// Resolves INDIRECT calls relative to the cell being explored
pub struct IndirectResolver<'a, L> {
    lookup: L,
    links: &'a LinkTable,
    current_cell: CellAddress,
}

impl<'a, L: CellLookup> IndirectResolver<'a, L> {
    /// Create a resolver for the formula of `current_cell`
    ///
    /// `lookup` reads cells on the same sheet as `current_cell`; `links` maps
    /// external link indices of the current workbook to paths.
    pub fn new(lookup: L, links: &'a LinkTable, current_cell: CellAddress) -> Self {
        Self {
            lookup,
            links,
            current_cell,
        }
    }

    /// Resolve the first INDIRECT call in `formula`
    ///
    /// # Example
    /// ```rust
    /// use depsheet_core::CellAddress;
    /// use depsheet_formula::{IndirectResolver, LinkTable};
    ///
    /// let lookup = |cell: &CellAddress| (cell.to_a1_string() == "B1").then(|| "Sheet2".to_string());
    /// let links = LinkTable::new();
    /// let resolver = IndirectResolver::new(lookup, &links, CellAddress::parse("C1").unwrap());
    ///
    /// let resolution = resolver.resolve(r#"=INDIRECT(B1&"!"&"A8")"#);
    /// assert_eq!(resolution.resolved_formula.as_deref(), Some("=Sheet2!A8"));
    /// ```
    pub fn resolve(&self, formula: &str) -> IndirectResolution {
        let call = match find_indirect(formula) {
            Ok(Some(call)) => call,
            Ok(None) => return IndirectResolution::absent(formula),
            Err(e) => {
                log::warn!("Could not resolve INDIRECT in {formula}: {e}");
                return IndirectResolution::failed(formula, e);
            }
        };

        match self.evaluate(&call.argument) {
            Ok(reference) => {
                let mut resolved = String::with_capacity(formula.len() + reference.len());
                resolved.push_str(&formula[..call.span.start]);
                resolved.push_str(&reference);
                resolved.push_str(&formula[call.span.end..]);
                log::debug!("Resolved INDIRECT({}) to {reference}", call.argument);
                IndirectResolution {
                    has_indirect: true,
                    original_formula: formula.to_string(),
                    resolved_formula: Some(resolved),
                    error: None,
                }
            }
            Err(e) => {
                log::warn!("Could not resolve INDIRECT({}): {e}", call.argument);
                IndirectResolution::failed(formula, e)
            }
        }
    }

    /// Evaluate an INDIRECT argument expression to reference text
    pub fn evaluate(&self, argument: &str) -> FormulaResult<String> {
        let expanded = self.replace_link_indices(argument);

        let mut reference = String::new();
        for part in split_concatenation(&expanded) {
            reference.push_str(&self.evaluate_part(&part)?);
        }

        let reference = reference.trim();
        if reference.is_empty() {
            return Err(FormulaError::Indirect(format!(
                "argument '{argument}' evaluated to empty text"
            )));
        }
        Ok(quote_qualifier(reference))
    }

    /// Replace `[n]` link indices with `directory\[file]`
    ///
    /// Unknown indices are left as written.
    fn replace_link_indices(&self, text: &str) -> String {
        if self.links.is_empty() {
            return text.to_string();
        }
        regex_replace_all!(r"\[(\d+)\]", text, |whole: &str, index: &str| {
            match self.links.get(index) {
                Some(path) => {
                    WorkbookPath::join(path.directory(), &format!("[{}]", path.file_name()))
                        .to_string()
                }
                None => {
                    log::debug!("No external link registered for index {index}");
                    whole.to_string()
                }
            }
        })
        .into_owned()
    }

    fn evaluate_part(&self, part: &str) -> FormulaResult<String> {
        if part.len() >= 2 && part.starts_with('"') && part.ends_with('"') {
            return Ok(part[1..part.len() - 1].replace("\"\"", "\""));
        }

        if regex_is_match!(r"^\$?[A-Za-z]{1,3}\$?[0-9]{1,7}$", part) {
            if let Ok(cell) = CellAddress::parse(part) {
                return Ok(match self.lookup.cell_text(&cell) {
                    Some(text) => text,
                    None => {
                        log::debug!("Cell {cell} used by INDIRECT could not be read");
                        String::new()
                    }
                });
            }
        }

        if let Some((_, sign, offset)) =
            regex_captures!(r"^ROW\(\s*\)\s*(?:([+-])\s*([0-9]+))?$"i, part)
        {
            return positional(part, i64::from(self.current_cell.row), sign, offset);
        }
        if let Some((_, sign, offset)) =
            regex_captures!(r"^COLUMN\(\s*\)\s*(?:([+-])\s*([0-9]+))?$"i, part)
        {
            return positional(part, i64::from(self.current_cell.col), sign, offset);
        }

        Ok(part.to_string())
    }
}

/// Apply the `+N` / `-N` offset of a `ROW()` or `COLUMN()` part
fn positional(part: &str, base: i64, sign: &str, offset: &str) -> FormulaResult<String> {
    if offset.is_empty() {
        return Ok(base.to_string());
    }
    let overflow = || FormulaError::Indirect(format!("'{part}' is out of range"));
    let offset: i64 = offset.parse().map_err(|_| overflow())?;
    let value = if sign == "-" {
        base.checked_sub(offset)
    } else {
        base.checked_add(offset)
    };
    value.map(|v| v.to_string()).ok_or_else(overflow)
}

/// Locate the first `INDIRECT(` call outside string literals
///
/// Returns an error when the call's parentheses are not balanced.
pub fn find_indirect(formula: &str) -> FormulaResult<Option<IndirectCall>> {
    const NAME: &[u8] = b"INDIRECT";
    let bytes = formula.as_bytes();

    let mut pos = 0;
    while pos < bytes.len() {
        let b = bytes[pos];
        if b == b'"' {
            pos = skip_quoted(bytes, pos, b'"');
            continue;
        }

        let at_boundary = pos == 0 || !is_name_byte(bytes[pos - 1]);
        if at_boundary
            && bytes.len() - pos >= NAME.len()
            && bytes[pos..pos + NAME.len()].eq_ignore_ascii_case(NAME)
        {
            let mut open = pos + NAME.len();
            while open < bytes.len() && bytes[open].is_ascii_whitespace() {
                open += 1;
            }
            if bytes.get(open) == Some(&b'(') {
                let close = matching_paren(bytes, open).ok_or_else(|| {
                    FormulaError::Indirect("unbalanced parentheses in INDIRECT call".to_string())
                })?;
                let argument = first_argument(&formula[open + 1..close]);
                return Ok(Some(IndirectCall {
                    span: pos..close + 1,
                    argument: argument.trim().to_string(),
                }));
            }
        }
        pos += 1;
    }

    Ok(None)
}

/// Split an expression on `&` operators outside quotes and parentheses
pub fn split_concatenation(expression: &str) -> Vec<String> {
    let bytes = expression.as_bytes();
    let mut parts = Vec::new();
    let mut start = 0;
    let mut depth = 0usize;
    let mut pos = 0;

    while pos < bytes.len() {
        match bytes[pos] {
            quote @ (b'"' | b'\'') => {
                pos = skip_quoted(bytes, pos, quote);
                continue;
            }
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            b'&' if depth == 0 => {
                parts.push(expression[start..pos].trim().to_string());
                start = pos + 1;
            }
            _ => {}
        }
        pos += 1;
    }
    parts.push(expression[start..].trim().to_string());

    parts.retain(|p| !p.is_empty());
    parts
}

/// Wrap the sheet qualifier of `reference` in quotes when it contains
/// characters an unquoted qualifier cannot
fn quote_qualifier(reference: &str) -> String {
    let Some((qualifier, location)) = reference.rsplit_once('!') else {
        return reference.to_string();
    };
    if qualifier.starts_with('\'') {
        return reference.to_string();
    }
    let needs_quotes = qualifier.chars().any(|c| {
        !(c.is_alphanumeric() || matches!(c, '_' | '.' | '[' | ']' | '\\' | '/' | ':'))
    });
    if needs_quotes {
        format!("'{}'!{location}", qualifier.replace('\'', "''"))
    } else {
        reference.to_string()
    }
}

/// First top-level argument of an argument list
fn first_argument(arguments: &str) -> &str {
    let bytes = arguments.as_bytes();
    let mut depth = 0usize;
    let mut pos = 0;
    while pos < bytes.len() {
        match bytes[pos] {
            quote @ (b'"' | b'\'') => {
                pos = skip_quoted(bytes, pos, quote);
                continue;
            }
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            b',' | b';' if depth == 0 => return &arguments[..pos],
            _ => {}
        }
        pos += 1;
    }
    arguments
}

/// Position of the `)` closing the `(` at `open`
fn matching_paren(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut pos = open;
    while pos < bytes.len() {
        match bytes[pos] {
            quote @ (b'"' | b'\'') => {
                pos = skip_quoted(bytes, pos, quote);
                continue;
            }
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(pos);
                }
            }
            _ => {}
        }
        pos += 1;
    }
    None
}

/// Position just past the quoted section opened at `open`
fn skip_quoted(bytes: &[u8], open: usize, quote: u8) -> usize {
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

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'.'
}
