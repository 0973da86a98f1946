//! Cell reader contract
//!
//! Exploration never opens workbook files itself. It asks a [`CellReader`] for
//! one cell at a time, so the same engine runs against xlsx parsers, live
//! spreadsheet applications, or the in-memory [`MemoryReader`].

use crate::{Error, Result};
use ahash::AHashMap;
use depsheet_core::{CellAddress, WorkbookPath};
use depsheet_formula::LinkTable;

/// What kind of content a cell holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CellKind {
    Value,
    Formula,
    /// The reader could not classify the cell; treated as a value
    Unknown,
}

/// Raw content of one cell as reported by a reader
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellContent {
    pub kind: CellKind,
    /// Formula text, starting with `=`, for formula cells
    pub formula: Option<String>,
    /// The value as displayed by the spreadsheet application
    pub display_value: String,
    /// The last calculated value, if the reader knows it
    pub calculated_value: Option<String>,
}

impl CellContent {
    /// A constant cell
    pub fn value<S: Into<String>>(value: S) -> Self {
        let value = value.into();
        Self {
            kind: CellKind::Value,
            formula: None,
            calculated_value: Some(value.clone()),
            display_value: value,
        }
    }

    /// A formula cell with its cached result
    ///
    /// A missing leading `=` is added.
    pub fn formula<F: Into<String>, V: Into<String>>(formula: F, cached: V) -> Self {
        let formula = formula.into();
        let formula = if formula.starts_with('=') {
            formula
        } else {
            format!("={formula}")
        };
        let cached = cached.into();
        Self {
            kind: CellKind::Formula,
            formula: Some(formula),
            calculated_value: Some(cached.clone()),
            display_value: cached,
        }
    }

    /// An empty cell
    pub fn empty() -> Self {
        Self {
            kind: CellKind::Value,
            formula: None,
            display_value: String::new(),
            calculated_value: None,
        }
    }

    pub fn is_formula(&self) -> bool {
        self.kind == CellKind::Formula && self.formula.is_some()
    }
}

/// Source of cell contents for an exploration
pub trait CellReader {
    /// Read one cell
    ///
    /// Errors become error nodes in the tree; they never abort exploration.
    fn read_cell(
        &self,
        workbook: &WorkbookPath,
        sheet: &str,
        cell: &CellAddress,
    ) -> Result<CellContent>;

    /// External link table of `workbook`, used to resolve `[n]` indices in INDIRECT arguments
    fn external_links(&self, _workbook: &WorkbookPath) -> LinkTable {
        LinkTable::new()
    }
}

impl<R: CellReader + ?Sized> CellReader for &R {
    fn read_cell(
        &self,
        workbook: &WorkbookPath,
        sheet: &str,
        cell: &CellAddress,
    ) -> Result<CellContent> {
        (**self).read_cell(workbook, sheet, cell)
    }

    fn external_links(&self, workbook: &WorkbookPath) -> LinkTable {
        (**self).external_links(workbook)
    }
}

#[derive(Debug, Clone, Default)]
struct MemoryWorkbook {
    sheets: AHashMap<String, AHashMap<CellAddress, CellContent>>,
    links: LinkTable,
}

/// A [`CellReader`] over workbooks held in memory
///
/// Cells that were never set read as empty values, as in a spreadsheet.
/// Workbooks are looked up by normalized path, so `C:/data/Book.xlsx` and
/// `C:\data\Book.xlsx` name the same workbook.
///
/// # Example
///
/// ```rust
/// use depsheet::{CellReader, MemoryReader};
/// use depsheet_core::{CellAddress, WorkbookPath};
///
/// let mut reader = MemoryReader::new();
/// reader.set_value("Book.xlsx", "Sheet1", "A1", "10").unwrap();
/// reader.set_formula("Book.xlsx", "Sheet1", "B1", "=A1*2", "20").unwrap();
///
/// let cell = reader
///     .read_cell(&WorkbookPath::new("Book.xlsx"), "Sheet1", &CellAddress::parse("B1").unwrap())
///     .unwrap();
/// assert_eq!(cell.formula.as_deref(), Some("=A1*2"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryReader {
    workbooks: AHashMap<String, MemoryWorkbook>,
}

impl MemoryReader {
    pub fn new() -> Self {
        Self::default()
    }

    fn workbook_mut(&mut self, workbook: WorkbookPath) -> &mut MemoryWorkbook {
        self.workbooks.entry(workbook.normalized()).or_default()
    }

    /// Create an empty sheet (and its workbook, if needed)
    pub fn add_sheet<W: Into<WorkbookPath>>(&mut self, workbook: W, sheet: &str) {
        self.workbook_mut(workbook.into())
            .sheets
            .entry(sheet.to_string())
            .or_default();
    }

    /// Store arbitrary content at an A1 address
    pub fn set_cell<W: Into<WorkbookPath>>(
        &mut self,
        workbook: W,
        sheet: &str,
        address: &str,
        content: CellContent,
    ) -> Result<()> {
        let cell = CellAddress::parse(address)?;
        self.workbook_mut(workbook.into())
            .sheets
            .entry(sheet.to_string())
            .or_default()
            .insert(cell, content);
        Ok(())
    }

    /// Store a constant value
    pub fn set_value<W: Into<WorkbookPath>, V: Into<String>>(
        &mut self,
        workbook: W,
        sheet: &str,
        address: &str,
        value: V,
    ) -> Result<()> {
        self.set_cell(workbook, sheet, address, CellContent::value(value))
    }

    /// Store a formula with its cached result
    pub fn set_formula<W: Into<WorkbookPath>, F: Into<String>, V: Into<String>>(
        &mut self,
        workbook: W,
        sheet: &str,
        address: &str,
        formula: F,
        cached: V,
    ) -> Result<()> {
        self.set_cell(workbook, sheet, address, CellContent::formula(formula, cached))
    }

    /// Register external link `index` of `workbook` as pointing at `target`
    pub fn add_external_link<W: Into<WorkbookPath>>(
        &mut self,
        workbook: W,
        index: &str,
        target: &str,
    ) {
        self.workbook_mut(workbook.into()).links.insert(index, target);
    }
}

impl CellReader for MemoryReader {
    fn read_cell(
        &self,
        workbook: &WorkbookPath,
        sheet: &str,
        cell: &CellAddress,
    ) -> Result<CellContent> {
        let book = self
            .workbooks
            .get(&workbook.normalized())
            .ok_or_else(|| Error::WorkbookNotFound(workbook.to_string()))?;
        let cells = book.sheets.get(sheet).ok_or_else(|| Error::SheetNotFound {
            workbook: workbook.to_string(),
            sheet: sheet.to_string(),
        })?;
        Ok(cells.get(cell).cloned().unwrap_or_else(CellContent::empty))
    }

    fn external_links(&self, workbook: &WorkbookPath) -> LinkTable {
        self.workbooks
            .get(&workbook.normalized())
            .map(|book| book.links.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(a1: &str) -> CellAddress {
        CellAddress::parse(a1).unwrap()
    }

    #[test]
    fn test_read_values_and_formulas() {
        let mut reader = MemoryReader::new();
        reader.set_value("Book.xlsx", "Sheet1", "A1", "10").unwrap();
        reader
            .set_formula("Book.xlsx", "Sheet1", "B1", "A1*2", "20")
            .unwrap();

        let book = WorkbookPath::new("Book.xlsx");
        let a1 = reader.read_cell(&book, "Sheet1", &at("A1")).unwrap();
        assert_eq!(a1.kind, CellKind::Value);
        assert_eq!(a1.display_value, "10");

        let b1 = reader.read_cell(&book, "Sheet1", &at("B1")).unwrap();
        assert!(b1.is_formula());
        assert_eq!(b1.formula.as_deref(), Some("=A1*2"));
        assert_eq!(b1.calculated_value.as_deref(), Some("20"));
    }

    #[test]
    fn test_unset_cell_is_empty() {
        let mut reader = MemoryReader::new();
        reader.add_sheet("Book.xlsx", "Sheet1");
        let cell = reader
            .read_cell(&WorkbookPath::new("Book.xlsx"), "Sheet1", &at("Z99"))
            .unwrap();
        assert_eq!(cell, CellContent::empty());
    }

    #[test]
    fn test_missing_workbook_and_sheet() {
        let mut reader = MemoryReader::new();
        reader.add_sheet("Book.xlsx", "Sheet1");

        let missing_book = reader.read_cell(&WorkbookPath::new("Nope.xlsx"), "Sheet1", &at("A1"));
        assert!(matches!(missing_book, Err(Error::WorkbookNotFound(_))));

        let missing_sheet = reader.read_cell(&WorkbookPath::new("Book.xlsx"), "Sheet9", &at("A1"));
        assert!(matches!(missing_sheet, Err(Error::SheetNotFound { .. })));
    }

    #[test]
    fn test_workbook_lookup_is_normalized() {
        let mut reader = MemoryReader::new();
        reader.set_value(r"C:\data\Book.xlsx", "Sheet1", "A1", "x").unwrap();
        let cell = reader
            .read_cell(&WorkbookPath::new("C:/data/Book.xlsx"), "Sheet1", &at("a1"))
            .unwrap();
        assert_eq!(cell.display_value, "x");
    }

    #[test]
    fn test_invalid_address_is_rejected() {
        let mut reader = MemoryReader::new();
        assert!(reader.set_value("Book.xlsx", "Sheet1", "A0", "x").is_err());
    }

    #[test]
    fn test_external_links() {
        let mut reader = MemoryReader::new();
        reader.add_external_link("Book.xlsx", "1", r"C:\data\Other.xlsx");
        let links = reader.external_links(&WorkbookPath::new("Book.xlsx"));
        assert_eq!(links.get("1").unwrap().as_str(), r"C:\data\Other.xlsx");
        assert!(reader
            .external_links(&WorkbookPath::new("Other.xlsx"))
            .is_empty());
    }
}
