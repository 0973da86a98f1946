//! Workbook- and sheet-qualified references
//!
//! Formulas can point into other sheets and other workbook files. The types
//! here carry that qualification alongside a [`CellAddress`] and know how to
//! render it back in the short (`[Book.xlsx]Sheet1!A1`) and full
//! (`'C:\dir\[Book.xlsx]Sheet1'!A1`) forms used by spreadsheet applications.
//!
//! Workbook paths are kept as text rather than [`std::path::PathBuf`]: the
//! paths found inside formulas use the separator convention of the machine
//! that wrote the file, which is not necessarily the one reading it.

use crate::address::{CellAddress, CellRange};
use std::fmt;

/// Path of a workbook file, as written in a formula or supplied by a caller
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct WorkbookPath(String);

impl WorkbookPath {
    /// Wrap a path string
    pub fn new<S: Into<String>>(path: S) -> Self {
        Self(path.into())
    }

    /// Join a directory and a file name using the directory's separator style
    ///
    /// An empty directory yields just the file name.
    pub fn join(directory: &str, file_name: &str) -> Self {
        let directory = directory.trim();
        let file_name = file_name.trim();
        if directory.is_empty() {
            return Self::new(file_name);
        }
        if directory.ends_with(['\\', '/']) {
            return Self::new(format!("{directory}{file_name}"));
        }
        let sep = separator_for(directory);
        Self::new(format!("{directory}{sep}{file_name}"))
    }

    /// The path as written
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The file name component (everything after the last separator)
    pub fn file_name(&self) -> &str {
        self.split().1
    }

    /// The directory component (without a trailing separator)
    pub fn directory(&self) -> &str {
        self.split().0
    }

    fn split(&self) -> (&str, &str) {
        match self.0.rfind(['\\', '/']) {
            Some(pos) => (&self.0[..pos], &self.0[pos + 1..]),
            None => ("", &self.0),
        }
    }

    /// Normalized form used for identity comparisons
    ///
    /// Separators are unified to `\`, repeated separators collapse (except a
    /// leading UNC `\\`), and `.` / `..` segments are resolved lexically.
    pub fn normalized(&self) -> String {
        let unified = self.0.trim().replace('/', "\\");
        let (prefix, rest) = if let Some(rest) = unified.strip_prefix("\\\\") {
            ("\\\\", rest)
        } else if let Some(rest) = unified.strip_prefix('\\') {
            ("\\", rest)
        } else {
            ("", unified.as_str())
        };

        let mut segments: Vec<&str> = Vec::new();
        for segment in rest.split('\\') {
            match segment {
                "" | "." => {}
                ".." => {
                    if matches!(segments.last(), Some(last) if *last != "..") {
                        segments.pop();
                    } else if prefix.is_empty() {
                        segments.push(segment);
                    }
                }
                _ => segments.push(segment),
            }
        }

        format!("{prefix}{}", segments.join("\\"))
    }

    /// Whether two paths name the same workbook after normalization
    pub fn same_workbook(&self, other: &WorkbookPath) -> bool {
        self.normalized() == other.normalized()
    }
}

impl fmt::Display for WorkbookPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkbookPath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for WorkbookPath {
    fn from(path: String) -> Self {
        Self::new(path)
    }
}

fn separator_for(directory: &str) -> char {
    if directory.contains('/') && !directory.contains('\\') {
        '/'
    } else {
        '\\'
    }
}

/// Normalized identity of a cell: `(workbook, sheet, cell)`
///
/// Two references to the same cell produce equal keys no matter how the
/// workbook path or the column letters were spelled.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellKey {
    pub workbook: String,
    pub sheet: String,
    pub row: u32,
    pub col: u16,
}

impl CellKey {
    /// Create a key from its parts, normalizing the workbook path
    pub fn new(workbook: &WorkbookPath, sheet: &str, cell: &CellAddress) -> Self {
        Self {
            workbook: workbook.normalized(),
            sheet: sheet.to_string(),
            row: cell.row,
            col: cell.col,
        }
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}{}",
            self.workbook,
            self.sheet,
            CellAddress::column_to_letters(self.col),
            self.row
        )
    }
}

/// Rendered forms of a reference
///
/// `display` is what a viewer shows by default; `short` and `full` are kept
/// for callers that toggle between the compact and the unambiguous form.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DisplayAddress {
    pub display: String,
    pub short: String,
    pub full: String,
}

impl DisplayAddress {
    /// Render `location` (a cell or range in A1 text) qualified by workbook and sheet
    ///
    /// References into the root workbook render as `sheet!location`. Any other
    /// workbook, or any reference when `force_external` is set, renders as
    /// `[file]sheet!location` with `'directory\[file]sheet'!location` as the
    /// full form.
    pub fn qualified(
        workbook: &WorkbookPath,
        sheet: &str,
        location: &str,
        root: &WorkbookPath,
        force_external: bool,
    ) -> Self {
        if !force_external && workbook.same_workbook(root) {
            let local = format!("{sheet}!{location}");
            return Self {
                display: local.clone(),
                short: local.clone(),
                full: local,
            };
        }

        let file_name = workbook.file_name();
        let short = format!("[{file_name}]{sheet}!{location}");

        let directory = workbook.directory();
        let quoted_sheet = sheet.replace('\'', "''");
        let full = if directory.is_empty() {
            format!("'[{file_name}]{quoted_sheet}'!{location}")
        } else {
            let sep = separator_for(directory);
            format!("'{directory}{sep}[{file_name}]{quoted_sheet}'!{location}")
        };

        Self {
            display: short.clone(),
            short,
            full,
        }
    }
}

impl fmt::Display for DisplayAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

/// A reference to a single cell in a specific workbook and sheet
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellRef {
    pub workbook: WorkbookPath,
    pub sheet: String,
    pub cell: CellAddress,
}

impl CellRef {
    /// Create a new cell reference
    pub fn new<S: Into<String>>(workbook: WorkbookPath, sheet: S, cell: CellAddress) -> Self {
        Self {
            workbook,
            sheet: sheet.into(),
            cell,
        }
    }

    /// The normalized identity of the referenced cell
    pub fn key(&self) -> CellKey {
        CellKey::new(&self.workbook, &self.sheet, &self.cell)
    }

    /// Render relative to the root workbook of an exploration
    pub fn display(&self, root: &WorkbookPath) -> DisplayAddress {
        DisplayAddress::qualified(
            &self.workbook,
            &self.sheet,
            &self.cell.to_a1_string(),
            root,
            false,
        )
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.workbook, self.sheet, self.cell)
    }
}

/// A reference to a rectangular range in a specific workbook and sheet
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RangeRef {
    pub workbook: WorkbookPath,
    pub sheet: String,
    pub range: CellRange,
}

impl RangeRef {
    /// Create a new range reference; the range is normalized top-left to bottom-right
    pub fn new<S: Into<String>>(workbook: WorkbookPath, sheet: S, range: CellRange) -> Self {
        Self {
            workbook,
            sheet: sheet.into(),
            range: CellRange::new(range.start, range.end),
        }
    }

    /// Number of cells covered: `rows * cols`
    pub fn size(&self) -> u64 {
        self.range.cell_count()
    }

    /// Every cell of the range as a [`CellRef`], in row-major order
    pub fn cell_refs(&self) -> impl Iterator<Item = CellRef> + '_ {
        self.range
            .cells()
            .map(move |cell| CellRef::new(self.workbook.clone(), self.sheet.clone(), cell))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn a(s: &str) -> CellAddress {
        CellAddress::parse(s).unwrap()
    }

    #[test]
    fn test_workbook_path_components() {
        let path = WorkbookPath::new(r"C:\data\Other.xlsx");
        assert_eq!(path.file_name(), "Other.xlsx");
        assert_eq!(path.directory(), r"C:\data");

        let path = WorkbookPath::new("/srv/books/Main.xlsx");
        assert_eq!(path.file_name(), "Main.xlsx");
        assert_eq!(path.directory(), "/srv/books");

        let path = WorkbookPath::new("Main.xlsx");
        assert_eq!(path.file_name(), "Main.xlsx");
        assert_eq!(path.directory(), "");
    }

    #[test]
    fn test_workbook_path_join() {
        assert_eq!(
            WorkbookPath::join(r"C:\data", "Other.xlsx").as_str(),
            r"C:\data\Other.xlsx"
        );
        assert_eq!(
            WorkbookPath::join(r"C:\data\", "Other.xlsx").as_str(),
            r"C:\data\Other.xlsx"
        );
        assert_eq!(
            WorkbookPath::join("/srv/books", "Other.xlsx").as_str(),
            "/srv/books/Other.xlsx"
        );
        assert_eq!(WorkbookPath::join("", "Other.xlsx").as_str(), "Other.xlsx");
    }

    #[test]
    fn test_workbook_path_normalized() {
        let a = WorkbookPath::new(r"C:\data\\sub\..\Main.xlsx");
        let b = WorkbookPath::new("C:/data/./Main.xlsx");
        assert_eq!(a.normalized(), r"C:\data\Main.xlsx");
        assert!(a.same_workbook(&b));

        let unc = WorkbookPath::new(r"\\server\share\Book.xlsx");
        assert_eq!(unc.normalized(), r"\\server\share\Book.xlsx");
    }

    #[test]
    fn test_cell_key_identity() {
        let one = CellRef::new(WorkbookPath::new(r"C:\data\Main.xlsx"), "Sheet1", a("a1"));
        let two = CellRef::new(WorkbookPath::new("C:/data//Main.xlsx"), "Sheet1", a("$A$1"));
        assert_eq!(one.key(), two.key());
        assert_eq!(one.key().to_string(), r"C:\data\Main.xlsx|Sheet1|A1");

        let other_sheet = CellRef::new(WorkbookPath::new(r"C:\data\Main.xlsx"), "Sheet2", a("A1"));
        assert!(one.key() != other_sheet.key());
    }

    #[test]
    fn test_display_same_workbook() {
        let root = WorkbookPath::new(r"C:\data\Main.xlsx");
        let local = CellRef::new(root.clone(), "Sheet1", a("B2"));
        let shown = local.display(&root);
        assert_eq!(shown.display, "Sheet1!B2");
        assert_eq!(shown.short, "Sheet1!B2");
        assert_eq!(shown.full, "Sheet1!B2");
    }

    #[test]
    fn test_display_external_workbook() {
        let root = WorkbookPath::new(r"C:\data\Main.xlsx");
        let other = CellRef::new(WorkbookPath::new(r"C:\data\Other.xlsx"), "Sheet1", a("B2"));
        let shown = other.display(&root);
        assert_eq!(shown.display, "[Other.xlsx]Sheet1!B2");
        assert_eq!(shown.short, "[Other.xlsx]Sheet1!B2");
        assert_eq!(shown.full, r"'C:\data\[Other.xlsx]Sheet1'!B2");
    }

    #[test]
    fn test_display_forced_external_for_root() {
        let root = WorkbookPath::new(r"C:\data\Main.xlsx");
        let shown = DisplayAddress::qualified(&root, "Data Sheet", "A1", &root, true);
        assert_eq!(shown.display, "[Main.xlsx]Data Sheet!A1");
        assert_eq!(shown.full, r"'C:\data\[Main.xlsx]Data Sheet'!A1");
    }

    #[test]
    fn test_range_ref_cells() {
        let range = RangeRef::new(
            WorkbookPath::new("Book.xlsx"),
            "Sheet1",
            CellRange::parse("B2:A1").unwrap(),
        );
        assert_eq!(range.size(), 4);
        let cells: Vec<String> = range.cell_refs().map(|c| c.cell.to_string()).collect();
        assert_eq!(cells, vec!["A1", "B1", "A2", "B2"]);
    }
}
