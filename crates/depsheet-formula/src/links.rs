//! External link table
//!
//! Workbooks store external references as indices (`[1]Sheet1!A1`) into a
//! list of linked files. The cell reader that opened the workbook knows that
//! list; this type carries it to the INDIRECT resolver.

use depsheet_core::WorkbookPath;
use percent_encoding::percent_decode_str;
use std::collections::BTreeMap;

/// Mapping from external link index (`"1"`, `"2"`, ...) to workbook path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkTable {
    links: BTreeMap<String, WorkbookPath>,
}

impl LinkTable {
    /// Create an empty link table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a link target
    ///
    /// `file:///` and `file://` prefixes are stripped and percent-encoded
    /// characters decoded, since link targets are stored as URLs.
    pub fn insert<S: Into<String>>(&mut self, index: S, target: &str) {
        self.links.insert(index.into(), clean_link_target(target));
    }

    /// Look up the workbook path for a link index
    pub fn get(&self, index: &str) -> Option<&WorkbookPath> {
        self.links.get(index)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Iterate over `(index, path)` pairs in index order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &WorkbookPath)> {
        self.links.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: AsRef<str>> FromIterator<(K, V)> for LinkTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = LinkTable::new();
        for (index, target) in iter {
            table.insert(index, target.as_ref());
        }
        table
    }
}

fn clean_link_target(target: &str) -> WorkbookPath {
    let decoded = percent_decode_str(target.trim()).decode_utf8_lossy();
    let path = decoded
        .strip_prefix("file:///")
        .or_else(|| decoded.strip_prefix("file://"))
        .unwrap_or(decoded.as_ref());
    WorkbookPath::new(path)
}
