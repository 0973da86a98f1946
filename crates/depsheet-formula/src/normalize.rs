//! Formula text cleanup
//!
//! Cell readers hand back formula text with artifacts of how the workbook
//! stored external paths: doubled backslashes, percent-encoded characters and
//! `''path''` quoting. These are undone before the text is shown or scanned.

use lazy_regex::regex_replace_all;
use percent_encoding::percent_decode_str;

/// Collapse doubled backslashes (`\\` → `\`)
pub fn collapse_separators(formula: &str) -> String {
    formula.replace("\\\\", "\\")
}

/// Full cleanup applied to formula text before it is stored on a node
///
/// 1. doubled backslashes collapse to one;
/// 2. percent-encoded bytes (`%20`) are decoded;
/// 3. `''...''` around a workbook path collapses to `'...'`.
pub fn normalize_formula(formula: &str) -> String {
    let collapsed = collapse_separators(formula);
    let decoded = if collapsed.contains('%') {
        percent_decode_str(&collapsed).decode_utf8_lossy().into_owned()
    } else {
        collapsed
    };

    collapse_doubled_quotes(&decoded)
}

/// Collapse `''path''` quoting to `'path'`
///
/// Only sections that hold a workbook path (a `[`, `\` or `/`) are touched,
/// so escaped quotes in sheet names such as `'Bob''s'` survive.
pub fn collapse_doubled_quotes(formula: &str) -> String {
    regex_replace_all!(r"''([^']*?)''", formula, |whole: &str, inner: &str| {
        if inner.contains('[') || inner.contains('\\') || inner.contains('/') {
            format!("'{inner}'")
        } else {
            whole.to_string()
        }
    })
    .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_separators() {
        assert_eq!(
            collapse_separators(r"='C:\\data\\[Other.xlsx]Sheet1'!B2"),
            r"='C:\data\[Other.xlsx]Sheet1'!B2"
        );
    }

    #[test]
    fn test_percent_decoding() {
        assert_eq!(
            normalize_formula(r"='C:\My%20Files\[Book.xlsx]Sheet1'!A1"),
            r"='C:\My Files\[Book.xlsx]Sheet1'!A1"
        );
        // A trailing percent operator is left alone
        assert_eq!(normalize_formula("=A1*5%"), "=A1*5%");
    }

    #[test]
    fn test_doubled_quotes_around_paths() {
        assert_eq!(
            normalize_formula(r"=''C:\data\[Other.xlsx]Sheet1''!B2"),
            r"='C:\data\[Other.xlsx]Sheet1'!B2"
        );
        // Escaped quotes inside a sheet name are not a path
        assert_eq!(
            normalize_formula("='Bob''s Sheet'!A1+'Ann''s'!B1"),
            "='Bob''s Sheet'!A1+'Ann''s'!B1"
        );
    }
}
