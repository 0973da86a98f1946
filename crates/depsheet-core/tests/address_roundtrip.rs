//! Property tests for A1 address parsing and formatting

use depsheet_core::{format_address, parse_address, CellAddress, CellRange, MAX_COLS, MAX_ROWS};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 512,
        failure_persistence: None,
        .. ProptestConfig::default()
    })]

    #[test]
    fn format_then_parse_is_lossless(row in 1u32..=MAX_ROWS, col in 1u16..=MAX_COLS) {
        let addr = CellAddress::new(row, col).unwrap();
        let text = format_address(&addr);
        prop_assert_eq!(parse_address(&text).unwrap(), addr);
    }

    #[test]
    fn parse_then_format_is_lossless(letters in "[A-Z]{1,3}", row in 1u32..=MAX_ROWS) {
        let text = format!("{letters}{row}");
        match parse_address(&text) {
            Ok(addr) => prop_assert_eq!(format_address(&addr), text),
            // Three-letter columns past XFD are out of bounds
            Err(_) => prop_assert!(CellAddress::letters_to_column(&letters).is_err()),
        }
    }

    #[test]
    fn lowercase_letters_parse_to_same_cell(letters in "[a-z]{1,2}", row in 1u32..=9999) {
        let lower = parse_address(&format!("{letters}{row}")).unwrap();
        let upper = parse_address(&format!("{}{row}", letters.to_ascii_uppercase())).unwrap();
        prop_assert_eq!(lower, upper);
    }

    #[test]
    fn range_cell_count_matches_iteration(
        r1 in 1u32..=40, c1 in 1u16..=40, r2 in 1u32..=40, c2 in 1u16..=40
    ) {
        let range = CellRange::new(
            CellAddress::new(r1, c1).unwrap(),
            CellAddress::new(r2, c2).unwrap(),
        );
        prop_assert_eq!(range.cells().count() as u64, range.cell_count());
        prop_assert!(range.start.row <= range.end.row);
        prop_assert!(range.start.col <= range.end.col);
    }
}

#[test]
fn rejects_out_of_bounds_text() {
    assert!(parse_address("A0").is_err());
    assert!(parse_address("A1048577").is_err());
    assert!(parse_address("XFE1").is_err());
    assert!(parse_address("AAAA1").is_err());
    assert!(parse_address("A-1").is_err());
}
