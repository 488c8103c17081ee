// crates/leap-cli/tests/proptest_csv.rs
// ============================================================================
// Module: CSV Property Tests
// Description: Written records parse back to the same fields.
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only assertions and helpers are permitted."
)]

use leap_cli::csv_format::format_record;
use leap_cli::csv_format::parse_records;
use proptest::prelude::*;

proptest! {
    #[test]
    fn written_rows_read_back(
        rows in prop::collection::vec(prop::collection::vec("[ -~\r\n]{0,12}", 2 .. 6), 1 .. 8)
    ) {
        let text: String = rows.iter().map(format_record).collect();
        let parsed = parse_records(&text).unwrap();
        prop_assert_eq!(parsed.len(), rows.len());
        for (record, row) in parsed.iter().zip(&rows) {
            prop_assert_eq!(&record.fields, row);
        }
    }

    #[test]
    fn reader_never_panics(text in "[a-z,\"\r\n ]{0,64}") {
        let _ = parse_records(&text);
    }
}
