//! Column layout of the intake sheet. Positions are a compatibility contract
//! with everyone reading the spreadsheet; do not renumber.

use flexscan_core::{NewRecord, RecordField};

/// Rightmost column the bot writes to.
pub const LAST_COLUMN: u32 = 19;

/// 1-based column index of a field.
pub fn column(field: RecordField) -> u32 {
    match field {
        RecordField::Timestamp => 1,  // A
        RecordField::Booking => 5,    // E
        RecordField::Container => 6,  // F
        RecordField::Flex => 11,      // K
        RecordField::Beams => 14,     // N
        RecordField::Addons => 15,    // O
        RecordField::Sheets => 16,    // P
        RecordField::Submitter => 18, // R
        RecordField::Review => 19,    // S
    }
}

/// Spreadsheet column letters for a 1-based index (1 → A, 27 → AA).
pub fn column_letter(index: u32) -> String {
    let mut n = index;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Quote a tab name for A1 notation; embedded quotes are doubled.
pub fn quote_tab(tab: &str) -> String {
    format!("'{}'", tab.replace('\'', "''"))
}

/// A1 reference of one cell, e.g. `'Sheet1'!F12`.
pub fn cell_a1(tab: &str, row: u32, field: RecordField) -> String {
    format!("{}!{}{}", quote_tab(tab), column_letter(column(field)), row)
}

/// A1 reference of a whole column, e.g. `'Sheet1'!E:E`.
pub fn column_a1(tab: &str, field: RecordField) -> String {
    let letter = column_letter(column(field));
    format!("{}!{letter}:{letter}", quote_tab(tab))
}

/// A1 range covering every column the bot writes.
pub fn table_a1(tab: &str) -> String {
    format!("{}!A:{}", quote_tab(tab), column_letter(LAST_COLUMN))
}

/// Positional cells of a freshly created record, up to the submitter column.
pub fn row_values(record: &NewRecord) -> Vec<String> {
    let mut cells = vec![String::new(); column(RecordField::Submitter) as usize];
    let mut put = |field: RecordField, value: &str| {
        cells[column(field) as usize - 1] = value.to_string();
    };
    put(RecordField::Timestamp, &record.timestamp_text());
    put(RecordField::Booking, &record.booking);
    put(RecordField::Submitter, &record.submitter);
    cells
}

/// Row number from an A1 range returned by the API, e.g. `Sheet1!A42:S42` → 42.
pub fn row_of_range(range: &str) -> Option<u32> {
    let cells = range.rsplit_once('!').map_or(range, |(_, cells)| cells);
    let first = cells.split(':').next()?;
    let digits: String = first.chars().skip_while(|c| c.is_ascii_alphabetic()).collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn column_letters() {
        assert_eq!(column_letter(1), "A");
        assert_eq!(column_letter(6), "F");
        assert_eq!(column_letter(26), "Z");
        assert_eq!(column_letter(27), "AA");
        assert_eq!(column_letter(LAST_COLUMN), "S");
    }

    #[test]
    fn a1_references_quote_tab() {
        assert_eq!(cell_a1("FLEX", 12, RecordField::Container), "'FLEX'!F12");
        assert_eq!(column_a1("Yard 2", RecordField::Booking), "'Yard 2'!E:E");
        assert_eq!(table_a1("it's"), "'it''s'!A:S");
    }

    #[test]
    fn new_row_is_positional() {
        let record = NewRecord {
            timestamp: NaiveDate::from_ymd_opt(2025, 3, 1)
                .unwrap()
                .and_hms_opt(9, 5, 0)
                .unwrap(),
            booking: "BKG-0042".into(),
            submitter: "yard_op".into(),
        };
        let cells = row_values(&record);
        assert_eq!(cells.len(), 18);
        assert_eq!(cells[0], "2025-03-01 09:05");
        assert_eq!(cells[4], "BKG-0042");
        assert_eq!(cells[17], "yard_op");
        assert!(cells[5].is_empty());
    }

    #[test]
    fn row_parsed_from_updated_range() {
        assert_eq!(row_of_range("Sheet1!A42:S42"), Some(42));
        assert_eq!(row_of_range("'Yard 2'!A7:R7"), Some(7));
        assert_eq!(row_of_range("Sheet1!A:S"), None);
    }
}
