//! Conversion between workbook cells and the string-based row model.

use crate::cell::{format_number, CellValue};
use crate::engine::{NativeValue, RowData};

/// A decoded row: one string per column
pub type Row = Vec<String>;

/// Longest text a single xlsx cell can hold, in characters
pub const MAX_TEXT_LENGTH: usize = 32_767;

/// Maps native cell content to canonical strings and caller values to cells.
pub struct RowCodec;

impl RowCodec {
    /// Canonical string of one stored cell
    pub(crate) fn decode_value(value: &NativeValue) -> String {
        match value {
            NativeValue::Text(s) | NativeValue::Formula(s) => s.clone(),
            NativeValue::Number(n) => format_number(*n),
            NativeValue::Boolean(b) => b.to_string(),
            NativeValue::Error | NativeValue::Blank => String::new(),
        }
    }

    /// Decode a stored row, filling gaps and padding to `expected_columns`
    pub(crate) fn decode_row(row: &RowData, expected_columns: usize) -> Row {
        let mut values: Row = row
            .cells
            .iter()
            .map(|cell| {
                cell.as_ref()
                    .map(|c| Self::decode_value(&c.value))
                    .unwrap_or_default()
            })
            .collect();

        if values.len() < expected_columns {
            values.resize(expected_columns, String::new());
        }
        values
    }

    /// A row is empty when every value is the empty string
    #[must_use]
    pub fn is_empty_row(row: &[String]) -> bool {
        row.iter().all(String::is_empty)
    }

    /// Turn caller values into the cells to write.
    ///
    /// Text longer than [`MAX_TEXT_LENGTH`] is spread over several cells, so
    /// the result can be longer than the input.
    #[must_use]
    pub fn encode(values: &[CellValue]) -> Vec<CellValue> {
        let mut cells = Vec::with_capacity(values.len());
        for value in values {
            match value {
                CellValue::Text(text) => {
                    cells.extend(Self::split_text(text).into_iter().map(CellValue::Text));
                }
                other => cells.push(other.clone()),
            }
        }
        cells
    }

    /// Split a text into chunks of at most [`MAX_TEXT_LENGTH`] characters.
    ///
    /// Each cut happens at the last space inside the limit, and that space is
    /// dropped. Without a space the text is cut hard at the limit.
    #[must_use]
    pub fn split_text(text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut rest = text;

        // `nth(MAX_TEXT_LENGTH)` exists only while the rest is too long
        while let Some((limit, _)) = rest.char_indices().nth(MAX_TEXT_LENGTH) {
            let candidate = &rest[..limit];
            match candidate.rfind(' ') {
                Some(space) => {
                    chunks.push(candidate[..space].to_string());
                    rest = &rest[space + 1..];
                }
                None => {
                    chunks.push(candidate.to_string());
                    rest = &rest[limit..];
                }
            }
        }

        chunks.push(rest.to_string());
        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::NativeCell;

    #[test]
    fn test_decode_values() {
        assert_eq!(RowCodec::decode_value(&NativeValue::Text("Text".into())), "Text");
        assert_eq!(RowCodec::decode_value(&NativeValue::Number(1.0)), "1.0");
        assert_eq!(RowCodec::decode_value(&NativeValue::Number(-13.5)), "-13.5");
        assert_eq!(RowCodec::decode_value(&NativeValue::Boolean(true)), "true");
        assert_eq!(RowCodec::decode_value(&NativeValue::Formula("3+2".into())), "3+2");
        assert_eq!(RowCodec::decode_value(&NativeValue::Error), "");
        assert_eq!(RowCodec::decode_value(&NativeValue::Blank), "");
    }

    #[test]
    fn test_decode_row_fills_gaps_and_pads() {
        let mut row = RowData::new(1);
        row.set_cell(0, NativeCell::new(NativeValue::Text("Value 1".into())));
        row.set_cell(2, NativeCell::new(NativeValue::Text("Value 3".into())));

        assert_eq!(RowCodec::decode_row(&row, 4), vec!["Value 1", "", "Value 3", ""]);
        assert_eq!(RowCodec::decode_row(&row, 1), vec!["Value 1", "", "Value 3"]);
    }

    #[test]
    fn test_empty_row() {
        assert!(RowCodec::is_empty_row(&[]));
        assert!(RowCodec::is_empty_row(&[String::new(), String::new()]));
        assert!(!RowCodec::is_empty_row(&[String::new(), "x".to_string()]));
    }

    #[test]
    fn test_encode_keeps_short_values() {
        let values = vec![
            CellValue::from("A"),
            CellValue::from(13),
            CellValue::Blank,
            CellValue::from(false),
        ];
        assert_eq!(RowCodec::encode(&values), values);
        assert!(RowCodec::encode(&[]).is_empty());
    }

    #[test]
    fn test_split_without_space() {
        let text = "a".repeat(MAX_TEXT_LENGTH + 200);
        let chunks = RowCodec::split_text(&text);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), MAX_TEXT_LENGTH);
        assert_eq!(chunks[1].len(), 200);
    }

    #[test]
    fn test_split_at_last_space() {
        let head = "b".repeat(MAX_TEXT_LENGTH - 10);
        let text = format!("{head} {}", "c".repeat(100));
        let chunks = RowCodec::split_text(&text);

        assert_eq!(chunks, vec![head, "c".repeat(100)]);
    }

    #[test]
    fn test_split_preserves_length() {
        let text = "word ".repeat(MAX_TEXT_LENGTH / 2);
        let length = text.chars().count();
        let chunks = RowCodec::split_text(&text);

        assert!(chunks.len() >= length.div_ceil(MAX_TEXT_LENGTH));
        assert!(chunks.iter().all(|c| c.chars().count() <= MAX_TEXT_LENGTH));
        // Every cut consumed exactly one space
        let total: usize = chunks.iter().map(|c| c.chars().count()).sum();
        assert_eq!(total + chunks.len() - 1, length);
    }

    #[test]
    fn test_split_counts_characters_not_bytes() {
        let text = "ä".repeat(MAX_TEXT_LENGTH);
        assert_eq!(RowCodec::split_text(&text).len(), 1);

        let longer = "ä".repeat(MAX_TEXT_LENGTH + 1);
        let chunks = RowCodec::split_text(&longer);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1], "ä");
    }

    #[test]
    fn test_encode_splits_only_text() {
        let values = vec![CellValue::from("x".repeat(MAX_TEXT_LENGTH + 1)), CellValue::from(1.5)];
        let cells = RowCodec::encode(&values);
        assert_eq!(cells.len(), 3);
        assert_eq!(cells[2], CellValue::Number(1.5));
    }
}
