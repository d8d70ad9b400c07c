use crate::book::SharedBook;
use crate::codec::{Row, RowCodec};
use crate::engine::SheetId;
use crate::group::{Group, GroupExtractor};
use std::cell::OnceCell;
use std::cmp::Reverse;

/// Sequential reader over the rows of one sheet.
///
/// Rows are decoded to strings: numbers in canonical form (`1.0`), booleans as
/// `true`/`false`, formulas as their source text, blanks and errors as `""`.
/// Every row is padded with empty strings up to the width of the first row.
///
/// Once the document is closed the reader behaves as if the sheet had no more
/// rows.
#[derive(Debug)]
pub struct SheetReader {
    book: SharedBook,
    sheet: SheetId,
    sheet_name: String,
    ignore_empty_rows: bool,
    /// Position in the physical rows of the sheet
    cursor: usize,
    line_number: u32,
    expected_columns: Option<usize>,
    groups: OnceCell<Vec<Group>>,
}

impl SheetReader {
    pub(crate) fn new(
        book: SharedBook,
        sheet: SheetId,
        sheet_name: &str,
        ignore_empty_rows: bool,
    ) -> Self {
        SheetReader {
            book,
            sheet,
            sheet_name: sheet_name.to_string(),
            ignore_empty_rows,
            cursor: 0,
            line_number: 0,
            expected_columns: None,
            groups: OnceCell::new(),
        }
    }

    /// Name of the sheet this reader reads
    #[must_use]
    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    /// Read the next row, or `None` at the end of the sheet
    pub fn read_next_row(&mut self) -> Option<Row> {
        let state = self.book.lock();
        let sheet = state.sheet(self.sheet)?;
        let columns = *self
            .expected_columns
            .get_or_insert_with(|| sheet.column_count());

        while let Some(row) = sheet.rows.get(self.cursor) {
            self.cursor += 1;
            let values = RowCodec::decode_row(row, columns);
            if self.ignore_empty_rows && RowCodec::is_empty_row(&values) {
                continue;
            }
            self.line_number += 1;
            return Some(values);
        }
        None
    }

    /// Read all remaining rows
    pub fn read_full(&mut self) -> Vec<Row> {
        std::iter::from_fn(|| self.read_next_row()).collect()
    }

    /// Number of rows returned since the reader was created or rewound
    #[must_use]
    pub fn get_line_number(&self) -> u32 {
        self.line_number
    }

    /// Rewind to the first row. The reader can be used again afterwards.
    pub fn close(&mut self) {
        self.cursor = 0;
        self.line_number = 0;
        self.expected_columns = None;
    }

    /// All row groups of the sheet, computed on first use.
    ///
    /// Indices refer to the rows this reader returns, so with
    /// `ignore_empty_rows` they skip the empty rows as well. Independent of
    /// the current read position.
    pub fn get_grouped_rows(&self) -> &[Group] {
        self.groups.get_or_init(|| self.extract_groups())
    }

    /// Groups containing `row_index`, innermost first
    #[must_use]
    pub fn get_row_groups(&self, row_index: u32) -> Vec<Group> {
        let mut groups: Vec<Group> = self
            .get_grouped_rows()
            .iter()
            .filter(|group| group.contains(row_index))
            .copied()
            .collect();
        groups.sort_by_key(|group| (Reverse(group.start_index()), group.end_index()));
        groups
    }

    fn extract_groups(&self) -> Vec<Group> {
        let state = self.book.lock();
        let Some(sheet) = state.sheet(self.sheet) else {
            return Vec::new();
        };

        let mut extractor = GroupExtractor::new();
        let mut retained = 0;
        for row in &sheet.rows {
            if self.ignore_empty_rows && RowCodec::is_empty_row(&RowCodec::decode_row(row, 0)) {
                continue;
            }
            extractor.push(row.outline_level);
            retained += 1;
        }

        let groups = extractor.finish(retained);
        tracing::debug!(
            "Found {} row group(s) in sheet '{}'",
            groups.len(),
            self.sheet_name
        );
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::TableDocument;
    use crate::cell::CellValue;
    use tempfile::tempdir;

    fn build(rows: &[&[&str]]) -> (tempfile::TempDir, TableDocument) {
        let dir = tempdir().unwrap();
        let book = TableDocument::open(dir.path().join("reader.xlsx"), false).unwrap();
        let mut writer = book.get_writer("Data").unwrap();
        for row in rows {
            let values: Vec<CellValue> = row.iter().map(|v| CellValue::from(*v)).collect();
            writer.write_row(&values).unwrap();
        }
        writer.close().unwrap();
        (dir, book)
    }

    #[test]
    fn test_read_pads_to_first_row() {
        let (_dir, book) = build(&[&["a", "b", "c"], &["d"]]);
        let mut reader = book.get_reader("Data").unwrap();

        assert_eq!(reader.read_next_row(), Some(vec!["a".into(), "b".into(), "c".into()]));
        assert_eq!(reader.read_next_row(), Some(vec!["d".into(), String::new(), String::new()]));
        assert_eq!(reader.read_next_row(), None);
        assert_eq!(reader.get_line_number(), 2);
    }

    #[test]
    fn test_close_rewinds() {
        let (_dir, book) = build(&[&["a"], &["b"]]);
        let mut reader = book.get_reader("Data").unwrap();

        let first = reader.read_full();
        reader.close();
        assert_eq!(reader.get_line_number(), 0);
        assert_eq!(reader.read_full(), first);
    }

    #[test]
    fn test_row_groups_innermost_first() {
        let (_dir, book) = build(&[&["0"], &["1"], &["2"], &["3"], &["4"], &["5"]]);
        {
            let mut writer = book.get_writer("Grouped").unwrap();
            for i in 0..6 {
                writer.write_row(&[CellValue::from(i)]).unwrap();
            }
            writer.group_rows(1, 5).unwrap();
            writer.group_rows(1, 2).unwrap();
            writer.group_rows(4, 4).unwrap();
            writer.close().unwrap();
        }

        let reader = book.get_reader("Grouped").unwrap();
        let groups: Vec<String> = reader.get_row_groups(1).iter().map(ToString::to_string).collect();
        assert_eq!(groups, vec!["[1;2]", "[1;5]"]);
        assert!(reader.get_row_groups(0).is_empty());
        assert_eq!(reader.get_grouped_rows().len(), 3);
    }

    #[test]
    fn test_reader_ends_after_document_close() {
        let (_dir, mut book) = build(&[&["a"]]);
        let mut reader = book.get_reader("Data").unwrap();
        book.close().unwrap();

        assert_eq!(reader.read_next_row(), None);
        assert!(reader.get_grouped_rows().is_empty());
    }
}
