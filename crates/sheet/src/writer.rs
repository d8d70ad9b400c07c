use crate::book::SharedBook;
use crate::cell::CellValue;
use crate::codec::RowCodec;
use crate::engine::{NativeCell, RowData, SheetId, StyleId, MAX_OUTLINE_LEVEL};
use crate::error::{Result, TableError};

/// Appends rows to one sheet of a [`TableDocument`](crate::TableDocument).
///
/// The writer is registered with its document until [`close`](Self::close) is
/// called or the writer is dropped. A document closes even while writers are
/// open; those writers are detached and every later write fails.
#[derive(Debug)]
pub struct SheetWriter {
    book: SharedBook,
    writer_id: u64,
    sheet: SheetId,
    sheet_name: String,
    current_row: u32,
    closed: bool,
}

impl SheetWriter {
    pub(crate) fn new(
        book: SharedBook,
        writer_id: u64,
        sheet: SheetId,
        sheet_name: String,
        current_row: u32,
    ) -> Self {
        SheetWriter {
            book,
            writer_id,
            sheet,
            sheet_name,
            current_row,
            closed: false,
        }
    }

    /// Name of the sheet, after it was made safe
    #[must_use]
    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    /// Index of the next row to be written
    #[must_use]
    pub fn current_row(&self) -> u32 {
        self.current_row
    }

    fn detached(&self) -> TableError {
        TableError::WriterDetached {
            sheet: self.sheet_name.clone(),
        }
    }

    /// Append one row
    pub fn write_row(&mut self, values: &[CellValue]) -> Result<()> {
        self.append(values, false)
    }

    /// Append one row in the bold header style and freeze the first row
    pub fn write_header(&mut self, values: &[CellValue]) -> Result<()> {
        self.append(values, true)
    }

    fn append(&mut self, values: &[CellValue], header: bool) -> Result<()> {
        let cells = RowCodec::encode(values);

        let mut state = self.book.lock();
        let style: Option<StyleId> = if header { state.header_style() } else { None };
        let sheet = state
            .attached_sheet(self.writer_id, self.sheet)
            .ok_or_else(|| self.detached())?;

        let mut row = RowData::new(self.current_row);
        for (col, value) in cells.into_iter().enumerate() {
            let mut cell = NativeCell::new(value.into());
            cell.style = style;
            row.set_cell(col, cell);
        }
        sheet.rows.push(row);
        if header {
            sheet.frozen_rows = 1;
        }

        self.current_row += 1;
        Ok(())
    }

    /// Group the written rows `first..=last` one outline level deeper.
    ///
    /// Calling this for overlapping ranges nests the groups. Levels stop at
    /// the deepest level the format supports.
    pub fn group_rows(&mut self, first: u32, last: u32) -> Result<()> {
        if first > last {
            return Err(TableError::InvalidGroup { first, last });
        }

        let mut state = self.book.lock();
        let sheet = state
            .attached_sheet(self.writer_id, self.sheet)
            .ok_or_else(|| self.detached())?;

        for row in sheet
            .rows
            .iter_mut()
            .filter(|row| (first..=last).contains(&row.index))
        {
            row.outline_level = (row.outline_level + 1).min(MAX_OUTLINE_LEVEL);
        }
        Ok(())
    }

    /// Deregister from the document. Closing twice does nothing.
    pub fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.book.lock().deregister_writer(self.writer_id);
            tracing::debug!("Closed writer {} for sheet '{}'", self.writer_id, self.sheet_name);
        }
        Ok(())
    }
}

impl Drop for SheetWriter {
    fn drop(&mut self) {
        if !self.closed {
            self.closed = true;
            self.book.lock().deregister_writer(self.writer_id);
        }
    }
}
