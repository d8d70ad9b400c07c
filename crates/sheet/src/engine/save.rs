use super::{NativeCell, NativeValue, SheetData, Workbook};
use crate::group::GroupExtractor;
use rust_xlsxwriter::{DocProperties, Format, Workbook as XlsxWorkbook, Worksheet, XlsxError};
use std::path::Path;

/// Core properties stamped into the written package
#[derive(Debug, Clone)]
pub(crate) struct DocumentMetadata {
    pub title: String,
    pub creator: String,
}

/// Serialize the whole workbook to `path` as xlsx
pub(crate) fn save_workbook(
    workbook: &Workbook,
    path: &Path,
    metadata: &DocumentMetadata,
) -> Result<(), XlsxError> {
    let mut output = XlsxWorkbook::new();
    let active = workbook.active_sheet();

    for (id, sheet) in workbook.sheets() {
        let worksheet = output.add_worksheet();
        write_sheet(worksheet, sheet, workbook)?;
        if active == Some(id) {
            worksheet.set_active(true);
        }
    }

    let properties = DocProperties::new()
        .set_title(&metadata.title)
        .set_author(&metadata.creator);
    output.set_properties(&properties);

    output.save(path)
}

fn cell_format(workbook: &Workbook, cell: &NativeCell) -> Option<Format> {
    let style = workbook.style(cell.style?)?;
    let format = Format::new();
    Some(if style.bold { format.set_bold() } else { format })
}

fn write_sheet(
    worksheet: &mut Worksheet,
    sheet: &SheetData,
    workbook: &Workbook,
) -> Result<(), XlsxError> {
    worksheet.set_name(&sheet.name)?;
    let plain = Format::new();

    for row in &sheet.rows {
        // A row without stored cells still has to appear in the sheet XML
        if row.cells.iter().all(Option::is_none) {
            worksheet.set_row_format(row.index, &plain)?;
        }

        for (col_idx, cell) in row.cells.iter().enumerate() {
            let Some(cell) = cell else { continue };
            let col = u16::try_from(col_idx).map_err(|_| XlsxError::RowColumnLimitError)?;
            let format = cell_format(workbook, cell);

            match (&cell.value, &format) {
                (NativeValue::Text(s), Some(f)) => {
                    worksheet.write_string_with_format(row.index, col, s, f)?;
                }
                (NativeValue::Text(s), None) => {
                    worksheet.write_string(row.index, col, s)?;
                }
                (NativeValue::Number(n), Some(f)) => {
                    worksheet.write_number_with_format(row.index, col, *n, f)?;
                }
                (NativeValue::Number(n), None) => {
                    worksheet.write_number(row.index, col, *n)?;
                }
                (NativeValue::Boolean(b), Some(f)) => {
                    worksheet.write_boolean_with_format(row.index, col, *b, f)?;
                }
                (NativeValue::Boolean(b), None) => {
                    worksheet.write_boolean(row.index, col, *b)?;
                }
                (NativeValue::Formula(source), _) => {
                    worksheet.write_formula(row.index, col, source.as_str())?;
                }
                // Blank cells only exist in the file when they carry a format
                (NativeValue::Blank, f) => {
                    worksheet.write_blank(row.index, col, f.as_ref().unwrap_or(&plain))?;
                }
                (NativeValue::Error, _) => {}
            }
        }
    }

    if sheet.frozen_rows > 0 {
        worksheet.set_freeze_panes(sheet.frozen_rows, 0)?;
    }

    let groups = GroupExtractor::extract(sheet.rows.iter().map(|row| row.outline_level));
    for group in groups {
        let first = sheet.rows[group.start_index() as usize].index;
        let last = sheet.rows[group.end_index() as usize].index;
        worksheet.group_rows(first, last)?;
    }

    Ok(())
}
