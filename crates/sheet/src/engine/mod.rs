//! In-memory workbook model shared by the document, its readers and writers.
//!
//! Sheets live in an arena keyed by stable [`SheetId`]s so readers and writers
//! can hold ids instead of references. The map order is the document order.

mod load;
mod save;

pub(crate) use load::load_workbook;
pub(crate) use save::{save_workbook, DocumentMetadata};

use crate::cell::CellValue;
use indexmap::IndexMap;

/// Excel limits sheet names to 31 characters
pub(crate) const MAX_SHEET_NAME_LENGTH: usize = 31;

/// Excel supports at most 7 nested outline levels
pub(crate) const MAX_OUTLINE_LEVEL: u8 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SheetId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct StyleId(usize);

/// Cell content as stored by the workbook
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum NativeValue {
    Text(String),
    Number(f64),
    Boolean(bool),
    /// Formula source without the leading `=`
    Formula(String),
    Error,
    Blank,
}

impl From<CellValue> for NativeValue {
    fn from(value: CellValue) -> Self {
        match value {
            CellValue::Blank => NativeValue::Blank,
            CellValue::Number(n) => NativeValue::Number(n),
            CellValue::Boolean(b) => NativeValue::Boolean(b),
            CellValue::Text(s) => NativeValue::Text(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NativeCell {
    pub value: NativeValue,
    pub style: Option<StyleId>,
}

impl NativeCell {
    pub fn new(value: NativeValue) -> Self {
        NativeCell { value, style: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct CellStyle {
    pub bold: bool,
}

/// One physically present row. `cells` is indexed by column; gaps are `None`.
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct RowData {
    pub index: u32,
    pub outline_level: u8,
    pub cells: Vec<Option<NativeCell>>,
}

impl RowData {
    pub fn new(index: u32) -> Self {
        RowData {
            index,
            ..Default::default()
        }
    }

    pub fn set_cell(&mut self, col: usize, cell: NativeCell) {
        if self.cells.len() <= col {
            self.cells.resize(col + 1, None);
        }
        self.cells[col] = Some(cell);
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct SheetData {
    pub name: String,
    /// Physical rows in ascending `index` order
    pub rows: Vec<RowData>,
    pub frozen_rows: u32,
}

impl SheetData {
    pub fn new(name: &str) -> Self {
        SheetData {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn physical_row_count(&self) -> u32 {
        self.rows.len() as u32
    }

    /// Number of columns of row 0, used to pad shorter rows
    pub fn column_count(&self) -> usize {
        self.rows
            .first()
            .filter(|row| row.index == 0)
            .map_or(0, |row| row.cells.len())
    }
}

/// Raised when a sheet name is already taken (compared case-insensitively)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NameCollision {
    pub existing: SheetId,
}

#[derive(Debug, Default)]
pub(crate) struct Workbook {
    sheets: IndexMap<SheetId, SheetData>,
    styles: Vec<CellStyle>,
    active_sheet: Option<SheetId>,
    next_sheet_id: u64,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    pub fn sheets(&self) -> impl Iterator<Item = (SheetId, &SheetData)> {
        self.sheets.iter().map(|(id, sheet)| (*id, sheet))
    }

    pub fn sheet(&self, id: SheetId) -> Option<&SheetData> {
        self.sheets.get(&id)
    }

    pub fn sheet_mut(&mut self, id: SheetId) -> Option<&mut SheetData> {
        self.sheets.get_mut(&id)
    }

    pub fn sheet_at(&self, index: usize) -> Option<SheetId> {
        self.sheets.get_index(index).map(|(id, _)| *id)
    }

    /// Sheet names compare ASCII case-insensitively, as in Excel
    pub fn find_sheet(&self, name: &str) -> Option<SheetId> {
        self.sheets
            .iter()
            .find(|(_, sheet)| sheet.name.eq_ignore_ascii_case(name))
            .map(|(id, _)| *id)
    }

    /// Append a new sheet at the end of the document order
    pub fn create_sheet(&mut self, name: &str) -> Result<SheetId, NameCollision> {
        if let Some(existing) = self.find_sheet(name) {
            return Err(NameCollision { existing });
        }

        let id = SheetId(self.next_sheet_id);
        self.next_sheet_id += 1;
        self.sheets.insert(id, SheetData::new(name));
        Ok(id)
    }

    /// Add an already populated sheet (used while loading)
    pub fn push_sheet(&mut self, sheet: SheetData) -> SheetId {
        let id = SheetId(self.next_sheet_id);
        self.next_sheet_id += 1;
        self.sheets.insert(id, sheet);
        id
    }

    pub fn delete_sheet(&mut self, id: SheetId) -> Option<SheetData> {
        let removed = self.sheets.shift_remove(&id);
        if self.active_sheet == Some(id) {
            self.active_sheet = None;
        }
        removed
    }

    /// Move a sheet to `index` in the document order
    pub fn set_sheet_order(&mut self, id: SheetId, index: usize) {
        if let Some(sheet) = self.sheets.shift_remove(&id) {
            let index = index.min(self.sheets.len());
            self.sheets.shift_insert(index, id, sheet);
        }
    }

    pub fn set_active_sheet(&mut self, id: SheetId) {
        if self.sheets.contains_key(&id) {
            self.active_sheet = Some(id);
        }
    }

    pub fn active_sheet(&self) -> Option<SheetId> {
        self.active_sheet
    }

    pub fn add_style(&mut self, style: CellStyle) -> StyleId {
        self.styles.push(style);
        StyleId(self.styles.len() - 1)
    }

    pub fn style(&self, id: StyleId) -> Option<&CellStyle> {
        self.styles.get(id.0)
    }
}

/// Turn an arbitrary string into a valid sheet name.
///
/// Characters Excel rejects are replaced by a space, as are apostrophes at
/// either end, and the result is cut to 31 characters.
pub(crate) fn safe_sheet_name(name: &str) -> String {
    if name.is_empty() {
        return "empty".to_string();
    }

    let truncated: Vec<char> = name.chars().take(MAX_SHEET_NAME_LENGTH).collect();
    let last = truncated.len() - 1;
    truncated
        .iter()
        .enumerate()
        .map(|(i, c)| match c {
            '\n' | '\r' | '\t' | '\0' | '\u{c}' | '/' | '\\' | '?' | '*' | ']' | '[' | ':' => ' ',
            '\'' if i == 0 || i == last => ' ',
            other => *other,
        })
        .collect()
}
