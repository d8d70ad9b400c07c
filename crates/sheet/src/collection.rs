//! Format-independent access to named tables.
//!
//! A workbook and a CSV file are both collections of tables: a workbook holds
//! one table per sheet, a CSV file holds exactly one named after the file.

use crate::book::TableDocument;
use crate::cell::CellValue;
use crate::codec::Row;
use crate::csv::CsvFileSet;
use crate::error::{Result, TableError};
use crate::group::Group;
use crate::options::BookOptions;
use crate::reader::SheetReader;
use crate::writer::SheetWriter;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Sequential access to the rows of one table
pub trait TableReader: Send {
    /// Name of the table being read
    fn table_name(&self) -> &str;

    /// Read the next row, or `None` at the end of the table
    fn read_next_row(&mut self) -> Result<Option<Row>>;

    /// Read all remaining rows
    fn read_full(&mut self) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        while let Some(row) = self.read_next_row()? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Number of rows returned so far
    fn line_number(&self) -> u32;

    /// Row groups of the table; formats without grouping have none
    fn groups(&self) -> Vec<Group> {
        Vec::new()
    }

    /// Rewind to the first row
    fn close(&mut self) -> Result<()>;
}

/// Appends rows to one table
pub trait TableWriter: Send {
    fn write_row(&mut self, values: &[CellValue]) -> Result<()>;

    /// Write a header row. Formats without styling write a plain row.
    fn write_header(&mut self, values: &[CellValue]) -> Result<()> {
        self.write_row(values)
    }

    /// Group written rows one level deeper. Formats without grouping ignore this.
    fn group_rows(&mut self, _first: u32, _last: u32) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) -> Result<()>;
}

/// A set of named tables backed by one or more files
pub trait TableCollection {
    fn table_names(&self) -> Result<IndexSet<String>>;

    fn get_reader(&self, name: &str) -> Result<Box<dyn TableReader>>;

    fn get_writer(&self, name: &str) -> Result<Box<dyn TableWriter>>;

    /// Files backing this collection
    fn files(&self) -> IndexSet<PathBuf>;

    fn close(&mut self) -> Result<()>;
}

impl TableReader for SheetReader {
    fn table_name(&self) -> &str {
        self.sheet_name()
    }

    fn read_next_row(&mut self) -> Result<Option<Row>> {
        Ok(SheetReader::read_next_row(self))
    }

    fn line_number(&self) -> u32 {
        self.get_line_number()
    }

    fn groups(&self) -> Vec<Group> {
        self.get_grouped_rows().to_vec()
    }

    fn close(&mut self) -> Result<()> {
        SheetReader::close(self);
        Ok(())
    }
}

impl TableWriter for SheetWriter {
    fn write_row(&mut self, values: &[CellValue]) -> Result<()> {
        SheetWriter::write_row(self, values)
    }

    fn write_header(&mut self, values: &[CellValue]) -> Result<()> {
        SheetWriter::write_header(self, values)
    }

    fn group_rows(&mut self, first: u32, last: u32) -> Result<()> {
        SheetWriter::group_rows(self, first, last)
    }

    fn close(&mut self) -> Result<()> {
        SheetWriter::close(self)
    }
}

impl TableCollection for TableDocument {
    fn table_names(&self) -> Result<IndexSet<String>> {
        Ok(self.sheet_names())
    }

    fn get_reader(&self, name: &str) -> Result<Box<dyn TableReader>> {
        Ok(Box::new(TableDocument::get_reader(self, name)?))
    }

    fn get_writer(&self, name: &str) -> Result<Box<dyn TableWriter>> {
        Ok(Box::new(TableDocument::get_writer(self, name)?))
    }

    fn files(&self) -> IndexSet<PathBuf> {
        TableDocument::files(self)
    }

    fn close(&mut self) -> Result<()> {
        TableDocument::close(self)
    }
}

/// Open a collection, choosing the format by file extension.
///
/// `.csv` opens a [`CsvFileSet`]; `.xlsx`, `.xlsm` and `.xls` open a
/// [`TableDocument`] (new files can only be `.xlsx`).
pub fn open_collection<P: AsRef<Path>>(
    path: P,
    options: &BookOptions,
) -> Result<Box<dyn TableCollection>> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("csv") => Ok(Box::new(CsvFileSet::with_options(path, options.csv.clone()))),
        Some("xlsx" | "xlsm" | "xls") => Ok(Box::new(TableDocument::open_with_options(
            path,
            options.clone(),
        )?)),
        _ => Err(TableError::Unsupported(format!(
            "Don't know how to handle file {}",
            path.display()
        ))),
    }
}

/// A fully read table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedTable {
    pub name: String,
    pub rows: Vec<Row>,
    pub groups: Vec<Group>,
}

/// Read every table of an existing file
pub fn read_tables<P: AsRef<Path>>(path: P, options: &BookOptions) -> Result<Vec<NamedTable>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(TableError::Access {
            path: path.display().to_string(),
            reason: "file does not exist".to_string(),
        });
    }

    let mut collection = open_collection(path, options)?;
    let mut tables = Vec::new();
    for name in collection.table_names()? {
        let mut reader = collection.get_reader(&name)?;
        let rows = reader.read_full()?;
        let groups = reader.groups();
        reader.close()?;
        tables.push(NamedTable { name, rows, groups });
    }
    collection.close()?;
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_unknown_extension() {
        let dir = tempdir().unwrap();
        let result = open_collection(dir.path().join("table.ods"), &BookOptions::default());
        assert!(matches!(result, Err(TableError::Unsupported(_))));
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempdir().unwrap();
        let result = read_tables(dir.path().join("missing.xlsx"), &BookOptions::default());
        assert!(matches!(result, Err(TableError::Access { .. })));
        assert!(!dir.path().join("missing.xlsx").exists());
    }

    #[test]
    fn test_collection_round_trip_through_traits() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("traits.xlsx");

        let mut collection = open_collection(&path, &BookOptions::default()).unwrap();
        let mut writer = collection.get_writer("Numbers").unwrap();
        writer.write_header(&["n".into()]).unwrap();
        writer.write_row(&[2.into()]).unwrap();
        writer.close().unwrap();
        drop(writer);
        collection.close().unwrap();

        let tables = read_tables(&path, &BookOptions::default()).unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].name, "Numbers");
        assert_eq!(tables[0].rows, vec![vec!["n"], vec!["2.0"]]);
        assert!(tables[0].groups.is_empty());
    }
}
