//! Table access for tablebook
//!
//! Reads and writes tables stored in xlsx workbooks and CSV files through one
//! string-based row model. Workbooks can be read sheet by sheet, including
//! the row groups (outline levels) of each sheet, or built from scratch by
//! any number of writers and saved in one go.
//!
//! # Examples
//!
//! ## Building a workbook
//!
//! ```no_run
//! use tablebook_sheet::{CellValue, TableDocument};
//!
//! let mut book = TableDocument::open("report.xlsx", false).unwrap();
//!
//! let mut writer = book.get_writer("Summary").unwrap();
//! writer.write_header(&["File".into(), "Lines".into()]).unwrap();
//! writer.write_row(&["main.c".into(), CellValue::from(120)]).unwrap();
//! writer.close().unwrap();
//!
//! // Writes report.xlsx
//! book.close().unwrap();
//! ```
//!
//! ## Reading a workbook
//!
//! ```no_run
//! use tablebook_sheet::TableDocument;
//!
//! let mut book = TableDocument::open("report.xlsx", true).unwrap();
//! for mut reader in book.get_all_readers() {
//!     println!("{}", reader.sheet_name());
//!     while let Some(row) = reader.read_next_row() {
//!         println!("{}", row.join(", "));
//!     }
//!     for group in reader.get_grouped_rows() {
//!         println!("group {group}");
//!     }
//! }
//! book.close().unwrap();
//! ```
//!
//! ## Any supported file
//!
//! ```no_run
//! use tablebook_sheet::{read_tables, BookOptions};
//!
//! for table in read_tables("input.csv", &BookOptions::default()).unwrap() {
//!     println!("{}: {} rows", table.name, table.rows.len());
//! }
//! ```
//!
//! # Value model
//!
//! Writers take [`CellValue`]s. Text longer than [`MAX_TEXT_LENGTH`] characters
//! is spread over several adjacent cells. Readers return every cell as a
//! string: numbers as `1.0` or `-13.5`, booleans as `true`/`false`, formulas
//! as their source text and blank or error cells as the empty string.

mod book;
mod cell;
mod codec;
mod collection;
mod csv;
mod engine;
mod error;
mod group;
mod options;
mod reader;
mod writer;

/// Re-export document types.
pub use book::{HeaderStyle, Mode, TableDocument};
/// Re-export cell value type.
pub use cell::{format_number, CellValue};
/// Re-export the row model.
pub use codec::{Row, RowCodec, MAX_TEXT_LENGTH};
/// Re-export the format-independent table API.
pub use collection::{
    open_collection, read_tables, NamedTable, TableCollection, TableReader, TableWriter,
};
/// Re-export CSV support.
pub use csv::{read_records, CsvFileSet, CsvRecordWriter, CsvTableReader, CsvTableWriter};
/// Re-export error types.
pub use error::{Result, TableError};
/// Re-export row grouping.
pub use group::{Group, GroupExtractor};
/// Re-export options.
pub use options::{BookOptions, CsvOptions};
/// Re-export sheet reader.
pub use reader::SheetReader;
/// Re-export sheet writer.
pub use writer::SheetWriter;
