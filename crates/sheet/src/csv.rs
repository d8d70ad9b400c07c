use crate::cell::CellValue;
use crate::codec::Row;
use crate::collection::{TableCollection, TableReader, TableWriter};
use crate::error::{Result, TableError};
use crate::options::CsvOptions;
use indexmap::IndexSet;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Seek, SeekFrom};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// A single CSV file seen as a collection with one table.
///
/// The table is named after the file without its extension.
#[derive(Debug, Clone)]
pub struct CsvFileSet {
    path: PathBuf,
    options: CsvOptions,
}

impl CsvFileSet {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self::with_options(path, CsvOptions::default())
    }

    pub fn with_options<P: AsRef<Path>>(path: P, options: CsvOptions) -> Self {
        CsvFileSet {
            path: path.as_ref().to_path_buf(),
            options,
        }
    }

    /// Name of the single table in this file
    #[must_use]
    pub fn table_name(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn reader(&self) -> Result<CsvTableReader> {
        CsvTableReader::open(&self.path, &self.table_name(), self.options.clone())
    }

    /// Create (or truncate) the file and get a writer for it
    pub fn writer(&self) -> Result<CsvTableWriter> {
        CsvTableWriter::create(&self.path, &self.table_name(), &self.options)
    }
}

impl TableCollection for CsvFileSet {
    fn table_names(&self) -> Result<IndexSet<String>> {
        let mut names = IndexSet::new();
        if self.path.is_file() {
            names.insert(self.table_name());
        }
        Ok(names)
    }

    fn get_reader(&self, name: &str) -> Result<Box<dyn TableReader>> {
        if name != self.table_name() {
            return Err(TableError::SheetNotFound {
                name: name.to_string(),
            });
        }
        Ok(Box::new(self.reader()?))
    }

    fn get_writer(&self, name: &str) -> Result<Box<dyn TableWriter>> {
        if name != self.table_name() {
            return Err(TableError::Unsupported(format!(
                "{} only holds the table '{}', cannot write '{name}'",
                self.path.display(),
                self.table_name()
            )));
        }
        Ok(Box::new(self.writer()?))
    }

    fn files(&self) -> IndexSet<PathBuf> {
        IndexSet::from([self.path.clone()])
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Reads the rows of a CSV file as strings.
///
/// A first line like `sep=;` names the delimiter and is skipped. A delimiter
/// set in the options wins over that line.
#[derive(Debug)]
pub struct CsvTableReader {
    name: String,
    path: PathBuf,
    options: CsvOptions,
    reader: csv::Reader<BufReader<File>>,
    record: csv::StringRecord,
    line_number: u32,
}

impl CsvTableReader {
    pub fn open<P: AsRef<Path>>(path: P, name: &str, options: CsvOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let reader = open_reader(&path, &options, false)?;
        Ok(CsvTableReader {
            name: name.to_string(),
            path,
            options,
            reader,
            record: csv::StringRecord::new(),
            line_number: 0,
        })
    }
}

/// Delimiter named by a `sep=` line, if `line` is one
fn separator_line(line: &[u8]) -> Option<u8> {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    if line.starts_with(b"sep") && line.len() > 3 {
        line.last().copied()
    } else {
        None
    }
}

fn open_reader(
    path: &Path,
    options: &CsvOptions,
    has_headers: bool,
) -> Result<csv::Reader<BufReader<File>>> {
    let mut input = BufReader::new(File::open(path)?);

    let mut first_line = Vec::new();
    input.read_until(b'\n', &mut first_line)?;

    let delimiter = match separator_line(&first_line) {
        Some(separator) => {
            if !separator.is_ascii() {
                return Err(TableError::Format {
                    path: path.display().to_string(),
                    reason: "separator line names a non-ASCII delimiter".to_string(),
                });
            }
            tracing::debug!(
                "{} declares delimiter '{}'",
                path.display(),
                char::from(separator)
            );
            options.delimiter.unwrap_or(separator)
        }
        None => {
            input.seek(SeekFrom::Start(0))?;
            options.delimiter.unwrap_or(CsvOptions::DEFAULT_DELIMITER)
        }
    };

    Ok(csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .quote(options.quote)
        .has_headers(has_headers)
        .flexible(true)
        .from_reader(input))
}

impl TableReader for CsvTableReader {
    fn table_name(&self) -> &str {
        &self.name
    }

    fn read_next_row(&mut self) -> Result<Option<Row>> {
        if !self.reader.read_record(&mut self.record)? {
            return Ok(None);
        }
        self.line_number += 1;
        Ok(Some(self.record.iter().map(str::to_string).collect()))
    }

    fn line_number(&self) -> u32 {
        self.line_number
    }

    fn close(&mut self) -> Result<()> {
        self.reader = open_reader(&self.path, &self.options, false)?;
        self.line_number = 0;
        Ok(())
    }
}

/// Writes rows to a CSV file, values in their canonical string form
#[derive(Debug)]
pub struct CsvTableWriter {
    name: String,
    writer: csv::Writer<BufWriter<File>>,
}

impl CsvTableWriter {
    pub fn create<P: AsRef<Path>>(path: P, name: &str, options: &CsvOptions) -> Result<Self> {
        let file = File::create(path)?;
        let writer = csv::WriterBuilder::new()
            .delimiter(options.delimiter.unwrap_or(CsvOptions::DEFAULT_DELIMITER))
            .quote(options.quote)
            .flexible(true)
            .from_writer(BufWriter::new(file));

        Ok(CsvTableWriter {
            name: name.to_string(),
            writer,
        })
    }

    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.name
    }
}

impl TableWriter for CsvTableWriter {
    fn write_row(&mut self, values: &[CellValue]) -> Result<()> {
        let record: Vec<String> = values.iter().map(CellValue::as_str).collect();
        self.writer.write_record(&record)?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Read every record of a CSV file into typed values.
///
/// The first line after an optional `sep=` line is the header; columns are
/// matched to fields by name.
pub fn read_records<T, P>(path: P, options: &CsvOptions) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let mut reader = open_reader(path, options, true)?;
    let records = reader
        .deserialize()
        .collect::<std::result::Result<Vec<T>, _>>()?;
    tracing::debug!("Read {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Writes typed values as CSV records, with a header row taken from the
/// field names of the first record.
#[derive(Debug)]
pub struct CsvRecordWriter<T> {
    writer: csv::Writer<BufWriter<File>>,
    written: usize,
    record: PhantomData<fn(&T)>,
}

impl<T: Serialize> CsvRecordWriter<T> {
    /// Create (or truncate) the file
    pub fn create<P: AsRef<Path>>(path: P, options: &CsvOptions) -> Result<Self> {
        let file = File::create(path)?;
        let writer = csv::WriterBuilder::new()
            .delimiter(options.delimiter.unwrap_or(CsvOptions::DEFAULT_DELIMITER))
            .quote(options.quote)
            .from_writer(BufWriter::new(file));

        Ok(CsvRecordWriter {
            writer,
            written: 0,
            record: PhantomData,
        })
    }

    pub fn write_record(&mut self, record: &T) -> Result<()> {
        self.writer.serialize(record)?;
        self.written += 1;
        Ok(())
    }

    /// Write all records and close the file
    pub fn write_all(mut self, records: &[T]) -> Result<()> {
        for record in records {
            self.write_record(record)?;
        }
        self.close()
    }

    /// Number of records written so far
    #[must_use]
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn close(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_separator_line() {
        assert_eq!(separator_line(b"sep=;\r\n"), Some(b';'));
        assert_eq!(separator_line(b"sep=\t\n"), Some(b'\t'));
        assert_eq!(separator_line(b"a;b\n"), None);
        assert_eq!(separator_line(b"sep\n"), None);
        assert_eq!(separator_line(b""), None);
    }

    #[test]
    fn test_reads_default_delimiter() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plain.csv");
        fs::write(&path, "a,b\n\"c,d\",e\n").unwrap();

        let mut reader = CsvFileSet::new(&path).reader().unwrap();
        assert_eq!(
            reader.read_full().unwrap(),
            vec![vec!["a", "b"], vec!["c,d", "e"]]
        );
        assert_eq!(reader.line_number(), 2);
    }

    #[test]
    fn test_separator_line_is_used_and_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sep.csv");
        fs::write(&path, "sep=;\na;b\nc;d\n").unwrap();

        let mut reader = CsvFileSet::new(&path).reader().unwrap();
        assert_eq!(
            reader.read_full().unwrap(),
            vec![vec!["a", "b"], vec!["c", "d"]]
        );
    }

    #[test]
    fn test_explicit_delimiter_overrides_separator_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("override.csv");
        fs::write(&path, "sep=;\na|b;c\n").unwrap();

        let options = CsvOptions::default().with_delimiter(b'|');
        let mut reader = CsvFileSet::with_options(&path, options).reader().unwrap();
        assert_eq!(reader.read_full().unwrap(), vec![vec!["a", "b;c"]]);
    }

    #[test]
    fn test_close_rewinds() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rewind.csv");
        fs::write(&path, "x\ny\n").unwrap();

        let mut reader = CsvFileSet::new(&path).reader().unwrap();
        reader.read_full().unwrap();
        reader.close().unwrap();
        assert_eq!(reader.line_number(), 0);
        assert_eq!(reader.read_next_row().unwrap(), Some(vec!["x".to_string()]));
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Results.csv");
        let set = CsvFileSet::new(&path);
        assert!(set.table_names().unwrap().is_empty());

        let mut writer = set.get_writer("Results").unwrap();
        writer.write_header(&["Name".into(), "Value".into()]).unwrap();
        writer
            .write_row(&["a, b".into(), CellValue::from(-13.5)])
            .unwrap();
        writer.write_row(&[CellValue::Blank, true.into()]).unwrap();
        writer.close().unwrap();

        assert_eq!(set.table_names().unwrap().len(), 1);
        let mut reader = set.get_reader("Results").unwrap();
        assert_eq!(
            reader.read_full().unwrap(),
            vec![
                vec!["Name", "Value"],
                vec!["a, b", "-13.5"],
                vec!["", "true"],
            ]
        );
    }

    #[derive(Debug, PartialEq, Serialize, serde::Deserialize)]
    struct Measurement {
        file: String,
        lines: u32,
        ratio: f64,
        generated: bool,
    }

    #[test]
    fn test_records_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("measurements.csv");
        let records = vec![
            Measurement {
                file: "main.c".to_string(),
                lines: 120,
                ratio: 0.5,
                generated: false,
            },
            Measurement {
                file: "a; b.h".to_string(),
                lines: 7,
                ratio: -13.5,
                generated: true,
            },
        ];

        let options = CsvOptions::default().with_delimiter(b';');
        CsvRecordWriter::create(&path, &options)
            .unwrap()
            .write_all(&records)
            .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("file;lines;ratio;generated\n"));
        assert!(content.contains("\"a; b.h\";7;-13.5;true"));

        let read: Vec<Measurement> = read_records(&path, &options).unwrap();
        assert_eq!(read, records);
    }

    #[test]
    fn test_records_use_separator_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("declared.csv");
        fs::write(&path, "sep=;\nfile;lines;ratio;generated\nx.c;3;1.0;false\n").unwrap();

        let read: Vec<Measurement> = read_records(&path, &CsvOptions::default()).unwrap();
        assert_eq!(
            read,
            vec![Measurement {
                file: "x.c".to_string(),
                lines: 3,
                ratio: 1.0,
                generated: false,
            }]
        );
    }

    #[test]
    fn test_records_with_bad_field() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(&path, "file,lines,ratio,generated\nx.c,many,1.0,false\n").unwrap();

        let result: Result<Vec<Measurement>> = read_records(&path, &CsvOptions::default());
        assert!(matches!(result, Err(TableError::Csv(_))));
    }

    #[test]
    fn test_record_writer_counts_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("count.csv");

        let mut writer = CsvRecordWriter::create(&path, &CsvOptions::default()).unwrap();
        assert_eq!(writer.written(), 0);
        writer
            .write_record(&Measurement {
                file: "m.c".to_string(),
                lines: 1,
                ratio: 2.0,
                generated: false,
            })
            .unwrap();
        writer.close().unwrap();

        assert_eq!(writer.written(), 1);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "file,lines,ratio,generated\nm.c,1,2.0,false\n"
        );
    }

    #[test]
    fn test_wrong_table_name() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("only.csv");
        fs::write(&path, "x\n").unwrap();
        let set = CsvFileSet::new(&path);

        assert!(matches!(
            set.get_reader("other"),
            Err(TableError::SheetNotFound { .. })
        ));
        assert!(matches!(
            set.get_writer("other"),
            Err(TableError::Unsupported(_))
        ));
    }
}
