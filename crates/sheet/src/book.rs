use crate::engine::{
    load_workbook, safe_sheet_name, save_workbook, CellStyle, DocumentMetadata, SheetData,
    SheetId, StyleId, Workbook,
};
use crate::error::{Result, TableError};
use crate::options::BookOptions;
use crate::reader::SheetReader;
use crate::writer::SheetWriter;
use indexmap::IndexSet;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// How a document was opened. Decided once, by whether the path existed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// The file existed and was parsed; it is never modified
    ReadOnly,
    /// The file did not exist; sheets are built in memory and written on close
    BuildNew,
}

/// Opaque handle to the bold style shared by all header rows of a document.
///
/// It carries no formatting of its own. Two handles from the same document
/// compare equal when they name the same style, so callers can tell that
/// every header row written through [`SheetWriter::write_header`] shares one
/// style. Read-only documents have none.
///
/// [`SheetWriter::write_header`]: crate::SheetWriter::write_header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderStyle(pub(crate) StyleId);

/// State guarded by the document lock.
///
/// Everything that touches the workbook goes through this lock: writer
/// registration, row appends, header styling and the final save.
#[derive(Debug)]
pub(crate) struct BookState {
    /// `None` once the document has been closed
    workbook: Option<Workbook>,
    /// Open writers and the sheet each one writes to
    open_writers: HashMap<u64, String>,
    header_style: Option<StyleId>,
    next_writer_id: u64,
}

pub(crate) type SharedBook = Arc<Mutex<BookState>>;

impl BookState {
    fn new(workbook: Workbook) -> Self {
        BookState {
            workbook: Some(workbook),
            open_writers: HashMap::new(),
            header_style: None,
            next_writer_id: 0,
        }
    }

    pub(crate) fn sheet(&self, id: SheetId) -> Option<&SheetData> {
        self.workbook.as_ref()?.sheet(id)
    }

    /// The sheet of a writer, as long as the writer is still attached
    pub(crate) fn attached_sheet(&mut self, writer_id: u64, id: SheetId) -> Option<&mut SheetData> {
        if !self.open_writers.contains_key(&writer_id) {
            return None;
        }
        self.workbook.as_mut()?.sheet_mut(id)
    }

    /// Shared header style, created on first use
    pub(crate) fn header_style(&mut self) -> Option<StyleId> {
        if self.header_style.is_none() {
            let workbook = self.workbook.as_mut()?;
            self.header_style = Some(workbook.add_style(CellStyle { bold: true }));
        }
        self.header_style
    }

    fn register_writer(&mut self, sheet_name: &str) -> u64 {
        let id = self.next_writer_id;
        self.next_writer_id += 1;
        self.open_writers.insert(id, sheet_name.to_string());
        id
    }

    pub(crate) fn deregister_writer(&mut self, writer_id: u64) {
        self.open_writers.remove(&writer_id);
    }
}

/// A workbook file, opened either for reading or for building a new one.
///
/// If the path exists, the workbook is parsed immediately and the document is
/// [`Mode::ReadOnly`]. Otherwise an empty placeholder file is created and the
/// document is [`Mode::BuildNew`]: sheets are filled through [`SheetWriter`]s
/// and the workbook is written once, when the document is closed.
///
/// Readers and writers can be used from other threads; all of them share the
/// document lock.
///
/// # Example
///
/// ```no_run
/// use tablebook_sheet::{CellValue, TableDocument};
///
/// let mut book = TableDocument::open("results.xlsx", false).unwrap();
/// let mut writer = book.get_writer("Results").unwrap();
/// writer.write_header(&["Name".into(), "Value".into()]).unwrap();
/// writer.write_row(&[CellValue::from("A"), CellValue::from(1)]).unwrap();
/// writer.close().unwrap();
/// book.close().unwrap();
/// ```
#[derive(Debug)]
pub struct TableDocument {
    state: SharedBook,
    mode: Mode,
    path: PathBuf,
    options: BookOptions,
    closed: bool,
}

impl TableDocument {
    /// Open or create a workbook with default options
    pub fn open<P: AsRef<Path>>(path: P, ignore_empty_rows: bool) -> Result<Self> {
        Self::open_with_options(
            path,
            BookOptions::default().with_ignore_empty_rows(ignore_empty_rows),
        )
    }

    /// Open or create a workbook
    pub fn open_with_options<P: AsRef<Path>>(path: P, options: BookOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let (mode, workbook) = if path.exists() {
            (Mode::ReadOnly, load_workbook(&path)?)
        } else {
            let is_xlsx = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx"));
            if !is_xlsx {
                return Err(TableError::Unsupported(format!(
                    "new workbooks are written as .xlsx: {}",
                    path.display()
                )));
            }

            OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .map_err(|e| {
                    TableError::io_with_cause(
                        format!(
                            "Specified file does not exist and could not be created: {}",
                            path.display()
                        ),
                        e,
                    )
                })?;
            (Mode::BuildNew, Workbook::new())
        };

        tracing::debug!("Opened {} in {:?} mode", path.display(), mode);

        Ok(TableDocument {
            state: Arc::new(Mutex::new(BookState::new(workbook))),
            mode,
            path,
            options,
            closed: false,
        })
    }

    /// Get the mode chosen at open time
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Get the backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check whether [`close`](Self::close) has run
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// All files backing this document (always exactly one)
    #[must_use]
    pub fn files(&self) -> IndexSet<PathBuf> {
        IndexSet::from([self.path.clone()])
    }

    /// Get all sheet names in document order
    #[must_use]
    pub fn sheet_names(&self) -> IndexSet<String> {
        let state = self.state.lock();
        state
            .workbook
            .iter()
            .flat_map(Workbook::sheets)
            .map(|(_, sheet)| sheet.name.clone())
            .collect()
    }

    fn closed_error(&self) -> TableError {
        TableError::DocumentClosed {
            path: self.path.display().to_string(),
        }
    }

    fn reader_for(&self, id: SheetId, name: &str) -> SheetReader {
        SheetReader::new(
            Arc::clone(&self.state),
            id,
            name,
            self.options.ignore_empty_rows,
        )
    }

    /// Get a reader for the sheet with the given name.
    ///
    /// Names match regardless of ASCII case; the reader reports the name as
    /// stored in the document.
    pub fn get_reader(&self, name: &str) -> Result<SheetReader> {
        let found = {
            let state = self.state.lock();
            let workbook = state.workbook.as_ref().ok_or_else(|| self.closed_error())?;
            workbook
                .find_sheet(name)
                .and_then(|id| workbook.sheet(id).map(|sheet| (id, sheet.name.clone())))
        };

        found
            .map(|(id, stored)| self.reader_for(id, &stored))
            .ok_or_else(|| TableError::SheetNotFound {
                name: name.to_string(),
            })
    }

    /// Get a reader for the sheet at a position in document order (0-based)
    pub fn get_reader_at(&self, index: usize) -> Result<SheetReader> {
        let found = {
            let state = self.state.lock();
            let workbook = state.workbook.as_ref().ok_or_else(|| self.closed_error())?;
            workbook
                .sheet_at(index)
                .and_then(|id| workbook.sheet(id).map(|sheet| (id, sheet.name.clone())))
        };

        found
            .map(|(id, name)| self.reader_for(id, &name))
            .ok_or_else(|| TableError::SheetNotFound {
                name: format!("index {index}"),
            })
    }

    /// Get one reader per sheet, in document order
    #[must_use]
    pub fn get_all_readers(&self) -> Vec<SheetReader> {
        let sheets: Vec<(SheetId, String)> = {
            let state = self.state.lock();
            state
                .workbook
                .iter()
                .flat_map(Workbook::sheets)
                .map(|(id, sheet)| (id, sheet.name.clone()))
                .collect()
        };

        sheets
            .iter()
            .map(|(id, name)| self.reader_for(*id, name))
            .collect()
    }

    /// Create a sheet and get a writer for it.
    ///
    /// The name is made safe for the workbook format first. An existing sheet
    /// with the same name is replaced. The new sheet becomes the first sheet
    /// of the document.
    pub fn get_writer(&self, name: &str) -> Result<SheetWriter> {
        if self.mode == Mode::ReadOnly {
            return Err(TableError::Unsupported(format!(
                "Sheet was opened in read only mode: {}",
                self.path.display()
            )));
        }

        let safe_name = safe_sheet_name(name);
        let mut state = self.state.lock();
        let workbook = state.workbook.as_mut().ok_or_else(|| self.closed_error())?;

        let id = match workbook.create_sheet(&safe_name) {
            Ok(id) => id,
            Err(collision) => {
                tracing::debug!("Replacing existing sheet '{}'", safe_name);
                workbook.delete_sheet(collision.existing);
                workbook.create_sheet(&safe_name).map_err(|_| {
                    TableError::io_with_cause(
                        format!("Could not create sheet \"{safe_name}\""),
                        "a sheet with this name already exists",
                    )
                })?
            }
        };

        // Newest results go first, intermediate results towards the end
        workbook.set_sheet_order(id, 0);
        let current_row = workbook.sheet(id).map_or(0, SheetData::physical_row_count);

        let writer_id = state.register_writer(&safe_name);
        tracing::debug!("Opened writer {} for sheet '{}'", writer_id, safe_name);

        Ok(SheetWriter::new(
            Arc::clone(&self.state),
            writer_id,
            id,
            safe_name,
            current_row,
        ))
    }

    /// Get the shared bold header style, or `None` for read-only documents
    pub fn get_header_style(&self) -> Option<HeaderStyle> {
        if self.mode == Mode::ReadOnly {
            return None;
        }
        self.state.lock().header_style().map(HeaderStyle)
    }

    /// Number of writers that have not been closed yet
    #[must_use]
    pub fn open_writer_count(&self) -> usize {
        self.state.lock().open_writers.len()
    }

    /// Give writers on other threads a short grace period to finish.
    ///
    /// This is a heuristic: a writer still busy afterwards is detached and
    /// whatever it wrote so far is saved.
    fn wait_for_writers(&self) {
        let attempts = self.options.writer_wait_attempts;
        for attempt in 1..=attempts {
            let open = self.open_writer_count();
            if open == 0 {
                return;
            }
            tracing::debug!(
                "Waiting for {} open writer(s) of {} ({}/{})",
                open,
                self.path.display(),
                attempt,
                attempts
            );
            std::thread::sleep(self.options.writer_wait_interval());
        }
    }

    /// Close the document.
    ///
    /// Waits for open writers, detaches the remaining ones and, for a new
    /// document, writes the workbook. A new document without sheets leaves no
    /// file behind. Calling `close` again does nothing.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        self.wait_for_writers();

        let mut state = self.state.lock();
        for (writer_id, sheet) in state.open_writers.drain() {
            tracing::warn!(
                "Writer {} for sheet '{}' still open while closing {}, detaching it",
                writer_id,
                sheet,
                self.path.display()
            );
        }

        let Some(mut workbook) = state.workbook.take() else {
            return Ok(());
        };

        match self.mode {
            Mode::ReadOnly => Ok(()),
            Mode::BuildNew => match workbook.sheet_at(0) {
                Some(first) => {
                    workbook.set_active_sheet(first);
                    let metadata = self.metadata(&workbook, first);
                    save_workbook(&workbook, &self.path, &metadata).map_err(|e| {
                        TableError::io_with_cause(
                            format!("Could not write {}", self.path.display()),
                            e,
                        )
                    })?;
                    tracing::debug!(
                        "Wrote {} sheet(s) to {}",
                        workbook.sheet_count(),
                        self.path.display()
                    );
                    Ok(())
                }
                None => self.remove_placeholder(),
            },
        }
    }

    /// Title is the first sheet name plus today's date
    fn metadata(&self, workbook: &Workbook, first: SheetId) -> DocumentMetadata {
        let date = chrono::Local::now().format("%d.%m.%Y");
        let title = workbook
            .sheet(first)
            .map(|sheet| format!("{} {date}", sheet.name))
            .unwrap_or_else(|| date.to_string());

        DocumentMetadata {
            title,
            creator: self.options.creator.clone(),
        }
    }

    fn remove_placeholder(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(TableError::io_with_cause(
                format!("Could not delete empty workbook {}", self.path.display()),
                e,
            )),
        }
    }
}

impl Drop for TableDocument {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.close() {
                tracing::warn!("Closing {} failed: {}", self.path.display(), e);
            }
        }
    }
}
