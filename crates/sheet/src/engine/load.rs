use super::{NativeCell, NativeValue, RowData, SheetData, Workbook};
use crate::error::{Result, TableError};
use calamine::{open_workbook_auto, Data, Range, Reader};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader as XmlReader;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Seek};
use std::path::Path;
use zip::ZipArchive;

/// Signature of an OLE compound file. An xlsx stored in such a container is encrypted.
const CFB_SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Outline level per physical row (0-based row index), as listed in the sheet XML
type RowOutline = BTreeMap<u32, u8>;

/// Load every sheet of an existing workbook into memory
pub(crate) fn load_workbook(path: &Path) -> Result<Workbook> {
    check_readable(path)?;

    let mut source = open_workbook_auto(path).map_err(|e| TableError::Format {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let outlines = if has_extension(path, &["xlsx", "xlsm"]) {
        read_row_outlines(path)
    } else {
        HashMap::new()
    };

    let mut workbook = Workbook::new();
    for name in source.sheet_names() {
        let values = source
            .worksheet_range(&name)
            .map_err(|e| TableError::Format {
                path: path.display().to_string(),
                reason: format!("sheet '{name}': {e}"),
            })?;

        let formulas = match source.worksheet_formula(&name) {
            Ok(formulas) => Some(formulas),
            Err(e) => {
                tracing::debug!("No formulas read for sheet '{}': {}", name, e);
                None
            }
        };

        let sheet = build_sheet(&name, &values, formulas.as_ref(), outlines.get(&name));
        tracing::debug!(
            "Loaded sheet '{}' with {} rows from {}",
            name,
            sheet.rows.len(),
            path.display()
        );
        workbook.push_sheet(sheet);
    }

    Ok(workbook)
}

/// Reject paths that exist but cannot be read as a workbook at all
fn check_readable(path: &Path) -> Result<()> {
    if path.is_dir() {
        return Err(TableError::Io(std::io::Error::new(
            ErrorKind::InvalidInput,
            format!("{} is a directory", path.display()),
        )));
    }

    let mut file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::PermissionDenied => TableError::Access {
            path: path.display().to_string(),
            reason: e.to_string(),
        },
        _ => TableError::Io(e),
    })?;

    let mut signature = [0u8; 8];
    let is_compound_file = file.read_exact(&mut signature).is_ok() && signature == CFB_SIGNATURE;
    if is_compound_file && has_extension(path, &["xlsx", "xlsm"]) {
        return Err(TableError::Access {
            path: path.display().to_string(),
            reason: "workbook is password protected".to_string(),
        });
    }

    Ok(())
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)))
}

fn native_value(data: &Data) -> Option<NativeValue> {
    match data {
        Data::Empty => None,
        Data::String(s) => Some(NativeValue::Text(s.clone())),
        Data::Float(f) => Some(NativeValue::Number(*f)),
        Data::Int(i) => Some(NativeValue::Number(*i as f64)),
        Data::Bool(b) => Some(NativeValue::Boolean(*b)),
        // Dates are plain numbers in the workbook
        Data::DateTime(dt) => Some(NativeValue::Number(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(NativeValue::Text(s.clone())),
        Data::Error(_) => Some(NativeValue::Error),
    }
}

fn build_sheet(
    name: &str,
    values: &Range<Data>,
    formulas: Option<&Range<String>>,
    outline: Option<&RowOutline>,
) -> SheetData {
    let mut rows: BTreeMap<u32, RowData> = BTreeMap::new();

    if let Some(outline) = outline {
        for (&index, &level) in outline {
            let mut row = RowData::new(index);
            row.outline_level = level;
            rows.insert(index, row);
        }
    }

    if let Some((first_row, first_col)) = values.start() {
        for (r, c, data) in values.used_cells() {
            if let Some(value) = native_value(data) {
                let index = first_row + r as u32;
                rows.entry(index)
                    .or_insert_with(|| RowData::new(index))
                    .set_cell(first_col as usize + c, NativeCell::new(value));
            }
        }
    }

    // Formula cells report their source text, not the cached result
    if let Some(formulas) = formulas {
        if let Some((first_row, first_col)) = formulas.start() {
            for (r, c, source) in formulas.used_cells() {
                let index = first_row + r as u32;
                rows.entry(index)
                    .or_insert_with(|| RowData::new(index))
                    .set_cell(
                        first_col as usize + c,
                        NativeCell::new(NativeValue::Formula(source.clone())),
                    );
            }
        }
    }

    SheetData {
        name: name.to_string(),
        rows: rows.into_values().collect(),
        frozen_rows: 0,
    }
}

/// Read the `<row>` elements of every worksheet in an xlsx package.
///
/// calamine does not expose row outline levels, so the package is scanned a
/// second time. Failures only cost the grouping information.
fn read_row_outlines(path: &Path) -> HashMap<String, RowOutline> {
    let result = File::open(path)
        .map_err(zip::result::ZipError::Io)
        .and_then(ZipArchive::new)
        .and_then(|mut archive| {
            let targets = parse_relationships(&mut archive);
            let sheets = parse_sheet_targets(&mut archive, &targets)?;
            let mut outlines = HashMap::new();
            for (name, target) in sheets {
                match archive.by_name(&target) {
                    Ok(file) => {
                        outlines.insert(name, parse_row_outline(BufReader::new(file)));
                    }
                    Err(e) => tracing::debug!("Missing worksheet part {}: {}", target, e),
                }
            }
            Ok(outlines)
        });

    result.unwrap_or_else(|e| {
        tracing::debug!("Row outlines unavailable for {}: {}", path.display(), e);
        HashMap::new()
    })
}

fn attribute(e: &BytesStart, local_name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == local_name)
        .and_then(|attr| std::str::from_utf8(&attr.value).ok().map(str::to_string))
}

/// Map relationship ids of `xl/workbook.xml` to part names
fn parse_relationships<R: Read + Seek>(archive: &mut ZipArchive<R>) -> HashMap<String, String> {
    let mut targets = HashMap::new();
    let Ok(file) = archive.by_name("xl/_rels/workbook.xml.rels") else {
        return targets;
    };

    let mut xml = XmlReader::from_reader(BufReader::new(file));
    xml.trim_text(true);
    let mut buf = Vec::new();

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e) | Event::Start(ref e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                if let (Some(id), Some(target)) = (attribute(e, b"Id"), attribute(e, b"Target")) {
                    let full_path = match target.strip_prefix('/') {
                        Some(stripped) => stripped.to_string(),
                        None => format!("xl/{target}"),
                    };
                    targets.insert(id, full_path);
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    targets
}

/// List `(sheet name, worksheet part)` pairs in workbook order
fn parse_sheet_targets<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    targets: &HashMap<String, String>,
) -> zip::result::ZipResult<Vec<(String, String)>> {
    let file = archive.by_name("xl/workbook.xml")?;
    let mut xml = XmlReader::from_reader(BufReader::new(file));
    xml.trim_text(true);

    let mut sheets = Vec::new();
    let mut buf = Vec::new();

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e) | Event::Start(ref e)) if e.local_name().as_ref() == b"sheet" => {
                let target = attribute(e, b"id").and_then(|id| targets.get(&id).cloned());
                if let (Some(name), Some(target)) = (attribute(e, b"name"), target) {
                    sheets.push((name, target));
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(sheets)
}

/// Collect the outline level of every `<row>` element of one worksheet
fn parse_row_outline<R: std::io::BufRead>(reader: R) -> RowOutline {
    let mut xml = XmlReader::from_reader(reader);
    xml.trim_text(true);

    let mut outline = RowOutline::new();
    let mut next_index = 0u32;
    let mut buf = Vec::new();

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e) | Event::Start(ref e)) if e.local_name().as_ref() == b"row" => {
                // Row numbers are 1-based in XLSX and may be omitted
                let index = attribute(e, b"r")
                    .and_then(|r| r.parse::<u32>().ok())
                    .map_or(next_index, |r| r.saturating_sub(1));
                let level = attribute(e, b"outlineLevel")
                    .and_then(|l| l.parse::<u8>().ok())
                    .unwrap_or(0);
                outline.insert(index, level);
                next_index = index + 1;
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    outline
}
