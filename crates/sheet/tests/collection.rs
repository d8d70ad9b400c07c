use std::fs;
use tablebook_sheet::{
    open_collection, read_tables, BookOptions, CellValue, CsvOptions, TableCollection, TableError,
};
use tempfile::tempdir;

#[test]
fn test_csv_collection() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("measurements.csv");
    fs::write(&path, "sep=;\nfile;lines\nmain.c;120\n").unwrap();

    let tables = read_tables(&path, &BookOptions::default()).unwrap();
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].name, "measurements");
    assert_eq!(
        tables[0].rows,
        vec![vec!["file", "lines"], vec!["main.c", "120"]]
    );
}

#[test]
fn test_csv_delimiter_from_options() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tabs.csv");
    fs::write(&path, "a\tb\n").unwrap();

    let options = BookOptions::default().with_csv(CsvOptions::default().with_delimiter(b'\t'));
    let tables = read_tables(&path, &options).unwrap();
    assert_eq!(tables[0].rows, vec![vec!["a", "b"]]);
}

#[test]
fn test_copy_workbook_to_csv() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("source.xlsx");
    let target = dir.path().join("copy.csv");

    let mut book = open_collection(&source, &BookOptions::default()).unwrap();
    let mut writer = book.get_writer("Data").unwrap();
    writer.write_header(&["id".into(), "flag".into()]).unwrap();
    writer.write_row(&[1.into(), false.into()]).unwrap();
    writer.close().unwrap();
    drop(writer);
    book.close().unwrap();

    let tables = read_tables(&source, &BookOptions::default()).unwrap();
    let mut csv = open_collection(&target, &BookOptions::default()).unwrap();
    let mut writer = csv.get_writer("copy").unwrap();
    for row in &tables[0].rows {
        let values: Vec<CellValue> = row.iter().map(CellValue::from).collect();
        writer.write_row(&values).unwrap();
    }
    writer.close().unwrap();
    drop(writer);
    csv.close().unwrap();

    assert_eq!(fs::read_to_string(&target).unwrap(), "id,flag\n1.0,false\n");
    assert_eq!(csv.files().len(), 1);
}

#[test]
fn test_unknown_format() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    fs::write(&path, "hello").unwrap();

    assert!(matches!(
        read_tables(&path, &BookOptions::default()),
        Err(TableError::Unsupported(_))
    ));
}
