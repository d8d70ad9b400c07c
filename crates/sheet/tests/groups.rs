use std::path::Path;
use tablebook_sheet::{CellValue, Group, TableDocument};
use tempfile::tempdir;

fn bounds(groups: &[Group]) -> Vec<(u32, u32)> {
    groups
        .iter()
        .map(|g| (g.start_index(), g.end_index()))
        .collect()
}

/// Write `rows` numbered rows with another tool and group the given ranges
fn grouped_fixture(path: &Path, rows: u32, ranges: &[(u32, u32)]) {
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Grouped").unwrap();
    for row in 0..rows {
        worksheet.write_number(row, 0, f64::from(row)).unwrap();
    }
    for &(first, last) in ranges {
        worksheet.group_rows(first, last).unwrap();
    }
    workbook.save(path).unwrap();
}

#[test]
fn test_flat_sheet_has_no_groups() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("flat.xlsx");
    grouped_fixture(&path, 4, &[]);

    let mut book = TableDocument::open(&path, false).unwrap();
    let reader = book.get_reader("Grouped").unwrap();
    assert!(reader.get_grouped_rows().is_empty());
    assert!(reader.get_row_groups(1).is_empty());
    book.close().unwrap();
}

#[test]
fn test_sibling_groups() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("siblings.xlsx");
    grouped_fixture(&path, 6, &[(1, 2), (4, 5)]);

    let mut book = TableDocument::open(&path, false).unwrap();
    let reader = book.get_reader("Grouped").unwrap();
    assert_eq!(bounds(reader.get_grouped_rows()), vec![(1, 2), (4, 5)]);
    book.close().unwrap();
}

#[test]
fn test_nested_groups() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested.xlsx");
    grouped_fixture(&path, 6, &[(1, 5), (1, 2), (4, 4)]);

    let mut book = TableDocument::open(&path, false).unwrap();
    let reader = book.get_reader("Grouped").unwrap();

    assert_eq!(bounds(&reader.get_row_groups(1)), vec![(1, 2), (1, 5)]);
    assert_eq!(bounds(&reader.get_row_groups(3)), vec![(1, 5)]);
    assert_eq!(bounds(&reader.get_row_groups(4)), vec![(4, 4), (1, 5)]);
    assert!(reader.get_row_groups(0).is_empty());
    book.close().unwrap();
}

#[test]
fn test_groups_do_not_depend_on_read_position() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("position.xlsx");
    grouped_fixture(&path, 4, &[(1, 3)]);

    let mut book = TableDocument::open(&path, false).unwrap();
    let mut reader = book.get_reader("Grouped").unwrap();
    reader.read_next_row();
    reader.read_next_row();

    assert_eq!(bounds(reader.get_grouped_rows()), vec![(1, 3)]);
    assert_eq!(reader.read_full().len(), 2);
    book.close().unwrap();
}

#[test]
fn test_groups_written_by_writer_survive_save() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("written.xlsx");

    let mut book = TableDocument::open(&path, false).unwrap();
    let mut writer = book.get_writer("Outline").unwrap();
    for i in 0..6 {
        writer.write_row(&[CellValue::from(i)]).unwrap();
    }
    writer.group_rows(1, 2).unwrap();
    writer.group_rows(4, 5).unwrap();
    writer.close().unwrap();
    book.close().unwrap();

    let mut book = TableDocument::open(&path, false).unwrap();
    let reader = book.get_reader("Outline").unwrap();
    assert_eq!(bounds(reader.get_grouped_rows()), vec![(1, 2), (4, 5)]);
    book.close().unwrap();
}

#[test]
fn test_group_ending_on_ignored_empty_row() {
    let dir = tempdir().unwrap();

    for (ignore_empty_rows, expected) in [(false, vec![(1, 2)]), (true, vec![(1, 1)])] {
        let path = dir.path().join(format!("empty_end_{ignore_empty_rows}.xlsx"));
        let mut book = TableDocument::open(&path, ignore_empty_rows).unwrap();
        let mut writer = book.get_writer("Data").unwrap();
        writer.write_row(&[CellValue::from("a")]).unwrap();
        writer.write_row(&[CellValue::from("b")]).unwrap();
        writer.write_row(&[CellValue::Blank]).unwrap();
        writer.group_rows(1, 2).unwrap();
        writer.close().unwrap();

        let reader = book.get_reader("Data").unwrap();
        assert_eq!(bounds(reader.get_grouped_rows()), expected);
        book.close().unwrap();
    }
}

#[test]
fn test_group_of_only_empty_rows_is_dropped() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("only_empty.xlsx");

    let mut book = TableDocument::open(&path, true).unwrap();
    let mut writer = book.get_writer("Data").unwrap();
    writer.write_row(&[CellValue::from("a")]).unwrap();
    writer.write_row(&[CellValue::Blank]).unwrap();
    writer.write_row(&[CellValue::Blank]).unwrap();
    writer.group_rows(1, 2).unwrap();
    writer.close().unwrap();

    let mut reader = book.get_reader("Data").unwrap();
    assert!(reader.get_grouped_rows().is_empty());
    assert_eq!(reader.read_full(), vec![vec!["a"]]);
    book.close().unwrap();
}

#[test]
fn test_groups_stay_within_retained_rows() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bounds.xlsx");

    let mut book = TableDocument::open(&path, true).unwrap();
    let mut writer = book.get_writer("Data").unwrap();
    let blank_rows = [2, 5, 6, 9];
    for i in 0..10 {
        if blank_rows.contains(&i) {
            writer.write_row(&[CellValue::Blank]).unwrap();
        } else {
            writer.write_row(&[CellValue::from(i)]).unwrap();
        }
    }
    writer.group_rows(1, 9).unwrap();
    writer.group_rows(2, 3).unwrap();
    writer.group_rows(5, 9).unwrap();
    writer.group_rows(8, 9).unwrap();
    writer.close().unwrap();

    let mut reader = book.get_reader("Data").unwrap();
    let retained = reader.read_full().len() as u32;
    assert_eq!(retained, 6);
    for group in reader.get_grouped_rows() {
        assert!(group.start_index() <= group.end_index(), "{group}");
        assert!(group.end_index() < retained, "{group}");
    }
    book.close().unwrap();
}
