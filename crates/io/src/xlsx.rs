// Excel import (xlsx, xls, xlsb, ods) of the first sheet, and xlsx export
// of plain string tables.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook};

/// Read the first sheet of a workbook as rows of display strings.
pub fn read_first_sheet(path: &Path) -> Result<Vec<Vec<String>>, String> {
    let mut workbook: Sheets<_> = open_workbook_auto(path)
        .map_err(|e| format!("Failed to open Excel file: {}", e))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| "Excel file contains no sheets".to_string())?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| format!("Failed to read sheet '{}': {}", sheet_name, e))?;

    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect())
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        // Tracking numbers typed as numbers come back as floats
        Data::Float(n) => {
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                format!("{}", n)
            }
        }
        Data::Int(n) => n.to_string(),
        Data::Bool(b) => if *b { "TRUE".into() } else { "FALSE".into() },
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::DateTime(dt) => format!("{}", dt.as_f64()),
        Data::Error(e) => format!("#{:?}", e),
    }
}

/// Write `rows` to a single-sheet workbook. The first row is written bold.
pub fn write_sheet(path: &Path, sheet_name: &str, rows: &[Vec<String>]) -> Result<(), String> {
    let mut workbook = XlsxWorkbook::new();
    let header_format = Format::new().set_bold();

    let worksheet = workbook
        .add_worksheet()
        .set_name(sheet_name)
        .map_err(|e| format!("Failed to create sheet '{}': {}", sheet_name, e))?;

    for (r, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            let written = if r == 0 {
                worksheet.write_string_with_format(r as u32, c as u16, value, &header_format)
            } else {
                worksheet.write_string(r as u32, c as u16, value)
            };
            written.map_err(|e| format!("Failed to write cell ({}, {}): {}", r, c, e))?;
        }
    }

    workbook
        .save(path)
        .map_err(|e| format!("Failed to save {}: {}", path.display(), e))
}
