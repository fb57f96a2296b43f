//! FILENAME: core/persistence/src/spreadsheet.rs
//! PURPOSE: XLS/XLSX decoding via calamine.
//! CONTEXT: A sheet named "Planilha1" or "Sheet1" is preferred when
//! present; otherwise the first sheet is used. Cells stringify into the
//! shared raw grid so inference applies uniformly.

use crate::error::LoadError;
use crate::loader::RawGrid;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::io::Cursor;

const PREFERRED_SHEETS: [&str; 2] = ["planilha1", "sheet1"];

pub fn read_grid(content: &[u8]) -> Result<RawGrid, LoadError> {
    let cursor = Cursor::new(content.to_vec());
    let mut workbook =
        open_workbook_auto_from_rs(cursor).map_err(|e| LoadError::Malformed(e.to_string()))?;

    let sheet_names = workbook.sheet_names().to_vec();
    if sheet_names.is_empty() {
        return Err(LoadError::EmptyInput);
    }

    let chosen = sheet_names
        .iter()
        .find(|name| PREFERRED_SHEETS.contains(&name.to_lowercase().as_str()))
        .unwrap_or(&sheet_names[0])
        .clone();

    let range = workbook
        .worksheet_range(&chosen)
        .map_err(|e| LoadError::Malformed(e.to_string()))?;

    let mut lines = range
        .rows()
        .map(|row| row.iter().map(stringify_cell).collect::<Vec<String>>())
        .filter(|cells| cells.iter().any(|c| !c.is_empty()));

    let headers = match lines.next() {
        Some(cells) => cells,
        None => return Ok(RawGrid::default()),
    };
    let rows: Vec<Vec<String>> = lines.collect();

    Ok(RawGrid { headers, rows })
}

fn stringify_cell(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{}", *f as i64)
            } else {
                format!("{}", f)
            }
        }
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(value) => value.format("%Y-%m-%d").to_string(),
            None => String::new(),
        },
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("{:?}", e),
    }
}
