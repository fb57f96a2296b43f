//! FILENAME: core/persistence/src/excel.rs
//! PURPOSE: Renders an export grid to XLSX bytes.
//! CONTEXT: One sheet, bold frozen header rows, numeric cells formatted as
//! `#,##0.00` (or `R$ #,##0.00` for currency results).

use crate::error::ExportError;
use crate::grid::{ExportGrid, GridCell};
use rust_xlsxwriter::{Format, Workbook};

pub fn write_excel(grid: &ExportGrid, sheet_name: &str) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;

    let header_format = Format::new().set_bold();
    let number_format = Format::new().set_num_format(if grid.currency {
        "R$ #,##0.00"
    } else {
        "#,##0.00"
    });
    let total_format = Format::new().set_bold().set_num_format(if grid.currency {
        "R$ #,##0.00"
    } else {
        "#,##0.00"
    });

    let mut row_index: u32 = 0;
    for header_row in &grid.header_rows {
        for (col, label) in header_row.iter().enumerate() {
            worksheet.write_string_with_format(row_index, col as u16, label, &header_format)?;
        }
        row_index += 1;
    }
    worksheet.set_freeze_panes(row_index, 0)?;

    for body_row in &grid.body {
        for (col, cell) in body_row.iter().enumerate() {
            write_cell(worksheet, row_index, col as u16, cell, &number_format)?;
        }
        row_index += 1;
    }

    for (col, cell) in grid.totals.iter().enumerate() {
        match cell {
            GridCell::Empty => {}
            GridCell::Text(text) => {
                worksheet.write_string_with_format(row_index, col as u16, text, &header_format)?;
            }
            GridCell::Number(value) => {
                worksheet.write_number_with_format(row_index, col as u16, *value, &total_format)?;
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

fn write_cell(
    worksheet: &mut rust_xlsxwriter::Worksheet,
    row: u32,
    col: u16,
    cell: &GridCell,
    number_format: &Format,
) -> Result<(), ExportError> {
    match cell {
        GridCell::Empty => {}
        GridCell::Text(text) => {
            worksheet.write_string(row, col, text)?;
        }
        GridCell::Number(value) => {
            worksheet.write_number_with_format(row, col, *value, number_format)?;
        }
    }
    Ok(())
}
