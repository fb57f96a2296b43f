//! FILENAME: core/persistence/src/pdf.rs
//! PURPOSE: Renders an export grid to PDF bytes.
//! CONTEXT: A4 landscape, fixed column widths, header repeated on every
//! page. Cell text is truncated to the column width; this is a tabular
//! report, not a layout engine.

use crate::error::ExportError;
use crate::grid::{ExportGrid, GridCell};
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};

const PAGE_WIDTH: f64 = 297.0;
const PAGE_HEIGHT: f64 = 210.0;
const MARGIN: f64 = 10.0;
const ROW_STEP: f64 = 6.0;
const TITLE_SIZE: f64 = 13.0;
const CELL_SIZE: f64 = 8.0;
const MAX_CELL_CHARS: usize = 38;

pub fn write_pdf(grid: &ExportGrid, title: &str) -> Result<Vec<u8>, ExportError> {
    let (document, first_page, first_layer) =
        PdfDocument::new(title, Mm(PAGE_WIDTH as _), Mm(PAGE_HEIGHT as _), "Tabela");
    let font = document
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ExportError::Pdf(e.to_string()))?;
    let bold = document
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| ExportError::Pdf(e.to_string()))?;

    let columns = grid.width().max(1);
    let column_width = (PAGE_WIDTH - 2.0 * MARGIN) / columns as f64;

    let mut layer = document.get_page(first_page).get_layer(first_layer);
    layer.use_text(
        title,
        TITLE_SIZE as _,
        Mm(MARGIN as _),
        Mm((PAGE_HEIGHT - MARGIN) as _),
        &bold,
    );
    let mut y = PAGE_HEIGHT - MARGIN - 10.0;

    let draw_headers = |layer: &PdfLayerReference, y: &mut f64| {
        for header_row in &grid.header_rows {
            draw_text_row(layer, header_row, column_width, *y, &bold);
            *y -= ROW_STEP;
        }
    };

    draw_headers(&layer, &mut y);

    for body_row in &grid.body {
        if y < MARGIN + ROW_STEP {
            let (page, page_layer) =
                document.add_page(Mm(PAGE_WIDTH as _), Mm(PAGE_HEIGHT as _), "Tabela");
            layer = document.get_page(page).get_layer(page_layer);
            y = PAGE_HEIGHT - MARGIN;
            draw_headers(&layer, &mut y);
        }
        let cells: Vec<String> = body_row.iter().map(GridCell::display).collect();
        draw_text_row(&layer, &cells, column_width, y, &font);
        y -= ROW_STEP;
    }

    if y < MARGIN + ROW_STEP {
        let (page, page_layer) =
            document.add_page(Mm(PAGE_WIDTH as _), Mm(PAGE_HEIGHT as _), "Tabela");
        layer = document.get_page(page).get_layer(page_layer);
        y = PAGE_HEIGHT - MARGIN;
        draw_headers(&layer, &mut y);
    }
    let totals: Vec<String> = grid.totals.iter().map(GridCell::display).collect();
    draw_text_row(&layer, &totals, column_width, y, &bold);

    document
        .save_to_bytes()
        .map_err(|e| ExportError::Pdf(e.to_string()))
}

fn draw_text_row(
    layer: &PdfLayerReference,
    cells: &[String],
    column_width: f64,
    y: f64,
    font: &IndirectFontRef,
) {
    for (index, cell) in cells.iter().enumerate() {
        let text: String = cell.chars().take(MAX_CELL_CHARS).collect();
        if text.is_empty() {
            continue;
        }
        let x = MARGIN + index as f64 * column_width;
        layer.use_text(text, CELL_SIZE as _, Mm(x as _), Mm(y as _), font);
    }
}
