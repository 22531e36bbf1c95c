// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use printpdf::{
    BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point,
};
use roster_app::{EXPORT_COLUMNS, Record, export_rows};
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::macros::format_description;

pub const DOCUMENT_TITLE: &str = "Student Records";
pub const EXPORT_FILE_NAME: &str = "student_records.pdf";

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;
const HEADER_BLOCK_MM: f32 = 30.0;
const ROW_HEIGHT_MM: f32 = 9.0;
const CELL_PADDING_MM: f32 = 1.5;
const TITLE_SIZE_PT: f32 = 16.0;
const META_SIZE_PT: f32 = 8.0;
const CELL_SIZE_PT: f32 = 10.0;
const MAX_CELL_CHARS: usize = 18;
const LAYER_NAME: &str = "records";

/// Renders the records into an A4 table with the fixed export columns. Rows
/// that overflow a page continue on the next one, each page repeating the
/// header row.
pub fn render_records_pdf(records: &[Record], generated_at: OffsetDateTime) -> Result<Vec<u8>> {
    let rows = export_rows(records);
    let pages = page_ranges(rows.len(), rows_per_page());
    let page_count = pages.len();

    let (doc, first_page, first_layer) = PdfDocument::new(
        DOCUMENT_TITLE,
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        LAYER_NAME,
    );
    let regular = builtin_font(&doc, BuiltinFont::Helvetica)?;
    let bold = builtin_font(&doc, BuiltinFont::HelveticaBold)?;
    let generated = format_generated_at(generated_at);

    for (page_index, range) in pages.into_iter().enumerate() {
        let layer = if page_index == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page, layer) = doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), LAYER_NAME);
            doc.get_page(page).get_layer(layer)
        };

        let top = PAGE_HEIGHT_MM - MARGIN_MM;
        layer.use_text(DOCUMENT_TITLE, TITLE_SIZE_PT, Mm(MARGIN_MM), Mm(top), &bold);
        layer.use_text(
            format!(
                "{generated} - page {} of {page_count} - {} records",
                page_index + 1,
                rows.len()
            ),
            META_SIZE_PT,
            Mm(MARGIN_MM),
            Mm(top - 7.0),
            &regular,
        );

        let mut baseline = top - HEADER_BLOCK_MM + ROW_HEIGHT_MM;
        draw_row(&layer, &EXPORT_COLUMNS.map(str::to_owned), baseline, &bold);
        for row in &rows[range] {
            baseline -= ROW_HEIGHT_MM;
            draw_row(&layer, row, baseline, &regular);
        }
    }

    doc.save_to_bytes()
        .map_err(|error| anyhow!("serialize PDF document: {error:?}"))
}

/// Writes the export into `dir`, creating the directory when missing.
pub fn write_records_pdf(
    records: &[Record],
    dir: &Path,
    generated_at: OffsetDateTime,
) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("create export directory {}", dir.display()))?;
    let bytes = render_records_pdf(records, generated_at)?;
    let path = dir.join(EXPORT_FILE_NAME);
    fs::write(&path, &bytes).with_context(|| format!("write PDF {}", path.display()))?;
    tracing::info!(
        event = "roster.export.written",
        path = %path.display(),
        records = records.len(),
        bytes = bytes.len()
    );
    Ok(path)
}

fn builtin_font(doc: &PdfDocumentReference, font: BuiltinFont) -> Result<IndirectFontRef> {
    doc.add_builtin_font(font)
        .map_err(|error| anyhow!("load builtin PDF font: {error:?}"))
}

fn draw_row(layer: &PdfLayerReference, cells: &[String; 5], baseline: f32, font: &IndirectFontRef) {
    let column_width = column_width_mm();
    for (index, cell) in cells.iter().enumerate() {
        let x = MARGIN_MM + column_width * index as f32 + CELL_PADDING_MM;
        layer.use_text(
            truncate_cell(cell, MAX_CELL_CHARS),
            CELL_SIZE_PT,
            Mm(x),
            Mm(baseline),
            font,
        );
    }

    let rule_y = baseline - ROW_HEIGHT_MM / 3.0;
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(MARGIN_MM), Mm(rule_y)), false),
            (Point::new(Mm(PAGE_WIDTH_MM - MARGIN_MM), Mm(rule_y)), false),
        ],
        is_closed: false,
    });
}

fn column_width_mm() -> f32 {
    (PAGE_WIDTH_MM - 2.0 * MARGIN_MM) / EXPORT_COLUMNS.len() as f32
}

fn rows_per_page() -> usize {
    let usable = PAGE_HEIGHT_MM - 2.0 * MARGIN_MM - HEADER_BLOCK_MM;
    ((usable / ROW_HEIGHT_MM).floor() as usize).max(1)
}

/// An empty export still produces one page with the header row.
fn page_ranges(total: usize, per_page: usize) -> Vec<Range<usize>> {
    if total == 0 {
        return vec![0..0];
    }
    (0..total)
        .step_by(per_page)
        .map(|start| start..(start + per_page).min(total))
        .collect()
}

fn truncate_cell(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_owned();
    }
    let kept: String = value.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{kept}...")
}

fn format_generated_at(at: OffsetDateTime) -> String {
    at.format(format_description!(
        "Generated [year]-[month]-[day] [hour]:[minute] UTC"
    ))
    .unwrap_or_else(|_| "Generated".to_owned())
}
