//! CSV export of the visible projection.
//!
//! Only the columns handed in are written; callers pass the visible subset.
//! Dates are reformatted to `MM/DD/YYYY`, truthy cells are quoted (embedded
//! quotes doubled) and falsy cells (`0`, `""`, `false`, null) become empty
//! fields.

use std::io::Write;
use std::path::Path;

use chrono::NaiveDate;

use crate::data::column::Column;
use crate::data::date::format_date;
use crate::data::row::Row;
use crate::data::value::CellValue;
use crate::Result;

/// Serialize `rows` over `columns` to a CSV string.
///
/// The header is the column labels joined with commas as-is. Lines are
/// joined with `\n`, with no trailing newline.
pub fn export_csv(rows: &[Row], columns: &[Column]) -> String {
    let header = columns
        .iter()
        .map(|c| c.label.as_str())
        .collect::<Vec<_>>()
        .join(",");

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(header);
    for row in rows {
        let fields: Vec<String> = columns
            .iter()
            .map(|c| row.get(&c.key).map(csv_cell).unwrap_or_default())
            .collect();
        lines.push(fields.join(","));
    }
    lines.join("\n")
}

/// Write the CSV for `rows` over `columns` into any sink.
pub fn write_csv<W: Write>(writer: &mut W, rows: &[Row], columns: &[Column]) -> Result<()> {
    writer.write_all(export_csv(rows, columns).as_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Write the CSV to a file, creating or truncating it.
pub fn export_to_file(path: impl AsRef<Path>, rows: &[Row], columns: &[Column]) -> Result<()> {
    let path = path.as_ref();
    let mut file = std::fs::File::create(path)?;
    write_csv(&mut file, rows, columns)?;
    log::info!("wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

/// One CSV field.
pub fn csv_cell(value: &CellValue) -> String {
    if let Some(date) = format_date(value) {
        return quote(&date);
    }
    if value.is_truthy() {
        quote(&value.to_string())
    } else {
        String::new()
    }
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Download name for an export: `<name-lowercased-with-dashes>-<YYYY-MM-DD>.csv`.
pub fn suggested_filename(report_name: &str, today: NaiveDate) -> String {
    let slug = report_name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase();
    let slug = if slug.is_empty() {
        "report".to_string()
    } else {
        slug
    };
    format!("{}-{}.csv", slug, today.format("%Y-%m-%d"))
}
