//! Plain-text table rendering for CLI output

use console::{pad_str, truncate_str, Alignment, Style};
use reportlib::{DeveloperQuery, ReportTable, ReportType};

/// Widest a column may grow before cells are truncated
const MAX_CELL_WIDTH: usize = 40;

/// Gap between columns
const COLUMN_GAP: &str = "  ";

/// Truncate a cell to fit within max_len, adding ".." suffix if needed
fn truncate_cell(cell: &str, max_len: usize) -> String {
    truncate_str(cell, max_len, "..").to_string()
}

fn column_widths(headers: &[String], rows: &[Vec<String>]) -> Vec<usize> {
    headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            rows.iter()
                .filter_map(|row| row.get(i))
                .map(|cell| console::measure_text_width(cell))
                .chain(std::iter::once(console::measure_text_width(header)))
                .max()
                .unwrap_or(0)
                .min(MAX_CELL_WIDTH)
        })
        .collect()
}

fn format_line(cells: &[String], widths: &[usize], numeric: &[bool]) -> String {
    cells
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(i, (cell, width))| {
            let align = if numeric.get(i).copied().unwrap_or(false) {
                Alignment::Right
            } else {
                Alignment::Left
            };
            let cell = truncate_cell(cell, *width);
            pad_str(&cell, *width, align, None).to_string()
        })
        .collect::<Vec<_>>()
        .join(COLUMN_GAP)
        .trim_end()
        .to_string()
}

/// Render headers, rows and an optional footer as an aligned grid.
pub fn render_grid(
    headers: &[String],
    rows: &[Vec<String>],
    numeric: &[bool],
    footer: Option<&str>,
) -> String {
    let header_style = Style::new().bold();
    let muted = Style::new().dim();

    let widths = column_widths(headers, rows);
    let separator_len = widths.iter().sum::<usize>() + COLUMN_GAP.len() * widths.len().saturating_sub(1);

    let mut output = String::new();
    output.push_str(&format!(
        "{}\n",
        header_style.apply_to(format_line(headers, &widths, numeric))
    ));
    output.push_str(&format!("{}\n", muted.apply_to("-".repeat(separator_len))));
    for row in rows {
        output.push_str(&format_line(row, &widths, numeric));
        output.push('\n');
    }
    if let Some(footer) = footer {
        output.push_str(&format!("{}\n", muted.apply_to("-".repeat(separator_len))));
        output.push_str(&format!("{}\n", footer));
    }
    output
}

/// Render a report table, title first when present.
pub fn render_report_table(table: &ReportTable) -> String {
    let mut output = String::new();
    if let Some(title) = &table.title {
        output.push_str(&format!("{}\n\n", Style::new().bold().apply_to(title)));
    }
    if table.headers.is_empty() {
        output.push_str("No data available\n");
        return output;
    }
    let rows: Vec<Vec<String>> = table.rows.iter().map(|r| r.values.clone()).collect();
    output.push_str(&render_grid(
        &table.headers,
        &rows,
        &table.numeric,
        Some(&table.footer),
    ));
    output
}

/// Render saved queries as a grid.
pub fn render_queries(queries: &[DeveloperQuery]) -> String {
    let headers: Vec<String> = ["ID", "Name", "Variation", "Status", "Created"]
        .iter()
        .map(|h| h.to_string())
        .collect();
    let rows: Vec<Vec<String>> = queries
        .iter()
        .map(|q| {
            vec![
                q.id.to_string(),
                q.name.clone(),
                q.variation_name.clone().unwrap_or_default(),
                q.status.to_string(),
                q.created_at.clone(),
            ]
        })
        .collect();
    let footer = format!("{} queries", queries.len());
    render_grid(&headers, &rows, &[true], Some(&footer))
}

/// Render one saved query with its SQL.
pub fn render_query_detail(query: &DeveloperQuery) -> String {
    let label = Style::new().bold();
    let mut output = String::new();
    output.push_str(&format!("{} {}\n", label.apply_to("ID:       "), query.id));
    output.push_str(&format!("{} {}\n", label.apply_to("Name:     "), query.name));
    if let Some(variation) = &query.variation_name {
        output.push_str(&format!("{} {}\n", label.apply_to("Variation:"), variation));
    }
    output.push_str(&format!("{} {}\n", label.apply_to("Status:   "), query.status));
    output.push_str(&format!("{} {}\n", label.apply_to("Created:  "), query.created_at));
    output.push_str(&format!("\n{}\n", query.query));
    output
}

/// Render report types with their column keys.
pub fn render_report_types(report_types: &[ReportType]) -> String {
    let headers: Vec<String> = ["Type", "Name", "Columns", "Query"]
        .iter()
        .map(|h| h.to_string())
        .collect();
    let rows: Vec<Vec<String>> = report_types
        .iter()
        .map(|rt| {
            vec![
                rt.kind.clone(),
                rt.name.clone(),
                rt.columns
                    .iter()
                    .map(|c| c.key.as_str())
                    .collect::<Vec<_>>()
                    .join(","),
                rt.query_name.clone().unwrap_or_default(),
            ]
        })
        .collect();
    render_grid(&headers, &rows, &[], None)
}
