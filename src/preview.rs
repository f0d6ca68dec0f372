//! Terminal preview of the extracted transactions CSV
//!
//! Parses the first rows of the downloaded result and lays them out as a
//! fixed-width text table.

use anyhow::{Context, Result};
use std::io::Cursor;

/// Widest a rendered column may get before cells are cut
const MAX_COLUMN_WIDTH: usize = 28;

/// The parsed head of a CSV file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvPreview {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Data rows in the whole file, excluding the header
    pub total_rows: usize,
}

impl CsvPreview {
    /// Parse `data`, keeping at most `limit` data rows
    pub fn parse(data: &[u8], limit: usize) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(detect_delimiter(data))
            .flexible(true)
            .from_reader(Cursor::new(data));

        let headers: Vec<String> = reader
            .headers()
            .context("Failed to read CSV headers")?
            .iter()
            .enumerate()
            .map(|(i, name)| {
                if name.trim().is_empty() {
                    format!("Column {}", i + 1)
                } else {
                    name.trim().to_string()
                }
            })
            .collect();

        let mut rows = Vec::new();
        let mut total_rows = 0;
        for result in reader.records() {
            total_rows += 1;
            match result {
                Ok(record) if rows.len() < limit => {
                    let mut row: Vec<String> = record.iter().map(|f| f.to_string()).collect();
                    row.resize(headers.len(), String::new());
                    rows.push(row);
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("Skipping malformed CSV row {}: {}", total_rows, e),
            }
        }

        Ok(Self {
            headers,
            rows,
            total_rows,
        })
    }

    pub fn has_more(&self) -> bool {
        self.total_rows > self.rows.len()
    }

    /// Render as a text table followed by a row count line
    pub fn render(&self) -> String {
        let widths: Vec<usize> = (0..self.headers.len())
            .map(|col| {
                self.rows
                    .iter()
                    .map(|row| row[col].chars().count())
                    .chain(std::iter::once(self.headers[col].chars().count()))
                    .max()
                    .unwrap_or(0)
                    .min(MAX_COLUMN_WIDTH)
            })
            .collect();

        let mut out = String::new();
        out.push_str(&render_line(&self.headers, &widths));
        out.push('\n');
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        out.push_str(&rule.join("-+-"));
        out.push('\n');
        for row in &self.rows {
            out.push_str(&render_line(row, &widths));
            out.push('\n');
        }

        if self.has_more() {
            out.push_str(&format!(
                "({} of {} transactions shown)",
                self.rows.len(),
                self.total_rows
            ));
        } else {
            out.push_str(&format!("({} transactions)", self.total_rows));
        }
        out
    }
}

/// Pick the most frequent of `,` `\t` `;` `|` in the first line.
///
/// Ties go to tab, then `;`, then `|`; comma only wins outright or when none appear.
pub fn detect_delimiter(data: &[u8]) -> u8 {
    let first_line_end = data.iter().position(|&b| b == b'\n').unwrap_or(data.len());
    let first_line = &data[..first_line_end];

    let mut best = (b',', 0);
    for candidate in [b'\t', b';', b'|', b','] {
        let count = first_line.iter().filter(|&&b| b == candidate).count();
        if count > best.1 {
            best = (candidate, count);
        }
    }
    best.0
}

fn render_line(cells: &[String], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", fit(cell, *width), width = *width))
        .collect::<Vec<_>>()
        .join(" | ")
        .trim_end()
        .to_string()
}

/// Flatten newlines and cut to `width` characters
fn fit(cell: &str, width: usize) -> String {
    let flat = cell.replace(['\r', '\n'], " ");
    if flat.chars().count() <= width {
        return flat;
    }
    let mut cut: String = flat.chars().take(width.saturating_sub(1)).collect();
    cut.push('~');
    cut
}
