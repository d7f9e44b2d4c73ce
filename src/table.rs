use std::borrow::Cow;
use std::fmt::Write as _;

use crate::results::ResultSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

pub fn render_table(headers: &[String], rows: &[Vec<String>], aligns: &[Align]) -> String {
    let column_count = headers.len();
    let mut widths = headers.iter().map(|h| display_width(h)).collect::<Vec<_>>();

    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(display_width(cell));
        }
    }

    for width in &mut widths {
        *width = (*width).max(3);
    }

    let mut output = String::new();

    let _ = writeln!(output, "{}", format_row(headers, &widths, &[]));

    let separator_cells = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&separator_cells, &widths, &[]));

    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths, aligns));
    }

    output
}

/// Numeric columns are right-aligned; a column counts as numeric when every
/// non-NULL cell is.
pub fn render_result(result: &ResultSet) -> String {
    let aligns = (0..result.columns.len())
        .map(|idx| {
            let mut cells = result.rows.iter().filter_map(|row| row.get(idx)).filter(|c| !c.is_null());
            let mut any = false;
            let numeric = cells.all(|cell| {
                any = true;
                cell.is_numeric()
            });
            if numeric && any { Align::Right } else { Align::Left }
        })
        .collect::<Vec<_>>();
    render_table(&result.columns, &result.display_rows(), &aligns)
}

pub fn print_result(result: &ResultSet) {
    print!("{}", render_result(result));
}

fn format_row(values: &[String], widths: &[usize], aligns: &[Align]) -> String {
    let mut cells = Vec::with_capacity(values.len());
    for (idx, value) in values.iter().enumerate() {
        if idx >= widths.len() {
            break;
        }
        let sanitized = sanitize_cell(value);
        let padding = " ".repeat(widths[idx].saturating_sub(display_width(&sanitized)));
        let cell = match aligns.get(idx) {
            Some(Align::Right) => format!("{padding}{sanitized}"),
            _ => format!("{sanitized}{padding}"),
        };
        cells.push(cell);
    }
    let mut line = cells.join("  ");
    while line.ends_with(' ') {
        line.pop();
    }
    line
}

fn display_width(value: &str) -> usize {
    value.chars().count()
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}
