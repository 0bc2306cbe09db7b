//! Minimal CSV rendering for export artifacts.

use std::borrow::Cow;

use uuid::Uuid;

const MAX_BASE_LEN: usize = 80;

/// Quotes `value` when it contains a quote, comma, or line break.
#[must_use]
pub fn csv_escape(value: &str) -> Cow<'_, str> {
    if value.contains(['"', ',', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

/// Renders a header line followed by one line per row.
#[must_use]
pub fn to_csv<I, R>(headers: &[&str], rows: I) -> String
where
    I: IntoIterator<Item = R>,
    R: IntoIterator<Item = String>,
{
    let mut out = join_line(headers.iter().copied());
    for row in rows {
        let cells: Vec<String> = row.into_iter().collect();
        out.push_str(&join_line(cells.iter().map(String::as_str)));
    }
    out
}

fn join_line<'a>(cells: impl Iterator<Item = &'a str>) -> String {
    let mut line = cells.map(csv_escape).collect::<Vec<_>>().join(",");
    line.push('\n');
    line
}

/// Reduces a caller-supplied name to `[A-Za-z0-9_-]`, at most 80 characters.
#[must_use]
pub fn safe_base(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_BASE_LEN)
        .collect();

    if cleaned.is_empty() {
        "export".to_string()
    } else {
        cleaned
    }
}

/// Unique file name for an export: `{safe_base}_{uuid}.csv`.
#[must_use]
pub fn export_file_name(base: &str) -> String {
    format!("{}_{}.csv", safe_base(base), Uuid::new_v4())
}
