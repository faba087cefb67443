//! Row export helpers.
//!
//! Turns parsed rows into machine-readable text: JSON through serde, and
//! RFC 4180 CSV with quoting only where the content requires it.

use crate::jet::database::Row;
use crate::jet::value::Value;

/// Serialize rows as pretty-printed JSON.
pub fn rows_to_json(rows: &[Row]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(rows)
}

/// Render rows as CSV. The header comes from the first row's column names;
/// every row of a table carries the same columns.
pub fn rows_to_csv(rows: &[Row]) -> String {
    let Some(first) = rows.first() else {
        return String::new();
    };
    let columns: Vec<&String> = first.data.keys().collect();

    let mut out = String::new();
    out.push_str(
        &columns
            .iter()
            .map(|c| csv_escape_str(c))
            .collect::<Vec<_>>()
            .join(","),
    );
    out.push('\n');

    for row in rows {
        let line = columns
            .iter()
            .map(|c| row.data.get(*c).map_or(String::new(), csv_escape))
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(&line);
        out.push('\n');
    }
    out
}

/// CSV-escape a decoded value per RFC 4180.
///
/// Nulls produce an empty field; numbers and booleans print bare; strings
/// are quoted when they contain commas, quotes, or newlines, with internal
/// quotes doubled.
pub fn csv_escape(val: &Value) -> String {
    match val {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Int(n) => n.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Double(d) => d.to_string(),
        Value::Str(s) => csv_escape_str(s),
    }
}

fn csv_escape_str(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
