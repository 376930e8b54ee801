use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::LogError, models::ClassLabel, utils::time::iso_instant};

use super::LogEntry;

pub const CSV_HEADER: &str = "timestamp,label,probability";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LogFormat {
    /// Header row, comma separated, probability at 4 decimals.
    Csv,
    /// `timestamp, label, probability` lines, probability at 2 decimals.
    PlainText,
}

impl LogFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            LogFormat::Csv => "csv",
            LogFormat::PlainText => "txt",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            LogFormat::Csv => "text/csv",
            LogFormat::PlainText => "text/plain",
        }
    }
}

pub(super) fn render(entries: &[LogEntry], format: LogFormat) -> String {
    let mut out = String::new();
    match format {
        LogFormat::Csv => {
            out.push_str(CSV_HEADER);
            out.push('\n');
            for entry in entries {
                out.push_str(&format!(
                    "{},{},{:.4}\n",
                    iso_instant(entry.timestamp),
                    escape_field(entry.label.as_str()),
                    entry.probability
                ));
            }
        }
        LogFormat::PlainText => {
            for entry in entries {
                out.push_str(&format!(
                    "{}, {}, {:.2}\n",
                    iso_instant(entry.timestamp),
                    entry.label,
                    entry.probability
                ));
            }
        }
    }
    out
}

fn escape_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Reads back a CSV export produced by `SessionLog::serialize(LogFormat::Csv)`.
pub fn parse_csv(bytes: &[u8]) -> Result<Vec<LogEntry>, LogError> {
    let text = std::str::from_utf8(bytes).map_err(|err| LogError::Malformed {
        line: 0,
        reason: err.to_string(),
    })?;

    let mut rows = split_records(text).into_iter().enumerate();
    match rows.next() {
        Some((_, header)) if header.join(",") == CSV_HEADER => {}
        _ => {
            return Err(LogError::Malformed {
                line: 1,
                reason: format!("expected header '{CSV_HEADER}'"),
            })
        }
    }

    let mut entries = Vec::new();
    for (idx, fields) in rows {
        let line = idx + 1;
        let malformed = |reason: String| LogError::Malformed { line, reason };

        let [timestamp, label, probability] = fields.as_slice() else {
            return Err(malformed(format!("expected 3 fields, found {}", fields.len())));
        };

        let timestamp = DateTime::parse_from_rfc3339(timestamp)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|err| malformed(format!("bad timestamp '{timestamp}': {err}")))?;
        let probability: f64 = probability
            .parse()
            .map_err(|err| malformed(format!("bad probability '{probability}': {err}")))?;

        entries.push(LogEntry {
            timestamp,
            label: ClassLabel::new(label.clone()),
            probability,
        });
    }

    Ok(entries)
}

fn split_records(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut field)),
            '\r' if !in_quotes => {}
            '\n' if !in_quotes => {
                fields.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut fields));
            }
            _ => field.push(ch),
        }
    }

    if !field.is_empty() || !fields.is_empty() {
        fields.push(field);
        records.push(fields);
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_with_commas_survive_round_trip() {
        let entries = vec![LogEntry {
            timestamp: Utc::now(),
            label: ClassLabel::new("Lee, \"Kai\""),
            probability: 0.5,
        }];
        let rendered = render(&entries, LogFormat::Csv);
        assert!(rendered.contains("\"Lee, \"\"Kai\"\"\""));

        let parsed = parse_csv(rendered.as_bytes()).unwrap();
        assert_eq!(parsed[0].label.as_str(), "Lee, \"Kai\"");
    }

    #[test]
    fn rejects_missing_header() {
        let err = parse_csv(b"2026-10-19T08:00:00.000Z,A,0.9500\n").unwrap_err();
        assert!(matches!(err, LogError::Malformed { line: 1, .. }));
    }

    #[test]
    fn rejects_short_rows() {
        let err = parse_csv(b"timestamp,label,probability\n2026-10-19T08:00:00.000Z,A\n")
            .unwrap_err();
        assert!(matches!(err, LogError::Malformed { line: 2, .. }));
    }
}
