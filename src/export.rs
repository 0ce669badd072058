use crate::error::AnnotateError;
use crate::models::Judgment;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::info;

const BYTE_ORDER_MARK: &str = "\u{feff}";
const SCORES_FIELD: &str = "evaluation_scores";
const SCORE_COLUMN_PREFIX: &str = "score_";

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

/// A serialized set of judgments and the file name it should be saved under
#[derive(Debug, Clone)]
pub struct Export {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Serialize judgments in the given format
pub fn render(judgments: &[Judgment], format: ExportFormat) -> Result<Vec<u8>, AnnotateError> {
    match format {
        ExportFormat::Csv => to_csv(judgments),
        ExportFormat::Json => to_json(judgments),
    }
}

/// `evaluations_<key>_<YYYYmmdd_HHMMSS>.<ext>`, with spaces in the key replaced
pub fn file_name(key: &str, format: ExportFormat, at: DateTime<Local>) -> String {
    format!(
        "evaluations_{}_{}.{}",
        key.replace(' ', "_"),
        at.format("%Y%m%d_%H%M%S"),
        format.extension()
    )
}

/// Write an export into `dir`, creating the directory if needed
pub fn write_export(dir: &Path, export: &Export) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    let path = dir.join(&export.file_name);
    std::fs::write(&path, &export.bytes)
        .with_context(|| format!("Failed to write export file: {}", path.display()))?;

    info!(path = %path.display(), bytes = export.bytes.len(), "export written");
    Ok(path)
}

fn to_json(judgments: &[Judgment]) -> Result<Vec<u8>, AnnotateError> {
    Ok(serde_json::to_vec_pretty(judgments)?)
}

/// CSV with a BOM so spreadsheet tools pick up UTF-8
fn to_csv(judgments: &[Judgment]) -> Result<Vec<u8>, AnnotateError> {
    let rows = judgments
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()?;

    let table = flatten_scores(&rows).unwrap_or_else(|| Table::from_rows(&rows));
    let mut out = String::from(BYTE_ORDER_MARK);
    table.write_csv(&mut out);
    Ok(out.into_bytes())
}

struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// One column per top-level field, nested values left as they are
    fn from_rows(rows: &[Value]) -> Self {
        let objects: Vec<Map<String, Value>> = rows
            .iter()
            .map(|row| match row {
                Value::Object(map) => map.clone(),
                other => {
                    let mut map = Map::new();
                    map.insert("value".to_string(), other.clone());
                    map
                }
            })
            .collect();

        let mut columns = Vec::new();
        for object in &objects {
            add_columns(&mut columns, object.keys().cloned());
        }
        Self::build(columns, &objects)
    }

    fn build(columns: Vec<String>, objects: &[Map<String, Value>]) -> Self {
        let rows = objects
            .iter()
            .map(|object| {
                columns
                    .iter()
                    .map(|column| object.get(column).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();
        Self { columns, rows }
    }

    fn write_csv(&self, out: &mut String) {
        write_line(out, self.columns.iter().map(|c| escape(c)));
        for row in &self.rows {
            write_line(out, row.iter().map(|value| escape(&cell(value))));
        }
    }
}

/// Spread each row's score map into `score_<question>` columns after the other fields.
///
/// Returns `None` when any row lacks a flat score map.
fn flatten_scores(rows: &[Value]) -> Option<Table> {
    let mut base_columns = Vec::new();
    let mut score_columns = Vec::new();
    let mut objects = Vec::with_capacity(rows.len());

    for row in rows {
        let fields = row.as_object()?;
        let scores = match fields.get(SCORES_FIELD)? {
            Value::Object(scores) => scores,
            _ => return None,
        };
        if scores.values().any(|v| v.is_object() || v.is_array()) {
            return None;
        }

        let mut object: Map<String, Value> = fields
            .iter()
            .filter(|(name, _)| name.as_str() != SCORES_FIELD)
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        add_columns(&mut base_columns, object.keys().cloned());
        for (question, score) in scores {
            let column = format!("{}{}", SCORE_COLUMN_PREFIX, question);
            add_columns(&mut score_columns, std::iter::once(column.clone()));
            object.insert(column, score.clone());
        }
        objects.push(object);
    }

    base_columns.extend(score_columns);
    Some(Table::build(base_columns, &objects))
}

fn add_columns(columns: &mut Vec<String>, names: impl Iterator<Item = String>) {
    for name in names {
        if !columns.contains(&name) {
            columns.push(name);
        }
    }
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn write_line(out: &mut String, fields: impl Iterator<Item = String>) {
    let fields: Vec<String> = fields.collect();
    out.push_str(&fields.join(","));
    out.push('\n');
}
