//! Raw data conversion: label CSV normalization, report text cleaning,
//! label merge and JSONL plumbing.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use esgtune_core::RawDocument;

/// Convert the raw label CSV (`;` separated, `,` decimal mark) into a plain
/// comma-separated file with `.` decimals.
pub fn convert_csv_format(content: &str) -> String {
    content.replace(',', ".").replace(';', ",")
}

/// File wrapper around [`convert_csv_format`].
pub fn convert_csv_file(input: &Path, output: &Path) -> Result<()> {
    let content = std::fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    create_parent(output)?;
    std::fs::write(output, convert_csv_format(&content))
        .with_context(|| format!("failed to write {}", output.display()))?;
    tracing::info!(input = %input.display(), output = %output.display(), "converted label CSV");
    Ok(())
}

/// Normalizes report text scraped from PDF/HTML renderings.
pub struct TextCleaner {
    dots: Regex,
    spaced_dots: Regex,
    render_error: Regex,
}

impl TextCleaner {
    pub fn new() -> Result<Self> {
        Ok(Self {
            dots: Regex::new(r"\.{2,}")?,
            spaced_dots: Regex::new(r"(?:\.\s*){2,}")?,
            render_error: Regex::new(
                r"This page contains the following errors: error on line.{0,10}at column.{0,10}: Extra content at the end of the document Below is a rendering of the page up to the first error\.",
            )?,
        })
    }

    /// Collapse dot leaders, drop the browser XML error banner, trim.
    pub fn clean(&self, text: &str) -> String {
        let text = self.dots.replace_all(text, ".");
        let text = self.spaced_dots.replace_all(&text, ". ");
        let text = self.render_error.replace_all(&text, "");
        text.trim().to_string()
    }
}

/// Clean the `text` field of every record in a JSONL file.
///
/// Blank lines are skipped; records without `text` are passed through.
/// Returns the number of cleaned records.
pub fn clean_jsonl(input: &Path, output: &Path) -> Result<usize> {
    let cleaner = TextCleaner::new()?;
    let records: Vec<Value> = read_jsonl(input)?;

    let mut processed = 0usize;
    let cleaned: Vec<Value> = records
        .into_iter()
        .map(|mut record| {
            if let Some(text) = record.get("text").and_then(Value::as_str) {
                let text = cleaner.clean(text);
                record["text"] = Value::String(text);
                processed += 1;
            }
            record
        })
        .collect();

    write_jsonl(output, &cleaned)?;
    tracing::info!(records = processed, output = %output.display(), "cleaned report text");
    Ok(processed)
}

/// Label rows keyed by report name.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelTable {
    columns: Vec<String>,
    rows: HashMap<String, Vec<f64>>,
}

impl LabelTable {
    /// Parse a comma-separated table with a header row. `key_column` names
    /// the report-name column; every other column is a numeric label in
    /// header order. Fields may be quoted; headers and fields are trimmed.
    pub fn parse(content: &str, key_column: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let header: Vec<String> = reader
            .headers()
            .context("failed to read label table header")?
            .iter()
            .map(str::to_string)
            .collect();
        if header.is_empty() {
            bail!("label table is empty");
        }
        let Some(key_index) = header.iter().position(|h| h == key_column) else {
            bail!("label table has no {key_column:?} column");
        };
        let columns: Vec<String> = header
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != key_index)
            .map(|(_, h)| h.clone())
            .collect();

        let mut rows = HashMap::new();
        for record in reader.records() {
            let record = record.context("failed to read label table row")?;
            let line = record.position().map_or(0, |p| p.line());
            if record.len() != header.len() {
                bail!(
                    "label table row {line} has {} fields, expected {}",
                    record.len(),
                    header.len()
                );
            }

            let mut values = Vec::with_capacity(columns.len());
            for (i, field) in record.iter().enumerate() {
                if i == key_index {
                    continue;
                }
                let value: f64 = field.parse().with_context(|| {
                    format!("label table row {line}: {field:?} is not a number")
                })?;
                values.push(value);
            }
            rows.insert(record[key_index].to_string(), values);
        }

        tracing::info!(rows = rows.len(), labels = columns.len(), "loaded label table");
        Ok(Self { columns, rows })
    }

    pub fn from_file(path: &Path, key_column: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&content, key_column)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, report_name: &str) -> Option<&[f64]> {
        self.rows.get(report_name).map(Vec::as_slice)
    }
}

/// Outcome counters of a label merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub matched: usize,
    pub unmatched: usize,
}

/// A report joined with its label row, labels still as parsed floats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedRecord {
    pub text: String,
    pub labels: Vec<f64>,
}

/// Join report records with their label rows.
///
/// Reports with no label row get `[0.0; num_labels]` and are counted as
/// unmatched. A matched row of the wrong width is an error.
pub fn merge_with_labels(
    records: &[Value],
    table: &LabelTable,
    name_field: &str,
    num_labels: usize,
) -> Result<(Vec<MergedRecord>, MergeStats)> {
    let mut stats = MergeStats::default();
    let mut merged = Vec::with_capacity(records.len());

    for record in records {
        let name = record
            .get(name_field)
            .and_then(Value::as_str)
            .unwrap_or("")
            .trim();
        let text = record.get("text").and_then(Value::as_str).unwrap_or("");

        let labels = match table.get(name) {
            Some(row) => {
                if row.len() != num_labels {
                    bail!(
                        "label row for {name:?} has {} values, expected {num_labels}",
                        row.len()
                    );
                }
                stats.matched += 1;
                row.to_vec()
            }
            None => {
                tracing::warn!(report = name, "no labels for report");
                stats.unmatched += 1;
                vec![0.0; num_labels]
            }
        };

        merged.push(MergedRecord {
            text: text.to_string(),
            labels,
        });
    }

    tracing::info!(
        matched = stats.matched,
        unmatched = stats.unmatched,
        "merged reports with labels"
    );
    Ok((merged, stats))
}

/// Truncate float label cells to integers, yielding final dataset rows.
pub fn convert_labels_to_int(records: Vec<MergedRecord>) -> Vec<RawDocument> {
    records
        .into_iter()
        .map(|record| {
            let labels = record.labels.iter().map(|&v| v as i64).collect();
            RawDocument::new(record.text, Some(labels))
        })
        .collect()
}

/// Read one JSON value per non-blank line.
pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut items = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let item = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: invalid record", path.display(), line_no + 1))?;
        items.push(item);
    }
    Ok(items)
}

/// Write one JSON value per line, creating parent directories.
pub fn write_jsonl<T: Serialize>(path: &Path, items: &[T]) -> Result<usize> {
    create_parent(path)?;
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for item in items {
        serde_json::to_writer(&mut writer, item)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(items.len())
}

pub(crate) fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    Ok(())
}
