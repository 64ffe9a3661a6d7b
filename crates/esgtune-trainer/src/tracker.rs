//! Experiment tracking sinks for parameters and metrics.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use esgtune_core::{LabelNames, MetricsReport};

/// Receives scalar parameters and step-indexed metrics.
pub trait ExperimentTracker {
    fn log_param(&mut self, key: &str, value: &str) -> Result<()>;

    fn log_metric(&mut self, key: &str, value: f64, step: Option<usize>) -> Result<()>;

    /// Log every entry of a metrics report at one step.
    fn log_report(&mut self, report: &MetricsReport, step: Option<usize>) -> Result<()> {
        for (key, value) in report.iter() {
            self.log_metric(key, value, step)?;
        }
        Ok(())
    }

    /// Log a label weight vector as `class_weight_<label>` params.
    fn log_class_weights(&mut self, weights: &[f64], names: &LabelNames) -> Result<()> {
        for (i, weight) in weights.iter().enumerate() {
            self.log_param(&format!("class_weight_{}", names.name(i)), &weight.to_string())?;
        }
        Ok(())
    }
}

/// Emits every call as a `tracing` event.
#[derive(Debug, Default)]
pub struct TracingTracker;

impl ExperimentTracker for TracingTracker {
    fn log_param(&mut self, key: &str, value: &str) -> Result<()> {
        tracing::info!(key, value, "param");
        Ok(())
    }

    fn log_metric(&mut self, key: &str, value: f64, step: Option<usize>) -> Result<()> {
        tracing::info!(key, value, step, "metric");
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum Entry<'a> {
    Param {
        key: &'a str,
        value: &'a str,
    },
    Metric {
        key: &'a str,
        value: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        step: Option<usize>,
    },
}

/// Appends one JSON object per call to a file.
pub struct JsonlTracker {
    writer: BufWriter<File>,
}

impl JsonlTracker {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        crate::data::create_parent(path)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open tracker log {}", path.display()))?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    fn write(&mut self, entry: &Entry<'_>) -> Result<()> {
        serde_json::to_writer(&mut self.writer, entry)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

impl ExperimentTracker for JsonlTracker {
    fn log_param(&mut self, key: &str, value: &str) -> Result<()> {
        self.write(&Entry::Param { key, value })
    }

    fn log_metric(&mut self, key: &str, value: f64, step: Option<usize>) -> Result<()> {
        self.write(&Entry::Metric { key, value, step })
    }
}
