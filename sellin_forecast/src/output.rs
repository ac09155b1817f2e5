//! Per-model forecast files

use crate::data::EntityId;
use crate::ensemble::{EnsembleOutput, ForecastRecord};
use crate::error::{ForecastError, Result};
use crate::models::ModelKind;
use crate::period::Period;
use csv::WriterBuilder;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Which forecast of the horizon goes into the output files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetPeriod {
    /// The n-th step after each product's last month, 1-based
    Step(usize),
    /// A calendar month
    #[serde(rename = "period")]
    Absolute(Period),
}

impl TargetPeriod {
    fn matches(&self, record: &ForecastRecord) -> bool {
        match self {
            TargetPeriod::Step(step) => record.step == *step,
            TargetPeriod::Absolute(period) => record.period == *period,
        }
    }
}

impl std::fmt::Display for TargetPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetPeriod::Step(step) => write!(f, "step {}", step),
            TargetPeriod::Absolute(period) => write!(f, "{}", period),
        }
    }
}

impl FromStr for TargetPeriod {
    type Err = ForecastError;

    /// Accepts `step:N`, `YYYYMM` or `YYYY-MM`
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().strip_prefix("step:") {
            Some(step) => step
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .map(TargetPeriod::Step)
                .ok_or_else(|| {
                    ForecastError::InvalidParameter(format!("Invalid target step '{}'", s))
                }),
            None => s.parse::<Period>().map(TargetPeriod::Absolute),
        }
    }
}

/// One line of a per-model file
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputRow {
    pub entity_id: EntityId,
    pub value: f64,
}

/// Forecasts of one model at the target period
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOutput {
    pub model: ModelKind,
    pub rows: Vec<OutputRow>,
    /// Distinct calendar months of `rows`, ascending
    pub periods: Vec<Period>,
}

/// One output per roster model, each holding the records at `target`
///
/// Models without any matching record still get an (empty) output. A step
/// target over products that end in different months selects more than one
/// calendar month; that is logged at warn.
pub fn split_by_model(
    output: &EnsembleOutput,
    roster: &[ModelKind],
    target: TargetPeriod,
) -> Vec<ModelOutput> {
    roster
        .iter()
        .map(|&model| {
            let selected: Vec<&ForecastRecord> = output
                .records_for(model)
                .filter(|record| target.matches(record))
                .collect();
            let rows: Vec<OutputRow> = selected
                .iter()
                .map(|record| OutputRow {
                    entity_id: record.entity_id,
                    value: record.value,
                })
                .collect();
            let periods: Vec<Period> = selected
                .iter()
                .map(|record| record.period)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();

            match periods.as_slice() {
                [] => tracing::warn!(model = %model, %target, "no forecasts at the target period"),
                [_] => {}
                [first, .., last] => tracing::warn!(
                    model = %model,
                    %target,
                    months = periods.len(),
                    first = %first,
                    last = %last,
                    "output mixes calendar months"
                ),
            }
            ModelOutput {
                model,
                rows,
                periods,
            }
        })
        .collect()
}

/// Header names of the output files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputColumns {
    pub entity: String,
    pub value: String,
    pub period: String,
}

impl Default for OutputColumns {
    fn default() -> Self {
        Self {
            entity: "product_id".to_string(),
            value: "tn".to_string(),
            period: "periodo".to_string(),
        }
    }
}

/// Outcome of writing every model file
#[derive(Debug, Default)]
pub struct WriteReport {
    pub written: Vec<(ModelKind, PathBuf)>,
    pub failed: Vec<(ModelKind, ForecastError)>,
}

impl WriteReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Writes per-model files named after a base output path
#[derive(Debug, Clone)]
pub struct OutputWriter {
    base: PathBuf,
    delimiter: u8,
    columns: OutputColumns,
}

impl OutputWriter {
    pub fn new(base: impl Into<PathBuf>, delimiter: u8, columns: OutputColumns) -> Self {
        Self {
            base: base.into(),
            delimiter,
            columns,
        }
    }

    /// `<dir>/<stem>_<Model>.<ext>` for the base path `<dir>/<stem>.<ext>`
    pub fn path_for(&self, model: ModelKind) -> PathBuf {
        let stem = self
            .base
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut name = format!("{}_{}", stem, model);
        if let Some(ext) = self.base.extension() {
            name.push('.');
            name.push_str(&ext.to_string_lossy());
        }
        self.base.with_file_name(name)
    }

    /// Write one model's file and return its path
    pub fn write(&self, output: &ModelOutput) -> Result<PathBuf> {
        let path = self.path_for(output.model);
        let mut writer = create_writer(&path, self.delimiter)?;

        writer
            .write_record([&self.columns.entity, &self.columns.value])
            .map_err(|e| ForecastError::persist(&path, e))?;
        for row in &output.rows {
            writer
                .write_record([row.entity_id.to_string(), row.value.to_string()])
                .map_err(|e| ForecastError::persist(&path, e))?;
        }
        writer.flush().map_err(|e| ForecastError::persist(&path, e))?;

        tracing::info!(
            model = %output.model,
            rows = output.rows.len(),
            path = %path.display(),
            "wrote forecasts"
        );
        Ok(path)
    }

    /// Write every model; a failure only affects that model's file
    pub fn write_all(&self, outputs: &[ModelOutput]) -> WriteReport {
        let mut report = WriteReport::default();
        for output in outputs {
            match self.write(output) {
                Ok(path) => report.written.push((output.model, path)),
                Err(e) => {
                    tracing::error!(model = %output.model, error = %e, "could not write forecasts");
                    report.failed.push((output.model, e));
                }
            }
        }
        report
    }

    /// Long-format file with every forecast record
    pub fn write_dump(&self, path: &Path, records: &[ForecastRecord]) -> Result<()> {
        let mut writer = create_writer(path, self.delimiter)?;

        writer
            .write_record([
                self.columns.entity.as_str(),
                self.columns.period.as_str(),
                "step",
                "model",
                self.columns.value.as_str(),
            ])
            .map_err(|e| ForecastError::persist(path, e))?;
        for record in records {
            writer
                .write_record([
                    record.entity_id.to_string(),
                    record.period.to_string(),
                    record.step.to_string(),
                    record.model.to_string(),
                    record.value.to_string(),
                ])
                .map_err(|e| ForecastError::persist(path, e))?;
        }
        writer.flush().map_err(|e| ForecastError::persist(path, e))?;

        tracing::info!(rows = records.len(), path = %path.display(), "wrote forecast dump");
        Ok(())
    }
}

fn create_writer(path: &Path, delimiter: u8) -> Result<csv::Writer<fs::File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ForecastError::persist(path, e))?;
    }
    WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(path)
        .map_err(|e| ForecastError::persist(path, e))
}
