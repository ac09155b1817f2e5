//! Run configuration
//!
//! Defaults reproduce the monthly sell-in run: tab-separated inputs under
//! `data/`, a two month horizon with a six month cycle, AutoARIMA and
//! SeasonalNaive, and the files for February 2020.

use crate::data::{SalesColumns, SalesLoader, TargetLoader};
use crate::ensemble::{EnsembleConfig, Parallelism};
use crate::error::{ForecastError, Result};
use crate::models::{ModelKind, ShortHistory};
use crate::output::{OutputColumns, OutputWriter, TargetPeriod};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Everything a pipeline run needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Base directory for every relative path below
    pub root_dir: PathBuf,
    pub sales_path: PathBuf,
    pub targets_path: PathBuf,
    /// Base name of the per-model files
    pub output_path: PathBuf,
    /// Optional long-format file with every forecast
    pub dump_path: Option<PathBuf>,
    pub sales_columns: SalesColumns,
    pub target_column: String,
    pub input_delimiter: char,
    pub output_delimiter: char,
    pub output_columns: OutputColumns,
    pub horizon: usize,
    pub season_length: usize,
    pub roster: Vec<ModelKind>,
    /// Month written to the output files; the last step of the horizon when unset
    pub target: Option<TargetPeriod>,
    pub parallelism: Parallelism,
    pub short_history: ShortHistory,
    pub fill_gaps: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("."),
            sales_path: PathBuf::from("data/raw/sell-in.txt"),
            targets_path: PathBuf::from("data/predict/raw/product_id_apredecir201912.txt"),
            output_path: PathBuf::from(
                "data/predict/final/auto_arima_predictions_statsforecast_v3_202002.csv",
            ),
            dump_path: None,
            sales_columns: SalesColumns::default(),
            target_column: "product_id".to_string(),
            input_delimiter: '\t',
            output_delimiter: ',',
            output_columns: OutputColumns::default(),
            horizon: 2,
            season_length: 6,
            roster: vec![ModelKind::AutoArima, ModelKind::SeasonalNaive],
            target: None,
            parallelism: Parallelism::All,
            short_history: ShortHistory::Degrade,
            fill_gaps: false,
        }
    }
}

impl PipelineConfig {
    /// Read a JSON configuration; missing fields take their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| ForecastError::data_load(path, e))?;
        serde_json::from_str(&text).map_err(|e| ForecastError::data_load(path, e))
    }

    /// Join a relative path onto `root_dir`
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root_dir.join(path)
        }
    }

    /// Target period, defaulting to the last step of the horizon
    pub fn target(&self) -> TargetPeriod {
        self.target.unwrap_or(TargetPeriod::Step(self.horizon))
    }

    pub fn ensemble_config(&self) -> EnsembleConfig {
        EnsembleConfig {
            horizon: self.horizon,
            season_length: self.season_length,
            roster: self.roster.clone(),
            parallelism: self.parallelism,
            short_history: self.short_history,
            fill_gaps: self.fill_gaps,
        }
    }

    pub fn sales_loader(&self) -> Result<SalesLoader> {
        Ok(SalesLoader::new(
            self.sales_columns.clone(),
            delimiter_byte(self.input_delimiter)?,
        ))
    }

    pub fn target_loader(&self) -> Result<TargetLoader> {
        Ok(TargetLoader::new(
            self.target_column.clone(),
            delimiter_byte(self.input_delimiter)?,
        ))
    }

    pub fn output_writer(&self) -> Result<OutputWriter> {
        Ok(OutputWriter::new(
            self.resolve(&self.output_path),
            delimiter_byte(self.output_delimiter)?,
            self.output_columns.clone(),
        ))
    }
}

/// CSV delimiters must be a single ASCII character
fn delimiter_byte(delimiter: char) -> Result<u8> {
    u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| {
            ForecastError::InvalidParameter(format!(
                "Delimiter {:?} is not a single ASCII character",
                delimiter
            ))
        })
}
