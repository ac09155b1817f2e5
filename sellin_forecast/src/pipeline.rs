//! End-to-end run: load, aggregate, filter, forecast, write

use crate::config::PipelineConfig;
use crate::ensemble::EnsembleRunner;
use crate::error::{ForecastError, Result};
use crate::models::ModelKind;
use crate::output::split_by_model;
use crate::panel::{build_panel, filter_panel};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// What a completed run produced
#[derive(Debug, Default)]
pub struct RunSummary {
    pub records_loaded: usize,
    pub panel_rows: usize,
    pub target_products: usize,
    pub forecasts: usize,
    /// Products each model could not forecast
    pub series_failures: BTreeMap<ModelKind, usize>,
    pub written: Vec<(ModelKind, PathBuf)>,
    /// Models whose file could not be written
    pub persist_failures: Vec<(ModelKind, ForecastError)>,
    /// Dump file that could not be written
    pub dump_failure: Option<PathBuf>,
}

impl RunSummary {
    /// True when every requested file was written
    pub fn is_success(&self) -> bool {
        self.persist_failures.is_empty() && self.dump_failure.is_none()
    }
}

/// The forecasting pipeline
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage in order
    ///
    /// Errors from loading, schema checks or the ensemble abort the run. Write
    /// failures are collected in the summary instead, one per file.
    pub fn run(&self) -> Result<RunSummary> {
        let config = &self.config;
        let writer = config.output_writer()?;

        let records = config
            .sales_loader()?
            .load(config.resolve(&config.sales_path))?;
        let targets = config
            .target_loader()?
            .load(config.resolve(&config.targets_path))?;

        let panel = build_panel(&records);
        let filtered = filter_panel(&panel, &targets);

        let runner = EnsembleRunner::new(config.ensemble_config());
        let output = runner.run(&filtered)?;

        let outputs = split_by_model(&output, &config.roster, config.target());
        let report = writer.write_all(&outputs);

        let mut dump_failure = None;
        if let Some(dump) = &config.dump_path {
            let path = config.resolve(dump);
            if let Err(e) = writer.write_dump(&path, &output.forecasts) {
                tracing::error!(error = %e, "could not write forecast dump");
                dump_failure = Some(path);
            }
        }

        let summary = RunSummary {
            records_loaded: records.len(),
            panel_rows: panel.len(),
            target_products: targets.len(),
            forecasts: output.forecasts.len(),
            series_failures: output.failure_counts(),
            written: report.written,
            persist_failures: report.failed,
            dump_failure,
        };

        tracing::info!(
            files = summary.written.len(),
            failed = summary.persist_failures.len(),
            "pipeline finished"
        );
        Ok(summary)
    }
}
