//! Monthly sell-in forecasting run
//!
//! Loads the sales history and the target product list, fits the model roster
//! per product and writes one file per model.

use anyhow::{bail, Context};
use clap::Parser;
use sellin_forecast::config::PipelineConfig;
use sellin_forecast::ensemble::Parallelism;
use sellin_forecast::models::{ModelKind, ShortHistory};
use sellin_forecast::output::TargetPeriod;
use sellin_forecast::pipeline::Pipeline;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "sellin_forecast")]
#[command(about = "Per-product monthly sell-in forecasts with an AutoARIMA / SeasonalNaive ensemble")]
struct Args {
    /// JSON configuration file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Base directory for relative paths
    #[arg(long)]
    root_dir: Option<PathBuf>,

    /// Raw sell-in file
    #[arg(long)]
    sales: Option<PathBuf>,

    /// File listing the products to forecast
    #[arg(long)]
    targets: Option<PathBuf>,

    /// Base name of the per-model output files
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write every forecast in long format to this file
    #[arg(long)]
    dump: Option<PathBuf>,

    /// Months to forecast
    #[arg(long)]
    horizon: Option<usize>,

    /// Cycle length of the seasonal models
    #[arg(long)]
    season_length: Option<usize>,

    /// Comma separated model roster (AutoARIMA, SeasonalNaive, Naive)
    #[arg(long, value_delimiter = ',')]
    models: Option<Vec<ModelKind>>,

    /// Month to write (YYYYMM) or step:N; defaults to the last step
    #[arg(long)]
    target: Option<TargetPeriod>,

    /// Worker threads, or "all"
    #[arg(short, long)]
    jobs: Option<Parallelism>,

    /// What SeasonalNaive does with less than one cycle: fail or degrade
    #[arg(long)]
    short_history: Option<ShortHistory>,

    /// Insert zero sales for months without rows
    #[arg(long)]
    fill_gaps: bool,
}

impl Args {
    fn into_config(self) -> anyhow::Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_file(path)
                .with_context(|| format!("reading configuration {}", path.display()))?,
            None => PipelineConfig::default(),
        };

        if let Some(root_dir) = self.root_dir {
            config.root_dir = root_dir;
        }
        if let Some(sales) = self.sales {
            config.sales_path = sales;
        }
        if let Some(targets) = self.targets {
            config.targets_path = targets;
        }
        if let Some(output) = self.output {
            config.output_path = output;
        }
        if self.dump.is_some() {
            config.dump_path = self.dump;
        }
        if let Some(horizon) = self.horizon {
            config.horizon = horizon;
        }
        if let Some(season_length) = self.season_length {
            config.season_length = season_length;
        }
        if let Some(models) = self.models {
            config.roster = models;
        }
        if self.target.is_some() {
            config.target = self.target;
        }
        if let Some(jobs) = self.jobs {
            config.parallelism = jobs;
        }
        if let Some(policy) = self.short_history {
            config.short_history = policy;
        }
        config.fill_gaps |= self.fill_gaps;

        // Resolve the base directory once so later joins never depend on the cwd
        if config.root_dir.is_relative() {
            let cwd = std::env::current_dir().context("reading the working directory")?;
            config.root_dir = cwd.join(&config.root_dir);
        }
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Args::parse().into_config()?;
    tracing::info!(
        root = %config.root_dir.display(),
        horizon = config.horizon,
        season_length = config.season_length,
        "starting sell-in forecast"
    );

    let summary = Pipeline::new(config)
        .run()
        .context("forecast pipeline failed")?;

    for (model, failed) in &summary.series_failures {
        tracing::warn!(model = %model, failed, "products without a forecast");
    }
    for (model, path) in &summary.written {
        tracing::info!(model = %model, path = %path.display(), "output ready");
    }

    if !summary.is_success() {
        for (model, error) in &summary.persist_failures {
            tracing::error!(model = %model, error = %error, "output missing");
        }
        bail!(
            "{} output file(s) could not be written",
            summary.persist_failures.len() + usize::from(summary.dump_failure.is_some())
        );
    }
    Ok(())
}
