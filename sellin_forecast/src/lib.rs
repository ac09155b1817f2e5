//! # Sell-in Forecast
//!
//! Per-product monthly sales forecasting for a fixed list of products.
//!
//! ## Stages
//!
//! - **Panel**: raw sell-in rows are deduplicated and summed per product and month
//! - **Filter**: only the products on the target list are kept
//! - **Ensemble**: every product is fitted with each model of the roster
//!   (AutoARIMA, SeasonalNaive, Naive) in parallel
//! - **Output**: the forecasts at the target month are written to one file per model
//!
//! ## Quick Start
//!
//! ```no_run
//! use sellin_forecast::config::PipelineConfig;
//! use sellin_forecast::pipeline::Pipeline;
//!
//! let config = PipelineConfig {
//!     root_dir: "/srv/sellin".into(),
//!     ..PipelineConfig::default()
//! };
//!
//! let summary = Pipeline::new(config).run()?;
//! for (model, path) in &summary.written {
//!     println!("{}: {}", model, path.display());
//! }
//! # Ok::<(), sellin_forecast::ForecastError>(())
//! ```
//!
//! The stages can also be used one by one:
//!
//! ```
//! use sellin_forecast::data::TransactionRecord;
//! use sellin_forecast::ensemble::{EnsembleConfig, EnsembleRunner};
//! use sellin_forecast::models::ModelKind;
//! use sellin_forecast::panel::build_panel;
//! use sellin_forecast::period::Period;
//!
//! let start = Period::from_yyyymm(201901)?;
//! let records = (0..12u32)
//!     .map(|i| Ok(TransactionRecord::new(start.plus_months(i)?, 20001, 10.0 + i as f64)))
//!     .collect::<Result<Vec<_>, sellin_forecast::ForecastError>>()?;
//!
//! let panel = build_panel(&records);
//! let runner = EnsembleRunner::new(EnsembleConfig {
//!     roster: vec![ModelKind::SeasonalNaive],
//!     ..EnsembleConfig::default()
//! });
//! let output = runner.run(&panel)?;
//! assert_eq!(output.forecasts.len(), 2);
//! # Ok::<(), sellin_forecast::ForecastError>(())
//! ```

pub mod config;
pub mod data;
pub mod ensemble;
pub mod error;
pub mod models;
pub mod output;
pub mod panel;
pub mod period;
pub mod pipeline;

// Re-export commonly used types
pub use crate::config::PipelineConfig;
pub use crate::data::{TimeSeries, TransactionRecord};
pub use crate::ensemble::{EnsembleConfig, EnsembleOutput, EnsembleRunner, ForecastRecord};
pub use crate::error::ForecastError;
pub use crate::models::{ForecastModel, ForecastResult, ModelKind, TrainedForecastModel};
pub use crate::period::Period;
pub use crate::pipeline::{Pipeline, RunSummary};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
