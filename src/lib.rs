//! # Sell-in Workspace
//!
//! Facade over the workspace crates:
//!
//! - [`sellin_forecast`]: loading, panel building, model ensembles and output files
//! - [`forecast_math`]: differencing, stationarity tests, optimisation and statistics
//!
//! ```
//! use sellin_workspace::forecast::period::Period;
//!
//! let period = Period::from_yyyymm(201912)?;
//! assert_eq!(period.succ()?.to_string(), "202001");
//! # Ok::<(), sellin_workspace::forecast::ForecastError>(())
//! ```

pub use forecast_math as math;
pub use sellin_forecast as forecast;

pub use sellin_forecast::{Pipeline, PipelineConfig};
