use forecast_math::MathError;
use sellin_forecast::error::ForecastError;
use std::io;
use std::path::Path;

#[test]
fn test_error_conversion() {
    let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
    let forecast_error = ForecastError::from(io_error);
    assert!(matches!(forecast_error, ForecastError::IoError(_)));

    let math_error = MathError::InsufficientData("need 3 values".to_string());
    let forecast_error = ForecastError::from(math_error);
    assert!(matches!(forecast_error, ForecastError::MathError(_)));
}

#[test]
fn test_error_display() {
    let error = ForecastError::data_load(Path::new("data/raw/sell-in.txt"), "missing column 'tn'");
    let text = error.to_string();
    assert!(text.contains("data/raw/sell-in.txt"));
    assert!(text.contains("missing column 'tn'"));

    let error = ForecastError::InsufficientData { needed: 6, got: 3 };
    assert_eq!(
        error.to_string(),
        "Insufficient data: need at least 6 observations, got 3"
    );

    let error = ForecastError::persist("out/preds_AutoARIMA.csv", "permission denied");
    assert!(error.to_string().contains("preds_AutoARIMA.csv"));
}
