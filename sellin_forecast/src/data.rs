//! Sales data loading and time series handling

use crate::error::{ForecastError, Result};
use crate::period::Period;
use csv::{ReaderBuilder, StringRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Product identifier
pub type EntityId = i64;

/// Set of products to forecast
pub type TargetSet = BTreeSet<EntityId>;

/// One raw sell-in row
///
/// `context` keeps every other column of the source row so two rows only count
/// as duplicates when the whole row matches.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub period: Period,
    pub entity_id: EntityId,
    pub quantity: f64,
    pub context: Vec<String>,
}

impl TransactionRecord {
    /// Create a record with no extra columns
    pub fn new(period: Period, entity_id: EntityId, quantity: f64) -> Self {
        Self {
            period,
            entity_id,
            quantity,
            context: Vec::new(),
        }
    }

    /// Attach the remaining raw columns
    pub fn with_context(mut self, context: Vec<String>) -> Self {
        self.context = context;
        self
    }

    /// Hashable identity of the whole row; quantities compare bit for bit
    pub(crate) fn identity(&self) -> (Period, EntityId, u64, &[String]) {
        // -0.0 and 0.0 are the same quantity
        let quantity = if self.quantity == 0.0 { 0.0 } else { self.quantity };
        (
            self.period,
            self.entity_id,
            quantity.to_bits(),
            self.context.as_slice(),
        )
    }
}

/// Column names of the sell-in file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SalesColumns {
    pub period: String,
    pub entity: String,
    pub quantity: String,
}

impl Default for SalesColumns {
    fn default() -> Self {
        Self {
            period: "periodo".to_string(),
            entity: "product_id".to_string(),
            quantity: "tn".to_string(),
        }
    }
}

/// Loader for the raw sell-in file
#[derive(Debug, Clone)]
pub struct SalesLoader {
    columns: SalesColumns,
    delimiter: u8,
}

impl Default for SalesLoader {
    fn default() -> Self {
        Self {
            columns: SalesColumns::default(),
            delimiter: b'\t',
        }
    }
}

impl SalesLoader {
    /// Create a loader with custom columns and delimiter
    pub fn new(columns: SalesColumns, delimiter: u8) -> Self {
        Self { columns, delimiter }
    }

    /// Load every row of the file, duplicates included
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<Vec<TransactionRecord>> {
        let path = path.as_ref();
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .from_path(path)
            .map_err(|e| ForecastError::data_load(path, e))?;

        let headers = reader
            .headers()
            .map_err(|e| ForecastError::data_load(path, e))?
            .clone();
        let period_idx = column_index(&headers, &self.columns.period, path)?;
        let entity_idx = column_index(&headers, &self.columns.entity, path)?;
        let quantity_idx = column_index(&headers, &self.columns.quantity, path)?;

        let mut records = Vec::new();
        for (row, result) in reader.records().enumerate() {
            let raw = result.map_err(|e| ForecastError::data_load(path, e))?;
            // Header is line 1
            let line = row + 2;

            let period = parse_period(field(&raw, period_idx), line)?;
            let entity_id = parse_entity(field(&raw, entity_idx))
                .ok_or_else(|| invalid_value(path, line, &self.columns.entity, &raw, entity_idx))?;
            let quantity: f64 = field(&raw, quantity_idx).parse().map_err(|_| {
                invalid_value(path, line, &self.columns.quantity, &raw, quantity_idx)
            })?;

            let context = raw
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != period_idx && *i != entity_idx && *i != quantity_idx)
                .map(|(_, value)| value.to_string())
                .collect();

            records.push(TransactionRecord::new(period, entity_id, quantity).with_context(context));
        }

        tracing::info!(path = %path.display(), rows = records.len(), "loaded sales records");
        Ok(records)
    }
}

/// Loader for the list of products to forecast
#[derive(Debug, Clone)]
pub struct TargetLoader {
    column: String,
    delimiter: u8,
}

impl Default for TargetLoader {
    fn default() -> Self {
        Self {
            column: "product_id".to_string(),
            delimiter: b'\t',
        }
    }
}

impl TargetLoader {
    /// Create a loader reading `column` with the given delimiter
    pub fn new(column: impl Into<String>, delimiter: u8) -> Self {
        Self {
            column: column.into(),
            delimiter,
        }
    }

    /// Load the target product ids; repeated ids collapse
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<TargetSet> {
        let path = path.as_ref();
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .from_path(path)
            .map_err(|e| ForecastError::data_load(path, e))?;

        let headers = reader
            .headers()
            .map_err(|e| ForecastError::data_load(path, e))?
            .clone();
        let idx = column_index(&headers, &self.column, path)?;

        let mut targets = TargetSet::new();
        for (row, result) in reader.records().enumerate() {
            let raw = result.map_err(|e| ForecastError::data_load(path, e))?;
            let id = parse_entity(field(&raw, idx))
                .ok_or_else(|| invalid_value(path, row + 2, &self.column, &raw, idx))?;
            targets.insert(id);
        }

        tracing::info!(path = %path.display(), products = targets.len(), "loaded target products");
        Ok(targets)
    }
}

fn column_index(headers: &StringRecord, name: &str, path: &Path) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim_start_matches('\u{feff}').trim() == name)
        .ok_or_else(|| {
            ForecastError::data_load(path, format!("missing required column '{}'", name))
        })
}

fn field(record: &StringRecord, idx: usize) -> &str {
    record.get(idx).unwrap_or("").trim()
}

/// Accepts plain integers and integral floats such as `20524.0`
fn parse_entity(value: &str) -> Option<EntityId> {
    if let Ok(id) = value.parse::<EntityId>() {
        return Some(id);
    }
    let float: f64 = value.parse().ok()?;
    if float.fract() == 0.0 && float.is_finite() {
        Some(float as EntityId)
    } else {
        None
    }
}

fn parse_period(value: &str, line: usize) -> Result<Period> {
    let code = parse_entity(value).ok_or_else(|| {
        ForecastError::SchemaError(format!(
            "line {}: period '{}' is not a YYYYMM integer",
            line, value
        ))
    })?;
    Period::from_yyyymm(code).map_err(|e| match e {
        ForecastError::SchemaError(reason) => {
            ForecastError::SchemaError(format!("line {}: {}", line, reason))
        }
        other => other,
    })
}

fn invalid_value(
    path: &Path,
    line: usize,
    column: &str,
    record: &StringRecord,
    idx: usize,
) -> ForecastError {
    ForecastError::data_load(
        path,
        format!(
            "line {}: invalid value '{}' in column '{}'",
            line,
            field(record, idx),
            column
        ),
    )
}

/// Ordered monthly series for a single product
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    entity_id: EntityId,
    periods: Vec<Period>,
    values: Vec<f64>,
}

impl TimeSeries {
    /// Create a series; periods must be strictly increasing
    pub fn new(entity_id: EntityId, periods: Vec<Period>, values: Vec<f64>) -> Result<Self> {
        if periods.len() != values.len() {
            return Err(ForecastError::ForecastingError(format!(
                "Product {}: {} periods but {} values",
                entity_id,
                periods.len(),
                values.len()
            )));
        }
        if let Some(w) = periods.windows(2).find(|w| w[0] >= w[1]) {
            return Err(ForecastError::ForecastingError(format!(
                "Product {}: period {} is followed by {}; periods must be unique and increasing",
                entity_id, w[0], w[1]
            )));
        }

        Ok(Self {
            entity_id,
            periods,
            values,
        })
    }

    /// Create a series of consecutive months starting at `start` (for testing)
    pub fn monthly(entity_id: EntityId, start: Period, values: Vec<f64>) -> Result<Self> {
        let periods = (0..values.len())
            .map(|i| start.plus_months(i as u32))
            .collect::<Result<Vec<_>>>()?;
        Self::new(entity_id, periods, values)
    }

    pub fn entity_id(&self) -> EntityId {
        self.entity_id
    }

    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn last_period(&self) -> Option<Period> {
        self.periods.last().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Insert missing months with `fill`
    pub fn fill_gaps(&self, fill: f64) -> Result<Self> {
        let (first, last) = match (self.periods.first(), self.periods.last()) {
            (Some(f), Some(l)) => (*f, *l),
            _ => return Ok(self.clone()),
        };

        let span = first.months_until(&last) as usize + 1;
        let mut periods = Vec::with_capacity(span);
        let mut values = Vec::with_capacity(span);
        let mut observed = self.periods.iter().zip(self.values.iter()).peekable();
        let mut current = first;

        for _ in 0..span {
            let value = match observed.peek() {
                Some((p, v)) if **p == current => {
                    let v = **v;
                    observed.next();
                    v
                }
                _ => fill,
            };
            periods.push(current);
            values.push(value);
            current = current.succ()?;
        }

        Self::new(self.entity_id, periods, values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(code: i64) -> Period {
        Period::from_yyyymm(code).unwrap()
    }

    #[test]
    fn test_time_series_rejects_unordered_periods() {
        let result = TimeSeries::new(1, vec![p(202002), p(202001)], vec![1.0, 2.0]);
        assert!(matches!(result, Err(ForecastError::ForecastingError(_))));

        let result = TimeSeries::new(1, vec![p(202001), p(202001)], vec![1.0, 2.0]);
        assert!(result.is_err());
    }

    #[test]
    fn test_fill_gaps_inserts_missing_months() {
        let series = TimeSeries::new(7, vec![p(201911), p(202002)], vec![4.0, 6.0]).unwrap();
        let filled = series.fill_gaps(0.0).unwrap();
        assert_eq!(
            filled.periods(),
            &[p(201911), p(201912), p(202001), p(202002)]
        );
        assert_eq!(filled.values(), &[4.0, 0.0, 0.0, 6.0]);
        assert_eq!(filled.last_period(), Some(p(202002)));
    }

    #[test]
    fn test_monthly_constructor_crosses_year() {
        let series = TimeSeries::monthly(3, p(201912), vec![1.0, 2.0]).unwrap();
        assert_eq!(series.periods(), &[p(201912), p(202001)]);
    }

    #[test]
    fn test_identity_ignores_zero_sign() {
        let a = TransactionRecord::new(p(202001), 1, 0.0);
        let b = TransactionRecord::new(p(202001), 1, -0.0);
        assert_eq!(a.identity(), b.identity());
    }

    #[test]
    fn test_parse_entity_accepts_integral_floats() {
        assert_eq!(parse_entity("20001"), Some(20001));
        assert_eq!(parse_entity("20001.0"), Some(20001));
        assert_eq!(parse_entity("20001.5"), None);
        assert_eq!(parse_entity("abc"), None);
    }
}
