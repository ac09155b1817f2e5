//! Aggregation of raw sales into a per-product monthly panel

use crate::data::{EntityId, TargetSet, TimeSeries, TransactionRecord};
use crate::error::Result;
use crate::period::Period;
use forecast_math::stats::ordered_sum;
use std::collections::{BTreeMap, HashSet};

/// Total quantity for one product in one month
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelRow {
    pub entity_id: EntityId,
    pub period: Period,
    pub quantity: f64,
}

impl PanelRow {
    pub fn new(entity_id: EntityId, period: Period, quantity: f64) -> Self {
        Self {
            entity_id,
            period,
            quantity,
        }
    }
}

/// Drop exact duplicate rows, keeping the first occurrence
pub fn deduplicate(records: &[TransactionRecord]) -> Vec<&TransactionRecord> {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .iter()
        .filter(|&record| seen.insert(record.identity()))
        .collect()
}

/// Deduplicate and sum quantities per (product, month)
///
/// Rows come back sorted by product then period. Each group is summed in a
/// fixed order so the totals do not depend on the order of `records`.
pub fn build_panel(records: &[TransactionRecord]) -> Vec<PanelRow> {
    let unique = deduplicate(records);
    let dropped = records.len() - unique.len();

    let mut groups: BTreeMap<(EntityId, Period), Vec<f64>> = BTreeMap::new();
    for record in unique {
        groups
            .entry((record.entity_id, record.period))
            .or_default()
            .push(record.quantity);
    }

    let panel: Vec<PanelRow> = groups
        .into_iter()
        .map(|((entity_id, period), quantities)| {
            PanelRow::new(entity_id, period, ordered_sum(&quantities))
        })
        .collect();

    tracing::info!(
        duplicates = dropped,
        rows = panel.len(),
        "aggregated sales by product and period"
    );
    panel
}

/// Keep the rows of targeted products, preserving input order
pub fn filter_panel(panel: &[PanelRow], targets: &TargetSet) -> Vec<PanelRow> {
    let filtered: Vec<PanelRow> = panel
        .iter()
        .filter(|row| targets.contains(&row.entity_id))
        .copied()
        .collect();

    if targets.is_empty() {
        tracing::warn!("target product list is empty; nothing will be forecast");
    }
    tracing::info!(rows = filtered.len(), "filtered panel to target products");
    filtered
}

/// Split the panel into one time series per product, ordered by product id
///
/// Fails with a forecasting error when a product has two rows for the same
/// month, since no consistent date grid exists for it.
pub fn panel_to_series(panel: &[PanelRow]) -> Result<Vec<TimeSeries>> {
    let mut grouped: BTreeMap<EntityId, Vec<(Period, f64)>> = BTreeMap::new();
    for row in panel {
        grouped
            .entry(row.entity_id)
            .or_default()
            .push((row.period, row.quantity));
    }

    grouped
        .into_iter()
        .map(|(entity_id, mut points)| {
            points.sort_by_key(|(period, _)| *period);
            let (periods, values) = points.into_iter().unzip();
            TimeSeries::new(entity_id, periods, values)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ForecastError;
    use pretty_assertions::assert_eq;

    fn p(code: i64) -> Period {
        Period::from_yyyymm(code).unwrap()
    }

    #[test]
    fn test_duplicates_are_dropped_not_summed() {
        let records = vec![
            TransactionRecord::new(p(202001), 1, 10.0),
            TransactionRecord::new(p(202001), 1, 10.0),
            TransactionRecord::new(p(202002), 1, 5.0),
        ];

        let panel = build_panel(&records);
        assert_eq!(
            panel,
            vec![
                PanelRow::new(1, p(202001), 10.0),
                PanelRow::new(1, p(202002), 5.0),
            ]
        );
    }

    #[test]
    fn test_rows_differing_in_context_are_both_summed() {
        let records = vec![
            TransactionRecord::new(p(202001), 1, 10.0).with_context(vec!["10001".into()]),
            TransactionRecord::new(p(202001), 1, 10.0).with_context(vec!["10002".into()]),
        ];

        let panel = build_panel(&records);
        assert_eq!(panel, vec![PanelRow::new(1, p(202001), 20.0)]);
    }

    #[test]
    fn test_filter_keeps_only_targets_in_order() {
        let panel = vec![
            PanelRow::new(2, p(202001), 1.0),
            PanelRow::new(1, p(202001), 2.0),
            PanelRow::new(2, p(202002), 3.0),
            PanelRow::new(1, p(202002), 4.0),
        ];
        let targets: TargetSet = [1].into_iter().collect();

        let filtered = filter_panel(&panel, &targets);
        assert_eq!(
            filtered,
            vec![
                PanelRow::new(1, p(202001), 2.0),
                PanelRow::new(1, p(202002), 4.0),
            ]
        );
    }

    #[test]
    fn test_empty_target_set_gives_empty_panel() {
        let panel = vec![PanelRow::new(1, p(202001), 2.0)];
        assert!(filter_panel(&panel, &TargetSet::new()).is_empty());
    }

    #[test]
    fn test_panel_to_series_sorts_periods() {
        let panel = vec![
            PanelRow::new(5, p(202002), 2.0),
            PanelRow::new(5, p(202001), 1.0),
            PanelRow::new(3, p(202001), 9.0),
        ];

        let series = panel_to_series(&panel).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].entity_id(), 3);
        assert_eq!(series[1].values(), &[1.0, 2.0]);
    }

    #[test]
    fn test_duplicate_panel_rows_break_the_date_grid() {
        let panel = vec![
            PanelRow::new(5, p(202001), 2.0),
            PanelRow::new(5, p(202001), 1.0),
        ];
        assert!(matches!(
            panel_to_series(&panel),
            Err(ForecastError::ForecastingError(_))
        ));
    }
}
