use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use sellin_forecast::data::{TargetSet, TransactionRecord};
use sellin_forecast::panel::{build_panel, deduplicate, filter_panel, PanelRow};
use sellin_forecast::period::Period;

fn p(code: i64) -> Period {
    Period::from_yyyymm(code).unwrap()
}

fn sample_records() -> Vec<TransactionRecord> {
    let mut records = Vec::new();
    for (i, period) in [201910, 201911, 201912].iter().enumerate() {
        for customer in 0..5 {
            for product in [20001, 20002, 20003] {
                let quantity = 0.1 * (customer + 1) as f64 + 0.01 * i as f64 + product as f64 * 1e-5;
                records.push(
                    TransactionRecord::new(p(*period), product, quantity)
                        .with_context(vec![format!("{}", 10000 + customer)]),
                );
            }
        }
    }
    records
}

#[test]
fn test_duplicates_dropped_before_summing() {
    let records = vec![
        TransactionRecord::new(p(202001), 1, 10.0),
        TransactionRecord::new(p(202001), 1, 10.0),
        TransactionRecord::new(p(202002), 1, 5.0),
    ];

    assert_eq!(
        build_panel(&records),
        vec![
            PanelRow::new(1, p(202001), 10.0),
            PanelRow::new(1, p(202002), 5.0),
        ]
    );
}

#[test]
fn test_deduplicate_is_idempotent() {
    let mut records = sample_records();
    let copies: Vec<TransactionRecord> = records.iter().take(7).cloned().collect();
    records.extend(copies);

    let once: Vec<TransactionRecord> = deduplicate(&records).into_iter().cloned().collect();
    let twice: Vec<TransactionRecord> = deduplicate(&once).into_iter().cloned().collect();
    assert_eq!(once.len(), sample_records().len());
    assert_eq!(once, twice);
}

#[test]
fn test_aggregation_ignores_row_order() {
    let records = sample_records();
    let expected = build_panel(&records);
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..10 {
        let mut shuffled = records.clone();
        shuffled.shuffle(&mut rng);
        assert_eq!(build_panel(&shuffled), expected);
    }
}

#[test]
fn test_panel_is_sorted_and_unique() {
    let panel = build_panel(&sample_records());
    assert_eq!(panel.len(), 9);
    assert!(panel
        .windows(2)
        .all(|w| (w[0].entity_id, w[0].period) < (w[1].entity_id, w[1].period)));
}

#[test]
fn test_filter_closure() {
    let panel = build_panel(&sample_records());
    let targets: TargetSet = [20001, 20003, 99999].into_iter().collect();

    let filtered = filter_panel(&panel, &targets);
    assert!(filtered.iter().all(|row| targets.contains(&row.entity_id)));
    assert_eq!(filtered.len(), 6);
    assert_eq!(filter_panel(&filtered, &targets), filtered);
}

#[test]
fn test_filter_scenario_single_target() {
    let panel = vec![
        PanelRow::new(1, p(202001), 1.0),
        PanelRow::new(2, p(202001), 2.0),
    ];
    let targets: TargetSet = [1].into_iter().collect();
    assert_eq!(
        filter_panel(&panel, &targets),
        vec![PanelRow::new(1, p(202001), 1.0)]
    );
}
