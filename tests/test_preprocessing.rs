//! Integration test: Feature preparation shared by training and serving

use car_price_predictor::error::{PricerError, RejectReason};
use car_price_predictor::preprocessing::{
    prepare, select, target, FeatureEncoder, RawRecord, FEATURE_COLUMNS, UNKNOWN_CATEGORY,
};
use serde_json::{json, Value};

fn records(value: Value) -> Vec<RawRecord> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_object().unwrap().clone())
        .collect()
}

fn csv_like_rows() -> Vec<RawRecord> {
    records(json!([
        {"price": "2500000", "model": "2018", "mileage": "60000", "fuel_type": "Petrol",
         "transmission": "Manual", "city": "Lahore", "registered": "Punjab",
         "assembly": "Local", "color": "White"},
        {"price": "0", "model": "2015", "mileage": "80000", "fuel_type": "Petrol",
         "transmission": "Manual", "city": "Karachi", "registered": "Sindh",
         "assembly": "Local", "color": "Silver"},
        {"price": "4100000", "model": "2021", "mileage": null, "fuel_type": "Hybrid",
         "transmission": "Automatic", "city": "Islamabad", "registered": "Islamabad",
         "assembly": "Imported", "color": "Black"},
        {"price": "3300000", "model": "2020", "mileage": "15000", "fuel_type": null,
         "transmission": "Automatic", "city": "Lahore", "registered": null,
         "assembly": "Local", "color": null}
    ]))
}

#[test]
fn test_prepare_then_select_training_rows() {
    let batch = prepare(&csv_like_rows());

    assert_eq!(batch.table.len(), 2);
    assert_eq!(batch.rejected.len(), 2);
    assert_eq!(batch.rejected[0].row, 1);
    assert!(matches!(batch.rejected[0].reason, RejectReason::NonPositive(_)));
    assert_eq!(batch.rejected[1].row, 2);
    assert_eq!(batch.rejected[1].field, "mileage");
    assert_eq!(batch.rejected[1].reason, RejectReason::Missing);

    let (features, prices) = select(&batch.table).unwrap();
    assert_eq!(prices, Some(vec![2_500_000.0, 3_300_000.0]));

    let first = &features.rows()[0];
    assert_eq!(first.age(), 7.0);
    assert_eq!(first.mileage(), 60_000.0);

    let last = &features.rows()[1];
    assert_eq!(last.age(), 5.0);
    assert_eq!(last.categorical[0], UNKNOWN_CATEGORY);
    assert_eq!(last.categorical[3], UNKNOWN_CATEGORY);
}

#[test]
fn test_prepare_does_not_touch_input() {
    let rows = csv_like_rows();
    let before = rows.clone();
    let _ = prepare(&rows);
    assert_eq!(rows, before);
}

#[test]
fn test_model_year_overrides_supplied_age() {
    let rows = records(json!([
        {"model": 2015, "age": 1, "mileage": 1000, "fuel_type": "Petrol",
         "transmission": "Manual", "city": "Lahore", "registered": "Punjab", "assembly": "Local"}
    ]));
    let (features, _) = select(&prepare(&rows).table).unwrap();
    assert_eq!(features.rows()[0].age(), 10.0);
}

#[test]
fn test_select_reports_every_missing_column_in_order() {
    let rows = records(json!([{"model": 2019, "city": "Lahore"}]));
    let err = select(&prepare(&rows).table).unwrap_err();
    match err {
        PricerError::MissingColumns(missing) => assert_eq!(
            missing,
            vec!["mileage", "fuel_type", "transmission", "registered", "assembly"]
        ),
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_selected_features_encode_to_fixed_width() {
    let batch = prepare(&csv_like_rows());
    let (features, _) = select(&batch.table).unwrap();

    let mut encoder = FeatureEncoder::new();
    let x = encoder.fit_transform(&features).unwrap();

    // fuel {Petrol, Unknown} + transmission {Automatic, Manual} + city {Lahore}
    // + registered {Punjab, Unknown} + assembly {Local} + age, mileage
    assert_eq!(x.ncols(), 2 + 2 + 1 + 2 + 1 + 2);
    assert_eq!(x.nrows(), 2);
    for row in x.rows() {
        let onehot: f64 = row.iter().take(x.ncols() - 2).sum();
        assert_eq!(onehot, FEATURE_COLUMNS.len() as f64 - 2.0);
    }
}

#[test]
fn test_target_transform_clamps() {
    let prices = target::log_space_to_prices(&[-3.0, f64::NAN, 2_000_000f64.ln_1p()]);
    assert_eq!(prices[0], 0.0);
    assert_eq!(prices[1], 0.0);
    assert!((prices[2] - 2_000_000.0).abs() < 1e-3);
}
