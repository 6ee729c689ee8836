//! Unit tests for analytics module

use super::*;
use crate::models::{
    ForecastValue, PvLiveValue, RegionActual, RegionForecast, RegionMeta, SeriesSample, TimePoint,
};
use std::collections::BTreeSet;

fn tp(s: &str) -> TimePoint {
    s.parse().unwrap()
}

fn sample(time: &str, value: f64) -> SeriesSample {
    SeriesSample::new(tp(time), value)
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn meta(id: u32, capacity: f64) -> RegionMeta {
    RegionMeta {
        region_id: id,
        region_name: format!("Region {}", id),
        installed_capacity_mw: capacity,
    }
}

fn actual(id: u32, capacity: f64, time: &str, mw: f64) -> RegionActual {
    RegionActual {
        meta: meta(id, capacity),
        samples: vec![sample(time, mw)],
    }
}

fn forecast(id: u32, time: &str, mw: f64) -> RegionForecast {
    RegionForecast {
        region_id: id,
        samples: vec![sample(time, mw)],
    }
}

// ============================================================================
// Merge Tests
// ============================================================================

#[test]
fn test_merge_empty_inputs() {
    assert!(merge(&[], tp("2024-06-01T10:30")).is_empty());

    let empty: Vec<SeriesSample> = Vec::new();
    let inputs = [SeriesInput::actual("pv", fields::GENERATION, &empty)];
    assert!(merge(&inputs, tp("2024-06-01T10:30")).is_empty());
}

#[test]
fn test_merge_splits_forecast_at_reference() {
    let forecast = vec![
        sample("2024-06-01T10:00", 100.0),
        sample("2024-06-01T10:30", 200.0),
        sample("2024-06-01T11:00", 300.0),
    ];
    let inputs = [SeriesInput::forecast(
        "forecast",
        fields::PAST_FORECAST,
        fields::FORECAST,
        &forecast,
    )];

    let records = merge(&inputs, tp("2024-06-01T10:30"));

    assert_eq!(records.len(), 3);
    assert_eq!(records[0].get(fields::PAST_FORECAST), Some(100.0));
    assert_eq!(records[0].get(fields::FORECAST), None);
    // Equal to the reference counts as future
    assert_eq!(records[1].get(fields::FORECAST), Some(200.0));
    assert_eq!(records[1].get(fields::PAST_FORECAST), None);
    assert_eq!(records[2].get(fields::FORECAST), Some(300.0));
}

#[test]
fn test_merge_split_fields_are_exclusive() {
    let forecast: Vec<SeriesSample> = (0..48)
        .map(|i| {
            let t = tp("2024-06-01T00:00")
                .checked_add(chrono::Duration::minutes(30 * i))
                .unwrap();
            SeriesSample::new(t, i as f64)
        })
        .collect();
    let inputs = [SeriesInput::forecast(
        "forecast",
        fields::PAST_FORECAST,
        fields::FORECAST,
        &forecast,
    )];

    for record in merge(&inputs, tp("2024-06-01T12:00")) {
        let past = record.get(fields::PAST_FORECAST).is_some();
        let future = record.get(fields::FORECAST).is_some();
        assert!(past ^ future, "record {} has both or neither", record.formatted_time);
    }
}

#[test]
fn test_merge_is_deterministic() {
    let pv = vec![sample("2024-06-01T10:00", 16_400.0)];
    let forecast = vec![sample("2024-06-01T10:00", 15.0), sample("2024-06-01T10:30", 18.0)];
    let inputs = national_chart_inputs(&forecast, None, &pv, &[]);
    let reference = tp("2024-06-01T10:15");

    assert_eq!(merge(&inputs, reference), merge(&inputs, reference));
}

#[test]
fn test_merge_one_record_per_distinct_timestamp() {
    let pv = vec![
        sample("2024-06-01T09:30", 1000.0),
        sample("2024-06-01T10:00", 2000.0),
    ];
    let forecast = vec![sample("2024-06-01T10:00:00+00:00", 3.0), sample("2024-06-01T10:30", 4.0)];
    let inputs = national_chart_inputs(&forecast, None, &pv, &[]);

    let mut records = merge(&inputs, tp("2024-06-01T10:00"));
    sort_records(&mut records);

    let times: Vec<String> = records.iter().map(|r| r.formatted_time.to_string()).collect();
    assert_eq!(
        times,
        vec!["2024-06-01T09:30", "2024-06-01T10:00", "2024-06-01T10:30"]
    );
    assert_eq!(records[1].get(fields::GENERATION), Some(2.0));
    assert_eq!(records[1].get(fields::FORECAST), Some(3.0));
}

#[test]
fn test_merge_scales_and_rounds_pv_live() {
    let pv = vec![sample("2024-06-01T10:00", 16_400.0)];
    let inputs = national_chart_inputs(&[], None, &pv, &[]);

    let records = merge(&inputs, tp("2024-06-01T12:00"));
    assert_eq!(records[0].get(fields::GENERATION), Some(16.0));
}

#[test]
fn test_merge_missing_value_keeps_record_without_field() {
    let pv = vec![SeriesSample::missing(tp("2024-06-01T10:00"))];
    let inputs = [SeriesInput::actual("pv", fields::GENERATION, &pv)];

    let records = merge(&inputs, tp("2024-06-01T12:00"));
    assert_eq!(records.len(), 1);
    assert!(records[0].fields.is_empty());
}

#[test]
fn test_merge_duplicate_timestamp_last_wins() {
    let pv = vec![sample("2024-06-01T10:00", 1.0), sample("2024-06-01T10:00:30Z", 7.0)];
    let inputs = [SeriesInput::actual("pv", fields::GENERATION, &pv)];

    let records = merge(&inputs, tp("2024-06-01T12:00"));
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].get(fields::GENERATION), Some(7.0));
}

#[test]
fn test_merge_four_hour_series_only_when_enabled() {
    let forecast = vec![sample("2024-06-01T10:00", 10.0)];
    let four_hour = vec![sample("2024-06-01T10:00", 12.0)];
    let reference = tp("2024-06-01T11:00");

    let off = merge(&national_chart_inputs(&forecast, None, &[], &[]), reference);
    assert_eq!(off[0].get(fields::FOUR_HOUR_PAST_FORECAST), None);

    let on = merge(
        &national_chart_inputs(&forecast, Some(&four_hour), &[], &[]),
        reference,
    );
    assert_eq!(on[0].get(fields::FOUR_HOUR_PAST_FORECAST), Some(12.0));
    assert_eq!(on[0].get(fields::PAST_FORECAST), Some(10.0));
}

#[test]
fn test_region_chart_inputs_keep_mw() {
    let pv = vec![sample("2024-06-01T10:00", 12.3)];
    let records = merge(
        &region_chart_inputs(&[], None, &pv, &[]),
        tp("2024-06-01T12:00"),
    );
    assert_eq!(records[0].get(fields::GENERATION), Some(12.0));
}

#[test]
fn test_max_value_over_fields() {
    let pv = vec![sample("2024-06-01T10:00", 9000.0)];
    let forecast = vec![sample("2024-06-01T10:30", 11.0)];
    let records = merge(
        &national_chart_inputs(&forecast, None, &pv, &[]),
        tp("2024-06-01T10:00"),
    );

    assert_eq!(max_value(&records, &fields::NATIONAL_LINES), Some(11.0));
    assert_eq!(max_value(&records, &[fields::GENERATION]), Some(9.0));
    assert_eq!(max_value(&[], &fields::NATIONAL_LINES), None);
}

#[test]
fn test_generation_mix_attaches_generation_to_forecast_minutes() {
    let solar_forecast = vec![
        sample("2024-06-01T10:00", 2000.0),
        sample("2024-06-01T10:30", 3000.0),
    ];
    let wind_forecast = vec![sample("2024-06-01T10:30", 500.0)];
    let solar_generation = vec![
        sample("2024-06-01T10:00", 1800.0),
        sample("2024-06-01T11:00", 999.0),
    ];
    let mix = GenerationMix {
        solar_forecast: &solar_forecast,
        wind_forecast: &wind_forecast,
        solar_generation: &solar_generation,
        wind_generation: &[],
    };

    let records = merge_generation_mix(&mix, tp("2024-06-01T10:30"));

    assert_eq!(records.len(), 2, "generation without forecast is dropped");
    assert!(approx(records[0].get(fields::SOLAR_FORECAST_PAST).unwrap(), 2.0));
    assert!(approx(records[0].get(fields::SOLAR_GENERATION).unwrap(), 1.8));
    assert!(approx(records[1].get(fields::SOLAR_FORECAST_FUTURE).unwrap(), 3.0));
    assert!(approx(records[1].get(fields::WIND_FORECAST_FUTURE).unwrap(), 0.5));
    assert!(records[0].formatted_time < records[1].formatted_time);
}

// ============================================================================
// Delta Tests
// ============================================================================

#[test]
fn test_delta_arithmetic() {
    let t = "2024-06-01T12:00";
    let deltas = compute_deltas(&[actual(1, 100.0, t, 10.0)], &[forecast(1, t, 8.0)], tp(t));

    let d = deltas.get(1).unwrap();
    assert_eq!(d.delta, 2.0);
    assert_eq!(d.delta_percentage, 125.0);
    assert_eq!(d.delta_normalized, 0.02);
    assert_eq!(d.normalized_percentage(), 2.0);
}

#[test]
fn test_delta_zero_forecast_does_not_panic() {
    let t = "2024-06-01T12:00";
    let deltas = compute_deltas(
        &[actual(1, 100.0, t, 5.0), actual(2, 100.0, t, 0.0)],
        &[forecast(2, t, 0.0)],
        tp(t),
    );

    let missing_forecast = deltas.get(1).unwrap();
    assert_eq!(missing_forecast.forecast_value_mw, 0.0);
    assert_eq!(missing_forecast.delta, 5.0);
    assert!(missing_forecast.delta_percentage.is_infinite());
    assert!(missing_forecast.finite_percentage().is_none());

    let both_zero = deltas.get(2).unwrap();
    assert!(both_zero.delta_percentage.is_nan());
    assert_eq!(both_zero.delta, 0.0);
}

#[test]
fn test_delta_zero_capacity_normalizes_to_zero() {
    let t = "2024-06-01T12:00";
    let deltas = compute_deltas(&[actual(3, 0.0, t, 10.0)], &[forecast(3, t, 4.0)], tp(t));
    assert_eq!(deltas.get(3).unwrap().delta_normalized, 0.0);
}

#[test]
fn test_delta_matches_forecast_by_region_id() {
    let t = "2024-06-01T12:00";
    let actuals = vec![actual(1, 50.0, t, 10.0), actual(2, 50.0, t, 20.0)];
    let forecasts = vec![forecast(2, t, 15.0), forecast(1, t, 12.0)];

    let deltas = compute_deltas(&actuals, &forecasts, tp(t));

    assert_eq!(deltas.get(1).unwrap().delta, -2.0);
    assert_eq!(deltas.get(2).unwrap().delta, 5.0);
    let order: Vec<u32> = deltas.iter().map(|d| d.region_id).collect();
    assert_eq!(order, vec![1, 2]);
}

#[test]
fn test_delta_uses_reference_time_only() {
    let actuals = vec![RegionActual {
        meta: meta(1, 100.0),
        samples: vec![
            sample("2024-06-01T11:30", 40.0),
            sample("2024-06-01T12:00", 30.0),
        ],
    }];
    let forecasts = vec![RegionForecast {
        region_id: 1,
        samples: vec![
            sample("2024-06-01T11:30", 10.0),
            sample("2024-06-01T12:00", 25.0),
        ],
    }];

    let deltas = compute_deltas(&actuals, &forecasts, tp("2024-06-01T11:30"));
    assert_eq!(deltas.get(1).unwrap().delta, 30.0);

    let none = compute_deltas(&actuals, &forecasts, tp("2024-06-01T13:00"));
    assert_eq!(none.get(1).unwrap().actual_value_mw, 0.0);
    assert_eq!(none.get(1).unwrap().forecast_value_mw, 0.0);
}

#[test]
fn test_legacy_buckets_leave_gaps() {
    let mode = BoundaryMode::Legacy;
    for gap in [2.0, 20.0, 40.0, 60.0, -200.0, 250.0] {
        assert_eq!(classify(gap, mode), None, "{} should be unbucketed", gap);
    }

    assert_eq!(classify(-60.0, mode), BucketKey::new(-3));
    assert_eq!(classify(-1.0, mode), Some(BucketKey::CENTER));
    assert_eq!(classify(1.99, mode), Some(BucketKey::CENTER));
    assert_eq!(classify(19.0, mode), BucketKey::new(1));
    assert_eq!(classify(200.0, mode), BucketKey::new(4));
    assert_eq!(classify(-150.0, mode), BucketKey::new(-4));
}

#[test]
fn test_contiguous_buckets_cover_every_value_once() {
    let defs = bucket_defs(BoundaryMode::Contiguous);
    let mut value = -500.0;
    while value <= 500.0 {
        let hits = defs.iter().filter(|d| d.contains(value)).count();
        assert_eq!(hits, 1, "{} falls in {} buckets", value, hits);
        value += 0.5;
    }

    assert_eq!(classify(20.0, BoundaryMode::Contiguous), BucketKey::new(1));
    assert_eq!(classify(2.0, BoundaryMode::Contiguous), Some(BucketKey::CENTER));
    assert_eq!(classify(1e6, BoundaryMode::Contiguous), BucketKey::new(4));
    assert_eq!(classify(f64::NAN, BoundaryMode::Contiguous), None);
}

#[test]
fn test_bucket_keys_and_labels() {
    let defs = bucket_defs(BoundaryMode::Legacy);
    let labels: Vec<&str> = defs.iter().map(|d| d.label).collect();
    assert_eq!(
        labels,
        vec!["-80", "-60", "-40", "-20", "+/-", "+20", "+40", "+60", "+80"]
    );
    assert_eq!(BucketKey::from_position(0), BucketKey::new(-4));
    assert_eq!(BucketKey::new(4).unwrap().position(), 8);
    assert!(BucketKey::new(5).is_none());
}

#[test]
fn test_bucket_counts() {
    let t = "2024-06-01T12:00";
    let actuals = vec![
        actual(1, 100.0, t, 30.0),
        actual(2, 100.0, t, 50.0),
        actual(3, 100.0, t, 20.0),
    ];
    let deltas = compute_deltas(&actuals, &[], tp(t));

    let counts = bucket_counts(&deltas, BoundaryMode::Legacy);
    assert_eq!(counts.len(), 9);
    assert_eq!(counts[6].count, 1); // 30 in (20,40)
    assert_eq!(counts[7].count, 1); // 50 in (40,60)
    assert_eq!(counts.iter().map(|b| b.count).sum::<usize>(), 2);

    let summary = DeltaSummary::compute(&actuals, &[], tp(t), BoundaryMode::Legacy);
    assert_eq!(summary.unbucketed(), 1);
    assert_eq!(summary.total_delta_mw(), 100.0);

    let contiguous = DeltaSummary::compute(&actuals, &[], tp(t), BoundaryMode::Contiguous);
    assert_eq!(contiguous.unbucketed(), 0);
}

#[test]
fn test_delta_columns_order_and_selection() {
    let t = "2024-06-01T12:00";
    let actuals: Vec<RegionActual> = [-30.0, -5.0, 0.0, 10.0, 50.0]
        .iter()
        .enumerate()
        .map(|(i, mw)| actual(i as u32 + 1, 100.0, t, *mw))
        .collect();
    let deltas = compute_deltas(&actuals, &[], tp(t));

    let all = BucketKey::all();
    let columns = delta_columns(&deltas, &all, BoundaryMode::Legacy);
    let negative: Vec<f64> = columns.negative.iter().map(|d| d.delta).collect();
    let positive: Vec<f64> = columns.positive.iter().map(|d| d.delta).collect();
    assert_eq!(negative, vec![-30.0, -5.0]);
    assert_eq!(positive, vec![50.0, 10.0]);

    let mut selected: BTreeSet<BucketKey> = all.clone();
    selected.remove(&BucketKey::new(-2).unwrap());
    let filtered = delta_columns(&deltas, &selected, BoundaryMode::Legacy);
    let negative: Vec<f64> = filtered.negative.iter().map(|d| d.delta).collect();
    assert_eq!(negative, vec![-5.0]);
}

// ============================================================================
// Header Tests
// ============================================================================

#[test]
fn test_header_summary() {
    let forecast = vec![
        ForecastValue {
            target_time: tp("2024-06-01T10:30"),
            expected_power_generation_megawatts: Some(5000.0),
        },
        ForecastValue {
            target_time: tp("2024-06-01T11:00"),
            expected_power_generation_megawatts: Some(6000.0),
        },
    ];
    let pv_live = vec![
        PvLiveValue {
            datetime_utc: tp("2024-06-01T10:30"),
            solar_generation_kw: Some(4_200_000.0),
        },
        PvLiveValue {
            datetime_utc: tp("2024-06-01T10:00"),
            solar_generation_kw: Some(3_900_000.0),
        },
    ];

    let header = HeaderSummary::compute(&forecast, &pv_live, tp("2024-06-01T11:00"));

    assert_eq!(header.next_forecast_gw, 6.0);
    assert_eq!(header.actual_time, Some(tp("2024-06-01T10:30")));
    assert!(approx(header.actual_gw, 4.2));
    assert_eq!(header.forecast_at_actual_gw, 5.0);
    assert!(approx(header.delta_gw(), -0.8));
}

#[test]
fn test_header_without_data_is_zero() {
    let header = HeaderSummary::compute(&[], &[], tp("2024-06-01T11:00"));
    assert_eq!(header.actual_time, None);
    assert_eq!(header.actual_gw, 0.0);
    assert_eq!(header.next_forecast_gw, 0.0);
}
