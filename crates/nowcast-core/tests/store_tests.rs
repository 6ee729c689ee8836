//! DataStore views over backend-shaped fixtures

use nowcast_core::analytics::{fields, BoundaryMode};
use nowcast_core::models::{ForecastData, GspAllForecasts, GspPvLive, PvLiveData, TimePoint};
use nowcast_core::store::RegionDetail;
use nowcast_core::{DataEvent, DataSlot, DataStore, EventBus, PanelView, SlotUpdate};

const NATIONAL_FORECAST: &str = r#"[
    {"targetTime": "2024-06-01T10:00:00+00:00", "expectedPowerGenerationMegawatts": 5000.0},
    {"targetTime": "2024-06-01T10:30:00+00:00", "expectedPowerGenerationMegawatts": 5400.0},
    {"targetTime": "2024-06-01T11:00:00+00:00", "expectedPowerGenerationMegawatts": 5800.0}
]"#;

const NATIONAL_PV: &str = r#"[
    {"datetimeUtc": "2024-06-01T10:30:00+00:00", "solarGenerationKw": 5200000},
    {"datetimeUtc": "2024-06-01T10:00:00+00:00", "solarGenerationKw": 4900000}
]"#;

const GSP_FORECASTS: &str = r#"{"forecasts": [
    {"location": {"gspId": 2, "regionName": "Alverdiscott"}, "forecastValues": [
        {"targetTime": "2024-06-01T10:30:00+00:00", "expectedPowerGenerationMegawatts": 30.0}
    ]},
    {"location": {"gspId": 1, "regionName": "Abham"}, "forecastValues": [
        {"targetTime": "2024-06-01T10:30:00+00:00", "expectedPowerGenerationMegawatts": 8.0}
    ]}
]}"#;

const GSP_PV: &str = r#"[
    {"gspId": 1, "regionName": "Abham", "installedCapacityMw": 100.0,
     "gspYields": [{"datetimeUtc": "2024-06-01T10:30:00+00:00", "solarGenerationKw": 10000}]},
    {"gspId": 2, "regionName": "Alverdiscott", "installedCapacityMw": 50.0,
     "gspYields": [{"datetimeUtc": "2024-06-01T10:30:00+00:00", "solarGenerationKw": 5000}]}
]"#;

fn tp(s: &str) -> TimePoint {
    s.parse().unwrap()
}

fn loaded_store() -> DataStore {
    let store = DataStore::default();
    let forecast: ForecastData = serde_json::from_str(NATIONAL_FORECAST).unwrap();
    let pv: PvLiveData = serde_json::from_str(NATIONAL_PV).unwrap();
    let gsp_forecasts: GspAllForecasts = serde_json::from_str(GSP_FORECASTS).unwrap();
    let gsp_pv: Vec<GspPvLive> = serde_json::from_str(GSP_PV).unwrap();

    store.ingest(SlotUpdate::NationalForecast(forecast));
    store.ingest(SlotUpdate::NationalPvInDay(pv));
    store.ingest(SlotUpdate::RegionForecasts(gsp_forecasts));
    store.ingest(SlotUpdate::RegionPvLive(gsp_pv));
    store
}

#[test]
fn test_national_chart_from_fixtures() {
    let store = loaded_store();
    let records = store
        .national_chart(tp("2024-06-01T10:30"), false)
        .ready()
        .unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(records[0].get(fields::PAST_FORECAST), Some(5000.0));
    assert_eq!(records[0].get(fields::GENERATION), Some(4900.0));
    assert_eq!(records[1].get(fields::FORECAST), Some(5400.0));
    assert_eq!(records[1].get(fields::GENERATION), Some(5200.0));
    assert_eq!(records[2].get(fields::GENERATION), None);
}

#[test]
fn test_deltas_matched_by_region_id() {
    let store = loaded_store();
    let summary = store
        .deltas(tp("2024-06-01T10:30"), BoundaryMode::Legacy)
        .ready()
        .unwrap();

    let abham = summary.deltas.get(1).unwrap();
    assert_eq!(abham.delta, 2.0);
    assert_eq!(abham.delta_percentage, 125.0);
    assert_eq!(abham.delta_normalized, 0.02);

    let alverdiscott = summary.deltas.get(2).unwrap();
    assert_eq!(alverdiscott.delta, -25.0);
    // +2 MW sits in a legacy boundary gap
    assert_eq!(summary.buckets.iter().map(|b| b.count).sum::<usize>(), 1);
    assert_eq!(summary.unbucketed(), 1);
}

#[test]
fn test_region_metadata_from_pv_live() {
    let store = loaded_store();
    let regions = store.regions();

    assert_eq!(regions.len(), 2);
    assert_eq!(regions[0].region_name, "Abham");
    assert_eq!(store.region_meta(2).unwrap().installed_capacity_mw, 50.0);
}

#[test]
fn test_header_from_fixtures() {
    let store = loaded_store();
    let header = store.header(tp("2024-06-01T11:00")).ready().unwrap();

    assert_eq!(header.next_forecast_gw, 5.8);
    assert_eq!(header.actual_time, Some(tp("2024-06-01T10:30")));
    assert_eq!(header.forecast_at_actual_gw, 5.4);
}

#[test]
fn test_region_chart_uses_matching_detail_only() {
    let store = loaded_store();
    store.ingest(SlotUpdate::RegionDetail(RegionDetail {
        region_id: 1,
        pv_in_day: vec![nowcast_core::models::SeriesSample::new(
            tp("2024-06-01T10:30"),
            9.6,
        )],
        pv_day_after: Vec::new(),
        four_hour: Vec::new(),
    }));

    let one = store
        .region_chart(1, tp("2024-06-01T10:30"), false)
        .ready()
        .unwrap();
    assert_eq!(one[0].get(fields::GENERATION), Some(10.0));
    assert_eq!(one[0].get(fields::FORECAST), Some(8.0));

    let two = store
        .region_chart(2, tp("2024-06-01T10:30"), false)
        .ready()
        .unwrap();
    assert_eq!(two[0].get(fields::GENERATION), None);
    assert_eq!(two[0].get(fields::FORECAST), Some(30.0));
}

#[test]
fn test_panels_fail_independently() {
    let store = DataStore::default();
    store.fail(DataSlot::NationalForecast, "HTTP 502");
    store.ingest(SlotUpdate::RegionForecasts(
        serde_json::from_str(GSP_FORECASTS).unwrap(),
    ));

    assert_eq!(
        store.national_chart(tp("2024-06-01T10:30"), false),
        PanelView::Failed("HTTP 502".to_string())
    );
    assert!(store
        .deltas(tp("2024-06-01T10:30"), BoundaryMode::Legacy)
        .is_loading());
    assert!(store
        .region_chart(1, tp("2024-06-01T10:30"), false)
        .ready()
        .is_some());
}

#[tokio::test]
async fn test_ingest_publishes_slot_events() {
    let bus = EventBus::default();
    let mut rx = bus.subscribe();
    let store = DataStore::new(bus);

    store.ingest(SlotUpdate::NationalPvDayAfter(Vec::new()));
    store.fail(DataSlot::NationalFourHour, "timeout");

    assert_eq!(
        rx.recv().await.unwrap(),
        DataEvent::SeriesUpdated(DataSlot::NationalPvDayAfter)
    );
    assert_eq!(
        rx.recv().await.unwrap(),
        DataEvent::SeriesFailed {
            slot: DataSlot::NationalFourHour,
            message: "timeout".to_string()
        }
    );
}
