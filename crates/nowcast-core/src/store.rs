//! Data store with per-slot fetch state and memoized derived views
//!
//! Each backend series lives in its own slot so a failing endpoint only
//! degrades the panel that needs it. Derived views (charts, deltas) are
//! pure functions of slot contents, cached in moka keyed on the slot
//! versions they read plus the reference time and view flags.

use crate::analytics::{
    merge, merge_generation_mix, national_chart_inputs, region_chart_inputs, sort_records,
    BoundaryMode, DeltaSummary, GenerationMix, HeaderSummary, MergedRecord,
};
use crate::client::{ApiClient, EnergySource, PvRegime};
use crate::error::{CoreError, DegradedState, ErrorSeverity, LoadError, LoadReport};
use crate::event::{DataEvent, DataSlot, EventBus};
use crate::models::{
    forecast_samples, pv_live_samples, ForecastData, GenerationResponse, GspAllForecasts,
    GspPvLive, PvLiveData, RegionActual, RegionForecast, RegionId, RegionMeta, SeriesSample,
    TimePoint, KW_PER_MW,
};
use crate::playback::TimeBounds;
use dashmap::DashMap;
use moka::sync::Cache;
use parking_lot::RwLock;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Fetch outcome of one slot
#[derive(Debug)]
pub enum FetchState<T> {
    /// Nothing fetched yet
    Loading,
    Ready(Arc<T>),
    Failed(String),
}

impl<T> Clone for FetchState<T> {
    fn clone(&self) -> Self {
        match self {
            FetchState::Loading => FetchState::Loading,
            FetchState::Ready(data) => FetchState::Ready(Arc::clone(data)),
            FetchState::Failed(message) => FetchState::Failed(message.clone()),
        }
    }
}

impl<T> FetchState<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, FetchState::Ready(_))
    }

    pub fn ready(&self) -> Option<&Arc<T>> {
        match self {
            FetchState::Ready(data) => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            FetchState::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// What a panel should render
#[derive(Debug, Clone, PartialEq)]
pub enum PanelView<T> {
    Loading,
    Failed(String),
    Ready(T),
}

impl<T> PanelView<T> {
    pub fn ready(self) -> Option<T> {
        match self {
            PanelView::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, PanelView::Loading)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> PanelView<U> {
        match self {
            PanelView::Loading => PanelView::Loading,
            PanelView::Failed(message) => PanelView::Failed(message),
            PanelView::Ready(value) => PanelView::Ready(f(value)),
        }
    }
}

/// Per-region series for the clicked region's chart, values in MW
#[derive(Debug, Clone, PartialEq)]
pub struct RegionDetail {
    pub region_id: RegionId,
    pub pv_in_day: Vec<SeriesSample>,
    pub pv_day_after: Vec<SeriesSample>,
    pub four_hour: Vec<SeriesSample>,
}

impl RegionDetail {
    pub fn from_wire(
        region_id: RegionId,
        pv_in_day: &[crate::models::PvLiveValue],
        pv_day_after: &[crate::models::PvLiveValue],
        four_hour: &[crate::models::ForecastValue],
    ) -> Self {
        let to_mw = |values: &[crate::models::PvLiveValue]| {
            pv_live_samples(values)
                .into_iter()
                .map(|s| SeriesSample {
                    timestamp: s.timestamp,
                    value: s.value.map(|kw| kw / KW_PER_MW),
                })
                .collect::<Vec<_>>()
        };
        Self {
            region_id,
            pv_in_day: to_mw(pv_in_day),
            pv_day_after: to_mw(pv_day_after),
            four_hour: forecast_samples(four_hour),
        }
    }
}

/// Solar and wind series of one regional-product region, values in kW
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionalMix {
    pub region: String,
    pub solar_generation: Vec<SeriesSample>,
    pub wind_generation: Vec<SeriesSample>,
    pub solar_forecast: Vec<SeriesSample>,
    pub wind_forecast: Vec<SeriesSample>,
}

impl RegionalMix {
    pub fn from_wire(
        region: impl Into<String>,
        solar_generation: &GenerationResponse,
        wind_generation: &GenerationResponse,
        solar_forecast: &GenerationResponse,
        wind_forecast: &GenerationResponse,
    ) -> Self {
        let samples = |response: &GenerationResponse| {
            response.values.iter().map(|v| v.to_sample()).collect::<Vec<_>>()
        };
        Self {
            region: region.into(),
            solar_generation: samples(solar_generation),
            wind_generation: samples(wind_generation),
            solar_forecast: samples(solar_forecast),
            wind_forecast: samples(wind_forecast),
        }
    }

    pub fn as_mix(&self) -> GenerationMix<'_> {
        GenerationMix {
            solar_forecast: &self.solar_forecast,
            wind_forecast: &self.wind_forecast,
            solar_generation: &self.solar_generation,
            wind_generation: &self.wind_generation,
        }
    }
}

/// New data for one slot
#[derive(Debug, Clone)]
pub enum SlotUpdate {
    NationalForecast(ForecastData),
    NationalFourHour(ForecastData),
    NationalPvInDay(PvLiveData),
    NationalPvDayAfter(PvLiveData),
    RegionForecasts(GspAllForecasts),
    RegionPvLive(Vec<GspPvLive>),
    RegionDetail(RegionDetail),
    RegionalMix(RegionalMix),
}

impl SlotUpdate {
    pub fn slot(&self) -> DataSlot {
        match self {
            SlotUpdate::NationalForecast(_) => DataSlot::NationalForecast,
            SlotUpdate::NationalFourHour(_) => DataSlot::NationalFourHour,
            SlotUpdate::NationalPvInDay(_) => DataSlot::NationalPvInDay,
            SlotUpdate::NationalPvDayAfter(_) => DataSlot::NationalPvDayAfter,
            SlotUpdate::RegionForecasts(_) => DataSlot::RegionForecasts,
            SlotUpdate::RegionPvLive(_) => DataSlot::RegionPvLive,
            SlotUpdate::RegionDetail(_) => DataSlot::RegionDetail,
            SlotUpdate::RegionalMix(_) => DataSlot::RegionalMix,
        }
    }
}

/// What a refresh should fetch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshOptions {
    pub show_4h_view: bool,
    /// Region whose detail series should be fetched
    pub region: Option<RegionId>,
}

struct Slot<T> {
    state: FetchState<T>,
    version: u64,
}

impl<T> Slot<T> {
    fn new() -> Self {
        Self {
            state: FetchState::Loading,
            version: 0,
        }
    }

    fn set(&mut self, state: FetchState<T>) {
        self.state = state;
        self.version += 1;
    }

    fn fail(&mut self, message: String) {
        self.set(FetchState::Failed(message));
    }
}

#[derive(Clone)]
enum CachedView {
    Chart(Arc<Vec<MergedRecord>>),
    Deltas(Arc<DeltaSummary>),
}

/// Memo of derived views keyed on a hash of their inputs
pub struct DerivedCache {
    cache: Cache<u64, CachedView>,
}

impl DerivedCache {
    pub fn new(max_capacity: u64) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_idle(Duration::from_secs(600))
                .build(),
        }
    }

    fn get_with(&self, key: u64, compute: impl FnOnce() -> CachedView) -> CachedView {
        self.cache.get_with(key, compute)
    }

    pub fn clear(&self) {
        self.cache.invalidate_all();
    }
}

fn view_key(parts: impl Hash) -> u64 {
    let mut hasher = DefaultHasher::new();
    parts.hash(&mut hasher);
    hasher.finish()
}

/// Central data store for the dashboard
pub struct DataStore {
    national_forecast: RwLock<Slot<ForecastData>>,
    national_four_hour: RwLock<Slot<ForecastData>>,
    pv_in_day: RwLock<Slot<PvLiveData>>,
    pv_day_after: RwLock<Slot<PvLiveData>>,
    region_forecasts: RwLock<Slot<Vec<RegionForecast>>>,
    region_actuals: RwLock<Slot<Vec<RegionActual>>>,
    region_detail: RwLock<Slot<RegionDetail>>,
    regional_mix: RwLock<Slot<RegionalMix>>,

    /// Region metadata extracted from the regional PV live response
    regions: DashMap<RegionId, RegionMeta>,

    derived: DerivedCache,

    event_bus: EventBus,

    degraded_state: RwLock<DegradedState>,
}

impl DataStore {
    pub fn new(event_bus: EventBus) -> Self {
        Self {
            national_forecast: RwLock::new(Slot::new()),
            national_four_hour: RwLock::new(Slot::new()),
            pv_in_day: RwLock::new(Slot::new()),
            pv_day_after: RwLock::new(Slot::new()),
            region_forecasts: RwLock::new(Slot::new()),
            region_actuals: RwLock::new(Slot::new()),
            region_detail: RwLock::new(Slot::new()),
            regional_mix: RwLock::new(Slot::new()),
            regions: DashMap::new(),
            derived: DerivedCache::new(256),
            event_bus,
            degraded_state: RwLock::new(DegradedState::Healthy),
        }
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn derived_cache(&self) -> &DerivedCache {
        &self.derived
    }

    pub fn degraded_state(&self) -> DegradedState {
        self.degraded_state.read().clone()
    }

    // ===================
    // Writes
    // ===================

    /// Store fresh data for one slot and notify subscribers
    pub fn ingest(&self, update: SlotUpdate) {
        let slot = update.slot();
        match update {
            SlotUpdate::NationalForecast(data) => {
                debug!(values = data.len(), "National forecast updated");
                self.national_forecast.write().set(FetchState::Ready(Arc::new(data)));
            }
            SlotUpdate::NationalFourHour(data) => {
                self.national_four_hour.write().set(FetchState::Ready(Arc::new(data)));
            }
            SlotUpdate::NationalPvInDay(data) => {
                self.pv_in_day.write().set(FetchState::Ready(Arc::new(data)));
            }
            SlotUpdate::NationalPvDayAfter(data) => {
                self.pv_day_after.write().set(FetchState::Ready(Arc::new(data)));
            }
            SlotUpdate::RegionForecasts(all) => {
                let forecasts = all.region_forecasts();
                debug!(regions = forecasts.len(), "Region forecasts updated");
                self.region_forecasts.write().set(FetchState::Ready(Arc::new(forecasts)));
            }
            SlotUpdate::RegionPvLive(entries) => {
                for entry in &entries {
                    self.regions.insert(entry.gsp_id, entry.meta());
                }
                let actuals: Vec<RegionActual> =
                    entries.iter().map(GspPvLive::to_region_actual).collect();
                debug!(regions = actuals.len(), "Region actuals updated");
                self.region_actuals.write().set(FetchState::Ready(Arc::new(actuals)));
            }
            SlotUpdate::RegionDetail(detail) => {
                self.region_detail.write().set(FetchState::Ready(Arc::new(detail)));
            }
            SlotUpdate::RegionalMix(mix) => {
                debug!(region = %mix.region, "Regional mix updated");
                self.regional_mix.write().set(FetchState::Ready(Arc::new(mix)));
            }
        }
        self.event_bus.publish(DataEvent::SeriesUpdated(slot));
    }

    /// Mark a slot as failed and notify subscribers
    pub fn fail(&self, slot: DataSlot, message: impl Into<String>) {
        let message = message.into();
        warn!(slot = slot.name(), error = %message, "Fetch failed");

        let failed = message.clone();
        match slot {
            DataSlot::NationalForecast => self.national_forecast.write().fail(failed),
            DataSlot::NationalFourHour => self.national_four_hour.write().fail(failed),
            DataSlot::NationalPvInDay => self.pv_in_day.write().fail(failed),
            DataSlot::NationalPvDayAfter => self.pv_day_after.write().fail(failed),
            DataSlot::RegionForecasts => self.region_forecasts.write().fail(failed),
            DataSlot::RegionPvLive => self.region_actuals.write().fail(failed),
            DataSlot::RegionDetail => self.region_detail.write().fail(failed),
            DataSlot::RegionalMix => self.regional_mix.write().fail(failed),
        }
        self.event_bus.publish(DataEvent::SeriesFailed { slot, message });
    }

    fn apply<T>(
        &self,
        slot: DataSlot,
        result: Result<T, CoreError>,
        wrap: impl FnOnce(T) -> SlotUpdate,
        report: &mut LoadReport,
    ) {
        match result {
            Ok(data) => {
                self.ingest(wrap(data));
                report.slots_loaded += 1;
            }
            Err(e) => {
                let mut error = LoadError::from_core_error(slot.name(), &e);
                if slot == DataSlot::NationalForecast {
                    error.severity = ErrorSeverity::Fatal;
                }
                self.fail(slot, e.to_string());
                report.add_error(error);
                report.slots_failed += 1;
            }
        }
    }

    /// Fetch every series concurrently and store the outcomes
    pub async fn refresh(&self, client: &ApiClient, options: RefreshOptions) -> LoadReport {
        let mut report = LoadReport::new();
        info!(?options, "Refreshing data");

        let (forecast, in_day, day_after, gsp_forecasts, gsp_pv, four_hour) = tokio::join!(
            client.national_forecast(),
            client.national_pv_live(PvRegime::InDay),
            client.national_pv_live(PvRegime::DayAfter),
            client.gsp_forecasts_all(),
            client.gsp_pv_live_all(),
            async {
                if options.show_4h_view {
                    Some(client.national_forecast_4h().await)
                } else {
                    None
                }
            },
        );

        self.apply(DataSlot::NationalForecast, forecast, SlotUpdate::NationalForecast, &mut report);
        self.apply(DataSlot::NationalPvInDay, in_day, SlotUpdate::NationalPvInDay, &mut report);
        self.apply(
            DataSlot::NationalPvDayAfter,
            day_after,
            SlotUpdate::NationalPvDayAfter,
            &mut report,
        );
        self.apply(
            DataSlot::RegionForecasts,
            gsp_forecasts,
            SlotUpdate::RegionForecasts,
            &mut report,
        );
        self.apply(DataSlot::RegionPvLive, gsp_pv, SlotUpdate::RegionPvLive, &mut report);
        if let Some(four_hour) = four_hour {
            self.apply(
                DataSlot::NationalFourHour,
                four_hour,
                SlotUpdate::NationalFourHour,
                &mut report,
            );
        }

        if let Some(region_id) = options.region {
            let detail = self
                .fetch_region_detail(client, region_id, options.show_4h_view)
                .await;
            self.apply(DataSlot::RegionDetail, detail, SlotUpdate::RegionDetail, &mut report);
        }

        self.update_degraded_state(&report);
        self.event_bus.publish(DataEvent::LoadCompleted);

        info!(
            loaded = report.slots_loaded,
            failed = report.slots_failed,
            "Refresh complete"
        );
        report
    }

    async fn fetch_region_detail(
        &self,
        client: &ApiClient,
        region_id: RegionId,
        show_4h_view: bool,
    ) -> Result<RegionDetail, CoreError> {
        let (in_day, day_after, four_hour) = tokio::join!(
            client.gsp_pv_live(region_id, PvRegime::InDay),
            client.gsp_pv_live(region_id, PvRegime::DayAfter),
            async {
                if show_4h_view {
                    client.gsp_forecast_4h(region_id).await
                } else {
                    Ok(Vec::new())
                }
            },
        );

        Ok(RegionDetail::from_wire(region_id, &in_day?, &day_after?, &four_hour?))
    }

    /// Fetch the solar/wind product for `region`.
    ///
    /// Separate from [`DataStore::refresh`]: the regional product lives on
    /// its own backend and leaves the dashboard's degraded state alone.
    pub async fn refresh_regional(&self, client: &ApiClient, region: &str) -> LoadReport {
        let mut report = LoadReport::new();
        info!(region, "Refreshing regional mix");

        let mix = Self::fetch_regional_mix(client, region).await;
        self.apply(DataSlot::RegionalMix, mix, SlotUpdate::RegionalMix, &mut report);
        report
    }

    async fn fetch_regional_mix(
        client: &ApiClient,
        region: &str,
    ) -> Result<RegionalMix, CoreError> {
        let (solar_generation, wind_generation, solar_forecast, wind_forecast) = tokio::join!(
            client.regional_generation(EnergySource::Solar, region),
            client.regional_generation(EnergySource::Wind, region),
            client.regional_forecast(EnergySource::Solar, region),
            client.regional_forecast(EnergySource::Wind, region),
        );

        Ok(RegionalMix::from_wire(
            region,
            &solar_generation?,
            &wind_generation?,
            &solar_forecast?,
            &wind_forecast?,
        ))
    }

    fn update_degraded_state(&self, report: &LoadReport) {
        let mut state = self.degraded_state.write();

        if report.has_fatal_errors() {
            *state = DegradedState::Unavailable {
                reason: "National forecast unavailable".to_string(),
            };
            return;
        }

        let missing = report.missing_sources();
        if missing.is_empty() {
            *state = DegradedState::Healthy;
        } else {
            *state = DegradedState::PartialData {
                reason: format!("Missing: {}", missing.join(", ")),
                missing,
            };
        }
    }

    // ===================
    // Read accessors
    // ===================

    pub fn slot_state(&self, slot: DataSlot) -> FetchState<()> {
        fn strip<T>(state: &FetchState<T>) -> FetchState<()> {
            match state {
                FetchState::Loading => FetchState::Loading,
                FetchState::Ready(_) => FetchState::Ready(Arc::new(())),
                FetchState::Failed(message) => FetchState::Failed(message.clone()),
            }
        }
        match slot {
            DataSlot::NationalForecast => strip(&self.national_forecast.read().state),
            DataSlot::NationalFourHour => strip(&self.national_four_hour.read().state),
            DataSlot::NationalPvInDay => strip(&self.pv_in_day.read().state),
            DataSlot::NationalPvDayAfter => strip(&self.pv_day_after.read().state),
            DataSlot::RegionForecasts => strip(&self.region_forecasts.read().state),
            DataSlot::RegionPvLive => strip(&self.region_actuals.read().state),
            DataSlot::RegionDetail => strip(&self.region_detail.read().state),
            DataSlot::RegionalMix => strip(&self.regional_mix.read().state),
        }
    }

    pub fn national_forecast(&self) -> FetchState<ForecastData> {
        self.national_forecast.read().state.clone()
    }

    pub fn pv_in_day(&self) -> FetchState<PvLiveData> {
        self.pv_in_day.read().state.clone()
    }

    pub fn region_meta(&self, region_id: RegionId) -> Option<RegionMeta> {
        self.regions.get(&region_id).map(|m| m.value().clone())
    }

    /// All known regions ordered by id
    pub fn regions(&self) -> Vec<RegionMeta> {
        let mut regions: Vec<RegionMeta> = self.regions.iter().map(|e| e.value().clone()).collect();
        regions.sort_by_key(|r| r.region_id);
        regions
    }

    /// Earliest and latest national forecast target times
    pub fn bounds(&self) -> TimeBounds {
        let guard = self.national_forecast.read();
        let Some(forecast) = guard.state.ready() else {
            return TimeBounds::unbounded();
        };
        let earliest = forecast.iter().map(|f| f.target_time).min();
        let latest = forecast.iter().map(|f| f.target_time).max();
        TimeBounds::new(earliest, latest)
    }

    // ===================
    // Derived views
    // ===================

    /// Merged national chart records at `reference`, sorted by time.
    ///
    /// The national forecast is required; PV live and the 4-hour series
    /// render as empty until they arrive.
    pub fn national_chart(
        &self,
        reference: TimePoint,
        show_4h_view: bool,
    ) -> PanelView<Arc<Vec<MergedRecord>>> {
        let forecast = self.national_forecast.read();
        let pv_in_day = self.pv_in_day.read();
        let pv_day_after = self.pv_day_after.read();
        let four_hour = self.national_four_hour.read();

        let data = match &forecast.state {
            FetchState::Loading => return PanelView::Loading,
            FetchState::Failed(message) => return PanelView::Failed(message.clone()),
            FetchState::Ready(data) => Arc::clone(data),
        };

        let key = view_key((
            "national",
            forecast.version,
            pv_in_day.version,
            pv_day_after.version,
            show_4h_view.then_some(four_hour.version),
            reference,
        ));

        let view = self.derived.get_with(key, || {
            let forecast = forecast_samples(&data);
            let in_day = pv_in_day
                .state
                .ready()
                .map(|v| pv_live_samples(v))
                .unwrap_or_default();
            let day_after = pv_day_after
                .state
                .ready()
                .map(|v| pv_live_samples(v))
                .unwrap_or_default();
            let four_hour_samples = four_hour.state.ready().map(|v| forecast_samples(v));
            let four_hour_slice = if show_4h_view {
                four_hour_samples.as_deref()
            } else {
                None
            };

            let inputs = national_chart_inputs(&forecast, four_hour_slice, &in_day, &day_after);
            let mut records = merge(&inputs, reference);
            sort_records(&mut records);
            CachedView::Chart(Arc::new(records))
        });

        match view {
            CachedView::Chart(records) => PanelView::Ready(records),
            CachedView::Deltas(_) => PanelView::Failed("view cache collision".to_string()),
        }
    }

    /// Merged chart for one region at `reference`.
    ///
    /// Requires the regional forecasts; the region's PV live series come
    /// from the detail slot when it holds this region.
    pub fn region_chart(
        &self,
        region_id: RegionId,
        reference: TimePoint,
        show_4h_view: bool,
    ) -> PanelView<Arc<Vec<MergedRecord>>> {
        let forecasts = self.region_forecasts.read();
        let detail = self.region_detail.read();

        let all = match &forecasts.state {
            FetchState::Loading => return PanelView::Loading,
            FetchState::Failed(message) => return PanelView::Failed(message.clone()),
            FetchState::Ready(all) => Arc::clone(all),
        };
        let detail_data = detail
            .state
            .ready()
            .filter(|d| d.region_id == region_id)
            .cloned();

        let key = view_key((
            "region",
            region_id,
            forecasts.version,
            detail_data.as_ref().map(|_| detail.version),
            show_4h_view,
            reference,
        ));

        let view = self.derived.get_with(key, || {
            let forecast: &[SeriesSample] = all
                .iter()
                .find(|f| f.region_id == region_id)
                .map(|f| f.samples.as_slice())
                .unwrap_or(&[]);
            let (in_day, day_after, four_hour) = match &detail_data {
                Some(d) => (
                    d.pv_in_day.as_slice(),
                    d.pv_day_after.as_slice(),
                    show_4h_view.then_some(d.four_hour.as_slice()),
                ),
                None => (&[][..], &[][..], None),
            };

            let inputs = region_chart_inputs(forecast, four_hour, in_day, day_after);
            let mut records = merge(&inputs, reference);
            sort_records(&mut records);
            CachedView::Chart(Arc::new(records))
        });

        match view {
            CachedView::Chart(records) => PanelView::Ready(records),
            CachedView::Deltas(_) => PanelView::Failed("view cache collision".to_string()),
        }
    }

    /// Merged solar/wind chart of the regional product at `reference`
    pub fn regional_chart(&self, reference: TimePoint) -> PanelView<Arc<Vec<MergedRecord>>> {
        let slot = self.regional_mix.read();

        let mix = match &slot.state {
            FetchState::Loading => return PanelView::Loading,
            FetchState::Failed(message) => return PanelView::Failed(message.clone()),
            FetchState::Ready(mix) => Arc::clone(mix),
        };

        let key = view_key(("regional", slot.version, reference));
        let view = self.derived.get_with(key, || {
            CachedView::Chart(Arc::new(merge_generation_mix(&mix.as_mix(), reference)))
        });

        match view {
            CachedView::Chart(records) => PanelView::Ready(records),
            CachedView::Deltas(_) => PanelView::Failed("view cache collision".to_string()),
        }
    }

    /// Region deltas and bucket counts at `reference`
    pub fn deltas(&self, reference: TimePoint, mode: BoundaryMode) -> PanelView<Arc<DeltaSummary>> {
        let actuals = self.region_actuals.read();
        let forecasts = self.region_forecasts.read();

        let (actual_data, forecast_data) = match (&actuals.state, &forecasts.state) {
            (FetchState::Failed(message), _) | (_, FetchState::Failed(message)) => {
                return PanelView::Failed(message.clone())
            }
            (FetchState::Ready(a), FetchState::Ready(f)) => (Arc::clone(a), Arc::clone(f)),
            _ => return PanelView::Loading,
        };

        let key = view_key(("deltas", actuals.version, forecasts.version, reference, mode));

        let view = self.derived.get_with(key, || {
            CachedView::Deltas(Arc::new(DeltaSummary::compute(
                &actual_data,
                &forecast_data,
                reference,
                mode,
            )))
        });

        match view {
            CachedView::Deltas(summary) => PanelView::Ready(summary),
            CachedView::Chart(_) => PanelView::Failed("view cache collision".to_string()),
        }
    }

    /// National header at `now`
    pub fn header(&self, now: TimePoint) -> PanelView<HeaderSummary> {
        let forecast = self.national_forecast.read();
        let pv = self.pv_in_day.read();

        match &forecast.state {
            FetchState::Loading => PanelView::Loading,
            FetchState::Failed(message) => PanelView::Failed(message.clone()),
            FetchState::Ready(data) => {
                let pv_live: &[crate::models::PvLiveValue] =
                    pv.state.ready().map(|v| v.as_slice()).unwrap_or(&[]);
                PanelView::Ready(HeaderSummary::compute(data, pv_live, now))
            }
        }
    }
}

impl Default for DataStore {
    fn default() -> Self {
        Self::new(EventBus::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ForecastValue;

    fn tp(s: &str) -> TimePoint {
        s.parse().unwrap()
    }

    fn forecast(times: &[(&str, f64)]) -> ForecastData {
        times
            .iter()
            .map(|(t, mw)| ForecastValue {
                target_time: tp(t),
                expected_power_generation_megawatts: Some(*mw),
            })
            .collect()
    }

    #[test]
    fn test_views_loading_before_data() {
        let store = DataStore::default();
        assert!(store.national_chart(tp("2024-06-01T10:00"), false).is_loading());
        assert!(store.deltas(tp("2024-06-01T10:00"), BoundaryMode::Legacy).is_loading());
        assert_eq!(store.bounds(), TimeBounds::unbounded());
    }

    #[test]
    fn test_chart_is_memoized_until_input_changes() {
        let store = DataStore::default();
        store.ingest(SlotUpdate::NationalForecast(forecast(&[(
            "2024-06-01T10:00",
            100.0,
        )])));
        let reference = tp("2024-06-01T10:00");

        let first = store.national_chart(reference, false).ready().unwrap();
        let second = store.national_chart(reference, false).ready().unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        store.ingest(SlotUpdate::NationalPvInDay(Vec::new()));
        let third = store.national_chart(reference, false).ready().unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(*first, *third);
    }

    #[test]
    fn test_bounds_from_forecast() {
        let store = DataStore::default();
        store.ingest(SlotUpdate::NationalForecast(forecast(&[
            ("2024-06-01T11:00", 1.0),
            ("2024-06-01T10:00", 1.0),
            ("2024-06-01T12:30", 1.0),
        ])));

        let bounds = store.bounds();
        assert_eq!(bounds.earliest, Some(tp("2024-06-01T10:00")));
        assert_eq!(bounds.latest, Some(tp("2024-06-01T12:30")));
    }

    #[test]
    fn test_fail_is_local_to_slot() {
        let store = DataStore::default();
        store.ingest(SlotUpdate::NationalForecast(forecast(&[(
            "2024-06-01T10:00",
            100.0,
        )])));
        store.fail(DataSlot::RegionPvLive, "HTTP 500");

        assert!(store.national_chart(tp("2024-06-01T10:00"), false).ready().is_some());
        assert_eq!(
            store.deltas(tp("2024-06-01T10:00"), BoundaryMode::Legacy),
            PanelView::Failed("HTTP 500".to_string())
        );
        assert_eq!(
            store.slot_state(DataSlot::RegionPvLive).error(),
            Some("HTTP 500")
        );
    }

    #[test]
    fn test_regional_chart_from_mix() {
        use crate::analytics::fields;

        let store = DataStore::default();
        assert!(store.regional_chart(tp("2024-06-01T10:15")).is_loading());

        let sample = |t: &str, kw: f64| SeriesSample {
            timestamp: tp(t),
            value: Some(kw),
        };
        store.ingest(SlotUpdate::RegionalMix(RegionalMix {
            region: "ruvnl".to_string(),
            solar_forecast: vec![
                sample("2024-06-01T10:00", 4000.0),
                sample("2024-06-01T10:15", 4500.0),
            ],
            wind_forecast: vec![sample("2024-06-01T10:15", 1500.0)],
            solar_generation: vec![sample("2024-06-01T10:00", 3800.0)],
            wind_generation: Vec::new(),
        }));

        let records = store.regional_chart(tp("2024-06-01T10:15")).ready().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get(fields::SOLAR_FORECAST_PAST), Some(4.0));
        assert_eq!(records[0].get(fields::SOLAR_GENERATION), Some(3.8));
        assert_eq!(records[1].get(fields::WIND_FORECAST_FUTURE), Some(1.5));

        // The national dashboard is untouched
        assert!(store.national_chart(tp("2024-06-01T10:15"), false).is_loading());
    }

    #[test]
    fn test_fail_every_slot() {
        let store = DataStore::default();
        for slot in DataSlot::ALL {
            store.fail(slot, format!("{} down", slot.name()));
        }
        for slot in DataSlot::ALL {
            let expected = format!("{} down", slot.name());
            assert_eq!(store.slot_state(slot).error(), Some(expected.as_str()));
        }
        assert!(matches!(
            store.national_chart(tp("2024-06-01T10:00"), false),
            PanelView::Failed(reason) if reason == "national_forecast down"
        ));
    }
}
