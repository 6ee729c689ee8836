//! National header figures (GW)

use crate::models::{ForecastValue, PvLiveValue, TimePoint, KW_PER_MW, MW_PER_GW};
use serde::Serialize;

/// Figures shown above the national chart
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderSummary {
    /// Forecast for "now" (floored to the step)
    pub next_forecast_time: TimePoint,
    pub next_forecast_gw: f64,
    /// Time of the most recent PV live value, if any
    pub actual_time: Option<TimePoint>,
    pub actual_gw: f64,
    /// Forecast for `actual_time`
    pub forecast_at_actual_gw: f64,
}

impl HeaderSummary {
    /// Compute the header.
    ///
    /// `pv_live` is newest-first as served by the backend. Missing values
    /// count as 0, matching what the header shows while data trickles in.
    pub fn compute(forecast: &[ForecastValue], pv_live: &[PvLiveValue], now: TimePoint) -> Self {
        let forecast_gw_at = |time: TimePoint| {
            forecast
                .iter()
                .find(|f| f.target_time == time)
                .and_then(|f| f.expected_power_generation_megawatts)
                .unwrap_or(0.0)
                / MW_PER_GW
        };

        let latest = pv_live.first();
        let actual_time = latest.map(|pv| pv.datetime_utc);
        let actual_gw = latest
            .and_then(|pv| pv.solar_generation_kw)
            .map(|kw| kw / KW_PER_MW / MW_PER_GW)
            .unwrap_or(0.0);

        Self {
            next_forecast_time: now,
            next_forecast_gw: forecast_gw_at(now),
            actual_time,
            actual_gw,
            forecast_at_actual_gw: actual_time.map(forecast_gw_at).unwrap_or(0.0),
        }
    }

    /// actual - forecast at the actual's time (GW)
    pub fn delta_gw(&self) -> f64 {
        self.actual_gw - self.forecast_at_actual_gw
    }
}
