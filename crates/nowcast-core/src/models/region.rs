//! Region (GSP) models
//!
//! The backend serves per-region forecasts and PV live yields as separate
//! arrays that are not guaranteed to share an ordering, so everything is
//! keyed by `region_id` once it leaves the wire types.

use super::series::{ForecastValue, PvLiveValue, SeriesSample, KW_PER_MW};
use serde::{Deserialize, Serialize};

pub type RegionId = u32;

/// Static metadata for a region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionMeta {
    pub region_id: RegionId,
    pub region_name: String,
    pub installed_capacity_mw: f64,
}

/// Actual generation for one region, values in MW
#[derive(Debug, Clone, PartialEq)]
pub struct RegionActual {
    pub meta: RegionMeta,
    pub samples: Vec<SeriesSample>,
}

/// Forecast for one region, values in MW
#[derive(Debug, Clone, PartialEq)]
pub struct RegionForecast {
    pub region_id: RegionId,
    pub samples: Vec<SeriesSample>,
}

// ===================
// Wire types
// ===================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GspLocation {
    pub gsp_id: RegionId,
    #[serde(default)]
    pub region_name: Option<String>,
    #[serde(default)]
    pub installed_capacity_mw: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GspForecast {
    pub location: GspLocation,
    #[serde(default)]
    pub forecast_values: Vec<ForecastValue>,
}

impl GspForecast {
    pub fn to_region_forecast(&self) -> RegionForecast {
        RegionForecast {
            region_id: self.location.gsp_id,
            samples: self
                .forecast_values
                .iter()
                .map(ForecastValue::to_sample)
                .collect(),
        }
    }
}

/// Response of `gsp/forecast/all`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GspAllForecasts {
    #[serde(default)]
    pub forecasts: Vec<GspForecast>,
}

impl GspAllForecasts {
    pub fn region_forecasts(&self) -> Vec<RegionForecast> {
        self.forecasts
            .iter()
            .map(GspForecast::to_region_forecast)
            .collect()
    }

    pub fn find(&self, region_id: RegionId) -> Option<&GspForecast> {
        self.forecasts
            .iter()
            .find(|f| f.location.gsp_id == region_id)
    }
}

/// One entry of `gsp/pvlive/all`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GspPvLive {
    pub gsp_id: RegionId,
    #[serde(default)]
    pub region_name: String,
    #[serde(default)]
    pub installed_capacity_mw: f64,
    #[serde(default)]
    pub gsp_yields: Vec<PvLiveValue>,
}

impl GspPvLive {
    pub fn meta(&self) -> RegionMeta {
        RegionMeta {
            region_id: self.gsp_id,
            region_name: self.region_name.clone(),
            installed_capacity_mw: self.installed_capacity_mw,
        }
    }

    /// Convert to a region actual with yields in MW
    pub fn to_region_actual(&self) -> RegionActual {
        RegionActual {
            meta: self.meta(),
            samples: self
                .gsp_yields
                .iter()
                .map(|y| SeriesSample {
                    timestamp: y.datetime_utc,
                    value: y.solar_generation_kw.map(|kw| kw / KW_PER_MW),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gsp_pv_live_converts_kw_to_mw() {
        let json = r#"{
            "gspId": 12,
            "regionName": "Bradford West",
            "installedCapacityMw": 25.0,
            "gspYields": [{"datetimeUtc": "2024-06-01T10:30:00+00:00", "solarGenerationKw": 16000}]
        }"#;
        let pv: GspPvLive = serde_json::from_str(json).unwrap();
        let actual = pv.to_region_actual();

        assert_eq!(actual.meta.region_id, 12);
        assert_eq!(actual.meta.region_name, "Bradford West");
        assert_eq!(actual.samples[0].value, Some(16.0));
    }

    #[test]
    fn test_all_forecasts_find_by_id() {
        let json = r#"{"forecasts": [
            {"location": {"gspId": 1}, "forecastValues": []},
            {"location": {"gspId": 7, "regionName": "Axminster"}, "forecastValues": [
                {"targetTime": "2024-06-01T10:30:00+00:00", "expectedPowerGenerationMegawatts": 4.5}
            ]}
        ]}"#;
        let all: GspAllForecasts = serde_json::from_str(json).unwrap();

        let found = all.find(7).unwrap();
        assert_eq!(found.location.region_name.as_deref(), Some("Axminster"));
        assert_eq!(found.to_region_forecast().samples[0].value, Some(4.5));
        assert!(all.find(99).is_none());
    }
}
