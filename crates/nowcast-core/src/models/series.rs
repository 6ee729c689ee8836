//! Time series models: backend payloads and the normalized sample type

use super::time_point::TimePoint;
use serde::{Deserialize, Serialize};

/// Kilowatts per megawatt
pub const KW_PER_MW: f64 = 1000.0;

/// Megawatts per gigawatt
pub const MW_PER_GW: f64 = 1000.0;

/// One normalized point of any series.
///
/// `value` is `None` when the source carried null: that is "no data",
/// which renderers must keep distinct from zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesSample {
    pub timestamp: TimePoint,
    pub value: Option<f64>,
}

impl SeriesSample {
    pub fn new(timestamp: TimePoint, value: f64) -> Self {
        Self {
            timestamp,
            value: Some(value),
        }
    }

    pub fn missing(timestamp: TimePoint) -> Self {
        Self {
            timestamp,
            value: None,
        }
    }
}

/// Forecast point as served by the backend (`targetTime`, MW)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastValue {
    pub target_time: TimePoint,
    #[serde(default)]
    pub expected_power_generation_megawatts: Option<f64>,
}

impl ForecastValue {
    pub fn to_sample(&self) -> SeriesSample {
        SeriesSample {
            timestamp: self.target_time,
            value: self.expected_power_generation_megawatts,
        }
    }
}

/// PV live actual generation point (`datetimeUtc`, kW)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PvLiveValue {
    pub datetime_utc: TimePoint,
    #[serde(default)]
    pub solar_generation_kw: Option<f64>,
}

impl PvLiveValue {
    /// Sample in kW, the unit the backend reports
    pub fn to_sample(&self) -> SeriesSample {
        SeriesSample {
            timestamp: self.datetime_utc,
            value: self.solar_generation_kw,
        }
    }
}

/// Solar/wind generation point of the regional product (`Time`, `PowerKW`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationValue {
    #[serde(rename = "Time")]
    pub time: TimePoint,
    #[serde(rename = "PowerKW", default)]
    pub power_kw: Option<f64>,
}

impl GenerationValue {
    pub fn to_sample(&self) -> SeriesSample {
        SeriesSample {
            timestamp: self.time,
            value: self.power_kw,
        }
    }
}

/// Envelope of the regional product's generation/forecast responses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationResponse {
    #[serde(default)]
    pub values: Vec<GenerationValue>,
}

pub type ForecastData = Vec<ForecastValue>;
pub type PvLiveData = Vec<PvLiveValue>;

/// Convert a slice of backend values into samples
pub fn forecast_samples(values: &[ForecastValue]) -> Vec<SeriesSample> {
    values.iter().map(ForecastValue::to_sample).collect()
}

/// Convert PV live values into samples (still kW)
pub fn pv_live_samples(values: &[PvLiveValue]) -> Vec<SeriesSample> {
    values.iter().map(PvLiveValue::to_sample).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forecast_value_deserialize_camel_case() {
        let json = r#"[
            {"targetTime": "2024-06-01T10:30:00+00:00", "expectedPowerGenerationMegawatts": 6615.2},
            {"targetTime": "2024-06-01T11:00:00+00:00", "expectedPowerGenerationMegawatts": null}
        ]"#;
        let values: ForecastData = serde_json::from_str(json).unwrap();

        assert_eq!(values.len(), 2);
        assert_eq!(values[0].target_time.to_string(), "2024-06-01T10:30");
        assert_eq!(values[0].expected_power_generation_megawatts, Some(6615.2));
        assert_eq!(values[1].to_sample().value, None);
    }

    #[test]
    fn test_pv_live_missing_value_defaults_to_none() {
        let json = r#"{"datetimeUtc": "2024-06-01T10:00:00Z"}"#;
        let value: PvLiveValue = serde_json::from_str(json).unwrap();
        assert!(value.solar_generation_kw.is_none());
    }

    #[test]
    fn test_generation_response_pascal_fields() {
        let json = r#"{"values": [{"Time": "2024-02-17T02:30:00+00:00", "PowerKW": 1250.5}]}"#;
        let response: GenerationResponse = serde_json::from_str(json).unwrap();
        let sample = response.values[0].to_sample();
        assert_eq!(sample.value, Some(1250.5));
        assert_eq!(sample.timestamp.to_string(), "2024-02-17T02:30");
    }
}
