//! Time series merge for charting
//!
//! Folds several timestamp-indexed series into one record per distinct
//! minute. Forecast series are split into a "past" and a "future" field
//! relative to a reference time so the chart can draw them differently.

use crate::models::{SeriesSample, TimePoint, KW_PER_MW};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Field names used as chart data keys
pub mod fields {
    pub const GENERATION: &str = "GENERATION";
    pub const GENERATION_UPDATED: &str = "GENERATION_UPDATED";
    pub const FORECAST: &str = "FORECAST";
    pub const PAST_FORECAST: &str = "PAST_FORECAST";
    pub const FOUR_HOUR_FORECAST: &str = "4HR_FORECAST";
    pub const FOUR_HOUR_PAST_FORECAST: &str = "4HR_PAST_FORECAST";

    pub const SOLAR_GENERATION: &str = "solar_generation";
    pub const WIND_GENERATION: &str = "wind_generation";
    pub const SOLAR_FORECAST_PAST: &str = "solar_forecast_past";
    pub const SOLAR_FORECAST_FUTURE: &str = "solar_forecast_future";
    pub const WIND_FORECAST_PAST: &str = "wind_forecast_past";
    pub const WIND_FORECAST_FUTURE: &str = "wind_forecast_future";

    /// Every national chart line, in legend order
    pub const NATIONAL_LINES: [&str; 6] = [
        GENERATION,
        GENERATION_UPDATED,
        FORECAST,
        PAST_FORECAST,
        FOUR_HOUR_FORECAST,
        FOUR_HOUR_PAST_FORECAST,
    ];

    /// Regional solar/wind chart lines
    pub const GENERATION_MIX_LINES: [&str; 6] = [
        SOLAR_GENERATION,
        SOLAR_FORECAST_PAST,
        SOLAR_FORECAST_FUTURE,
        WIND_GENERATION,
        WIND_FORECAST_PAST,
        WIND_FORECAST_FUTURE,
    ];
}

/// How the samples of one series map onto record fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldMapping {
    /// Actual generation: always the same field
    Fixed(String),
    /// Forecast: `future` when at/after the reference time, `past` otherwise
    Split { past: String, future: String },
}

impl FieldMapping {
    pub fn fixed(field: impl Into<String>) -> Self {
        Self::Fixed(field.into())
    }

    pub fn split(past: impl Into<String>, future: impl Into<String>) -> Self {
        Self::Split {
            past: past.into(),
            future: future.into(),
        }
    }

    /// Field a sample at `timestamp` lands in
    pub fn field_for(&self, timestamp: TimePoint, reference: TimePoint) -> &str {
        match self {
            FieldMapping::Fixed(field) => field,
            FieldMapping::Split { past, future } => {
                if timestamp >= reference {
                    future
                } else {
                    past
                }
            }
        }
    }

    pub fn is_forecast(&self) -> bool {
        matches!(self, FieldMapping::Split { .. })
    }

    /// All field names this mapping can produce
    pub fn field_names(&self) -> Vec<&str> {
        match self {
            FieldMapping::Fixed(field) => vec![field.as_str()],
            FieldMapping::Split { past, future } => vec![past.as_str(), future.as_str()],
        }
    }
}

/// One named input series of a merge
#[derive(Debug, Clone)]
pub struct SeriesInput<'a> {
    pub name: String,
    pub mapping: FieldMapping,
    /// Multiplier applied before storing (e.g. 0.001 for kW -> MW)
    pub scale: f64,
    /// Round to the nearest whole unit after scaling
    pub round: bool,
    pub samples: &'a [SeriesSample],
}

impl<'a> SeriesInput<'a> {
    /// Actual-generation series writing into `field`
    pub fn actual(
        name: impl Into<String>,
        field: impl Into<String>,
        samples: &'a [SeriesSample],
    ) -> Self {
        Self {
            name: name.into(),
            mapping: FieldMapping::fixed(field),
            scale: 1.0,
            round: true,
            samples,
        }
    }

    /// Forecast series split into `past` / `future` fields
    pub fn forecast(
        name: impl Into<String>,
        past: impl Into<String>,
        future: impl Into<String>,
        samples: &'a [SeriesSample],
    ) -> Self {
        Self {
            name: name.into(),
            mapping: FieldMapping::split(past, future),
            scale: 1.0,
            round: true,
            samples,
        }
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn without_rounding(mut self) -> Self {
        self.round = false;
        self
    }

    /// Scaled (and optionally rounded) value; `None` for non-finite input
    fn convert(&self, raw: f64) -> Option<f64> {
        let scaled = raw * self.scale;
        if !scaled.is_finite() {
            return None;
        }
        Some(if self.round { scaled.round() } else { scaled })
    }
}

/// One chart row: a minute and whatever series had data at that minute
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedRecord {
    pub formatted_time: TimePoint,
    #[serde(flatten)]
    pub fields: BTreeMap<String, f64>,
}

impl MergedRecord {
    pub fn new(formatted_time: TimePoint) -> Self {
        Self {
            formatted_time,
            fields: BTreeMap::new(),
        }
    }

    pub fn get(&self, field: &str) -> Option<f64> {
        self.fields.get(field).copied()
    }

    pub fn has_any(&self, names: &[&str]) -> bool {
        names.iter().any(|n| self.fields.contains_key(*n))
    }
}

/// Merge input series into one record per distinct timestamp.
///
/// Records come out in first-seen order; call [`sort_records`] before
/// plotting. A sample with a missing value still creates its record but
/// leaves the field absent.
pub fn merge(inputs: &[SeriesInput<'_>], reference: TimePoint) -> Vec<MergedRecord> {
    let mut index: HashMap<TimePoint, usize> = HashMap::new();
    let mut records: Vec<MergedRecord> = Vec::new();

    for input in inputs {
        for sample in input.samples {
            let slot = *index.entry(sample.timestamp).or_insert_with(|| {
                records.push(MergedRecord::new(sample.timestamp));
                records.len() - 1
            });

            let Some(value) = sample.value.and_then(|raw| input.convert(raw)) else {
                continue;
            };

            let field = input.mapping.field_for(sample.timestamp, reference);
            records[slot].fields.insert(field.to_string(), value);
        }
    }

    tracing::trace!(
        inputs = inputs.len(),
        records = records.len(),
        reference = %reference,
        "Merged chart series"
    );

    records
}

/// Sort records chronologically
pub fn sort_records(records: &mut [MergedRecord]) {
    records.sort_by_key(|r| r.formatted_time);
}

/// Largest value across the given fields (y-axis bound)
pub fn max_value(records: &[MergedRecord], field_names: &[&str]) -> Option<f64> {
    records
        .iter()
        .flat_map(|r| field_names.iter().filter_map(|f| r.get(f)))
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
}

/// Inputs for the national chart.
///
/// PV live series arrive in kW and are converted to MW; forecasts are MW.
/// The 4-hour series is optional: when the view is off it is simply absent.
pub fn national_chart_inputs<'a>(
    forecast: &'a [SeriesSample],
    four_hour: Option<&'a [SeriesSample]>,
    pv_in_day: &'a [SeriesSample],
    pv_day_after: &'a [SeriesSample],
) -> Vec<SeriesInput<'a>> {
    chart_inputs(forecast, four_hour, pv_in_day, pv_day_after, 1.0 / KW_PER_MW)
}

/// Inputs for a single region's chart; region actuals are already MW
pub fn region_chart_inputs<'a>(
    forecast: &'a [SeriesSample],
    four_hour: Option<&'a [SeriesSample]>,
    pv_in_day: &'a [SeriesSample],
    pv_day_after: &'a [SeriesSample],
) -> Vec<SeriesInput<'a>> {
    chart_inputs(forecast, four_hour, pv_in_day, pv_day_after, 1.0)
}

fn chart_inputs<'a>(
    forecast: &'a [SeriesSample],
    four_hour: Option<&'a [SeriesSample]>,
    pv_in_day: &'a [SeriesSample],
    pv_day_after: &'a [SeriesSample],
    actual_scale: f64,
) -> Vec<SeriesInput<'a>> {
    let mut inputs = vec![
        SeriesInput::actual("pv_live_day_after", fields::GENERATION_UPDATED, pv_day_after)
            .with_scale(actual_scale),
        SeriesInput::actual("pv_live_in_day", fields::GENERATION, pv_in_day)
            .with_scale(actual_scale),
        SeriesInput::forecast("forecast", fields::PAST_FORECAST, fields::FORECAST, forecast),
    ];

    if let Some(four_hour) = four_hour {
        inputs.push(SeriesInput::forecast(
            "forecast_4h",
            fields::FOUR_HOUR_PAST_FORECAST,
            fields::FOUR_HOUR_FORECAST,
            four_hour,
        ));
    }

    inputs
}

/// Samples of the regional solar/wind product, all in kW
#[derive(Debug, Clone, Copy, Default)]
pub struct GenerationMix<'a> {
    pub solar_forecast: &'a [SeriesSample],
    pub wind_forecast: &'a [SeriesSample],
    pub solar_generation: &'a [SeriesSample],
    pub wind_generation: &'a [SeriesSample],
}

/// Merge the regional solar/wind product.
///
/// Forecasts are split past/future as usual. Actual generation is only
/// attached to minutes that already carry a forecast value, so the chart
/// never extends beyond the forecast window. Values stay fractional MW and
/// the result is sorted.
pub fn merge_generation_mix(mix: &GenerationMix<'_>, reference: TimePoint) -> Vec<MergedRecord> {
    let forecasts = [
        SeriesInput::forecast(
            "wind_forecast",
            fields::WIND_FORECAST_PAST,
            fields::WIND_FORECAST_FUTURE,
            mix.wind_forecast,
        )
        .with_scale(1.0 / KW_PER_MW)
        .without_rounding(),
        SeriesInput::forecast(
            "solar_forecast",
            fields::SOLAR_FORECAST_PAST,
            fields::SOLAR_FORECAST_FUTURE,
            mix.solar_forecast,
        )
        .with_scale(1.0 / KW_PER_MW)
        .without_rounding(),
    ];

    let mut records: Vec<MergedRecord> = merge(&forecasts, reference)
        .into_iter()
        .filter(|r| !r.fields.is_empty())
        .collect();

    let forecast_fields = [
        fields::SOLAR_FORECAST_PAST,
        fields::SOLAR_FORECAST_FUTURE,
        fields::WIND_FORECAST_PAST,
        fields::WIND_FORECAST_FUTURE,
    ];
    let index: HashMap<TimePoint, usize> = records
        .iter()
        .enumerate()
        .map(|(i, r)| (r.formatted_time, i))
        .collect();

    for (field, samples) in [
        (fields::SOLAR_GENERATION, mix.solar_generation),
        (fields::WIND_GENERATION, mix.wind_generation),
    ] {
        for sample in samples {
            let (Some(&slot), Some(kw)) = (index.get(&sample.timestamp), sample.value) else {
                continue;
            };
            if records[slot].has_any(&forecast_fields) && kw.is_finite() {
                records[slot].fields.insert(field.to_string(), kw / KW_PER_MW);
            }
        }
    }

    sort_records(&mut records);
    records
}
