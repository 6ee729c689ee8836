//! Forecast-vs-actual deltas per region
//!
//! For a reference time, pairs each region's actual generation with its
//! forecast, derives delta / percentage / normalized delta, and groups the
//! regions into nine fixed delta buckets for the summary panel.

use crate::models::{RegionActual, RegionForecast, RegionId, RegionMeta, SeriesSample, TimePoint};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::ops::{Bound, RangeBounds};

/// Delta of one region at the reference time
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionDelta {
    pub region_id: RegionId,
    pub region_name: String,
    pub region_capacity_mw: f64,
    pub actual_value_mw: f64,
    pub forecast_value_mw: f64,
    /// actual - forecast (MW)
    pub delta: f64,
    /// actual / forecast * 100; NaN or infinite when the forecast is 0
    pub delta_percentage: f64,
    /// delta / capacity; 0 when capacity is unknown
    pub delta_normalized: f64,
}

impl RegionDelta {
    pub fn from_values(meta: &RegionMeta, actual_value_mw: f64, forecast_value_mw: f64) -> Self {
        let delta = actual_value_mw - forecast_value_mw;
        let delta_percentage = actual_value_mw / forecast_value_mw * 100.0;

        let capacity = meta.installed_capacity_mw;
        let delta_normalized = if capacity == 0.0 || !capacity.is_finite() {
            0.0
        } else {
            let normalized = delta / capacity;
            if normalized.is_finite() {
                normalized
            } else {
                0.0
            }
        };

        Self {
            region_id: meta.region_id,
            region_name: meta.region_name.clone(),
            region_capacity_mw: capacity,
            actual_value_mw,
            forecast_value_mw,
            delta,
            delta_percentage,
            delta_normalized,
        }
    }

    /// |normalized delta| as a whole percentage, for progress bars
    pub fn normalized_percentage(&self) -> f64 {
        (self.delta_normalized * 100.0).abs().round()
    }

    /// Percentage if it is displayable
    pub fn finite_percentage(&self) -> Option<f64> {
        self.delta_percentage
            .is_finite()
            .then_some(self.delta_percentage)
    }
}

/// Region deltas keyed by region id, iterated in input order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionDeltas {
    entries: Vec<RegionDelta>,
    index: HashMap<RegionId, usize>,
}

impl RegionDeltas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace; a replaced region keeps its original position
    pub fn insert(&mut self, delta: RegionDelta) {
        match self.index.get(&delta.region_id) {
            Some(&slot) => self.entries[slot] = delta,
            None => {
                self.index.insert(delta.region_id, self.entries.len());
                self.entries.push(delta);
            }
        }
    }

    pub fn get(&self, region_id: RegionId) -> Option<&RegionDelta> {
        self.index.get(&region_id).map(|&slot| &self.entries[slot])
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegionDelta> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[RegionDelta] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn value_at(samples: &[SeriesSample], reference: TimePoint) -> Option<f64> {
    samples
        .iter()
        .find(|s| s.timestamp == reference)
        .and_then(|s| s.value)
}

/// Compute one delta per region with actual data.
///
/// Forecasts are looked up by region id, never by array position. A region
/// without a forecast (or without a value at `reference`) is compared
/// against 0, as is a missing actual value.
pub fn compute_deltas(
    actuals: &[RegionActual],
    forecasts: &[RegionForecast],
    reference: TimePoint,
) -> RegionDeltas {
    let by_region: HashMap<RegionId, &RegionForecast> =
        forecasts.iter().map(|f| (f.region_id, f)).collect();

    let mut deltas = RegionDeltas::new();
    let mut without_forecast = 0usize;

    for actual in actuals {
        let actual_mw = value_at(&actual.samples, reference).unwrap_or(0.0);
        let forecast_mw = match by_region.get(&actual.meta.region_id) {
            Some(forecast) => value_at(&forecast.samples, reference).unwrap_or(0.0),
            None => {
                without_forecast += 1;
                0.0
            }
        };

        deltas.insert(RegionDelta::from_values(&actual.meta, actual_mw, forecast_mw));
    }

    if without_forecast > 0 {
        tracing::debug!(
            without_forecast,
            reference = %reference,
            "Regions without forecast compared against 0"
        );
    }

    deltas
}

// ============================================================================
// Buckets
// ============================================================================

/// Which boundary rules the buckets use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryMode {
    /// Historical ranges: 2, 20, 40, 60 and anything beyond ±200 fall in no bucket
    #[default]
    Legacy,
    /// Gap-free ranges covering every finite delta exactly once
    Contiguous,
}

/// Bucket identifier, -4 (most negative) ..= 4 (most positive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BucketKey(i8);

impl BucketKey {
    pub const CENTER: BucketKey = BucketKey(0);

    pub const ALL: [BucketKey; 9] = [
        BucketKey(-4),
        BucketKey(-3),
        BucketKey(-2),
        BucketKey(-1),
        BucketKey(0),
        BucketKey(1),
        BucketKey(2),
        BucketKey(3),
        BucketKey(4),
    ];

    pub fn new(value: i8) -> Option<Self> {
        (-4..=4).contains(&value).then_some(Self(value))
    }

    pub fn value(self) -> i8 {
        self.0
    }

    /// Position 0..9 from most negative to most positive
    pub fn position(self) -> usize {
        (self.0 + 4) as usize
    }

    pub fn from_position(position: usize) -> Option<Self> {
        Self::ALL.get(position).copied()
    }

    pub fn all() -> BTreeSet<BucketKey> {
        Self::ALL.into_iter().collect()
    }
}

/// Static definition of one bucket
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketDef {
    pub key: BucketKey,
    pub label: &'static str,
    /// Hex display color (diverging palette, red = under-forecast)
    pub color: &'static str,
    pub lower: Bound<f64>,
    pub upper: Bound<f64>,
}

impl BucketDef {
    pub fn contains(&self, delta: f64) -> bool {
        (self.lower, self.upper).contains(&delta)
    }
}

const LABELS: [&str; 9] = ["-80", "-60", "-40", "-20", "+/-", "+20", "+40", "+60", "+80"];

const COLORS: [&str; 9] = [
    "#B20000", "#FF0000", "#FD5F00", "#F59E0B", "#444444", "#7FB3D5", "#4A90E2", "#1F5FB4",
    "#0A2E6B",
];

/// The nine bucket definitions for a boundary mode
pub fn bucket_defs(mode: BoundaryMode) -> [BucketDef; 9] {
    use Bound::{Excluded, Included, Unbounded};

    let bounds: [(Bound<f64>, Bound<f64>); 9] = match mode {
        BoundaryMode::Legacy => [
            (Excluded(-200.0), Excluded(-60.0)),
            (Included(-60.0), Excluded(-40.0)),
            (Included(-40.0), Excluded(-20.0)),
            (Included(-20.0), Excluded(-1.0)),
            (Included(-1.0), Excluded(2.0)),
            (Excluded(2.0), Excluded(20.0)),
            (Excluded(20.0), Excluded(40.0)),
            (Excluded(40.0), Excluded(60.0)),
            (Excluded(60.0), Included(200.0)),
        ],
        BoundaryMode::Contiguous => [
            (Unbounded, Excluded(-60.0)),
            (Included(-60.0), Excluded(-40.0)),
            (Included(-40.0), Excluded(-20.0)),
            (Included(-20.0), Excluded(-1.0)),
            (Included(-1.0), Included(2.0)),
            (Excluded(2.0), Included(20.0)),
            (Excluded(20.0), Included(40.0)),
            (Excluded(40.0), Included(60.0)),
            (Excluded(60.0), Unbounded),
        ],
    };

    std::array::from_fn(|i| BucketDef {
        key: BucketKey::ALL[i],
        label: LABELS[i],
        color: COLORS[i],
        lower: bounds[i].0,
        upper: bounds[i].1,
    })
}

/// Bucket of a delta, if any range holds it
pub fn classify(delta: f64, mode: BoundaryMode) -> Option<BucketKey> {
    bucket_defs(mode)
        .iter()
        .find(|def| def.contains(delta))
        .map(|def| def.key)
}

/// A bucket with the number of regions falling in it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeltaBucket {
    pub key: BucketKey,
    pub label: &'static str,
    pub color: &'static str,
    pub count: usize,
}

/// Count regions per bucket, most negative bucket first
pub fn bucket_counts(deltas: &RegionDeltas, mode: BoundaryMode) -> Vec<DeltaBucket> {
    bucket_defs(mode)
        .iter()
        .map(|def| DeltaBucket {
            key: def.key,
            label: def.label,
            color: def.color,
            count: deltas.iter().filter(|d| def.contains(d.delta)).count(),
        })
        .collect()
}

/// Regions split for the two display columns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeltaColumns<'a> {
    /// delta < 0, most negative first
    pub negative: Vec<&'a RegionDelta>,
    /// delta > 0, most positive first
    pub positive: Vec<&'a RegionDelta>,
}

/// Build the display columns, keeping only regions in a selected bucket
pub fn delta_columns<'a>(
    deltas: &'a RegionDeltas,
    selected: &BTreeSet<BucketKey>,
    mode: BoundaryMode,
) -> DeltaColumns<'a> {
    let visible = |d: &&RegionDelta| {
        classify(d.delta, mode)
            .map(|key| selected.contains(&key))
            .unwrap_or(false)
    };

    let mut negative: Vec<&RegionDelta> = deltas
        .iter()
        .filter(|d| d.delta < 0.0)
        .filter(visible)
        .collect();
    let mut positive: Vec<&RegionDelta> = deltas
        .iter()
        .filter(|d| d.delta > 0.0)
        .filter(visible)
        .collect();

    negative.sort_by(|a, b| a.delta.total_cmp(&b.delta));
    positive.sort_by(|a, b| b.delta.total_cmp(&a.delta));

    DeltaColumns { negative, positive }
}
