//! Derived views over fetched series
//!
//! Everything here is a pure function of its inputs plus a reference time:
//! the chart merge, per-region deltas and buckets, and the national header.
//! Memoization lives in the store, not here.

use crate::models::{RegionActual, RegionForecast, TimePoint};

pub mod delta;
pub mod header;
pub mod merge;

#[cfg(test)]
mod tests;

pub use delta::{
    bucket_counts, bucket_defs, classify, compute_deltas, delta_columns, BoundaryMode, BucketDef,
    BucketKey, DeltaBucket, DeltaColumns, RegionDelta, RegionDeltas,
};
pub use header::HeaderSummary;
pub use merge::{
    fields, max_value, merge, merge_generation_mix, national_chart_inputs, region_chart_inputs,
    sort_records, FieldMapping, GenerationMix, MergedRecord, SeriesInput,
};

/// Deltas at one reference time together with their bucket counts
#[derive(Debug, Clone, PartialEq)]
pub struct DeltaSummary {
    pub reference: TimePoint,
    pub mode: BoundaryMode,
    pub deltas: RegionDeltas,
    pub buckets: Vec<DeltaBucket>,
}

impl DeltaSummary {
    pub fn compute(
        actuals: &[RegionActual],
        forecasts: &[RegionForecast],
        reference: TimePoint,
        mode: BoundaryMode,
    ) -> Self {
        let deltas = compute_deltas(actuals, forecasts, reference);
        let buckets = bucket_counts(&deltas, mode);

        tracing::debug!(
            regions = deltas.len(),
            reference = %reference,
            ?mode,
            "Computed region deltas"
        );

        Self {
            reference,
            mode,
            deltas,
            buckets,
        }
    }

    /// Sum of all region deltas (MW)
    pub fn total_delta_mw(&self) -> f64 {
        self.deltas.iter().map(|d| d.delta).sum()
    }

    /// Regions that landed in no bucket (legacy gaps, or beyond ±200 MW)
    pub fn unbucketed(&self) -> usize {
        self.deltas.len() - self.buckets.iter().map(|b| b.count).sum::<usize>()
    }
}
