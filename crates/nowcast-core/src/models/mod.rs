//! Data models for nowcast

pub mod region;
pub mod series;
pub mod time_point;

pub use region::{
    GspAllForecasts, GspForecast, GspLocation, GspPvLive, RegionActual, RegionForecast, RegionId,
    RegionMeta,
};
pub use series::{
    forecast_samples, pv_live_samples, ForecastData, ForecastValue, GenerationResponse,
    GenerationValue, PvLiveData, PvLiveValue, SeriesSample, KW_PER_MW, MW_PER_GW,
};
pub use time_point::{TimePoint, TimePointParseError};
