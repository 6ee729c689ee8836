//! HTTP client for the forecasting backend
//!
//! Thin wrapper over `reqwest`: one method per endpoint the dashboard
//! consumes, bearer-token auth, JSON decode into the wire models.

use crate::config::DashboardConfig;
use crate::error::CoreError;
use crate::models::{
    ForecastData, GenerationResponse, GspAllForecasts, GspPvLive, PvLiveData, RegionId,
};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Default backend prefix
pub const DEFAULT_API_BASE_URL: &str = "https://api.nowcasting.io/v0";

/// Default prefix of the solar/wind regional backend
pub const DEFAULT_REGIONAL_API_URL: &str = "https://api-dev.quartz.energy";

/// Environment variable holding the bearer token
pub const TOKEN_ENV: &str = "NOWCAST_BEARER_TOKEN";

/// PV live estimate regime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PvRegime {
    /// Initial intra-day estimate
    InDay,
    /// Updated estimate published the next day
    DayAfter,
}

impl PvRegime {
    pub fn as_str(&self) -> &'static str {
        match self {
            PvRegime::InDay => "in-day",
            PvRegime::DayAfter => "day-after",
        }
    }
}

/// Generation source of the regional product
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnergySource {
    Solar,
    Wind,
}

impl EnergySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnergySource::Solar => "solar",
            EnergySource::Wind => "wind",
        }
    }
}

/// Backend client; cheap to clone
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, CoreError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("nowcast/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| CoreError::Http {
                url: base_url.clone(),
                source,
            })?;

        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    pub fn from_config(config: &DashboardConfig) -> Result<Self, CoreError> {
        Self::new(
            config.api_base_url.clone(),
            config.api_token.clone(),
            config.request_timeout(),
        )
    }

    /// Client for the solar/wind regional backend, sharing token and timeout
    pub fn regional_from_config(config: &DashboardConfig) -> Result<Self, CoreError> {
        Self::new(
            config.regional_api_url.clone(),
            config.api_token.clone(),
            config.request_timeout(),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Absolute URL for an endpoint path (`/solar/GB/...`)
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, CoreError> {
        let url = self.url(path);
        tracing::debug!(%url, "GET");

        let mut request = self.http.get(&url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|source| CoreError::Http {
            url: url.clone(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%url, status = status.as_u16(), "Backend returned error status");
            return Err(CoreError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|source| CoreError::Http {
            url: url.clone(),
            source,
        })?;

        decode(&url, &body)
    }

    /// National forecast, future values only
    pub async fn national_forecast(&self) -> Result<ForecastData, CoreError> {
        self.get_json("/solar/GB/national/forecast?historic=false&only_forecast_values=true")
            .await
    }

    /// National forecast made 4 hours before each target time
    pub async fn national_forecast_4h(&self) -> Result<ForecastData, CoreError> {
        self.get_json(
            "/solar/GB/national/forecast?forecast_horizon_minutes=240&historic=true&only_forecast_values=true",
        )
        .await
    }

    /// National PV live actuals (kW, newest first)
    pub async fn national_pv_live(&self, regime: PvRegime) -> Result<PvLiveData, CoreError> {
        self.get_json(&format!("/solar/GB/national/pvlive?regime={}", regime.as_str()))
            .await
    }

    /// Forecasts for every region
    pub async fn gsp_forecasts_all(&self) -> Result<GspAllForecasts, CoreError> {
        self.get_json("/solar/GB/gsp/forecast/all/?historic=true").await
    }

    /// PV live actuals for every region, intra-day regime
    pub async fn gsp_pv_live_all(&self) -> Result<Vec<GspPvLive>, CoreError> {
        self.get_json("/solar/GB/gsp/pvlive/all?regime=in-day").await
    }

    pub async fn gsp_pv_live(
        &self,
        region_id: RegionId,
        regime: PvRegime,
    ) -> Result<PvLiveData, CoreError> {
        self.get_json(&format!(
            "/solar/GB/gsp/pvlive/{}?regime={}",
            region_id,
            regime.as_str()
        ))
        .await
    }

    pub async fn gsp_forecast_4h(&self, region_id: RegionId) -> Result<ForecastData, CoreError> {
        self.get_json(&format!(
            "/solar/GB/gsp/forecast/{}?forecast_horizon_minutes=240&historic=true&only_forecast_values=true",
            region_id
        ))
        .await
    }

    /// Historic generation of one source in a regional-product region (kW)
    pub async fn regional_generation(
        &self,
        source: EnergySource,
        region: &str,
    ) -> Result<GenerationResponse, CoreError> {
        self.get_json(&format!("/{}/{}/generation", source.as_str(), region))
            .await
    }

    /// Forecast of one source in a regional-product region (kW)
    pub async fn regional_forecast(
        &self,
        source: EnergySource,
        region: &str,
    ) -> Result<GenerationResponse, CoreError> {
        self.get_json(&format!("/{}/{}/forecast", source.as_str(), region))
            .await
    }
}

/// Decode a response body, keeping the URL for the error message
pub fn decode<T: DeserializeOwned>(url: &str, body: &str) -> Result<T, CoreError> {
    serde_json::from_str(body).map_err(|source| CoreError::Decode {
        url: url.to_string(),
        message: source.to_string(),
        source,
    })
}
