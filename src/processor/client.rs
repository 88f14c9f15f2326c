//! Race API access.
//!
//! The processor only depends on the [`RaceApi`] trait; [`HttpRaceApi`] is
//! the implementation used against the live JSON API.

use crate::config::RaceConfig;
use crate::constants::{
    current_stage_endpoint, roster_endpoint, stage_detail_endpoint, stages_endpoint,
};
use crate::error::Result;
use crate::models::{RawRecord, StageDescriptor};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// Source of roster, stage list and per-stage classification data
#[allow(async_fn_in_trait)]
pub trait RaceApi {
    /// Raw rider records of the race roster
    async fn fetch_roster(&self) -> Result<Vec<RawRecord>>;

    /// All stages of the race, in running order
    async fn fetch_stages(&self) -> Result<Vec<StageDescriptor>>;

    /// The stage the API reports as current, if it reports one
    async fn fetch_current_stage(&self) -> Result<Option<StageDescriptor>>;

    /// Raw per-rider classification records after stage `stage_id`
    async fn fetch_stage_detail(&self, stage_id: u32) -> Result<Vec<RawRecord>>;
}

/// JSON-over-HTTP race API client
#[derive(Debug, Clone)]
pub struct HttpRaceApi {
    http: reqwest::Client,
    base_url: String,
    race_id: u32,
}

impl HttpRaceApi {
    pub fn new(config: &RaceConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            race_id: config.race_id,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let url = self.url(endpoint);
        debug!("GET {}", url);

        let response = self.http.get(&url).send().await?.error_for_status()?;
        Ok(response.json::<T>().await?)
    }
}

impl RaceApi for HttpRaceApi {
    async fn fetch_roster(&self) -> Result<Vec<RawRecord>> {
        self.get_json(&roster_endpoint(self.race_id)).await
    }

    async fn fetch_stages(&self) -> Result<Vec<StageDescriptor>> {
        self.get_json(&stages_endpoint(self.race_id)).await
    }

    async fn fetch_current_stage(&self) -> Result<Option<StageDescriptor>> {
        let url = self.url(&current_stage_endpoint(self.race_id));
        debug!("GET {}", url);

        let response = self.http.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            warn!("Race {} reports no current stage", self.race_id);
            return Ok(None);
        }

        let response = response.error_for_status()?;
        Ok(response.json::<Option<StageDescriptor>>().await?)
    }

    async fn fetch_stage_detail(&self, stage_id: u32) -> Result<Vec<RawRecord>> {
        self.get_json(&stage_detail_endpoint(stage_id)).await
    }
}
