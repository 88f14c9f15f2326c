//! Integration tests for the processor module
//!
//! Runs the complete stage loop against an in-memory race API.


use crate::config::RaceConfig;
use crate::error::{RaceError, Result};
use crate::models::{RawRecord, StageDescriptor};
use crate::processor::client::RaceApi;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

/// Race API serving fixed data and recording which stages were fetched
#[derive(Debug, Default)]
pub struct MockRaceApi {
    pub roster: Vec<RawRecord>,
    pub stages: Vec<StageDescriptor>,
    pub current: Option<StageDescriptor>,
    pub details: HashMap<u32, Vec<RawRecord>>,
    pub fetched: Mutex<Vec<u32>>,
}

impl MockRaceApi {
    pub fn new(stages: Vec<StageDescriptor>) -> Self {
        Self {
            stages,
            ..Default::default()
        }
    }

    pub fn with_detail(mut self, stage_id: u32, records: Vec<RawRecord>) -> Self {
        self.details.insert(stage_id, records);
        self
    }

    pub fn with_roster(mut self, roster: Vec<RawRecord>) -> Self {
        self.roster = roster;
        self
    }

    pub fn with_current(mut self, current: StageDescriptor) -> Self {
        self.current = Some(current);
        self
    }

    pub fn fetched(&self) -> Vec<u32> {
        self.fetched.lock().unwrap().clone()
    }
}

impl RaceApi for MockRaceApi {
    async fn fetch_roster(&self) -> Result<Vec<RawRecord>> {
        Ok(self.roster.clone())
    }

    async fn fetch_stages(&self) -> Result<Vec<StageDescriptor>> {
        Ok(self.stages.clone())
    }

    async fn fetch_current_stage(&self) -> Result<Option<StageDescriptor>> {
        Ok(self.current.clone())
    }

    async fn fetch_stage_detail(&self, stage_id: u32) -> Result<Vec<RawRecord>> {
        self.fetched.lock().unwrap().push(stage_id);
        self.details.get(&stage_id).cloned().ok_or_else(|| {
            RaceError::data_integrity(format!("no fixture for stage id {}", stage_id))
        })
    }
}

pub fn record(value: Value) -> RawRecord {
    match value {
        Value::Object(map) => map,
        other => panic!("not an object: {}", other),
    }
}

/// One detail record of rider `id` at stage `stage_id`
pub fn rider_record(id: u32, stage_id: u32, general: &str, youth: Option<u32>) -> RawRecord {
    record(json!({
        "Id": id,
        "StageId": stage_id,
        "FirstName": format!("Rider{}", id),
        "LastName": "Test",
        "CountryCode": "FRA",
        "DateOfBirth": "1990-07-14T00:00:00",
        "TeamCode": "TST",
        "GeneralClassification": general,
        "GeneralClassificationRank": 0,
        "YouthClassificationRank": youth,
    }))
}

/// Config writing into `output_dir`, without roster or current stage
pub fn test_config(output_dir: &Path) -> RaceConfig {
    RaceConfig::default()
        .with_api_base_url("http://localhost")
        .with_output_dir(output_dir)
        .without_roster()
        .without_current_stage()
}
