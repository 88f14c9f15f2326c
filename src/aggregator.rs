//! Rider aggregation across stages.
//!
//! Folds the ordered stage details into one rider map whose classification
//! series are aligned by stage index. Each stage is merged by
//! [`RiderAggregator::merge_stage`], which takes the accumulated map by value
//! and returns the updated one, so a single stage can be merged and checked
//! in isolation.

use crate::cleaner::{clean_roster_record, profile_from_record, record_bib, rider_ref};
use crate::error::{RaceError, Result};
use crate::models::{
    ClassificationKind, RawRecord, Rider, RiderMap, RiderProfile, RiderRef, StageDetail,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, warn};

/// Rider profiles fetched before any stage is processed
#[derive(Debug, Clone, Default)]
pub struct Roster {
    profiles: BTreeMap<String, RiderProfile>,
    bibs: HashMap<u32, String>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a roster from raw rider records
    pub fn from_records(records: Vec<RawRecord>) -> Result<Self> {
        let mut roster = Self::new();

        for record in records {
            let record = clean_roster_record(record);
            let id = match rider_ref(&record)? {
                RiderRef::Id(id) => id,
                RiderRef::Bib(bib) => {
                    warn!("Roster record for bib {} has no rider id, keying by bib", bib);
                    bib.to_string()
                }
            };
            let bib = record_bib(&record);

            let profile = profile_from_record(&record).unwrap_or_default();
            roster.insert(id, bib, profile);
        }

        debug!("Roster loaded with {} riders", roster.len());
        Ok(roster)
    }

    pub fn insert(&mut self, id: impl Into<String>, bib: Option<u32>, profile: RiderProfile) {
        let id = id.into();
        if let Some(bib) = bib {
            self.bibs.insert(bib, id.clone());
        }
        self.profiles.insert(id, profile);
    }

    pub fn profile(&self, id: &str) -> Option<&RiderProfile> {
        self.profiles.get(id)
    }

    /// Rider id for a stage entry's reference; unknown bibs key by bib
    pub fn resolve(&self, rider: &RiderRef) -> String {
        match rider {
            RiderRef::Id(id) => id.clone(),
            RiderRef::Bib(bib) => self
                .bibs
                .get(bib)
                .cloned()
                .unwrap_or_else(|| bib.to_string()),
        }
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

/// Merges stage details into stage-aligned rider series
#[derive(Debug, Clone, Copy)]
pub struct RiderAggregator<'a> {
    num_stages: usize,
    roster: Option<&'a Roster>,
}

impl<'a> RiderAggregator<'a> {
    pub fn new(num_stages: usize, roster: Option<&'a Roster>) -> Self {
        Self { num_stages, roster }
    }

    fn resolve(&self, rider: &RiderRef) -> String {
        match self.roster {
            Some(roster) => roster.resolve(rider),
            None => match rider {
                RiderRef::Id(id) => id.clone(),
                RiderRef::Bib(bib) => bib.to_string(),
            },
        }
    }

    fn new_rider(&self, id: &str, entry_profile: Option<&RiderProfile>) -> Rider {
        let profile = self
            .roster
            .and_then(|roster| roster.profile(id))
            .or(entry_profile)
            .cloned()
            .unwrap_or_else(|| {
                warn!("No biographical data for rider {}", id);
                RiderProfile::default()
            });
        Rider::new(profile, self.num_stages)
    }

    /// Merge one stage's classifications into `riders` at `stage_index`
    pub fn merge_stage(
        &self,
        mut riders: RiderMap,
        stage_index: usize,
        detail: &StageDetail,
    ) -> Result<RiderMap> {
        let label = format!("#{}", stage_index + 1);
        if stage_index >= self.num_stages {
            return Err(RaceError::data_integrity(format!(
                "stage index {} exceeds the {} stages of the race",
                stage_index, self.num_stages
            ))
            .in_stage(label, None));
        }

        for kind in ClassificationKind::ALL {
            let Some(entries) = detail.entries(kind) else {
                debug!("Stage {} has no {} classification", label, kind);
                continue;
            };

            let mut seen = HashSet::with_capacity(entries.len());
            for entry in entries {
                let id = self.resolve(&entry.rider);
                if !seen.insert(id.clone()) {
                    return Err(RaceError::data_integrity(format!(
                        "rider listed twice in the {} classification",
                        kind
                    ))
                    .in_stage(label, Some(id)));
                }

                let rider = riders
                    .entry(id.clone())
                    .or_insert_with(|| self.new_rider(&id, entry.profile.as_ref()));
                rider
                    .classification
                    .record(stage_index, &entry.standing)
                    .map_err(|e| e.in_stage(label.clone(), Some(id.clone())))?;
            }

            debug!(
                "Stage {}: merged {} {} entries",
                label,
                entries.len(),
                kind
            );
        }

        Ok(riders)
    }

    /// Fold every stage, in order, into a fresh rider map
    pub fn aggregate(&self, stages: &[StageDetail]) -> Result<RiderMap> {
        stages
            .iter()
            .enumerate()
            .try_fold(RiderMap::new(), |riders, (index, detail)| {
                self.merge_stage(riders, index, detail)
            })
    }
}

/// Aggregate `stages` into a rider map with `num_stages` slots per series
pub fn aggregate(
    roster: Option<&Roster>,
    stages: &[StageDetail],
    num_stages: usize,
) -> Result<RiderMap> {
    RiderAggregator::new(num_stages, roster).aggregate(stages)
}
