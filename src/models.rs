//! Core data structures for race classification processing.
//!
//! Defines the classification kinds and their fixed metric sets, the
//! per-rider classification block with stage-aligned series, and the stage
//! descriptors and details exchanged with the race API.

use crate::error::{RaceError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// A raw JSON object as returned by the race API
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// Value of a single metric at a single stage
pub type MetricValue = u64;

/// One slot per stage; `None` where the rider was not classified
pub type Series = Vec<Option<MetricValue>>;

/// Riders keyed by id, iterated in lexicographic id order
pub type RiderMap = BTreeMap<String, Rider>;

/// Ranking categories tracked per rider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationKind {
    General,
    Sprint,
    Mountain,
    Youth,
}

impl ClassificationKind {
    pub const ALL: [ClassificationKind; 4] = [
        ClassificationKind::General,
        ClassificationKind::Sprint,
        ClassificationKind::Mountain,
        ClassificationKind::Youth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClassificationKind::General => "general",
            ClassificationKind::Sprint => "sprint",
            ClassificationKind::Mountain => "mountain",
            ClassificationKind::Youth => "youth",
        }
    }

    /// The fixed metric set tracked for this kind
    pub fn metrics(&self) -> &'static [Metric] {
        match self {
            ClassificationKind::General => &[Metric::Rank, Metric::TimeDelta, Metric::TimeAbsolute],
            ClassificationKind::Sprint | ClassificationKind::Mountain => {
                &[Metric::Rank, Metric::Points]
            }
            ClassificationKind::Youth => &[Metric::Rank],
        }
    }

    pub fn has_metric(&self, metric: Metric) -> bool {
        self.metrics().contains(&metric)
    }
}

impl fmt::Display for ClassificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scalar values tracked within a classification kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Rank,
    TimeDelta,
    TimeAbsolute,
    Points,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Rank => "rank",
            Metric::TimeDelta => "time_delta",
            Metric::TimeAbsolute => "time_absolute",
            Metric::Points => "points",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rider's standing in one classification after one stage.
///
/// Each variant carries exactly the metric set of its kind, so a value can
/// only ever be written into a series that exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Standing {
    General {
        rank: u32,
        time_delta: u64,
        time_absolute: u64,
    },
    Sprint {
        rank: u32,
        points: u32,
    },
    Mountain {
        rank: u32,
        points: u32,
    },
    Youth {
        rank: u32,
    },
}

impl Standing {
    pub fn kind(&self) -> ClassificationKind {
        match self {
            Standing::General { .. } => ClassificationKind::General,
            Standing::Sprint { .. } => ClassificationKind::Sprint,
            Standing::Mountain { .. } => ClassificationKind::Mountain,
            Standing::Youth { .. } => ClassificationKind::Youth,
        }
    }

    /// Value of `metric`, or `None` if this kind does not track it
    pub fn value(&self, metric: Metric) -> Option<MetricValue> {
        match (*self, metric) {
            (Standing::General { rank, .. }, Metric::Rank)
            | (Standing::Sprint { rank, .. }, Metric::Rank)
            | (Standing::Mountain { rank, .. }, Metric::Rank)
            | (Standing::Youth { rank }, Metric::Rank) => Some(u64::from(rank)),
            (Standing::General { time_delta, .. }, Metric::TimeDelta) => Some(time_delta),
            (Standing::General { time_absolute, .. }, Metric::TimeAbsolute) => {
                Some(time_absolute)
            }
            (Standing::Sprint { points, .. }, Metric::Points)
            | (Standing::Mountain { points, .. }, Metric::Points) => Some(u64::from(points)),
            _ => None,
        }
    }
}

/// Biographical attributes of a rider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiderProfile {
    pub first_name: String,
    pub last_name: String,
    pub country: String,
    pub birth_date: String,
    pub team: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralSeries {
    pub rank: Series,
    pub time_delta: Series,
    pub time_absolute: Series,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsSeries {
    pub rank: Series,
    pub points: Series,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YouthSeries {
    pub rank: Series,
}

/// Per-kind, per-metric series, all of length `num_stages`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationBlock {
    pub general: GeneralSeries,
    pub sprint: PointsSeries,
    pub mountain: PointsSeries,
    pub youth: YouthSeries,
}

impl ClassificationBlock {
    /// Block with every series pre-filled with `num_stages` unset slots
    pub fn new(num_stages: usize) -> Self {
        let empty = || vec![None; num_stages];
        Self {
            general: GeneralSeries {
                rank: empty(),
                time_delta: empty(),
                time_absolute: empty(),
            },
            sprint: PointsSeries {
                rank: empty(),
                points: empty(),
            },
            mountain: PointsSeries {
                rank: empty(),
                points: empty(),
            },
            youth: YouthSeries { rank: empty() },
        }
    }

    pub fn series(&self, kind: ClassificationKind, metric: Metric) -> Option<&Series> {
        match (kind, metric) {
            (ClassificationKind::General, Metric::Rank) => Some(&self.general.rank),
            (ClassificationKind::General, Metric::TimeDelta) => Some(&self.general.time_delta),
            (ClassificationKind::General, Metric::TimeAbsolute) => {
                Some(&self.general.time_absolute)
            }
            (ClassificationKind::Sprint, Metric::Rank) => Some(&self.sprint.rank),
            (ClassificationKind::Sprint, Metric::Points) => Some(&self.sprint.points),
            (ClassificationKind::Mountain, Metric::Rank) => Some(&self.mountain.rank),
            (ClassificationKind::Mountain, Metric::Points) => Some(&self.mountain.points),
            (ClassificationKind::Youth, Metric::Rank) => Some(&self.youth.rank),
            _ => None,
        }
    }

    fn series_mut(&mut self, kind: ClassificationKind, metric: Metric) -> Option<&mut Series> {
        match (kind, metric) {
            (ClassificationKind::General, Metric::Rank) => Some(&mut self.general.rank),
            (ClassificationKind::General, Metric::TimeDelta) => Some(&mut self.general.time_delta),
            (ClassificationKind::General, Metric::TimeAbsolute) => {
                Some(&mut self.general.time_absolute)
            }
            (ClassificationKind::Sprint, Metric::Rank) => Some(&mut self.sprint.rank),
            (ClassificationKind::Sprint, Metric::Points) => Some(&mut self.sprint.points),
            (ClassificationKind::Mountain, Metric::Rank) => Some(&mut self.mountain.rank),
            (ClassificationKind::Mountain, Metric::Points) => Some(&mut self.mountain.points),
            (ClassificationKind::Youth, Metric::Rank) => Some(&mut self.youth.rank),
            _ => None,
        }
    }

    /// Write every metric of `standing` into slot `stage_index`
    pub fn record(&mut self, stage_index: usize, standing: &Standing) -> Result<()> {
        let kind = standing.kind();
        for &metric in kind.metrics() {
            let series = self.series_mut(kind, metric).ok_or_else(|| {
                RaceError::schema(kind.as_str(), format!("no series for metric {}", metric))
            })?;
            let len = series.len();
            let slot = series.get_mut(stage_index).ok_or_else(|| {
                RaceError::data_integrity(format!(
                    "stage index {} out of range for {}.{} series of length {}",
                    stage_index, kind, metric, len
                ))
            })?;
            *slot = standing.value(metric);
        }
        Ok(())
    }

    /// All series in export-catalog order
    pub fn iter_series(&self) -> impl Iterator<Item = (ClassificationKind, Metric, &Series)> {
        ClassificationKind::ALL.into_iter().flat_map(move |kind| {
            kind.metrics().iter().filter_map(move |&metric| {
                self.series(kind, metric).map(|series| (kind, metric, series))
            })
        })
    }
}

/// A rider and their stage-aligned classification history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rider {
    #[serde(flatten)]
    pub profile: RiderProfile,
    pub classification: ClassificationBlock,
}

impl Rider {
    pub fn new(profile: RiderProfile, num_stages: usize) -> Self {
        Self {
            profile,
            classification: ClassificationBlock::new(num_stages),
        }
    }
}

/// A stage as listed by the race API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDescriptor {
    #[serde(rename = "StageId")]
    pub stage_id: u32,

    /// Stage number as published; rest days use markers such as "R1"
    #[serde(rename = "StageNumber", deserialize_with = "string_or_number")]
    pub stage_number: String,

    /// Remaining descriptor fields, kept for the stage list snapshot
    #[serde(flatten)]
    pub extra: RawRecord,
}

impl StageDescriptor {
    pub fn new(stage_id: u32, stage_number: impl Into<String>) -> Self {
        Self {
            stage_id,
            stage_number: stage_number.into(),
            extra: RawRecord::new(),
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(u64),
    }

    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s,
        StringOrNumber::Number(n) => n.to_string(),
    })
}

/// How a stage entry identifies its rider
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RiderRef {
    Id(String),
    Bib(u32),
}

impl fmt::Display for RiderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiderRef::Id(id) => f.write_str(id),
            RiderRef::Bib(bib) => write!(f, "bib {}", bib),
        }
    }
}

/// One rider's entry in one classification of one stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageEntry {
    pub rider: RiderRef,
    pub profile: Option<RiderProfile>,
    pub standing: Standing,
}

/// Typed classification results of a single stage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageDetail {
    pub stage_id: Option<u32>,
    pub classifications: BTreeMap<ClassificationKind, Vec<StageEntry>>,
}

impl StageDetail {
    pub fn new(stage_id: Option<u32>) -> Self {
        Self {
            stage_id,
            classifications: BTreeMap::new(),
        }
    }

    pub fn push(&mut self, entry: StageEntry) {
        self.classifications
            .entry(entry.standing.kind())
            .or_default()
            .push(entry);
    }

    pub fn entries(&self, kind: ClassificationKind) -> Option<&[StageEntry]> {
        self.classifications.get(&kind).map(Vec::as_slice)
    }
}

/// Result of handling one listed stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    Merged,
    SkippedRestDay,
    /// The stage has not been run yet; processing stops here
    NotYetRun,
}

/// Summary of a completed run
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub stages_listed: usize,
    pub stages_merged: usize,
    pub rest_days_skipped: usize,
    /// Stage number at which the run halted, if the race is incomplete
    pub halted_at: Option<String>,
    pub riders: usize,
    pub files_written: Vec<PathBuf>,
    pub processing_time: Duration,
}
