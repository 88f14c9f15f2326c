//! Application constants for the race processor
//!
//! Endpoint templates, wire field names, output file names and the fixed
//! export catalog used throughout the processor.

use crate::models::{ClassificationKind, Metric};

// =============================================================================
// API Endpoints
// =============================================================================

/// Default API host. Race 6 is the 2016 Tour de France.
pub const DEFAULT_API_BASE_URL: &str = "http://fep-api.dimensiondata.com";

pub const DEFAULT_RACE_ID: u32 = 6;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Stage list endpoint, relative to the base URL
pub fn stages_endpoint(race_id: u32) -> String {
    format!("/race/{}/stages", race_id)
}

/// Rider roster endpoint, relative to the base URL
pub fn roster_endpoint(race_id: u32) -> String {
    format!("/race/{}/riders", race_id)
}

/// Current stage marker endpoint, relative to the base URL
pub fn current_stage_endpoint(race_id: u32) -> String {
    format!("/race/{}/stages/current", race_id)
}

/// Per-stage rider classification endpoint, relative to the base URL
pub fn stage_detail_endpoint(stage_id: u32) -> String {
    format!("/stages/{:02}/overallridersclassification", stage_id)
}

// =============================================================================
// Wire Field Names
// =============================================================================

pub mod fields {
    pub const ID: &str = "Id";
    pub const BIB: &str = "Bib";
    pub const BIB_NUMBER: &str = "BibNumber";
    pub const FIRST_NAME: &str = "FirstName";
    pub const LAST_NAME: &str = "LastName";
    pub const COUNTRY_CODE: &str = "CountryCode";
    pub const DATE_OF_BIRTH: &str = "DateOfBirth";
    pub const TEAM_CODE: &str = "TeamCode";
    pub const STAGE_ID: &str = "StageId";

    pub const GENERAL_CLASSIFICATION: &str = "GeneralClassification";
    pub const SPRINT_CLASSIFICATION: &str = "SprintClassification";
    pub const MOUNTAIN_CLASSIFICATION: &str = "MountainClassification";
    pub const YOUTH_CLASSIFICATION_RANK: &str = "YouthClassificationRank";

    /// Suffix of the standalone rank fields restating a composite field's rank
    pub const RANK_SUFFIX: &str = "Rank";

    /// Name fields trimmed by the record cleaner
    pub const NAME_FIELDS: &[&str] = &[FIRST_NAME, LAST_NAME];

    /// Length of an ISO date prefix (YYYY-MM-DD)
    pub const DATE_PREFIX_LEN: usize = 10;
}

// =============================================================================
// Composite Field Format
// =============================================================================

/// Separator between parts of a composite classification field
pub const COMPOSITE_SEPARATOR: &str = ", ";

/// Separator between the parts of an H:MM:SS duration
pub const DURATION_SEPARATOR: char = ':';

// =============================================================================
// Output Files
// =============================================================================

pub const DEFAULT_OUTPUT_DIR: &str = "data";

pub const STAGES_FILE_NAME: &str = "stages.json";

pub const RIDERS_FILE_NAME: &str = "riders.json";

/// File name for one stage's cleaned classification snapshot
pub fn stage_snapshot_file_name(stage_number: &str) -> String {
    match stage_number.trim().parse::<u32>() {
        Ok(number) => format!("stage_classification_{:02}.json", number),
        Err(_) => format!("stage_classification_{}.json", stage_number.trim()),
    }
}

/// File name for one (classification, metric) table
pub fn table_file_name(kind: ClassificationKind, metric: Metric) -> String {
    format!("{}_{}.csv", kind.as_str(), metric.as_str())
}

/// Rider columns preceding the per-stage columns in every table
pub const TABLE_RIDER_COLUMNS: &[&str] = &[
    "id",
    "first_name",
    "last_name",
    "country",
    "birth_date",
    "team",
];

// =============================================================================
// Stage Handling
// =============================================================================

/// Stage numbers matching this pattern are rest days ("R1", "R2", ...)
pub const DEFAULT_REST_DAY_PATTERN: &str = r"^[Rr]\d*$";

/// Every (classification, metric) pair exported as a table
pub const EXPORT_CATALOG: &[(ClassificationKind, Metric)] = &[
    (ClassificationKind::General, Metric::Rank),
    (ClassificationKind::General, Metric::TimeDelta),
    (ClassificationKind::General, Metric::TimeAbsolute),
    (ClassificationKind::Sprint, Metric::Rank),
    (ClassificationKind::Sprint, Metric::Points),
    (ClassificationKind::Mountain, Metric::Rank),
    (ClassificationKind::Mountain, Metric::Points),
    (ClassificationKind::Youth, Metric::Rank),
];
