//! Record cleaning and typed stage extraction.
//!
//! The race API packs each classification into a single comma-joined string
//! (`"12, 00:01:23, 04:12:09"`) and restates the rank in a separate
//! `...Rank` field. Cleaning replaces the composite strings with structured
//! objects, drops the restated ranks, truncates birth timestamps to dates
//! and trims names. Cleaned records are what the per-stage snapshots
//! contain; [`stage_detail_from_records`] then lifts them into a typed
//! [`StageDetail`].

use crate::constants::{COMPOSITE_SEPARATOR, fields};
use crate::duration::parse_duration;
use crate::error::{RaceError, Result};
use crate::models::{
    ClassificationKind, RawRecord, RiderProfile, RiderRef, StageDetail, StageEntry, Standing,
};
use serde_json::{Value, json};
use tracing::debug;

/// Wire field holding the classification of `kind`
pub fn wire_field(kind: ClassificationKind) -> &'static str {
    match kind {
        ClassificationKind::General => fields::GENERAL_CLASSIFICATION,
        ClassificationKind::Sprint => fields::SPRINT_CLASSIFICATION,
        ClassificationKind::Mountain => fields::MOUNTAIN_CLASSIFICATION,
        ClassificationKind::Youth => fields::YOUTH_CLASSIFICATION_RANK,
    }
}

/// Normalize one raw stage-detail record
pub fn clean_record(mut record: RawRecord) -> Result<RawRecord> {
    for kind in [
        ClassificationKind::General,
        ClassificationKind::Sprint,
        ClassificationKind::Mountain,
    ] {
        let field = wire_field(kind);
        let Some(Value::String(text)) = record.get(field) else {
            continue;
        };
        if text.trim().is_empty() {
            continue;
        }

        let standing = parse_composite(kind, text)?;
        record.insert(field.to_string(), standing_object(&standing));
        record.remove(&format!("{}{}", field, fields::RANK_SUFFIX));
    }

    normalize_biography(&mut record);
    Ok(record)
}

/// Normalize a roster record.
///
/// Classification fields left over from the last stage the roster was
/// generated after are dropped unparsed.
pub fn clean_roster_record(mut record: RawRecord) -> RawRecord {
    for kind in ClassificationKind::ALL {
        let field = wire_field(kind);
        record.remove(field);
        record.remove(&format!("{}{}", field, fields::RANK_SUFFIX));
    }

    normalize_biography(&mut record);
    record
}

/// Truncate the birth timestamp to a date and trim the names
fn normalize_biography(record: &mut RawRecord) {
    if let Some(Value::String(birth)) = record.get_mut(fields::DATE_OF_BIRTH) {
        truncate_to_date(birth);
    }

    for field in fields::NAME_FIELDS {
        if let Some(Value::String(name)) = record.get_mut(*field) {
            let trimmed = name.trim();
            if trimmed.len() != name.len() {
                *name = trimmed.to_string();
            }
        }
    }
}

/// Split a composite classification string into a typed standing
pub fn parse_composite(kind: ClassificationKind, text: &str) -> Result<Standing> {
    let field = wire_field(kind);
    let parts: Vec<&str> = text.split(COMPOSITE_SEPARATOR).map(str::trim).collect();
    let expected = kind.metrics().len();
    if parts.len() != expected {
        return Err(RaceError::schema(
            field,
            format!(
                "expected {} parts in '{}', found {}",
                expected,
                text,
                parts.len()
            ),
        ));
    }

    let rank = parse_number(field, parts[0])?;
    match kind {
        ClassificationKind::General => Ok(Standing::General {
            rank,
            time_delta: parse_duration(parts[1])?,
            time_absolute: parse_duration(parts[2])?,
        }),
        ClassificationKind::Sprint => Ok(Standing::Sprint {
            rank,
            points: parse_number(field, parts[1])?,
        }),
        ClassificationKind::Mountain => Ok(Standing::Mountain {
            rank,
            points: parse_number(field, parts[1])?,
        }),
        ClassificationKind::Youth => Ok(Standing::Youth { rank }),
    }
}

fn parse_number(field: &str, text: &str) -> Result<u32> {
    text.parse::<u32>()
        .map_err(|e| RaceError::schema(field, format!("'{}' is not a number: {}", text, e)))
}

fn standing_object(standing: &Standing) -> Value {
    match *standing {
        Standing::General {
            rank,
            time_delta,
            time_absolute,
        } => json!({
            "rank": rank,
            "time_delta": time_delta,
            "time_absolute": time_absolute,
        }),
        Standing::Sprint { rank, points } | Standing::Mountain { rank, points } => json!({
            "rank": rank,
            "points": points,
        }),
        Standing::Youth { rank } => json!({ "rank": rank }),
    }
}

/// Keep the `YYYY-MM-DD` prefix of a timestamp
fn truncate_to_date(value: &mut String) {
    if let Some((index, _)) = value.char_indices().nth(fields::DATE_PREFIX_LEN) {
        value.truncate(index);
    }
}

/// Rider identity of a record: its id, else its bib number
pub fn rider_ref(record: &RawRecord) -> Result<RiderRef> {
    if let Some(id) = record.get(fields::ID).and_then(scalar_text) {
        return Ok(RiderRef::Id(id));
    }

    for field in [fields::BIB, fields::BIB_NUMBER] {
        if let Some(value) = record.get(field) {
            let bib = as_u32(field, value)?;
            return Ok(RiderRef::Bib(bib));
        }
    }

    Err(RaceError::schema(
        fields::ID,
        "record carries neither a rider id nor a bib number",
    ))
}

/// Bib number of a record, if it carries a readable one
pub fn record_bib(record: &RawRecord) -> Option<u32> {
    [fields::BIB, fields::BIB_NUMBER]
        .iter()
        .find_map(|field| record.get(*field))
        .and_then(|value| as_u32(fields::BIB, value).ok())
}

/// Biographical fields of a record, if it carries any
pub fn profile_from_record(record: &RawRecord) -> Option<RiderProfile> {
    let text = |field: &str| record.get(field).and_then(scalar_text);

    let first_name = text(fields::FIRST_NAME);
    let last_name = text(fields::LAST_NAME);
    if first_name.is_none() && last_name.is_none() {
        return None;
    }

    Some(RiderProfile {
        first_name: first_name.unwrap_or_default(),
        last_name: last_name.unwrap_or_default(),
        country: text(fields::COUNTRY_CODE).unwrap_or_default(),
        birth_date: text(fields::DATE_OF_BIRTH).unwrap_or_default(),
        team: text(fields::TEAM_CODE).unwrap_or_default(),
    })
}

/// Stage id a detail record claims to belong to
pub fn record_stage_id(record: &RawRecord) -> Option<u32> {
    record
        .get(fields::STAGE_ID)
        .and_then(|value| as_u32(fields::STAGE_ID, value).ok())
}

/// Read the standing of `kind` from a cleaned record.
///
/// Returns `None` when the record has no (or an empty) entry for the kind.
pub fn standing_from_record(
    record: &RawRecord,
    kind: ClassificationKind,
) -> Result<Option<Standing>> {
    let field = wire_field(kind);
    let value = match record.get(field) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(text)) if text.trim().is_empty() => return Ok(None),
        Some(value) => value,
    };

    let standing = match kind {
        ClassificationKind::Youth => Standing::Youth {
            rank: as_u32(field, value)?,
        },
        _ => match value {
            Value::String(text) => parse_composite(kind, text)?,
            Value::Object(object) => standing_from_object(kind, object)?,
            other => {
                return Err(RaceError::schema(
                    field,
                    format!("unexpected value {}", other),
                ));
            }
        },
    };

    Ok(Some(standing))
}

/// Rebuild a standing from the structured object a cleaned record holds
fn standing_from_object(
    kind: ClassificationKind,
    object: &serde_json::Map<String, Value>,
) -> Result<Standing> {
    let field = wire_field(kind);
    let metric = |name: &str| -> Result<u64> {
        object
            .get(name)
            .and_then(Value::as_u64)
            .ok_or_else(|| RaceError::schema(field, format!("missing '{}'", name)))
    };
    let small = |name: &str| -> Result<u32> {
        u32::try_from(metric(name)?)
            .map_err(|_| RaceError::schema(field, format!("'{}' out of range", name)))
    };

    Ok(match kind {
        ClassificationKind::General => Standing::General {
            rank: small("rank")?,
            time_delta: metric("time_delta")?,
            time_absolute: metric("time_absolute")?,
        },
        ClassificationKind::Sprint => Standing::Sprint {
            rank: small("rank")?,
            points: small("points")?,
        },
        ClassificationKind::Mountain => Standing::Mountain {
            rank: small("rank")?,
            points: small("points")?,
        },
        ClassificationKind::Youth => Standing::Youth { rank: small("rank")? },
    })
}

/// Lift cleaned detail records into per-kind stage entries
pub fn stage_detail_from_records(records: &[RawRecord]) -> Result<StageDetail> {
    let mut detail = StageDetail::new(records.first().and_then(record_stage_id));

    for record in records {
        let rider = rider_ref(record)?;
        let profile = profile_from_record(record);

        for kind in ClassificationKind::ALL {
            let standing = standing_from_record(record, kind).map_err(|e| {
                RaceError::Stage {
                    stage: detail
                        .stage_id
                        .map(|id| format!("id {}", id))
                        .unwrap_or_else(|| "unknown".to_string()),
                    rider: Some(rider.to_string()),
                    source: Box::new(e),
                }
            })?;

            if let Some(standing) = standing {
                detail.push(StageEntry {
                    rider: rider.clone(),
                    profile: profile.clone(),
                    standing,
                });
            }
        }
    }

    debug!(
        "Extracted stage detail: {} records, kinds {:?}",
        records.len(),
        detail.classifications.keys().collect::<Vec<_>>()
    );

    Ok(detail)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_u32(field: &str, value: &Value) -> Result<u32> {
    let number = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    number
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| RaceError::schema(field, format!("expected a number, found {}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(value: Value) -> RawRecord {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {}", other),
        }
    }

    #[test]
    fn test_general_composite_becomes_structured() {
        let cleaned = clean_record(record(json!({
            "Id": 1,
            "GeneralClassification": "12, 00:01:23, 04:12:09",
            "GeneralClassificationRank": 12,
        })))
        .unwrap();

        assert_eq!(
            cleaned["GeneralClassification"],
            json!({"rank": 12, "time_delta": 83, "time_absolute": 15129})
        );
        assert!(!cleaned.contains_key("GeneralClassificationRank"));
    }

    #[test]
    fn test_points_composites_become_structured() {
        let cleaned = clean_record(record(json!({
            "Id": 1,
            "SprintClassification": "3, 120",
            "SprintClassificationRank": 3,
            "MountainClassification": "41, 2",
        })))
        .unwrap();

        assert_eq!(cleaned["SprintClassification"], json!({"rank": 3, "points": 120}));
        assert_eq!(cleaned["MountainClassification"], json!({"rank": 41, "points": 2}));
        assert!(!cleaned.contains_key("SprintClassificationRank"));
    }

    #[test]
    fn test_birth_date_and_names_normalized() {
        let cleaned = clean_record(record(json!({
            "Id": 7,
            "FirstName": "  Peter ",
            "LastName": "Sagan\t",
            "DateOfBirth": "1990-01-26T00:00:00",
        })))
        .unwrap();

        assert_eq!(cleaned["FirstName"], "Peter");
        assert_eq!(cleaned["LastName"], "Sagan");
        assert_eq!(cleaned["DateOfBirth"], "1990-01-26");
    }

    #[test]
    fn test_cleaning_is_idempotent() {
        let once = clean_record(record(json!({
            "Id": 1,
            "GeneralClassification": "1, 00:00:00, 20:15:01",
            "DateOfBirth": "1985-05-20T00:00:00",
        })))
        .unwrap();
        let twice = clean_record(once.clone()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_wrong_arity_is_schema_error() {
        let result = clean_record(record(json!({
            "Id": 1,
            "GeneralClassification": "12, 00:01:23",
        })));
        assert!(matches!(result, Err(RaceError::Schema { .. })));

        let result = parse_composite(ClassificationKind::Sprint, "3, 120, 7");
        assert!(matches!(result, Err(RaceError::Schema { .. })));
    }

    #[test]
    fn test_bad_duration_is_format_error() {
        let result = parse_composite(ClassificationKind::General, "12, 1:23, 04:12:09");
        assert!(matches!(result, Err(RaceError::Format { .. })));
    }

    #[test]
    fn test_roster_record_loses_classification_fields() {
        let cleaned = clean_roster_record(record(json!({
            "Id": 1,
            "FirstName": "Chris ",
            "GeneralClassification": "1, 00:00:00, 89:04:48",
            "YouthClassificationRank": 0,
            "MountainClassificationRank": 9,
        })));

        assert_eq!(cleaned.len(), 2);
        assert_eq!(cleaned["FirstName"], "Chris");
    }

    #[test]
    fn test_rider_ref_prefers_id_over_bib() {
        assert_eq!(
            rider_ref(&record(json!({"Id": 42, "Bib": 11}))).unwrap(),
            RiderRef::Id("42".to_string())
        );
        assert_eq!(
            rider_ref(&record(json!({"BibNumber": "11"}))).unwrap(),
            RiderRef::Bib(11)
        );
        assert!(matches!(
            rider_ref(&record(json!({"FirstName": "Nobody"}))),
            Err(RaceError::Schema { .. })
        ));
    }

    #[test]
    fn test_stage_detail_groups_entries_by_kind() {
        let records: Vec<RawRecord> = vec![
            json!({
                "Id": 1, "StageId": 3, "FirstName": "A", "LastName": "One",
                "GeneralClassification": "1, 00:00:00, 10:00:00",
                "YouthClassificationRank": 1,
            }),
            json!({
                "Id": 2, "StageId": 3, "FirstName": "B", "LastName": "Two",
                "GeneralClassification": "2, 00:00:10, 10:00:10",
                "SprintClassification": "1, 50",
                "YouthClassificationRank": null,
            }),
        ]
        .into_iter()
        .map(|v| clean_record(record(v)).unwrap())
        .collect();

        let detail = stage_detail_from_records(&records).unwrap();

        assert_eq!(detail.stage_id, Some(3));
        assert_eq!(detail.entries(ClassificationKind::General).unwrap().len(), 2);
        assert_eq!(detail.entries(ClassificationKind::Sprint).unwrap().len(), 1);
        assert_eq!(detail.entries(ClassificationKind::Youth).unwrap().len(), 1);
        assert!(detail.entries(ClassificationKind::Mountain).is_none());

        let sprint = &detail.entries(ClassificationKind::Sprint).unwrap()[0];
        assert_eq!(sprint.rider, RiderRef::Id("2".to_string()));
        assert_eq!(sprint.standing, Standing::Sprint { rank: 1, points: 50 });
        assert_eq!(sprint.profile.as_ref().unwrap().last_name, "Two");
    }

    #[test]
    fn test_stage_detail_error_names_rider() {
        let records = vec![record(json!({
            "Id": 9, "StageId": 3,
            "YouthClassificationRank": "first",
        }))];

        match stage_detail_from_records(&records).unwrap_err() {
            RaceError::Stage { rider, source, .. } => {
                assert_eq!(rider.as_deref(), Some("9"));
                assert!(matches!(*source, RaceError::Schema { .. }));
            }
            other => panic!("Expected Stage error, got {:?}", other),
        }
    }
}
