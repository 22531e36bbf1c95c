// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::ids::RecordId;

/// A student row as the server returns it. Every field except `id` is
/// optional on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub student_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_age",
        skip_serializing_if = "Option::is_none"
    )]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
}

impl Record {
    pub fn new(id: RecordId) -> Self {
        Self {
            id,
            student_id: None,
            first_name: None,
            last_name: None,
            age: None,
            grade: None,
        }
    }

    pub fn display_name(&self) -> String {
        let first = self.first_name.as_deref().unwrap_or_default();
        let last = self.last_name.as_deref().unwrap_or_default();
        let joined = format!("{first} {last}");
        let trimmed = joined.trim();
        if trimmed.is_empty() {
            format!("record {}", self.id)
        } else {
            trimmed.to_owned()
        }
    }

    pub fn export_row(&self) -> [String; 5] {
        [
            self.student_id.clone().unwrap_or_default(),
            self.first_name.clone().unwrap_or_default(),
            self.last_name.clone().unwrap_or_default(),
            self.age.map(|age| age.to_string()).unwrap_or_default(),
            self.grade.clone().unwrap_or_default(),
        ]
    }
}

pub const EXPORT_COLUMNS: [&str; 5] = ["Reg#", "First Name", "Last Name", "Age", "Grade"];

pub fn export_rows(records: &[Record]) -> Vec<[String; 5]> {
    records.iter().map(Record::export_row).collect()
}

/// Fields emitted by the edit form. `None` means "not set" and is dropped
/// from the outgoing update body.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct EditedFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
}

impl EditedFields {
    pub fn from_record(record: &Record) -> Self {
        Self {
            id: Some(record.id.clone()),
            student_id: record.student_id.clone(),
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
            age: record.age,
            grade: record.grade.clone(),
        }
    }

    pub fn into_patch(self) -> Result<RecordPatch> {
        let Some(id) = self.id.clone() else {
            bail!("edited record has no id -- reopen the edit form from the table and retry");
        };
        Ok(RecordPatch { id, body: self })
    }
}

/// An update request body that is guaranteed to carry its target id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordPatch {
    id: RecordId,
    body: EditedFields,
}

impl RecordPatch {
    pub fn id(&self) -> &RecordId {
        &self.id
    }

    pub fn body(&self) -> &EditedFields {
        &self.body
    }
}

/// Result of an update call once the response body has been inspected.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    Updated(Record),
    ShapeError(Value),
}

impl UpdateOutcome {
    /// Decides the outcome from a raw response body: only an object with a
    /// decodable `student` field counts as an update.
    pub fn from_response(raw: Value) -> Self {
        let student = raw.get("student").cloned();
        match student.map(serde_json::from_value::<Record>) {
            Some(Ok(record)) => Self::Updated(record),
            _ => Self::ShapeError(raw),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) => Some(text),
        Some(Value::Number(number)) => Some(number.to_string()),
        _ => None,
    })
}

/// Ages the server sends that are not whole non-negative numbers display as
/// blank instead of failing the whole list.
fn lenient_age<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let age = match &value {
        Some(Value::String(text)) => text.trim().parse::<u32>().ok(),
        Some(Value::Number(number)) => number
            .as_u64()
            .and_then(|whole| u32::try_from(whole).ok())
            .or_else(|| {
                number
                    .as_f64()
                    .filter(|float| {
                        float.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(float)
                    })
                    .map(|float| float as u32)
            }),
        _ => None,
    };
    if age.is_none()
        && let Some(raw) = &value
    {
        tracing::debug!(event = "roster.decode.age_dropped", raw = %raw);
    }
    Ok(age)
}

#[cfg(test)]
mod tests {
    use super::{EditedFields, Record, UpdateOutcome, export_rows};
    use crate::RecordId;
    use anyhow::Result;
    use serde_json::json;

    #[test]
    fn record_decodes_with_missing_and_loose_fields() -> Result<()> {
        let record: Record = serde_json::from_value(json!({
            "id": 4,
            "student_id": 1007,
            "first_name": "Ann",
            "age": "12",
            "grade": null,
        }))?;
        assert_eq!(record.id, RecordId::new(4));
        assert_eq!(record.student_id.as_deref(), Some("1007"));
        assert_eq!(record.first_name.as_deref(), Some("Ann"));
        assert_eq!(record.last_name, None);
        assert_eq!(record.age, Some(12));
        assert_eq!(record.grade, None);
        Ok(())
    }

    #[test]
    fn unreadable_ages_blank_out_without_dropping_rows() -> Result<()> {
        let records: Vec<Record> = serde_json::from_value(json!([
            {"id": 1, "first_name": "Ann", "age": 12},
            {"id": 2, "first_name": "Ben", "age": "twelve"},
            {"id": 3, "first_name": "Cy", "age": -3},
            {"id": 4, "first_name": "Di", "age": 9.5},
            {"id": 5, "first_name": "Ed", "age": 11.0},
        ]))?;
        let ages: Vec<Option<u32>> = records.iter().map(|record| record.age).collect();
        assert_eq!(ages, vec![Some(12), None, None, None, Some(11)]);
        assert_eq!(records[1].first_name.as_deref(), Some("Ben"));
        Ok(())
    }

    #[test]
    fn string_ids_decode_and_reach_the_patch() -> Result<()> {
        let records: Vec<Record> = serde_json::from_value(json!([
            {"id": "65f0a1b2", "first_name": "Ann"},
        ]))?;
        assert_eq!(records[0].id, RecordId::text("65f0a1b2"));

        let mut fields = EditedFields::from_record(&records[0]);
        fields.grade = Some("7".to_owned());
        let patch = fields.into_patch()?;
        assert_eq!(patch.id(), &RecordId::text("65f0a1b2"));
        assert_eq!(
            serde_json::to_value(patch.body())?,
            json!({"id": "65f0a1b2", "first_name": "Ann", "grade": "7"})
        );
        Ok(())
    }

    #[test]
    fn partial_update_drops_unset_fields() -> Result<()> {
        let fields = EditedFields {
            id: Some(RecordId::new(7)),
            first_name: Some("Ann".to_owned()),
            last_name: None,
            ..EditedFields::default()
        };
        let patch = fields.into_patch()?;
        assert_eq!(patch.id(), &RecordId::new(7));
        assert_eq!(
            serde_json::to_value(patch.body())?,
            json!({"id": 7, "first_name": "Ann"})
        );
        Ok(())
    }

    #[test]
    fn patch_requires_id() {
        let fields = EditedFields {
            first_name: Some("Ann".to_owned()),
            ..EditedFields::default()
        };
        let error = fields.into_patch().expect_err("missing id should fail");
        assert!(error.to_string().contains("no id"));
    }

    #[test]
    fn update_outcome_requires_student_payload() {
        let updated = UpdateOutcome::from_response(json!({
            "message": "ok",
            "student": {"id": 1, "first_name": "B"},
        }));
        let mut expected = Record::new(RecordId::new(1));
        expected.first_name = Some("B".to_owned());
        assert_eq!(updated, UpdateOutcome::Updated(expected));

        let raw = json!({"message": "ok"});
        assert_eq!(
            UpdateOutcome::from_response(raw.clone()),
            UpdateOutcome::ShapeError(raw)
        );

        let malformed = json!({"student": "nope"});
        assert_eq!(
            UpdateOutcome::from_response(malformed.clone()),
            UpdateOutcome::ShapeError(malformed)
        );
    }

    #[test]
    fn export_rows_follow_fixed_column_order() {
        let mut record = Record::new(RecordId::new(3));
        record.student_id = Some("R-3".to_owned());
        record.first_name = Some("Cy".to_owned());
        record.age = Some(9);
        let rows = export_rows(&[record]);
        assert_eq!(
            rows,
            vec![[
                "R-3".to_owned(),
                "Cy".to_owned(),
                String::new(),
                "9".to_owned(),
                String::new(),
            ]]
        );
    }

    #[test]
    fn display_name_falls_back_to_id() {
        let record = Record::new(RecordId::new(12));
        assert_eq!(record.display_name(), "record 12");
    }
}
