// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use roster_app::{ApiRequest, EditedFields, Record, RecordId, RosterCommand, UpdateOutcome};
use serde_json::json;
use std::fs;
use std::path::Path;

use crate::StudentFaker;

/// In-memory stand-in for the student API. Each request is applied the way
/// the server applies it and answered with the completion command the
/// controller expects.
#[derive(Debug, Clone, Default)]
pub struct FakeBackend {
    records: Vec<Record>,
    next_id: i64,
    fail_next: Option<String>,
}

impl FakeBackend {
    pub fn new(records: Vec<Record>) -> Self {
        let next_id = records
            .iter()
            .filter_map(|record| record.id.as_number())
            .max()
            .unwrap_or_default()
            + 1;
        Self {
            records,
            next_id,
            fail_next: None,
        }
    }

    pub fn seeded(seed: u64, count: usize) -> Self {
        Self::new(StudentFaker::new(seed).roster(count))
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// The next request fails with `message` instead of touching the data.
    pub fn fail_next(&mut self, message: impl Into<String>) {
        self.fail_next = Some(message.into());
    }

    pub fn handle(&mut self, request: ApiRequest) -> RosterCommand {
        let failure = self.fail_next.take();
        match request {
            ApiRequest::ListRecords { token } => RosterCommand::ListLoaded {
                token,
                result: match failure {
                    Some(error) => Err(error),
                    None => Ok(self.records.clone()),
                },
            },
            ApiRequest::UpdateRecord(patch) => {
                let id = patch.id().clone();
                let result = match failure {
                    Some(error) => Err(error),
                    None => self
                        .update(&id, patch.body())
                        .map(UpdateOutcome::Updated)
                        .map_err(|error| error.to_string()),
                };
                RosterCommand::SaveFinished { id, result }
            }
            ApiRequest::DeleteRecord { id } => {
                let result = match failure {
                    Some(error) => Err(error),
                    None => self.delete(&id).map_err(|error| error.to_string()),
                };
                RosterCommand::DeleteFinished { id, result }
            }
            ApiRequest::ImportCsv { path } => {
                let result = match failure {
                    Some(error) => Err(error),
                    None => self
                        .import(&path)
                        .map(|count| json!({ "imported": count }))
                        .map_err(|error| format!("{error:#}")),
                };
                RosterCommand::ImportFinished { result }
            }
        }
    }

    fn update(&mut self, id: &RecordId, fields: &EditedFields) -> Result<Record> {
        let Some(record) = self.records.iter_mut().find(|record| record.id == *id) else {
            bail!("server error (404): student not found");
        };
        if let Some(value) = &fields.student_id {
            record.student_id = Some(value.clone());
        }
        if let Some(value) = &fields.first_name {
            record.first_name = Some(value.clone());
        }
        if let Some(value) = &fields.last_name {
            record.last_name = Some(value.clone());
        }
        if let Some(value) = fields.age {
            record.age = Some(value);
        }
        if let Some(value) = &fields.grade {
            record.grade = Some(value.clone());
        }
        Ok(record.clone())
    }

    fn delete(&mut self, id: &RecordId) -> Result<()> {
        let before = self.records.len();
        self.records.retain(|record| record.id != *id);
        if self.records.len() == before {
            bail!("server error (404): student not found");
        }
        Ok(())
    }

    fn import(&mut self, path: &Path) -> Result<usize> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("read CSV file {}", path.display()))?;
        let imported = records_from_csv(&text, self.next_id)?;
        let count = imported.len();
        self.next_id += count as i64;
        self.records.extend(imported);
        Ok(count)
    }
}

/// Parses CSV text with a header row naming the record fields. Unknown
/// columns are ignored; ids are assigned from `first_id` upward.
pub fn records_from_csv(text: &str, first_id: i64) -> Result<Vec<Record>> {
    let mut lines = text.lines().filter(|line| !line.trim().is_empty());
    let Some(header) = lines.next() else {
        bail!("CSV file is empty");
    };
    let columns = split_csv_line(header);

    let mut records = Vec::new();
    for (offset, line) in lines.enumerate() {
        let mut record = Record::new(RecordId::new(first_id + offset as i64));
        for (column, cell) in columns.iter().zip(split_csv_line(line)) {
            let value = (!cell.is_empty()).then_some(cell);
            match column.trim() {
                "student_id" => record.student_id = value,
                "first_name" => record.first_name = value,
                "last_name" => record.last_name = value,
                "grade" => record.grade = value,
                "age" => {
                    record.age = value
                        .map(|raw| {
                            raw.trim()
                                .parse::<u32>()
                                .with_context(|| format!("line {}: invalid age {raw:?}", offset + 2))
                        })
                        .transpose()?;
                }
                _ => {}
            }
        }
        records.push(record);
    }
    Ok(records)
}

fn split_csv_line(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '"' if quoted && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => cells.push(std::mem::take(&mut current)),
            ch => current.push(ch),
        }
    }
    cells.push(current);
    cells
}
