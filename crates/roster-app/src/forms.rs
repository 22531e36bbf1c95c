// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{EditedFields, Record, RecordId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    FirstName,
    LastName,
    Age,
    Grade,
}

impl FormField {
    pub const ALL: [Self; 4] = [Self::FirstName, Self::LastName, Self::Age, Self::Grade];

    pub const fn label(self) -> &'static str {
        match self {
            Self::FirstName => "First Name",
            Self::LastName => "Last Name",
            Self::Age => "Age",
            Self::Grade => "Grade",
        }
    }

    pub fn accepts(self, ch: char) -> bool {
        match self {
            Self::Age => ch.is_ascii_digit(),
            Self::FirstName | Self::LastName | Self::Grade => !ch.is_control(),
        }
    }
}

/// Controlled input state for one record. A field holds `None` until the
/// record supplies a value or the user edits it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordForm {
    source: Record,
    first_name: Option<String>,
    last_name: Option<String>,
    age: Option<String>,
    grade: Option<String>,
}

impl RecordForm {
    pub fn from_record(record: &Record) -> Self {
        Self {
            source: record.clone(),
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
            age: record.age.map(|age| age.to_string()),
            grade: record.grade.clone(),
        }
    }

    pub fn record_id(&self) -> &RecordId {
        &self.source.id
    }

    pub fn source(&self) -> &Record {
        &self.source
    }

    /// Re-seeds local state when a different record is bound. Returns whether
    /// the form was reset.
    pub fn sync_record(&mut self, record: &Record) -> bool {
        if self.source == *record {
            return false;
        }
        *self = Self::from_record(record);
        true
    }

    pub fn value(&self, field: FormField) -> &str {
        self.slot(field).as_deref().unwrap_or_default()
    }

    pub fn set_value(&mut self, field: FormField, value: &str) {
        let filtered = value.chars().filter(|ch| field.accepts(*ch)).collect();
        *self.slot_mut(field) = Some(filtered);
    }

    pub fn push_char(&mut self, field: FormField, ch: char) -> bool {
        if !field.accepts(ch) {
            return false;
        }
        self.slot_mut(field).get_or_insert_with(String::new).push(ch);
        true
    }

    pub fn pop_char(&mut self, field: FormField) {
        if let Some(value) = self.slot_mut(field) {
            value.pop();
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.submit() != EditedFields::from_record(&self.source)
    }

    /// Emits the full current field set. An emptied age is treated as unset.
    pub fn submit(&self) -> EditedFields {
        let age = self
            .age
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .and_then(|value| value.parse::<u32>().ok());
        EditedFields {
            id: Some(self.source.id.clone()),
            student_id: self.source.student_id.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            age,
            grade: self.grade.clone(),
        }
    }

    fn slot(&self, field: FormField) -> &Option<String> {
        match field {
            FormField::FirstName => &self.first_name,
            FormField::LastName => &self.last_name,
            FormField::Age => &self.age,
            FormField::Grade => &self.grade,
        }
    }

    fn slot_mut(&mut self, field: FormField) -> &mut Option<String> {
        match field {
            FormField::FirstName => &mut self.first_name,
            FormField::LastName => &mut self.last_name,
            FormField::Age => &mut self.age,
            FormField::Grade => &mut self.grade,
        }
    }
}
