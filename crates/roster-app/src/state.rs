// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde_json::Value;
use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::{
    EditedFields, Notice, Record, RecordForm, RecordId, RecordPatch, UPLOAD_EMPTY_MESSAGE,
    UPLOAD_FAILED_MESSAGE, UPLOAD_SUCCESS_MESSAGE, UpdateOutcome, UploadState, accepted_csv_files,
};

/// Network work the controller asks its runtime to perform. Each request is
/// answered by exactly one completion command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiRequest {
    ListRecords { token: u64 },
    UpdateRecord(RecordPatch),
    DeleteRecord { id: RecordId },
    ImportCsv { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSession {
    pub form: RecordForm,
    pub save_in_flight: bool,
}

impl EditSession {
    pub fn record_id(&self) -> &RecordId {
        self.form.record_id()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RosterState {
    pub records: Vec<Record>,
    pub loading: bool,
    pub session: Option<EditSession>,
    pub upload: UploadState,
    pending_deletes: BTreeSet<RecordId>,
    latest_load_token: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RosterCommand {
    Load,
    ListLoaded {
        token: u64,
        result: Result<Vec<Record>, String>,
    },
    BeginEdit(Record),
    CancelEdit,
    SubmitEdit,
    Save(EditedFields),
    SaveFinished {
        id: RecordId,
        result: Result<UpdateOutcome, String>,
    },
    Delete(RecordId),
    DeleteFinished {
        id: RecordId,
        result: Result<(), String>,
    },
    Upload(Vec<PathBuf>),
    ImportFinished {
        result: Result<Value, String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum RosterEvent {
    Request(ApiRequest),
    LoadingChanged(bool),
    SnapshotReplaced { count: usize },
    StaleResponseIgnored { token: u64 },
    RecordUpdated(RecordId),
    RecordRemoved(RecordId),
    SessionOpened(RecordId),
    SessionClosed,
    Imported(Value),
    Notice(Notice),
}

impl RosterState {
    pub fn dispatch(&mut self, command: RosterCommand) -> Vec<RosterEvent> {
        match command {
            RosterCommand::Load => self.load(),
            RosterCommand::ListLoaded { token, result } => self.finish_load(token, result),
            RosterCommand::BeginEdit(record) => self.begin_edit(record),
            RosterCommand::CancelEdit => self.cancel_edit(),
            RosterCommand::SubmitEdit => match &self.session {
                Some(session) => {
                    let fields = session.form.submit();
                    self.save(fields)
                }
                None => vec![RosterEvent::Notice(Notice::error("no record is being edited"))],
            },
            RosterCommand::Save(fields) => self.save(fields),
            RosterCommand::SaveFinished { id, result } => self.finish_save(id, result),
            RosterCommand::Delete(id) => self.delete(id),
            RosterCommand::DeleteFinished { id, result } => self.finish_delete(id, result),
            RosterCommand::Upload(files) => self.upload(&files),
            RosterCommand::ImportFinished { result } => self.finish_import(result),
        }
    }

    pub const fn latest_load_token(&self) -> u64 {
        self.latest_load_token
    }

    pub fn is_delete_pending(&self, id: &RecordId) -> bool {
        self.pending_deletes.contains(id)
    }

    pub fn session_form_mut(&mut self) -> Option<&mut RecordForm> {
        self.session.as_mut().map(|session| &mut session.form)
    }

    fn load(&mut self) -> Vec<RosterEvent> {
        self.latest_load_token = self.latest_load_token.wrapping_add(1);
        self.loading = true;
        vec![
            RosterEvent::LoadingChanged(true),
            RosterEvent::Request(ApiRequest::ListRecords {
                token: self.latest_load_token,
            }),
        ]
    }

    fn finish_load(&mut self, token: u64, result: Result<Vec<Record>, String>) -> Vec<RosterEvent> {
        if token != self.latest_load_token {
            tracing::debug!(
                event = "roster.load.stale",
                token,
                latest = self.latest_load_token
            );
            return vec![RosterEvent::StaleResponseIgnored { token }];
        }

        self.loading = false;
        match result {
            Ok(records) => {
                let count = records.len();
                self.records = records;
                tracing::info!(event = "roster.load.completed", token, count);
                vec![
                    RosterEvent::LoadingChanged(false),
                    RosterEvent::SnapshotReplaced { count },
                ]
            }
            Err(error) => {
                tracing::warn!(event = "roster.load.failed", token, error = %error);
                vec![
                    RosterEvent::LoadingChanged(false),
                    RosterEvent::Notice(Notice::error(format!(
                        "load failed: {error}; press r to retry"
                    ))),
                ]
            }
        }
    }

    fn begin_edit(&mut self, record: Record) -> Vec<RosterEvent> {
        if self.pending_deletes.contains(&record.id) {
            return vec![RosterEvent::Notice(Notice::error(format!(
                "{} is being deleted and cannot be edited",
                record.display_name()
            )))];
        }

        let id = record.id.clone();
        match &mut self.session {
            Some(session) => {
                let previous = session.record_id().clone();
                let discarded = session.form.is_dirty();
                if session.form.sync_record(&record) {
                    session.save_in_flight = false;
                    if discarded {
                        tracing::debug!(event = "roster.edit.discarded", record_id = %previous);
                    }
                }
            }
            None => {
                self.session = Some(EditSession {
                    form: RecordForm::from_record(&record),
                    save_in_flight: false,
                });
            }
        }
        vec![RosterEvent::SessionOpened(id)]
    }

    fn cancel_edit(&mut self) -> Vec<RosterEvent> {
        if self.session.take().is_some() {
            vec![RosterEvent::SessionClosed]
        } else {
            Vec::new()
        }
    }

    fn save(&mut self, fields: EditedFields) -> Vec<RosterEvent> {
        let patch = match fields.into_patch() {
            Ok(patch) => patch,
            Err(error) => {
                tracing::warn!(event = "roster.save.rejected", error = %error);
                return vec![RosterEvent::Notice(Notice::error(format!(
                    "save failed: {error}"
                )))];
            }
        };

        if let Some(session) = &mut self.session
            && session.record_id() == patch.id()
        {
            session.save_in_flight = true;
        }
        vec![RosterEvent::Request(ApiRequest::UpdateRecord(patch))]
    }

    fn finish_save(
        &mut self,
        id: RecordId,
        result: Result<UpdateOutcome, String>,
    ) -> Vec<RosterEvent> {
        if let Some(session) = &mut self.session
            && *session.record_id() == id
        {
            session.save_in_flight = false;
        }

        match result {
            Ok(UpdateOutcome::Updated(record)) => {
                let updated_id = record.id.clone();
                for existing in self.records.iter_mut().filter(|row| row.id == updated_id) {
                    *existing = record.clone();
                }
                tracing::info!(event = "roster.save.completed", record_id = %updated_id);

                let mut events = vec![RosterEvent::RecordUpdated(updated_id)];
                if self
                    .session
                    .as_ref()
                    .is_some_and(|session| *session.record_id() == id)
                {
                    self.session = None;
                    events.push(RosterEvent::SessionClosed);
                }
                events.push(RosterEvent::Notice(Notice::success(
                    "Student updated successfully",
                )));
                events.extend(self.load());
                events
            }
            Ok(UpdateOutcome::ShapeError(raw)) => {
                tracing::error!(
                    event = "roster.save.shape_error",
                    record_id = %id,
                    response = %raw
                );
                vec![RosterEvent::Notice(Notice::error(
                    "save failed: updated student not found in response; edit is still open",
                ))]
            }
            Err(error) => {
                tracing::error!(event = "roster.save.failed", record_id = %id, error = %error);
                vec![RosterEvent::Notice(Notice::error(format!(
                    "save failed: {error}; edit is still open, retry or press Esc"
                )))]
            }
        }
    }

    fn delete(&mut self, id: RecordId) -> Vec<RosterEvent> {
        if self
            .session
            .as_ref()
            .is_some_and(|session| *session.record_id() == id)
        {
            return vec![RosterEvent::Notice(Notice::error(
                "finish or cancel the open edit before deleting this record",
            ))];
        }
        if !self.pending_deletes.insert(id.clone()) {
            return vec![RosterEvent::Notice(Notice::error(format!(
                "delete of record {id} is already in progress"
            )))];
        }
        vec![RosterEvent::Request(ApiRequest::DeleteRecord { id })]
    }

    fn finish_delete(&mut self, id: RecordId, result: Result<(), String>) -> Vec<RosterEvent> {
        self.pending_deletes.remove(&id);
        match result {
            Ok(()) => {
                self.records.retain(|record| record.id != id);
                tracing::info!(event = "roster.delete.completed", record_id = %id);
                vec![
                    RosterEvent::RecordRemoved(id),
                    RosterEvent::Notice(Notice::success("Student deleted successfully!")),
                ]
            }
            Err(error) => {
                tracing::error!(event = "roster.delete.failed", record_id = %id, error = %error);
                vec![RosterEvent::Notice(Notice::error(format!(
                    "delete failed: {error}"
                )))]
            }
        }
    }

    fn upload(&mut self, files: &[PathBuf]) -> Vec<RosterEvent> {
        let accepted = accepted_csv_files(files);
        let Some(path) = accepted.into_iter().next() else {
            tracing::debug!(event = "roster.upload.empty", offered = files.len());
            self.upload.error_message = Some(UPLOAD_EMPTY_MESSAGE.to_owned());
            return Vec::new();
        };

        tracing::info!(event = "roster.upload.started", path = %path.display());
        self.upload.error_message = None;
        self.upload.in_flight = Some(path.clone());
        vec![RosterEvent::Request(ApiRequest::ImportCsv { path })]
    }

    fn finish_import(&mut self, result: Result<Value, String>) -> Vec<RosterEvent> {
        self.upload.in_flight = None;
        match result {
            Ok(payload) => {
                self.upload.error_message = None;
                tracing::info!(event = "roster.upload.completed", response = %payload);
                let mut events = vec![
                    RosterEvent::Imported(payload),
                    RosterEvent::Notice(Notice::success(UPLOAD_SUCCESS_MESSAGE)),
                ];
                events.extend(self.load());
                events
            }
            Err(error) => {
                tracing::error!(event = "roster.upload.failed", error = %error);
                self.upload.error_message = Some(UPLOAD_FAILED_MESSAGE.to_owned());
                Vec::new()
            }
        }
    }
}
