// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use roster_api::Client;
use roster_app::{ApiRequest, Record, RosterCommand};
use roster_testkit::FakeBackend;
use roster_tui::{AppRuntime, InternalEvent};
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::thread;
use time::OffsetDateTime;

/// Runs API requests against the configured server, one worker thread per
/// request.
pub struct HttpRuntime {
    client: Client,
    export_dir: PathBuf,
}

impl HttpRuntime {
    pub fn new(client: Client, export_dir: PathBuf) -> Self {
        Self { client, export_dir }
    }
}

impl AppRuntime for HttpRuntime {
    fn execute(&mut self, request: ApiRequest) -> RosterCommand {
        perform(&self.client, request)
    }

    fn spawn_request(&mut self, request: ApiRequest, tx: Sender<InternalEvent>) -> Result<()> {
        let client = self.client.clone();
        thread::Builder::new()
            .name("roster-api".to_owned())
            .spawn(move || {
                let command = perform(&client, request);
                if tx.send(InternalEvent::Api(command)).is_err() {
                    tracing::debug!(event = "roster.runtime.completion_dropped");
                }
            })?;
        Ok(())
    }

    fn export_pdf(&mut self, records: &[Record]) -> Result<PathBuf> {
        roster_export::write_records_pdf(records, &self.export_dir, OffsetDateTime::now_utc())
    }
}

/// Serves requests from an in-memory roster seeded with generated students.
pub struct DemoRuntime {
    backend: FakeBackend,
    export_dir: PathBuf,
}

impl DemoRuntime {
    pub fn seeded(seed: u64, count: usize, export_dir: PathBuf) -> Self {
        Self {
            backend: FakeBackend::seeded(seed, count),
            export_dir,
        }
    }
}

impl AppRuntime for DemoRuntime {
    fn execute(&mut self, request: ApiRequest) -> RosterCommand {
        tracing::debug!(event = "roster.runtime.demo_request", request = ?request);
        self.backend.handle(request)
    }

    fn export_pdf(&mut self, records: &[Record]) -> Result<PathBuf> {
        roster_export::write_records_pdf(records, &self.export_dir, OffsetDateTime::now_utc())
    }
}

fn perform(client: &Client, request: ApiRequest) -> RosterCommand {
    match request {
        ApiRequest::ListRecords { token } => RosterCommand::ListLoaded {
            token,
            result: client.list_records().map_err(|error| format!("{error:#}")),
        },
        ApiRequest::UpdateRecord(patch) => RosterCommand::SaveFinished {
            id: patch.id().clone(),
            result: client
                .update_record(&patch)
                .map_err(|error| format!("{error:#}")),
        },
        ApiRequest::DeleteRecord { id } => RosterCommand::DeleteFinished {
            result: client
                .delete_record(&id)
                .map_err(|error| format!("{error:#}")),
            id,
        },
        ApiRequest::ImportCsv { path } => RosterCommand::ImportFinished {
            result: client.import_csv(&path).map_err(|error| format!("{error:#}")),
        },
    }
}
