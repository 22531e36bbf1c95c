// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use roster_app::{
    ApiRequest, FormField, NoticeLevel, RosterCommand, RosterEvent, RosterState,
    UPLOAD_FAILED_MESSAGE,
};
use roster_testkit::{FakeBackend, temp_csv_fixture};

/// Feeds every request the controller issues to the backend until the
/// controller stops asking for work. Returns all events seen along the way.
fn drive(
    state: &mut RosterState,
    backend: &mut FakeBackend,
    command: RosterCommand,
) -> Vec<RosterEvent> {
    let mut seen = Vec::new();
    let mut pending = vec![command];
    while let Some(next) = pending.pop() {
        for event in state.dispatch(next) {
            if let RosterEvent::Request(request) = &event {
                pending.push(backend.handle(request.clone()));
            }
            seen.push(event);
        }
    }
    seen
}

fn last_notice_level(events: &[RosterEvent]) -> Option<NoticeLevel> {
    events.iter().rev().find_map(|event| match event {
        RosterEvent::Notice(notice) => Some(notice.level),
        _ => None,
    })
}

#[test]
fn edit_save_round_trip_matches_server() {
    let mut backend = FakeBackend::seeded(21, 5);
    let mut state = RosterState::default();
    drive(&mut state, &mut backend, RosterCommand::Load);
    assert_eq!(state.records, backend.records());

    let target = state.records[2].clone();
    drive(&mut state, &mut backend, RosterCommand::BeginEdit(target.clone()));
    if let Some(form) = state.session_form_mut() {
        form.set_value(FormField::Grade, "A+");
        form.set_value(FormField::Age, "");
    }
    let events = drive(&mut state, &mut backend, RosterCommand::SubmitEdit);

    assert!(state.session.is_none());
    assert!(!state.loading);
    assert_eq!(state.records, backend.records());
    assert_eq!(state.records[2].grade.as_deref(), Some("A+"));
    assert_eq!(state.records[2].age, target.age);
    assert_eq!(last_notice_level(&events), Some(NoticeLevel::Success));
}

#[test]
fn failed_save_can_be_retried() {
    let mut backend = FakeBackend::seeded(5, 2);
    let mut state = RosterState::default();
    drive(&mut state, &mut backend, RosterCommand::Load);

    let target = state.records[0].clone();
    drive(&mut state, &mut backend, RosterCommand::BeginEdit(target));
    if let Some(form) = state.session_form_mut() {
        form.set_value(FormField::LastName, "Okafor");
    }

    backend.fail_next("cannot reach http://localhost:5000");
    let events = drive(&mut state, &mut backend, RosterCommand::SubmitEdit);
    assert_eq!(last_notice_level(&events), Some(NoticeLevel::Error));
    assert!(state.session.is_some());

    drive(&mut state, &mut backend, RosterCommand::SubmitEdit);
    assert!(state.session.is_none());
    assert_eq!(state.records[0].last_name.as_deref(), Some("Okafor"));
}

#[test]
fn csv_import_resyncs_snapshot() -> Result<()> {
    let mut backend = FakeBackend::seeded(9, 3);
    let mut state = RosterState::default();
    drive(&mut state, &mut backend, RosterCommand::Load);

    let (_dir, path) = temp_csv_fixture(10, 4)?;
    let events = drive(&mut state, &mut backend, RosterCommand::Upload(vec![path]));

    assert!(
        events
            .iter()
            .any(|event| matches!(event, RosterEvent::Imported(_)))
    );
    assert_eq!(state.records.len(), 7);
    assert_eq!(state.records, backend.records());
    assert!(state.upload.error_message.is_none());
    Ok(())
}

#[test]
fn import_of_bad_csv_sets_failure_message() -> Result<()> {
    let mut backend = FakeBackend::seeded(9, 1);
    let mut state = RosterState::default();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("broken.csv");
    std::fs::write(&path, "first_name,age\nAnn,old\n")?;

    let events = drive(&mut state, &mut backend, RosterCommand::Upload(vec![path]));
    assert!(
        !events
            .iter()
            .any(|event| matches!(event, RosterEvent::Request(ApiRequest::ListRecords { .. })))
    );
    assert_eq!(
        state.upload.error_message.as_deref(),
        Some(UPLOAD_FAILED_MESSAGE)
    );
    assert_eq!(backend.records().len(), 1);
    Ok(())
}
