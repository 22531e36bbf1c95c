// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table};
use roster_app::{
    ApiRequest, EXPORT_COLUMNS, EditSession, FormField, Notice, NoticeLevel, Record,
    RosterCommand, RosterEvent, RosterState, parse_selection,
};
use std::io;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

const UPLOAD_PANEL_WIDTH: u16 = 38;
const DEFAULT_TOAST_DURATION: Duration = Duration::from_secs(5);

/// Work the shell hands off: API calls and PDF export. `execute` performs a
/// request to completion; `spawn_request` may run it elsewhere as long as the
/// completion arrives on `tx`.
pub trait AppRuntime {
    fn execute(&mut self, request: ApiRequest) -> RosterCommand;
    fn spawn_request(&mut self, request: ApiRequest, tx: Sender<InternalEvent>) -> Result<()> {
        let command = self.execute(request);
        tx.send(InternalEvent::Api(command))
            .map_err(|_| anyhow!("api event channel closed"))?;
        Ok(())
    }
    fn export_pdf(&mut self, records: &[Record]) -> Result<PathBuf>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
    Api(RosterCommand),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShellOptions {
    pub toast_duration: Duration,
}

impl Default for ShellOptions {
    fn default() -> Self {
        Self {
            toast_duration: DEFAULT_TOAST_DURATION,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Focus {
    #[default]
    Table,
    UploadInput,
}

#[derive(Debug, Clone, PartialEq, Default)]
struct ViewData {
    focus: Focus,
    selected_row: usize,
    upload_input: String,
    form_field: usize,
    help_visible: bool,
    status: Option<Notice>,
    status_token: u64,
    toast_duration: Duration,
}

impl ViewData {
    fn new(options: ShellOptions) -> Self {
        Self {
            toast_duration: options.toast_duration,
            ..Self::default()
        }
    }
}

pub fn run_app<R: AppRuntime>(
    state: &mut RosterState,
    runtime: &mut R,
    options: ShellOptions,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::new(options);
    let (internal_tx, internal_rx) = mpsc::channel();

    dispatch(
        state,
        runtime,
        &mut view_data,
        &internal_tx,
        RosterCommand::Load,
    );

    let mut result = Ok(());
    loop {
        process_internal_events(state, runtime, &mut view_data, &internal_tx, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        match event::poll(Duration::from_millis(120)) {
            Ok(false) => continue,
            Ok(true) => {}
            Err(error) => {
                result = Err(error).context("poll event");
                break;
            }
        }
        match event::read() {
            Ok(Event::Key(key)) => {
                if handle_key_event(state, runtime, &mut view_data, &internal_tx, key) {
                    break;
                }
            }
            Ok(_) => {}
            Err(error) => {
                result = Err(error).context("read event");
                break;
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn process_internal_events<R: AppRuntime>(
    state: &mut RosterState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                view_data.status = None;
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::Api(command) => {
                dispatch(state, runtime, view_data, tx, command);
            }
        }
    }
}

fn dispatch<R: AppRuntime>(
    state: &mut RosterState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    command: RosterCommand,
) {
    let events = state.dispatch(command);
    apply_events(state, runtime, view_data, tx, events);
}

fn apply_events<R: AppRuntime>(
    state: &mut RosterState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    events: Vec<RosterEvent>,
) {
    for event in events {
        match event {
            RosterEvent::Request(request) => {
                if let Err(error) = runtime.spawn_request(request, tx.clone()) {
                    tracing::error!(event = "roster.tui.request_failed", error = %error);
                    emit_status(
                        view_data,
                        tx,
                        Notice::error(format!("request failed: {error}")),
                    );
                }
            }
            RosterEvent::SnapshotReplaced { .. } | RosterEvent::RecordRemoved(_) => {
                clamp_selection(state, view_data);
            }
            RosterEvent::SessionOpened(_) => {
                view_data.form_field = 0;
                view_data.focus = Focus::Table;
            }
            RosterEvent::Imported(payload) => {
                tracing::info!(event = "roster.tui.imported", payload = %payload);
            }
            RosterEvent::Notice(notice) => emit_status(view_data, tx, notice),
            RosterEvent::LoadingChanged(_)
            | RosterEvent::StaleResponseIgnored { .. }
            | RosterEvent::RecordUpdated(_)
            | RosterEvent::SessionClosed => {}
        }
    }
}

fn clamp_selection(state: &RosterState, view_data: &mut ViewData) {
    view_data.selected_row = view_data
        .selected_row
        .min(state.records.len().saturating_sub(1));
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64, after: Duration) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(after);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(view_data: &mut ViewData, internal_tx: &Sender<InternalEvent>, notice: Notice) {
    view_data.status = Some(notice);
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token, view_data.toast_duration);
}

fn handle_key_event<R: AppRuntime>(
    state: &mut RosterState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if view_data.help_visible {
        if key.code == KeyCode::Esc || key.code == KeyCode::Char('?') {
            view_data.help_visible = false;
        }
        return false;
    }

    if state.session.is_some() {
        handle_form_key(state, runtime, view_data, internal_tx, key);
        return false;
    }

    if view_data.focus == Focus::UploadInput {
        handle_upload_key(state, runtime, view_data, internal_tx, key);
        return false;
    }

    match (key.code, key.modifiers) {
        (KeyCode::Char('j') | KeyCode::Down, _) => move_selection(state, view_data, 1),
        (KeyCode::Char('k') | KeyCode::Up, _) => move_selection(state, view_data, -1),
        (KeyCode::Char('g') | KeyCode::Home, _) => view_data.selected_row = 0,
        (KeyCode::Char('G') | KeyCode::End, _) => {
            view_data.selected_row = state.records.len().saturating_sub(1);
        }
        (KeyCode::Char('r'), KeyModifiers::NONE) => {
            dispatch(state, runtime, view_data, internal_tx, RosterCommand::Load);
        }
        (KeyCode::Char('e') | KeyCode::Enter, _) => {
            let Some(record) = state.records.get(view_data.selected_row).cloned() else {
                emit_status(view_data, internal_tx, Notice::error("no record selected"));
                return false;
            };
            dispatch(
                state,
                runtime,
                view_data,
                internal_tx,
                RosterCommand::BeginEdit(record),
            );
        }
        (KeyCode::Char('d'), KeyModifiers::NONE) => {
            let Some(id) = state
                .records
                .get(view_data.selected_row)
                .map(|row| row.id.clone())
            else {
                emit_status(view_data, internal_tx, Notice::error("no record selected"));
                return false;
            };
            dispatch(
                state,
                runtime,
                view_data,
                internal_tx,
                RosterCommand::Delete(id),
            );
        }
        (KeyCode::Char('u'), KeyModifiers::NONE) => view_data.focus = Focus::UploadInput,
        (KeyCode::Char('p'), KeyModifiers::NONE) => export_pdf(state, runtime, view_data, internal_tx),
        (KeyCode::Char('?'), _) => view_data.help_visible = true,
        _ => {}
    }
    false
}

fn move_selection(state: &RosterState, view_data: &mut ViewData, delta: isize) {
    let last = state.records.len().saturating_sub(1);
    view_data.selected_row = view_data.selected_row.saturating_add_signed(delta).min(last);
}

fn export_pdf<R: AppRuntime>(
    state: &RosterState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let notice = match runtime.export_pdf(&state.records) {
        Ok(path) => Notice::success(format!(
            "exported {} records to {}",
            state.records.len(),
            path.display()
        )),
        Err(error) => {
            tracing::error!(event = "roster.export.failed", error = %error);
            Notice::error(format!("export failed: {error}; check [export].dir"))
        }
    };
    emit_status(view_data, internal_tx, notice);
}

fn handle_form_key<R: AppRuntime>(
    state: &mut RosterState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let field = FormField::ALL[view_data.form_field % FormField::ALL.len()];
    match (key.code, key.modifiers) {
        (KeyCode::Esc, _) => {
            dispatch(state, runtime, view_data, internal_tx, RosterCommand::CancelEdit);
        }
        (KeyCode::Tab, _) | (KeyCode::Down, _) => {
            view_data.form_field = (view_data.form_field + 1) % FormField::ALL.len();
        }
        (KeyCode::BackTab, _) | (KeyCode::Up, _) => {
            view_data.form_field =
                (view_data.form_field + FormField::ALL.len() - 1) % FormField::ALL.len();
        }
        (KeyCode::Enter, _) | (KeyCode::Char('s'), KeyModifiers::CONTROL) => {
            if state.session.as_ref().is_some_and(|session| session.save_in_flight) {
                emit_status(view_data, internal_tx, Notice::error("save already in progress"));
                return;
            }
            dispatch(state, runtime, view_data, internal_tx, RosterCommand::SubmitEdit);
        }
        (KeyCode::Backspace, _) => {
            if let Some(form) = state.session_form_mut() {
                form.pop_char(field);
            }
        }
        (KeyCode::Char(ch), modifiers) if !modifiers.contains(KeyModifiers::CONTROL) => {
            let accepted = state
                .session_form_mut()
                .is_some_and(|form| form.push_char(field, ch));
            if !accepted && field == FormField::Age {
                emit_status(
                    view_data,
                    internal_tx,
                    Notice::error("age accepts digits only"),
                );
            }
        }
        _ => {}
    }
}

fn handle_upload_key<R: AppRuntime>(
    state: &mut RosterState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    match key.code {
        KeyCode::Esc => view_data.focus = Focus::Table,
        KeyCode::Enter => {
            if state.upload.in_flight.is_some() {
                emit_status(view_data, internal_tx, Notice::error("upload already in progress"));
                return;
            }
            let files = parse_selection(&view_data.upload_input);
            dispatch(
                state,
                runtime,
                view_data,
                internal_tx,
                RosterCommand::Upload(files),
            );
            if state.upload.error_message.is_none() {
                view_data.upload_input.clear();
                view_data.focus = Focus::Table;
            }
        }
        KeyCode::Backspace => {
            view_data.upload_input.pop();
        }
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            view_data.upload_input.push(ch);
        }
        _ => {}
    }
}

fn render(frame: &mut ratatui::Frame<'_>, state: &RosterState, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)])
        .split(frame.area());
    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(UPLOAD_PANEL_WIDTH), Constraint::Min(1)])
        .split(layout[0]);

    let upload_style = if view_data.focus == Focus::UploadInput {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let upload = Paragraph::new(render_upload_panel_text(state, view_data)).block(
        Block::default()
            .title("upload csv")
            .borders(Borders::ALL)
            .border_style(upload_style),
    );
    frame.render_widget(upload, body[0]);

    render_table(frame, body[1], state, view_data);

    let status_style = match view_data.status.as_ref().map(|notice| notice.level) {
        Some(NoticeLevel::Success) => Style::default().fg(Color::Green),
        Some(NoticeLevel::Error) => Style::default().fg(Color::Red),
        None => Style::default().fg(Color::Yellow),
    };
    let status = Paragraph::new(status_text(state, view_data))
        .style(status_style)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, layout[1]);

    if let Some(session) = &state.session {
        let area = centered_rect(60, 45, frame.area());
        frame.render_widget(Clear, area);
        let form = Paragraph::new(render_form_text(session, view_data.form_field)).block(
            Block::default()
                .title(form_title(session))
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::Cyan)),
        );
        frame.render_widget(form, area);
    }

    if view_data.help_visible {
        let area = centered_rect(70, 50, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn render_table(frame: &mut ratatui::Frame<'_>, area: Rect, state: &RosterState, view_data: &ViewData) {
    if state.loading && state.records.is_empty() {
        let loading = Paragraph::new("Loading...")
            .block(Block::default().title("students").borders(Borders::ALL));
        frame.render_widget(loading, area);
        return;
    }

    let header = Row::new(EXPORT_COLUMNS.iter().map(|label| {
        Cell::from(*label).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    }));

    let editing = state.session.as_ref().map(EditSession::record_id);
    let rows = state.records.iter().enumerate().map(|(index, record)| {
        let mut style = Style::default();
        if state.is_delete_pending(&record.id) {
            style = style
                .fg(Color::DarkGray)
                .add_modifier(Modifier::CROSSED_OUT);
        }
        if editing == Some(&record.id) {
            style = style.fg(Color::Cyan);
        }
        if index == view_data.selected_row && view_data.focus == Focus::Table {
            style = style.bg(Color::DarkGray).add_modifier(Modifier::BOLD);
        }
        Row::new(record.export_row().map(Cell::from)).style(style)
    });

    let widths = [
        Constraint::Length(12),
        Constraint::Min(10),
        Constraint::Min(10),
        Constraint::Length(5),
        Constraint::Length(8),
    ];
    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(
            Block::default()
                .title(table_title(state))
                .borders(Borders::ALL),
        );
    frame.render_widget(table, area);
}

fn table_title(state: &RosterState) -> String {
    let mut title = format!("students ({})", state.records.len());
    if state.loading {
        title.push_str(" refreshing...");
    }
    title
}

fn render_upload_panel_text(state: &RosterState, view_data: &ViewData) -> String {
    let cursor = if view_data.focus == Focus::UploadInput {
        "_"
    } else {
        ""
    };
    let mut lines = vec![
        "CSV file path:".to_owned(),
        format!("> {}{cursor}", view_data.upload_input),
        String::new(),
    ];
    if let Some(path) = &state.upload.in_flight {
        lines.push(format!("uploading {}...", path.display()));
    } else if view_data.focus == Focus::UploadInput {
        lines.push("enter upload | esc back".to_owned());
    } else {
        lines.push("u to choose a file".to_owned());
    }
    if let Some(message) = &state.upload.error_message {
        lines.push(String::new());
        lines.push(message.clone());
    }
    lines.join("\n")
}

fn form_title(session: &EditSession) -> String {
    let name = session.form.source().display_name();
    if session.save_in_flight {
        format!("edit {name} (saving...)")
    } else {
        format!("edit {name}")
    }
}

fn render_form_text(session: &EditSession, field_index: usize) -> String {
    let focused = field_index % FormField::ALL.len();
    let mut lines = FormField::ALL
        .iter()
        .enumerate()
        .map(|(index, field)| {
            let marker = if index == focused { ">" } else { " " };
            let cursor = if index == focused { "_" } else { "" };
            format!(
                "{marker} {:<11} {}{cursor}",
                format!("{}:", field.label()),
                session.form.value(*field)
            )
        })
        .collect::<Vec<_>>();
    lines.push(String::new());
    lines.push("tab/shift+tab field | enter or ctrl+s save | esc cancel".to_owned());
    lines.join("\n")
}

fn status_text(state: &RosterState, view_data: &ViewData) -> String {
    let hints = if state.session.is_some() {
        "FORM | tab field | enter save | esc cancel | ctrl+q"
    } else if view_data.focus == Focus::UploadInput {
        "UPLOAD | enter upload | esc back | ctrl+q"
    } else {
        "j/k move | r reload | e edit | d delete | u upload | p pdf | ? help | ctrl+q"
    };
    match &view_data.status {
        Some(notice) => format!("{} | {hints}", notice.text),
        None => hints.to_owned(),
    }
}

fn help_overlay_text() -> &'static str {
    "global: ctrl+q quit | ? help\n\
table: j/k or up/down move | g/G first/last | r reload | e or enter edit | d delete | p export pdf\n\
upload: u focus path input | type path(s), quote paths with spaces | enter upload | esc back\n\
form: tab/shift+tab field | type to edit (age digits only) | enter or ctrl+s save | esc cancel"
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::{
        AppRuntime, Focus, InternalEvent, ShellOptions, ViewData, handle_key_event,
        help_overlay_text, process_internal_events, render_form_text, render_upload_panel_text,
        status_text,
    };
    use anyhow::{Result, bail};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use roster_app::{
        ApiRequest, FormField, NoticeLevel, Record, RosterCommand, RosterState,
        UPLOAD_EMPTY_MESSAGE, UPLOAD_FAILED_MESSAGE,
    };
    use roster_testkit::{FakeBackend, temp_csv_fixture};
    use std::path::PathBuf;
    use std::sync::mpsc;
    use std::time::Duration;

    struct TestRuntime {
        backend: FakeBackend,
        requests: Vec<ApiRequest>,
        exported: Vec<usize>,
        export_fails: bool,
    }

    impl TestRuntime {
        fn seeded(count: usize) -> Self {
            Self {
                backend: FakeBackend::seeded(17, count),
                requests: Vec::new(),
                exported: Vec::new(),
                export_fails: false,
            }
        }
    }

    impl AppRuntime for TestRuntime {
        fn execute(&mut self, request: ApiRequest) -> RosterCommand {
            self.requests.push(request.clone());
            self.backend.handle(request)
        }

        fn export_pdf(&mut self, records: &[Record]) -> Result<PathBuf> {
            if self.export_fails {
                bail!("permission denied");
            }
            self.exported.push(records.len());
            Ok(PathBuf::from("/tmp/student_records.pdf"))
        }
    }

    struct Harness {
        state: RosterState,
        runtime: TestRuntime,
        view_data: ViewData,
        tx: mpsc::Sender<InternalEvent>,
        rx: mpsc::Receiver<InternalEvent>,
    }

    impl Harness {
        fn loaded(count: usize) -> Self {
            let (tx, rx) = mpsc::channel();
            let mut harness = Self {
                state: RosterState::default(),
                runtime: TestRuntime::seeded(count),
                view_data: ViewData::new(ShellOptions {
                    toast_duration: Duration::from_secs(60),
                }),
                tx,
                rx,
            };
            harness.press(KeyEvent::new(KeyCode::Char('r'), KeyModifiers::NONE));
            harness
        }

        fn press(&mut self, key: KeyEvent) -> bool {
            let quit = handle_key_event(
                &mut self.state,
                &mut self.runtime,
                &mut self.view_data,
                &self.tx,
                key,
            );
            process_internal_events(
                &mut self.state,
                &mut self.runtime,
                &mut self.view_data,
                &self.tx,
                &self.rx,
            );
            quit
        }

        fn char(&mut self, ch: char) {
            self.press(KeyEvent::new(KeyCode::Char(ch), KeyModifiers::NONE));
        }

        fn code(&mut self, code: KeyCode) {
            self.press(KeyEvent::new(code, KeyModifiers::NONE));
        }

        fn type_text(&mut self, text: &str) {
            for ch in text.chars() {
                self.char(ch);
            }
        }
    }

    #[test]
    fn ctrl_q_quits() {
        let mut harness = Harness::loaded(1);
        assert!(harness.press(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL)));
        assert!(!harness.press(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE)));
    }

    #[test]
    fn reload_key_fetches_roster() {
        let harness = Harness::loaded(4);
        assert_eq!(harness.state.records.len(), 4);
        assert!(!harness.state.loading);
        assert_eq!(
            harness.runtime.requests,
            vec![ApiRequest::ListRecords { token: 1 }]
        );
    }

    #[test]
    fn selection_is_clamped_to_rows() {
        let mut harness = Harness::loaded(3);
        for _ in 0..5 {
            harness.char('j');
        }
        assert_eq!(harness.view_data.selected_row, 2);
        harness.char('g');
        assert_eq!(harness.view_data.selected_row, 0);
        harness.char('k');
        assert_eq!(harness.view_data.selected_row, 0);
        harness.char('G');
        assert_eq!(harness.view_data.selected_row, 2);
    }

    #[test]
    fn edit_and_save_updates_row_and_closes_form() {
        let mut harness = Harness::loaded(2);
        harness.char('j');
        harness.char('e');
        assert!(harness.state.session.is_some());

        harness.code(KeyCode::Tab);
        harness.code(KeyCode::Tab);
        for _ in 0..3 {
            harness.code(KeyCode::Backspace);
        }
        harness.type_text("9x");
        harness.code(KeyCode::Enter);

        assert!(harness.state.session.is_none());
        assert_eq!(harness.state.records[1].age, Some(9));
        assert_eq!(harness.runtime.backend.records()[1].age, Some(9));
        let status = harness.view_data.status.as_ref().expect("status expected");
        assert_eq!(status.level, NoticeLevel::Success);
        assert_eq!(status.text, "Student updated successfully");
    }

    #[test]
    fn typing_a_letter_into_age_reports_error() {
        let mut harness = Harness::loaded(1);
        harness.code(KeyCode::Enter);
        harness.code(KeyCode::Tab);
        harness.code(KeyCode::Tab);
        harness.char('z');

        let status = harness.view_data.status.as_ref().expect("status expected");
        assert_eq!(status.level, NoticeLevel::Error);
        let form = &harness.state.session.as_ref().expect("form open").form;
        assert!(form.value(FormField::Age).chars().all(|ch| ch.is_ascii_digit()));
    }

    #[test]
    fn esc_cancels_edit_without_request() {
        let mut harness = Harness::loaded(1);
        let before = harness.state.records.clone();
        harness.char('e');
        harness.type_text("Zed");
        harness.code(KeyCode::Esc);
        assert!(harness.state.session.is_none());
        assert_eq!(harness.runtime.requests.len(), 1);
        assert_eq!(harness.state.records, before);
    }

    #[test]
    fn delete_removes_selected_row() {
        let mut harness = Harness::loaded(3);
        let doomed = harness.state.records[1].id.clone();
        harness.char('j');
        harness.char('d');

        assert_eq!(harness.state.records.len(), 2);
        assert!(harness.state.records.iter().all(|row| row.id != doomed));
        assert_eq!(
            harness.view_data.status.as_ref().map(|notice| notice.text.as_str()),
            Some("Student deleted successfully!")
        );
    }

    #[test]
    fn failed_delete_keeps_row_and_shows_error() {
        let mut harness = Harness::loaded(2);
        harness.runtime.backend.fail_next("server error (500): boom");
        harness.char('d');

        assert_eq!(harness.state.records.len(), 2);
        let status = harness.view_data.status.as_ref().expect("status expected");
        assert_eq!(status.level, NoticeLevel::Error);
        assert!(status.text.contains("boom"));
    }

    #[test]
    fn empty_upload_shows_validation_message() {
        let mut harness = Harness::loaded(1);
        harness.char('u');
        assert_eq!(harness.view_data.focus, Focus::UploadInput);
        harness.type_text("notes.txt");
        harness.code(KeyCode::Enter);

        assert_eq!(
            harness.state.upload.error_message.as_deref(),
            Some(UPLOAD_EMPTY_MESSAGE)
        );
        assert_eq!(harness.runtime.requests.len(), 1);
        assert!(
            render_upload_panel_text(&harness.state, &harness.view_data)
                .contains(UPLOAD_EMPTY_MESSAGE)
        );
    }

    #[test]
    fn csv_upload_imports_and_reloads() -> Result<()> {
        let mut harness = Harness::loaded(2);
        let (_dir, path) = temp_csv_fixture(5, 3)?;
        harness.char('u');
        harness.type_text(&format!("\"{}\"", path.display()));
        harness.code(KeyCode::Enter);

        assert_eq!(harness.view_data.focus, Focus::Table);
        assert!(harness.view_data.upload_input.is_empty());
        assert_eq!(harness.state.records.len(), 5);
        assert!(matches!(
            harness.runtime.requests.last(),
            Some(ApiRequest::ListRecords { .. })
        ));
        Ok(())
    }

    #[test]
    fn retried_upload_drops_previous_failure() -> Result<()> {
        let mut harness = Harness::loaded(2);
        let (_dir, path) = temp_csv_fixture(5, 3)?;
        let selection = format!("\"{}\"", path.display());

        harness.runtime.backend.fail_next("server error (400): bad csv");
        harness.char('u');
        harness.type_text(&selection);
        harness.code(KeyCode::Enter);
        assert_eq!(
            harness.state.upload.error_message.as_deref(),
            Some(UPLOAD_FAILED_MESSAGE)
        );

        harness.char('u');
        harness.type_text(&selection);
        harness.code(KeyCode::Enter);
        assert_eq!(harness.view_data.focus, Focus::Table);
        assert!(harness.state.upload.error_message.is_none());
        assert!(
            !render_upload_panel_text(&harness.state, &harness.view_data)
                .contains(UPLOAD_FAILED_MESSAGE)
        );
        assert_eq!(harness.state.records.len(), 5);
        Ok(())
    }

    #[test]
    fn export_reports_path_or_error() {
        let mut harness = Harness::loaded(3);
        harness.char('p');
        assert_eq!(harness.runtime.exported, vec![3]);
        let status = harness.view_data.status.as_ref().expect("status expected");
        assert!(status.text.contains("student_records.pdf"));

        harness.runtime.export_fails = true;
        harness.char('p');
        let status = harness.view_data.status.as_ref().expect("status expected");
        assert!(status.text.starts_with("export failed: permission denied"));
    }

    #[test]
    fn stale_status_clear_is_ignored() {
        let mut harness = Harness::loaded(1);
        harness.char('p');
        let token = harness.view_data.status_token;
        harness
            .tx
            .send(InternalEvent::ClearStatus { token: token - 1 })
            .expect("send should succeed");
        harness.code(KeyCode::Null);
        assert!(harness.view_data.status.is_some());

        harness
            .tx
            .send(InternalEvent::ClearStatus { token })
            .expect("send should succeed");
        harness.code(KeyCode::Null);
        assert!(harness.view_data.status.is_none());
    }

    #[test]
    fn help_overlay_swallows_keys_until_closed() {
        let mut harness = Harness::loaded(2);
        harness.char('?');
        assert!(harness.view_data.help_visible);
        harness.char('d');
        assert_eq!(harness.state.records.len(), 2);
        harness.code(KeyCode::Esc);
        assert!(!harness.view_data.help_visible);
        assert!(help_overlay_text().contains("ctrl+s"));
    }

    #[test]
    fn form_text_marks_focused_field() {
        let mut harness = Harness::loaded(1);
        harness.char('e');
        harness.code(KeyCode::BackTab);
        let session = harness.state.session.as_ref().expect("form open");
        let text = render_form_text(session, harness.view_data.form_field);
        let grade_line = text
            .lines()
            .find(|line| line.contains("Grade:"))
            .expect("grade line");
        assert!(grade_line.starts_with('>'));
        assert!(status_text(&harness.state, &harness.view_data).starts_with("FORM"));
    }

    #[test]
    fn edit_with_empty_table_reports_error() {
        let mut harness = Harness::loaded(0);
        harness.char('e');
        assert!(harness.state.session.is_none());
        assert_eq!(
            harness.view_data.status.as_ref().map(|notice| notice.level),
            Some(NoticeLevel::Error)
        );
    }
}
