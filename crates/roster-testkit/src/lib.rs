// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod backend;

pub use backend::{FakeBackend, records_from_csv};

use anyhow::{Context, Result};
use roster_app::{Record, RecordId};
use std::fs;
use std::path::{Path, PathBuf};

const FIRST_NAMES: [&str; 20] = [
    "Avery", "Jordan", "Taylor", "Riley", "Morgan", "Casey", "Alex", "Quinn", "Parker", "Drew",
    "Kai", "Elliot", "Robin", "Cameron", "Hayden", "Rowan", "Amara", "Noor", "Mateo", "Sana",
];
const LAST_NAMES: [&str; 18] = [
    "Walker", "Martin", "Hill", "Evans", "Lopez", "Gray", "Ward", "Young", "Diaz", "Reed",
    "Campbell", "Turner", "Flores", "Bennett", "Price", "Morris", "Foster", "Brooks",
];
const GRADE_LABELS: [&str; 8] = ["A", "A-", "B+", "B", "B-", "C+", "C", "D"];

const MIN_AGE: u32 = 5;
const MAX_AGE: u32 = 18;
const REGISTRATION_BASE: i64 = 24_000;

pub const CSV_HEADER: &str = "student_id,first_name,last_name,age,grade";

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

/// Generates plausible student rows from a fixed seed so fixtures stay stable
/// across runs.
#[derive(Debug, Clone)]
pub struct StudentFaker {
    rng: DeterministicRng,
}

impl StudentFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
        }
    }

    pub fn record(&mut self, id: i64) -> Record {
        let span = (MAX_AGE - MIN_AGE + 1) as usize;
        Record {
            id: RecordId::new(id),
            student_id: Some(format!("REG-{}", REGISTRATION_BASE + id)),
            first_name: Some(self.pick(&FIRST_NAMES).to_owned()),
            last_name: Some(self.pick(&LAST_NAMES).to_owned()),
            age: Some(MIN_AGE + self.rng.int_n(span) as u32),
            grade: Some(self.pick(&GRADE_LABELS).to_owned()),
        }
    }

    /// Records with ids `1..=count`.
    pub fn roster(&mut self, count: usize) -> Vec<Record> {
        (1..=count as i64).map(|id| self.record(id)).collect()
    }

    fn pick<'a>(&mut self, values: &'a [&'a str]) -> &'a str {
        values[self.rng.int_n(values.len())]
    }
}

pub fn csv_text(records: &[Record]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for record in records {
        let cells = record
            .export_row()
            .iter()
            .map(|cell| csv_cell(cell))
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(&cells);
        out.push('\n');
    }
    out
}

pub fn write_csv_fixture(dir: &Path, name: &str, records: &[Record]) -> Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, csv_text(records))
        .with_context(|| format!("write CSV fixture {}", path.display()))?;
    Ok(path)
}

pub fn temp_csv_fixture(seed: u64, count: usize) -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let records = StudentFaker::new(seed).roster(count);
    let path = write_csv_fixture(dir.path(), "students.csv", &records)?;
    Ok((dir, path))
}

fn csv_cell(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_owned()
    }
}
