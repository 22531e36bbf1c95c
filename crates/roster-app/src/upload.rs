// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::path::{Path, PathBuf};

pub const UPLOAD_EMPTY_MESSAGE: &str = "Please select a CSV file to upload.";
pub const UPLOAD_FAILED_MESSAGE: &str = "An error occurred while uploading the CSV file.";
pub const UPLOAD_SUCCESS_MESSAGE: &str = "CSV file uploaded successfully!";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UploadState {
    pub error_message: Option<String>,
    pub in_flight: Option<PathBuf>,
}

pub fn is_csv_path(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension.eq_ignore_ascii_case("csv"))
}

/// Keeps only `.csv` files, the same filter a drop zone applies before the
/// upload handler sees the selection.
pub fn accepted_csv_files(files: &[PathBuf]) -> Vec<PathBuf> {
    files
        .iter()
        .filter(|path| is_csv_path(path))
        .cloned()
        .collect()
}

/// Splits a typed selection into paths. Whitespace separates entries unless
/// the entry is wrapped in double quotes.
pub fn parse_selection(input: &str) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for ch in input.chars() {
        match ch {
            '"' => quoted = !quoted,
            ch if ch.is_whitespace() && !quoted => {
                if !current.is_empty() {
                    paths.push(PathBuf::from(std::mem::take(&mut current)));
                }
            }
            ch => current.push(ch),
        }
    }
    if !current.is_empty() {
        paths.push(PathBuf::from(current));
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::{accepted_csv_files, is_csv_path, parse_selection};
    use std::path::{Path, PathBuf};

    #[test]
    fn csv_filter_is_case_insensitive() {
        assert!(is_csv_path(Path::new("roster.CSV")));
        assert!(!is_csv_path(Path::new("roster.xlsx")));
        assert!(!is_csv_path(Path::new("csv")));

        let files = vec![PathBuf::from("a.txt"), PathBuf::from("b.csv")];
        assert_eq!(accepted_csv_files(&files), vec![PathBuf::from("b.csv")]);
    }

    #[test]
    fn selection_respects_quotes() {
        assert!(parse_selection("   ").is_empty());
        assert_eq!(
            parse_selection("one.csv \"two words.csv\""),
            vec![PathBuf::from("one.csv"), PathBuf::from("two words.csv")]
        );
    }
}
