// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::fmt;

/// Server-assigned student identity. Opaque to the client beyond equality and
/// its place in request paths; the wire form (number or string) is kept so it
/// goes back to the server exactly as it arrived.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(WireId);

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
enum WireId {
    Number(i64),
    Text(String),
}

impl RecordId {
    pub const fn new(value: i64) -> Self {
        Self(WireId::Number(value))
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self(WireId::Text(value.into()))
    }

    /// The numeric value, for ids the server issued as JSON numbers.
    pub const fn as_number(&self) -> Option<i64> {
        match self.0 {
            WireId::Number(value) => Some(value),
            WireId::Text(_) => None,
        }
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        Self::new(value)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self::text(value)
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self::text(value)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            WireId::Number(value) => write!(f, "{value}"),
            WireId::Text(value) => f.write_str(value),
        }
    }
}
