// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Sample identifier parsing.

Identifiers have the shape `<device>-<YYYY>-<MM>-<DD>-<HH>-<mm>-<SS>-<suffix...>`.
The strict parse extracts the device and the collection time; the looser
checks only gate what the binding boundary accepts.
*/

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

const SEPARATOR: char = '-';
const MIN_SEGMENTS: usize = 8;
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SampleIdError {
    #[error("Sample id '{id}' has {found} segments, expected at least {expected}")]
    TooFewSegments {
        id: String,
        found: usize,
        expected: usize,
    },

    #[error("Sample id '{id}' has an invalid timestamp '{timestamp}'")]
    InvalidTimestamp { id: String, timestamp: String },

    #[error("Sample id '{0}' has no device segment")]
    MissingDevice(String),
}

/// Device and collection time carried by a sample identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSampleId {
    pub device_ref: String,
    pub timestamp: NaiveDateTime,
}

impl ParsedSampleId {
    pub fn timestamp_utc(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self.timestamp)
    }
}

/// Strict parse: at least 8 segments and a valid date-time in segments 2..=7
pub fn parse(id: &str) -> Result<ParsedSampleId, SampleIdError> {
    let segments: Vec<&str> = id.split(SEPARATOR).collect();
    if segments.len() < MIN_SEGMENTS {
        return Err(SampleIdError::TooFewSegments {
            id: id.to_string(),
            found: segments.len(),
            expected: MIN_SEGMENTS,
        });
    }

    let timestamp = format!(
        "{}-{}-{} {}:{}:{}",
        segments[1], segments[2], segments[3], segments[4], segments[5], segments[6]
    );
    let parsed = NaiveDateTime::parse_from_str(&timestamp, TIMESTAMP_FORMAT).map_err(|_| {
        SampleIdError::InvalidTimestamp {
            id: id.to_string(),
            timestamp: timestamp.clone(),
        }
    })?;

    Ok(ParsedSampleId {
        device_ref: segments[0].to_string(),
        timestamp: parsed,
    })
}

/// Device segment of an id with at least two segments
pub fn device_ref(id: &str) -> Result<&str, SampleIdError> {
    match id.split_once(SEPARATOR) {
        Some((device, _)) => Ok(device),
        None => Err(SampleIdError::MissingDevice(id.to_string())),
    }
}

/// Loose acceptance check used at the binding boundary
pub fn is_valid(id: &str) -> bool {
    !id.trim().is_empty()
}
