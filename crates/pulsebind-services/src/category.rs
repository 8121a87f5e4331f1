// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Channel → category lookup

use serde::{Deserialize, Serialize};

/// Category tag of a sample
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Unknown,
    Type1,
    Type2,
    Type3,
    Type4,
    Type5,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Unknown => "unknown",
            Category::Type1 => "type1",
            Category::Type2 => "type2",
            Category::Type3 => "type3",
            Category::Type4 => "type4",
            Category::Type5 => "type5",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CategoryError {
    #[error("Unrecognized channel identifier: {0}")]
    UnknownChannel(i64),
}

const CHANNEL_TABLE: [(i64, Category); 5] = [
    (0, Category::Type1),
    (1, Category::Type2),
    (3, Category::Type3),
    (5, Category::Type4),
    (7, Category::Type5),
];

/// Map a channel identifier to its category tag
pub fn classify_channel(channel: i64) -> Result<Category, CategoryError> {
    CHANNEL_TABLE
        .iter()
        .find(|(id, _)| *id == channel)
        .map(|(_, category)| *category)
        .ok_or(CategoryError::UnknownChannel(channel))
}
