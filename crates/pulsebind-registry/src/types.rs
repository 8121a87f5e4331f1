// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Core types for rendezvous registration

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque reference to the identity that owns a session
///
/// The core never interprets the value; it is supplied by the identity
/// provider (a user UUID in practice) and only compared for equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerRef(String);

impl OwnerRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OwnerRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OwnerRef {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for OwnerRef {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A pending rendezvous
///
/// Exists only between `register` and the first of `claim` or expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RendezvousEntry {
    /// Session / sample identifier
    pub id: String,
    /// Identity that registered the session
    pub owner: OwnerRef,
    /// Wall-clock registration time
    pub created_at: DateTime<Utc>,
    /// Wall-clock time after which the entry is no longer claimable
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_ref_is_transparent_in_json() {
        let owner = OwnerRef::new("0b7c6f1e-user");
        assert_eq!(serde_json::to_string(&owner).unwrap(), "\"0b7c6f1e-user\"");

        let parsed: OwnerRef = serde_json::from_str("\"someone\"").unwrap();
        assert_eq!(parsed, OwnerRef::from("someone"));
        assert_eq!(parsed.to_string(), "someone");
    }
}
