// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Sample data wire format
//!
//! ```json
//! {"sample_id": "DEV1-2024-01-02-10-30-00-X", "data": "cmVhZGluZw==", "owner": "user-uuid"}
//! ```
//!
//! `data` is either a base64 string or a JSON array of byte values. `owner` is
//! optional.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use pulsebind_registry::OwnerRef;
use serde::{Deserialize, Deserializer, Serialize};

use crate::{IngestError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleDataMessage {
    pub sample_id: String,
    #[serde(deserialize_with = "deserialize_data")]
    pub data: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<OwnerRef>,
}

impl SampleDataMessage {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let message: SampleDataMessage =
            serde_json::from_slice(bytes).map_err(|e| IngestError::Decode(e.to_string()))?;
        if message.sample_id.trim().is_empty() {
            return Err(IngestError::Decode("sample_id is empty".to_string()));
        }
        Ok(message)
    }

    /// JSON encoding with `data` as a byte array
    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| IngestError::Encode(e.to_string()))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DataField {
    Base64(String),
    Bytes(Vec<u8>),
}

fn deserialize_data<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    match DataField::deserialize(deserializer)? {
        DataField::Bytes(bytes) => Ok(bytes),
        DataField::Base64(encoded) => STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| serde::de::Error::custom(format!("invalid base64 data: {}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_base64_data() {
        let message = SampleDataMessage::decode(
            br#"{"sample_id":"DEV1-2024-01-02-10-30-00-X","data":"cmVhZGluZw=="}"#,
        )
        .unwrap();
        assert_eq!(message.sample_id, "DEV1-2024-01-02-10-30-00-X");
        assert_eq!(message.data, b"reading".to_vec());
        assert!(message.owner.is_none());
    }

    #[test]
    fn test_decode_byte_array_with_owner() {
        let message =
            SampleDataMessage::decode(br#"{"sample_id":"S1","data":[1,2,3],"owner":"user-a"}"#)
                .unwrap();
        assert_eq!(message.data, vec![1, 2, 3]);
        assert_eq!(message.owner, Some(OwnerRef::new("user-a")));
    }

    #[test]
    fn test_encode_then_decode() {
        let message = SampleDataMessage {
            sample_id: "S1".to_string(),
            data: vec![0, 255],
            owner: None,
        };
        let decoded = SampleDataMessage::decode(&message.encode().unwrap()).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn test_malformed_messages() {
        for raw in [
            &b"not json"[..],
            br#"{"data":"AA=="}"#,
            br#"{"sample_id":"S1"}"#,
            br#"{"sample_id":"S1","data":"%%%"}"#,
            br#"{"sample_id":"  ","data":[1]}"#,
            br#"{"sample_id":"S1","data":[300]}"#,
        ] {
            assert!(
                matches!(SampleDataMessage::decode(raw), Err(IngestError::Decode(_))),
                "expected decode failure for {}",
                String::from_utf8_lossy(raw)
            );
        }
    }
}
