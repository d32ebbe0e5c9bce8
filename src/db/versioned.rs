use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, AppResult};

/// Current on-disk schema for every persisted record
pub const SCHEMA_VERSION: u32 = 1;

/// Records written before versioning existed are bare JSON and read as version 0
pub const LEGACY_SCHEMA_VERSION: u32 = 0;

#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    schema_version: u32,
    saved_at: DateTime<Utc>,
    data: T,
}

/// A decoded record together with the schema version it was stored under
#[derive(Debug, PartialEq)]
pub struct Decoded<T> {
    pub data: T,
    pub schema_version: u32,
}

impl<T> Decoded<T> {
    pub fn needs_upgrade(&self) -> bool {
        self.schema_version < SCHEMA_VERSION
    }
}

/// Wraps `data` in the current envelope
pub fn encode<T: Serialize>(data: &T) -> AppResult<String> {
    let envelope = Envelope {
        schema_version: SCHEMA_VERSION,
        saved_at: Utc::now(),
        data,
    };
    serde_json::to_string(&envelope)
        .map_err(|e| AppError::Storage(format!("Failed to serialize record: {}", e)))
}

/// Reads either an envelope or a legacy bare record
pub fn decode<T: DeserializeOwned>(raw: &str) -> AppResult<Decoded<T>> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| AppError::Storage(format!("Corrupt record: {}", e)))?;

    let version = value
        .as_object()
        .and_then(|obj| obj.get("schema_version"))
        .and_then(Value::as_u64);

    match version {
        None => {
            let data = serde_json::from_value(value)
                .map_err(|e| AppError::Storage(format!("Unreadable legacy record: {}", e)))?;
            Ok(Decoded {
                data,
                schema_version: LEGACY_SCHEMA_VERSION,
            })
        }
        Some(v) if v > u64::from(SCHEMA_VERSION) => Err(AppError::Storage(format!(
            "Record uses schema version {} but this build only reads up to {}",
            v, SCHEMA_VERSION
        ))),
        Some(v) => {
            let envelope: Envelope<T> = serde_json::from_value(value)
                .map_err(|e| AppError::Storage(format!("Unreadable record: {}", e)))?;
            Ok(Decoded {
                data: envelope.data,
                schema_version: v as u32,
            })
        }
    }
}
