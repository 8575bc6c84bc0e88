//! Record encoding
//!
//! Records are JSON objects tagged with `schema_version`. Decoding ignores
//! unknown fields and relies on `#[serde(default)]` for missing ones, so a
//! record written before a field existed still loads.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Schema version written with every record.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Serialize)]
struct Tagged<'a, T> {
    schema_version: u32,
    #[serde(flatten)]
    record: &'a T,
}

#[derive(Deserialize)]
struct Untagged<T> {
    #[serde(default = "initial_version")]
    schema_version: u32,
    #[serde(flatten)]
    record: T,
}

fn initial_version() -> u32 {
    1
}

/// Encode a record for storage
pub fn encode<T: Serialize>(record: &T) -> Result<Vec<u8>> {
    let bytes = serde_json::to_vec(&Tagged {
        schema_version: SCHEMA_VERSION,
        record,
    })?;
    Ok(bytes)
}

/// Decode a stored record
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let untagged: Untagged<T> = serde_json::from_slice(bytes)?;
    if untagged.schema_version > SCHEMA_VERSION {
        return Err(Error::Serialization(format!(
            "unsupported schema version {} (max {})",
            untagged.schema_version, SCHEMA_VERSION
        )));
    }
    Ok(untagged.record)
}
