//! Binary encoding of commit state for checkpoint snapshots.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::errors::{Result, XaSinkError};

pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    bincode::serialize(value).map_err(|e| XaSinkError::Serialization(e.to_string()))
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    bincode::deserialize(bytes).map_err(|e| XaSinkError::Serialization(e.to_string()))
}
