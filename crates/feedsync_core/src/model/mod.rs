//! Entity model: the typed shapes stored locally and remotely.
//!
//! Every entity carries explicit `to_fields`/`from_fields` conversions
//! between the struct and its document form (camelCase field names, as
//! the remote schema spells them), validated by round-trip tests in
//! each entity module. The same document form is stored in the local
//! cache, so one codec serves both sides.

mod comment;
mod follow;
mod post;
mod profile;
mod restaurant;

pub use comment::Comment;
pub use follow::Follow;
pub use post::{Post, PostStatus};
pub use profile::UserProfile;
pub use restaurant::Restaurant;

use feedsync_remote::Fields;
use feedsync_store::{StoreError, StoreResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in unix-epoch milliseconds.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Serializes an entity into its document field map.
pub(crate) fn encode_fields<T: Serialize>(table: &'static str, entity: &T) -> StoreResult<Fields> {
    match serde_json::to_value(entity) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(StoreError::encode(table, "entity did not encode to an object")),
        Err(e) => Err(StoreError::encode(table, e.to_string())),
    }
}

/// Deserializes an entity from its document field map.
pub(crate) fn decode_fields<T: DeserializeOwned>(
    table: &'static str,
    fields: &Fields,
) -> StoreResult<T> {
    serde_json::from_value(Value::Object(fields.clone()))
        .map_err(|e| StoreError::decode(table, e.to_string()))
}

/// Decodes an entity from a stored row value.
pub(crate) fn decode_row<T: DeserializeOwned>(table: &'static str, value: &Value) -> StoreResult<T> {
    serde_json::from_value(value.clone()).map_err(|e| StoreError::decode(table, e.to_string()))
}
