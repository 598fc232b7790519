//! Follow edge entity.

use feedsync_remote::Fields;
use feedsync_store::StoreResult;
use serde::{Deserialize, Serialize};

use super::{decode_fields, encode_fields};

const TABLE: &str = "follows";

/// A follow edge: its existence means `follower_id` follows
/// `following_id`. Stored remotely as `follows/{followerId_followingId}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Follow {
    /// The user doing the following.
    pub follower_id: String,
    /// The user being followed.
    pub following_id: String,
    /// Creation time, unix millis.
    pub created_at: i64,
}

impl Follow {
    /// Returns the composite document id, `{followerId}_{followingId}`.
    pub fn edge_id(&self) -> String {
        format!("{}_{}", self.follower_id, self.following_id)
    }

    /// Encodes into the remote document field map.
    pub fn to_fields(&self) -> StoreResult<Fields> {
        encode_fields(TABLE, self)
    }

    /// Decodes from a remote document field map.
    pub fn from_fields(fields: &Fields) -> StoreResult<Self> {
        decode_fields(TABLE, fields)
    }
}
