//! Cached user profile projection.

use feedsync_remote::Fields;
use feedsync_store::{RowCodec, StoreResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{decode_fields, decode_row, encode_fields};

const TABLE: &str = "profiles";

/// A read-optimized projection of the remote user document.
///
/// This is a denormalization: the remote `users` document is richer
/// (liked-id arrays, favorites) and the two may transiently disagree.
/// `refresh` narrows the gap; `force_resync` closes it on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// User id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Avatar URL.
    pub avatar_url: String,
    /// Bio text.
    pub bio: String,
    /// Verification flag.
    pub verified: bool,
    /// Number of posts authored.
    pub post_count: i64,
    /// Number of followers.
    pub follower_count: i64,
    /// Number of users followed.
    pub following_count: i64,
    /// Total likes received across all posts.
    pub total_likes_received: i64,
}

impl UserProfile {
    /// Encodes into the remote document field map.
    pub fn to_fields(&self) -> StoreResult<Fields> {
        encode_fields(TABLE, self)
    }

    /// Decodes from a remote user document, ignoring the fields the
    /// projection does not carry.
    pub fn from_fields(fields: &Fields) -> StoreResult<Self> {
        decode_fields(TABLE, fields)
    }
}

impl RowCodec for UserProfile {
    fn row_key(&self) -> String {
        self.id.clone()
    }

    fn encode(&self) -> StoreResult<Value> {
        Ok(Value::Object(self.to_fields()?))
    }

    fn decode(value: &Value) -> StoreResult<Self> {
        decode_row(TABLE, value)
    }
}
