//! Comment entity.

use feedsync_remote::Fields;
use feedsync_store::{RowCodec, StoreResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{decode_fields, decode_row, encode_fields};

const TABLE: &str = "comments";

/// A comment under a post, optionally threaded under another comment.
///
/// A comment belongs to exactly one post and is deleted transitively
/// when the post is deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// Document id.
    pub id: String,
    /// Parent post id.
    pub review_id: String,
    /// Parent comment id for threading, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_comment_id: Option<String>,
    /// Author user id.
    pub user_id: String,
    /// Optional rating; 0 means no rating.
    pub rating: i64,
    /// Body text.
    pub content: String,
    /// Image URLs.
    pub image_urls: Vec<String>,
    /// Aggregate like counter.
    pub like_count: i64,
    /// Moderation flag.
    pub flagged: bool,
    /// Creation time, unix millis.
    pub created_at: i64,
    /// Last update time, unix millis.
    pub updated_at: i64,
}

impl Comment {
    /// Encodes into the remote document field map.
    pub fn to_fields(&self) -> StoreResult<Fields> {
        encode_fields(TABLE, self)
    }

    /// Decodes from a remote document field map.
    pub fn from_fields(fields: &Fields) -> StoreResult<Self> {
        decode_fields(TABLE, fields)
    }
}

impl RowCodec for Comment {
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
