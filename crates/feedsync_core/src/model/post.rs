//! Post (review) entity.

use feedsync_remote::Fields;
use feedsync_store::{RowCodec, StoreResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{decode_fields, decode_row, encode_fields};

const TABLE: &str = "posts";

/// Lifecycle status of a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    /// Visible only to the author.
    Draft,
    /// Visible to everyone.
    Published,
    /// Hidden but retained.
    Archived,
}

/// A review post.
///
/// Content fields are mutated by the author; `like_count` and
/// `comment_count` are aggregate counters maintained by counter
/// transactions and may transiently disagree with the edge documents
/// that justify them (bounded drift, reconciled on refresh).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Document id.
    pub id: String,
    /// Author user id.
    pub user_id: String,
    /// Title.
    pub title: String,
    /// Body text.
    pub content: String,
    /// Rating, 1–5. Validated at creation.
    pub rating: i64,
    /// Image URLs, already uploaded by the media collaborator.
    pub image_urls: Vec<String>,
    /// Price per person, in minor currency units.
    pub price_per_person: i64,
    /// Denormalized author display name.
    pub author_name: String,
    /// Denormalized author avatar URL.
    pub author_avatar_url: String,
    /// Denormalized place name.
    pub place_name: String,
    /// Denormalized place address.
    pub place_address: String,
    /// Canonical restaurant id, when the post references a place.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restaurant_id: Option<String>,
    /// Aggregate like counter.
    pub like_count: i64,
    /// Aggregate comment counter.
    pub comment_count: i64,
    /// Lifecycle status.
    pub status: PostStatus,
    /// Creation time, unix millis.
    pub created_at: i64,
    /// Last update time, unix millis.
    pub updated_at: i64,
}

impl Post {
    /// Encodes into the remote document field map.
    pub fn to_fields(&self) -> StoreResult<Fields> {
        encode_fields(TABLE, self)
    }

    /// Decodes from a remote document field map.
    pub fn from_fields(fields: &Fields) -> StoreResult<Self> {
        decode_fields(TABLE, fields)
    }
}

impl RowCodec for Post {
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

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn sample() -> Post {
        Post {
            id: "r1".into(),
            user_id: "u1".into(),
            title: "Great pho".into(),
            content: "Broth was excellent".into(),
            rating: 5,
            image_urls: vec!["https://img.example/1.jpg".into()],
            price_per_person: 1200,
            author_name: "Alice".into(),
            author_avatar_url: "https://img.example/a.jpg".into(),
            place_name: "Pho Thin".into(),
            place_address: "13 Lo Duc".into(),
            restaurant_id: Some("rest1".into()),
            like_count: 3,
            comment_count: 1,
            status: PostStatus::Published,
            created_at: 1_700_000_000_000,
            updated_at: 1_700_000_000_000,
        }
    }

    #[test]
    fn fields_round_trip() {
        let post = sample();
        let fields = post.to_fields().unwrap();
        assert_eq!(fields["likeCount"], serde_json::json!(3));
        assert_eq!(fields["status"], serde_json::json!("published"));
        assert_eq!(Post::from_fields(&fields).unwrap(), post);
    }

    #[test]
    fn row_round_trip() {
        let post = sample();
        let value = post.encode().unwrap();
        assert_eq!(Post::decode(&value).unwrap(), post);
    }

    #[test]
    fn missing_restaurant_id_decodes_as_none() {
        let mut fields = sample().to_fields().unwrap();
        fields.remove("restaurantId");
        assert_eq!(Post::from_fields(&fields).unwrap().restaurant_id, None);
    }
}
