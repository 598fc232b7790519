//! Restaurant (place) entity.

use feedsync_remote::Fields;
use feedsync_store::{RowCodec, StoreResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{decode_fields, decode_row, encode_fields};

const TABLE: &str = "restaurants";

/// A canonical place entity referenced by posts.
///
/// Deduplicated at creation time by normalized (name, address)
/// equality; see the dedup matcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Restaurant {
    /// Document id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Street address.
    pub address: String,
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lng: f64,
    /// Phone number, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Cover image URL, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,
    /// Price range descriptor, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_range: Option<String>,
    /// Cuisine tags.
    pub cuisine_types: Vec<String>,
    /// Sum of all review ratings.
    pub total_rating_points: i64,
    /// Number of reviews contributing to the total.
    pub review_count: i64,
    /// Creator user id.
    pub created_by: String,
    /// Creation time, unix millis.
    pub created_at: i64,
}

impl Restaurant {
    /// Derived average rating; 0.0 when there are no reviews.
    pub fn average_rating(&self) -> f64 {
        if self.review_count == 0 {
            0.0
        } else {
            self.total_rating_points as f64 / self.review_count as f64
        }
    }

    /// Encodes into the remote document field map.
    ///
    /// The derived `averageRating` is written alongside the totals so
    /// read-side consumers that only see documents get a usable value.
    pub fn to_fields(&self) -> StoreResult<Fields> {
        let mut fields = encode_fields(TABLE, self)?;
        fields.insert(
            "averageRating".to_string(),
            Value::from(self.average_rating()),
        );
        Ok(fields)
    }

    /// Decodes from a remote document field map.
    pub fn from_fields(fields: &Fields) -> StoreResult<Self> {
        decode_fields(TABLE, fields)
    }
}

impl RowCodec for Restaurant {
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
