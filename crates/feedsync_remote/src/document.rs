//! Document and field-operation model.

use serde_json::Value;

/// The field map of a document.
pub type Fields = serde_json::Map<String, Value>;

/// A stored document plus its optimistic-concurrency version.
///
/// The version is maintained by the store and bumped on every committed
/// write to the document. Transactions record the version at read time
/// and fail at commit if it has moved.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Field values.
    pub fields: Fields,
    /// Store-maintained version, starting at 1 for a fresh document.
    pub version: u64,
}

impl Document {
    /// Creates a fresh document at version 1.
    pub fn new(fields: Fields) -> Self {
        Self { fields, version: 1 }
    }

    /// Returns a field value, if present.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Reads a numeric field, defaulting to 0 when absent or non-numeric.
    ///
    /// Counter reads must never fail on a missing field; a document that
    /// predates the counter simply reads as zero.
    pub fn i64_field(&self, field: &str) -> i64 {
        self.fields
            .get(field)
            .and_then(Value::as_i64)
            .unwrap_or(0)
    }

    /// Reads a string field, defaulting to "" when absent.
    pub fn str_field(&self, field: &str) -> &str {
        self.fields
            .get(field)
            .and_then(Value::as_str)
            .unwrap_or("")
    }
}

/// A field-level mutation, applied atomically by the store.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOp {
    /// Replaces the field with the given value.
    Set(Value),
    /// Adds `delta` to the field (absent reads as 0).
    Increment(i64),
    /// Adds `delta` but floors the result at zero.
    ///
    /// Duplicate or out-of-order decrements must not drive a counter
    /// negative.
    ClampedIncrement(i64),
    /// Appends the value to an array field unless already present.
    ArrayUnion(Value),
    /// Removes every element equal to the value from an array field.
    ArrayRemove(Value),
    /// Removes the field entirely.
    Delete,
}

/// Applies a field operation in place.
pub fn apply_field_op(fields: &mut Fields, field: &str, op: &FieldOp) {
    match op {
        FieldOp::Set(value) => {
            fields.insert(field.to_string(), value.clone());
        }
        FieldOp::Increment(delta) => {
            let current = fields.get(field).and_then(Value::as_i64).unwrap_or(0);
            fields.insert(field.to_string(), Value::from(current + delta));
        }
        FieldOp::ClampedIncrement(delta) => {
            let current = fields.get(field).and_then(Value::as_i64).unwrap_or(0);
            fields.insert(field.to_string(), Value::from((current + delta).max(0)));
        }
        FieldOp::ArrayUnion(value) => {
            let arr = fields
                .entry(field.to_string())
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(items) = arr {
                if !items.contains(value) {
                    items.push(value.clone());
                }
            }
        }
        FieldOp::ArrayRemove(value) => {
            if let Some(Value::Array(items)) = fields.get_mut(field) {
                items.retain(|item| item != value);
            }
        }
        FieldOp::Delete => {
            fields.remove(field);
        }
    }
}
