//! Dedup matcher: find-or-create for canonical place entities.
//!
//! Prevents duplicate restaurant documents for the same real-world
//! place. Matching is exact (normalized equality) against the local
//! cache and deliberately looser (normalized substring containment)
//! against remote search results, trading precision for recall.

use feedsync_remote::{Collection, RemoteStore};
use feedsync_store::{LocalStore, Table};
use std::sync::Arc;

use crate::model::Restaurant;

/// Normalizes a user-supplied name or address for comparison:
/// trim, lowercase, collapse internal whitespace runs to one space.
pub fn normalize(input: &str) -> String {
    input
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Case variants used to approximate case-insensitive prefix search
/// over a store whose native range queries are case-sensitive.
pub(crate) fn case_variants(input: &str) -> Vec<String> {
    let lower = input.to_lowercase();
    let upper = input.to_uppercase();
    let capitalized = {
        let mut chars = lower.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            None => String::new(),
        }
    };
    let mut variants = vec![lower, upper, capitalized];
    variants.dedup();
    variants
}

/// The find-or-create matcher for restaurants.
pub struct DedupMatcher {
    local: Arc<LocalStore>,
    remote: Arc<dyn RemoteStore>,
    /// Result cap per prefix query.
    query_limit: usize,
}

impl DedupMatcher {
    /// Creates a matcher over the given stores.
    pub fn new(local: Arc<LocalStore>, remote: Arc<dyn RemoteStore>) -> Self {
        Self {
            local,
            remote,
            query_limit: 20,
        }
    }

    /// Returns the id of an existing restaurant sufficiently equal to
    /// the given (name, address), if any.
    ///
    /// Remote search failures (offline, permission) are treated as "no
    /// match found" so place creation can proceed offline-tolerant.
    /// Under a network partition this can produce duplicate documents;
    /// that is an accepted limitation of the availability-first policy.
    pub fn find_existing(&self, name: &str, address: &str) -> Option<String> {
        let norm_name = normalize(name);
        let norm_address = normalize(address);

        // Local cache first: exact normalized equality, no network cost.
        for (id, value) in self.local.scan(Table::Restaurants) {
            let candidate_name = value.get("name").and_then(|v| v.as_str()).unwrap_or("");
            let candidate_address = value.get("address").and_then(|v| v.as_str()).unwrap_or("");
            if normalize(candidate_name) == norm_name && normalize(candidate_address) == norm_address
            {
                return Some(id);
            }
        }

        // Remote: case-variant prefix queries on both fields, merged and
        // deduplicated by document id.
        let mut merged: std::collections::BTreeMap<String, feedsync_remote::Document> =
            std::collections::BTreeMap::new();
        for (field, input) in [("name", name), ("address", address)] {
            for variant in case_variants(input.trim()) {
                match self.remote.query_prefix(
                    Collection::Restaurants,
                    field,
                    &variant,
                    self.query_limit,
                ) {
                    Ok(results) => {
                        for (id, doc) in results {
                            merged.entry(id).or_insert(doc);
                        }
                    }
                    Err(error) => {
                        tracing::debug!(%error, field, "dedup remote search failed, treating as no match");
                    }
                }
            }
        }

        // Looser re-filter than the local step: normalized substring
        // containment, admitting address variants for recall.
        merged
            .into_iter()
            .find(|(_, doc)| {
                normalize(doc.str_field("name")).contains(&norm_name)
                    && normalize(doc.str_field("address")).contains(&norm_address)
            })
            .map(|(id, _)| id)
    }

    /// Finds a sufficiently-equal existing restaurant or creates one
    /// remotely, caching the created entity locally before returning.
    pub fn find_or_create(&self, template: &Restaurant) -> crate::SyncResult<String> {
        if let Some(id) = self.find_existing(&template.name, &template.address) {
            return Ok(id);
        }

        let mut fields = template.to_fields()?;
        fields.remove("id");
        let id = self.remote.add(Collection::Restaurants, fields)?;

        let mut created = template.clone();
        created.id = id.clone();
        self.local
            .upsert(Table::Restaurants, &id, feedsync_store::RowCodec::encode(&created)?);
        Ok(id)
    }
}
