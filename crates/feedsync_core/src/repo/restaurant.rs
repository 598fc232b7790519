//! Restaurant repository.

use feedsync_remote::{Collection, DocRef, RemoteStore};
use feedsync_store::{LocalStore, Table, TypedSubscription, TypedTable};
use std::sync::Arc;

use crate::dedup::DedupMatcher;
use crate::error::{SyncError, SyncResult};
use crate::model::Restaurant;

/// Repository for canonical place entities.
pub struct RestaurantRepository {
    table: TypedTable<Restaurant>,
    remote: Arc<dyn RemoteStore>,
    matcher: DedupMatcher,
}

impl RestaurantRepository {
    /// Creates the repository.
    pub fn new(local: Arc<LocalStore>, remote: Arc<dyn RemoteStore>) -> Self {
        Self {
            table: TypedTable::new(Arc::clone(&local), Table::Restaurants),
            matcher: DedupMatcher::new(local, Arc::clone(&remote)),
            remote,
        }
    }

    /// Subscribes to a restaurant in the local cache.
    pub fn observe(&self, restaurant_id: &str) -> TypedSubscription<Restaurant> {
        self.table.watch(restaurant_id)
    }

    /// Returns the cached restaurant, if any.
    pub fn get_cached(&self, restaurant_id: &str) -> SyncResult<Option<Restaurant>> {
        Ok(self.table.get(restaurant_id)?)
    }

    /// Resolves `template` to the id of an existing sufficiently-equal
    /// restaurant, creating one when no match is found.
    pub fn find_or_create(&self, template: &Restaurant) -> SyncResult<String> {
        self.matcher.find_or_create(template)
    }

    /// Pulls remote truth for one restaurant into the cache.
    pub fn refresh(&self, restaurant_id: &str) -> SyncResult<()> {
        let doc_ref = DocRef::new(Collection::Restaurants, restaurant_id);
        match self.remote.get(&doc_ref)? {
            Some(doc) => {
                let restaurant = Restaurant::from_fields(&doc.fields)?;
                self.table.upsert(&restaurant)?;
                Ok(())
            }
            None => {
                self.table.delete(restaurant_id);
                Err(SyncError::not_found("restaurant", restaurant_id))
            }
        }
    }

    /// Drops the cached row, then refreshes.
    pub fn force_resync(&self, restaurant_id: &str) -> SyncResult<()> {
        self.table.delete(restaurant_id);
        self.refresh(restaurant_id)
    }
}
