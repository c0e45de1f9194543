//! Favorites business logic - The persisted set of user-pinned products.
//!
//! The set is keyed by product code: at most one entry per code, and records without a
//! code are never admitted. Every mutation re-persists the whole set. Storage failures
//! never reach the caller; the store logs them and keeps working in memory for the rest
//! of the session.

use crate::{
    entities::ProductRecord,
    errors::Error,
    storage::{FAVORITES_KEY, SharedStore},
};
use tracing::{debug, info, warn};

/// Result of a [`FavoritesStore::toggle`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The product was added
    Added,
    /// The product was already present and has been removed
    Removed,
    /// The product has no code and was ignored
    Rejected,
}

/// Persistent set of favorite products.
pub struct FavoritesStore {
    store: SharedStore,
    items: Vec<ProductRecord>,
    in_memory_only: bool,
}

impl FavoritesStore {
    /// Creates an empty store that persists to `store`. Call [`Self::load`] to hydrate.
    #[must_use]
    pub fn new(store: SharedStore) -> Self {
        Self {
            store,
            items: Vec::new(),
            in_memory_only: false,
        }
    }

    /// Reads the persisted set, replacing the in-memory one.
    ///
    /// Absent or malformed state yields an empty set. Duplicate codes keep their first
    /// occurrence and code-less entries are dropped. If the store itself cannot be read,
    /// the set starts empty and is never written back, so the unread state survives.
    pub fn load(&mut self) -> &[ProductRecord] {
        self.items = match self.store.read(FAVORITES_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<ProductRecord>>(&raw) {
                Ok(items) => dedupe(items),
                Err(e) => {
                    warn!("Ignoring malformed favorites: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Failed to read favorites, continuing in memory: {}", e);
                self.in_memory_only = true;
                Vec::new()
            }
        };
        info!("Loaded {} favorites", self.items.len());
        &self.items
    }

    /// Adds `product` if no entry shares its code, otherwise removes that entry.
    /// Products without a code are rejected and the set is left unchanged.
    pub fn toggle(&mut self, product: &ProductRecord) -> ToggleOutcome {
        let Some(code) = product.key() else {
            debug!("Rejecting favorite toggle for code-less product '{}'", product.name);
            return ToggleOutcome::Rejected;
        };

        let outcome = if let Some(pos) = self.items.iter().position(|p| p.key() == Some(code)) {
            self.items.remove(pos);
            ToggleOutcome::Removed
        } else {
            self.items.push(product.clone());
            ToggleOutcome::Added
        };
        debug!("Favorite {} -> {:?}", code, outcome);

        self.save();
        outcome
    }

    /// Persists the current set. Failures are logged and switch the store to in-memory mode.
    pub fn save(&mut self) {
        if self.in_memory_only {
            return;
        }
        let result = serde_json::to_string(&self.items)
            .map_err(Error::from)
            .and_then(|json| self.store.write(FAVORITES_KEY, &json));
        if let Err(e) = result {
            warn!("Failed to persist favorites, continuing in memory: {}", e);
            self.in_memory_only = true;
        }
    }

    /// Current favorites in insertion order.
    #[must_use]
    pub fn items(&self) -> &[ProductRecord] {
        &self.items
    }

    /// Whether a product with the same code is favorited.
    #[must_use]
    pub fn contains(&self, product: &ProductRecord) -> bool {
        self.items.iter().any(|p| p.same_product(product))
    }

    /// Whether persistence has been given up for this session.
    #[must_use]
    pub const fn is_in_memory_only(&self) -> bool {
        self.in_memory_only
    }
}

fn dedupe(items: Vec<ProductRecord>) -> Vec<ProductRecord> {
    let mut kept: Vec<ProductRecord> = Vec::with_capacity(items.len());
    for item in items {
        if item.key().is_some() && !kept.iter().any(|k| k.same_product(&item)) {
            kept.push(item);
        }
    }
    kept
}
