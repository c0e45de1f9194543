//! Nutrition source - Remote lookup of products by name or barcode.
//!
//! The [`NutritionSource`] trait is the seam between the controller and the network.
//! [`OpenFoodFacts`] is the production implementation; tests script their own.

use crate::{entities::ProductRecord, errors::Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Open Food Facts HTTP client
pub mod open_food_facts;

pub use open_food_facts::OpenFoodFacts;

/// A remote nutrition-facts database.
///
/// Calls are single-shot: no retries and no caching. Concurrent calls are independent;
/// ordering of their completions is the caller's concern.
#[async_trait]
pub trait NutritionSource: Send + Sync {
    /// Free-text search by product name.
    ///
    /// An empty list means the source reported zero matches.
    ///
    /// # Errors
    /// Returns [`crate::errors::Error::Network`] or [`crate::errors::Error::Http`] on
    /// transport failure or an unusable response.
    async fn search_by_name(&self, term: &str) -> Result<Vec<ProductRecord>>;

    /// Exact lookup by barcode.
    ///
    /// # Errors
    /// Returns [`crate::errors::Error::NotFound`] when the source has no such product, and
    /// a network error on transport failure.
    async fn lookup_by_code(&self, code: &str) -> Result<ProductRecord>;
}

/// Shared handle to a nutrition source.
pub type SharedSource = Arc<dyn NutritionSource>;
