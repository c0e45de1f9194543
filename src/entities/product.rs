//! Product entity - The canonical shape of a food product inside the app.
//!
//! Records are built fresh by the normalizer from each nutrition-source response and are
//! never mutated afterwards. Both the search-results list and the favorites list own
//! their own copies.

use serde::{Deserialize, Serialize};

/// Placeholder shown when the source has no product name.
pub const UNKNOWN_PRODUCT_NAME: &str = "Unbekanntes Produkt";
/// Placeholder shown when the source has no brand.
pub const UNKNOWN_BRAND: &str = "Keine Marke";

/// Macro nutrients. Per 100 g when attached to a product, absolute when used as a daily total.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Macros {
    /// Energy in kcal
    pub calories: f64,
    /// Carbohydrates in grams
    pub carbs: f64,
    /// Protein in grams
    pub protein: f64,
    /// Fat in grams
    pub fat: f64,
}

impl Macros {
    /// All four macros set to zero.
    pub const ZERO: Self = Self {
        calories: 0.0,
        carbs: 0.0,
        protein: 0.0,
        fat: 0.0,
    };

    /// Field-wise sum of two macro sets.
    #[must_use]
    pub fn plus(self, other: Self) -> Self {
        Self {
            calories: self.calories + other.calories,
            carbs: self.carbs + other.carbs,
            protein: self.protein + other.protein,
            fat: self.fat + other.fat,
        }
    }

    /// Each field rounded half away from zero, for display.
    #[must_use]
    pub fn rounded(self) -> Self {
        Self {
            calories: self.calories.round(),
            carbs: self.carbs.round(),
            protein: self.protein.round(),
            fat: self.fat.round(),
        }
    }
}

/// A normalized food product.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    /// Barcode from the source; absent records cannot be favorited
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Display name, never empty
    pub name: String,
    /// Display brand, never empty
    pub brand: String,
    /// Small front image, if the source has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Nutritional values per 100 g
    pub macros_per_100g: Macros,
}

impl ProductRecord {
    /// Returns the product code if it is usable as a key.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.code.as_deref().filter(|c| !c.trim().is_empty())
    }

    /// Whether `other` refers to the same product. Code-less records never match anything.
    #[must_use]
    pub fn same_product(&self, other: &Self) -> bool {
        matches!((self.key(), other.key()), (Some(a), Some(b)) if a == b)
    }
}
