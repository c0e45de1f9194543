//! Product normalization - Maps raw nutrition-source payloads onto [`ProductRecord`].
//!
//! Source payloads are heterogeneous: fields go missing, nutrients arrive as numbers or
//! numeric strings, and names can be empty. [`normalize`] is a total function over any of
//! that. Missing text gets the localized placeholder, anything that is not a usable number
//! becomes `0`.

use crate::entities::{Macros, ProductRecord, UNKNOWN_BRAND, UNKNOWN_PRODUCT_NAME};
use serde::Deserialize;
use serde_json::Value;

/// Nutriment keys as the source names them.
const KEY_CALORIES: &str = "energy-kcal_100g";
const KEY_CARBS: &str = "carbohydrates_100g";
const KEY_PROTEIN: &str = "proteins_100g";
const KEY_FAT: &str = "fat_100g";

/// Raw product as delivered by the nutrition source.
///
/// Every field is an untyped JSON value so deserialization never fails on odd input.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceProduct {
    /// Barcode
    #[serde(default)]
    pub code: Option<Value>,
    /// Product name
    #[serde(default)]
    pub product_name: Option<Value>,
    /// Comma separated brand list
    #[serde(default)]
    pub brands: Option<Value>,
    /// Small front image URL
    #[serde(default)]
    pub image_front_small_url: Option<Value>,
    /// Nutriment map
    #[serde(default)]
    pub nutriments: Option<Value>,
}

impl SourceProduct {
    /// Interprets an arbitrary JSON value as a source product.
    /// Anything that is not an object yields an empty product.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }
}

/// Converts a raw source product into the canonical record.
#[must_use]
pub fn normalize(raw: SourceProduct) -> ProductRecord {
    let nutriments = raw.nutriments.as_ref();
    let nutrient = |key: &str| number(nutriments.and_then(|n| n.get(key)));

    ProductRecord {
        code: code(raw.code.as_ref()),
        name: text(raw.product_name.as_ref()).unwrap_or_else(|| UNKNOWN_PRODUCT_NAME.to_string()),
        brand: text(raw.brands.as_ref()).unwrap_or_else(|| UNKNOWN_BRAND.to_string()),
        image_url: text(raw.image_front_small_url.as_ref()),
        macros_per_100g: Macros {
            calories: nutrient(KEY_CALORIES),
            carbs: nutrient(KEY_CARBS),
            protein: nutrient(KEY_PROTEIN),
            fat: nutrient(KEY_FAT),
        },
    }
}

/// Normalizes a raw JSON value directly.
#[must_use]
pub fn normalize_value(value: Value) -> ProductRecord {
    normalize(SourceProduct::from_value(value))
}

fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

fn code(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn number(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite()).unwrap_or(0.0)
}
