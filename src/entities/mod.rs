//! Entity module - The canonical data types shared by every layer.
//! The normalizer produces them, the stores persist them and the view layer renders them.

pub mod product;

pub use product::{Macros, ProductRecord, UNKNOWN_BRAND, UNKNOWN_PRODUCT_NAME};
