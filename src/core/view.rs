//! View model handed to the rendering surface.
//!
//! Everything here is a read-only copy of controller state. The surface renders it and
//! answers with intents; it never mutates these values back into the controller.

use crate::{
    config::MacroGoals,
    core::ledger::Ledger,
    entities::{Macros, ProductRecord},
};
use chrono::NaiveDate;

/// One product card.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductCard {
    /// The product being shown
    pub product: ProductRecord,
    /// Per-100 g macros rounded to whole numbers for display
    pub display_macros: Macros,
    /// Whether the product is in the favorites set
    pub is_favorite: bool,
}

impl ProductCard {
    /// Builds a card for `product`.
    #[must_use]
    pub fn new(product: ProductRecord, is_favorite: bool) -> Self {
        let display_macros = product.macros_per_100g.rounded();
        Self {
            product,
            display_macros,
            is_favorite,
        }
    }
}

/// Today's totals together with the numeric series for the ring charts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyMacroSummary {
    /// Day the totals belong to
    pub date: NaiveDate,
    /// Accumulated macros
    pub totals: Macros,
    /// Configured targets
    pub goals: MacroGoals,
    /// `total / goal` per macro; 0 when the goal is 0, not capped at 1
    pub progress: Macros,
}

impl DailyMacroSummary {
    /// Summarizes `ledger` against `goals`.
    #[must_use]
    pub fn new(ledger: Ledger, goals: MacroGoals) -> Self {
        let t = ledger.totals;
        Self {
            date: ledger.date,
            totals: t,
            goals,
            progress: Macros {
                calories: fraction(t.calories, goals.calories),
                carbs: fraction(t.carbs, goals.carbs),
                protein: fraction(t.protein, goals.protein),
                fat: fraction(t.fat, goals.fat),
            },
        }
    }
}

fn fraction(total: f64, goal: f64) -> f64 {
    if goal <= 0.0 {
        return 0.0;
    }
    total / goal
}

/// Complete snapshot of what the surface should show.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Current content of the search box
    pub search_term: String,
    /// Cards to render, favorites or search results depending on the view
    pub displayed_products: Vec<ProductCard>,
    /// A request is in flight
    pub loading: bool,
    /// Localized error message to show
    pub error: Option<String>,
    /// The camera scanner is open
    pub scanner_active: bool,
    /// The favorites list is shown instead of search results
    pub viewing_favorites: bool,
    /// Today's totals and ring-chart series
    pub daily: DailyMacroSummary,
    /// Transient confirmation message
    pub notification: Option<String>,
}
