//! Core business logic - framework-agnostic state management for search, favorites and
//! the daily macro ledger. Nothing here renders anything; the surface consumes
//! [`view::Snapshot`]s.

/// Application state controller
pub mod controller;
/// Persisted favorites set
pub mod favorites;
/// Persisted daily macro totals with day rollover
pub mod ledger;
/// Raw source payload normalization
pub mod normalize;
/// Read-only view model for the rendering surface
pub mod view;

pub use controller::{AppController, PendingRequest, RequestOutcome, RequestToken, SearchPhase};
pub use favorites::{FavoritesStore, ToggleOutcome};
pub use ledger::{Clock, DailyMacroLedger, Ledger, LocalClock};
pub use view::{DailyMacroSummary, ProductCard, Snapshot};
