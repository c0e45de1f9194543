//! Application state controller - The single owner of all mutable app state.
//!
//! The controller turns user intents into state transitions and hands out read-only
//! [`Snapshot`]s. Search and barcode lookups are split into two phases so they can run
//! concurrently with other intents: `begin_*` records the request and returns a
//! [`PendingRequest`] carrying a sequence token, and [`AppController::complete`] applies
//! the outcome only if that token is still the latest one issued. Responses to
//! superseded requests are dropped, whatever order they arrive in.
//!
//! Search phase transitions:
//!
//! ```text
//! Idle | Loaded | Error --begin--> Searching --ok(n > 0)--> Loaded
//!                                            --ok(0)-----> Error("Keine Produkte gefunden.")
//!                                            --err-------> Error(<localized message>)
//! ```

use crate::{
    config::{AppConfig, MacroGoals},
    core::{
        favorites::{FavoritesStore, ToggleOutcome},
        ledger::{Clock, DailyMacroLedger, Ledger},
        view::{DailyMacroSummary, ProductCard, Snapshot},
    },
    entities::ProductRecord,
    errors::{Error, MSG_NETWORK, Result},
    source::NutritionSource,
    storage::SharedStore,
};
use std::sync::Arc;
use tracing::{debug, info};

/// State of the search subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchPhase {
    /// Nothing requested yet
    Idle,
    /// A request is in flight
    Searching,
    /// The last request produced results
    Loaded,
    /// The last request failed; carries the localized message
    Error(String),
}

/// Identifies one issued request. Tokens increase monotonically per controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestToken(u64);

/// A request the controller has recorded but not yet resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingRequest {
    /// Free-text search
    Search {
        /// Sequence token
        token: RequestToken,
        /// Trimmed search term
        term: String,
    },
    /// Barcode lookup from the scanner
    Lookup {
        /// Sequence token
        token: RequestToken,
        /// Decoded barcode
        code: String,
    },
}

/// Result of running a [`PendingRequest`] against a source.
#[derive(Debug)]
pub enum RequestOutcome {
    /// Search results
    Search(Result<Vec<ProductRecord>>),
    /// Barcode lookup result
    Lookup(Result<ProductRecord>),
}

impl PendingRequest {
    /// Token of this request.
    #[must_use]
    pub const fn token(&self) -> RequestToken {
        match self {
            Self::Search { token, .. } | Self::Lookup { token, .. } => *token,
        }
    }

    /// Performs the network call. Does not touch controller state.
    pub async fn run(&self, source: &dyn NutritionSource) -> RequestOutcome {
        match self {
            Self::Search { term, .. } => RequestOutcome::Search(source.search_by_name(term).await),
            Self::Lookup { code, .. } => RequestOutcome::Lookup(source.lookup_by_code(code).await),
        }
    }
}

/// Owner of search state, favorites and the daily ledger.
pub struct AppController {
    favorites: FavoritesStore,
    ledger: DailyMacroLedger,
    goals: MacroGoals,
    search_term: String,
    search_results: Vec<ProductRecord>,
    phase: SearchPhase,
    scanner_active: bool,
    viewing_favorites: bool,
    notification: Option<String>,
    last_issued: u64,
}

impl AppController {
    /// Creates a controller over the given stores. Call [`Self::initialize`] before use.
    #[must_use]
    pub fn new(favorites: FavoritesStore, ledger: DailyMacroLedger, goals: MacroGoals) -> Self {
        Self {
            favorites,
            ledger,
            goals,
            search_term: String::new(),
            search_results: Vec::new(),
            phase: SearchPhase::Idle,
            scanner_active: false,
            viewing_favorites: false,
            notification: None,
            last_issued: 0,
        }
    }

    /// Builds and initializes a controller persisting to `store`.
    #[must_use]
    pub fn open(config: &AppConfig, store: SharedStore, clock: Arc<dyn Clock>) -> Self {
        let favorites = FavoritesStore::new(Arc::clone(&store));
        let ledger = DailyMacroLedger::new(store, clock);
        let mut controller = Self::new(favorites, ledger, config.goals);
        controller.initialize();
        controller
    }

    /// Hydrates favorites and the ledger from storage and clears transient state.
    pub fn initialize(&mut self) {
        self.favorites.load();
        let ledger = self.ledger.load_or_reset();
        self.search_term.clear();
        self.search_results.clear();
        self.phase = SearchPhase::Idle;
        self.scanner_active = false;
        self.viewing_favorites = false;
        self.notification = None;
        info!(
            "Controller initialized: {} favorites, {:.0} kcal logged for {}",
            self.favorites.items().len(),
            ledger.totals.calories,
            ledger.date
        );
    }

    /// Updates the search box content.
    pub fn set_search_term(&mut self, text: impl Into<String>) {
        self.search_term = text.into();
    }

    fn issue(&mut self) -> RequestToken {
        self.last_issued += 1;
        self.phase = SearchPhase::Searching;
        self.viewing_favorites = false;
        RequestToken(self.last_issued)
    }

    /// Starts a search for `term`. Blank terms are ignored.
    pub fn begin_search(&mut self, term: &str) -> Option<PendingRequest> {
        let term = term.trim();
        if term.is_empty() {
            debug!("Ignoring blank search");
            return None;
        }
        self.search_term = term.to_string();
        let token = self.issue();
        debug!("Issued search {:?} for '{}'", token, term);
        Some(PendingRequest::Search {
            token,
            term: term.to_string(),
        })
    }

    /// Handles a decoded barcode from the scanner. Blank decodes are ignored and leave
    /// the scanner open; otherwise the scanner closes and a lookup is issued.
    pub fn on_scan_result(&mut self, decoded: &str) -> Option<PendingRequest> {
        let code = decoded.trim();
        if code.is_empty() {
            return None;
        }
        self.scanner_active = false;
        let token = self.issue();
        debug!("Issued lookup {:?} for {}", token, code);
        Some(PendingRequest::Lookup {
            token,
            code: code.to_string(),
        })
    }

    /// Applies the outcome of a request. Returns `false` if the request was superseded
    /// and its outcome discarded.
    pub fn complete(&mut self, token: RequestToken, outcome: RequestOutcome) -> bool {
        if token != RequestToken(self.last_issued) {
            debug!(
                "Discarding stale response {:?}, latest is {}",
                token, self.last_issued
            );
            return false;
        }

        match outcome {
            RequestOutcome::Search(Ok(products)) if products.is_empty() => {
                self.fail(&Error::NoResults {
                    term: self.search_term.clone(),
                });
            }
            RequestOutcome::Search(Ok(products)) => {
                info!("Showing {} search results", products.len());
                self.search_results = products;
                self.phase = SearchPhase::Loaded;
            }
            RequestOutcome::Lookup(Ok(product)) => {
                info!("Showing scanned product '{}'", product.name);
                self.search_results = vec![product];
                self.phase = SearchPhase::Loaded;
                self.viewing_favorites = false;
            }
            RequestOutcome::Search(Err(e)) | RequestOutcome::Lookup(Err(e)) => self.fail(&e),
        }
        true
    }

    fn fail(&mut self, error: &Error) {
        info!("Request failed: {}", error);
        self.search_results.clear();
        let message = error.user_message().unwrap_or(MSG_NETWORK);
        self.phase = SearchPhase::Error(message.to_string());
    }

    /// Runs a complete search against `source`, awaiting the response.
    pub async fn search(&mut self, source: &dyn NutritionSource, term: &str) {
        if let Some(request) = self.begin_search(term) {
            let outcome = request.run(source).await;
            self.complete(request.token(), outcome);
        }
    }

    /// Runs a complete barcode lookup against `source`, awaiting the response.
    pub async fn scan(&mut self, source: &dyn NutritionSource, decoded: &str) {
        if let Some(request) = self.on_scan_result(decoded) {
            let outcome = request.run(source).await;
            self.complete(request.token(), outcome);
        }
    }

    /// Adds or removes `product` from favorites. Code-less products are ignored.
    pub fn toggle_favorite(&mut self, product: &ProductRecord) -> ToggleOutcome {
        self.favorites.toggle(product)
    }

    /// Logs one 100 g portion of `product` and posts a confirmation.
    pub fn add_to_daily(&mut self, product: &ProductRecord) -> Ledger {
        let ledger = self.ledger.add(product.macros_per_100g);
        self.notification = Some(format!("{} zum Tagesbedarf hinzugefügt.", product.name));
        ledger
    }

    /// Zeroes today's totals.
    pub fn reset_daily(&mut self) -> Ledger {
        self.ledger.reset()
    }

    /// Switches between search results and favorites. Entering favorites closes the
    /// scanner, clears any error and dismisses an in-flight request: its response is
    /// discarded when it arrives.
    pub fn toggle_favorites_view(&mut self) {
        self.viewing_favorites = !self.viewing_favorites;
        if !self.viewing_favorites {
            return;
        }
        self.scanner_active = false;
        match self.phase {
            SearchPhase::Searching => {
                self.last_issued += 1;
                debug!("Dismissed in-flight request, latest is now {}", self.last_issued);
                self.phase = SearchPhase::Idle;
            }
            SearchPhase::Error(_) => self.phase = SearchPhase::Idle,
            SearchPhase::Idle | SearchPhase::Loaded => {}
        }
    }

    /// Opens or closes the scanner. Opening it leaves the favorites view.
    pub fn toggle_scanner(&mut self) {
        self.scanner_active = !self.scanner_active;
        if self.scanner_active {
            self.viewing_favorites = false;
        }
    }

    /// Clears the transient notification.
    pub fn dismiss_notification(&mut self) {
        self.notification = None;
    }

    /// Current search phase.
    #[must_use]
    pub const fn phase(&self) -> &SearchPhase {
        &self.phase
    }

    /// Current favorites.
    #[must_use]
    pub fn favorites(&self) -> &[ProductRecord] {
        self.favorites.items()
    }

    /// Cards currently on screen, derived from the view flag, favorites and results.
    #[must_use]
    pub fn displayed_products(&self) -> Vec<ProductCard> {
        let source = if self.viewing_favorites {
            self.favorites.items()
        } else {
            self.search_results.as_slice()
        };
        source
            .iter()
            .map(|p| ProductCard::new(p.clone(), self.favorites.contains(p)))
            .collect()
    }

    /// Read-only snapshot for the rendering surface. Takes `&mut self` because reading
    /// the ledger may roll it over to a new day.
    pub fn snapshot(&mut self) -> Snapshot {
        let ledger = self.ledger.current();
        Snapshot {
            search_term: self.search_term.clone(),
            displayed_products: self.displayed_products(),
            loading: self.phase == SearchPhase::Searching,
            error: match &self.phase {
                SearchPhase::Error(message) => Some(message.clone()),
                _ => None,
            },
            scanner_active: self.scanner_active,
            viewing_favorites: self.viewing_favorites,
            daily: DailyMacroSummary::new(ledger, self.goals),
            notification: self.notification.clone(),
        }
    }
}
