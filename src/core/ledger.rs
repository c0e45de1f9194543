//! Daily macro ledger business logic
//!
//! Keeps a running total of the macros consumed today. The persisted record carries the
//! calendar day it belongs to (`YYYY-MM-DD`, local time); whenever the ledger is read or
//! mutated on a different day it is reset to zero first, so the totals never leak across
//! a day boundary. Additions assume a 100 g portion: the product's per-100 g figures are
//! added as they are.

use crate::{
    entities::Macros,
    errors::{Error, Result},
    storage::{DAILY_MACROS_KEY, SharedStore},
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Source of "today" in the consuming environment's local calendar.
pub trait Clock: Send + Sync {
    /// The current local calendar day.
    fn today(&self) -> NaiveDate;
}

/// [`Clock`] backed by the system's local time zone.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A day's accumulated totals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ledger {
    /// Calendar day the totals belong to
    pub date: NaiveDate,
    /// Accumulated macros
    pub totals: Macros,
}

impl Ledger {
    /// An all-zero ledger for `date`.
    #[must_use]
    pub const fn zeroed(date: NaiveDate) -> Self {
        Self {
            date,
            totals: Macros::ZERO,
        }
    }

    /// Returns a new ledger with `macros_per_100g` added to every field.
    #[must_use]
    pub fn add(self, macros_per_100g: Macros) -> Self {
        Self {
            date: self.date,
            totals: self.totals.plus(macros_per_100g),
        }
    }
}

/// On-disk layout of the ledger record.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedLedger {
    date: String,
    calories: f64,
    protein: f64,
    carbs: f64,
    fat: f64,
}

impl From<Ledger> for PersistedLedger {
    fn from(ledger: Ledger) -> Self {
        Self {
            date: ledger.date.format(DATE_FORMAT).to_string(),
            calories: ledger.totals.calories,
            protein: ledger.totals.protein,
            carbs: ledger.totals.carbs,
            fat: ledger.totals.fat,
        }
    }
}

impl TryFrom<PersistedLedger> for Ledger {
    type Error = Error;

    fn try_from(p: PersistedLedger) -> Result<Self> {
        let date = NaiveDate::parse_from_str(&p.date, DATE_FORMAT).map_err(|e| {
            Error::Persistence {
                key: DAILY_MACROS_KEY.to_string(),
                message: format!("Failed to parse ledger date '{}': {e}", p.date),
            }
        })?;
        let totals = Macros {
            calories: finite_or_zero(p.calories),
            carbs: finite_or_zero(p.carbs),
            protein: finite_or_zero(p.protein),
            fat: finite_or_zero(p.fat),
        };
        Ok(Self { date, totals })
    }
}

fn parse_persisted(raw: &str) -> Result<Ledger> {
    let persisted: PersistedLedger = serde_json::from_str(raw)?;
    Ledger::try_from(persisted)
}

const fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() { v } else { 0.0 }
}

/// Persistent ledger of today's consumed macros.
pub struct DailyMacroLedger {
    store: SharedStore,
    clock: Arc<dyn Clock>,
    current: Ledger,
    in_memory_only: bool,
}

impl DailyMacroLedger {
    /// Creates a ledger persisting to `store` and reading the day from `clock`.
    /// The in-memory state starts zeroed; call [`Self::load_or_reset`] to hydrate.
    #[must_use]
    pub fn new(store: SharedStore, clock: Arc<dyn Clock>) -> Self {
        let today = clock.today();
        Self {
            store,
            clock,
            current: Ledger::zeroed(today),
            in_memory_only: false,
        }
    }

    /// Loads the persisted ledger. If it belongs to another day, or is absent or
    /// malformed, a zeroed ledger for today is persisted and returned instead.
    ///
    /// If the store itself cannot be read, the ledger starts zeroed in memory and is never
    /// written back, so the unread totals survive.
    pub fn load_or_reset(&mut self) -> Ledger {
        let today = self.clock.today();
        let raw = match self.store.read(DAILY_MACROS_KEY) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Failed to read ledger, continuing in memory: {}", e);
                self.in_memory_only = true;
                self.current = Ledger::zeroed(today);
                return self.current;
            }
        };

        match raw.as_deref().map(parse_persisted).transpose() {
            Ok(Some(ledger)) if ledger.date == today => {
                info!("Loaded ledger for {}", today);
                self.current = ledger;
            }
            Ok(Some(ledger)) => {
                info!("Ledger from {} is stale, resetting for {}", ledger.date, today);
                self.reset_to(today);
            }
            Ok(None) => {
                debug!("No ledger stored, starting fresh for {}", today);
                self.reset_to(today);
            }
            Err(e) => {
                warn!("Ignoring malformed ledger: {}", e);
                self.reset_to(today);
            }
        }
        self.current
    }

    /// Current ledger, reset first if the day has rolled over since the last access.
    pub fn current(&mut self) -> Ledger {
        self.roll_over_if_needed();
        self.current
    }

    /// Adds one 100 g portion of `macros_per_100g` to today's totals and persists.
    pub fn add(&mut self, macros_per_100g: Macros) -> Ledger {
        self.roll_over_if_needed();
        self.current = self.current.add(macros_per_100g);
        debug!("Ledger totals now {:?}", self.current.totals);
        self.save();
        self.current
    }

    /// Zeroes today's totals and persists.
    pub fn reset(&mut self) -> Ledger {
        let today = self.clock.today();
        self.reset_to(today);
        self.current
    }

    fn roll_over_if_needed(&mut self) {
        let today = self.clock.today();
        if self.current.date != today {
            info!("Day rolled over from {} to {}, resetting ledger", self.current.date, today);
            self.reset_to(today);
        }
    }

    fn reset_to(&mut self, today: NaiveDate) {
        self.current = Ledger::zeroed(today);
        self.save();
    }

    /// Persists the current ledger with its date marker. Failures are logged and switch
    /// the ledger to in-memory mode.
    pub fn save(&mut self) {
        if self.in_memory_only {
            return;
        }
        let result = serde_json::to_string(&PersistedLedger::from(self.current))
            .map_err(Error::from)
            .and_then(|json| self.store.write(DAILY_MACROS_KEY, &json));
        if let Err(e) = result {
            warn!("Failed to persist ledger, continuing in memory: {}", e);
            self.in_memory_only = true;
        }
    }

    /// Whether persistence has been given up for this session.
    #[must_use]
    pub const fn is_in_memory_only(&self) -> bool {
        self.in_memory_only
    }
}
