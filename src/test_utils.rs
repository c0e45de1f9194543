//! Shared test utilities for `macro-buddy`.
//!
//! This module provides product fixtures, a controllable clock, stores that fail on
//! demand, and a scriptable [`NutritionSource`] for controller and session tests.

#![allow(clippy::unwrap_used)]

use crate::{
    config::AppConfig,
    core::{controller::AppController, ledger::Clock},
    entities::{Macros, ProductRecord, UNKNOWN_BRAND},
    errors::{Error, Result},
    source::NutritionSource,
    storage::{KeyValueStore, MemoryStore},
};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};
use tokio::sync::Notify;
use tracing_subscriber::EnvFilter;

/// Installs a test-writer subscriber once; later calls are no-ops.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trace")),
        )
        .with_test_writer()
        .try_init();
}

/// The fixed day used by [`test_controller`].
pub fn test_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
}

/// A product with a code. Carbs, protein and fat are derived from `calories`.
pub fn product(code: &str, name: &str, calories: f64) -> ProductRecord {
    ProductRecord {
        code: Some(code.to_string()),
        name: name.to_string(),
        brand: UNKNOWN_BRAND.to_string(),
        image_url: None,
        macros_per_100g: Macros {
            calories,
            carbs: calories / 10.0,
            protein: calories / 20.0,
            fat: calories / 40.0,
        },
    }
}

/// A product without a code, as produced for ambiguous source entries.
pub fn code_less_product(name: &str, calories: f64) -> ProductRecord {
    ProductRecord {
        code: None,
        ..product("", name, calories)
    }
}

/// A clock whose day is set by the test.
#[derive(Debug)]
pub struct FixedClock {
    day: Mutex<NaiveDate>,
}

impl FixedClock {
    /// A shared clock fixed at `day`.
    pub fn shared(day: NaiveDate) -> Arc<Self> {
        Arc::new(Self {
            day: Mutex::new(day),
        })
    }

    /// Moves the clock to `day`.
    pub fn set(&self, day: NaiveDate) {
        *self.day.lock().unwrap() = day;
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        *self.day.lock().unwrap()
    }
}

/// A store whose every read and write fails.
#[derive(Debug, Default)]
pub struct FailingStore;

impl KeyValueStore for FailingStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Err(Error::Persistence {
            key: key.to_string(),
            message: "storage unavailable".to_string(),
        })
    }

    fn write(&self, key: &str, _value: &str) -> Result<()> {
        Err(Error::Persistence {
            key: key.to_string(),
            message: "storage unavailable".to_string(),
        })
    }
}

/// A store whose reads fail while writes land in an inner [`MemoryStore`].
#[derive(Debug, Default)]
pub struct ReadFailingStore {
    inner: MemoryStore,
}

impl ReadFailingStore {
    /// A store holding `entries` that it refuses to read back.
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            inner: MemoryStore::with_entries(entries),
        }
    }

    /// The backing store, readable by assertions.
    pub const fn inner(&self) -> &MemoryStore {
        &self.inner
    }
}

impl KeyValueStore for ReadFailingStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Err(Error::Persistence {
            key: key.to_string(),
            message: "read failed".to_string(),
        })
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        self.inner.write(key, value)
    }
}

/// An initialized controller over an empty in-memory store, fixed at [`test_day`].
pub fn test_controller() -> AppController {
    AppController::open(
        &AppConfig::default(),
        Arc::new(MemoryStore::new()),
        FixedClock::shared(test_day()),
    )
}

enum Scripted {
    Products(Vec<ProductRecord>),
    Failure,
}

/// A [`NutritionSource`] answering from scripted data.
///
/// Unscripted search terms return no results; unknown codes are not found. A gated term
/// or code waits until its [`Notify`] is signalled before answering.
#[derive(Default)]
pub struct FakeSource {
    searches: HashMap<String, Scripted>,
    products: HashMap<String, ProductRecord>,
    gates: HashMap<String, Arc<Notify>>,
    calls: AtomicUsize,
}

impl FakeSource {
    /// An empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the results for `term`.
    pub fn with_search(mut self, term: &str, products: Vec<ProductRecord>) -> Self {
        self.searches
            .insert(term.to_string(), Scripted::Products(products));
        self
    }

    /// Makes searches for `term` fail at the transport level.
    pub fn with_search_failure(mut self, term: &str) -> Self {
        self.searches.insert(term.to_string(), Scripted::Failure);
        self
    }

    /// Makes `product` findable by its code.
    pub fn with_product(mut self, product: ProductRecord) -> Self {
        if let Some(code) = product.code.clone() {
            self.products.insert(code, product);
        }
        self
    }

    /// Holds answers for `key` (term or code) until `gate` is notified.
    pub fn with_gate(mut self, key: &str, gate: Arc<Notify>) -> Self {
        self.gates.insert(key.to_string(), gate);
        self
    }

    /// Number of calls received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn wait_for_gate(&self, key: &str) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = self.gates.get(key) {
            gate.notified().await;
        }
    }
}

#[async_trait]
impl NutritionSource for FakeSource {
    async fn search_by_name(&self, term: &str) -> Result<Vec<ProductRecord>> {
        self.wait_for_gate(term).await;
        match self.searches.get(term) {
            Some(Scripted::Products(products)) => Ok(products.clone()),
            Some(Scripted::Failure) => Err(Error::Network {
                message: "connection refused".to_string(),
            }),
            None => Ok(Vec::new()),
        }
    }

    async fn lookup_by_code(&self, code: &str) -> Result<ProductRecord> {
        self.wait_for_gate(code).await;
        self.products.get(code).cloned().ok_or_else(|| Error::NotFound {
            code: code.to_string(),
        })
    }
}
