//! Event loop owning the controller.
//!
//! A session runs on one task. The rendering surface sends [`Intent`]s through a channel
//! and watches [`Snapshot`]s; it never touches controller state directly. Network calls
//! run on their own tasks and report back through a completion channel, so the user can
//! keep typing or toggling favorites while a search is in flight. Issuing a new search
//! or lookup aborts the previous call's task, and the controller's request tokens discard
//! any response that still slips through.

use crate::{
    core::{
        controller::{AppController, PendingRequest, RequestOutcome, RequestToken},
        view::Snapshot,
    },
    entities::ProductRecord,
    errors::{Error, Result},
    source::SharedSource,
};
use std::sync::Arc;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tracing::{debug, info};

const INTENT_BUFFER: usize = 32;

/// A user action forwarded by the rendering surface.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// The search box changed
    SetSearchTerm(String),
    /// Search for the given term
    Search(String),
    /// The scanner decoded a barcode
    ScanResult(String),
    /// Add or remove a favorite
    ToggleFavorite(ProductRecord),
    /// Log a 100 g portion
    AddToDaily(ProductRecord),
    /// Switch between results and favorites
    ToggleFavoritesView,
    /// Open or close the scanner
    ToggleScanner,
    /// Zero today's totals
    ResetDaily,
    /// Hide the current notification
    DismissNotification,
    /// Stop the session
    Shutdown,
}

/// Surface-side handle to a running session.
pub struct SessionHandle {
    intents: mpsc::Sender<Intent>,
    snapshots: watch::Receiver<Snapshot>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// Forwards an intent to the session.
    ///
    /// # Errors
    /// Returns [`Error::SessionClosed`] if the session has stopped.
    pub async fn send(&self, intent: Intent) -> Result<()> {
        self.intents
            .send(intent)
            .await
            .map_err(|_| Error::SessionClosed)
    }

    /// The most recent snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    /// A receiver that is notified on every new snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }

    /// Stops the session and waits for its task to finish.
    pub async fn shutdown(self) {
        // The loop may already be gone; either way it ends.
        let _ = self.intents.send(Intent::Shutdown).await;
        if let Err(e) = self.task.await {
            debug!("Session task ended abnormally: {}", e);
        }
    }
}

/// Starts a session owning `controller` on a new task.
#[must_use]
pub fn spawn(mut controller: AppController, source: SharedSource) -> SessionHandle {
    let (intent_tx, intent_rx) = mpsc::channel(INTENT_BUFFER);
    let (snapshot_tx, snapshot_rx) = watch::channel(controller.snapshot());
    let task = tokio::spawn(run(controller, source, intent_rx, snapshot_tx));
    SessionHandle {
        intents: intent_tx,
        snapshots: snapshot_rx,
        task,
    }
}

async fn run(
    mut controller: AppController,
    source: SharedSource,
    mut intents: mpsc::Receiver<Intent>,
    snapshots: watch::Sender<Snapshot>,
) {
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<(RequestToken, RequestOutcome)>();
    let mut in_flight: Option<JoinHandle<()>> = None;
    info!("Session started");

    loop {
        tokio::select! {
            intent = intents.recv() => {
                let request = match intent {
                    None | Some(Intent::Shutdown) => break,
                    Some(intent) => apply(&mut controller, intent),
                };
                if let Some(request) = request {
                    if let Some(previous) = in_flight.take() {
                        previous.abort();
                    }
                    in_flight = Some(dispatch(request, Arc::clone(&source), done_tx.clone()));
                }
            }
            Some((token, outcome)) = done_rx.recv() => {
                controller.complete(token, outcome);
            }
        }
        snapshots.send_replace(controller.snapshot());
    }

    if let Some(task) = in_flight {
        task.abort();
    }
    info!("Session stopped");
}

fn apply(controller: &mut AppController, intent: Intent) -> Option<PendingRequest> {
    debug!("Intent: {:?}", intent);
    match intent {
        Intent::SetSearchTerm(text) => controller.set_search_term(text),
        Intent::Search(term) => return controller.begin_search(&term),
        Intent::ScanResult(decoded) => return controller.on_scan_result(&decoded),
        Intent::ToggleFavorite(product) => {
            controller.toggle_favorite(&product);
        }
        Intent::AddToDaily(product) => {
            controller.add_to_daily(&product);
        }
        Intent::ToggleFavoritesView => controller.toggle_favorites_view(),
        Intent::ToggleScanner => controller.toggle_scanner(),
        Intent::ResetDaily => {
            controller.reset_daily();
        }
        Intent::DismissNotification => controller.dismiss_notification(),
        Intent::Shutdown => {}
    }
    None
}

fn dispatch(
    request: PendingRequest,
    source: SharedSource,
    done: mpsc::UnboundedSender<(RequestToken, RequestOutcome)>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let outcome = request.run(source.as_ref()).await;
        // The session may have stopped in the meantime.
        let _ = done.send((request.token(), outcome));
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::errors::MSG_NOT_FOUND;
    use crate::test_utils::*;
    use tokio::sync::Notify;

    async fn wait_until<F>(handle: &SessionHandle, mut done: F) -> Snapshot
    where
        F: FnMut(&Snapshot) -> bool,
    {
        let mut rx = handle.subscribe();
        let snapshot = rx.wait_for(|s| done(s)).await.unwrap();
        snapshot.clone()
    }

    #[tokio::test]
    async fn test_search_through_session() {
        init_test_tracing();
        let source = FakeSource::new().with_search("Apfel", vec![product("1", "Apfel", 52.0)]);
        let handle = spawn(test_controller(), Arc::new(source));

        handle.send(Intent::Search("Apfel".to_string())).await.unwrap();
        let snapshot = wait_until(&handle, |s| !s.displayed_products.is_empty()).await;

        assert_eq!(snapshot.displayed_products[0].display_macros.calories, 52.0);
        assert!(!snapshot.loading);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_latest_search_wins_when_earlier_response_is_late() {
        let gate_a = Arc::new(Notify::new());
        let source = Arc::new(
            FakeSource::new()
                .with_search("a", vec![product("a", "Apfel", 52.0)])
                .with_search("b", vec![product("b", "Banane", 89.0)])
                .with_gate("a", Arc::clone(&gate_a)),
        );
        let handle = spawn(test_controller(), source);

        handle.send(Intent::Search("a".to_string())).await.unwrap();
        handle.send(Intent::Search("b".to_string())).await.unwrap();
        let snapshot = wait_until(&handle, |s| !s.displayed_products.is_empty()).await;
        assert_eq!(snapshot.displayed_products[0].product.name, "Banane");

        // Release "a" after "b" has been applied
        gate_a.notify_one();
        handle
            .send(Intent::SetSearchTerm("b".to_string()))
            .await
            .unwrap();
        tokio::task::yield_now().await;

        let snapshot = handle.snapshot();
        assert_eq!(snapshot.displayed_products.len(), 1);
        assert_eq!(snapshot.displayed_products[0].product.name, "Banane");
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_intents_are_handled_while_search_in_flight() {
        let gate = Arc::new(Notify::new());
        let source = Arc::new(
            FakeSource::new()
                .with_search("slow", vec![product("1", "Apfel", 52.0)])
                .with_gate("slow", Arc::clone(&gate)),
        );
        let handle = spawn(test_controller(), source);

        handle.send(Intent::Search("slow".to_string())).await.unwrap();
        handle
            .send(Intent::AddToDaily(product("2", "Müsli", 100.0)))
            .await
            .unwrap();
        let snapshot = wait_until(&handle, |s| s.daily.totals.calories == 100.0).await;
        assert!(snapshot.loading);

        gate.notify_one();
        let snapshot = wait_until(&handle, |s| !s.loading).await;
        assert_eq!(snapshot.displayed_products.len(), 1);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_scan_not_found_through_session() {
        let handle = spawn(test_controller(), Arc::new(FakeSource::new()));

        handle.send(Intent::ToggleScanner).await.unwrap();
        handle
            .send(Intent::ScanResult("4000417025005".to_string()))
            .await
            .unwrap();
        let snapshot = wait_until(&handle, |s| s.error.is_some()).await;

        assert_eq!(snapshot.error.as_deref(), Some(MSG_NOT_FOUND));
        assert!(snapshot.displayed_products.is_empty());
        assert!(!snapshot.scanner_active);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_send_after_shutdown_fails() {
        let handle = spawn(test_controller(), Arc::new(FakeSource::new()));
        let intents = handle.intents.clone();
        handle.shutdown().await;

        assert!(intents.send(Intent::ToggleScanner).await.is_err());
    }
}
