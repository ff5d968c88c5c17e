//! Booking sync over the wearable data layer.
//!
//! [`WearDataService`] listens for bookings pushed by the phone, asks the
//! phone to republish on demand, and probes connectivity. Every data layer
//! failure is logged and swallowed: the store keeps its last good values and
//! callers never see a transport error.

mod cache;

use std::sync::{Arc, Mutex, PoisonError};

use crate::config::SyncSettings;
use crate::datalayer::{
    DataEvent, DataEventKind, DataLayer, DataListener, ListenerRegistration, Node,
};
use crate::models::Booking;
use crate::state::{StatusSnapshot, Subscription, SyncStatus, SyncStore};
use crate::util::compact_text;

pub use cache::CacheOutcome;

/// Outcome of one [`WearDataService::request_refresh`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Connected nodes found
    pub nodes: usize,
    /// Nodes that accepted the request message
    pub requested: usize,
    /// Nodes the request could not be delivered to
    pub failed: usize,
    /// Node discovery itself failed
    pub discovery_failed: bool,
}

/// Read-only view of the sync store for the presentation layer.
#[derive(Clone)]
pub struct SyncView {
    store: Arc<SyncStore>,
}

impl SyncView {
    pub fn bookings(&self) -> Vec<Booking> {
        self.store.bookings()
    }

    pub fn is_connected(&self) -> bool {
        self.store.is_connected()
    }

    pub fn status(&self) -> StatusSnapshot {
        self.store.status()
    }

    pub fn subscribe_bookings(&self) -> Subscription<Vec<Booking>> {
        self.store.subscribe_bookings()
    }

    pub fn subscribe_connectivity(&self) -> Subscription<bool> {
        self.store.subscribe_connectivity()
    }

    pub fn subscribe_status(&self) -> tokio::sync::watch::Receiver<StatusSnapshot> {
        self.store.subscribe_status()
    }
}

struct ServiceInner {
    layer: Arc<dyn DataLayer>,
    store: Arc<SyncStore>,
    settings: SyncSettings,
    listener: Mutex<Option<ListenerRegistration>>,
}

/// Session object tying the sync store to a data layer.
///
/// Cheap to clone; the listener registration is released when the last clone
/// is dropped.
#[derive(Clone)]
pub struct WearDataService {
    inner: Arc<ServiceInner>,
}

impl WearDataService {
    /// Create a service with a fresh, empty store. Nothing is registered yet.
    pub fn new(layer: Arc<dyn DataLayer>, settings: SyncSettings) -> Self {
        Self::with_store(layer, Arc::new(SyncStore::new()), settings)
    }

    pub fn with_store(layer: Arc<dyn DataLayer>, store: Arc<SyncStore>, settings: SyncSettings) -> Self {
        Self {
            inner: Arc::new(ServiceInner {
                layer,
                store,
                settings,
                listener: Mutex::new(None),
            }),
        }
    }

    /// Create a service, start listening, and probe connectivity once.
    pub async fn connect(layer: Arc<dyn DataLayer>, settings: SyncSettings) -> Self {
        let service = Self::new(layer, settings);
        service.start_listening();
        service.probe_connectivity().await;
        service
    }

    pub fn view(&self) -> SyncView {
        SyncView {
            store: Arc::clone(&self.inner.store),
        }
    }

    /// Register the bookings listener. Returns `false` if already registered.
    pub fn start_listening(&self) -> bool {
        let mut listener = self
            .inner
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if listener.is_some() {
            tracing::debug!("Bookings listener already registered");
            return false;
        }

        let store = Arc::clone(&self.inner.store);
        let settings = self.inner.settings.clone();
        let callback: DataListener = Arc::new(move |events: &[DataEvent]| {
            handle_data_events(&store, &settings, events);
        });
        *listener = Some(self.inner.layer.add_listener(callback));
        tracing::info!(
            "Listening for bookings at {}",
            self.inner.settings.bookings_path
        );
        true
    }

    /// Release the bookings listener, if registered.
    pub fn stop_listening(&self) {
        let registration = self
            .inner
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if registration.is_some() {
            tracing::info!("Stopped listening for bookings");
        }
    }

    pub fn is_listening(&self) -> bool {
        self.inner
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Ask every connected phone to republish its bookings.
    ///
    /// Fire-and-forget: replies arrive later through the listener. Having no
    /// connected node is a no-op.
    pub async fn request_refresh(&self) -> RefreshReport {
        let mut report = RefreshReport::default();
        let nodes = match self.inner.layer.connected_nodes().await {
            Ok(nodes) => nodes,
            Err(error) => {
                tracing::warn!("Error requesting data from phone: {error}");
                report.discovery_failed = true;
                return report;
            }
        };

        report.nodes = nodes.len();
        if nodes.is_empty() {
            tracing::debug!("No connected nodes, skipping data request");
            return report;
        }

        let revision = self.inner.store.bookings_revision();
        for node in &nodes {
            match self
                .inner
                .layer
                .send_message(&node.id, &self.inner.settings.request_path, &[])
                .await
            {
                Ok(()) => {
                    report.requested += 1;
                    if report.requested == 1 {
                        self.inner
                            .store
                            .advance_status_at(revision, SyncStatus::Refreshing);
                    }
                    tracing::debug!("Sent data request to phone: {}", display_name(node));
                }
                Err(error) => {
                    report.failed += 1;
                    tracing::warn!(
                        "Failed to send data request to {}: {error}",
                        display_name(node)
                    );
                }
            }
        }
        report
    }

    /// Publish whether any node is connected.
    ///
    /// Returns the published value, or `None` if discovery failed; a failed
    /// probe leaves the connectivity flag untouched.
    pub async fn probe_connectivity(&self) -> Option<bool> {
        let ticket = self.inner.store.begin_connectivity_update();
        match self.inner.layer.connected_nodes().await {
            Ok(nodes) => {
                tracing::debug!("Connected nodes: {}", nodes.len());
                let connected = !nodes.is_empty();
                self.inner.store.apply_connectivity(ticket, connected);
                Some(connected)
            }
            Err(error) => {
                tracing::warn!("Error checking connection: {error}");
                None
            }
        }
    }
}

fn display_name(node: &Node) -> &str {
    if node.display_name.is_empty() {
        &node.id
    } else {
        &node.display_name
    }
}

fn handle_data_events(store: &SyncStore, settings: &SyncSettings, events: &[DataEvent]) {
    for event in events {
        if event.item.path != settings.bookings_path {
            continue;
        }
        if event.kind != DataEventKind::Changed {
            tracing::debug!("Ignoring {:?} event at {}", event.kind, event.item.path);
            continue;
        }

        let ticket = store.begin_bookings_update();
        let Some(payload) = event.item.data.get_string(&settings.data_key) else {
            tracing::warn!(
                "Booking data from {} has no '{}' entry",
                event.item.source_node,
                settings.data_key
            );
            continue;
        };

        match Booking::try_decode_list(payload) {
            Ok(bookings) => {
                tracing::info!(
                    "Received {} bookings from phone {}",
                    bookings.len(),
                    event.item.source_node
                );
                if store.apply_bookings(ticket, bookings) {
                    store.advance_status(SyncStatus::Updated);
                }
            }
            Err(error) => {
                tracing::warn!(
                    "Ignoring malformed booking payload ({error}): {}",
                    compact_text(payload)
                );
            }
        }
    }
}
