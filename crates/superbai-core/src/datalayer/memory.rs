//! In-process data layer.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::{
    DataEvent, DataEventKind, DataItem, DataItemBuffer, DataLayer, DataListener, ListenerRegistration,
    Node,
};
use crate::error::{TransportError, TransportResult};

/// A message recorded by [`MemoryDataLayer::send_message`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub node_id: String,
    pub path: String,
    pub payload: Vec<u8>,
}

/// Reaction of a node to an incoming message, e.g. republishing data.
pub type MessageResponder = Arc<dyn Fn(&MemoryDataLayer, &SentMessage) + Send + Sync>;

#[derive(Default)]
struct Failures {
    nodes: Option<TransportError>,
    send: Option<TransportError>,
    items: Option<TransportError>,
}

#[derive(Default)]
struct State {
    nodes: Vec<Node>,
    items: BTreeMap<(String, String), DataItem>,
    listeners: BTreeMap<u64, DataListener>,
    next_listener_id: u64,
    outbox: Vec<SentMessage>,
    responders: HashMap<String, MessageResponder>,
    failures: Failures,
    latency: Option<Duration>,
}

#[derive(Default)]
struct Inner {
    state: Mutex<State>,
    open_buffers: AtomicUsize,
}

/// Data layer kept entirely in memory.
///
/// Data items persist for the lifetime of the value, which stands in for the
/// platform's on-device replica. Nodes can be given a [`MessageResponder`] to
/// emulate a phone that republishes its bookings on request.
#[derive(Clone, Default)]
pub struct MemoryDataLayer {
    inner: Arc<Inner>,
}

impl MemoryDataLayer {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn connect_node(&self, node: Node) {
        let mut state = self.state();
        state.nodes.retain(|existing| existing.id != node.id);
        state.nodes.push(node);
    }

    pub fn disconnect_node(&self, node_id: &str) {
        let mut state = self.state();
        state.nodes.retain(|node| node.id != node_id);
        state.responders.remove(node_id);
    }

    /// Install the reaction of `node_id` to messages sent to it.
    pub fn set_responder(
        &self,
        node_id: impl Into<String>,
        responder: impl Fn(&Self, &SentMessage) + Send + Sync + 'static,
    ) {
        self.state()
            .responders
            .insert(node_id.into(), Arc::new(responder));
    }

    /// Store a data item without notifying listeners.
    ///
    /// Models data replicated before this process started listening.
    pub fn seed_data_item(&self, item: DataItem) {
        self.state()
            .items
            .insert((item.path.clone(), item.source_node.clone()), item);
    }

    /// Store a data item and notify every listener.
    pub fn put_data_item(&self, item: DataItem) {
        self.seed_data_item(item.clone());
        self.dispatch(&[DataEvent {
            kind: DataEventKind::Changed,
            item,
        }]);
    }

    /// Remove a data item and notify every listener.
    pub fn delete_data_item(&self, path: &str, source_node: &str) {
        let removed = self
            .state()
            .items
            .remove(&(path.to_string(), source_node.to_string()));
        if let Some(item) = removed {
            self.dispatch(&[DataEvent {
                kind: DataEventKind::Deleted,
                item,
            }]);
        }
    }

    /// Deliver an arbitrary event batch, bypassing the item store.
    pub fn dispatch(&self, events: &[DataEvent]) {
        let listeners: Vec<DataListener> = self.state().listeners.values().cloned().collect();
        for listener in listeners {
            listener(events);
        }
    }

    /// Make node discovery fail until cleared with `None`.
    pub fn fail_node_queries(&self, error: Option<TransportError>) {
        self.state().failures.nodes = error;
    }

    /// Make message sends fail until cleared with `None`.
    pub fn fail_sends(&self, error: Option<TransportError>) {
        self.state().failures.send = error;
    }

    /// Make data item queries fail until cleared with `None`.
    pub fn fail_item_queries(&self, error: Option<TransportError>) {
        self.state().failures.items = error;
    }

    /// Delay every async call, to exercise overlapping operations.
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.state().latency = latency;
    }

    pub fn sent_messages(&self) -> Vec<SentMessage> {
        self.state().outbox.clone()
    }

    pub fn listener_count(&self) -> usize {
        self.state().listeners.len()
    }

    /// Query buffers handed out and not yet released.
    pub fn open_buffers(&self) -> usize {
        self.inner.open_buffers.load(Ordering::SeqCst)
    }

    async fn simulate_latency(&self) {
        let latency = self.state().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl DataLayer for MemoryDataLayer {
    async fn connected_nodes(&self) -> TransportResult<Vec<Node>> {
        self.simulate_latency().await;
        let state = self.state();
        if let Some(error) = &state.failures.nodes {
            return Err(error.clone());
        }
        Ok(state.nodes.clone())
    }

    async fn send_message(
        &self,
        node_id: &str,
        path: &str,
        payload: &[u8],
    ) -> TransportResult<()> {
        self.simulate_latency().await;
        let (message, responder) = {
            let mut state = self.state();
            if let Some(error) = &state.failures.send {
                return Err(error.clone());
            }
            if !state.nodes.iter().any(|node| node.id == node_id) {
                return Err(TransportError::NodeUnreachable(node_id.to_string()));
            }
            let message = SentMessage {
                node_id: node_id.to_string(),
                path: path.to_string(),
                payload: payload.to_vec(),
            };
            state.outbox.push(message.clone());
            (message, state.responders.get(node_id).cloned())
        };

        if let Some(responder) = responder {
            responder(self, &message);
        }
        Ok(())
    }

    async fn data_items(&self, path: &str) -> TransportResult<DataItemBuffer> {
        self.simulate_latency().await;
        let items: Vec<DataItem> = {
            let state = self.state();
            if let Some(error) = &state.failures.items {
                return Err(error.clone());
            }
            state
                .items
                .values()
                .filter(|item| item.path == path)
                .cloned()
                .collect()
        };

        self.inner.open_buffers.fetch_add(1, Ordering::SeqCst);
        let inner = Arc::clone(&self.inner);
        Ok(DataItemBuffer::new(items, move || {
            inner.open_buffers.fetch_sub(1, Ordering::SeqCst);
        }))
    }

    fn add_listener(&self, listener: DataListener) -> ListenerRegistration {
        let id = {
            let mut state = self.state();
            let id = state.next_listener_id;
            state.next_listener_id += 1;
            state.listeners.insert(id, listener);
            id
        };

        let inner = Arc::downgrade(&self.inner);
        ListenerRegistration::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner
                    .state
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .listeners
                    .remove(&id);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datalayer::DataMap;

    fn item(path: &str, node: &str, json: &str) -> DataItem {
        let mut data = DataMap::new();
        data.put_string("bookings_json", json);
        DataItem::new(path, node, data)
    }

    #[tokio::test]
    async fn send_to_unknown_node_is_unreachable() {
        let layer = MemoryDataLayer::new();
        let error = layer.send_message("ghost", "/x", &[]).await.unwrap_err();
        assert_eq!(error, TransportError::NodeUnreachable("ghost".to_string()));
        assert!(layer.sent_messages().is_empty());
    }

    #[tokio::test]
    async fn responder_runs_after_send() {
        let layer = MemoryDataLayer::new();
        layer.connect_node(Node::new("phone", "Pixel"));
        layer.set_responder("phone", |layer, message| {
            layer.put_data_item(item("/reply", &message.node_id, "[]"));
        });

        layer.send_message("phone", "/ask", &[]).await.unwrap();

        let buffer = layer.data_items("/reply").await.unwrap();
        assert_eq!(buffer.len(), 1);
        assert_eq!(layer.sent_messages()[0].path, "/ask");
    }

    #[tokio::test]
    async fn data_items_filters_by_path_and_tracks_buffers() {
        let layer = MemoryDataLayer::new();
        layer.seed_data_item(item("/a", "phone", "[]"));
        layer.seed_data_item(item("/b", "phone", "[]"));

        let buffer = layer.data_items("/a").await.unwrap();
        assert_eq!(buffer.len(), 1);
        assert_eq!(layer.open_buffers(), 1);
        drop(buffer);
        assert_eq!(layer.open_buffers(), 0);
    }

    #[test]
    fn listeners_receive_events_until_registration_dropped() {
        let layer = MemoryDataLayer::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let registration = layer.add_listener(Arc::new(move |events: &[DataEvent]| {
            counter.fetch_add(events.len(), Ordering::SeqCst);
        }));

        layer.put_data_item(item("/a", "phone", "[]"));
        assert_eq!(layer.listener_count(), 1);

        drop(registration);
        layer.put_data_item(item("/a", "phone", "[]"));
        assert_eq!(layer.listener_count(), 0);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn injected_failures_surface_as_errors() {
        let layer = MemoryDataLayer::new();
        layer.fail_node_queries(Some(TransportError::QueryFailed("radio off".to_string())));
        assert!(layer.connected_nodes().await.is_err());

        layer.fail_node_queries(None);
        assert!(layer.connected_nodes().await.unwrap().is_empty());
    }
}
