//! Wearable data layer seam.
//!
//! Models the platform primitives the sync adapter relies on: connected node
//! discovery, one-way messages, replicated key-value data items, and change
//! listeners. Platform bindings implement [`DataLayer`]; [`MemoryDataLayer`]
//! is the in-process implementation used by the shell's phone emulation and
//! by tests.

mod memory;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TransportResult;

pub use memory::{MemoryDataLayer, MessageResponder, SentMessage};

/// A paired device reachable over the data layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
}

impl Node {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// One value inside a [`DataMap`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataValue {
    Bool(bool),
    Int(i64),
    String(String),
    Bytes(Vec<u8>),
}

/// Key-value payload carried by a data item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataMap(BTreeMap<String, DataValue>);

impl DataMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// String value under `key`; `None` if absent or not a string.
    pub fn get_string(&self, key: &str) -> Option<&str> {
        match self.0.get(key) {
            Some(DataValue::String(value)) => Some(value),
            _ => None,
        }
    }

    pub fn put_string(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), DataValue::String(value.into()));
    }

    pub fn put(&mut self, key: impl Into<String>, value: DataValue) {
        self.0.insert(key.into(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A replicated data item, addressed by path and the node that wrote it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataItem {
    pub path: String,
    pub source_node: String,
    #[serde(default)]
    pub data: DataMap,
}

impl DataItem {
    pub fn new(path: impl Into<String>, source_node: impl Into<String>, data: DataMap) -> Self {
        Self {
            path: path.into(),
            source_node: source_node.into(),
            data,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataEventKind {
    Changed,
    Deleted,
}

/// Change notification delivered to listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataEvent {
    pub kind: DataEventKind,
    pub item: DataItem,
}

/// Callback invoked with each batch of data events.
pub type DataListener = Arc<dyn Fn(&[DataEvent]) + Send + Sync>;

type ReleaseFn = Box<dyn FnOnce() + Send>;

/// Handle for a registered listener. Dropping it unregisters the listener.
pub struct ListenerRegistration {
    release: Option<ReleaseFn>,
}

impl ListenerRegistration {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }
}

impl fmt::Debug for ListenerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistration")
            .field("active", &self.release.is_some())
            .finish()
    }
}

impl Drop for ListenerRegistration {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

/// Result set of a data item query.
///
/// Holds a platform handle that is released on drop, so every exit path of a
/// caller gives it back.
pub struct DataItemBuffer {
    items: Vec<DataItem>,
    release: Option<ReleaseFn>,
}

impl DataItemBuffer {
    pub fn new(items: Vec<DataItem>, release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            items,
            release: Some(Box::new(release)),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DataItem> {
        self.items.iter()
    }
}

impl<'a> IntoIterator for &'a DataItemBuffer {
    type Item = &'a DataItem;
    type IntoIter = std::slice::Iter<'a, DataItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl fmt::Debug for DataItemBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataItemBuffer")
            .field("items", &self.items)
            .field("released", &self.release.is_none())
            .finish()
    }
}

impl Drop for DataItemBuffer {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

/// Platform data layer used by the sync adapter.
#[async_trait]
pub trait DataLayer: Send + Sync + 'static {
    /// Nodes currently connected to this device.
    async fn connected_nodes(&self) -> TransportResult<Vec<Node>>;

    /// Send a one-way message to `node_id`. No reply is defined.
    async fn send_message(&self, node_id: &str, path: &str, payload: &[u8])
        -> TransportResult<()>;

    /// Locally materialized data items at `path`, from any source node.
    async fn data_items(&self, path: &str) -> TransportResult<DataItemBuffer>;

    /// Register a change listener for all data items.
    fn add_listener(&self, listener: DataListener) -> ListenerRegistration;
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn data_map_get_string_ignores_other_types() {
        let mut data = DataMap::new();
        data.put_string("bookings_json", "[]");
        data.put("count", DataValue::Int(3));

        assert_eq!(data.get_string("bookings_json"), Some("[]"));
        assert_eq!(data.get_string("count"), None);
        assert_eq!(data.get_string("missing"), None);
    }

    #[test]
    fn data_map_deserializes_from_plain_object() {
        let data: DataMap =
            serde_json::from_str(r#"{"bookings_json":"[]","synced":true,"count":2}"#).unwrap();
        assert_eq!(data.get_string("bookings_json"), Some("[]"));
        assert_eq!(data.get_string("synced"), None);
    }

    #[test]
    fn buffer_releases_once_on_drop() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&released);
        let buffer = DataItemBuffer::new(Vec::new(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(buffer.is_empty());
        drop(buffer);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn registration_releases_on_drop() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&released);
        let registration = ListenerRegistration::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        drop(registration);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }
}
