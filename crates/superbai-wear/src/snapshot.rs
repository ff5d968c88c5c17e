//! Phone emulation backed by a JSON snapshot file.
//!
//! The snapshot describes what the data layer looks like when the watch app
//! starts: connected phones, data items already replicated to the watch, and
//! the bookings each phone republishes when asked.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use superbai_core::config::SyncSettings;
use superbai_core::datalayer::{DataItem, DataMap, MemoryDataLayer, Node};
use superbai_core::Booking;

use crate::error::WearError;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct PhoneSnapshot {
    pub nodes: Vec<Node>,
    /// Data items already materialized on the watch
    pub cached_items: Vec<DataItem>,
    /// Bookings each node publishes in reply to a refresh request
    pub republish: BTreeMap<String, Vec<Booking>>,
}

impl PhoneSnapshot {
    pub fn load(path: &Path) -> Result<Self, WearError> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|error| WearError::Snapshot {
            path: path.display().to_string(),
            reason: error.to_string(),
        })
    }

    /// Build a data layer that behaves like the phones in this snapshot.
    pub fn into_data_layer(self, settings: &SyncSettings) -> Result<MemoryDataLayer, WearError> {
        let layer = MemoryDataLayer::new();
        for node in self.nodes {
            layer.connect_node(node);
        }
        for item in self.cached_items {
            layer.seed_data_item(item);
        }

        for (node_id, bookings) in self.republish {
            let payload = Booking::encode_list(&bookings)?;
            let request_path = settings.request_path.clone();
            let bookings_path = settings.bookings_path.clone();
            let data_key = settings.data_key.clone();
            layer.set_responder(node_id, move |layer, message| {
                if message.path != request_path {
                    return;
                }
                let mut data = DataMap::new();
                data.put_string(data_key.as_str(), payload.as_str());
                layer.put_data_item(DataItem::new(
                    bookings_path.as_str(),
                    message.node_id.as_str(),
                    data,
                ));
            });
        }
        Ok(layer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use superbai_core::datalayer::DataLayer;

    const SNAPSHOT: &str = r#"{
        "nodes": [{"id": "phone", "displayName": "Pixel 8"}],
        "cached_items": [{
            "path": "/superbai/bookings",
            "sourceNode": "phone",
            "data": {"bookings_json": "[]"}
        }],
        "republish": {
            "phone": [{
                "id": "1",
                "serviceName": "Cleaning",
                "status": "In Progress",
                "maidName": "Anita",
                "maidId": "m1",
                "timeSlot": "9:00 - 12:00",
                "bookingDate": "2024-01-01",
                "todayStatus": "Present"
            }]
        }
    }"#;

    #[test]
    fn load_reports_path_on_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("phone.json");
        std::fs::write(&path, r#"{"phones": []}"#).unwrap();

        let error = PhoneSnapshot::load(&path).unwrap_err();
        assert!(error.to_string().contains("phone.json"));
    }

    #[tokio::test]
    async fn data_layer_replays_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("phone.json");
        std::fs::write(&path, SNAPSHOT).unwrap();
        let settings = SyncSettings::default();

        let layer = PhoneSnapshot::load(&path)
            .unwrap()
            .into_data_layer(&settings)
            .unwrap();

        assert_eq!(layer.connected_nodes().await.unwrap().len(), 1);
        assert_eq!(layer.data_items(&settings.bookings_path).await.unwrap().len(), 1);

        layer
            .send_message("phone", &settings.request_path, &[])
            .await
            .unwrap();
        let buffer = layer.data_items(&settings.bookings_path).await.unwrap();
        let payload = buffer
            .iter()
            .find_map(|item| item.data.get_string(&settings.data_key))
            .unwrap();
        assert_eq!(Booking::decode_list(payload)[0].maid_name, "Anita");
    }
}
