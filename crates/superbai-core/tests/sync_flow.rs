use std::sync::Arc;

use pretty_assertions::assert_eq;
use superbai_core::config::{SyncSettings, BOOKING_DATA_PATH, DATA_KEY};
use superbai_core::datalayer::{DataItem, DataMap, MemoryDataLayer, Node};
use superbai_core::sync::CacheOutcome;
use superbai_core::{Booking, SyncStatus, WearDataService};

const CACHED_PAYLOAD: &str = r#"[{"id":"1","serviceName":"Cleaning","status":"Pending","maidName":"Anita","maidId":"m1","timeSlot":"9-12","bookingDate":"2024-01-01","todayStatus":"Not Started"}]"#;

fn bookings_item(node: &str, json: &str) -> DataItem {
    let mut data = DataMap::new();
    data.put_string(DATA_KEY, json);
    DataItem::new(BOOKING_DATA_PATH, node, data)
}

#[tokio::test]
async fn cached_payload_seeds_store_on_cold_start() {
    let layer = MemoryDataLayer::new();
    layer.seed_data_item(bookings_item("phone", CACHED_PAYLOAD));

    let service = WearDataService::new(Arc::new(layer.clone()), SyncSettings::default());
    let outcome = service.load_cached().await;

    assert_eq!(outcome, CacheOutcome::Seeded { count: 1 });
    let bookings = service.view().bookings();
    assert_eq!(bookings.len(), 1);
    assert_eq!(bookings[0].service_name, "Cleaning");
    assert_eq!(bookings[0].maid_name, "Anita");
    assert_eq!(layer.open_buffers(), 0);
}

#[tokio::test]
async fn invalid_push_does_not_clear_seeded_bookings() {
    let layer = MemoryDataLayer::new();
    layer.seed_data_item(bookings_item("phone", CACHED_PAYLOAD));
    let service = WearDataService::connect(Arc::new(layer.clone()), SyncSettings::default()).await;
    service.load_cached().await;

    layer.put_data_item(bookings_item("phone", ""));
    layer.put_data_item(bookings_item("phone", "[{\"id\":\"2\"}]"));

    let bookings = service.view().bookings();
    assert_eq!(bookings, Booking::decode_list(CACHED_PAYLOAD));
}

#[tokio::test]
async fn startup_then_refresh_replaces_stale_cache() {
    let layer = MemoryDataLayer::new();
    layer.seed_data_item(bookings_item("phone", CACHED_PAYLOAD));
    layer.connect_node(Node::new("phone", "Pixel 8"));
    let fresh = r#"[{"id":"2","serviceName":"Cooking","status":"In Progress","maidName":"Rekha","maidId":"m2","timeSlot":"18-20","bookingDate":"2024-01-02"}]"#;
    layer.set_responder("phone", move |layer, message| {
        layer.put_data_item(bookings_item(&message.node_id, fresh));
    });

    let service = WearDataService::connect(Arc::new(layer.clone()), SyncSettings::default()).await;
    let mut updates = service.view().subscribe_bookings();

    service.load_cached().await;
    assert_eq!(service.view().status().status, SyncStatus::Seeded);

    let report = service.request_refresh().await;
    assert_eq!(report.requested, 1);

    let latest = updates.next().await.unwrap();
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].service_name, "Cooking");
    assert_eq!(latest[0].today_status, "Not Started");
    assert!(service.view().is_connected());
    assert_eq!(service.view().status().status, SyncStatus::Updated);
}

#[tokio::test]
async fn refresh_with_no_peers_changes_nothing() {
    let layer = MemoryDataLayer::new();
    let service = WearDataService::connect(Arc::new(layer.clone()), SyncSettings::default()).await;

    let report = service.request_refresh().await;

    assert_eq!(report.nodes, 0);
    assert!(layer.sent_messages().is_empty());
    assert!(service.view().bookings().is_empty());
    assert!(!service.view().is_connected());
}
