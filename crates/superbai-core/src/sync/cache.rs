//! Cold-start seeding from the locally materialized data layer replica.

use crate::models::Booking;
use crate::state::SyncStatus;
use crate::util::compact_text;

use super::WearDataService;

/// Result of [`WearDataService::load_cached`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// A cached list was published to the store
    Seeded { count: usize },
    /// A cached list decoded, but a newer update reached the store first
    Superseded,
    /// No cached item carried a bookings payload
    Empty,
    /// Cached payloads existed but none decoded
    Malformed,
    /// The data item query failed
    Failed,
}

impl WearDataService {
    /// Seed the store from data items the platform already holds locally.
    ///
    /// Works without a live connection. When several nodes left an item, the
    /// last decodable one wins. The query buffer is released on every path.
    pub async fn load_cached(&self) -> CacheOutcome {
        let store = &self.inner.store;
        let settings = &self.inner.settings;
        let ticket = store.begin_bookings_update();
        let previous = store.status().status;
        store.advance_status(SyncStatus::LoadingCache);

        let buffer = match self.inner.layer.data_items(&settings.bookings_path).await {
            Ok(buffer) => buffer,
            Err(error) => {
                tracing::warn!("Error loading cached bookings: {error}");
                if previous == SyncStatus::Uninitialized {
                    store.advance_status(SyncStatus::Empty);
                } else {
                    store.revert_status(SyncStatus::LoadingCache, previous);
                }
                return CacheOutcome::Failed;
            }
        };

        let mut saw_payload = false;
        let mut latest: Option<Vec<Booking>> = None;
        for item in &buffer {
            let Some(payload) = item.data.get_string(&settings.data_key) else {
                continue;
            };
            saw_payload = true;
            match Booking::try_decode_list(payload) {
                Ok(bookings) => latest = Some(bookings),
                Err(error) => tracing::warn!(
                    "Skipping malformed cached bookings from {} ({error}): {}",
                    item.source_node,
                    compact_text(payload)
                ),
            }
        }
        drop(buffer);

        let Some(bookings) = latest else {
            store.advance_status(SyncStatus::Empty);
            if saw_payload {
                return CacheOutcome::Malformed;
            }
            tracing::debug!("No cached bookings at {}", settings.bookings_path);
            return CacheOutcome::Empty;
        };

        let count = bookings.len();
        if !store.apply_bookings(ticket, bookings) {
            tracing::debug!("Cached bookings superseded by a newer update");
            return CacheOutcome::Superseded;
        }

        tracing::info!("Loaded {count} cached bookings");
        store.advance_status(if count == 0 {
            SyncStatus::Empty
        } else {
            SyncStatus::Seeded
        });
        CacheOutcome::Seeded { count }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::config::{SyncSettings, BOOKING_DATA_PATH, DATA_KEY};
    use crate::datalayer::{DataItem, DataMap, MemoryDataLayer};
    use crate::error::TransportError;
    use crate::models::DEFAULT_TODAY_STATUS;

    fn booking(id: &str) -> Booking {
        Booking {
            id: id.to_string(),
            service_name: "Cleaning".to_string(),
            status: "Pending".to_string(),
            maid_name: "Anita".to_string(),
            maid_id: "m1".to_string(),
            time_slot: "9-12".to_string(),
            booking_date: "2024-01-01".to_string(),
            today_status: DEFAULT_TODAY_STATUS.to_string(),
        }
    }

    fn cached(node: &str, json: &str) -> DataItem {
        let mut data = DataMap::new();
        data.put_string(DATA_KEY, json);
        DataItem::new(BOOKING_DATA_PATH, node, data)
    }

    fn service(layer: &MemoryDataLayer) -> WearDataService {
        WearDataService::new(Arc::new(layer.clone()), SyncSettings::default())
    }

    #[tokio::test]
    async fn seeds_store_from_cached_item() {
        let layer = MemoryDataLayer::new();
        let payload = Booking::encode_list(&[booking("1"), booking("2")]).unwrap();
        layer.seed_data_item(cached("phone", &payload));
        let service = service(&layer);

        assert_eq!(service.load_cached().await, CacheOutcome::Seeded { count: 2 });
        assert_eq!(service.view().bookings(), vec![booking("1"), booking("2")]);
        assert_eq!(service.view().status().status, SyncStatus::Seeded);
        assert_eq!(layer.open_buffers(), 0);
    }

    #[tokio::test]
    async fn missing_cache_leaves_store_empty() {
        let layer = MemoryDataLayer::new();
        let service = service(&layer);

        assert_eq!(service.load_cached().await, CacheOutcome::Empty);
        assert!(service.view().bookings().is_empty());
        assert_eq!(service.view().status().status, SyncStatus::Empty);
        assert_eq!(layer.open_buffers(), 0);
    }

    #[tokio::test]
    async fn malformed_cache_is_ignored_and_buffer_released() {
        let layer = MemoryDataLayer::new();
        layer.seed_data_item(cached("phone", "{not json"));
        let service = service(&layer);

        assert_eq!(service.load_cached().await, CacheOutcome::Malformed);
        assert!(service.view().bookings().is_empty());
        assert_eq!(layer.open_buffers(), 0);
    }

    #[tokio::test]
    async fn query_failure_is_swallowed() {
        let layer = MemoryDataLayer::new();
        layer.fail_item_queries(Some(TransportError::QueryFailed("replica locked".to_string())));
        let service = service(&layer);

        assert_eq!(service.load_cached().await, CacheOutcome::Failed);
        assert!(service.view().bookings().is_empty());
        assert_eq!(service.view().status().status, SyncStatus::Empty);
    }

    #[tokio::test]
    async fn failed_reload_keeps_seeded_status() {
        let layer = MemoryDataLayer::new();
        let payload = Booking::encode_list(&[booking("1")]).unwrap();
        layer.seed_data_item(cached("phone", &payload));
        let service = service(&layer);
        assert_eq!(service.load_cached().await, CacheOutcome::Seeded { count: 1 });

        layer.fail_item_queries(Some(TransportError::QueryFailed("replica locked".to_string())));
        assert_eq!(service.load_cached().await, CacheOutcome::Failed);

        assert_eq!(service.view().bookings(), vec![booking("1")]);
        assert_eq!(service.view().status().status, SyncStatus::Seeded);
    }

    #[tokio::test]
    async fn decodable_item_wins_over_malformed_sibling() {
        let layer = MemoryDataLayer::new();
        let payload = Booking::encode_list(&[booking("1")]).unwrap();
        layer.seed_data_item(cached("phone-a", &payload));
        layer.seed_data_item(cached("phone-b", "garbage"));
        let service = service(&layer);

        assert_eq!(service.load_cached().await, CacheOutcome::Seeded { count: 1 });
        assert_eq!(service.view().bookings(), vec![booking("1")]);
    }

    #[tokio::test(start_paused = true)]
    async fn push_during_cache_query_is_not_overwritten() {
        let layer = MemoryDataLayer::new();
        let stale = Booking::encode_list(&[booking("old")]).unwrap();
        layer.seed_data_item(cached("phone", &stale));
        layer.set_latency(Some(Duration::from_millis(50)));
        let service = service(&layer);
        service.start_listening();

        let loader = {
            let service = service.clone();
            tokio::spawn(async move { service.load_cached().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        let fresh = Booking::encode_list(&[booking("new")]).unwrap();
        layer.put_data_item(cached("phone", &fresh));

        assert_eq!(loader.await.unwrap(), CacheOutcome::Superseded);
        assert_eq!(service.view().bookings(), vec![booking("new")]);
        assert_eq!(service.view().status().status, SyncStatus::Updated);
        assert_eq!(layer.open_buffers(), 0);
    }
}
