//! Data layer addressing shared by the phone and the watch.
//!
//! Both sides must agree on the data item path, the message path used to ask
//! for a republish, and the data map key that carries the bookings JSON.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::normalize_text_option;

/// Data item path the phone publishes bookings under.
pub const BOOKING_DATA_PATH: &str = "/superbai/bookings";
/// Message path asking the phone to republish its bookings.
pub const REQUEST_DATA_PATH: &str = "/superbai/request_data";
/// Data map key holding the bookings JSON array.
pub const DATA_KEY: &str = "bookings_json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct SyncSettings {
    pub bookings_path: String,
    pub request_path: String,
    pub data_key: String,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            bookings_path: BOOKING_DATA_PATH.to_string(),
            request_path: REQUEST_DATA_PATH.to_string(),
            data_key: DATA_KEY.to_string(),
        }
    }
}

impl SyncSettings {
    /// Trim fields and check that paths are absolute and the key is present.
    pub fn validated(self) -> Result<Self> {
        let bookings_path = normalize_path(self.bookings_path, "bookings_path")?;
        let request_path = normalize_path(self.request_path, "request_path")?;
        if bookings_path == request_path {
            return Err(Error::Config(
                "bookings_path and request_path must differ".to_string(),
            ));
        }
        let data_key = normalize_text_option(Some(self.data_key))
            .ok_or_else(|| Error::Config("data_key must not be empty".to_string()))?;

        Ok(Self {
            bookings_path,
            request_path,
            data_key,
        })
    }
}

fn normalize_path(raw: String, field: &str) -> Result<String> {
    let path = normalize_text_option(Some(raw))
        .ok_or_else(|| Error::Config(format!("{field} must not be empty")))?;
    if !path.starts_with('/') {
        return Err(Error::Config(format!("{field} must start with '/'")));
    }
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(Error::Config(format!("{field} must name a path below '/'")));
    }
    Ok(trimmed.to_string())
}
