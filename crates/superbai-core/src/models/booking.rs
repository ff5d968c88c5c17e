//! Booking model

use serde::{Deserialize, Serialize};

use super::BookingStatus;
use crate::Result;

/// Value used when the phone omits `todayStatus`.
pub const DEFAULT_TODAY_STATUS: &str = "Not Started";

/// A service booking as published by the paired phone.
///
/// Field names on the wire are camelCase (`serviceName`, `maidId`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    /// Unique within one sync batch
    pub id: String,
    pub service_name: String,
    /// Free-form status label, see [`BookingStatus::classify`]
    pub status: String,
    pub maid_name: String,
    pub maid_id: String,
    /// Display string such as "9:00 - 12:00"
    pub time_slot: String,
    pub booking_date: String,
    #[serde(default = "default_today_status")]
    pub today_status: String,
}

fn default_today_status() -> String {
    DEFAULT_TODAY_STATUS.to_string()
}

impl Booking {
    /// Decode a single booking object.
    ///
    /// Returns `None` for any malformed payload instead of an error.
    #[must_use]
    pub fn decode(payload: &str) -> Option<Self> {
        match serde_json::from_str(payload) {
            Ok(booking) => Some(booking),
            Err(error) => {
                tracing::debug!("Discarding malformed booking payload: {error}");
                None
            }
        }
    }

    /// Decode a JSON array of bookings, yielding an empty list on any error.
    #[must_use]
    pub fn decode_list(payload: &str) -> Vec<Self> {
        Self::try_decode_list(payload).unwrap_or_default()
    }

    /// Decode a JSON array of bookings, reporting malformed payloads.
    ///
    /// A well-formed empty array is `Ok(vec![])`, which lets callers tell an
    /// intentionally empty list apart from garbage.
    pub fn try_decode_list(payload: &str) -> Result<Vec<Self>> {
        Ok(serde_json::from_str(payload)?)
    }

    /// Encode to the canonical JSON object form.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Encode a list of bookings as the JSON array the phone publishes.
    pub fn encode_list(bookings: &[Self]) -> Result<String> {
        Ok(serde_json::to_string(bookings)?)
    }

    /// Classified status used for display treatment.
    #[must_use]
    pub fn booking_status(&self) -> BookingStatus {
        BookingStatus::classify(&self.status)
    }
}
