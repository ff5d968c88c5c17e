//! Text rendering of the watch screen.

use chrono::{Local, TimeZone};
use serde::Serialize;
use superbai_core::sync::SyncView;
use superbai_core::{Booking, SyncStatus};

const TITLE: &str = "SUPERBAI";
const EMPTY_STATE: &str = "Waiting for bookings...";
const DISCONNECTED: &str = "Phone disconnected";

/// Everything the booking screen shows, in a serializable form.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ScreenModel {
    pub connected: bool,
    pub status: &'static str,
    pub last_updated_at: Option<i64>,
    pub bookings: Vec<BookingCard>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BookingCard {
    pub id: String,
    pub service: String,
    pub status: String,
    pub status_color: &'static str,
    pub maid: String,
    pub time_slot: String,
    pub date: String,
    pub today: String,
}

impl From<&Booking> for BookingCard {
    fn from(booking: &Booking) -> Self {
        let status = booking.booking_status();
        Self {
            id: booking.id.clone(),
            service: booking.service_name.clone(),
            status: status.to_string(),
            status_color: status.tone().hex_color(),
            maid: booking.maid_name.clone(),
            time_slot: booking.time_slot.clone(),
            date: booking.booking_date.clone(),
            today: booking.today_status.clone(),
        }
    }
}

impl ScreenModel {
    pub fn from_view(view: &SyncView) -> Self {
        let snapshot = view.status();
        Self {
            connected: view.is_connected(),
            status: status_label(snapshot.status),
            last_updated_at: snapshot.last_updated_at,
            bookings: view.bookings().iter().map(BookingCard::from).collect(),
        }
    }
}

pub const fn status_label(status: SyncStatus) -> &'static str {
    match status {
        SyncStatus::Uninitialized => "uninitialized",
        SyncStatus::LoadingCache => "loading",
        SyncStatus::Seeded => "cached",
        SyncStatus::Empty => "empty",
        SyncStatus::Refreshing => "refreshing",
        SyncStatus::Updated => "updated",
    }
}

/// Render the screen as the lines the watch would display.
///
/// Stale bookings stay visible while disconnected.
pub fn render_screen(model: &ScreenModel) -> Vec<String> {
    let mut lines = vec![TITLE.to_string()];
    if !model.connected {
        lines.push(format!("[{DISCONNECTED}]"));
    }
    if let Some(updated) = model.last_updated_at.and_then(format_updated_at) {
        lines.push(format!("Updated {updated}"));
    }

    if model.bookings.is_empty() {
        lines.push(String::new());
        lines.push(EMPTY_STATE.to_string());
        return lines;
    }

    for card in &model.bookings {
        lines.push(String::new());
        lines.push(card.service.clone());
        lines.push(format!("{} ({})", card.status, card.status_color));
        lines.push(format!("Maid: {}", card.maid));
        lines.push(format!("Time: {}", card.time_slot));
        if !card.date.is_empty() {
            lines.push(format!("Date: {}", card.date));
        }
        lines.push(format!("Today: {}", card.today));
    }
    lines
}

fn format_updated_at(unix_ms: i64) -> Option<String> {
    Local
        .timestamp_millis_opt(unix_ms)
        .single()
        .map(|time| time.format("%H:%M:%S").to_string())
}
