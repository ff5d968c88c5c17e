//! Data models for Superbai Wear

mod booking;
mod status;

pub use booking::{Booking, DEFAULT_TODAY_STATUS};
pub use status::{BookingStatus, Tone};
