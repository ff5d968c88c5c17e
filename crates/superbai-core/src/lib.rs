//! superbai-core - Core library for Superbai Wear
//!
//! This crate contains the booking model, the observable sync store, and the
//! adapter that keeps the store in step with the paired phone over the
//! wearable data layer. Rendering lives in the shell crates.

pub mod config;
pub mod datalayer;
pub mod error;
pub mod models;
pub mod state;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{Booking, BookingStatus};
pub use state::{SyncStatus, SyncStore};
pub use sync::WearDataService;
