//! Lectoria Inventory Core
//!
//! The inventory-consistency engine behind book bookings: it keeps each
//! book's `remaining_copies` counter in sync with its open bookings across
//! concurrent reserve, issue, return and cancel operations. The surrounding
//! REST, auth and search layers are external collaborators that call the
//! engine's API; they never touch the counters themselves.

pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use repository::{InventoryStore, Repository};
pub use services::inventory::InventoryEngine;
pub use services::sweeper::ExpirySweeper;
