//! Clarity Sync Core
//!
//! Layered architecture:
//! - domain: Tasks, habits and habit logs
//! - repository: Storage strategies over local key-value storage and a live
//!   remote document store
//! - sync: Per-entity stores that switch strategy with the session
//! - auth: Session tracking over an identity provider
//! - streak: Derived habit views

pub mod app;
pub mod auth;
pub mod clock;
pub mod config;
pub mod domain;
pub mod error;
pub mod repository;
pub mod streak;
pub mod sync;

pub use app::Clarity;
pub use config::AppConfig;
pub use error::{SyncError, SyncResult};
