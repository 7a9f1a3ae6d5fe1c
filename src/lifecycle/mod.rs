//! Runtime orchestration and lifecycle management.
//!
//! This module contains the infrastructure for managing the application's runtime environment,
//! including:
//!
//! - **Actor lifecycle management**: Starting, wiring, and shutting down actors
//! - **Configuration**: CLI flags, `BASKET_SYNC_*` environment variables and `.env` files
//! - **Observability setup**: Initializing tracing and logging
//!
//! # Main Components
//!
//! - [`ShopSystem`] - The orchestrator that owns every actor and task of the sync layer
//! - [`Services`] - The external collaborators the system is built over
//! - [`SyncConfig`] - Tunables (price threshold, merge policy, mailbox size, cache directory)
//! - [`setup_tracing`] - Initializes the tracing/logging infrastructure

pub mod config;
pub mod shop_system;
pub mod tracing;

pub use config::*;
pub use shop_system::*;
pub use self::tracing::*;
