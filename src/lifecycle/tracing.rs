//! # Observability & Tracing
//!
//! The [`setup_tracing`] function initializes structured logging with the `tracing` crate.
//!
//! ## Configuration
//!
//! Log lines use the compact format without the crate/module prefix (`with_target(false)`).
//! The resource a line is about is carried as a structured `resource` field instead.
//!
//! ```bash
//! # Transitions, commits, rollbacks (default)
//! RUST_LOG=info cargo run
//!
//! # Every store request with its sequence number
//! RUST_LOG=debug cargo run
//!
//! # Only the engine
//! RUST_LOG=basket_sync::engine=debug cargo run
//! ```
//!
//! ## What Gets Traced
//!
//! - **Actor lifecycle**: `Store started`, `Coordinator started`, `Shutdown`
//! - **Reconciliation**: `Predicted seq=3`, `Committed seq=3`, `Rolled back`,
//!   `Discarded stale response`, `Converged on missing item`
//! - **Session**: `Login started`, `Merging guest items`, `Logged out`
//!
//! A failed add with `RUST_LOG=debug` reads:
//!
//! ```text
//! DEBUG Begin resource=cart seq=4 mutation="add"
//! DEBUG Predicted resource=cart seq=4 mutation="add"
//! WARN Rolled back resource=cart seq=4 found=true
//! WARN Remote call failed resource=cart error=Network unavailable: backend offline
//! WARN Notice kind=error message="Could not add to cart: Network unavailable: backend offline"
//! ```
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false) // Don't show module paths - we use the resource field instead
        .compact()
        .init();
}
