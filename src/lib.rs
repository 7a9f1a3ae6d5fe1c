#![doc(html_logo_url = "https://www.rust-lang.org/logos/rust-logo-128x128.png")]
#![doc(html_favicon_url = "https://www.rust-lang.org/favicon.ico")]
//! # Basket Sync
//!
//! > **Optimistic cart and wishlist synchronisation for a storefront client.**
//!
//! This crate keeps two user-scoped collections, the **cart** and the **wishlist**, in sync
//! with a remote store. The UI sees every change immediately; the remote store has the final
//! word. Guests shop against a local cache, and their items are merged into the account when
//! they sign in.
//!
//! ## 🏗️ Design Philosophy
//!
//! ### Optimistic, then authoritative
//!
//! Every mutation is folded into the visible state *before* the remote call is awaited. When
//! the response arrives, the prediction is replaced by the server's answer, or withdrawn if
//! the call failed. Nothing is retried behind the user's back: a failed mutation is rolled
//! back and reported.
//!
//! ### Actors own state
//!
//! Each collection lives in a [`StoreActor`](framework::StoreActor) running in its own Tokio
//! task. Requests are processed one at a time, so no lock guards the collection and two
//! predictions never interleave. The session state machine is an actor too.
//!
//! ## 🚀 Core Concepts
//!
//! ### Predictions and sequence numbers
//! A store keeps the last *committed* collection plus the *pending* predictions, and publishes
//! the fold of both. Every remote call gets a sequence number; a response older than one
//! already applied is discarded, and clearing a store invalidates every number issued before.
//!
//! ### One emission, one consistent pair
//! A collection and its summary are published together as one [`Snapshot`](model::Snapshot).
//! Subscribers never see a collection paired with the summary of another state.
//!
//! ### Guest and authenticated sessions
//! The [`TransitionCoordinator`](session::TransitionCoordinator) moves between
//! `Guest`, `Authenticating`, `Authenticated` and `LoggingOut`. Mutations wait while it is
//! in a transitional state.
//!
//! ## 👩‍💻 Architecture Notes
//!
//! ### 1. Typed errors at every boundary
//! The gateway translates status codes and validates payloads into [`GatewayError`](gateway::GatewayError)
//! and typed snapshots. The engine translates those into [`SyncError`](engine::SyncError);
//! callers only ever receive a [`MutationOutcome`](engine::MutationOutcome).
//!
//! ### 2. Async Context Injection
//! The coordinator drives the engine and the engine reports rejected credentials back to the
//! coordinator. Dependencies are injected at runtime via `run(context)`, not at construction
//! time, and the engine keeps only a weak link back.
//!
//! ### 3. Observability
//! We use `tracing` everywhere with structured fields (`resource`, `seq`, `item_id`).
//! See the [`lifecycle::tracing`] module for details.
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Data ([`model`])
//! Items, collections, mutations and summaries. Pure values, no I/O.
//!
//! ### 2. The Stores ([`framework`])
//! The store actor, its client and request vocabulary, and the sequence gate.
//! - **Testing**: [`framework::mock`] drives a store client without an actor.
//!
//! ### 3. The Edges ([`gateway`], [`cache`], [`auth`], [`notify`])
//! Everything the sync layer consumes: the remote store, local persistence, credentials and
//! user-facing notices.
//!
//! ### 4. The Brain ([`engine`], [`session`], [`aggregate`])
//! The mutation lifecycle, the session state machine with login merging, and the totals.
//!
//! ### 5. The Interface ([`clients`])
//! [`CartClient`](clients::CartClient) and [`WishlistClient`](clients::WishlistClient).
//!
//! ### 6. The Orchestrator ([`lifecycle`])
//! [`ShopSystem`](lifecycle::ShopSystem) spins everything up, wires it and shuts it down.
//!
//! ## 🚀 Quick Start
//!
//! ```bash
//! # Run the demo with info logs
//! RUST_LOG=info cargo run
//!
//! # Overwrite instead of summing guest items at login
//! BASKET_SYNC_MERGE_POLICY=overwrite cargo run
//! ```
//!
//! ### Running Tests
//!
//! ```bash
//! cargo test
//! ```

pub mod aggregate;
pub mod auth;
pub mod cache;
pub mod clients;
pub mod engine;
pub mod framework;
pub mod gateway;
pub mod lifecycle;
pub mod model;
pub mod notify;
pub mod session;
