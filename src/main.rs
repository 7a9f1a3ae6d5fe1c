//! # Basket Sync Demo
//!
//! Walks one shopper through a full session against the in-memory backend:
//! 1.  Browsing as a guest (cart and wishlist kept in the local cache).
//! 2.  Signing in, which merges the guest items into the account.
//! 3.  Mutating while signed in, including a failed call that is rolled back.
//! 4.  Signing out, which purges everything local.

use basket_sync::auth::{AuthUser, MemoryAuth};
use basket_sync::clients::CollectionClient;
use basket_sync::gateway::InMemoryBackend;
use basket_sync::lifecycle::{setup_tracing, Services, ShopSystem, SyncConfig};
use basket_sync::model::{AddItem, ProductSnapshot, ResourceKind};
use basket_sync::session::SessionState;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn, Instrument};

fn product(id: &str, name: &str, cents: i64) -> ProductSnapshot {
    ProductSnapshot::new(id, name, Decimal::new(cents, 2))
}

async fn settle_into(system: &ShopSystem, expected: fn(&SessionState) -> bool) -> Result<(), String> {
    let mut state = system.session.subscribe();
    state
        .wait_for(expected)
        .await
        .map(|_| ())
        .map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<(), String> {
    // Setup tracing once for the entire application
    setup_tracing();

    let config = SyncConfig::load().map_err(|e| e.to_string())?;
    info!(?config, "Starting basket sync demo");

    // The remote store already knows Alice and one item in her cart
    let backend = Arc::new(InMemoryBackend::new());
    backend.register("token-alice", "alice");
    backend.seed(
        "alice",
        ResourceKind::Cart,
        [AddItem::new(product("sku-tote", "Canvas Tote", 2450))],
    );

    let auth = Arc::new(MemoryAuth::new());
    let services = Services::over_transport(backend.clone(), auth.clone(), &config);
    let system = ShopSystem::start(&config, services);
    system.ready().await.map_err(|e| e.to_string())?;

    // 1. Guest session
    async {
        system
            .cart
            .add(AddItem::new(product("sku-tote", "Canvas Tote", 2450)).quantity(2))
            .await;
        system
            .cart
            .add(AddItem::new(product("sku-mug", "Enamel Mug", 1200)).color("green"))
            .await;
        system
            .wishlist
            .add(AddItem::new(product("sku-lamp", "Desk Lamp", 5900)))
            .await;
        let totals = system.totals.current();
        info!(
            total_count = totals.counter.total_count,
            show_price = totals.show_cart_total_price,
            "Guest basket ready"
        );
    }
    .instrument(tracing::info_span!("guest"))
    .await;

    // 2. Sign in; guest items are merged into Alice's account
    auth.login(AuthUser::new("alice").with_email("alice@example.com"), "token-alice");
    settle_into(&system, |s| matches!(s, SessionState::Authenticated { .. })).await?;
    let totals = system.totals.current();
    info!(
        total_count = totals.counter.total_count,
        cart_total = %totals.cart_total_amount,
        show_price = totals.show_cart_total_price,
        "Signed in and merged"
    );

    // 3. Authenticated mutations
    async {
        let lamp = system
            .wishlist
            .current()
            .collection
            .items()
            .first()
            .map(|item| item.id.clone());
        if let Some(lamp) = lamp {
            let outcome = system.wishlist.move_to_cart(&lamp).await;
            info!(committed = outcome.is_committed(), "Moved lamp to cart");
        }

        backend.set_offline(true);
        let outcome = system
            .cart
            .add(AddItem::new(product("sku-pen", "Fountain Pen", 3400)))
            .await;
        if let Some(e) = outcome.error() {
            warn!(error = %e, "Add failed and was rolled back");
        }
        backend.set_offline(false);

        info!(
            in_cart = system.cart.contains("sku-pen", None, None),
            cart_total = %system.cart.total_amount(),
            "After failed add"
        );
    }
    .instrument(tracing::info_span!("authenticated"))
    .await;

    // 4. Sign out; stores, cache and totals are purged
    auth.logout();
    settle_into(&system, |s| *s == SessionState::Guest).await?;
    info!(total_count = system.totals.current().counter.total_count, "Signed out");

    // Shutdown system gracefully
    system.shutdown().await?;

    info!("Demo completed successfully");
    Ok(())
}
