use basket_sync::aggregate::Totals;
use basket_sync::auth::{AuthProvider, AuthUser, MemoryAuth};
use basket_sync::cache::{LocalCache, MemoryStorage};
use basket_sync::clients::CollectionClient;
use basket_sync::engine::{MutationOutcome, SyncError};
use basket_sync::gateway::{HttpGateway, InMemoryBackend, Method};
use basket_sync::lifecycle::{Services, ShopSystem, SyncConfig};
use basket_sync::model::{AddItem, ProductSnapshot, ResourceItem, ResourceKind};
use basket_sync::notify::{NoticeKind, RecordingNotifier};
use basket_sync::session::{MergePolicy, SessionState};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

const TOKEN: &str = "token-alice";
const USER: &str = "alice";

/// A running system over the in-memory backend, with handles on every collaborator.
struct Shop {
    system: ShopSystem,
    backend: Arc<InMemoryBackend>,
    auth: Arc<MemoryAuth>,
    storage: Arc<MemoryStorage>,
    notifier: Arc<RecordingNotifier>,
}

impl Shop {
    async fn start(config: SyncConfig) -> Self {
        Self::start_over(config, Arc::new(MemoryStorage::new())).await
    }

    async fn start_over(config: SyncConfig, storage: Arc<MemoryStorage>) -> Self {
        let backend = Arc::new(InMemoryBackend::new());
        backend.register(TOKEN, USER);
        let shop = Self::start_with(config, backend, Arc::new(MemoryAuth::new()), storage).await;
        assert_eq!(shop.system.session.state(), SessionState::Guest);
        shop
    }

    /// Starts a system over existing collaborators, as an app relaunch would.
    async fn start_with(
        config: SyncConfig,
        backend: Arc<InMemoryBackend>,
        auth: Arc<MemoryAuth>,
        storage: Arc<MemoryStorage>,
    ) -> Self {
        let notifier = Arc::new(RecordingNotifier::new());
        let gateway = HttpGateway::new(backend.clone(), auth.clone(), config.price_threshold);
        let services = Services::new(Arc::new(gateway), auth.clone(), storage.clone())
            .with_notifier(notifier.clone());

        let system = ShopSystem::start(&config, services);
        system.ready().await.expect("System failed to settle");

        Self {
            system,
            backend,
            auth,
            storage,
            notifier,
        }
    }

    async fn login(&self) {
        self.auth.login(AuthUser::new(USER), TOKEN);
        self.wait_for_state(|s| matches!(s, SessionState::Authenticated { .. }))
            .await;
    }

    async fn logout(&self) {
        self.auth.logout();
        self.wait_for_state(|s| *s == SessionState::Guest).await;
    }

    async fn wait_for_state(&self, expected: fn(&SessionState) -> bool) {
        let mut state = self.system.session.subscribe();
        tokio::time::timeout(Duration::from_secs(5), state.wait_for(expected))
            .await
            .expect("Timed out waiting for session state")
            .expect("Coordinator stopped");
    }

    async fn totals_where(&self, condition: impl FnMut(&Totals) -> bool) -> Totals {
        tokio::time::timeout(Duration::from_secs(5), self.system.totals.wait_for(condition))
            .await
            .expect("Timed out waiting for totals")
            .expect("Aggregator stopped")
    }

    /// Rows cached for `owner`, `None` meaning the guest collection.
    async fn cached(&self, resource: ResourceKind, owner: Option<&str>) -> Vec<ResourceItem> {
        LocalCache::new(self.storage.clone())
            .read(resource, owner)
            .await
            .expect("Cache unreadable")
    }
}

fn product(id: &str, cents: i64) -> ProductSnapshot {
    ProductSnapshot::new(id, format!("Product {id}"), Decimal::new(cents, 2))
}

fn quantity_of(items: &[ResourceItem], product_id: &str) -> Option<u32> {
    items
        .iter()
        .find(|item| item.product.id == product_id)
        .map(|item| item.quantity)
}

/// Guest mutations are served locally and survive a restart through the cache.
#[tokio::test]
async fn test_guest_session_is_local_and_restored_after_restart() {
    let storage = Arc::new(MemoryStorage::new());
    let shop = Shop::start_over(SyncConfig::default(), storage.clone()).await;

    let outcome = shop
        .system
        .cart
        .add(AddItem::new(product("sku-a", 1000)).quantity(2))
        .await;
    assert!(outcome.is_committed());
    shop.system
        .wishlist
        .add(AddItem::new(product("sku-b", 500)))
        .await;

    assert_eq!(shop.backend.total_requests(), 0, "Guests never reach the gateway");
    assert!(storage.contains("cart"));
    assert_eq!(quantity_of(&shop.cached(ResourceKind::Cart, None).await, "sku-a"), Some(2));
    shop.system.shutdown().await.expect("Shutdown failed");

    // A new system over the same storage comes back with the guest collections
    let restarted = Shop::start_over(SyncConfig::default(), storage).await;
    let cart = restarted.system.cart.current();
    assert_eq!(quantity_of(cart.collection.items(), "sku-a"), Some(2));
    assert!(restarted.system.wishlist.contains("sku-b", None, None));

    let totals = restarted
        .totals_where(|totals| totals.counter.total_count == 3)
        .await;
    assert_eq!(totals.counter.cart_count, 2);
    assert_eq!(totals.counter.wishlist_count, 1);
    assert_eq!(totals.counter.total_count, 3);

    restarted.system.shutdown().await.expect("Shutdown failed");
}

#[tokio::test]
async fn test_login_merges_guest_items_additively() {
    let shop = Shop::start(SyncConfig::default()).await;
    shop.backend.seed(
        USER,
        ResourceKind::Cart,
        [
            AddItem::new(product("sku-a", 1000)),
            AddItem::new(product("sku-b", 250)).quantity(2),
        ],
    );

    shop.system
        .cart
        .add(AddItem::new(product("sku-a", 1000)).quantity(3))
        .await;
    shop.system.cart.add(AddItem::new(product("sku-c", 100))).await;

    shop.login().await;

    let cart = shop.system.cart.current();
    let items = cart.collection.items();
    assert_eq!(quantity_of(items, "sku-a"), Some(4));
    assert_eq!(quantity_of(items, "sku-b"), Some(2));
    assert_eq!(quantity_of(items, "sku-c"), Some(1));
    assert!(items.iter().all(|item| !item.is_local()), "Merged rows carry server ids");

    // The merge was written back to the remote store and mirrored to the cache
    let remote = shop.backend.collection(USER, ResourceKind::Cart);
    assert_eq!(quantity_of(remote.items(), "sku-a"), Some(4));
    assert_eq!(shop.backend.request_count(Method::Put, "/cart"), 1);
    assert_eq!(shop.cached(ResourceKind::Cart, Some(USER)).await.len(), 3);
    assert!(shop.cached(ResourceKind::Cart, None).await.is_empty());

    shop.system.shutdown().await.expect("Shutdown failed");
}

/// A relaunch while signed in must not merge the mirrored server rows into themselves.
#[tokio::test]
async fn test_restart_while_signed_in_keeps_server_quantities() {
    let storage = Arc::new(MemoryStorage::new());
    let shop = Shop::start_over(SyncConfig::default(), storage.clone()).await;
    shop.backend.seed(
        USER,
        ResourceKind::Cart,
        [AddItem::new(product("sku-a", 1000)).quantity(2)],
    );
    shop.login().await;
    assert_eq!(shop.cached(ResourceKind::Cart, Some(USER)).await.len(), 1);
    let Shop {
        system,
        backend,
        auth,
        ..
    } = shop;
    system.shutdown().await.expect("Shutdown failed");

    let restarted = Shop::start_with(SyncConfig::default(), backend, auth, storage).await;
    restarted
        .wait_for_state(|s| matches!(s, SessionState::Authenticated { .. }))
        .await;

    let cart = restarted.system.cart.current();
    assert_eq!(quantity_of(cart.collection.items(), "sku-a"), Some(2));
    let remote = restarted.backend.collection(USER, ResourceKind::Cart);
    assert_eq!(quantity_of(remote.items(), "sku-a"), Some(2));
    assert_eq!(restarted.backend.request_count(Method::Put, "/cart"), 0);
    restarted.system.shutdown().await.expect("Shutdown failed");
}

#[tokio::test]
async fn test_login_with_overwrite_policy_takes_guest_quantities() {
    let config = SyncConfig::default().with_merge_policy(MergePolicy::Overwrite);
    let shop = Shop::start(config).await;
    shop.backend.seed(
        USER,
        ResourceKind::Cart,
        [AddItem::new(product("sku-a", 1000)).quantity(5)],
    );
    shop.system
        .cart
        .add(AddItem::new(product("sku-a", 1000)).quantity(2))
        .await;

    shop.login().await;

    assert_eq!(
        quantity_of(shop.system.cart.current().collection.items(), "sku-a"),
        Some(2)
    );
    shop.system.shutdown().await.expect("Shutdown failed");
}

#[tokio::test]
async fn test_login_without_guest_items_keeps_server_collection() {
    let shop = Shop::start(SyncConfig::default()).await;
    shop.backend.seed(
        USER,
        ResourceKind::Wishlist,
        [AddItem::new(product("sku-w", 4200))],
    );

    shop.login().await;

    assert!(shop.system.wishlist.contains("sku-w", None, None));
    assert_eq!(shop.backend.request_count(Method::Put, "/wishlist"), 0);
    assert_eq!(shop.backend.request_count(Method::Put, "/cart"), 0);
    shop.system.shutdown().await.expect("Shutdown failed");
}

/// A failed login load shows an empty collection and leaves the guest cache for the next try.
#[tokio::test]
async fn test_login_load_failure_keeps_guest_cache() {
    let shop = Shop::start(SyncConfig::default()).await;
    shop.system.cart.add(AddItem::new(product("sku-a", 1000))).await;

    shop.backend.fail_next(503);
    shop.login().await;

    assert!(shop.system.cart.current().collection.is_empty());
    assert_eq!(shop.cached(ResourceKind::Cart, None).await.len(), 1);
    shop.system.shutdown().await.expect("Shutdown failed");
}

#[tokio::test]
async fn test_logout_purges_stores_cache_and_totals() {
    let shop = Shop::start(SyncConfig::default()).await;
    shop.backend.seed(
        USER,
        ResourceKind::Cart,
        [AddItem::new(product("sku-a", 1000)).quantity(3)],
    );
    shop.login().await;
    shop.system.wishlist.add(AddItem::new(product("sku-b", 500))).await;
    shop.totals_where(|totals| totals.counter.total_count == 4).await;

    shop.logout().await;

    assert!(shop.system.cart.current().collection.is_empty());
    assert!(shop.system.wishlist.current().collection.is_empty());
    assert!(!shop.storage.contains("cart"));
    assert!(!shop.storage.contains("wishlist"));
    shop.totals_where(|totals| totals.counter.total_count == 0).await;
    assert!(shop.auth.credential().is_none());

    // Remote state is untouched by a local logout
    assert_eq!(shop.backend.collection(USER, ResourceKind::Cart).total_items(), 3);
    shop.system.shutdown().await.expect("Shutdown failed");
}

#[tokio::test]
async fn test_rejected_credential_ends_session() {
    let shop = Shop::start(SyncConfig::default()).await;
    shop.backend.seed(USER, ResourceKind::Cart, [AddItem::new(product("sku-a", 1000))]);
    shop.login().await;

    shop.backend.fail_next(401);
    let outcome = shop
        .system
        .cart
        .add(AddItem::new(product("sku-b", 100)))
        .await;

    assert!(matches!(outcome, MutationOutcome::Unauthenticated));
    assert_eq!(shop.system.session.state(), SessionState::Guest);
    assert!(shop.auth.credential().is_none());
    assert!(shop.system.cart.current().collection.is_empty());
    assert!(!shop.storage.contains("cart"));
    assert_eq!(shop.notifier.count(NoticeKind::LoginRequired), 1);
    shop.system.shutdown().await.expect("Shutdown failed");
}

#[tokio::test]
async fn test_server_fault_rolls_back_prediction() {
    let shop = Shop::start(SyncConfig::default()).await;
    shop.backend.seed(USER, ResourceKind::Cart, [AddItem::new(product("sku-a", 1000))]);
    shop.login().await;
    let before = shop.system.cart.current();

    shop.backend.fail_next(503);
    let outcome = shop
        .system
        .cart
        .add(AddItem::new(product("sku-b", 100)))
        .await;

    assert!(matches!(
        outcome,
        MutationOutcome::RolledBack(SyncError::ServerFault(_))
    ));
    assert_eq!(shop.system.cart.current().collection, before.collection);
    assert!(!shop.system.cart.contains("sku-b", None, None));
    assert_eq!(shop.notifier.count(NoticeKind::Error), 1);
    assert!(matches!(shop.system.session.state(), SessionState::Authenticated { .. }));
    shop.system.shutdown().await.expect("Shutdown failed");
}

#[tokio::test]
async fn test_offline_mutation_rolls_back_and_keeps_session() {
    let shop = Shop::start(SyncConfig::default()).await;
    shop.login().await;

    shop.backend.set_offline(true);
    let outcome = shop.system.wishlist.add(AddItem::new(product("sku-a", 100))).await;
    shop.backend.set_offline(false);

    assert!(matches!(
        outcome,
        MutationOutcome::RolledBack(SyncError::NetworkUnavailable(_))
    ));
    assert!(shop.system.wishlist.current().collection.is_empty());

    // Nothing was retried: the next call goes through normally
    let outcome = shop.system.wishlist.add(AddItem::new(product("sku-a", 100))).await;
    assert!(outcome.is_committed());
    assert_eq!(shop.backend.request_count(Method::Post, "/wishlist/items"), 2);
    shop.system.shutdown().await.expect("Shutdown failed");
}

#[tokio::test]
async fn test_remove_of_missing_item_is_success() {
    let shop = Shop::start(SyncConfig::default()).await;
    shop.backend.seed(USER, ResourceKind::Cart, [AddItem::new(product("sku-a", 1000))]);
    shop.login().await;
    let item_id = shop.system.cart.current().collection.items()[0].id.clone();

    assert!(shop.system.cart.remove(&item_id).await.is_committed());
    let again = shop.system.cart.remove(&item_id).await;

    assert!(again.is_committed(), "Removing an already removed row succeeds");
    assert!(shop.system.cart.current().collection.is_empty());
    assert_eq!(shop.notifier.count(NoticeKind::Error), 0);
    shop.system.shutdown().await.expect("Shutdown failed");
}

/// A 404 that lands after logout must not leave the signed-out cart in the cache.
#[tokio::test]
async fn test_missing_item_answer_after_logout_is_discarded() {
    let shop = Shop::start(SyncConfig::default()).await;
    shop.backend.seed(USER, ResourceKind::Cart, [AddItem::new(product("sku-a", 1000))]);
    shop.login().await;
    let item_id = shop.system.cart.current().collection.items()[0].id.clone();
    let path = format!("/cart/items/{item_id}");

    shop.backend.fail_next(404);
    shop.backend.pause();
    let cart = shop.system.cart.clone();
    let removal = tokio::spawn(async move { cart.remove(&item_id).await });
    while shop.backend.request_count(Method::Delete, &path) == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    shop.logout().await;
    assert!(!shop.storage.contains("cart"));
    shop.backend.resume();
    removal.await.expect("Task panicked");

    assert!(!shop.storage.contains("cart"), "Late answers must not repopulate the cache");
    assert!(shop.system.cart.current().collection.is_empty());
    shop.system.shutdown().await.expect("Shutdown failed");
}

#[tokio::test]
async fn test_concurrent_loads_share_one_request() {
    let shop = Shop::start(SyncConfig::default()).await;
    shop.backend.seed(USER, ResourceKind::Cart, [AddItem::new(product("sku-a", 1000))]);
    shop.login().await;
    let before = shop.backend.request_count(Method::Get, "/cart");

    shop.backend.pause();
    let backend = shop.backend.clone();
    let release = async move {
        while backend.request_count(Method::Get, "/cart") == before {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        backend.resume();
    };
    let (first, second, ()) = tokio::join!(
        shop.system.cart.load(),
        shop.system.cart.load(),
        release
    );

    let first = first.expect("First load failed");
    let second = second.expect("Second load failed");
    assert_eq!(first, second);
    assert_eq!(first.collection.len(), 1);
    assert_eq!(shop.backend.request_count(Method::Get, "/cart"), before + 1);
    shop.system.shutdown().await.expect("Shutdown failed");
}

#[tokio::test]
async fn test_predictions_are_visible_before_the_remote_answers() {
    let shop = Shop::start(SyncConfig::default()).await;
    shop.login().await;

    shop.backend.pause();
    let cart = shop.system.cart.clone();
    let pending = tokio::spawn(async move {
        cart.add(AddItem::new(product("sku-a", 1000))).await
    });

    shop.totals_where(|totals| totals.counter.cart_count == 1).await;
    assert!(
        !shop.system.cart.contains("sku-a", None, None),
        "Membership follows committed state only"
    );

    shop.backend.resume();
    let outcome = pending.await.expect("Task panicked");
    assert!(outcome.is_committed());
    assert!(shop.system.cart.contains("sku-a", None, None));
    assert!(shop
        .system
        .cart
        .current()
        .collection
        .items()
        .iter()
        .all(|item| item.id.starts_with("cart_")));
    shop.system.shutdown().await.expect("Shutdown failed");
}

#[tokio::test]
async fn test_total_price_shown_from_threshold() {
    let shop = Shop::start(SyncConfig::default().with_price_threshold(3)).await;
    shop.login().await;

    shop.system
        .cart
        .add(AddItem::new(product("sku-a", 1000)).quantity(2))
        .await;
    let totals = shop.totals_where(|totals| totals.counter.cart_count == 2).await;
    assert!(!totals.show_cart_total_price);
    assert_eq!(totals.cart_total_amount, Decimal::new(2000, 2));

    shop.system.cart.add(AddItem::new(product("sku-b", 550))).await;
    let totals = shop.totals_where(|totals| totals.counter.cart_count == 3).await;
    assert!(totals.show_cart_total_price);
    assert_eq!(totals.cart_total_amount, Decimal::new(2550, 2));
    assert_eq!(shop.system.cart.total_amount(), Decimal::new(2550, 2));
    shop.system.shutdown().await.expect("Shutdown failed");
}

#[tokio::test]
async fn test_move_between_collections() {
    let shop = Shop::start(SyncConfig::default()).await;
    shop.backend.seed(
        USER,
        ResourceKind::Cart,
        [AddItem::new(product("sku-a", 1000)).size("M")],
    );
    shop.login().await;
    let item_id = shop.system.cart.current().collection.items()[0].id.clone();

    let outcome = shop.system.cart.move_to_wishlist(&item_id).await;

    assert!(outcome.is_committed());
    assert!(shop.system.cart.current().collection.is_empty());
    assert!(shop.system.wishlist.contains("sku-a", Some("M"), None));
    assert!(shop
        .backend
        .collection(USER, ResourceKind::Wishlist)
        .contains("sku-a", Some("M"), None));
    assert_eq!(shop.cached(ResourceKind::Wishlist, Some(USER)).await.len(), 1);
    shop.system.shutdown().await.expect("Shutdown failed");
}

#[tokio::test]
async fn test_failed_move_restores_both_collections() {
    let shop = Shop::start(SyncConfig::default()).await;
    shop.backend.seed(USER, ResourceKind::Wishlist, [AddItem::new(product("sku-a", 1000))]);
    shop.login().await;
    let item_id = shop.system.wishlist.current().collection.items()[0].id.clone();

    shop.backend.fail_next(500);
    let outcome = shop.system.wishlist.move_to_cart(&item_id).await;

    assert!(!outcome.is_committed());
    assert!(shop.system.wishlist.contains("sku-a", None, None));
    assert!(shop.system.cart.current().collection.is_empty());
    shop.system.shutdown().await.expect("Shutdown failed");
}

#[tokio::test]
async fn test_guest_move_and_toggle() {
    let shop = Shop::start(SyncConfig::default()).await;
    let spec = AddItem::new(product("sku-a", 1000));

    assert!(shop.system.wishlist.toggle(spec.clone()).await.is_committed());
    assert!(shop.system.wishlist.contains("sku-a", None, None));

    let item_id = shop.system.wishlist.current().collection.items()[0].id.clone();
    assert!(shop.system.wishlist.move_to_cart(&item_id).await.is_committed());
    assert!(shop.system.cart.contains("sku-a", None, None));
    assert!(!shop.system.wishlist.contains("sku-a", None, None));

    // Toggling an absent product adds it; toggling again removes it
    shop.system.wishlist.toggle(spec.clone()).await;
    shop.system.wishlist.toggle(spec).await;
    assert!(shop.system.wishlist.current().collection.is_empty());
    assert_eq!(shop.backend.total_requests(), 0);
    shop.system.shutdown().await.expect("Shutdown failed");
}

#[tokio::test]
async fn test_invalid_quantity_never_reaches_the_backend() {
    let shop = Shop::start(SyncConfig::default()).await;
    shop.backend.seed(USER, ResourceKind::Cart, [AddItem::new(product("sku-a", 1000))]);
    shop.login().await;
    let requests = shop.backend.total_requests();
    let item_id = shop.system.cart.current().collection.items()[0].id.clone();

    let outcome = shop.system.cart.set_quantity(&item_id, 0).await;

    assert!(matches!(
        outcome,
        MutationOutcome::RolledBack(SyncError::ValidationFailed(_))
    ));
    assert_eq!(shop.backend.total_requests(), requests);
    shop.system.shutdown().await.expect("Shutdown failed");
}
