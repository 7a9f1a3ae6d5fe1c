use crate::aggregate::{Aggregator, TotalsClient};
use crate::auth::AuthProvider;
use crate::cache::{FileStorage, KeyValueStorage, LocalCache, MemoryStorage};
use crate::clients::{CartClient, WishlistClient};
use crate::engine::{ReconciliationEngine, Stores};
use crate::framework::{FrameworkError, StoreActor};
use crate::gateway::{HttpGateway, RemoteGateway, Transport};
use crate::lifecycle::config::SyncConfig;
use crate::model::ResourceKind;
use crate::notify::{Notifier, TracingNotifier};
use crate::session::{
    CoordinatorClient, CoordinatorContext, MergePrompt, SessionState, SessionTracker,
    TransitionCoordinator,
};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// The external collaborators a [`ShopSystem`] is built over.
#[derive(Clone)]
pub struct Services {
    pub gateway: Arc<dyn RemoteGateway>,
    pub auth: Arc<dyn AuthProvider>,
    pub storage: Arc<dyn KeyValueStorage>,
    pub notifier: Arc<dyn Notifier>,
    pub prompt: Option<Arc<dyn MergePrompt>>,
}

impl Services {
    /// Notices go to the log and no merge prompt is installed.
    pub fn new(
        gateway: Arc<dyn RemoteGateway>,
        auth: Arc<dyn AuthProvider>,
        storage: Arc<dyn KeyValueStorage>,
    ) -> Self {
        Self {
            gateway,
            auth,
            storage,
            notifier: Arc::new(TracingNotifier),
            prompt: None,
        }
    }

    /// Talks to the remote store through an [`HttpGateway`] over `transport`.
    ///
    /// The cache lives in `config.cache_dir` when set, in memory otherwise.
    pub fn over_transport(
        transport: Arc<dyn Transport>,
        auth: Arc<dyn AuthProvider>,
        config: &SyncConfig,
    ) -> Self {
        let gateway = HttpGateway::new(transport, auth.clone(), config.price_threshold);
        let storage: Arc<dyn KeyValueStorage> = match &config.cache_dir {
            Some(dir) => Arc::new(FileStorage::new(dir)),
            None => Arc::new(MemoryStorage::new()),
        };
        Self::new(Arc::new(gateway), auth, storage)
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_prompt(mut self, prompt: Arc<dyn MergePrompt>) -> Self {
        self.prompt = Some(prompt);
        self
    }
}

/// The runtime orchestrator of the cart and wishlist sync layer.
///
/// `ShopSystem` is responsible for:
/// - **Lifecycle Management**: Starting and stopping every actor and task
/// - **Dependency Wiring**: Connecting the engine, the coordinator and the tracker, which
///   depend on each other
///
/// # Architecture
///
/// - **Store actors** (one per resource): own the collection state
/// - **Transition coordinator**: guest/authenticated state machine; owns the engine
/// - **Session tracker**: feeds authentication changes to the coordinator
/// - **Aggregator**: derives cross-resource totals from the stores
///
/// # Example
///
/// ```ignore
/// let system = ShopSystem::start(&SyncConfig::default(), services);
/// system.ready().await?;
///
/// system.cart.add(AddItem::new(product)).await;
/// let badge = system.totals.current().counter.total_count;
///
/// system.shutdown().await?;
/// ```
pub struct ShopSystem {
    /// Client for the cart
    pub cart: CartClient,

    /// Client for the wishlist
    pub wishlist: WishlistClient,

    /// Client for the transition coordinator
    pub session: CoordinatorClient,

    /// Cross-resource totals
    pub totals: TotalsClient,

    /// Task handles (used for graceful shutdown)
    handles: Vec<JoinHandle<()>>,

    tracker_stop: oneshot::Sender<()>,
}

impl ShopSystem {
    /// Creates and starts every actor of the sync layer.
    ///
    /// This method:
    /// 1. Creates the store actors, the coordinator and the aggregator (no dependencies)
    /// 2. Builds the engine over the stores and a weak link to the coordinator
    /// 3. Starts the coordinator with the engine injected, which restores the guest session
    /// 4. Starts the tracker that follows the authentication provider
    pub fn start(config: &SyncConfig, services: Services) -> Self {
        let threshold = config.price_threshold;
        let buffer = config.store_buffer;

        // 1. Create actors (no dependencies)
        let (cart_actor, cart_store) = StoreActor::new(ResourceKind::Cart, threshold, buffer);
        let (wishlist_actor, wishlist_store) =
            StoreActor::new(ResourceKind::Wishlist, threshold, buffer);
        let (coordinator, session) = TransitionCoordinator::new(config.merge_policy, buffer);
        let (aggregator, totals) = Aggregator::new(&cart_store, &wishlist_store, threshold);

        // 2. Wire the engine
        let engine = ReconciliationEngine::new(
            Stores {
                cart: cart_store,
                wishlist: wishlist_store,
            },
            services.gateway,
            LocalCache::new(services.storage),
            services.notifier,
            session.link(),
        );

        // 3. Start actors with injected context
        let mut handles = vec![
            tokio::spawn(cart_actor.run()),
            tokio::spawn(wishlist_actor.run()),
            tokio::spawn(aggregator.run()),
            tokio::spawn(coordinator.run(CoordinatorContext {
                engine: engine.clone(),
                auth: services.auth.clone(),
                prompt: services.prompt,
            })),
        ];

        // 4. Follow authentication changes
        let (tracker_stop, stop) = oneshot::channel();
        let tracker = SessionTracker::new(services.auth, session.clone());
        handles.push(tokio::spawn(tracker.run(stop)));

        info!(threshold, policy = ?config.merge_policy, "System started");
        Self {
            cart: CartClient::new(engine.clone()),
            wishlist: WishlistClient::new(engine),
            session,
            totals,
            handles,
            tracker_stop,
        }
    }

    /// Waits until the session has settled, e.g. after the guest session has been restored.
    pub async fn ready(&self) -> Result<SessionState, FrameworkError> {
        self.session.settled().await
    }

    /// Ends the authenticated session, if any, and purges local state.
    pub async fn logout(&self) -> Result<SessionState, FrameworkError> {
        self.session.logout().await
    }

    /// Gracefully shuts down the entire system.
    ///
    /// This method:
    /// 1. Stops the tracker and drops all clients, which closes the coordinator's channel
    /// 2. The coordinator exits and releases the engine, which closes the stores' channels
    /// 3. Waits for all tasks to complete
    ///
    /// # Returns
    ///
    /// - `Ok(())` if every task shut down cleanly
    /// - `Err(String)` if any task failed or panicked
    pub async fn shutdown(self) -> Result<(), String> {
        info!("Shutting down system...");

        // =====================================================================
        // Step 1: Close all channels by dropping clients
        // =====================================================================
        let _ = self.tracker_stop.send(());
        drop(self.cart);
        drop(self.wishlist);
        drop(self.session);
        drop(self.totals);

        // =====================================================================
        // Step 2: Wait for all tasks to complete
        // =====================================================================
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Task failed: {:?}", e);
                return Err(format!("Task failed: {:?}", e));
            }
        }

        info!("System shutdown complete.");
        Ok(())
    }
}
