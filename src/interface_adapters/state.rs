use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::domain::ports::KeyValueStorage;
use crate::interface_adapters::clients::ApiClient;
use crate::interface_adapters::notifier::TracingNotifier;
use crate::use_cases::{AuthSessionStore, CartStore, Catalog, Route, RouteDecision, resolve};

pub type SessionStore<S> = AuthSessionStore<ApiClient, S, TracingNotifier>;
pub type ShoppingCart = CartStore<ApiClient, TracingNotifier>;
pub type ProductCatalog = Catalog<ApiClient, TracingNotifier>;

// Application state: one store per domain, all sharing a single API client.
pub struct AppState<S> {
    pub api: ApiClient,
    pub auth: Arc<SessionStore<S>>,
    pub cart: Arc<ShoppingCart>,
    pub catalog: Arc<ProductCatalog>,
}

impl<S> AppState<S>
where
    S: KeyValueStorage,
{
    pub fn new(api: ApiClient, storage: S) -> Self {
        let auth = Arc::new(AuthSessionStore::new(
            api.clone(),
            storage,
            TracingNotifier,
        ));
        let cart = Arc::new(CartStore::new(
            api.clone(),
            TracingNotifier,
            auth.subscribe(),
        ));
        let catalog = Arc::new(Catalog::new(api.clone(), TracingNotifier));
        Self {
            api,
            auth,
            cart,
            catalog,
        }
    }

    // One-shot hosts: restore the session, then bring the cart in line with it.
    pub async fn start(&self) {
        self.auth.initialize();
        self.cart
            .on_auth_transition(false, self.auth.is_authenticated())
            .await;
    }

    // Long-lived hosts: the cart follows every later login and logout on its own.
    pub fn start_with_sync(&self) -> JoinHandle<()> {
        let handle = Arc::clone(&self.cart).spawn_auth_sync();
        self.auth.initialize();
        handle
    }

    pub fn route(&self, route: Route) -> RouteDecision {
        resolve(route, &self.auth.snapshot())
    }
}
