use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::domain::entities::Cart;
use crate::domain::errors::{ActionError, ApiError};
use crate::domain::ports::{CartApi, Notifier};
use crate::use_cases::auth_session::AuthState;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CartState {
    // Last cart the backend returned; None until fetched or after logout.
    pub cart: Option<Cart>,
    // Raised for the duration of a backend round-trip.
    pub busy: bool,
}

// Clears the busy flag on every exit path, including early returns.
struct BusyGuard<'a> {
    state: &'a watch::Sender<CartState>,
}

impl<'a> BusyGuard<'a> {
    fn raise(state: &'a watch::Sender<CartState>) -> Self {
        state.send_modify(|s| s.busy = true);
        Self { state }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.state.send_modify(|s| s.busy = false);
    }
}

// Holds the current cart and converges it to whatever the backend last answered.
pub struct CartStore<C, N> {
    api: C,
    notifier: N,
    auth: watch::Receiver<AuthState>,
    state: watch::Sender<CartState>,
    // Backend round-trips are serialized so responses apply in request order.
    in_flight: Mutex<()>,
}

impl<C, N> CartStore<C, N>
where
    C: CartApi,
    N: Notifier,
{
    pub fn new(api: C, notifier: N, auth: watch::Receiver<AuthState>) -> Self {
        let (state, _) = watch::channel(CartState::default());
        Self {
            api,
            notifier,
            auth,
            state,
            in_flight: Mutex::new(()),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> CartState {
        self.state.borrow().clone()
    }

    pub fn cart(&self) -> Option<Cart> {
        self.state.borrow().cart.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.state.borrow().busy
    }

    // Sum of price x quantity over the held cart; zero when there is none.
    pub fn cart_total(&self) -> Decimal {
        self.state
            .borrow()
            .cart
            .as_ref()
            .map(Cart::total)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn cart_item_count(&self) -> u32 {
        self.state
            .borrow()
            .cart
            .as_ref()
            .map(Cart::item_count)
            .unwrap_or(0)
    }

    fn is_authenticated(&self) -> bool {
        self.auth.borrow().is_authenticated()
    }

    fn replace(&self, cart: Option<Cart>) {
        self.state.send_modify(|s| s.cart = cart);
    }

    // A response that lands after logout is dropped so the cart stays cleared.
    fn still_signed_in(&self) -> Result<(), ActionError> {
        if self.is_authenticated() {
            return Ok(());
        }
        debug!("discarding cart response that arrived after logout.");
        self.replace(None);
        Err(ActionError::NotAuthenticated)
    }

    fn accept(&self, cart: Cart) -> Result<(), ActionError> {
        self.still_signed_in()?;
        self.replace(Some(cart));
        Ok(())
    }

    #[tracing::instrument(name = "fetch_cart", skip_all)]
    pub async fn fetch_cart(&self) -> Result<(), ActionError> {
        let _serial = self.in_flight.lock().await;
        if !self.is_authenticated() {
            self.replace(None);
            return Ok(());
        }

        let _busy = BusyGuard::raise(&self.state);
        match self.api.get_cart().await {
            Ok(cart) => {
                debug!(items = cart.items.len(), "cart fetched.");
                // Signed-out fetches are a no-op, including ones overtaken by logout.
                let _ = self.accept(cart);
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "error fetching cart.");
                self.replace(None);
                Err(self.reject(&err, "Failed to load cart", false))
            }
        }
    }

    pub async fn add_one(&self, product_id: i64) -> Result<(), ActionError> {
        self.add_to_cart(product_id, 1).await
    }

    #[tracing::instrument(name = "add_to_cart", skip(self))]
    pub async fn add_to_cart(&self, product_id: i64, quantity: u32) -> Result<(), ActionError> {
        if !self.is_authenticated() {
            self.notifier.error("Please login to add items to cart");
            return Err(ActionError::NotAuthenticated);
        }

        let _serial = self.in_flight.lock().await;
        let _busy = BusyGuard::raise(&self.state);
        match self.api.add_item(product_id, quantity).await {
            Ok(cart) => {
                self.accept(cart)?;
                info!("item added to cart.");
                self.notifier.success("Item added to cart!");
                Ok(())
            }
            Err(err) => Err(self.reject(&err, "Failed to add item to cart", true)),
        }
    }

    #[tracing::instrument(name = "update_quantity", skip(self))]
    pub async fn update_quantity(&self, product_id: i64, quantity: u32) -> Result<(), ActionError> {
        let _serial = self.in_flight.lock().await;
        let _busy = BusyGuard::raise(&self.state);
        match self.api.update_item(product_id, quantity).await {
            Ok(cart) => {
                self.accept(cart)?;
                self.notifier.success("Cart updated!");
                Ok(())
            }
            Err(err) => Err(self.reject(&err, "Failed to update cart", false)),
        }
    }

    #[tracing::instrument(name = "remove_from_cart", skip(self))]
    pub async fn remove_from_cart(&self, product_id: i64) -> Result<(), ActionError> {
        let _serial = self.in_flight.lock().await;
        let _busy = BusyGuard::raise(&self.state);
        match self.api.remove_item(product_id).await {
            Ok(cart) => {
                self.accept(cart)?;
                self.notifier.success("Item removed from cart");
                Ok(())
            }
            Err(err) => Err(self.reject(&err, "Failed to remove item from cart", false)),
        }
    }

    #[tracing::instrument(name = "clear_cart", skip_all)]
    pub async fn clear_cart(&self) -> Result<(), ActionError> {
        let _serial = self.in_flight.lock().await;
        let _busy = BusyGuard::raise(&self.state);
        match self.api.clear().await {
            Ok(()) => {
                self.still_signed_in()?;
                self.state.send_modify(|s| {
                    if let Some(cart) = s.cart.as_mut() {
                        cart.items.clear();
                    }
                });
                self.notifier.success("Cart cleared");
                Ok(())
            }
            Err(err) => Err(self.reject(&err, "Failed to clear cart", false)),
        }
    }

    // Total as computed by the backend, independent of the held copy.
    pub async fn server_total(&self) -> Result<Decimal, ActionError> {
        self.api
            .total()
            .await
            .map_err(|err| self.reject(&err, "Failed to load cart total", false))
    }

    // Logs, notifies and builds the structured failure. Only some operations
    // surface the backend's own message; the rest use a fixed one.
    fn reject(&self, err: &ApiError, fallback: &str, prefer_upstream: bool) -> ActionError {
        warn!(error = %err, "cart request failed.");
        let message = if prefer_upstream {
            err.upstream_message().unwrap_or(fallback)
        } else {
            fallback
        };
        self.notifier.error(message);
        ActionError::Rejected(message.to_string())
    }

    // Reacts to an authentication change: login fetches once, logout clears locally.
    pub async fn on_auth_transition(&self, was_authenticated: bool, now_authenticated: bool) {
        match (was_authenticated, now_authenticated) {
            (false, true) => {
                // Failure is already logged and notified inside fetch_cart.
                let _ = self.fetch_cart().await;
            }
            (true, false) => {
                // Wait out any in-flight change so its response cannot land afterwards.
                let _serial = self.in_flight.lock().await;
                self.replace(None);
            }
            _ => {}
        }
    }

    // Follows the auth channel until its sender is dropped.
    pub async fn run_auth_sync(&self) {
        let mut rx = self.auth.clone();
        let mut was_authenticated = false;
        loop {
            let now_authenticated = rx.borrow_and_update().is_authenticated();
            self.on_auth_transition(was_authenticated, now_authenticated)
                .await;
            was_authenticated = now_authenticated;

            if rx.changed().await.is_err() {
                debug!("auth channel closed; cart sync stopped.");
                return;
            }
        }
    }
}

impl<C, N> CartStore<C, N>
where
    C: CartApi + 'static,
    N: Notifier + 'static,
{
    pub fn spawn_auth_sync(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run_auth_sync().await })
    }
}
