use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde_json::Map;

use crate::domain::entities::{
    Cart, CartItem, Credentials, Product, ProductInput, ProductPage, ProductQuery, Registration,
    Role, Session, User,
};
use crate::domain::errors::{ApiError, StorageError};
use crate::domain::ports::{AuthApi, CartApi, KeyValueStorage, Notifier, ProductApi};

pub(crate) fn sample_user(id: i64, role: Role) -> User {
    User {
        id,
        username: Some(format!("user{id}")),
        email: None,
        first_name: "Ada".to_string(),
        last_name: None,
        role,
        extra: Map::new(),
    }
}

pub(crate) fn sample_session(token: &str, role: Role) -> Session {
    Session {
        token: token.to_string(),
        user: sample_user(1, role),
    }
}

// Price is given in cents to keep fixtures exact.
pub(crate) fn sample_product(id: i64, price_cents: i64) -> Product {
    Product {
        id,
        name: format!("Product {id}"),
        description: None,
        price: Decimal::new(price_cents, 2),
        stock_quantity: 100,
        image_url: None,
        category: "Electronics".to_string(),
        created_at: None,
        updated_at: None,
    }
}

pub(crate) fn cart_with(lines: &[(i64, i64, u32)]) -> Cart {
    Cart {
        id: Some(1),
        items: lines
            .iter()
            .map(|(id, price_cents, quantity)| CartItem {
                id: None,
                product: sample_product(*id, *price_cents),
                quantity: *quantity,
            })
            .collect(),
    }
}

fn rejected(message: Option<String>) -> ApiError {
    ApiError::Upstream {
        status: StatusCode::BAD_REQUEST,
        message,
    }
}

#[derive(Default)]
struct AuthScript {
    // None means sign_in fails with the scripted message.
    session: Option<Session>,
    failure_message: Option<String>,
    sign_up_fails: bool,
    calls: Vec<&'static str>,
    bearer_history: Vec<Option<String>>,
}

// Scripted auth backend that records every call made against it.
#[derive(Clone, Default)]
pub(crate) struct FakeAuthApi {
    script: Arc<Mutex<AuthScript>>,
}

impl FakeAuthApi {
    pub(crate) fn succeeding_with(session: Session) -> Self {
        let api = Self::default();
        api.script.lock().expect("auth script mutex poisoned").session = Some(session);
        api
    }

    pub(crate) fn failing_with(message: Option<&str>) -> Self {
        let api = Self::default();
        {
            let mut script = api.script.lock().expect("auth script mutex poisoned");
            script.failure_message = message.map(str::to_string);
            script.sign_up_fails = true;
        }
        api
    }

    pub(crate) fn calls(&self) -> Vec<&'static str> {
        self.script
            .lock()
            .expect("auth script mutex poisoned")
            .calls
            .clone()
    }

    pub(crate) fn bearer_history(&self) -> Vec<Option<String>> {
        self.script
            .lock()
            .expect("auth script mutex poisoned")
            .bearer_history
            .clone()
    }
}

#[async_trait]
impl AuthApi for FakeAuthApi {
    async fn sign_in(&self, _credentials: &Credentials) -> Result<Session, ApiError> {
        let mut script = self.script.lock().expect("auth script mutex poisoned");
        script.calls.push("sign_in");
        match script.session.clone() {
            Some(session) => Ok(session),
            None => Err(rejected(script.failure_message.clone())),
        }
    }

    async fn sign_up(&self, _registration: &Registration) -> Result<(), ApiError> {
        let mut script = self.script.lock().expect("auth script mutex poisoned");
        script.calls.push("sign_up");
        if script.sign_up_fails {
            return Err(rejected(script.failure_message.clone()));
        }
        Ok(())
    }

    fn set_bearer_token(&self, token: Option<&str>) {
        let mut script = self.script.lock().expect("auth script mutex poisoned");
        script.bearer_history.push(token.map(str::to_string));
    }
}

#[derive(Default)]
struct CartBackend {
    cart: Cart,
    catalog: HashMap<i64, Product>,
    fail: bool,
    failure_message: Option<String>,
    calls: Vec<String>,
    // Per-call latency, consumed in call order.
    delays: VecDeque<Duration>,
}

// In-memory cart backend mimicking server-side merge/update/remove rules.
#[derive(Clone, Default)]
pub(crate) struct FakeCartApi {
    backend: Arc<Mutex<CartBackend>>,
}

impl FakeCartApi {
    pub(crate) fn with_catalog(products: Vec<Product>) -> Self {
        let api = Self::default();
        {
            let mut backend = api.backend.lock().expect("cart backend mutex poisoned");
            backend.catalog = products.into_iter().map(|p| (p.id, p)).collect();
        }
        api
    }

    pub(crate) fn with_cart(self, cart: Cart) -> Self {
        self.backend.lock().expect("cart backend mutex poisoned").cart = cart;
        self
    }

    pub(crate) fn set_failing(&self, fail: bool, message: Option<&str>) {
        let mut backend = self.backend.lock().expect("cart backend mutex poisoned");
        backend.fail = fail;
        backend.failure_message = message.map(str::to_string);
    }

    pub(crate) fn push_delay(&self, delay: Duration) {
        self.backend
            .lock()
            .expect("cart backend mutex poisoned")
            .delays
            .push_back(delay);
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.backend
            .lock()
            .expect("cart backend mutex poisoned")
            .calls
            .clone()
    }

    // Records the call and returns its scripted latency, or the scripted failure.
    fn begin(&self, call: String) -> Result<Option<Duration>, ApiError> {
        let mut backend = self.backend.lock().expect("cart backend mutex poisoned");
        backend.calls.push(call);
        if backend.fail {
            return Err(rejected(backend.failure_message.clone()));
        }
        Ok(backend.delays.pop_front())
    }

    async fn pause(delay: Option<Duration>) {
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn snapshot(&self) -> Cart {
        self.backend
            .lock()
            .expect("cart backend mutex poisoned")
            .cart
            .clone()
    }
}

#[async_trait]
impl CartApi for FakeCartApi {
    async fn get_cart(&self) -> Result<Cart, ApiError> {
        let delay = self.begin("get".to_string())?;
        Self::pause(delay).await;
        Ok(self.snapshot())
    }

    async fn add_item(&self, product_id: i64, quantity: u32) -> Result<Cart, ApiError> {
        let delay = self.begin(format!("add:{product_id}:{quantity}"))?;
        Self::pause(delay).await;
        let mut backend = self.backend.lock().expect("cart backend mutex poisoned");
        let Some(product) = backend.catalog.get(&product_id).cloned() else {
            return Err(rejected(Some(format!("Product not found with id: {product_id}"))));
        };
        match backend
            .cart
            .items
            .iter()
            .position(|item| item.product.id == product_id)
        {
            Some(index) => backend.cart.items[index].quantity += quantity,
            None => backend.cart.items.push(CartItem {
                id: None,
                product,
                quantity,
            }),
        }
        Ok(backend.cart.clone())
    }

    async fn update_item(&self, product_id: i64, quantity: u32) -> Result<Cart, ApiError> {
        let delay = self.begin(format!("update:{product_id}:{quantity}"))?;
        Self::pause(delay).await;
        let mut backend = self.backend.lock().expect("cart backend mutex poisoned");
        let Some(index) = backend
            .cart
            .items
            .iter()
            .position(|item| item.product.id == product_id)
        else {
            return Err(rejected(Some("Item not found in cart".to_string())));
        };
        if quantity == 0 {
            backend.cart.items.remove(index);
        } else {
            backend.cart.items[index].quantity = quantity;
        }
        Ok(backend.cart.clone())
    }

    async fn remove_item(&self, product_id: i64) -> Result<Cart, ApiError> {
        let delay = self.begin(format!("remove:{product_id}"))?;
        Self::pause(delay).await;
        let mut backend = self.backend.lock().expect("cart backend mutex poisoned");
        let before = backend.cart.items.len();
        backend.cart.items.retain(|item| item.product.id != product_id);
        if backend.cart.items.len() == before {
            return Err(rejected(Some("Item not found in cart".to_string())));
        }
        Ok(backend.cart.clone())
    }

    async fn clear(&self) -> Result<(), ApiError> {
        let delay = self.begin("clear".to_string())?;
        Self::pause(delay).await;
        self.backend
            .lock()
            .expect("cart backend mutex poisoned")
            .cart
            .items
            .clear();
        Ok(())
    }

    async fn total(&self) -> Result<Decimal, ApiError> {
        let delay = self.begin("total".to_string())?;
        Self::pause(delay).await;
        Ok(self.snapshot().total())
    }
}

#[derive(Default)]
struct ProductBackend {
    products: Vec<Product>,
    fail: bool,
    calls: Vec<String>,
    next_id: i64,
}

// Product catalog fake with a monotonically increasing id sequence.
#[derive(Clone, Default)]
pub(crate) struct FakeProductApi {
    backend: Arc<Mutex<ProductBackend>>,
}

impl FakeProductApi {
    pub(crate) fn with_products(products: Vec<Product>) -> Self {
        let api = Self::default();
        {
            let mut backend = api.backend.lock().expect("product backend mutex poisoned");
            backend.next_id = products.iter().map(|p| p.id).max().unwrap_or(0) + 1;
            backend.products = products;
        }
        api
    }

    pub(crate) fn set_failing(&self, fail: bool) {
        self.backend
            .lock()
            .expect("product backend mutex poisoned")
            .fail = fail;
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.backend
            .lock()
            .expect("product backend mutex poisoned")
            .calls
            .clone()
    }

    pub(crate) fn products(&self) -> Vec<Product> {
        self.backend
            .lock()
            .expect("product backend mutex poisoned")
            .products
            .clone()
    }

    fn begin(&self, call: String) -> Result<std::sync::MutexGuard<'_, ProductBackend>, ApiError> {
        let mut backend = self.backend.lock().expect("product backend mutex poisoned");
        backend.calls.push(call);
        if backend.fail {
            return Err(ApiError::Upstream {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: None,
            });
        }
        Ok(backend)
    }
}

fn apply_input(product: &mut Product, input: &ProductInput) {
    product.name = input.name.clone();
    product.description = input.description.clone();
    product.price = input.price;
    product.stock_quantity = input.stock_quantity;
    product.image_url = input.image_url.clone();
    product.category = input.category.clone();
}

fn not_found(id: i64) -> ApiError {
    ApiError::Upstream {
        status: StatusCode::NOT_FOUND,
        message: Some(format!("Product not found with id: {id}")),
    }
}

#[async_trait]
impl ProductApi for FakeProductApi {
    async fn list(&self, query: &ProductQuery) -> Result<ProductPage, ApiError> {
        let backend = self.begin(format!("list:{}:{}", query.page, query.size))?;
        let matching: Vec<Product> = backend
            .products
            .iter()
            .filter(|p| query.category.as_ref().is_none_or(|c| &p.category == c))
            .filter(|p| {
                query
                    .name
                    .as_ref()
                    .is_none_or(|n| p.name.to_lowercase().contains(&n.to_lowercase()))
            })
            .cloned()
            .collect();
        let size = query.size.max(1) as usize;
        let total_elements = matching.len() as u64;
        let total_pages = matching.len().div_ceil(size) as u32;
        let content: Vec<Product> = matching
            .into_iter()
            .skip(query.page as usize * size)
            .take(size)
            .collect();
        Ok(ProductPage {
            empty: content.is_empty(),
            first: query.page == 0,
            last: query.page + 1 >= total_pages,
            content,
            total_elements,
            total_pages,
            number: query.page,
            size: query.size,
        })
    }

    async fn get(&self, id: i64) -> Result<Product, ApiError> {
        let backend = self.begin(format!("get:{id}"))?;
        backend
            .products
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    async fn categories(&self) -> Result<Vec<String>, ApiError> {
        let backend = self.begin("categories".to_string())?;
        let mut categories: Vec<String> =
            backend.products.iter().map(|p| p.category.clone()).collect();
        categories.sort();
        categories.dedup();
        Ok(categories)
    }

    async fn create(&self, input: &ProductInput) -> Result<Product, ApiError> {
        let mut backend = self.begin("create".to_string())?;
        let mut product = sample_product(backend.next_id, 0);
        backend.next_id += 1;
        apply_input(&mut product, input);
        backend.products.push(product.clone());
        Ok(product)
    }

    async fn update(&self, id: i64, input: &ProductInput) -> Result<Product, ApiError> {
        let mut backend = self.begin(format!("update:{id}"))?;
        let product = backend
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| not_found(id))?;
        apply_input(product, input);
        Ok(product.clone())
    }

    async fn delete(&self, id: i64) -> Result<(), ApiError> {
        let mut backend = self.begin(format!("delete:{id}"))?;
        let before = backend.products.len();
        backend.products.retain(|p| p.id != id);
        if backend.products.len() == before {
            return Err(not_found(id));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Default)]
pub(crate) struct FailureFlags {
    pub set: bool,
    pub remove: bool,
    // Fails writes to this one key only.
    pub set_key: Option<&'static str>,
}

// Durable storage fake; entries are inspectable and writes can be made to fail.
#[derive(Clone, Default)]
pub(crate) struct RecordingStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
    failures: FailureFlags,
}

impl RecordingStorage {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_failures(mut self, failures: FailureFlags) -> Self {
        self.failures = failures;
        self
    }

    pub(crate) fn seed(&self, key: &str, value: &str) {
        let mut guard = self.entries.lock().expect("entries mutex poisoned");
        guard.insert(key.to_string(), value.to_string());
    }

    pub(crate) fn entry(&self, key: &str) -> Option<String> {
        let guard = self.entries.lock().expect("entries mutex poisoned");
        guard.get(key).cloned()
    }
}

impl KeyValueStorage for RecordingStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.failures.set || self.failures.set_key == Some(key) {
            return Err(StorageError::Io(std::io::Error::other("set failed")));
        }
        let mut guard = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        if self.failures.remove {
            return Err(StorageError::Io(std::io::Error::other("remove failed")));
        }
        let mut guard = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        guard.remove(key);
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Notice {
    Success(String),
    Error(String),
}

// Captures notifications in emission order.
#[derive(Clone, Default)]
pub(crate) struct RecordingNotifier {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl RecordingNotifier {
    pub(crate) fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .expect("notices mutex poisoned")
            .clone()
    }

    pub(crate) fn last(&self) -> Option<Notice> {
        self.notices().last().cloned()
    }
}

impl Notifier for RecordingNotifier {
    fn success(&self, message: &str) {
        let mut guard = self.notices.lock().expect("notices mutex poisoned");
        guard.push(Notice::Success(message.to_string()));
    }

    fn error(&self, message: &str) {
        let mut guard = self.notices.lock().expect("notices mutex poisoned");
        guard.push(Notice::Error(message.to_string()));
    }
}
