use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::entities::{
    Cart, Credentials, Product, ProductInput, ProductPage, ProductQuery, Registration, Session,
};
use crate::domain::errors::{ApiError, StorageError};

// Stores depend on these traits, never on the reqwest client directly.

// Port for the backend auth endpoints and the outgoing authorization header.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, ApiError>;
    async fn sign_up(&self, registration: &Registration) -> Result<(), ApiError>;
    // Applies to every request issued after the call; None removes the header.
    fn set_bearer_token(&self, token: Option<&str>);
}

// Port for the cart endpoints. Every mutation answers with the authoritative cart.
#[async_trait]
pub trait CartApi: Send + Sync {
    async fn get_cart(&self) -> Result<Cart, ApiError>;
    async fn add_item(&self, product_id: i64, quantity: u32) -> Result<Cart, ApiError>;
    async fn update_item(&self, product_id: i64, quantity: u32) -> Result<Cart, ApiError>;
    async fn remove_item(&self, product_id: i64) -> Result<Cart, ApiError>;
    async fn clear(&self) -> Result<(), ApiError>;
    async fn total(&self) -> Result<Decimal, ApiError>;
}

// Port for catalog reads and admin product CRUD.
#[async_trait]
pub trait ProductApi: Send + Sync {
    async fn list(&self, query: &ProductQuery) -> Result<ProductPage, ApiError>;
    async fn get(&self, id: i64) -> Result<Product, ApiError>;
    async fn categories(&self) -> Result<Vec<String>, ApiError>;
    async fn create(&self, input: &ProductInput) -> Result<Product, ApiError>;
    async fn update(&self, id: i64, input: &ProductInput) -> Result<Product, ApiError>;
    async fn delete(&self, id: i64) -> Result<(), ApiError>;
}

// Port for durable client-side key/value storage. Access is synchronous and local.
pub trait KeyValueStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

// Port for transient user-facing notifications.
pub trait Notifier: Send + Sync {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
}
