pub mod entities;
pub mod errors;
pub mod ports;

// Re-export the domain boundary types and ports.
pub use entities::{
    Cart, CartItem, Credentials, Product, ProductInput, ProductPage, ProductQuery, Registration,
    Role, Session, SortDirection, User,
};
pub use errors::{ActionError, ApiError, StorageError};
pub use ports::{AuthApi, CartApi, KeyValueStorage, Notifier, ProductApi};
