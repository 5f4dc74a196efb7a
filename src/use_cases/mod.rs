pub mod auth_session;
pub mod cart;
pub mod catalog;
pub mod route_guard;

#[cfg(test)]
pub(crate) mod test_support;

pub use auth_session::{AuthSessionStore, AuthState};
pub use cart::{CartState, CartStore};
pub use catalog::Catalog;
pub use route_guard::{Access, Route, RouteDecision, guard, resolve};
