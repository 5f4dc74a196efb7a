use crate::domain::entities::User;
use crate::use_cases::auth_session::AuthState;

// Storefront views the presentation layer can navigate to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Home,
    Products,
    ProductDetail(i64),
    Login,
    Register,
    Cart,
    Profile,
    Admin,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
    AdminOnly,
}

impl Route {
    pub fn path(self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Products => "/products".to_string(),
            Route::ProductDetail(id) => format!("/products/{id}"),
            Route::Login => "/login".to_string(),
            Route::Register => "/register".to_string(),
            Route::Cart => "/cart".to_string(),
            Route::Profile => "/profile".to_string(),
            Route::Admin => "/admin".to_string(),
        }
    }

    pub fn access(self) -> Access {
        match self {
            Route::Home
            | Route::Products
            | Route::ProductDetail(_)
            | Route::Login
            | Route::Register => Access::Public,
            Route::Cart | Route::Profile => Access::Authenticated,
            Route::Admin => Access::AdminOnly,
        }
    }
}

// What the presentation layer should do with a guarded view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteDecision {
    Loading,
    Redirect(Route),
    Render,
}

// Pure access decision for a protected view.
pub fn guard(loading: bool, user: Option<&User>, admin_only: bool) -> RouteDecision {
    if loading {
        return RouteDecision::Loading;
    }
    match user {
        None => RouteDecision::Redirect(Route::Login),
        Some(user) if admin_only && !user.is_admin() => RouteDecision::Redirect(Route::Home),
        Some(_) => RouteDecision::Render,
    }
}

// Applies the guard to a route; public views always render.
pub fn resolve(route: Route, auth: &AuthState) -> RouteDecision {
    match route.access() {
        Access::Public => RouteDecision::Render,
        Access::Authenticated => guard(auth.loading, auth.user(), false),
        Access::AdminOnly => guard(auth.loading, auth.user(), true),
    }
}
