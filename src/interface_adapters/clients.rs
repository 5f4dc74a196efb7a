use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use url::Url;

use crate::domain::entities::{
    Cart, Credentials, Product, ProductInput, ProductPage, ProductQuery, Registration, Session,
};
use crate::domain::errors::ApiError;
use crate::domain::ports::{AuthApi, CartApi, ProductApi};
use crate::interface_adapters::protocol::{CartItemRequest, SignInResponse, error_message};

const SIGNIN_PATH: &str = "api/auth/signin";
const SIGNUP_PATH: &str = "api/auth/signup";
const CART_PATH: &str = "api/cart";
const PRODUCTS_PATH: &str = "api/products";

// Thin wrapper around reqwest for the storefront backend. Clones share the
// connection pool and the bearer token.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    bearer: Arc<RwLock<Option<String>>>,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::Transport)?;

        // Keep any path prefix of the base when joining relative endpoint paths.
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            http,
            base_url,
            bearer: Arc::new(RwLock::new(None)),
        })
    }

    pub fn bearer_token(&self) -> Option<String> {
        match self.bearer.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base_url.join(path)?)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match self.bearer_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    // Sends the request and turns non-2xx answers into upstream errors with
    // whatever message the backend supplied.
    async fn send(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let res = builder.send().await.map_err(ApiError::Transport)?;
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }

        let message = res.text().await.ok().and_then(|body| error_message(&body));
        tracing::debug!(%status, ?message, "backend rejected request.");
        Err(ApiError::Upstream { status, message })
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        self.send(builder)
            .await?
            .json::<T>()
            .await
            .map_err(ApiError::Decode)
    }
}

#[async_trait]
impl AuthApi for ApiClient {
    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, ApiError> {
        let url = self.endpoint(SIGNIN_PATH)?;
        let response: SignInResponse = self
            .send_json(self.request(Method::POST, url).json(credentials))
            .await?;
        Ok(response.into())
    }

    async fn sign_up(&self, registration: &Registration) -> Result<(), ApiError> {
        let url = self.endpoint(SIGNUP_PATH)?;
        self.send(self.request(Method::POST, url).json(registration))
            .await?;
        Ok(())
    }

    fn set_bearer_token(&self, token: Option<&str>) {
        let token = token.map(str::to_string);
        match self.bearer.write() {
            Ok(mut guard) => *guard = token,
            Err(poisoned) => *poisoned.into_inner() = token,
        }
    }
}

#[async_trait]
impl CartApi for ApiClient {
    async fn get_cart(&self) -> Result<Cart, ApiError> {
        let url = self.endpoint(CART_PATH)?;
        self.send_json(self.request(Method::GET, url)).await
    }

    async fn add_item(&self, product_id: i64, quantity: u32) -> Result<Cart, ApiError> {
        let url = self.endpoint(&format!("{CART_PATH}/add"))?;
        let body = CartItemRequest {
            product_id,
            quantity,
        };
        self.send_json(self.request(Method::POST, url).json(&body))
            .await
    }

    async fn update_item(&self, product_id: i64, quantity: u32) -> Result<Cart, ApiError> {
        let url = self.endpoint(&format!("{CART_PATH}/update"))?;
        let body = CartItemRequest {
            product_id,
            quantity,
        };
        self.send_json(self.request(Method::PUT, url).json(&body))
            .await
    }

    async fn remove_item(&self, product_id: i64) -> Result<Cart, ApiError> {
        let url = self.endpoint(&format!("{CART_PATH}/remove/{product_id}"))?;
        self.send_json(self.request(Method::DELETE, url)).await
    }

    async fn clear(&self) -> Result<(), ApiError> {
        let url = self.endpoint(&format!("{CART_PATH}/clear"))?;
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }

    async fn total(&self) -> Result<Decimal, ApiError> {
        let url = self.endpoint(&format!("{CART_PATH}/total"))?;
        self.send_json(self.request(Method::GET, url)).await
    }
}

#[async_trait]
impl ProductApi for ApiClient {
    async fn list(&self, query: &ProductQuery) -> Result<ProductPage, ApiError> {
        let mut url = self.endpoint(PRODUCTS_PATH)?;
        url.query_pairs_mut().extend_pairs(query.to_pairs());
        self.send_json(self.request(Method::GET, url)).await
    }

    async fn get(&self, id: i64) -> Result<Product, ApiError> {
        let url = self.endpoint(&format!("{PRODUCTS_PATH}/{id}"))?;
        self.send_json(self.request(Method::GET, url)).await
    }

    async fn categories(&self) -> Result<Vec<String>, ApiError> {
        let url = self.endpoint(&format!("{PRODUCTS_PATH}/categories"))?;
        self.send_json(self.request(Method::GET, url)).await
    }

    async fn create(&self, input: &ProductInput) -> Result<Product, ApiError> {
        let url = self.endpoint(PRODUCTS_PATH)?;
        self.send_json(self.request(Method::POST, url).json(input))
            .await
    }

    async fn update(&self, id: i64, input: &ProductInput) -> Result<Product, ApiError> {
        let url = self.endpoint(&format!("{PRODUCTS_PATH}/{id}"))?;
        self.send_json(self.request(Method::PUT, url).json(input))
            .await
    }

    async fn delete(&self, id: i64) -> Result<(), ApiError> {
        let url = self.endpoint(&format!("{PRODUCTS_PATH}/{id}"))?;
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }
}
