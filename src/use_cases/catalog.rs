use tracing::{error, info, warn};

use crate::domain::entities::{Product, ProductInput, ProductPage, ProductQuery};
use crate::domain::errors::{ActionError, ApiError};
use crate::domain::ports::{Notifier, ProductApi};

// Number of products shown on the landing page.
pub const FEATURED_COUNT: u32 = 8;

// Product browsing plus the admin dashboard's product CRUD.
pub struct Catalog<P, N> {
    api: P,
    notifier: N,
}

impl<P, N> Catalog<P, N>
where
    P: ProductApi,
    N: Notifier,
{
    pub fn new(api: P, notifier: N) -> Self {
        Self { api, notifier }
    }

    #[tracing::instrument(name = "browse_products", skip_all, fields(page = query.page, size = query.size))]
    pub async fn browse(&self, query: &ProductQuery) -> Result<ProductPage, ActionError> {
        self.api
            .list(query)
            .await
            .map_err(|err| self.reject(&err, "Failed to load products"))
    }

    // Landing-page selection; failures are logged only.
    pub async fn featured(&self) -> Result<Vec<Product>, ActionError> {
        let query = ProductQuery {
            size: FEATURED_COUNT,
            ..ProductQuery::default()
        };
        match self.api.list(&query).await {
            Ok(page) => Ok(page.content),
            Err(err) => {
                error!(error = %err, "error fetching featured products.");
                Err(ActionError::Rejected("Failed to load products".to_string()))
            }
        }
    }

    pub async fn product(&self, id: i64) -> Result<Product, ActionError> {
        self.api
            .get(id)
            .await
            .map_err(|err| self.reject(&err, "Product not found"))
    }

    pub async fn categories(&self) -> Result<Vec<String>, ActionError> {
        self.api.categories().await.map_err(|err| {
            error!(error = %err, "error fetching categories.");
            ActionError::Rejected("Failed to load categories".to_string())
        })
    }

    #[tracing::instrument(name = "create_product", skip_all, fields(name = %input.name))]
    pub async fn create_product(&self, input: &ProductInput) -> Result<Product, ActionError> {
        self.validate(input)?;
        let product = self
            .api
            .create(input)
            .await
            .map_err(|err| self.reject(&err, "Failed to create product"))?;

        info!(product_id = product.id, "product created.");
        self.notifier.success("Product created successfully");
        Ok(product)
    }

    #[tracing::instrument(name = "update_product", skip(self, input))]
    pub async fn update_product(
        &self,
        id: i64,
        input: &ProductInput,
    ) -> Result<Product, ActionError> {
        self.validate(input)?;
        let product = self
            .api
            .update(id, input)
            .await
            .map_err(|err| self.reject(&err, "Failed to update product"))?;

        info!("product updated.");
        self.notifier.success("Product updated successfully");
        Ok(product)
    }

    #[tracing::instrument(name = "delete_product", skip(self))]
    pub async fn delete_product(&self, id: i64) -> Result<(), ActionError> {
        self.api
            .delete(id)
            .await
            .map_err(|err| self.reject(&err, "Failed to delete product"))?;

        info!("product deleted.");
        self.notifier.success("Product deleted successfully");
        Ok(())
    }

    fn reject(&self, err: &ApiError, message: &str) -> ActionError {
        warn!(error = %err, "product request failed.");
        self.notifier.error(message);
        ActionError::Rejected(message.to_string())
    }

    fn validate(&self, input: &ProductInput) -> Result<(), ActionError> {
        match validate_product_input(input) {
            Ok(()) => Ok(()),
            Err(message) => {
                self.notifier.error(message);
                Err(ActionError::Rejected(message.to_string()))
            }
        }
    }
}

// Mirrors the backend column limits so obviously bad input never leaves the client.
fn validate_product_input(input: &ProductInput) -> Result<(), &'static str> {
    const MAX_NAME_LEN: usize = 100;
    const MAX_CATEGORY_LEN: usize = 50;
    const MAX_DESCRIPTION_LEN: usize = 1000;

    let name = input.name.trim();
    if name.is_empty() {
        return Err("Product name is required");
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err("Product name is too long");
    }

    let category = input.category.trim();
    if category.is_empty() {
        return Err("Product category is required");
    }
    if category.chars().count() > MAX_CATEGORY_LEN {
        return Err("Product category is too long");
    }

    if input
        .description
        .as_deref()
        .is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_LEN)
    {
        return Err("Product description is too long");
    }
    if input.price.is_sign_negative() {
        return Err("Product price cannot be negative");
    }

    Ok(())
}
