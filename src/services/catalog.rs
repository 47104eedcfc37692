use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::{commerce::PricingService, commerce::ProductView, paginate};
use crate::{
    auth::AuthUser,
    errors::ServiceError,
    events::{Event, EventSender},
    models::{validate_price, Category, Product},
    repositories::Store,
};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 2, max = 80, message = "Name must be between 2 and 80 characters"))]
    pub name: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 2, max = 80, message = "Name must be between 2 and 80 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    pub category_id: Uuid,
    #[validate(length(min = 2, max = 200, message = "Name must be between 2 and 200 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 64, message = "SKU must be between 1 and 64 characters"))]
    pub sku: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(custom = "validate_price")]
    pub price: Decimal,
    pub stock: u32,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    pub category_id: Option<Uuid>,
    #[validate(length(min = 2, max = 200, message = "Name must be between 2 and 200 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(custom = "validate_price")]
    pub price: Option<Decimal>,
    pub stock: Option<u32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductFilter {
    pub category_id: Option<Uuid>,
    pub vendor_id: Option<Uuid>,
    /// Case-insensitive match on name or SKU
    pub search: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Categories and products
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<Store>,
    event_sender: Arc<EventSender>,
    pricing: Arc<PricingService>,
}

impl CatalogService {
    pub fn new(store: Arc<Store>, event_sender: Arc<EventSender>, pricing: Arc<PricingService>) -> Self {
        Self {
            store,
            event_sender,
            pricing,
        }
    }

    #[instrument(skip(self))]
    pub async fn create_category(&self, input: CreateCategoryRequest) -> Result<Category, ServiceError> {
        input.validate()?;
        let now = Utc::now();
        let id = Uuid::new_v4();
        let name = input.name.trim().to_string();
        self.store.categories.names.claim(&name, id)?;

        let category = self.store.categories.insert(Category {
            id,
            name,
            description: input.description,
            is_active: input.is_active,
            created_at: now,
            updated_at: now,
        });
        info!(category_id = %id, name = %category.name, "Category created");
        self.event_sender.send_or_log(Event::CategoryCreated(id)).await;
        Ok(category)
    }

    #[instrument(skip(self))]
    pub async fn update_category(
        &self,
        id: Uuid,
        input: UpdateCategoryRequest,
    ) -> Result<Category, ServiceError> {
        input.validate()?;
        let existing = self.store.categories.get(id)?;
        let renamed = input
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.eq_ignore_ascii_case(&existing.name));
        if let Some(name) = renamed {
            self.store.categories.names.claim(name, id)?;
        }

        let result = self.store.categories.update(id, |category| {
            if let Some(name) = &input.name {
                category.name = name.trim().to_string();
            }
            if let Some(description) = &input.description {
                category.description = Some(description.clone());
            }
            if let Some(is_active) = input.is_active {
                category.is_active = is_active;
            }
            category.updated_at = Utc::now();
            Ok(category.clone())
        });

        match (&result, renamed) {
            (Ok(_), Some(_)) => self.store.categories.names.release(&existing.name, id),
            (Err(_), Some(name)) => self.store.categories.names.release(name, id),
            _ => {}
        }
        let category = result?;
        self.event_sender.send_or_log(Event::CategoryUpdated(id)).await;
        Ok(category)
    }

    /// Categories sorted by name. Inactive ones are included only on request.
    pub async fn list_categories(&self, include_inactive: bool) -> Vec<Category> {
        let mut categories = self
            .store
            .categories
            .filter(|c| include_inactive || c.is_active);
        categories.sort_by_key(|c| c.name.to_lowercase());
        categories
    }

    pub async fn get_category(&self, id: Uuid, include_inactive: bool) -> Result<Category, ServiceError> {
        self.store
            .categories
            .get(id)
            .ok()
            .filter(|c| include_inactive || c.is_active)
            .ok_or_else(|| ServiceError::NotFound(format!("Category {} not found", id)))
    }

    /// Creates a product owned by `vendor_id`.
    #[instrument(skip(self))]
    pub async fn create_product(
        &self,
        vendor_id: Uuid,
        input: CreateProductRequest,
    ) -> Result<ProductView, ServiceError> {
        input.validate()?;
        let category = self.store.categories.get(input.category_id)?;
        if !category.is_active {
            return Err(ServiceError::InvalidOperation(format!(
                "category {} is not active",
                category.name
            )));
        }

        let now = Utc::now();
        let id = Uuid::new_v4();
        let sku = input.sku.trim().to_string();
        self.store.products.skus.claim(&sku, id)?;

        let product = self.store.products.insert(Product {
            id,
            vendor_id,
            category_id: category.id,
            name: input.name.trim().to_string(),
            sku,
            description: input.description,
            price: input.price,
            stock: input.stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        });
        info!(product_id = %id, %vendor_id, sku = %product.sku, "Product created");
        self.event_sender.send_or_log(Event::ProductCreated(id)).await;
        Ok(self.pricing.view(product, now))
    }

    /// Updates a product. Vendors may only touch their own products.
    #[instrument(skip(self))]
    pub async fn update_product(
        &self,
        id: Uuid,
        input: UpdateProductRequest,
        actor: AuthUser,
    ) -> Result<ProductView, ServiceError> {
        input.validate()?;
        if let Some(category_id) = input.category_id {
            let category = self.store.categories.get(category_id)?;
            if !category.is_active {
                return Err(ServiceError::InvalidOperation(format!(
                    "category {} is not active",
                    category.name
                )));
            }
        }

        let now = Utc::now();
        let product = self.store.products.update(id, |product| {
            if !(actor.is_admin() || (actor.is_vendor() && product.vendor_id == actor.user_id)) {
                return Err(ServiceError::Forbidden(format!(
                    "product {} belongs to another vendor",
                    product.id
                )));
            }
            if let Some(category_id) = input.category_id {
                product.category_id = category_id;
            }
            if let Some(name) = &input.name {
                product.name = name.trim().to_string();
            }
            if let Some(description) = &input.description {
                product.description = Some(description.clone());
            }
            if let Some(price) = input.price {
                product.price = price;
            }
            if let Some(stock) = input.stock {
                product.stock = stock;
            }
            if let Some(is_active) = input.is_active {
                product.is_active = is_active;
            }
            product.updated_at = now;
            Ok(product.clone())
        })?;

        self.event_sender.send_or_log(Event::ProductUpdated(id)).await;
        Ok(self.pricing.view(product, now))
    }

    /// Lists products with their effective prices, sorted by name.
    ///
    /// Shoppers only see active products in active categories. Admins see
    /// everything and vendors also see their own delisted products.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        filter: ProductFilter,
        viewer: Option<AuthUser>,
        page: u64,
        limit: u64,
    ) -> (Vec<ProductView>, u64) {
        let search = filter
            .search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        let mut products = self.store.products.filter(|p| {
            filter.category_id.map_or(true, |c| p.category_id == c)
                && filter.vendor_id.map_or(true, |v| p.vendor_id == v)
                && search.as_ref().map_or(true, |s| {
                    p.name.to_lowercase().contains(s) || p.sku.to_lowercase().contains(s)
                })
                && self.is_visible(p, viewer.as_ref())
        });
        products.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));

        let now = Utc::now();
        let (page_items, total) = paginate(products, page, limit);
        (
            page_items
                .into_iter()
                .map(|p| self.pricing.view(p, now))
                .collect(),
            total,
        )
    }

    pub async fn get_product(
        &self,
        id: Uuid,
        viewer: Option<AuthUser>,
    ) -> Result<ProductView, ServiceError> {
        let product = self
            .store
            .products
            .find_by_id(id)
            .filter(|p| self.is_visible(p, viewer.as_ref()))
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))?;
        Ok(self.pricing.view(product, Utc::now()))
    }

    fn is_visible(&self, product: &Product, viewer: Option<&AuthUser>) -> bool {
        match viewer {
            Some(user) if user.is_admin() => true,
            Some(user) if user.is_vendor() && user.user_id == product.vendor_id => true,
            _ => {
                product.is_active
                    && self
                        .store
                        .categories
                        .find_by_id(product.category_id)
                        .map(|c| c.is_active)
                        .unwrap_or(false)
            }
        }
    }
}
