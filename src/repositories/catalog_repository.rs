use std::ops::Deref;
use tracing::warn;
use uuid::Uuid;

use super::{BaseRepository, Record, UniqueIndex};
use crate::errors::ServiceError;
use crate::models::catalog::{Category, Product};

impl Record for Category {
    const KIND: &'static str = "Category";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl Record for Product {
    const KIND: &'static str = "Product";

    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug)]
pub struct CategoryRepository {
    base: BaseRepository<Category>,
    pub names: UniqueIndex,
}

impl Default for CategoryRepository {
    fn default() -> Self {
        Self {
            base: BaseRepository::new(),
            names: UniqueIndex::new("category name"),
        }
    }
}

impl Deref for CategoryRepository {
    type Target = BaseRepository<Category>;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

#[derive(Debug)]
pub struct ProductRepository {
    base: BaseRepository<Product>,
    pub skus: UniqueIndex,
}

impl Default for ProductRepository {
    fn default() -> Self {
        Self {
            base: BaseRepository::new(),
            skus: UniqueIndex::new("SKU"),
        }
    }
}

impl Deref for ProductRepository {
    type Target = BaseRepository<Product>;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

impl ProductRepository {
    /// Takes stock for every `(product_id, quantity)` line, or none of them.
    pub fn reserve_stock(&self, lines: &[(Uuid, u32)]) -> Result<(), ServiceError> {
        let mut taken: Vec<(Uuid, u32)> = Vec::with_capacity(lines.len());
        for &(product_id, quantity) in lines {
            let result = self.base.update(product_id, |product| {
                if !product.is_active {
                    return Err(ServiceError::InvalidOperation(format!(
                        "product {} is not available",
                        product.name
                    )));
                }
                if product.stock < quantity {
                    return Err(ServiceError::InsufficientStock(format!(
                        "only {} of {} left in stock",
                        product.stock, product.name
                    )));
                }
                product.stock -= quantity;
                Ok(())
            });
            if let Err(e) = result {
                for &(id, qty) in &taken {
                    self.restock(id, qty);
                }
                return Err(e);
            }
            taken.push((product_id, quantity));
        }
        Ok(())
    }

    /// Puts stock back. Products deleted in the meantime are skipped.
    pub fn restock(&self, product_id: Uuid, quantity: u32) {
        let result = self.base.update(product_id, |product| {
            product.stock = product.stock.saturating_add(quantity);
            Ok(())
        });
        if let Err(e) = result {
            warn!(%product_id, quantity, error = %e, "Could not restock product");
        }
    }
}
