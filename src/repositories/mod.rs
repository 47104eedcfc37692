//! In-memory repositories.
//!
//! Every table is a `DashMap` keyed by id. Mutations go through
//! [`BaseRepository::update`], which edits a copy of the row while holding the
//! row's shard lock and writes it back only when the closure succeeds. A failed
//! command therefore leaves the stored row untouched, and two commands on the
//! same row run one after the other.

use dashmap::{mapref::entry::Entry, DashMap};
use std::sync::Arc;
use uuid::Uuid;

use crate::errors::ServiceError;

pub mod cart_repository;
pub mod catalog_repository;
pub mod order_repository;
pub mod promotion_repository;

pub use cart_repository::CartRepository;
pub use catalog_repository::{CategoryRepository, ProductRepository};
pub use order_repository::OrderRepository;
pub use promotion_repository::{CouponRepository, OfferRepository};

/// A row that can live in a [`BaseRepository`]
pub trait Record: Clone + Send + Sync + 'static {
    /// Human readable name used in not-found errors
    const KIND: &'static str;

    fn id(&self) -> Uuid;
}

#[derive(Debug)]
pub struct BaseRepository<T> {
    rows: DashMap<Uuid, T>,
}

impl<T> Default for BaseRepository<T> {
    fn default() -> Self {
        Self {
            rows: DashMap::new(),
        }
    }
}

impl<T: Record> BaseRepository<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, row: T) -> T {
        self.rows.insert(row.id(), row.clone());
        row
    }

    pub fn find_by_id(&self, id: Uuid) -> Option<T> {
        self.rows.get(&id).map(|r| r.value().clone())
    }

    pub fn get(&self, id: Uuid) -> Result<T, ServiceError> {
        self.find_by_id(id)
            .ok_or_else(|| ServiceError::NotFound(format!("{} {} not found", T::KIND, id)))
    }

    pub fn find_all(&self) -> Vec<T> {
        self.rows.iter().map(|r| r.value().clone()).collect()
    }

    pub fn filter<F>(&self, predicate: F) -> Vec<T>
    where
        F: Fn(&T) -> bool,
    {
        self.rows
            .iter()
            .filter(|r| predicate(r.value()))
            .map(|r| r.value().clone())
            .collect()
    }

    /// Applies `f` to a copy of the row and stores the copy if `f` succeeds.
    pub fn update<R, F>(&self, id: Uuid, f: F) -> Result<R, ServiceError>
    where
        F: FnOnce(&mut T) -> Result<R, ServiceError>,
    {
        let mut entry = self
            .rows
            .get_mut(&id)
            .ok_or_else(|| ServiceError::NotFound(format!("{} {} not found", T::KIND, id)))?;
        let mut draft = entry.value().clone();
        let out = f(&mut draft)?;
        *entry.value_mut() = draft;
        Ok(out)
    }

    pub fn remove(&self, id: Uuid) -> Option<T> {
        self.rows.remove(&id).map(|(_, row)| row)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Case-insensitive unique key index (SKUs, coupon codes, category names)
#[derive(Debug)]
pub struct UniqueIndex {
    label: &'static str,
    keys: DashMap<String, Uuid>,
}

impl UniqueIndex {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            keys: DashMap::new(),
        }
    }

    fn normalize(key: &str) -> String {
        key.trim().to_lowercase()
    }

    /// Reserves `key` for `owner`. Re-claiming an owned key is a no-op.
    pub fn claim(&self, key: &str, owner: Uuid) -> Result<(), ServiceError> {
        match self.keys.entry(Self::normalize(key)) {
            Entry::Occupied(existing) if *existing.get() != owner => Err(ServiceError::Conflict(
                format!("{} '{}' is already taken", self.label, key.trim()),
            )),
            Entry::Occupied(_) => Ok(()),
            Entry::Vacant(slot) => {
                slot.insert(owner);
                Ok(())
            }
        }
    }

    pub fn release(&self, key: &str, owner: Uuid) {
        self.keys
            .remove_if(&Self::normalize(key), |_, holder| *holder == owner);
    }

    pub fn lookup(&self, key: &str) -> Option<Uuid> {
        self.keys.get(&Self::normalize(key)).map(|id| *id.value())
    }
}

/// All repositories of the service, shared behind one `Arc`
#[derive(Debug, Default)]
pub struct Store {
    pub orders: OrderRepository,
    pub categories: CategoryRepository,
    pub products: ProductRepository,
    pub coupons: CouponRepository,
    pub offers: OfferRepository,
    pub carts: CartRepository,
}

impl Store {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}
