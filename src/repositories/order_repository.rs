use std::ops::Deref;
use uuid::Uuid;

use super::{BaseRepository, Record};
use crate::models::{order::Order, ItemStatus, ReturnStatus};

impl Record for Order {
    const KIND: &'static str = "Order";

    fn id(&self) -> Uuid {
        self.id
    }
}

/// Repository for orders
#[derive(Debug, Default)]
pub struct OrderRepository {
    base: BaseRepository<Order>,
}

impl Deref for OrderRepository {
    type Target = BaseRepository<Order>;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

impl OrderRepository {
    /// Orders placed by a customer, newest first
    pub fn find_by_customer(&self, customer_id: Uuid) -> Vec<Order> {
        newest_first(self.base.filter(|o| o.customer_id == customer_id))
    }

    /// Orders containing at least one of the vendor's items, newest first
    pub fn find_by_vendor(&self, vendor_id: Uuid) -> Vec<Order> {
        newest_first(self.base.filter(|o| o.involves_vendor(vendor_id)))
    }

    pub fn find_all_newest_first(&self) -> Vec<Order> {
        newest_first(self.base.find_all())
    }

    /// Orders with at least one item that has a return request
    pub fn find_with_returns(&self) -> Vec<Order> {
        self.base.filter(|o| {
            o.items
                .iter()
                .any(|i| i.return_status.is_some() || i.item_status == ItemStatus::Returned)
        })
    }

    pub fn count_pending_returns(&self) -> usize {
        self.base
            .find_all()
            .iter()
            .flat_map(|o| o.items.iter())
            .filter(|i| i.return_status == Some(ReturnStatus::Pending))
            .count()
    }
}

fn newest_first(mut orders: Vec<Order>) -> Vec<Order> {
    orders.sort_by(|a, b| b.ordered_at.cmp(&a.ordered_at).then(b.id.cmp(&a.id)));
    orders
}
