//! Property-based tests for the order item workflow and money arithmetic.
//!
//! Random action sequences are applied to items and orders; the invariants
//! must hold no matter which actions succeed or fail along the way.

use std::collections::HashSet;

use chrono::{Duration, Utc};
use marketplace_api::models::{
    offer::discounted_price, CancelReason, Coupon, ItemStatus, Order, OrderItem, OrderStatus,
    PaymentMethod, PaymentStatus, ReturnStatus, ShippingAddress,
};
use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

#[derive(Clone, Debug)]
enum Action {
    Advance(ItemStatus),
    Cancel,
    OpenReturn(String),
    Approve,
    Reject(String),
}

fn status_strategy() -> impl Strategy<Value = ItemStatus> {
    prop_oneof![
        Just(ItemStatus::Processing),
        Just(ItemStatus::Shipped),
        Just(ItemStatus::Delivered),
        Just(ItemStatus::Cancelled),
        Just(ItemStatus::Returned),
    ]
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        4 => status_strategy().prop_map(Action::Advance),
        1 => Just(Action::Cancel),
        2 => "[ a-z]{0,12}".prop_map(Action::OpenReturn),
        1 => Just(Action::Approve),
        1 => "[ a-z]{0,12}".prop_map(Action::Reject),
    ]
}

/// Amounts in paise-precision rupees, 1.00 to 99_999.99
fn price_strategy() -> impl Strategy<Value = Decimal> {
    (100i64..10_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn item(price: Decimal, quantity: u32) -> OrderItem {
    OrderItem::new(Uuid::new_v4(), Uuid::new_v4(), "Widget", "WD-1", quantity, price)
}

fn apply(item: &mut OrderItem, action: &Action) -> bool {
    let now = Utc::now();
    match action {
        Action::Advance(status) => item.advance_to(*status, now).is_ok(),
        Action::Cancel => item.cancel(CancelReason::ChangedMind, now).is_ok(),
        Action::OpenReturn(reason) => item.open_return(reason, now).is_ok(),
        Action::Approve => item.approve_return(None, now).is_ok(),
        Action::Reject(comment) => item.reject_return(comment, now).is_ok(),
    }
}

fn is_legal_step(from: ItemStatus, to: ItemStatus) -> bool {
    from == to
        || from.next() == Some(to)
        || (to == ItemStatus::Cancelled && from.is_cancellable())
        || (from == ItemStatus::Delivered && to == ItemStatus::Returned)
}

fn order_with(items: Vec<OrderItem>, coupon_discount: Decimal) -> Order {
    let now = Utc::now();
    let subtotal: Decimal = items.iter().map(OrderItem::line_total).sum();
    let coupon_discount = coupon_discount.min(subtotal);
    Order {
        id: Uuid::new_v4(),
        order_number: "ORD-TEST".into(),
        customer_id: Uuid::new_v4(),
        items,
        shipping_address: ShippingAddress {
            full_name: "Test Buyer".into(),
            phone: "9876543210".into(),
            line1: "1 Test Street".into(),
            line2: None,
            city: "Pune".into(),
            state: "MH".into(),
            postal_code: "411001".into(),
            country: "India".into(),
        },
        payment_method: PaymentMethod::Online,
        payment_status: PaymentStatus::Paid,
        status: OrderStatus::Processing,
        subtotal,
        coupon_code: None,
        coupon_discount,
        total: subtotal - coupon_discount,
        refunded_amount: Decimal::ZERO,
        gateway_order_id: None,
        payment_reference: None,
        ordered_at: now,
        shipped_at: None,
        delivered_at: None,
        updated_at: now,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn item_status_only_moves_along_the_workflow(
        actions in prop::collection::vec(action_strategy(), 0..24)
    ) {
        let mut item = item(Decimal::new(49_900, 2), 1);
        for action in &actions {
            let before = item.clone();
            let applied = apply(&mut item, action);

            prop_assert!(
                is_legal_step(before.item_status, item.item_status),
                "{:?} moved {} to {}", action, before.item_status, item.item_status
            );
            if !applied {
                prop_assert_eq!(&before, &item, "failed action {:?} left a change", action);
            }
            if before.item_status.is_terminal() {
                prop_assert_eq!(before.item_status, item.item_status);
            }
        }
    }

    #[test]
    fn returns_only_follow_delivery_and_resolve_once(
        actions in prop::collection::vec(action_strategy(), 0..24)
    ) {
        let mut item = item(Decimal::new(12_000, 2), 2);
        let mut resolved: Option<ReturnStatus> = None;
        for action in &actions {
            apply(&mut item, action);

            if item.return_status.is_some() {
                prop_assert!(item.delivered_at.is_some());
                prop_assert!(item.return_reason.as_deref().map_or(false, |r| !r.trim().is_empty()));
            }
            match (resolved, item.return_status) {
                (Some(done), current) => prop_assert_eq!(Some(done), current),
                (None, Some(s @ (ReturnStatus::Approved | ReturnStatus::Rejected))) => {
                    resolved = Some(s);
                }
                _ => {}
            }
            if item.return_status == Some(ReturnStatus::Rejected) {
                prop_assert!(item.return_comment.as_deref().map_or(false, |c| !c.is_empty()));
            }
            prop_assert_eq!(
                item.item_status == ItemStatus::Returned,
                item.return_status == Some(ReturnStatus::Approved)
            );
        }
    }

    #[test]
    fn order_status_follows_the_least_advanced_live_item(
        statuses in prop::collection::vec(status_strategy(), 1..6)
    ) {
        let items = statuses
            .iter()
            .map(|&status| {
                let mut item = item(Decimal::ONE_HUNDRED, 1);
                item.item_status = status;
                item
            })
            .collect();
        let order = order_with(items, Decimal::ZERO);
        let derived = order.derive_status();

        let live: Vec<ItemStatus> = statuses
            .iter()
            .copied()
            .filter(|s| *s != ItemStatus::Cancelled)
            .collect();
        if live.is_empty() {
            prop_assert_eq!(derived, OrderStatus::Cancelled);
        } else if live.contains(&ItemStatus::Processing) {
            prop_assert_eq!(derived, OrderStatus::Processing);
        } else if live.contains(&ItemStatus::Shipped) {
            prop_assert_eq!(derived, OrderStatus::Shipped);
        } else if live.contains(&ItemStatus::Delivered) {
            prop_assert_eq!(derived, OrderStatus::Delivered);
        } else {
            prop_assert_eq!(derived, OrderStatus::Returned);
        }
    }

    #[test]
    fn refunds_never_exceed_what_was_paid(
        lines in prop::collection::vec((price_strategy(), 1u32..5), 1..6),
        discount in price_strategy(),
    ) {
        let items = lines.iter().map(|&(price, qty)| item(price, qty)).collect();
        let mut order = order_with(items, discount);

        let refunds: Vec<Decimal> = order
            .items
            .iter()
            .map(|i| order.refund_amount_for(i))
            .collect();
        for (refund, line) in refunds.iter().zip(&order.items) {
            prop_assert!(*refund >= Decimal::ZERO);
            prop_assert!(*refund <= line.line_total());
        }

        for refund in refunds {
            order.record_refund(refund);
            prop_assert!(order.refunded_amount <= order.total);
        }
        prop_assert_eq!(
            order.payment_status == PaymentStatus::Refunded,
            order.refunded_amount >= order.total
        );
    }

    #[test]
    fn coupon_discount_is_bounded(
        subtotal in price_strategy(),
        pct in 1i64..=90,
        cap in prop::option::of(price_strategy()),
    ) {
        let now = Utc::now();
        let coupon = Coupon {
            id: Uuid::new_v4(),
            code: "PROP".into(),
            description: None,
            discount_percentage: Decimal::from(pct),
            max_discount: cap,
            minimum_purchase: Decimal::ZERO,
            expires_at: now + Duration::days(1),
            is_active: true,
            used_by: HashSet::new(),
            created_at: now,
            updated_at: now,
        };
        let discount = coupon.discount_for(subtotal);
        prop_assert!(discount >= Decimal::ZERO);
        prop_assert!(discount <= subtotal);
        if let Some(cap) = cap {
            prop_assert!(discount <= cap);
        }
        prop_assert!(discount.scale() <= 2);
    }

    #[test]
    fn offer_price_stays_within_list_price(
        price in price_strategy(),
        pct in 1i64..=90,
    ) {
        let discounted = discounted_price(price, Decimal::from(pct));
        prop_assert!(discounted > Decimal::ZERO);
        prop_assert!(discounted <= price);
        prop_assert!(discounted.scale() <= 2);
    }
}
