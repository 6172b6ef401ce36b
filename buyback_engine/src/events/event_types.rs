use bbe_common::Credits;
use serde::{Deserialize, Serialize};

use crate::db_types::{Order, Product};

/// The seller paid the cashback out; the buyer should be congratulated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashbackPaidEvent {
    pub order: Order,
}

impl CashbackPaidEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// The cashback claim was rejected; the buyer should be told why to expect nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashbackRejectedEvent {
    pub order: Order,
}

impl CashbackRejectedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// A campaign just went `Active`; subscribers broadcast it to the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductActivatedEvent {
    pub product: Product,
}

impl ProductActivatedEvent {
    pub fn new(product: Product) -> Self {
        Self { product }
    }
}

/// An order has stalled; the buyer should be nudged to continue the purchase flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReminderEvent {
    pub order: Order,
}

impl OrderReminderEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// A seller's prepaid balance was topped up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceIncreasedEvent {
    pub user_id: i64,
    pub amount: Credits,
    pub new_balance: Credits,
}

impl BalanceIncreasedEvent {
    pub fn new(user_id: i64, amount: Credits, new_balance: Credits) -> Self {
        Self { user_id, amount, new_balance }
    }
}

#[cfg(test)]
mod test {
    use chrono::Utc;

    use super::*;
    use crate::db_types::{OrderStatus, TransactionCode};

    fn order() -> Order {
        let now = Utc::now();
        Order {
            id: 1,
            user_id: 2,
            seller_id: 3,
            product_id: Some(4),
            transaction_code: TransactionCode::from("AB12CD".to_string()),
            step: 2,
            status: OrderStatus::CashbackNotPaid,
            card_number: None,
            phone_number: None,
            bank: None,
            receipt_number: None,
            order_date: None,
            search_screenshot_path: None,
            cart_screenshot_path: None,
            final_cart_screenshot_path: None,
            delivery_screenshot_path: None,
            barcode_screenshot_path: None,
            review_screenshot_path: None,
            receipt_screenshot_path: None,
            reminded_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn events_compare_by_payload() {
        let o = order();
        assert_eq!(CashbackPaidEvent::new(o.clone()), CashbackPaidEvent::new(o.clone()));
        assert_eq!(OrderReminderEvent::new(o.clone()), OrderReminderEvent::new(o));
        assert_ne!(
            BalanceIncreasedEvent::new(1, Credits::from(10), Credits::from(20)),
            BalanceIncreasedEvent::new(1, Credits::from(10), Credits::from(30))
        );
    }
}
