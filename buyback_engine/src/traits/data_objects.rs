use bbe_common::Credits;
use serde::{Deserialize, Serialize};

use crate::db_types::{Order, Product, ProductStatus};

/// The result of inserting an order, including what happened to the campaign's stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreated {
    pub order: Order,
    /// The product after the stock decrement.
    pub product: Product,
    /// True when this order consumed the last unit of stock.
    pub stock_depleted: bool,
    /// True when the depletion actually changed the product's status (to `Archived`).
    pub product_status_changed: bool,
}

/// A campaign that received stock back from a cancelled order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestockedProduct {
    pub product: Product,
    /// True when the restock brought an archived campaign back to `Active`.
    pub reactivated: bool,
}

/// Old and new snapshots of an updated order, plus the side effects the transition triggered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderChanged {
    pub old_order: Order,
    pub new_order: Order,
    pub restock: Option<RestockedProduct>,
    /// The seller was promoted to the `Seller` role by this update (first delivery-step order).
    pub seller_promoted: bool,
    /// The buyer's role was normalized to `Client` by a terminal cashback transition.
    pub buyer_normalized: bool,
}

impl OrderChanged {
    pub fn step_advanced(&self) -> bool {
        self.new_order.step != self.old_order.step
    }

    pub fn status_transitioned(&self) -> bool {
        self.new_order.status != self.old_order.status
    }
}

/// The outcome of a moderation decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewOutcome {
    pub before: Product,
    pub after: Product,
    /// The status the moderator asked for, before the reservation decision.
    pub requested: ProductStatus,
    /// True when the product transitioned into `Active` from a non-`Active` state.
    pub activated: bool,
}

impl ReviewOutcome {
    pub fn status_changed(&self) -> bool {
        self.before.status != self.after.status
    }

    /// The moderator's intent was to activate, whether or not funding succeeded.
    pub fn intent_was_activation(&self) -> bool {
        self.requested == ProductStatus::Active
    }
}

/// The outcome of a plan resize.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanChange {
    pub before: Product,
    pub after: Product,
    pub delta: i64,
}

impl PlanChange {
    pub fn funded(&self) -> bool {
        self.after.status == ProductStatus::Active
    }
}

/// The outcome of a general product edit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductChanged {
    pub before: Product,
    pub after: Product,
}

impl ProductChanged {
    pub fn status_changed(&self) -> bool {
        self.before.status != self.after.status
    }
}

/// The outcome of a balance top-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceTopUp {
    pub user_id: i64,
    pub amount: Credits,
    pub new_balance: Credits,
    /// The balance that would fund every approved campaign simultaneously.
    pub necessary_balance: Credits,
    /// Campaigns flipped from `NotPaid` to `Active` by this top-up.
    pub activated: Vec<Product>,
}

/// The outcome of deleting a campaign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRemoval {
    pub product: Product,
    /// Unspent stock refunded to the seller's balance, when the campaign was archived with stock left.
    pub refunded: Option<Credits>,
}
