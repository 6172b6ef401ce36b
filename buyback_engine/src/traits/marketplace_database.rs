use bbe_common::Credits;
use thiserror::Error;

use crate::{
    bbe_api::order_objects::{OrderPatch, ProductPatch, ReviewRequest},
    db_types::{NewOrder, TransactionCode},
    traits::{
        data_objects::{BalanceTopUp, OrderChanged, OrderCreated, PlanChange, ProductChanged, ProductRemoval, ReviewOutcome},
        AuditManagement,
        OrderManagement,
        ProductManagement,
        UserManagement,
    },
};

/// The top-level contract for backends supporting the buy-back engine.
///
/// Every method here executes as one atomic transaction scoped to the rows it touches. Each of the
/// read-then-write sequences of the workflow (stock decrement, restock, reservation decision,
/// reactivation walk) is a check-then-act race under concurrent callers, and the backend is the
/// place where it gets serialized.
///
/// History events and notifications are *not* emitted here; the API layer does that after commit.
/// Exceptions are the rows that belong to the transition itself (the moderator review row, balance
/// ledger rows) which must commit or roll back with it.
#[allow(async_fn_in_trait)]
pub trait MarketplaceDatabase:
    Clone + OrderManagement + ProductManagement + UserManagement + AuditManagement
{
    /// The URL of the database.
    fn url(&self) -> &str;

    /// Creates an order against a product, decrementing its stock.
    ///
    /// * Fails with [`MarketplaceError::OutOfStock`] (writing nothing) when the product has no stock left.
    /// * Fails with [`MarketplaceError::CodeConflict`] when `code` is already taken; the caller
    ///   retries with a fresh code.
    /// * When the decrement empties the stock, the product is archived in the same transaction.
    async fn insert_order(&self, order: NewOrder, code: TransactionCode) -> Result<OrderCreated, MarketplaceError>;

    /// Applies a partial update to an order, with the workflow side effects of §state transitions:
    ///
    /// * a transition into `Cancelled` restocks the product and reactivates it if it was archived;
    /// * a transition to step 5 promotes a `User`/`Client` seller to `Seller`;
    /// * a transition into `CashbackPaid`/`CashbackRejected` normalizes a `User` buyer to `Client`.
    ///
    /// Changing the status of an order already in a terminal state is forbidden, except for
    /// replaying the identical status, which is a no-op (idempotence under repeated updates).
    ///
    /// Returns the old and new order snapshots together with what actually happened, so the caller
    /// can emit audit events keyed on the old-to-new transition.
    async fn update_order(&self, order_id: i64, patch: OrderPatch) -> Result<OrderChanged, MarketplaceError>;

    /// Applies a moderation decision to a product.
    ///
    /// A requested status of `Active` is subject to the reservation decision: if the seller's
    /// balance cannot cover the plans of all their funded campaigns plus this one, the final status
    /// is `NotPaid` instead. Any other requested status is applied verbatim. The moderator review
    /// row is recorded, and a transition into `Active` debits the seller's balance ledger by the
    /// product's remaining stock.
    async fn review_product(
        &self,
        product_id: i64,
        moderator_id: i64,
        request: &ReviewRequest,
    ) -> Result<ReviewOutcome, MarketplaceError>;

    /// A seller-initiated resize of a campaign's plan (`general_repurchases`), with no other field
    /// changed. Stock shifts by the same delta. Growing the plan re-runs the funding decision
    /// against the seller's free balance; shrinking it always lands on `Active`.
    async fn resize_product_plan(&self, product_id: i64, new_general: i64) -> Result<PlanChange, MarketplaceError>;

    /// A seller-initiated edit touching fields beyond the plan size. The product is forced back to
    /// `Created` for re-review. A plan change included in the patch still shifts stock by its delta.
    async fn revise_product(&self, product_id: i64, patch: ProductPatch) -> Result<ProductChanged, MarketplaceError>;

    /// Tops up a seller's balance, records the ledger entry, and reactivates as many `NotPaid`
    /// campaigns as the new balance can fund: all of them when the balance covers the full
    /// necessary amount, otherwise the largest prefix (in campaign creation order) that fits.
    async fn increase_balance(&self, user_id: i64, amount: Credits) -> Result<BalanceTopUp, MarketplaceError>;

    /// Deletes a campaign. An archived campaign still holding unspent stock refunds that stock to
    /// the seller's balance (with a ledger entry) before the row is removed. Orders referencing the
    /// product keep their rows; their `product_id` becomes null.
    async fn delete_product(&self, product_id: i64) -> Result<ProductRemoval, MarketplaceError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), MarketplaceError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum MarketplaceError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("Product {0} has no stock left")]
    OutOfStock(i64),
    #[error("The requested product {0} does not exist")]
    ProductNotFound(i64),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(i64),
    #[error("The requested user {0} does not exist")]
    UserNotFound(i64),
    #[error("Transaction code {0} is already taken")]
    CodeConflict(TransactionCode),
    #[error("The requested order change is forbidden from a terminal status")]
    OrderModificationForbidden,
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Invalid plan change: {0}")]
    InvalidPlanChange(String),
}

impl From<sqlx::Error> for MarketplaceError {
    fn from(e: sqlx::Error) -> Self {
        MarketplaceError::DatabaseError(e.to_string())
    }
}
