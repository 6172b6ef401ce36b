use chrono::{DateTime, Utc};

use crate::{
    db_types::{Order, TransactionCode},
    traits::MarketplaceError,
};

/// Read and bookkeeping queries over the order store.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Fetches an order by its internal id. `None` if it does not exist.
    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, MarketplaceError>;

    /// Fetches an order by its transaction code.
    async fn fetch_order_by_code(&self, code: &TransactionCode) -> Result<Option<Order>, MarketplaceError>;

    /// Whether any order already carries the given transaction code.
    async fn transaction_code_exists(&self, code: &TransactionCode) -> Result<bool, MarketplaceError>;

    /// All orders placed by a buyer, newest first.
    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, MarketplaceError>;

    /// Pending (non-terminal) orders against a seller's campaigns, newest first.
    async fn fetch_orders_for_seller(&self, seller_id: i64) -> Result<Vec<Order>, MarketplaceError>;

    /// Every order against a seller's campaigns, including terminal ones, newest first.
    async fn fetch_all_orders_for_seller(&self, seller_id: i64) -> Result<Vec<Order>, MarketplaceError>;

    /// Pending orders with no movement since `cutoff` that have not been reminded yet.
    async fn fetch_inactive_orders(&self, cutoff: DateTime<Utc>) -> Result<Vec<Order>, MarketplaceError>;

    /// Pending orders with no movement since `cutoff` that *have* been reminded.
    async fn fetch_inactive_after_reminder(&self, cutoff: DateTime<Utc>) -> Result<Vec<Order>, MarketplaceError>;

    /// Marks an order as reminded. Returns false when the order was already reminded (or gone),
    /// so the sweep never double-sends.
    async fn mark_order_reminded(&self, order_id: i64) -> Result<bool, MarketplaceError>;

    /// Deletes an order outright. Returns false when no such order exists. The campaign's stock is
    /// not touched; cancellation is the path that restocks.
    async fn delete_order(&self, order_id: i64) -> Result<bool, MarketplaceError>;
}
