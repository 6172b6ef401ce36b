//! `SqliteDatabase` is a concrete implementation of a buy-back engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module. Every workflow method runs inside a single transaction so that the check-then-act sequences
//! (stock decrement, restock, reservation decision, reactivation walk) serialize against concurrent callers.
use std::fmt::Debug;

use bbe_common::Credits;
use chrono::{DateTime, Utc};
use log::*;
use sqlx::SqlitePool;

use super::db::{db_url, history, new_pool, orders, products, users};
use crate::{
    bbe_api::order_objects::{OrderPatch, ProductPatch, ReviewRequest, UserPatch},
    db_types::{
        BalanceEntry,
        HistoryEntry,
        ModeratorReview,
        NewBalanceEntry,
        NewHistoryEntry,
        NewOrder,
        NewProduct,
        NewUser,
        Order,
        OrderStatus,
        Product,
        ProductStatus,
        TransactionCode,
        User,
        UserRole,
    },
    ledger::{necessary_balance, reserved_plan, SellerLedger},
    traits::{
        AuditError,
        AuditManagement,
        BalanceTopUp,
        MarketplaceDatabase,
        MarketplaceError,
        OrderChanged,
        OrderCreated,
        OrderManagement,
        PlanChange,
        ProductChanged,
        ProductManagement,
        ProductRemoval,
        RestockedProduct,
        ReviewOutcome,
        UserManagement,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Connects to the database at `BBE_DATABASE_URL` (or the default path).
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        Self::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl MarketplaceDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_order(&self, order: NewOrder, code: TransactionCode) -> Result<OrderCreated, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let product_id = order.product_id;
        let product =
            products::fetch_product(product_id, &mut tx).await?.ok_or(MarketplaceError::ProductNotFound(product_id))?;
        if product.remaining_products <= 0 {
            return Err(MarketplaceError::OutOfStock(product_id));
        }
        let product =
            products::take_stock(product_id, &mut tx).await?.ok_or(MarketplaceError::OutOfStock(product_id))?;
        let stock_depleted = product.remaining_products == 0;
        let mut product_status_changed = false;
        let product = if stock_depleted && product.status != ProductStatus::Archived {
            product_status_changed = true;
            products::set_status(product_id, ProductStatus::Archived, &mut tx).await?
        } else {
            product
        };
        let order = orders::insert_order(order, code, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {} saved against product #{product_id}", order.transaction_code);
        Ok(OrderCreated { order, product, stock_depleted, product_status_changed })
    }

    async fn update_order(&self, order_id: i64, patch: OrderPatch) -> Result<OrderChanged, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let old_order =
            orders::fetch_order(order_id, &mut tx).await?.ok_or(MarketplaceError::OrderNotFound(order_id))?;
        if patch.is_empty() {
            return Ok(OrderChanged {
                old_order: old_order.clone(),
                new_order: old_order,
                restock: None,
                seller_promoted: false,
                buyer_normalized: false,
            });
        }
        if old_order.status.is_terminal() {
            // A terminal order is never touched again, not even its step or artifacts.
            // Replaying the identical status on its own is a harmless no-op.
            match patch.status {
                Some(status) if status == old_order.status && patch.is_status_only() => {
                    return Ok(OrderChanged {
                        old_order: old_order.clone(),
                        new_order: old_order,
                        restock: None,
                        seller_promoted: false,
                        buyer_normalized: false,
                    });
                },
                _ => return Err(MarketplaceError::OrderModificationForbidden),
            }
        }
        let new_order = orders::update_order(order_id, &patch, &mut tx).await?;

        let mut restock = None;
        if new_order.status != old_order.status && new_order.status == OrderStatus::Cancelled {
            if let Some(product_id) = new_order.product_id {
                let product = products::return_stock(product_id, &mut tx).await?;
                let reactivated = product.status == ProductStatus::Archived && product.remaining_products > 0;
                let product = if reactivated {
                    products::set_status(product_id, ProductStatus::Active, &mut tx).await?
                } else {
                    product
                };
                trace!("🗃️ Order #{order_id} cancelled; one unit returned to product #{product_id}");
                restock = Some(RestockedProduct { product, reactivated });
            }
        }

        let mut seller_promoted = false;
        if new_order.step != old_order.step && new_order.step == 5 {
            if let Some(seller) = users::fetch_user(new_order.seller_id, &mut tx).await? {
                if matches!(seller.role, UserRole::User | UserRole::Client) {
                    users::set_role(seller.id, UserRole::Seller, true, &mut tx).await?;
                    seller_promoted = true;
                    trace!("🗃️ Seller #{} promoted to the Seller role on first delivery", seller.id);
                }
            }
        }

        let mut buyer_normalized = false;
        if new_order.status != old_order.status &&
            matches!(new_order.status, OrderStatus::CashbackPaid | OrderStatus::CashbackRejected)
        {
            if let Some(buyer) = users::fetch_user(new_order.user_id, &mut tx).await? {
                if buyer.role == UserRole::User {
                    users::set_role(buyer.id, UserRole::Client, buyer.is_seller, &mut tx).await?;
                    buyer_normalized = true;
                }
            }
        }
        tx.commit().await?;
        Ok(OrderChanged { old_order, new_order, restock, seller_promoted, buyer_normalized })
    }

    async fn review_product(
        &self,
        product_id: i64,
        moderator_id: i64,
        request: &ReviewRequest,
    ) -> Result<ReviewOutcome, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let before =
            products::fetch_product(product_id, &mut tx).await?.ok_or(MarketplaceError::ProductNotFound(product_id))?;
        let requested = request.status;
        let final_status = if requested == ProductStatus::Active {
            let seller = users::fetch_user(before.seller_id, &mut tx)
                .await?
                .ok_or(MarketplaceError::UserNotFound(before.seller_id))?;
            let siblings = products::fetch_products_for_seller(before.seller_id, &mut tx).await?;
            let mut to_reserve = reserved_plan(&siblings);
            if before.status != ProductStatus::Active {
                to_reserve += Credits::from(before.general_repurchases);
            }
            if to_reserve > seller.balance {
                debug!(
                    "🗃️ Campaign #{product_id} approved but not funded: reserving {to_reserve} exceeds balance {}",
                    seller.balance
                );
                ProductStatus::NotPaid
            } else {
                ProductStatus::Active
            }
        } else {
            requested
        };
        let after = products::set_status(product_id, final_status, &mut tx).await?;
        history::insert_review(product_id, moderator_id, before.status, final_status, request.comment.clone(), &mut tx)
            .await?;
        let activated = before.status != ProductStatus::Active && final_status == ProductStatus::Active;
        if activated {
            let debit = -Credits::from(after.remaining_products);
            history::insert_balance_entry(NewBalanceEntry::new(after.seller_id, debit), &mut tx).await?;
        }
        tx.commit().await?;
        Ok(ReviewOutcome { before, after, requested, activated })
    }

    async fn resize_product_plan(&self, product_id: i64, new_general: i64) -> Result<PlanChange, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let before =
            products::fetch_product(product_id, &mut tx).await?.ok_or(MarketplaceError::ProductNotFound(product_id))?;
        let delta = new_general - before.general_repurchases;
        let new_remaining = before.remaining_products + delta;
        if new_remaining < 0 {
            return Err(MarketplaceError::InvalidPlanChange(format!(
                "shrinking the plan to {new_general} would take the live stock to {new_remaining}"
            )));
        }
        let status = match delta {
            0 => before.status,
            d if d < 0 => ProductStatus::Active,
            d => {
                let seller = users::fetch_user(before.seller_id, &mut tx)
                    .await?
                    .ok_or(MarketplaceError::UserNotFound(before.seller_id))?;
                let siblings = products::fetch_products_for_seller(before.seller_id, &mut tx).await?;
                let ledger = SellerLedger::normalized(seller.balance, &siblings);
                if ledger.free_balance >= Credits::from(d) {
                    ProductStatus::Active
                } else {
                    ProductStatus::NotPaid
                }
            },
        };
        let after = products::set_plan(product_id, new_general, new_remaining, status, &mut tx).await?;
        tx.commit().await?;
        Ok(PlanChange { before, after, delta })
    }

    async fn revise_product(&self, product_id: i64, patch: ProductPatch) -> Result<ProductChanged, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let before =
            products::fetch_product(product_id, &mut tx).await?.ok_or(MarketplaceError::ProductNotFound(product_id))?;
        let stock_delta = patch.general_repurchases.map(|g| g - before.general_repurchases).unwrap_or_default();
        if before.remaining_products + stock_delta < 0 {
            return Err(MarketplaceError::InvalidPlanChange(format!(
                "the edit would take the live stock to {}",
                before.remaining_products + stock_delta
            )));
        }
        // Any substantive edit goes back to the moderation queue.
        let after = products::apply_patch(product_id, &patch, ProductStatus::Created, stock_delta, &mut tx).await?;
        tx.commit().await?;
        Ok(ProductChanged { before, after })
    }

    async fn increase_balance(&self, user_id: i64, amount: Credits) -> Result<BalanceTopUp, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        users::fetch_user(user_id, &mut tx).await?.ok_or(MarketplaceError::UserNotFound(user_id))?;
        let user = users::adjust_balance(user_id, amount, &mut tx).await?;
        history::insert_balance_entry(NewBalanceEntry::new(user_id, amount), &mut tx).await?;
        let siblings = products::fetch_products_for_seller(user_id, &mut tx).await?;
        let necessary = necessary_balance(&siblings);
        let mut activated = Vec::new();
        if user.balance >= necessary {
            // The new balance funds everything; wake every unpaid campaign.
            for product in siblings.iter().filter(|p| p.status == ProductStatus::NotPaid) {
                let product = products::set_status(product.id, ProductStatus::Active, &mut tx).await?;
                let debit = -Credits::from(product.remaining_products);
                history::insert_balance_entry(NewBalanceEntry::new(user_id, debit), &mut tx).await?;
                activated.push(product);
            }
        } else {
            // Partial funding: activate the longest prefix, in campaign creation order, that fits.
            let mut reserved: Credits = siblings
                .iter()
                .filter(|p| p.status == ProductStatus::Active)
                .map(|p| Credits::from(p.remaining_products))
                .sum();
            for product in siblings.iter().filter(|p| p.status == ProductStatus::NotPaid) {
                let needed = Credits::from(product.remaining_products);
                if reserved + needed > user.balance {
                    break;
                }
                reserved += needed;
                let product = products::set_status(product.id, ProductStatus::Active, &mut tx).await?;
                history::insert_balance_entry(NewBalanceEntry::new(user_id, -needed), &mut tx).await?;
                activated.push(product);
            }
        }
        tx.commit().await?;
        debug!(
            "🗃️ Balance of seller #{user_id} raised by {amount} to {}. {} campaign(s) woke up",
            user.balance,
            activated.len()
        );
        Ok(BalanceTopUp { user_id, amount, new_balance: user.balance, necessary_balance: necessary, activated })
    }

    async fn delete_product(&self, product_id: i64) -> Result<ProductRemoval, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let product =
            products::fetch_product(product_id, &mut tx).await?.ok_or(MarketplaceError::ProductNotFound(product_id))?;
        let refunded = if product.status == ProductStatus::Archived && product.remaining_products > 0 {
            let refund = Credits::from(product.remaining_products);
            users::adjust_balance(product.seller_id, refund, &mut tx).await?;
            history::insert_balance_entry(NewBalanceEntry::new(product.seller_id, refund), &mut tx).await?;
            Some(refund)
        } else {
            None
        };
        // Orders referencing the campaign survive with a null product_id via the FK action.
        products::delete_product(product_id, &mut tx).await?;
        tx.commit().await?;
        Ok(ProductRemoval { product, refunded })
    }

    async fn close(&mut self) -> Result<(), MarketplaceError> {
        self.pool.close().await;
        Ok(())
    }
}

impl OrderManagement for SqliteDatabase {
    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_by_code(&self, code: &TransactionCode) -> Result<Option<Order>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_code(code, &mut conn).await?;
        Ok(order)
    }

    async fn transaction_code_exists(&self, code: &TransactionCode) -> Result<bool, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let exists = orders::transaction_code_exists(code, &mut conn).await?;
        Ok(exists)
    }

    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_orders_for_user(user_id, &mut conn).await?;
        Ok(orders)
    }

    async fn fetch_orders_for_seller(&self, seller_id: i64) -> Result<Vec<Order>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_pending_orders_for_seller(seller_id, &mut conn).await?;
        Ok(orders)
    }

    async fn fetch_all_orders_for_seller(&self, seller_id: i64) -> Result<Vec<Order>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_all_orders_for_seller(seller_id, &mut conn).await?;
        Ok(orders)
    }

    async fn fetch_inactive_orders(&self, cutoff: DateTime<Utc>) -> Result<Vec<Order>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_inactive_orders(cutoff, &mut conn).await?;
        Ok(orders)
    }

    async fn fetch_inactive_after_reminder(&self, cutoff: DateTime<Utc>) -> Result<Vec<Order>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_inactive_after_reminder(cutoff, &mut conn).await?;
        Ok(orders)
    }

    async fn mark_order_reminded(&self, order_id: i64) -> Result<bool, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let marked = orders::mark_order_reminded(order_id, &mut tx).await?;
        tx.commit().await?;
        Ok(marked)
    }

    async fn delete_order(&self, order_id: i64) -> Result<bool, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let deleted = orders::delete_order(order_id, &mut tx).await?;
        tx.commit().await?;
        Ok(deleted)
    }
}

impl ProductManagement for SqliteDatabase {
    async fn insert_product(&self, product: NewProduct) -> Result<Product, MarketplaceError> {
        // Single-statement writes still go through an explicit transaction: the SQLite driver
        // resolves `RETURNING` rows before the autocommit lands, and the caller must not observe
        // a row that other connections cannot see yet.
        let mut tx = self.pool.begin().await?;
        let product = products::insert_product(product, &mut tx).await?;
        tx.commit().await?;
        Ok(product)
    }

    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::fetch_product(product_id, &mut conn).await?;
        Ok(product)
    }

    async fn fetch_products_for_seller(&self, seller_id: i64) -> Result<Vec<Product>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let products = products::fetch_products_for_seller(seller_id, &mut conn).await?;
        Ok(products)
    }

    async fn fetch_products_to_review(&self) -> Result<Vec<Product>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let products = products::fetch_products_to_review(&mut conn).await?;
        Ok(products)
    }
}

impl UserManagement for SqliteDatabase {
    async fn insert_user(&self, user: NewUser) -> Result<User, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let user = users::insert_user(user, &mut tx).await?;
        tx.commit().await?;
        Ok(user)
    }

    async fn fetch_user(&self, user_id: i64) -> Result<Option<User>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let user = users::fetch_user(user_id, &mut conn).await?;
        Ok(user)
    }

    async fn update_user(&self, user_id: i64, patch: UserPatch) -> Result<User, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        if patch.is_empty() {
            let user = users::fetch_user(user_id, &mut tx).await?.ok_or(MarketplaceError::UserNotFound(user_id))?;
            return Ok(user);
        }
        let user = users::update_user(user_id, &patch, &mut tx).await.map_err(|e| match e {
            sqlx::Error::RowNotFound => MarketplaceError::UserNotFound(user_id),
            e => e.into(),
        })?;
        tx.commit().await?;
        Ok(user)
    }
}

impl AuditManagement for SqliteDatabase {
    async fn append_history(&self, entry: NewHistoryEntry) -> Result<(), AuditError> {
        let mut tx = self.pool.begin().await?;
        let entry = history::insert_history(entry, &mut tx).await?;
        tx.commit().await?;
        trace!("📝️ Audit event {} recorded with id {}", entry.action, entry.id);
        Ok(())
    }

    async fn append_balance_entry(&self, entry: NewBalanceEntry) -> Result<(), AuditError> {
        let mut tx = self.pool.begin().await?;
        history::insert_balance_entry(entry, &mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn fetch_history_for_user(&self, user_id: i64) -> Result<Vec<HistoryEntry>, AuditError> {
        let mut conn = self.pool.acquire().await?;
        let entries = history::history_for_user(user_id, &mut conn).await?;
        Ok(entries)
    }

    async fn fetch_history_for_order(&self, order_id: i64) -> Result<Vec<HistoryEntry>, AuditError> {
        let mut conn = self.pool.acquire().await?;
        let entries = history::history_for_order(order_id, &mut conn).await?;
        Ok(entries)
    }

    async fn fetch_balance_entries(&self, user_id: i64) -> Result<Vec<BalanceEntry>, AuditError> {
        let mut conn = self.pool.acquire().await?;
        let entries = history::balance_entries_for_user(user_id, &mut conn).await?;
        Ok(entries)
    }

    async fn fetch_reviews_for_product(&self, product_id: i64) -> Result<Vec<ModeratorReview>, AuditError> {
        let mut conn = self.pool.acquire().await?;
        let reviews = history::reviews_for_product(product_id, &mut conn).await?;
        Ok(reviews)
    }
}
