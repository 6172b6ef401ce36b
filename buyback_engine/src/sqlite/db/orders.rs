use chrono::{DateTime, Utc};
use log::trace;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    bbe_api::order_objects::OrderPatch,
    db_types::{NewOrder, Order, OrderStatus, TransactionCode},
    traits::MarketplaceError,
};

/// Inserts a new order with the given transaction code. Not atomic on its own; callers wrap it in a
/// transaction together with the stock decrement.
///
/// A collision on the transaction code comes back as [`MarketplaceError::CodeConflict`] so the
/// caller can draw a fresh code and retry.
pub async fn insert_order(
    order: NewOrder,
    code: TransactionCode,
    conn: &mut SqliteConnection,
) -> Result<Order, MarketplaceError> {
    let result = sqlx::query_as::<_, Order>(
        r#"
            INSERT INTO orders (user_id, seller_id, product_id, transaction_code, step, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(order.user_id)
    .bind(order.seller_id)
    .bind(order.product_id)
    .bind(code.as_str())
    .bind(order.step)
    .bind(order.status)
    .fetch_one(conn)
    .await;
    match result {
        Ok(order) => Ok(order),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(MarketplaceError::CodeConflict(code)),
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_order(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_by_code(
    code: &TransactionCode,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE transaction_code = $1")
        .bind(code.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

pub async fn transaction_code_exists(
    code: &TransactionCode,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM orders WHERE transaction_code = $1 LIMIT 1")
        .bind(code.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(exists.is_some())
}

/// A buyer's orders, newest first.
pub async fn fetch_orders_for_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as("SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC")
        .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(orders)
}

/// Pending orders against a seller's campaigns, newest first.
pub async fn fetch_pending_orders_for_seller(
    seller_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let orders =
        sqlx::query_as("SELECT * FROM orders WHERE seller_id = $1 AND status = $2 ORDER BY created_at DESC")
            .bind(seller_id)
            .bind(OrderStatus::CashbackNotPaid)
            .fetch_all(conn)
            .await?;
    Ok(orders)
}

pub async fn fetch_all_orders_for_seller(
    seller_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as("SELECT * FROM orders WHERE seller_id = $1 ORDER BY created_at DESC")
        .bind(seller_id)
        .fetch_all(conn)
        .await?;
    Ok(orders)
}

/// Pending orders untouched since `cutoff` whose buyers have never been reminded.
pub async fn fetch_inactive_orders(
    cutoff: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as(
        "SELECT * FROM orders WHERE status = $1 AND updated_at <= $2 AND reminded_at IS NULL ORDER BY updated_at ASC",
    )
    .bind(OrderStatus::CashbackNotPaid)
    .bind(cutoff)
    .fetch_all(conn)
    .await?;
    Ok(orders)
}

/// Pending orders untouched since `cutoff` whose buyers were already reminded.
pub async fn fetch_inactive_after_reminder(
    cutoff: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as(
        "SELECT * FROM orders WHERE status = $1 AND updated_at <= $2 AND reminded_at IS NOT NULL ORDER BY updated_at \
         ASC",
    )
    .bind(OrderStatus::CashbackNotPaid)
    .bind(cutoff)
    .fetch_all(conn)
    .await?;
    Ok(orders)
}

/// Stamps `reminded_at` exactly once. Returns false if the order was already reminded (or does not
/// exist). Deliberately leaves `updated_at` alone so the cancellation window keeps counting from
/// the buyer's last real activity.
pub async fn mark_order_reminded(id: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE orders SET reminded_at = CURRENT_TIMESTAMP WHERE id = $1 AND reminded_at IS NULL")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() == 1)
}

/// Deletes an order outright. Returns false when no such order exists.
pub async fn delete_order(id: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM orders WHERE id = $1").bind(id).execute(conn).await?;
    Ok(result.rows_affected() == 1)
}

/// Applies the patch to the order row, bumping `updated_at`. The caller has already checked that
/// the patch is non-empty and the transition is legal.
pub async fn update_order(id: i64, patch: &OrderPatch, conn: &mut SqliteConnection) -> Result<Order, sqlx::Error> {
    let mut builder = QueryBuilder::new("UPDATE orders SET ");
    let mut set_clause = builder.separated(", ");
    if let Some(step) = patch.step {
        set_clause.push("step = ");
        set_clause.push_bind_unseparated(step);
    }
    if let Some(status) = patch.status {
        set_clause.push("status = ");
        set_clause.push_bind_unseparated(status);
    }
    if let Some(card_number) = &patch.card_number {
        set_clause.push("card_number = ");
        set_clause.push_bind_unseparated(card_number.clone());
    }
    if let Some(phone_number) = &patch.phone_number {
        set_clause.push("phone_number = ");
        set_clause.push_bind_unseparated(phone_number.clone());
    }
    if let Some(bank) = &patch.bank {
        set_clause.push("bank = ");
        set_clause.push_bind_unseparated(bank.clone());
    }
    if let Some(receipt_number) = &patch.receipt_number {
        set_clause.push("receipt_number = ");
        set_clause.push_bind_unseparated(receipt_number.clone());
    }
    if let Some(order_date) = patch.order_date {
        set_clause.push("order_date = ");
        set_clause.push_bind_unseparated(order_date);
    }
    let screenshots = [
        ("search_screenshot_path", &patch.search_screenshot_path),
        ("cart_screenshot_path", &patch.cart_screenshot_path),
        ("final_cart_screenshot_path", &patch.final_cart_screenshot_path),
        ("delivery_screenshot_path", &patch.delivery_screenshot_path),
        ("barcode_screenshot_path", &patch.barcode_screenshot_path),
        ("review_screenshot_path", &patch.review_screenshot_path),
        ("receipt_screenshot_path", &patch.receipt_screenshot_path),
    ];
    for (column, value) in screenshots {
        if let Some(path) = value {
            set_clause.push(format!("{column} = "));
            set_clause.push_bind_unseparated(path.clone());
        }
    }
    set_clause.push("updated_at = CURRENT_TIMESTAMP");
    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" RETURNING *");
    trace!("📝️ Executing query: {}", builder.sql());
    let order = builder.build_query_as::<Order>().fetch_one(conn).await?;
    Ok(order)
}
