//! Append-only stores: audit history, the balance ledger and moderation reviews.
use sqlx::SqliteConnection;

use crate::db_types::{
    BalanceEntry,
    HistoryEntry,
    ModeratorReview,
    NewBalanceEntry,
    NewHistoryEntry,
    ProductStatus,
};

pub async fn insert_history(entry: NewHistoryEntry, conn: &mut SqliteConnection) -> Result<HistoryEntry, sqlx::Error> {
    let entry = sqlx::query_as::<_, HistoryEntry>(
        r#"
            INSERT INTO history (user_id, creator_id, product_id, order_id, action, json_before, json_after)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(entry.user_id)
    .bind(entry.creator_id)
    .bind(entry.product_id)
    .bind(entry.order_id)
    .bind(entry.action)
    .bind(entry.json_before)
    .bind(entry.json_after)
    .fetch_one(conn)
    .await?;
    Ok(entry)
}

pub async fn insert_balance_entry(
    entry: NewBalanceEntry,
    conn: &mut SqliteConnection,
) -> Result<BalanceEntry, sqlx::Error> {
    let entry = sqlx::query_as::<_, BalanceEntry>(
        "INSERT INTO balance_entries (user_id, delta) VALUES ($1, $2) RETURNING *",
    )
    .bind(entry.user_id)
    .bind(entry.delta)
    .fetch_one(conn)
    .await?;
    Ok(entry)
}

pub async fn insert_review(
    product_id: i64,
    moderator_id: i64,
    status_before: ProductStatus,
    status_after: ProductStatus,
    comment: Option<String>,
    conn: &mut SqliteConnection,
) -> Result<ModeratorReview, sqlx::Error> {
    let review = sqlx::query_as::<_, ModeratorReview>(
        r#"
            INSERT INTO moderator_reviews (moderator_id, product_id, status_before, status_after, comment)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(moderator_id)
    .bind(product_id)
    .bind(status_before)
    .bind(status_after)
    .bind(comment)
    .fetch_one(conn)
    .await?;
    Ok(review)
}

pub async fn history_for_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<HistoryEntry>, sqlx::Error> {
    let entries =
        sqlx::query_as("SELECT * FROM history WHERE user_id = $1 OR creator_id = $1 ORDER BY created_at ASC, id ASC")
            .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(entries)
}

pub async fn history_for_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<HistoryEntry>, sqlx::Error> {
    let entries = sqlx::query_as("SELECT * FROM history WHERE order_id = $1 ORDER BY created_at ASC, id ASC")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(entries)
}

pub async fn balance_entries_for_user(
    user_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<BalanceEntry>, sqlx::Error> {
    let entries = sqlx::query_as("SELECT * FROM balance_entries WHERE user_id = $1 ORDER BY created_at ASC, id ASC")
        .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(entries)
}

pub async fn reviews_for_product(
    product_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<ModeratorReview>, sqlx::Error> {
    let reviews =
        sqlx::query_as("SELECT * FROM moderator_reviews WHERE product_id = $1 ORDER BY created_at ASC, id ASC")
            .bind(product_id)
            .fetch_all(conn)
            .await?;
    Ok(reviews)
}
