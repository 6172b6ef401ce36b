use bbe_common::Credits;
use log::trace;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    bbe_api::order_objects::UserPatch,
    db_types::{NewUser, User, UserRole},
};

pub async fn insert_user(user: NewUser, conn: &mut SqliteConnection) -> Result<User, sqlx::Error> {
    let user = sqlx::query_as::<_, User>(
        r#"
            INSERT INTO users (telegram_id, nickname, role, balance, invited_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(user.telegram_id)
    .bind(user.nickname)
    .bind(user.role.unwrap_or(UserRole::User))
    .bind(user.balance)
    .bind(user.invited_by)
    .fetch_one(conn)
    .await?;
    Ok(user)
}

pub async fn fetch_user(id: i64, conn: &mut SqliteConnection) -> Result<Option<User>, sqlx::Error> {
    let user = sqlx::query_as("SELECT * FROM users WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(user)
}

pub async fn update_user(id: i64, patch: &UserPatch, conn: &mut SqliteConnection) -> Result<User, sqlx::Error> {
    let mut builder = QueryBuilder::new("UPDATE users SET ");
    let mut set_clause = builder.separated(", ");
    if let Some(nickname) = &patch.nickname {
        set_clause.push("nickname = ");
        set_clause.push_bind_unseparated(nickname.clone());
    }
    if let Some(role) = patch.role {
        set_clause.push("role = ");
        set_clause.push_bind_unseparated(role);
    }
    if let Some(is_seller) = patch.is_seller {
        set_clause.push("is_seller = ");
        set_clause.push_bind_unseparated(is_seller);
    }
    if let Some(is_banned) = patch.is_banned {
        set_clause.push("is_banned = ");
        set_clause.push_bind_unseparated(is_banned);
    }
    if let Some(has_discount) = patch.has_discount {
        set_clause.push("has_discount = ");
        set_clause.push_bind_unseparated(has_discount);
    }
    set_clause.push("updated_at = CURRENT_TIMESTAMP");
    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" RETURNING *");
    trace!("📝️ Executing query: {}", builder.sql());
    let user = builder.build_query_as::<User>().fetch_one(conn).await?;
    Ok(user)
}

/// Grants a role, keeping the `is_seller` shortcut flag in sync when appropriate.
pub async fn set_role(
    id: i64,
    role: UserRole,
    is_seller: bool,
    conn: &mut SqliteConnection,
) -> Result<User, sqlx::Error> {
    let user = sqlx::query_as(
        "UPDATE users SET role = $1, is_seller = $2, updated_at = CURRENT_TIMESTAMP WHERE id = $3 RETURNING *",
    )
    .bind(role)
    .bind(is_seller)
    .bind(id)
    .fetch_one(conn)
    .await?;
    Ok(user)
}

/// Credits (or debits, with a negative delta) the user's balance and returns the updated row.
pub async fn adjust_balance(id: i64, delta: Credits, conn: &mut SqliteConnection) -> Result<User, sqlx::Error> {
    let user = sqlx::query_as(
        "UPDATE users SET balance = balance + $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
    )
    .bind(delta)
    .bind(id)
    .fetch_one(conn)
    .await?;
    Ok(user)
}
