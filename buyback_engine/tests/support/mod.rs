//! Shared scaffolding for the integration tests: a throwaway database per test plus seed helpers.
#![allow(dead_code)]

use buyback_engine::{
    db_types::{NewProduct, NewUser, Product, User, UserRole},
    order_objects::ReviewRequest,
    MarketplaceDatabase,
    ProductManagement,
    SqliteDatabase,
    UserManagement,
};
use bbe_common::Credits;
use log::*;
use sqlx::{migrate, migrate::MigrateDatabase, Sqlite};

/// Creates a fresh database with a random name, runs the migrations and returns a handle to it.
pub async fn prepare_test_env() -> SqliteDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    std::fs::create_dir_all("data").expect("Error creating the data directory");
    let url = random_db_path();
    create_database(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
    migrate!("./src/sqlite/migrations").run(db.pool()).await.expect("Error running DB migrations");
    info!("🚀️ Test database ready at {url}");
    db
}

pub fn random_db_path() -> String {
    format!("sqlite://data/test_store_{}.db", rand::random::<u64>())
}

pub async fn create_database(url: &str) {
    if let Err(e) = Sqlite::drop_database(url).await {
        warn!("Error dropping database {url}: {e:?}");
    }
    Sqlite::create_database(url).await.expect("Error creating database");
}

pub async fn seed_user(db: &SqliteDatabase, nickname: &str, role: UserRole, balance: i64) -> User {
    let user = NewUser::with_nickname(nickname).with_role(role).with_balance(Credits::from(balance));
    db.insert_user(user).await.expect("Error inserting user")
}

pub async fn seed_buyer(db: &SqliteDatabase, nickname: &str) -> User {
    seed_user(db, nickname, UserRole::User, 0).await
}

pub async fn seed_seller(db: &SqliteDatabase, nickname: &str, balance: i64) -> User {
    seed_user(db, nickname, UserRole::Client, balance).await
}

pub async fn seed_moderator(db: &SqliteDatabase) -> User {
    seed_user(db, "mod", UserRole::Moderator, 0).await
}

pub async fn seed_product(db: &SqliteDatabase, seller_id: i64, name: &str, general: i64) -> Product {
    let article = format!("art-{name}");
    let product = NewProduct::new(seller_id, name, article.as_str(), general).with_prices(80.0, 100.0);
    db.insert_product(product).await.expect("Error inserting product")
}

/// Seeds a product and has a moderator approve it, returning the post-review row.
pub async fn seed_approved_product(
    db: &SqliteDatabase,
    moderator_id: i64,
    seller_id: i64,
    name: &str,
    general: i64,
) -> Product {
    let product = seed_product(db, seller_id, name, general).await;
    let outcome =
        db.review_product(product.id, moderator_id, &ReviewRequest::approve()).await.expect("Error reviewing product");
    outcome.after
}

/// Rewinds an order's `updated_at` so the sweep sees it as stalled.
pub async fn backdate_order(db: &SqliteDatabase, order_id: i64, days: i64) {
    sqlx::query("UPDATE orders SET updated_at = datetime('now', printf('-%d days', $1)) WHERE id = $2")
        .bind(days)
        .bind(order_id)
        .execute(db.pool())
        .await
        .expect("Error backdating order");
}
