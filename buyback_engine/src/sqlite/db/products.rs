use log::trace;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    bbe_api::order_objects::ProductPatch,
    db_types::{NewProduct, Product, ProductStatus},
};

/// Inserts a new campaign. It starts in `Created` with its full plan as live stock.
pub async fn insert_product(product: NewProduct, conn: &mut SqliteConnection) -> Result<Product, sqlx::Error> {
    let product = sqlx::query_as::<_, Product>(
        r#"
            INSERT INTO products (
                seller_id,
                name,
                brand,
                article,
                category,
                key_word,
                general_repurchases,
                remaining_products,
                daily_repurchases,
                price,
                wb_price,
                review_requirements,
                image_path,
                status
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *;
        "#,
    )
    .bind(product.seller_id)
    .bind(product.name)
    .bind(product.brand)
    .bind(product.article)
    .bind(product.category)
    .bind(product.key_word)
    .bind(product.general_repurchases)
    .bind(product.daily_repurchases)
    .bind(product.price)
    .bind(product.wb_price)
    .bind(product.review_requirements)
    .bind(product.image_path)
    .bind(ProductStatus::Created)
    .fetch_one(conn)
    .await?;
    Ok(product)
}

pub async fn fetch_product(id: i64, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    let product = sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(product)
}

/// A seller's campaigns, oldest first. Creation order matters: it is the order in which unpaid
/// campaigns are considered for activation after a top-up.
pub async fn fetch_products_for_seller(
    seller_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Product>, sqlx::Error> {
    let products = sqlx::query_as("SELECT * FROM products WHERE seller_id = $1 ORDER BY created_at ASC")
        .bind(seller_id)
        .fetch_all(conn)
        .await?;
    Ok(products)
}

/// The moderation queue, oldest first.
pub async fn fetch_products_to_review(conn: &mut SqliteConnection) -> Result<Vec<Product>, sqlx::Error> {
    let products = sqlx::query_as("SELECT * FROM products WHERE status = $1 ORDER BY created_at ASC")
        .bind(ProductStatus::Created)
        .fetch_all(conn)
        .await?;
    Ok(products)
}

/// Takes one unit of stock, guarded so the counter can never go below zero. `None` means the
/// campaign was already depleted (or does not exist) and nothing was written.
pub async fn take_stock(id: i64, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    let product = sqlx::query_as(
        r#"
            UPDATE products
            SET remaining_products = remaining_products - 1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND remaining_products > 0
            RETURNING *;
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(product)
}

/// Returns one unit of stock to the campaign.
pub async fn return_stock(id: i64, conn: &mut SqliteConnection) -> Result<Product, sqlx::Error> {
    let product = sqlx::query_as(
        r#"
            UPDATE products
            SET remaining_products = remaining_products + 1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $1
            RETURNING *;
        "#,
    )
    .bind(id)
    .fetch_one(conn)
    .await?;
    Ok(product)
}

pub async fn set_status(
    id: i64,
    status: ProductStatus,
    conn: &mut SqliteConnection,
) -> Result<Product, sqlx::Error> {
    let product = sqlx::query_as(
        "UPDATE products SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
    )
    .bind(status)
    .bind(id)
    .fetch_one(conn)
    .await?;
    Ok(product)
}

/// Rewrites the plan and live stock together with the status the funding decision settled on.
pub async fn set_plan(
    id: i64,
    general_repurchases: i64,
    remaining_products: i64,
    status: ProductStatus,
    conn: &mut SqliteConnection,
) -> Result<Product, sqlx::Error> {
    let product = sqlx::query_as(
        r#"
            UPDATE products
            SET general_repurchases = $1, remaining_products = $2, status = $3, updated_at = CURRENT_TIMESTAMP
            WHERE id = $4
            RETURNING *;
        "#,
    )
    .bind(general_repurchases)
    .bind(remaining_products)
    .bind(status)
    .bind(id)
    .fetch_one(conn)
    .await?;
    Ok(product)
}

/// Applies a general edit to the campaign row. The caller decides the status that goes with it.
pub async fn apply_patch(
    id: i64,
    patch: &ProductPatch,
    status: ProductStatus,
    stock_delta: i64,
    conn: &mut SqliteConnection,
) -> Result<Product, sqlx::Error> {
    let mut builder = QueryBuilder::new("UPDATE products SET ");
    let mut set_clause = builder.separated(", ");
    if let Some(name) = &patch.name {
        set_clause.push("name = ");
        set_clause.push_bind_unseparated(name.clone());
    }
    if let Some(brand) = &patch.brand {
        set_clause.push("brand = ");
        set_clause.push_bind_unseparated(brand.clone());
    }
    if let Some(article) = &patch.article {
        set_clause.push("article = ");
        set_clause.push_bind_unseparated(article.clone());
    }
    if let Some(category) = &patch.category {
        set_clause.push("category = ");
        set_clause.push_bind_unseparated(category.clone());
    }
    if let Some(key_word) = &patch.key_word {
        set_clause.push("key_word = ");
        set_clause.push_bind_unseparated(key_word.clone());
    }
    if let Some(general_repurchases) = patch.general_repurchases {
        set_clause.push("general_repurchases = ");
        set_clause.push_bind_unseparated(general_repurchases);
    }
    if stock_delta != 0 {
        set_clause.push("remaining_products = remaining_products + ");
        set_clause.push_bind_unseparated(stock_delta);
    }
    if let Some(daily_repurchases) = patch.daily_repurchases {
        set_clause.push("daily_repurchases = ");
        set_clause.push_bind_unseparated(daily_repurchases);
    }
    if let Some(price) = patch.price {
        set_clause.push("price = ");
        set_clause.push_bind_unseparated(price);
    }
    if let Some(wb_price) = patch.wb_price {
        set_clause.push("wb_price = ");
        set_clause.push_bind_unseparated(wb_price);
    }
    if let Some(review_requirements) = &patch.review_requirements {
        set_clause.push("review_requirements = ");
        set_clause.push_bind_unseparated(review_requirements.clone());
    }
    if let Some(image_path) = &patch.image_path {
        set_clause.push("image_path = ");
        set_clause.push_bind_unseparated(image_path.clone());
    }
    set_clause.push("status = ");
    set_clause.push_bind_unseparated(status);
    set_clause.push("updated_at = CURRENT_TIMESTAMP");
    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" RETURNING *");
    trace!("📝️ Executing query: {}", builder.sql());
    let product = builder.build_query_as::<Product>().fetch_one(conn).await?;
    Ok(product)
}

pub async fn delete_product(id: i64, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM products WHERE id = $1").bind(id).execute(conn).await?;
    Ok(())
}
