use crate::{
    db_types::{NewProduct, Product},
    traits::MarketplaceError,
};

/// Read and plain-write queries over the product store.
#[allow(async_fn_in_trait)]
pub trait ProductManagement {
    /// Stores a new campaign. It starts life in `Created` status with its full plan as stock.
    async fn insert_product(&self, product: NewProduct) -> Result<Product, MarketplaceError>;

    /// Fetches a campaign by id. `None` if it does not exist.
    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, MarketplaceError>;

    /// All of a seller's campaigns, oldest first. Only a seller's own campaigns take part in
    /// reservation math, so this is the working set for every balance decision.
    async fn fetch_products_for_seller(&self, seller_id: i64) -> Result<Vec<Product>, MarketplaceError>;

    /// Campaigns awaiting moderation (`Created`), oldest first.
    async fn fetch_products_to_review(&self) -> Result<Vec<Product>, MarketplaceError>;
}
