use std::time::Duration;

use buyback_engine::{
    db_types::{NewOrder, ProductStatus},
    events::EventProducers,
    MarketplaceError,
    OrderFlowApi,
    ProductManagement,
};
use log::*;

mod support;
use support::*;

const NUM_ORDERS: u64 = 10;
const STOCK: i64 = 6;
const RATE: u64 = 100; // orders per second

#[tokio::test]
async fn burst_orders_respect_the_stock_floor() {
    let db = prepare_test_env().await;
    info!("🚀 Starting order injection test");
    let moderator = seed_moderator(&db).await;
    let seller = seed_seller(&db, "alice", 100).await;
    let buyer = seed_buyer(&db, "bob").await;
    let product = seed_approved_product(&db, moderator.id, seller.id, "hot-item", STOCK).await;

    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    let delay = Duration::from_millis(1000 / RATE);
    let mut timer = tokio::time::interval(delay);
    let mut accepted = 0u64;
    let mut rejected = 0u64;
    for _ in 0..NUM_ORDERS {
        timer.tick().await;
        match api.create_order(NewOrder::new(buyer.id, seller.id, product.id)).await {
            Ok(order) => {
                debug!("🚀 Order {} accepted", order.transaction_code);
                accepted += 1;
            },
            Err(MarketplaceError::OutOfStock(_)) => rejected += 1,
            Err(e) => panic!("🚀 Unexpected error during injection: {e}"),
        }
    }

    assert_eq!(accepted, STOCK as u64);
    assert_eq!(rejected, NUM_ORDERS - STOCK as u64);
    let product = db.fetch_product(product.id).await.unwrap().unwrap();
    assert_eq!(product.remaining_products, 0);
    assert_eq!(product.status, ProductStatus::Archived);

    // Every accepted order carries a distinct transaction code.
    let orders = api.orders_for_user(buyer.id).await.unwrap();
    let mut codes: Vec<_> = orders.iter().map(|o| o.transaction_code.as_str().to_string()).collect();
    codes.sort();
    codes.dedup();
    assert_eq!(codes.len(), STOCK as usize);
    info!("🚀 test complete");
}
