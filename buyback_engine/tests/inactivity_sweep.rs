use std::time::Duration;

use buyback_engine::{
    config::SweepConfig,
    db_types::{Action, NewOrder, OrderStatus, ProductStatus},
    events::EventProducers,
    start_sweep_worker,
    AuditManagement,
    OrderFlowApi,
    OrderManagement,
    ProductManagement,
};
use chrono::Utc;
use tokio::sync::watch;

mod support;
use support::*;

#[tokio::test]
async fn stalled_orders_are_reminded_then_cancelled() {
    let db = prepare_test_env().await;
    let moderator = seed_moderator(&db).await;
    let seller = seed_seller(&db, "alice", 10).await;
    let buyer = seed_buyer(&db, "bob").await;
    let product = seed_approved_product(&db, moderator.id, seller.id, "lamps", 1).await;

    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    let order = api.create_order(NewOrder::new(buyer.id, seller.id, product.id)).await.unwrap();
    backdate_order(&db, order.id, 5).await;

    let now = Utc::now();
    let reminder_cutoff = now - chrono::Duration::days(3);
    let cancel_cutoff = now - chrono::Duration::days(4);

    // Pass one: the buyer gets a nudge and nothing is cancelled yet.
    let outcome = api.process_inactive_orders(reminder_cutoff, cancel_cutoff).await.unwrap();
    assert_eq!(outcome.reminded, vec![order.id]);
    assert!(outcome.cancelled.is_empty());
    assert_eq!(outcome.failures, 0);
    let reminded = db.fetch_order(order.id).await.unwrap().unwrap();
    assert!(reminded.reminded_at.is_some());
    let history = db.fetch_history_for_order(order.id).await.unwrap();
    assert_eq!(history.iter().filter(|h| h.action == Action::ReminderSent).count(), 1);

    // Pass two: the order is still stalled, so it gets cancelled and the stock comes back.
    let outcome = api.process_inactive_orders(reminder_cutoff, cancel_cutoff).await.unwrap();
    assert!(outcome.reminded.is_empty(), "a reminded order must never be nudged twice");
    assert_eq!(outcome.cancelled, vec![order.id]);
    let cancelled = db.fetch_order(order.id).await.unwrap().unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    let product = db.fetch_product(product.id).await.unwrap().unwrap();
    assert_eq!(product.remaining_products, 1);
    assert_eq!(product.status, ProductStatus::Active);

    // Pass three: terminal orders are out of the sweep's sight.
    let outcome = api.process_inactive_orders(reminder_cutoff, cancel_cutoff).await.unwrap();
    assert_eq!(outcome.total(), 0);
}

#[tokio::test]
async fn fresh_orders_are_left_alone() {
    let db = prepare_test_env().await;
    let moderator = seed_moderator(&db).await;
    let seller = seed_seller(&db, "alice", 10).await;
    let buyer = seed_buyer(&db, "bob").await;
    let product = seed_approved_product(&db, moderator.id, seller.id, "vases", 2).await;

    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    let fresh = api.create_order(NewOrder::new(buyer.id, seller.id, product.id)).await.unwrap();
    let stale = api.create_order(NewOrder::new(buyer.id, seller.id, product.id)).await.unwrap();
    backdate_order(&db, stale.id, 4).await;

    let now = Utc::now();
    let outcome =
        api.process_inactive_orders(now - chrono::Duration::days(3), now - chrono::Duration::days(4)).await.unwrap();
    assert_eq!(outcome.reminded, vec![stale.id]);
    let fresh = db.fetch_order(fresh.id).await.unwrap().unwrap();
    assert!(fresh.reminded_at.is_none());
}

#[tokio::test]
async fn the_sweep_worker_runs_on_its_interval_and_shuts_down() {
    let db = prepare_test_env().await;
    let moderator = seed_moderator(&db).await;
    let seller = seed_seller(&db, "alice", 10).await;
    let buyer = seed_buyer(&db, "bob").await;
    let product = seed_approved_product(&db, moderator.id, seller.id, "clocks", 1).await;

    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    let order = api.create_order(NewOrder::new(buyer.id, seller.id, product.id)).await.unwrap();
    backdate_order(&db, order.id, 4).await;

    let config = SweepConfig {
        interval: Duration::from_millis(100),
        reminder_after: chrono::Duration::days(3),
        cancel_after: chrono::Duration::days(10),
    };
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = start_sweep_worker(db.clone(), EventProducers::default(), config, shutdown_rx);

    tokio::time::sleep(Duration::from_millis(300)).await;
    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();

    let order = db.fetch_order(order.id).await.unwrap().unwrap();
    assert!(order.reminded_at.is_some(), "the worker should have reminded the stalled order");
    assert_eq!(order.status, OrderStatus::CashbackNotPaid, "the cancel window was not reached");
}
