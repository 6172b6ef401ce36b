use buyback_engine::{
    db_types::{Action, NewOrder, OrderStatus, ProductStatus, UserRole},
    events::EventProducers,
    order_objects::OrderPatch,
    AuditManagement,
    MarketplaceError,
    OrderFlowApi,
    ProductManagement,
    UserManagement,
};
use log::*;

mod support;
use support::*;

#[tokio::test]
async fn orders_consume_stock_and_archive_the_last_unit() {
    let db = prepare_test_env().await;
    let moderator = seed_moderator(&db).await;
    let seller = seed_seller(&db, "alice", 10).await;
    let buyer = seed_buyer(&db, "bob").await;
    let product = seed_approved_product(&db, moderator.id, seller.id, "candles", 2).await;
    assert_eq!(product.status, ProductStatus::Active);

    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    let first = api.create_order(NewOrder::new(buyer.id, seller.id, product.id)).await.unwrap();
    assert_eq!(first.status, OrderStatus::CashbackNotPaid);
    assert_eq!(first.step, 0);
    let after_first = db.fetch_product(product.id).await.unwrap().unwrap();
    assert_eq!(after_first.remaining_products, 1);
    assert_eq!(after_first.status, ProductStatus::Active);

    let second = api.create_order(NewOrder::new(buyer.id, seller.id, product.id)).await.unwrap();
    assert_ne!(first.transaction_code, second.transaction_code);
    let after_second = db.fetch_product(product.id).await.unwrap().unwrap();
    assert_eq!(after_second.remaining_products, 0);
    assert_eq!(after_second.status, ProductStatus::Archived);

    let err = api.create_order(NewOrder::new(buyer.id, seller.id, product.id)).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::OutOfStock(id) if id == product.id));
    // The failed attempt wrote nothing.
    let untouched = db.fetch_product(product.id).await.unwrap().unwrap();
    assert_eq!(untouched.remaining_products, 0);

    let history = db.fetch_history_for_order(first.id).await.unwrap();
    assert!(history.iter().any(|h| h.action == Action::AgreeTerms));
    let product_history = db.fetch_history_for_user(seller.id).await.unwrap();
    assert!(product_history.iter().any(|h| h.action == Action::Ended));
}

#[tokio::test]
async fn cancelling_restocks_and_reactivates_the_campaign() {
    let db = prepare_test_env().await;
    let moderator = seed_moderator(&db).await;
    let seller = seed_seller(&db, "alice", 10).await;
    let buyer = seed_buyer(&db, "bob").await;
    let product = seed_approved_product(&db, moderator.id, seller.id, "socks", 1).await;

    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    let order = api.create_order(NewOrder::new(buyer.id, seller.id, product.id)).await.unwrap();
    let archived = db.fetch_product(product.id).await.unwrap().unwrap();
    assert_eq!(archived.status, ProductStatus::Archived);

    let changed = api.update_order(order.id, OrderPatch::default().with_status(OrderStatus::Cancelled)).await.unwrap();
    assert_eq!(changed.new_order.status, OrderStatus::Cancelled);
    let restock = changed.restock.expect("cancelling should restock the campaign");
    assert!(restock.reactivated);
    assert_eq!(restock.product.remaining_products, 1);
    assert_eq!(restock.product.status, ProductStatus::Active);

    // A terminal order refuses any further change, but replaying the same status is a no-op.
    let err = api.update_order(order.id, OrderPatch::default().with_status(OrderStatus::CashbackPaid)).await;
    assert!(matches!(err, Err(MarketplaceError::OrderModificationForbidden)));
    let err = api.update_order(order.id, OrderPatch::default().with_step(3)).await;
    assert!(matches!(err, Err(MarketplaceError::OrderModificationForbidden)));
    let err = api
        .update_order(order.id, OrderPatch::default().with_status(OrderStatus::Cancelled).with_bank("Alpha"))
        .await;
    assert!(matches!(err, Err(MarketplaceError::OrderModificationForbidden)));
    let replay =
        api.update_order(order.id, OrderPatch::default().with_status(OrderStatus::Cancelled)).await.unwrap();
    assert!(replay.restock.is_none(), "a replayed cancellation must not restock again");
    let product = db.fetch_product(product.id).await.unwrap().unwrap();
    assert_eq!(product.remaining_products, 1);
    // The replay touched nothing, not even the timestamp.
    let untouched = api.fetch_order(order.id).await.unwrap().unwrap();
    assert_eq!(untouched.updated_at, replay.old_order.updated_at);
}

#[tokio::test]
async fn reaching_the_delivery_step_promotes_the_seller() {
    let db = prepare_test_env().await;
    let moderator = seed_moderator(&db).await;
    let seller = seed_seller(&db, "alice", 10).await;
    let buyer = seed_buyer(&db, "bob").await;
    let product = seed_approved_product(&db, moderator.id, seller.id, "mugs", 5).await;

    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    let order = api.create_order(NewOrder::new(buyer.id, seller.id, product.id)).await.unwrap();
    for step in 1..=7 {
        let changed = api.update_order(order.id, OrderPatch::default().with_step(step)).await.unwrap();
        assert_eq!(changed.new_order.step, step);
        assert_eq!(changed.seller_promoted, step == 5);
    }
    let seller = db.fetch_user(seller.id).await.unwrap().unwrap();
    assert_eq!(seller.role, UserRole::Seller);
    assert!(seller.is_seller);

    let history = db.fetch_history_for_order(order.id).await.unwrap();
    let steps: Vec<Action> = history.iter().map(|h| h.action).filter(|a| *a != Action::AgreeTerms).collect();
    assert_eq!(steps, vec![
        Action::FirstStepDone,
        Action::SecondStepDone,
        Action::ThirdStepDone,
        Action::FourthStepDone,
        Action::FifthStepDone,
        Action::SixthStepDone,
        Action::SeventhStepDone
    ]);

    // Replaying the same step emits no duplicate audit event.
    api.update_order(order.id, OrderPatch::default().with_step(7)).await.unwrap();
    let history = db.fetch_history_for_order(order.id).await.unwrap();
    assert_eq!(history.iter().filter(|h| h.action == Action::SeventhStepDone).count(), 1);
}

#[tokio::test]
async fn cashback_payout_normalizes_the_buyer_and_audits_the_outcome() {
    let db = prepare_test_env().await;
    let moderator = seed_moderator(&db).await;
    let seller = seed_seller(&db, "alice", 10).await;
    let buyer = seed_buyer(&db, "bob").await;
    let product = seed_approved_product(&db, moderator.id, seller.id, "plates", 3).await;

    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    let order = api.create_order(NewOrder::new(buyer.id, seller.id, product.id)).await.unwrap();
    let changed = api.update_order(order.id, OrderPatch::default().with_status(OrderStatus::CashbackPaid)).await.unwrap();
    assert!(changed.buyer_normalized);
    let buyer = db.fetch_user(buyer.id).await.unwrap().unwrap();
    assert_eq!(buyer.role, UserRole::Client);

    let history = db.fetch_history_for_order(order.id).await.unwrap();
    assert_eq!(history.iter().filter(|h| h.action == Action::CashbackDone).count(), 1);
    debug!("Cashback audit trail verified");

    // A rejection on a different order leaves its own tag.
    let other = api.create_order(NewOrder::new(buyer.id, seller.id, product.id)).await.unwrap();
    api.update_order(other.id, OrderPatch::default().with_status(OrderStatus::CashbackRejected)).await.unwrap();
    let history = db.fetch_history_for_order(other.id).await.unwrap();
    assert_eq!(history.iter().filter(|h| h.action == Action::CashbackRejected).count(), 1);
}

#[tokio::test]
async fn step_artifacts_are_stored_with_the_order() {
    let db = prepare_test_env().await;
    let moderator = seed_moderator(&db).await;
    let seller = seed_seller(&db, "alice", 10).await;
    let buyer = seed_buyer(&db, "bob").await;
    let product = seed_approved_product(&db, moderator.id, seller.id, "lamps", 3).await;

    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    let order = api.create_order(NewOrder::new(buyer.id, seller.id, product.id)).await.unwrap();
    let changed = api
        .update_order(order.id, OrderPatch::default().with_step(1).with_search_screenshot_path("shots/1/search.png"))
        .await
        .unwrap();
    assert_eq!(changed.new_order.search_screenshot_path.as_deref(), Some("shots/1/search.png"));

    let changed = api
        .update_order(
            order.id,
            OrderPatch::default()
                .with_step(4)
                .with_delivery_screenshot_path("shots/1/delivery.png")
                .with_barcode_screenshot_path("shots/1/barcode.png"),
        )
        .await
        .unwrap();
    // Earlier artifacts survive later patches.
    assert_eq!(changed.new_order.search_screenshot_path.as_deref(), Some("shots/1/search.png"));
    assert_eq!(changed.new_order.delivery_screenshot_path.as_deref(), Some("shots/1/delivery.png"));
    assert_eq!(changed.new_order.barcode_screenshot_path.as_deref(), Some("shots/1/barcode.png"));
    let stored = api.fetch_order(order.id).await.unwrap().unwrap();
    assert_eq!(stored.barcode_screenshot_path.as_deref(), Some("shots/1/barcode.png"));
}

#[tokio::test]
async fn deleting_an_order_removes_it_without_restocking() {
    let db = prepare_test_env().await;
    let moderator = seed_moderator(&db).await;
    let seller = seed_seller(&db, "alice", 10).await;
    let buyer = seed_buyer(&db, "bob").await;
    let product = seed_approved_product(&db, moderator.id, seller.id, "vases", 2).await;

    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    let order = api.create_order(NewOrder::new(buyer.id, seller.id, product.id)).await.unwrap();

    assert!(api.delete_order(order.id).await.unwrap());
    assert!(api.fetch_order(order.id).await.unwrap().is_none());
    // A delete is not a cancellation: the consumed unit stays consumed.
    let product = db.fetch_product(product.id).await.unwrap().unwrap();
    assert_eq!(product.remaining_products, 1);
    assert!(!api.delete_order(order.id).await.unwrap());
}

#[tokio::test]
async fn the_user_report_carries_article_and_cashback() {
    let db = prepare_test_env().await;
    let moderator = seed_moderator(&db).await;
    let seller = seed_seller(&db, "alice", 10).await;
    let buyer = seed_buyer(&db, "bob").await;
    // Seed helper prices the product at 80 against a list price of 100.
    let product = seed_approved_product(&db, moderator.id, seller.id, "towels", 2).await;

    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    let order = api.create_order(NewOrder::new(buyer.id, seller.id, product.id)).await.unwrap();
    let report = api.get_user_report(order.id).await.unwrap();
    assert_eq!(report.article.as_deref(), Some("art-towels"));
    assert!((report.cashback - 20.0).abs() < f64::EPSILON);

    let missing = api.get_user_report(order.id + 999).await;
    assert!(matches!(missing, Err(MarketplaceError::OrderNotFound(_))));
}
