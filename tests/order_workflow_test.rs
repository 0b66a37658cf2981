mod common;

use assert_matches::assert_matches;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use stockroom::{
    entities::{order, order_detail},
    errors::ServiceError,
    models::{AdjustableLines, OrderCart},
    repositories::lookup,
    services::OrderSettings,
};

use common::TestApp;

async fn detail_count(app: &TestApp, order_id: i32) -> u64 {
    order_detail::Entity::find()
        .filter(order_detail::Column::OrderId.eq(order_id))
        .count(app.db())
        .await
        .unwrap()
}

#[tokio::test]
async fn kibble_scenario_end_to_end() {
    let app = TestApp::new().await;

    app.catalog()
        .add_assignment("Dry Food", "Chicken")
        .await
        .unwrap();
    let kibble = app
        .seed_product("Kibble A", "Dry Food", "Chicken", 10, dec!(5.00))
        .await;

    let mut cart = OrderCart::new();
    app.orders()
        .add_to_cart(&mut cart, kibble.id, 3)
        .await
        .unwrap();
    let receipt = app.orders().commit(&mut cart).await.unwrap();

    assert!(cart.is_empty());
    assert_eq!(receipt.total, dec!(15.00));
    assert_eq!(app.stock_of(kibble.id).await, 7);

    let details = order_detail::Entity::find()
        .filter(order_detail::Column::OrderId.eq(receipt.order_id))
        .all(app.db())
        .await
        .unwrap();
    assert_eq!(details.len(), 1);
    assert_eq!(details[0].amount, 3);
    assert_eq!(details[0].price, dec!(5.00));

    let mut edit = app.orders().load_edit(receipt.order_id).await.unwrap();
    app.orders()
        .set_line(&mut edit, kibble.id, 5)
        .await
        .unwrap();
    assert_eq!(app.orders().save_edit(&edit).await.unwrap(), 1);
    assert_eq!(app.stock_of(kibble.id).await, 5);
    assert_eq!(
        lookup::ordered_quantity(app.db(), receipt.order_id, kibble.id)
            .await
            .unwrap(),
        Some(5)
    );

    app.orders().delete_order(receipt.order_id).await.unwrap();
    assert_eq!(detail_count(&app, receipt.order_id).await, 0);
    assert_eq!(app.stock_of(kibble.id).await, 5);
}

#[tokio::test]
async fn cart_rejects_duplicates_and_overdrafts() {
    let app = TestApp::new().await;
    let kibble = app
        .seed_product("Kibble A", "Dry Food", "Chicken", 4, dec!(5.00))
        .await;

    let mut cart = OrderCart::new();
    assert_matches!(
        app.orders().add_to_cart(&mut cart, kibble.id, 0).await,
        Err(ServiceError::ValidationError(_))
    );
    assert_matches!(
        app.orders().add_to_cart(&mut cart, kibble.id, 5).await,
        Err(ServiceError::InsufficientStock(_))
    );
    assert!(cart.is_empty());

    app.orders()
        .add_to_cart(&mut cart, kibble.id, 3)
        .await
        .unwrap();
    assert_matches!(
        app.orders().add_to_cart(&mut cart, kibble.id, 1).await,
        Err(ServiceError::ValidationError(_))
    );

    assert_eq!(
        app.orders().adjust_line(&mut cart, kibble.id, 1).await.unwrap(),
        4
    );
    assert_matches!(
        app.orders().adjust_line(&mut cart, kibble.id, 1).await,
        Err(ServiceError::InsufficientStock(_))
    );
    assert_eq!(cart.quantity_of(kibble.id), Some(4));

    assert_matches!(
        app.orders().add_to_cart(&mut cart, 9_999, 1).await,
        Err(ServiceError::NotFound(_))
    );

    app.orders().remove_from_cart(&mut cart, kibble.id).unwrap();
    assert!(cart.is_empty());
}

#[tokio::test]
async fn commit_skips_zero_lines_and_refuses_an_empty_order() {
    let app = TestApp::new().await;
    let kibble = app
        .seed_product("Kibble A", "Dry Food", "Chicken", 10, dec!(5.00))
        .await;
    let treats = app
        .seed_product("Treats", "Snacks", "Liver", 10, dec!(1.25))
        .await;

    let mut cart = OrderCart::new();
    assert_matches!(
        app.orders().commit(&mut cart).await,
        Err(ServiceError::ValidationError(_))
    );

    app.orders()
        .add_to_cart(&mut cart, kibble.id, 2)
        .await
        .unwrap();
    app.orders()
        .add_to_cart(&mut cart, treats.id, 1)
        .await
        .unwrap();
    app.orders()
        .set_line(&mut cart, treats.id, 0)
        .await
        .unwrap();

    let receipt = app.orders().commit(&mut cart).await.unwrap();
    assert_eq!(receipt.lines.len(), 1);
    assert_eq!(detail_count(&app, receipt.order_id).await, 1);
    assert_eq!(app.stock_of(kibble.id).await, 8);
    assert_eq!(app.stock_of(treats.id).await, 10);

    // only the committed order exists
    assert_eq!(order::Entity::find().count(app.db()).await.unwrap(), 1);

    let mut zero_only = OrderCart::new();
    app.orders()
        .add_to_cart(&mut zero_only, treats.id, 1)
        .await
        .unwrap();
    app.orders()
        .adjust_line(&mut zero_only, treats.id, -1)
        .await
        .unwrap();
    assert_matches!(
        app.orders().commit(&mut zero_only).await,
        Err(ServiceError::ValidationError(_))
    );
    assert_eq!(order::Entity::find().count(app.db()).await.unwrap(), 1);
}

#[tokio::test]
async fn revalidation_catches_stock_taken_after_the_cart_was_built() {
    let app = TestApp::with_settings(OrderSettings {
        revalidate_stock_on_commit: true,
        restock_on_order_delete: false,
    })
    .await;
    let kibble = app
        .seed_product("Kibble A", "Dry Food", "Chicken", 10, dec!(5.00))
        .await;

    let mut cart = OrderCart::new();
    app.orders()
        .add_to_cart(&mut cart, kibble.id, 6)
        .await
        .unwrap();

    // someone else places an order in between
    let mut other = OrderCart::new();
    app.orders()
        .add_to_cart(&mut other, kibble.id, 5)
        .await
        .unwrap();
    app.orders().commit(&mut other).await.unwrap();

    assert_matches!(
        app.orders().commit(&mut cart).await,
        Err(ServiceError::InsufficientStock(_))
    );
    // the failed commit left neither an order nor a stock change behind
    assert_eq!(order::Entity::find().count(app.db()).await.unwrap(), 1);
    assert_eq!(app.stock_of(kibble.id).await, 5);
    assert_eq!(cart.quantity_of(kibble.id), Some(6));
}

#[tokio::test]
async fn edits_move_stock_by_the_opposite_of_the_change() {
    let app = TestApp::new().await;
    let kibble = app
        .seed_product("Kibble A", "Dry Food", "Chicken", 10, dec!(5.00))
        .await;

    let mut cart = OrderCart::new();
    app.orders()
        .add_to_cart(&mut cart, kibble.id, 3)
        .await
        .unwrap();
    let receipt = app.orders().commit(&mut cart).await.unwrap();
    assert_eq!(app.stock_of(kibble.id).await, 7);

    let mut edit = app.orders().load_edit(receipt.order_id).await.unwrap();
    // the 3 units already withdrawn count toward the limit: 11 - 3 > 7
    assert_matches!(
        app.orders().set_line(&mut edit, kibble.id, 11).await,
        Err(ServiceError::InsufficientStock(_))
    );
    app.orders()
        .set_line(&mut edit, kibble.id, 1)
        .await
        .unwrap();
    app.orders().save_edit(&edit).await.unwrap();
    assert_eq!(app.stock_of(kibble.id).await, 9);

    let mut edit = app.orders().load_edit(receipt.order_id).await.unwrap();
    app.orders()
        .set_line(&mut edit, kibble.id, 10)
        .await
        .unwrap();
    app.orders().save_edit(&edit).await.unwrap();
    assert_eq!(app.stock_of(kibble.id).await, 0);

    // an untouched edit writes nothing
    let edit = app.orders().load_edit(receipt.order_id).await.unwrap();
    assert_eq!(app.orders().save_edit(&edit).await.unwrap(), 0);

    // a line set to zero keeps its row
    let mut edit = app.orders().load_edit(receipt.order_id).await.unwrap();
    app.orders()
        .set_line(&mut edit, kibble.id, 0)
        .await
        .unwrap();
    app.orders().save_edit(&edit).await.unwrap();
    assert_eq!(app.stock_of(kibble.id).await, 10);
    assert_eq!(detail_count(&app, receipt.order_id).await, 1);
}

#[tokio::test]
async fn listing_orders_collects_the_ones_without_lines() {
    let app = TestApp::new().await;
    let kibble = app
        .seed_product("Kibble A", "Dry Food", "Chicken", 10, dec!(5.00))
        .await;

    let mut cart = OrderCart::new();
    app.orders()
        .add_to_cart(&mut cart, kibble.id, 2)
        .await
        .unwrap();
    let kept = app.orders().commit(&mut cart).await.unwrap();

    // an aborted commit leaves a bare order row behind
    let orphan = order::ActiveModel::placed_now()
        .insert(app.db())
        .await
        .unwrap();

    let listed = app.orders().list_orders().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, kept.order_id);
    assert_eq!(listed[0].line_count, 1);
    assert!(order::Entity::find_by_id(orphan.id)
        .one(app.db())
        .await
        .unwrap()
        .is_none());

    assert_eq!(app.orders().collect_empty_orders().await.unwrap(), 0);
}

#[tokio::test]
async fn deleting_an_order_can_restock_when_configured() {
    let app = TestApp::with_settings(OrderSettings {
        revalidate_stock_on_commit: false,
        restock_on_order_delete: true,
    })
    .await;
    let kibble = app
        .seed_product("Kibble A", "Dry Food", "Chicken", 10, dec!(5.00))
        .await;

    let mut cart = OrderCart::new();
    app.orders()
        .add_to_cart(&mut cart, kibble.id, 4)
        .await
        .unwrap();
    let receipt = app.orders().commit(&mut cart).await.unwrap();
    assert_eq!(app.stock_of(kibble.id).await, 6);

    app.orders().delete_order(receipt.order_id).await.unwrap();
    assert_eq!(app.stock_of(kibble.id).await, 10);

    assert_matches!(
        app.orders().delete_order(receipt.order_id).await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn order_details_join_product_and_category() {
    let app = TestApp::new().await;
    let kibble = app
        .seed_product("Kibble A", "Dry Food", "Chicken", 10, dec!(5.00))
        .await;

    let mut cart = OrderCart::new();
    app.orders()
        .add_to_cart(&mut cart, kibble.id, 2)
        .await
        .unwrap();
    let receipt = app.orders().commit(&mut cart).await.unwrap();

    let view = app.orders().order_details(receipt.order_id).await.unwrap();
    assert_eq!(view.order.id, receipt.order_id);
    assert_eq!(view.lines.len(), 1);
    assert_eq!(view.lines[0].product_name, "Kibble A");
    assert_eq!(view.lines[0].category_name, "Dry Food");
    assert_eq!(view.lines[0].amount, 2);

    assert_matches!(
        app.orders().order_details(receipt.order_id + 1).await,
        Err(ServiceError::NotFound(_))
    );
}
