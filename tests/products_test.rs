mod common;

use assert_matches::assert_matches;
use rust_decimal_macros::dec;
use sea_orm::{EntityTrait, PaginatorTrait};
use stockroom::{
    entities::image,
    errors::ServiceError,
    models::{AssignmentSelector, OrderCart},
    repositories::lookup,
    services::{
        products::{NewProduct, ProductUpdate},
        ProductService,
    },
};

use common::{test_config, TestApp};

fn new_product(name: &str, selector: AssignmentSelector) -> NewProduct {
    NewProduct {
        name: name.to_string(),
        description: "Chicken kibble".to_string(),
        amount: 10,
        price: dec!(5.00),
        image: vec![1, 2, 3],
        assignment: selector,
    }
}

fn update_of(name: &str, image: Option<Vec<u8>>) -> ProductUpdate {
    ProductUpdate {
        name: name.to_string(),
        description: "Renamed kibble".to_string(),
        amount: 12,
        price: dec!(6.50),
        image,
        assignment: AssignmentSelector::names("Dry Food", "Chicken"),
    }
}

#[tokio::test]
async fn create_resolves_every_selector_shape() {
    let app = TestApp::new().await;
    let row = app
        .catalog()
        .add_assignment("Dry Food", "Chicken")
        .await
        .unwrap();

    let by_id = app
        .products()
        .create_product(new_product("Kibble A", AssignmentSelector::Id { id: row.id }))
        .await
        .unwrap();
    let by_names = app
        .products()
        .create_product(new_product(
            "Kibble B",
            AssignmentSelector::names("Dry Food", "Chicken"),
        ))
        .await
        .unwrap();
    let by_label = app
        .products()
        .create_product(new_product(
            "Kibble C",
            AssignmentSelector::Label("Dry Food - Chicken".into()),
        ))
        .await
        .unwrap();

    for created in [&by_id, &by_names, &by_label] {
        assert_eq!(created.category_assignment_id, row.id);
    }

    assert_matches!(
        app.products()
            .create_product(new_product(
                "Kibble D",
                AssignmentSelector::names("Wet Food", "Chicken"),
            ))
            .await,
        Err(ServiceError::NotFound(_))
    );
    assert_eq!(image::Entity::find().count(app.db()).await.unwrap(), 3);
}

#[tokio::test]
async fn duplicate_names_conflict_on_create_and_update() {
    let app = TestApp::new().await;
    let first = app
        .seed_product("Kibble A", "Dry Food", "Chicken", 10, dec!(5.00))
        .await;
    app.seed_product("Kibble B", "Dry Food", "Chicken", 10, dec!(5.00))
        .await;

    assert_matches!(
        app.products()
            .create_product(new_product(
                "Kibble B",
                AssignmentSelector::names("Dry Food", "Chicken"),
            ))
            .await,
        Err(ServiceError::Conflict(_))
    );
    assert_matches!(
        app.products()
            .update_product(first.id, update_of("Kibble B", None))
            .await,
        Err(ServiceError::Conflict(_))
    );

    // keeping its own name is not a conflict
    let kept = app
        .products()
        .update_product(first.id, update_of("Kibble A", None))
        .await
        .unwrap();
    assert_eq!(kept.amount, 12);
    assert_eq!(kept.image_id, first.image_id);
}

#[tokio::test]
async fn invalid_input_is_rejected_before_any_write() {
    let app = TestApp::new().await;
    app.catalog()
        .add_assignment("Dry Food", "Chicken")
        .await
        .unwrap();
    let selector = AssignmentSelector::names("Dry Food", "Chicken");

    let mut blank = new_product(" ", selector.clone());
    blank.description = String::new();
    assert_matches!(
        app.products().create_product(blank).await,
        Err(ServiceError::ValidationError(_))
    );

    let mut negative = new_product("Kibble A", selector.clone());
    negative.amount = -1;
    assert_matches!(
        app.products().create_product(negative).await,
        Err(ServiceError::ValidationError(_))
    );

    let mut fractional_cents = new_product("Kibble A", selector.clone());
    fractional_cents.price = dec!(1.005);
    assert_matches!(
        app.products().create_product(fractional_cents).await,
        Err(ServiceError::ValidationError(_))
    );

    let mut no_image = new_product("Kibble A", selector.clone());
    no_image.image.clear();
    assert_matches!(
        app.products().create_product(no_image).await,
        Err(ServiceError::ValidationError(_))
    );

    let small = ProductService::new(app.state.db.clone(), 2);
    assert_matches!(
        small.create_product(new_product("Kibble A", selector)).await,
        Err(ServiceError::ValidationError(_))
    );

    assert_eq!(image::Entity::find().count(app.db()).await.unwrap(), 0);
}

#[tokio::test]
async fn new_image_replaces_and_deletes_the_old_one() {
    let app = TestApp::new().await;
    let created = app
        .seed_product("Kibble A", "Dry Food", "Chicken", 10, dec!(5.00))
        .await;

    let updated = app
        .products()
        .update_product(created.id, update_of("Kibble A", Some(vec![9, 9])))
        .await
        .unwrap();

    assert_ne!(updated.image_id, created.image_id);
    assert!(image::Entity::find_by_id(created.image_id)
        .one(app.db())
        .await
        .unwrap()
        .is_none());
    assert_eq!(image::Entity::find().count(app.db()).await.unwrap(), 1);
    assert_eq!(
        app.products().product_image(created.id).await.unwrap(),
        vec![9, 9]
    );
    assert_eq!(
        app.products().image_by_name("Kibble%").await.unwrap(),
        vec![9, 9]
    );
}

#[tokio::test]
async fn detail_and_listing_carry_the_assignment() {
    let app = TestApp::new().await;
    let created = app
        .seed_product("Kibble A", "Dry Food", "Chicken", 10, dec!(5.00))
        .await;
    app.seed_product("Apple Chews", "Snacks", "Fruit", 3, dec!(2.00))
        .await;

    let detail = app.products().get_product(created.id).await.unwrap();
    assert_eq!(detail.assignment.display(), "Dry Food - Chicken");
    assert_eq!(detail.image_base64, "iVBORw==");
    assert_eq!(detail.price, dec!(5.00));

    let listing = app.products().list_products().await.unwrap();
    let names: Vec<&str> = listing.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Apple Chews", "Kibble A"]);
    assert_eq!(listing[1].assignment_label(), "Dry Food - Chicken");

    assert_eq!(
        lookup::price_by_product_id(app.db(), created.id).await.unwrap(),
        Some(dec!(5.00))
    );
}

#[tokio::test]
async fn ordered_products_cannot_be_deleted() {
    let app = TestApp::new().await;
    let ordered = app
        .seed_product("Kibble A", "Dry Food", "Chicken", 10, dec!(5.00))
        .await;
    let spare = app
        .seed_product("Kibble B", "Dry Food", "Chicken", 10, dec!(5.00))
        .await;

    let mut cart = OrderCart::new();
    app.orders()
        .add_to_cart(&mut cart, ordered.id, 1)
        .await
        .unwrap();
    app.orders().commit(&mut cart).await.unwrap();

    assert_matches!(
        app.products().delete_product(ordered.id).await,
        Err(ServiceError::Conflict(_))
    );

    app.products().delete_product(spare.id).await.unwrap();
    assert!(image::Entity::find_by_id(spare.image_id)
        .one(app.db())
        .await
        .unwrap()
        .is_none());
    assert_matches!(
        app.products().get_product(spare.id).await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn max_image_size_comes_from_configuration() {
    let mut cfg = test_config();
    cfg.max_image_bytes = 3;
    let app = TestApp::with_config(cfg).await;
    app.catalog()
        .add_assignment("Dry Food", "Chicken")
        .await
        .unwrap();

    let mut big = new_product("Kibble A", AssignmentSelector::names("Dry Food", "Chicken"));
    big.image = vec![0; 4];
    assert_matches!(
        app.products().create_product(big).await,
        Err(ServiceError::ValidationError(_))
    );
}
