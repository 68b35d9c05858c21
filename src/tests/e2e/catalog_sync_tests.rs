// End to end: events posted to the router as the sidecar delivers them.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use chrono::Duration;
use http_body_util::BodyExt;
use tower::ServiceExt;

use crate::modules::catalog_sync::adapters::outbound::event_emitter::BACK_IN_STOCK_TOPIC;
use crate::shared::core::product::{AvailabilityState, ReviewAggregates};
use crate::shared::infrastructure::product_store::ProductStore;
use crate::shell::http::router;
use crate::tests::fixtures::events::{envelope, envelope_at, fixed_timestamp};
use crate::tests::fixtures::products::ProductBuilder;
use crate::tests::fixtures::state::{settle, test_state};

async fn deliver(app: &Router, topic: &str, body: String) -> String {
    let response = app
        .clone()
        .oneshot(
            Request::post(format!("/events/{topic}"))
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    json["status"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn it_should_fold_a_five_star_review_into_existing_aggregates() {
    let (state, _) = test_state();
    state
        .products
        .seed(
            ProductBuilder::new()
                .id("p-1")
                .reviews(ReviewAggregates {
                    average_rating: 4.0,
                    total_review_count: 10,
                    rating_distribution: [0, 0, 0, 10, 0],
                    ..ReviewAggregates::default()
                })
                .build(),
        )
        .await;
    let app = router(state.clone());
    let body = envelope(
        "evt-1",
        serde_json::json!({
            "reviewId": "r-1",
            "productId": "p-1",
            "rating": 5,
            "verifiedPurchase": true
        }),
    );

    assert_eq!(deliver(&app, "review.created", body.clone()).await, "SUCCESS");
    assert_eq!(deliver(&app, "review.created", body).await, "SUCCESS");

    let reviews = state.products.find_by_id("p-1").await.unwrap().unwrap().review_aggregates;
    assert_eq!(reviews.total_review_count, 11);
    assert_eq!(reviews.rating_distribution, [0, 0, 0, 10, 1]);
    assert!((reviews.average_rating - 45.0 / 11.0).abs() < 1e-9);
    assert_eq!(reviews.verified_purchase_count, 1);
}

#[tokio::test]
async fn it_should_restock_to_low_stock_and_announce_it_once() {
    let (state, publisher) = test_state();
    state
        .products
        .seed(ProductBuilder::new().id("p-1").sku("SKU-1").name("Trail Runner").build())
        .await;
    let app = router(state.clone());
    let sold_out = envelope(
        "evt-1",
        serde_json::json!({"sku": "SKU-1", "availableQuantity": 0}),
    );
    let restocked = envelope_at(
        "evt-2",
        fixed_timestamp() + Duration::minutes(5),
        serde_json::json!({"sku": "SKU-1", "availableQuantity": 3, "lowStockThreshold": 10}),
    );

    assert_eq!(deliver(&app, "inventory.stock.updated", sold_out).await, "SUCCESS");
    assert_eq!(deliver(&app, "inventory.stock.updated", restocked.clone()).await, "SUCCESS");
    assert_eq!(deliver(&app, "inventory.stock.updated", restocked).await, "SUCCESS");

    let availability = state
        .products
        .find_by_id("p-1")
        .await
        .unwrap()
        .unwrap()
        .availability_status
        .unwrap();
    assert_eq!(availability.status, AvailabilityState::LowStock);
    assert_eq!(availability.available_quantity, 3);
    settle(&state).await;
    let announcements = publisher.published_on(BACK_IN_STOCK_TOPIC).await;
    assert_eq!(announcements.len(), 1);
    assert_eq!(announcements[0].data["sku"], "SKU-1");
}

#[tokio::test]
async fn it_should_drop_events_for_unknown_products() {
    let (state, publisher) = test_state();
    let app = router(state.clone());
    let body = envelope(
        "evt-1",
        serde_json::json!({"questionId": "q-1", "productId": "ghost"}),
    );

    assert_eq!(deliver(&app, "product.question.created", body).await, "DROP");
    settle(&state).await;
    assert!(publisher.published().await.is_empty());
}

#[tokio::test]
async fn it_should_ignore_a_reservation_older_than_the_last_stock_update() {
    let (state, _) = test_state();
    state
        .products
        .seed(ProductBuilder::new().id("p-1").sku("SKU-1").build())
        .await;
    let app = router(state.clone());
    let updated = envelope_at(
        "evt-1",
        fixed_timestamp() + Duration::minutes(10),
        serde_json::json!({"sku": "SKU-1", "availableQuantity": 40}),
    );
    let reserved = envelope_at(
        "evt-2",
        fixed_timestamp() + Duration::minutes(5),
        serde_json::json!({"sku": "SKU-1", "reservedQuantity": 5, "availableQuantity": 35}),
    );

    assert_eq!(deliver(&app, "inventory.stock.updated", updated).await, "SUCCESS");
    assert_eq!(deliver(&app, "inventory.reserved", reserved).await, "SUCCESS");

    let availability = state
        .products
        .find_by_id("p-1")
        .await
        .unwrap()
        .unwrap()
        .availability_status
        .unwrap();
    assert_eq!(availability.available_quantity, 40);
    assert_eq!(availability.last_updated, fixed_timestamp() + Duration::minutes(10));
}
