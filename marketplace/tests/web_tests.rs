// tests/web_tests.rs
mod common;
use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use common::*;
use feeding_marketplace::config::AppConfig;
use feeding_marketplace::models::OrderStatus;
use feeding_marketplace::state::AppState;
use feeding_marketplace::web::{configure_app_routes, USER_ID_HEADER};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

fn memory_config(default_buyer: Option<Uuid>) -> AppConfig {
  let mut vars: HashMap<&str, String> = HashMap::new();
  vars.insert("STORE_BACKEND", "memory".to_string());
  if let Some(id) = default_buyer {
    vars.insert("DEFAULT_BUYER_ID", id.to_string());
  }
  AppConfig::from_lookup(|name| vars.get(name).cloned()).unwrap()
}

fn state_for(fx: &Fixture, default_buyer: Option<Uuid>) -> AppState {
  AppState::new(fx.remote(), Arc::new(memory_config(default_buyer)))
}

#[actix_web::test]
async fn test_health_check() {
  let fx = Fixture::new();
  let app = test::init_service(
    App::new()
      .app_data(web::Data::new(state_for(&fx, None)))
      .configure(configure_app_routes),
  )
  .await;

  let req = test::TestRequest::get().uri("/api/v1/health").to_request();
  let body: Value = test::call_and_read_body_json(&app, req).await;
  assert_eq!(body, json!({ "status": "ok" }));
}

#[actix_web::test]
async fn test_missing_identity_is_unauthorized() {
  let fx = Fixture::new();
  let app = test::init_service(
    App::new()
      .app_data(web::Data::new(state_for(&fx, None)))
      .configure(configure_app_routes),
  )
  .await;

  let req = test::TestRequest::get().uri("/api/v1/buyer").to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

  let req = test::TestRequest::get()
    .uri("/api/v1/seller")
    .insert_header((USER_ID_HEADER, "not-a-uuid"))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_default_buyer_is_used_without_header() {
  let fx = Fixture::new();
  let app = test::init_service(
    App::new()
      .app_data(web::Data::new(state_for(&fx, Some(fx.buyer.user_id))))
      .configure(configure_app_routes),
  )
  .await;

  let req = test::TestRequest::get().uri("/api/v1/buyer").to_request();
  let body: Value = test::call_and_read_body_json(&app, req).await;
  assert_eq!(body["principal"]["user_id"], json!(fx.buyer.user_id));
  assert_eq!(body["principal"]["role"], json!("buyer"));
}

#[actix_web::test]
async fn test_listing_to_order_over_http() {
  let fx = Fixture::new();
  let state = state_for(&fx, None);
  let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(configure_app_routes)).await;
  let seller = fx.seller.user_id.to_string();
  let buyer = fx.buyer.user_id.to_string();

  let req = test::TestRequest::post()
    .uri("/api/v1/seller/items")
    .insert_header((USER_ID_HEADER, seller.as_str()))
    .set_json(json!({
        "name": "Bagels",
        "description": "Half dozen",
        "price": "5.00",
        "original_price": "8.00",
        "quantity": "10",
        "fresh_until": "2025-03-01T18:30",
    }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let item: Value = test::read_body_json(resp).await;
  let item_id = item["id"].as_str().unwrap().to_string();

  let req = test::TestRequest::put()
    .uri(&format!("/api/v1/buyer/items/{}/quantity", item_id))
    .insert_header((USER_ID_HEADER, buyer.as_str()))
    .set_json(json!({ "quantity": 3 }))
    .to_request();
  let body: Value = test::call_and_read_body_json(&app, req).await;
  assert_eq!(body["quantity"], json!(3));

  let req = test::TestRequest::post()
    .uri(&format!("/api/v1/buyer/cart/{}", item_id))
    .insert_header((USER_ID_HEADER, buyer.as_str()))
    .to_request();
  let body: Value = test::call_and_read_body_json(&app, req).await;
  assert_eq!(body["cart"]["total"], json!(15.0));

  let req = test::TestRequest::post()
    .uri("/api/v1/buyer/cart/confirm")
    .insert_header((USER_ID_HEADER, buyer.as_str()))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::CREATED);

  let rows = fx.store.order_rows();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0].quantity, 3);
  assert_eq!(rows[0].status, OrderStatus::Confirmed);

  let req = test::TestRequest::get()
    .uri("/api/v1/seller")
    .insert_header((USER_ID_HEADER, seller.as_str()))
    .to_request();
  let body: Value = test::call_and_read_body_json(&app, req).await;
  assert_eq!(body["orders"].as_array().unwrap().len(), 1);
  assert_eq!(body["orders"][0]["food_item"]["name"], json!("Bagels"));

  let req = test::TestRequest::post()
    .uri(&format!("/api/v1/buyer/orders/{}/received", rows[0].id))
    .insert_header((USER_ID_HEADER, buyer.as_str()))
    .to_request();
  let body: Value = test::call_and_read_body_json(&app, req).await;
  assert_eq!(body["status"], json!("received"));
}

#[actix_web::test]
async fn test_over_donation_is_a_conflict() {
  let fx = Fixture::new();
  let c = fx.open_campaign(4, 4);
  let app = test::init_service(
    App::new()
      .app_data(web::Data::new(state_for(&fx, None)))
      .configure(configure_app_routes),
  )
  .await;

  let req = test::TestRequest::post()
    .uri(&format!("/api/v1/seller/campaigns/{}/donate", c.id))
    .insert_header((USER_ID_HEADER, fx.seller.user_id.to_string()))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::CONFLICT);
  assert!(fx.store.donation_rows().is_empty());
}

#[actix_web::test]
async fn test_buyer_page_renders_escaped_listing() {
  let fx = Fixture::new();
  let mut item = food_item(fx.seller.user_id, "Fish & Chips", 4.0, 2, 1);
  item.description = "<b>crispy</b>".to_string();
  fx.store.put_food_item(item);
  let app = test::init_service(
    App::new()
      .app_data(web::Data::new(state_for(&fx, Some(fx.buyer.user_id))))
      .configure(configure_app_routes),
  )
  .await;

  let req = test::TestRequest::get().uri("/").to_request();
  let body = test::call_and_read_body(&app, req).await;
  let html = String::from_utf8(body.to_vec()).unwrap();
  assert!(html.contains("href=\"/buyer\"") && html.contains("href=\"/seller\""));

  let req = test::TestRequest::get().uri("/buyer?tab=items&q=fish").to_request();
  let body = test::call_and_read_body(&app, req).await;
  let html = String::from_utf8(body.to_vec()).unwrap();
  assert!(html.contains("Fish &amp; Chips"));
  assert!(html.contains("&lt;b&gt;crispy&lt;/b&gt;"));
  assert!(!html.contains("<b>crispy</b>"));
}

#[actix_web::test]
async fn test_dismiss_without_session_opens_nothing() {
  let fx = Fixture::new();
  let state = state_for(&fx, None);
  let sessions = state.sessions.clone();
  let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(configure_app_routes)).await;

  for _ in 0..20 {
    let req = test::TestRequest::delete()
      .uri("/api/v1/buyer/notification/0")
      .insert_header((USER_ID_HEADER, Uuid::new_v4().to_string()))
      .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["dismissed"], json!(false));

    let req = test::TestRequest::delete()
      .uri("/api/v1/seller/notification/0")
      .insert_header((USER_ID_HEADER, Uuid::new_v4().to_string()))
      .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["dismissed"], json!(false));
  }
  assert!(sessions.is_empty());
}
