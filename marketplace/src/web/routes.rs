// marketplace/src/web/routes.rs

use actix_web::web;

use crate::web::handlers::{buyer_handlers, pages, seller_handlers};

async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg
    .route("/", web::get().to(pages::index_handler))
    .route("/buyer", web::get().to(pages::buyer_page_handler))
    .route("/seller", web::get().to(pages::seller_page_handler))
    .service(
      web::scope("/api/v1")
        .route("/health", web::get().to(health_check_handler))
        .service(
          web::scope("/buyer")
            .route("", web::get().to(buyer_handlers::dashboard_handler))
            .route("/search", web::put().to(buyer_handlers::search_handler))
            .route("/items/{item_id}/quantity", web::put().to(buyer_handlers::set_item_quantity_handler))
            // Registered before /cart/{item_id} so "confirm" is not taken for an id.
            .route("/cart/confirm", web::post().to(buyer_handlers::confirm_order_handler))
            .route("/cart/{item_id}", web::post().to(buyer_handlers::add_to_cart_handler))
            .route("/cart/{item_id}", web::put().to(buyer_handlers::update_cart_handler))
            .route("/cart/{item_id}", web::delete().to(buyer_handlers::remove_from_cart_handler))
            .route("/orders/{order_id}/received", web::post().to(buyer_handlers::order_received_handler))
            .route(
              "/donations/{donation_id}/received",
              web::post().to(buyer_handlers::donation_received_handler),
            )
            .route("/campaigns", web::post().to(buyer_handlers::create_campaign_handler))
            .route("/notification/{seq}", web::delete().to(buyer_handlers::dismiss_notification_handler)),
        )
        .service(
          web::scope("/seller")
            .route("", web::get().to(seller_handlers::dashboard_handler))
            .route("/items", web::post().to(seller_handlers::add_food_item_handler))
            .route(
              "/campaigns/{campaign_id}/quantity",
              web::put().to(seller_handlers::set_donation_quantity_handler),
            )
            .route("/campaigns/{campaign_id}/donate", web::post().to(seller_handlers::donate_handler))
            .route("/notification/{seq}", web::delete().to(seller_handlers::dismiss_notification_handler)),
        ),
    );
}
