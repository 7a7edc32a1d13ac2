// marketplace/src/web/handlers/buyer_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::OwnedMutexGuard;
use tracing::{info, instrument};
use uuid::Uuid;

use super::QuantityPayload;
use crate::errors::AppError;
use crate::session::Principal;
use crate::state::AppState;
use crate::views::{BuyerView, CampaignForm};
use crate::web::extractors::BuyerSession;

/// Locks the principal's buyer view, mounting it first if it never loaded.
pub(crate) async fn open_buyer_view(
  app_state: &AppState,
  principal: Principal,
) -> Result<OwnedMutexGuard<BuyerView>, AppError> {
  let mut view = app_state.buyer_view(principal).lock_owned().await;
  if !view.is_mounted() {
    view.mount().await?;
  }
  Ok(view)
}

#[instrument(name = "handler::buyer_dashboard", skip(app_state, session), fields(user_id = %session.0.user_id))]
pub async fn dashboard_handler(
  app_state: web::Data<AppState>,
  session: BuyerSession,
) -> Result<HttpResponse, AppError> {
  let mut view = app_state.buyer_view(session.0).lock_owned().await;
  view.mount().await?;
  Ok(HttpResponse::Ok().json(view.snapshot()))
}

#[derive(Debug, Deserialize)]
pub struct SearchPayload {
  #[serde(default)]
  pub term: String,
}

pub async fn search_handler(
  app_state: web::Data<AppState>,
  session: BuyerSession,
  payload: web::Json<SearchPayload>,
) -> Result<HttpResponse, AppError> {
  let mut view = open_buyer_view(&app_state, session.0).await?;
  view.set_search_term(payload.into_inner().term);
  Ok(HttpResponse::Ok().json(view.snapshot()))
}

pub async fn set_item_quantity_handler(
  app_state: web::Data<AppState>,
  session: BuyerSession,
  path: web::Path<Uuid>,
  payload: web::Json<QuantityPayload>,
) -> Result<HttpResponse, AppError> {
  let item_id = path.into_inner();
  let mut view = open_buyer_view(&app_state, session.0).await?;
  let quantity = view.set_item_quantity(item_id, &payload.raw())?;
  Ok(HttpResponse::Ok().json(json!({ "itemId": item_id, "quantity": quantity })))
}

#[instrument(name = "handler::add_to_cart", skip(app_state, session), fields(user_id = %session.0.user_id))]
pub async fn add_to_cart_handler(
  app_state: web::Data<AppState>,
  session: BuyerSession,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let item_id = path.into_inner();
  let mut view = open_buyer_view(&app_state, session.0).await?;
  let in_cart = view.add_to_cart(item_id)?;
  Ok(HttpResponse::Ok().json(json!({
      "message": "Item added to cart",
      "itemId": item_id,
      "quantity": in_cart,
      "cart": view.cart_summary(),
  })))
}

pub async fn update_cart_handler(
  app_state: web::Data<AppState>,
  session: BuyerSession,
  path: web::Path<Uuid>,
  payload: web::Json<QuantityPayload>,
) -> Result<HttpResponse, AppError> {
  let item_id = path.into_inner();
  let mut view = open_buyer_view(&app_state, session.0).await?;
  view.update_cart_quantity(item_id, &payload.raw())?;
  Ok(HttpResponse::Ok().json(view.cart_summary()))
}

pub async fn remove_from_cart_handler(
  app_state: web::Data<AppState>,
  session: BuyerSession,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let item_id = path.into_inner();
  let mut view = open_buyer_view(&app_state, session.0).await?;
  if !view.remove_from_cart(item_id) {
    return Err(AppError::NotFound(format!("Food item {} is not in the cart.", item_id)));
  }
  Ok(HttpResponse::Ok().json(view.cart_summary()))
}

#[instrument(name = "handler::confirm_order", skip(app_state, session), fields(user_id = %session.0.user_id))]
pub async fn confirm_order_handler(
  app_state: web::Data<AppState>,
  session: BuyerSession,
) -> Result<HttpResponse, AppError> {
  let mut view = open_buyer_view(&app_state, session.0).await?;
  let orders = view.confirm_order().await?;
  info!(orders = orders.len(), "Order confirmed through the API.");
  Ok(HttpResponse::Created().json(json!({
      "message": "Order confirmed successfully",
      "orders": orders,
  })))
}

pub async fn order_received_handler(
  app_state: web::Data<AppState>,
  session: BuyerSession,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let mut view = open_buyer_view(&app_state, session.0).await?;
  let order = view.mark_order_received(path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(order))
}

pub async fn donation_received_handler(
  app_state: web::Data<AppState>,
  session: BuyerSession,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let donation_id = path.into_inner();
  let mut view = open_buyer_view(&app_state, session.0).await?;
  view.mark_donation_received(donation_id).await?;
  Ok(HttpResponse::Ok().json(json!({ "donationId": donation_id, "status": "received" })))
}

#[instrument(name = "handler::create_campaign", skip(app_state, session, form), fields(user_id = %session.0.user_id))]
pub async fn create_campaign_handler(
  app_state: web::Data<AppState>,
  session: BuyerSession,
  form: web::Json<CampaignForm>,
) -> Result<HttpResponse, AppError> {
  let mut view = open_buyer_view(&app_state, session.0).await?;
  let campaign = view.create_campaign(&form).await?;
  Ok(HttpResponse::Created().json(campaign))
}

pub async fn dismiss_notification_handler(
  app_state: web::Data<AppState>,
  session: BuyerSession,
  path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
  let dismissed = match app_state.existing_buyer_view(session.0) {
    Some(view) => view.lock_owned().await.dismiss_notification(path.into_inner()),
    None => false,
  };
  Ok(HttpResponse::Ok().json(json!({ "dismissed": dismissed })))
}
