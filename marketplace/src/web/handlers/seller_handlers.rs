// marketplace/src/web/handlers/seller_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use tokio::sync::OwnedMutexGuard;
use tracing::instrument;
use uuid::Uuid;

use super::QuantityPayload;
use crate::errors::AppError;
use crate::session::Principal;
use crate::state::AppState;
use crate::views::{FoodItemForm, SellerView};
use crate::web::extractors::SellerSession;

pub(crate) async fn open_seller_view(
  app_state: &AppState,
  principal: Principal,
) -> Result<OwnedMutexGuard<SellerView>, AppError> {
  let mut view = app_state.seller_view(principal).lock_owned().await;
  if !view.is_mounted() {
    view.mount().await?;
  }
  Ok(view)
}

#[instrument(name = "handler::seller_dashboard", skip(app_state, session), fields(user_id = %session.0.user_id))]
pub async fn dashboard_handler(
  app_state: web::Data<AppState>,
  session: SellerSession,
) -> Result<HttpResponse, AppError> {
  let mut view = app_state.seller_view(session.0).lock_owned().await;
  view.mount().await?;
  Ok(HttpResponse::Ok().json(view.snapshot()))
}

#[instrument(name = "handler::add_food_item", skip(app_state, session, form), fields(user_id = %session.0.user_id))]
pub async fn add_food_item_handler(
  app_state: web::Data<AppState>,
  session: SellerSession,
  form: web::Json<FoodItemForm>,
) -> Result<HttpResponse, AppError> {
  let mut view = open_seller_view(&app_state, session.0).await?;
  let item = view.add_food_item(&form).await?;
  Ok(HttpResponse::Created().json(item))
}

pub async fn set_donation_quantity_handler(
  app_state: web::Data<AppState>,
  session: SellerSession,
  path: web::Path<Uuid>,
  payload: web::Json<QuantityPayload>,
) -> Result<HttpResponse, AppError> {
  let campaign_id = path.into_inner();
  let mut view = open_seller_view(&app_state, session.0).await?;
  let quantity = view.set_donation_quantity(campaign_id, &payload.raw())?;
  Ok(HttpResponse::Ok().json(json!({ "campaignId": campaign_id, "quantity": quantity })))
}

#[instrument(name = "handler::donate", skip(app_state, session), fields(user_id = %session.0.user_id))]
pub async fn donate_handler(
  app_state: web::Data<AppState>,
  session: SellerSession,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let mut view = open_seller_view(&app_state, session.0).await?;
  let receipt = view.donate(path.into_inner()).await?;
  Ok(HttpResponse::Created().json(json!({
      "message": format!("Donated {} items successfully", receipt.donation.quantity),
      "donation": receipt.donation,
      "campaign": receipt.campaign,
  })))
}

pub async fn dismiss_notification_handler(
  app_state: web::Data<AppState>,
  session: SellerSession,
  path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
  let dismissed = match app_state.existing_seller_view(session.0) {
    Some(view) => view.lock_owned().await.dismiss_notification(path.into_inner()),
    None => false,
  };
  Ok(HttpResponse::Ok().json(json!({ "dismissed": dismissed })))
}
