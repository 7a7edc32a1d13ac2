// marketplace/src/store/rest.rs

//! PostgREST (Supabase) backend.
//!
//! Filters use PostgREST's query grammar: `column=eq.value`,
//! `column=in.(a,b)`, `order=created_at.desc`, and resource embedding through
//! `select=*,food_item:food_items(*)`. Writes send
//! `Prefer: return=representation` so the stored rows come back in the body.

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info, instrument};
use uuid::Uuid;

use super::{DonationQuery, FoodItemQuery, OrderQuery, RemoteStore};
use crate::errors::{AppError, Result};
use crate::models::{
  Campaign, Donation, DonationReceipt, DonationStatus, DonationWithCampaign, FoodItem, NewCampaign, NewDonation,
  NewFoodItem, NewOrder, Order, OrderStatus, OrderWithItem,
};

const ORDER_NEWEST_FIRST: &str = "created_at.desc";
const DONATE_RPC: &str = "donate_to_campaign";

type Params = Vec<(String, String)>;

#[derive(Clone)]
pub struct RestStore {
  base_url: String,
  client: reqwest::Client,
}

/// Error body PostgREST returns for rejected requests.
#[derive(Debug, Deserialize)]
struct PostgrestError {
  code: Option<String>,
  message: Option<String>,
}

#[derive(Serialize)]
struct StatusPatch<S: Serialize> {
  status: S,
}

#[derive(Serialize)]
struct DonateArgs {
  p_campaign_id: Uuid,
  p_seller_id: Uuid,
  p_quantity: i32,
}

impl RestStore {
  pub fn new(base_url: String, anon_key: String, timeout: Duration) -> Result<Self> {
    let mut headers = HeaderMap::new();
    let key = HeaderValue::from_str(&anon_key).map_err(|e| AppError::Config(format!("Invalid SUPABASE_ANON_KEY: {}", e)))?;
    let bearer = HeaderValue::from_str(&format!("Bearer {}", anon_key))
      .map_err(|e| AppError::Config(format!("Invalid SUPABASE_ANON_KEY: {}", e)))?;
    headers.insert("apikey", key);
    headers.insert(AUTHORIZATION, bearer);

    let client = reqwest::Client::builder().default_headers(headers).timeout(timeout).build()?;
    Ok(Self { base_url: base_url.trim_end_matches('/').to_string(), client })
  }

  fn table_url(&self, table: &str) -> String {
    format!("{}/rest/v1/{}", self.base_url, table)
  }

  fn rpc_url(&self, function: &str) -> String {
    format!("{}/rest/v1/rpc/{}", self.base_url, function)
  }

  async fn get_rows<T: DeserializeOwned>(&self, table: &str, params: &Params) -> Result<Vec<T>> {
    let response = self.client.get(self.table_url(table)).query(params).send().await?;
    let response = check_response(response).await?;
    let rows = response
      .json::<Vec<T>>()
      .await
      .with_context(|| format!("decoding rows from {}", table))?;
    Ok(rows)
  }

  async fn insert_rows<B: Serialize + ?Sized, T: DeserializeOwned>(&self, table: &str, body: &B) -> Result<Vec<T>> {
    let response = self
      .client
      .post(self.table_url(table))
      .header("Prefer", "return=representation")
      .json(body)
      .send()
      .await?;
    let response = check_response(response).await?;
    let rows = response
      .json::<Vec<T>>()
      .await
      .with_context(|| format!("decoding inserted rows from {}", table))?;
    Ok(rows)
  }

  async fn patch_by_id<B: Serialize, T: DeserializeOwned>(&self, table: &str, id: Uuid, body: &B) -> Result<T> {
    let response = self
      .client
      .patch(self.table_url(table))
      .query(&[("id", eq(id))])
      .header("Prefer", "return=representation")
      .json(body)
      .send()
      .await?;
    let response = check_response(response).await?;
    let mut rows = response
      .json::<Vec<T>>()
      .await
      .with_context(|| format!("decoding updated rows from {}", table))?;
    if rows.is_empty() {
      return Err(AppError::NotFound(format!("No row with id {} in {}.", id, table)));
    }
    Ok(rows.swap_remove(0))
  }
}

fn eq(value: impl std::fmt::Display) -> String {
  format!("eq.{}", value)
}

fn in_list<T: std::fmt::Display>(values: &[T]) -> String {
  let joined: Vec<String> = values.iter().map(|v| v.to_string()).collect();
  format!("in.({})", joined.join(","))
}

fn param(key: &str, value: impl Into<String>) -> (String, String) {
  (key.to_string(), value.into())
}

pub(crate) fn food_item_params(query: &FoodItemQuery) -> Params {
  let mut params = vec![param("select", "*")];
  if let Some(seller_id) = query.seller_id {
    params.push(param("seller_id", eq(seller_id)));
  }
  params.push(param("order", ORDER_NEWEST_FIRST));
  params
}

pub(crate) fn campaign_params() -> Params {
  vec![param("select", "*"), param("order", ORDER_NEWEST_FIRST)]
}

pub(crate) fn order_params(query: &OrderQuery) -> Params {
  let mut params = vec![param("select", "*,food_item:food_items(*)")];
  if let Some(buyer_id) = query.buyer_id {
    params.push(param("buyer_id", eq(buyer_id)));
  }
  if let Some(ids) = &query.food_item_ids {
    params.push(param("food_item_id", in_list(ids)));
  }
  match query.statuses.as_slice() {
    [] => {}
    [single] => params.push(param("status", eq(single.as_str()))),
    many => {
      let names: Vec<&str> = many.iter().map(|s| s.as_str()).collect();
      params.push(param("status", in_list(&names)));
    }
  }
  params.push(param("order", ORDER_NEWEST_FIRST));
  params
}

pub(crate) fn donation_params(query: &DonationQuery) -> Params {
  // `!inner` turns the embed into an inner join so the campaign filter drops
  // donations instead of nulling their campaign.
  let select = if query.campaign_buyer_id.is_some() {
    "*,campaign:campaigns!inner(*)"
  } else {
    "*,campaign:campaigns(*)"
  };
  let mut params = vec![param("select", select)];
  if let Some(seller_id) = query.seller_id {
    params.push(param("seller_id", eq(seller_id)));
  }
  if let Some(buyer_id) = query.campaign_buyer_id {
    params.push(param("campaign.buyer_id", eq(buyer_id)));
  }
  params.push(param("order", ORDER_NEWEST_FIRST));
  params
}

/// Passes 2xx responses through; turns anything else into an `AppError`
/// carrying PostgREST's error code and message.
async fn check_response(response: Response) -> Result<Response> {
  let status = response.status();
  if status.is_success() {
    return Ok(response);
  }
  let body = response.text().await.unwrap_or_default();
  let parsed: Option<PostgrestError> = serde_json::from_str(&body).ok();
  let code = parsed.as_ref().and_then(|p| p.code.clone()).unwrap_or_default();
  let message = parsed.and_then(|p| p.message).unwrap_or(body);
  error!(status = status.as_u16(), code = %code, message = %message, "Remote store rejected request.");
  Err(map_rejection(status, &code, message))
}

// SQLSTATEs raised by donate_to_campaign, see sql/schema.sql.
fn map_rejection(status: StatusCode, code: &str, message: String) -> AppError {
  match code {
    "23514" => AppError::Conflict(message),
    "P0002" => AppError::NotFound(message),
    "22023" => AppError::Validation(message),
    _ if status == StatusCode::NOT_FOUND => AppError::NotFound(message),
    _ => AppError::Remote { status: status.as_u16(), message },
  }
}

#[async_trait]
impl RemoteStore for RestStore {
  #[instrument(name = "rest_store::list_food_items", skip(self))]
  async fn list_food_items(&self, query: &FoodItemQuery) -> Result<Vec<FoodItem>> {
    self.get_rows("food_items", &food_item_params(query)).await
  }

  #[instrument(name = "rest_store::list_campaigns", skip(self))]
  async fn list_campaigns(&self) -> Result<Vec<Campaign>> {
    self.get_rows("campaigns", &campaign_params()).await
  }

  #[instrument(name = "rest_store::list_orders", skip(self))]
  async fn list_orders(&self, query: &OrderQuery) -> Result<Vec<OrderWithItem>> {
    if matches!(&query.food_item_ids, Some(ids) if ids.is_empty()) {
      return Ok(Vec::new());
    }
    self.get_rows("cart_items", &order_params(query)).await
  }

  #[instrument(name = "rest_store::list_donations", skip(self))]
  async fn list_donations(&self, query: &DonationQuery) -> Result<Vec<DonationWithCampaign>> {
    self.get_rows("campaign_donations", &donation_params(query)).await
  }

  #[instrument(name = "rest_store::insert_food_item", skip(self, item), fields(name = %item.name))]
  async fn insert_food_item(&self, item: &NewFoodItem) -> Result<FoodItem> {
    let mut rows: Vec<FoodItem> = self.insert_rows("food_items", item).await?;
    rows.pop().ok_or_else(|| AppError::Internal("insert into food_items returned no row".to_string()))
  }

  #[instrument(name = "rest_store::insert_campaign", skip(self, campaign), fields(title = %campaign.title))]
  async fn insert_campaign(&self, campaign: &NewCampaign) -> Result<Campaign> {
    let mut rows: Vec<Campaign> = self.insert_rows("campaigns", campaign).await?;
    rows.pop().ok_or_else(|| AppError::Internal("insert into campaigns returned no row".to_string()))
  }

  #[instrument(name = "rest_store::insert_orders", skip(self, orders), fields(rows = orders.len()))]
  async fn insert_orders(&self, orders: &[NewOrder]) -> Result<Vec<Order>> {
    let rows: Vec<Order> = self.insert_rows("cart_items", orders).await?;
    info!(inserted = rows.len(), "Order rows stored.");
    Ok(rows)
  }

  #[instrument(name = "rest_store::set_order_status", skip(self))]
  async fn set_order_status(&self, order_id: Uuid, status: OrderStatus) -> Result<Order> {
    self.patch_by_id("cart_items", order_id, &StatusPatch { status }).await
  }

  #[instrument(name = "rest_store::set_donation_status", skip(self))]
  async fn set_donation_status(&self, donation_id: Uuid, status: DonationStatus) -> Result<Donation> {
    self.patch_by_id("campaign_donations", donation_id, &StatusPatch { status }).await
  }

  #[instrument(name = "rest_store::donate", skip(self, donation), fields(campaign_id = %donation.campaign_id, quantity = donation.quantity))]
  async fn donate(&self, donation: &NewDonation) -> Result<DonationReceipt> {
    let args = DonateArgs {
      p_campaign_id: donation.campaign_id,
      p_seller_id: donation.seller_id,
      p_quantity: donation.quantity,
    };
    let response = self.client.post(self.rpc_url(DONATE_RPC)).json(&args).send().await?;
    let response = check_response(response).await?;
    let receipt = response
      .json::<DonationReceipt>()
      .await
      .context("decoding donate_to_campaign result")?;
    Ok(receipt)
  }
}
