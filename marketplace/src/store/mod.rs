// marketplace/src/store/mod.rs

//! Data access to the hosted relational store.
//!
//! Every view controller talks to the store through [`RemoteStore`]. Three
//! backends implement it:
//!  - [`rest::RestStore`]: PostgREST (Supabase) over HTTPS.
//!  - [`postgres::PgStore`]: a direct Postgres connection through sqlx.
//!  - [`memory::InMemoryStore`]: process-local tables for demos and tests.
//!
//! Lists are always ordered by `created_at` descending.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::{AppConfig, StoreBackend};
use crate::errors::{AppError, Result};
use crate::models::{
  Campaign, Donation, DonationReceipt, DonationStatus, DonationWithCampaign, FoodItem, NewCampaign, NewDonation,
  NewFoodItem, NewOrder, Order, OrderStatus, OrderWithItem,
};

pub mod memory;
pub mod postgres;
pub mod rest;

/// Filter for `food_items`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FoodItemQuery {
  pub seller_id: Option<Uuid>,
}

impl FoodItemQuery {
  pub fn all() -> Self {
    Self::default()
  }

  pub fn for_seller(seller_id: Uuid) -> Self {
    Self { seller_id: Some(seller_id) }
  }
}

/// Filter for `cart_items`. `None` means "don't filter on this column";
/// an empty `food_item_ids` list matches nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderQuery {
  pub buyer_id: Option<Uuid>,
  pub food_item_ids: Option<Vec<Uuid>>,
  pub statuses: Vec<OrderStatus>,
}

/// Filter for `campaign_donations`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DonationQuery {
  pub seller_id: Option<Uuid>,
  /// Keep only donations whose campaign belongs to this buyer.
  pub campaign_buyer_id: Option<Uuid>,
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
  async fn list_food_items(&self, query: &FoodItemQuery) -> Result<Vec<FoodItem>>;

  async fn list_campaigns(&self) -> Result<Vec<Campaign>>;

  async fn list_orders(&self, query: &OrderQuery) -> Result<Vec<OrderWithItem>>;

  async fn list_donations(&self, query: &DonationQuery) -> Result<Vec<DonationWithCampaign>>;

  async fn insert_food_item(&self, item: &NewFoodItem) -> Result<FoodItem>;

  async fn insert_campaign(&self, campaign: &NewCampaign) -> Result<Campaign>;

  /// Inserts all rows in one request.
  async fn insert_orders(&self, orders: &[NewOrder]) -> Result<Vec<Order>>;

  async fn set_order_status(&self, order_id: Uuid, status: OrderStatus) -> Result<Order>;

  async fn set_donation_status(&self, donation_id: Uuid, status: DonationStatus) -> Result<Donation>;

  /// Records the donation and increments the campaign's `quantity_received`
  /// as one atomic operation. Fails with `Conflict` when the quantity exceeds
  /// what the campaign still needs.
  async fn donate(&self, donation: &NewDonation) -> Result<DonationReceipt>;
}

/// Builds the backend selected by `STORE_BACKEND`.
pub async fn connect(config: &AppConfig) -> Result<Arc<dyn RemoteStore>> {
  match config.store_backend {
    StoreBackend::Rest => {
      let (url, key) = match (&config.supabase_url, &config.supabase_anon_key) {
        (Some(url), Some(key)) => (url.clone(), key.clone()),
        _ => return Err(AppError::Config("Supabase credentials are missing".to_string())),
      };
      tracing::info!(url = %url, "Using PostgREST store.");
      Ok(Arc::new(rest::RestStore::new(url, key, config.request_timeout)?))
    }
    StoreBackend::Postgres => {
      let database_url = config
        .database_url
        .as_deref()
        .ok_or_else(|| AppError::Config("DATABASE_URL is missing".to_string()))?;
      let store = postgres::PgStore::connect(database_url).await?;
      tracing::info!("Using direct Postgres store.");
      Ok(Arc::new(store))
    }
    StoreBackend::Memory => {
      let store = match (config.seed_db, config.default_buyer_id, config.default_seller_id) {
        (true, Some(buyer_id), Some(seller_id)) => memory::InMemoryStore::seeded(buyer_id, seller_id),
        (true, _, _) => {
          tracing::warn!("SEED_DB needs DEFAULT_BUYER_ID and DEFAULT_SELLER_ID; starting empty.");
          memory::InMemoryStore::new()
        }
        (false, _, _) => memory::InMemoryStore::new(),
      };
      tracing::info!("Using in-memory store.");
      Ok(Arc::new(store))
    }
  }
}
