// marketplace/src/store/postgres.rs

//! Direct Postgres backend over the same schema PostgREST exposes.
//! Runtime queries only, so the crate builds without a live database.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::{DonationQuery, FoodItemQuery, OrderQuery, RemoteStore};
use crate::errors::{AppError, Result};
use crate::models::{
  Campaign, Donation, DonationReceipt, DonationStatus, DonationWithCampaign, FoodItem, NewCampaign, NewDonation,
  NewFoodItem, NewOrder, Order, OrderStatus, OrderWithItem,
};

// `price` may be numeric in the hosted schema; cast so it decodes into f64.
const FOOD_ITEM_COLUMNS: &str =
  "id, name, description, price::float8 AS price, original_price::float8 AS original_price, quantity, fresh_until, seller_id, created_at";
const CAMPAIGN_COLUMNS: &str =
  "id, title, description, item_needed, quantity_needed, quantity_received, buyer_id, created_at";
const ORDER_COLUMNS: &str = "id, food_item_id, buyer_id, quantity, status, created_at";
const DONATION_COLUMNS: &str = "id, campaign_id, seller_id, quantity, status, created_at";

#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub async fn connect(database_url: &str) -> Result<Self> {
    let pool = PgPoolOptions::new().max_connections(5).connect(database_url).await.map_err(|e| {
      error!("Failed to connect to the database: {}", e);
      AppError::Sqlx(e)
    })?;
    info!("Successfully connected to the database.");
    Ok(Self { pool })
  }

  pub fn from_pool(pool: PgPool) -> Self {
    Self { pool }
  }

  async fn food_items_by_id(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, FoodItem>> {
    if ids.is_empty() {
      return Ok(HashMap::new());
    }
    let sql = format!("SELECT {} FROM food_items WHERE id = ANY($1)", FOOD_ITEM_COLUMNS);
    let items: Vec<FoodItem> = sqlx::query_as(&sql).bind(ids).fetch_all(&self.pool).await?;
    Ok(items.into_iter().map(|i| (i.id, i)).collect())
  }

  async fn campaigns_by_id(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Campaign>> {
    if ids.is_empty() {
      return Ok(HashMap::new());
    }
    let sql = format!("SELECT {} FROM campaigns WHERE id = ANY($1)", CAMPAIGN_COLUMNS);
    let campaigns: Vec<Campaign> = sqlx::query_as(&sql).bind(ids).fetch_all(&self.pool).await?;
    Ok(campaigns.into_iter().map(|c| (c.id, c)).collect())
  }
}

#[async_trait]
impl RemoteStore for PgStore {
  #[instrument(name = "pg_store::list_food_items", skip(self))]
  async fn list_food_items(&self, query: &FoodItemQuery) -> Result<Vec<FoodItem>> {
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!("SELECT {} FROM food_items", FOOD_ITEM_COLUMNS));
    if let Some(seller_id) = query.seller_id {
      qb.push(" WHERE seller_id = ").push_bind(seller_id);
    }
    qb.push(" ORDER BY created_at DESC");
    let items = qb.build_query_as::<FoodItem>().fetch_all(&self.pool).await?;
    Ok(items)
  }

  #[instrument(name = "pg_store::list_campaigns", skip(self))]
  async fn list_campaigns(&self) -> Result<Vec<Campaign>> {
    let sql = format!("SELECT {} FROM campaigns ORDER BY created_at DESC", CAMPAIGN_COLUMNS);
    let campaigns = sqlx::query_as::<_, Campaign>(&sql).fetch_all(&self.pool).await?;
    Ok(campaigns)
  }

  #[instrument(name = "pg_store::list_orders", skip(self))]
  async fn list_orders(&self, query: &OrderQuery) -> Result<Vec<OrderWithItem>> {
    if matches!(&query.food_item_ids, Some(ids) if ids.is_empty()) {
      return Ok(Vec::new());
    }
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!("SELECT {} FROM cart_items WHERE TRUE", ORDER_COLUMNS));
    if let Some(buyer_id) = query.buyer_id {
      qb.push(" AND buyer_id = ").push_bind(buyer_id);
    }
    if let Some(ids) = &query.food_item_ids {
      qb.push(" AND food_item_id = ANY(").push_bind(ids.clone()).push(")");
    }
    if !query.statuses.is_empty() {
      let names: Vec<String> = query.statuses.iter().map(|s| s.as_str().to_string()).collect();
      qb.push(" AND status = ANY(").push_bind(names).push(")");
    }
    qb.push(" ORDER BY created_at DESC");
    let orders = qb.build_query_as::<Order>().fetch_all(&self.pool).await?;

    let item_ids: Vec<Uuid> = orders.iter().map(|o| o.food_item_id).collect();
    let items = self.food_items_by_id(&item_ids).await?;
    Ok(
      orders
        .into_iter()
        .filter_map(|order| {
          let food_item = items.get(&order.food_item_id)?.clone();
          Some(OrderWithItem { order, food_item })
        })
        .collect(),
    )
  }

  #[instrument(name = "pg_store::list_donations", skip(self))]
  async fn list_donations(&self, query: &DonationQuery) -> Result<Vec<DonationWithCampaign>> {
    let mut qb: QueryBuilder<Postgres> =
      QueryBuilder::new(format!("SELECT d.{} FROM campaign_donations d", DONATION_COLUMNS.replace(", ", ", d.")));
    qb.push(" JOIN campaigns c ON c.id = d.campaign_id WHERE TRUE");
    if let Some(seller_id) = query.seller_id {
      qb.push(" AND d.seller_id = ").push_bind(seller_id);
    }
    if let Some(buyer_id) = query.campaign_buyer_id {
      qb.push(" AND c.buyer_id = ").push_bind(buyer_id);
    }
    qb.push(" ORDER BY d.created_at DESC");
    let donations = qb.build_query_as::<Donation>().fetch_all(&self.pool).await?;

    let campaign_ids: Vec<Uuid> = donations.iter().map(|d| d.campaign_id).collect();
    let campaigns = self.campaigns_by_id(&campaign_ids).await?;
    Ok(
      donations
        .into_iter()
        .filter_map(|donation| {
          let campaign = campaigns.get(&donation.campaign_id)?.clone();
          Some(DonationWithCampaign { donation, campaign })
        })
        .collect(),
    )
  }

  #[instrument(name = "pg_store::insert_food_item", skip(self, item), fields(name = %item.name))]
  async fn insert_food_item(&self, item: &NewFoodItem) -> Result<FoodItem> {
    let sql = format!(
      "INSERT INTO food_items (name, description, price, original_price, quantity, fresh_until, seller_id) \
       VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
      FOOD_ITEM_COLUMNS
    );
    let row = sqlx::query_as::<_, FoodItem>(&sql)
      .bind(&item.name)
      .bind(&item.description)
      .bind(item.price)
      .bind(item.original_price)
      .bind(item.quantity)
      .bind(item.fresh_until)
      .bind(item.seller_id)
      .fetch_one(&self.pool)
      .await?;
    Ok(row)
  }

  #[instrument(name = "pg_store::insert_campaign", skip(self, campaign), fields(title = %campaign.title))]
  async fn insert_campaign(&self, campaign: &NewCampaign) -> Result<Campaign> {
    let sql = format!(
      "INSERT INTO campaigns (title, description, item_needed, quantity_needed, quantity_received, buyer_id) \
       VALUES ($1, $2, $3, $4, 0, $5) RETURNING {}",
      CAMPAIGN_COLUMNS
    );
    let row = sqlx::query_as::<_, Campaign>(&sql)
      .bind(&campaign.title)
      .bind(&campaign.description)
      .bind(&campaign.item_needed)
      .bind(campaign.quantity_needed)
      .bind(campaign.buyer_id)
      .fetch_one(&self.pool)
      .await?;
    Ok(row)
  }

  #[instrument(name = "pg_store::insert_orders", skip(self, orders), fields(rows = orders.len()))]
  async fn insert_orders(&self, orders: &[NewOrder]) -> Result<Vec<Order>> {
    if orders.is_empty() {
      return Ok(Vec::new());
    }
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("INSERT INTO cart_items (food_item_id, buyer_id, quantity, status) ");
    qb.push_values(orders, |mut row, order| {
      row
        .push_bind(order.food_item_id)
        .push_bind(order.buyer_id)
        .push_bind(order.quantity)
        .push_bind(order.status.as_str());
    });
    qb.push(format!(" RETURNING {}", ORDER_COLUMNS));
    let rows = qb.build_query_as::<Order>().fetch_all(&self.pool).await?;
    Ok(rows)
  }

  #[instrument(name = "pg_store::set_order_status", skip(self))]
  async fn set_order_status(&self, order_id: Uuid, status: OrderStatus) -> Result<Order> {
    let sql = format!("UPDATE cart_items SET status = $1 WHERE id = $2 RETURNING {}", ORDER_COLUMNS);
    sqlx::query_as::<_, Order>(&sql)
      .bind(status.as_str())
      .bind(order_id)
      .fetch_optional(&self.pool)
      .await?
      .ok_or_else(|| AppError::NotFound(format!("Order {} not found.", order_id)))
  }

  #[instrument(name = "pg_store::set_donation_status", skip(self))]
  async fn set_donation_status(&self, donation_id: Uuid, status: DonationStatus) -> Result<Donation> {
    let sql = format!("UPDATE campaign_donations SET status = $1 WHERE id = $2 RETURNING {}", DONATION_COLUMNS);
    sqlx::query_as::<_, Donation>(&sql)
      .bind(status.as_str())
      .bind(donation_id)
      .fetch_optional(&self.pool)
      .await?
      .ok_or_else(|| AppError::NotFound(format!("Donation {} not found.", donation_id)))
  }

  #[instrument(name = "pg_store::donate", skip(self, donation), fields(campaign_id = %donation.campaign_id, quantity = donation.quantity))]
  async fn donate(&self, donation: &NewDonation) -> Result<DonationReceipt> {
    if donation.quantity < 1 {
      return Err(AppError::Validation("Donation quantity must be at least 1.".to_string()));
    }
    let mut tx = self.pool.begin().await?;

    // Row lock so concurrent donors serialize on the campaign.
    let lock_sql = format!("SELECT {} FROM campaigns WHERE id = $1 FOR UPDATE", CAMPAIGN_COLUMNS);
    let campaign = sqlx::query_as::<_, Campaign>(&lock_sql)
      .bind(donation.campaign_id)
      .fetch_optional(&mut *tx)
      .await?
      .ok_or_else(|| AppError::NotFound(format!("Campaign {} not found.", donation.campaign_id)))?;

    if donation.quantity > campaign.remaining() {
      warn!(remaining = campaign.remaining(), "Donation exceeds what the campaign still needs.");
      // Dropping `tx` rolls back.
      return Err(AppError::Conflict(format!(
        "Campaign only needs {} more {}.",
        campaign.remaining(),
        campaign.item_needed
      )));
    }

    let insert_sql = format!(
      "INSERT INTO campaign_donations (campaign_id, seller_id, quantity, status) VALUES ($1, $2, $3, 'pending') RETURNING {}",
      DONATION_COLUMNS
    );
    let inserted = sqlx::query_as::<_, Donation>(&insert_sql)
      .bind(donation.campaign_id)
      .bind(donation.seller_id)
      .bind(donation.quantity)
      .fetch_one(&mut *tx)
      .await?;

    let update_sql = format!(
      "UPDATE campaigns SET quantity_received = quantity_received + $1 WHERE id = $2 RETURNING {}",
      CAMPAIGN_COLUMNS
    );
    let updated = sqlx::query_as::<_, Campaign>(&update_sql)
      .bind(donation.quantity)
      .bind(donation.campaign_id)
      .fetch_one(&mut *tx)
      .await?;

    tx.commit().await?;
    info!(donation_id = %inserted.id, received = updated.quantity_received, "Donation committed.");
    Ok(DonationReceipt { donation: inserted, campaign: updated })
  }
}
