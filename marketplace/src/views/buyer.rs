// marketplace/src/views/buyer.rs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{clamp_quantity, parse_leading_int, surface, Cart, CampaignCard};
use crate::errors::{AppError, Result};
use crate::models::{
  Campaign, DonationStatus, DonationWithCampaign, FoodItem, NewCampaign, NewOrder, Order, OrderStatus, OrderWithItem,
};
use crate::notification::{Notification, Notifier};
use crate::session::Principal;
use crate::store::{DonationQuery, FoodItemQuery, OrderQuery, RemoteStore};

/// Text fields of the "Create New Campaign" form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CampaignForm {
  pub title: String,
  pub description: String,
  pub item_needed: String,
  pub quantity_needed: String,
}

impl CampaignForm {
  fn validate(&self, buyer_id: Uuid) -> Result<NewCampaign> {
    let required = [
      ("Campaign title", &self.title),
      ("Description", &self.description),
      ("Item needed", &self.item_needed),
    ];
    if let Some((label, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
      return Err(AppError::Validation(format!("{} is required.", label)));
    }
    let quantity_needed = parse_leading_int(&self.quantity_needed)
      .filter(|q| *q >= 1 && *q <= i64::from(i32::MAX))
      .ok_or_else(|| AppError::Validation("Quantity needed must be a whole number of at least 1.".to_string()))?;

    Ok(NewCampaign {
      title: self.title.trim().to_string(),
      description: self.description.trim().to_string(),
      item_needed: self.item_needed.trim().to_string(),
      quantity_needed: quantity_needed as i32,
      buyer_id,
    })
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemCard {
  #[serde(flatten)]
  pub item: FoodItem,
  pub selected_quantity: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartLineView {
  pub item_id: Uuid,
  pub name: String,
  pub unit_price: f64,
  pub available: i32,
  pub quantity: i32,
  pub line_total: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartSummary {
  pub lines: Vec<CartLineView>,
  pub count: i32,
  pub total: f64,
}

/// Everything the buyer dashboard renders, in one serializable value.
#[derive(Debug, Clone, Serialize)]
pub struct BuyerSnapshot {
  pub principal: Principal,
  pub search_term: String,
  pub food_items: Vec<ItemCard>,
  pub campaigns: Vec<CampaignCard>,
  pub orders: Vec<OrderWithItem>,
  pub donations: Vec<DonationWithCampaign>,
  pub cart: CartSummary,
  pub notification: Option<Notification>,
}

/// Buyer dashboard controller.
pub struct BuyerView {
  principal: Principal,
  store: Arc<dyn RemoteStore>,
  food_items: Vec<FoodItem>,
  campaigns: Vec<Campaign>,
  orders: Vec<OrderWithItem>,
  donations: Vec<DonationWithCampaign>,
  search_term: String,
  item_quantities: HashMap<Uuid, i32>,
  cart: Cart,
  notifier: Notifier,
  mounted: bool,
}

impl BuyerView {
  pub fn new(principal: Principal, store: Arc<dyn RemoteStore>, notification_duration: Duration) -> Self {
    Self {
      principal,
      store,
      food_items: Vec::new(),
      campaigns: Vec::new(),
      orders: Vec::new(),
      donations: Vec::new(),
      search_term: String::new(),
      item_quantities: HashMap::new(),
      cart: Cart::new(),
      notifier: Notifier::new(notification_duration),
      mounted: false,
    }
  }

  fn orders_query(&self) -> OrderQuery {
    OrderQuery {
      buyer_id: Some(self.principal.user_id),
      food_item_ids: None,
      statuses: vec![OrderStatus::Confirmed, OrderStatus::Received],
    }
  }

  fn donations_query(&self) -> DonationQuery {
    DonationQuery { seller_id: None, campaign_buyer_id: Some(self.principal.user_id) }
  }

  /// Fetches all four slices concurrently. Each slice is applied on its own;
  /// the first failure (if any) is returned after all of them settle.
  #[instrument(name = "buyer_view::mount", skip(self), fields(buyer_id = %self.principal.user_id))]
  pub async fn mount(&mut self) -> Result<()> {
    let store = Arc::clone(&self.store);
    let (orders_q, donations_q) = (self.orders_query(), self.donations_query());
    let items_q = FoodItemQuery::all();
    let (items, campaigns, orders, donations) = futures_util::join!(
      store.list_food_items(&items_q),
      store.list_campaigns(),
      store.list_orders(&orders_q),
      store.list_donations(&donations_q)
    );

    let outcomes = [
      self.apply_food_items(items),
      self.apply_campaigns(campaigns),
      self.apply_orders(orders),
      self.apply_donations(donations),
    ];
    outcomes.into_iter().collect::<Result<Vec<()>>>()?;
    self.mounted = true;
    info!(
      items = self.food_items.len(),
      campaigns = self.campaigns.len(),
      orders = self.orders.len(),
      donations = self.donations.len(),
      "Buyer dashboard mounted."
    );
    Ok(())
  }

  fn apply_food_items(&mut self, result: Result<Vec<FoodItem>>) -> Result<()> {
    let items = surface(&mut self.notifier, "Could not load food items", result)?;
    self.item_quantities = items.iter().map(|i| (i.id, 1)).collect();
    self.food_items = items;
    let adjusted = self.cart.reconcile(&self.food_items);
    if adjusted > 0 {
      warn!(adjusted, "Cart lines no longer matched the listed stock.");
      self.notifier.error(format!("{} cart item(s) were updated to match current availability.", adjusted));
    }
    Ok(())
  }

  fn apply_campaigns(&mut self, result: Result<Vec<Campaign>>) -> Result<()> {
    self.campaigns = surface(&mut self.notifier, "Could not load campaigns", result)?;
    Ok(())
  }

  fn apply_orders(&mut self, result: Result<Vec<OrderWithItem>>) -> Result<()> {
    self.orders = surface(&mut self.notifier, "Could not load orders", result)?;
    Ok(())
  }

  fn apply_donations(&mut self, result: Result<Vec<DonationWithCampaign>>) -> Result<()> {
    self.donations = surface(&mut self.notifier, "Could not load donations", result)?;
    Ok(())
  }

  pub async fn refresh_food_items(&mut self) -> Result<()> {
    let result = self.store.list_food_items(&FoodItemQuery::all()).await;
    self.apply_food_items(result)
  }

  pub async fn refresh_campaigns(&mut self) -> Result<()> {
    let result = self.store.list_campaigns().await;
    self.apply_campaigns(result)
  }

  pub async fn refresh_orders(&mut self) -> Result<()> {
    let result = self.store.list_orders(&self.orders_query()).await;
    self.apply_orders(result)
  }

  pub async fn refresh_donations(&mut self) -> Result<()> {
    let result = self.store.list_donations(&self.donations_query()).await;
    self.apply_donations(result)
  }

  // --- Search ---

  pub fn set_search_term(&mut self, term: impl Into<String>) {
    self.search_term = term.into();
  }

  pub fn search_term(&self) -> &str {
    &self.search_term
  }

  pub fn filtered_food_items(&self) -> Vec<&FoodItem> {
    self.food_items.iter().filter(|i| i.matches_search(&self.search_term)).collect()
  }

  // --- Quantity selectors and cart ---

  fn find_item(&self, item_id: Uuid) -> Result<&FoodItem> {
    self
      .food_items
      .iter()
      .find(|i| i.id == item_id)
      .ok_or_else(|| AppError::NotFound(format!("Food item {} is not listed.", item_id)))
  }

  pub fn selected_quantity(&self, item_id: Uuid) -> i32 {
    self.item_quantities.get(&item_id).copied().unwrap_or(1)
  }

  /// Sets the quantity selector of a listed item from raw form input.
  pub fn set_item_quantity(&mut self, item_id: Uuid, raw: &str) -> Result<i32> {
    let result = self.find_item(item_id).map(|item| clamp_quantity(raw, item.quantity));
    let quantity = surface(&mut self.notifier, "Could not set quantity", result)?;
    self.item_quantities.insert(item_id, quantity);
    Ok(quantity)
  }

  /// Adds the selected quantity to the local cart. Nothing is sent to the store.
  #[instrument(name = "buyer_view::add_to_cart", skip(self))]
  pub fn add_to_cart(&mut self, item_id: Uuid) -> Result<i32> {
    let result = self.find_item(item_id).and_then(|item| {
      if item.is_sold_out() {
        return Err(AppError::Validation(format!("{} is sold out.", item.name)));
      }
      Ok(item.quantity)
    });
    let available = surface(&mut self.notifier, "Could not add to cart", result)?;
    let quantity = self.selected_quantity(item_id);
    let in_cart = self.cart.add(item_id, quantity, available);
    info!(%item_id, quantity, in_cart, "Item added to cart.");
    self.notifier.success("Item added to cart");
    Ok(in_cart)
  }

  pub fn update_cart_quantity(&mut self, item_id: Uuid, raw: &str) -> Result<i32> {
    let result = if self.cart.contains(item_id) {
      self.find_item(item_id).map(|item| clamp_quantity(raw, item.quantity))
    } else {
      Err(AppError::NotFound(format!("Food item {} is not in the cart.", item_id)))
    };
    let quantity = surface(&mut self.notifier, "Could not update cart", result)?;
    self.cart.set(item_id, quantity);
    Ok(quantity)
  }

  pub fn remove_from_cart(&mut self, item_id: Uuid) -> bool {
    self.cart.remove(item_id)
  }

  pub fn cart(&self) -> &Cart {
    &self.cart
  }

  pub fn cart_total(&self) -> f64 {
    self.cart.total(&self.food_items)
  }

  pub fn cart_count(&self) -> i32 {
    self.cart.count()
  }

  pub fn cart_summary(&self) -> CartSummary {
    let lines = self
      .cart
      .lines()
      .iter()
      .filter_map(|line| {
        let item = self.food_items.iter().find(|i| i.id == line.item_id)?;
        Some(CartLineView {
          item_id: item.id,
          name: item.name.clone(),
          unit_price: item.price,
          available: item.quantity,
          quantity: line.quantity,
          line_total: item.price * f64::from(line.quantity),
        })
      })
      .collect();
    CartSummary { lines, count: self.cart_count(), total: self.cart_total() }
  }

  /// Persists one `confirmed` order row per cart line, then clears the cart.
  #[instrument(name = "buyer_view::confirm_order", skip(self), fields(buyer_id = %self.principal.user_id, lines = self.cart.lines().len()))]
  pub async fn confirm_order(&mut self) -> Result<Vec<Order>> {
    if self.cart.is_empty() {
      let empty = Err(AppError::Validation("Your cart is empty.".to_string()));
      return surface(&mut self.notifier, "Could not confirm order", empty);
    }
    // Only lines whose item is still listed, so the order matches the total shown.
    let rows: Vec<NewOrder> = self
      .cart
      .lines()
      .iter()
      .filter_map(|line| {
        let item = self.food_items.iter().find(|i| i.id == line.item_id && !i.is_sold_out())?;
        Some(NewOrder {
          food_item_id: line.item_id,
          buyer_id: self.principal.user_id,
          quantity: line.quantity.min(item.quantity),
          status: OrderStatus::Confirmed,
        })
      })
      .collect();
    if rows.is_empty() {
      let unavailable = Err(AppError::Validation("Items in your cart are no longer available.".to_string()));
      return surface(&mut self.notifier, "Could not confirm order", unavailable);
    }

    let result = self.store.insert_orders(&rows).await;
    let orders = surface(&mut self.notifier, "Could not confirm order", result)?;

    self.cart.clear();
    info!(orders = orders.len(), "Order confirmed.");
    self.notifier.success("Order confirmed successfully");
    if let Err(e) = self.refresh_orders().await {
      warn!(error = %e, "Order stored but the order list could not be reloaded.");
    }
    Ok(orders)
  }

  // --- Orders and donations ---

  /// Moves one of the buyer's orders to `received`. Repeating it is harmless.
  #[instrument(name = "buyer_view::mark_order_received", skip(self))]
  pub async fn mark_order_received(&mut self, order_id: Uuid) -> Result<Order> {
    let check = self
      .orders
      .iter()
      .find(|o| o.order.id == order_id)
      .ok_or_else(|| AppError::NotFound(format!("Order {} not found.", order_id)))
      .and_then(|o| {
        if o.order.status.can_advance_to(OrderStatus::Received) {
          Ok(())
        } else {
          Err(AppError::Validation(format!(
            "An order that is {} cannot be marked as received.",
            o.order.status.as_str()
          )))
        }
      });
    surface(&mut self.notifier, "Could not update order", check)?;

    let result = self.store.set_order_status(order_id, OrderStatus::Received).await;
    let order = surface(&mut self.notifier, "Could not update order", result)?;
    self.notifier.success("Order marked as received");
    if let Err(e) = self.refresh_orders().await {
      warn!(error = %e, "Order updated but the order list could not be reloaded.");
    }
    Ok(order)
  }

  /// Confirms receipt of a donation made to one of the buyer's campaigns.
  #[instrument(name = "buyer_view::mark_donation_received", skip(self))]
  pub async fn mark_donation_received(&mut self, donation_id: Uuid) -> Result<()> {
    let check = self
      .donations
      .iter()
      .find(|d| d.donation.id == donation_id)
      .ok_or_else(|| AppError::NotFound(format!("Donation {} not found.", donation_id)))
      .and_then(|d| {
        if d.donation.status.can_advance_to(DonationStatus::Received) {
          Ok(())
        } else {
          Err(AppError::Validation("Donation status cannot move backwards.".to_string()))
        }
      });
    surface(&mut self.notifier, "Could not update donation", check)?;

    let result = self.store.set_donation_status(donation_id, DonationStatus::Received).await;
    surface(&mut self.notifier, "Could not update donation", result)?;
    self.notifier.success("Donation marked as received");
    if let Err(e) = self.refresh_donations().await {
      warn!(error = %e, "Donation updated but the donation list could not be reloaded.");
    }
    Ok(())
  }

  // --- Campaigns ---

  #[instrument(name = "buyer_view::create_campaign", skip(self, form), fields(title = %form.title))]
  pub async fn create_campaign(&mut self, form: &CampaignForm) -> Result<Campaign> {
    let validated = form.validate(self.principal.user_id);
    let new_campaign = surface(&mut self.notifier, "Could not create campaign", validated)?;

    let result = self.store.insert_campaign(&new_campaign).await;
    let campaign = surface(&mut self.notifier, "Could not create campaign", result)?;
    info!(campaign_id = %campaign.id, "Campaign created.");
    self.notifier.success("Campaign created successfully");
    if let Err(e) = self.refresh_campaigns().await {
      warn!(error = %e, "Campaign stored but the campaign list could not be reloaded.");
    }
    Ok(campaign)
  }

  pub fn is_own_campaign(&self, campaign: &Campaign) -> bool {
    campaign.buyer_id == self.principal.user_id
  }

  // --- Read access ---

  /// Whether a full mount has succeeded at least once.
  pub fn is_mounted(&self) -> bool {
    self.mounted
  }

  pub fn principal(&self) -> Principal {
    self.principal
  }

  pub fn food_items(&self) -> &[FoodItem] {
    &self.food_items
  }

  pub fn campaigns(&self) -> &[Campaign] {
    &self.campaigns
  }

  pub fn orders(&self) -> &[OrderWithItem] {
    &self.orders
  }

  pub fn donations(&self) -> &[DonationWithCampaign] {
    &self.donations
  }

  pub fn notification(&self) -> Option<&Notification> {
    self.notifier.current()
  }

  pub fn dismiss_notification(&mut self, seq: u64) -> bool {
    self.notifier.dismiss(seq)
  }

  pub fn snapshot(&self) -> BuyerSnapshot {
    BuyerSnapshot {
      principal: self.principal,
      search_term: self.search_term.clone(),
      food_items: self
        .filtered_food_items()
        .into_iter()
        .map(|item| ItemCard { item: item.clone(), selected_quantity: self.selected_quantity(item.id) })
        .collect(),
      campaigns: self
        .campaigns
        .iter()
        .map(|c| CampaignCard::new(c, self.is_own_campaign(c), None))
        .collect(),
      orders: self.orders.clone(),
      donations: self.donations.clone(),
      cart: self.cart_summary(),
      notification: self.notification().cloned(),
    }
  }
}
