// marketplace/src/state.rs
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::session::Principal;
use crate::store::RemoteStore;
use crate::views::{BuyerView, SellerView};

pub type SharedBuyerView = Arc<tokio::sync::Mutex<BuyerView>>;
pub type SharedSellerView = Arc<tokio::sync::Mutex<SellerView>>;

struct SessionEntry<V> {
  view: Arc<tokio::sync::Mutex<V>>,
  last_seen: Instant,
}

impl<V> SessionEntry<V> {
  /// A handler still holds the view.
  fn in_use(&self) -> bool {
    Arc::strong_count(&self.view) > 1
  }
}

/// Views of one role keyed by user id, with idle eviction and a size cap.
struct SessionMap<V> {
  entries: Mutex<HashMap<Uuid, SessionEntry<V>>>,
}

impl<V> SessionMap<V> {
  fn new() -> Self {
    Self { entries: Mutex::new(HashMap::new()) }
  }

  fn get_or_open(
    &self,
    user_id: Uuid,
    now: Instant,
    limits: SessionLimits,
    open: impl FnOnce() -> V,
  ) -> Arc<tokio::sync::Mutex<V>> {
    let mut entries = self.entries.lock();
    Self::evict_idle(&mut entries, now, limits.idle_timeout);

    if let Some(entry) = entries.get_mut(&user_id) {
      entry.last_seen = now;
      return Arc::clone(&entry.view);
    }

    while entries.len() >= limits.max_sessions {
      let oldest = entries
        .iter()
        .filter(|(_, entry)| !entry.in_use())
        .min_by_key(|(_, entry)| entry.last_seen)
        .map(|(id, _)| *id);
      match oldest {
        Some(id) => {
          entries.remove(&id);
          tracing::debug!(user_id = %id, "Evicted least recently used session.");
        }
        None => {
          tracing::warn!(sessions = entries.len(), "Every session is busy; exceeding the session cap.");
          break;
        }
      }
    }

    let view = Arc::new(tokio::sync::Mutex::new(open()));
    entries.insert(user_id, SessionEntry { view: Arc::clone(&view), last_seen: now });
    view
  }

  fn existing(&self, user_id: Uuid, now: Instant, idle_timeout: Duration) -> Option<Arc<tokio::sync::Mutex<V>>> {
    let mut entries = self.entries.lock();
    Self::evict_idle(&mut entries, now, idle_timeout);
    entries.get_mut(&user_id).map(|entry| {
      entry.last_seen = now;
      Arc::clone(&entry.view)
    })
  }

  fn evict_idle(entries: &mut HashMap<Uuid, SessionEntry<V>>, now: Instant, idle_timeout: Duration) {
    let before = entries.len();
    entries.retain(|_, entry| entry.in_use() || now.saturating_duration_since(entry.last_seen) < idle_timeout);
    let evicted = before - entries.len();
    if evicted > 0 {
      tracing::debug!(evicted, "Dropped idle sessions.");
    }
  }

  fn len(&self) -> usize {
    self.entries.lock().len()
  }
}

#[derive(Debug, Clone, Copy)]
struct SessionLimits {
  idle_timeout: Duration,
  max_sessions: usize,
}

/// Live view controllers, one per principal. The outer lock is only held
/// while looking a controller up; the per-view async mutex serializes one
/// principal's actions. Sessions untouched for `idle_timeout` are dropped,
/// and each role keeps at most `max_sessions` of them.
pub struct SessionRegistry {
  limits: SessionLimits,
  buyers: SessionMap<BuyerView>,
  sellers: SessionMap<SellerView>,
}

impl SessionRegistry {
  pub fn new(idle_timeout: Duration, max_sessions: usize) -> Self {
    Self {
      limits: SessionLimits { idle_timeout, max_sessions: max_sessions.max(1) },
      buyers: SessionMap::new(),
      sellers: SessionMap::new(),
    }
  }

  pub fn from_config(config: &AppConfig) -> Self {
    Self::new(config.session_idle_timeout, config.max_sessions)
  }

  pub fn buyer(&self, principal: Principal, store: &Arc<dyn RemoteStore>, config: &AppConfig) -> SharedBuyerView {
    self.buyer_at(principal, store, config, Instant::now())
  }

  pub fn buyer_at(
    &self,
    principal: Principal,
    store: &Arc<dyn RemoteStore>,
    config: &AppConfig,
    now: Instant,
  ) -> SharedBuyerView {
    self.buyers.get_or_open(principal.user_id, now, self.limits, || {
      tracing::debug!(user_id = %principal.user_id, "Opening buyer session.");
      BuyerView::new(principal, Arc::clone(store), config.notification_duration)
    })
  }

  pub fn seller(&self, principal: Principal, store: &Arc<dyn RemoteStore>, config: &AppConfig) -> SharedSellerView {
    self.seller_at(principal, store, config, Instant::now())
  }

  pub fn seller_at(
    &self,
    principal: Principal,
    store: &Arc<dyn RemoteStore>,
    config: &AppConfig,
    now: Instant,
  ) -> SharedSellerView {
    self.sellers.get_or_open(principal.user_id, now, self.limits, || {
      tracing::debug!(user_id = %principal.user_id, "Opening seller session.");
      SellerView::new(principal, Arc::clone(store), config.notification_duration)
    })
  }

  /// The buyer's view if one is open. Never opens a new session.
  pub fn existing_buyer(&self, user_id: Uuid) -> Option<SharedBuyerView> {
    self.existing_buyer_at(user_id, Instant::now())
  }

  pub fn existing_buyer_at(&self, user_id: Uuid, now: Instant) -> Option<SharedBuyerView> {
    self.buyers.existing(user_id, now, self.limits.idle_timeout)
  }

  /// The seller's view if one is open. Never opens a new session.
  pub fn existing_seller(&self, user_id: Uuid) -> Option<SharedSellerView> {
    self.existing_seller_at(user_id, Instant::now())
  }

  pub fn existing_seller_at(&self, user_id: Uuid, now: Instant) -> Option<SharedSellerView> {
    self.sellers.existing(user_id, now, self.limits.idle_timeout)
  }

  pub fn len(&self) -> usize {
    self.buyers.len() + self.sellers.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

#[derive(Clone)]
pub struct AppState {
  pub store: Arc<dyn RemoteStore>,
  pub config: Arc<AppConfig>, // Share loaded config
  pub sessions: Arc<SessionRegistry>,
}

impl AppState {
  pub fn new(store: Arc<dyn RemoteStore>, config: Arc<AppConfig>) -> Self {
    let sessions = Arc::new(SessionRegistry::from_config(&config));
    Self { store, config, sessions }
  }

  pub fn buyer_view(&self, principal: Principal) -> SharedBuyerView {
    self.sessions.buyer(principal, &self.store, &self.config)
  }

  pub fn seller_view(&self, principal: Principal) -> SharedSellerView {
    self.sessions.seller(principal, &self.store, &self.config)
  }

  pub fn existing_buyer_view(&self, principal: Principal) -> Option<SharedBuyerView> {
    self.sessions.existing_buyer(principal.user_id)
  }

  pub fn existing_seller_view(&self, principal: Principal) -> Option<SharedSellerView> {
    self.sessions.existing_seller(principal.user_id)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::memory::InMemoryStore;

  fn memory_config() -> AppConfig {
    AppConfig::from_lookup(|name| (name == "STORE_BACKEND").then(|| "memory".to_string())).unwrap()
  }

  fn memory_store() -> Arc<dyn RemoteStore> {
    Arc::new(InMemoryStore::new())
  }

  #[test]
  fn same_principal_shares_one_view() {
    let (config, store) = (memory_config(), memory_store());
    let registry = SessionRegistry::new(Duration::from_secs(60), 10);
    let buyer = Principal::buyer(Uuid::new_v4());

    let first = registry.buyer(buyer, &store, &config);
    let second = registry.buyer(buyer, &store, &config);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(registry.len(), 1);
  }

  #[test]
  fn idle_sessions_are_evicted_on_lookup() {
    let (config, store) = (memory_config(), memory_store());
    let registry = SessionRegistry::new(Duration::from_secs(60), 100);
    let start = Instant::now();

    for _ in 0..5 {
      drop(registry.buyer_at(Principal::buyer(Uuid::new_v4()), &store, &config, start));
    }
    let seller = Principal::seller(Uuid::new_v4());
    drop(registry.seller_at(seller, &store, &config, start));
    assert_eq!(registry.len(), 6);

    let later = start + Duration::from_secs(61);
    drop(registry.buyer_at(Principal::buyer(Uuid::new_v4()), &store, &config, later));
    assert_eq!(registry.len(), 2, "idle buyers go, the seller map is swept on its next lookup");
    assert!(registry.existing_seller_at(seller.user_id, later).is_none());
    assert_eq!(registry.len(), 1);
  }

  #[test]
  fn touching_a_session_keeps_it_alive() {
    let (config, store) = (memory_config(), memory_store());
    let registry = SessionRegistry::new(Duration::from_secs(60), 100);
    let buyer = Principal::buyer(Uuid::new_v4());
    let start = Instant::now();

    let first = registry.buyer_at(buyer, &store, &config, start);
    let first_ptr = Arc::as_ptr(&first);
    drop(first);
    registry.existing_buyer_at(buyer.user_id, start + Duration::from_secs(45));
    let again = registry.buyer_at(buyer, &store, &config, start + Duration::from_secs(90));
    assert_eq!(Arc::as_ptr(&again), first_ptr);
  }

  #[test]
  fn many_distinct_ids_stay_within_the_cap() {
    let (config, store) = (memory_config(), memory_store());
    let registry = SessionRegistry::new(Duration::from_secs(3600), 50);
    let now = Instant::now();

    for i in 0..10_000u64 {
      let at = now + Duration::from_millis(i);
      drop(registry.buyer_at(Principal::buyer(Uuid::new_v4()), &store, &config, at));
    }
    assert_eq!(registry.len(), 50);
  }

  #[test]
  fn busy_sessions_survive_eviction() {
    let (config, store) = (memory_config(), memory_store());
    let registry = SessionRegistry::new(Duration::from_secs(60), 1);
    let start = Instant::now();
    let busy = Principal::buyer(Uuid::new_v4());

    let held = registry.buyer_at(busy, &store, &config, start);
    let later = start + Duration::from_secs(600);
    drop(registry.buyer_at(Principal::buyer(Uuid::new_v4()), &store, &config, later));

    let found = registry.existing_buyer_at(busy.user_id, later).unwrap();
    assert!(Arc::ptr_eq(&found, &held));
  }

  #[test]
  fn existing_lookup_never_opens_a_session() {
    let registry = SessionRegistry::new(Duration::from_secs(60), 10);
    for _ in 0..100 {
      assert!(registry.existing_buyer(Uuid::new_v4()).is_none());
      assert!(registry.existing_seller(Uuid::new_v4()).is_none());
    }
    assert!(registry.is_empty());
  }
}
