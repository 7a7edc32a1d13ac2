// marketplace/src/session.rs

//! Who a view controller acts as.

use serde::Serialize;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Buyer,
  Seller,
}

impl fmt::Display for Role {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Role::Buyer => f.write_str("buyer"),
      Role::Seller => f.write_str("seller"),
    }
  }
}

/// The identity behind a request. Buyer ids own campaigns and orders,
/// seller ids own food items and donations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Principal {
  pub user_id: Uuid,
  pub role: Role,
}

impl Principal {
  pub fn buyer(user_id: Uuid) -> Self {
    Self { user_id, role: Role::Buyer }
  }

  pub fn seller(user_id: Uuid) -> Self {
    Self { user_id, role: Role::Seller }
  }
}
