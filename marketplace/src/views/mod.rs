// marketplace/src/views/mod.rs

//! View controllers: per-principal caches of remote rows plus the transient
//! state of a dashboard (search term, quantity selectors, cart).
//!
//! Every mutation goes to the store first and, on success, the affected
//! slice of the cache is re-fetched. Failures are returned to the caller and
//! also posted to the view's notification slot.

pub mod buyer;
pub mod cart;
pub mod seller;

pub use buyer::{BuyerSnapshot, BuyerView, CampaignForm};
pub use cart::{Cart, CartLine};
pub use seller::{FoodItemForm, SellerSnapshot, SellerView};

use serde::Serialize;
use tracing::error;

use crate::errors::Result;
use crate::models::Campaign;
use crate::notification::Notifier;

/// Integer prefix of a form value: optional sign, then leading digits.
/// `"3kg"` → 3, `"abc"` → None.
pub fn parse_leading_int(raw: &str) -> Option<i64> {
  let s = raw.trim_start();
  let (negative, digits) = match s.as_bytes().first() {
    Some(b'-') => (true, &s[1..]),
    Some(b'+') => (false, &s[1..]),
    _ => (false, s),
  };
  let end = digits.bytes().take_while(|b| b.is_ascii_digit()).count();
  if end == 0 {
    return None;
  }
  // Too many digits saturates rather than failing.
  let value = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
  Some(if negative { -value } else { value })
}

/// Quantity selector rule: `[1, max]`. Zero, negative and non-numeric input
/// resolve to 1. When `max < 1` the result is still 1; callers decide whether
/// the target can take anything at all.
pub fn clamp_quantity(raw: &str, max: i32) -> i32 {
  let upper = i64::from(max.max(1));
  let value = parse_leading_int(raw).filter(|v| *v >= 1).unwrap_or(1);
  value.min(upper) as i32
}

/// Logs a failed operation and posts it to the banner, then hands the result back.
pub(crate) fn surface<T>(notifier: &mut Notifier, action: &str, result: Result<T>) -> Result<T> {
  if let Err(e) = &result {
    error!(action, error = %e, "View operation failed.");
    notifier.error(format!("{}: {}", action, e.user_message()));
  }
  result
}

/// A campaign as a dashboard card shows it.
#[derive(Debug, Clone, Serialize)]
pub struct CampaignCard {
  #[serde(flatten)]
  pub campaign: Campaign,
  pub own: bool,
  pub remaining: i32,
  /// `None` when the campaign has no target.
  pub progress: Option<f64>,
  pub selected_quantity: Option<i32>,
}

impl CampaignCard {
  pub fn new(campaign: &Campaign, own: bool, selected_quantity: Option<i32>) -> Self {
    Self {
      campaign: campaign.clone(),
      own,
      remaining: campaign.remaining(),
      progress: campaign.progress_fraction(),
      selected_quantity,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn leading_integer_prefix() {
    assert_eq!(parse_leading_int("3"), Some(3));
    assert_eq!(parse_leading_int("  12kg"), Some(12));
    assert_eq!(parse_leading_int("-4"), Some(-4));
    assert_eq!(parse_leading_int("abc"), None);
    assert_eq!(parse_leading_int(""), None);
    assert_eq!(parse_leading_int("-"), None);
  }

  #[test]
  fn quantities_clamp_into_one_to_available() {
    assert_eq!(clamp_quantity("3", 10), 3);
    assert_eq!(clamp_quantity("0", 10), 1);
    assert_eq!(clamp_quantity("", 10), 1);
    assert_eq!(clamp_quantity("lots", 10), 1);
    assert_eq!(clamp_quantity("-7", 10), 1);
    assert_eq!(clamp_quantity("25", 10), 10);
    assert_eq!(clamp_quantity("99999999999999999999", 10), 10);
    assert_eq!(clamp_quantity("5", 0), 1);
  }
}
