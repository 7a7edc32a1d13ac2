// marketplace/src/web/handlers/mod.rs

pub mod buyer_handlers;
pub mod pages;
pub mod seller_handlers;

use serde::Deserialize;
use serde_json::Value;

/// Body of the quantity selector endpoints. Accepts a JSON number or the raw
/// text of an input field; the clamping rules see it as text either way.
#[derive(Debug, Deserialize)]
pub struct QuantityPayload {
  pub quantity: Value,
}

impl QuantityPayload {
  pub fn raw(&self) -> String {
    match &self.quantity {
      Value::String(s) => s.clone(),
      Value::Number(n) => n.to_string(),
      _ => String::new(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn quantity_payload_accepts_numbers_and_text() {
    let number: QuantityPayload = serde_json::from_str(r#"{"quantity": 3}"#).unwrap();
    let text: QuantityPayload = serde_json::from_str(r#"{"quantity": "3kg"}"#).unwrap();
    let null: QuantityPayload = serde_json::from_str(r#"{"quantity": null}"#).unwrap();
    assert_eq!(number.raw(), "3");
    assert_eq!(text.raw(), "3kg");
    assert_eq!(null.raw(), "");
  }
}
