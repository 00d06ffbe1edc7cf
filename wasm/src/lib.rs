//! WebAssembly module for the Retail POS checkout screen
//!
//! Provides client-side computation for:
//! - Cart totals (same arithmetic as the server)
//! - Stock status badges
//! - Form validation before submit
//!
//! Money crosses the boundary as decimal strings so the browser and the
//! server agree to the cent.

use std::str::FromStr;

use rust_decimal::Decimal;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    // Set up panic hook for better error messages in browser console
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn parse_money(field: &str, value: &str) -> Result<Decimal, String> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(Decimal::ZERO);
    }
    Decimal::from_str(value).map_err(|_| format!("Invalid {}: {}", field, value))
}

fn sale_totals_json(items_json: &str, discount: &str, tax: &str) -> Result<String, String> {
    let lines: Vec<SaleLine> =
        serde_json::from_str(items_json).map_err(|e| format!("Invalid items JSON: {}", e))?;
    let lines: Vec<SaleLine> = lines
        .into_iter()
        .map(|l| SaleLine::new(l.product_id, l.quantity, l.unit_price))
        .collect();

    let totals = SaleTotals::compute(
        &lines,
        parse_money("discount", discount)?,
        parse_money("tax", tax)?,
    )
    .map_err(|e| e.to_string())?;

    serde_json::to_string(&totals).map_err(|e| e.to_string())
}

/// Calculate cart totals. `items_json` is an array of
/// `{ product_id, quantity, unit_price }`; returns `{ subtotal, discount, tax, total }`.
#[wasm_bindgen]
pub fn calculate_sale_totals(items_json: &str, discount: &str, tax: &str) -> Result<String, JsValue> {
    sale_totals_json(items_json, discount, tax).map_err(|e| JsValue::from_str(&e))
}

/// quantity × unit price as a money string; empty when the price is invalid
/// or the total is too large to store
#[wasm_bindgen]
pub fn calculate_line_total(quantity: i32, unit_price: &str) -> String {
    parse_money("unit_price", unit_price)
        .ok()
        .and_then(|price| line_total(quantity, price).ok())
        .map(|total| total.to_string())
        .unwrap_or_default()
}

/// Customer or supplier balance after a payment
#[wasm_bindgen]
pub fn calculate_balance_after_payment(balance: &str, amount: &str) -> String {
    match (parse_money("balance", balance), parse_money("amount", amount)) {
        (Ok(balance), Ok(amount)) => balance_after_payment(balance, amount)
            .map(|b| b.to_string())
            .unwrap_or_default(),
        _ => String::new(),
    }
}

/// "in_stock", "low_stock" or "out_of_stock"
#[wasm_bindgen]
pub fn classify_stock_status(quantity: i32, low_stock_threshold: i32) -> String {
    match StockStatus::classify(quantity, low_stock_threshold) {
        StockStatus::InStock => "in_stock",
        StockStatus::LowStock => "low_stock",
        StockStatus::OutOfStock => "out_of_stock",
    }
    .to_string()
}

/// Validate an email address; returns the error message or an empty string
#[wasm_bindgen]
pub fn check_email(email: &str) -> String {
    validate_email(email).err().unwrap_or_default().to_string()
}

/// Validate a barcode; returns the error message or an empty string
#[wasm_bindgen]
pub fn check_barcode_format(barcode: &str) -> String {
    validate_barcode(barcode).err().unwrap_or_default().to_string()
}

/// Validate a password; returns the error message or an empty string
#[wasm_bindgen]
pub fn check_password_strength(password: &str) -> String {
    validate_password(password).err().unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ITEMS: &str = r#"[
        {"product_id": "6f1c1f0e-2b7a-4c55-9a44-3d6c0b2f9a10", "quantity": 2, "unit_price": "1.50"},
        {"product_id": "0b9d3c1a-7e0f-4f8e-8a35-9b1f2c4d5e60", "quantity": 1, "unit_price": "4.25"}
    ]"#;

    #[test]
    fn test_sale_totals() {
        let json = sale_totals_json(ITEMS, "1.00", "0.58").unwrap();
        let totals: SaleTotals = serde_json::from_str(&json).unwrap();
        assert_eq!(totals.subtotal, Decimal::from_str("7.25").unwrap());
        assert_eq!(totals.total, Decimal::from_str("6.83").unwrap());
    }

    #[test]
    fn test_sale_totals_blank_adjustments() {
        let json = sale_totals_json(ITEMS, "", " ").unwrap();
        let totals: SaleTotals = serde_json::from_str(&json).unwrap();
        assert_eq!(totals.total, totals.subtotal);
    }

    #[test]
    fn test_sale_totals_rejects_empty_cart() {
        assert!(sale_totals_json("[]", "0", "0").is_err());
        assert!(sale_totals_json("not json", "0", "0").is_err());
        assert!(sale_totals_json(ITEMS, "abc", "0").is_err());
    }

    #[test]
    fn test_line_total() {
        assert_eq!(calculate_line_total(3, "0.10"), "0.30");
        assert_eq!(calculate_line_total(3, "x"), "");
    }

    #[test]
    fn test_oversized_amounts_do_not_panic() {
        let huge = "79228162514264337593543950335";
        assert_eq!(calculate_line_total(2, huge), "");
        assert!(sale_totals_json(ITEMS, "0", huge).is_err());
        assert!(sale_totals_json(ITEMS, huge, "0").is_err());

        let items = format!(
            r#"[{{"product_id":"00000000-0000-0000-0000-000000000001","quantity":2,"unit_price":"{}"}}]"#,
            huge
        );
        assert!(sale_totals_json(&items, "0", "0").is_err());
    }

    #[test]
    fn test_balance_after_payment() {
        assert_eq!(calculate_balance_after_payment("50.00", "20.00"), "30.00");
        assert_eq!(calculate_balance_after_payment("10.00", "15.00"), "-5.00");
        assert_eq!(
            calculate_balance_after_payment("-79228162514264337593543950335", "1"),
            ""
        );
    }

    #[test]
    fn test_stock_status() {
        assert_eq!(classify_stock_status(0, 5), "out_of_stock");
        assert_eq!(classify_stock_status(5, 5), "low_stock");
        assert_eq!(classify_stock_status(6, 5), "in_stock");
    }

    #[test]
    fn test_form_checks() {
        assert_eq!(check_email("cashier@example.com"), "");
        assert!(!check_email("not-an-email").is_empty());
        assert!(!check_password_strength("").is_empty());
    }
}
