//! Product catalogue models

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Threshold applied when a product is created without one
pub const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 10;

/// Days ahead used by the expiring-products listing when none is given
pub const DEFAULT_EXPIRY_WINDOW_DAYS: i64 = 30;

/// Stock level classification shown next to each product
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
}

impl StockStatus {
    pub fn classify(quantity: i32, low_stock_threshold: i32) -> Self {
        if quantity <= 0 {
            StockStatus::OutOfStock
        } else if quantity <= low_stock_threshold {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }
}

/// Whether an expiry date falls on or before `today + days`
pub fn expires_within(expiry_date: Option<NaiveDate>, today: NaiveDate, days: i64) -> bool {
    match expiry_date {
        Some(date) => date <= today + Duration::days(days),
        None => false,
    }
}

/// Apply a signed stock adjustment, refusing to go below zero
pub fn apply_stock_delta(quantity: i32, delta: i32) -> Option<i32> {
    quantity.checked_add(delta).filter(|q| *q >= 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_status() {
        assert_eq!(StockStatus::classify(0, 10), StockStatus::OutOfStock);
        assert_eq!(StockStatus::classify(10, 10), StockStatus::LowStock);
        assert_eq!(StockStatus::classify(11, 10), StockStatus::InStock);
    }

    #[test]
    fn test_expires_within() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let soon = NaiveDate::from_ymd_opt(2024, 6, 20).unwrap();
        let later = NaiveDate::from_ymd_opt(2024, 9, 1).unwrap();
        let past = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();

        assert!(expires_within(Some(soon), today, 30));
        assert!(!expires_within(Some(later), today, 30));
        assert!(expires_within(Some(past), today, 30));
        assert!(!expires_within(None, today, 30));
    }

    #[test]
    fn test_apply_stock_delta() {
        assert_eq!(apply_stock_delta(5, -5), Some(0));
        assert_eq!(apply_stock_delta(5, -6), None);
        assert_eq!(apply_stock_delta(5, 10), Some(15));
        assert_eq!(apply_stock_delta(i32::MAX, 1), None);
    }
}
