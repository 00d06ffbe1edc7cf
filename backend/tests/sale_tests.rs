//! Sale arithmetic tests
//!
//! Property-based and unit tests for checkout totals and item merging:
//! - total = Σ(quantity × unit_price) + tax − discount, exact to the cent
//! - stock never goes negative after a decrement
//! - repeated products fold into one line

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    apply_stock_delta, line_total, merge_requested_items, PaymentMethod, RequestedItem,
    SaleError, SaleLine, SaleTotals, MAX_MONEY,
};
use std::str::FromStr;
use uuid::Uuid;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Three line receipt with discount and tax
    #[test]
    fn test_receipt_totals() {
        let lines = vec![
            SaleLine::new(Uuid::new_v4(), 3, dec("1.99")),
            SaleLine::new(Uuid::new_v4(), 1, dec("12.50")),
            SaleLine::new(Uuid::new_v4(), 2, dec("0.35")),
        ];

        let totals = SaleTotals::compute(&lines, dec("2.00"), dec("1.37")).unwrap();

        assert_eq!(totals.subtotal, dec("19.17"));
        assert_eq!(totals.total, dec("18.54"));
    }

    /// 0.1 + 0.2 stays 0.30 in decimal arithmetic
    #[test]
    fn test_no_float_drift() {
        let lines = vec![
            SaleLine::new(Uuid::new_v4(), 1, dec("0.10")),
            SaleLine::new(Uuid::new_v4(), 1, dec("0.20")),
        ];
        let totals = SaleTotals::compute(&lines, Decimal::ZERO, Decimal::ZERO).unwrap();
        assert_eq!(totals.total, dec("0.30"));
    }

    #[test]
    fn test_discount_may_equal_amount() {
        let lines = vec![SaleLine::new(Uuid::new_v4(), 1, dec("5.00"))];
        let totals = SaleTotals::compute(&lines, dec("5.00"), Decimal::ZERO).unwrap();
        assert_eq!(totals.total, Decimal::ZERO);

        assert_eq!(
            SaleTotals::compute(&lines, dec("5.01"), Decimal::ZERO),
            Err(SaleError::NegativeTotal)
        );
    }

    #[test]
    fn test_empty_sale_rejected() {
        assert_eq!(
            SaleTotals::compute(&[], Decimal::ZERO, Decimal::ZERO),
            Err(SaleError::EmptyItems)
        );
        assert_eq!(merge_requested_items(&[]), Err(SaleError::EmptyItems));
    }

    #[test]
    fn test_merge_keeps_first_position() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let items = vec![
            RequestedItem { product_id: a, quantity: 1, price: None },
            RequestedItem { product_id: b, quantity: 2, price: Some(dec("3.00")) },
            RequestedItem { product_id: a, quantity: 4, price: None },
        ];

        let merged = merge_requested_items(&items).unwrap();

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].product_id, a);
        assert_eq!(merged[0].quantity, 5);
        assert_eq!(merged[1].product_id, b);
    }

    #[test]
    fn test_merge_rejects_conflicting_prices() {
        let a = Uuid::new_v4();
        let items = vec![
            RequestedItem { product_id: a, quantity: 1, price: Some(dec("1.00")) },
            RequestedItem { product_id: a, quantity: 1, price: None },
        ];
        assert_eq!(merge_requested_items(&items), Err(SaleError::ConflictingPrice(a)));
    }

    /// Amounts beyond NUMERIC(12,2) are a validation error, not a panic
    #[test]
    fn test_amounts_beyond_storage_rejected() {
        let huge = dec("79228162514264337593543950335");
        assert_eq!(line_total(i32::MAX, huge), Err(SaleError::AmountTooLarge("items")));

        let lines = vec![
            SaleLine::new(Uuid::new_v4(), 1, MAX_MONEY),
            SaleLine::new(Uuid::new_v4(), 1, MAX_MONEY),
        ];
        let err = SaleTotals::compute(&lines, Decimal::ZERO, Decimal::ZERO).unwrap_err();
        assert_eq!(err.field(), "items");

        let lines = vec![SaleLine::new(Uuid::new_v4(), 1, dec("1.00"))];
        let err = SaleTotals::compute(&lines, Decimal::ZERO, huge).unwrap_err();
        assert_eq!(err.field(), "tax");
    }

    #[test]
    fn test_payment_methods() {
        assert_eq!(PaymentMethod::from_str("Card").unwrap(), PaymentMethod::Card);
        assert!(PaymentMethod::Credit.requires_customer());
        assert!(!PaymentMethod::Cash.requires_customer());
        assert!(PaymentMethod::from_str("cheque").is_err());
        assert_eq!(PaymentMethod::default(), PaymentMethod::Cash);
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Prices between 0.00 and 9999.99
    fn price_strategy() -> impl Strategy<Value = Decimal> {
        (0i64..1_000_000).prop_map(|cents| Decimal::new(cents, 2))
    }

    fn quantity_strategy() -> impl Strategy<Value = i32> {
        1i32..500
    }

    fn line_strategy() -> impl Strategy<Value = SaleLine> {
        (quantity_strategy(), price_strategy())
            .prop_map(|(quantity, price)| SaleLine::new(Uuid::new_v4(), quantity, price))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// total = Σ(quantity × price) + tax − discount
        #[test]
        fn prop_total_matches_line_sum(
            lines in prop::collection::vec(line_strategy(), 1..20),
            tax in price_strategy(),
            discount_share in 0u32..=100,
        ) {
            let expected_subtotal: Decimal = lines
                .iter()
                .map(|l| Decimal::from(l.quantity) * l.unit_price)
                .sum();
            // Any discount up to subtotal + tax is valid
            let discount = ((expected_subtotal + tax) * Decimal::from(discount_share)
                / Decimal::from(100))
                .round_dp(2)
                .min(expected_subtotal + tax);

            let totals = SaleTotals::compute(&lines, discount, tax).unwrap();

            prop_assert_eq!(totals.subtotal, expected_subtotal);
            prop_assert_eq!(totals.total, expected_subtotal + tax - discount);
            prop_assert!(totals.total >= Decimal::ZERO);
            prop_assert!(totals.total.scale() <= 2);
        }

        /// Line totals never carry more than two decimal places
        #[test]
        fn prop_line_total_exact(quantity in quantity_strategy(), price in price_strategy()) {
            let total = line_total(quantity, price).unwrap();
            prop_assert_eq!(total, Decimal::from(quantity) * price);
            prop_assert!(total.scale() <= 2);
        }

        /// A decrement is applied only when stock covers it
        #[test]
        fn prop_stock_never_negative(stock in 0i32..10_000, requested in 1i32..10_000) {
            match apply_stock_delta(stock, -requested) {
                Some(remaining) => {
                    prop_assert!(requested <= stock);
                    prop_assert_eq!(remaining, stock - requested);
                }
                None => prop_assert!(requested > stock),
            }
        }

        /// Merging preserves the total quantity per product
        #[test]
        fn prop_merge_preserves_quantities(
            picks in prop::collection::vec((0usize..4, 1i32..50), 1..30)
        ) {
            let products: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
            let items: Vec<RequestedItem> = picks
                .iter()
                .map(|(idx, quantity)| RequestedItem {
                    product_id: products[*idx],
                    quantity: *quantity,
                    price: None,
                })
                .collect();

            let merged = merge_requested_items(&items).unwrap();

            for product_id in &products {
                let requested: i32 = items
                    .iter()
                    .filter(|i| i.product_id == *product_id)
                    .map(|i| i.quantity)
                    .sum();
                let in_merged: i32 = merged
                    .iter()
                    .filter(|i| i.product_id == *product_id)
                    .map(|i| i.quantity)
                    .sum();
                prop_assert_eq!(requested, in_merged);
                prop_assert!(merged.iter().filter(|i| i.product_id == *product_id).count() <= 1);
            }
        }
    }
}
