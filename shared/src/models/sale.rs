//! Sale models and checkout arithmetic
//!
//! Totals are computed here, not in SQL, so the server and the browser
//! checkout screen agree to the cent:
//!
//! ```text
//! line.total     = quantity × unit_price
//! sale.subtotal  = Σ line.total
//! sale.total     = subtotal + tax − discount
//! ```

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Money is stored as NUMERIC(12,2)
pub const MONEY_SCALE: u32 = 2;

/// Largest amount a NUMERIC(12,2) column holds: 9_999_999_999.99
pub const MAX_MONEY: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, MONEY_SCALE);

/// Round a money amount to storage precision
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp(MONEY_SCALE)
}

/// How a sale was paid
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Card,
    Mobile,
    /// Charged to the customer's running balance
    Credit,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Mobile => "mobile",
            PaymentMethod::Credit => "credit",
        }
    }

    /// Credit sales must name a customer whose balance absorbs the total
    pub fn requires_customer(&self) -> bool {
        matches!(self, PaymentMethod::Credit)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = SaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "card" => Ok(PaymentMethod::Card),
            "mobile" => Ok(PaymentMethod::Mobile),
            "credit" => Ok(PaymentMethod::Credit),
            other => Err(SaleError::UnknownPaymentMethod(other.to_string())),
        }
    }
}

/// Errors raised while assembling a sale from a checkout payload
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SaleError {
    #[error("A sale must contain at least one item")]
    EmptyItems,

    #[error("Quantity for product {0} must be greater than zero")]
    InvalidQuantity(Uuid),

    #[error("Price for product {0} cannot be negative")]
    NegativePrice(Uuid),

    #[error("Product {0} appears more than once with different prices")]
    ConflictingPrice(Uuid),

    #[error("Quantity for product {0} is too large")]
    QuantityOverflow(Uuid),

    #[error("Discount cannot be negative")]
    NegativeDiscount,

    #[error("Tax cannot be negative")]
    NegativeTax,

    #[error("Discount exceeds the sale amount")]
    NegativeTotal,

    #[error("Unknown payment method: {0}")]
    UnknownPaymentMethod(String),

    #[error("Amount for {0} exceeds the maximum of 9999999999.99")]
    AmountTooLarge(&'static str),
}

impl SaleError {
    /// Payload field the error refers to
    pub fn field(&self) -> &'static str {
        match self {
            SaleError::EmptyItems
            | SaleError::InvalidQuantity(_)
            | SaleError::NegativePrice(_)
            | SaleError::ConflictingPrice(_)
            | SaleError::QuantityOverflow(_) => "items",
            SaleError::NegativeDiscount | SaleError::NegativeTotal => "discount",
            SaleError::NegativeTax => "tax",
            SaleError::UnknownPaymentMethod(_) => "payment_method",
            SaleError::AmountTooLarge(field) => field,
        }
    }
}

/// One item as requested at checkout; the price is optional and falls back
/// to the product's sell price on the server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestedItem {
    pub product_id: Uuid,
    pub quantity: i32,
    #[serde(default, alias = "unit_price")]
    pub price: Option<Decimal>,
}

/// A priced sale line
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SaleLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl SaleLine {
    pub fn new(product_id: Uuid, quantity: i32, unit_price: Decimal) -> Self {
        Self {
            product_id,
            quantity,
            unit_price: round_money(unit_price),
        }
    }

    pub fn total(&self) -> Result<Decimal, SaleError> {
        line_total(self.quantity, self.unit_price)
    }
}

/// quantity × unit price, rounded to money precision
pub fn line_total(quantity: i32, unit_price: Decimal) -> Result<Decimal, SaleError> {
    Decimal::from(quantity)
        .checked_mul(unit_price)
        .map(round_money)
        .and_then(within_money_range)
        .ok_or(SaleError::AmountTooLarge("items"))
}

fn within_money_range(amount: Decimal) -> Option<Decimal> {
    (amount <= MAX_MONEY).then_some(amount)
}

/// Aggregate figures for a sale
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SaleTotals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl SaleTotals {
    /// Compute totals for priced lines. Fails on an empty sale, negative
    /// adjustments, or a discount larger than subtotal + tax.
    pub fn compute(lines: &[SaleLine], discount: Decimal, tax: Decimal) -> Result<Self, SaleError> {
        if lines.is_empty() {
            return Err(SaleError::EmptyItems);
        }
        if discount < Decimal::ZERO {
            return Err(SaleError::NegativeDiscount);
        }
        if tax < Decimal::ZERO {
            return Err(SaleError::NegativeTax);
        }

        if discount > MAX_MONEY {
            return Err(SaleError::AmountTooLarge("discount"));
        }
        if tax > MAX_MONEY {
            return Err(SaleError::AmountTooLarge("tax"));
        }

        let discount = round_money(discount);
        let tax = round_money(tax);
        let subtotal = lines.iter().try_fold(Decimal::ZERO, |acc, line| {
            acc.checked_add(line.total()?)
                .and_then(within_money_range)
                .ok_or(SaleError::AmountTooLarge("items"))
        })?;
        let total = subtotal
            .checked_add(tax)
            .and_then(|amount| amount.checked_sub(discount))
            .and_then(within_money_range)
            .ok_or(SaleError::AmountTooLarge("tax"))?;

        if total < Decimal::ZERO {
            return Err(SaleError::NegativeTotal);
        }

        Ok(Self {
            subtotal,
            discount,
            tax,
            total,
        })
    }
}

/// Validate requested items and merge repeated products.
///
/// Repeated product ids are folded into one line (quantities summed) when
/// they carry the same price, or both omit it. The first occurrence keeps
/// its position.
pub fn merge_requested_items(items: &[RequestedItem]) -> Result<Vec<RequestedItem>, SaleError> {
    if items.is_empty() {
        return Err(SaleError::EmptyItems);
    }

    let mut merged: Vec<RequestedItem> = Vec::with_capacity(items.len());
    for item in items {
        if item.quantity <= 0 {
            return Err(SaleError::InvalidQuantity(item.product_id));
        }
        if matches!(item.price, Some(p) if p < Decimal::ZERO) {
            return Err(SaleError::NegativePrice(item.product_id));
        }
        if matches!(item.price, Some(p) if p > MAX_MONEY) {
            return Err(SaleError::AmountTooLarge("items"));
        }
        let price = item.price.map(round_money);

        match merged.iter_mut().find(|m| m.product_id == item.product_id) {
            Some(existing) => {
                if existing.price != price {
                    return Err(SaleError::ConflictingPrice(item.product_id));
                }
                existing.quantity = existing
                    .quantity
                    .checked_add(item.quantity)
                    .ok_or(SaleError::QuantityOverflow(item.product_id))?;
            }
            None => merged.push(RequestedItem {
                product_id: item.product_id,
                quantity: item.quantity,
                price,
            }),
        }
    }

    Ok(merged)
}
