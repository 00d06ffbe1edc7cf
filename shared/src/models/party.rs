//! Customers and suppliers share the same running-balance bookkeeping

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{round_money, MAX_MONEY};

/// Which side of a running balance a party sits on
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PartyKind {
    /// Balance is what the customer owes the shop
    Customer,
    /// Balance is what the shop owes the supplier
    Supplier,
}

impl PartyKind {
    pub fn table(&self) -> &'static str {
        match self {
            PartyKind::Customer => "customers",
            PartyKind::Supplier => "suppliers",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PartyKind::Customer => "Customer",
            PartyKind::Supplier => "Supplier",
        }
    }
}

/// Balance after a payment. Overpayment leaves a negative balance (credit).
/// `None` when the result does not fit a money column.
pub fn balance_after_payment(balance: Decimal, amount: Decimal) -> Option<Decimal> {
    balance
        .checked_sub(amount)
        .map(round_money)
        .filter(|b| b.abs() <= MAX_MONEY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_after_payment() {
        assert_eq!(
            balance_after_payment(Decimal::new(10000, 2), Decimal::new(2550, 2)),
            Some(Decimal::new(7450, 2))
        );
        assert_eq!(
            balance_after_payment(Decimal::new(1000, 2), Decimal::new(1500, 2)),
            Some(Decimal::new(-500, 2))
        );
    }

    #[test]
    fn test_balance_after_payment_out_of_range() {
        assert_eq!(balance_after_payment(Decimal::MIN, Decimal::MAX), None);
        assert_eq!(balance_after_payment(-MAX_MONEY, Decimal::new(1, 2)), None);
    }
}
