//! Business logic services for the Retail POS backend

pub mod auth;
pub mod customer;
pub mod expense;
pub mod party;
pub mod product;
pub mod reporting;
pub mod sale;
pub mod supplier;

pub use auth::AuthService;
pub use customer::CustomerService;
pub use expense::ExpenseService;
pub use product::ProductService;
pub use reporting::ReportingService;
pub use sale::SaleService;
pub use supplier::SupplierService;

use shared::SortOrder;

use crate::error::{AppError, AppResult};

/// Wrap a user search term for `ILIKE`, escaping wildcard characters
pub(crate) fn contains_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for c in search.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Resolve a `sort` query value against a whitelist of (key, column) pairs.
/// Only columns from the whitelist ever reach the SQL text.
pub(crate) fn sort_column(
    requested: Option<&str>,
    allowed: &[(&str, &'static str)],
    default: &'static str,
) -> AppResult<&'static str> {
    let Some(key) = requested.map(str::trim).filter(|k| !k.is_empty()) else {
        return Ok(default);
    };
    allowed
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, column)| *column)
        .ok_or_else(|| {
            let keys: Vec<&str> = allowed.iter().map(|(name, _)| *name).collect();
            AppError::validation(
                "sort",
                format!("Unknown sort key '{}'; expected one of: {}", key, keys.join(", ")),
            )
        })
}

/// Parse an `order` query value (`asc` / `desc`)
pub(crate) fn sort_order(requested: Option<&str>, default: SortOrder) -> AppResult<SortOrder> {
    match requested.map(|o| o.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") => Ok(default),
        Some("asc") => Ok(SortOrder::Asc),
        Some("desc") => Ok(SortOrder::Desc),
        Some(other) => Err(AppError::validation(
            "order",
            format!("Unknown order '{}'; expected asc or desc", other),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLUMNS: &[(&str, &str)] = &[("name", "p.name"), ("price", "p.sell_price")];

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern(" milk "), "%milk%");
        assert_eq!(contains_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(contains_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn test_sort_column_whitelist() {
        assert_eq!(sort_column(None, COLUMNS, "p.name").unwrap(), "p.name");
        assert_eq!(sort_column(Some("price"), COLUMNS, "p.name").unwrap(), "p.sell_price");
        assert!(matches!(
            sort_column(Some("name; DROP TABLE products"), COLUMNS, "p.name"),
            Err(AppError::Validation { .. })
        ));
    }

    #[test]
    fn test_sort_order() {
        assert_eq!(sort_order(None, SortOrder::Desc).unwrap(), SortOrder::Desc);
        assert_eq!(sort_order(Some("ASC"), SortOrder::Desc).unwrap(), SortOrder::Asc);
        assert!(sort_order(Some("sideways"), SortOrder::Asc).is_err());
    }
}
