//! Expense models

/// Category used when an expense is recorded without one
pub const DEFAULT_EXPENSE_CATEGORY: &str = "general";

/// Categories are compared case-insensitively, so store them lower-cased
pub fn normalize_category(category: Option<&str>) -> String {
    category
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_lowercase)
        .unwrap_or_else(|| DEFAULT_EXPENSE_CATEGORY.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_category() {
        assert_eq!(normalize_category(Some("  Rent ")), "rent");
        assert_eq!(normalize_category(Some("   ")), DEFAULT_EXPENSE_CATEGORY);
        assert_eq!(normalize_category(None), DEFAULT_EXPENSE_CATEGORY);
    }
}
