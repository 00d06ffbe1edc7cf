//! Validation and input normalization utilities for the Retail POS backend
//!
//! Handlers trim strings, turn blank optional fields into `None` and reject
//! out-of-range values before anything reaches the database.

use rust_decimal::Decimal;
use validator::ValidationError;

use crate::models::MAX_MONEY;

// ============================================================================
// Normalization
// ============================================================================

/// Trim a required string
pub fn normalize_required(value: &str) -> String {
    value.trim().to_string()
}

/// Trim an optional string; blank becomes `None`
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Emails are matched case-insensitively
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// ============================================================================
// Field Validations
// ============================================================================

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace) =>
        {
            Ok(())
        }
        _ => Err("Invalid email format"),
    }
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters");
    }
    if password.len() > 72 {
        // bcrypt ignores everything past 72 bytes
        return Err("Password must be at most 72 characters");
    }
    Ok(())
}

/// Validate a required name-like field
pub fn validate_name(name: &str) -> Result<(), &'static str> {
    let name = name.trim();
    if name.is_empty() {
        return Err("Name cannot be empty");
    }
    if name.chars().count() > 200 {
        return Err("Name must be at most 200 characters");
    }
    Ok(())
}

/// Validate a barcode as typed by hand or read by a scanner
pub fn validate_barcode(barcode: &str) -> Result<(), &'static str> {
    if barcode.is_empty() || barcode.len() > 64 {
        return Err("Barcode must be between 1 and 64 characters");
    }
    if !barcode.chars().all(|c| c.is_ascii_graphic()) {
        return Err("Barcode may only contain printable ASCII characters");
    }
    Ok(())
}

/// Validate that an amount fits a NUMERIC(12,2) money column
pub fn validate_money_range(amount: Decimal) -> Result<(), &'static str> {
    if amount.abs() > MAX_MONEY {
        return Err("Amount must be between -9999999999.99 and 9999999999.99");
    }
    Ok(())
}

/// Validate a money amount that may be zero (prices)
pub fn validate_non_negative(amount: Decimal) -> Result<(), &'static str> {
    if amount < Decimal::ZERO {
        return Err("Amount cannot be negative");
    }
    validate_money_range(amount)
}

/// Validate a money amount that must be strictly positive (payments, expenses)
pub fn validate_positive(amount: Decimal) -> Result<(), &'static str> {
    if amount <= Decimal::ZERO {
        return Err("Amount must be greater than zero");
    }
    validate_money_range(amount)
}

/// Validate a phone number loosely: digits plus common separators
pub fn validate_phone(phone: &str) -> Result<(), &'static str> {
    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
    let allowed = phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')' | '.'));
    if !allowed || !(6..=15).contains(&digits) {
        return Err("Invalid phone number format");
    }
    Ok(())
}

// ============================================================================
// Adapters for `#[validate(custom = "...")]`
// ============================================================================

fn to_validation_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

pub fn check_password(password: &str) -> Result<(), ValidationError> {
    validate_password(password).map_err(|m| to_validation_error("password", m))
}

pub fn check_name(name: &str) -> Result<(), ValidationError> {
    validate_name(name).map_err(|m| to_validation_error("name", m))
}

pub fn check_barcode(barcode: &str) -> Result<(), ValidationError> {
    validate_barcode(barcode.trim()).map_err(|m| to_validation_error("barcode", m))
}

pub fn check_phone(phone: &str) -> Result<(), ValidationError> {
    validate_phone(phone.trim()).map_err(|m| to_validation_error("phone", m))
}

pub fn check_non_negative(amount: &Decimal) -> Result<(), ValidationError> {
    validate_non_negative(*amount).map_err(|m| to_validation_error("non_negative", m))
}

pub fn check_positive(amount: &Decimal) -> Result<(), ValidationError> {
    validate_positive(*amount).map_err(|m| to_validation_error("positive", m))
}

pub fn check_money_range(amount: &Decimal) -> Result<(), ValidationError> {
    validate_money_range(*amount).map_err(|m| to_validation_error("money_range", m))
}
