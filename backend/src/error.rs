//! Error handling for the Retail POS backend
//!
//! Every error leaves the server as the standard envelope:
//! `{ "success": false, "message": "...", "code": "...", "field": "..." }`

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::SaleError;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid token")]
    InvalidToken,

    #[error("Insufficient permissions")]
    Forbidden,

    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Business logic errors
    #[error("Insufficient stock for {product}: {available} available, {requested} requested")]
    InsufficientStock {
        product: String,
        available: i32,
        requested: i32,
    },

    // Database errors
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    Anyhow(#[from] anyhow::Error),
}

impl AppError {
    /// Shorthand for a field-level validation failure
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::Unauthorized(_) | AppError::InvalidToken => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DuplicateEntry(_)
            | AppError::Conflict(_)
            | AppError::InsufficientStock { .. } => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Internal(_) | AppError::Anyhow(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Error response structure
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorResponse {
    fn new(code: &str, message: impl Into<String>, field: Option<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            code: code.to_string(),
            field,
        }
    }
}

/// The body a 500 would carry with the underlying error text. Attached to
/// the response extensions; only the development-mode layer sends it.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub ErrorResponse);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            AppError::InvalidCredentials => {
                ErrorResponse::new("INVALID_CREDENTIALS", "Invalid email or password", None)
            }
            AppError::Unauthorized(msg) => ErrorResponse::new("UNAUTHORIZED", msg.clone(), None),
            AppError::InvalidToken => {
                ErrorResponse::new("INVALID_TOKEN", "Invalid or expired token", None)
            }
            AppError::Forbidden => ErrorResponse::new(
                "FORBIDDEN",
                "You do not have permission to perform this action",
                None,
            ),
            AppError::Validation { field, message } => {
                ErrorResponse::new("VALIDATION_ERROR", message.clone(), Some(field.clone()))
            }
            AppError::BadRequest(msg) => ErrorResponse::new("BAD_REQUEST", msg.clone(), None),
            AppError::DuplicateEntry(field) => ErrorResponse::new(
                "DUPLICATE_ENTRY",
                format!("A record with this {} already exists", field),
                Some(field.clone()),
            ),
            AppError::Conflict(msg) => ErrorResponse::new("CONFLICT", msg.clone(), None),
            AppError::NotFound(resource) => {
                ErrorResponse::new("NOT_FOUND", format!("{} not found", resource), None)
            }
            AppError::InsufficientStock { .. } => ErrorResponse::new(
                "INSUFFICIENT_STOCK",
                self.to_string(),
                Some("items".to_string()),
            ),
            AppError::Database(_) => {
                ErrorResponse::new("DATABASE_ERROR", "A database error occurred", None)
            }
            AppError::Internal(_) | AppError::Anyhow(_) => {
                ErrorResponse::new("INTERNAL_ERROR", "An internal server error occurred", None)
            }
        };

        let detail = match &self {
            AppError::Database(err) => Some(err.to_string()),
            AppError::Internal(msg) => Some(msg.clone()),
            AppError::Anyhow(err) => Some(format!("{:#}", err)),
            _ => None,
        }
        .map(|message| ErrorDetail(ErrorResponse::new(&body.code, message, None)));

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::debug!(status = status.as_u16(), code = %body.code, "{}", self);
        }

        let mut response = (status, Json(body)).into_response();
        if let Some(detail) = detail {
            response.extensions_mut().insert(detail);
        }
        response
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

// ============================================================================
// Conversions
// ============================================================================

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let code = db_err.code();
            if let Some(mapped) = classify_database_error(code.as_deref(), db_err.constraint()) {
                return mapped;
            }
        }
        AppError::Database(err)
    }
}

/// Map a Postgres SQLSTATE to a client error; `None` leaves it a 500
fn classify_database_error(code: Option<&str>, constraint: Option<&str>) -> Option<AppError> {
    match code? {
        // unique_violation
        "23505" => Some(AppError::DuplicateEntry(field_from_constraint(constraint))),
        // foreign_key_violation
        "23503" => Some(AppError::Conflict(
            "The record is referenced by other records".to_string(),
        )),
        // check_violation
        "23514" => Some(AppError::validation(
            field_from_constraint(constraint),
            "Value is out of the allowed range",
        )),
        // numeric_value_out_of_range: a NUMERIC(12,2) or INTEGER column overflowed
        "22003" => Some(AppError::validation(
            field_from_constraint(constraint),
            "Value is out of the allowed range",
        )),
        _ => None,
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by_key(|(field, _)| *field);

        match fields.first() {
            Some((field, errs)) => {
                let message = errs
                    .first()
                    .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| format!("Invalid value for {}", field));
                AppError::validation(*field, message)
            }
            None => AppError::BadRequest("Invalid request".to_string()),
        }
    }
}

impl From<SaleError> for AppError {
    fn from(err: SaleError) -> Self {
        AppError::validation(err.field(), err.to_string())
    }
}

/// Tables whose names prefix constraint names. Longer names that share a
/// prefix with a shorter one (`sale_items` and `sales`) come first.
const CONSTRAINT_TABLES: &[&str] = &[
    "refresh_tokens",
    "sale_items",
    "suppliers",
    "customers",
    "products",
    "expenses",
    "sales",
    "users",
];

/// Recover a column name from constraint names such as `products_barcode_key`
/// or `sale_items_quantity_check`
fn field_from_constraint(constraint: Option<&str>) -> String {
    let Some(name) = constraint else {
        return "value".to_string();
    };
    let trimmed = name
        .strip_suffix("_key")
        .or_else(|| name.strip_suffix("_check"))
        .unwrap_or(name);
    CONSTRAINT_TABLES
        .iter()
        .find_map(|table| {
            trimmed
                .strip_prefix(table)
                .and_then(|rest| rest.strip_prefix('_'))
        })
        .filter(|column| !column.is_empty())
        .unwrap_or(trimmed)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Input {
        #[validate(length(min = 1, message = "Name is required"))]
        name: String,
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::NotFound("Product".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::InsufficientStock {
                product: "Milk".into(),
                available: 1,
                requested: 2
            }
            .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Internal("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_field_from_constraint() {
        assert_eq!(field_from_constraint(Some("users_email_key")), "email");
        assert_eq!(field_from_constraint(Some("products_barcode_key")), "barcode");
        assert_eq!(field_from_constraint(Some("products_quantity_check")), "quantity");
        assert_eq!(
            field_from_constraint(Some("products_low_stock_threshold_check")),
            "low_stock_threshold"
        );
        assert_eq!(field_from_constraint(None), "value");
    }

    #[test]
    fn test_field_from_constraint_multi_word_tables() {
        assert_eq!(field_from_constraint(Some("sale_items_quantity_check")), "quantity");
        assert_eq!(
            field_from_constraint(Some("sale_items_unit_price_check")),
            "unit_price"
        );
        assert_eq!(
            field_from_constraint(Some("refresh_tokens_token_hash_key")),
            "token_hash"
        );
        assert_eq!(field_from_constraint(Some("sales_discount_check")), "discount");
        assert_eq!(field_from_constraint(Some("expenses_amount_check")), "amount");
        assert_eq!(field_from_constraint(Some("orphan_check")), "orphan");
    }

    #[test]
    fn test_classify_database_error() {
        assert!(matches!(
            classify_database_error(Some("23505"), Some("products_barcode_key")),
            Some(AppError::DuplicateEntry(ref field)) if field == "barcode"
        ));
        assert!(matches!(
            classify_database_error(Some("23503"), None),
            Some(AppError::Conflict(_))
        ));
        assert!(matches!(
            classify_database_error(Some("23514"), Some("sale_items_quantity_check")),
            Some(AppError::Validation { ref field, .. }) if field == "quantity"
        ));
        assert!(classify_database_error(Some("40001"), None).is_none());
        assert!(classify_database_error(None, None).is_none());
    }

    #[test]
    fn test_numeric_overflow_is_a_validation_error() {
        let err = classify_database_error(Some("22003"), None).unwrap();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(matches!(
            err,
            AppError::Validation { ref field, .. } if field == "value"
        ));
    }

    #[test]
    fn test_server_errors_hide_detail_in_body() {
        let response = AppError::Internal("pool exhausted".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let detail = response.extensions().get::<ErrorDetail>().unwrap();
        assert_eq!(detail.0.message, "pool exhausted");
        assert_eq!(detail.0.code, "INTERNAL_ERROR");

        let response = AppError::NotFound("Sale".into()).into_response();
        assert!(response.extensions().get::<ErrorDetail>().is_none());
    }

    #[test]
    fn test_validation_errors_convert() {
        let err = Input {
            name: String::new(),
        }
        .validate()
        .unwrap_err();

        match AppError::from(err) {
            AppError::Validation { field, message } => {
                assert_eq!(field, "name");
                assert_eq!(message, "Name is required");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_sale_error_converts_with_field() {
        match AppError::from(SaleError::NegativeTax) {
            AppError::Validation { field, .. } => assert_eq!(field, "tax"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_error_response_shape() {
        let body = ErrorResponse::new("NOT_FOUND", "Sale not found", None);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "NOT_FOUND");
        assert!(json.get("field").is_none());
    }
}
