//! Customer management service

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    check_money_range, check_name, check_phone, normalize_email, normalize_optional,
    normalize_required, round_money, PartyKind, SortOrder,
};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use validator::Validate;

use super::party::{record_payment, PaymentInput, PaymentReceipt};
use super::{contains_pattern, sort_column, sort_order};
use crate::error::{AppError, AppResult};

const CUSTOMER_COLUMNS: &str =
    "id, name, phone, email, address, balance, created_at, updated_at";

const SORT_COLUMNS: &[(&str, &str)] = &[
    ("name", "name"),
    ("balance", "balance"),
    ("created_at", "created_at"),
];

/// Customer service
#[derive(Clone)]
pub struct CustomerService {
    db: PgPool,
}

/// Customer record
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    /// Amount the customer owes the shop
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CustomerFilter {
    pub search: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

/// Input for creating a customer
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCustomerInput {
    #[validate(custom = "check_name")]
    pub name: String,
    #[validate(custom = "check_phone")]
    pub phone: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub address: Option<String>,
    /// Opening balance, e.g. debts carried over from a paper ledger
    #[validate(custom = "check_money_range")]
    pub balance: Option<Decimal>,
}

impl CreateCustomerInput {
    fn normalized(self) -> Self {
        Self {
            name: normalize_required(&self.name),
            phone: normalize_optional(self.phone),
            email: normalize_optional(self.email).map(|e| normalize_email(&e)),
            address: normalize_optional(self.address),
            balance: self.balance.map(round_money),
        }
    }
}

/// Input for updating a customer; blank strings clear optional fields
#[derive(Debug, Default, Deserialize)]
pub struct UpdateCustomerInput {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub balance: Option<Decimal>,
}

impl UpdateCustomerInput {
    fn merge(self, existing: Customer) -> CreateCustomerInput {
        CreateCustomerInput {
            name: self.name.unwrap_or(existing.name),
            phone: self.phone.or(existing.phone),
            email: self.email.or(existing.email),
            address: self.address.or(existing.address),
            balance: Some(self.balance.unwrap_or(existing.balance)),
        }
        .normalized()
    }
}

impl CustomerService {
    /// Create a new CustomerService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List customers, optionally searching name, phone and email
    pub async fn list_customers(&self, filter: CustomerFilter) -> AppResult<Vec<Customer>> {
        let column = sort_column(filter.sort.as_deref(), SORT_COLUMNS, "name")?;
        let order = sort_order(filter.order.as_deref(), SortOrder::Asc)?;

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE TRUE"
        ));

        if let Some(search) = normalize_optional(filter.search) {
            let pattern = contains_pattern(&search);
            qb.push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR phone ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR email ILIKE ")
                .push_bind(pattern)
                .push(")");
        }

        qb.push(" ORDER BY ")
            .push(column)
            .push(" ")
            .push(order.as_sql())
            .push(", id");

        let customers = qb.build_query_as::<Customer>().fetch_all(&self.db).await?;
        Ok(customers)
    }

    /// Get a customer by ID
    pub async fn get_customer(&self, customer_id: Uuid) -> AppResult<Customer> {
        sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = $1"
        ))
        .bind(customer_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Customer".to_string()))
    }

    /// Create a new customer
    pub async fn create_customer(&self, input: CreateCustomerInput) -> AppResult<Customer> {
        let input = input.normalized();
        input.validate()?;

        let customer = sqlx::query_as::<_, Customer>(&format!(
            r#"
            INSERT INTO customers (name, phone, email, address, balance)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {CUSTOMER_COLUMNS}
            "#
        ))
        .bind(&input.name)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.address)
        .bind(input.balance.unwrap_or(Decimal::ZERO))
        .fetch_one(&self.db)
        .await?;

        tracing::info!(customer_id = %customer.id, "Created customer");
        Ok(customer)
    }

    /// Update a customer, merging the provided fields
    pub async fn update_customer(
        &self,
        customer_id: Uuid,
        input: UpdateCustomerInput,
    ) -> AppResult<Customer> {
        let existing = self.get_customer(customer_id).await?;
        let merged = input.merge(existing);
        merged.validate()?;

        sqlx::query_as::<_, Customer>(&format!(
            r#"
            UPDATE customers
            SET name = $2, phone = $3, email = $4, address = $5, balance = $6, updated_at = NOW()
            WHERE id = $1
            RETURNING {CUSTOMER_COLUMNS}
            "#
        ))
        .bind(customer_id)
        .bind(&merged.name)
        .bind(&merged.phone)
        .bind(&merged.email)
        .bind(&merged.address)
        .bind(merged.balance.unwrap_or(Decimal::ZERO))
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Customer".to_string()))
    }

    /// Delete a customer; their past sales keep a null customer reference
    pub async fn delete_customer(&self, customer_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(customer_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Customer".to_string()));
        }

        tracing::info!(%customer_id, "Deleted customer");
        Ok(())
    }

    /// Record a payment that reduces what the customer owes
    pub async fn record_payment(
        &self,
        customer_id: Uuid,
        input: PaymentInput,
    ) -> AppResult<PaymentReceipt> {
        record_payment(&self.db, PartyKind::Customer, customer_id, input).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored() -> Customer {
        Customer {
            id: Uuid::new_v4(),
            name: "Somchai".to_string(),
            phone: Some("081-234-5678".to_string()),
            email: Some("somchai@example.com".to_string()),
            address: None,
            balance: Decimal::new(2500, 2),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_normalization() {
        let input = CreateCustomerInput {
            name: "  Ann ".to_string(),
            phone: Some("  ".to_string()),
            email: Some(" Ann@Example.COM ".to_string()),
            address: None,
            balance: None,
        }
        .normalized();

        assert_eq!(input.name, "Ann");
        assert_eq!(input.phone, None);
        assert_eq!(input.email.as_deref(), Some("ann@example.com"));
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_invalid_contact_details_rejected() {
        let input = CreateCustomerInput {
            name: "Ann".to_string(),
            phone: Some("call me".to_string()),
            email: Some("nope".to_string()),
            address: None,
            balance: None,
        }
        .normalized();

        let errors = input.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("phone"));
        assert!(errors.field_errors().contains_key("email"));
    }

    #[test]
    fn test_merge() {
        let existing = stored();
        let merged = UpdateCustomerInput {
            phone: Some(String::new()),
            address: Some("12 Market Rd".to_string()),
            ..Default::default()
        }
        .merge(existing.clone());

        assert_eq!(merged.name, existing.name);
        assert_eq!(merged.phone, None);
        assert_eq!(merged.address.as_deref(), Some("12 Market Rd"));
        assert_eq!(merged.balance, Some(existing.balance));
    }

    #[test]
    fn test_oversized_balance_rejected_on_update() {
        let merged = UpdateCustomerInput {
            balance: Some(Decimal::MAX),
            ..Default::default()
        }
        .merge(stored());

        let errors = merged.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("balance"));
    }
}
