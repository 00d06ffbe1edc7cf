//! Supplier management service

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

const SUPPLIER_SELECT: &str = r#"
    SELECT s.id, s.name, s.contact_person, s.phone, s.email, s.address, s.balance,
           (SELECT COUNT(*) FROM products p WHERE p.supplier_id = s.id) AS product_count,
           s.created_at, s.updated_at
    FROM suppliers s
"#;

const SORT_COLUMNS: &[(&str, &str)] = &[
    ("name", "s.name"),
    ("balance", "s.balance"),
    ("created_at", "s.created_at"),
];

/// Supplier service
#[derive(Clone)]
pub struct SupplierService {
    db: PgPool,
}

/// Supplier record
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Supplier {
    pub id: Uuid,
    pub name: String,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    /// Amount the shop owes the supplier
    pub balance: Decimal,
    pub product_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SupplierFilter {
    pub search: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

/// Input for creating a supplier
#[derive(Debug, Deserialize, Validate)]
pub struct CreateSupplierInput {
    #[validate(custom = "check_name")]
    pub name: String,
    pub contact_person: Option<String>,
    #[validate(custom = "check_phone")]
    pub phone: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub address: Option<String>,
    #[validate(custom = "check_money_range")]
    pub balance: Option<Decimal>,
}

impl CreateSupplierInput {
    fn normalized(self) -> Self {
        Self {
            name: normalize_required(&self.name),
            contact_person: normalize_optional(self.contact_person),
            phone: normalize_optional(self.phone),
            email: normalize_optional(self.email).map(|e| normalize_email(&e)),
            address: normalize_optional(self.address),
            balance: self.balance.map(round_money),
        }
    }
}

/// Input for updating a supplier; blank strings clear optional fields
#[derive(Debug, Default, Deserialize)]
pub struct UpdateSupplierInput {
    pub name: Option<String>,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub balance: Option<Decimal>,
}

impl UpdateSupplierInput {
    fn merge(self, existing: Supplier) -> CreateSupplierInput {
        CreateSupplierInput {
            name: self.name.unwrap_or(existing.name),
            contact_person: self.contact_person.or(existing.contact_person),
            phone: self.phone.or(existing.phone),
            email: self.email.or(existing.email),
            address: self.address.or(existing.address),
            balance: Some(self.balance.unwrap_or(existing.balance)),
        }
        .normalized()
    }
}

impl SupplierService {
    /// Create a new SupplierService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List suppliers with their product counts
    pub async fn list_suppliers(&self, filter: SupplierFilter) -> AppResult<Vec<Supplier>> {
        let column = sort_column(filter.sort.as_deref(), SORT_COLUMNS, "s.name")?;
        let order = sort_order(filter.order.as_deref(), SortOrder::Asc)?;

        let mut qb = QueryBuilder::<Postgres>::new(SUPPLIER_SELECT);
        qb.push(" WHERE TRUE");

        if let Some(search) = normalize_optional(filter.search) {
            let pattern = contains_pattern(&search);
            qb.push(" AND (s.name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR s.contact_person ILIKE ")
                .push_bind(pattern)
                .push(")");
        }

        qb.push(" ORDER BY ")
            .push(column)
            .push(" ")
            .push(order.as_sql())
            .push(", s.id");

        let suppliers = qb.build_query_as::<Supplier>().fetch_all(&self.db).await?;
        Ok(suppliers)
    }

    /// Get a supplier by ID
    pub async fn get_supplier(&self, supplier_id: Uuid) -> AppResult<Supplier> {
        sqlx::query_as::<_, Supplier>(&format!("{SUPPLIER_SELECT} WHERE s.id = $1"))
            .bind(supplier_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Supplier".to_string()))
    }

    /// Create a new supplier
    pub async fn create_supplier(&self, input: CreateSupplierInput) -> AppResult<Supplier> {
        let input = input.normalized();
        input.validate()?;

        let supplier_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO suppliers (name, contact_person, phone, email, address, balance)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&input.name)
        .bind(&input.contact_person)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.address)
        .bind(input.balance.unwrap_or(Decimal::ZERO))
        .fetch_one(&self.db)
        .await?;

        tracing::info!(%supplier_id, "Created supplier");
        self.get_supplier(supplier_id).await
    }

    /// Update a supplier, merging the provided fields
    pub async fn update_supplier(
        &self,
        supplier_id: Uuid,
        input: UpdateSupplierInput,
    ) -> AppResult<Supplier> {
        let existing = self.get_supplier(supplier_id).await?;
        let merged = input.merge(existing);
        merged.validate()?;

        let result = sqlx::query(
            r#"
            UPDATE suppliers
            SET name = $2, contact_person = $3, phone = $4, email = $5, address = $6,
                balance = $7, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(supplier_id)
        .bind(&merged.name)
        .bind(&merged.contact_person)
        .bind(&merged.phone)
        .bind(&merged.email)
        .bind(&merged.address)
        .bind(merged.balance.unwrap_or(Decimal::ZERO))
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Supplier".to_string()));
        }

        self.get_supplier(supplier_id).await
    }

    /// Delete a supplier; their products keep a null supplier reference
    pub async fn delete_supplier(&self, supplier_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM suppliers WHERE id = $1")
            .bind(supplier_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Supplier".to_string()));
        }

        tracing::info!(%supplier_id, "Deleted supplier");
        Ok(())
    }

    /// Record a payment that reduces what the shop owes the supplier
    pub async fn record_payment(
        &self,
        supplier_id: Uuid,
        input: PaymentInput,
    ) -> AppResult<PaymentReceipt> {
        record_payment(&self.db, PartyKind::Supplier, supplier_id, input).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization_and_validation() {
        let input = CreateSupplierInput {
            name: " Dairy Co ".to_string(),
            contact_person: Some("".to_string()),
            phone: Some("+66 2 123 4567".to_string()),
            email: None,
            address: None,
            balance: Some(Decimal::new(12346, 3)),
        }
        .normalized();

        assert_eq!(input.name, "Dairy Co");
        assert_eq!(input.contact_person, None);
        assert_eq!(input.balance, Some(Decimal::new(1235, 2)));
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_blank_name_rejected() {
        let input = CreateSupplierInput {
            name: "   ".to_string(),
            contact_person: None,
            phone: None,
            email: None,
            address: None,
            balance: None,
        }
        .normalized();

        assert!(input.validate().is_err());
    }

    #[test]
    fn test_balance_beyond_money_column_rejected() {
        let input = CreateSupplierInput {
            name: "Dairy Co".to_string(),
            contact_person: None,
            phone: None,
            email: None,
            address: None,
            balance: Some(Decimal::new(1_000_000_000_000, 2)),
        }
        .normalized();

        let errors = input.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("balance"));
    }
}
