//! Sale recording service
//!
//! A sale, its line items, the stock decrements and (for credit sales) the
//! customer balance change are written in one transaction. Product rows are
//! locked `FOR UPDATE` in id order so concurrent checkouts of the same
//! product serialize instead of overselling or deadlocking.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    merge_requested_items, normalize_optional, Page, Pagination, PaginationMeta, PaymentMethod,
    RequestedItem, SaleError, SaleLine, SaleTotals, MAX_MONEY,
};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

const SALE_SELECT: &str = r#"
    SELECT s.id, s.customer_id, c.name AS customer_name, s.cashier_id, u.name AS cashier_name,
           s.subtotal, s.discount, s.tax, s.total, s.payment_method, s.notes, s.created_at
    FROM sales s
    LEFT JOIN customers c ON c.id = s.customer_id
    LEFT JOIN users u ON u.id = s.cashier_id
"#;

/// Sale service
#[derive(Clone)]
pub struct SaleService {
    db: PgPool,
}

/// Sale header
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Sale {
    pub id: Uuid,
    pub customer_id: Option<Uuid>,
    pub customer_name: Option<String>,
    pub cashier_id: Option<Uuid>,
    pub cashier_name: Option<String>,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub payment_method: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Sale line item with the product name joined in
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SaleItem {
    pub id: Uuid,
    pub sale_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total: Decimal,
}

/// Sale with its items
#[derive(Debug, Clone, Serialize)]
pub struct SaleWithItems {
    #[serde(flatten)]
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

/// Checkout payload
#[derive(Debug, Deserialize)]
pub struct CreateSaleInput {
    pub customer_id: Option<Uuid>,
    #[serde(default)]
    pub payment_method: Option<String>,
    pub discount: Option<Decimal>,
    pub tax: Option<Decimal>,
    pub notes: Option<String>,
    #[serde(default)]
    pub items: Vec<RequestedItem>,
}

/// Query filters for listing sales
#[derive(Debug, Default, Deserialize)]
pub struct SaleFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub customer_id: Option<Uuid>,
    pub payment_method: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Checkout payload after validation, before touching the database
#[derive(Debug)]
struct ValidatedSale {
    customer_id: Option<Uuid>,
    payment_method: PaymentMethod,
    discount: Decimal,
    tax: Decimal,
    notes: Option<String>,
    items: Vec<RequestedItem>,
}

impl CreateSaleInput {
    fn validate(self) -> AppResult<ValidatedSale> {
        let items = merge_requested_items(&self.items)?;

        let discount = self.discount.unwrap_or(Decimal::ZERO);
        if discount < Decimal::ZERO {
            return Err(SaleError::NegativeDiscount.into());
        }
        if discount > MAX_MONEY {
            return Err(SaleError::AmountTooLarge("discount").into());
        }
        let tax = self.tax.unwrap_or(Decimal::ZERO);
        if tax < Decimal::ZERO {
            return Err(SaleError::NegativeTax.into());
        }
        if tax > MAX_MONEY {
            return Err(SaleError::AmountTooLarge("tax").into());
        }

        let payment_method = match normalize_optional(self.payment_method) {
            Some(method) => method.parse::<PaymentMethod>()?,
            None => PaymentMethod::default(),
        };
        if payment_method.requires_customer() && self.customer_id.is_none() {
            return Err(AppError::validation(
                "customer_id",
                "Credit sales require a customer",
            ));
        }

        Ok(ValidatedSale {
            customer_id: self.customer_id,
            payment_method,
            discount,
            tax,
            notes: normalize_optional(self.notes),
            items,
        })
    }
}

/// Product row as locked during checkout
#[derive(Debug, sqlx::FromRow)]
struct StockRow {
    id: Uuid,
    name: String,
    quantity: i32,
    sell_price: Decimal,
}

/// Sale header fields needed to reverse a sale
#[derive(Debug, sqlx::FromRow)]
struct SaleReversal {
    customer_id: Option<Uuid>,
    payment_method: String,
    total: Decimal,
}

impl SaleService {
    /// Create a new SaleService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a sale: validate, lock and decrement stock, price the lines,
    /// insert the sale with its items and charge credit sales to the customer
    pub async fn create_sale(
        &self,
        cashier_id: Uuid,
        input: CreateSaleInput,
    ) -> AppResult<SaleWithItems> {
        // Everything that can be checked without the database is checked first
        let sale = input.validate()?;

        let mut tx = self.db.begin().await?;

        if let Some(customer_id) = sale.customer_id {
            let exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM customers WHERE id = $1)",
            )
            .bind(customer_id)
            .fetch_one(&mut *tx)
            .await?;

            if !exists {
                return Err(AppError::NotFound("Customer".to_string()));
            }
        }

        let product_ids: Vec<Uuid> = sale.items.iter().map(|i| i.product_id).collect();
        let products = sqlx::query_as::<_, StockRow>(
            r#"
            SELECT id, name, quantity, sell_price
            FROM products
            WHERE id = ANY($1)
            ORDER BY id
            FOR UPDATE
            "#,
        )
        .bind(&product_ids)
        .fetch_all(&mut *tx)
        .await?;

        let mut lines = Vec::with_capacity(sale.items.len());
        for item in &sale.items {
            let product = products
                .iter()
                .find(|p| p.id == item.product_id)
                .ok_or_else(|| AppError::NotFound(format!("Product {}", item.product_id)))?;

            if product.quantity < item.quantity {
                return Err(AppError::InsufficientStock {
                    product: product.name.clone(),
                    available: product.quantity,
                    requested: item.quantity,
                });
            }

            lines.push(SaleLine::new(
                product.id,
                item.quantity,
                item.price.unwrap_or(product.sell_price),
            ));
        }

        let totals = SaleTotals::compute(&lines, sale.discount, sale.tax)?;
        let line_totals = lines
            .iter()
            .map(SaleLine::total)
            .collect::<Result<Vec<_>, _>>()?;

        for line in &lines {
            let result = sqlx::query(
                r#"
                UPDATE products
                SET quantity = quantity - $2, updated_at = NOW()
                WHERE id = $1 AND quantity >= $2
                "#,
            )
            .bind(line.product_id)
            .bind(line.quantity)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                let product = products
                    .iter()
                    .find(|p| p.id == line.product_id)
                    .map(|p| (p.name.clone(), p.quantity))
                    .unwrap_or_else(|| (line.product_id.to_string(), 0));
                return Err(AppError::InsufficientStock {
                    product: product.0,
                    available: product.1,
                    requested: line.quantity,
                });
            }
        }

        let sale_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO sales (customer_id, cashier_id, subtotal, discount, tax, total,
                               payment_method, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(sale.customer_id)
        .bind(cashier_id)
        .bind(totals.subtotal)
        .bind(totals.discount)
        .bind(totals.tax)
        .bind(totals.total)
        .bind(sale.payment_method.as_str())
        .bind(&sale.notes)
        .fetch_one(&mut *tx)
        .await?;

        let mut insert = QueryBuilder::<Postgres>::new(
            "INSERT INTO sale_items (sale_id, product_id, position, quantity, unit_price, total) ",
        );
        insert.push_values(
            lines.iter().zip(&line_totals).enumerate(),
            |mut row, (position, (line, total))| {
                row.push_bind(sale_id)
                    .push_bind(line.product_id)
                    .push_bind(position as i32)
                    .push_bind(line.quantity)
                    .push_bind(line.unit_price)
                    .push_bind(*total);
            },
        );
        insert.build().execute(&mut *tx).await?;

        if sale.payment_method.requires_customer() {
            if let Some(customer_id) = sale.customer_id {
                sqlx::query(
                    "UPDATE customers SET balance = balance + $2, updated_at = NOW() WHERE id = $1",
                )
                .bind(customer_id)
                .bind(totals.total)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;

        tracing::info!(
            %sale_id,
            %cashier_id,
            items = lines.len(),
            total = %totals.total,
            payment_method = %sale.payment_method,
            "Recorded sale"
        );

        self.get_sale(sale_id).await
    }

    /// List sales, newest first
    pub async fn list_sales(&self, filter: SaleFilter) -> AppResult<Page<Sale>> {
        let pagination = Pagination::from_query(filter.page, filter.per_page);
        let payment_method = match normalize_optional(filter.payment_method.clone()) {
            Some(method) => Some(method.parse::<PaymentMethod>()?),
            None => None,
        };
        if let (Some(start), Some(end)) = (filter.start_date, filter.end_date) {
            if start > end {
                return Err(AppError::validation(
                    "start_date",
                    "start_date must not be after end_date",
                ));
            }
        }

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM sales s WHERE TRUE");
        push_sale_filters(&mut count, &filter, payment_method);
        let total_items = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.db)
            .await?;

        let mut select = QueryBuilder::<Postgres>::new(SALE_SELECT);
        select.push(" WHERE TRUE");
        push_sale_filters(&mut select, &filter, payment_method);
        select
            .push(" ORDER BY s.created_at DESC, s.id LIMIT ")
            .push_bind(pagination.limit())
            .push(" OFFSET ")
            .push_bind(pagination.offset());
        let items = select.build_query_as::<Sale>().fetch_all(&self.db).await?;

        Ok(Page {
            items,
            pagination: PaginationMeta::new(pagination, total_items.max(0) as u64),
        })
    }

    /// A customer's purchase history
    pub async fn customer_sales(
        &self,
        customer_id: Uuid,
        mut filter: SaleFilter,
    ) -> AppResult<Page<Sale>> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM customers WHERE id = $1)")
                .bind(customer_id)
                .fetch_one(&self.db)
                .await?;
        if !exists {
            return Err(AppError::NotFound("Customer".to_string()));
        }

        filter.customer_id = Some(customer_id);
        self.list_sales(filter).await
    }

    /// Get a sale with its items
    pub async fn get_sale(&self, sale_id: Uuid) -> AppResult<SaleWithItems> {
        let sale = sqlx::query_as::<_, Sale>(&format!("{SALE_SELECT} WHERE s.id = $1"))
            .bind(sale_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Sale".to_string()))?;

        let items = sqlx::query_as::<_, SaleItem>(
            r#"
            SELECT si.id, si.sale_id, si.product_id, p.name AS product_name,
                   si.quantity, si.unit_price, si.total
            FROM sale_items si
            JOIN products p ON p.id = si.product_id
            WHERE si.sale_id = $1
            ORDER BY si.position
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.db)
        .await?;

        Ok(SaleWithItems { sale, items })
    }

    /// Delete a sale, returning its items to stock and reversing any credit charge
    pub async fn delete_sale(&self, sale_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let sale = sqlx::query_as::<_, SaleReversal>(
            "SELECT customer_id, payment_method, total FROM sales WHERE id = $1 FOR UPDATE",
        )
        .bind(sale_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Sale".to_string()))?;

        sqlx::query(
            r#"
            UPDATE products p
            SET quantity = p.quantity + sold.quantity, updated_at = NOW()
            FROM (
                SELECT product_id, SUM(quantity)::INTEGER AS quantity
                FROM sale_items
                WHERE sale_id = $1
                GROUP BY product_id
            ) sold
            WHERE p.id = sold.product_id
            "#,
        )
        .bind(sale_id)
        .execute(&mut *tx)
        .await?;

        let was_credit = sale
            .payment_method
            .parse::<PaymentMethod>()
            .map(|m| m.requires_customer())
            .unwrap_or(false);
        if was_credit {
            if let Some(customer_id) = sale.customer_id {
                sqlx::query(
                    "UPDATE customers SET balance = balance - $2, updated_at = NOW() WHERE id = $1",
                )
                .bind(customer_id)
                .bind(sale.total)
                .execute(&mut *tx)
                .await?;
            }
        }

        // sale_items go with it (ON DELETE CASCADE)
        sqlx::query("DELETE FROM sales WHERE id = $1")
            .bind(sale_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(%sale_id, "Deleted sale and restocked items");
        Ok(())
    }
}

fn push_sale_filters(
    qb: &mut QueryBuilder<'_, Postgres>,
    filter: &SaleFilter,
    payment_method: Option<PaymentMethod>,
) {
    if let Some(start) = filter.start_date {
        qb.push(" AND s.created_at >= ").push_bind(start);
    }
    if let Some(end) = filter.end_date {
        // end date is inclusive
        qb.push(" AND s.created_at < ")
            .push_bind(end + Duration::days(1));
    }
    if let Some(customer_id) = filter.customer_id {
        qb.push(" AND s.customer_id = ").push_bind(customer_id);
    }
    if let Some(method) = payment_method {
        qb.push(" AND s.payment_method = ").push_bind(method.as_str());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn input(items: Vec<RequestedItem>) -> CreateSaleInput {
        CreateSaleInput {
            customer_id: None,
            payment_method: None,
            discount: None,
            tax: None,
            notes: None,
            items,
        }
    }

    fn item(quantity: i32) -> RequestedItem {
        RequestedItem {
            product_id: Uuid::new_v4(),
            quantity,
            price: None,
        }
    }

    #[test]
    fn test_empty_sale_rejected_before_database() {
        match input(vec![]).validate() {
            Err(AppError::Validation { field, .. }) => assert_eq!(field, "items"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_defaults_applied() {
        let sale = input(vec![item(1)]).validate().unwrap();
        assert_eq!(sale.payment_method, PaymentMethod::Cash);
        assert_eq!(sale.discount, Decimal::ZERO);
        assert_eq!(sale.tax, Decimal::ZERO);
    }

    #[test]
    fn test_credit_requires_customer() {
        let mut payload = input(vec![item(1)]);
        payload.payment_method = Some("credit".to_string());
        match payload.validate() {
            Err(AppError::Validation { field, .. }) => assert_eq!(field, "customer_id"),
            other => panic!("unexpected result: {:?}", other),
        }

        let mut payload = input(vec![item(1)]);
        payload.payment_method = Some("credit".to_string());
        payload.customer_id = Some(Uuid::new_v4());
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn test_negative_adjustments_rejected() {
        let mut payload = input(vec![item(1)]);
        payload.discount = Some(dec("-1.00"));
        assert!(matches!(
            payload.validate(),
            Err(AppError::Validation { ref field, .. }) if field == "discount"
        ));

        let mut payload = input(vec![item(1)]);
        payload.tax = Some(dec("-0.01"));
        assert!(matches!(
            payload.validate(),
            Err(AppError::Validation { ref field, .. }) if field == "tax"
        ));
    }

    #[test]
    fn test_oversized_adjustments_rejected() {
        let mut payload = input(vec![item(1)]);
        payload.discount = Some(Decimal::MAX);
        assert!(matches!(
            payload.validate(),
            Err(AppError::Validation { ref field, .. }) if field == "discount"
        ));

        let mut payload = input(vec![item(1)]);
        payload.tax = Some(dec("10000000000.00"));
        assert!(matches!(
            payload.validate(),
            Err(AppError::Validation { ref field, .. }) if field == "tax"
        ));

        let mut payload = input(vec![RequestedItem {
            price: Some(Decimal::MAX),
            ..item(2)
        }]);
        payload.tax = Some(MAX_MONEY);
        assert!(matches!(
            payload.validate(),
            Err(AppError::Validation { ref field, .. }) if field == "items"
        ));
    }

    #[test]
    fn test_unknown_payment_method_rejected() {
        let mut payload = input(vec![item(1)]);
        payload.payment_method = Some("barter".to_string());
        assert!(matches!(
            payload.validate(),
            Err(AppError::Validation { ref field, .. }) if field == "payment_method"
        ));
    }

    #[test]
    fn test_payload_deserializes_with_defaults() {
        let payload: CreateSaleInput = serde_json::from_str(
            r#"{"items":[{"product_id":"00000000-0000-0000-0000-000000000001","quantity":2}]}"#,
        )
        .unwrap();
        let sale = payload.validate().unwrap();
        assert_eq!(sale.items.len(), 1);
        assert_eq!(sale.items[0].price, None);
    }
}
