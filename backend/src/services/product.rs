//! Product catalogue service: CRUD, barcode lookup, stock alerts and adjustments

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    check_barcode, check_name, check_non_negative, normalize_optional, normalize_required,
    nullable, round_money, SortOrder, StockStatus, DEFAULT_EXPIRY_WINDOW_DAYS,
    DEFAULT_LOW_STOCK_THRESHOLD,
};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use validator::Validate;

use super::{contains_pattern, sort_column, sort_order};
use crate::error::{AppError, AppResult};

const PRODUCT_SELECT: &str = r#"
    SELECT p.id, p.name, p.category, p.barcode, p.quantity, p.buy_price, p.sell_price,
           p.expiry_date, p.low_stock_threshold, p.supplier_id, s.name AS supplier_name,
           p.created_at, p.updated_at
    FROM products p
    LEFT JOIN suppliers s ON s.id = p.supplier_id
"#;

const SORT_COLUMNS: &[(&str, &str)] = &[
    ("name", "p.name"),
    ("category", "p.category"),
    ("barcode", "p.barcode"),
    ("quantity", "p.quantity"),
    ("buy_price", "p.buy_price"),
    ("sell_price", "p.sell_price"),
    ("expiry_date", "p.expiry_date"),
    ("created_at", "p.created_at"),
];

/// Longest look-ahead accepted by the expiring-products listing
const MAX_EXPIRY_WINDOW_DAYS: i64 = 3650;

/// Product service
#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
}

/// Product with its supplier name and stock status
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub category: Option<String>,
    pub barcode: Option<String>,
    pub quantity: i32,
    pub buy_price: Decimal,
    pub sell_price: Decimal,
    pub expiry_date: Option<NaiveDate>,
    pub low_stock_threshold: i32,
    pub supplier_id: Option<Uuid>,
    pub supplier_name: Option<String>,
    #[sqlx(skip)]
    pub stock_status: Option<StockStatus>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    fn with_stock_status(mut self) -> Self {
        self.stock_status = Some(StockStatus::classify(self.quantity, self.low_stock_threshold));
        self
    }
}

/// Query filters for listing products
#[derive(Debug, Default, Deserialize)]
pub struct ProductFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    pub supplier_id: Option<Uuid>,
    pub low_stock: Option<bool>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

/// Input for creating a product
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProductInput {
    #[validate(custom = "check_name")]
    pub name: String,
    pub category: Option<String>,
    #[validate(custom = "check_barcode")]
    pub barcode: Option<String>,
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity: Option<i32>,
    #[validate(custom = "check_non_negative")]
    pub buy_price: Option<Decimal>,
    #[validate(custom = "check_non_negative")]
    pub sell_price: Decimal,
    pub expiry_date: Option<NaiveDate>,
    #[validate(range(min = 0, message = "Low stock threshold cannot be negative"))]
    pub low_stock_threshold: Option<i32>,
    pub supplier_id: Option<Uuid>,
}

impl CreateProductInput {
    fn normalized(self) -> Self {
        Self {
            name: normalize_required(&self.name),
            category: normalize_optional(self.category),
            barcode: normalize_optional(self.barcode),
            ..self
        }
    }
}

/// Input for updating a product; absent fields keep their value.
/// Blank strings and `null` clear optional fields.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub category: Option<String>,
    pub barcode: Option<String>,
    pub quantity: Option<i32>,
    pub buy_price: Option<Decimal>,
    pub sell_price: Option<Decimal>,
    #[serde(default, deserialize_with = "nullable")]
    pub expiry_date: Option<Option<NaiveDate>>,
    pub low_stock_threshold: Option<i32>,
    #[serde(default, deserialize_with = "nullable")]
    pub supplier_id: Option<Option<Uuid>>,
}

impl UpdateProductInput {
    /// Overlay provided fields onto the stored product
    fn merge(self, existing: Product) -> CreateProductInput {
        CreateProductInput {
            name: self.name.unwrap_or(existing.name),
            category: match self.category {
                Some(category) => Some(category),
                None => existing.category,
            },
            barcode: match self.barcode {
                Some(barcode) => Some(barcode),
                None => existing.barcode,
            },
            quantity: Some(self.quantity.unwrap_or(existing.quantity)),
            buy_price: Some(self.buy_price.unwrap_or(existing.buy_price)),
            sell_price: self.sell_price.unwrap_or(existing.sell_price),
            expiry_date: self.expiry_date.unwrap_or(existing.expiry_date),
            low_stock_threshold: Some(
                self.low_stock_threshold
                    .unwrap_or(existing.low_stock_threshold),
            ),
            supplier_id: self.supplier_id.unwrap_or(existing.supplier_id),
        }
        .normalized()
    }
}

/// Largest single stock correction accepted in either direction
const MAX_STOCK_ADJUSTMENT: i32 = 1_000_000;

/// Manual stock correction (delivery, breakage, stock count)
#[derive(Debug, Deserialize)]
pub struct StockAdjustmentInput {
    pub delta: i32,
    pub reason: Option<String>,
}

impl StockAdjustmentInput {
    fn validate(&self) -> AppResult<()> {
        if self.delta == 0 || self.delta.abs() > MAX_STOCK_ADJUSTMENT {
            return Err(AppError::validation(
                "delta",
                format!(
                    "Adjustment must be non-zero and at most {} in either direction",
                    MAX_STOCK_ADJUSTMENT
                ),
            ));
        }
        Ok(())
    }
}

/// Why a stock adjustment matched no row on an existing product
fn rejected_adjustment(product: Product, delta: i32) -> AppError {
    if delta > 0 {
        AppError::validation(
            "delta",
            format!("Stock for {} would exceed {}", product.name, i32::MAX),
        )
    } else {
        AppError::InsufficientStock {
            product: product.name,
            available: product.quantity,
            requested: delta.saturating_neg(),
        }
    }
}

impl ProductService {
    /// Create a new ProductService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List products with optional search, filters and sorting
    pub async fn list_products(&self, filter: ProductFilter) -> AppResult<Vec<Product>> {
        let column = sort_column(filter.sort.as_deref(), SORT_COLUMNS, "p.name")?;
        let order = sort_order(filter.order.as_deref(), SortOrder::Asc)?;

        let mut qb = QueryBuilder::<Postgres>::new(PRODUCT_SELECT);
        qb.push(" WHERE TRUE");

        if let Some(search) = normalize_optional(filter.search) {
            let pattern = contains_pattern(&search);
            qb.push(" AND (p.name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR p.barcode ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(category) = normalize_optional(filter.category) {
            qb.push(" AND p.category = ").push_bind(category);
        }
        if let Some(supplier_id) = filter.supplier_id {
            qb.push(" AND p.supplier_id = ").push_bind(supplier_id);
        }
        if filter.low_stock == Some(true) {
            qb.push(" AND p.quantity <= p.low_stock_threshold");
        }

        qb.push(" ORDER BY ")
            .push(column)
            .push(" ")
            .push(order.as_sql())
            .push(" NULLS LAST, p.id");

        let products = qb.build_query_as::<Product>().fetch_all(&self.db).await?;

        Ok(products.into_iter().map(Product::with_stock_status).collect())
    }

    /// Get a product by ID
    pub async fn get_product(&self, product_id: Uuid) -> AppResult<Product> {
        let product = sqlx::query_as::<_, Product>(&format!("{PRODUCT_SELECT} WHERE p.id = $1"))
            .bind(product_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        Ok(product.with_stock_status())
    }

    /// Look up a product by its exact barcode
    pub async fn get_by_barcode(&self, barcode: &str) -> AppResult<Product> {
        let barcode = barcode.trim();
        let product =
            sqlx::query_as::<_, Product>(&format!("{PRODUCT_SELECT} WHERE p.barcode = $1"))
                .bind(barcode)
                .fetch_optional(&self.db)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Product with barcode {}", barcode)))?;

        Ok(product.with_stock_status())
    }

    /// Products at or below their low-stock threshold, emptiest first
    pub async fn low_stock(&self) -> AppResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "{PRODUCT_SELECT} WHERE p.quantity <= p.low_stock_threshold ORDER BY p.quantity ASC, p.name ASC"
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(products.into_iter().map(Product::with_stock_status).collect())
    }

    /// Products that expire within the given number of days (already expired included)
    pub async fn expiring(&self, days: Option<i64>) -> AppResult<Vec<Product>> {
        let days = days.unwrap_or(DEFAULT_EXPIRY_WINDOW_DAYS);
        if !(0..=MAX_EXPIRY_WINDOW_DAYS).contains(&days) {
            return Err(AppError::validation(
                "days",
                format!("Days must be between 0 and {}", MAX_EXPIRY_WINDOW_DAYS),
            ));
        }
        let cutoff = Utc::now().date_naive() + chrono::Duration::days(days);

        let products = sqlx::query_as::<_, Product>(&format!(
            "{PRODUCT_SELECT} WHERE p.expiry_date IS NOT NULL AND p.expiry_date <= $1 ORDER BY p.expiry_date ASC, p.name ASC"
        ))
        .bind(cutoff)
        .fetch_all(&self.db)
        .await?;

        Ok(products.into_iter().map(Product::with_stock_status).collect())
    }

    /// Create a new product
    pub async fn create_product(&self, input: CreateProductInput) -> AppResult<Product> {
        let input = input.normalized();
        input.validate()?;
        self.ensure_supplier_exists(input.supplier_id).await?;

        let product_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO products (name, category, barcode, quantity, buy_price, sell_price,
                                  expiry_date, low_stock_threshold, supplier_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(&input.name)
        .bind(&input.category)
        .bind(&input.barcode)
        .bind(input.quantity.unwrap_or(0))
        .bind(round_money(input.buy_price.unwrap_or(Decimal::ZERO)))
        .bind(round_money(input.sell_price))
        .bind(input.expiry_date)
        .bind(
            input
                .low_stock_threshold
                .unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD),
        )
        .bind(input.supplier_id)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(%product_id, name = %input.name, "Created product");

        self.get_product(product_id).await
    }

    /// Update a product, merging the provided fields
    pub async fn update_product(
        &self,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> AppResult<Product> {
        let existing = self.get_product(product_id).await?;
        let merged = input.merge(existing);
        merged.validate()?;
        self.ensure_supplier_exists(merged.supplier_id).await?;

        let result = sqlx::query(
            r#"
            UPDATE products
            SET name = $2, category = $3, barcode = $4, quantity = $5, buy_price = $6,
                sell_price = $7, expiry_date = $8, low_stock_threshold = $9,
                supplier_id = $10, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(product_id)
        .bind(&merged.name)
        .bind(&merged.category)
        .bind(&merged.barcode)
        .bind(merged.quantity.unwrap_or(0))
        .bind(round_money(merged.buy_price.unwrap_or(Decimal::ZERO)))
        .bind(round_money(merged.sell_price))
        .bind(merged.expiry_date)
        .bind(
            merged
                .low_stock_threshold
                .unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD),
        )
        .bind(merged.supplier_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Product".to_string()));
        }

        self.get_product(product_id).await
    }

    /// Delete a product that has never been sold
    pub async fn delete_product(&self, product_id: Uuid) -> AppResult<()> {
        let sold = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM sale_items WHERE product_id = $1)",
        )
        .bind(product_id)
        .fetch_one(&self.db)
        .await?;

        if sold {
            return Err(AppError::Conflict(
                "Product has sales history and cannot be deleted".to_string(),
            ));
        }

        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(product_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Product".to_string()));
        }

        tracing::info!(%product_id, "Deleted product");
        Ok(())
    }

    /// Apply a signed stock adjustment; the result may not go below zero
    pub async fn adjust_stock(
        &self,
        product_id: Uuid,
        input: StockAdjustmentInput,
    ) -> AppResult<Product> {
        input.validate()?;

        let updated = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE products
            SET quantity = quantity + $2, updated_at = NOW()
            WHERE id = $1 AND quantity::BIGINT + $2 BETWEEN 0 AND 2147483647
            RETURNING quantity
            "#,
        )
        .bind(product_id)
        .bind(input.delta)
        .fetch_optional(&self.db)
        .await?;

        match updated {
            Some(quantity) => {
                tracing::info!(
                    %product_id,
                    delta = input.delta,
                    quantity,
                    reason = input.reason.as_deref().unwrap_or(""),
                    "Adjusted stock"
                );
                self.get_product(product_id).await
            }
            None => {
                let product = self.get_product(product_id).await?;
                Err(rejected_adjustment(product, input.delta))
            }
        }
    }

    async fn ensure_supplier_exists(&self, supplier_id: Option<Uuid>) -> AppResult<()> {
        let Some(supplier_id) = supplier_id else {
            return Ok(());
        };
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM suppliers WHERE id = $1)")
                .bind(supplier_id)
                .fetch_one(&self.db)
                .await?;

        if exists {
            Ok(())
        } else {
            Err(AppError::validation("supplier_id", "Supplier does not exist"))
        }
    }
}
