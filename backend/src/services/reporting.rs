//! Reporting service for sales analytics and data export

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{ReportPeriod, DEFAULT_TOP_PRODUCTS, MAX_TOP_PRODUCTS};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Reporting service
#[derive(Clone)]
pub struct ReportingService {
    db: PgPool,
}

/// Headline figures for the back-office dashboard
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct DashboardMetrics {
    pub today_sales_count: i64,
    pub today_revenue: Decimal,
    pub total_products: i64,
    pub low_stock_count: i64,
    pub out_of_stock_count: i64,
    pub customer_count: i64,
    pub outstanding_customer_balance: Decimal,
    pub month_expenses: Decimal,
}

/// Sales aggregated per day or month
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct SalesPeriodRow {
    pub period: String,
    pub sale_count: i64,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

/// Best seller by quantity
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct TopProductRow {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity_sold: i64,
    pub revenue: Decimal,
}

/// Profit and loss over a date range
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct ProfitReport {
    pub sale_count: i64,
    /// Sum of sale totals (tax included)
    pub revenue: Decimal,
    pub tax_collected: Decimal,
    /// Quantity sold × current buy price
    pub cost_of_goods: Decimal,
    pub gross_profit: Decimal,
    pub expenses: Decimal,
    pub net_profit: Decimal,
}

/// Date range shared by every report; both ends inclusive
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ReportFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl ReportFilter {
    fn validate(&self) -> AppResult<()> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) if start > end => Err(AppError::validation(
                "start_date",
                "start_date must not be after end_date",
            )),
            _ => Ok(()),
        }
    }
}

impl ReportingService {
    /// Create a new ReportingService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Get dashboard metrics
    pub async fn get_dashboard_metrics(&self) -> AppResult<DashboardMetrics> {
        let metrics = sqlx::query_as::<_, DashboardMetrics>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM sales WHERE created_at >= CURRENT_DATE) AS today_sales_count,
                (SELECT COALESCE(SUM(total), 0) FROM sales WHERE created_at >= CURRENT_DATE) AS today_revenue,
                (SELECT COUNT(*) FROM products) AS total_products,
                (SELECT COUNT(*) FROM products
                    WHERE quantity > 0 AND quantity <= low_stock_threshold) AS low_stock_count,
                (SELECT COUNT(*) FROM products WHERE quantity = 0) AS out_of_stock_count,
                (SELECT COUNT(*) FROM customers) AS customer_count,
                (SELECT COALESCE(SUM(balance), 0) FROM customers WHERE balance > 0)
                    AS outstanding_customer_balance,
                (SELECT COALESCE(SUM(amount), 0) FROM expenses
                    WHERE expense_date >= date_trunc('month', CURRENT_DATE)::date) AS month_expenses
            "#,
        )
        .fetch_one(&self.db)
        .await?;

        Ok(metrics)
    }

    /// Sales totals grouped by day or month
    pub async fn get_sales_report(
        &self,
        period: ReportPeriod,
        filter: &ReportFilter,
    ) -> AppResult<Vec<SalesPeriodRow>> {
        filter.validate()?;

        // Unit and label pattern come from a closed enum
        let rows = sqlx::query_as::<_, SalesPeriodRow>(&format!(
            r#"
            SELECT
                to_char(date_trunc('{unit}', s.created_at), '{label}') AS period,
                COUNT(*) AS sale_count,
                COALESCE(SUM(s.subtotal), 0) AS subtotal,
                COALESCE(SUM(s.discount), 0) AS discount,
                COALESCE(SUM(s.tax), 0) AS tax,
                COALESCE(SUM(s.total), 0) AS total
            FROM sales s
            WHERE ($1::DATE IS NULL OR s.created_at >= $1::DATE)
              AND ($2::DATE IS NULL OR s.created_at < $2::DATE + 1)
            GROUP BY 1
            ORDER BY 1
            "#,
            unit = period.trunc_unit(),
            label = period.label_format(),
        ))
        .bind(filter.start_date)
        .bind(filter.end_date)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Best-selling products by quantity
    pub async fn get_top_products(
        &self,
        limit: Option<i64>,
        filter: &ReportFilter,
    ) -> AppResult<Vec<TopProductRow>> {
        filter.validate()?;
        let limit = limit.unwrap_or(DEFAULT_TOP_PRODUCTS);
        if !(1..=MAX_TOP_PRODUCTS).contains(&limit) {
            return Err(AppError::validation(
                "limit",
                format!("Limit must be between 1 and {}", MAX_TOP_PRODUCTS),
            ));
        }

        let rows = sqlx::query_as::<_, TopProductRow>(
            r#"
            SELECT si.product_id, p.name AS product_name,
                   SUM(si.quantity)::BIGINT AS quantity_sold,
                   COALESCE(SUM(si.total), 0) AS revenue
            FROM sale_items si
            JOIN sales s ON s.id = si.sale_id
            JOIN products p ON p.id = si.product_id
            WHERE ($1::DATE IS NULL OR s.created_at >= $1::DATE)
              AND ($2::DATE IS NULL OR s.created_at < $2::DATE + 1)
            GROUP BY si.product_id, p.name
            ORDER BY quantity_sold DESC, revenue DESC, p.name ASC
            LIMIT $3
            "#,
        )
        .bind(filter.start_date)
        .bind(filter.end_date)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Revenue, cost of goods, expenses and resulting profit
    pub async fn get_profit_report(&self, filter: &ReportFilter) -> AppResult<ProfitReport> {
        filter.validate()?;

        let report = sqlx::query_as::<_, ProfitReport>(
            r#"
            WITH sale_totals AS (
                SELECT COUNT(*) AS sale_count,
                       COALESCE(SUM(total), 0) AS revenue,
                       COALESCE(SUM(tax), 0) AS tax_collected
                FROM sales s
                WHERE ($1::DATE IS NULL OR s.created_at >= $1::DATE)
                  AND ($2::DATE IS NULL OR s.created_at < $2::DATE + 1)
            ),
            cost AS (
                SELECT COALESCE(SUM(si.quantity * p.buy_price), 0) AS cost_of_goods
                FROM sale_items si
                JOIN sales s ON s.id = si.sale_id
                JOIN products p ON p.id = si.product_id
                WHERE ($1::DATE IS NULL OR s.created_at >= $1::DATE)
                  AND ($2::DATE IS NULL OR s.created_at < $2::DATE + 1)
            ),
            spent AS (
                SELECT COALESCE(SUM(amount), 0) AS expenses
                FROM expenses e
                WHERE ($1::DATE IS NULL OR e.expense_date >= $1::DATE)
                  AND ($2::DATE IS NULL OR e.expense_date <= $2::DATE)
            )
            SELECT sale_count, revenue, tax_collected, cost_of_goods,
                   revenue - tax_collected - cost_of_goods AS gross_profit,
                   expenses,
                   revenue - tax_collected - cost_of_goods - expenses AS net_profit
            FROM sale_totals, cost, spent
            "#,
        )
        .bind(filter.start_date)
        .bind(filter.end_date)
        .fetch_one(&self.db)
        .await?;

        Ok(report)
    }

    /// Export report data as CSV
    pub fn export_to_csv<T: Serialize>(data: &[T]) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for record in data {
            wtr.serialize(record)
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))
    }
}
