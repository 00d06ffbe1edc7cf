//! Reporting handlers for analytics and data export

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use shared::{ApiResponse, ReportPeriod};

use crate::error::AppResult;
use crate::middleware::{require_manager, CurrentUser};
use crate::services::reporting::{ReportFilter, ReportingService};
use crate::AppState;

#[derive(Deserialize)]
pub struct ReportQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub format: Option<String>, // "json" or "csv"
}

#[derive(Deserialize)]
pub struct SalesReportQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub group_by: Option<ReportPeriod>, // "day" or "month"
    pub format: Option<String>,
}

#[derive(Deserialize)]
pub struct TopProductsQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub limit: Option<i64>,
    pub format: Option<String>,
}

fn wants_csv(format: Option<&str>) -> bool {
    format.map_or(false, |f| f.eq_ignore_ascii_case("csv"))
}

/// JSON envelope by default, a CSV attachment when `format=csv`
fn render<T: Serialize>(rows: Vec<T>, format: Option<&str>, filename: &str) -> AppResult<Response> {
    if wants_csv(format) {
        let csv = ReportingService::export_to_csv(&rows)?;
        let disposition = format!("attachment; filename=\"{}.csv\"", filename);
        Ok((
            [
                (header::CONTENT_TYPE, "text/csv".to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            csv,
        )
            .into_response())
    } else {
        Ok(Json(ApiResponse::ok(rows)).into_response())
    }
}

/// Get dashboard metrics
pub async fn get_dashboard(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ReportQuery>,
) -> AppResult<Response> {
    require_manager(&user)?;

    let service = ReportingService::new(state.db.clone());
    let metrics = service.get_dashboard_metrics().await?;

    if wants_csv(query.format.as_deref()) {
        render(vec![metrics], query.format.as_deref(), "dashboard")
    } else {
        Ok(Json(ApiResponse::ok(metrics)).into_response())
    }
}

/// Get sales totals per day or month
pub async fn get_sales_report(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<SalesReportQuery>,
) -> AppResult<Response> {
    require_manager(&user)?;

    let service = ReportingService::new(state.db.clone());
    let filter = ReportFilter {
        start_date: query.start_date,
        end_date: query.end_date,
    };
    let period = query.group_by.unwrap_or_default();

    let data = service.get_sales_report(period, &filter).await?;
    render(data, query.format.as_deref(), "sales_report")
}

/// Get best-selling products
pub async fn get_top_products_report(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<TopProductsQuery>,
) -> AppResult<Response> {
    require_manager(&user)?;

    let service = ReportingService::new(state.db.clone());
    let filter = ReportFilter {
        start_date: query.start_date,
        end_date: query.end_date,
    };

    let data = service.get_top_products(query.limit, &filter).await?;
    render(data, query.format.as_deref(), "top_products")
}

/// Get profit and loss
pub async fn get_profit_report(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ReportQuery>,
) -> AppResult<Response> {
    require_manager(&user)?;

    let service = ReportingService::new(state.db.clone());
    let filter = ReportFilter {
        start_date: query.start_date,
        end_date: query.end_date,
    };

    let report = service.get_profit_report(&filter).await?;

    if wants_csv(query.format.as_deref()) {
        render(vec![report], query.format.as_deref(), "profit_report")
    } else {
        Ok(Json(ApiResponse::ok(report)).into_response())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wants_csv() {
        assert!(wants_csv(Some("csv")));
        assert!(wants_csv(Some("CSV")));
        assert!(!wants_csv(Some("json")));
        assert!(!wants_csv(None));
    }

    #[test]
    fn test_render_csv_sets_attachment_headers() {
        #[derive(Serialize)]
        struct Row {
            period: String,
            total: i64,
        }

        let rows = vec![Row {
            period: "2024-01".to_string(),
            total: 42,
        }];
        let response = render(rows, Some("csv"), "sales_report").unwrap();

        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"sales_report.csv\""
        );
    }
}
