//! Report models

use serde::{Deserialize, Serialize};

/// Default and maximum rows for the best-sellers report
pub const DEFAULT_TOP_PRODUCTS: i64 = 10;
pub const MAX_TOP_PRODUCTS: i64 = 100;

/// Grouping granularity for period reports
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReportPeriod {
    #[default]
    Day,
    Month,
}

impl ReportPeriod {
    /// Argument for Postgres `date_trunc`
    pub fn trunc_unit(&self) -> &'static str {
        match self {
            ReportPeriod::Day => "day",
            ReportPeriod::Month => "month",
        }
    }

    /// `to_char` pattern for the period label
    pub fn label_format(&self) -> &'static str {
        match self {
            ReportPeriod::Day => "YYYY-MM-DD",
            ReportPeriod::Month => "YYYY-MM",
        }
    }
}
