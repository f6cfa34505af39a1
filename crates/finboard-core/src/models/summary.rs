use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Dashboard aggregate for an optional date range.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Summary {
    pub income_total: Decimal,
    pub expense_total: Decimal,
    #[serde(default)]
    pub by_category: Vec<CategoryTotal>,
    #[serde(default)]
    pub goals: Vec<GoalProgress>,
}

impl Summary {
    /// Income minus expenses.
    pub fn net(&self) -> Decimal {
        self.income_total - self.expense_total
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CategoryTotal {
    #[serde(default)]
    pub name: Option<String>,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GoalProgress {
    pub id: i64,
    pub name: String,
    pub target: Decimal,
    pub saved: Decimal,
    pub percent: Decimal,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SummaryQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,
}
