use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Resource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BudgetPeriod {
    #[default]
    #[serde(rename = "M")]
    Monthly,
    #[serde(rename = "Y")]
    Yearly,
}

impl fmt::Display for BudgetPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BudgetPeriod::Monthly => write!(f, "Monthly"),
            BudgetPeriod::Yearly => write!(f, "Yearly"),
        }
    }
}

impl FromStr for BudgetPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "m" | "month" | "monthly" => Ok(BudgetPeriod::Monthly),
            "y" | "year" | "yearly" => Ok(BudgetPeriod::Yearly),
            other => Err(format!("unknown budget period '{}'", other)),
        }
    }
}

/// A spending limit for one category and period.
///
/// `amount_spent`, `remaining` and `percent_used` are computed by the server
/// for the current month. Older deployments send `spent` instead of
/// `amount_spent` and may omit the other two.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub id: i64,
    pub category: i64,
    pub limit: Decimal,
    #[serde(default)]
    pub period: BudgetPeriod,
    #[serde(default, alias = "spent")]
    pub amount_spent: Decimal,
    #[serde(default)]
    pub remaining: Option<Decimal>,
    #[serde(default)]
    pub percent_used: Option<f64>,
}

impl Budget {
    pub fn remaining(&self) -> Decimal {
        self.remaining.unwrap_or_else(|| {
            self.limit
                .checked_sub(self.amount_spent)
                .unwrap_or(Decimal::ZERO)
        })
    }

    /// Share of the limit used, in percent. Zero for a zero limit or when
    /// the figures are out of range.
    pub fn percent_used(&self) -> f64 {
        if let Some(p) = self.percent_used {
            return p;
        }
        if self.limit.is_zero() {
            return 0.0;
        }
        self.amount_spent
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|scaled| scaled.checked_div(self.limit))
            .and_then(|ratio| ratio.round_dp(1).to_f64())
            .unwrap_or(0.0)
    }

    pub fn is_over_limit(&self) -> bool {
        self.amount_spent > self.limit
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewBudget {
    pub category: i64,
    pub limit: Decimal,
    pub period: BudgetPeriod,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BudgetPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<BudgetPeriod>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BudgetQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<BudgetPeriod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_limit: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_limit: Option<Decimal>,
    /// `limit`, `spent`, `remaining`, `percent_used` or `created`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ordering: Option<String>,
}

pub struct Budgets;

impl Resource for Budgets {
    const PATH: &'static str = "budgets/";
    type Item = Budget;
    type Create = NewBudget;
    type Patch = BudgetPatch;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_with_server_figures() {
        let budget: Budget = serde_json::from_str(
            r#"{"id": 1, "category": 2, "limit": "500.00", "period": "M",
                "amount_spent": "612.40", "remaining": "-112.40", "percent_used": 122.48}"#,
        )
        .unwrap();
        assert!(budget.is_over_limit());
        assert_eq!(budget.remaining(), Decimal::from_str("-112.40").unwrap());
        assert_eq!(budget.percent_used(), 122.48);
    }

    #[test]
    fn test_budget_legacy_spent_alias() {
        let budget: Budget = serde_json::from_str(
            r#"{"id": 1, "category": 2, "limit": "200", "period": "Y", "spent": "50"}"#,
        )
        .unwrap();
        assert_eq!(budget.period, BudgetPeriod::Yearly);
        assert_eq!(budget.amount_spent, Decimal::from(50));
        assert_eq!(budget.remaining(), Decimal::from(150));
        assert_eq!(budget.percent_used(), 25.0);
        assert!(!budget.is_over_limit());
    }

    #[test]
    fn test_zero_limit_percent() {
        let budget: Budget =
            serde_json::from_str(r#"{"id": 1, "category": 2, "limit": "0"}"#).unwrap();
        assert_eq!(budget.percent_used(), 0.0);
    }

    #[test]
    fn test_huge_amounts_do_not_overflow() {
        let budget: Budget = serde_json::from_str(
            r#"{"id": 1, "category": 2, "limit": "1",
                "amount_spent": "79228162514264337593543950335"}"#,
        )
        .unwrap();
        assert_eq!(budget.amount_spent, Decimal::MAX);
        assert_eq!(budget.percent_used(), 0.0);
        assert!(budget.is_over_limit());
    }
}
