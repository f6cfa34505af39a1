use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Resource;

/// A savings goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: i64,
    pub name: String,
    pub target_amount: Decimal,
    #[serde(default)]
    pub current_amount: Decimal,
    #[serde(default)]
    pub remaining_amount: Option<Decimal>,
    #[serde(default)]
    pub target_date: Option<NaiveDate>,
}

impl Goal {
    pub fn remaining(&self) -> Decimal {
        self.remaining_amount.unwrap_or_else(|| {
            self.target_amount
                .checked_sub(self.current_amount)
                .unwrap_or(Decimal::ZERO)
                .max(Decimal::ZERO)
        })
    }

    /// Progress toward the target in percent, one decimal place. Zero when
    /// the target is zero or the figures are out of range.
    pub fn progress_percent(&self) -> Decimal {
        if self.target_amount.is_zero() {
            return Decimal::ZERO;
        }
        self.current_amount
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|scaled| scaled.checked_div(self.target_amount))
            .map(|ratio| ratio.round_dp(1))
            .unwrap_or(Decimal::ZERO)
    }

    pub fn is_reached(&self) -> bool {
        self.current_amount >= self.target_amount
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewGoal {
    pub name: String,
    pub target_amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GoalPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GoalQuery {
    #[serde(rename = "name__icontains", skip_serializing_if = "Option::is_none")]
    pub name_contains: Option<String>,
}

pub struct Goals;

impl Resource for Goals {
    const PATH: &'static str = "goals/";
    type Item = Goal;
    type Create = NewGoal;
    type Patch = GoalPatch;
}
