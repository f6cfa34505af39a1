use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Resource, TransactionType};

/// A transaction template posted on an RRULE schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringTransaction {
    pub id: i64,
    pub category_id: i64,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    #[serde(default)]
    pub description: String,
    /// RFC 5545 rule, e.g. `FREQ=MONTHLY;BYMONTHDAY=1`.
    pub rrule: String,
    pub next_occurrence: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl RecurringTransaction {
    /// Whether the next posting run would create a transaction on `today`.
    pub fn is_due(&self, today: NaiveDate) -> bool {
        self.active && self.next_occurrence <= today
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewRecurring {
    pub category_id: i64,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub rrule: String,
    pub next_occurrence: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RecurringPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<TransactionType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rrule: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_occurrence: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

/// Result of asking the server to post every due recurring item.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PostedRecurring {
    pub posted: u32,
    pub date: NaiveDate,
}

pub struct Recurrings;

impl Resource for Recurrings {
    const PATH: &'static str = "recurrings/";
    type Item = RecurringTransaction;
    type Create = NewRecurring;
    type Patch = RecurringPatch;
}
