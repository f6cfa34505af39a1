use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Resource;
use crate::api::ValidationErrors;

/// Money moved from one category to another. The server books it as a
/// pair of transactions whose ids are listed in `transactions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: i64,
    pub source_category: i64,
    pub destination_category: i64,
    pub amount: Decimal,
    pub date: NaiveDate,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub transactions: Vec<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewTransfer {
    pub source_category: i64,
    pub destination_category: i64,
    pub amount: Decimal,
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl NewTransfer {
    /// Checks the server would reject anyway, so they can fail without a
    /// round trip.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if self.source_category == self.destination_category {
            errors.add(
                "destination_category",
                "Source and destination categories must differ.",
            );
        }
        if self.amount <= Decimal::ZERO {
            errors.add("amount", "Amount must be positive.");
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TransferPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_category: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_category: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TransferQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_category: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_category: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ordering: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

pub struct Transfers;

impl Resource for Transfers {
    const PATH: &'static str = "transfers/";
    type Item = Transfer;
    type Create = NewTransfer;
    type Patch = TransferPatch;
}
