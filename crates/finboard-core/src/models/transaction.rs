use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Resource;

/// Income or expense. The backend stores the two-letter codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    #[serde(rename = "IN")]
    Income,
    #[serde(rename = "EX")]
    Expense,
}

impl TransactionType {
    pub fn code(&self) -> &'static str {
        match self {
            TransactionType::Income => "IN",
            TransactionType::Expense => "EX",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionType::Income => write!(f, "Income"),
            TransactionType::Expense => write!(f, "Expense"),
        }
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "in" | "income" => Ok(TransactionType::Income),
            "ex" | "expense" => Ok(TransactionType::Expense),
            other => Err(format!("unknown transaction type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub category_id: i64,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    #[serde(default)]
    pub description: String,
    pub date: NaiveDate,
    /// Set when the transaction is one leg of a transfer.
    #[serde(default)]
    pub transfer: Option<i64>,
}

impl Transaction {
    /// Amount with its sign: income positive, expense negative.
    pub fn signed_amount(&self) -> Decimal {
        match self.kind {
            TransactionType::Income => self.amount,
            TransactionType::Expense => -self.amount,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewTransaction {
    pub category_id: i64,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TransactionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<TransactionType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
}

/// Filters accepted by the transaction list endpoint.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TransactionQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// `date`, `amount` or `id`, prefixed with `-` for descending.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ordering: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<i64>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<TransactionType>,
    #[serde(rename = "amount__gte", skip_serializing_if = "Option::is_none")]
    pub min_amount: Option<Decimal>,
    #[serde(rename = "amount__lte", skip_serializing_if = "Option::is_none")]
    pub max_amount: Option<Decimal>,
    #[serde(rename = "date__gte", skip_serializing_if = "Option::is_none")]
    pub from: Option<NaiveDate>,
    #[serde(rename = "date__lte", skip_serializing_if = "Option::is_none")]
    pub to: Option<NaiveDate>,
    #[serde(
        rename = "description__icontains",
        skip_serializing_if = "Option::is_none"
    )]
    pub description_contains: Option<String>,
}

pub struct Transactions;

impl Resource for Transactions {
    const PATH: &'static str = "transactions/";
    type Item = Transaction;
    type Create = NewTransaction;
    type Patch = TransactionPatch;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::query_pairs;
    use std::str::FromStr;

    #[test]
    fn test_transaction_from_backend_json() {
        let tx: Transaction = serde_json::from_str(
            r#"{"id": 7, "category_id": 2, "amount": "12.50", "type": "EX",
                "description": "Lunch", "date": "2024-03-01"}"#,
        )
        .unwrap();
        assert_eq!(tx.kind, TransactionType::Expense);
        assert_eq!(tx.amount, Decimal::from_str("12.50").unwrap());
        assert_eq!(tx.signed_amount(), Decimal::from_str("-12.50").unwrap());
        assert_eq!(tx.transfer, None);
    }

    #[test]
    fn test_new_transaction_body() {
        let body = serde_json::to_value(NewTransaction {
            category_id: 3,
            amount: Decimal::from_str("100.00").unwrap(),
            kind: TransactionType::Income,
            description: String::new(),
            date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "category_id": 3,
                "amount": "100.00",
                "type": "IN",
                "date": "2024-01-31"
            })
        );
    }

    #[test]
    fn test_query_uses_filter_names() {
        let query = TransactionQuery {
            kind: Some(TransactionType::Expense),
            from: NaiveDate::from_ymd_opt(2024, 2, 1),
            min_amount: Some(Decimal::from(10)),
            ordering: Some("-date".into()),
            ..Default::default()
        };
        let mut pairs = query_pairs(&query);
        pairs.sort();
        assert_eq!(
            pairs,
            vec![
                ("amount__gte".to_string(), "10".to_string()),
                ("date__gte".to_string(), "2024-02-01".to_string()),
                ("ordering".to_string(), "-date".to_string()),
                ("type".to_string(), "EX".to_string()),
            ]
        );
    }

    #[test]
    fn test_type_parse() {
        assert_eq!("in".parse::<TransactionType>().unwrap(), TransactionType::Income);
        assert_eq!("Expense".parse::<TransactionType>().unwrap(), TransactionType::Expense);
        assert!("transfer".parse::<TransactionType>().is_err());
    }
}
