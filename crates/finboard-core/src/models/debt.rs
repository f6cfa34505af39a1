use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Resource;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Debt {
    pub id: i64,
    pub name: String,
    pub principal: Decimal,
    /// Percent per annum.
    pub interest_rate: Decimal,
    pub minimum_payment: Decimal,
    #[serde(default)]
    pub opened_date: Option<NaiveDate>,
    #[serde(default)]
    pub category: Option<i64>,
    /// Principal minus payments so far, computed by the server.
    #[serde(default)]
    pub balance: Option<Decimal>,
}

impl Debt {
    pub fn balance(&self) -> Decimal {
        self.balance.unwrap_or(self.principal)
    }

    pub fn is_paid_off(&self) -> bool {
        self.balance() <= Decimal::ZERO
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewDebt {
    pub name: String,
    pub principal: Decimal,
    pub interest_rate: Decimal,
    pub minimum_payment: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opened_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DebtPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interest_rate: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_payment: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opened_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<i64>,
}

pub struct Debts;

impl Resource for Debts {
    const PATH: &'static str = "debts/";
    type Item = Debt;
    type Create = NewDebt;
    type Patch = DebtPatch;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub debt: i64,
    pub amount: Decimal,
    pub date: NaiveDate,
    #[serde(default)]
    pub memo: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewPayment {
    pub debt: i64,
    pub amount: Decimal,
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub memo: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PaymentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

pub struct Payments;

impl Resource for Payments {
    const PATH: &'static str = "payments/";
    type Item = Payment;
    type Create = NewPayment;
    type Patch = PaymentPatch;
}
