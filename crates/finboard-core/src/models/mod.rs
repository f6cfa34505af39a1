//! Data models for the finance API.
//!
//! This module contains the request and response shapes for every REST
//! resource the client talks to:
//!
//! - `Category`, `Transaction`, `RecurringTransaction`: the ledger
//! - `Budget`, `Goal`: limits and savings targets
//! - `Debt`, `Payment`, `Transfer`: money moved between buckets
//! - `Summary`: the dashboard aggregate
//! - `Page`: the one list shape every list endpoint is normalized into
//!
//! Amounts are `Decimal` (the backend renders them as strings) and dates are
//! `NaiveDate`.

use serde::{de::DeserializeOwned, Serialize};

pub mod budget;
pub mod category;
pub mod debt;
pub mod goal;
pub mod page;
pub mod recurring;
pub mod summary;
pub mod transaction;
pub mod transfer;
pub mod user;

pub use budget::{Budget, BudgetPatch, BudgetPeriod, BudgetQuery, Budgets, NewBudget};
pub use category::{Categories, Category, CategoryPayload, CategoryQuery};
pub use debt::{Debt, DebtPatch, Debts, NewDebt, NewPayment, Payment, PaymentPatch, Payments};
pub use goal::{Goal, GoalPatch, GoalQuery, Goals, NewGoal};
pub use page::Page;
pub use recurring::{
    NewRecurring, PostedRecurring, RecurringPatch, RecurringTransaction, Recurrings,
};
pub use summary::{CategoryTotal, GoalProgress, Summary, SummaryQuery};
pub use transaction::{
    NewTransaction, Transaction, TransactionPatch, TransactionQuery, TransactionType,
    Transactions,
};
pub use transfer::{NewTransfer, Transfer, TransferPatch, TransferQuery, Transfers};
pub use user::{Registration, User};

/// A REST collection under the finance prefix.
///
/// Implemented by zero-sized markers (`Transactions`, `Budgets`, ...) so the
/// generic CRUD calls in `api::resources` know the path and payload types.
pub trait Resource {
    /// Collection path relative to the API prefix, with a trailing slash.
    const PATH: &'static str;

    type Item: DeserializeOwned + Send;
    type Create: Serialize + Sync;
    type Patch: Serialize + Sync;
}
