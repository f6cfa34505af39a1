//! Typed CRUD over the finance resources.
//!
//! The generic calls take a [`Resource`] marker for the path and payload
//! types; the named helpers below cover the endpoints with extra query
//! parameters or client-side checks.

use reqwest::Url;
use serde::Serialize;
use tracing::{debug, warn};

use crate::models::{
    Budget, BudgetQuery, Budgets, Categories, Category, CategoryQuery, Goal, GoalQuery, Goals,
    NewTransfer, Page, Payment, Payments, PostedRecurring, Resource, Summary, SummaryQuery,
    Transaction, TransactionQuery, Transactions, Transfer, TransferQuery, Transfers,
};

use super::{query_pairs, ApiClient, ApiError, ApiRequest};

/// Upper bound on pages fetched by `list_all`, in case a server keeps
/// returning a `next` link.
const MAX_PAGES: usize = 500;

#[derive(Serialize)]
struct PaymentFilter {
    debt: i64,
}

impl ApiClient {
    fn collection_url<R: Resource>(&self) -> String {
        self.resource_url(R::PATH)
    }

    fn item_url<R: Resource>(&self, id: i64) -> String {
        self.resource_url(&format!("{}{}/", R::PATH, id))
    }

    /// Whether `url` points at the configured API host, so the bearer token
    /// may be sent there.
    fn is_same_origin(&self, url: &str) -> bool {
        match (Url::parse(url), Url::parse(&self.session().config().api_base)) {
            (Ok(link), Ok(base)) => link.origin() == base.origin(),
            _ => false,
        }
    }

    /// First page of a collection.
    pub async fn list<R: Resource>(
        &self,
        query: Vec<(String, String)>,
    ) -> Result<Page<R::Item>, ApiError> {
        self.get(&self.collection_url::<R>(), query).await
    }

    /// Every item of a collection, following `next` links.
    pub async fn list_all<R: Resource>(
        &self,
        query: Vec<(String, String)>,
    ) -> Result<Vec<R::Item>, ApiError> {
        let first: Page<R::Item> = self.list::<R>(query).await?;
        let mut next = first.next;
        let mut items = first.results;
        let mut pages = 1;

        while let Some(url) = next {
            if pages >= MAX_PAGES {
                warn!(path = R::PATH, pages, "Stopped following pagination links");
                break;
            }
            if !self.is_same_origin(&url) {
                warn!(
                    path = R::PATH,
                    url = %url,
                    "Pagination link leaves the API host, not following"
                );
                break;
            }
            debug!(url = %url, "Fetching next page");
            // The link already carries the original filters
            let page: Page<R::Item> = self.send_json(&ApiRequest::get(url)).await?;
            items.extend(page.results);
            next = page.next;
            pages += 1;
        }
        Ok(items)
    }

    pub async fn retrieve<R: Resource>(&self, id: i64) -> Result<R::Item, ApiError> {
        self.get(&self.item_url::<R>(id), Vec::new()).await
    }

    pub async fn create<R: Resource>(&self, body: &R::Create) -> Result<R::Item, ApiError> {
        self.post(&self.collection_url::<R>(), body).await
    }

    /// Partial update; fields left `None` in the patch are not sent.
    pub async fn update<R: Resource>(&self, id: i64, patch: &R::Patch) -> Result<R::Item, ApiError> {
        self.patch(&self.item_url::<R>(id), patch).await
    }

    pub async fn delete<R: Resource>(&self, id: i64) -> Result<(), ApiError> {
        self.delete_at(&self.item_url::<R>(id)).await
    }

    // ===== Named helpers =====

    pub async fn list_transactions(
        &self,
        query: &TransactionQuery,
    ) -> Result<Page<Transaction>, ApiError> {
        self.list::<Transactions>(query_pairs(query)).await
    }

    pub async fn list_categories(&self, query: &CategoryQuery) -> Result<Vec<Category>, ApiError> {
        self.list_all::<Categories>(query_pairs(query)).await
    }

    pub async fn list_budgets(&self, query: &BudgetQuery) -> Result<Vec<Budget>, ApiError> {
        self.list_all::<Budgets>(query_pairs(query)).await
    }

    pub async fn list_goals(&self, query: &GoalQuery) -> Result<Vec<Goal>, ApiError> {
        self.list_all::<Goals>(query_pairs(query)).await
    }

    /// Payments made against one debt, newest first.
    pub async fn list_payments(&self, debt_id: i64) -> Result<Vec<Payment>, ApiError> {
        self.list_all::<Payments>(query_pairs(&PaymentFilter { debt: debt_id }))
            .await
    }

    pub async fn list_transfers(&self, query: &TransferQuery) -> Result<Page<Transfer>, ApiError> {
        self.list::<Transfers>(query_pairs(query)).await
    }

    /// Create a transfer after checking it locally. An invalid transfer is
    /// rejected with [`ApiError::Validation`] and never sent.
    pub async fn create_transfer(&self, transfer: &NewTransfer) -> Result<Transfer, ApiError> {
        transfer.validate().map_err(ApiError::Validation)?;
        self.create::<Transfers>(transfer).await
    }

    pub async fn fetch_summary(&self, query: &SummaryQuery) -> Result<Summary, ApiError> {
        self.get(&self.resource_url("summary/"), query_pairs(query))
            .await
    }

    /// Ask the server to book every recurring item due today.
    pub async fn post_due_recurring(&self) -> Result<PostedRecurring, ApiError> {
        self.post(&self.resource_url("post-recurring/"), &serde_json::json!({}))
            .await
    }
}
