//! Command line surface and dispatch.
//!
//! Every data command names the [`Route`] it renders so the router can gate
//! it; `execute` runs a command once the guard has let it through.

use chrono::{Local, NaiveDate};
use clap::{Args, Subcommand};
use rust_decimal::Decimal;

use finboard_core::api::{ApiClient, ApiError};
use finboard_core::models::{
    BudgetPeriod, BudgetQuery, Budgets, Categories, CategoryPayload, CategoryQuery, Debts, GoalQuery,
    Goals, NewBudget, NewGoal, NewTransaction, NewTransfer, Recurrings, SummaryQuery,
    TransactionQuery, TransactionType, Transactions, TransferQuery,
};
use finboard_core::{Location, Route};

use crate::views;

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Sign in and remember the credentials
    Login {
        /// Username or email, depending on the server
        identifier: Option<String>,
    },

    /// Forget the stored credentials
    Logout,

    /// Show whether a session is stored and which server is configured
    Status,

    /// Create an account (does not sign in)
    Register {
        email: String,
        #[arg(long, default_value = "")]
        first_name: String,
        #[arg(long, default_value = "")]
        last_name: String,
    },

    /// Show the signed-in user
    Whoami,

    /// Income, expenses and goal progress
    Summary {
        /// First day to include (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Last day to include (YYYY-MM-DD)
        #[arg(long)]
        end: Option<NaiveDate>,
    },

    #[command(subcommand)]
    Transactions(TransactionsCommand),

    #[command(subcommand)]
    Categories(CategoriesCommand),

    #[command(subcommand)]
    Budgets(BudgetsCommand),

    #[command(subcommand)]
    Goals(GoalsCommand),

    #[command(subcommand)]
    Debts(DebtsCommand),

    /// Payments made against one debt
    Payments { debt_id: i64 },

    #[command(subcommand)]
    Transfers(TransfersCommand),

    #[command(subcommand)]
    Recurrings(RecurringsCommand),
}

/// Transactions
#[derive(Subcommand, Debug, Clone)]
pub enum TransactionsCommand {
    /// List transactions, newest first
    List(TransactionFilter),
    /// Record a transaction
    Add {
        #[arg(long)]
        category: i64,
        #[arg(long)]
        amount: Decimal,
        /// `in` or `ex`
        #[arg(long = "type", default_value = "ex")]
        kind: TransactionType,
        /// Defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, default_value = "")]
        description: String,
    },
    Delete { id: i64 },
}

#[derive(Args, Debug, Clone, Default)]
pub struct TransactionFilter {
    #[arg(long)]
    pub page: Option<u32>,
    #[arg(long)]
    pub category: Option<i64>,
    #[arg(long = "type")]
    pub kind: Option<TransactionType>,
    #[arg(long)]
    pub from: Option<NaiveDate>,
    #[arg(long)]
    pub to: Option<NaiveDate>,
    /// Search the description
    #[arg(long)]
    pub search: Option<String>,
}

/// Categories
#[derive(Subcommand, Debug, Clone)]
pub enum CategoriesCommand {
    List {
        /// Only names containing this text
        #[arg(long)]
        name: Option<String>,
    },
    Add { name: String },
    Rename { id: i64, name: String },
    Delete { id: i64 },
}

/// Budgets
#[derive(Subcommand, Debug, Clone)]
pub enum BudgetsCommand {
    List {
        #[arg(long)]
        category: Option<i64>,
        #[arg(long)]
        period: Option<BudgetPeriod>,
    },
    Add {
        #[arg(long)]
        category: i64,
        #[arg(long)]
        limit: Decimal,
        /// `m` or `y`
        #[arg(long, default_value = "m")]
        period: BudgetPeriod,
    },
    Delete { id: i64 },
}

/// Savings goals
#[derive(Subcommand, Debug, Clone)]
pub enum GoalsCommand {
    List {
        #[arg(long)]
        name: Option<String>,
    },
    Add {
        name: String,
        #[arg(long)]
        target: Decimal,
        #[arg(long)]
        saved: Option<Decimal>,
        #[arg(long)]
        by: Option<NaiveDate>,
    },
}

/// Debts
#[derive(Subcommand, Debug, Clone)]
pub enum DebtsCommand {
    /// List debts with their remaining balance
    List,
}

/// Transfers between categories
#[derive(Subcommand, Debug, Clone)]
pub enum TransfersCommand {
    List {
        #[arg(long)]
        page: Option<u32>,
    },
    Add {
        /// Source category id
        #[arg(long)]
        from: i64,
        /// Destination category id
        #[arg(long)]
        to: i64,
        #[arg(long)]
        amount: Decimal,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, default_value = "")]
        description: String,
    },
}

/// Recurring transactions
#[derive(Subcommand, Debug, Clone)]
pub enum RecurringsCommand {
    List,
    /// Book every recurring item due today
    PostDue,
}

impl Command {
    /// The view this command renders, or `None` for commands that work
    /// without a session.
    pub fn route(&self) -> Option<Route> {
        match self {
            Command::Login { .. } | Command::Logout | Command::Status | Command::Register { .. } => {
                None
            }
            Command::Whoami => Some(Route::Profile),
            Command::Summary { .. } => Some(Route::Summary),
            Command::Transactions(_) => Some(Route::Transactions),
            Command::Categories(_) => Some(Route::Categories),
            Command::Budgets(_) => Some(Route::Budgets),
            Command::Goals(_) => Some(Route::Goals),
            Command::Debts(_) => Some(Route::Debts),
            Command::Payments { debt_id } => Some(Route::Payments { debt: *debt_id }),
            Command::Transfers(_) => Some(Route::Transfers),
            Command::Recurrings(_) => Some(Route::Recurrings),
        }
    }

    pub fn location(&self) -> Option<Location> {
        let route = self.route()?;
        let mut location = Location::from(route);
        if let Command::Transactions(TransactionsCommand::List(filter)) = self {
            location.query = filter.page.map(|page| format!("page={}", page));
        }
        Some(location)
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Run a gated command against the API and print the result.
pub async fn execute(api: &ApiClient, command: &Command) -> Result<(), ApiError> {
    match command {
        Command::Whoami => views::user(&api.me().await?),
        Command::Summary { start, end } => {
            let query = SummaryQuery {
                start: *start,
                end: *end,
            };
            views::summary(&api.fetch_summary(&query).await?);
        }
        Command::Transactions(cmd) => transactions(api, cmd).await?,
        Command::Categories(cmd) => categories(api, cmd).await?,
        Command::Budgets(cmd) => budgets(api, cmd).await?,
        Command::Goals(cmd) => goals(api, cmd).await?,
        Command::Debts(DebtsCommand::List) => {
            views::debts(&api.list_all::<Debts>(Vec::new()).await?)
        }
        Command::Payments { debt_id } => views::payments(&api.list_payments(*debt_id).await?),
        Command::Transfers(cmd) => transfers(api, cmd).await?,
        Command::Recurrings(RecurringsCommand::List) => {
            views::recurrings(&api.list_all::<Recurrings>(Vec::new()).await?)
        }
        Command::Recurrings(RecurringsCommand::PostDue) => {
            views::posted(&api.post_due_recurring().await?)
        }
        Command::Login { .. } | Command::Logout | Command::Status | Command::Register { .. } => {}
    }
    Ok(())
}

async fn transactions(api: &ApiClient, cmd: &TransactionsCommand) -> Result<(), ApiError> {
    match cmd {
        TransactionsCommand::List(filter) => {
            let query = TransactionQuery {
                page: filter.page,
                category: filter.category,
                kind: filter.kind,
                from: filter.from,
                to: filter.to,
                search: filter.search.clone(),
                ..Default::default()
            };
            let page = api.list_transactions(&query).await?;
            let categories = api.list_categories(&CategoryQuery::default()).await?;
            views::transactions(&page, &categories);
        }
        TransactionsCommand::Add {
            category,
            amount,
            kind,
            date,
            description,
        } => {
            let body = NewTransaction {
                category_id: *category,
                amount: *amount,
                kind: *kind,
                description: description.clone(),
                date: date.unwrap_or_else(today),
            };
            let created = api.create::<Transactions>(&body).await?;
            views::created("transaction", created.id);
        }
        TransactionsCommand::Delete { id } => {
            api.delete::<Transactions>(*id).await?;
            views::deleted("transaction", *id);
        }
    }
    Ok(())
}

async fn categories(api: &ApiClient, cmd: &CategoriesCommand) -> Result<(), ApiError> {
    match cmd {
        CategoriesCommand::List { name } => {
            let query = CategoryQuery {
                name_contains: name.clone(),
            };
            views::categories(&api.list_categories(&query).await?);
        }
        CategoriesCommand::Add { name } => {
            let created = api
                .create::<Categories>(&CategoryPayload { name: name.clone() })
                .await?;
            views::created("category", created.id);
        }
        CategoriesCommand::Rename { id, name } => {
            let updated = api
                .update::<Categories>(*id, &CategoryPayload { name: name.clone() })
                .await?;
            println!("Category {} is now \"{}\"", updated.id, updated.name);
        }
        CategoriesCommand::Delete { id } => {
            api.delete::<Categories>(*id).await?;
            views::deleted("category", *id);
        }
    }
    Ok(())
}

async fn budgets(api: &ApiClient, cmd: &BudgetsCommand) -> Result<(), ApiError> {
    match cmd {
        BudgetsCommand::List { category, period } => {
            let query = BudgetQuery {
                category: *category,
                period: *period,
                ..Default::default()
            };
            let budgets = api.list_budgets(&query).await?;
            let categories = api.list_categories(&CategoryQuery::default()).await?;
            views::budgets(&budgets, &categories);
        }
        BudgetsCommand::Add {
            category,
            limit,
            period,
        } => {
            let body = NewBudget {
                category: *category,
                limit: *limit,
                period: *period,
            };
            let created = api.create::<Budgets>(&body).await?;
            views::created("budget", created.id);
        }
        BudgetsCommand::Delete { id } => {
            api.delete::<Budgets>(*id).await?;
            views::deleted("budget", *id);
        }
    }
    Ok(())
}

async fn goals(api: &ApiClient, cmd: &GoalsCommand) -> Result<(), ApiError> {
    match cmd {
        GoalsCommand::List { name } => {
            let query = GoalQuery {
                name_contains: name.clone(),
            };
            views::goals(&api.list_goals(&query).await?);
        }
        GoalsCommand::Add {
            name,
            target,
            saved,
            by,
        } => {
            let body = NewGoal {
                name: name.clone(),
                target_amount: *target,
                current_amount: *saved,
                target_date: *by,
            };
            let created = api.create::<Goals>(&body).await?;
            views::created("goal", created.id);
        }
    }
    Ok(())
}

async fn transfers(api: &ApiClient, cmd: &TransfersCommand) -> Result<(), ApiError> {
    match cmd {
        TransfersCommand::List { page } => {
            let query = TransferQuery {
                page: *page,
                ..Default::default()
            };
            let page = api.list_transfers(&query).await?;
            let categories = api.list_categories(&CategoryQuery::default()).await?;
            views::transfers(&page, &categories);
        }
        TransfersCommand::Add {
            from,
            to,
            amount,
            date,
            description,
        } => {
            let body = NewTransfer {
                source_category: *from,
                destination_category: *to,
                amount: *amount,
                date: date.unwrap_or_else(today),
                description: description.clone(),
            };
            let created = api.create_transfer(&body).await?;
            views::created("transfer", created.id);
        }
    }
    Ok(())
}
