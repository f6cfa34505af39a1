//! Plain-text rendering of API results.

use finboard_core::models::{
    category::category_name, Budget, Category, Debt, Goal, Page, Payment, PostedRecurring,
    RecurringTransaction, Summary, Transaction, Transfer, User,
};
use finboard_core::utils::{
    format_amount, format_date, format_optional_date, format_percent, truncate_string,
};

const DESCRIPTION_WIDTH: usize = 32;
const NAME_WIDTH: usize = 24;

fn category_label(categories: &[Category], id: i64) -> String {
    category_name(categories, id)
        .map(|name| truncate_string(name, NAME_WIDTH))
        .unwrap_or_else(|| format!("#{}", id))
}

fn page_footer<T>(page: &Page<T>) {
    if page.has_next() {
        println!("\n{} of {} shown, more with --page", page.len(), page.count);
    } else {
        println!("\n{} total", page.count);
    }
}

pub fn user(user: &User) {
    println!("{} <{}>", user.display_name(), user.email);
}

pub fn summary(summary: &Summary) {
    println!("Income   {:>14}", format_amount(summary.income_total));
    println!("Expenses {:>14}", format_amount(summary.expense_total));
    println!("Net      {:>14}", format_amount(summary.net()));

    if !summary.by_category.is_empty() {
        println!("\nBy category");
        for total in &summary.by_category {
            let name = total.name.as_deref().unwrap_or("Uncategorized");
            println!(
                "  {:<width$} {:>14}",
                truncate_string(name, NAME_WIDTH),
                format_amount(total.total),
                width = NAME_WIDTH
            );
        }
    }

    if !summary.goals.is_empty() {
        println!("\nGoals");
        for goal in &summary.goals {
            println!(
                "  {:<width$} {:>14} / {:<14} {:>6}%  {}",
                truncate_string(&goal.name, NAME_WIDTH),
                format_amount(goal.saved),
                format_amount(goal.target),
                goal.percent,
                format_optional_date(goal.deadline, "-"),
                width = NAME_WIDTH
            );
        }
    }
}

pub fn transactions(page: &Page<Transaction>, categories: &[Category]) {
    if page.is_empty() {
        println!("No transactions");
        return;
    }
    for tx in page {
        println!(
            "{:>6}  {}  {:<width$} {:>14}  {}",
            tx.id,
            format_date(tx.date),
            category_label(categories, tx.category_id),
            format_amount(tx.signed_amount()),
            truncate_string(&tx.description, DESCRIPTION_WIDTH),
            width = NAME_WIDTH
        );
    }
    page_footer(page);
}

pub fn categories(categories: &[Category]) {
    if categories.is_empty() {
        println!("No categories");
        return;
    }
    for category in categories {
        println!("{:>6}  {}", category.id, category.name);
    }
}

pub fn budgets(budgets: &[Budget], categories: &[Category]) {
    if budgets.is_empty() {
        println!("No budgets");
        return;
    }
    for budget in budgets {
        let marker = if budget.is_over_limit() { "  over" } else { "" };
        println!(
            "{:>6}  {:<width$} {:<8} {:>14} / {:<14} {:>7}{}",
            budget.id,
            category_label(categories, budget.category),
            budget.period.to_string(),
            format_amount(budget.amount_spent),
            format_amount(budget.limit),
            format_percent(budget.percent_used()),
            marker,
            width = NAME_WIDTH
        );
    }
}

pub fn goals(goals: &[Goal]) {
    if goals.is_empty() {
        println!("No goals");
        return;
    }
    for goal in goals {
        println!(
            "{:>6}  {:<width$} {:>14} / {:<14} {:>6}%  {}",
            goal.id,
            truncate_string(&goal.name, NAME_WIDTH),
            format_amount(goal.current_amount),
            format_amount(goal.target_amount),
            goal.progress_percent(),
            format_optional_date(goal.target_date, "no deadline"),
            width = NAME_WIDTH
        );
    }
}

pub fn debts(debts: &[Debt]) {
    if debts.is_empty() {
        println!("No debts");
        return;
    }
    for debt in debts {
        let status = if debt.is_paid_off() { "paid off" } else { "" };
        println!(
            "{:>6}  {:<width$} {:>14} {:>7}%  min {:>10}  {}",
            debt.id,
            truncate_string(&debt.name, NAME_WIDTH),
            format_amount(debt.balance()),
            debt.interest_rate,
            format_amount(debt.minimum_payment),
            status,
            width = NAME_WIDTH
        );
    }
}

pub fn payments(payments: &[Payment]) {
    if payments.is_empty() {
        println!("No payments");
        return;
    }
    for payment in payments {
        println!(
            "{:>6}  {}  {:>14}  {}",
            payment.id,
            format_date(payment.date),
            format_amount(payment.amount),
            truncate_string(&payment.memo, DESCRIPTION_WIDTH)
        );
    }
}

pub fn transfers(page: &Page<Transfer>, categories: &[Category]) {
    if page.is_empty() {
        println!("No transfers");
        return;
    }
    for transfer in page {
        println!(
            "{:>6}  {}  {} -> {}  {:>14}  {}",
            transfer.id,
            format_date(transfer.date),
            category_label(categories, transfer.source_category),
            category_label(categories, transfer.destination_category),
            format_amount(transfer.amount),
            truncate_string(&transfer.description, DESCRIPTION_WIDTH)
        );
    }
    page_footer(page);
}

pub fn recurrings(items: &[RecurringTransaction]) {
    if items.is_empty() {
        println!("No recurring transactions");
        return;
    }
    for item in items {
        let state = if item.active { "" } else { "  (paused)" };
        println!(
            "{:>6}  {:<8} {:>14}  next {}  {}{}",
            item.id,
            item.kind.to_string(),
            format_amount(item.amount),
            format_date(item.next_occurrence),
            truncate_string(&item.description, DESCRIPTION_WIDTH),
            state
        );
    }
}

pub fn posted(result: &PostedRecurring) {
    match result.posted {
        0 => println!("Nothing due on {}", format_date(result.date)),
        1 => println!("Posted 1 transaction for {}", format_date(result.date)),
        n => println!("Posted {} transactions for {}", n, format_date(result.date)),
    }
}

pub fn created(kind: &str, id: i64) {
    println!("Created {} {}", kind, id);
}

pub fn deleted(kind: &str, id: i64) {
    println!("Deleted {} {}", kind, id);
}
