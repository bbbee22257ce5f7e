use crate::db::BuffetDb;
use crate::tools::registry::Tool;
use crate::types::{AppError, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

fn parse_args<T: serde::de::DeserializeOwned>(tool: &str, args: Value) -> Result<T> {
    serde_json::from_value(args)
        .map_err(|e| AppError::Validation(format!("Invalid arguments for {}: {}", tool, e)))
}

fn parse_date(field: &str, value: &str) -> Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        AppError::Validation(format!(
            "Invalid {}: '{}' (expected YYYY-MM-DD)",
            field, value
        ))
    })?;
    Ok(date.and_time(NaiveTime::MIN).and_utc())
}

fn require_positive(amount: f64) -> Result<()> {
    if amount <= 0.0 {
        return Err(AppError::Validation(
            "Amount must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

pub struct CreateTransaction {
    db: Arc<BuffetDb>,
}

impl CreateTransaction {
    pub fn new(db: Arc<BuffetDb>) -> Self {
        Self { db }
    }
}

#[derive(Deserialize)]
struct CreateTransactionArgs {
    user: String,
    category_id: i64,
    amount: f64,
    date: Option<String>,
    description: Option<String>,
}

#[async_trait]
impl Tool for CreateTransaction {
    fn name(&self) -> &str {
        "create_transaction"
    }

    fn description(&self) -> &str {
        "Record a transaction in one of the user's categories. The date defaults to today"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "user": { "type": "string", "description": "The user's ID" },
                "category_id": { "type": "integer", "description": "ID of the category" },
                "amount": { "type": "number", "description": "Positive amount of the transaction" },
                "date": { "type": "string", "description": "Transaction date as YYYY-MM-DD" },
                "description": { "type": "string", "description": "Optional note" }
            },
            "required": ["user", "category_id", "amount"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String> {
        let args: CreateTransactionArgs = parse_args(self.name(), args)?;
        require_positive(args.amount)?;

        let date = match args.date.as_deref() {
            Some(raw) => parse_date("date", raw)?,
            None => Utc::now(),
        };

        if self
            .db
            .get_category(&args.user, args.category_id)
            .await?
            .is_none()
        {
            return Ok(format!("No category found with ID {}.", args.category_id));
        }

        tracing::debug!(user = %args.user, category = args.category_id, amount = args.amount, "creating transaction");
        let id = self
            .db
            .create_transaction(
                &args.user,
                args.category_id,
                args.amount,
                date,
                args.description.as_deref(),
            )
            .await?;
        Ok(format!("Transaction ID: {}", id))
    }
}

pub struct SearchTransactions {
    db: Arc<BuffetDb>,
}

impl SearchTransactions {
    pub fn new(db: Arc<BuffetDb>) -> Self {
        Self { db }
    }
}

#[derive(Deserialize)]
struct SearchTransactionsArgs {
    user: String,
    category: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    limit: Option<u32>,
}

#[async_trait]
impl Tool for SearchTransactions {
    fn name(&self) -> &str {
        "search_transactions"
    }

    fn description(&self) -> &str {
        "Search the user's transactions, newest first, optionally filtered by category name and date range"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "user": { "type": "string", "description": "The user's ID" },
                "category": { "type": "string", "description": "Full or partial category name" },
                "start_date": { "type": "string", "description": "Earliest date as YYYY-MM-DD" },
                "end_date": { "type": "string", "description": "Latest date as YYYY-MM-DD" },
                "limit": { "type": "integer", "description": "Maximum number of results" }
            },
            "required": ["user"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String> {
        let args: SearchTransactionsArgs = parse_args(self.name(), args)?;

        let start = args
            .start_date
            .as_deref()
            .map(|raw| parse_date("start_date", raw))
            .transpose()?;
        let end = args
            .end_date
            .as_deref()
            .map(|raw| parse_date("end_date", raw))
            .transpose()?;

        let transactions = self
            .db
            .search_transactions(&args.user, args.category.as_deref(), start, end, args.limit)
            .await?;

        if transactions.is_empty() {
            return Ok("No transactions were found.".to_string());
        }

        let lines: Vec<String> = transactions
            .iter()
            .map(|t| {
                let description = t.description.as_deref().unwrap_or("-");
                format!(
                    "ID: {}, Category: {}, Amount: {:.2}, Date: {}, Description: {}",
                    t.id,
                    t.category_name,
                    t.amount,
                    t.date.format("%Y-%m-%d"),
                    description
                )
            })
            .collect();
        Ok(lines.join("\n"))
    }
}

pub struct UpdateTransaction {
    db: Arc<BuffetDb>,
}

impl UpdateTransaction {
    pub fn new(db: Arc<BuffetDb>) -> Self {
        Self { db }
    }
}

#[derive(Deserialize)]
struct UpdateTransactionArgs {
    user: String,
    transaction_id: i64,
    amount: f64,
}

#[async_trait]
impl Tool for UpdateTransaction {
    fn name(&self) -> &str {
        "update_transaction"
    }

    fn description(&self) -> &str {
        "Change the amount of one of the user's transactions"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "user": { "type": "string", "description": "The user's ID" },
                "transaction_id": { "type": "integer", "description": "ID of the transaction" },
                "amount": { "type": "number", "description": "New positive amount" }
            },
            "required": ["user", "transaction_id", "amount"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String> {
        let args: UpdateTransactionArgs = parse_args(self.name(), args)?;
        require_positive(args.amount)?;

        let updated = self
            .db
            .update_transaction_amount(&args.user, args.transaction_id, args.amount)
            .await?;
        if updated == 0 {
            Ok(format!(
                "No transaction found with ID {}.",
                args.transaction_id
            ))
        } else {
            Ok("Transaction updated successfully.".to_string())
        }
    }
}

pub struct DeleteTransaction {
    db: Arc<BuffetDb>,
}

impl DeleteTransaction {
    pub fn new(db: Arc<BuffetDb>) -> Self {
        Self { db }
    }
}

#[derive(Deserialize)]
struct DeleteTransactionArgs {
    user_id: String,
    transaction_id: i64,
}

#[async_trait]
impl Tool for DeleteTransaction {
    fn name(&self) -> &str {
        "delete_transaction"
    }

    fn description(&self) -> &str {
        "Delete one of the user's transactions"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "user_id": { "type": "string", "description": "The user's ID" },
                "transaction_id": { "type": "integer", "description": "ID of the transaction to delete" }
            },
            "required": ["user_id", "transaction_id"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String> {
        let args: DeleteTransactionArgs = parse_args(self.name(), args)?;
        tracing::debug!(user = %args.user_id, id = args.transaction_id, "deleting transaction");

        let deleted = self
            .db
            .delete_transaction(&args.user_id, args.transaction_id)
            .await?;
        if deleted {
            Ok("Transaction deleted successfully.".to_string())
        } else {
            Ok(format!(
                "No transaction found with ID {}.",
                args.transaction_id
            ))
        }
    }
}
