//! Database client for Mr Buffet
//!
//! A libsql-backed relational store holding the finance entities
//! (categories, transactions, goals) and the agent configuration records.
//! The schema is initialized on startup; all finance rows are scoped by the
//! owning user identifier.

use chrono::{DateTime, Utc};
use libsql::{Builder, Connection, Database};

use crate::types::{AgentSettings, AppError, Category, Result, Transaction};

pub struct BuffetDb {
    db: Database,
}

impl BuffetDb {
    /// Open (or create) a local database file and initialize the schema.
    pub async fn new(path: &str) -> Result<Self> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    AppError::Database(format!("Failed to create database directory: {}", e))
                })?;
            }
        }

        let db = Builder::new_local(path)
            .build()
            .await
            .map_err(|e| AppError::Database(format!("Failed to open database: {}", e)))?;

        let client = Self { db };
        client.initialize_schema().await?;

        Ok(client)
    }

    pub fn connection(&self) -> Result<Connection> {
        self.db
            .connect()
            .map_err(|e| AppError::Database(format!("Failed to get connection: {}", e)))
    }

    async fn initialize_schema(&self) -> Result<()> {
        let conn = self.connection()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user TEXT NOT NULL,
                name TEXT NOT NULL,
                normalized_name TEXT NOT NULL,
                is_income INTEGER NOT NULL DEFAULT 0,
                limit_amount REAL
            )",
            (),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to create categories table: {}", e)))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user TEXT NOT NULL,
                category_id INTEGER NOT NULL,
                amount REAL NOT NULL,
                date INTEGER NOT NULL,
                description TEXT,
                FOREIGN KEY (category_id) REFERENCES categories(id)
            )",
            (),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to create transactions table: {}", e)))?;

        // Tracked per user+category; not exposed to the agent yet.
        conn.execute(
            "CREATE TABLE IF NOT EXISTS goals (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user TEXT NOT NULL,
                category_id INTEGER NOT NULL,
                target_amount REAL NOT NULL,
                current_amount REAL NOT NULL DEFAULT 0,
                FOREIGN KEY (category_id) REFERENCES categories(id)
            )",
            (),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to create goals table: {}", e)))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS agent_settings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                prompt TEXT NOT NULL,
                model TEXT NOT NULL DEFAULT 'gpt-4o-mini',
                is_default INTEGER NOT NULL DEFAULT 0
            )",
            (),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to create agent_settings table: {}", e)))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS agent_settings_to_user (
                user_id TEXT PRIMARY KEY,
                agent_settings_id INTEGER NOT NULL,
                FOREIGN KEY (agent_settings_id) REFERENCES agent_settings(id)
            )",
            (),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to create agent_settings_to_user table: {}", e))
        })?;

        Ok(())
    }

    // ============= Category operations =============

    /// The normalized name is the upper-cased trimmed name, maintained here
    /// so every write path stays consistent.
    pub fn normalize_name(name: &str) -> String {
        name.trim().to_uppercase()
    }

    pub async fn create_category(&self, user: &str, name: &str) -> Result<Category> {
        let conn = self.connection()?;
        let normalized = Self::normalize_name(name);

        conn.execute(
            "INSERT INTO categories (user, name, normalized_name, is_income, limit_amount)
             VALUES (?, ?, ?, 0, NULL)",
            (user, name, normalized.as_str()),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to create category: {}", e)))?;

        let id = conn.last_insert_rowid();

        Ok(Category {
            id,
            user: user.to_string(),
            name: name.to_string(),
            normalized_name: normalized,
            is_income: false,
            limit_amount: None,
        })
    }

    /// First category whose normalized name contains the normalized fragment.
    pub async fn find_category_by_name(
        &self,
        user: &str,
        fragment: &str,
    ) -> Result<Option<Category>> {
        let conn = self.connection()?;
        let pattern = format!("%{}%", Self::normalize_name(fragment));

        let mut rows = conn
            .query(
                "SELECT id, user, name, normalized_name, is_income, limit_amount
                 FROM categories WHERE user = ? AND normalized_name LIKE ?
                 ORDER BY id LIMIT 1",
                (user, pattern.as_str()),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to query category: {}", e)))?;

        if let Some(row) = rows
            .next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            Ok(Some(Self::category_from_row(&row)?))
        } else {
            Ok(None)
        }
    }

    pub async fn get_category(&self, user: &str, id: i64) -> Result<Option<Category>> {
        let conn = self.connection()?;

        let mut rows = conn
            .query(
                "SELECT id, user, name, normalized_name, is_income, limit_amount
                 FROM categories WHERE user = ? AND id = ?",
                (user, id),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to query category: {}", e)))?;

        if let Some(row) = rows
            .next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            Ok(Some(Self::category_from_row(&row)?))
        } else {
            Ok(None)
        }
    }

    pub async fn list_categories(&self, user: &str) -> Result<Vec<Category>> {
        let conn = self.connection()?;

        let mut rows = conn
            .query(
                "SELECT id, user, name, normalized_name, is_income, limit_amount
                 FROM categories WHERE user = ? ORDER BY id",
                [user],
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to list categories: {}", e)))?;

        let mut categories = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            categories.push(Self::category_from_row(&row)?);
        }

        Ok(categories)
    }

    /// Returns the number of rows updated (0 when no category matched).
    pub async fn rename_category(&self, user: &str, name: &str, new_name: &str) -> Result<u64> {
        let category = match self.find_category_by_name(user, name).await? {
            Some(category) => category,
            None => return Ok(0),
        };

        let conn = self.connection()?;
        let normalized = Self::normalize_name(new_name);

        let updated = conn
            .execute(
                "UPDATE categories SET name = ?, normalized_name = ? WHERE id = ? AND user = ?",
                (new_name, normalized.as_str(), category.id, user),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to rename category: {}", e)))?;

        Ok(updated)
    }

    /// Deletes a category and its transactions. Returns false when no
    /// category matched the name.
    pub async fn delete_category(&self, user: &str, name: &str) -> Result<bool> {
        let category = match self.find_category_by_name(user, name).await? {
            Some(category) => category,
            None => return Ok(false),
        };

        let conn = self.connection()?;

        conn.execute(
            "DELETE FROM transactions WHERE category_id = ? AND user = ?",
            (category.id, user),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to delete category transactions: {}", e)))?;

        conn.execute(
            "DELETE FROM categories WHERE id = ? AND user = ?",
            (category.id, user),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to delete category: {}", e)))?;

        Ok(true)
    }

    fn category_from_row(row: &libsql::Row) -> Result<Category> {
        let is_income: i64 = row.get(4).map_err(|e| AppError::Database(e.to_string()))?;

        Ok(Category {
            id: row.get(0).map_err(|e| AppError::Database(e.to_string()))?,
            user: row.get(1).map_err(|e| AppError::Database(e.to_string()))?,
            name: row.get(2).map_err(|e| AppError::Database(e.to_string()))?,
            normalized_name: row.get(3).map_err(|e| AppError::Database(e.to_string()))?,
            is_income: is_income != 0,
            limit_amount: row.get(5).map_err(|e| AppError::Database(e.to_string()))?,
        })
    }

    // ============= Transaction operations =============

    pub async fn create_transaction(
        &self,
        user: &str,
        category_id: i64,
        amount: f64,
        date: DateTime<Utc>,
        description: Option<&str>,
    ) -> Result<i64> {
        let conn = self.connection()?;

        conn.execute(
            "INSERT INTO transactions (user, category_id, amount, date, description)
             VALUES (?, ?, ?, ?, ?)",
            (user, category_id, amount, date.timestamp(), description),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to create transaction: {}", e)))?;

        Ok(conn.last_insert_rowid())
    }

    /// Filtered transaction search, newest first.
    pub async fn search_transactions(
        &self,
        user: &str,
        category_fragment: Option<&str>,
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
        limit: Option<u32>,
    ) -> Result<Vec<Transaction>> {
        let conn = self.connection()?;

        let mut sql = String::from(
            "SELECT t.id, t.user, t.category_id, c.name, t.amount, t.date, t.description
             FROM transactions t JOIN categories c ON c.id = t.category_id
             WHERE t.user = ?",
        );
        let mut params: Vec<libsql::Value> = vec![user.into()];

        if let Some(fragment) = category_fragment {
            sql.push_str(" AND c.normalized_name LIKE ?");
            params.push(format!("%{}%", Self::normalize_name(fragment)).into());
        }
        if let Some(start) = start_date {
            sql.push_str(" AND t.date >= ?");
            params.push(start.timestamp().into());
        }
        if let Some(end) = end_date {
            sql.push_str(" AND t.date <= ?");
            params.push(end.timestamp().into());
        }

        sql.push_str(" ORDER BY t.date DESC");

        if let Some(limit) = limit {
            sql.push_str(" LIMIT ?");
            params.push(i64::from(limit).into());
        }

        let mut rows = conn
            .query(&sql, params)
            .await
            .map_err(|e| AppError::Database(format!("Failed to search transactions: {}", e)))?;

        let mut transactions = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            transactions.push(Self::transaction_from_row(&row)?);
        }

        Ok(transactions)
    }

    /// Returns the number of rows updated (0 when no transaction matched).
    pub async fn update_transaction_amount(
        &self,
        user: &str,
        transaction_id: i64,
        amount: f64,
    ) -> Result<u64> {
        let conn = self.connection()?;

        let updated = conn
            .execute(
                "UPDATE transactions SET amount = ? WHERE id = ? AND user = ?",
                (amount, transaction_id, user),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to update transaction: {}", e)))?;

        Ok(updated)
    }

    /// Returns true when a transaction was deleted.
    pub async fn delete_transaction(&self, user: &str, transaction_id: i64) -> Result<bool> {
        let conn = self.connection()?;

        let deleted = conn
            .execute(
                "DELETE FROM transactions WHERE id = ? AND user = ?",
                (transaction_id, user),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to delete transaction: {}", e)))?;

        Ok(deleted > 0)
    }

    fn transaction_from_row(row: &libsql::Row) -> Result<Transaction> {
        let ts: i64 = row.get(5).map_err(|e| AppError::Database(e.to_string()))?;
        let date = DateTime::from_timestamp(ts, 0)
            .ok_or_else(|| AppError::Database(format!("Invalid transaction timestamp: {}", ts)))?;

        Ok(Transaction {
            id: row.get(0).map_err(|e| AppError::Database(e.to_string()))?,
            user: row.get(1).map_err(|e| AppError::Database(e.to_string()))?,
            category_id: row.get(2).map_err(|e| AppError::Database(e.to_string()))?,
            category_name: row.get(3).map_err(|e| AppError::Database(e.to_string()))?,
            amount: row.get(4).map_err(|e| AppError::Database(e.to_string()))?,
            date,
            description: row.get(6).map_err(|e| AppError::Database(e.to_string()))?,
        })
    }

    // ============= Agent settings operations =============

    /// Insert a named agent configuration. At most one record may be the
    /// default; inserting a second default fails.
    pub async fn insert_agent_settings(
        &self,
        prompt: &str,
        model: &str,
        is_default: bool,
    ) -> Result<i64> {
        let conn = self.connection()?;

        if is_default {
            let mut rows = conn
                .query(
                    "SELECT COUNT(*) FROM agent_settings WHERE is_default = 1",
                    (),
                )
                .await
                .map_err(|e| AppError::Database(format!("Failed to query agent settings: {}", e)))?;

            if let Some(row) = rows
                .next()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?
            {
                let count: i64 = row.get(0).map_err(|e| AppError::Database(e.to_string()))?;
                if count > 0 {
                    return Err(AppError::Validation(
                        "Cannot have more than one default agent settings".to_string(),
                    ));
                }
            }
        }

        conn.execute(
            "INSERT INTO agent_settings (prompt, model, is_default) VALUES (?, ?, ?)",
            (prompt, model, i64::from(is_default)),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to insert agent settings: {}", e)))?;

        Ok(conn.last_insert_rowid())
    }

    /// Point a user at a specific settings record, replacing any previous
    /// assignment. Administrative operation; the agent never calls this.
    pub async fn assign_settings_to_user(&self, user_id: &str, settings_id: i64) -> Result<()> {
        let conn = self.connection()?;

        conn.execute(
            "INSERT INTO agent_settings_to_user (user_id, agent_settings_id) VALUES (?, ?)
             ON CONFLICT(user_id) DO UPDATE SET agent_settings_id = excluded.agent_settings_id",
            (user_id, settings_id),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to assign agent settings: {}", e)))?;

        Ok(())
    }

    pub async fn settings_for_user(&self, user_id: &str) -> Result<Option<AgentSettings>> {
        let conn = self.connection()?;

        let mut rows = conn
            .query(
                "SELECT s.id, s.model, s.prompt, s.is_default
                 FROM agent_settings_to_user u
                 JOIN agent_settings s ON s.id = u.agent_settings_id
                 WHERE u.user_id = ?",
                [user_id],
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to query user settings: {}", e)))?;

        if let Some(row) = rows
            .next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            Ok(Some(Self::settings_from_row(&row)?))
        } else {
            Ok(None)
        }
    }

    pub async fn default_settings(&self) -> Result<Option<AgentSettings>> {
        let conn = self.connection()?;

        let mut rows = conn
            .query(
                "SELECT id, model, prompt, is_default FROM agent_settings
                 WHERE is_default = 1 LIMIT 1",
                (),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to query default settings: {}", e)))?;

        if let Some(row) = rows
            .next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            Ok(Some(Self::settings_from_row(&row)?))
        } else {
            Ok(None)
        }
    }

    fn settings_from_row(row: &libsql::Row) -> Result<AgentSettings> {
        let is_default: i64 = row.get(3).map_err(|e| AppError::Database(e.to_string()))?;

        Ok(AgentSettings {
            id: row.get(0).map_err(|e| AppError::Database(e.to_string()))?,
            model: row.get(1).map_err(|e| AppError::Database(e.to_string()))?,
            prompt: row.get(2).map_err(|e| AppError::Database(e.to_string()))?,
            is_default: is_default != 0,
        })
    }
}
