use crate::db::BuffetDb;
use crate::tools::registry::Tool;
use crate::types::{AppError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

fn parse_args<T: serde::de::DeserializeOwned>(tool: &str, args: Value) -> Result<T> {
    serde_json::from_value(args)
        .map_err(|e| AppError::Validation(format!("Invalid arguments for {}: {}", tool, e)))
}

pub struct CreateCategory {
    db: Arc<BuffetDb>,
}

impl CreateCategory {
    pub fn new(db: Arc<BuffetDb>) -> Self {
        Self { db }
    }
}

#[derive(Debug, Deserialize)]
struct CreateCategoryArgs {
    user: String,
    category_name: String,
}

#[async_trait]
impl Tool for CreateCategory {
    fn name(&self) -> &str {
        "create_category"
    }

    fn description(&self) -> &str {
        "Create a spending category for a user, or return the existing one when a category with a matching name already exists"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "user": { "type": "string", "description": "The user's ID" },
                "category_name": { "type": "string", "description": "Name of the category" }
            },
            "required": ["user", "category_name"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String> {
        let args: CreateCategoryArgs = parse_args(self.name(), args)?;
        tracing::debug!(user = %args.user, name = %args.category_name, "creating category");

        if let Some(existing) = self
            .db
            .find_category_by_name(&args.user, &args.category_name)
            .await?
        {
            return Ok(format!("Category ID: {}", existing.id));
        }

        let category = self
            .db
            .create_category(&args.user, &args.category_name)
            .await?;
        Ok(format!("Category ID: {}", category.id))
    }
}

pub struct SearchCategory {
    db: Arc<BuffetDb>,
}

impl SearchCategory {
    pub fn new(db: Arc<BuffetDb>) -> Self {
        Self { db }
    }
}

#[derive(Deserialize)]
struct SearchCategoryArgs {
    user: String,
    category_name: String,
}

#[async_trait]
impl Tool for SearchCategory {
    fn name(&self) -> &str {
        "search_category"
    }

    fn description(&self) -> &str {
        "Find a user's category by name. Matches partial names, ignoring case"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "user": { "type": "string", "description": "The user's ID" },
                "category_name": { "type": "string", "description": "Full or partial category name" }
            },
            "required": ["user", "category_name"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String> {
        let args: SearchCategoryArgs = parse_args(self.name(), args)?;

        match self
            .db
            .find_category_by_name(&args.user, &args.category_name)
            .await?
        {
            Some(category) => Ok(format!("Category ID: {}", category.id)),
            None => Ok(format!(
                "No categories found with the name '{}'.",
                args.category_name
            )),
        }
    }
}

pub struct SearchUserCategories {
    db: Arc<BuffetDb>,
}

impl SearchUserCategories {
    pub fn new(db: Arc<BuffetDb>) -> Self {
        Self { db }
    }
}

#[derive(Deserialize)]
struct SearchUserCategoriesArgs {
    user: String,
}

#[async_trait]
impl Tool for SearchUserCategories {
    fn name(&self) -> &str {
        "search_user_categories"
    }

    fn description(&self) -> &str {
        "List all of a user's categories with their IDs, income flag, and spending limit"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "user": { "type": "string", "description": "The user's ID" }
            },
            "required": ["user"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String> {
        let args: SearchUserCategoriesArgs = parse_args(self.name(), args)?;

        let categories = self.db.list_categories(&args.user).await?;
        if categories.is_empty() {
            return Ok("No categories found.".to_string());
        }

        let lines: Vec<String> = categories
            .iter()
            .map(|c| {
                let limit = c
                    .limit_amount
                    .map(|l| format!("{:.2}", l))
                    .unwrap_or_else(|| "none".to_string());
                format!(
                    "ID: {}, Name: {}, Income: {}, Limit: {}",
                    c.id, c.name, c.is_income, limit
                )
            })
            .collect();
        Ok(lines.join("\n"))
    }
}

pub struct UpdateCategory {
    db: Arc<BuffetDb>,
}

impl UpdateCategory {
    pub fn new(db: Arc<BuffetDb>) -> Self {
        Self { db }
    }
}

#[derive(Deserialize)]
struct UpdateCategoryArgs {
    user_id: String,
    category_name: String,
    new_name: String,
}

#[async_trait]
impl Tool for UpdateCategory {
    fn name(&self) -> &str {
        "update_category"
    }

    fn description(&self) -> &str {
        "Rename one of the user's categories"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "user_id": { "type": "string", "description": "The user's ID" },
                "category_name": { "type": "string", "description": "Current category name" },
                "new_name": { "type": "string", "description": "New category name" }
            },
            "required": ["user_id", "category_name", "new_name"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String> {
        let args: UpdateCategoryArgs = parse_args(self.name(), args)?;
        tracing::debug!(user = %args.user_id, from = %args.category_name, to = %args.new_name, "renaming category");

        let updated = self
            .db
            .rename_category(&args.user_id, &args.category_name, &args.new_name)
            .await?;
        if updated == 0 {
            Ok(format!(
                "No categories found with the name '{}'.",
                args.category_name
            ))
        } else {
            Ok(format!(
                "Category renamed from '{}' to '{}'.",
                args.category_name, args.new_name
            ))
        }
    }
}

pub struct DeleteCategory {
    db: Arc<BuffetDb>,
}

impl DeleteCategory {
    pub fn new(db: Arc<BuffetDb>) -> Self {
        Self { db }
    }
}

#[derive(Deserialize)]
struct DeleteCategoryArgs {
    user_id: String,
    category_name: String,
}

#[async_trait]
impl Tool for DeleteCategory {
    fn name(&self) -> &str {
        "delete_category"
    }

    fn description(&self) -> &str {
        "Delete one of the user's categories along with all of its transactions"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "user_id": { "type": "string", "description": "The user's ID" },
                "category_name": { "type": "string", "description": "Name of the category to delete" }
            },
            "required": ["user_id", "category_name"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String> {
        let args: DeleteCategoryArgs = parse_args(self.name(), args)?;
        tracing::debug!(user = %args.user_id, name = %args.category_name, "deleting category");

        let deleted = self
            .db
            .delete_category(&args.user_id, &args.category_name)
            .await?;
        if deleted {
            Ok(format!(
                "Category '{}' and its transactions were deleted.",
                args.category_name
            ))
        } else {
            Ok(format!(
                "No categories found with the name '{}'.",
                args.category_name
            ))
        }
    }
}
