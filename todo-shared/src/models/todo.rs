/// Todo model and database operations
///
/// Todos are always addressed through their list: every lookup, update and
/// delete filters on both `list_id` and `id`, so a todo reached through the
/// wrong list behaves as missing.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE todos (
///     id SERIAL PRIMARY KEY,
///     list_id INTEGER NOT NULL REFERENCES todo_lists (id) ON DELETE RESTRICT,
///     description VARCHAR(1024) NOT NULL,
///     completed BOOLEAN NOT NULL DEFAULT FALSE
/// );
/// ```

use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Todo item belonging to a list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: i32,

    /// Parent list; immutable after creation
    pub list_id: i32,

    pub description: String,

    pub completed: bool,
}

/// Todo as embedded in its parent list (no `listId`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: i32,
    pub description: String,
    pub completed: bool,
}

impl From<Todo> for TodoItem {
    fn from(todo: Todo) -> Self {
        Self {
            id: todo.id,
            description: todo.description,
            completed: todo.completed,
        }
    }
}

/// Input for creating a new todo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTodo {
    pub list_id: i32,
    pub description: String,
    pub completed: bool,
}

/// Partial update of a todo
///
/// Only `Some` fields are written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTodo {
    pub description: Option<String>,
    pub completed: Option<bool>,
}

impl UpdateTodo {
    /// True when no field would change
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.completed.is_none()
    }
}

impl Todo {
    /// Creates a new todo
    ///
    /// # Errors
    ///
    /// Returns a foreign key violation if `list_id` doesn't reference a list
    pub async fn create(pool: &PgPool, data: CreateTodo) -> Result<Self, sqlx::Error> {
        let todo = sqlx::query_as::<_, Todo>(
            r#"
            INSERT INTO todos (list_id, description, completed)
            VALUES ($1, $2, $3)
            RETURNING id, list_id, description, completed
            "#,
        )
        .bind(data.list_id)
        .bind(data.description)
        .bind(data.completed)
        .fetch_one(pool)
        .await?;

        Ok(todo)
    }

    /// Finds a todo by list and todo ID
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn find_in_list(
        pool: &PgPool,
        list_id: i32,
        id: i32,
    ) -> Result<Option<Self>, sqlx::Error> {
        let todo = sqlx::query_as::<_, Todo>(
            r#"
            SELECT id, list_id, description, completed
            FROM todos
            WHERE list_id = $1 AND id = $2
            "#,
        )
        .bind(list_id)
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(todo)
    }

    /// Lists the todos of a list, oldest first
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn list_by_list(pool: &PgPool, list_id: i32) -> Result<Vec<Self>, sqlx::Error> {
        let todos = sqlx::query_as::<_, Todo>(
            r#"
            SELECT id, list_id, description, completed
            FROM todos
            WHERE list_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(list_id)
        .fetch_all(pool)
        .await?;

        Ok(todos)
    }

    /// Applies a partial update
    ///
    /// # Returns
    ///
    /// The updated todo, or None if no todo with this ID exists in the list
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn update(
        pool: &PgPool,
        list_id: i32,
        id: i32,
        data: UpdateTodo,
    ) -> Result<Option<Self>, sqlx::Error> {
        if data.is_empty() {
            return Self::find_in_list(pool, list_id, id).await;
        }

        // Build dynamic update query based on which fields are present
        let mut assignments = Vec::with_capacity(2);
        let mut bind_count = 2;

        if data.description.is_some() {
            bind_count += 1;
            assignments.push(format!("description = ${}", bind_count));
        }
        if data.completed.is_some() {
            bind_count += 1;
            assignments.push(format!("completed = ${}", bind_count));
        }

        let query = format!(
            "UPDATE todos SET {} WHERE list_id = $1 AND id = $2 RETURNING id, list_id, description, completed",
            assignments.join(", ")
        );

        let mut q = sqlx::query_as::<_, Todo>(&query).bind(list_id).bind(id);

        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(completed) = data.completed {
            q = q.bind(completed);
        }

        let todo = q.fetch_optional(pool).await?;

        Ok(todo)
    }

    /// Deletes a todo by list and todo ID
    ///
    /// # Returns
    ///
    /// The number of rows removed
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn delete(pool: &PgPool, list_id: i32, id: i32) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM todos WHERE list_id = $1 AND id = $2")
            .bind(list_id)
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}
