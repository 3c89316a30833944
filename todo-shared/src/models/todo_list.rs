/// Todo list model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TABLE todo_lists (
///     id SERIAL PRIMARY KEY,
///     owner_id INTEGER NOT NULL REFERENCES users (id) ON DELETE RESTRICT,
///     name VARCHAR(255) NOT NULL
/// );
/// ```
///
/// The owner is fixed at creation. Creating a list for a missing user fails
/// with a foreign key violation, and so does deleting a list that still holds
/// todos.

use crate::models::todo::{Todo, TodoItem};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Todo list owned by a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TodoList {
    pub id: i32,

    /// Owning user; immutable after creation
    pub owner_id: i32,

    pub name: String,
}

/// Input for creating a new todo list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTodoList {
    pub owner_id: i32,
    pub name: String,
}

/// A todo list together with its items
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoListWithTodos {
    pub id: i32,
    pub owner_id: i32,
    pub name: String,
    pub todos: Vec<TodoItem>,
}

impl TodoList {
    /// Attaches the list's todos, dropping the redundant `listId` from each
    pub fn with_todos(self, todos: Vec<Todo>) -> TodoListWithTodos {
        TodoListWithTodos {
            id: self.id,
            owner_id: self.owner_id,
            name: self.name,
            todos: todos.into_iter().map(TodoItem::from).collect(),
        }
    }

    /// Creates a new todo list
    ///
    /// # Errors
    ///
    /// Returns a foreign key violation if `owner_id` doesn't reference a user
    pub async fn create(pool: &PgPool, data: CreateTodoList) -> Result<Self, sqlx::Error> {
        let list = sqlx::query_as::<_, TodoList>(
            r#"
            INSERT INTO todo_lists (owner_id, name)
            VALUES ($1, $2)
            RETURNING id, owner_id, name
            "#,
        )
        .bind(data.owner_id)
        .bind(data.name)
        .fetch_one(pool)
        .await?;

        Ok(list)
    }

    /// Finds a todo list by ID
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Self>, sqlx::Error> {
        let list = sqlx::query_as::<_, TodoList>(
            r#"
            SELECT id, owner_id, name
            FROM todo_lists
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(list)
    }

    /// Deletes a todo list by ID
    ///
    /// # Returns
    ///
    /// The number of rows removed
    ///
    /// # Errors
    ///
    /// Returns a foreign key violation if the list still holds todos
    pub async fn delete(pool: &PgPool, id: i32) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM todo_lists WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_todo_list_uses_camel_case() {
        let list = TodoList {
            id: 1,
            owner_id: 2,
            name: "groceries".to_string(),
        };

        let json = serde_json::to_value(&list).unwrap();
        assert_eq!(json["ownerId"], 2);
        assert!(json.get("owner_id").is_none());
    }

    #[test]
    fn test_with_todos_strips_list_id() {
        let list = TodoList {
            id: 3,
            owner_id: 1,
            name: "chores".to_string(),
        };
        let todos = vec![Todo {
            id: 10,
            list_id: 3,
            description: "sweep".to_string(),
            completed: true,
        }];

        let json = serde_json::to_value(list.with_todos(todos)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": 3,
                "ownerId": 1,
                "name": "chores",
                "todos": [{ "id": 10, "description": "sweep", "completed": true }]
            })
        );
    }
}
