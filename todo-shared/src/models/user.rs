/// User model and database operations
///
/// Users own todo lists. A user cannot be deleted while it still owns a list;
/// the foreign key on `todo_lists.owner_id` rejects the delete.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id SERIAL PRIMARY KEY,
///     username VARCHAR(255) NOT NULL,
///     email VARCHAR(255) NOT NULL,
///     CONSTRAINT users_username_key UNIQUE (username),
///     CONSTRAINT users_email_key UNIQUE (email)
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use todo_shared::models::user::{User, CreateUser};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let user = User::create(
///     &pool,
///     CreateUser {
///         username: "ada".to_string(),
///         email: "ada@example.com".to_string(),
///     },
/// )
/// .await?;
///
/// let found = User::find_by_id(&pool, user.id).await?;
/// assert_eq!(found, Some(user));
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// User account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Store-assigned id, never reused
    pub id: i32,

    /// Unique across all users
    pub username: String,

    /// Unique across all users
    pub email: String,
}

/// Input for creating a new user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
}

impl User {
    /// Creates a new user
    ///
    /// # Errors
    ///
    /// Returns an error if the username or email is already taken
    /// (unique constraint violation) or the database is unreachable
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email)
            VALUES ($1, $2)
            RETURNING id, username, email
            "#,
        )
        .bind(data.username)
        .bind(data.email)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by ID
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Lists all users, oldest first
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email
            FROM users
            ORDER BY id ASC
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(users)
    }

    /// Deletes a user by ID
    ///
    /// # Returns
    ///
    /// The number of rows removed (0 when the user didn't exist)
    ///
    /// # Errors
    ///
    /// Returns an error if the user still owns todo lists (foreign key
    /// violation) or the database is unreachable
    pub async fn delete(pool: &PgPool, id: i32) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Counts total number of users
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_serializes_flat() {
        let user = User {
            id: 7,
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
        };

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "id": 7, "username": "ada", "email": "ada@example.com" })
        );
    }

    // Integration tests for database operations are in tests/pg_store_tests.rs
}
