/// PostgreSQL-backed store
///
/// Delegates to the model functions in [`crate::models`] and classifies
/// `sqlx` failures into [`StoreError`] variants:
///
/// | Failure | Variant |
/// |---|---|
/// | unique violation (23505) | `UniqueViolation` (target from constraint name) |
/// | foreign key violation (23503) on insert | `RelatedRecordNotFound` |
/// | foreign key violation (23503) on delete | `StillReferenced` |
/// | pool timeout / closed pool / I/O / TLS | `Unavailable` |
/// | anything else | `Database` |

use super::{Store, StoreError, StoreResult};
use crate::db::pool;
use crate::models::{
    todo::{CreateTodo, Todo, UpdateTodo},
    todo_list::{CreateTodoList, TodoList},
    user::{CreateUser, User},
};
use async_trait::async_trait;
use sqlx::PgPool;
use std::time::Duration;

/// Which kind of statement produced an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Read,
    Write,
    Delete,
}

/// Default bound on [`Store::ping`]
pub const DEFAULT_PING_TIMEOUT: Duration = Duration::from_secs(3);

/// Store backed by a PostgreSQL connection pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
    ping_timeout: Duration,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            ping_timeout: DEFAULT_PING_TIMEOUT,
        }
    }

    /// Caps how long a ping waits for a connection
    ///
    /// The pool keeps retrying refused connections until its acquire
    /// timeout, which is usually far longer than a healthcheck should take.
    pub fn with_ping_timeout(mut self, ping_timeout: Duration) -> Self {
        self.ping_timeout = ping_timeout;
        self
    }

    /// Underlying pool (for migrations and shutdown)
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

const TABLES: [&str; 3] = ["users", "todo_lists", "todos"];

/// Turns a constraint name such as `users_email_key` into the field name `email`
fn unique_target(constraint: &str) -> String {
    let Some(columns) = constraint.strip_suffix("_key") else {
        return constraint.to_string();
    };

    TABLES
        .iter()
        .find_map(|table| {
            columns
                .strip_prefix(table)
                .and_then(|rest| rest.strip_prefix('_'))
        })
        .unwrap_or(columns)
        .to_string()
}

fn classify(err: sqlx::Error, operation: Operation) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            if db_err.is_unique_violation() {
                let target = db_err
                    .constraint()
                    .map(unique_target)
                    .unwrap_or_else(|| "[No meta information]".to_string());
                return StoreError::UniqueViolation { target };
            }

            if db_err.is_foreign_key_violation() {
                let cause = db_err
                    .constraint()
                    .map(|c| format!("foreign key constraint {} violated", c))
                    .unwrap_or_else(|| db_err.message().to_string());
                return match operation {
                    Operation::Delete => StoreError::StillReferenced { cause },
                    Operation::Write | Operation::Read => {
                        StoreError::RelatedRecordNotFound { cause }
                    }
                };
            }

            StoreError::Database(sqlx::Error::Database(db_err))
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            StoreError::Unavailable(err.to_string())
        }
        sqlx::Error::Io(_) | sqlx::Error::Tls(_) => StoreError::Unavailable(err.to_string()),
        other => StoreError::Database(other),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        match tokio::time::timeout(self.ping_timeout, pool::health_check(&self.pool)).await {
            Ok(result) => result.map_err(|e| classify(e, Operation::Read)),
            Err(_) => Err(StoreError::Unavailable(format!(
                "database did not answer within {:?}",
                self.ping_timeout
            ))),
        }
    }

    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        User::create(&self.pool, data)
            .await
            .map_err(|e| classify(e, Operation::Write))
    }

    async fn find_user(&self, id: i32) -> StoreResult<Option<User>> {
        User::find_by_id(&self.pool, id)
            .await
            .map_err(|e| classify(e, Operation::Read))
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        User::list(&self.pool)
            .await
            .map_err(|e| classify(e, Operation::Read))
    }

    async fn delete_user(&self, id: i32) -> StoreResult<u64> {
        User::delete(&self.pool, id)
            .await
            .map_err(|e| classify(e, Operation::Delete))
    }

    async fn create_todo_list(&self, data: CreateTodoList) -> StoreResult<TodoList> {
        TodoList::create(&self.pool, data)
            .await
            .map_err(|e| classify(e, Operation::Write))
    }

    async fn find_todo_list(&self, id: i32) -> StoreResult<Option<TodoList>> {
        TodoList::find_by_id(&self.pool, id)
            .await
            .map_err(|e| classify(e, Operation::Read))
    }

    async fn delete_todo_list(&self, id: i32) -> StoreResult<u64> {
        TodoList::delete(&self.pool, id)
            .await
            .map_err(|e| classify(e, Operation::Delete))
    }

    async fn create_todo(&self, data: CreateTodo) -> StoreResult<Todo> {
        Todo::create(&self.pool, data)
            .await
            .map_err(|e| classify(e, Operation::Write))
    }

    async fn find_todo(&self, list_id: i32, id: i32) -> StoreResult<Option<Todo>> {
        Todo::find_in_list(&self.pool, list_id, id)
            .await
            .map_err(|e| classify(e, Operation::Read))
    }

    async fn list_todos(&self, list_id: i32) -> StoreResult<Vec<Todo>> {
        Todo::list_by_list(&self.pool, list_id)
            .await
            .map_err(|e| classify(e, Operation::Read))
    }

    async fn update_todo(
        &self,
        list_id: i32,
        id: i32,
        data: UpdateTodo,
    ) -> StoreResult<Option<Todo>> {
        Todo::update(&self.pool, list_id, id, data)
            .await
            .map_err(|e| classify(e, Operation::Write))
    }

    async fn delete_todo(&self, list_id: i32, id: i32) -> StoreResult<u64> {
        Todo::delete(&self.pool, list_id, id)
            .await
            .map_err(|e| classify(e, Operation::Delete))
    }
}
