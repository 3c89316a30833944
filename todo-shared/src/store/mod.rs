/// Data access capability
///
/// Handlers never talk to the database directly. They receive a [`Store`]
/// (usually as `Arc<dyn Store>` inside the application state) and get back
/// either the requested rows or a [`StoreError`] that says *why* the store
/// refused: a uniqueness conflict, a reference to a missing parent, a delete
/// blocked by children, or an unavailable backend.
///
/// # Implementations
///
/// - [`PgStore`]: PostgreSQL through `sqlx`; constraints are enforced by the schema
/// - [`MemoryStore`]: in-process tables with the same constraint semantics
///
/// # Example
///
/// ```
/// use todo_shared::models::user::CreateUser;
/// use todo_shared::store::{MemoryStore, Store, StoreError};
///
/// # async fn example() -> Result<(), StoreError> {
/// let store = MemoryStore::new();
///
/// let user = store
///     .create_user(CreateUser {
///         username: "ada".to_string(),
///         email: "ada@example.com".to_string(),
///     })
///     .await?;
///
/// let duplicate = store
///     .create_user(CreateUser {
///         username: "ada".to_string(),
///         email: "other@example.com".to_string(),
///     })
///     .await;
/// assert!(matches!(duplicate, Err(StoreError::UniqueViolation { .. })));
/// # Ok(())
/// # }
/// ```

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::models::{
    todo::{CreateTodo, Todo, UpdateTodo},
    todo_list::{CreateTodoList, TodoList},
    user::{CreateUser, User},
};
use async_trait::async_trait;

/// Store error types
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique column already holds this value
    #[error("Unique constraint failed: {target}")]
    UniqueViolation {
        /// Offending field name(s), comma separated
        target: String,
    },

    /// A create referenced a parent row that doesn't exist
    #[error("Related record not found: {cause}")]
    RelatedRecordNotFound { cause: String },

    /// A delete was blocked because child rows still reference the record
    #[error("Record is still referenced: {cause}")]
    StillReferenced { cause: String },

    /// A table ran out of ids
    #[error("No ids left in table {table}")]
    IdsExhausted { table: &'static str },

    /// The backend could not be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Any other database failure
    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),
}

/// Store result type alias
pub type StoreResult<T> = Result<T, StoreError>;

/// CRUD primitives over users, todo lists and todos
///
/// Deletes report the number of affected rows so callers can tell "not
/// found" (0) from success (1) and from a broken id invariant (more than 1).
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Verifies the backend is reachable
    async fn ping(&self) -> StoreResult<()>;

    async fn create_user(&self, data: CreateUser) -> StoreResult<User>;

    async fn find_user(&self, id: i32) -> StoreResult<Option<User>>;

    /// All users, ordered by id
    async fn list_users(&self) -> StoreResult<Vec<User>>;

    async fn delete_user(&self, id: i32) -> StoreResult<u64>;

    async fn create_todo_list(&self, data: CreateTodoList) -> StoreResult<TodoList>;

    async fn find_todo_list(&self, id: i32) -> StoreResult<Option<TodoList>>;

    async fn delete_todo_list(&self, id: i32) -> StoreResult<u64>;

    async fn create_todo(&self, data: CreateTodo) -> StoreResult<Todo>;

    async fn find_todo(&self, list_id: i32, id: i32) -> StoreResult<Option<Todo>>;

    /// Todos of one list, ordered by id
    async fn list_todos(&self, list_id: i32) -> StoreResult<Vec<Todo>>;

    /// Returns None when the todo doesn't exist in this list
    async fn update_todo(&self, list_id: i32, id: i32, data: UpdateTodo)
        -> StoreResult<Option<Todo>>;

    async fn delete_todo(&self, list_id: i32, id: i32) -> StoreResult<u64>;
}
