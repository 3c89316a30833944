/// Database models for the todo backend
///
/// Each model is a `sqlx::FromRow` row type with associated async CRUD
/// functions taking a `&PgPool`. Serialized field names are camelCase, which
/// is the wire format of the HTTP API.
///
/// # Models
///
/// - `user`: User accounts (unique username and email)
/// - `todo_list`: Todo lists owned by a user
/// - `todo`: Items of a todo list
///
/// # Example
///
/// ```no_run
/// use todo_shared::models::user::{User, CreateUser};
/// use todo_shared::models::todo_list::{TodoList, CreateTodoList};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let owner = User::create(
///     &pool,
///     CreateUser {
///         username: "ada".to_string(),
///         email: "ada@example.com".to_string(),
///     },
/// )
/// .await?;
///
/// let list = TodoList::create(
///     &pool,
///     CreateTodoList {
///         owner_id: owner.id,
///         name: "groceries".to_string(),
///     },
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```

pub mod todo;
pub mod todo_list;
pub mod user;
