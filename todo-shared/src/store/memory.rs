/// In-process store
///
/// Keeps the three tables in ordered maps behind a single `RwLock`, so each
/// operation checks its constraints and applies its write atomically. The
/// constraint semantics match the PostgreSQL schema:
///
/// - `username` and `email` are unique (every offending field is reported)
/// - lists need an existing owner, todos need an existing list
/// - users with lists and lists with todos cannot be deleted
/// - ids come from per-table counters and are never reused
///
/// The store can be switched offline to exercise unavailability paths.

use super::{Store, StoreError, StoreResult};
use crate::models::{
    todo::{CreateTodo, Todo, UpdateTodo},
    todo_list::{CreateTodoList, TodoList},
    user::{CreateUser, User},
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<i32, User>,
    todo_lists: BTreeMap<i32, TodoList>,
    todos: BTreeMap<i32, Todo>,
    last_user_id: i32,
    last_todo_list_id: i32,
    last_todo_id: i32,
}

/// Advances a table counter; SERIAL columns stop at `i32::MAX` too
fn next_id(last: &mut i32, table: &'static str) -> StoreResult<i32> {
    *last = last
        .checked_add(1)
        .ok_or(StoreError::IdsExhausted { table })?;
    Ok(*last)
}

/// Store holding all rows in memory
#[derive(Debug)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    online: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            online: AtomicBool::new(true),
        }
    }

    /// Makes every subsequent operation fail with `StoreError::Unavailable`
    /// (or succeed again when `online` is true)
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> StoreResult<()> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable(
                "in-memory store is offline".to_string(),
            ))
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        self.ensure_online()
    }

    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        self.ensure_online()?;
        let mut tables = self.tables.write().await;

        let mut taken = Vec::new();
        if tables.users.values().any(|u| u.username == data.username) {
            taken.push("username");
        }
        if tables.users.values().any(|u| u.email == data.email) {
            taken.push("email");
        }
        if !taken.is_empty() {
            return Err(StoreError::UniqueViolation {
                target: taken.join(", "),
            });
        }

        let user = User {
            id: next_id(&mut tables.last_user_id, "users")?,
            username: data.username,
            email: data.email,
        };
        tables.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn find_user(&self, id: i32) -> StoreResult<Option<User>> {
        self.ensure_online()?;
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        self.ensure_online()?;
        Ok(self.tables.read().await.users.values().cloned().collect())
    }

    async fn delete_user(&self, id: i32) -> StoreResult<u64> {
        self.ensure_online()?;
        let mut tables = self.tables.write().await;

        if !tables.users.contains_key(&id) {
            return Ok(0);
        }
        if tables.todo_lists.values().any(|l| l.owner_id == id) {
            return Err(StoreError::StillReferenced {
                cause: format!("user {} still owns todo lists", id),
            });
        }

        tables.users.remove(&id);
        Ok(1)
    }

    async fn create_todo_list(&self, data: CreateTodoList) -> StoreResult<TodoList> {
        self.ensure_online()?;
        let mut tables = self.tables.write().await;

        if !tables.users.contains_key(&data.owner_id) {
            return Err(StoreError::RelatedRecordNotFound {
                cause: format!("no user with id {}", data.owner_id),
            });
        }

        let list = TodoList {
            id: next_id(&mut tables.last_todo_list_id, "todo_lists")?,
            owner_id: data.owner_id,
            name: data.name,
        };
        tables.todo_lists.insert(list.id, list.clone());

        Ok(list)
    }

    async fn find_todo_list(&self, id: i32) -> StoreResult<Option<TodoList>> {
        self.ensure_online()?;
        Ok(self.tables.read().await.todo_lists.get(&id).cloned())
    }

    async fn delete_todo_list(&self, id: i32) -> StoreResult<u64> {
        self.ensure_online()?;
        let mut tables = self.tables.write().await;

        if !tables.todo_lists.contains_key(&id) {
            return Ok(0);
        }
        if tables.todos.values().any(|t| t.list_id == id) {
            return Err(StoreError::StillReferenced {
                cause: format!("todo list {} still holds todos", id),
            });
        }

        tables.todo_lists.remove(&id);
        Ok(1)
    }

    async fn create_todo(&self, data: CreateTodo) -> StoreResult<Todo> {
        self.ensure_online()?;
        let mut tables = self.tables.write().await;

        if !tables.todo_lists.contains_key(&data.list_id) {
            return Err(StoreError::RelatedRecordNotFound {
                cause: format!("no todo list with id {}", data.list_id),
            });
        }

        let todo = Todo {
            id: next_id(&mut tables.last_todo_id, "todos")?,
            list_id: data.list_id,
            description: data.description,
            completed: data.completed,
        };
        tables.todos.insert(todo.id, todo.clone());

        Ok(todo)
    }

    async fn find_todo(&self, list_id: i32, id: i32) -> StoreResult<Option<Todo>> {
        self.ensure_online()?;
        Ok(self
            .tables
            .read()
            .await
            .todos
            .get(&id)
            .filter(|t| t.list_id == list_id)
            .cloned())
    }

    async fn list_todos(&self, list_id: i32) -> StoreResult<Vec<Todo>> {
        self.ensure_online()?;
        Ok(self
            .tables
            .read()
            .await
            .todos
            .values()
            .filter(|t| t.list_id == list_id)
            .cloned()
            .collect())
    }

    async fn update_todo(
        &self,
        list_id: i32,
        id: i32,
        data: UpdateTodo,
    ) -> StoreResult<Option<Todo>> {
        self.ensure_online()?;
        let mut tables = self.tables.write().await;

        let Some(todo) = tables.todos.get_mut(&id).filter(|t| t.list_id == list_id) else {
            return Ok(None);
        };

        if let Some(description) = data.description {
            todo.description = description;
        }
        if let Some(completed) = data.completed {
            todo.completed = completed;
        }

        Ok(Some(todo.clone()))
    }

    async fn delete_todo(&self, list_id: i32, id: i32) -> StoreResult<u64> {
        self.ensure_online()?;
        let mut tables = self.tables.write().await;

        let in_list = tables.todos.get(&id).is_some_and(|t| t.list_id == list_id);
        if !in_list {
            return Ok(0);
        }

        tables.todos.remove(&id);
        Ok(1)
    }
}
