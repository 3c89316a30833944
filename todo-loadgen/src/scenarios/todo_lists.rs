/// Scenarios that create todo lists

use super::{random_identity, IterationContext, Scenario, ScenarioError, ScenarioResult};
use crate::client::ApiClient;
use async_trait::async_trait;
use rand::Rng;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::OnceCell;

/// Every iteration creates a list owned by one shared setup user
///
/// Teardown deletes the created lists and then the owner.
#[derive(Debug, Default)]
pub struct CreateTodoListsScenario {
    owner_id: OnceCell<i32>,
    created: Mutex<Vec<i32>>,
}

impl CreateTodoListsScenario {
    pub fn new() -> Self {
        Self::default()
    }

    fn take_created(&self) -> Vec<i32> {
        match self.created.lock() {
            Ok(mut ids) => std::mem::take(&mut *ids),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

#[async_trait]
impl Scenario for CreateTodoListsScenario {
    fn name(&self) -> &'static str {
        "create-todo-lists"
    }

    async fn setup(&self, client: &ApiClient) -> ScenarioResult<()> {
        let (username, email) = random_identity("user-2");
        let user = client.create_user(&username, &email).await?;
        let _ = self.owner_id.set(user.id);
        Ok(())
    }

    async fn iteration(&self, ctx: &IterationContext) -> ScenarioResult<()> {
        let owner_id = *self
            .owner_id
            .get()
            .ok_or_else(|| ScenarioError::Exhausted("no setup user".to_string()))?;

        let list = ctx
            .client
            .create_todo_list(owner_id, "Todo list name")
            .await?;

        if let Ok(mut ids) = self.created.lock() {
            ids.push(list.id);
        }
        Ok(())
    }

    async fn teardown(&self, client: &ApiClient) -> ScenarioResult<()> {
        let Some(&owner_id) = self.owner_id.get() else {
            return Ok(());
        };

        for id in self.take_created() {
            client.delete_todo_list(id).await?;
        }
        client.delete_user(owner_id).await?;
        Ok(())
    }
}

/// A new user signs up, creates a list and fills it with 3 to 10 todos
#[derive(Debug, Clone)]
pub struct SignupsScenario {
    pub todo_pause: Duration,
}

impl Default for SignupsScenario {
    fn default() -> Self {
        Self {
            todo_pause: Duration::from_millis(50),
        }
    }
}

#[async_trait]
impl Scenario for SignupsScenario {
    fn name(&self) -> &'static str {
        "signups"
    }

    async fn iteration(&self, ctx: &IterationContext) -> ScenarioResult<()> {
        let (username, email) = random_identity("user-3a");
        let user = ctx.client.create_user(&username, &email).await?;
        let list = ctx
            .client
            .create_todo_list(user.id, "Name of todolist")
            .await?;

        let todos: u32 = rand::thread_rng().gen_range(3..=10);
        for _ in 0..todos {
            ctx.client.create_todo(list.id, "Test", None).await?;
            ctx.pause(self.todo_pause).await?;
        }
        Ok(())
    }
}
