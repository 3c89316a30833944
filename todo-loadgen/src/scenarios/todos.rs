/// Todo churn on pre-created lists

use super::{random_identity, IterationContext, Scenario, ScenarioError, ScenarioResult};
use crate::client::ApiClient;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::OnceCell;

/// Each VU works on its own list: three creates, two patches, one delete
#[derive(Debug)]
pub struct TodosScenario {
    list_count: usize,
    create_pause: Duration,
    patch_pause: Duration,
    list_ids: OnceCell<Vec<i32>>,
}

impl TodosScenario {
    /// Prepares one list (and owner) per VU, `list_count` in total
    pub fn new(list_count: usize) -> Self {
        Self {
            list_count,
            create_pause: Duration::from_millis(100),
            patch_pause: Duration::from_millis(50),
            list_ids: OnceCell::new(),
        }
    }

    /// Replaces the pauses between calls
    pub fn with_pauses(mut self, create_pause: Duration, patch_pause: Duration) -> Self {
        self.create_pause = create_pause;
        self.patch_pause = patch_pause;
        self
    }

    pub fn list_count(&self) -> usize {
        self.list_count
    }

    fn list_for(&self, vu: usize) -> ScenarioResult<i32> {
        let ids = self.list_ids.get().map(Vec::as_slice).unwrap_or_default();
        if ids.is_empty() {
            return Err(ScenarioError::Exhausted("no todo lists prepared".to_string()));
        }
        // More VUs than lists share lists round-robin
        Ok(ids[vu.saturating_sub(1) % ids.len()])
    }
}

#[async_trait]
impl Scenario for TodosScenario {
    fn name(&self) -> &'static str {
        "todos"
    }

    async fn setup(&self, client: &ApiClient) -> ScenarioResult<()> {
        let mut ids = Vec::with_capacity(self.list_count);
        for _ in 0..self.list_count {
            let (username, email) = random_identity("user-3a");
            let user = client.create_user(&username, &email).await?;
            ids.push(client.create_todo_list(user.id, "todolist name").await?.id);
        }

        tracing::info!(lists = ids.len(), "Todos scenario setup complete");
        let _ = self.list_ids.set(ids);
        Ok(())
    }

    async fn iteration(&self, ctx: &IterationContext) -> ScenarioResult<()> {
        let list_id = self.list_for(ctx.vu)?;
        let client = &ctx.client;

        let first = client.create_todo(list_id, "todo description", None).await?;
        ctx.pause(self.create_pause).await?;
        let second = client.create_todo(list_id, "todo description", None).await?;
        ctx.pause(self.create_pause).await?;
        let third = client.create_todo(list_id, "todo description", None).await?;
        ctx.pause(self.create_pause).await?;

        client
            .patch_todo(list_id, first.id, Some("new description"), Some(true))
            .await?;
        ctx.pause(self.patch_pause).await?;
        client
            .patch_todo(list_id, second.id, Some("new description 2"), None)
            .await?;
        ctx.pause(self.patch_pause).await?;
        client.delete_todo(list_id, third.id).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lists_are_assigned_round_robin() {
        let scenario = TodosScenario::new(3);
        scenario.list_ids.set(vec![10, 20, 30]).unwrap();

        assert_eq!(scenario.list_for(1).unwrap(), 10);
        assert_eq!(scenario.list_for(3).unwrap(), 30);
        assert_eq!(scenario.list_for(4).unwrap(), 10);
    }

    #[test]
    fn test_missing_setup_is_reported() {
        let scenario = TodosScenario::new(3);
        assert!(matches!(
            scenario.list_for(1),
            Err(ScenarioError::Exhausted(_))
        ));
    }
}
