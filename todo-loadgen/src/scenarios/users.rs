/// User-centric scenarios: sign-up checks, bursts and bulk deletes

use super::{random_identity, IterationContext, Scenario, ScenarioError, ScenarioResult};
use crate::client::ApiClient;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::OnceCell;

/// Creates a user, checks the echoed fields, reads it back, then pauses
#[derive(Debug, Clone)]
pub struct CreateUsersScenario {
    pub think_time: Duration,
}

impl Default for CreateUsersScenario {
    fn default() -> Self {
        Self {
            think_time: Duration::from_secs(1),
        }
    }
}

#[async_trait]
impl Scenario for CreateUsersScenario {
    fn name(&self) -> &'static str {
        "create-users"
    }

    async fn iteration(&self, ctx: &IterationContext) -> ScenarioResult<()> {
        let (username, email) = random_identity("user-1");
        let metrics = ctx.client.metrics();

        let user = ctx.client.create_user(&username, &email).await?;
        metrics.record_check("username is correct", user.username == username);
        metrics.record_check("email is correct", user.email == email);

        let fetched = ctx.client.get_user(user.id).await?;
        metrics.record_check("user is retrieved successfully", fetched == user);

        ctx.pause(self.think_time).await
    }
}

/// Lunch-time burst: every iteration signs up one user
#[derive(Debug, Clone, Copy, Default)]
pub struct LunchTimeScenario;

#[async_trait]
impl Scenario for LunchTimeScenario {
    fn name(&self) -> &'static str {
        "lunch-time"
    }

    async fn iteration(&self, ctx: &IterationContext) -> ScenarioResult<()> {
        let (username, email) = random_identity("user-3a");
        ctx.client.create_user(&username, &email).await?;
        Ok(())
    }
}

/// Deletes a fixed-size slice of setup users per iteration
///
/// Iteration `n` deletes users `n * per_iteration .. (n + 1) * per_iteration`
/// of the setup pool, so every user is deleted at most once.
#[derive(Debug)]
pub struct BatchScenario {
    per_iteration: usize,
    pool_size: usize,
    user_ids: OnceCell<Vec<i32>>,
}

impl BatchScenario {
    /// Prepares `iterations` batches of `per_iteration` users
    pub fn new(per_iteration: usize, iterations: u64) -> Self {
        Self {
            per_iteration,
            pool_size: per_iteration.saturating_mul(iterations as usize),
            user_ids: OnceCell::new(),
        }
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }
}

#[async_trait]
impl Scenario for BatchScenario {
    fn name(&self) -> &'static str {
        "batch"
    }

    async fn setup(&self, client: &ApiClient) -> ScenarioResult<()> {
        let mut ids = Vec::with_capacity(self.pool_size);
        for _ in 0..self.pool_size {
            let (username, email) = random_identity("user-3a");
            ids.push(client.create_user(&username, &email).await?.id);
        }

        tracing::info!(users = ids.len(), "Batch scenario setup complete");
        // A second setup call keeps the first pool
        let _ = self.user_ids.set(ids);
        Ok(())
    }

    async fn iteration(&self, ctx: &IterationContext) -> ScenarioResult<()> {
        let ids = self.user_ids.get().map(Vec::as_slice).unwrap_or_default();
        let start = (ctx.iteration as usize).saturating_mul(self.per_iteration);
        let batch = ids
            .get(start..start.saturating_add(self.per_iteration))
            .ok_or_else(|| {
                ScenarioError::Exhausted(format!(
                    "no users left for batch iteration {}",
                    ctx.iteration
                ))
            })?;

        for &id in batch {
            ctx.client.delete_user(id).await?;
        }
        Ok(())
    }
}
