/// Load scenarios
///
/// A scenario is what one virtual user (VU) does per iteration, plus
/// optional setup run once before any executor starts and teardown run once
/// after all of them have stopped. Executors decide how many VUs run a
/// scenario and how often.
///
/// # Scenarios
///
/// | Name | Iteration |
/// |---|---|
/// | `create-users` | create a user, verify it round-trips, pause |
/// | `create-todo-lists` | create a list owned by the setup user |
/// | `signups` | user, then list, then 3 to 10 todos |
/// | `todos` | on the VU's own list: create 3 todos, patch 2, delete 1 |
/// | `lunch-time` | create a user |
/// | `batch` | delete 20 users created during setup |
///
/// # Example
///
/// ```no_run
/// use todo_loadgen::scenarios::{IterationContext, Scenario, ScenarioResult};
/// use async_trait::async_trait;
///
/// struct Ping;
///
/// #[async_trait]
/// impl Scenario for Ping {
///     fn name(&self) -> &'static str {
///         "ping"
///     }
///
///     async fn iteration(&self, ctx: &IterationContext) -> ScenarioResult<()> {
///         ctx.client.healthcheck().await?;
///         Ok(())
///     }
/// }
/// ```

pub mod todo_lists;
pub mod todos;
pub mod users;

pub use todo_lists::{CreateTodoListsScenario, SignupsScenario};
pub use todos::TodosScenario;
pub use users::{BatchScenario, CreateUsersScenario, LunchTimeScenario};

use crate::client::{ApiClient, ClientError};
use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Scenario error types
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    /// An API call failed
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The run was stopped while the iteration was pausing
    #[error("Iteration was cancelled")]
    Cancelled,

    /// Setup data needed by this iteration is missing
    #[error("Setup data exhausted: {0}")]
    Exhausted(String),
}

/// Scenario result type alias
pub type ScenarioResult<T> = Result<T, ScenarioError>;

/// What an iteration gets to work with
#[derive(Debug, Clone)]
pub struct IterationContext {
    pub client: ApiClient,

    /// 1-based id of the VU within its scenario
    pub vu: usize,

    /// 0-based index of this iteration within its scenario
    pub iteration: u64,

    cancel: CancellationToken,
}

impl IterationContext {
    pub fn new(client: ApiClient, vu: usize, iteration: u64, cancel: CancellationToken) -> Self {
        Self {
            client,
            vu,
            iteration,
            cancel,
        }
    }

    /// Sleeps unless the run is cancelled first
    pub async fn pause(&self, duration: Duration) -> ScenarioResult<()> {
        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = self.cancel.cancelled() => Err(ScenarioError::Cancelled),
        }
    }
}

/// One kind of simulated user behaviour
#[async_trait]
pub trait Scenario: Send + Sync {
    fn name(&self) -> &'static str;

    /// Runs once before any VU starts
    async fn setup(&self, _client: &ApiClient) -> ScenarioResult<()> {
        Ok(())
    }

    async fn iteration(&self, ctx: &IterationContext) -> ScenarioResult<()>;

    /// Runs once after every VU has stopped
    async fn teardown(&self, _client: &ApiClient) -> ScenarioResult<()> {
        Ok(())
    }
}

/// `<prefix>-<random>` with a matching `@test.no` address
pub fn random_identity(prefix: &str) -> (String, String) {
    let n: u32 = rand::thread_rng().gen_range(0..100_000_000);
    let username = format!("{}-{}", prefix, n);
    let email = format!("{}@test.no", username);
    (username, email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_identity_shape() {
        let (username, email) = random_identity("user-3a");
        assert!(username.starts_with("user-3a-"));
        assert_eq!(email, format!("{}@test.no", username));
    }
}
