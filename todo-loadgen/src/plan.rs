/// Run plans: which scenarios run, under which executors, judged by which
/// thresholds
///
/// Single-scenario plans accept command-line overrides (`--vus`,
/// `--duration`, `--iterations`) that replace their default executor. The
/// `mixed` plan runs four scenarios side by side on a fixed timeline:
///
/// ```text
/// signups     20 iterations / 5s for 120s          (5..50 VUs)
/// todos       40 VUs, ramp to 100, hold, back to 40 (120s)
/// lunch-time  100 VUs for 5s, starting at 55s
/// batch       1 iteration / 5s for 120s, 20 deletes each
/// ```

use crate::client::ApiClient;
use crate::executor::{execute, Executor, Stage, Workload};
use crate::metrics::{Summary, Threshold, ThresholdParseError};
use crate::scenarios::{
    BatchScenario, CreateTodoListsScenario, CreateUsersScenario, LunchTimeScenario, Scenario,
    ScenarioError, SignupsScenario, TodosScenario,
};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Users deleted by one batch iteration
pub const BATCH_SIZE: usize = 20;

/// Plan error types
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("invalid duration '{0}' (expected e.g. 500ms, 30s, 2m, 1h)")]
    InvalidDuration(String),

    #[error("--duration and --iterations cannot be combined")]
    ConflictingOverrides,

    #[error("--vus must be at least 1")]
    ZeroVus,

    #[error("the {0} plan runs several scenarios and takes no executor overrides")]
    NotOverridable(&'static str),

    #[error("the batch scenario needs a bounded iteration count; pass --iterations")]
    UnboundedBatch,

    #[error(transparent)]
    Threshold(#[from] ThresholdParseError),
}

/// Run error types
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("setup of scenario {scenario} failed: {source}")]
    Setup {
        scenario: &'static str,
        #[source]
        source: ScenarioError,
    },
}

/// Named plans selectable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PlanName {
    CreateUsers,
    CreateTodoLists,
    Signups,
    Todos,
    LunchTime,
    Batch,
    Mixed,
}

impl PlanName {
    pub fn as_str(self) -> &'static str {
        match self {
            PlanName::CreateUsers => "create-users",
            PlanName::CreateTodoLists => "create-todo-lists",
            PlanName::Signups => "signups",
            PlanName::Todos => "todos",
            PlanName::LunchTime => "lunch-time",
            PlanName::Batch => "batch",
            PlanName::Mixed => "mixed",
        }
    }
}

/// Executor overrides from the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub vus: Option<usize>,
    pub duration: Option<Duration>,
    pub iterations: Option<u64>,
}

impl Overrides {
    /// Executor described by the overrides, None when nothing was overridden
    ///
    /// A duration gives constant VUs; otherwise VUs and iterations give a
    /// per-VU iteration count. Either side defaults to 1.
    pub fn executor(&self) -> Result<Option<Executor>, PlanError> {
        if self.vus == Some(0) {
            return Err(PlanError::ZeroVus);
        }
        let vus = self.vus.unwrap_or(1);

        match (self.vus, self.duration, self.iterations) {
            (None, None, None) => Ok(None),
            (_, Some(_), Some(_)) => Err(PlanError::ConflictingOverrides),
            (_, Some(duration), None) => Ok(Some(Executor::ConstantVus { vus, duration })),
            (_, None, iterations) => Ok(Some(Executor::PerVuIterations {
                vus,
                iterations: iterations.unwrap_or(1),
            })),
        }
    }
}

/// One scenario and the executor driving it
#[derive(Clone)]
pub struct ScenarioPlan {
    pub scenario: Arc<dyn Scenario>,
    pub executor: Executor,
    pub start_time: Duration,
}

impl ScenarioPlan {
    pub fn new(scenario: Arc<dyn Scenario>, executor: Executor) -> Self {
        Self {
            scenario,
            executor,
            start_time: Duration::ZERO,
        }
    }

    pub fn starting_at(mut self, start_time: Duration) -> Self {
        self.start_time = start_time;
        self
    }
}

/// Everything needed to run and judge a load test
#[derive(Clone)]
pub struct RunPlan {
    pub name: &'static str,
    pub scenarios: Vec<ScenarioPlan>,
    pub thresholds: Vec<Threshold>,
}

fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}

fn signups_executor() -> Executor {
    Executor::ConstantArrivalRate {
        rate: 20,
        time_unit: secs(5),
        duration: secs(120),
        pre_allocated_vus: 5,
        max_vus: 50,
    }
}

fn todos_executor() -> Executor {
    Executor::RampingVus {
        start_vus: 40,
        stages: vec![
            Stage::new(secs(30), 40),
            Stage::new(secs(25), 100),
            Stage::new(secs(20), 100),
            Stage::new(secs(25), 40),
            Stage::new(secs(20), 40),
        ],
    }
}

fn lunch_time_executor() -> Executor {
    Executor::ConstantVus {
        vus: 100,
        duration: secs(5),
    }
}

fn batch_executor() -> Executor {
    Executor::ConstantArrivalRate {
        rate: 1,
        time_unit: secs(5),
        duration: secs(120),
        pre_allocated_vus: 1,
        max_vus: 1,
    }
}

fn batch_plan(executor: Executor) -> Result<ScenarioPlan, PlanError> {
    let iterations = executor.max_iterations().ok_or(PlanError::UnboundedBatch)?;
    Ok(ScenarioPlan::new(
        Arc::new(BatchScenario::new(BATCH_SIZE, iterations)),
        executor,
    ))
}

fn todos_plan(executor: Executor) -> ScenarioPlan {
    let lists = executor.max_vus();
    ScenarioPlan::new(Arc::new(TodosScenario::new(lists)), executor)
}

impl RunPlan {
    /// Builds a named plan, applying overrides and extra thresholds
    pub fn build(
        name: PlanName,
        overrides: &Overrides,
        extra_thresholds: Vec<Threshold>,
    ) -> Result<Self, PlanError> {
        let custom = overrides.executor()?;
        let executor_or = |default: Executor| custom.clone().unwrap_or(default);

        let mut thresholds = Vec::new();
        let scenarios = match name {
            PlanName::CreateUsers => {
                thresholds.push("http_req_duration:p(99)<500".parse()?);
                thresholds.push("http_req_duration:avg<50".parse()?);
                for status in [404, 429, 500] {
                    thresholds.push(format!("http_reqs{{status:{}}}:count<1", status).parse()?);
                }
                vec![ScenarioPlan::new(
                    Arc::new(CreateUsersScenario::default()),
                    executor_or(Executor::PerVuIterations {
                        vus: 1,
                        iterations: 1,
                    }),
                )]
            }
            PlanName::CreateTodoLists => vec![ScenarioPlan::new(
                Arc::new(CreateTodoListsScenario::new()),
                executor_or(Executor::RampingVus {
                    start_vus: 1,
                    stages: vec![
                        Stage::new(secs(10), 10),
                        Stage::new(secs(20), 100),
                        Stage::new(secs(10), 5),
                    ],
                }),
            )],
            PlanName::Signups => vec![ScenarioPlan::new(
                Arc::new(SignupsScenario::default()),
                executor_or(signups_executor()),
            )],
            PlanName::Todos => vec![todos_plan(executor_or(todos_executor()))],
            PlanName::LunchTime => vec![ScenarioPlan::new(
                Arc::new(LunchTimeScenario),
                executor_or(lunch_time_executor()),
            )],
            PlanName::Batch => vec![batch_plan(executor_or(batch_executor()))?],
            PlanName::Mixed => {
                if custom.is_some() {
                    return Err(PlanError::NotOverridable(name.as_str()));
                }
                vec![
                    ScenarioPlan::new(Arc::new(SignupsScenario::default()), signups_executor()),
                    todos_plan(todos_executor()),
                    ScenarioPlan::new(Arc::new(LunchTimeScenario), lunch_time_executor())
                        .starting_at(secs(55)),
                    batch_plan(batch_executor())?,
                ]
            }
        };

        thresholds.extend(extra_thresholds);

        Ok(Self {
            name: name.as_str(),
            scenarios,
            thresholds,
        })
    }

    /// VUs the plan may run at its peak, assuming every scenario overlaps
    pub fn max_vus(&self) -> usize {
        self.scenarios.iter().map(|s| s.executor.max_vus()).sum()
    }
}

/// Parses `500ms`, `30s`, `2m`, `1h`; a bare number means seconds
pub fn parse_duration(raw: &str) -> Result<Duration, PlanError> {
    let s = raw.trim();
    let invalid = || PlanError::InvalidDuration(raw.to_string());

    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (digits, unit) = s.split_at(split);
    let value: u64 = digits.parse().map_err(|_| invalid())?;

    let duration = match unit {
        "ms" => Duration::from_millis(value),
        "" | "s" => Duration::from_secs(value),
        "m" => Duration::from_secs(value.checked_mul(60).ok_or_else(invalid)?),
        "h" => Duration::from_secs(value.checked_mul(3600).ok_or_else(invalid)?),
        _ => return Err(invalid()),
    };
    Ok(duration)
}

/// Runs a plan to completion (or cancellation) and returns the summary
///
/// Setups run one after another before any executor starts; a failed setup
/// aborts the run. Teardowns run after every executor has stopped and only
/// log their failures.
pub async fn run(
    plan: &RunPlan,
    client: &ApiClient,
    cancel: CancellationToken,
) -> Result<Summary, RunError> {
    for scenario_plan in &plan.scenarios {
        let scenario = &scenario_plan.scenario;
        tracing::info!(scenario = scenario.name(), "Running setup");
        scenario
            .setup(client)
            .await
            .map_err(|source| RunError::Setup {
                scenario: scenario.name(),
                source,
            })?;
    }

    let runs = plan.scenarios.iter().map(|scenario_plan| {
        let workload = Workload::new(
            scenario_plan.scenario.clone(),
            client.clone(),
            cancel.clone(),
        );
        let executor = scenario_plan.executor.clone();
        let start_time = scenario_plan.start_time;
        tokio::spawn(async move { execute(&executor, workload, start_time).await })
    });

    for result in join_all(runs).await {
        if let Err(e) = result {
            tracing::error!("Scenario task failed: {}", e);
        }
    }

    for scenario_plan in &plan.scenarios {
        let scenario = &scenario_plan.scenario;
        if let Err(e) = scenario.teardown(client).await {
            tracing::warn!(scenario = scenario.name(), "Teardown failed: {}", e);
        }
    }

    Ok(client.metrics().summary())
}
