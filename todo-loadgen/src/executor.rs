/// Executors: how many virtual users run a scenario, and for how long
///
/// # Executors
///
/// - **ConstantVus**: a fixed number of VUs loop over the scenario until the
///   duration elapses
/// - **ConstantArrivalRate**: iterations start at a fixed rate whatever their
///   latency; a free VU is taken from the pool, the pool grows up to
///   `max_vus`, and an iteration with no VU available is dropped
/// - **RampingVus**: the active VU count follows straight lines between
///   stage targets; VUs above the target finish their iteration and idle
/// - **PerVuIterations**: every VU runs a fixed number of iterations
///
/// An iteration in flight when the executor's time is up is allowed to
/// finish. Cancelling the run token stops new iterations immediately and
/// interrupts pauses inside running ones.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use todo_loadgen::client::ApiClient;
/// use todo_loadgen::executor::{execute, Executor, Workload};
/// use todo_loadgen::metrics::Metrics;
/// use todo_loadgen::scenarios::LunchTimeScenario;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> anyhow::Result<()> {
/// let client = ApiClient::new("http://localhost:3000", Duration::from_secs(10), Arc::new(Metrics::new()))?;
/// let workload = Workload::new(Arc::new(LunchTimeScenario), client, CancellationToken::new());
///
/// let executor = Executor::ConstantVus { vus: 10, duration: Duration::from_secs(5) };
/// execute(&executor, workload, Duration::ZERO).await;
/// # Ok(())
/// # }
/// ```

use crate::client::ApiClient;
use crate::scenarios::{IterationContext, Scenario, ScenarioError};
use futures::future::join_all;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// How often a ramping executor re-evaluates its target
const RAMP_TICK: Duration = Duration::from_millis(100);

/// One leg of a ramping executor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stage {
    pub duration: Duration,
    pub target: usize,
}

impl Stage {
    pub fn new(duration: Duration, target: usize) -> Self {
        Self { duration, target }
    }
}

/// Executor kinds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Executor {
    ConstantVus {
        vus: usize,
        duration: Duration,
    },
    ConstantArrivalRate {
        /// Iterations started per `time_unit`
        rate: u32,
        time_unit: Duration,
        duration: Duration,
        pre_allocated_vus: usize,
        max_vus: usize,
    },
    RampingVus {
        start_vus: usize,
        stages: Vec<Stage>,
    },
    PerVuIterations {
        vus: usize,
        iterations: u64,
    },
}

impl Executor {
    /// Largest number of VUs the executor may run at once
    pub fn max_vus(&self) -> usize {
        match self {
            Executor::ConstantVus { vus, .. } | Executor::PerVuIterations { vus, .. } => *vus,
            Executor::ConstantArrivalRate {
                pre_allocated_vus,
                max_vus,
                ..
            } => (*max_vus).max(*pre_allocated_vus),
            Executor::RampingVus { start_vus, stages } => stages
                .iter()
                .map(|s| s.target)
                .fold(*start_vus, usize::max),
        }
    }

    /// Planned run time, None when the executor is bounded by iterations
    pub fn duration(&self) -> Option<Duration> {
        match self {
            Executor::ConstantVus { duration, .. }
            | Executor::ConstantArrivalRate { duration, .. } => Some(*duration),
            Executor::RampingVus { stages, .. } => Some(stages.iter().map(|s| s.duration).sum()),
            Executor::PerVuIterations { .. } => None,
        }
    }

    /// Upper bound on iterations, None when it depends on latency
    pub fn max_iterations(&self) -> Option<u64> {
        match self {
            Executor::PerVuIterations { vus, iterations } => Some(*vus as u64 * iterations),
            Executor::ConstantArrivalRate {
                rate,
                time_unit,
                duration,
                ..
            } => {
                let period = arrival_period(*rate, *time_unit)?.as_nanos();
                Some(duration.as_nanos().div_ceil(period) as u64)
            }
            Executor::ConstantVus { .. } | Executor::RampingVus { .. } => None,
        }
    }
}

fn arrival_period(rate: u32, time_unit: Duration) -> Option<Duration> {
    if rate == 0 {
        return None;
    }
    Some(time_unit / rate).filter(|p| !p.is_zero())
}

/// Active VU target `elapsed` into a ramp
pub fn target_at(start_vus: usize, stages: &[Stage], elapsed: Duration) -> usize {
    let mut from = start_vus;
    let mut stage_start = Duration::ZERO;

    for stage in stages {
        let stage_end = stage_start + stage.duration;
        if elapsed < stage_end {
            let progress = (elapsed - stage_start).as_secs_f64() / stage.duration.as_secs_f64();
            let value = from as f64 + (stage.target as f64 - from as f64) * progress;
            return value.round() as usize;
        }
        from = stage.target;
        stage_start = stage_end;
    }

    from
}

/// A scenario bound to a client and the run's cancellation token
#[derive(Clone)]
pub struct Workload {
    scenario: Arc<dyn Scenario>,
    client: ApiClient,
    cancel: CancellationToken,
    iterations: Arc<AtomicU64>,
}

impl Workload {
    pub fn new(scenario: Arc<dyn Scenario>, client: ApiClient, cancel: CancellationToken) -> Self {
        Self {
            scenario,
            client,
            cancel,
            iterations: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn name(&self) -> &'static str {
        self.scenario.name()
    }

    async fn run_iteration(&self, vu: usize) {
        let iteration = self.iterations.fetch_add(1, Ordering::Relaxed);
        let ctx = IterationContext::new(self.client.clone(), vu, iteration, self.cancel.clone());
        let metrics = self.client.metrics();

        match self.scenario.iteration(&ctx).await {
            Ok(()) => metrics.record_iteration(true),
            // Interrupted by shutdown; neither a success nor a failure
            Err(ScenarioError::Cancelled) => {}
            Err(e) => {
                tracing::debug!(scenario = self.name(), vu, iteration, error = %e, "Iteration failed");
                metrics.record_iteration(false);
            }
        }
    }
}

async fn join_vus(name: &'static str, handles: Vec<JoinHandle<()>>) {
    for result in join_all(handles).await {
        if let Err(e) = result {
            tracing::error!(scenario = name, "VU task failed: {}", e);
        }
    }
}

/// Runs `workload` under `executor`, starting after `start_time`
pub async fn execute(executor: &Executor, workload: Workload, start_time: Duration) {
    if !start_time.is_zero() {
        tokio::select! {
            _ = tokio::time::sleep(start_time) => {}
            _ = workload.cancel.cancelled() => return,
        }
    }

    tracing::info!(scenario = workload.name(), ?executor, "Scenario started");

    match executor {
        Executor::ConstantVus { vus, duration } => constant_vus(&workload, *vus, *duration).await,
        Executor::ConstantArrivalRate {
            rate,
            time_unit,
            duration,
            pre_allocated_vus,
            max_vus,
        } => {
            constant_arrival_rate(
                &workload,
                *rate,
                *time_unit,
                *duration,
                *pre_allocated_vus,
                (*max_vus).max(*pre_allocated_vus),
            )
            .await
        }
        Executor::RampingVus { start_vus, stages } => {
            ramping_vus(&workload, *start_vus, stages, executor.max_vus()).await
        }
        Executor::PerVuIterations { vus, iterations } => {
            per_vu_iterations(&workload, *vus, *iterations).await
        }
    }

    tracing::info!(scenario = workload.name(), "Scenario finished");
}

async fn constant_vus(workload: &Workload, vus: usize, duration: Duration) {
    let deadline = Instant::now() + duration;

    let handles = (1..=vus)
        .map(|vu| {
            let workload = workload.clone();
            tokio::spawn(async move {
                while Instant::now() < deadline && !workload.cancel.is_cancelled() {
                    workload.run_iteration(vu).await;
                }
            })
        })
        .collect();

    join_vus(workload.name(), handles).await;
}

async fn per_vu_iterations(workload: &Workload, vus: usize, iterations: u64) {
    let handles = (1..=vus)
        .map(|vu| {
            let workload = workload.clone();
            tokio::spawn(async move {
                for _ in 0..iterations {
                    if workload.cancel.is_cancelled() {
                        break;
                    }
                    workload.run_iteration(vu).await;
                }
            })
        })
        .collect();

    join_vus(workload.name(), handles).await;
}

async fn constant_arrival_rate(
    workload: &Workload,
    rate: u32,
    time_unit: Duration,
    duration: Duration,
    pre_allocated_vus: usize,
    max_vus: usize,
) {
    let Some(period) = arrival_period(rate, time_unit) else {
        tracing::warn!(scenario = workload.name(), rate, "Arrival rate is zero, nothing to run");
        return;
    };

    let deadline = Instant::now() + duration;
    let (idle_tx, mut idle_rx) = mpsc::unbounded_channel::<usize>();
    for vu in 1..=pre_allocated_vus {
        let _ = idle_tx.send(vu);
    }
    let mut allocated = pre_allocated_vus;

    let mut ticker = tokio::time::interval(period);
    let mut in_flight: Vec<JoinHandle<()>> = Vec::new();

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = workload.cancel.cancelled() => break,
        }
        if Instant::now() >= deadline {
            break;
        }

        let vu = match idle_rx.try_recv() {
            Ok(vu) => vu,
            Err(_) if allocated < max_vus => {
                allocated += 1;
                tracing::debug!(scenario = workload.name(), vus = allocated, "Allocated VU");
                allocated
            }
            Err(_) => {
                workload.client.metrics().record_dropped();
                continue;
            }
        };

        let task_workload = workload.clone();
        let idle_tx = idle_tx.clone();
        in_flight.retain(|handle| !handle.is_finished());
        in_flight.push(tokio::spawn(async move {
            task_workload.run_iteration(vu).await;
            let _ = idle_tx.send(vu);
        }));
    }

    join_vus(workload.name(), in_flight).await;
}

async fn ramping_vus(workload: &Workload, start_vus: usize, stages: &[Stage], max_vus: usize) {
    let total: Duration = stages.iter().map(|s| s.duration).sum();
    let target = Arc::new(AtomicUsize::new(start_vus));
    let stop = workload.cancel.child_token();

    let handles = (1..=max_vus)
        .map(|vu| {
            let workload = workload.clone();
            let target = target.clone();
            let stop = stop.clone();
            tokio::spawn(async move {
                while !stop.is_cancelled() {
                    if vu <= target.load(Ordering::Relaxed) {
                        workload.run_iteration(vu).await;
                    } else {
                        tokio::select! {
                            _ = tokio::time::sleep(RAMP_TICK) => {}
                            _ = stop.cancelled() => {}
                        }
                    }
                }
            })
        })
        .collect();

    let started = Instant::now();
    loop {
        let elapsed = started.elapsed();
        if elapsed >= total {
            break;
        }
        target.store(target_at(start_vus, stages, elapsed), Ordering::Relaxed);

        tokio::select! {
            _ = tokio::time::sleep(RAMP_TICK) => {}
            _ = workload.cancel.cancelled() => break,
        }
    }
    stop.cancel();

    join_vus(workload.name(), handles).await;
}
