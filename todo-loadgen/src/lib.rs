//! # Todo Load Generator Library
//!
//! Drives the todo API with virtual users (VUs) the way the k6 load tests
//! do: scenarios describe what a VU does per iteration, executors decide
//! how many VUs run and how often, and every request is recorded in a
//! shared [`metrics::Metrics`] that is judged against thresholds at the end.
//!
//! ## Modules
//!
//! - `client`: typed HTTP client with request and check recording
//! - `executor`: constant VUs, constant arrival rate, ramping VUs, per-VU iterations
//! - `metrics`: counters, latency percentiles, thresholds
//! - `plan`: named run plans and the run loop
//! - `scenarios`: the workloads
//!
//! ## Example
//!
//! ```no_run
//! use std::{sync::Arc, time::Duration};
//! use todo_loadgen::{client::ApiClient, metrics::Metrics, plan};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = ApiClient::new("http://localhost:3000", Duration::from_secs(10), Arc::new(Metrics::new()))?;
//! let plan = plan::RunPlan::build(plan::PlanName::Signups, &Default::default(), Vec::new())?;
//! let summary = plan::run(&plan, &client, CancellationToken::new()).await?;
//! println!("{}", summary);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod executor;
pub mod metrics;
pub mod plan;
pub mod scenarios;
