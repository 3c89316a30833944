/// Run metrics and thresholds
///
/// Every request made through the [`ApiClient`](crate::client::ApiClient)
/// records its latency and response status (0 when no response arrived);
/// a request failed unless the status is 200. Scenarios record named checks;
/// executors record finished, failed and dropped iterations. At the end of a
/// run the collected values are frozen into a [`Summary`], printed, and
/// judged against the configured [`Threshold`]s.
///
/// # Threshold syntax
///
/// ```text
/// http_req_duration:avg<50
/// http_req_duration:p(99)<500
/// http_req_failed:rate<0.01
/// checks:rate>=0.99
/// http_reqs:count>0
/// http_reqs{status:500}:count<1
/// ```

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;
use std::time::Duration;

/// Pass/fail counts of one named check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CheckCount {
    pub passes: u64,
    pub fails: u64,
}

#[derive(Debug, Default)]
struct Recorded {
    latencies_ms: Vec<f64>,
    requests: u64,
    failed_requests: u64,
    iterations: u64,
    failed_iterations: u64,
    dropped_iterations: u64,
    checks: BTreeMap<String, CheckCount>,
    statuses: BTreeMap<u16, u64>,
}

/// Thread-safe metric sink shared by all virtual users
#[derive(Debug, Default)]
pub struct Metrics {
    inner: Mutex<Recorded>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut Recorded) -> R) -> R {
        // A panicking VU must not take the metrics down with it
        let mut guard = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    /// Records one request; `status` is 0 when the request got no response
    pub fn record_request(&self, latency: Duration, status: u16) {
        self.with(|m| {
            m.latencies_ms.push(latency.as_secs_f64() * 1000.0);
            m.requests += 1;
            if status != 200 {
                m.failed_requests += 1;
            }
            *m.statuses.entry(status).or_default() += 1;
        });
    }

    pub fn record_check(&self, name: &str, passed: bool) {
        self.with(|m| {
            let count = m.checks.entry(name.to_string()).or_default();
            if passed {
                count.passes += 1;
            } else {
                count.fails += 1;
            }
        });
    }

    pub fn record_iteration(&self, succeeded: bool) {
        self.with(|m| {
            m.iterations += 1;
            if !succeeded {
                m.failed_iterations += 1;
            }
        });
    }

    /// An arrival-rate executor had no free VU for a scheduled iteration
    pub fn record_dropped(&self) {
        self.with(|m| m.dropped_iterations += 1);
    }

    /// Freezes the current values
    pub fn summary(&self) -> Summary {
        self.with(|m| {
            let mut latencies_ms = m.latencies_ms.clone();
            latencies_ms.sort_by(f64::total_cmp);

            Summary {
                requests: m.requests,
                failed_requests: m.failed_requests,
                iterations: m.iterations,
                failed_iterations: m.failed_iterations,
                dropped_iterations: m.dropped_iterations,
                checks: m.checks.clone(),
                statuses: m.statuses.clone(),
                latency: LatencyStats::from_sorted(&latencies_ms),
                latencies_ms,
            }
        })
    }
}

/// Linear-interpolated percentile of an ascending slice
pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }

    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

/// Request latency distribution in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatencyStats {
    pub min: f64,
    pub avg: f64,
    pub med: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
    pub max: f64,
}

impl LatencyStats {
    fn from_sorted(sorted: &[f64]) -> Option<Self> {
        let (&min, &max) = (sorted.first()?, sorted.last()?);
        let at = |p| percentile(sorted, p).unwrap_or(max);

        Some(Self {
            min,
            avg: sorted.iter().sum::<f64>() / sorted.len() as f64,
            med: at(50.0),
            p90: at(90.0),
            p95: at(95.0),
            p99: at(99.0),
            max,
        })
    }
}

/// Final values of a run
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub requests: u64,
    pub failed_requests: u64,
    pub iterations: u64,
    pub failed_iterations: u64,
    pub dropped_iterations: u64,
    pub checks: BTreeMap<String, CheckCount>,
    /// Requests per response status, 0 for no response
    pub statuses: BTreeMap<u16, u64>,
    pub latency: Option<LatencyStats>,

    #[serde(skip)]
    latencies_ms: Vec<f64>,
}

impl Summary {
    /// Share of requests that failed, 0 when nothing was sent
    pub fn failed_rate(&self) -> f64 {
        ratio(self.failed_requests, self.requests)
    }

    /// Share of checks that passed, 1 when nothing was checked
    pub fn checks_rate(&self) -> f64 {
        let (passes, total) = self
            .checks
            .values()
            .fold((0, 0), |(p, t), c| (p + c.passes, t + c.passes + c.fails));
        if total == 0 {
            1.0
        } else {
            ratio(passes, total)
        }
    }

    /// Requests overall, or those answered with `status`
    pub fn request_count(&self, status: Option<u16>) -> u64 {
        match status {
            None => self.requests,
            Some(status) => self.statuses.get(&status).copied().unwrap_or(0),
        }
    }

    pub fn latency_percentile(&self, p: f64) -> Option<f64> {
        percentile(&self.latencies_ms, p)
    }
}

fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

fn dotted(label: &str) -> String {
    format!("{:.<32}", label)
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, count) in &self.checks {
            let mark = if count.fails == 0 { '✓' } else { '✗' };
            writeln!(f, "     {} {}", mark, name)?;
            if count.fails > 0 {
                writeln!(
                    f,
                    "      ↳  {:.0}% - ✓ {} / ✗ {}",
                    ratio(count.passes, count.passes + count.fails) * 100.0,
                    count.passes,
                    count.fails
                )?;
            }
        }
        writeln!(f)?;

        let (passes, fails) = self
            .checks
            .values()
            .fold((0, 0), |(p, x), c| (p + c.passes, x + c.fails));
        writeln!(
            f,
            "     {}: {:.2}% ✓ {} ✗ {}",
            dotted("checks"),
            self.checks_rate() * 100.0,
            passes,
            fails
        )?;

        match &self.latency {
            Some(l) => writeln!(
                f,
                "     {}: avg={:.2}ms min={:.2}ms med={:.2}ms max={:.2}ms p(90)={:.2}ms p(95)={:.2}ms",
                dotted("http_req_duration"),
                l.avg,
                l.min,
                l.med,
                l.max,
                l.p90,
                l.p95
            )?,
            None => writeln!(f, "     {}: no requests", dotted("http_req_duration"))?,
        }

        writeln!(
            f,
            "     {}: {:.2}% ✓ {} ✗ {}",
            dotted("http_req_failed"),
            self.failed_rate() * 100.0,
            self.failed_requests,
            self.requests - self.failed_requests
        )?;
        writeln!(f, "     {}: {}", dotted("http_reqs"), self.requests)?;
        for (status, count) in &self.statuses {
            writeln!(
                f,
                "     {}: {}",
                dotted(&format!("http_reqs{{status:{}}}", status)),
                count
            )?;
        }
        writeln!(
            f,
            "     {}: {} ({} failed)",
            dotted("iterations"),
            self.iterations,
            self.failed_iterations
        )?;
        writeln!(
            f,
            "     {}: {}",
            dotted("dropped_iterations"),
            self.dropped_iterations
        )
    }
}

/// Statistic of `http_req_duration` a threshold looks at
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DurationStat {
    Avg,
    Min,
    Med,
    Max,
    Percentile(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThresholdMetric {
    Duration(DurationStat),
    FailedRate,
    ChecksRate,
    /// `http_reqs:count`, optionally tagged with one response status
    RequestCount { status: Option<u16> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparison {
    fn holds(self, actual: f64, limit: f64) -> bool {
        match self {
            Comparison::Lt => actual < limit,
            Comparison::Le => actual <= limit,
            Comparison::Gt => actual > limit,
            Comparison::Ge => actual >= limit,
        }
    }
}

/// Threshold parse errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ThresholdParseError {
    #[error("threshold '{0}' must look like <metric>:<stat><op><value>")]
    Malformed(String),

    #[error(
        "unknown metric '{0}' (expected http_req_duration, http_req_failed, http_reqs or checks)"
    )]
    UnknownMetric(String),

    #[error("unsupported tag '{0}' (only http_reqs{{status:<code>}} is supported)")]
    UnknownTag(String),

    #[error("unknown statistic '{stat}' for {metric}")]
    UnknownStat { metric: String, stat: String },

    #[error("invalid limit '{0}'")]
    InvalidLimit(String),
}

/// A pass/fail criterion evaluated against the final summary
#[derive(Debug, Clone, PartialEq)]
pub struct Threshold {
    pub metric: ThresholdMetric,
    pub comparison: Comparison,
    pub limit: f64,
    source: String,
}

/// Outcome of one threshold
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdOutcome {
    pub threshold: String,
    /// None when the metric had no samples
    pub actual: Option<f64>,
    pub passed: bool,
}

impl Threshold {
    pub fn evaluate(&self, summary: &Summary) -> ThresholdOutcome {
        let actual = match self.metric {
            ThresholdMetric::FailedRate => Some(summary.failed_rate()),
            ThresholdMetric::ChecksRate => Some(summary.checks_rate()),
            ThresholdMetric::RequestCount { status } => {
                Some(summary.request_count(status) as f64)
            }
            ThresholdMetric::Duration(stat) => summary.latency.map(|l| match stat {
                DurationStat::Avg => l.avg,
                DurationStat::Min => l.min,
                DurationStat::Med => l.med,
                DurationStat::Max => l.max,
                DurationStat::Percentile(p) => summary.latency_percentile(p).unwrap_or(l.max),
            }),
        };

        ThresholdOutcome {
            threshold: self.source.clone(),
            actual,
            // Nothing measured means nothing breached
            passed: actual.map_or(true, |v| self.comparison.holds(v, self.limit)),
        }
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for Threshold {
    type Err = ThresholdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let source: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        // A tag such as {status:500} carries its own colon
        let metric_end = source.find('}').map_or(0, |close| close + 1);
        let colon = source[metric_end..]
            .find(':')
            .map(|i| metric_end + i)
            .ok_or_else(|| ThresholdParseError::Malformed(s.to_string()))?;
        let (metric, expr) = (&source[..colon], &source[colon + 1..]);

        let (metric, status) = match metric.split_once('{') {
            None => (metric, None),
            Some((name, tag)) => {
                let status = tag
                    .strip_suffix('}')
                    .and_then(|tag| tag.strip_prefix("status:"))
                    .and_then(|code| code.parse::<u16>().ok())
                    .filter(|_| name == "http_reqs")
                    .ok_or_else(|| ThresholdParseError::UnknownTag(metric.to_string()))?;
                (name, Some(status))
            }
        };

        let op_at = expr
            .find(['<', '>'])
            .ok_or_else(|| ThresholdParseError::Malformed(s.to_string()))?;
        let (stat, rest) = expr.split_at(op_at);
        let (comparison, limit) = if let Some(v) = rest.strip_prefix("<=") {
            (Comparison::Le, v)
        } else if let Some(v) = rest.strip_prefix(">=") {
            (Comparison::Ge, v)
        } else if let Some(v) = rest.strip_prefix('<') {
            (Comparison::Lt, v)
        } else if let Some(v) = rest.strip_prefix('>') {
            (Comparison::Gt, v)
        } else {
            return Err(ThresholdParseError::Malformed(s.to_string()));
        };

        let limit: f64 = limit
            .parse()
            .map_err(|_| ThresholdParseError::InvalidLimit(limit.to_string()))?;

        let unknown_stat = || ThresholdParseError::UnknownStat {
            metric: metric.to_string(),
            stat: stat.to_string(),
        };

        let metric = match metric {
            "http_req_duration" => ThresholdMetric::Duration(match stat {
                "avg" => DurationStat::Avg,
                "min" => DurationStat::Min,
                "med" => DurationStat::Med,
                "max" => DurationStat::Max,
                _ => {
                    let p = stat
                        .strip_prefix("p(")
                        .and_then(|p| p.strip_suffix(')'))
                        .and_then(|p| p.parse::<f64>().ok())
                        .filter(|p| (0.0..=100.0).contains(p))
                        .ok_or_else(unknown_stat)?;
                    DurationStat::Percentile(p)
                }
            }),
            "http_req_failed" if stat == "rate" => ThresholdMetric::FailedRate,
            "checks" if stat == "rate" => ThresholdMetric::ChecksRate,
            "http_reqs" if stat == "count" => ThresholdMetric::RequestCount { status },
            "http_req_failed" | "checks" | "http_reqs" => return Err(unknown_stat()),
            other => return Err(ThresholdParseError::UnknownMetric(other.to_string())),
        };

        Ok(Self {
            metric,
            comparison,
            limit,
            source,
        })
    }
}
