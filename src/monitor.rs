//! Request metrics collected in-process and served by the admin performance endpoints.

use std::{
    collections::{BTreeMap, VecDeque},
    sync::{
        Mutex, MutexGuard,
        atomic::{AtomicI64, Ordering},
    },
    time::{Duration, Instant},
};

use chrono::{DateTime, DurationRound, TimeDelta, Utc};

const MAX_SAMPLES: usize = 1000;
const MAX_HOURLY_BUCKETS: usize = 24 * 7;

#[derive(Debug, Clone)]
pub struct RequestSample {
    pub at: DateTime<Utc>,
    pub method: String,
    pub path: String,
    pub status: u16,
    pub duration: Duration,
}

#[derive(Debug, Clone, Default)]
struct HourBucket {
    hour: DateTime<Utc>,
    requests: u64,
    errors: u64,
    total_ms: u64,
}

#[derive(Default)]
struct MonitorState {
    total_requests: u64,
    total_errors: u64,
    samples: VecDeque<RequestSample>,
    hourly: VecDeque<HourBucket>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartSeries {
    Requests,
    ResponseTime,
    Errors,
}

impl ChartSeries {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "requests" => Some(ChartSeries::Requests),
            "response_time" => Some(ChartSeries::ResponseTime),
            "errors" => Some(ChartSeries::Errors),
            _ => None,
        }
    }
}

/// Aggregates taken over the retained sample window.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestStats {
    pub uptime: Duration,
    pub active_requests: i64,
    pub total_requests: u64,
    pub total_errors: u64,
    pub average_response_ms: f64,
    pub requests_per_second: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteStats {
    pub method: String,
    pub path: String,
    pub requests: u64,
    pub errors: u64,
    pub average_ms: f64,
    pub max_ms: f64,
}

/// In-flight marker; also released when the request future is cancelled.
pub struct ActiveRequest<'a> {
    monitor: &'a PerformanceMonitor,
}

impl Drop for ActiveRequest<'_> {
    fn drop(&mut self) {
        self.monitor.active.fetch_sub(1, Ordering::Relaxed);
    }
}

pub struct PerformanceMonitor {
    started_at: Instant,
    active: AtomicI64,
    state: Mutex<MonitorState>,
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            active: AtomicI64::new(0),
            state: Mutex::new(MonitorState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MonitorState> {
        // A panic while holding the lock leaves counters usable.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Counts a request as in flight until the returned guard is dropped.
    pub fn request_started(&self) -> ActiveRequest<'_> {
        self.active.fetch_add(1, Ordering::Relaxed);
        ActiveRequest { monitor: self }
    }

    pub fn record(&self, sample: RequestSample) {
        let is_error = sample.status >= 500;
        let hour = truncate_to_hour(sample.at);
        let ms = u64::try_from(sample.duration.as_millis()).unwrap_or(u64::MAX);

        let mut state = self.lock();
        state.total_requests += 1;
        if is_error {
            state.total_errors += 1;
        }

        match state.hourly.back_mut() {
            Some(bucket) if bucket.hour == hour => {
                bucket.requests += 1;
                bucket.errors += u64::from(is_error);
                bucket.total_ms = bucket.total_ms.saturating_add(ms);
            }
            _ => {
                state.hourly.push_back(HourBucket {
                    hour,
                    requests: 1,
                    errors: u64::from(is_error),
                    total_ms: ms,
                });
                while state.hourly.len() > MAX_HOURLY_BUCKETS {
                    state.hourly.pop_front();
                }
            }
        }

        state.samples.push_back(sample);
        while state.samples.len() > MAX_SAMPLES {
            state.samples.pop_front();
        }
    }

    pub fn stats(&self) -> RequestStats {
        let now = Utc::now();
        let state = self.lock();
        let (sum_ms, count) = state
            .samples
            .iter()
            .fold((0.0_f64, 0_u64), |(sum, n), s| {
                (sum + s.duration.as_secs_f64() * 1000.0, n + 1)
            });
        let last_minute = state
            .samples
            .iter()
            .filter(|s| now - s.at <= TimeDelta::seconds(60))
            .count();

        RequestStats {
            uptime: self.started_at.elapsed(),
            active_requests: self.active.load(Ordering::Relaxed),
            total_requests: state.total_requests,
            total_errors: state.total_errors,
            average_response_ms: if count == 0 { 0.0 } else { sum_ms / count as f64 },
            requests_per_second: last_minute as f64 / 60.0,
        }
    }

    /// One point per hour from `hours` ago up to the current hour; hours without traffic are zero.
    pub fn hourly_series(
        &self,
        series: ChartSeries,
        hours: i64,
        now: DateTime<Utc>,
    ) -> Vec<(DateTime<Utc>, f64)> {
        let current = truncate_to_hour(now);
        let state = self.lock();
        (0..=hours)
            .rev()
            .map(|back| {
                let hour = current - TimeDelta::hours(back);
                let value = state
                    .hourly
                    .iter()
                    .find(|bucket| bucket.hour == hour)
                    .map(|bucket| match series {
                        ChartSeries::Requests => bucket.requests as f64,
                        ChartSeries::Errors => bucket.errors as f64,
                        ChartSeries::ResponseTime if bucket.requests > 0 => {
                            bucket.total_ms as f64 / bucket.requests as f64
                        }
                        ChartSeries::ResponseTime => 0.0,
                    })
                    .unwrap_or(0.0);
                (hour, value)
            })
            .collect()
    }

    /// Per-route latency over retained samples within `[from, to]`, slowest first.
    pub fn route_report(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<RouteStats> {
        let state = self.lock();
        let mut grouped: BTreeMap<(String, String), (u64, u64, f64, f64)> = BTreeMap::new();
        for sample in state.samples.iter().filter(|s| s.at >= from && s.at <= to) {
            let ms = sample.duration.as_secs_f64() * 1000.0;
            let entry = grouped
                .entry((sample.method.clone(), sample.path.clone()))
                .or_insert((0, 0, 0.0, 0.0));
            entry.0 += 1;
            entry.1 += u64::from(sample.status >= 500);
            entry.2 += ms;
            entry.3 = entry.3.max(ms);
        }

        let mut report: Vec<RouteStats> = grouped
            .into_iter()
            .map(|((method, path), (requests, errors, sum_ms, max_ms))| RouteStats {
                method,
                path,
                requests,
                errors,
                average_ms: sum_ms / requests as f64,
                max_ms,
            })
            .collect();
        report.sort_by(|a, b| b.average_ms.total_cmp(&a.average_ms));
        report
    }
}

fn truncate_to_hour(at: DateTime<Utc>) -> DateTime<Utc> {
    at.duration_trunc(TimeDelta::hours(1)).unwrap_or(at)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(at: DateTime<Utc>, path: &str, status: u16, ms: u64) -> RequestSample {
        RequestSample {
            at,
            method: "GET".into(),
            path: path.into(),
            status,
            duration: Duration::from_millis(ms),
        }
    }

    #[test]
    fn hourly_series_buckets_requests() {
        let monitor = PerformanceMonitor::new();
        let now = Utc::now();
        let earlier = now - TimeDelta::hours(2);
        monitor.record(sample(earlier, "/api/cart", 200, 100));
        monitor.record(sample(now, "/api/cart", 200, 50));
        monitor.record(sample(now, "/api/cart", 500, 150));

        let requests = monitor.hourly_series(ChartSeries::Requests, 3, now);
        assert_eq!(requests.len(), 4);
        let values: Vec<f64> = requests.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![0.0, 1.0, 0.0, 2.0]);

        let latency = monitor.hourly_series(ChartSeries::ResponseTime, 0, now);
        assert_eq!(latency[0].1, 100.0);

        let errors = monitor.hourly_series(ChartSeries::Errors, 0, now);
        assert_eq!(errors[0].1, 1.0);
    }

    #[test]
    fn route_report_groups_by_path() {
        let monitor = PerformanceMonitor::new();
        let now = Utc::now();
        monitor.record(sample(now, "/api/cart", 200, 10));
        monitor.record(sample(now, "/api/cart", 200, 30));
        monitor.record(sample(now, "/api/review/add", 200, 90));

        let report = monitor.route_report(now - TimeDelta::minutes(1), now + TimeDelta::minutes(1));
        assert_eq!(report.len(), 2);
        assert_eq!(report[0].path, "/api/review/add");
        assert_eq!(report[1].requests, 2);
        assert_eq!(report[1].average_ms, 20.0);
        assert_eq!(report[1].max_ms, 30.0);
    }

    #[test]
    fn sample_ring_is_bounded() {
        let monitor = PerformanceMonitor::new();
        let now = Utc::now();
        for _ in 0..(MAX_SAMPLES + 10) {
            monitor.record(sample(now, "/health", 200, 1));
        }
        let stats = monitor.stats();
        assert_eq!(stats.total_requests, (MAX_SAMPLES + 10) as u64);
        assert_eq!(monitor.lock().samples.len(), MAX_SAMPLES);
    }

    #[test]
    fn active_requests_drop_with_their_guard() {
        let monitor = PerformanceMonitor::new();
        let first = monitor.request_started();
        let second = monitor.request_started();
        assert_eq!(monitor.stats().active_requests, 2);

        drop(first);
        assert_eq!(monitor.stats().active_requests, 1);
        drop(second);
        assert_eq!(monitor.stats().active_requests, 0);
    }

    #[tokio::test]
    async fn abandoned_request_is_no_longer_active() {
        let monitor = PerformanceMonitor::new();
        let pending = async {
            let _active = monitor.request_started();
            std::future::pending::<()>().await;
        };
        let timed_out = tokio::time::timeout(Duration::from_millis(10), pending).await;
        assert!(timed_out.is_err());
        assert_eq!(monitor.stats().active_requests, 0);
    }

    #[test]
    fn chart_series_names() {
        assert_eq!(ChartSeries::parse("Requests"), Some(ChartSeries::Requests));
        assert_eq!(ChartSeries::parse("response_time"), Some(ChartSeries::ResponseTime));
        assert_eq!(ChartSeries::parse("memory"), None);
    }
}
