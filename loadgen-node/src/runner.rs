//! Scenario runner: open linear ramp injection and per-user flow execution.
//!
//! Each virtual user is an independent tokio task owning its own session.
//! Failed checks are recorded and the user keeps going; nothing mid-run is
//! fatal to the process. Pass/fail is decided by the global assertions
//! after every user has finished.

use reqwest::header::HeaderMap;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::{interval, sleep};
use tracing::{debug, error, info, warn};

use crate::config::LoadgenConfig;
use crate::error::Result;
use crate::feeder::UserFeeder;
use crate::metrics::{MetricsCollector, RunReport};
use crate::scenario::{
    self, credentials_body, registration_flow, HeaderBundle, HttpStep, LogStep, Session, Step,
};

/// Drives the registration/login flow for the configured injection profile
pub struct ScenarioRunner {
    config: LoadgenConfig,
    client: Client,
    steps: Arc<Vec<Step>>,
    preflight_headers: HeaderMap,
    json_headers: HeaderMap,
    feeder: Arc<UserFeeder>,
    collector: MetricsCollector,
}

impl ScenarioRunner {
    pub fn new(config: LoadgenConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        let preflight_headers = scenario::preflight_headers(&config.target.origin)?;
        let json_headers = scenario::json_headers(&config.target.origin)?;

        let feeder = Arc::new(UserFeeder::new(
            &config.scenario.username_prefix,
            &config.scenario.password_prefix,
            config.scenario.pool_size,
        ));

        let steps = Arc::new(registration_flow(config.inter_phase_pause()));

        Ok(Self {
            config,
            client,
            steps,
            preflight_headers,
            json_headers,
            feeder,
            collector: MetricsCollector::new(),
        })
    }

    /// Inject all virtual users on a linear ramp, wait for every flow to
    /// finish, and return the aggregate report.
    pub async fn run(&self) -> Result<RunReport> {
        let users = self.config.injection.users as usize;
        let base_url = self
            .config
            .target
            .base_url
            .trim_end_matches('/')
            .to_string();

        let spacing = arrival_spacing(self.config.ramp_up(), users);
        info!(
            users,
            ramp_up_seconds = self.config.injection.ramp_up_seconds,
            base_url = %base_url,
            "Starting injection"
        );

        let mut ticker = (!spacing.is_zero()).then(|| interval(spacing));
        let mut handles = Vec::with_capacity(users);
        self.collector.mark_start();

        for _ in 0..users {
            if let Some(ticker) = ticker.as_mut() {
                ticker.tick().await;
            }

            let record = self.feeder.next();
            self.collector.user_started();

            let steps = Arc::clone(&self.steps);
            let client = self.client.clone();
            let base_url = base_url.clone();
            let preflight = self.preflight_headers.clone();
            let json = self.json_headers.clone();
            let collector = self.collector.clone();
            let session = Session::for_user(&record);

            handles.push(tokio::spawn(async move {
                run_user(&steps, &client, &base_url, &preflight, &json, session, &collector).await;
            }));
        }

        info!("All users injected, waiting for in-flight flows");
        for (idx, handle) in handles.into_iter().enumerate() {
            if let Err(e) = handle.await {
                error!(user = idx, error = %e, "Virtual user task panicked");
            }
        }

        Ok(self.collector.report())
    }
}

/// Evenly spaced arrivals across the ramp window; first arrival immediate
fn arrival_spacing(ramp_up: Duration, users: usize) -> Duration {
    if users == 0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(ramp_up.as_secs_f64() / users as f64)
}

/// Execute one user's flow, strictly sequential within the task
async fn run_user(
    steps: &[Step],
    client: &Client,
    base_url: &str,
    preflight_headers: &HeaderMap,
    json_headers: &HeaderMap,
    mut session: Session,
    collector: &MetricsCollector,
) {
    for step in steps {
        match step {
            Step::Http(http) => {
                let headers = match http.headers {
                    HeaderBundle::Preflight => preflight_headers,
                    HeaderBundle::Json => json_headers,
                };
                execute_http(http, client, base_url, headers, &mut session, collector).await;
            }
            Step::Pause(duration) => sleep(*duration).await,
            Step::Log(LogStep::RegisterOutcome) => {
                if let Some(line) = scenario::register_outcome_line(&session) {
                    info!("{}", line);
                }
            }
            Step::Log(LogStep::LoginOutcome) => {
                let line = scenario::login_outcome_line(&session);
                if session.auth_token.is_some() {
                    info!("{}", line);
                } else {
                    warn!("{}", line);
                }
            }
        }
    }
    collector.user_completed();
}

/// Issue one HTTP step and fold its outcome into the session and collector.
/// Transport errors count as a failed check; the user's flow continues.
async fn execute_http(
    step: &HttpStep,
    client: &Client,
    base_url: &str,
    headers: &HeaderMap,
    session: &mut Session,
    collector: &MetricsCollector,
) {
    let url = format!("{}{}", base_url, step.path);
    let mut request = client
        .request(step.method.clone(), &url)
        .headers(headers.clone());
    if step.send_credentials {
        request = request.body(credentials_body(session));
    }

    let started = Instant::now();
    match request.send().await {
        Ok(response) => {
            let status = response.status().as_u16();
            let elapsed = started.elapsed();
            // Only fetch the body when the step extracts from it
            let body: Option<Value> = if step.extract.is_some() {
                response.json().await.ok()
            } else {
                None
            };

            let passed = scenario::apply_response(step, status, body.as_ref(), session);
            collector.record_request(step.name, elapsed, passed);
            if !passed {
                debug!(step = step.name, status, "Status check failed");
            }
        }
        Err(e) => {
            collector.record_request(step.name, started.elapsed(), false);
            debug!(step = step.name, error = %e, "Request failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arrival_spacing() {
        assert_eq!(
            arrival_spacing(Duration::from_secs(60), 1000),
            Duration::from_millis(60)
        );
        assert_eq!(arrival_spacing(Duration::ZERO, 10), Duration::ZERO);
        assert_eq!(arrival_spacing(Duration::from_secs(60), 0), Duration::ZERO);
    }

    #[test]
    fn test_runner_construction_rejects_bad_origin() {
        let mut config = LoadgenConfig::default();
        config.target.origin = "bad\norigin".to_string();
        assert!(ScenarioRunner::new(config).is_err());
    }
}
