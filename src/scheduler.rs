//! Cron scheduler for the two daily occasions.
//!
//! Each job sleeps until its next cron occurrence in the configured zone, then
//! calls the HTTP trigger over loopback so scheduled and manual sends take the
//! same path. Failed firings are logged and the job keeps its schedule.

use crate::daemon::config::{ServiceConfig, parse_schedule};
use crate::occasion::Occasion;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use color_eyre::eyre::{Result, WrapErr};
use croner::Cron;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Error)]
#[error("scheduled {occasion} run failed: {reason}")]
pub struct ScheduleInvocationError {
    pub occasion: Occasion,
    pub reason: String,
}

/// What a job does when its time comes.
#[async_trait]
pub trait JobTrigger: Send + Sync {
    async fn fire(&self, occasion: Occasion) -> Result<(), ScheduleInvocationError>;
}

/// Fires jobs by calling the service's own HTTP trigger routes.
pub struct LoopbackTrigger {
    base_url: String,
    paths: HashMap<Occasion, String>,
    client: reqwest::Client,
}

impl LoopbackTrigger {
    pub fn new(base_url: String, paths: HashMap<Occasion, String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .wrap_err("failed to build loopback HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            paths,
            client,
        })
    }

    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let paths = Occasion::ALL
            .into_iter()
            .map(|o| (o, config.occasions.get(o).path.clone()))
            .collect();
        Self::new(config.loopback_base_url(), paths)
    }
}

#[async_trait]
impl JobTrigger for LoopbackTrigger {
    async fn fire(&self, occasion: Occasion) -> Result<(), ScheduleInvocationError> {
        let fail = |reason: String| ScheduleInvocationError { occasion, reason };

        let path = self
            .paths
            .get(&occasion)
            .ok_or_else(|| fail("no route configured".into()))?;
        let url = format!("{}{path}", self.base_url);

        let resp = self
            .client
            .get(&url)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| fail(format!("GET {url}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(fail(format!("GET {url} returned {}: {body}", status.as_u16())));
        }
        Ok(())
    }
}

/// One recurring occasion.
pub struct ScheduledJob {
    pub occasion: Occasion,
    pub expr: String,
    cron: Cron,
}

impl ScheduledJob {
    pub fn new(occasion: Occasion, expr: &str) -> Result<Self> {
        Ok(Self {
            occasion,
            expr: expr.to_owned(),
            cron: parse_schedule(expr)?,
        })
    }

    /// First occurrence strictly after `after`.
    pub fn next_after(&self, after: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        self.cron.find_next_occurrence(after, false).ok()
    }
}

pub struct Scheduler {
    zone: Tz,
    jobs: Vec<ScheduledJob>,
    trigger: Arc<dyn JobTrigger>,
}

impl Scheduler {
    pub fn new(zone: Tz, jobs: Vec<ScheduledJob>, trigger: Arc<dyn JobTrigger>) -> Self {
        Self {
            zone,
            jobs,
            trigger,
        }
    }

    pub fn from_config(config: &ServiceConfig, trigger: Arc<dyn JobTrigger>) -> Result<Self> {
        let jobs = Occasion::ALL
            .into_iter()
            .map(|o| ScheduledJob::new(o, &config.occasions.get(o).schedule))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(config.zone()?, jobs, trigger))
    }

    /// Run every job until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        let mut handles = Vec::with_capacity(self.jobs.len());
        for job in self.jobs {
            info!(occasion = %job.occasion, schedule = %job.expr, zone = %self.zone, "job scheduled");
            handles.push(tokio::spawn(run_job(
                job,
                self.zone,
                self.trigger.clone(),
                cancel.clone(),
            )));
        }
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "scheduler job panicked");
            }
        }
        info!("scheduler stopped");
    }
}

async fn run_job(
    job: ScheduledJob,
    zone: Tz,
    trigger: Arc<dyn JobTrigger>,
    cancel: CancellationToken,
) {
    let occasion = job.occasion;
    let mut last_fire: Option<DateTime<Tz>> = None;

    loop {
        let now = Utc::now().with_timezone(&zone);
        // Never search before the slot we just fired, even if the clock lags the timer.
        let from = match last_fire {
            Some(prev) if prev > now => prev,
            _ => now,
        };
        let Some(next) = job.next_after(&from) else {
            warn!(%occasion, schedule = %job.expr, "schedule has no future occurrences");
            return;
        };

        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
        info!(%occasion, next = %next, "next run");

        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(wait) => {}
        }
        last_fire = Some(next);

        match trigger.fire(occasion).await {
            Ok(()) => info!(%occasion, "scheduled run completed"),
            Err(e) => warn!(error = %e, "scheduled run failed"),
        }
    }
}
