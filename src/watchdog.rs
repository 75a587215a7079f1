//! Connection watchdog.
//!
//! Polls the gateway on a fixed interval. Every poll that finds the session
//! down asks the recovery policy to restart the whole service; the process is
//! expected to come back with a fresh session.

use crate::gateway::ChatGateway;
use async_trait::async_trait;
use color_eyre::eyre::{Result, bail, eyre};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// How to recover once the session is lost.
#[async_trait]
pub trait RecoveryPolicy: Send + Sync {
    async fn restart_service(&self) -> Result<()>;
}

/// Runs an external command (e.g. `sudo service wa-auto restart`).
pub struct CommandRecovery {
    argv: Vec<String>,
}

impl CommandRecovery {
    pub fn new(argv: Vec<String>) -> Result<Self> {
        if argv.is_empty() {
            bail!("restart command must not be empty");
        }
        Ok(Self { argv })
    }
}

#[async_trait]
impl RecoveryPolicy for CommandRecovery {
    async fn restart_service(&self) -> Result<()> {
        let (program, args) = self
            .argv
            .split_first()
            .ok_or_else(|| eyre!("restart command must not be empty"))?;
        let status = tokio::process::Command::new(program)
            .args(args)
            .stdin(std::process::Stdio::null())
            .status()
            .await
            .map_err(|e| eyre!("failed to run {program}: {e}"))?;
        if !status.success() {
            bail!("{} exited with {status}", self.argv.join(" "));
        }
        Ok(())
    }
}

pub struct Watchdog {
    gateway: Arc<dyn ChatGateway>,
    recovery: Arc<dyn RecoveryPolicy>,
    interval: Duration,
}

impl Watchdog {
    pub fn new(
        gateway: Arc<dyn ChatGateway>,
        recovery: Arc<dyn RecoveryPolicy>,
        interval: Duration,
    ) -> Self {
        Self {
            gateway,
            recovery,
            interval,
        }
    }

    /// Poll until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        let mut timer = tokio::time::interval(self.interval);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // Skip the first immediate tick.
        timer.tick().await;

        info!(interval_secs = self.interval.as_secs(), "watchdog started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = timer.tick() => {}
            }

            if self.gateway.is_connected().await {
                debug!("session alive");
                continue;
            }

            warn!(gateway = self.gateway.name(), "connection lost, restarting service");
            if let Err(e) = self.recovery.restart_service().await {
                error!(error = %e, "service restart failed");
            }
        }

        info!("watchdog stopped");
    }
}
