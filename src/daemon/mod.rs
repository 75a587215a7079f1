//! Service runner: connects the chat session and runs the long-lived tasks.
//!
//! Once the initial connect succeeds, three tasks share the gateway:
//! 1. The HTTP trigger (one route per occasion)
//! 2. The cron scheduler (loopback calls into the HTTP trigger)
//! 3. The connection watchdog (restarts the service when the session drops)
//!
//! A shutdown signal (SIGTERM/SIGINT) cancels all three and disconnects the
//! session before returning.

pub mod config;

use crate::gateway::ChatGateway;
use crate::gateway::bridge::BridgeGateway;
use crate::http;
use crate::notify::{DispatchSettings, NotificationService};
use crate::occasion::Occasion;
use crate::scheduler::{LoopbackTrigger, Scheduler};
use crate::watchdog::{CommandRecovery, RecoveryPolicy, Watchdog};
use color_eyre::eyre::{Result, WrapErr, eyre};
use config::ServiceConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Dispatch inputs derived from config.
pub fn dispatch_settings(config: &ServiceConfig) -> Result<DispatchSettings> {
    let invite_links = Occasion::ALL
        .into_iter()
        .map(|o| {
            config
                .invite_link(o)
                .map(|link| (o, link.to_owned()))
                .ok_or_else(|| eyre!("no invite link configured for {o}"))
        })
        .collect::<Result<_>>()?;

    Ok(DispatchSettings {
        zone: config.zone()?,
        target_date: config.target_date,
        invite_links,
        catalog: config.quote_catalog(),
    })
}

/// Cancel `cancel` on SIGTERM or SIGINT.
pub fn cancel_on_shutdown_signal(cancel: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => {}
                        _ = sigterm.recv() => {}
                    }
                }
                Err(e) => {
                    warn!(error = %e, "failed to install SIGTERM handler, only Ctrl-C will stop the service");
                    let _ = ctrl_c.await;
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
        }
        info!("shutdown signal received");
        cancel.cancel();
    });
}

/// Owns the gateway and recovery policy for one service lifetime.
pub struct ServiceRunner {
    config: ServiceConfig,
    gateway: Arc<dyn ChatGateway>,
    recovery: Arc<dyn RecoveryPolicy>,
}

impl ServiceRunner {
    pub fn new(
        config: ServiceConfig,
        gateway: Arc<dyn ChatGateway>,
        recovery: Arc<dyn RecoveryPolicy>,
    ) -> Self {
        Self {
            config,
            gateway,
            recovery,
        }
    }

    /// Bridge gateway and command-based recovery, as configured.
    pub fn from_config(config: ServiceConfig) -> Result<Self> {
        let gateway = Arc::new(BridgeGateway::new(&config.gateway)?);
        let recovery = Arc::new(CommandRecovery::new(
            config.watchdog.restart_command.clone(),
        )?);
        Ok(Self::new(config, gateway, recovery))
    }

    /// Connect, run until `cancel` fires, then disconnect.
    ///
    /// Everything that can fail from config alone (dispatch settings, the
    /// listener, the schedules) is prepared before the session is opened. A
    /// failed initial connect is fatal. Cancelling while the gateway is still
    /// pairing returns `Ok(())` without starting any task.
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let config = &self.config;

        let settings = dispatch_settings(config)?;
        let trigger = Arc::new(LoopbackTrigger::from_config(config)?);
        let scheduler = Scheduler::from_config(config, trigger)?;
        let listener = tokio::net::TcpListener::bind(config.listen)
            .await
            .wrap_err_with(|| format!("failed to bind {}", config.listen))?;

        info!(gateway = self.gateway.name(), "connecting chat session");
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("shutdown requested before the chat session was ready");
                return Ok(());
            }
            result = self.gateway.connect() => {
                result.wrap_err("initial connect to the chat gateway failed")?;
            }
        }

        let service = Arc::new(NotificationService::new(self.gateway.clone(), settings));
        let app = http::router(service, &config.occasions);
        let server_cancel = cancel.clone();
        let server = tokio::spawn(async move {
            if let Err(e) = http::serve(listener, app, server_cancel.clone()).await {
                error!(error = %e, "HTTP trigger stopped");
                server_cancel.cancel();
            }
        });

        let scheduler_task = tokio::spawn(scheduler.run(cancel.clone()));

        let watchdog_task = if config.watchdog.enabled {
            let watchdog = Watchdog::new(
                self.gateway.clone(),
                self.recovery.clone(),
                Duration::from_secs(config.watchdog.interval_secs),
            );
            Some(tokio::spawn(watchdog.run(cancel.clone())))
        } else {
            info!("watchdog disabled");
            None
        };

        info!(
            target_date = %config.target_date,
            timezone = %config.timezone,
            "ready"
        );

        cancel.cancelled().await;
        info!("shutting down");

        self.gateway.disconnect().await;

        if let Err(e) = server.await {
            warn!(error = %e, "HTTP task panicked");
        }
        if let Err(e) = scheduler_task.await {
            warn!(error = %e, "scheduler task panicked");
        }
        if let Some(task) = watchdog_task {
            if let Err(e) = task.await {
                warn!(error = %e, "watchdog task panicked");
            }
        }

        info!("stopped");
        Ok(())
    }
}
