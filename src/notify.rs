//! Notification dispatch: resolve the group, compose the countdown, send it.

use crate::countdown::{self, CatalogError, CountdownContext};
use crate::gateway::{ChatGateway, OutboundMessage, ResolveError, SendError};
use crate::occasion::Occasion;
use crate::quotes::QuoteCatalog;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no invite link configured for {0}")]
    NoInviteLink(Occasion),
    #[error(transparent)]
    GroupResolutionFailed(ResolveError),
    #[error(transparent)]
    SendFailed(SendError),
    #[error("cannot compose {occasion} message: {source}")]
    Catalog {
        occasion: Occasion,
        source: CatalogError,
    },
}

impl DispatchError {
    /// Short message safe to return to HTTP callers.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::NoInviteLink(_) | Self::GroupResolutionFailed(_) => "Failed to get info group",
            Self::SendFailed(_) => "Failed to send message",
            Self::Catalog { .. } => "Failed to compose message",
        }
    }
}

/// Static inputs of every dispatch.
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub zone: Tz,
    pub target_date: NaiveDate,
    pub invite_links: HashMap<Occasion, String>,
    pub catalog: QuoteCatalog,
}

impl DispatchSettings {
    /// Render the message for `occasion` as of `now`, shuffling with `rng`.
    pub fn compose<R: Rng + ?Sized>(
        &self,
        occasion: Occasion,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<String, DispatchError> {
        let days = CountdownContext::new(now, self.zone, self.target_date).days_remaining();
        let quote = countdown::pick(self.catalog.for_occasion(occasion), days, rng)
            .map_err(|source| DispatchError::Catalog { occasion, source })?;
        Ok(countdown::render(days, &quote))
    }
}

/// Sends the countdown message for an occasion through the chat gateway.
pub struct NotificationService {
    gateway: Arc<dyn ChatGateway>,
    settings: DispatchSettings,
    rng: Mutex<StdRng>,
}

impl NotificationService {
    pub fn new(gateway: Arc<dyn ChatGateway>, settings: DispatchSettings) -> Self {
        Self::with_rng(gateway, settings, StdRng::from_entropy())
    }

    /// Use a caller-provided random source for the quote shuffle.
    pub fn with_rng(gateway: Arc<dyn ChatGateway>, settings: DispatchSettings, rng: StdRng) -> Self {
        Self {
            gateway,
            settings,
            rng: Mutex::new(rng),
        }
    }

    /// Render the message for `occasion` as of `now`, without touching the gateway.
    pub fn compose(&self, occasion: Occasion, now: DateTime<Utc>) -> Result<String, DispatchError> {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.settings.compose(occasion, now, &mut *rng)
    }

    /// Send the message for `occasion` using the current time.
    pub async fn dispatch(&self, occasion: Occasion) -> Result<(), DispatchError> {
        self.dispatch_at(occasion, Utc::now()).await
    }

    /// Send the message for `occasion` as of `now`.
    pub async fn dispatch_at(
        &self,
        occasion: Occasion,
        now: DateTime<Utc>,
    ) -> Result<(), DispatchError> {
        let link = self
            .settings
            .invite_links
            .get(&occasion)
            .ok_or(DispatchError::NoInviteLink(occasion))?;

        let group = self
            .gateway
            .resolve_group_by_invite_link(link)
            .await
            .map_err(|e| {
                error!(%occasion, error = %e, "group lookup failed");
                DispatchError::GroupResolutionFailed(e)
            })?;

        let text = self.compose(occasion, now).inspect_err(|e| {
            error!(%occasion, error = %e, "message composition failed");
        })?;

        let msg = OutboundMessage { group, text };
        self.gateway.send_text(&msg).await.map_err(|e| {
            error!(%occasion, error = %e, "send failed");
            DispatchError::SendFailed(e)
        })?;

        info!(%occasion, group = %msg.group, gateway = self.gateway.name(), "countdown sent");
        Ok(())
    }
}
