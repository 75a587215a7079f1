//! HTTP trigger: one `GET` route per occasion that runs a dispatch.

use crate::daemon::config::OccasionsConfig;
use crate::notify::NotificationService;
use crate::occasion::Occasion;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub type SharedService = Arc<NotificationService>;

/// JSON body of every trigger response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerResponse {
    #[serde(rename = "Message")]
    pub message: String,
}

/// Build the trigger router for the configured occasion paths.
pub fn router(service: SharedService, occasions: &OccasionsConfig) -> Router {
    let mut app: Router<SharedService> = Router::new();
    for occasion in Occasion::ALL {
        let path = occasions.get(occasion).path.as_str();
        app = app.route(
            path,
            get(move |State(svc): State<SharedService>| trigger(svc, occasion)),
        );
    }
    app.layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

async fn trigger(svc: SharedService, occasion: Occasion) -> (StatusCode, Json<TriggerResponse>) {
    match svc.dispatch(occasion).await {
        Ok(()) => (
            StatusCode::OK,
            Json(TriggerResponse {
                message: "Success".into(),
            }),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(TriggerResponse {
                message: e.public_message().into(),
            }),
        ),
    }
}

/// Serve `app` on `listener` until `cancel` fires, then drain in-flight requests.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    cancel: CancellationToken,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "HTTP trigger listening");
    }
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
}
