//! WebSocket feed of job status events.
//!
//! Each connection subscribes to the process-wide [`cohort_events::EventBus`]
//! and forwards events for one study. There is no connection registry:
//! the broadcast channel fans out to every subscriber and a connection
//! that falls behind simply skips the events it lagged past.
//!
//! Browsers cannot set an `Authorization` header on a WebSocket request,
//! so the access token travels as a `token` query parameter and is
//! validated before the upgrade.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use cohort_core::types::DbId;
use cohort_events::JobStatusEvent;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::access::ensure_study_member;
use crate::auth::jwt::validate_token;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Query parameters for `GET /ws/jobs`.
#[derive(Debug, Deserialize)]
pub struct JobFeedParams {
    pub study_id: DbId,
    pub token: String,
}

/// GET /api/v1/ws/jobs?study_id=&token=
///
/// Authenticate, check study access, then upgrade and stream job status
/// events for that study until either side disconnects.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<JobFeedParams>,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let claims = validate_token(&params.token, &state.config.jwt).map_err(|_| {
        AppError::Core(cohort_core::error::CoreError::Unauthorized(
            "Invalid or expired token".into(),
        ))
    })?;
    let auth = AuthUser { user_id: claims.sub, role: claims.role };

    ensure_study_member(&state.pool, &auth, params.study_id).await?;

    let rx = state.event_bus.subscribe();
    let study_id = params.study_id;
    let user_id = auth.user_id;

    Ok(ws.on_upgrade(move |socket| stream_job_events(socket, rx, study_id, user_id)))
}

/// Forward matching events to the client until disconnect.
///
/// Splits the socket so inbound frames (close, pings) are handled on the
/// same task via `select!`; the only inbound message that matters is
/// Close.
async fn stream_job_events(
    socket: WebSocket,
    mut rx: broadcast::Receiver<JobStatusEvent>,
    study_id: DbId,
    user_id: DbId,
) {
    tracing::info!(study_id, user_id, "Job feed connected");

    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Ok(event) if event.study_id == study_id => {
                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to serialize job event");
                            continue;
                        }
                    };
                    if sink.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                // Event for another study; skip.
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(study_id, user_id, skipped, "Job feed lagged");
                }
                Err(RecvError::Closed) => break,
            },
            msg = stream.next() => match msg {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(study_id, user_id, error = %e, "Job feed receive error");
                    break;
                }
            },
        }
    }

    tracing::info!(study_id, user_id, "Job feed disconnected");
}
