use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use futures::FutureExt;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::command;
use crate::dispatch::Dispatcher;
use crate::platform::InboundMessage;
use crate::services::Messenger;

/// Shared, read-only state for every webhook call
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub messenger: Arc<dyn Messenger>,
}

/// Acknowledgment returned to the webhook caller
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Ack {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Ack {
    fn ok() -> Self {
        Self {
            status: "ok",
            error: None,
        }
    }

    fn error(message: String) -> Self {
        Self {
            status: "error",
            error: Some(message),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/webhook", post(handle_webhook))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> Json<Ack> {
    Json(Ack::ok())
}

async fn handle_webhook(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> (StatusCode, Json<Ack>) {
    let outcome = AssertUnwindSafe(process(&state, &body))
        .catch_unwind()
        .await;

    match outcome {
        Ok(Ok(())) => (StatusCode::OK, Json(Ack::ok())),
        Ok(Err(e)) => {
            error!("Webhook error: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(Ack::error(format!("{:#}", e))),
            )
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            error!("Webhook panicked: {}", message);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(Ack::error(message)))
        }
    }
}

/// Parse, classify, dispatch and reply. Only extraction errors propagate;
/// external failures arrive as reply text and delivery failures are logged.
async fn process(state: &AppState, body: &[u8]) -> Result<()> {
    let inbound = InboundMessage::from_payload(body)?;
    let text = inbound.normalized_text();

    info!("Message from chat {:?}: {}", inbound.chat_id, text);

    let intent = command::classify(&text);
    debug!("Classified as {:?}", intent);

    let result = state.dispatcher.dispatch(intent).await;
    debug!("Operation finished (success: {})", result.is_success());
    let reply = result.into_reply();

    if let Err(e) = state.messenger.send(inbound.chat_id, &reply).await {
        error!("Error sending reply to chat {:?}: {:#}", inbound.chat_id, e);
    }

    Ok(())
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "internal error".to_string()
    }
}
