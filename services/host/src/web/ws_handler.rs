//! services/host/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a WebSocket connection.
//! Each connection owns exactly one `ReflectionSession`, which is torn down when
//! the socket closes.

use crate::web::{
    protocol::{ClientMessage, ServerMessage},
    state::AppState,
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use reflection_core::ReflectionSession;
use std::sync::Arc;
use tokio::{sync::Mutex, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

type WsSender = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(ws: WebSocketUpgrade, State(app_state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    info!("New WebSocket connection established.");

    // The sender is shared between the message loop and the background tasks.
    let (sender, mut receiver) = socket.split();
    let ws_sender: WsSender = Arc::new(Mutex::new(sender));

    // --- 1. Initialization Phase ---
    let (user_id, video_id) = match receiver.next().await {
        Some(Ok(Message::Text(init_json))) => match serde_json::from_str::<ClientMessage>(&init_json) {
            Ok(ClientMessage::Init { user_id, video_id }) => (user_id, video_id),
            _ => {
                error!("First message was not a valid Init message.");
                let message = "The first message must be an init message.".to_string();
                send_message(&ws_sender, &ServerMessage::Error { message }).await;
                return;
            }
        },
        _ => {
            error!("Client disconnected before sending Init message.");
            return;
        }
    };

    let session = match ReflectionSession::open(
        app_state.gateway.clone(),
        user_id,
        video_id,
        app_state.config.session_config(),
    )
    .await
    {
        Ok(session) => Arc::new(session),
        Err(e) => {
            error!(user_id, video_id, "Failed to open reflection session: {}", e);
            let message = format!("Failed to load progress for this video: {e}");
            send_message(&ws_sender, &ServerMessage::Error { message }).await;
            return;
        }
    };

    let initialized = ServerMessage::SessionInitialized { session_id: session.id() };
    if !send_message(&ws_sender, &initialized).await || !send_snapshot(&ws_sender, &session).await {
        error!("Failed to send session initialized message.");
        session.close();
        return;
    }

    // --- 2. Background Tasks ---
    let shutdown = CancellationToken::new();
    let forwarder = spawn_snapshot_forwarder(session.clone(), ws_sender.clone(), shutdown.clone());
    let mut submit_task: Option<JoinHandle<()>> = None;

    // --- 3. Main Message Loop ---
    while let Some(Ok(msg)) = receiver.next().await {
        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        let client_message = match serde_json::from_str::<ClientMessage>(&text) {
            Ok(message) => message,
            Err(e) => {
                warn!("Failed to parse client message: {}", e);
                let message = format!("Unrecognized message: {e}");
                send_message(&ws_sender, &ServerMessage::Error { message }).await;
                continue;
            }
        };

        match client_message {
            ClientMessage::Init { .. } => {
                let message = "This connection already has a session.".to_string();
                send_message(&ws_sender, &ServerMessage::Error { message }).await;
            }
            ClientMessage::PlaybackTick { position, duration } => {
                session.update_position(position, duration).await;
            }
            ClientMessage::PlaybackStarted => {
                session.playback_started().await;
            }
            ClientMessage::PlaybackPaused => {
                session.playback_paused().await;
            }
            ClientMessage::PlaybackEnded => {
                session.playback_ended().await;
            }
            ClientMessage::DraftChanged { text } => {
                session.on_draft_change(text).await;
                send_snapshot(&ws_sender, &session).await;
            }
            ClientMessage::Submit => {
                // Runs off the loop so a second submit observes the one in flight.
                let handle = spawn_submission(session.clone(), ws_sender.clone());
                if let Some(previous) = submit_task.replace(handle) {
                    if !previous.is_finished() {
                        debug!("A previous submission is still running.");
                    }
                }
            }
        }
    }

    // --- 4. Cleanup ---
    info!(session = %session.id(), "Client disconnected. Cleaning up session.");
    session.close();
    shutdown.cancel();
    if let Err(e) = forwarder.await {
        warn!("Snapshot forwarder ended abnormally: {}", e);
    }
    if let Some(task) = submit_task {
        task.abort();
    }
}

/// Pushes a fresh snapshot every time background work changes the session.
fn spawn_snapshot_forwarder(
    session: Arc<ReflectionSession>,
    ws_sender: WsSender,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut changes = session.subscribe();
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                changed = changes.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    if !send_snapshot(&ws_sender, &session).await {
                        break;
                    }
                }
            }
        }
    })
}

fn spawn_submission(session: Arc<ReflectionSession>, ws_sender: WsSender) -> JoinHandle<()> {
    tokio::spawn(async move {
        let message = match session.submit().await {
            Ok(outcome) => match outcome.server_assigned_id {
                Some(reflection_id) => ServerMessage::SubmissionConfirmed { reflection_id },
                None => return,
            },
            Err(e) => {
                info!(session = %session.id(), kind = e.kind(), "Submission not accepted: {}", e);
                ServerMessage::from(&e)
            }
        };
        send_message(&ws_sender, &message).await;
    })
}

async fn send_snapshot(ws_sender: &WsSender, session: &ReflectionSession) -> bool {
    let snapshot = session.snapshot().await;
    send_message(ws_sender, &ServerMessage::Snapshot(snapshot.into())).await
}

/// Serializes and sends one message. Returns false once the client is gone.
async fn send_message(ws_sender: &WsSender, message: &ServerMessage) -> bool {
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize server message: {}", e);
            return false;
        }
    };
    ws_sender.lock().await.send(Message::Text(json.into())).await.is_ok()
}
