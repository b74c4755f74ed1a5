//! Duplex audio streaming endpoint
//!
//! One WebSocket per client utterance carries JSON control frames and raw
//! PCM interleaved on the same connection. A single coordinating task per
//! connection owns the socket, the recognition session, and the finalize
//! grace timer, so frames reach the upstream recognizer in arrival order.

use std::pin::Pin;
use std::sync::Arc;

use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
    routing::get,
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::Sleep;
use uuid::Uuid;

use super::ApiState;
use crate::protocol::{ClientMessage, InboundFrame, ServerMessage};
use crate::recognition::{FINALIZE_GRACE, RecognitionSession, RecognizerEvent, StopOutcome};

/// Build the streaming router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/audio", get(ws_upgrade))
        .with_state(state)
}

/// Handle WebSocket upgrade request
async fn ws_upgrade(State(state): State<Arc<ApiState>>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

type WsSink = SplitSink<WebSocket, Message>;

async fn send(sink: &mut WsSink, msg: &ServerMessage) -> bool {
    match serde_json::to_string(msg) {
        Ok(text) => sink.send(Message::Text(text.into())).await.is_ok(),
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize server message");
            false
        }
    }
}

/// Per-connection coordinating task
#[allow(clippy::too_many_lines)]
async fn handle_socket(socket: WebSocket, state: Arc<ApiState>) {
    let connection_id = Uuid::new_v4();
    tracing::info!(%connection_id, "audio stream connected");

    let (mut sink, mut inbound) = socket.split();

    let Some(recognizer) = state.recognizer.clone() else {
        let msg = ServerMessage::Error {
            message: "streaming recognition not configured".to_string(),
        };
        let _ = send(&mut sink, &msg).await;
        let _ = sink.send(Message::Close(None)).await;
        return;
    };

    let mut session = RecognitionSession::new(recognizer);
    let mut upstream: Option<mpsc::Receiver<RecognizerEvent>> = None;
    let mut grace: Option<Pin<Box<Sleep>>> = None;

    loop {
        tokio::select! {
            frame = inbound.next() => {
                let Some(Ok(frame)) = frame else {
                    tracing::debug!(%connection_id, "socket closed");
                    break;
                };

                let payload = match frame {
                    Message::Text(text) => text.as_bytes().to_vec(),
                    Message::Binary(data) => data.to_vec(),
                    Message::Close(_) => break,
                    // Ping/pong handled by axum
                    _ => continue,
                };

                match InboundFrame::parse(&payload) {
                    InboundFrame::Control(ClientMessage::Start) => {
                        // Deterministic reset on double start
                        grace = None;
                        match session.start().await {
                            Ok(events) => upstream = Some(events),
                            Err(e) => {
                                upstream = None;
                                let msg = ServerMessage::Error { message: e.to_string() };
                                if !send(&mut sink, &msg).await {
                                    break;
                                }
                            }
                        }
                    }
                    InboundFrame::Control(ClientMessage::Stop) => {
                        match session.stop().await {
                            StopOutcome::Finalizing => {
                                grace = Some(Box::pin(tokio::time::sleep(FINALIZE_GRACE)));
                            }
                            StopOutcome::NotStreaming => {
                                let msg = ServerMessage::Error {
                                    message: "stop received with no active stream".to_string(),
                                };
                                if !send(&mut sink, &msg).await {
                                    break;
                                }
                            }
                            StopOutcome::AlreadyStopping => {}
                        }
                    }
                    InboundFrame::Audio(pcm) => {
                        if let Err(e) = session.push_audio(pcm).await {
                            tracing::error!(%connection_id, error = %e, "audio forward failed");
                            session.abort();
                            upstream = None;
                            grace = None;
                            let msg = ServerMessage::Error { message: e.to_string() };
                            if !send(&mut sink, &msg).await {
                                break;
                            }
                        }
                    }
                    InboundFrame::Unrecognized => {
                        tracing::debug!(%connection_id, "ignoring unrecognized control frame");
                    }
                }
            }

            event = next_upstream_event(&mut upstream) => {
                match event {
                    Some(event) => {
                        if let Some(msg) = session.on_event(event) {
                            let errored = matches!(msg, ServerMessage::Error { .. });
                            if !send(&mut sink, &msg).await {
                                break;
                            }
                            if errored {
                                upstream = None;
                                grace = None;
                            }
                        }
                    }
                    None => {
                        upstream = None;
                        grace = None;
                        if let Some(msg) = session.upstream_closed() {
                            if !send(&mut sink, &msg).await {
                                break;
                            }
                        }
                    }
                }
            }

            () = grace_elapsed(&mut grace) => {
                grace = None;
                upstream = None;
                if let Some(msg) = session.finalize() {
                    if !send(&mut sink, &msg).await {
                        break;
                    }
                }
            }
        }
    }

    session.abort();
    tracing::info!(%connection_id, "audio stream disconnected");
}

/// Next upstream recognizer event; pends forever while no stream is open
async fn next_upstream_event(
    upstream: &mut Option<mpsc::Receiver<RecognizerEvent>>,
) -> Option<RecognizerEvent> {
    match upstream {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Completion of the finalize grace window; pends forever while unarmed
async fn grace_elapsed(grace: &mut Option<Pin<Box<Sleep>>>) {
    match grace {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}
