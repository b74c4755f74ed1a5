//! Duplex streaming endpoint tests over a live WebSocket
//!
//! The server runs on an ephemeral port with a scripted recognition
//! backend, so these cover the socket framing and the finalize grace
//! timing without any upstream network.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use colloquy_gateway::Result;
use colloquy_gateway::api::ApiServerBuilder;
use colloquy_gateway::recognition::{
    FINALIZE_GRACE, Recognizer, RecognizerEvent, RecognizerStream, TranscriptEvent,
};

/// Backend double: records forwarded PCM and optionally commits one
/// segment when the write side closes. The event channel stays open
/// afterwards, so the final transcript can only come from the grace
/// timer elapsing.
struct ScriptedBackend {
    segment_on_finish: Option<String>,
    forwarded: Arc<Mutex<Vec<Vec<u8>>>>,
}

struct ScriptedStream {
    events: mpsc::Sender<RecognizerEvent>,
    segment_on_finish: Option<String>,
    forwarded: Arc<Mutex<Vec<Vec<u8>>>>,
}

#[async_trait]
impl Recognizer for ScriptedBackend {
    async fn open(&self) -> Result<(Box<dyn RecognizerStream>, mpsc::Receiver<RecognizerEvent>)> {
        let (events, rx) = mpsc::channel(16);
        Ok((
            Box::new(ScriptedStream {
                events,
                segment_on_finish: self.segment_on_finish.clone(),
                forwarded: Arc::clone(&self.forwarded),
            }),
            rx,
        ))
    }
}

#[async_trait]
impl RecognizerStream for ScriptedStream {
    async fn send_audio(&mut self, pcm: Vec<u8>) -> Result<()> {
        self.forwarded.lock().unwrap().push(pcm);
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        if let Some(text) = self.segment_on_finish.take() {
            let _ = self
                .events
                .send(RecognizerEvent::Transcript(TranscriptEvent {
                    transcript: text,
                    is_final: true,
                }))
                .await;
        }
        Ok(())
    }

    fn abort(&mut self) {}
}

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Serve the router on an ephemeral port and connect a client socket
async fn connect(backend: ScriptedBackend) -> WsClient {
    let dir = tempfile::tempdir().unwrap();
    let router = ApiServerBuilder::new(0, dir.path().to_path_buf(), "Test topic".to_string())
        .recognizer(Arc::new(backend))
        .build()
        .router();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _dir = dir;
        axum::serve(listener, router).await.unwrap();
    });

    let (ws, _) = connect_async(format!("ws://{addr}/ws/audio")).await.unwrap();
    ws
}

async fn send_control(ws: &mut WsClient, kind: &str) {
    ws.send(Message::Text(format!(r#"{{"type":"{kind}"}}"#)))
        .await
        .unwrap();
}

/// Collect server messages until a `final` arrives; panics past the deadline
async fn collect_until_final(ws: &mut WsClient, deadline: Duration) -> Vec<serde_json::Value> {
    let mut messages = Vec::new();
    let drained = tokio::time::timeout(deadline, async {
        while let Some(frame) = ws.next().await {
            let Message::Text(text) = frame.unwrap() else {
                continue;
            };
            let message: serde_json::Value = serde_json::from_str(&text).unwrap();
            let is_final = message["type"] == "final";
            messages.push(message);
            if is_final {
                break;
            }
        }
    })
    .await;
    assert!(drained.is_ok(), "no final transcript within {deadline:?}");
    messages
}

#[tokio::test]
async fn silent_utterance_finalizes_within_the_grace_window() {
    let forwarded = Arc::new(Mutex::new(Vec::new()));
    let mut ws = connect(ScriptedBackend {
        segment_on_finish: None,
        forwarded: Arc::clone(&forwarded),
    })
    .await;

    send_control(&mut ws, "start").await;
    for _ in 0..5 {
        ws.send(Message::Binary(vec![0u8; 320])).await.unwrap();
    }
    let stopped_at = Instant::now();
    send_control(&mut ws, "stop").await;

    let tolerance = Duration::from_secs(1);
    let messages = collect_until_final(&mut ws, FINALIZE_GRACE + tolerance).await;
    let elapsed = stopped_at.elapsed();

    let finals: Vec<_> = messages.iter().filter(|m| m["type"] == "final").collect();
    assert_eq!(finals.len(), 1);
    assert_eq!(finals[0]["transcript"], "");
    assert!(
        elapsed >= FINALIZE_GRACE,
        "final arrived before the grace window elapsed: {elapsed:?}"
    );
    assert!(elapsed <= FINALIZE_GRACE + tolerance, "final too late: {elapsed:?}");

    // All five frames reached the backend, in arrival order
    assert_eq!(forwarded.lock().unwrap().len(), 5);
}

#[tokio::test]
async fn committed_segment_survives_to_the_single_final() {
    let mut ws = connect(ScriptedBackend {
        segment_on_finish: Some("all done".to_string()),
        forwarded: Arc::new(Mutex::new(Vec::new())),
    })
    .await;

    send_control(&mut ws, "start").await;
    ws.send(Message::Binary(vec![1u8; 640])).await.unwrap();
    send_control(&mut ws, "stop").await;

    let messages = collect_until_final(&mut ws, FINALIZE_GRACE + Duration::from_secs(1)).await;

    // The trailing segment relays as a partial before the final commits it
    assert!(
        messages
            .iter()
            .any(|m| m["type"] == "partial" && m["transcript"] == "all done")
    );
    let finals: Vec<_> = messages.iter().filter(|m| m["type"] == "final").collect();
    assert_eq!(finals.len(), 1);
    assert_eq!(finals[0]["transcript"], "all done");
}

#[tokio::test]
async fn double_stop_and_late_audio_produce_no_second_final() {
    let forwarded = Arc::new(Mutex::new(Vec::new()));
    let mut ws = connect(ScriptedBackend {
        segment_on_finish: None,
        forwarded: Arc::clone(&forwarded),
    })
    .await;

    send_control(&mut ws, "start").await;
    ws.send(Message::Binary(vec![0u8; 320])).await.unwrap();
    send_control(&mut ws, "stop").await;
    send_control(&mut ws, "stop").await;
    ws.send(Message::Binary(vec![0u8; 320])).await.unwrap();

    let messages = collect_until_final(&mut ws, FINALIZE_GRACE + Duration::from_secs(1)).await;

    assert_eq!(messages.iter().filter(|m| m["type"] == "final").count(), 1);
    assert!(!messages.iter().any(|m| m["type"] == "error"));
    // Post-stop audio never reaches the backend
    assert_eq!(forwarded.lock().unwrap().len(), 1);

    let extra = tokio::time::timeout(Duration::from_millis(300), ws.next()).await;
    assert!(extra.is_err(), "unexpected message after the final: {extra:?}");
}

#[tokio::test]
async fn stop_without_start_is_an_error_and_the_connection_survives() {
    let mut ws = connect(ScriptedBackend {
        segment_on_finish: None,
        forwarded: Arc::new(Mutex::new(Vec::new())),
    })
    .await;

    send_control(&mut ws, "stop").await;

    let frame = tokio::time::timeout(Duration::from_secs(1), ws.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let Message::Text(text) = frame else {
        panic!("expected a text frame, got {frame:?}");
    };
    let message: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(message["type"], "error");

    // The same connection still carries a full utterance afterwards
    send_control(&mut ws, "start").await;
    send_control(&mut ws, "stop").await;
    let messages = collect_until_final(&mut ws, FINALIZE_GRACE + Duration::from_secs(1)).await;
    assert_eq!(messages.iter().filter(|m| m["type"] == "final").count(), 1);
}
