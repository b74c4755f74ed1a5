//! Deepgram live streaming recognition client

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::recognition::{Recognizer, RecognizerEvent, RecognizerStream, TranscriptEvent};
use crate::{Error, Result};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const EVENT_BUFFER: usize = 32;

/// Response frame from the Deepgram live API
#[derive(serde::Deserialize)]
struct LiveResponse {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    is_final: bool,
    #[serde(default)]
    channel: Option<LiveChannel>,
}

#[derive(serde::Deserialize)]
struct LiveChannel {
    alternatives: Vec<LiveAlternative>,
}

#[derive(serde::Deserialize)]
struct LiveAlternative {
    transcript: String,
}

/// Opens live transcription streams against the Deepgram streaming API
pub struct DeepgramRecognizer {
    api_key: String,
    model: String,
}

impl DeepgramRecognizer {
    /// Create a new live recognizer
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new(api_key: String, model: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("Deepgram API key required".to_string()));
        }

        Ok(Self { api_key, model })
    }

    fn listen_url(&self) -> String {
        format!(
            "wss://api.deepgram.com/v1/listen?model={}&encoding=linear16&sample_rate=16000&channels=1&language=en-US&punctuate=true&interim_results=true",
            self.model
        )
    }
}

#[async_trait]
impl Recognizer for DeepgramRecognizer {
    async fn open(
        &self,
    ) -> Result<(Box<dyn RecognizerStream>, mpsc::Receiver<RecognizerEvent>)> {
        let mut request = self
            .listen_url()
            .into_client_request()
            .map_err(|e| Error::Recognition(e.to_string()))?;
        request.headers_mut().insert(
            "Authorization",
            HeaderValue::from_str(&format!("Token {}", self.api_key))
                .map_err(|e| Error::Recognition(e.to_string()))?,
        );

        let (socket, _) = tokio::time::timeout(CONNECT_TIMEOUT, connect_async(request))
            .await
            .map_err(|_| Error::Recognition("recognizer connect timed out".to_string()))?
            .map_err(|e| {
                tracing::error!(error = %e, "recognizer connect failed");
                Error::Recognition(e.to_string())
            })?;

        tracing::debug!(model = %self.model, "recognizer stream open");

        let (sink, mut read) = socket.split();
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);

        let reader = tokio::spawn(async move {
            while let Some(frame) = read.next().await {
                match frame {
                    Ok(Message::Text(text)) => match serde_json::from_str::<LiveResponse>(&text) {
                        Ok(msg) if msg.kind == "Results" => {
                            let transcript = msg
                                .channel
                                .and_then(|c| c.alternatives.into_iter().next())
                                .map(|a| a.transcript)
                                .unwrap_or_default();
                            let event = RecognizerEvent::Transcript(TranscriptEvent {
                                transcript,
                                is_final: msg.is_final,
                            });
                            if tx.send(event).await.is_err() {
                                break;
                            }
                        }
                        Ok(_) => {}
                        Err(e) => {
                            tracing::debug!(error = %e, "unrecognized recognizer payload");
                        }
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        let _ = tx.send(RecognizerEvent::Error(e.to_string())).await;
                        break;
                    }
                }
            }
        });

        Ok((Box::new(DeepgramStream { sink, reader }), rx))
    }
}

/// Write side of one open Deepgram stream
struct DeepgramStream {
    sink: SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>,
    reader: JoinHandle<()>,
}

#[async_trait]
impl RecognizerStream for DeepgramStream {
    async fn send_audio(&mut self, pcm: Vec<u8>) -> Result<()> {
        self.sink
            .send(Message::Binary(pcm))
            .await
            .map_err(|e| Error::Recognition(e.to_string()))
    }

    async fn finish(&mut self) -> Result<()> {
        // Deepgram flushes pending results after this control frame and
        // closes the stream from its side.
        self.sink
            .send(Message::Text(r#"{"type":"CloseStream"}"#.to_string()))
            .await
            .map_err(|e| Error::Recognition(e.to_string()))
    }

    fn abort(&mut self) {
        self.reader.abort();
    }
}

impl Drop for DeepgramStream {
    fn drop(&mut self) {
        self.reader.abort();
    }
}
