//! Client end of the duplex audio streaming channel
//!
//! One channel per utterance: connect, `start`, binary PCM frames, `stop`,
//! then wait for the single `final` transcript. Inbound messages arrive on
//! an ordered event stream; waiting for the final is a bounded predicate
//! loop over that stream.

use std::time::Duration;

use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::protocol::{ClientMessage, ServerMessage};
use crate::{Error, Result};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const FINAL_TIMEOUT: Duration = Duration::from_secs(2);
const EVENT_BUFFER: usize = 32;

/// Client side of one utterance's duplex audio stream
pub struct AudioChannel {
    sink: SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>,
    events: mpsc::Receiver<ServerMessage>,
    reader: JoinHandle<()>,
}

impl AudioChannel {
    /// Connect to the server's stream endpoint, bounded at 5 seconds
    ///
    /// # Errors
    ///
    /// Returns error if the URL is invalid or the connection cannot be
    /// established in time
    pub async fn connect(url: &str) -> Result<Self> {
        let parsed =
            url::Url::parse(url).map_err(|e| Error::Channel(format!("invalid channel url: {e}")))?;
        if !matches!(parsed.scheme(), "ws" | "wss") {
            return Err(Error::Channel(format!(
                "unsupported channel scheme: {}",
                parsed.scheme()
            )));
        }

        let (socket, _) = tokio::time::timeout(CONNECT_TIMEOUT, connect_async(url))
            .await
            .map_err(|_| Error::Channel("channel connect timed out".to_string()))?
            .map_err(|e| {
                tracing::error!(error = %e, "channel connect failed");
                Error::Channel(e.to_string())
            })?;

        tracing::debug!(url, "audio channel connected");

        let (sink, mut read) = socket.split();
        let (tx, events) = mpsc::channel(EVENT_BUFFER);

        let reader = tokio::spawn(async move {
            while let Some(frame) = read.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        match serde_json::from_str::<ServerMessage>(&text) {
                            Ok(msg) => {
                                if tx.send(msg).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                tracing::debug!(error = %e, "unrecognized channel payload");
                            }
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        let _ = tx
                            .send(ServerMessage::Error {
                                message: e.to_string(),
                            })
                            .await;
                        break;
                    }
                }
            }
        });

        Ok(Self {
            sink,
            events,
            reader,
        })
    }

    /// Begin a recognition stream for this utterance
    ///
    /// # Errors
    ///
    /// Returns error if the control message cannot be sent
    pub async fn send_start(&mut self) -> Result<()> {
        self.send_control(ClientMessage::Start).await
    }

    /// Send one frame of 16 kHz little-endian PCM
    ///
    /// # Errors
    ///
    /// Returns error if the channel rejects the write
    pub async fn send_audio(&mut self, pcm: Vec<u8>) -> Result<()> {
        self.sink
            .send(Message::Binary(pcm))
            .await
            .map_err(|e| Error::Channel(e.to_string()))
    }

    /// Next server message, in arrival order
    pub async fn next_event(&mut self) -> Option<ServerMessage> {
        self.events.recv().await
    }

    /// Send `stop` and wait for the final transcript, bounded at 2 seconds.
    ///
    /// Partials still in flight after the stop are drained; an error
    /// message or channel close ends the wait early.
    ///
    /// # Errors
    ///
    /// Returns error if the stop cannot be sent, the server reports an
    /// error, or no final arrives in time
    pub async fn stop_and_wait_final(&mut self) -> Result<String> {
        self.send_control(ClientMessage::Stop).await?;

        let deadline = tokio::time::Instant::now() + FINAL_TIMEOUT;
        loop {
            let event = tokio::time::timeout_at(deadline, self.events.recv())
                .await
                .map_err(|_| {
                    Error::Channel("timed out waiting for final transcript".to_string())
                })?;

            match event {
                Some(ServerMessage::Final { transcript }) => return Ok(transcript),
                Some(ServerMessage::Partial { .. }) => {}
                Some(ServerMessage::Error { message }) => return Err(Error::Channel(message)),
                None => {
                    return Err(Error::Channel(
                        "channel closed before final transcript".to_string(),
                    ));
                }
            }
        }
    }

    /// Close the channel, releasing the server-side session
    pub async fn close(mut self) {
        let _ = self.sink.send(Message::Close(None)).await;
        self.reader.abort();
    }

    async fn send_control(&mut self, msg: ClientMessage) -> Result<()> {
        let json = serde_json::to_string(&msg)?;
        self.sink
            .send(Message::Text(json))
            .await
            .map_err(|e| Error::Channel(e.to_string()))
    }
}

impl Drop for AudioChannel {
    fn drop(&mut self) {
        self.reader.abort();
    }
}
