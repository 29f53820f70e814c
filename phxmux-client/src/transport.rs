//! WebSocket transport of the connection.
//!
//! The transport runs in two tasks. The reader task forwards every transport
//! event to the processor as a `ConnectionEvent`, the writer task drains the
//! outgoing queue of the connection. Dropping the outgoing queue makes the
//! writer send a close frame, that is how a graceful close starts.
//!
//!   Processor                 Open task              Reader / Writer
//!       |   open(generation)      |                         |
//!       |------------------------>|  handshake              |
//!       |   Opened(outgoing)      |                         |
//!       |<------------------------|  spawn                  |
//!       |                         |------------------------>|
//!       |   Message / Error / Closed                        |
//!       |<--------------------------------------------------|
//!
//! Every event carries the generation of the transport which produced it, so
//! events of an abandoned transport can be told apart.

use crate::model::{ABNORMAL_CLOSURE, NO_STATUS_RECEIVED};
use anyhow::{anyhow, Context, Result};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use log::{debug, error, info, trace, warn};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

type WsStream = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Identifies one transport of a connection. Every `open` gets a new one.
pub(crate) type Generation = u64;

/// Queue of the outgoing texts, the write half of the transport.
pub(crate) type OutgoingSink = mpsc::UnboundedSender<String>;

pub(crate) type EventSink = mpsc::UnboundedSender<ConnectionEvent>;

/// Events reported by the transport, in the order the transport reports them.
#[derive(Debug)]
pub(crate) enum ConnectionEvent {
    /// The handshake succeeded, texts can be sent via `outgoing`.
    Opened {
        generation: Generation,
        outgoing: OutgoingSink,
    },
    /// The handshake failed.
    Failed { generation: Generation, reason: String },
    Message { generation: Generation, text: String },
    Error { generation: Generation, detail: String },
    Closed {
        generation: Generation,
        code: u16,
        reason: String,
    },
}

/// Builds the endpoint URL with the connection parameters embedded as query
/// parameters. The values are opaque, they are only URL encoded.
pub(crate) fn endpoint_url(url: &str, params: &[(String, String)]) -> Result<Url> {
    let mut endpoint = Url::parse(url).with_context(|| format!("invalid WebSocket URL: {}", url))?;

    match endpoint.scheme() {
        "ws" | "wss" => (),
        scheme => return Err(anyhow!("unsupported URL scheme {} in {}", scheme, url)),
    }

    if !params.is_empty() {
        let mut query = endpoint.query_pairs_mut();

        for (name, value) in params {
            query.append_pair(name, value);
        }
    }

    Ok(endpoint)
}

/// URL without the query, parameters may carry secrets.
fn redacted(url: &Url) -> String {
    let mut u = url.clone();
    u.set_query(None);

    u.to_string()
}

/// Starts the handshake in a new task. The outcome arrives as an `Opened` or a
/// `Failed` event.
pub(crate) fn open(generation: Generation, url: Url, events: EventSink) {
    tokio::spawn(async move {
        info!("Connecting to {} (generation {})", redacted(&url), generation);

        match tokio_tungstenite::connect_async(url.as_str()).await {
            Ok((stream, _response)) => {
                let (sink, stream) = stream.split();
                let (out_tx, out_rx) = mpsc::unbounded_channel();

                // Opened goes out before the reader starts, so no message can overtake it.
                if events
                    .send(ConnectionEvent::Opened {
                        generation,
                        outgoing: out_tx,
                    })
                    .is_err()
                {
                    return;
                }

                tokio::spawn(write_loop(generation, sink, out_rx, events.clone()));

                read_loop(generation, stream, events).await;
            }
            Err(e) => {
                error!("WebSocket connect failed {:?}", e);

                let _ = events.send(ConnectionEvent::Failed {
                    generation,
                    reason: e.to_string(),
                });
            }
        }
    });
}

async fn write_loop(
    generation: Generation,
    mut sink: SplitSink<WsStream, Message>,
    mut outgoing: mpsc::UnboundedReceiver<String>,
    events: EventSink,
) {
    while let Some(text) = outgoing.recv().await {
        trace!("Outgoing text {}", text);

        if let Err(e) = sink.send(Message::Text(text)).await {
            error!("Error {:?}", e);

            let _ = events.send(ConnectionEvent::Error {
                generation,
                detail: e.to_string(),
            });

            return;
        }
    }

    debug!("Outgoing queue is closed, sending close frame");

    if let Err(e) = sink.send(Message::Close(None)).await {
        debug!("Cannot send close frame {:?}", e);
    }
}

async fn read_loop(generation: Generation, mut stream: SplitStream<WsStream>, events: EventSink) {
    let mut close: Option<(u16, String)> = None;

    loop {
        let event = match stream.next().await {
            Some(Ok(Message::Text(text))) => ConnectionEvent::Message { generation, text },
            Some(Ok(Message::Binary(data))) => match String::from_utf8(data) {
                Ok(text) => ConnectionEvent::Message { generation, text },
                Err(_) => ConnectionEvent::Error {
                    generation,
                    detail: "binary frame is not UTF-8 text".to_string(),
                },
            },
            Some(Ok(Message::Close(frame))) => {
                let (code, reason) = frame
                    .map(|cf| (cf.code.into(), cf.reason.to_string()))
                    .unwrap_or((NO_STATUS_RECEIVED, String::new()));

                debug!("Close frame {} {:?}", code, reason);

                // Keep reading until the closing handshake finishes.
                close = Some((code, reason));
                continue;
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                warn!("WebSocket read error {:?}", e);

                let _ = events.send(ConnectionEvent::Error {
                    generation,
                    detail: e.to_string(),
                });

                if close.is_none() {
                    close = Some((ABNORMAL_CLOSURE, e.to_string()));
                }

                break;
            }
            None => break,
        };

        if events.send(event).is_err() {
            // processor is gone
            return;
        }
    }

    let (code, reason) = close.unwrap_or_else(|| (ABNORMAL_CLOSURE, "connection lost".to_string()));

    let _ = events.send(ConnectionEvent::Closed {
        generation,
        code,
        reason,
    });
}
