use anyhow::Result;
use futures::{SinkExt, StreamExt};
use phxmux_client::{connect, Client, ClientConfig, ClientError};
use phxmux_codec::codec;
use phxmux_codec::frame::{self, Frame};
use serde_json::{json, Value};
use std::future::Future;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

pub const TIMEOUT: Duration = Duration::from_secs(3);

/// Topics of this namespace are rejected by the test server.
pub const FORBIDDEN: &str = "forbidden";

pub enum ServerCommand {
    Send(String),
    Close(u16, String),
}

/// Channel server for the tests. It serves the connections one after the
/// other, acknowledges joins and heartbeats and reports every received frame.
pub struct TestServer {
    pub url: String,
    received: mpsc::UnboundedReceiver<Frame>,
    queries: mpsc::UnboundedReceiver<Option<String>>,
    commands: mpsc::UnboundedSender<ServerCommand>,
}

/// Sends the logs of the client to the test output, `RUST_LOG` filters them.
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

impl TestServer {
    pub async fn start() -> TestServer {
        init_logger();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/socket/websocket", listener.local_addr().unwrap());

        let (received_tx, received) = mpsc::unbounded_channel();
        let (queries_tx, queries) = mpsc::unbounded_channel();
        let (commands, mut commands_rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let queries_tx = queries_tx.clone();
                let callback = move |req: &Request, resp: Response| -> std::result::Result<Response, ErrorResponse> {
                    let _ = queries_tx.send(req.uri().query().map(str::to_string));
                    Ok(resp)
                };

                let mut ws = match tokio_tungstenite::accept_hdr_async(stream, callback).await {
                    Ok(ws) => ws,
                    Err(_) => continue,
                };

                loop {
                    tokio::select! {
                        msg = ws.next() => {
                            match msg {
                                Some(Ok(Message::Text(text))) => {
                                    let f = codec::decode(&text).unwrap();

                                    if let Some(reply) = auto_reply(&f) {
                                        let _ = ws.send(Message::Text(reply)).await;
                                    }

                                    let _ = received_tx.send(f);
                                }
                                Some(Ok(_)) => continue,
                                _ => break,
                            }
                        }
                        cmd = commands_rx.recv() => {
                            match cmd {
                                Some(ServerCommand::Send(text)) => {
                                    let _ = ws.send(Message::Text(text)).await;
                                }
                                Some(ServerCommand::Close(code, reason)) => {
                                    let _ = ws
                                        .close(Some(CloseFrame {
                                            code: CloseCode::from(code),
                                            reason: reason.into(),
                                        }))
                                        .await;
                                }
                                None => return,
                            }
                        }
                    }
                }
            }
        });

        TestServer {
            url,
            received,
            queries,
            commands,
        }
    }

    /// Next frame sent by the client.
    pub async fn frame(&mut self) -> Frame {
        tokio::time::timeout(TIMEOUT, self.received.recv())
            .await
            .expect("no frame arrived in time")
            .expect("server is stopped")
    }

    /// Query string of the next accepted connection.
    pub async fn query(&mut self) -> Option<String> {
        tokio::time::timeout(TIMEOUT, self.queries.recv())
            .await
            .expect("no connection arrived in time")
            .expect("server is stopped")
    }

    pub fn send_text(&self, text: &str) {
        let _ = self.commands.send(ServerCommand::Send(text.to_string()));
    }

    /// Sends a frame with `null` ref, the way the server pushes broadcasts.
    pub fn broadcast(&self, topic: &str, event: &str, payload: Value) {
        let text = json!({"topic": topic, "event": event, "payload": payload, "ref": null}).to_string();

        self.send_text(&text);
    }

    pub fn close(&self, code: u16, reason: &str) {
        let _ = self.commands.send(ServerCommand::Close(code, reason.to_string()));
    }
}

fn auto_reply(f: &Frame) -> Option<String> {
    let msg_ref = f.msg_ref.as_deref()?;

    let payload = match f.event.as_str() {
        frame::PHX_JOIN if f.topic.starts_with(FORBIDDEN) => json!({"status": "error", "response": {"reason": "unauthorized"}}),
        frame::PHX_JOIN | frame::HEARTBEAT => json!({"status": "ok", "response": {}}),
        _ => return None,
    };

    codec::encode(&f.topic, frame::PHX_REPLY, &payload, msg_ref).ok()
}

pub fn config(server: &TestServer) -> ClientConfig {
    ClientConfig::new(&server.url)
        .token("secret")
        .heartbeat(None)
        .close_timeout(Duration::from_secs(1))
}

pub async fn connect_to(server: &TestServer) -> Result<Client> {
    connect(config(server)).await
}

/// Polls the condition until it holds or the timeout elapses.
pub async fn eventually<F, Fut>(mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + TIMEOUT;

    while tokio::time::Instant::now() < deadline {
        if condition().await {
            return true;
        }

        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    false
}

#[allow(dead_code)]
pub(crate) fn to_client_error<T: std::fmt::Debug>(result: Result<T>) -> ClientError {
    result.unwrap_err().downcast::<ClientError>().unwrap()
}
