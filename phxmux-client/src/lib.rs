//! Client of multiplexed publish/subscribe channels over a single WebSocket.
//!
//! Many topics (chat rooms, user feeds, delivery trackers) share one
//! connection. Every topic has its own join/leave lifecycle and every outgoing
//! frame is correlated by a ref.
//!
//! ```no_run
//! use phxmux_client::{connect, ClientConfig};
//! use serde_json::json;
//!
//! async fn chat() -> anyhow::Result<()> {
//!     let client = connect(ClientConfig::new("ws://localhost:4000/socket/websocket").token("t")).await?;
//!
//!     client.on("chat:room_42", "message", |payload| println!("{}", payload)).await?;
//!     client.join("chat:room_42").await?;
//!     client.push("chat:room_42", "message", json!({"content": "hi"})).await?;
//!
//!     client.close().await
//! }
//! ```
mod channel_api;
pub use channel_api::{Channel, Subscription};

mod client_api;
pub use client_api::{connect, Client, ClientConfig, DEFAULT_CLOSE_TIMEOUT, DEFAULT_HEARTBEAT};

mod connection;
pub use connection::Connection;

mod error;
pub use error::{error_kind, ClientError, ErrorKind};

mod model;
pub use model::{ConnectionState, HandlerRef, Payload, Ref, TopicName, TopicState, DEFAULT_JOIN_ACK_EVENT};

mod processor;

mod refs;
pub use refs::RefAllocator;

mod registry;
pub use registry::TopicRegistry;

mod router;
pub use router::ChannelRouter;

mod transport;
