use crate::channel_api::Channel;
use crate::model::{ConnectionState, HandlerRef, Payload, Ref, TopicName, TopicState, DEFAULT_JOIN_ACK_EVENT};
use crate::processor::{self, Lifecycle, Request, RequestSink};
use crate::transport;
use anyhow::Result;
use log::{debug, warn};
use std::time::Duration;
use tokio::sync::{mpsc::error::TrySendError, oneshot};
use url::Url;

/// Default period of the heartbeats.
pub const DEFAULT_HEARTBEAT: Duration = Duration::from_secs(30);
/// Default time to wait for the closing handshake.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Settings of a client.
///
/// ```
/// use phxmux_client::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::new("ws://localhost:4000/socket/websocket")
///     .token("secret")
///     .heartbeat(Some(Duration::from_secs(10)));
///
/// assert!(config.endpoint().is_ok());
/// ```
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub(crate) url: String,
    /// Connection parameters, they go to the query of the endpoint URL.
    pub(crate) params: Vec<(String, String)>,
    pub(crate) join_ack_event: String,
    /// `None` disables the heartbeats.
    pub(crate) heartbeat: Option<Duration>,
    pub(crate) close_timeout: Duration,
}

impl ClientConfig {
    pub fn new(url: &str) -> Self {
        ClientConfig {
            url: url.to_string(),
            params: vec![],
            join_ack_event: DEFAULT_JOIN_ACK_EVENT.to_string(),
            heartbeat: Some(DEFAULT_HEARTBEAT),
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
        }
    }

    /// Authentication token, it is opaque to the client.
    pub fn token(self, token: &str) -> Self {
        self.param("token", token)
    }

    pub fn param(mut self, name: &str, value: &str) -> Self {
        self.params.push((name.to_string(), value.to_string()));
        self
    }

    /// Event which acknowledges a join, `phx_reply` by default.
    pub fn join_ack_event(mut self, event: &str) -> Self {
        self.join_ack_event = event.to_string();
        self
    }

    pub fn heartbeat(mut self, period: Option<Duration>) -> Self {
        self.heartbeat = period;
        self
    }

    pub fn close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    /// The URL the client connects to, with the parameters in its query.
    pub fn endpoint(&self) -> Result<Url> {
        transport::endpoint_url(&self.url, &self.params)
    }
}

/// Handle of a client. Clones share the same connection and topics, the
/// connection is closed when the last clone is dropped.
///
/// A client needs a tokio runtime, it must be created in one.
#[derive(Clone, Debug)]
pub struct Client {
    endpoint: Url,
    sink: RequestSink,
}

/// Creates a client and opens its connection.
pub async fn connect(config: ClientConfig) -> Result<Client> {
    let client = Client::new(config)?;

    client.open().await?;

    Ok(client)
}

impl Client {
    /// Creates a client without opening the connection. It fails only if the
    /// endpoint URL is invalid.
    pub fn new(config: ClientConfig) -> Result<Client> {
        let endpoint = config.endpoint()?;
        let sink = processor::start(&config);

        Ok(Client { endpoint, sink })
    }

    /// Opens the connection and waits for the handshake. Opening an open
    /// connection does nothing.
    pub async fn open(&self) -> Result<()> {
        let url = self.endpoint.clone();

        processor::call(&self.sink, |reply| Request::Open { url, reply }).await?
    }

    /// Closes the connection and waits until the transport is closed. Every
    /// topic is left by the close.
    pub async fn close(&self) -> Result<()> {
        processor::call(&self.sink, |reply| Request::Close { reply }).await?
    }

    /// Joins a topic. The topic is joining until the server acknowledges the
    /// join, pushes are allowed meanwhile. Returns `false` if the topic is
    /// joining or joined already.
    pub async fn join(&self, topic: &str) -> Result<bool> {
        let topic = topic.to_string();

        processor::call(&self.sink, |reply| Request::Join { topic, reply }).await?
    }

    /// Leaves a topic without waiting for the server.
    pub async fn leave(&self, topic: &str) -> Result<()> {
        let topic = topic.to_string();

        processor::call(&self.sink, |reply| Request::Leave { topic, reply }).await?
    }

    /// Sends an event to a topic, returns the ref of the frame.
    pub async fn push(&self, topic: &str, event: &str, payload: Payload) -> Result<Ref> {
        let topic = topic.to_string();
        let event = event.to_string();

        processor::call(&self.sink, |reply| Request::Push {
            topic,
            event,
            payload,
            reply,
        })
        .await?
    }

    /// Registers a handler of the frames of a topic and event. Handlers run on
    /// the processor task, they must not block.
    pub async fn on<F>(&self, topic: &str, event: &str, handler: F) -> Result<HandlerRef>
    where
        F: FnMut(&Payload) + Send + 'static,
    {
        let topic = topic.to_string();
        let event = event.to_string();

        processor::call(&self.sink, |reply| Request::On {
            topic,
            event,
            handler: Box::new(handler),
            reply,
        })
        .await
    }

    pub async fn off(&self, handler_ref: HandlerRef) -> Result<bool> {
        processor::call(&self.sink, |reply| Request::Off { handler_ref, reply }).await
    }

    /// Unregisters a handler without waiting for the answer, so it can be
    /// called from `Drop`. The request is queued behind the pending ones.
    pub(crate) fn release(&self, handler_ref: HandlerRef) {
        let (reply, _) = oneshot::channel();

        match self.sink.try_send(Request::Off { handler_ref, reply }) {
            Ok(()) => (),
            Err(TrySendError::Full(request)) => match tokio::runtime::Handle::try_current() {
                Ok(runtime) => {
                    let sink = self.sink.clone();

                    runtime.spawn(async move {
                        let _ = sink.send(request).await;
                    });
                }
                Err(_) => warn!("Handler {:?} is not released, no runtime", handler_ref),
            },
            Err(TrySendError::Closed(_)) => debug!("Processor is stopped, {:?} is gone", handler_ref),
        }
    }

    pub async fn on_open<F>(&self, cb: F) -> Result<()>
    where
        F: FnMut() + Send + 'static,
    {
        self.lifecycle(Lifecycle::Open(Box::new(cb))).await
    }

    /// The callback gets the close code and reason.
    pub async fn on_close<F>(&self, cb: F) -> Result<()>
    where
        F: FnMut(u16, &str) + Send + 'static,
    {
        self.lifecycle(Lifecycle::Close(Box::new(cb))).await
    }

    pub async fn on_error<F>(&self, cb: F) -> Result<()>
    where
        F: FnMut(&str) + Send + 'static,
    {
        self.lifecycle(Lifecycle::Error(Box::new(cb))).await
    }

    /// The callback gets every incoming text before it is dispatched.
    pub async fn on_message<F>(&self, cb: F) -> Result<()>
    where
        F: FnMut(&str) + Send + 'static,
    {
        self.lifecycle(Lifecycle::Message(Box::new(cb))).await
    }

    pub async fn connection_state(&self) -> Result<ConnectionState> {
        processor::call(&self.sink, |reply| Request::ConnectionState { reply }).await
    }

    pub async fn topic_state(&self, topic: &str) -> Result<TopicState> {
        let topic = topic.to_string();

        processor::call(&self.sink, |reply| Request::TopicState { topic, reply }).await
    }

    pub async fn is_joined(&self, topic: &str) -> Result<bool> {
        Ok(self.topic_state(topic).await? == TopicState::Joined)
    }

    pub async fn is_joining(&self, topic: &str) -> Result<bool> {
        Ok(self.topic_state(topic).await? == TopicState::Joining)
    }

    /// Joining and joined topics in alphabetical order.
    pub async fn topics(&self) -> Result<Vec<TopicName>> {
        processor::call(&self.sink, |reply| Request::Topics { reply }).await
    }

    /// Handle of a topic, it doesn't join the topic.
    pub fn channel(&self, topic: &str) -> Channel {
        Channel::new(topic, self.clone())
    }

    async fn lifecycle(&self, callback: Lifecycle) -> Result<()> {
        processor::call(&self.sink, |reply| Request::Lifecycle { callback, reply }).await
    }
}
