use crate::client_api::Client;
use crate::model::{HandlerRef, Payload, Ref, TopicState};
use anyhow::Result;
use std::time::Duration;
use tokio::sync::mpsc;

/// Handle of one topic of a client.
#[derive(Clone, Debug)]
pub struct Channel {
    topic: String,
    client: Client,
}

/// Payloads of one event of a topic, delivered through a stream.
///
/// `Subscription` can be get by invoking [`Channel::subscribe`]. Dropping it
/// unregisters its handler.
#[derive(Debug)]
pub struct Subscription {
    pub topic: String,
    pub event: String,
    handler_ref: HandlerRef,
    released: bool,
    client: Client,
    /// The payloads of the incoming frames in the order of arrival.
    pub signal_stream: mpsc::UnboundedReceiver<Payload>,
}

impl Channel {
    pub(crate) fn new(topic: &str, client: Client) -> Channel {
        Channel {
            topic: topic.to_string(),
            client,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub async fn join(&self) -> Result<bool> {
        self.client.join(&self.topic).await
    }

    pub async fn leave(&self) -> Result<()> {
        self.client.leave(&self.topic).await
    }

    pub async fn push(&self, event: &str, payload: Payload) -> Result<Ref> {
        self.client.push(&self.topic, event, payload).await
    }

    pub async fn on<F>(&self, event: &str, handler: F) -> Result<HandlerRef>
    where
        F: FnMut(&Payload) + Send + 'static,
    {
        self.client.on(&self.topic, event, handler).await
    }

    pub async fn off(&self, handler_ref: HandlerRef) -> Result<bool> {
        self.client.off(handler_ref).await
    }

    /// Subscribes to an event of the topic.
    ///
    /// ```no_run
    /// use phxmux_client::{ClientConfig, connect};
    /// use std::time::Duration;
    ///
    /// async fn likes() {
    ///     let client = connect(ClientConfig::new("ws://localhost:4000/socket/websocket").token("t"))
    ///         .await
    ///         .unwrap();
    ///     let feed = client.channel("feed:user_7");
    ///
    ///     let mut likes = feed.subscribe("like_update").await.unwrap();
    ///     feed.join().await.unwrap();
    ///
    ///     while let Some(payload) = likes.receive(Duration::from_secs(60)).await {
    ///         println!("{} has {} likes", payload["product_id"], payload["likes"]);
    ///     }
    /// }
    /// ```
    pub async fn subscribe(&self, event: &str) -> Result<Subscription> {
        let (tx, rx) = mpsc::unbounded_channel();

        let handler_ref = self
            .on(event, move |payload: &Payload| {
                let _ = tx.send(payload.clone());
            })
            .await?;

        Ok(Subscription {
            topic: self.topic.clone(),
            event: event.to_string(),
            handler_ref,
            released: false,
            client: self.client.clone(),
            signal_stream: rx,
        })
    }

    pub async fn state(&self) -> Result<TopicState> {
        self.client.topic_state(&self.topic).await
    }

    pub async fn is_joined(&self) -> Result<bool> {
        self.client.is_joined(&self.topic).await
    }
}

impl Subscription {
    pub fn handler_ref(&self) -> HandlerRef {
        self.handler_ref
    }

    /// Waits for the next payload, `None` if nothing arrives in time.
    pub async fn receive(&mut self, timeout: Duration) -> Option<Payload> {
        let sleep = tokio::time::sleep(timeout);
        tokio::pin!(sleep);

        tokio::select! {
            signal = self.signal_stream.recv() => {
                signal
            }
            _ = &mut sleep => {
                None
            }
        }
    }

    /// Unregisters the handler of the subscription.
    pub async fn unsubscribe(mut self) -> Result<bool> {
        self.released = true;

        self.client.off(self.handler_ref).await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if !self.released {
            self.client.release(self.handler_ref);
        }
    }
}
