use crate::command::{self, Command, FeedAction, Namespace};
use crate::config;
use crate::feed::FeedState;
use anyhow::{anyhow, Result};
use log::{error, info, warn};
use phxmux_client::{Client, ConnectionState, Payload};
use phxmux_codec::frame::{self, ChatMessage, LikeUpdate, LocationUpdate, NewItem, ProductAction};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Line based command loop over one client.
pub(crate) struct Shell {
    config: config::Connection,
    client: Option<Client>,
    /// Topics whose handlers are registered on the current client.
    watched: HashSet<String>,
    feeds: Arc<Mutex<FeedState>>,
}

impl Shell {
    pub(crate) fn new(config: config::Connection) -> Self {
        Shell {
            config,
            client: None,
            watched: HashSet::new(),
            feeds: Arc::new(Mutex::new(FeedState::default())),
        }
    }

    pub(crate) async fn run(&mut self) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        info!("Type help for the commands");

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let line = match line? {
                        Some(line) => line,
                        None => break,
                    };

                    match command::parse(&line) {
                        Ok(Some(Command::Quit)) => break,
                        Ok(Some(cmd)) => {
                            if let Err(e) = self.execute(cmd).await {
                                error!("{}", e);
                            }
                        }
                        Ok(None) => (),
                        Err(e) => error!("{}", e),
                    }
                }
                _ = tokio::signal::ctrl_c() => break,
            }
        }

        self.disconnect().await
    }

    async fn execute(&mut self, cmd: Command) -> Result<()> {
        match cmd {
            Command::Connect(token) => self.connect(token).await,
            Command::Disconnect => self.disconnect().await,
            Command::Join(ns, id) => self.join(ns, &id).await,
            Command::Leave(ns, id) => {
                let topic = ns.topic(&id);

                self.client()?.leave(&topic).await?;

                if ns == Namespace::Feed {
                    self.feeds().remove(&topic);
                }

                info!("Left {}", topic);

                Ok(())
            }
            Command::ChatSend { room, content } => {
                let topic = Namespace::Chat.topic(&room);

                self.send(&topic, frame::chat::MESSAGE, ChatMessage::new(&content).payload()).await
            }
            Command::Feed { action, user, product } => {
                let topic = Namespace::Feed.topic(&user);

                self.send(&topic, action.event(), ProductAction::new(&product).payload()).await?;

                if action == FeedAction::Like {
                    let likes = self.feeds().like(&topic, &product);

                    info!("{} has {} likes (local)", product, likes);
                }

                Ok(())
            }
            Command::Location { id, latitude, longitude } => {
                let topic = Namespace::Delivery.topic(&id);
                let payload = LocationUpdate::new(latitude, longitude).payload();

                self.send(&topic, frame::delivery::LOCATION_UPDATE, payload).await
            }
            Command::Status => self.status().await,
            Command::Help => {
                println!("{}", command::HELP);
                Ok(())
            }
            Command::Quit => Ok(()),
        }
    }

    async fn connect(&mut self, token: Option<String>) -> Result<()> {
        if let Some(client) = &self.client {
            match client.connection_state().await? {
                ConnectionState::Closed => (),
                ConnectionState::Closing => return Err(anyhow!("Socket is being closed, try again")),
                _ => {
                    warn!("Socket already connected");
                    return Ok(());
                }
            }
        }

        let token = token
            .or_else(|| self.config.token.clone())
            .ok_or_else(|| anyhow!("a token is required, use connect <token>"))?;

        let client = Client::new(self.config.client_config(&token))?;

        client.on_open(|| info!("Socket opened")).await?;
        client
            .on_close(|code: u16, reason: &str| info!("Socket closed code={} reason={}", code, reason))
            .await?;
        client.on_error(|detail: &str| error!("Socket error {}", detail)).await?;

        self.client = Some(client.clone());
        self.watched.clear();
        self.feeds().clear();

        info!("Connecting to {}", self.config.url);

        client.open().await
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(client) = &self.client {
            info!("Closing socket");

            client.close().await?;
        }

        Ok(())
    }

    async fn join(&mut self, ns: Namespace, id: &str) -> Result<()> {
        let topic = ns.topic(id);
        let client = self.client()?.clone();

        if self.watched.insert(topic.clone()) {
            self.watch(&client, ns, &topic).await?;
        }

        if client.join(&topic).await? {
            info!("SEND {} {} {{}}", topic, frame::PHX_JOIN);
        }

        Ok(())
    }

    /// Logs the inbound events of the topic and keeps the feed state current.
    async fn watch(&self, client: &Client, ns: Namespace, topic: &str) -> Result<()> {
        const CHANNEL_EVENTS: [&str; 3] = [frame::PHX_REPLY, frame::PHX_ERROR, frame::PHX_CLOSE];

        for event in ns.inbound_events().iter().chain(CHANNEL_EVENTS.iter()) {
            let t = topic.to_string();
            let e = event.to_string();

            client
                .on(topic, event, move |payload: &Payload| info!("RECV {} {} {}", t, e, payload))
                .await?;
        }

        if ns == Namespace::Feed {
            let t = topic.to_string();
            let feeds = self.feeds.clone();

            client
                .on(topic, frame::feed::LIKE_UPDATE, move |payload: &Payload| {
                    match LikeUpdate::from_payload(payload) {
                        Ok(update) => lock(&feeds).like_update(&t, update),
                        Err(e) => warn!("Invalid like update {}", e),
                    }
                })
                .await?;

            let t = topic.to_string();
            let feeds = self.feeds.clone();

            client
                .on(topic, frame::feed::NEW_ITEM, move |payload: &Payload| {
                    match NewItem::from_payload(payload) {
                        Ok(item) => lock(&feeds).new_item(&t, item),
                        Err(e) => warn!("Invalid new item {}", e),
                    }
                })
                .await?;
        }

        Ok(())
    }

    async fn send(&self, topic: &str, event: &str, payload: Payload) -> Result<()> {
        let client = self.client()?;

        info!("SEND {} {} {}", topic, event, payload);

        client.push(topic, event, payload).await?;

        Ok(())
    }

    async fn status(&self) -> Result<()> {
        let client = match &self.client {
            Some(client) => client,
            None => {
                println!("socket: {:?}", ConnectionState::Closed);
                return Ok(());
            }
        };

        println!("socket: {:?}", client.connection_state().await?);

        for topic in client.topics().await? {
            println!("{}: {:?}", topic, client.topic_state(&topic).await?);
        }

        for line in self.feeds().summary() {
            println!("{}", line);
        }

        Ok(())
    }

    fn client(&self) -> Result<&Client> {
        self.client.as_ref().ok_or_else(|| anyhow!("Socket is not connected"))
    }

    fn feeds(&self) -> std::sync::MutexGuard<'_, FeedState> {
        lock(&self.feeds)
    }
}

fn lock(feeds: &Mutex<FeedState>) -> std::sync::MutexGuard<'_, FeedState> {
    feeds.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
