//! The processor is the single task which owns the router of a client. Client
//! requests, transport events and heartbeat ticks are handled here one at a
//! time, so the router state needs no locking. Handlers run on this task.

use crate::client_api::ClientConfig;
use crate::client_error;
use crate::connection::{CloseCallback, ErrorCallback, MessageCallback, OpenCallback};
use crate::error::ErrorKind;
use crate::model::{ConnectionState, HandlerRef, Payload, Ref, TopicName, TopicState, ABNORMAL_CLOSURE};
use crate::router::{ChannelRouter, Handler};
use crate::transport::{self, ConnectionEvent, Generation};
use anyhow::Result;
use log::{debug, error, info, trace, warn};
use std::fmt;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant, Interval};
use url::Url;

pub(crate) type RequestSink = mpsc::Sender<Request>;

type Reply<T> = oneshot::Sender<T>;

pub(crate) enum Lifecycle {
    Open(OpenCallback),
    Close(CloseCallback),
    Error(ErrorCallback),
    Message(MessageCallback),
}

/// Represents a client request, every request carries the channel of its answer.
pub(crate) enum Request {
    Open {
        url: Url,
        reply: Reply<Result<()>>,
    },
    Close {
        reply: Reply<Result<()>>,
    },
    Join {
        topic: TopicName,
        reply: Reply<Result<bool>>,
    },
    Leave {
        topic: TopicName,
        reply: Reply<Result<()>>,
    },
    Push {
        topic: TopicName,
        event: String,
        payload: Payload,
        reply: Reply<Result<Ref>>,
    },
    On {
        topic: TopicName,
        event: String,
        handler: Handler,
        reply: Reply<HandlerRef>,
    },
    Off {
        handler_ref: HandlerRef,
        reply: Reply<bool>,
    },
    Lifecycle {
        callback: Lifecycle,
        reply: Reply<()>,
    },
    ConnectionState {
        reply: Reply<ConnectionState>,
    },
    TopicState {
        topic: TopicName,
        reply: Reply<TopicState>,
    },
    Topics {
        reply: Reply<Vec<TopicName>>,
    },
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Request::Open { .. } => write!(f, "Open"),
            Request::Close { .. } => write!(f, "Close"),
            Request::Join { topic, .. } => write!(f, "Join{{Topic={}}}", topic),
            Request::Leave { topic, .. } => write!(f, "Leave{{Topic={}}}", topic),
            Request::Push { topic, event, .. } => write!(f, "Push{{Topic={},Event={}}}", topic, event),
            Request::On { topic, event, .. } => write!(f, "On{{Topic={},Event={}}}", topic, event),
            Request::Off { handler_ref, .. } => write!(f, "Off{{{:?}}}", handler_ref),
            Request::Lifecycle { .. } => write!(f, "Lifecycle"),
            Request::ConnectionState { .. } => write!(f, "ConnectionState"),
            Request::TopicState { topic, .. } => write!(f, "TopicState{{Topic={}}}", topic),
            Request::Topics { .. } => write!(f, "Topics"),
        }
    }
}

/// Sends a request to the processor and waits for its answer.
pub(crate) async fn call<T>(sink: &RequestSink, request: impl FnOnce(Reply<T>) -> Request) -> Result<T> {
    let (tx, rx) = oneshot::channel();

    if sink.send(request(tx)).await.is_err() {
        return client_error!(None, ErrorKind::Shutdown, "Client processor is stopped");
    }

    match rx.await {
        Ok(answer) => Ok(answer),
        Err(_) => client_error!(None, ErrorKind::Shutdown, "Client processor dropped the request"),
    }
}

/// Spawns the processor task and returns the sink of its requests. The task
/// stops when every sender of the requests is dropped.
pub(crate) fn start(config: &ClientConfig) -> RequestSink {
    let (sender, receiver) = mpsc::channel(16);
    let processor = Processor::new(config);

    tokio::spawn(async move {
        if let Err(e) = processor.run(receiver).await {
            error!("Processor error {:?}", e);
        }
    });

    sender
}

struct Processor {
    router: ChannelRouter,
    events_tx: mpsc::UnboundedSender<ConnectionEvent>,
    events_rx: mpsc::UnboundedReceiver<ConnectionEvent>,
    heartbeat: Option<Duration>,
    close_timeout: Duration,
    /// Open request waiting for the handshake of that generation.
    pending_open: Option<(Generation, Reply<Result<()>>)>,
    /// Close requests waiting for the transport close of that generation.
    pending_close: Vec<(Generation, Reply<Result<()>>)>,
}

impl Processor {
    fn new(config: &ClientConfig) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Processor {
            router: ChannelRouter::new(&config.join_ack_event),
            events_tx,
            events_rx,
            heartbeat: config.heartbeat,
            close_timeout: config.close_timeout,
            pending_open: None,
            pending_close: vec![],
        }
    }

    async fn run(mut self, mut requests: mpsc::Receiver<Request>) -> Result<()> {
        let mut ticker = self.heartbeat.map(|period| time::interval_at(Instant::now() + period, period));

        loop {
            tokio::select! {
                req = requests.recv() => {
                    match req {
                        Some(request) => {
                            debug!("Incoming client request {:?}", request);

                            self.handle_request(request);
                        }
                        None => {
                            info!("Every client handle is dropped, closing");

                            self.router.close();
                            break;
                        }
                    }
                }
                Some(event) = self.events_rx.recv() => {
                    trace!("Transport event {:?}", event);

                    self.handle_event(event);
                }
                _ = next_tick(&mut ticker) => {
                    if let Err(e) = self.router.heartbeat() {
                        warn!("Heartbeat failed {:?}", e);
                    }
                }
            }
        }

        Ok(())
    }

    fn handle_request(&mut self, request: Request) {
        match request {
            Request::Open { url, reply } => self.open(url, reply),
            Request::Close { reply } => self.close(reply),
            Request::Join { topic, reply } => {
                let _ = reply.send(self.router.join(&topic));
            }
            Request::Leave { topic, reply } => {
                let _ = reply.send(self.router.leave(&topic));
            }
            Request::Push {
                topic,
                event,
                payload,
                reply,
            } => {
                let _ = reply.send(self.router.push(&topic, &event, payload));
            }
            Request::On {
                topic,
                event,
                handler,
                reply,
            } => {
                let _ = reply.send(self.router.on(&topic, &event, handler));
            }
            Request::Off { handler_ref, reply } => {
                let _ = reply.send(self.router.off(handler_ref));
            }
            Request::Lifecycle { callback, reply } => {
                let conn = self.router.connection_mut();

                match callback {
                    Lifecycle::Open(cb) => conn.on_open(cb),
                    Lifecycle::Close(cb) => conn.on_close(cb),
                    Lifecycle::Error(cb) => conn.on_error(cb),
                    Lifecycle::Message(cb) => conn.on_message(cb),
                }

                let _ = reply.send(());
            }
            Request::ConnectionState { reply } => {
                let _ = reply.send(self.router.connection().state());
            }
            Request::TopicState { topic, reply } => {
                let _ = reply.send(self.router.topic_state(&topic));
            }
            Request::Topics { reply } => {
                let mut topics: Vec<TopicName> = self.router.registry().topics().map(str::to_string).collect();
                topics.sort();

                let _ = reply.send(topics);
            }
        }
    }

    fn open(&mut self, url: Url, reply: Reply<Result<()>>) {
        match self.router.connection().state() {
            ConnectionState::Open => {
                info!("Connection is already open");

                let _ = reply.send(Ok(()));
            }
            ConnectionState::Connecting => {
                let _ = reply.send(client_error!(
                    None,
                    ErrorKind::ConnectFailed,
                    "Connection is being opened already"
                ));
            }
            ConnectionState::Closing => {
                let _ = reply.send(client_error!(None, ErrorKind::ConnectFailed, "Connection is being closed"));
            }
            ConnectionState::Closed => {
                let generation = self.router.connection_mut().connecting();

                transport::open(generation, url, self.events_tx.clone());

                self.pending_open = Some((generation, reply));
            }
        }
    }

    fn close(&mut self, reply: Reply<Result<()>>) {
        let generation = self.router.connection().generation();

        match self.router.close() {
            ConnectionState::Open => {
                self.pending_close.push((generation, reply));
                self.close_deadline(generation);
            }
            ConnectionState::Closing => {
                self.pending_close.push((generation, reply));
            }
            ConnectionState::Connecting => {
                if let Some((_, open_reply)) = self.pending_open.take() {
                    let _ = open_reply.send(client_error!(
                        None,
                        ErrorKind::ConnectFailed,
                        "Connection is closed while connecting"
                    ));
                }

                let _ = reply.send(Ok(()));
            }
            ConnectionState::Closed => {
                let _ = reply.send(Ok(()));
            }
        }
    }

    /// If the peer doesn't finish the closing handshake in time, the close is
    /// reported as abnormal. A late close of the transport is ignored then.
    fn close_deadline(&self, generation: Generation) {
        let events = self.events_tx.clone();
        let timeout = self.close_timeout;

        tokio::spawn(async move {
            time::sleep(timeout).await;

            let _ = events.send(ConnectionEvent::Closed {
                generation,
                code: ABNORMAL_CLOSURE,
                reason: "close timed out".to_string(),
            });
        });
    }

    fn handle_event(&mut self, event: ConnectionEvent) {
        let outcome = match &event {
            ConnectionEvent::Opened { generation, .. } => Some((*generation, Ok(()))),
            ConnectionEvent::Failed { generation, reason } => Some((*generation, Err(reason.clone()))),
            ConnectionEvent::Closed { generation, reason, .. } => Some((*generation, Err(reason.clone()))),
            _ => None,
        };

        self.router.handle_event(event);

        if let Some((generation, result)) = outcome {
            self.notify_waiters(generation, result);
        }
    }

    /// Answers the open and close requests which wait for the given generation.
    fn notify_waiters(&mut self, generation: Generation, result: std::result::Result<(), String>) {
        let state = self.router.connection().state();

        if let Some((g, _)) = &self.pending_open {
            if *g == generation && state != ConnectionState::Connecting {
                if let Some((_, reply)) = self.pending_open.take() {
                    let answer = match (&result, state) {
                        (Ok(()), ConnectionState::Open) => Ok(()),
                        (Err(reason), _) => client_error!(None, ErrorKind::ConnectFailed, reason.as_str()),
                        _ => client_error!(None, ErrorKind::ConnectFailed, "Connection is not open"),
                    };

                    let _ = reply.send(answer);
                }
            }
        }

        if state == ConnectionState::Closed {
            let (done, waiting): (Vec<_>, Vec<_>) = self.pending_close.drain(..).partition(|(g, _)| *g == generation);

            for (_, reply) in done {
                let _ = reply.send(Ok(()));
            }

            self.pending_close = waiting;
        }
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(t) => {
            t.tick().await;
        }
        None => futures::future::pending().await,
    }
}
