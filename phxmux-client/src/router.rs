//! `router` module is the channel state machine of a client. It presents a
//! topic oriented API (join, leave, push, on) over the one shared connection
//! and dispatches the incoming frames to the handlers registered for their
//! exact `(topic, event)` pair.
//!
//! Everything which goes to the server is a frame encoded by the codec,
//! everything which comes from the server is a transport event fed in by the
//! processor. The router is not shared, the processor owns it and calls it
//! one request or event at a time.
//!
//! Join acknowledgment: a joining topic becomes joined when a frame arrives on
//! it with the configured acknowledgment event (`phx_reply` by default) and
//! with the ref of the join frame (or without ref). If the payload has a
//! `status` other than `"ok"` the join is rejected and the topic is removed.

use crate::client_error;
use crate::connection::Connection;
use crate::error::ErrorKind;
use crate::model::{ConnectionState, HandlerRef, Payload, Ref, TopicState};
use crate::refs::RefAllocator;
use crate::registry::TopicRegistry;
use crate::transport::ConnectionEvent;
use anyhow::Result;
use log::{debug, info, trace, warn};
use phxmux_codec::codec;
use phxmux_codec::frame::{self, Frame};
use std::collections::HashMap;

/// Handler of the payload of incoming frames.
pub(crate) type Handler = Box<dyn FnMut(&Payload) + Send>;

struct Registration {
    id: HandlerRef,
    handler: Handler,
}

pub struct ChannelRouter {
    connection: Connection,
    registry: TopicRegistry,
    refs: RefAllocator,
    /// Handlers per `(topic, event)`, in registration order.
    handlers: HashMap<(String, String), Vec<Registration>>,
    last_handler: u64,
    join_ack_event: String,
}

impl std::fmt::Debug for ChannelRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelRouter")
            .field("connection", &self.connection)
            .field("registry", &self.registry)
            .field("handlers", &self.handlers.len())
            .field("join_ack_event", &self.join_ack_event)
            .finish()
    }
}

impl ChannelRouter {
    pub fn new(join_ack_event: &str) -> Self {
        ChannelRouter {
            connection: Connection::new(),
            registry: TopicRegistry::new(),
            refs: RefAllocator::new(),
            handlers: HashMap::new(),
            last_handler: 0,
            join_ack_event: join_ack_event.to_string(),
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub(crate) fn connection_mut(&mut self) -> &mut Connection {
        &mut self.connection
    }

    pub fn registry(&self) -> &TopicRegistry {
        &self.registry
    }

    pub fn topic_state(&self, topic: &str) -> TopicState {
        self.registry.state(topic)
    }

    /// Sends a join frame and marks the topic as joining. Returns `false` if the
    /// topic is already joining or joined, in that case nothing is sent.
    pub fn join(&mut self, topic: &str) -> Result<bool> {
        if !self.connection.is_open() {
            return client_error!(Some(topic.to_string()), ErrorKind::NotConnected, "Connection is not open");
        }

        if self.registry.is_registered(topic) {
            warn!("Topic {} is already {:?}, join is ignored", topic, self.registry.state(topic));
            return Ok(false);
        }

        let join_ref = self.refs.next();

        self.send_frame(&frame::join(topic, &join_ref))?;
        self.registry.mark_joining(topic, &join_ref);

        Ok(true)
    }

    /// Sends a leave frame and removes the topic without waiting for the answer
    /// of the server.
    pub fn leave(&mut self, topic: &str) -> Result<()> {
        if !self.registry.is_registered(topic) {
            return client_error!(Some(topic.to_string()), ErrorKind::NotJoined, "Topic is not joined");
        }

        let leave_ref = self.refs.next();

        self.send_frame(&frame::leave(topic, &leave_ref))?;
        self.registry.remove(topic);

        Ok(())
    }

    /// Sends an event to a joining or joined topic, returns the ref of the frame.
    /// Nothing is queued, if the frame cannot be sent it is an error.
    pub fn push(&mut self, topic: &str, event: &str, payload: Payload) -> Result<Ref> {
        if !self.connection.is_open() {
            return client_error!(Some(topic.to_string()), ErrorKind::NotConnected, "Connection is not open");
        }

        if !self.registry.is_registered(topic) {
            return client_error!(Some(topic.to_string()), ErrorKind::NotJoined, "Topic is not joined");
        }

        let msg_ref = self.refs.next();

        self.send_frame(&frame::push(topic, event, payload, &msg_ref))?;

        Ok(msg_ref)
    }

    /// Sends a heartbeat to the system topic if the connection is open.
    pub fn heartbeat(&mut self) -> Result<()> {
        if !self.connection.is_open() {
            trace!("Skipping heartbeat, connection is {:?}", self.connection.state());
            return Ok(());
        }

        let msg_ref = self.refs.next();

        self.send_frame(&frame::heartbeat(&msg_ref))
    }

    pub fn on(&mut self, topic: &str, event: &str, handler: Handler) -> HandlerRef {
        self.last_handler += 1;

        let id = HandlerRef(self.last_handler);

        self.handlers
            .entry((topic.to_string(), event.to_string()))
            .or_default()
            .push(Registration { id, handler });

        id
    }

    /// Unregisters a handler, returns `false` if it was not registered.
    pub fn off(&mut self, id: HandlerRef) -> bool {
        let mut found = false;

        self.handlers.retain(|_, registrations| {
            let before = registrations.len();
            registrations.retain(|r| r.id != id);
            found |= registrations.len() != before;

            !registrations.is_empty()
        });

        found
    }

    /// Initiates the close of the connection. The topics are removed when the
    /// transport reports the close.
    pub fn close(&mut self) -> ConnectionState {
        let prev = self.connection.close();

        if prev == ConnectionState::Connecting {
            self.clear_topics();
        }

        prev
    }

    /// Handles an event of the transport.
    pub(crate) fn handle_event(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Opened { generation, outgoing } => {
                if self.connection.opened(generation, outgoing) {
                    self.refs.reset();
                }
            }
            ConnectionEvent::Failed { generation, reason } => {
                self.connection.failed(generation, &reason);
            }
            ConnectionEvent::Message { generation, text } => {
                if self.connection.message(generation, &text) {
                    self.dispatch(&text);
                }
            }
            ConnectionEvent::Error { generation, detail } => {
                self.connection.error(generation, &detail);
            }
            ConnectionEvent::Closed {
                generation,
                code,
                reason,
            } => {
                if self.connection.closed(generation, code, &reason) {
                    self.clear_topics();
                }
            }
        }
    }

    /// Decodes an incoming text and invokes the handlers of its topic and event.
    /// Malformed texts are logged and discarded.
    pub(crate) fn dispatch(&mut self, text: &str) {
        let frame = match codec::decode(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Discarding malformed frame {:?}: {}", text, e);
                return;
            }
        };

        debug!("Incoming frame {:?}", frame);

        self.track_lifecycle(&frame);

        match self.handlers.get_mut(&(frame.topic.clone(), frame.event.clone())) {
            Some(registrations) => {
                for r in registrations.iter_mut() {
                    (r.handler)(&frame.payload);
                }
            }
            None => trace!("No handler for {} {}", frame.topic, frame.event),
        }
    }

    /// Drives the registry by the incoming join acknowledgments and by the
    /// channel closes of the server.
    fn track_lifecycle(&mut self, frame: &Frame) {
        if frame.event == self.join_ack_event && self.registry.is_joining(&frame.topic) {
            let ref_matches = match (&frame.msg_ref, self.registry.join_ref(&frame.topic)) {
                (Some(r), Some(join_ref)) => r == join_ref,
                _ => true,
            };

            if !ref_matches {
                trace!("Reply on {} is not the join ack", frame.topic);
                return;
            }

            match frame.reply_status() {
                None | Some("ok") => {
                    info!("Joined {}", frame.topic);
                    self.registry.mark_joined(&frame.topic);
                }
                Some(status) => {
                    warn!("Join of {} is rejected with {} {:?}", frame.topic, status, frame.reply_response());
                    self.registry.remove(&frame.topic);
                }
            }

            return;
        }

        if (frame.event == frame::PHX_CLOSE || frame.event == frame::PHX_ERROR)
            && self.registry.is_registered(&frame.topic)
        {
            info!("Server closed {} with {}", frame.topic, frame.event);
            self.registry.remove(&frame.topic);
        }
    }

    fn clear_topics(&mut self) {
        for topic in self.registry.clear() {
            debug!("Topic {} is left by disconnect", topic);
        }
    }

    fn send_frame(&mut self, f: &Frame) -> Result<()> {
        let text = codec::encode_frame(f)?;

        debug!("Outgoing frame {:?}", f);

        self.connection.send(text)
    }
}
