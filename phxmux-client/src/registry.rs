//! Join state of the topics of one connection.
//!
//! A topic is absent until a join is requested, then it is joining until the
//! join is acknowledged. Leave, server side close and disconnect remove the
//! topic, so an absent topic and a left topic are the same.
//!
//! The registry is permissive: it doesn't reject a second join of the same
//! topic, the router checks `is_joined`/`is_joining` before sending a join.

use crate::model::{Ref, TopicName, TopicState};
use log::warn;
use std::collections::HashMap;

#[derive(Debug)]
struct TopicEntry {
    state: TopicState,
    /// Ref of the join frame, the acknowledgment should carry the same ref.
    join_ref: Ref,
}

#[derive(Debug, Default)]
pub struct TopicRegistry {
    topics: HashMap<TopicName, TopicEntry>,
}

impl TopicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absent to joining. Returns `false` and leaves the entry untouched if the
    /// topic is already joining or joined.
    pub fn mark_joining(&mut self, topic: &str, join_ref: &str) -> bool {
        if self.topics.contains_key(topic) {
            return false;
        }

        self.topics.insert(
            topic.to_string(),
            TopicEntry {
                state: TopicState::Joining,
                join_ref: join_ref.to_string(),
            },
        );

        true
    }

    /// Joining to joined. Invalid transitions are logged and ignored.
    pub fn mark_joined(&mut self, topic: &str) -> bool {
        match self.topics.get_mut(topic) {
            Some(entry) if entry.state == TopicState::Joining => {
                entry.state = TopicState::Joined;
                true
            }
            Some(_) => {
                warn!("Topic {} is already joined", topic);
                false
            }
            None => {
                warn!("Cannot mark absent topic {} as joined", topic);
                false
            }
        }
    }

    /// Any state to absent, returns the state the topic was in.
    pub fn remove(&mut self, topic: &str) -> TopicState {
        self.topics
            .remove(topic)
            .map(|entry| entry.state)
            .unwrap_or(TopicState::Absent)
    }

    /// Removes all the topics, returning their names.
    pub fn clear(&mut self) -> Vec<TopicName> {
        self.topics.drain().map(|(topic, _)| topic).collect()
    }

    pub fn state(&self, topic: &str) -> TopicState {
        self.topics
            .get(topic)
            .map(|entry| entry.state)
            .unwrap_or(TopicState::Absent)
    }

    pub fn is_joined(&self, topic: &str) -> bool {
        self.state(topic) == TopicState::Joined
    }

    pub fn is_joining(&self, topic: &str) -> bool {
        self.state(topic) == TopicState::Joining
    }

    /// Joining or joined.
    pub fn is_registered(&self, topic: &str) -> bool {
        self.topics.contains_key(topic)
    }

    pub fn join_ref(&self, topic: &str) -> Option<&str> {
        self.topics.get(topic).map(|entry| entry.join_ref.as_str())
    }

    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.topics.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}
