//! Local view of the joined feeds. Likes are counted optimistically, the
//! count of the server overwrites the local one when it arrives.

use log::debug;
use phxmux_codec::frame::{LikeUpdate, NewItem, Payload};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub(crate) struct FeedView {
    likes: HashMap<String, u64>,
    items: Vec<Payload>,
}

#[derive(Debug, Default)]
pub(crate) struct FeedState {
    feeds: HashMap<String, FeedView>,
}

impl FeedState {
    /// Increments the local like count of a product and returns the new count.
    pub(crate) fn like(&mut self, topic: &str, product_id: &str) -> u64 {
        let view = self.feeds.entry(topic.to_string()).or_default();
        let likes = view.likes.entry(product_id.to_string()).or_insert(0);

        *likes += 1;

        *likes
    }

    pub(crate) fn like_update(&mut self, topic: &str, update: LikeUpdate) {
        debug!("{} likes of {} on {}", update.likes, update.product_id, topic);

        self.feeds
            .entry(topic.to_string())
            .or_default()
            .likes
            .insert(update.product_id, update.likes);
    }

    pub(crate) fn new_item(&mut self, topic: &str, item: NewItem) {
        self.feeds.entry(topic.to_string()).or_default().items.push(item.item);
    }

    pub(crate) fn likes(&self, topic: &str, product_id: &str) -> Option<u64> {
        self.feeds.get(topic).and_then(|view| view.likes.get(product_id).copied())
    }

    pub(crate) fn items(&self, topic: &str) -> &[Payload] {
        self.feeds.get(topic).map(|view| view.items.as_slice()).unwrap_or_default()
    }

    pub(crate) fn remove(&mut self, topic: &str) {
        self.feeds.remove(topic);
    }

    pub(crate) fn clear(&mut self) {
        self.feeds.clear();
    }

    /// One line per feed for the status command.
    pub(crate) fn summary(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .feeds
            .iter()
            .map(|(topic, view)| {
                let mut likes: Vec<String> = view.likes.iter().map(|(p, n)| format!("{}={}", p, n)).collect();
                likes.sort();

                format!("{} items={} likes=[{}]", topic, view.items.len(), likes.join(", "))
            })
            .collect();

        lines.sort();

        lines
    }
}
