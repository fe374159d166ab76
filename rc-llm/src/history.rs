//! Capacity-bounded conversation history.

use crate::types::{Message, Role};
use std::collections::VecDeque;

pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Ordered, oldest-first message log that never holds more than `capacity`
/// entries. Appending past capacity evicts exactly one message from the head.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    messages: VecDeque<Message>,
    capacity: usize,
}

impl HistoryBuffer {
    /// A capacity of zero is raised to one so the latest message is always kept.
    /// Storage grows on demand; `capacity` only bounds it.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            messages: VecDeque::new(),
            capacity,
        }
    }

    pub fn append(&mut self, role: Role, content: impl Into<String>) {
        self.push(Message::new(role, content));
    }

    pub fn push(&mut self, message: Message) {
        if self.messages.len() == self.capacity {
            if let Some(evicted) = self.messages.pop_front() {
                tracing::trace!(
                    role = evicted.role().as_str(),
                    capacity = self.capacity,
                    "history full; evicted oldest message"
                );
            }
        }
        self.messages.push_back(message);
    }

    /// Messages in insertion order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Message> + '_ {
        self.messages.iter()
    }

    pub fn to_ordered_list(&self) -> Vec<&Message> {
        self.messages.iter().collect()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.back()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
