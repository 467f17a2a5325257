// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Bounded in-memory window of the most recent console lines.
//!
//! The buffer is limited by message count and by message age (either limit
//! may be disabled with zero). Limits are enforced once after every appended
//! chunk, dropping the oldest messages first. Before anything is dropped the
//! registered full handler is called with the buffer itself, so it can save
//! and clear the contents instead of losing them.

use chrono::{DateTime, Local};
use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;
use tracing::debug;

use crate::message::Message;
use crate::segmenter::Segmenter;

/// Called when a limit is about to evict messages.
pub type FullHandler = Box<dyn FnMut(&mut LogBuffer) + Send>;

pub struct LogBuffer {
    messages: VecDeque<Message>,
    segmenter: Segmenter,
    /// Maximum number of messages, 0 = unlimited.
    max_size: usize,
    /// Maximum message age, zero = unlimited.
    max_time: Duration,
    full_handler: Option<FullHandler>,
}

impl fmt::Debug for LogBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogBuffer")
            .field("messages", &self.messages.len())
            .field("max_size", &self.max_size)
            .field("max_time", &self.max_time)
            .field("full_handler", &self.full_handler.is_some())
            .finish()
    }
}

impl LogBuffer {
    #[must_use]
    pub fn new(max_size: usize, max_time: Duration) -> Self {
        LogBuffer {
            messages: VecDeque::new(),
            segmenter: Segmenter::new(),
            max_size,
            max_time,
            full_handler: None,
        }
    }

    pub fn set_full_handler<F>(&mut self, handler: F)
    where
        F: FnMut(&mut LogBuffer) + Send + 'static,
    {
        self.full_handler = Some(Box::new(handler));
    }

    /// Append raw console data, stamping new messages with the current time.
    pub fn append(&mut self, data: &[u8]) {
        self.append_at(data, Local::now());
    }

    /// Append raw console data received at `now`.
    ///
    /// Lines split across calls are joined into one message; empty lines are
    /// dropped. Limits are checked once, after the whole chunk is stored.
    pub fn append_at(&mut self, data: &[u8], now: DateTime<Local>) {
        let messages = &mut self.messages;
        self.segmenter.split(data, |fragment| {
            if fragment.text.is_empty() {
                return;
            }
            if fragment.continues {
                if let Some(last) = messages.back_mut() {
                    last.extend(&fragment.text);
                    return;
                }
            }
            messages.push_back(Message::new(now, fragment.text.into_owned()));
        });

        self.shrink_at(now);
    }

    /// Drop all messages and forget any incomplete line.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.segmenter.reset();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Messages from the oldest to the newest.
    pub fn iter(&self) -> impl Iterator<Item = &Message> + '_ {
        self.messages.iter()
    }

    /// Enforce the limits, `now` being the reference for the age limit.
    pub fn shrink_at(&mut self, now: DateTime<Local>) {
        if self.max_size != 0 && self.messages.len() > self.max_size {
            self.notify_full();
            let excess = self.messages.len().saturating_sub(self.max_size);
            if excess > 0 {
                debug!("Dropping {excess} messages over the size limit");
                self.messages.drain(..excess);
            }
        }

        if !self.max_time.is_zero() {
            if self.messages.front().is_some_and(|m| self.expired(m, now)) {
                self.notify_full();
            }
            let before = self.messages.len();
            while self.messages.front().is_some_and(|m| self.expired(m, now)) {
                self.messages.pop_front();
            }
            if before > self.messages.len() {
                debug!(
                    "Dropping {} messages over the time limit",
                    before - self.messages.len()
                );
            }
        }
    }

    fn expired(&self, message: &Message, now: DateTime<Local>) -> bool {
        let age = now
            .signed_duration_since(message.timestamp)
            .to_std()
            .unwrap_or_default();
        age > self.max_time
    }

    fn notify_full(&mut self) {
        // Taken out for the duration of the call: the handler gets the buffer.
        if let Some(mut handler) = self.full_handler.take() {
            handler(self);
            if self.full_handler.is_none() {
                self.full_handler = Some(handler);
            }
        }
    }
}

impl<'a> IntoIterator for &'a LogBuffer {
    type Item = &'a Message;
    type IntoIter = std::collections::vec_deque::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}
