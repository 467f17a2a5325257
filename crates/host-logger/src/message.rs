// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Local};
use std::borrow::Cow;

/// One line of host console output.
///
/// The text is kept as raw bytes: the console is not guaranteed to produce
/// valid UTF-8 and a multi-byte character may be split between two reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Time the first byte of the line was received.
    pub timestamp: DateTime<Local>,
    pub(crate) text: Vec<u8>,
}

impl Message {
    #[must_use]
    pub fn new(timestamp: DateTime<Local>, text: impl Into<Vec<u8>>) -> Self {
        Message {
            timestamp,
            text: text.into(),
        }
    }

    /// Text of the message, invalid UTF-8 sequences replaced.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.text)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.text
    }

    pub(crate) fn extend(&mut self, data: &[u8]) {
        self.text.extend_from_slice(data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_lossy() {
        let msg = Message::new(Local::now(), b"abc\xffdef".to_vec());
        assert_eq!(msg.text(), "abc\u{fffd}def");
        assert_eq!(msg.as_bytes(), b"abc\xffdef");
    }

    #[test]
    fn test_extend_joins_split_character() {
        let snowman = "\u{2603}".as_bytes();
        let mut msg = Message::new(Local::now(), &snowman[..1]);
        msg.extend(&snowman[1..]);
        assert_eq!(msg.text(), "\u{2603}");
    }
}
