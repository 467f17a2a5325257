// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Incremental splitting of the console byte stream into lines.
//!
//! The console delivers arbitrary chunks, so a line may be split across
//! several reads. The segmenter remembers whether the previous chunk ended
//! with a line terminator and tells its consumer whether a fragment starts a
//! new line or continues the previous one. Splitting a stream at any points
//! gives the same lines as splitting it at once.

use std::borrow::Cow;

/// A piece of a line found in one input chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment<'a> {
    /// Bytes of the fragment, trailing `\r` removed. May be empty.
    pub text: Cow<'a, [u8]>,
    /// The fragment continues a line already started by a previous fragment.
    pub continues: bool,
    /// A `\n` follows the fragment in the input.
    pub terminated: bool,
}

#[derive(Debug, Clone)]
pub struct Segmenter {
    last_complete: bool,
    /// Some text of the incomplete line was already handed out.
    line_started: bool,
    /// `\r` bytes at the end of the previous chunk, kept until we know
    /// whether they end the line or sit inside it.
    held_cr: usize,
}

impl Default for Segmenter {
    fn default() -> Self {
        Segmenter {
            last_complete: true,
            line_started: false,
            held_cr: 0,
        }
    }
}

impl Segmenter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True if the last fragment seen was terminated by `\n`.
    #[must_use]
    pub fn last_complete(&self) -> bool {
        self.last_complete
    }

    /// Forget about any incomplete line.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Split `data` and hand every fragment to `consume`, in input order.
    ///
    /// Empty fragments (blank lines, `\r\n` runs) are passed on as well, so a
    /// consumer that holds an incomplete line learns about its terminator.
    pub fn split<'a, F>(&mut self, data: &'a [u8], mut consume: F)
    where
        F: FnMut(Fragment<'a>),
    {
        let mut pos = 0;
        while pos < data.len() {
            let rest = &data[pos..];
            let eol = rest.iter().position(|&b| b == b'\n');
            let terminated = eol.is_some();
            let raw = &rest[..eol.unwrap_or(rest.len())];
            let mut stripped = raw;
            while let [head @ .., b'\r'] = stripped {
                stripped = head;
            }

            let text = if !stripped.is_empty() && self.held_cr > 0 {
                let mut text = vec![b'\r'; self.held_cr];
                text.extend_from_slice(stripped);
                Cow::Owned(text)
            } else {
                Cow::Borrowed(stripped)
            };

            consume(Fragment {
                text,
                continues: self.line_started,
                terminated,
            });

            if terminated {
                self.line_started = false;
                self.held_cr = 0;
            } else {
                if !stripped.is_empty() {
                    self.line_started = true;
                    self.held_cr = 0;
                }
                self.held_cr += raw.len() - stripped.len();
            }
            self.last_complete = terminated;
            pos += eol.map_or(rest.len(), |eol| eol + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(segmenter: &mut Segmenter, data: &[u8]) -> Vec<(Vec<u8>, bool, bool)> {
        let mut out = Vec::new();
        segmenter.split(data, |f| {
            out.push((f.text.into_owned(), f.continues, f.terminated));
        });
        out
    }

    #[test]
    fn test_split_single_line() {
        let mut segmenter = Segmenter::new();
        let out = collect(&mut segmenter, b"Test message\n");
        assert_eq!(out, vec![(b"Test message".to_vec(), false, true)]);
        assert!(segmenter.last_complete());
    }

    #[test]
    fn test_split_partial_line() {
        let mut segmenter = Segmenter::new();
        let out = collect(&mut segmenter, b"Begin");
        assert_eq!(out, vec![(b"Begin".to_vec(), false, false)]);
        assert!(!segmenter.last_complete());

        let out = collect(&mut segmenter, b"End\n");
        assert_eq!(out, vec![(b"End".to_vec(), true, true)]);
        assert!(segmenter.last_complete());
    }

    #[test]
    fn test_split_strips_carriage_returns() {
        let mut segmenter = Segmenter::new();
        let out = collect(&mut segmenter, b"a\r\r\nb\r\n");
        assert_eq!(
            out,
            vec![(b"a".to_vec(), false, true), (b"b".to_vec(), false, true)]
        );
    }

    #[test]
    fn test_split_reports_empty_fragments() {
        let mut segmenter = Segmenter::new();
        let out = collect(&mut segmenter, b"\r\n\n");
        assert_eq!(
            out,
            vec![(Vec::new(), false, true), (Vec::new(), false, true)]
        );
    }

    #[test]
    fn test_split_empty_input_keeps_state() {
        let mut segmenter = Segmenter::new();
        collect(&mut segmenter, b"partial");
        assert!(collect(&mut segmenter, b"").is_empty());
        assert!(!segmenter.last_complete());
    }

    #[test]
    fn test_split_holds_carriage_return_at_chunk_end() {
        let mut segmenter = Segmenter::new();
        let out = collect(&mut segmenter, b"abc\r");
        assert_eq!(out, vec![(b"abc".to_vec(), false, false)]);

        let out = collect(&mut segmenter, b"def\n");
        assert_eq!(out, vec![(b"\rdef".to_vec(), true, true)]);
    }

    #[test]
    fn test_split_drops_held_carriage_return_at_eol() {
        let mut segmenter = Segmenter::new();
        collect(&mut segmenter, b"abc\r");
        let out = collect(&mut segmenter, b"\n");
        assert_eq!(out, vec![(Vec::new(), true, true)]);
    }

    #[test]
    fn test_split_blank_partial_does_not_continue() {
        let mut segmenter = Segmenter::new();
        collect(&mut segmenter, b"prev\n\r");
        assert!(!segmenter.last_complete());

        let out = collect(&mut segmenter, b"x\n");
        assert_eq!(out, vec![(b"\rx".to_vec(), false, true)]);
    }

    #[test]
    fn test_reset() {
        let mut segmenter = Segmenter::new();
        collect(&mut segmenter, b"partial");
        segmenter.reset();
        let out = collect(&mut segmenter, b"next\n");
        assert_eq!(out, vec![(b"next".to_vec(), false, true)]);
    }
}
