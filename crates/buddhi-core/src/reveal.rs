//! Character-by-character reveal of a reply string.
//!
//! A [`Reveal`] is an interruptible iterator: every call to `next()` makes one
//! more character visible, until the whole text is shown or the paired
//! [`StopHandle`] is raised. Pacing is left to whoever drives the iterator, so
//! the same type serves the TUI timer and the async driver in
//! [`crate::Session::reveal_paced`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Delay between two revealed characters unless configured otherwise.
pub const DEFAULT_REVEAL_DELAY: Duration = Duration::from_millis(30);

/// Shortest delay a driver will pace at; timers reject a zero period.
pub const MIN_REVEAL_DELAY: Duration = Duration::from_millis(1);

/// Shared stop flag for a reveal. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Final text of a reveal, emitted exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub cancelled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevealStep {
    /// One more character became visible.
    Advanced(char),
    /// The reveal ended, either fully shown or stopped early.
    Finished(Completion),
}

#[derive(Debug)]
pub struct Reveal {
    text: String,
    // byte offset of the visible prefix, always on a char boundary
    shown: usize,
    stop: StopHandle,
    finished: bool,
}

impl Reveal {
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_stop(text, StopHandle::new())
    }

    pub fn with_stop(text: impl Into<String>, stop: StopHandle) -> Self {
        Self {
            text: text.into(),
            shown: 0,
            stop,
            finished: false,
        }
    }

    /// The prefix revealed so far.
    pub fn visible(&self) -> &str {
        &self.text[..self.shown]
    }

    pub fn full_text(&self) -> &str {
        &self.text
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Number of characters still hidden.
    pub fn remaining(&self) -> usize {
        self.text[self.shown..].chars().count()
    }

    fn finish(&mut self) -> RevealStep {
        self.finished = true;
        let cancelled = self.shown < self.text.len();
        RevealStep::Finished(Completion {
            text: self.visible().to_string(),
            cancelled,
        })
    }
}

impl Iterator for Reveal {
    type Item = RevealStep;

    fn next(&mut self) -> Option<RevealStep> {
        if self.finished {
            return None;
        }
        if self.stop.is_raised() {
            return Some(self.finish());
        }
        match self.text[self.shown..].chars().next() {
            Some(c) => {
                self.shown += c.len_utf8();
                Some(RevealStep::Advanced(c))
            }
            None => Some(self.finish()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completion(reveal: &mut Reveal) -> Completion {
        loop {
            match reveal.next() {
                Some(RevealStep::Finished(c)) => return c,
                Some(RevealStep::Advanced(_)) => {}
                None => panic!("reveal ended without a completion"),
            }
        }
    }

    #[test]
    fn test_prefixes_grow_until_full_text() {
        let mut reveal = Reveal::new("Hello!");
        let mut last_len = 0;
        let mut prefixes = Vec::new();

        while let Some(step) = reveal.next() {
            if let RevealStep::Advanced(_) = step {
                assert!(reveal.visible().len() > last_len);
                last_len = reveal.visible().len();
                prefixes.push(reveal.visible().to_string());
            } else {
                assert_eq!(
                    step,
                    RevealStep::Finished(Completion {
                        text: "Hello!".to_string(),
                        cancelled: false,
                    })
                );
            }
        }

        assert_eq!(prefixes, vec!["H", "He", "Hel", "Hell", "Hello", "Hello!"]);
        assert!(reveal.is_finished());
    }

    #[test]
    fn test_empty_text_finishes_immediately() {
        let mut reveal = Reveal::new("");
        assert_eq!(
            reveal.next(),
            Some(RevealStep::Finished(Completion {
                text: String::new(),
                cancelled: false,
            }))
        );
        assert_eq!(reveal.next(), None);
        assert_eq!(reveal.visible(), "");
    }

    #[test]
    fn test_stop_commits_revealed_prefix_for_every_k() {
        let text = "abcdef";
        for k in 0..=text.len() {
            let mut reveal = Reveal::new(text);
            for _ in 0..k {
                assert!(matches!(reveal.next(), Some(RevealStep::Advanced(_))));
            }
            reveal.stop_handle().raise();

            let done = completion(&mut reveal);
            assert_eq!(done.text, &text[..k]);
            assert_eq!(done.cancelled, k < text.len());
        }
    }

    #[test]
    fn test_fused_after_finish() {
        let mut reveal = Reveal::new("a");
        assert_eq!(reveal.next(), Some(RevealStep::Advanced('a')));
        assert!(matches!(reveal.next(), Some(RevealStep::Finished(_))));
        assert_eq!(reveal.next(), None);
        assert_eq!(reveal.next(), None);
    }

    #[test]
    fn test_multibyte_characters_stay_on_boundaries() {
        let mut reveal = Reveal::new("नमस्ते 🙏");
        let mut count = 0;
        while let Some(RevealStep::Advanced(_)) = reveal.next() {
            count += 1;
            // slicing would panic off a char boundary
            assert!(reveal.full_text().starts_with(reveal.visible()));
        }
        assert_eq!(count, "नमस्ते 🙏".chars().count());
    }

    #[test]
    fn test_shared_stop_handle() {
        let stop = StopHandle::new();
        let mut reveal = Reveal::with_stop("xyz", stop.clone());
        reveal.next();
        assert_eq!(reveal.remaining(), 2);

        stop.raise();
        let done = completion(&mut reveal);
        assert_eq!(done.text, "x");
        assert!(done.cancelled);
    }
}
