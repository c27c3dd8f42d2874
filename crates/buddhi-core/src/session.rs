//! One conversation: committed messages plus the exchange in progress.
//!
//! An exchange runs `submit` -> endpoint call -> `receive` -> `step`... until
//! the reveal finishes. The endpoint call itself happens outside the session
//! so the caller can keep its event loop responsive; [`Session::ask`] glues
//! the pieces together for callers that can simply await.

use std::time::Duration;
use thiserror::Error;

use crate::endpoint::{Endpoint, EndpointError};
use crate::reveal::{Completion, Reveal, RevealStep, StopHandle, MIN_REVEAL_DELAY};
use crate::state::{ChatMessage, ChatRole};

/// Committed when the endpoint call fails for any reason.
pub const ERROR_REPLY: &str = "Error fetching AI response.";

/// Revealed when the endpoint answers without a reply.
pub const FALLBACK_REPLY: &str = "Sorry, I couldn't fetch a response.";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("a reply is still in progress")]
    Busy,
}

/// A submitted question waiting for the endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub id: u64,
    pub question: String,
}

#[derive(Debug, Default)]
pub struct Session {
    /// Text being composed, not yet submitted.
    pub input: String,
    messages: Vec<ChatMessage>,
    in_flight: bool,
    awaiting: Option<u64>,
    next_id: u64,
    reveal: Option<Reveal>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// True from submission until the reply is committed.
    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// True while the endpoint call is outstanding.
    pub fn is_waiting(&self) -> bool {
        self.awaiting.is_some()
    }

    /// The reply prefix currently being revealed, if any.
    pub fn revealing(&self) -> Option<&str> {
        self.reveal.as_ref().map(Reveal::visible)
    }

    /// Previously asked questions, oldest first.
    pub fn questions(&self) -> impl Iterator<Item = &str> + '_ {
        self.messages
            .iter()
            .filter(|m| m.role == ChatRole::User)
            .map(|m| m.text.as_str())
    }

    /// Start an exchange for `text`.
    ///
    /// Blank text is ignored (`Ok(None)`). Submitting while another exchange
    /// is in flight is rejected and leaves the session untouched.
    pub fn submit(&mut self, text: &str) -> Result<Option<Exchange>, SessionError> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        if self.in_flight {
            return Err(SessionError::Busy);
        }

        self.next_id += 1;
        let id = self.next_id;

        self.messages.push(ChatMessage::user(text));
        self.input.clear();
        self.in_flight = true;
        self.awaiting = Some(id);

        tracing::info!(exchange = id, "question submitted");
        Ok(Some(Exchange {
            id,
            question: text.to_string(),
        }))
    }

    /// Hand the endpoint's answer for exchange `id` to the session.
    ///
    /// Returns false when the answer belongs to an exchange that is no longer
    /// awaited (e.g. the session was reset meanwhile); it is dropped.
    pub fn receive(&mut self, id: u64, result: Result<String, EndpointError>) -> bool {
        if self.awaiting != Some(id) {
            tracing::debug!(exchange = id, "dropping stale reply");
            return false;
        }
        self.awaiting = None;

        match result {
            Ok(reply) => {
                let reply = if reply.is_empty() {
                    FALLBACK_REPLY.to_string()
                } else {
                    reply
                };
                tracing::info!(exchange = id, chars = reply.chars().count(), "reply received");
                self.reveal = Some(Reveal::new(reply));
            }
            Err(e) => {
                tracing::warn!(exchange = id, error = %e, "endpoint call failed");
                self.messages.push(ChatMessage::assistant(ERROR_REPLY));
                self.in_flight = false;
            }
        }
        true
    }

    /// Advance the active reveal by one character.
    ///
    /// On the final step the revealed text is committed as an assistant
    /// message and the exchange concludes. Returns `None` when nothing is
    /// being revealed.
    pub fn step(&mut self) -> Option<RevealStep> {
        let step = self.reveal.as_mut()?.next()?;

        if let RevealStep::Finished(done) = &step {
            if done.cancelled {
                tracing::info!(chars = done.text.chars().count(), "reveal stopped early");
            }
            self.messages.push(ChatMessage::assistant(done.text.clone()));
            self.reveal = None;
            self.in_flight = false;
        }
        Some(step)
    }

    /// Stop the active reveal; the text shown so far is kept. No-op otherwise.
    pub fn cancel(&mut self) {
        if let Some(reveal) = &self.reveal {
            reveal.stop_handle().raise();
        }
    }

    /// Stop handle of the active reveal, for stopping it from another task.
    pub fn stop_handle(&self) -> Option<StopHandle> {
        self.reveal.as_ref().map(Reveal::stop_handle)
    }

    /// Forget everything, including an exchange still in progress.
    pub fn reset(&mut self) {
        self.cancel();
        self.messages.clear();
        self.input.clear();
        self.reveal = None;
        self.awaiting = None;
        self.in_flight = false;
        tracing::info!("session reset");
    }

    /// Copy a previous question back into the input.
    pub fn reuse(&mut self, index: usize) -> bool {
        let picked = self.questions().nth(index).map(str::to_string);
        match picked {
            Some(question) => {
                self.input = question;
                true
            }
            None => false,
        }
    }

    /// Submit `text`, await the endpoint and queue the reply for revealing.
    pub async fn ask<E: Endpoint + ?Sized>(
        &mut self,
        endpoint: &E,
        text: &str,
    ) -> Result<Option<u64>, SessionError> {
        let Some(exchange) = self.submit(text)? else {
            return Ok(None);
        };
        let result = endpoint.ask(&exchange.question).await;
        self.receive(exchange.id, result);
        Ok(Some(exchange.id))
    }

    /// Step the active reveal once per `delay` until it finishes.
    ///
    /// Delays shorter than [`MIN_REVEAL_DELAY`] are raised to it.
    ///
    /// `publish` sees every step along with the session. The first character
    /// appears immediately; the completion follows one `delay` after the last
    /// character.
    pub async fn reveal_paced<F>(&mut self, delay: Duration, mut publish: F) -> Option<Completion>
    where
        F: FnMut(&Session, &RevealStep),
    {
        self.reveal.as_ref()?;

        let mut ticks = tokio::time::interval(delay.max(MIN_REVEAL_DELAY));
        loop {
            ticks.tick().await;
            let step = self.step()?;
            publish(self, &step);
            if let RevealStep::Finished(done) = step {
                return Some(done);
            }
        }
    }
}
