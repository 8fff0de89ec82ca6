//! Conversation: Foreground owner of history and the live generation.
//!
//! The conversation is the entry point for hosts. It keeps the running list
//! of turns, starts at most one generation at a time and, on every
//! [`Conversation::tick`], drains the pump without blocking and hands the
//! events to the session's scheduler.
//!
//! Hosts either drive `tick` from their own timer, sleeping for
//! [`TickOutcome::next_delay`] between calls, or use
//! [`Conversation::run_to_completion`] when blocking is acceptable.

use super::messages::{SessionEvent, StreamEvent};
use super::pump::StreamPump;
use crate::client::{ChatBackend, ChatRequest};
use crate::error::{ChatError, Result};
use crate::render::ViewFactory;
use crate::session::{PacingPolicy, SessionPhase, TickOutcome, TypewriterScheduler};
use crate::turn::ChatTurn;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use tracing::{debug, info, warn};

/// The generation currently streaming.
struct LiveGeneration<F: ViewFactory> {
    /// Background producer.
    pump: StreamPump,
    /// Paces the visible text.
    scheduler: TypewriterScheduler<F>,
    /// Whether the pump's terminal event has been drained.
    terminal_seen: bool,
}

/// A chat conversation with at most one live generation.
pub struct Conversation<F: ViewFactory + Clone> {
    /// Where responses come from.
    backend: Arc<dyn ChatBackend>,
    /// Cloned into every new session.
    factory: F,
    /// Pacing for new sessions.
    policy: PacingPolicy,
    /// Selected model.
    model: Option<String>,
    /// Prepended to every request when set.
    system_prompt: Option<String>,
    /// Completed turns, oldest first.
    history: Vec<ChatTurn>,
    /// The streaming response, if any.
    live: Option<LiveGeneration<F>>,
    /// Lifecycle notifications.
    events_tx: Sender<SessionEvent>,
    events_rx: Receiver<SessionEvent>,
}

impl<F: ViewFactory + Clone> Conversation<F> {
    /// Create an empty conversation.
    pub fn new(backend: Arc<dyn ChatBackend>, factory: F, policy: PacingPolicy) -> Self {
        let (events_tx, events_rx) = unbounded();
        Self {
            backend,
            factory,
            policy,
            model: None,
            system_prompt: None,
            history: Vec::new(),
            live: None,
            events_tx,
            events_rx,
        }
    }

    /// Select the model for subsequent requests.
    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = Some(model.into());
    }

    /// The selected model.
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    /// Set or clear the system prompt. Blank prompts clear it.
    pub fn set_system_prompt(&mut self, prompt: Option<&str>) {
        self.system_prompt = prompt
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);
    }

    /// The system prompt, if any.
    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    /// Replace the pacing used by future sessions.
    pub fn set_policy(&mut self, policy: PacingPolicy) {
        self.policy = policy;
    }

    /// Completed turns, oldest first.
    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    /// Subscribe to lifecycle notifications.
    pub fn session_events(&self) -> Receiver<SessionEvent> {
        self.events_rx.clone()
    }

    /// Whether a response is streaming.
    pub const fn is_generating(&self) -> bool {
        self.live.is_some()
    }

    /// Phase of the live session.
    pub fn phase(&self) -> Option<SessionPhase> {
        self.live.as_ref().map(|live| live.scheduler.phase())
    }

    /// Views of the message being generated. Empty when idle.
    pub fn live_views(&self) -> &[F::View] {
        self.live
            .as_ref()
            .map_or(&[][..], |live| live.scheduler.views())
    }

    /// Text of the message being generated. Empty when idle.
    pub fn live_text(&self) -> &str {
        self.live
            .as_ref()
            .map_or("", |live| live.scheduler.visible_text())
    }

    /// Send a user message and start streaming the response.
    ///
    /// # Errors
    ///
    /// - [`ChatError::SessionActive`] while another response is streaming
    /// - [`ChatError::EmptyMessage`] for blank input
    /// - [`ChatError::NoModel`] if no model is selected
    /// - [`ChatError::Spawn`] if the pump thread cannot start
    pub fn send(&mut self, text: &str) -> Result<()> {
        if self.live.is_some() {
            return Err(ChatError::SessionActive);
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let model = self.model.clone().ok_or(ChatError::NoModel)?;

        self.history.push(ChatTurn::user(text));
        let request = ChatRequest::new(model.clone(), self.history.clone())
            .with_system_prompt(self.system_prompt.as_deref());

        let pump = match StreamPump::spawn(Arc::clone(&self.backend), request) {
            Ok(pump) => pump,
            Err(err) => {
                self.history.pop();
                return Err(err);
            }
        };
        let scheduler =
            TypewriterScheduler::new(self.policy.clone(), self.factory.clone(), pump.cancel_token());

        info!(%model, turns = self.history.len(), "generation started");
        self.live = Some(LiveGeneration {
            pump,
            scheduler,
            terminal_seen: false,
        });
        self.emit(SessionEvent::Started { model });
        Ok(())
    }

    /// Drain queued stream events and advance the live session one step.
    ///
    /// Never blocks. Returns [`TickOutcome::Idle`] when nothing is streaming.
    pub fn tick(&mut self) -> TickOutcome {
        let outcome = {
            let Some(live) = self.live.as_mut() else {
                return TickOutcome::Idle;
            };

            let drained = live.pump.drain();
            let mut events = drained.events;
            if events.iter().any(StreamEvent::is_terminal) {
                live.terminal_seen = true;
            }
            if drained.disconnected && !live.terminal_seen {
                live.terminal_seen = true;
                events.push(if live.scheduler.phase() == SessionPhase::Cancelling {
                    StreamEvent::Done
                } else {
                    StreamEvent::Error {
                        message: "stream ended unexpectedly".to_string(),
                    }
                });
            }
            live.scheduler.tick(events)
        };

        match &outcome {
            TickOutcome::Advanced { .. } => {
                let visible_len = self.live_text().len();
                self.emit(SessionEvent::Advanced { visible_len });
            }
            TickOutcome::Finished { content } => {
                info!(bytes = content.len(), "generation finished");
                self.history.push(ChatTurn::assistant(content.clone()));
                self.end_live();
                self.emit(SessionEvent::Finished {
                    visible_len: content.len(),
                });
            }
            TickOutcome::Failed { message, partial } => {
                warn!(%message, partial = partial.len(), "generation failed");
                if !partial.is_empty() {
                    self.history.push(ChatTurn::assistant(partial.clone()));
                }
                self.end_live();
                self.emit(SessionEvent::Failed {
                    message: message.clone(),
                });
            }
            TickOutcome::Waiting { .. } | TickOutcome::Idle => {}
        }
        outcome
    }

    /// Stop the live generation, keeping what is already visible.
    ///
    /// The session finishes on a later tick, once the pump confirms.
    /// Returns `false` if nothing was streaming.
    pub fn cancel(&mut self) -> bool {
        let cancelled = self
            .live
            .as_mut()
            .is_some_and(|live| live.scheduler.cancel());
        if cancelled {
            self.emit(SessionEvent::Cancelled);
        }
        cancelled
    }

    /// Drop all turns, abandoning any live generation.
    pub fn clear(&mut self) {
        if let Some(live) = self.live.take() {
            live.pump.cancel();
            debug!("live generation abandoned");
        }
        self.history.clear();
    }

    /// Replace the history wholesale.
    ///
    /// # Errors
    ///
    /// [`ChatError::SessionActive`] while a response is streaming.
    pub fn load_history(&mut self, turns: Vec<ChatTurn>) -> Result<()> {
        if self.live.is_some() {
            return Err(ChatError::SessionActive);
        }
        self.history = turns;
        Ok(())
    }

    /// Tick until the live session ends, sleeping between ticks.
    ///
    /// `on_tick` sees the conversation after every tick, e.g. to paint
    /// [`Conversation::live_views`]. Returns the terminal outcome, or
    /// [`TickOutcome::Idle`] if nothing was streaming.
    pub fn run_to_completion(&mut self, mut on_tick: impl FnMut(&Self, &TickOutcome)) -> TickOutcome {
        loop {
            let outcome = self.tick();
            on_tick(self, &outcome);
            match outcome.next_delay() {
                Some(delay) => thread::sleep(delay),
                None => return outcome,
            }
        }
    }

    fn end_live(&mut self) {
        if let Some(live) = self.live.take() {
            live.pump.join();
        }
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events_tx.send(event);
    }
}

impl<F: ViewFactory + Clone> std::fmt::Debug for Conversation<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conversation")
            .field("model", &self.model)
            .field("turns", &self.history.len())
            .field("generating", &self.live.is_some())
            .finish_non_exhaustive()
    }
}
