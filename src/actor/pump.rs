//! Stream Pump: Dedicated thread relaying a backend stream into a channel.
//!
//! The pump runs one backend request on its own thread and turns the
//! deltas it produces into [`StreamEvent`]s on an unbounded FIFO channel.
//! The foreground loop drains that channel without blocking.
//!
//! Guarantees:
//! - zero or more cumulative `Chunk`s, then exactly one terminal event
//! - a transport failure yields `Error`; nothing is sent after it
//! - after cancellation no further chunks are enqueued, and the terminal
//!   event is `Done` even if the backend failed while shutting down

use super::cancel::CancelToken;
use super::messages::StreamEvent;
use crate::client::{ChatBackend, ChatRequest};
use crate::error::{ChatError, Result};
use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

/// Pump actor that streams one response in the background.
pub struct StreamPump {
    /// Handle to the pump thread.
    handle: Option<JoinHandle<()>>,
    /// Cancellation flag shared with the thread.
    cancel: CancelToken,
    /// Receiver for stream events.
    events: Receiver<StreamEvent>,
}

/// Result of a non-blocking drain.
#[derive(Debug, Default)]
pub struct Drained {
    /// Events in emission order.
    pub events: Vec<StreamEvent>,
    /// Whether the producer has gone away.
    pub disconnected: bool,
}

impl StreamPump {
    /// Spawn a pump thread for `request`.
    pub fn spawn(backend: Arc<dyn ChatBackend>, request: ChatRequest) -> Result<Self> {
        let cancel = CancelToken::new();
        let thread_cancel = cancel.clone();
        let (tx, rx) = unbounded();

        let handle = thread::Builder::new()
            .name("chatwheel-pump".to_string())
            .spawn(move || {
                Self::run(backend.as_ref(), &request, &thread_cancel, &tx);
            })
            .map_err(|e| ChatError::Spawn(e.to_string()))?;

        Ok(Self {
            handle: Some(handle),
            cancel,
            events: rx,
        })
    }

    /// Get a reference to the event receiver.
    #[inline]
    pub const fn receiver(&self) -> &Receiver<StreamEvent> {
        &self.events
    }

    /// A handle to this pump's cancellation flag.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Signal the pump to stop at its next unit of input.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Take every event queued so far without blocking.
    pub fn drain(&self) -> Drained {
        let mut drained = Drained::default();
        loop {
            match self.events.try_recv() {
                Ok(event) => drained.events.push(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    drained.disconnected = true;
                    break;
                }
            }
        }
        drained
    }

    /// Wait for the pump thread to finish.
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    /// Main pump body.
    fn run(
        backend: &dyn ChatBackend,
        request: &ChatRequest,
        cancel: &CancelToken,
        tx: &Sender<StreamEvent>,
    ) {
        let mut content = String::new();
        let mut receiver_gone = false;

        let result = backend.stream_chat(request, cancel, &mut |delta| {
            if receiver_gone || delta.is_empty() || cancel.is_cancelled() {
                return;
            }
            content.push_str(delta);
            let chunk = StreamEvent::Chunk {
                content: content.clone(),
            };
            if tx.send(chunk).is_err() {
                // Receiver dropped, stop reading
                receiver_gone = true;
                cancel.cancel();
            }
        });

        if receiver_gone {
            return;
        }

        let terminal = match result {
            Ok(()) => StreamEvent::Done,
            Err(err) if cancel.is_cancelled() => {
                debug!(%err, "backend error after cancellation");
                StreamEvent::Done
            }
            Err(err) => {
                warn!(%err, "chat stream failed");
                StreamEvent::Error {
                    message: err.to_string(),
                }
            }
        };
        let _ = tx.send(terminal);
    }
}

impl Drop for StreamPump {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for StreamPump {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamPump")
            .field("cancelled", &self.cancel.is_cancelled())
            .field("queued", &self.events.len())
            .finish_non_exhaustive()
    }
}
