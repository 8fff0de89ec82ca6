//! End-to-end conversation tests with scripted backends.
//!
//! Each test drives a real pump thread and the foreground tick loop, and
//! checks what ends up on screen and in the history.

use chatwheel::render::{BlockFactory, SegmentView};
use chatwheel::session::PacingTier;
use chatwheel::{
    CancelToken, ChatBackend, ChatError, ChatRequest, ChatTurn, Conversation, PacingPolicy, Role,
    SegmentKind, SessionEvent, SessionPhase, TickOutcome,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Replays fixed deltas, then optionally fails.
struct Scripted {
    deltas: Vec<&'static str>,
    fail_with: Option<&'static str>,
}

impl Scripted {
    fn ok(deltas: &[&'static str]) -> Arc<Self> {
        Arc::new(Self {
            deltas: deltas.to_vec(),
            fail_with: None,
        })
    }

    fn failing(deltas: &[&'static str], message: &'static str) -> Arc<Self> {
        Arc::new(Self {
            deltas: deltas.to_vec(),
            fail_with: Some(message),
        })
    }
}

impl ChatBackend for Scripted {
    fn stream_chat(
        &self,
        _request: &ChatRequest,
        cancel: &CancelToken,
        on_delta: &mut dyn FnMut(&str),
    ) -> chatwheel::Result<()> {
        for delta in &self.deltas {
            if cancel.is_cancelled() {
                return Ok(());
            }
            on_delta(delta);
        }
        match self.fail_with {
            Some(message) => Err(ChatError::Transport(message.to_string())),
            None => Ok(()),
        }
    }
}

/// Streams one delta, then waits for a release signal or cancellation.
struct Gated {
    release: Arc<AtomicBool>,
}

impl ChatBackend for Gated {
    fn stream_chat(
        &self,
        _request: &ChatRequest,
        cancel: &CancelToken,
        on_delta: &mut dyn FnMut(&str),
    ) -> chatwheel::Result<()> {
        on_delta("Hello, ");
        while !cancel.is_cancelled() && !self.release.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(1));
        }
        on_delta("world and everything after it");
        Ok(())
    }
}

/// Exits without reporting success or failure.
struct Vanishing;

impl ChatBackend for Vanishing {
    fn stream_chat(
        &self,
        _request: &ChatRequest,
        _cancel: &CancelToken,
        on_delta: &mut dyn FnMut(&str),
    ) -> chatwheel::Result<()> {
        on_delta("so");
        panic!("backend vanished");
    }
}

fn quick_policy() -> PacingPolicy {
    PacingPolicy::new(vec![PacingTier::new(0, 1, 0)], Duration::from_millis(1)).unwrap()
}

fn conversation(backend: Arc<dyn ChatBackend>) -> Conversation<BlockFactory> {
    let mut conversation = Conversation::new(backend, BlockFactory::new(), quick_policy());
    conversation.set_model("scripted");
    conversation
}

/// Tick until the next outcome that is not `Waiting`.
fn next_progress(conversation: &mut Conversation<BlockFactory>) -> TickOutcome {
    for _ in 0..5_000 {
        let outcome = conversation.tick();
        if !matches!(outcome, TickOutcome::Waiting { .. }) {
            return outcome;
        }
        thread::sleep(Duration::from_millis(1));
    }
    panic!("no progress within the tick budget");
}

#[test]
fn test_code_fence_response() {
    let mut conversation = conversation(Scripted::ok(&[
        "Here is code:\n```py",
        "thon\nprint(1)\n",
        "```",
    ]));
    conversation.send("show me python").unwrap();

    let mut saw_fast = false;
    let mut final_kinds = Vec::new();
    let outcome = conversation.run_to_completion(|conv, outcome| {
        if let TickOutcome::Advanced { path, .. } = outcome {
            saw_fast |= path.is_fast();
            final_kinds = conv.live_views().iter().map(SegmentView::kind).collect();
        }
    });

    assert!(saw_fast);
    assert_eq!(final_kinds, [SegmentKind::Text, SegmentKind::Code]);
    assert_eq!(
        outcome,
        TickOutcome::Finished {
            content: "Here is code:\n```python\nprint(1)\n```".into()
        }
    );
}

#[test]
fn test_think_aside_response() {
    let mut conversation = conversation(Scripted::ok(&["<think>hmm", "</think>", "The answer is 4."]));
    conversation.send("2+2?").unwrap();

    let mut languages = Vec::new();
    let mut last_views = Vec::new();
    conversation.run_to_completion(|conv, outcome| {
        if outcome.next_delay().is_some() {
            last_views = conv
                .live_views()
                .iter()
                .map(|v| (v.kind(), v.content().to_string()))
                .collect();
            languages.extend(conv.live_views().iter().filter_map(|v| v.language().map(str::to_string)));
        }
    });

    assert!(languages.is_empty());
    assert_eq!(
        last_views,
        [
            (SegmentKind::Reasoning, "hmm".to_string()),
            (SegmentKind::Text, "The answer is 4.".to_string())
        ]
    );
    assert_eq!(
        conversation.history().last(),
        Some(&ChatTurn::assistant("<think>hmm</think>The answer is 4."))
    );
}

#[test]
fn test_cumulative_chunks_end_in_full_text() {
    let mut conversation = conversation(Scripted::ok(&["H", "e", "l"]));
    let events = conversation.session_events();
    conversation.send("hi").unwrap();

    let outcome = conversation.run_to_completion(|_, _| {});
    assert_eq!(outcome, TickOutcome::Finished { content: "Hel".into() });

    let advanced: Vec<usize> = events
        .try_iter()
        .filter_map(|e| match e {
            SessionEvent::Advanced { visible_len } => Some(visible_len),
            _ => None,
        })
        .collect();
    assert_eq!(advanced, [1, 2, 3]);
}

#[test]
fn test_error_after_one_chunk_keeps_partial() {
    let mut conversation = conversation(Scripted::failing(&["Partial"], "connection reset"));
    let events = conversation.session_events();
    conversation.send("hi").unwrap();

    let outcome = conversation.run_to_completion(|_, _| {});
    let TickOutcome::Failed { message, partial } = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert!(message.contains("connection reset"));
    assert!("Partial".starts_with(&partial));

    assert!(!conversation.is_generating());
    let history = conversation.history();
    assert_eq!(history[0], ChatTurn::user("hi"));
    if partial.is_empty() {
        assert_eq!(history.len(), 1);
    } else {
        assert_eq!(history[1], ChatTurn::assistant(partial));
    }
    assert!(events
        .try_iter()
        .any(|e| matches!(e, SessionEvent::Failed { .. })));

    // The conversation accepts a new message after a failure.
    assert!(conversation.send("again").is_ok());
}

#[test]
fn test_send_rejected_while_session_live() {
    let release = Arc::new(AtomicBool::new(false));
    let mut conversation = conversation(Arc::new(Gated {
        release: Arc::clone(&release),
    }));
    conversation.send("first").unwrap();

    assert!(matches!(conversation.send("second"), Err(ChatError::SessionActive)));
    assert_eq!(conversation.history(), [ChatTurn::user("first")]);

    release.store(true, Ordering::SeqCst);
    conversation.run_to_completion(|_, _| {});
    assert_eq!(conversation.history().len(), 2);
    assert_eq!(conversation.history()[1].role, Role::Assistant);
}

#[test]
fn test_cancel_freezes_visible_text() {
    let release = Arc::new(AtomicBool::new(false));
    let mut conversation = conversation(Arc::new(Gated { release }));
    let events = conversation.session_events();
    conversation.send("go").unwrap();

    // Reveal part of the first delta, then cancel.
    assert!(matches!(next_progress(&mut conversation), TickOutcome::Advanced { .. }));
    assert!(matches!(next_progress(&mut conversation), TickOutcome::Advanced { .. }));
    let frozen = conversation.live_text().to_string();
    assert!(!frozen.is_empty());

    assert!(conversation.cancel());
    assert_eq!(conversation.phase(), Some(SessionPhase::Cancelling));
    assert!(!conversation.cancel());

    let mut ticks = 0;
    let outcome = conversation.run_to_completion(|conv, outcome| {
        ticks += 1;
        if outcome.next_delay().is_some() {
            assert_eq!(conv.live_text(), frozen);
        }
    });
    assert!(ticks < 5_000);
    assert_eq!(outcome, TickOutcome::Finished { content: frozen.clone() });
    assert_eq!(conversation.history().last(), Some(&ChatTurn::assistant(frozen)));
    assert!(events.try_iter().any(|e| e == SessionEvent::Cancelled));
}

#[test]
fn test_vanished_producer_fails_session() {
    let mut conversation = conversation(Arc::new(Vanishing));
    conversation.send("hi").unwrap();

    let outcome = conversation.run_to_completion(|_, _| {});
    assert!(matches!(outcome, TickOutcome::Failed { .. }));
    assert!(!conversation.is_generating());
}

#[test]
fn test_history_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("chat.json");

    let mut conversation = conversation(Scripted::ok(&["Sure."]));
    conversation.send("Can you help?").unwrap();
    conversation.run_to_completion(|_, _| {});
    chatwheel::history::save(&file, conversation.history()).unwrap();

    let mut restored = self::conversation(Scripted::ok(&[]));
    restored
        .load_history(chatwheel::history::load(&file).unwrap())
        .unwrap();
    assert_eq!(restored.history(), conversation.history());

    restored.clear();
    assert!(restored.history().is_empty());
    assert!(matches!(
        chatwheel::history::save(&file, restored.history()),
        Err(ChatError::Config(_))
    ));
}
