//! Streaming Demo: Demonstrates paced rendering of a streamed response.
//!
//! This example simulates a model streaming a response with a reasoning
//! aside and a code fence, without needing an Ollama server. Every tick
//! is painted with the terminal painter; the summary at the end shows how
//! often the renderer patched in place versus rebuilding.

use chatwheel::render::{BlockFactory, TerminalPainter};
use chatwheel::{
    CancelToken, ChatBackend, ChatRequest, Conversation, PacingPolicy, RenderPath, TickOutcome,
};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Sample text to stream (simulating an LLM response).
const SAMPLE_TEXT: &str = r#"<think>The user wants a small example. A loop over a vector is enough.</think>Here is a short Rust program that sums a list:

```rust
fn main() {
    let numbers = vec![1, 2, 3, 4, 5];
    let total: i32 = numbers.iter().sum();
    println!("total = {total}");
}
```

The `iter().sum()` call folds the items with `+`, so there is no explicit loop.
"#;

/// Backend that emits the sample a few characters at a time.
struct Simulated {
    token_interval: Duration,
}

impl ChatBackend for Simulated {
    fn stream_chat(
        &self,
        _request: &ChatRequest,
        cancel: &CancelToken,
        on_delta: &mut dyn FnMut(&str),
    ) -> chatwheel::Result<()> {
        let mut rest = SAMPLE_TEXT;
        while !rest.is_empty() {
            if cancel.is_cancelled() {
                return Ok(());
            }
            let mut end = rest.len().min(4);
            while !rest.is_char_boundary(end) {
                end += 1;
            }
            let (token, tail) = rest.split_at(end);
            on_delta(token);
            rest = tail;
            thread::sleep(self.token_interval);
        }
        Ok(())
    }
}

fn main() -> std::io::Result<()> {
    println!("Chatwheel Streaming Demo");
    println!("========================\n");

    let backend = Arc::new(Simulated {
        token_interval: Duration::from_millis(10),
    });
    let mut conversation = Conversation::new(backend, BlockFactory::new(), PacingPolicy::default());
    conversation.set_model("simulated");
    if let Err(err) = conversation.send("Show me how to sum a list in Rust.") {
        eprintln!("send failed: {err}");
        return Ok(());
    }

    let width = crossterm::terminal::size().map_or(80, |(w, _)| w);
    let mut painter = TerminalPainter::new(width);
    let mut stdout = std::io::stdout();
    let (mut patched, mut rebuilt) = (0usize, 0usize);
    let start = Instant::now();

    let outcome = loop {
        let outcome = conversation.tick();
        if let TickOutcome::Advanced { path, .. } = &outcome {
            match path {
                RenderPath::Patched { .. } => patched += 1,
                RenderPath::Rebuilt { .. } => rebuilt += 1,
            }
            painter.paint(&mut stdout, conversation.live_views(), *path)?;
        }
        match outcome.next_delay() {
            Some(delay) => thread::sleep(delay),
            None => break outcome,
        }
    };
    painter.finish(&mut stdout)?;

    println!();
    println!("Outcome:       {}", if outcome.is_terminal() { "complete" } else { "idle" });
    println!("Elapsed:       {:.2?}", start.elapsed());
    println!("Patched ticks: {patched}");
    println!("Rebuilt ticks: {rebuilt}");
    println!("History turns: {}", conversation.history().len());
    Ok(())
}
