//! Ollama HTTP client.
//!
//! Talks to the native Ollama API over blocking HTTP:
//!
//! - `GET  /api/tags` lists installed models
//! - `POST /api/chat` streams a response as newline-delimited JSON
//! - `POST /api/pull` streams download progress as newline-delimited JSON
//!
//! Streaming reads are line-by-line. The cancellation token is checked
//! before every line, and a line that does not decode is skipped so one bad
//! frame cannot abort an otherwise healthy stream.

use super::{ChatBackend, ChatRequest};
use crate::actor::CancelToken;
use crate::error::{ChatError, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::io::{BufRead, BufReader};
use std::ops::ControlFlow;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Default Ollama endpoint.
pub const DEFAULT_URL: &str = "http://localhost:11434";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const READ_TIMEOUT: Duration = Duration::from_secs(30);
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Blocking client for an Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
    agent: ureq::Agent,
}

impl OllamaClient {
    /// Create a client with the default timeouts.
    pub fn new(base_url: &str) -> Self {
        Self::with_timeouts(base_url, CONNECT_TIMEOUT, READ_TIMEOUT)
    }

    /// Create a client with explicit connect and per-read timeouts.
    pub fn with_timeouts(base_url: &str, connect: Duration, read: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(connect)
            .timeout_read(read)
            .build();
        Self {
            base_url: normalize_url(base_url),
            agent,
        }
    }

    /// The server base URL, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Point the client at another server.
    pub fn set_base_url(&mut self, base_url: &str) {
        self.base_url = normalize_url(base_url);
    }

    /// List the names of installed models.
    pub fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .agent
            .get(&self.endpoint("/api/tags"))
            .call()
            .map_err(request_error)?;
        let tags: TagsResponse = serde_json::from_reader(response.into_reader())?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Whether the server answers at all.
    pub fn check_connection(&self) -> bool {
        match self.agent.get(&self.base_url).timeout(PROBE_TIMEOUT).call() {
            Ok(_) | Err(ureq::Error::Status(..)) => true,
            Err(ureq::Error::Transport(err)) => {
                debug!(url = %self.base_url, %err, "server unreachable");
                false
            }
        }
    }

    /// Download a model, reporting progress for every status frame.
    pub fn pull_model(
        &self,
        name: &str,
        cancel: &CancelToken,
        on_progress: &mut dyn FnMut(&PullProgress),
    ) -> Result<()> {
        let body = serde_json::json!({ "name": name, "stream": true });
        let response = self.post_json("/api/pull", &body)?;

        read_frames(response, cancel, |frame: PullFrame| {
            if let Some(error) = frame.error {
                return Err(ChatError::Server(error));
            }
            on_progress(&frame.progress);
            Ok(ControlFlow::Continue(()))
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn post_json(&self, path: &str, body: &serde_json::Value) -> Result<impl BufRead> {
        let response = self
            .agent
            .post(&self.endpoint(path))
            .set("Content-Type", "application/json")
            .send_string(&body.to_string())
            .map_err(request_error)?;
        Ok(BufReader::new(response.into_reader()))
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new(DEFAULT_URL)
    }
}

impl ChatBackend for OllamaClient {
    fn stream_chat(
        &self,
        request: &ChatRequest,
        cancel: &CancelToken,
        on_delta: &mut dyn FnMut(&str),
    ) -> Result<()> {
        if cancel.is_cancelled() {
            return Ok(());
        }

        let body = serde_json::json!({
            "model": request.model,
            "messages": request.messages(),
            "stream": true,
        });
        let started = Instant::now();
        let response = self.post_json("/api/chat", &body)?;
        info!(model = %request.model, turns = request.turns.len(), "chat stream opened");

        let mut frames = 0usize;
        let result = read_frames(response, cancel, |frame: ChatFrame| {
            if let Some(error) = frame.error {
                return Err(ChatError::Server(error));
            }
            frames += 1;
            if let Some(message) = frame.message {
                if !message.content.is_empty() {
                    on_delta(&message.content);
                }
            }
            Ok(if frame.done {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            })
        });

        debug!(
            frames,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "chat stream closed"
        );
        result
    }
}

/// Progress report from a model pull.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PullProgress {
    /// Status line, e.g. `"pulling manifest"` or `"success"`.
    #[serde(default)]
    pub status: String,
    /// Layer digest being downloaded.
    #[serde(default)]
    pub digest: Option<String>,
    /// Total bytes of the current layer.
    #[serde(default)]
    pub total: Option<u64>,
    /// Bytes downloaded so far.
    #[serde(default)]
    pub completed: Option<u64>,
}

impl PullProgress {
    /// Completed fraction of the current layer, when known.
    ///
    /// A layer with a known size that has not started reports `Some(0.0)`.
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction(&self) -> Option<f64> {
        match (self.total, self.completed) {
            (Some(total), Some(completed)) if total > 0 => {
                Some((completed as f64 / total as f64).min(1.0))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
struct TagModel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ChatFrame {
    #[serde(default)]
    message: Option<FrameMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FrameMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct PullFrame {
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    progress: PullProgress,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

fn normalize_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn request_error(err: ureq::Error) -> ChatError {
    match err {
        ureq::Error::Status(code, response) => {
            let body = response.into_string().unwrap_or_default();
            ChatError::Status {
                code,
                message: error_message(&body),
            }
        }
        ureq::Error::Transport(transport) => ChatError::Transport(transport.to_string()),
    }
}

/// Pull the `error` field out of an Ollama error body, if there is one.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .map_or_else(|_| body.trim().to_string(), |b| b.error)
}

/// Read newline-delimited JSON frames until EOF, cancellation or `Break`.
fn read_frames<T, R, F>(mut reader: R, cancel: &CancelToken, mut on_frame: F) -> Result<()>
where
    T: DeserializeOwned,
    R: BufRead,
    F: FnMut(T) -> Result<ControlFlow<()>>,
{
    let mut line = Vec::new();
    loop {
        if cancel.is_cancelled() {
            debug!("stream read cancelled");
            return Ok(());
        }

        line.clear();
        let read = reader
            .read_until(b'\n', &mut line)
            .map_err(|e| ChatError::Transport(format!("stream read failed: {e}")))?;
        if read == 0 {
            return Ok(());
        }
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        match serde_json::from_slice::<T>(&line) {
            Ok(frame) => {
                if on_frame(frame)?.is_break() {
                    return Ok(());
                }
            }
            Err(err) => debug!(%err, "skipping undecodable frame"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn collect_chat(ndjson: &str, cancel: &CancelToken) -> (Vec<String>, Result<()>) {
        let mut deltas = Vec::new();
        let result = read_frames(Cursor::new(ndjson.as_bytes()), cancel, |frame: ChatFrame| {
            if let Some(error) = frame.error {
                return Err(ChatError::Server(error));
            }
            if let Some(message) = frame.message {
                deltas.push(message.content);
            }
            Ok(if frame.done {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            })
        });
        (deltas, result)
    }

    #[test]
    fn test_read_frames_skips_bad_lines() {
        let ndjson = concat!(
            r#"{"message":{"role":"assistant","content":"Hel"},"done":false}"#,
            "\n\n{not json}\n",
            r#"{"message":{"role":"assistant","content":"lo"},"done":false}"#,
            "\n",
            r#"{"message":{"role":"assistant","content":""},"done":true}"#,
            "\n",
            r#"{"message":{"role":"assistant","content":"ignored"},"done":false}"#,
            "\n",
        );
        let (deltas, result) = collect_chat(ndjson, &CancelToken::new());
        assert!(result.is_ok());
        assert_eq!(deltas, ["Hel", "lo", ""]);
    }

    #[test]
    fn test_read_frames_invalid_utf8_skipped() {
        let mut bytes = b"\xff\xfe\n".to_vec();
        bytes.extend_from_slice(br#"{"message":{"content":"ok"},"done":true}"#);
        let mut seen = Vec::new();
        let result = read_frames(Cursor::new(bytes), &CancelToken::new(), |f: ChatFrame| {
            seen.push(f.message.map(|m| m.content).unwrap_or_default());
            Ok(ControlFlow::Continue(()))
        });
        assert!(result.is_ok());
        assert_eq!(seen, ["ok"]);
    }

    #[test]
    fn test_read_frames_error_frame() {
        let ndjson = "{\"error\":\"model 'nope' not found\"}\n";
        let (_, result) = collect_chat(ndjson, &CancelToken::new());
        assert!(matches!(result, Err(ChatError::Server(msg)) if msg.contains("nope")));
    }

    #[test]
    fn test_read_frames_stops_when_cancelled() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let (deltas, result) = collect_chat("{\"message\":{\"content\":\"x\"}}\n", &cancel);
        assert!(result.is_ok());
        assert!(deltas.is_empty());
    }

    #[test]
    fn test_error_message_extracts_field() {
        assert_eq!(error_message(r#"{"error":"boom"}"#), "boom");
        assert_eq!(error_message(" plain text \n"), "plain text");
    }

    #[test]
    fn test_pull_progress_fraction() {
        let progress = PullProgress {
            status: "pulling".into(),
            digest: None,
            total: Some(200),
            completed: Some(50),
        };
        assert_eq!(progress.fraction(), Some(0.25));
        assert_eq!(PullProgress::default().fraction(), None);
    }

    #[test]
    fn test_pull_progress_fraction_at_start_of_layer() {
        let progress = PullProgress {
            status: "pulling".into(),
            digest: None,
            total: Some(200),
            completed: Some(0),
        };
        assert_eq!(progress.fraction(), Some(0.0));
        let empty_layer = PullProgress {
            total: Some(0),
            completed: Some(0),
            ..PullProgress::default()
        };
        assert_eq!(empty_layer.fraction(), None);
    }

    #[test]
    fn test_client_normalizes_url() {
        let mut client = OllamaClient::new(" http://host:11434/ ");
        assert_eq!(client.base_url(), "http://host:11434");
        client.set_base_url("http://other//");
        assert_eq!(client.endpoint("/api/tags"), "http://other/api/tags");
    }
}
