//! Streaming client for the remote generative backend.
//!
//! Each user interaction produces one fresh, one-shot, non-restartable view
//! stream. Failures never propagate to the caller: missing configuration,
//! empty context, and transport errors are all translated into yielded
//! content (fixed HTML blocks), so every stream ends with a `Done` event.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::catalog::AppDefinition;
use crate::interaction::InteractionData;
use crate::prompt;

/// Idle timeout between chunks. The transport has no policy of its own;
/// expiry is treated as an ordinary stream failure.
const CHUNK_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_MODEL: &str = "gemini-3-pro-preview";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("remote returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("stream timed out waiting for the next chunk")]
    Timeout,
}

/// A remote text-generation endpoint: one prompt in, raw text pieces out.
///
/// Implementations push each received piece through `chunks` as it arrives
/// and return `Ok(())` when the remote stream ends. A transport failure is
/// a returned error — possibly after some pieces were already sent. A
/// closed `chunks` receiver means the consumer is gone; implementations
/// should stop sending and return `Ok(())`.
#[async_trait]
pub trait GenerativeBackend: Send + Sync + 'static {
    /// Whether a credential is configured. When false, `stream_view` makes
    /// no remote call and yields the fixed configuration-error block.
    fn is_configured(&self) -> bool {
        true
    }

    async fn generate(&self, prompt: String, chunks: mpsc::Sender<String>)
    -> Result<(), ClientError>;
}

/// Event yielded by a [`ViewStream`].
#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent {
    /// One verbatim text fragment, in arrival order.
    Fragment(String),
    /// The stream ended. On failure the error text is mirrored here in
    /// addition to the kernel-panic fragment already yielded.
    Done { error: Option<String> },
}

/// Handle to one in-flight view stream.
///
/// The stream cannot be restarted; every interaction gets a fresh one.
/// `cancel` must be invoked on every state transition that invalidates the
/// stream — the remote call may still complete, but nothing further is
/// yielded. Dropping the handle cancels too.
pub struct ViewStream {
    rx: mpsc::Receiver<StreamEvent>,
    cancel: CancellationToken,
}

impl ViewStream {
    /// Next event, or `None` once the stream is finished or cancelled.
    pub async fn next(&mut self) -> Option<StreamEvent> {
        self.rx.recv().await
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token for cancelling from outside once the handle has been handed to
    /// a consumer task.
    pub fn cancel_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl Drop for ViewStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Start a one-shot view stream for the given interaction history.
///
/// Short-circuits (no remote call): unconfigured backend yields exactly one
/// configuration-error fragment; empty history yields exactly one waiting
/// fragment. Otherwise the prompt is built from the history and streamed;
/// whitespace-only chunks are skipped, everything else is yielded verbatim.
pub fn stream_view(
    backend: Arc<dyn GenerativeBackend>,
    history: Vec<InteractionData>,
    max_history: usize,
    catalog: Vec<AppDefinition>,
) -> ViewStream {
    let (tx, rx) = mpsc::channel(64);
    let cancel = CancellationToken::new();
    let child = cancel.clone();
    tokio::spawn(async move {
        run_stream(backend, history, max_history, catalog, tx, child).await;
    });
    ViewStream { rx, cancel }
}

async fn run_stream(
    backend: Arc<dyn GenerativeBackend>,
    history: Vec<InteractionData>,
    max_history: usize,
    catalog: Vec<AppDefinition>,
    tx: mpsc::Sender<StreamEvent>,
    cancel: CancellationToken,
) {
    if !backend.is_configured() {
        let _ = tx
            .send(StreamEvent::Fragment(prompt::CONFIG_ERROR_HTML.to_string()))
            .await;
        let _ = tx.send(StreamEvent::Done { error: None }).await;
        return;
    }

    if history.is_empty() {
        let _ = tx
            .send(StreamEvent::Fragment(prompt::WAITING_HTML.to_string()))
            .await;
        let _ = tx.send(StreamEvent::Done { error: None }).await;
        return;
    }

    let prompt_text = prompt::build_prompt(&history, max_history, &catalog);
    tracing::debug!(chars = prompt_text.len(), "dispatching view prompt");

    let (chunk_tx, mut chunk_rx) = mpsc::channel::<String>(32);
    let generate = tokio::spawn(async move { backend.generate(prompt_text, chunk_tx).await });

    let mut failure: Option<String> = None;
    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => {
                generate.abort();
                return;
            }
            next = tokio::time::timeout(CHUNK_TIMEOUT, chunk_rx.recv()) => next,
        };
        match next {
            Err(_) => {
                generate.abort();
                failure = Some(ClientError::Timeout.to_string());
                break;
            }
            Ok(Some(text)) => {
                // Only fragments with non-empty text content are yielded.
                if text.trim().is_empty() {
                    continue;
                }
                if tx.send(StreamEvent::Fragment(text)).await.is_err() {
                    generate.abort();
                    return;
                }
            }
            Ok(None) => {
                match generate.await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => failure = Some(e.to_string()),
                    Err(e) => failure = Some(format!("stream task failed: {e}")),
                }
                break;
            }
        }
    }

    match failure {
        Some(err) => {
            tracing::warn!("view stream failed: {err}");
            let _ = tx
                .send(StreamEvent::Fragment(prompt::kernel_panic_html(&err)))
                .await;
            let _ = tx.send(StreamEvent::Done { error: Some(err) }).await;
        }
        None => {
            let _ = tx.send(StreamEvent::Done { error: None }).await;
        }
    }
}

/// Gemini `streamGenerateContent` backend over SSE.
pub struct GeminiBackend {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiBackend {
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model,
            base_url,
        }
    }

    /// Credential from `GEMINI_API_KEY` (or the legacy `API_KEY`). Absence
    /// is recoverable: the backend reports unconfigured and streams yield
    /// the fixed configuration-error block instead of calling out.
    pub fn from_env(model: Option<String>, base_url: Option<String>) -> Self {
        let api_key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("API_KEY"))
            .unwrap_or_default();
        Self::new(
            api_key,
            model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl GenerativeBackend for GeminiBackend {
    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn generate(
        &self,
        prompt: String,
        chunks: mpsc::Sender<String>,
    ) -> Result<(), ClientError> {
        let body = serde_json::json!({
            "contents": [{"parts": [{"text": prompt}]}],
            "generationConfig": {"thinkingConfig": {"thinkingBudget": 2000}},
        });

        let resp = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let mut stream = resp.bytes_stream();
        let mut buf = String::new();
        while let Some(piece) = stream.next().await {
            let bytes = piece?;
            buf.push_str(&String::from_utf8_lossy(&bytes));
            while let Some(pos) = buf.find('\n') {
                let line: String = buf.drain(..=pos).collect();
                let line = line.trim_end();
                let Some(data) = line.strip_prefix("data:") else {
                    continue;
                };
                let data = data.trim();
                if data.is_empty() || data == "[DONE]" {
                    continue;
                }
                let value: serde_json::Value = serde_json::from_str(data)
                    .map_err(|e| ClientError::Malformed(e.to_string()))?;
                for text in payload_texts(&value) {
                    if chunks.send(text).await.is_err() {
                        // Consumer gone (cancelled) — stop quietly.
                        return Ok(());
                    }
                }
            }
        }

        Ok(())
    }
}

/// Text parts from one SSE payload: `candidates[0].content.parts[*].text`.
fn payload_texts(value: &serde_json::Value) -> Vec<String> {
    value
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}
