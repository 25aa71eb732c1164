use parla_core::{RecognitionError, StreamingConfig, StreamingRequest, StreamingResponse};
use std::sync::Arc;

/// A streaming speech recognizer.
///
/// Implementations are registered via [`RecognizerRegistry`](crate::RecognizerRegistry),
/// initialised once with engine-specific TOML, then shared read-only across
/// sessions. Every method may block on network I/O, so callers keep them off
/// the async scheduler.
pub trait Recognizer: Send + Sync {
    /// Returns the engine name (e.g. `"null"`, `"simul"`).
    fn name(&self) -> &str;
    /// One-time initialisation with engine-specific configuration.
    fn initialize(&mut self, config: toml::Value) -> Result<(), RecognitionError>;
    /// Opens one bidirectional streaming call.
    fn open(&self, config: &StreamingConfig) -> Result<RecognitionCall, RecognitionError>;
}

/// Send side of a streaming call.
pub trait RequestSink: Send {
    fn send(&mut self, request: StreamingRequest) -> Result<(), RecognitionError>;
    /// Half-closes the call; responses may still arrive afterwards.
    fn close_send(&mut self) -> Result<(), RecognitionError>;
}

/// Receive side of a streaming call. `Ok(None)` means the call ended.
pub trait ResponseStream: Send {
    fn next_response(&mut self) -> Result<Option<StreamingResponse>, RecognitionError>;
}

/// Tears the call down from any thread, unblocking both halves.
pub trait CallControl: Send + Sync {
    fn cancel(&self);
}

pub struct RecognitionCall {
    pub requests: Box<dyn RequestSink>,
    pub responses: Box<dyn ResponseStream>,
    pub control: Arc<dyn CallControl>,
}
