//! Owns the single streaming recognition call of a session.
//!
//! The call blocks on network I/O, so the driver runs on a blocking-pool
//! thread and feeds audio from a second scoped thread while it reads
//! responses. The driver always finishes ResultChannel with exactly one
//! terminal marker and releases the call exactly once.

use crate::recognizer::{CallControl, RecognitionCall, Recognizer, RequestSink, ResponseStream};
use parla_core::{
    AudioMessage, AudioReceiver, RecognitionError, ResultSender, StreamingConfig,
    StreamingRequest,
};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, PartialEq)]
pub enum DriverOutcome {
    /// The call ended normally; EndOfStream was sent.
    Completed,
    /// The call failed; Failure was sent with this message.
    Failed(String),
    /// The result consumer went away before the call ended.
    Abandoned,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DriverReport {
    pub frames_fed: usize,
    pub events_emitted: usize,
    pub outcome: DriverOutcome,
}

pub struct RecognitionDriver {
    session_id: u64,
    recognizer: Arc<dyn Recognizer>,
    config: StreamingConfig,
}

impl RecognitionDriver {
    pub fn new(session_id: u64, recognizer: Arc<dyn Recognizer>, config: StreamingConfig) -> Self {
        Self {
            session_id,
            recognizer,
            config,
        }
    }

    /// Runs the driver on tokio's blocking pool.
    pub fn spawn(
        self,
        audio: AudioReceiver,
        results: ResultSender,
    ) -> tokio::task::JoinHandle<DriverReport> {
        tokio::task::spawn_blocking(move || self.run(audio, results))
    }

    /// Blocking; must not be called from an async context.
    pub fn run(self, audio: AudioReceiver, results: ResultSender) -> DriverReport {
        let session_id = self.session_id;
        tracing::debug!(
            session_id,
            engine = %self.recognizer.name(),
            language = ?self.config.language_codes,
            "opening recognition stream"
        );

        let call = match self.recognizer.open(&self.config) {
            Ok(call) => call,
            Err(e) => return fail_before_streaming(session_id, results, e),
        };
        let RecognitionCall {
            mut requests,
            mut responses,
            control,
        } = call;
        let release = CallRelease::new(control);

        if let Err(e) = requests.send(StreamingRequest::Config(self.config.clone())) {
            release.release(None);
            return fail_before_streaming(session_id, results, e);
        }

        std::thread::scope(|scope| {
            let release = &release;
            let feeder = scope.spawn(move || feed_audio(session_id, requests, audio, release));

            let read = read_responses(session_id, responses.as_mut(), &results);
            release.release(None);
            let feed_error = release.take_cause();

            let events_emitted = match &read {
                Ok(summary) => summary.events,
                Err((_, events)) => *events,
            };
            let outcome = match (read, feed_error) {
                (_, Some(e)) => DriverOutcome::Failed(e.to_string()),
                (Err((e, _)), None) => DriverOutcome::Failed(e.to_string()),
                (Ok(summary), None) if summary.consumer_gone => DriverOutcome::Abandoned,
                (Ok(_), None) => DriverOutcome::Completed,
            };

            // The terminal marker goes out before waiting on the feeder: the
            // feeder only returns once the client side ends its input.
            match &outcome {
                DriverOutcome::Completed => results.blocking_end(),
                DriverOutcome::Failed(message) => {
                    tracing::error!(session_id, "recognition stream failed: {message}");
                    results.blocking_fail(message.clone());
                }
                DriverOutcome::Abandoned => {
                    tracing::debug!(session_id, "result consumer gone, stopping recognition");
                    drop(results);
                }
            }

            let frames_fed = feeder.join().unwrap_or_else(|_| {
                tracing::error!(session_id, "audio feeder panicked");
                0
            });
            tracing::debug!(session_id, frames_fed, events_emitted, "recognition stream ended");

            DriverReport {
                frames_fed,
                events_emitted,
                outcome,
            }
        })
    }
}

fn fail_before_streaming(
    session_id: u64,
    results: ResultSender,
    error: RecognitionError,
) -> DriverReport {
    tracing::error!(session_id, "recognition stream could not start: {error}");
    let message = error.to_string();
    results.blocking_fail(message.clone());
    DriverReport {
        frames_fed: 0,
        events_emitted: 0,
        outcome: DriverOutcome::Failed(message),
    }
}

/// Pulls AudioChannel until EndOfInput and forwards each frame on the call.
/// Returning drops the receiver, which unblocks a producer waiting on a full
/// channel.
fn feed_audio(
    session_id: u64,
    mut requests: Box<dyn RequestSink>,
    mut audio: AudioReceiver,
    release: &CallRelease,
) -> usize {
    let mut fed = 0;
    loop {
        match audio.blocking_recv() {
            AudioMessage::Frame(frame) => {
                if let Err(e) = requests.send(StreamingRequest::Audio(frame)) {
                    release.release_on_feed_error(session_id, e);
                    break;
                }
                fed += 1;
            }
            AudioMessage::EndOfInput => {
                tracing::debug!(session_id, frames = fed, "end of input, half-closing stream");
                if let Err(e) = requests.close_send() {
                    release.release_on_feed_error(session_id, e);
                }
                break;
            }
        }
    }
    fed
}

#[derive(Default)]
struct ReadSummary {
    events: usize,
    consumer_gone: bool,
}

fn read_responses(
    session_id: u64,
    responses: &mut dyn ResponseStream,
    results: &ResultSender,
) -> Result<ReadSummary, (RecognitionError, usize)> {
    let mut summary = ReadSummary::default();
    loop {
        let response = match responses.next_response() {
            Ok(Some(response)) => response,
            Ok(None) => return Ok(summary),
            Err(e) => return Err((e, summary.events)),
        };
        for event in response.into_events() {
            tracing::trace!(
                session_id,
                is_final = event.is_final,
                words = event.words.len(),
                "recognition event: {}",
                event.transcript
            );
            if results.blocking_send_event(event).is_err() {
                summary.consumer_gone = true;
                return Ok(summary);
            }
            summary.events += 1;
        }
    }
}

enum ReleaseState {
    Open,
    Released { cause: Option<RecognitionError> },
}

/// Releases the call exactly once, whichever thread gets there first, and
/// remembers a feed error if that is what released it.
struct CallRelease {
    control: Arc<dyn CallControl>,
    state: Mutex<ReleaseState>,
}

impl CallRelease {
    fn new(control: Arc<dyn CallControl>) -> Self {
        Self {
            control,
            state: Mutex::new(ReleaseState::Open),
        }
    }

    /// Returns `true` if this call performed the release.
    fn release(&self, cause: Option<RecognitionError>) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match *state {
            ReleaseState::Open => {
                self.control.cancel();
                *state = ReleaseState::Released { cause };
                true
            }
            ReleaseState::Released { .. } => false,
        }
    }

    fn release_on_feed_error(&self, session_id: u64, error: RecognitionError) {
        let message = error.to_string();
        if self.release(Some(error)) {
            tracing::warn!(session_id, "feeding recognition stream failed: {message}");
        } else {
            tracing::debug!(session_id, "stream already released, dropping remaining audio");
        }
    }

    fn take_cause(&self) -> Option<RecognitionError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match &mut *state {
            ReleaseState::Released { cause } => cause.take(),
            ReleaseState::Open => None,
        }
    }
}

impl Drop for CallRelease {
    fn drop(&mut self) {
        self.release(None);
    }
}
