//! Per-session lifecycle: `Idle -> Running -> Draining -> Closed`.
//!
//! The supervisor never signals components directly. It starts them, waits
//! for each to stop on its own channel's terminal marker or connection
//! state, and reports how the session went.

use crate::protocol::encode_error;
use crate::receiver::{ClientReceiver, ReceiveStop, ReceiverReport};
use crate::sender::{ClientSender, SenderReport};
use crate::transport::{ClientSink, ClientSource};
use parla_core::{
    audio_channel, result_channel, SessionError, SessionSettings, StreamingConfig,
    DEFAULT_AUDIO_CAPACITY, DEFAULT_RESULT_CAPACITY,
};
use parla_engine::{DriverOutcome, DriverReport, RecognitionDriver, Recognizer};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_CLOSE_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
    Draining,
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    /// Recognition reached end of stream.
    Completed,
    /// Recognition failed; the client was sent the error.
    Failed(String),
    /// No recognizer was available; nothing was started.
    Rejected(String),
    /// Nobody was left to read results.
    Abandoned,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub session_id: u64,
    pub state: SessionState,
    pub outcome: SessionOutcome,
    pub frames_received: usize,
    pub frames_fed: usize,
    pub events_sent: usize,
}

impl SessionReport {
    fn rejected(session_id: u64, message: String) -> Self {
        Self {
            session_id,
            state: SessionState::Closed,
            outcome: SessionOutcome::Rejected(message),
            frames_received: 0,
            frames_fed: 0,
            events_sent: 0,
        }
    }
}

pub struct SessionSupervisor {
    session_id: u64,
    recognizer: Option<Arc<dyn Recognizer>>,
    config: StreamingConfig,
    audio_capacity: usize,
    result_capacity: usize,
    close_grace: Duration,
    state: SessionState,
}

impl SessionSupervisor {
    pub fn new(
        session_id: u64,
        recognizer: Option<Arc<dyn Recognizer>>,
        config: StreamingConfig,
    ) -> Self {
        Self {
            session_id,
            recognizer,
            config,
            audio_capacity: DEFAULT_AUDIO_CAPACITY,
            result_capacity: DEFAULT_RESULT_CAPACITY,
            close_grace: DEFAULT_CLOSE_GRACE,
            state: SessionState::Idle,
        }
    }

    pub fn with_settings(mut self, settings: &SessionSettings) -> Self {
        self.audio_capacity = settings.audio_channel_capacity;
        self.result_capacity = settings.result_channel_capacity;
        self.close_grace = settings.close_grace();
        self
    }

    pub fn with_close_grace(mut self, close_grace: Duration) -> Self {
        self.close_grace = close_grace;
        self
    }

    fn transition(&mut self, next: SessionState) {
        tracing::debug!(session_id = self.session_id, from = ?self.state, to = ?next, "session state");
        self.state = next;
    }

    /// Runs the session to completion on the given connection halves.
    pub async fn run<S, K>(mut self, source: S, mut sink: K) -> SessionReport
    where
        S: ClientSource + 'static,
        K: ClientSink + 'static,
    {
        let session_id = self.session_id;
        tracing::info!(
            session_id,
            language_code = ?self.config.language_codes,
            "session accepted"
        );

        let Some(recognizer) = self.recognizer.clone() else {
            let message = SessionError::RecognizerUnavailable.to_string();
            tracing::error!(session_id, "{message}");
            match encode_error(&message) {
                Ok(payload) => {
                    if let Err(e) = sink.send_text(payload).await {
                        tracing::debug!(session_id, "client write failed: {e}");
                    }
                }
                Err(e) => tracing::error!(session_id, "failed to encode error: {e}"),
            }
            if let Err(e) = sink.close().await {
                tracing::debug!(session_id, "closing client connection: {e}");
            }
            self.transition(SessionState::Closed);
            return SessionReport::rejected(session_id, message);
        };

        let (audio_tx, audio_rx) = audio_channel(self.audio_capacity);
        let (results_tx, results_rx) = result_channel(self.result_capacity);

        self.transition(SessionState::Running);
        let mut receiver_task =
            tokio::spawn(ClientReceiver::new(session_id, source, audio_tx).run());
        let mut sender_task = tokio::spawn(ClientSender::new(session_id, sink, results_rx).run());
        let mut driver_task = RecognitionDriver::new(session_id, recognizer, self.config.clone())
            .spawn(audio_rx, results_tx);

        let mut receiver_done = None;
        let mut sender_done = None;
        let mut driver_done = None;
        tokio::select! {
            r = &mut receiver_task => receiver_done = Some(r),
            s = &mut sender_task => sender_done = Some(s),
            d = &mut driver_task => driver_done = Some(d),
        }
        self.transition(SessionState::Draining);

        // The sender finishes once the driver has sent its terminal marker.
        let sender = match sender_done {
            Some(done) => done,
            None => sender_task.await,
        };
        let receiver = match receiver_done {
            Some(done) => Some(done),
            None => match tokio::time::timeout(self.close_grace, &mut receiver_task).await {
                Ok(done) => Some(done),
                Err(_) => {
                    tracing::debug!(
                        session_id,
                        "client still connected after close, dropping receive loop"
                    );
                    receiver_task.abort();
                    // Aborting drops the audio sender, which ends the feed side
                    let _ = receiver_task.await;
                    None
                }
            },
        };
        let driver = match driver_done {
            Some(done) => done,
            None => driver_task.await,
        };

        self.transition(SessionState::Closed);
        let report = self.report(receiver, sender, driver);
        tracing::info!(
            session_id,
            outcome = ?report.outcome,
            frames_received = report.frames_received,
            events_sent = report.events_sent,
            "session closed"
        );
        report
    }

    fn report(
        &self,
        receiver: Option<Result<ReceiverReport, tokio::task::JoinError>>,
        sender: Result<SenderReport, tokio::task::JoinError>,
        driver: Result<DriverReport, tokio::task::JoinError>,
    ) -> SessionReport {
        let session_id = self.session_id;
        let receiver = receiver.and_then(|r| log_join(session_id, "client receiver", r));
        let sender = log_join(session_id, "client sender", sender);
        let driver = log_join(session_id, "recognition driver", driver);

        let outcome = match &driver {
            Some(report) => match &report.outcome {
                DriverOutcome::Completed => SessionOutcome::Completed,
                DriverOutcome::Failed(message) => SessionOutcome::Failed(message.clone()),
                DriverOutcome::Abandoned => SessionOutcome::Abandoned,
            },
            None => SessionOutcome::Failed("recognition driver stopped unexpectedly".to_string()),
        };
        if let Some(ReceiverReport {
            stop: ReceiveStop::TransportFailed(message),
            ..
        }) = &receiver
        {
            tracing::debug!(session_id, "client connection ended with error: {message}");
        }

        SessionReport {
            session_id,
            state: self.state,
            outcome,
            frames_received: receiver.map_or(0, |r| r.frames_received),
            frames_fed: driver.map_or(0, |d| d.frames_fed),
            events_sent: sender.map_or(0, |s| s.events_sent),
        }
    }
}

fn log_join<T>(
    session_id: u64,
    component: &str,
    joined: Result<T, tokio::task::JoinError>,
) -> Option<T> {
    match joined {
        Ok(report) => Some(report),
        Err(e) => {
            tracing::error!(session_id, "{component} did not finish: {e}");
            None
        }
    }
}
