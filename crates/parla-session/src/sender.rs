use crate::protocol::{encode_error, encode_event};
use crate::transport::ClientSink;
use parla_core::{ResultMessage, ResultReceiver};

#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// EndOfStream was reached.
    Ended,
    /// A Failure was reported to the client.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SenderReport {
    pub events_sent: usize,
    /// Messages that could not be written because the client was gone.
    pub dropped: usize,
    pub outcome: SendOutcome,
}

/// Relays ResultChannel to the client until a terminal marker, then closes
/// the connection.
pub struct ClientSender<K> {
    session_id: u64,
    sink: K,
    results: ResultReceiver,
}

impl<K: ClientSink> ClientSender<K> {
    pub fn new(session_id: u64, sink: K, results: ResultReceiver) -> Self {
        Self {
            session_id,
            sink,
            results,
        }
    }

    pub async fn run(self) -> SenderReport {
        let Self {
            session_id,
            mut sink,
            mut results,
        } = self;

        let mut writer = BestEffortWriter {
            session_id,
            client_gone: false,
            dropped: 0,
        };
        let mut events_sent = 0;

        let outcome = loop {
            match results.recv().await {
                ResultMessage::Event(event) => match encode_event(&event) {
                    Ok(payload) => {
                        if writer.write(&mut sink, payload).await {
                            events_sent += 1;
                        }
                    }
                    Err(e) => tracing::error!(session_id, "failed to encode result: {e}"),
                },
                ResultMessage::Failure(message) => {
                    match encode_error(&message) {
                        Ok(payload) => {
                            writer.write(&mut sink, payload).await;
                        }
                        Err(e) => tracing::error!(session_id, "failed to encode error: {e}"),
                    }
                    break SendOutcome::Failed(message);
                }
                ResultMessage::EndOfStream => break SendOutcome::Ended,
            }
        };

        if let Err(e) = sink.close().await {
            tracing::debug!(session_id, "closing client connection: {e}");
        }
        tracing::debug!(session_id, events_sent, ?outcome, "client send loop ended");
        SenderReport {
            events_sent,
            dropped: writer.dropped,
            outcome,
        }
    }
}

/// Once a write fails the client is treated as gone and later messages are
/// counted, not written.
struct BestEffortWriter {
    session_id: u64,
    client_gone: bool,
    dropped: usize,
}

impl BestEffortWriter {
    async fn write<K: ClientSink>(&mut self, sink: &mut K, payload: String) -> bool {
        if !self.client_gone {
            match sink.send_text(payload).await {
                Ok(()) => return true,
                Err(e) => {
                    tracing::debug!(session_id = self.session_id, "client write failed: {e}");
                    self.client_gone = true;
                }
            }
        }
        self.dropped += 1;
        false
    }
}
