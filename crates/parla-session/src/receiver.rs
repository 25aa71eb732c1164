use crate::protocol::ControlMessage;
use crate::transport::{ClientFrame, ClientSource};
use parla_core::{AudioFrame, AudioSender};

/// Why the receive loop ended.
#[derive(Debug, Clone, PartialEq)]
pub enum ReceiveStop {
    /// The client sent `{"action":"stop"}`.
    StopRequested,
    /// Close handshake or dropped connection.
    Disconnected,
    /// The connection failed while reading.
    TransportFailed(String),
    /// Recognition no longer accepts audio.
    RecognitionClosed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReceiverReport {
    pub frames_received: usize,
    pub stop: ReceiveStop,
}

/// Reads client frames and pushes audio onto AudioChannel. Every exit path
/// ends the channel with EndOfInput.
pub struct ClientReceiver<S> {
    session_id: u64,
    source: S,
    audio: AudioSender,
}

impl<S: ClientSource> ClientReceiver<S> {
    pub fn new(session_id: u64, source: S, audio: AudioSender) -> Self {
        Self {
            session_id,
            source,
            audio,
        }
    }

    pub async fn run(self) -> ReceiverReport {
        let Self {
            session_id,
            mut source,
            audio,
        } = self;

        let mut frames_received = 0;
        let stop = loop {
            let frame = match source.next_frame().await {
                Some(Ok(frame)) => frame,
                Some(Err(e)) => {
                    tracing::debug!(session_id, "client read failed: {e}");
                    break ReceiveStop::TransportFailed(e.to_string());
                }
                None => break ReceiveStop::Disconnected,
            };

            match frame {
                ClientFrame::Binary(bytes) => {
                    if audio.send_frame(AudioFrame::new(bytes)).await.is_err() {
                        tracing::debug!(session_id, "recognition stopped accepting audio");
                        break ReceiveStop::RecognitionClosed;
                    }
                    frames_received += 1;
                }
                ClientFrame::Text(text) => match ControlMessage::parse(&text) {
                    Ok(control) if control.is_stop() => {
                        tracing::debug!(session_id, "stop requested by client");
                        break ReceiveStop::StopRequested;
                    }
                    Ok(control) => {
                        tracing::debug!(session_id, action = ?control.action, "ignoring control message");
                    }
                    Err(e) => {
                        tracing::warn!(session_id, "ignoring client message: {e}");
                    }
                },
                ClientFrame::Close => break ReceiveStop::Disconnected,
            }
        };

        audio.finish().await;
        tracing::debug!(session_id, frames_received, ?stop, "client receive loop ended");
        ReceiverReport {
            frames_received,
            stop,
        }
    }
}
