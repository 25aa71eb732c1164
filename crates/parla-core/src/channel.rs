//! The two session conduits.
//!
//! `AudioChannel` carries frames from the client-receive path to the
//! recognizer-feed path, `ResultChannel` carries recognition events back.
//! Both are bounded FIFO queues with exactly one producer and one consumer.
//! Terminal markers are sent by consuming the sender, so nothing can follow
//! them. A sender that is dropped without sending its marker reads as the
//! marker on the consumer side (EndOfInput, or a Failure for results).

use crate::error::ChannelClosed;
use crate::types::{AudioFrame, AudioMessage, RecognitionEvent, ResultMessage};
use tokio::sync::mpsc;

pub const DEFAULT_AUDIO_CAPACITY: usize = 64;
pub const DEFAULT_RESULT_CAPACITY: usize = 64;

const ABANDONED_RESULT_STREAM: &str = "recognition stopped without reporting an outcome";

pub fn audio_channel(capacity: usize) -> (AudioSender, AudioReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (AudioSender { tx }, AudioReceiver { rx, ended: false })
}

pub fn result_channel(capacity: usize) -> (ResultSender, ResultReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ResultSender { tx }, ResultReceiver { rx, ended: false })
}

pub struct AudioSender {
    tx: mpsc::Sender<AudioMessage>,
}

impl AudioSender {
    /// Waits for capacity when the channel is full.
    pub async fn send_frame(&self, frame: AudioFrame) -> Result<(), ChannelClosed> {
        self.tx
            .send(AudioMessage::Frame(frame))
            .await
            .map_err(|_| ChannelClosed)
    }

    /// Sends the single EndOfInput marker.
    pub async fn finish(self) {
        if self.tx.send(AudioMessage::EndOfInput).await.is_err() {
            tracing::trace!("audio consumer already gone, EndOfInput dropped");
        }
    }
}

pub struct AudioReceiver {
    rx: mpsc::Receiver<AudioMessage>,
    ended: bool,
}

impl AudioReceiver {
    /// Blocking receive for use off the async scheduler.
    pub fn blocking_recv(&mut self) -> AudioMessage {
        if self.ended {
            return AudioMessage::EndOfInput;
        }
        let message = self.rx.blocking_recv();
        self.settle(message)
    }

    pub async fn recv(&mut self) -> AudioMessage {
        if self.ended {
            return AudioMessage::EndOfInput;
        }
        let message = self.rx.recv().await;
        self.settle(message)
    }

    fn settle(&mut self, message: Option<AudioMessage>) -> AudioMessage {
        match message {
            Some(AudioMessage::Frame(frame)) => AudioMessage::Frame(frame),
            Some(AudioMessage::EndOfInput) | None => {
                self.ended = true;
                AudioMessage::EndOfInput
            }
        }
    }
}

pub struct ResultSender {
    tx: mpsc::Sender<ResultMessage>,
}

impl ResultSender {
    pub fn blocking_send_event(&self, event: RecognitionEvent) -> Result<(), ChannelClosed> {
        self.tx
            .blocking_send(ResultMessage::Event(event))
            .map_err(|_| ChannelClosed)
    }

    pub fn blocking_end(self) {
        self.blocking_terminate(ResultMessage::EndOfStream);
    }

    pub fn blocking_fail(self, message: impl Into<String>) {
        self.blocking_terminate(ResultMessage::Failure(message.into()));
    }

    pub async fn send_event(&self, event: RecognitionEvent) -> Result<(), ChannelClosed> {
        self.tx
            .send(ResultMessage::Event(event))
            .await
            .map_err(|_| ChannelClosed)
    }

    pub async fn end(self) {
        self.terminate(ResultMessage::EndOfStream).await;
    }

    pub async fn fail(self, message: impl Into<String>) {
        self.terminate(ResultMessage::Failure(message.into())).await;
    }

    fn blocking_terminate(self, marker: ResultMessage) {
        if self.tx.blocking_send(marker).is_err() {
            tracing::trace!("result consumer already gone, terminal marker dropped");
        }
    }

    async fn terminate(self, marker: ResultMessage) {
        if self.tx.send(marker).await.is_err() {
            tracing::trace!("result consumer already gone, terminal marker dropped");
        }
    }
}

pub struct ResultReceiver {
    rx: mpsc::Receiver<ResultMessage>,
    ended: bool,
}

impl ResultReceiver {
    /// Next message in send order. Once a terminal marker has been returned,
    /// every further call returns `EndOfStream`.
    pub async fn recv(&mut self) -> ResultMessage {
        if self.ended {
            return ResultMessage::EndOfStream;
        }
        match self.rx.recv().await {
            Some(ResultMessage::Event(event)) => ResultMessage::Event(event),
            Some(terminal) => {
                self.ended = true;
                terminal
            }
            None => {
                self.ended = true;
                ResultMessage::Failure(ABANDONED_RESULT_STREAM.to_string())
            }
        }
    }
}
