use async_trait::async_trait;
use parla_core::TransportError;
use tokio::sync::{mpsc, watch};

/// One inbound message from the client connection.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientFrame {
    Binary(Vec<u8>),
    Text(String),
    Close,
}

/// Read half of a client connection.
///
/// `None` means the connection is gone without a close handshake.
#[async_trait]
pub trait ClientSource: Send {
    async fn next_frame(&mut self) -> Option<Result<ClientFrame, TransportError>>;
}

/// Write half of a client connection.
#[async_trait]
pub trait ClientSink: Send {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;
    /// Closes the connection. Calling it again is a no-op.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// What the server side wrote to an in-memory connection.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerFrame {
    Text(String),
    Close,
}

/// In-process connection pair: the session runs against `MemorySource` and
/// `MemorySink`, the test drives the `MemoryClient` end.
pub fn memory_transport() -> (MemoryClient, MemorySource, MemorySink) {
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let (closed_tx, closed_rx) = watch::channel(false);
    (
        MemoryClient {
            inbound: Some(inbound_tx),
            outbound: outbound_rx,
        },
        MemorySource {
            inbound: inbound_rx,
            closed: closed_rx,
        },
        MemorySink {
            outbound: outbound_tx,
            closed: closed_tx,
        },
    )
}

pub struct MemoryClient {
    inbound: Option<mpsc::UnboundedSender<Result<ClientFrame, TransportError>>>,
    outbound: mpsc::UnboundedReceiver<ServerFrame>,
}

impl MemoryClient {
    fn push(&self, frame: Result<ClientFrame, TransportError>) {
        if let Some(inbound) = &self.inbound {
            let _ = inbound.send(frame);
        }
    }

    pub fn send_audio(&self, bytes: Vec<u8>) {
        self.push(Ok(ClientFrame::Binary(bytes)));
    }

    pub fn send_text(&self, text: &str) {
        self.push(Ok(ClientFrame::Text(text.to_string())));
    }

    pub fn send_stop(&self) {
        self.send_text(r#"{"action":"stop"}"#);
    }

    pub fn send_close(&self) {
        self.push(Ok(ClientFrame::Close));
    }

    /// Surfaces a connection error on the server's read half.
    pub fn break_connection(&mut self, message: &str) {
        self.push(Err(TransportError::Io(message.to_string())));
        self.inbound = None;
    }

    /// Stops sending without a close handshake; the server reads `None`.
    pub fn hang_up(&mut self) {
        self.inbound = None;
    }

    /// Everything written until the server closes the connection.
    pub async fn collect_until_close(&mut self) -> Vec<String> {
        let mut texts = Vec::new();
        while let Some(frame) = self.outbound.recv().await {
            match frame {
                ServerFrame::Text(text) => texts.push(text),
                ServerFrame::Close => break,
            }
        }
        texts
    }
}

pub struct MemorySource {
    inbound: mpsc::UnboundedReceiver<Result<ClientFrame, TransportError>>,
    closed: watch::Receiver<bool>,
}

#[async_trait]
impl ClientSource for MemorySource {
    async fn next_frame(&mut self) -> Option<Result<ClientFrame, TransportError>> {
        // Frames already queued win over a server-side close, which the
        // client answers with a close of its own.
        tokio::select! {
            biased;
            frame = self.inbound.recv() => frame,
            _ = server_closed(&mut self.closed) => Some(Ok(ClientFrame::Close)),
        }
    }
}

async fn server_closed(closed: &mut watch::Receiver<bool>) {
    loop {
        if *closed.borrow_and_update() {
            return;
        }
        if closed.changed().await.is_err() {
            return;
        }
    }
}

pub struct MemorySink {
    outbound: mpsc::UnboundedSender<ServerFrame>,
    closed: watch::Sender<bool>,
}

#[async_trait]
impl ClientSink for MemorySink {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        if *self.closed.borrow() {
            return Err(TransportError::Closed);
        }
        self.outbound
            .send(ServerFrame::Text(text))
            .map_err(|_| TransportError::Closed)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if self.closed.send_replace(true) {
            return Ok(());
        }
        self.outbound
            .send(ServerFrame::Close)
            .map_err(|_| TransportError::Closed)
    }
}
