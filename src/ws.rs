//! axum WebSocket halves as session transport.

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parla_core::TransportError;
use parla_session::{ClientFrame, ClientSink, ClientSource};

pub fn split(socket: WebSocket) -> (WsSource, WsSink) {
    let (sink, stream) = socket.split();
    (
        WsSource { stream },
        WsSink {
            sink,
            closed: false,
        },
    )
}

pub struct WsSource {
    stream: SplitStream<WebSocket>,
}

#[async_trait]
impl ClientSource for WsSource {
    async fn next_frame(&mut self) -> Option<Result<ClientFrame, TransportError>> {
        loop {
            let message = match self.stream.next().await? {
                Ok(message) => message,
                Err(e) => return Some(Err(TransportError::Io(e.to_string()))),
            };
            let frame = match message {
                Message::Binary(bytes) => ClientFrame::Binary(bytes.to_vec()),
                Message::Text(text) => ClientFrame::Text(text.to_string()),
                Message::Close(_) => ClientFrame::Close,
                // axum answers pings itself
                Message::Ping(_) | Message::Pong(_) => continue,
            };
            return Some(Ok(frame));
        }
    }
}

pub struct WsSink {
    sink: SplitSink<WebSocket, Message>,
    closed: bool,
}

#[async_trait]
impl ClientSink for WsSink {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.sink
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| TransportError::Io(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.sink
            .close()
            .await
            .map_err(|e| TransportError::Io(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::{router, AppState};
    use crate::services::AppServices;
    use axum::extract::ws::WebSocketUpgrade;
    use axum::response::Response;
    use axum::routing::get;
    use axum::Router;
    use parla_core::{AppConfig, WordInfo};
    use parla_engine::{ScriptStep, ScriptedRecognizer};
    use serde_json::{json, Value};
    use std::net::{SocketAddr, TcpStream};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tungstenite::Message as ClientMessage;

    type ClientSocket = tungstenite::WebSocket<TcpStream>;

    async fn serve(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await });
        addr
    }

    fn connect(addr: SocketAddr, path: &str) -> ClientSocket {
        let stream = TcpStream::connect(addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        let (socket, _response) =
            tungstenite::client::client(format!("ws://{addr}{path}"), stream).unwrap();
        socket
    }

    /// Reads text frames until the server closes the connection.
    fn read_until_close(socket: &mut ClientSocket) -> Vec<Value> {
        let mut values = Vec::new();
        loop {
            match socket.read().unwrap() {
                ClientMessage::Text(text) => {
                    values.push(serde_json::from_str(text.as_str()).unwrap())
                }
                ClientMessage::Close(_) => return values,
                _ => {}
            }
        }
    }

    fn word(w: &str, start: f64, end: f64) -> WordInfo {
        WordInfo {
            word: w.to_string(),
            start_offset_seconds: start,
            end_offset_seconds: end,
            confidence: 1.0,
        }
    }

    fn listen_app(recognizer: ScriptedRecognizer) -> Router {
        let mut services = AppServices::build(AppConfig::default());
        services.recognizer = Some(Arc::new(recognizer));
        router(AppState::new(Arc::new(services)))
    }

    #[tokio::test]
    async fn test_source_maps_frames_and_skips_pings() {
        let (frames_tx, mut frames_rx) = mpsc::unbounded_channel();
        let app = Router::new().route(
            "/frames",
            get(move |ws: WebSocketUpgrade| {
                let frames_tx = frames_tx.clone();
                async move {
                    ws.on_upgrade(move |socket| async move {
                        let (mut source, _sink) = split(socket);
                        while let Some(frame) = source.next_frame().await {
                            let done = matches!(frame, Ok(ClientFrame::Close));
                            let _ = frames_tx.send(frame);
                            if done {
                                break;
                            }
                        }
                    })
                }
            }),
        );
        let addr = serve(app).await;

        tokio::task::spawn_blocking(move || {
            let mut socket = connect(addr, "/frames");
            socket
                .send(ClientMessage::Binary(vec![7u8; 4].into()))
                .unwrap();
            socket.send(ClientMessage::Ping(Vec::new().into())).unwrap();
            socket
                .send(ClientMessage::Text("hello".to_string().into()))
                .unwrap();
            socket.close(None).unwrap();
            // drain until the server drops the connection
            while socket.read().is_ok() {}
        })
        .await
        .unwrap();

        let mut frames = Vec::new();
        for _ in 0..3 {
            frames.push(frames_rx.recv().await.unwrap().unwrap());
        }
        assert_eq!(
            frames,
            vec![
                ClientFrame::Binary(vec![7u8; 4]),
                ClientFrame::Text("hello".to_string()),
                ClientFrame::Close,
            ]
        );
    }

    #[tokio::test]
    async fn test_sink_close_is_idempotent() {
        let (results_tx, mut results_rx) = mpsc::unbounded_channel();
        let app = Router::new().route(
            "/close",
            get(move |ws: WebSocketUpgrade| {
                let results_tx = results_tx.clone();
                async move {
                    ws.on_upgrade(move |socket| async move {
                        let (_source, mut sink) = split(socket);
                        let sent = sink.send_text(r#"{"bye":true}"#.to_string()).await;
                        let first = sink.close().await;
                        let second = sink.close().await;
                        let late = sink.send_text("late".to_string()).await;
                        let _ = results_tx.send((sent, first, second, late));
                    })
                }
            }),
        );
        let addr = serve(app).await;

        let received = tokio::task::spawn_blocking(move || {
            let mut socket = connect(addr, "/close");
            read_until_close(&mut socket)
        })
        .await
        .unwrap();
        assert_eq!(received, vec![json!({"bye": true})]);

        let (sent, first, second, late) = results_rx.recv().await.unwrap();
        assert!(sent.is_ok());
        assert!(first.is_ok());
        assert!(second.is_ok());
        assert!(matches!(late, Err(TransportError::Closed)));
    }

    #[tokio::test]
    async fn test_listen_streams_transcripts_over_websocket() {
        let recognizer = ScriptedRecognizer::new(vec![
            ScriptStep::AwaitFrames(1),
            ScriptStep::interim("Hola"),
            ScriptStep::AwaitEndOfInput,
            ScriptStep::final_result(
                "Hola mundo",
                vec![word("Hola", 0.0, 0.5), word("mundo", 0.5, 1.0)],
            ),
        ]);
        let stats = recognizer.stats();
        let addr = serve(listen_app(recognizer)).await;

        let values = tokio::task::spawn_blocking(move || {
            let mut socket = connect(addr, "/listen?language_code=es-ES");
            for i in 0..3u8 {
                socket
                    .send(ClientMessage::Binary(vec![i; 320].into()))
                    .unwrap();
            }
            socket.send(ClientMessage::Ping(Vec::new().into())).unwrap();
            socket
                .send(ClientMessage::Text(r#"{"action":"stop"}"#.to_string().into()))
                .unwrap();
            read_until_close(&mut socket)
        })
        .await
        .unwrap();

        assert_eq!(values.len(), 2);
        assert_eq!(values[0], json!({"transcript": "Hola", "isFinal": false, "words": []}));
        assert_eq!(values[1]["transcript"], "Hola mundo");
        assert_eq!(values[1]["isFinal"], true);
        assert_eq!(values[1]["words"][1]["word"], "mundo");
        assert_eq!(values[1]["words"][1]["startTime"], 0.5);
        assert_eq!(values[1]["words"][1]["endTime"], 1.0);

        assert_eq!(stats.opened(), 1);
        assert_eq!(stats.frames().len(), 3);
        assert_eq!(stats.configs()[0].language_codes, vec!["es-ES".to_string()]);
    }

    #[tokio::test]
    async fn test_listen_defaults_language_code() {
        let recognizer = ScriptedRecognizer::new(vec![ScriptStep::AwaitEndOfInput]);
        let stats = recognizer.stats();
        let addr = serve(listen_app(recognizer)).await;

        let values = tokio::task::spawn_blocking(move || {
            let mut socket = connect(addr, "/listen");
            socket
                .send(ClientMessage::Text(r#"{"action":"stop"}"#.to_string().into()))
                .unwrap();
            read_until_close(&mut socket)
        })
        .await
        .unwrap();

        assert!(values.is_empty());
        assert_eq!(stats.opened(), 1);
        assert_eq!(stats.configs()[0].language_codes, vec!["en-US".to_string()]);
    }
}
