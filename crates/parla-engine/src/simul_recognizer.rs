//! SimulStreaming TCP recognizer.
//!
//! The server takes raw 16kHz mono S16_LE PCM on the socket and answers with
//! newline-delimited `"<start_ms> <end_ms> <text>"` segments. Each segment is
//! reported as a final result. Half-closing the write side tells the server
//! the audio is over; EOF on the read side ends the call.

use crate::recognizer::{CallControl, RecognitionCall, Recognizer, RequestSink, ResponseStream};
use parla_core::{
    AudioEncoding, RecognitionError, SpeechAlternative, StreamingConfig, StreamingRequest,
    StreamingResponse, StreamingResult, WordInfo,
};
use std::io::{BufRead, BufReader, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// SimulStreaming expects: 16kHz, mono, S16_LE PCM
pub const SIMULSTREAMING_SAMPLE_RATE: u32 = 16000;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct SimulStreamingRecognizer {
    address: Option<String>,
    /// Language the server was started with, if known.
    language: Option<String>,
    connect_timeout: Duration,
}

impl SimulStreamingRecognizer {
    pub fn new() -> Self {
        Self {
            address: None,
            language: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    fn connect(&self) -> Result<TcpStream, RecognitionError> {
        let address = self.address.as_deref().ok_or_else(|| {
            RecognitionError::OpenFailed("simul recognizer not initialized".to_string())
        })?;
        let socket_addr = address
            .to_socket_addrs()
            .map_err(|e| RecognitionError::OpenFailed(format!("{address}: {e}")))?
            .next()
            .ok_or_else(|| {
                RecognitionError::OpenFailed(format!("{address}: no usable address"))
            })?;

        tracing::info!("Connecting to SimulStreaming server at {}", address);
        let stream = TcpStream::connect_timeout(&socket_addr, self.connect_timeout)
            .map_err(|e| RecognitionError::OpenFailed(format!("{address}: {e}")))?;

        // Set socket options for real-time streaming
        stream.set_nodelay(true)?;
        stream.set_write_timeout(Some(WRITE_TIMEOUT))?;
        Ok(stream)
    }
}

impl Default for SimulStreamingRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Recognizer for SimulStreamingRecognizer {
    fn name(&self) -> &str {
        "simul"
    }

    fn initialize(&mut self, config: toml::Value) -> Result<(), RecognitionError> {
        let address = config
            .get("address")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                RecognitionError::InitializationFailed(
                    "missing 'address' in simul recognizer config".to_string(),
                )
            })?;
        self.address = Some(address.to_string());
        self.language = config
            .get("language")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        if let Some(ms) = config.get("connect_timeout_ms").and_then(|v| v.as_integer()) {
            let ms = u64::try_from(ms).map_err(|_| {
                RecognitionError::InitializationFailed(
                    "'connect_timeout_ms' must not be negative".to_string(),
                )
            })?;
            self.connect_timeout = Duration::from_millis(ms);
        }

        tracing::info!(
            address = %address,
            language = ?self.language,
            connect_timeout_ms = self.connect_timeout.as_millis() as u64,
            "SimulStreamingRecognizer initialized"
        );
        Ok(())
    }

    fn open(&self, config: &StreamingConfig) -> Result<RecognitionCall, RecognitionError> {
        check_config(config)?;
        match self.language.as_deref() {
            Some(language) if !serves_language(language, &config.language_codes) => {
                tracing::warn!(
                    server_language = language,
                    requested = ?config.language_codes,
                    "SimulStreaming server language is fixed, requested language ignored"
                );
            }
            Some(_) => {}
            None => tracing::debug!(
                requested = ?config.language_codes,
                "SimulStreaming server language unknown, requested language not forwarded"
            ),
        }
        let stream = self.connect()?;
        let read_stream = stream.try_clone()?;
        let control_stream = stream.try_clone()?;
        let closed = Arc::new(AtomicBool::new(false));

        Ok(RecognitionCall {
            requests: Box::new(SimulSink {
                stream,
                closed: Arc::clone(&closed),
            }),
            responses: Box::new(SimulResponses {
                reader: BufReader::new(read_stream),
                closed: Arc::clone(&closed),
            }),
            control: Arc::new(SimulControl {
                stream: control_stream,
                closed,
            }),
        })
    }
}

fn check_config(config: &StreamingConfig) -> Result<(), RecognitionError> {
    if config.encoding != AudioEncoding::Linear16
        || config.sample_rate_hertz != SIMULSTREAMING_SAMPLE_RATE
        || config.audio_channel_count != 1
    {
        return Err(RecognitionError::UnsupportedConfig(format!(
            "SimulStreaming needs LINEAR16 {} Hz mono, got {:?} {} Hz x{}",
            SIMULSTREAMING_SAMPLE_RATE,
            config.encoding,
            config.sample_rate_hertz,
            config.audio_channel_count
        )));
    }
    Ok(())
}

fn stream_error(closed: &AtomicBool, e: std::io::Error) -> RecognitionError {
    if closed.load(Ordering::SeqCst) {
        RecognitionError::CallClosed
    } else {
        RecognitionError::from(e)
    }
}

struct SimulSink {
    stream: TcpStream,
    closed: Arc<AtomicBool>,
}

impl RequestSink for SimulSink {
    fn send(&mut self, request: StreamingRequest) -> Result<(), RecognitionError> {
        match request {
            // Format is fixed by the server, validated in `open`
            StreamingRequest::Config(_) => Ok(()),
            StreamingRequest::Audio(frame) => {
                self.stream
                    .write_all(frame.as_bytes())
                    .and_then(|_| self.stream.flush())
                    .map_err(|e| stream_error(&self.closed, e))?;
                tracing::trace!("Sent {} audio bytes", frame.len());
                Ok(())
            }
        }
    }

    fn close_send(&mut self) -> Result<(), RecognitionError> {
        self.stream
            .shutdown(Shutdown::Write)
            .map_err(|e| stream_error(&self.closed, e))
    }
}

struct SimulResponses {
    reader: BufReader<TcpStream>,
    closed: Arc<AtomicBool>,
}

impl ResponseStream for SimulResponses {
    fn next_response(&mut self) -> Result<Option<StreamingResponse>, RecognitionError> {
        let mut line = String::new();
        loop {
            line.clear();
            let read = self
                .reader
                .read_line(&mut line)
                .map_err(|e| stream_error(&self.closed, e))?;
            if read == 0 {
                tracing::debug!("SimulStreaming connection closed (EOF)");
                return Ok(None);
            }
            if line.trim().is_empty() {
                continue;
            }
            match parse_segment(&line) {
                Some(response) => return Ok(Some(response)),
                None => tracing::warn!("Failed to parse transcription line: {}", line.trim_end()),
            }
        }
    }
}

struct SimulControl {
    stream: TcpStream,
    closed: Arc<AtomicBool>,
}

impl CallControl for SimulControl {
    fn cancel(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            if let Err(e) = self.stream.shutdown(Shutdown::Both) {
                tracing::trace!("SimulStreaming shutdown: {e}");
            }
        }
    }
}

/// Matches on the primary subtag, so a server started with `es` serves `es-ES`.
fn serves_language(server_language: &str, requested: &[String]) -> bool {
    let server = primary_subtag(server_language);
    requested.iter().any(|code| primary_subtag(code) == server)
}

fn primary_subtag(code: &str) -> String {
    code.split(['-', '_'])
        .next()
        .unwrap_or(code)
        .to_ascii_lowercase()
}

/// Parse a line from SimulStreaming output.
/// Format: "start_ms end_ms text"
fn parse_segment(line: &str) -> Option<StreamingResponse> {
    let trimmed = line.trim_end_matches(['\r', '\n']);
    let parts: Vec<&str> = trimmed.splitn(3, ' ').collect();
    if parts.len() < 3 {
        return None;
    }
    let start_ms = parse_offset(parts[0])?;
    let end_ms = parse_offset(parts[1])?;
    let transcript = parts[2].trim().to_string();

    let words = segment_words(&transcript, start_ms / 1000.0, end_ms.max(start_ms) / 1000.0);
    Some(StreamingResponse {
        results: vec![StreamingResult {
            alternatives: vec![SpeechAlternative { transcript, words }],
            is_final: true,
        }],
    })
}

fn parse_offset(field: &str) -> Option<f64> {
    field
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

/// The server times whole segments only, so the segment span is divided
/// evenly between its words.
fn segment_words(transcript: &str, start: f64, end: f64) -> Vec<WordInfo> {
    let tokens: Vec<&str> = transcript.split_whitespace().collect();
    if tokens.is_empty() {
        return Vec::new();
    }
    let step = (end - start) / tokens.len() as f64;
    tokens
        .iter()
        .enumerate()
        .map(|(i, token)| WordInfo {
            word: token.to_string(),
            start_offset_seconds: start + step * i as f64,
            end_offset_seconds: start + step * (i + 1) as f64,
            confidence: 1.0,
        })
        .collect()
}
