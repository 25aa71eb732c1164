use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("environment variable not found: {0}")]
    EnvVarNotFound(String),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RecognitionError {
    #[error("recognizer engine not found: {0}")]
    EngineNotFound(String),

    #[error("recognizer initialization failed: {0}")]
    InitializationFailed(String),

    #[error("failed to open recognition stream: {0}")]
    OpenFailed(String),

    #[error("unsupported recognition config: {0}")]
    UnsupportedConfig(String),

    #[error("recognition stream failed: {0}")]
    Stream(String),

    #[error("recognition call already closed")]
    CallClosed,
}

impl From<std::io::Error> for RecognitionError {
    fn from(e: std::io::Error) -> Self {
        RecognitionError::Stream(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("client connection closed")]
    Closed,

    #[error("client connection error: {0}")]
    Io(String),
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed control message: {0}")]
    MalformedControl(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Speech recognizer not initialized")]
    RecognizerUnavailable,
}

#[derive(Debug, Error)]
pub enum CloudError {
    #[error("{0} client not initialized")]
    NotConfigured(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("unexpected response: {0}")]
    Response(String),
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("session channel closed by its consumer")]
pub struct ChannelClosed;
