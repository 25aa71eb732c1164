pub mod channel;
pub mod config;
pub mod error;
pub mod types;

pub use channel::{
    audio_channel, result_channel, AudioReceiver, AudioSender, ResultReceiver, ResultSender,
    DEFAULT_AUDIO_CAPACITY, DEFAULT_RESULT_CAPACITY,
};
pub use config::{AppConfig, CloudConfig, RecognizerConfig, ServerConfig, SessionSettings};
pub use error::{
    ChannelClosed, CloudError, ConfigError, ProtocolError, RecognitionError, SessionError,
    TransportError,
};
pub use types::{
    AudioEncoding, AudioFrame, AudioMessage, RecognitionEvent, RecognitionFeatures,
    ResultMessage, SessionConfig, SpeechAlternative, StreamingConfig, StreamingRequest,
    StreamingResponse, StreamingResult, WordInfo,
};
