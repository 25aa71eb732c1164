pub mod driver;
pub mod null_recognizer;
pub mod recognizer;
pub mod registry;
pub mod scripted;
pub mod simul_recognizer;

pub use driver::{DriverOutcome, DriverReport, RecognitionDriver};
pub use null_recognizer::NullRecognizer;
pub use recognizer::{CallControl, RecognitionCall, Recognizer, RequestSink, ResponseStream};
pub use registry::RecognizerRegistry;
pub use scripted::{CallStats, ScriptStep, ScriptedRecognizer};
pub use simul_recognizer::SimulStreamingRecognizer;
