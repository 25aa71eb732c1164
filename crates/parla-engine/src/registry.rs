use crate::recognizer::Recognizer;
use parla_core::{RecognitionError, RecognizerConfig};
use std::collections::HashMap;
use std::sync::Arc;

pub struct RecognizerRegistry {
    factories: HashMap<String, fn() -> Box<dyn Recognizer>>,
}

impl RecognizerRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register("null", || {
            Box::new(crate::null_recognizer::NullRecognizer::new())
        });
        registry.register("simul", || {
            Box::new(crate::simul_recognizer::SimulStreamingRecognizer::new())
        });
        registry
    }

    pub fn register(&mut self, name: &str, factory: fn() -> Box<dyn Recognizer>) {
        self.factories.insert(name.to_string(), factory);
    }

    pub fn create(&self, name: &str) -> Result<Box<dyn Recognizer>, RecognitionError> {
        self.factories
            .get(name)
            .map(|f| f())
            .ok_or_else(|| RecognitionError::EngineNotFound(name.to_string()))
    }

    /// Creates and initialises the configured engine, ready to be shared
    /// across sessions.
    pub fn build(
        &self,
        config: &RecognizerConfig,
    ) -> Result<Arc<dyn Recognizer>, RecognitionError> {
        let mut recognizer = self.create(&config.engine)?;
        recognizer.initialize(config.extra.clone())?;
        Ok(Arc::from(recognizer))
    }

    pub fn list_engines(&self) -> Vec<&str> {
        self.factories.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for RecognizerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
