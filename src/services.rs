use parla_cloud::{GoogleSynthesizer, GoogleTranslator, PhraseBook, Synthesizer, Translator};
use parla_core::AppConfig;
use parla_engine::{Recognizer, RecognizerRegistry};
use std::sync::Arc;

/// Collaborators shared by every request and session.
///
/// Built once at startup and read-only afterwards. A collaborator that fails
/// to build is logged and left out; callers see `None` and report it.
pub struct AppServices {
    pub config: AppConfig,
    pub recognizer: Option<Arc<dyn Recognizer>>,
    pub translator: Option<Arc<dyn Translator>>,
    pub synthesizer: Option<Arc<dyn Synthesizer>>,
    pub phrases: PhraseBook,
}

impl AppServices {
    pub fn build(config: AppConfig) -> Self {
        let registry = RecognizerRegistry::new();
        let recognizer = match registry.build(&config.recognizer) {
            Ok(recognizer) => {
                tracing::info!(engine = %recognizer.name(), "speech recognizer ready");
                Some(recognizer)
            }
            Err(e) => {
                tracing::error!(engine = %config.recognizer.engine, "speech recognizer unavailable: {e}");
                None
            }
        };

        let (translator, synthesizer) = match &config.cloud {
            Some(cloud) => {
                let translator = match GoogleTranslator::from_config(cloud) {
                    Ok(t) => Some(Arc::new(t) as Arc<dyn Translator>),
                    Err(e) => {
                        tracing::warn!("translation unavailable: {e}");
                        None
                    }
                };
                let synthesizer = match GoogleSynthesizer::from_config(cloud) {
                    Ok(s) => Some(Arc::new(s) as Arc<dyn Synthesizer>),
                    Err(e) => {
                        tracing::warn!("speech synthesis unavailable: {e}");
                        None
                    }
                };
                (translator, synthesizer)
            }
            None => {
                tracing::info!("no [cloud] section, translation and synthesis disabled");
                (None, None)
            }
        };

        Self {
            config,
            recognizer,
            translator,
            synthesizer,
            phrases: PhraseBook::new(),
        }
    }

    pub fn target_language(&self) -> &str {
        self.config
            .cloud
            .as_ref()
            .map_or("en", |cloud| cloud.target_language.as_str())
    }
}
