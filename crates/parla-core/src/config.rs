use crate::error::ConfigError;
use crate::types::{AudioEncoding, RecognitionFeatures, SessionConfig, StreamingConfig};
use regex::Regex;
use serde::Deserialize;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub session: SessionSettings,

    #[serde(default)]
    pub recognizer: RecognizerConfig,

    #[serde(default)]
    pub cloud: Option<CloudConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionSettings {
    #[serde(default = "default_language")]
    pub default_language: String,

    #[serde(default = "default_audio_capacity")]
    pub audio_channel_capacity: usize,

    #[serde(default = "default_result_capacity")]
    pub result_channel_capacity: usize,

    /// How long the receive path may keep reading after results are done.
    #[serde(default = "default_close_grace_ms")]
    pub close_grace_ms: u64,
}

impl SessionSettings {
    pub fn close_grace(&self) -> Duration {
        Duration::from_millis(self.close_grace_ms)
    }

    /// Resolves the language requested at connect time, falling back to
    /// `default_language` when absent or blank.
    pub fn session_config(&self, requested: Option<&str>) -> SessionConfig {
        let language = requested
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.default_language);
        SessionConfig::new(language)
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            default_language: default_language(),
            audio_channel_capacity: default_audio_capacity(),
            result_channel_capacity: default_result_capacity(),
            close_grace_ms: default_close_grace_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RecognizerConfig {
    #[serde(default = "default_engine")]
    pub engine: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_sample_rate")]
    pub sample_rate_hertz: u32,

    #[serde(default = "default_channel_count")]
    pub audio_channel_count: u16,

    #[serde(default = "default_true")]
    pub interim_results: bool,

    #[serde(default = "default_true")]
    pub automatic_punctuation: bool,

    /// Engine-specific keys, handed to the engine's `initialize`.
    #[serde(flatten)]
    pub extra: toml::Value,
}

impl RecognizerConfig {
    pub fn streaming_config(&self, session: &SessionConfig) -> StreamingConfig {
        StreamingConfig {
            encoding: AudioEncoding::Linear16,
            sample_rate_hertz: self.sample_rate_hertz,
            audio_channel_count: self.audio_channel_count,
            language_codes: vec![session.language_code.clone()],
            model: self.model.clone(),
            features: RecognitionFeatures {
                enable_word_time_offsets: true,
                enable_word_confidence: true,
                enable_automatic_punctuation: self.automatic_punctuation,
            },
            interim_results: self.interim_results,
        }
    }
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            engine: default_engine(),
            model: default_model(),
            sample_rate_hertz: default_sample_rate(),
            audio_channel_count: default_channel_count(),
            interim_results: default_true(),
            automatic_punctuation: default_true(),
            extra: toml::Value::Table(Default::default()),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CloudConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_translate_url")]
    pub translate_url: String,

    #[serde(default = "default_tts_url")]
    pub tts_url: String,

    #[serde(default = "default_target_language")]
    pub target_language: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_static_dir() -> String {
    "static".to_string()
}

fn default_language() -> String {
    "en-US".to_string()
}

fn default_audio_capacity() -> usize {
    crate::channel::DEFAULT_AUDIO_CAPACITY
}

fn default_result_capacity() -> usize {
    crate::channel::DEFAULT_RESULT_CAPACITY
}

fn default_close_grace_ms() -> u64 {
    2000
}

fn default_engine() -> String {
    "null".to_string()
}

fn default_model() -> String {
    "chirp_2".to_string()
}

fn default_sample_rate() -> u32 {
    16000
}

fn default_channel_count() -> u16 {
    1
}

fn default_true() -> bool {
    true
}

fn default_translate_url() -> String {
    "https://translation.googleapis.com/language/translate/v2".to_string()
}

fn default_tts_url() -> String {
    "https://texttospeech.googleapis.com/v1/text:synthesize".to_string()
}

fn default_target_language() -> String {
    "en".to_string()
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("static pattern is valid"))
}

/// Interpolate `${VAR}` patterns with environment variable values.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut result = input.to_string();

    for cap in env_var_pattern().captures_iter(input) {
        let var_name = &cap[1];
        let val = std::env::var(var_name)
            .map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
        result = result.replace(&cap[0], &val);
    }

    Ok(result)
}

impl AppConfig {
    /// Load configuration from a TOML file, with environment variable interpolation.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let interpolated = interpolate_env_vars(s)?;
        let config: AppConfig = toml::from_str(&interpolated)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_parse_valid_toml() {
        let toml_str = r#"
[general]
log_level = "debug"

[server]
host = "127.0.0.1"
port = 9000
static_dir = "public"

[session]
default_language = "de-DE"
audio_channel_capacity = 16
result_channel_capacity = 8
close_grace_ms = 500

[recognizer]
engine = "simul"
model = "latest_long"
interim_results = false
address = "127.0.0.1:43007"

[cloud]
api_key = "abc"
target_language = "fr"
"#;
        let config = AppConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.static_dir, "public");
        assert_eq!(config.session.default_language, "de-DE");
        assert_eq!(config.session.audio_channel_capacity, 16);
        assert_eq!(config.session.result_channel_capacity, 8);
        assert_eq!(config.session.close_grace(), Duration::from_millis(500));
        assert_eq!(config.recognizer.engine, "simul");
        assert_eq!(config.recognizer.model, "latest_long");
        assert!(!config.recognizer.interim_results);
        let cloud = config.cloud.unwrap();
        assert_eq!(cloud.api_key.as_deref(), Some("abc"));
        assert_eq!(cloud.target_language, "fr");
        assert!(cloud.translate_url.contains("translate/v2"));
    }

    #[test]
    fn test_config_default_values() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.session.default_language, "en-US");
        assert_eq!(config.session.audio_channel_capacity, 64);
        assert_eq!(config.session.close_grace_ms, 2000);
        assert_eq!(config.recognizer.engine, "null");
        assert_eq!(config.recognizer.model, "chirp_2");
        assert_eq!(config.recognizer.sample_rate_hertz, 16000);
        assert_eq!(config.recognizer.audio_channel_count, 1);
        assert!(config.recognizer.interim_results);
        assert!(config.cloud.is_none());
    }

    #[test]
    fn test_config_recognizer_extra_fields() {
        let toml_str = r#"
[recognizer]
engine = "simul"
address = "10.0.0.2:43007"
connect_timeout_ms = 250
"#;
        let config = AppConfig::from_toml_str(toml_str).unwrap();
        let extra = &config.recognizer.extra;
        assert_eq!(extra.get("address").unwrap().as_str(), Some("10.0.0.2:43007"));
        assert_eq!(extra.get("connect_timeout_ms").unwrap().as_integer(), Some(250));
    }

    #[test]
    fn test_config_env_var_interpolation() {
        std::env::set_var("PARLA_TEST_API_KEY", "secret123");
        let toml_str = r#"
[cloud]
api_key = "${PARLA_TEST_API_KEY}"
"#;
        let config = AppConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.cloud.unwrap().api_key.as_deref(), Some("secret123"));
        std::env::remove_var("PARLA_TEST_API_KEY");
    }

    #[test]
    fn test_config_missing_env_var_error() {
        let toml_str = r#"
[cloud]
api_key = "${DEFINITELY_DOES_NOT_EXIST_12345}"
"#;
        let err = AppConfig::from_toml_str(toml_str).unwrap_err();
        assert!(err.to_string().contains("DEFINITELY_DOES_NOT_EXIST_12345"));
    }

    #[test]
    fn test_config_invalid_toml_error() {
        assert!(AppConfig::from_toml_str("this is not valid toml [[[").is_err());
    }

    #[test]
    fn test_config_load_from_file() {
        let dir = std::env::temp_dir().join("parla_test_config");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("test.toml");
        std::fs::write(
            &path,
            r#"
[server]
port = 8181

[session]
default_language = "ja-JP"
"#,
        )
        .unwrap();

        let config = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(config.server.port, 8181);
        assert_eq!(config.session.default_language, "ja-JP");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_config_load_from_file_not_found() {
        let result = AppConfig::load_from_file(Path::new("/nonexistent/parla.toml"));
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("failed to read config file"));
    }

    #[test]
    fn test_session_config_falls_back_to_default_language() {
        let settings = SessionSettings::default();
        assert_eq!(settings.session_config(None).language_code, "en-US");
        assert_eq!(settings.session_config(Some("  ")).language_code, "en-US");
        assert_eq!(settings.session_config(Some("es-ES")).language_code, "es-ES");
    }

    #[test]
    fn test_streaming_config_for_session() {
        let recognizer = RecognizerConfig::default();
        let config = recognizer.streaming_config(&SessionConfig::new("es-ES"));
        assert_eq!(config.encoding, AudioEncoding::Linear16);
        assert_eq!(config.sample_rate_hertz, 16000);
        assert_eq!(config.audio_channel_count, 1);
        assert_eq!(config.language_codes, vec!["es-ES".to_string()]);
        assert_eq!(config.model, "chirp_2");
        assert!(config.features.enable_word_time_offsets);
        assert!(config.features.enable_word_confidence);
        assert!(config.features.enable_automatic_punctuation);
        assert!(config.interim_results);
    }
}
