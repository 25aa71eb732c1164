pub mod phrases;
mod rest;
pub mod synthesizer;
pub mod translator;

pub use phrases::{voice_for, PhraseBook, DEFAULT_LANGUAGE};
pub use synthesizer::{GoogleSynthesizer, Synthesizer};
pub use translator::{GoogleTranslator, Translation, Translator};
