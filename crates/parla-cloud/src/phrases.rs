//! Practice phrases and synthesis voices per language.

use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hasher};

pub const DEFAULT_LANGUAGE: &str = "en-US";

const EN_US: &[&str] = &[
    "Hello world",
    "How are you",
    "What is your name",
    "Good morning",
    "Thank you very much",
    "Excuse me please",
    "I am sorry",
    "Have a nice day",
    "The sky is blue",
    "I love to travel",
    "The quick brown fox jumps over the lazy dog",
    "An apple a day keeps the doctor away",
    "Never underestimate the power of a good book",
    "The early bird catches the worm",
    "Actions speak louder than words",
    "Where there is a will, there is a way",
    "Technology has changed the world we live in",
    "To be or not to be, that is the question",
    "Every cloud has a silver lining",
    "The best way to predict the future is to create it",
    "Honesty is the best policy",
    "In the middle of difficulty lies opportunity",
    "The only thing we have to fear is fear itself",
    "That which does not kill us makes us stronger",
    "The journey of a thousand miles begins with a single step",
];

const ES_ES: &[&str] = &[
    "Hola mundo",
    "¿Cómo estás?",
    "¿Cuál es tu nombre?",
    "Buenos días",
    "Muchas gracias",
    "Perdón, por favor",
    "Lo siento",
    "Que tengas un buen día",
    "El cielo es azul",
    "Me encanta viajar",
];

const JA_JP: &[&str] = &[
    "こんにちは世界",
    "お元気ですか",
    "お名前は何ですか",
    "おはようございます",
    "ありがとうございます",
    "すみません",
    "ごめんなさい",
    "良い一日を",
    "空は青いです",
    "旅行が大好きです",
];

const PT_BR: &[&str] = &[
    "Olá, mundo",
    "Como você está?",
    "Qual é o seu nome?",
    "Bom dia",
    "Muito obrigado",
    "Com licença, por favor",
    "Me desculpe",
    "Tenha um bom dia",
    "O céu é azul",
    "Eu amo viajar",
];

const DE_DE: &[&str] = &[
    "Hallo Welt",
    "Wie geht es Ihnen?",
    "Wie heißen Sie?",
    "Guten Morgen",
    "Vielen Dank",
    "Entschuldigen Sie bitte",
    "Es tut mir leid",
    "Schönen Tag noch",
    "Der Himmel ist blau",
    "Ich liebe es zu reisen",
];

/// Built-in phrase lists. Unknown languages use the en-US list.
#[derive(Debug, Default, Clone, Copy)]
pub struct PhraseBook;

impl PhraseBook {
    pub fn new() -> Self {
        Self
    }

    pub fn languages(&self) -> &'static [&'static str] {
        &["en-US", "es-ES", "ja-JP", "pt-BR", "de-DE"]
    }

    pub fn phrases(&self, language: &str) -> &'static [&'static str] {
        match language {
            "es-ES" => ES_ES,
            "ja-JP" => JA_JP,
            "pt-BR" => PT_BR,
            "de-DE" => DE_DE,
            _ => EN_US,
        }
    }

    pub fn random_phrase(&self, language: &str) -> &'static str {
        let phrases = self.phrases(language);
        phrases[random_index(phrases.len())]
    }
}

fn random_index(len: usize) -> usize {
    let seed = RandomState::new().build_hasher().finish();
    (seed % len.max(1) as u64) as usize
}

/// Synthesis voice for a language, falling back to the en-US voice.
pub fn voice_for(language: &str) -> &'static str {
    match language {
        "es-ES" => "es-ES-Wavenet-B",
        "ja-JP" => "ja-JP-Wavenet-A",
        "pt-BR" => "pt-BR-Wavenet-A",
        "de-DE" => "de-DE-Wavenet-F",
        _ => "en-US-Chirp3-HD-Charon",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_language_has_phrases() {
        let book = PhraseBook::new();
        for language in book.languages() {
            assert!(!book.phrases(language).is_empty(), "{language}");
        }
    }

    #[test]
    fn test_unknown_language_falls_back_to_english() {
        let book = PhraseBook::new();
        assert_eq!(book.phrases("fr-FR"), book.phrases(DEFAULT_LANGUAGE));
        assert!(EN_US.contains(&book.random_phrase("fr-FR")));
    }

    #[test]
    fn test_random_phrase_comes_from_language_list() {
        let book = PhraseBook::new();
        for _ in 0..20 {
            assert!(ES_ES.contains(&book.random_phrase("es-ES")));
        }
    }

    #[test]
    fn test_voice_mapping() {
        assert_eq!(voice_for("en-US"), "en-US-Chirp3-HD-Charon");
        assert_eq!(voice_for("ja-JP"), "ja-JP-Wavenet-A");
        assert_eq!(voice_for("de-DE"), "de-DE-Wavenet-F");
        assert_eq!(voice_for("it-IT"), "en-US-Chirp3-HD-Charon");
    }
}
