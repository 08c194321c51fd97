use anyhow::{Context, Result, anyhow};
use lindera::dictionary::{DictionaryKind, load_dictionary_from_kind};
use lindera::mode::Mode;
use lindera::segmenter::Segmenter;
use lindera::tokenizer::Tokenizer;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::warn;
use wana_kana::ConvertJapanese;

use crate::phonetics::Readings;
use crate::script::{has_kanji, katakana_to_hiragana};

// IPADIC feature columns: pos, pos1..pos3, conjugation type and form, base form, reading.
const READING_COLUMN: usize = 7;

#[derive(Debug, Default, Deserialize)]
struct ReadingsFile {
    #[serde(default)]
    readings: HashMap<String, String>,
}

/// Kanji readings from an IPADIC tagger, with user spellings taking precedence.
pub(crate) struct ReadingDictionary {
    tokenizer: Tokenizer,
    overlay: HashMap<String, String>,
}

impl ReadingDictionary {
    /// Bundled IPADIC, overlaid with the `[readings]` table in `extra` when given.
    pub(crate) fn load(extra: Option<&Path>) -> Result<Self> {
        let dictionary = load_dictionary_from_kind(DictionaryKind::IPADIC)
            .map_err(|err| anyhow!("failed to load IPADIC: {}", err))?;
        let mut readings = Self {
            tokenizer: Tokenizer::new(Segmenter::new(Mode::Normal, dictionary, None)),
            overlay: HashMap::new(),
        };
        if let Some(path) = extra {
            if !path.exists() {
                return Err(anyhow!("reading dictionary not found: {}", path.display()));
            }
            let content = fs::read_to_string(path)
                .with_context(|| format!("failed to read readings: {}", path.display()))?;
            let parsed: ReadingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse readings: {}", path.display()))?;
            for (spelling, reading) in parsed.readings {
                readings.insert(&spelling, &reading);
            }
        }
        Ok(readings)
    }

    pub(crate) fn insert(&mut self, spelling: &str, reading: &str) {
        let spelling = spelling.trim();
        let reading = reading.trim();
        if spelling.is_empty() || reading.is_empty() {
            return;
        }
        self.overlay
            .insert(spelling.to_string(), katakana_to_hiragana(reading));
    }

    /// Number of user spellings.
    pub(crate) fn len(&self) -> usize {
        self.overlay.len()
    }

    /// Hiragana for `text`, or `None` if some kanji word has no reading.
    pub(crate) fn to_hiragana(&self, text: &str) -> Option<String> {
        if let Some(reading) = self.overlay.get(text.trim()) {
            return Some(reading.clone());
        }
        let mut tokens = match self.tokenizer.tokenize(text) {
            Ok(tokens) => tokens,
            Err(err) => {
                warn!("tokenizing {:?} failed: {}", text, err);
                return None;
            }
        };
        let mut out = String::new();
        for token in tokens.iter_mut() {
            let surface = token.text.to_string();
            if let Some(reading) = self.overlay.get(&surface) {
                out.push_str(reading);
                continue;
            }
            let details = token.details();
            match details.get(READING_COLUMN).filter(|reading| **reading != "*") {
                Some(reading) => out.push_str(reading),
                None if has_kanji(&surface) => return None,
                None => out.push_str(&surface),
            }
        }
        Some(katakana_to_hiragana(&out))
    }

    /// Readings in all three scripts. Text without kanji, or with a kanji word
    /// the tagger cannot read, gets empty readings so the client can fall back.
    pub(crate) fn convert(&self, text: &str) -> Readings {
        if !has_kanji(text) {
            return Readings::default();
        }
        match self.to_hiragana(text) {
            Some(hiragana) => Readings {
                katakana: hiragana.to_katakana(),
                romaji: hiragana.to_romaji(),
                hiragana,
            },
            None => Readings::default(),
        }
    }
}
