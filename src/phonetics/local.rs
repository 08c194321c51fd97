use wana_kana::ConvertJapanese;

use super::{ConvertFuture, ReadingSource, Readings};

/// Rule-based kana/romaji transliteration. Kanji pass through untouched, so this
/// tier can only ever produce a partial reading for logographic input.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTransliterator;

impl LocalTransliterator {
    pub fn transliterate(text: &str) -> Readings {
        let hiragana = text.to_hiragana();
        let katakana = text.to_katakana();
        let romaji = text.to_romaji();

        // Identical output in all three scripts means nothing was understood.
        if hiragana == text && katakana == text && romaji == text {
            return Readings::default();
        }
        Readings {
            hiragana,
            katakana,
            romaji,
        }
    }
}

impl ReadingSource for LocalTransliterator {
    fn name(&self) -> &'static str {
        "local transliterator"
    }

    fn applies_to(&self, _text: &str) -> bool {
        true
    }

    fn try_convert<'a>(&'a self, text: &'a str) -> ConvertFuture<'a> {
        Box::pin(async move { Ok(Self::transliterate(text)) })
    }
}
