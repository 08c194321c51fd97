use anyhow::Result;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

mod local;
mod remote;

pub use local::LocalTransliterator;
pub use remote::RemoteDictionary;

/// The three derived readings of a piece of Japanese-adjacent text.
///
/// An empty field means "could not determine", never "determined to be empty".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Readings {
    pub hiragana: String,
    pub katakana: String,
    pub romaji: String,
}

impl Readings {
    pub fn is_empty(&self) -> bool {
        self.hiragana.is_empty() && self.katakana.is_empty() && self.romaji.is_empty()
    }
}

pub type ConvertFuture<'a> = BoxFuture<'a, Result<Readings>>;

/// One tier of the conversion chain.
pub trait ReadingSource: Send + Sync {
    fn name(&self) -> &'static str;
    /// Whether this source should be consulted for `text` at all.
    fn applies_to(&self, text: &str) -> bool;
    fn try_convert<'a>(&'a self, text: &'a str) -> ConvertFuture<'a>;
}

/// Runs the reading sources in order and keeps the first usable answer.
#[derive(Clone)]
pub struct PhoneticConverter {
    sources: Vec<Arc<dyn ReadingSource>>,
}

impl PhoneticConverter {
    pub fn new(sources: Vec<Arc<dyn ReadingSource>>) -> Self {
        Self { sources }
    }

    /// Remote dictionary first, local transliteration after it.
    pub fn with_remote(remote: RemoteDictionary) -> Self {
        let sources: Vec<Arc<dyn ReadingSource>> =
            vec![Arc::new(remote), Arc::new(LocalTransliterator)];
        Self::new(sources)
    }

    pub fn local_only() -> Self {
        let sources: Vec<Arc<dyn ReadingSource>> = vec![Arc::new(LocalTransliterator)];
        Self::new(sources)
    }

    pub async fn convert(&self, text: &str) -> Readings {
        let text = text.trim();
        if text.is_empty() {
            return Readings::default();
        }

        for source in &self.sources {
            if !source.applies_to(text) {
                continue;
            }
            match source.try_convert(text).await {
                Ok(readings) if !readings.is_empty() => {
                    debug!("{} converted {:?} -> {:?}", source.name(), text, readings);
                    return readings;
                }
                Ok(_) => {
                    debug!("{} produced no reading for {:?}", source.name(), text);
                }
                Err(err) => {
                    warn!("{} conversion failed for {:?}: {:#}", source.name(), text, err);
                }
            }
        }
        Readings::default()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedSource;
    use super::*;

    fn chain(first: &Arc<ScriptedSource>) -> PhoneticConverter {
        let sources: Vec<Arc<dyn ReadingSource>> =
            vec![first.clone(), Arc::new(LocalTransliterator)];
        PhoneticConverter::new(sources)
    }

    fn readings(h: &str, k: &str, r: &str) -> Readings {
        Readings {
            hiragana: h.to_string(),
            katakana: k.to_string(),
            romaji: r.to_string(),
        }
    }

    #[tokio::test]
    async fn blank_input_consults_nobody() {
        let remote = Arc::new(ScriptedSource::answering(readings("a", "b", "c")));
        let sources: Vec<Arc<dyn ReadingSource>> = vec![remote.clone()];
        let converter = PhoneticConverter::new(sources);
        assert_eq!(converter.convert("").await, Readings::default());
        assert_eq!(converter.convert("  \t ").await, Readings::default());
        assert_eq!(remote.call_count(), 0);
    }

    #[tokio::test]
    async fn first_usable_answer_wins() {
        let remote = Arc::new(ScriptedSource::answering(readings(
            "でんしゃ", "デンシャ", "densha",
        )));
        let converter = chain(&remote);
        let result = converter.convert(" 電車 ").await;
        assert_eq!(result, readings("でんしゃ", "デンシャ", "densha"));
        assert_eq!(*remote.calls.lock().unwrap(), vec!["電車".to_string()]);
    }

    #[tokio::test]
    async fn remote_failure_matches_local_alone() {
        let remote = Arc::new(ScriptedSource::failing_remote());
        let chained = chain(&remote);
        let local = PhoneticConverter::local_only();

        for text in ["食べもの", "カタカナと漢字", "你好"] {
            assert_eq!(chained.convert(text).await, local.convert(text).await, "{text}");
        }
        assert_eq!(remote.call_count(), 3);
    }

    #[tokio::test]
    async fn remote_skipped_without_kanji() {
        let remote = Arc::new(ScriptedSource::failing_remote());
        let converter = chain(&remote);
        let result = converter.convert("でんしゃ").await;
        assert_eq!(result.katakana, "デンシャ");
        assert_eq!(remote.call_count(), 0);
    }

    #[tokio::test]
    async fn empty_remote_answer_falls_through() {
        let remote = Arc::new(ScriptedSource {
            kanji_only: true,
            ..ScriptedSource::answering(Readings::default())
        });
        let converter = chain(&remote);
        let result = converter.convert("おいしい料理").await;
        assert_eq!(remote.call_count(), 1);
        assert_eq!(result, PhoneticConverter::local_only().convert("おいしい料理").await);
    }

    #[tokio::test]
    async fn exhausted_chain_is_all_empty() {
        let sources: Vec<Arc<dyn ReadingSource>> = vec![Arc::new(ScriptedSource::failing_remote())];
        let converter = PhoneticConverter::new(sources);
        assert!(converter.convert("漢字").await.is_empty());
    }
}
