use anyhow::Result;
use futures_util::future::BoxFuture;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::phonetics::PhoneticConverter;
use crate::script::has_kanji;

mod device;
mod remote;
pub mod segment;

pub use device::{CommandSpeech, SpeechEngine};
pub use remote::{AudioSink, ProxySpeech, RodioSink};

pub const DEFAULT_MAX_SEGMENT_CHARS: usize = 200;

pub type SpeechFuture<'a> = BoxFuture<'a, Result<()>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Voice {
    pub id: String,
    pub name: String,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub locale: String,
    pub rate: f32,
    pub pitch: f32,
    pub voice: Option<Voice>,
}

/// Remote synthesis tier: fetch audio for `text` and play it to completion.
pub trait RemoteSpeech: Send + Sync {
    fn play<'a>(&'a self, text: &'a str) -> SpeechFuture<'a>;
}

/// On-device synthesis tier.
pub trait DeviceSpeech: Send + Sync {
    /// Voices enumerated so far; empty until the list has loaded.
    fn voices(&self) -> Vec<Voice>;
    /// Resolves once voice enumeration has finished, successfully or not.
    fn voices_ready(&self) -> BoxFuture<'_, ()>;
    /// Stops whatever this device is currently saying.
    fn cancel(&self);
    fn speak(&self, utterance: Utterance) -> SpeechFuture<'_>;
}

#[derive(Debug, Clone)]
pub struct SpeechOptions {
    pub max_segment_chars: usize,
    pub locale: String,
    pub rate: f32,
}

impl Default for SpeechOptions {
    fn default() -> Self {
        Self {
            max_segment_chars: DEFAULT_MAX_SEGMENT_CHARS,
            locale: "ja-JP".to_string(),
            rate: 0.9,
        }
    }
}

/// Pronounces text through the remote proxy, dropping to on-device synthesis for
/// whatever is left once the proxy fails.
pub struct SpeechPlayer {
    converter: PhoneticConverter,
    remote: Option<Arc<dyn RemoteSpeech>>,
    device: Arc<dyn DeviceSpeech>,
    options: SpeechOptions,
}

impl SpeechPlayer {
    pub fn new(
        converter: PhoneticConverter,
        remote: Option<Arc<dyn RemoteSpeech>>,
        device: Arc<dyn DeviceSpeech>,
        options: SpeechOptions,
    ) -> Self {
        Self {
            converter,
            remote,
            device,
            options,
        }
    }

    /// Never fails; every error ends in a log line.
    pub async fn speak(&self, text: &str, hiragana_hint: Option<&str>) {
        let text = self.effective_text(text, hiragana_hint).await;
        if text.trim().is_empty() {
            return;
        }

        let Some(remote) = self.remote.as_ref() else {
            self.speak_on_device(&text).await;
            return;
        };

        let segments = segment::split_segments(&text, self.options.max_segment_chars);
        for (index, segment) in segments.iter().enumerate() {
            let piece = segment.trim();
            if piece.is_empty() {
                continue;
            }
            debug!("remote speech segment {}/{}", index + 1, segments.len());
            if let Err(err) = remote.play(piece).await {
                warn!(
                    "remote speech failed on segment {}/{}: {:#}; using device speech",
                    index + 1,
                    segments.len(),
                    err
                );
                let remaining = segments[index..].concat();
                self.speak_on_device(&remaining).await;
                return;
            }
        }
    }

    async fn effective_text(&self, text: &str, hiragana_hint: Option<&str>) -> String {
        if let Some(hint) = hiragana_hint.map(str::trim).filter(|hint| !hint.is_empty()) {
            return hint.to_string();
        }
        if has_kanji(text) {
            let readings = self.converter.convert(text).await;
            if !readings.hiragana.is_empty() {
                return readings.hiragana;
            }
        }
        text.to_string()
    }

    async fn speak_on_device(&self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        self.device.cancel();
        if self.device.voices().is_empty() {
            self.device.voices_ready().await;
        }
        let voice = pick_voice(&self.device.voices(), &self.options.locale);
        let utterance = Utterance {
            text: text.to_string(),
            locale: self.options.locale.clone(),
            rate: self.options.rate,
            pitch: 1.0,
            voice,
        };
        if let Err(err) = self.device.speak(utterance).await {
            warn!("device speech failed: {:#}", err);
        }
    }
}

/// First voice whose language matches the locale's primary subtag.
pub fn pick_voice(voices: &[Voice], locale: &str) -> Option<Voice> {
    let primary = locale
        .split(['-', '_'])
        .next()
        .unwrap_or(locale)
        .to_ascii_lowercase();
    voices
        .iter()
        .find(|voice| voice.language.to_ascii_lowercase().starts_with(&primary))
        .cloned()
}
