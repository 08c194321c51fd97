use anyhow::{Context, Result};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use crate::phonetics::{PhoneticConverter, RemoteDictionary};
use crate::settings::Settings;
use crate::speech::{
    CommandSpeech, DeviceSpeech, ProxySpeech, RemoteSpeech, RodioSink, SpeechEngine, SpeechPlayer,
};
use crate::store::{HttpRecordService, LocalCache, WordStore};
use crate::words::Categories;

/// Services shared by every client-side command, built once from settings.
pub struct AppContext {
    settings: Settings,
    categories: Categories,
    client: reqwest::Client,
    converter: PhoneticConverter,
    store: WordStore,
    engine: SpeechEngine,
    speech: OnceLock<SpeechPlayer>,
}

impl AppContext {
    pub fn new(settings: Settings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .with_context(|| "failed to build HTTP client")?;
        let engine = SpeechEngine::from_name(&settings.speech_engine)?;
        let converter =
            PhoneticConverter::with_remote(RemoteDictionary::new(client.clone(), &settings.api_base));
        let store = WordStore::new(
            Arc::new(HttpRecordService::new(client.clone(), &settings.api_base)),
            LocalCache::new(&settings.cache_file),
        );
        Ok(Self {
            categories: settings.category_set(),
            settings,
            client,
            converter,
            store,
            engine,
            speech: OnceLock::new(),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn categories(&self) -> &Categories {
        &self.categories
    }

    pub fn converter(&self) -> &PhoneticConverter {
        &self.converter
    }

    pub fn store(&self) -> &WordStore {
        &self.store
    }

    /// The speech player. The first call starts on-device voice enumeration,
    /// so it must happen inside a tokio runtime.
    pub fn speech(&self) -> &SpeechPlayer {
        self.speech.get_or_init(|| {
            let remote: Arc<dyn RemoteSpeech> = Arc::new(ProxySpeech::new(
                self.client.clone(),
                &self.settings.api_base,
                Arc::new(RodioSink),
            ));
            let device: Arc<dyn DeviceSpeech> = CommandSpeech::spawn(self.engine);
            SpeechPlayer::new(
                self.converter.clone(),
                Some(remote),
                device,
                self.settings.speech.clone(),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_from_settings_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::with_base_dir(dir.path());
        settings.categories = vec!["食物".to_string(), "交通".to_string()];
        let context = AppContext::new(settings).unwrap();
        assert!(context.categories().contains("交通"));
        assert!(!context.categories().contains("問候"));
        assert_eq!(context.settings().cache_file, dir.path().join("cache/words.json"));
    }

    #[test]
    fn unknown_speech_engine_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::with_base_dir(dir.path());
        settings.speech_engine = "festival".to_string();
        assert!(AppContext::new(settings).is_err());
    }

    #[tokio::test]
    async fn offline_store_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::with_base_dir(dir.path());
        settings.api_base = "http://127.0.0.1:9".to_string();
        let context = AppContext::new(settings).unwrap();
        assert!(context.store().list().await.is_empty());
    }
}
