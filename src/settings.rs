use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::paths;
use crate::speech::SpeechOptions;
use crate::words::{Categories, DEFAULT_CATEGORIES};

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone)]
pub struct Settings {
    pub base_dir: PathBuf,
    pub server_addr: String,
    pub data_file: PathBuf,
    pub api_base: String,
    pub timeout_secs: u64,
    pub cache_file: PathBuf,
    pub speech: SpeechOptions,
    pub speech_engine: String,
    pub tts_upstream: String,
    pub dictionary_path: Option<PathBuf>,
    pub categories: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self::with_base_dir(paths::base_dir())
    }
}

impl Settings {
    /// Built-in defaults with every file living under `base_dir`.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        Self {
            server_addr: "127.0.0.1:4173".to_string(),
            data_file: base_dir.join("words.json"),
            api_base: "http://127.0.0.1:4173".to_string(),
            timeout_secs: 10,
            cache_file: base_dir.join("cache").join("words.json"),
            speech: SpeechOptions::default(),
            speech_engine: "auto".to_string(),
            tts_upstream: crate::server::DEFAULT_TTS_UPSTREAM.to_string(),
            dictionary_path: None,
            categories: DEFAULT_CATEGORIES.iter().map(|label| label.to_string()).collect(),
            base_dir,
        }
    }

    pub fn category_set(&self) -> Categories {
        Categories::new(self.categories.iter().cloned())
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    server: Option<ServerSettings>,
    client: Option<ClientSettings>,
    speech: Option<SpeechSettings>,
    tts: Option<TtsSettings>,
    dictionary: Option<DictionarySettings>,
    categories: Option<CategorySettings>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSettings {
    addr: Option<String>,
    data_file: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ClientSettings {
    api_base: Option<String>,
    timeout_secs: Option<u64>,
    cache_file: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SpeechSettings {
    max_segment_chars: Option<usize>,
    rate: Option<f32>,
    locale: Option<String>,
    engine: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TtsSettings {
    upstream: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DictionarySettings {
    path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CategorySettings {
    labels: Option<Vec<String>>,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    load_settings_in(&paths::base_dir(), extra_path)
}

/// Layers, later wins: built-in defaults, `settings.toml` and
/// `settings.local.toml` in the working directory, the same two files under
/// `base_dir`, then `extra_path`.
pub fn load_settings_in(base_dir: &Path, extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::with_base_dir(base_dir);
    let defaults: SettingsFile =
        toml::from_str(DEFAULT_SETTINGS_TOML).with_context(|| "failed to parse default settings")?;
    settings.merge(defaults);
    ensure_home_settings_file(base_dir)?;

    let mut ordered_paths = vec![
        PathBuf::from("settings.toml"),
        PathBuf::from("settings.local.toml"),
        base_dir.join("settings.toml"),
        base_dir.join("settings.local.toml"),
    ];

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings.merge(parsed);
        }
    }

    Ok(settings)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(server) = incoming.server {
            if let Some(addr) = non_blank(server.addr) {
                self.server_addr = addr;
            }
            if let Some(path) = server
                .data_file
                .and_then(|value| paths::resolve_in(&self.base_dir, &value))
            {
                self.data_file = path;
            }
        }
        if let Some(client) = incoming.client {
            if let Some(api_base) = non_blank(client.api_base) {
                self.api_base = api_base;
            }
            if let Some(timeout) = client.timeout_secs {
                if timeout > 0 {
                    self.timeout_secs = timeout;
                }
            }
            if let Some(path) = client
                .cache_file
                .and_then(|value| paths::resolve_in(&self.base_dir, &value))
            {
                self.cache_file = path;
            }
        }
        if let Some(speech) = incoming.speech {
            if let Some(max) = speech.max_segment_chars {
                if max > 0 {
                    self.speech.max_segment_chars = max;
                }
            }
            if let Some(rate) = speech.rate {
                if rate > 0.0 {
                    self.speech.rate = rate;
                }
            }
            if let Some(locale) = non_blank(speech.locale) {
                self.speech.locale = locale;
            }
            if let Some(engine) = non_blank(speech.engine) {
                self.speech_engine = engine;
            }
        }
        if let Some(tts) = incoming.tts {
            if let Some(upstream) = non_blank(tts.upstream) {
                self.tts_upstream = upstream;
            }
        }
        if let Some(dictionary) = incoming.dictionary {
            if let Some(path) = dictionary
                .path
                .and_then(|value| paths::resolve_in(&self.base_dir, &value))
            {
                self.dictionary_path = Some(path);
            }
        }
        if let Some(categories) = incoming.categories {
            if let Some(labels) = categories.labels {
                let labels: Vec<String> = labels
                    .into_iter()
                    .filter(|label| !label.trim().is_empty())
                    .collect();
                if !labels.is_empty() {
                    self.categories = labels;
                }
            }
        }
    }
}

fn ensure_home_settings_file(base_dir: &Path) -> Result<()> {
    fs::create_dir_all(base_dir)
        .with_context(|| format!("failed to create settings directory: {}", base_dir.display()))?;
    let path = base_dir.join("settings.toml");
    if !path.exists() {
        fs::write(&path, DEFAULT_SETTINGS_TOML)
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
    }
    Ok(())
}
