use anyhow::{Context, Result};
use std::time::Duration;

use super::dictionary::ReadingDictionary;
use super::records::RecordFile;
use super::tts::TtsProxy;
use crate::settings::Settings;

pub(crate) struct ServerState {
    pub(crate) records: RecordFile,
    pub(crate) dictionary: ReadingDictionary,
    pub(crate) tts: TtsProxy,
}

impl ServerState {
    pub(crate) fn from_settings(settings: &Settings) -> Result<Self> {
        let records = RecordFile::open(&settings.data_file)?;
        let dictionary = ReadingDictionary::load(settings.dictionary_path.as_deref())?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .with_context(|| "failed to build HTTP client")?;
        Ok(Self {
            records,
            dictionary,
            tts: TtsProxy::new(client, settings.tts_upstream.clone()),
        })
    }
}
