use anyhow::{Context, Result, anyhow};
use std::io::Cursor;
use std::sync::Arc;
use tracing::debug;

use super::{RemoteSpeech, SpeechFuture};

/// Blocking audio output. `play` returns once the clip has finished.
pub trait AudioSink: Send + Sync {
    fn play(&self, audio: Vec<u8>) -> Result<()>;
}

/// Default output device through rodio.
#[derive(Debug, Clone, Copy, Default)]
pub struct RodioSink;

impl AudioSink for RodioSink {
    fn play(&self, audio: Vec<u8>) -> Result<()> {
        let stream = rodio::OutputStreamBuilder::open_default_stream()
            .with_context(|| "failed to open audio output")?;
        let sink = rodio::Sink::connect_new(stream.mixer());
        let source =
            rodio::Decoder::new(Cursor::new(audio)).with_context(|| "failed to decode audio")?;
        sink.append(source);
        sink.sleep_until_end();
        Ok(())
    }
}

/// Fetches synthesized audio from the service's `/api/tts` proxy.
#[derive(Clone)]
pub struct ProxySpeech {
    client: reqwest::Client,
    api_base: String,
    sink: Arc<dyn AudioSink>,
}

impl ProxySpeech {
    pub fn new(client: reqwest::Client, api_base: impl Into<String>, sink: Arc<dyn AudioSink>) -> Self {
        Self {
            client,
            api_base: api_base.into(),
            sink,
        }
    }

    pub async fn fetch(&self, text: &str) -> Result<Vec<u8>> {
        let url = format!("{}/api/tts", self.api_base.trim_end_matches('/'));
        let response = self
            .client
            .get(url)
            .query(&[("text", text), ("lang", "ja")])
            .send()
            .await
            .with_context(|| "failed to reach speech proxy")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("speech proxy error ({}): {}", status, body));
        }
        let audio = response
            .bytes()
            .await
            .with_context(|| "failed to read synthesized audio")?;
        if audio.is_empty() {
            return Err(anyhow!("speech proxy returned no audio"));
        }
        Ok(audio.to_vec())
    }
}

impl RemoteSpeech for ProxySpeech {
    fn play<'a>(&'a self, text: &'a str) -> SpeechFuture<'a> {
        Box::pin(async move {
            let audio = self.fetch(text).await?;
            debug!("playing {} bytes of synthesized audio", audio.len());
            let sink = self.sink.clone();
            tokio::task::spawn_blocking(move || sink.play(audio))
                .await
                .with_context(|| "audio playback task failed")?
        })
    }
}
