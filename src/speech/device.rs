use anyhow::{Context, Result, anyhow};
use futures_util::future::BoxFuture;
use std::process::Stdio;
use std::sync::{Arc, RwLock};
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tracing::{debug, warn};

use super::{DeviceSpeech, SpeechFuture, Utterance, Voice};

const BASE_WORDS_PER_MINUTE: f32 = 175.0;
const BASE_ESPEAK_PITCH: f32 = 50.0;

/// System speech command used for on-device synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechEngine {
    /// macOS `say`.
    Say,
    /// `espeak-ng`.
    Espeak,
}

impl SpeechEngine {
    pub fn detect() -> Self {
        if cfg!(target_os = "macos") {
            SpeechEngine::Say
        } else {
            SpeechEngine::Espeak
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(Self::detect()),
            "say" => Ok(SpeechEngine::Say),
            "espeak" | "espeak-ng" => Ok(SpeechEngine::Espeak),
            other => Err(anyhow!(
                "unknown speech engine '{}'. Available: auto, say, espeak-ng",
                other
            )),
        }
    }

    pub fn program(&self) -> &'static str {
        match self {
            SpeechEngine::Say => "say",
            SpeechEngine::Espeak => "espeak-ng",
        }
    }

    fn list_args(&self) -> &'static [&'static str] {
        match self {
            SpeechEngine::Say => &["-v", "?"],
            SpeechEngine::Espeak => &["--voices"],
        }
    }

    pub(crate) fn parse_voices(&self, listing: &str) -> Vec<Voice> {
        match self {
            SpeechEngine::Say => listing.lines().filter_map(parse_say_voice).collect(),
            SpeechEngine::Espeak => listing
                .lines()
                .skip(1)
                .filter_map(parse_espeak_voice)
                .collect(),
        }
    }

    pub(crate) fn speak_args(&self, utterance: &Utterance) -> Vec<String> {
        let words_per_minute = (BASE_WORDS_PER_MINUTE * utterance.rate).round().max(1.0) as u32;
        let mut args = Vec::new();
        match self {
            SpeechEngine::Say => {
                if let Some(voice) = &utterance.voice {
                    args.push("-v".to_string());
                    args.push(voice.id.clone());
                }
                args.push("-r".to_string());
                args.push(words_per_minute.to_string());
            }
            SpeechEngine::Espeak => {
                let voice = utterance
                    .voice
                    .as_ref()
                    .map(|voice| voice.id.clone())
                    .unwrap_or_else(|| primary_language(&utterance.locale));
                args.push("-v".to_string());
                args.push(voice);
                args.push("-s".to_string());
                args.push(words_per_minute.to_string());
                args.push("-p".to_string());
                args.push(((BASE_ESPEAK_PITCH * utterance.pitch).round() as u32).to_string());
            }
        }
        args.push(utterance.text.clone());
        args
    }
}

// `Kyoko               ja_JP    # こんにちは、私の名前はKyokoです。`
fn parse_say_voice(line: &str) -> Option<Voice> {
    let head = line.split('#').next()?.trim_end();
    let (name, language) = head.rsplit_once(char::is_whitespace)?;
    let name = name.trim();
    if name.is_empty() || language.is_empty() {
        return None;
    }
    Some(Voice {
        id: name.to_string(),
        name: name.to_string(),
        language: language.to_string(),
    })
}

// ` 5  ja              --/M      Japanese           jpx/ja`
fn parse_espeak_voice(line: &str) -> Option<Voice> {
    let mut columns = line.split_whitespace();
    let _priority = columns.next()?;
    let language = columns.next()?;
    let _age_gender = columns.next()?;
    let name = columns.next()?;
    Some(Voice {
        id: language.to_string(),
        name: name.to_string(),
        language: language.to_string(),
    })
}

fn primary_language(locale: &str) -> String {
    locale
        .split(['-', '_'])
        .next()
        .unwrap_or(locale)
        .to_ascii_lowercase()
}

async fn list_voices(engine: SpeechEngine) -> Result<Vec<Voice>> {
    let output = Command::new(engine.program())
        .args(engine.list_args())
        .stdin(Stdio::null())
        .output()
        .await
        .with_context(|| format!("failed to run {}", engine.program()))?;
    if !output.status.success() {
        return Err(anyhow!(
            "{} exited with {} while listing voices",
            engine.program(),
            output.status
        ));
    }
    Ok(engine.parse_voices(&String::from_utf8_lossy(&output.stdout)))
}

/// On-device synthesis through a speech command.
///
/// Voices are enumerated in the background; `voices_ready` resolves when that
/// finishes. `cancel` interrupts every utterance requested before it.
pub struct CommandSpeech {
    engine: SpeechEngine,
    voices: Arc<RwLock<Vec<Voice>>>,
    ready: watch::Receiver<bool>,
    // Bumped on every cancel.
    cancel: watch::Sender<u64>,
}

impl CommandSpeech {
    /// Starts voice enumeration. Must be called from inside a tokio runtime.
    pub fn spawn(engine: SpeechEngine) -> Arc<Self> {
        let (ready_tx, ready) = watch::channel(false);
        let voices = Arc::new(RwLock::new(Vec::new()));
        let loaded = voices.clone();
        tokio::spawn(async move {
            match list_voices(engine).await {
                Ok(list) => {
                    debug!("{} reported {} voices", engine.program(), list.len());
                    *loaded.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = list;
                }
                Err(err) => warn!("voice enumeration failed: {:#}", err),
            }
            let _ = ready_tx.send(true);
        });
        Arc::new(Self {
            engine,
            voices,
            ready,
            cancel: watch::channel(0).0,
        })
    }
}

impl DeviceSpeech for CommandSpeech {
    fn voices(&self) -> Vec<Voice> {
        self.voices
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn voices_ready(&self) -> BoxFuture<'_, ()> {
        let mut ready = self.ready.clone();
        Box::pin(async move {
            let _ = ready.wait_for(|loaded| *loaded).await;
        })
    }

    fn cancel(&self) {
        self.cancel.send_modify(|generation| *generation += 1);
    }

    fn speak(&self, utterance: Utterance) -> SpeechFuture<'_> {
        // Subscribe before the future is first polled so an early cancel still lands.
        let cancelled = self.cancel.subscribe();
        Box::pin(async move {
            let program = self.engine.program();
            let child = Command::new(program)
                .args(self.engine.speak_args(&utterance))
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .kill_on_drop(true)
                .spawn()
                .with_context(|| format!("failed to start {}", program))?;
            wait_or_cancel(child, program, cancelled).await
        })
    }
}

async fn wait_or_cancel(
    mut child: Child,
    program: &str,
    mut cancelled: watch::Receiver<u64>,
) -> Result<()> {
    tokio::select! {
        status = child.wait() => {
            let status = status.with_context(|| format!("failed to wait for {}", program))?;
            if !status.success() {
                return Err(anyhow!("{} exited with {}", program, status));
            }
            Ok(())
        }
        _ = cancelled.changed() => {
            debug!("device speech cancelled");
            let _ = child.kill().await;
            Ok(())
        }
    }
}
