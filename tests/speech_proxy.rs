use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use axum::Router;
use axum::extract::Query;
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::get;
use futures_util::future::BoxFuture;
use tango_notebook::phonetics::PhoneticConverter;
use tango_notebook::server;
use tango_notebook::settings::Settings;
use tango_notebook::speech::{
    AudioSink, DeviceSpeech, ProxySpeech, RemoteSpeech, SpeechFuture, SpeechOptions, SpeechPlayer,
    Utterance, Voice,
};
use tokio::net::TcpListener;

const FAKE_AUDIO: &[u8] = b"ID3\x04fake-mpeg-frames";

#[derive(Debug, Clone)]
struct UpstreamCall {
    query: HashMap<String, String>,
    user_agent: String,
}

type Calls = Arc<Mutex<Vec<UpstreamCall>>>;

async fn start_upstream(status: StatusCode, content_type: &'static str) -> (String, Calls) {
    let calls: Calls = Arc::new(Mutex::new(Vec::new()));
    let recorded = calls.clone();
    let app = Router::new().route(
        "/translate_tts",
        get(
            move |Query(query): Query<HashMap<String, String>>, headers: HeaderMap| {
                let recorded = recorded.clone();
                async move {
                    let user_agent = headers
                        .get(header::USER_AGENT)
                        .and_then(|value| value.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    recorded
                        .lock()
                        .unwrap()
                        .push(UpstreamCall { query, user_agent });
                    (status, [(header::CONTENT_TYPE, content_type)], FAKE_AUDIO.to_vec())
                }
            },
        ),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}/translate_tts", addr), calls)
}

async fn start_service(dir: &std::path::Path, upstream: String) -> String {
    let mut settings = Settings::with_base_dir(dir);
    settings.tts_upstream = upstream;
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        server::serve(listener, &settings).await.unwrap();
    });
    format!("http://{}", addr)
}

#[derive(Default)]
struct RecordingSink {
    clips: Mutex<Vec<Vec<u8>>>,
}

impl AudioSink for RecordingSink {
    fn play(&self, audio: Vec<u8>) -> Result<()> {
        self.clips.lock().unwrap().push(audio);
        Ok(())
    }
}

#[derive(Default)]
struct RecordingDevice {
    spoken: Mutex<Vec<Utterance>>,
}

impl DeviceSpeech for RecordingDevice {
    fn voices(&self) -> Vec<Voice> {
        vec![Voice {
            id: "Kyoko".to_string(),
            name: "Kyoko".to_string(),
            language: "ja_JP".to_string(),
        }]
    }

    fn voices_ready(&self) -> BoxFuture<'_, ()> {
        Box::pin(async {})
    }

    fn cancel(&self) {}

    fn speak(&self, utterance: Utterance) -> SpeechFuture<'_> {
        Box::pin(async move {
            self.spoken.lock().unwrap().push(utterance);
            Ok(())
        })
    }
}

#[tokio::test]
async fn proxy_relays_upstream_audio() {
    let dir = tempfile::tempdir().unwrap();
    let (upstream, calls) = start_upstream(StatusCode::OK, "application/octet-stream").await;
    let base = start_service(dir.path(), upstream).await;

    let response = reqwest::Client::new()
        .get(format!("{}/api/tts", base))
        .query(&[("text", "こんにちは")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/mpeg");
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    assert_eq!(response.bytes().await.unwrap().as_ref(), FAKE_AUDIO);

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let query = &calls[0].query;
    assert_eq!(query["ie"], "UTF-8");
    assert_eq!(query["tl"], "ja");
    assert_eq!(query["client"], "tw-ob");
    assert_eq!(query["textlen"], "5");
    assert_eq!(query["q"], "こんにちは");
    assert!(calls[0].user_agent.starts_with("Mozilla/5.0"));
}

#[tokio::test]
async fn proxy_keeps_playable_content_type() {
    let dir = tempfile::tempdir().unwrap();
    let (upstream, _calls) = start_upstream(StatusCode::OK, "audio/ogg").await;
    let base = start_service(dir.path(), upstream).await;

    let response = reqwest::Client::new()
        .get(format!("{}/api/tts?text=%E9%A7%85", base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/ogg");
}

#[tokio::test]
async fn proxy_relays_upstream_failure_status() {
    let dir = tempfile::tempdir().unwrap();
    let (upstream, _calls) = start_upstream(StatusCode::SERVICE_UNAVAILABLE, "text/html").await;
    let base = start_service(dir.path(), upstream).await;

    let response = reqwest::Client::new()
        .get(format!("{}/api/tts", base))
        .query(&[("text", "でんしゃ")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 503);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body, serde_json::json!({ "error": "TTS request failed" }));
}

#[tokio::test]
async fn proxy_requires_text() {
    let dir = tempfile::tempdir().unwrap();
    let (upstream, calls) = start_upstream(StatusCode::OK, "audio/mpeg").await;
    let base = start_service(dir.path(), upstream).await;

    let response = reqwest::Client::new()
        .get(format!("{}/api/tts", base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    assert!(calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn proxy_speech_plays_fetched_clip() {
    let dir = tempfile::tempdir().unwrap();
    let (upstream, _calls) = start_upstream(StatusCode::OK, "audio/mpeg").await;
    let base = start_service(dir.path(), upstream).await;

    let sink = Arc::new(RecordingSink::default());
    let speech = ProxySpeech::new(reqwest::Client::new(), &base, sink.clone());
    speech.play("でんしゃ").await.unwrap();
    assert_eq!(*sink.clips.lock().unwrap(), vec![FAKE_AUDIO.to_vec()]);
}

#[tokio::test]
async fn long_text_is_fetched_segment_by_segment() {
    let dir = tempfile::tempdir().unwrap();
    let (upstream, calls) = start_upstream(StatusCode::OK, "audio/mpeg").await;
    let base = start_service(dir.path(), upstream).await;

    let sink = Arc::new(RecordingSink::default());
    let remote: Arc<dyn RemoteSpeech> =
        Arc::new(ProxySpeech::new(reqwest::Client::new(), &base, sink.clone()));
    let device = Arc::new(RecordingDevice::default());
    let player = SpeechPlayer::new(
        PhoneticConverter::local_only(),
        Some(remote),
        device.clone(),
        SpeechOptions::default(),
    );

    let text = "あ".repeat(450);
    player.speak(&text, None).await;

    let lengths: Vec<String> = calls
        .lock()
        .unwrap()
        .iter()
        .map(|call| call.query["textlen"].clone())
        .collect();
    assert_eq!(lengths, vec!["200", "200", "50"]);
    assert_eq!(sink.clips.lock().unwrap().len(), 3);
    assert!(device.spoken.lock().unwrap().is_empty());
}

#[tokio::test]
async fn failing_proxy_hands_text_to_device() {
    let dir = tempfile::tempdir().unwrap();
    let (upstream, _calls) = start_upstream(StatusCode::TOO_MANY_REQUESTS, "text/plain").await;
    let base = start_service(dir.path(), upstream).await;

    let sink = Arc::new(RecordingSink::default());
    let remote: Arc<dyn RemoteSpeech> =
        Arc::new(ProxySpeech::new(reqwest::Client::new(), &base, sink.clone()));
    let device = Arc::new(RecordingDevice::default());
    let player = SpeechPlayer::new(
        PhoneticConverter::local_only(),
        Some(remote),
        device.clone(),
        SpeechOptions::default(),
    );

    player.speak("でんしゃにのる", None).await;

    assert!(sink.clips.lock().unwrap().is_empty());
    let spoken = device.spoken.lock().unwrap();
    assert_eq!(spoken.len(), 1);
    assert_eq!(spoken[0].text, "でんしゃにのる");
    assert_eq!(spoken[0].locale, "ja-JP");
    assert_eq!(spoken[0].rate, 0.9);
    assert_eq!(spoken[0].voice.as_ref().map(|v| v.id.as_str()), Some("Kyoko"));
}
