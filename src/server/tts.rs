use axum::body::Body;
use axum::http::{HeaderValue, Response, StatusCode, header};
use tracing::{debug, warn};

use super::models::ServerError;

pub(crate) const DEFAULT_TTS_UPSTREAM: &str = "https://translate.google.com/translate_tts";

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const AUDIO_ACCEPT: &str =
    "audio/webm,audio/ogg,audio/wav,audio/*;q=0.9,application/ogg;q=0.7,video/*;q=0.6,*/*;q=0.5";
const PLAYABLE_MARKERS: &[&str] = &["mp3", "mpeg", "webm", "ogg", "wav"];

/// Relays Japanese synthesis requests to the upstream TTS endpoint.
#[derive(Debug, Clone)]
pub(crate) struct TtsProxy {
    client: reqwest::Client,
    upstream: String,
}

impl TtsProxy {
    pub(crate) fn new(client: reqwest::Client, upstream: impl Into<String>) -> Self {
        Self {
            client,
            upstream: upstream.into(),
        }
    }

    pub(crate) async fn relay(&self, text: &str) -> Result<Response<Body>, ServerError> {
        let text_len = text.chars().count().to_string();
        let upstream = self
            .client
            .get(&self.upstream)
            .query(&[
                ("ie", "UTF-8"),
                ("tl", "ja"),
                ("client", "tw-ob"),
                ("textlen", text_len.as_str()),
                ("q", text),
            ])
            .header(header::USER_AGENT, BROWSER_USER_AGENT)
            .header(header::REFERER, "https://translate.google.com/")
            .header(header::ACCEPT, AUDIO_ACCEPT)
            .send()
            .await
            .map_err(|err| {
                warn!("tts upstream unreachable: {}", err);
                ServerError::internal("TTS request failed")
            })?;

        let status = upstream.status();
        if status != reqwest::StatusCode::OK {
            warn!("tts upstream answered {}", status);
            let relayed = StatusCode::from_u16(status.as_u16())
                .unwrap_or(StatusCode::BAD_GATEWAY);
            return Err(ServerError::new(relayed, "TTS request failed"));
        }

        let content_type = playable_content_type(
            upstream
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok()),
        );
        debug!("relaying tts audio as {}", content_type);

        let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_str(&content_type)
                .unwrap_or_else(|_| HeaderValue::from_static("audio/mpeg")),
        );
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
        Ok(response)
    }
}

/// Upstream content type when browsers can play it, `audio/mpeg` otherwise.
fn playable_content_type(upstream: Option<&str>) -> String {
    match upstream {
        Some(value) if PLAYABLE_MARKERS.iter().any(|marker| value.contains(marker)) => {
            value.to_string()
        }
        _ => "audio/mpeg".to_string(),
    }
}
