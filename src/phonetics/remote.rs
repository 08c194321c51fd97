use anyhow::{Context, anyhow};
use serde_json::json;

use super::{ConvertFuture, ReadingSource, Readings};
use crate::script::has_kanji;

/// Client for the service's `/api/convert` dictionary endpoint.
#[derive(Debug, Clone)]
pub struct RemoteDictionary {
    client: reqwest::Client,
    api_base: String,
}

impl RemoteDictionary {
    pub fn new(client: reqwest::Client, api_base: impl Into<String>) -> Self {
        Self {
            client,
            api_base: api_base.into(),
        }
    }

    fn url(&self) -> String {
        format!("{}/api/convert", self.api_base.trim_end_matches('/'))
    }
}

impl ReadingSource for RemoteDictionary {
    fn name(&self) -> &'static str {
        "remote dictionary"
    }

    fn applies_to(&self, text: &str) -> bool {
        has_kanji(text)
    }

    fn try_convert<'a>(&'a self, text: &'a str) -> ConvertFuture<'a> {
        Box::pin(async move {
            let response = self
                .client
                .post(self.url())
                .json(&json!({ "text": text }))
                .send()
                .await
                .with_context(|| "failed to reach conversion service")?;

            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            if !status.is_success() {
                return Err(anyhow!("conversion service error ({}): {}", status, body));
            }
            let readings: Readings = serde_json::from_str(&body)
                .with_context(|| "failed to parse conversion response")?;
            Ok(readings)
        })
    }
}
