use reqwest::{StatusCode, Url};
use serde::Deserialize;

use super::{RecordFuture, RecordService, StoreError};
use crate::words::{WordDraft, WordEntry};

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// `RecordService` over the `/api/words` HTTP protocol.
#[derive(Debug, Clone)]
pub struct HttpRecordService {
    client: reqwest::Client,
    api_base: String,
}

impl HttpRecordService {
    pub fn new(client: reqwest::Client, api_base: impl Into<String>) -> Self {
        Self {
            client,
            api_base: api_base.into(),
        }
    }

    /// `/api/words` under the base, with `id` as one escaped path segment.
    fn url(&self, id: Option<&str>) -> Result<Url, StoreError> {
        let mut url = Url::parse(&self.api_base).map_err(|err| {
            StoreError::Transport(format!("invalid api base {}: {}", self.api_base, err))
        })?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                StoreError::Transport(format!("api base cannot hold a path: {}", self.api_base))
            })?;
            segments.pop_if_empty().extend(["api", "words"]);
            if let Some(id) = id {
                segments.push(id);
            }
        }
        Ok(url)
    }
}

fn transport(err: reqwest::Error) -> StoreError {
    StoreError::Transport(err.to_string())
}

async fn rejected(response: reqwest::Response) -> StoreError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|parsed| parsed.error)
        .unwrap_or(body);
    StoreError::Rejected { status, message }
}

async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, StoreError> {
    if !response.status().is_success() {
        return Err(rejected(response).await);
    }
    response.json::<T>().await.map_err(transport)
}

impl RecordService for HttpRecordService {
    fn list(&self) -> RecordFuture<'_, Vec<WordEntry>> {
        Box::pin(async move {
            let response = self
                .client
                .get(self.url(None)?)
                .send()
                .await
                .map_err(transport)?;
            read_json(response).await
        })
    }

    fn create<'a>(&'a self, draft: &'a WordDraft) -> RecordFuture<'a, WordEntry> {
        Box::pin(async move {
            let response = self
                .client
                .post(self.url(None)?)
                .json(draft)
                .send()
                .await
                .map_err(transport)?;
            read_json(response).await
        })
    }

    fn update<'a>(&'a self, id: &'a str, entry: &'a WordEntry) -> RecordFuture<'a, WordEntry> {
        Box::pin(async move {
            let response = self
                .client
                .put(self.url(Some(id))?)
                .json(entry)
                .send()
                .await
                .map_err(transport)?;
            if response.status() == StatusCode::NOT_FOUND {
                return Err(StoreError::NotFound(id.to_string()));
            }
            read_json(response).await
        })
    }

    fn delete<'a>(&'a self, id: &'a str) -> RecordFuture<'a, ()> {
        Box::pin(async move {
            let response = self
                .client
                .delete(self.url(Some(id))?)
                .send()
                .await
                .map_err(transport)?;
            if !response.status().is_success() {
                return Err(rejected(response).await);
            }
            Ok(())
        })
    }
}
