/// REST client for the remote notes vault
use serde_json::Value;
use url::Url;

use crate::error::{Result, TabKeeperError};
use crate::export::RemoteDocuments;
use crate::settings::RemoteConfig;

const NOTE_JSON: &str = "application/vnd.olrapi.note+json";

/// Documents addressed as `{endpoint}/vault/{path}` with bearer auth
pub struct RestVault {
    client: reqwest::Client,
    base: Url,
    api_key: String,
}

impl RestVault {
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::new(),
            base: Url::parse(config.endpoint.trim_end_matches('/'))?,
            api_key: config.api_key.clone(),
        })
    }

    /// Url of a vault document, each path segment percent-encoded
    pub fn document_url(&self, path: &str) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| TabKeeperError::Network(format!("invalid endpoint: {}", self.base)))?
            .pop_if_empty()
            .push("vault")
            .extend(path.split('/').filter(|segment| !segment.is_empty()));
        Ok(url)
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.api_key)
    }
}

/// Document text from a note payload.
///
/// A note JSON object yields its `content`, else its `body`. Any other
/// payload is the document itself. An object with neither field is an error,
/// so an append never starts from a blank document by mistake.
fn note_text(payload: &str) -> Result<String> {
    let note = match serde_json::from_str::<Value>(payload) {
        Ok(note @ Value::Object(_)) => note,
        _ => return Ok(payload.to_string()),
    };
    let fields: Vec<&str> = ["content", "body"]
        .iter()
        .filter_map(|key| note.get(key).and_then(Value::as_str))
        .collect();
    match fields.iter().find(|text| !text.is_empty()) {
        Some(text) => Ok(text.to_string()),
        None if !fields.is_empty() => Ok(String::new()),
        None => Err(TabKeeperError::Network(
            "note payload has no content or body".to_string(),
        )),
    }
}

impl RemoteDocuments for RestVault {
    async fn fetch(&self, path: &str) -> Result<Option<String>> {
        let url = self.document_url(path)?;
        log::debug!("Fetching previous content from {}", url);

        let response = self
            .client
            .get(url)
            .header("Authorization", self.bearer())
            .header("accept", NOTE_JSON)
            .send()
            .await?;

        if !response.status().is_success() {
            log::debug!("No previous content for {} ({})", path, response.status());
            return Ok(None);
        }

        let payload = response.text().await?;
        note_text(&payload).map(Some)
    }

    async fn put(&self, path: &str, content: &str) -> Result<()> {
        let url = self.document_url(path)?;

        let response = self
            .client
            .put(url)
            .header("Authorization", self.bearer())
            .header("Content-Type", "text/markdown")
            .header("accept", "*/*")
            .body(content.to_string())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TabKeeperError::Remote {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
