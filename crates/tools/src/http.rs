//! Shared request plumbing for the REST-backed providers.

use aide_core::error::ProviderError;
use serde_json::Value;
use tracing::warn;

/// Send `request` and decode a JSON body, mapping every failure to a
/// [`ProviderError`] tagged with `source_name`.
pub(crate) async fn send_json(
    source_name: &str,
    request: reqwest::RequestBuilder,
) -> Result<Value, ProviderError> {
    let response = request.send().await.map_err(|e| ProviderError::Network {
        source_name: source_name.into(),
        reason: e.to_string(),
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!(source = source_name, status = status.as_u16(), "Source API returned error");
        return Err(ProviderError::Api {
            source_name: source_name.into(),
            status_code: status.as_u16(),
            message: body,
        });
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| ProviderError::InvalidResponse {
            source_name: source_name.into(),
            reason: e.to_string(),
        })
}

/// First `plain_text` of a Notion-style rich text array.
pub(crate) fn plain_text(rich_text: &Value) -> Option<&str> {
    rich_text
        .as_array()?
        .first()?
        .get("plain_text")?
        .as_str()
        .filter(|s| !s.trim().is_empty())
}
