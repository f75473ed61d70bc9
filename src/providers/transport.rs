//! Authenticated HTTP transport shared by every provider client.
//!
//! Credentials go into a provider-specific header by default, with a
//! query-parameter fallback for deployments where a reverse proxy strips
//! custom headers. Diagnostic output never contains the unmasked credential.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{classify, ErrorRecord};

/// Per-call timeout enforced by the transport, independent of retry spacing.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// How the credential is injected into a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// No credential (public endpoints).
    None,
    /// Provider-specific auth header (e.g. `X-Emby-Token`, `X-Api-Key`).
    Header,
    /// Query-parameter fallback (e.g. `api_key=...`) for proxies that strip
    /// custom headers.
    Query,
}

/// HTTP client bound to one provider connection.
pub struct Transport {
    client: Client,
    base_url: String,
    credential: String,
    header_name: &'static str,
    query_param: &'static str,
}

impl Transport {
    pub fn new(
        base_url: String,
        credential: String,
        header_name: &'static str,
        query_param: &'static str,
        accept_invalid_certs: bool,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credential,
            header_name,
            query_param,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Issue an authenticated GET; non-success statuses and transport
    /// failures come back classified.
    pub async fn get(&self, path: &str, auth: AuthMode) -> Result<reqwest::Response, ErrorRecord> {
        debug!(
            url = %self.url(path),
            auth = ?auth,
            credential = %mask_credential(&self.credential),
            "provider GET"
        );

        let mut request = self.client.get(self.url(path));
        match auth {
            AuthMode::Header => request = request.header(self.header_name, &self.credential),
            AuthMode::Query => {
                request = request.query(&[(self.query_param, self.credential.as_str())])
            }
            AuthMode::None => {}
        }

        let response = request.send().await.map_err(|e| self.classify_scrubbed(&e))?;
        response
            .error_for_status()
            .map_err(|e| self.classify_scrubbed(&e))
    }

    /// GET and deserialize a JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        auth: AuthMode,
    ) -> Result<T, ErrorRecord> {
        let response = self.get(path, auth).await?;
        response.json().await.map_err(|e| self.classify_scrubbed(&e))
    }

    /// GET a body as loose JSON. Non-JSON bodies on successful responses
    /// yield `Value::Null` rather than an error; probe steps only need
    /// whatever metadata fields happen to be present.
    pub async fn get_value(
        &self,
        path: &str,
        auth: AuthMode,
    ) -> Result<serde_json::Value, ErrorRecord> {
        let response = self.get(path, auth).await?;
        let text = response
            .text()
            .await
            .map_err(|e| self.classify_scrubbed(&e))?;
        Ok(serde_json::from_str(&text).unwrap_or(serde_json::Value::Null))
    }

    /// Classify a raw failure, then mask the credential wherever it leaked
    /// into the record. reqwest's messages embed the request URL, and for
    /// query-authenticated calls that URL carries the credential.
    fn classify_scrubbed(&self, error: &reqwest::Error) -> ErrorRecord {
        let mut record = classify(error);
        if self.credential.is_empty() {
            return record;
        }

        let masked = mask_credential(&self.credential);
        record.message = record.message.replace(&self.credential, &masked);
        record.cause = record
            .cause
            .map(|cause| cause.replace(&self.credential, &masked));
        record
    }
}

/// Mask a credential for diagnostics: first three and last two characters,
/// or `[redacted]` entirely when shorter than six.
pub fn mask_credential(credential: &str) -> String {
    let chars: Vec<char> = credential.chars().collect();
    if chars.len() < 6 {
        return "[redacted]".to_string();
    }
    let head: String = chars[..3].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{head}***{tail}")
}
