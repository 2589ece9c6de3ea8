//! Object store client for profile pictures.
//!
//! The service never serves image bytes itself: uploads are written to an
//! external object store over a small authenticated REST protocol
//! (`PUT`/`DELETE` by key) and only the resulting public URL is recorded
//! on the employee row. Deletes are used to reclaim the previous image
//! after a replacement upload and are always best-effort at call sites.

use anyhow::{anyhow, Context, Result};
use reqwest::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    Client,
};
use secrecy::{ExposeSecret, SecretString};
use tracing::{info_span, Instrument};

#[derive(Clone, Debug)]
pub struct MediaConfig {
    endpoint: String,
    public_base_url: String,
    auth_token: Option<SecretString>,
}

impl MediaConfig {
    #[must_use]
    pub fn new(endpoint: String, public_base_url: String) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            auth_token: None,
        }
    }

    #[must_use]
    pub fn with_auth_token(mut self, token: SecretString) -> Self {
        self.auth_token = Some(token);
        self
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[must_use]
    pub fn public_base_url(&self) -> &str {
        &self.public_base_url
    }
}

/// Writes and deletes objects in the external store.
#[derive(Debug)]
pub struct MediaStore {
    config: MediaConfig,
    client: Client,
}

impl MediaStore {
    /// Build the store client.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: MediaConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .build()
            .context("Failed to build media store HTTP client")?;
        Ok(Self { config, client })
    }

    /// Upload an object and return its durable public URL.
    ///
    /// # Errors
    /// Returns an error if the store is unreachable or rejects the write.
    pub async fn upload(&self, key: &str, content_type: &str, bytes: Vec<u8>) -> Result<String> {
        let url = format!("{}/{key}", self.config.endpoint);
        let span = info_span!(
            "media.upload",
            http.method = "PUT",
            url = %url,
            size = bytes.len()
        );
        async {
            let mut request = self
                .client
                .put(&url)
                .header(CONTENT_TYPE, content_type)
                .body(bytes);
            if let Some(token) = &self.config.auth_token {
                request = request.header(
                    AUTHORIZATION,
                    format!("Bearer {}", token.expose_secret()),
                );
            }
            let response = request.send().await.context("media store upload failed")?;
            let status = response.status();
            if !status.is_success() {
                return Err(anyhow!("media store upload failed: {status}"));
            }
            Ok(self.public_url(key))
        }
        .instrument(span)
        .await
    }

    /// Delete a previously uploaded object identified by its public URL.
    ///
    /// URLs outside the configured public base (e.g. the default avatar)
    /// are rejected so the service never issues deletes it does not own.
    ///
    /// # Errors
    /// Returns an error if the URL is foreign or the store rejects the delete.
    pub async fn delete(&self, public_url: &str) -> Result<()> {
        let Some(key) = self.key_for_public_url(public_url) else {
            return Err(anyhow!("refusing to delete foreign object: {public_url}"));
        };
        let url = format!("{}/{key}", self.config.endpoint);
        let span = info_span!("media.delete", http.method = "DELETE", url = %url);
        async {
            let mut request = self.client.delete(&url);
            if let Some(token) = &self.config.auth_token {
                request = request.header(
                    AUTHORIZATION,
                    format!("Bearer {}", token.expose_secret()),
                );
            }
            let response = request.send().await.context("media store delete failed")?;
            let status = response.status();
            // 404 means the object is already gone, which is the goal.
            if !status.is_success() && status.as_u16() != 404 {
                return Err(anyhow!("media store delete failed: {status}"));
            }
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Whether the given URL points at an object this store manages.
    #[must_use]
    pub fn owns(&self, public_url: &str) -> bool {
        self.key_for_public_url(public_url).is_some()
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{key}", self.config.public_base_url)
    }

    fn key_for_public_url<'a>(&self, public_url: &'a str) -> Option<&'a str> {
        let prefix = &self.config.public_base_url;
        let rest = public_url.strip_prefix(prefix.as_str())?;
        let key = rest.strip_prefix('/')?;
        if key.is_empty() {
            None
        } else {
            Some(key)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MediaStore {
        let config = MediaConfig::new(
            "http://localhost:9000/roster-media/".to_string(),
            "https://media.rosterhq.dev".to_string(),
        );
        MediaStore::new(config).expect("client should build")
    }

    #[test]
    fn config_trims_trailing_slashes() {
        let config = MediaConfig::new(
            "http://localhost:9000/bucket/".to_string(),
            "https://media.example.com/".to_string(),
        );
        assert_eq!(config.endpoint(), "http://localhost:9000/bucket");
        assert_eq!(config.public_base_url(), "https://media.example.com");
    }

    #[test]
    fn public_url_joins_key() {
        let store = store();
        assert_eq!(
            store.public_url("avatars/EM-000123/pic.png"),
            "https://media.rosterhq.dev/avatars/EM-000123/pic.png"
        );
    }

    #[test]
    fn key_extraction_only_for_owned_urls() {
        let store = store();
        assert_eq!(
            store.key_for_public_url("https://media.rosterhq.dev/avatars/a.png"),
            Some("avatars/a.png")
        );
        assert!(store.owns("https://media.rosterhq.dev/avatars/a.png"));
        assert!(!store.owns("https://static.rosterhq.dev/avatars/default.png"));
        assert!(!store.owns("https://media.rosterhq.dev"));
        assert!(!store.owns("https://media.rosterhq.dev/"));
    }
}
