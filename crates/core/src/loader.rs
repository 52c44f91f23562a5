//! Fetch or read each service's OpenAPI document.

use std::path::Path;
use std::time::Duration;

use apiweave_common::{ServiceSource, SpecSource};
use futures_util::future::try_join_all;
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use crate::error::{MergeError, Result};
use crate::fsutil;
use crate::openapi::title;

/// Per-document fetch timeout unless configured.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// One parsed OpenAPI document. Read-only once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecDocument {
    /// Service the document belongs to.
    pub service_id: String,
    /// Whole document as JSON.
    pub root: Value,
}

/// Reads service documents over HTTP or from disk.
#[derive(Debug, Clone)]
pub struct SpecLoader {
    client: reqwest::Client,
    timeout: Duration,
}

impl SpecLoader {
    /// Loader whose HTTP requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| MergeError::Fetch {
                url: String::new(),
                reason: format!("failed to build HTTP client: {err}"),
            })?;
        Ok(Self { client, timeout })
    }

    /// Load every service document concurrently. The first failure fails the
    /// whole batch.
    pub async fn load_all(&self, services: &[ServiceSource]) -> Result<Vec<SpecDocument>> {
        let docs = try_join_all(services.iter().map(|service| self.load(service))).await?;
        info!(count = docs.len(), "Loaded OpenAPI documents.");
        Ok(docs)
    }

    /// Load one service's document.
    pub async fn load(&self, service: &ServiceSource) -> Result<SpecDocument> {
        let root = match &service.source {
            SpecSource::Http(url) => self.fetch(url).await?,
            SpecSource::File(path) => read_local(path)?,
        };
        let doc = SpecDocument {
            service_id: service.id.clone(),
            root,
        };
        debug!(
            service = %service.id,
            source = %service.source,
            title = title(&doc).unwrap_or("-"),
            "Loaded OpenAPI document."
        );
        Ok(doc)
    }

    async fn fetch(&self, url: &Url) -> Result<Value> {
        let fetch_error = |reason: String| MergeError::Fetch {
            url: url.to_string(),
            reason,
        };
        debug!(%url, timeout_secs = self.timeout.as_secs(), "Fetching OpenAPI document.");

        let body = self
            .client
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|err| fetch_error(err.to_string()))?
            .error_for_status()
            .map_err(|err| fetch_error(err.to_string()))?
            .text()
            .await
            .map_err(|err| fetch_error(err.to_string()))?;

        serde_json::from_str(&body).map_err(|err| MergeError::Parse {
            origin: url.to_string(),
            reason: err.to_string(),
        })
    }
}

/// Local documents are JSON, or YAML when the extension says so.
fn read_local(path: &Path) -> Result<Value> {
    let contents = fsutil::read(path)?;
    let parse_error = |reason: String| MergeError::Parse {
        origin: path.display().to_string(),
        reason,
    };
    let is_yaml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
    if is_yaml {
        serde_yaml::from_str(&contents).map_err(|err| parse_error(err.to_string()))
    } else {
        serde_json::from_str(&contents).map_err(|err| parse_error(err.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn service(id: &str, source: SpecSource) -> ServiceSource {
        ServiceSource::new(id, source).unwrap()
    }

    #[tokio::test]
    async fn test_load_local_json_and_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("identity.json");
        let yaml = dir.path().join("booking.yaml");
        fsutil::write(&json, r#"{"openapi":"3.0.1","components":{"schemas":{}}}"#).unwrap();
        fsutil::write(&yaml, "openapi: 3.0.1\ninfo:\n  title: Booking\n").unwrap();

        let loader = SpecLoader::new(DEFAULT_FETCH_TIMEOUT).unwrap();
        let docs = loader
            .load_all(&[
                service("identity", SpecSource::File(json)),
                service("booking", SpecSource::File(yaml)),
            ])
            .await
            .unwrap();

        assert_eq!(docs[0].service_id, "identity");
        assert_eq!(docs[0].root["openapi"], "3.0.1");
        assert_eq!(docs[1].root["info"]["title"], "Booking");
    }

    #[tokio::test]
    async fn test_invalid_json_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fsutil::write(&path, "{ not json").unwrap();
        let loader = SpecLoader::new(DEFAULT_FETCH_TIMEOUT).unwrap();
        let err = loader
            .load(&service("identity", SpecSource::File(path)))
            .await
            .unwrap_err();
        assert!(matches!(err, MergeError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_missing_file_is_an_io_error() {
        let loader = SpecLoader::new(DEFAULT_FETCH_TIMEOUT).unwrap();
        let err = loader
            .load(&service(
                "identity",
                SpecSource::File("/nonexistent/identity.json".into()),
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, MergeError::Io { .. }));
    }
}
