use std::path::PathBuf;

use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use hyper::Uri;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use story_engine::{AssetError, AssetLoader};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetLocation {
    Http(Uri),
    File(PathBuf),
}

impl AssetLocation {
    pub fn parse(url: &str) -> Result<Self, AssetError> {
        if let Some(path) = url.strip_prefix("file://") {
            return Ok(Self::File(PathBuf::from(path)));
        }
        if url.starts_with("http://") {
            let uri = url
                .parse::<Uri>()
                .map_err(|e| AssetError::Request(format!("invalid uri {url:?}: {e}")))?;
            return Ok(Self::Http(uri));
        }
        if url.contains("://") {
            // No TLS stack in this build; https and friends resolve as failed preloads.
            return Err(AssetError::UnsupportedLocation(url.to_string()));
        }
        Ok(Self::File(PathBuf::from(url)))
    }
}

#[derive(Clone)]
pub struct MediaLoader {
    client: Client<HttpConnector, Empty<Bytes>>,
    media_root: Option<PathBuf>,
}

impl std::fmt::Debug for MediaLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaLoader")
            .field("media_root", &self.media_root)
            .finish_non_exhaustive()
    }
}

impl Default for MediaLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaLoader {
    pub fn new() -> Self {
        Self {
            client: Client::builder(TokioExecutor::new()).build_http(),
            media_root: None,
        }
    }

    /// Relative local paths are resolved against `root` (usually the catalog's directory).
    pub fn with_media_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.media_root = Some(root.into());
        self
    }

    async fn fetch_http(&self, uri: Uri) -> Result<(), AssetError> {
        let response = self
            .client
            .get(uri)
            .await
            .map_err(|e| AssetError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AssetError::Status(status.as_u16()));
        }

        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| AssetError::Request(e.to_string()))?
            .to_bytes();
        if body.is_empty() {
            return Err(AssetError::EmptyBody);
        }
        Ok(())
    }

    async fn fetch_file(&self, path: PathBuf) -> Result<(), AssetError> {
        let path = match &self.media_root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path,
        };
        let bytes = tokio::fs::read(&path).await?;
        if bytes.is_empty() {
            return Err(AssetError::EmptyBody);
        }
        Ok(())
    }
}

impl AssetLoader for MediaLoader {
    async fn fetch(&self, url: &str) -> Result<(), AssetError> {
        match AssetLocation::parse(url)? {
            AssetLocation::Http(uri) => self.fetch_http(uri).await,
            AssetLocation::File(path) => self.fetch_file(path).await,
        }
    }
}
