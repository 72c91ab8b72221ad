use std::path::PathBuf;

use bytes::Bytes;
use tracing::debug;
use url::Url;

use super::ObjectStore;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid key {0:?}")]
    InvalidKey(String),
    #[error("failed to write object ({path:?}): {error}")]
    Write {
        path: PathBuf,
        error: std::io::Error,
    },
    #[error("failed to build object URL: {0}")]
    Url(url::ParseError),
}

/// Writes objects below a directory that is served from `base_url`.
pub struct Store {
    dir: PathBuf,
    base_url: Url,
}

impl Store {
    pub fn new(dir: impl Into<PathBuf>, base_url: Url) -> Self {
        Self {
            dir: dir.into(),
            base_url,
        }
    }

    fn key_to_path(&self, key: &str) -> Result<PathBuf, Error> {
        if key.is_empty() || key.contains("..") || key.starts_with('/') || key.contains('\\') {
            return Err(Error::InvalidKey(key.to_owned()));
        }
        Ok(self.dir.join(key))
    }
}

impl ObjectStore for Store {
    type Error = Error;

    async fn put(&self, key: String, _content_type: String, body: Bytes) -> Result<Url, Self::Error> {
        let path = self.key_to_path(&key)?;
        let url = super::public_url(&self.base_url, &key).map_err(Error::Url)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|error| Error::Write {
                    path: parent.to_owned(),
                    error,
                })?;
        }
        tokio::fs::write(&path, &body)
            .await
            .map_err(|error| Error::Write {
                path: path.clone(),
                error,
            })?;
        debug!(path = %path.display(), size = body.len(), "wrote object");
        Ok(url)
    }
}
