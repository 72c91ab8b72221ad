use std::sync::Arc;

use bytes::Bytes;
use indexmap::IndexMap;
use tracing::trace;
use url::Url;

use super::ObjectStore;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to build object URL: {0}")]
    Url(#[from] url::ParseError),
}

#[derive(derive_debug::Dbg, Clone, PartialEq, Eq)]
pub struct Object {
    pub content_type: String,
    #[dbg(skip)]
    pub body: Bytes,
}

/// Keeps objects in insertion order. Clones share the same objects.
#[derive(Clone)]
pub struct Store {
    base_url: Url,
    objects: Arc<tokio::sync::Mutex<IndexMap<String, Object>>>,
}

impl Store {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            objects: Default::default(),
        }
    }

    pub async fn get(&self, key: &str) -> Option<Object> {
        self.objects.lock().await.get(key).cloned()
    }

    pub async fn objects(&self) -> IndexMap<String, Object> {
        self.objects.lock().await.clone()
    }
}

impl ObjectStore for Store {
    type Error = Error;

    async fn put(&self, key: String, content_type: String, body: Bytes) -> Result<Url, Self::Error> {
        let url = super::public_url(&self.base_url, &key)?;
        trace!(%key, %content_type, size = body.len(), "memory");
        self.objects
            .lock()
            .await
            .insert(key, Object { content_type, body });
        Ok(url)
    }
}
