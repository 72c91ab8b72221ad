//! Object storage backends.
//!
//! Every backend stores a body under a key and answers with the URL the object can be
//! fetched from afterwards.

use bytes::Bytes;
use url::Url;

pub mod local;
pub mod memory;
pub mod s3;

pub trait ObjectStore {
    type Error: std::error::Error + Send + Sync + 'static;

    fn put(
        &self,
        key: String,
        content_type: String,
        body: Bytes,
    ) -> impl Future<Output = Result<Url, Self::Error>> + Send;
}

impl<T: ObjectStore + Sync> ObjectStore for &T {
    type Error = T::Error;

    fn put(
        &self,
        key: String,
        content_type: String,
        body: Bytes,
    ) -> impl Future<Output = Result<Url, Self::Error>> + Send {
        T::put(*self, key, content_type, body)
    }
}

/// Resolves `key` against `base`, treating `base` as a directory even without a trailing `/`.
pub fn public_url(base: &Url, key: &str) -> Result<Url, url::ParseError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(&format!("./{key}"))
}
