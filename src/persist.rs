//! Image persistence: decodes inline payloads and uploads them under a per-run group.

use std::{fmt, str::FromStr};

use base64::Engine as _;
use bytes::Bytes;
use tracing::info;
use url::Url;
use uuid::Uuid;

use crate::storage::ObjectStore;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid base64 payload: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("failed to upload {key}: {source}")]
    Upload {
        key: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

#[derive(Debug, thiserror::Error)]
#[error("invalid group id {0:?}, expected ASCII letters, digits, '-' or '_'")]
pub struct InvalidGroupId(String);

/// Namespaces every image stored by one rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupId(String);

impl GroupId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for GroupId {
    type Err = InvalidGroupId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.is_empty()
            && s
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        {
            Ok(Self(s.to_owned()))
        } else {
            Err(InvalidGroupId(s.to_owned()))
        }
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub struct ImagePersister<S> {
    store: S,
    master_folder: String,
}

impl<S: ObjectStore> ImagePersister<S> {
    pub fn new(store: S, master_folder: impl AsRef<str>) -> Self {
        Self {
            store,
            master_folder: master_folder.as_ref().trim_matches('/').to_owned(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// `<master folder>/<group>/<random>.<format>`, fresh on every call.
    pub fn object_key(&self, group: &GroupId, format: &str) -> String {
        let filename = format!("{}.{format}", Uuid::new_v4().simple());
        if self.master_folder.is_empty() {
            format!("{group}/{filename}")
        } else {
            format!("{}/{group}/{filename}", self.master_folder)
        }
    }

    /// Decodes `encoded_data` and uploads it as `image/<format>`. Nothing is uploaded when
    /// decoding fails.
    pub async fn persist(
        &self,
        group: &GroupId,
        format: &str,
        encoded_data: &str,
    ) -> Result<Url, Error> {
        let body = decode(encoded_data)?;
        let key = self.object_key(group, format);
        let content_type = format!("image/{format}");
        let size = body.len();
        let url = self
            .store
            .put(key.clone(), content_type.clone(), body)
            .await
            .map_err(|error| Error::Upload {
                key: key.clone(),
                source: Box::new(error),
            })?;
        info!(%key, %content_type, size, %url, "stored inline image");
        Ok(url)
    }
}

/// Standard padded base64. Attribute values are often line-wrapped, so ASCII whitespace
/// is dropped first.
fn decode(encoded: &str) -> Result<Bytes, base64::DecodeError> {
    let compact = encoded
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect::<String>();
    base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map(Bytes::from)
}
