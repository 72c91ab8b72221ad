//! S3-compatible object storage (AWS S3, Cloudflare R2, MinIO).

use aws_config::BehaviorVersion;
use aws_sdk_s3::{error::DisplayErrorContext, primitives::ByteStream};
use bytes::Bytes;
use tracing::debug;
use url::Url;

use super::ObjectStore;
use crate::config::S3Config;

const DEFAULT_REGION: &str = "us-east-1";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to put object: {0}")]
    Put(String),
    #[error("failed to build object URL: {0}")]
    Url(url::ParseError),
}

pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

pub struct Store {
    client: aws_sdk_s3::Client,
    bucket: String,
    public_base: Url,
}

/// Base URL objects of `config` are served from.
///
/// An explicit `public_url` wins. A custom endpoint is addressed path-style, anything else
/// falls back to the virtual-hosted AWS URL.
pub fn public_base(config: &S3Config) -> Result<Url, url::ParseError> {
    if let Some(public_url) = &config.public_url {
        return Ok(public_url.clone());
    }
    match &config.endpoint {
        Some(endpoint) => super::public_url(endpoint, &format!("{}/", config.bucket)),
        None => Url::parse(&format!(
            "https://{}.s3.{}.amazonaws.com/",
            config.bucket,
            config.region.as_deref().unwrap_or(DEFAULT_REGION)
        )),
    }
}

impl Store {
    pub async fn connect(
        config: &S3Config,
        credentials: Option<Credentials>,
    ) -> Result<Self, url::ParseError> {
        let public_base = public_base(config)?;
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint.as_str());
        }
        if let Some(region) = &config.region {
            loader = loader.region(aws_sdk_s3::config::Region::new(region.clone()));
        }
        if let Some(credentials) = credentials {
            loader = loader.credentials_provider(aws_sdk_s3::config::Credentials::new(
                credentials.access_key_id,
                credentials.secret_access_key,
                None,
                None,
                "img-offload",
            ));
        }
        let sdk_config = loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.endpoint.is_some())
            .build();
        debug!(bucket = %config.bucket, %public_base, "connected to object storage");
        Ok(Self {
            client: aws_sdk_s3::Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
            public_base,
        })
    }
}

impl ObjectStore for Store {
    type Error = Error;

    async fn put(&self, key: String, content_type: String, body: Bytes) -> Result<Url, Self::Error> {
        let url = super::public_url(&self.public_base, &key).map_err(Error::Url)?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|error| Error::Put(DisplayErrorContext(&error).to_string()))?;
        Ok(url)
    }
}
