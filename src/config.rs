use std::{num::NonZeroUsize, path::PathBuf};

use serde::Deserialize;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to parse YAML config: {0}")]
    ParseYaml(#[from] serde_yaml::Error),
    #[error("invalid master folder {0:?}")]
    InvalidMasterFolder(String),
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct S3Config {
    pub bucket: String,
    #[serde(default)]
    pub endpoint: Option<Url>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub public_url: Option<Url>,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum StorageConfig {
    S3(S3Config),
    Local { dir: PathBuf, base_url: Url },
    Memory { base_url: Url },
}

/// How many uploads of one document may be in flight at once.
#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum Concurrency {
    #[default]
    Serial,
    Parallel { limit: NonZeroUsize },
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Folder every group of images is stored under.
    #[serde(default)]
    pub master_folder: String,
    #[serde(default)]
    pub concurrency: Concurrency,
    pub storage: StorageConfig,
}

impl Config {
    pub fn from_yaml(src: &str) -> Result<Self, Error> {
        Ok(serde_yaml::from_str(src)?)
    }

    pub fn validate(&self) -> Result<(), Error> {
        let folder = self.master_folder.trim_matches('/');
        let valid = folder.is_empty()
            || folder.split('/').all(|segment| {
                !segment.is_empty()
                    && segment != "."
                    && segment != ".."
                    && segment
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            });
        if valid {
            Ok(())
        } else {
            Err(Error::InvalidMasterFolder(self.master_folder.clone()))
        }
    }
}
