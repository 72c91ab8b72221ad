use std::{path::PathBuf, process::ExitCode};

use anyhow::{Context, bail};
use clap::Parser;
use img_offload::{
    GroupId, ImagePersister, Rewriter,
    config::{Config, StorageConfig},
    storage::{self, ObjectStore},
};
use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};
use tracing::{error, info};

/// Moves inline base64 images out of an HTML document into object storage.
#[derive(Parser)]
#[clap(version)]
struct Opts {
    /// HTML document to rewrite, stdin when omitted
    input: Option<PathBuf>,
    #[clap(short, long, env = "IMG_OFFLOAD_CONFIG")]
    config: PathBuf,
    /// Where to write the rewritten document, stdout when omitted
    #[clap(short, long)]
    output: Option<PathBuf>,
    /// Group the images under this id instead of a freshly generated one
    #[clap(long)]
    group_id: Option<GroupId>,
    /// Keep uploads in memory and only print the rewritten document
    #[clap(long)]
    dry_run: bool,
    #[clap(long, env = "IMG_OFFLOAD_ACCESS_KEY_ID", hide_env_values = true)]
    access_key_id: Option<String>,
    #[clap(long, env = "IMG_OFFLOAD_SECRET_ACCESS_KEY", hide_env_values = true)]
    secret_access_key: Option<String>,
}

async fn rewrite_with<S: ObjectStore>(
    store: S,
    config: &Config,
    html: &str,
    group: &GroupId,
) -> Result<String, img_offload::Error> {
    Rewriter::new(ImagePersister::new(store, &config.master_folder))
        .with_concurrency(config.concurrency)
        .rewrite(html, group)
        .await
}

async fn read_input(input: Option<&PathBuf>) -> anyhow::Result<String> {
    match input {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("read input from {}", path.display())),
        None => {
            let mut html = String::new();
            tokio::io::stdin()
                .read_to_string(&mut html)
                .await
                .context("read input from stdin")?;
            Ok(html)
        }
    }
}

async fn run(opts: Opts) -> anyhow::Result<()> {
    let config = tokio::fs::read_to_string(&opts.config)
        .await
        .with_context(|| format!("read config from {}", opts.config.display()))?;
    let config = Config::from_yaml(&config)
        .with_context(|| format!("parse config from {}", opts.config.display()))?;
    config.validate()?;

    let html = read_input(opts.input.as_ref()).await?;
    let group = opts.group_id.unwrap_or_else(GroupId::generate);
    info!(%group, "rewriting document");

    let output = if opts.dry_run {
        let base_url = match &config.storage {
            StorageConfig::S3(s3) => storage::s3::public_base(s3)?,
            StorageConfig::Local { base_url, .. } | StorageConfig::Memory { base_url } => {
                base_url.clone()
            }
        };
        rewrite_with(storage::memory::Store::new(base_url), &config, &html, &group).await?
    } else {
        match &config.storage {
            StorageConfig::S3(s3) => {
                let credentials = match (opts.access_key_id, opts.secret_access_key) {
                    (Some(access_key_id), Some(secret_access_key)) => {
                        Some(storage::s3::Credentials {
                            access_key_id,
                            secret_access_key,
                        })
                    }
                    (None, None) => None,
                    _ => bail!("access key id and secret access key must be given together"),
                };
                let store = storage::s3::Store::connect(s3, credentials)
                    .await
                    .context("build object URL base")?;
                rewrite_with(store, &config, &html, &group).await?
            }
            StorageConfig::Local { dir, base_url } => {
                let store = storage::local::Store::new(dir, base_url.clone());
                rewrite_with(store, &config, &html, &group).await?
            }
            StorageConfig::Memory { base_url } => {
                let store = storage::memory::Store::new(base_url.clone());
                rewrite_with(store, &config, &html, &group).await?
            }
        }
    };

    match &opts.output {
        Some(path) => tokio::fs::write(path, output)
            .await
            .with_context(|| format!("write output to {}", path.display()))?,
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(output.as_bytes()).await?;
            stdout.flush().await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let opts = Opts::parse();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    match run(opts).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(?e, "critical error");
            ExitCode::FAILURE
        }
    }
}
