//! Image extraction: decides what an `<img>` node's `src` becomes.

use tracing::debug;
use url::Url;

use crate::{
    data_uri::{FormatError, InlineImage},
    html::ImageNode,
    persist::{self, GroupId, ImagePersister},
    storage::ObjectStore,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed data URI: {0}")]
    Format(#[from] FormatError),
    #[error(transparent)]
    Persist(#[from] persist::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// `src` already references an external resource (or is absent).
    Referenced,
    /// The inline payload was stored; `src` must now point here.
    Stored(Url),
}

/// Resolves the `src` of `node`. An absent attribute reads as the empty string and
/// resolves to [`Resolution::Referenced`].
pub async fn resolve_src<S: ObjectStore>(
    persister: &ImagePersister<S>,
    node: &ImageNode,
    group: &GroupId,
) -> Result<Resolution, Error> {
    let src = node.attr("src").unwrap_or_default();
    let Some(image) = InlineImage::parse(src)? else {
        return Ok(Resolution::Referenced);
    };
    debug!(
        index = node.index(),
        format = image.format,
        encoded_len = image.encoded_data.len(),
        "found inline image"
    );
    let url = persister
        .persist(group, image.format, image.encoded_data)
        .await?;
    Ok(Resolution::Stored(url))
}
