//! Document walking: finds every `<img>`, resolves it and writes the results back.

use futures::{StreamExt as _, TryStreamExt as _, stream};
use tracing::{debug, info, instrument};

use crate::{
    Error, ImageContext, ImageError,
    config::Concurrency,
    extract::{self, Resolution},
    html::{Document, ImageNode},
    persist::{GroupId, ImagePersister},
    storage::ObjectStore,
};

pub struct Rewriter<S> {
    persister: ImagePersister<S>,
    concurrency: Concurrency,
}

impl<S: ObjectStore> Rewriter<S> {
    pub fn new(persister: ImagePersister<S>) -> Self {
        Self {
            persister,
            concurrency: Concurrency::Serial,
        }
    }

    pub fn with_concurrency(self, concurrency: Concurrency) -> Self {
        Self {
            concurrency,
            ..self
        }
    }

    /// Replaces every inline image of `html` with the URL it was stored at.
    ///
    /// All or nothing: the first failing image aborts the rewrite and no document is
    /// returned. Uploads that already completed are left in storage.
    #[instrument(skip_all, fields(group = %group))]
    pub async fn rewrite(&self, html: &str, group: &GroupId) -> Result<String, Error> {
        let mut document = Document::parse(html)?;
        let images = document.images();
        let resolutions = self.resolve_all(&images, group).await?;
        let mut stored = 0;
        for (image, resolution) in images.iter().zip(resolutions) {
            if let Resolution::Stored(url) = resolution {
                document.set_attr(image, "src", url.as_str());
                stored += 1;
            }
        }
        info!(images = images.len(), stored, "rewrote document");
        Ok(document.to_string())
    }

    /// Resolutions in document order, whatever order the uploads finish in.
    async fn resolve_all(
        &self,
        images: &[ImageNode],
        group: &GroupId,
    ) -> Result<Vec<Resolution>, Error> {
        match self.concurrency {
            Concurrency::Serial => {
                let mut resolutions = Vec::with_capacity(images.len());
                for image in images {
                    resolutions.push(self.resolve(image, group).await?);
                }
                Ok(resolutions)
            }
            Concurrency::Parallel { limit } => {
                // dropping the stream on the first error cancels the uploads still in flight
                stream::iter(images)
                    .map(|image| self.resolve(image, group))
                    .buffered(limit.get())
                    .try_collect()
                    .await
            }
        }
    }

    async fn resolve(&self, image: &ImageNode, group: &GroupId) -> Result<Resolution, Error> {
        debug!(index = image.index(), "resolving image");
        extract::resolve_src(&self.persister, image, group)
            .await
            .map_err(|detail| {
                Error::Image(ImageError {
                    context: ImageContext {
                        index: image.index(),
                    },
                    detail,
                })
            })
    }
}
