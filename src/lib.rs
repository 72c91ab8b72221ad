use std::fmt;

pub mod config;
pub mod data_uri;
pub mod extract;
pub mod html;
pub mod persist;
pub mod rewrite;
pub mod storage;


pub use persist::{GroupId, ImagePersister};
pub use rewrite::Rewriter;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to parse HTML: {0}")]
    Parse(#[from] html::ParseError),
    #[error(transparent)]
    Image(#[from] ImageError),
}

/// Which image of the document failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageContext {
    pub index: usize,
}

impl fmt::Display for ImageContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "image #{}", self.index)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{context}: {detail}")]
pub struct ImageError {
    pub context: ImageContext,
    pub detail: extract::Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,
    Format,
    Decode,
    Storage,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Parse(_) => ErrorKind::Parse,
            Error::Image(ImageError { detail, .. }) => match detail {
                extract::Error::Format(_) => ErrorKind::Format,
                extract::Error::Persist(persist::Error::Decode(_)) => ErrorKind::Decode,
                extract::Error::Persist(persist::Error::Upload { .. }) => ErrorKind::Storage,
            },
        }
    }
}
