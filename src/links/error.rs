use thiserror::Error;

/// Failures of the link creation path. The first four reject the request
/// with no side effects; `Store` covers everything the persistence layer
/// could not absorb.
#[derive(Debug, Error)]
pub enum ShortenError {
    #[error("original URL must be an absolute http(s) URL of at most 2048 characters")]
    InvalidUrl,
    #[error("custom code must be 1-10 characters from [A-Za-z0-9_-]")]
    InvalidCode,
    #[error("short code is already taken")]
    CodeTaken,
    #[error("could not find a free short code after {0} attempts")]
    GenerationExhausted(u32),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}
