/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum FetchRetryError {
    /// Network or request execution error from `reqwest`.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    /// Invalid retry configuration, such as an unknown override key.
    #[error("config error: {0}")]
    Config(String),
    /// Configuration document could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
    /// Request body could not be encoded.
    #[error("encode error: {0}")]
    Encode(String),
}
