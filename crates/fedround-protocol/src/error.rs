use thiserror::Error;

/// Errors produced while encoding or decoding envelope content.
#[derive(Debug, Error)]
pub enum EncodingError {
    /// Dict keys must be uniformly string or uniformly integer.
    #[error("dict keys must be uniformly string or uniformly integer")]
    MixedKeyTypes,

    /// A value outside the closed shape set (scalar / list / dict).
    #[error("unsupported value type: {0}")]
    UnsupportedValue(String),

    /// The opaque blob under the model key could not be decoded.
    #[error("opaque blob decode failed: {0}")]
    BlobDecode(String),

    #[error("envelope serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}
