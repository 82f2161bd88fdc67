use thiserror::Error;

pub type PlatformResult<T> = Result<T, PlatformError>;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("Unknown platform '{name}' (known: {known})")]
    UnknownPlatform { name: String, known: String },

    #[error("Product info {path}: {what}")]
    ProductInfo { path: String, what: String },

    #[error("Platform '{platform}' init failed: {what}")]
    Init { platform: String, what: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
