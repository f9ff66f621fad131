/// Error types shared across medicine finder crates.
///
/// These errors represent failures in infrastructure components (remote partner feeds,
/// payload decoding) that are common to every server binary. Application-specific errors
/// should be defined in each server crate and wrap `CommonError` via `#[from]`.

#[derive(Debug, thiserror::Error)]
pub enum CommonError {
    #[error("partner feed request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid partner feed JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("partner feed returned status {status}: {body}")]
    Upstream {
        status: reqwest::StatusCode,
        body: String,
    },
}
