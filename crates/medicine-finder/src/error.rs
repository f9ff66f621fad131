use medfinder_common::error::CommonError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Common(#[from] CommonError),

    #[error("config error: {0}")]
    Config(String),

    #[error("invalid {source_name}: {message}")]
    Data {
        source_name: String,
        message: String,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    NotFound(String),
}

impl AppError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn data(source_name: &str, err: impl std::fmt::Display) -> Self {
        Self::Data {
            source_name: source_name.to_string(),
            message: err.to_string(),
        }
    }
}
