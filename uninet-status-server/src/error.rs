use axum::http::StatusCode;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid IPv4 address: {0:?}")]
    InvalidIp(String),
    #[error("limit {value} out of range 1..={max}")]
    LimitOutOfRange { value: usize, max: usize },
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::InvalidIp(_) => StatusCode::BAD_REQUEST,
            ServerError::LimitOutOfRange { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

impl From<ServerError> for StatusCode {
    fn from(e: ServerError) -> Self {
        let status = e.status();
        if status.is_server_error() {
            tracing::error!("{e}");
        } else {
            tracing::debug!("rejected request: {e}");
        }
        status
    }
}
