use axum::http::StatusCode;
use thiserror::Error;

/// Failures of calls made on behalf of a signed-in user.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    #[error("could not reach the meal service: {0}")]
    Transport(String),
    #[error("unexpected response from the meal service: {0}")]
    Decode(String),
    #[error("{detail}")]
    Api { status: u16, detail: String },
    #[error("{0} is required")]
    Validation(&'static str),
    #[error("meal {0} is not awaiting confirmation")]
    Unconfirmed(i64),
    #[error("a request is already in progress")]
    Busy,
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: message.into(),
        }
    }
}

impl From<ClientError> for AppError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Validation(_) | ClientError::Unconfirmed(_) => {
                Self::bad_request(err.to_string())
            }
            ClientError::Busy => Self {
                status: StatusCode::CONFLICT,
                message: err.to_string(),
            },
            ClientError::Api { .. } | ClientError::Transport(_) | ClientError::Decode(_) => {
                Self::bad_gateway(err.to_string())
            }
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.message).into_response()
    }
}
