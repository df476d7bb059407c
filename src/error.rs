use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::ports::RepositoryError;
use crate::schemas::ErrorResponse;
use crate::use_cases::WithdrawError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Missing parameter: {0}")]
    MissingParameter(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Wallet not found")]
    WalletNotFound,
    #[error("Insufficient funds")]
    InsufficientFunds,
    #[error("Request timed out")]
    Timeout,
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingParameter(_)
            | AppError::Validation(_)
            | AppError::InvalidRequest(_)
            | AppError::InsufficientFunds => StatusCode::BAD_REQUEST,
            AppError::WalletNotFound => StatusCode::NOT_FOUND,
            AppError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable code placed in the `error` field.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::MissingParameter(_) => "missing_parameter",
            AppError::Validation(_) => "validation_error",
            AppError::InvalidRequest(_) => "invalid_request",
            AppError::WalletNotFound => "wallet_not_found",
            AppError::InsufficientFunds => "insufficient_funds",
            AppError::Timeout => "request_timeout",
            AppError::Internal(_) => "internal_error",
        }
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::WalletNotFound(_) => AppError::WalletNotFound,
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<WithdrawError> for AppError {
    fn from(err: WithdrawError) -> Self {
        match err {
            WithdrawError::WalletNotFound(_) => AppError::WalletNotFound,
            WithdrawError::InsufficientFunds { .. } => AppError::InsufficientFunds,
            WithdrawError::InvalidAmount(reason) => AppError::Validation(reason),
            other @ (WithdrawError::Persistence { .. } | WithdrawError::TransactionRecord(_)) => {
                AppError::Internal(format!("{}: {}", other.message(), other))
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::MissingParameter(msg)
            | AppError::Validation(msg)
            | AppError::InvalidRequest(msg) => msg.clone(),
            AppError::WalletNotFound => "No wallet found for this user".to_string(),
            AppError::InsufficientFunds => "Insufficient funds for withdrawal".to_string(),
            AppError::Timeout => "Request timed out".to_string(),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                "An unexpected error occurred".to_string()
            }
        };

        let body = Json(ErrorResponse {
            error: self.code().to_string(),
            message,
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Money, UserId};
    use crate::use_cases::WithdrawStage;

    async fn body_of(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_not_found_maps_to_404() {
        let (status, body) = body_of(RepositoryError::WalletNotFound(UserId::new()).into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "wallet_not_found");
    }

    #[tokio::test]
    async fn test_insufficient_funds_maps_to_400() {
        let err: AppError = WithdrawError::InsufficientFunds {
            available: Money::new(1).unwrap(),
            requested: Money::new(2).unwrap(),
        }
        .into();
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "insufficient_funds");
    }

    #[tokio::test]
    async fn test_storage_text_is_not_leaked() {
        let err: AppError = WithdrawError::Persistence {
            stage: WithdrawStage::BalanceChecked,
            source: RepositoryError::Database(sqlx::Error::PoolTimedOut),
        }
        .into();
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "internal_error");
        assert_eq!(body["message"], "An unexpected error occurred");
    }

    #[tokio::test]
    async fn test_timeout_maps_to_504() {
        let (status, body) = body_of(AppError::Timeout).await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body["error"], "request_timeout");
    }
}
