use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Json,
};

use crate::domain::{Money, UserId};
use crate::error::AppError;
use crate::schemas::{
    BalanceQuery, BalanceResponse, ErrorResponse, WithdrawRequest, WithdrawResponse,
};
use crate::use_cases::WithdrawInput;
use crate::AppState;

fn parse_user_id(raw: &str) -> Result<UserId, AppError> {
    UserId::parse(raw).map_err(|_| AppError::Validation("Invalid user ID format".to_string()))
}

fn validate_withdraw(req: WithdrawRequest) -> Result<WithdrawInput, AppError> {
    let user_id = match req.user_id.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => parse_user_id(raw)?,
        _ => return Err(AppError::Validation("user_id is required".to_string())),
    };
    let amount = match req.amount {
        None => return Err(AppError::Validation("amount is required".to_string())),
        Some(amount) if amount <= 0 => {
            return Err(AppError::Validation(
                "amount must be greater than zero".to_string(),
            ))
        }
        Some(amount) => {
            Money::new(amount).map_err(|_| AppError::Validation("Invalid amount".to_string()))?
        }
    };
    Ok(WithdrawInput { user_id, amount })
}

/// Any body that does not decode into the request shape, including a
/// wrongly typed field, is an invalid request.
fn json_rejection(rejection: JsonRejection) -> AppError {
    tracing::debug!("Rejected withdraw body: {}", rejection.body_text());
    AppError::InvalidRequest("Invalid JSON format".to_string())
}

/// Withdraw funds from a wallet
///
/// Debits the user's wallet and records a withdrawal transaction in one
/// unit of work.
#[utoipa::path(
    post,
    path = "/withdraw",
    request_body = WithdrawRequest,
    responses(
        (status = 200, description = "Withdrawal committed", body = WithdrawResponse),
        (status = 400, description = "Malformed request, validation failure or insufficient funds", body = ErrorResponse),
        (status = 404, description = "Wallet not found", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse),
        (status = 504, description = "Request timed out", body = ErrorResponse)
    ),
    tag = "Wallet"
)]
pub async fn withdraw(
    State(state): State<AppState>,
    payload: Result<Json<WithdrawRequest>, JsonRejection>,
) -> Result<Json<WithdrawResponse>, AppError> {
    let Json(req) = payload.map_err(json_rejection)?;
    let input = validate_withdraw(req)?;

    let output = tokio::time::timeout(state.request_timeout, state.withdraw.execute(input))
        .await
        .map_err(|_| {
            tracing::warn!(user_id = %input.user_id, "Withdrawal timed out");
            AppError::Timeout
        })??;

    Ok(Json(output.into()))
}

/// Get a wallet balance
#[utoipa::path(
    get,
    path = "/balance",
    params(BalanceQuery),
    responses(
        (status = 200, description = "Current balance", body = BalanceResponse),
        (status = 400, description = "Missing or invalid user_id", body = ErrorResponse),
        (status = 404, description = "Wallet not found", body = ErrorResponse),
        (status = 504, description = "Request timed out", body = ErrorResponse)
    ),
    tag = "Wallet"
)]
pub async fn balance(
    State(state): State<AppState>,
    query: Result<Query<BalanceQuery>, QueryRejection>,
) -> Result<Json<BalanceResponse>, AppError> {
    let Query(params) =
        query.map_err(|_| AppError::InvalidRequest("Invalid query string".to_string()))?;
    let user_id = match params.user_id.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => parse_user_id(raw)?,
        _ => {
            return Err(AppError::MissingParameter(
                "user_id query parameter is required".to_string(),
            ))
        }
    };

    let output = tokio::time::timeout(state.request_timeout, state.get_balance.execute(user_id))
        .await
        .map_err(|_| AppError::Timeout)??;

    Ok(Json(output.into()))
}
