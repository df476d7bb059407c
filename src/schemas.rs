//! JSON request and response bodies for the HTTP surface.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::use_cases::{BalanceOutput, WithdrawOutput};

/// Fields are optional so missing values surface as validation errors
/// rather than JSON rejections.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct WithdrawRequest {
    #[schema(example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    pub user_id: Option<String>,
    #[schema(example = 2500)]
    pub amount: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WithdrawResponse {
    pub user_id: String,
    pub amount_withdrawn: i64,
    pub new_balance: i64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl From<WithdrawOutput> for WithdrawResponse {
    fn from(output: WithdrawOutput) -> Self {
        Self {
            user_id: output.user_id.to_string(),
            amount_withdrawn: output.amount_withdrawn.amount(),
            new_balance: output.new_balance.amount(),
            success: true,
            message: "Withdrawal successful".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BalanceQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BalanceResponse {
    pub user_id: String,
    pub balance: i64,
}

impl From<BalanceOutput> for BalanceResponse {
    fn from(output: BalanceOutput) -> Self {
        Self {
            user_id: output.user_id.to_string(),
            balance: output.balance.amount(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
