pub mod admin;
pub mod auth;
pub mod health;
pub mod homepage;
pub mod pastes;
pub mod users;

use crate::api::error::AppError;
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Serialize, ToSchema)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Runs `validator` rules and reports the first message as a 400.
pub(crate) fn validate_body<T: Validate>(body: &T) -> Result<(), AppError> {
    body.validate().map_err(|errors| {
        let message = errors
            .field_errors()
            .values()
            .flat_map(|errs| errs.iter())
            .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
            .unwrap_or_else(|| "Invalid request".to_string());
        AppError::Validation(message)
    })
}
