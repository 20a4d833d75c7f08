pub mod home_controller;
pub mod holdings_controller;
pub mod alerts_controller;
pub mod portfolio_controller;
pub mod realtime_controller;

use crate::error::AppError;

/// Path ids must be positive integers.
pub(crate) fn parse_id(raw: &str) -> Result<i64, AppError> {
    match raw.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(AppError::BadRequest("invalid id".to_string())),
    }
}
