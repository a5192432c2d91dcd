pub mod auth;
pub mod messages;

mod extract;
mod validation;

use crate::error::AppError;

pub async fn fallback() -> AppError {
    AppError::NotFound("Not found".to_string())
}
