use axum::extract::{FromRequest, FromRequestParts};

use crate::error::AppError;

/// JSON body whose rejections use the standard error envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct Payload<T>(pub T);

/// Query string whose rejections use the standard error envelope.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct QueryParams<T>(pub T);
