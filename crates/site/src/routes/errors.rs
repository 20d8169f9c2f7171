//! Router fallback for unmatched paths.

use crate::error::AppError;

/// Fallback handler: every unmatched path is a 404.
///
/// The error page middleware turns the bare response into the 404 template.
pub async fn not_found() -> AppError {
    AppError::NotFound
}
