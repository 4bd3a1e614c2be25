//! Liveness endpoint

use axum::extract::State;
use serde::Serialize;

use super::response::ApiResponse;
use crate::AppState;
use crate::error::AppError;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    status: &'static str,
}

/// GET /api/v1/healthcheck
///
/// Also round-trips the database so a wedged pool shows up as a 500.
pub async fn healthcheck(
    State(state): State<AppState>,
) -> Result<ApiResponse<HealthStatus>, AppError> {
    sqlx::query("SELECT 1").execute(state.db.pool()).await?;

    Ok(ApiResponse::ok(
        HealthStatus { status: "ok" },
        "Health Check Successful",
    ))
}
