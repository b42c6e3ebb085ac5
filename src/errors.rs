use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};

/// Every failure a handler can surface. Each variant carries a
/// human-readable message; the kind is exposed to clients as a stable
/// snake_case string.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    InvalidSchedule(String),
    #[error("a nutrition profile is required before generating a plan")]
    ProfileRequired,
    #[error("no {meal_type} recipes available in base plan")]
    InsufficientRecipes { meal_type: String },
    #[error("a plan already exists for week starting {week_start}")]
    DuplicatePlan { week_start: String },
    #[error("{0}")]
    SlotUnavailable(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("storage failure: {0}")]
    Persistence(String),
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: ErrorDetail<'a>,
}

#[derive(Debug, Serialize)]
struct ErrorDetail<'a> {
    kind: &'a str,
    message: String,
}

impl ApiError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn invalid_schedule(msg: impl Into<String>) -> Self {
        Self::InvalidSchedule(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::InvalidSchedule(_) => "invalid_schedule",
            Self::ProfileRequired => "profile_required",
            Self::InsufficientRecipes { .. } => "insufficient_recipes",
            Self::DuplicatePlan { .. } => "duplicate_plan",
            Self::SlotUnavailable(_) => "slot_unavailable",
            Self::Conflict(_) => "conflict",
            Self::NotFound(_) => "not_found",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::Persistence(_) => "persistence",
            Self::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::InvalidSchedule(_)
            | Self::ProfileRequired
            | Self::InsufficientRecipes { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::DuplicatePlan { .. } | Self::SlotUnavailable(_) | Self::Conflict(_) => {
                StatusCode::CONFLICT
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Persistence(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(kind = self.kind(), error = %self, "request failed");
        } else {
            warn!(kind = self.kind(), error = %self, "request rejected");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                kind: self.kind(),
                message: self.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => Self::NotFound("record not found".into()),
            other => Self::Persistence(other.to_string()),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self::Internal(e.to_string())
    }
}

/// True when the database rejected a write because of a unique index.
pub fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_4xx() {
        assert_eq!(ApiError::invalid_input("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::ProfileRequired.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            ApiError::DuplicatePlan { week_start: "2025-01-06".into() }.status(),
            StatusCode::CONFLICT
        );
        assert_eq!(ApiError::invalid_schedule("x").kind(), "invalid_schedule");
    }

    #[test]
    fn storage_errors_map_to_5xx() {
        let err: ApiError = sqlx::Error::PoolTimedOut.into();
        assert_eq!(err.kind(), "persistence");
        assert!(err.status().is_server_error());

        let missing: ApiError = sqlx::Error::RowNotFound.into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn response_body_carries_kind_and_message() {
        let resp = ApiError::InsufficientRecipes { meal_type: "dinner".into() }.into_response();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["error"]["kind"], "insufficient_recipes");
        assert!(v["error"]["message"].as_str().unwrap().contains("dinner"));
    }
}
