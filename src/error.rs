// region:    --- Imports
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

// endregion: --- Imports

// region:    --- Api Error

/// API 오류 분류
/// 검증 오류는 사람이 읽을 수 있는 메시지와 함께 호출자에게 그대로 반환되고,
/// 내부 오류는 로그에만 상세를 남기고 일반 메시지로 응답한다.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("{message}")]
    InvalidState { message: String, code: &'static str },
    #[error("{message}")]
    InvalidBid { message: String, current_bid: i64 },
    #[error("{0}")]
    Unauthorized(String),
    #[error("요청 처리 중 내부 오류가 발생했습니다.")]
    Internal(#[from] sqlx::Error),
}

impl ApiError {
    /// 경매가 진행 중이 아닌 경우
    pub fn not_active() -> Self {
        ApiError::InvalidState {
            message: "경매가 진행 중이 아닙니다.".to_string(),
            code: "NOT_ACTIVE",
        }
    }

    /// 경매가 이미 종료된 경우
    pub fn already_ended() -> Self {
        ApiError::InvalidState {
            message: "경매가 이미 종료되었습니다.".to_string(),
            code: "ALREADY_ENDED",
        }
    }

    /// 입찰 금액이 현재 가격 이하인 경우 (메시지에 현재 기준가 포함)
    pub fn low_bid(current_bid: i64) -> Self {
        ApiError::InvalidBid {
            message: format!("입찰 금액은 현재 가격 {}보다 높아야 합니다.", current_bid),
            current_bid,
        }
    }

    /// 조회 오류를 API 오류로 변환 (행 없음 -> NotFound)
    pub fn from_fetch(e: sqlx::Error, what: &str) -> Self {
        match e {
            sqlx::Error::RowNotFound => {
                ApiError::NotFound(format!("{}을(를) 찾을 수 없습니다.", what))
            }
            e => ApiError::Internal(e),
        }
    }

    /// 응답 상태 코드
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidState { .. } => StatusCode::BAD_REQUEST,
            ApiError::InvalidBid { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            ApiError::NotFound(message) => json!({
                "error": message,
                "code": "NOT_FOUND"
            }),
            ApiError::InvalidState { message, code } => json!({
                "error": message,
                "code": code
            }),
            ApiError::InvalidBid {
                message,
                current_bid,
            } => json!({
                "error": message,
                "code": "LOW_BID",
                "current_bid": current_bid
            }),
            ApiError::Unauthorized(message) => json!({
                "error": message,
                "code": "UNAUTHORIZED"
            }),
            ApiError::Internal(e) => {
                error!("{:<12} --> 내부 오류: {:?}", "Error", e);
                json!({
                    "error": "요청 처리 중 내부 오류가 발생했습니다.",
                    "code": "INTERNAL"
                })
            }
        };
        (status, Json(body)).into_response()
    }
}

// endregion: --- Api Error

// region:    --- Tests


// endregion: --- Tests
