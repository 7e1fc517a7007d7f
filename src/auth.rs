/// 인증 경계
/// 인증 검증은 업스트림 게이트웨이가 담당한다고 가정하고,
/// 해석된 사용자 신원만 x-user-id 헤더로 전달받는다.
// region:    --- Imports
use crate::auction::model::User;
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::query::handlers;
use axum::http::HeaderMap;

// endregion: --- Imports

// region:    --- Auth

pub const USER_ID_HEADER: &str = "x-user-id";

/// 헤더에서 사용자 id 추출
pub fn parse_user_id(headers: &HeaderMap) -> Result<i64, ApiError> {
    let raw = headers
        .get(USER_ID_HEADER)
        .ok_or_else(|| ApiError::Unauthorized("인증 정보가 없습니다.".to_string()))?;
    raw.to_str()
        .ok()
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| ApiError::Unauthorized("잘못된 인증 정보입니다.".to_string()))
}

/// 인증된 사용자 해석
pub async fn require_user(
    headers: &HeaderMap,
    db_manager: &DatabaseManager,
) -> Result<User, ApiError> {
    let user_id = parse_user_id(headers)?;
    handlers::get_user(db_manager, user_id)
        .await
        .map_err(|e| ApiError::from_fetch(e, "사용자"))
}

// endregion: --- Auth

// region:    --- Tests


// endregion: --- Tests
