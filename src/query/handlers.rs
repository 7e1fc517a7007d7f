// region:    --- Imports
use super::queries;
use crate::auction::model::{Auction, Bid, Notification, Review, Seller, User};
use crate::database::DatabaseManager;
use serde::Deserialize;
use sqlx::Error as SqlxError;
use sqlx::{Postgres, QueryBuilder};
use tracing::info;

// endregion: --- Imports

// region:    --- List Params

/// 경매 목록 필터
#[derive(Debug, Default, Deserialize)]
pub struct ListAuctionsParams {
    pub search: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub status: Option<String>,
    pub sort: Option<String>,
}

/// 필터 조건을 덧붙여 목록 쿼리 구성
pub fn build_list_query(params: &ListAuctionsParams) -> QueryBuilder<'static, Postgres> {
    let mut qb: QueryBuilder<'static, Postgres> =
        QueryBuilder::new(queries::LIST_AUCTIONS_BASE);
    qb.push(" WHERE 1 = 1");

    // 제목/설명 검색
    if let Some(search) = params.search.as_deref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        qb.push(" AND (title ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR description ILIKE ");
        qb.push_bind(pattern);
        qb.push(")");
    }

    // 카테고리 필터 ('All'은 전체)
    if let Some(category) = params
        .category
        .as_deref()
        .filter(|c| !c.is_empty() && *c != "All")
    {
        qb.push(" AND category = ");
        qb.push_bind(category.to_string());
    }

    // 가격 범위는 현재 가격 기준
    if let Some(min_price) = params.min_price {
        qb.push(" AND current_bid >= ");
        qb.push_bind(min_price);
    }
    if let Some(max_price) = params.max_price {
        qb.push(" AND current_bid <= ");
        qb.push_bind(max_price);
    }

    if let Some(status) = params.status.as_deref().filter(|s| !s.is_empty()) {
        qb.push(" AND status = ");
        qb.push_bind(status.to_uppercase());
    }

    // 정렬: 기본은 최신 등록순
    let order_by = match params.sort.as_deref() {
        Some("ending_soon") => "end_time ASC",
        Some("price_asc") => "current_bid ASC",
        Some("price_desc") => "current_bid DESC",
        _ => "created_at DESC",
    };
    qb.push(" ORDER BY ");
    qb.push(order_by);

    qb
}

// endregion: --- List Params

// region:    --- Query Handlers

/// 경매 목록 조회
pub async fn list_auctions(
    db_manager: &DatabaseManager,
    params: &ListAuctionsParams,
) -> Result<Vec<Auction>, SqlxError> {
    info!("{:<12} --> 경매 목록 조회: {:?}", "Query", params);
    build_list_query(params)
        .build_query_as::<Auction>()
        .fetch_all(db_manager.pool())
        .await
}

/// 경매 조회
pub async fn get_auction(
    db_manager: &DatabaseManager,
    auction_id: i64,
) -> Result<Auction, SqlxError> {
    info!("{:<12} --> 경매 조회 id: {}", "Query", auction_id);
    db_manager
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_as::<_, Auction>(queries::GET_AUCTION)
                    .bind(auction_id)
                    .fetch_one(&mut **tx)
                    .await
            })
        })
        .await
}

/// 입찰 이력 조회 (최신순)
pub async fn get_bid_history(
    db_manager: &DatabaseManager,
    auction_id: i64,
) -> Result<Vec<Bid>, SqlxError> {
    info!("{:<12} --> 입찰 이력 조회 id: {}", "Query", auction_id);
    db_manager
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_as::<_, Bid>(queries::GET_BID_HISTORY)
                    .bind(auction_id)
                    .fetch_all(&mut **tx)
                    .await
            })
        })
        .await
}

/// 사용자 조회
pub async fn get_user(db_manager: &DatabaseManager, user_id: i64) -> Result<User, SqlxError> {
    info!("{:<12} --> 사용자 조회 id: {}", "Query", user_id);
    db_manager
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_as::<_, User>(queries::GET_USER)
                    .bind(user_id)
                    .fetch_one(&mut **tx)
                    .await
            })
        })
        .await
}

/// 판매자 조회
pub async fn get_seller(
    db_manager: &DatabaseManager,
    seller_id: i64,
) -> Result<Seller, SqlxError> {
    info!("{:<12} --> 판매자 조회 id: {}", "Query", seller_id);
    db_manager
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_as::<_, Seller>(queries::GET_SELLER)
                    .bind(seller_id)
                    .fetch_one(&mut **tx)
                    .await
            })
        })
        .await
}

/// 사용자 알림 조회 (최신순)
pub async fn list_notifications(
    db_manager: &DatabaseManager,
    user_id: i64,
) -> Result<Vec<Notification>, SqlxError> {
    info!("{:<12} --> 알림 조회 user_id: {}", "Query", user_id);
    db_manager
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_as::<_, Notification>(queries::LIST_NOTIFICATIONS)
                    .bind(user_id)
                    .fetch_all(&mut **tx)
                    .await
            })
        })
        .await
}

/// 판매자 리뷰 조회 (최신순)
pub async fn list_seller_reviews(
    db_manager: &DatabaseManager,
    seller_id: i64,
) -> Result<Vec<Review>, SqlxError> {
    info!("{:<12} --> 판매자 리뷰 조회 id: {}", "Query", seller_id);
    db_manager
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_as::<_, Review>(queries::LIST_SELLER_REVIEWS)
                    .bind(seller_id)
                    .fetch_all(&mut **tx)
                    .await
            })
        })
        .await
}

/// 리뷰 생성
pub async fn create_review(
    db_manager: &DatabaseManager,
    seller_id: i64,
    reviewer: &User,
    rating: i32,
    comment: &str,
) -> Result<Review, SqlxError> {
    info!(
        "{:<12} --> 리뷰 생성 seller_id: {}, reviewer_id: {}",
        "Query", seller_id, reviewer.id
    );
    let reviewer_id = reviewer.id;
    let reviewer_name = reviewer.username.clone();
    let comment = comment.to_string();
    db_manager
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_as::<_, Review>(queries::INSERT_REVIEW)
                    .bind(seller_id)
                    .bind(reviewer_id)
                    .bind(reviewer_name)
                    .bind(rating)
                    .bind(comment)
                    .fetch_one(&mut **tx)
                    .await
            })
        })
        .await
}

// endregion: --- Query Handlers

// region:    --- Tests


// endregion: --- Tests
