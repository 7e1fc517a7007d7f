// region:    --- Imports
use crate::auction::model::AuctionDetail;
use crate::auth;
use crate::bidding::commands::{handle_place_bid, PlaceBidCommand};
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::live::{self, LiveEvent, LiveHub};
use crate::notifier::Notifier;
use crate::query;
use crate::query::handlers::ListAuctionsParams;
use crate::sweeper::AuctionSweeper;
use axum::extract::{Path, Query, State, WebSocketUpgrade};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};

// endregion: --- Imports

pub type AppState = (Arc<DatabaseManager>, Arc<LiveHub>, Arc<Notifier>);

// region:    --- Command Handlers

/// 입찰 요청 바디
#[derive(Debug, Deserialize)]
pub struct PlaceBidRequest {
    pub auction_id: i64,
    pub amount: i64,
}

/// 입찰 요청 처리
pub async fn handle_bid(
    State((db_manager, live_hub, notifier)): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<PlaceBidRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!(
        "{:<12} --> 입찰 요청: 경매 {}, 금액 {}",
        "Command", req.auction_id, req.amount
    );
    let user = auth::require_user(&headers, &db_manager).await?;

    let cmd = PlaceBidCommand {
        auction_id: req.auction_id,
        bidder_id: user.id,
        amount: req.amount,
    };
    let receipt = handle_place_bid(cmd, &db_manager).await?;

    // 앱 내 알림 기록은 응답 전에 저장한다.
    // 입찰은 이미 커밋되었으므로 팬아웃 실패가 응답을 실패시키지는 않는다.
    if let Err(e) = notifier
        .on_bid_accepted(&receipt.auction, &receipt.bid, receipt.previous_winner_id)
        .await
    {
        error!("{:<12} --> 알림 팬아웃 실패: {:?}", "Command", e);
    }

    // 해당 경매 방의 실시간 구독자에게 브로드캐스트
    live_hub.publish(
        receipt.bid.auction_id,
        LiveEvent::BidUpdate {
            auction_id: receipt.bid.auction_id,
            amount: receipt.bid.amount,
            bidder: receipt.bid.bidder_name.clone(),
            bid: receipt.bid.clone(),
        },
    );

    Ok(Json(serde_json::json!({
        "message": "입찰이 성공적으로 처리되었습니다.",
        "bid": receipt.bid,
        "current_bid": receipt.current_bid
    })))
}

/// 만료 경매 즉시 마감 (온디맨드 스윕)
pub async fn handle_close_expired(
    State((db_manager, live_hub, _)): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    info!("{:<12} --> 온디맨드 스윕 요청", "Command");
    let closed = AuctionSweeper::sweep(db_manager.pool(), &live_hub).await?;
    Ok(Json(serde_json::json!({ "closed": closed })))
}

/// 리뷰 작성 바디
#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    pub seller_id: i64,
    pub rating: i32,
    pub comment: String,
}

/// 리뷰 작성
pub async fn handle_post_review(
    State((db_manager, _, _)): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateReviewRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!(
        "{:<12} --> 리뷰 작성 요청: 판매자 {}",
        "Command", req.seller_id
    );
    let user = auth::require_user(&headers, &db_manager).await?;

    if !(1..=5).contains(&req.rating) {
        return Err(ApiError::InvalidState {
            message: "평점은 1에서 5 사이여야 합니다.".to_string(),
            code: "INVALID_RATING",
        });
    }

    query::handlers::get_seller(&db_manager, req.seller_id)
        .await
        .map_err(|e| ApiError::from_fetch(e, "판매자"))?;

    let review =
        query::handlers::create_review(&db_manager, req.seller_id, &user, req.rating, &req.comment)
            .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

// endregion: --- Command Handlers

// region:    --- Query Handlers

/// 경매 목록 조회
pub async fn handle_list_auctions(
    State((db_manager, _, _)): State<AppState>,
    Query(params): Query<ListAuctionsParams>,
) -> Result<impl IntoResponse, ApiError> {
    let auctions = query::handlers::list_auctions(&db_manager, &params).await?;
    Ok(Json(auctions))
}

/// 경매 상세 조회 (입찰 이력 포함, 최신순)
pub async fn handle_get_auction(
    State((db_manager, _, _)): State<AppState>,
    Path(auction_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let auction = query::handlers::get_auction(&db_manager, auction_id)
        .await
        .map_err(|e| ApiError::from_fetch(e, "경매"))?;
    let bids = query::handlers::get_bid_history(&db_manager, auction_id).await?;
    Ok(Json(AuctionDetail { auction, bids }))
}

/// 입찰 이력 조회
pub async fn handle_get_auction_bids(
    State((db_manager, _, _)): State<AppState>,
    Path(auction_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let bids = query::handlers::get_bid_history(&db_manager, auction_id).await?;
    Ok(Json(bids))
}

/// 판매자 리뷰 조회 (최신순)
pub async fn handle_get_seller_reviews(
    State((db_manager, _, _)): State<AppState>,
    Path(seller_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let reviews = query::handlers::list_seller_reviews(&db_manager, seller_id).await?;
    Ok(Json(reviews))
}

/// 내 알림 조회 (최신순)
pub async fn handle_get_notifications(
    State((db_manager, _, _)): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let user = auth::require_user(&headers, &db_manager).await?;
    let notifications = query::handlers::list_notifications(&db_manager, user.id).await?;
    Ok(Json(notifications))
}

// endregion: --- Query Handlers

// region:    --- Live Handlers

/// 경매 방 실시간 구독 (웹소켓 업그레이드)
pub async fn handle_live_updates(
    State((_, live_hub, _)): State<AppState>,
    Path(auction_id): Path<i64>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| live::serve_subscriber(socket, auction_id, live_hub))
}

// endregion: --- Live Handlers
