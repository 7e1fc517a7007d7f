use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 경매 상태 (ACTIVE -> CLOSED 단방향 전이)
pub const STATUS_ACTIVE: &str = "ACTIVE";
pub const STATUS_CLOSED: &str = "CLOSED";

// 경매 모델
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Auction {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category: String,
    pub image_urls: Vec<String>,
    pub starting_bid: i64,
    pub current_bid: i64,
    pub end_time: DateTime<Utc>,
    pub status: String,
    pub winner_id: Option<i64>,
    pub seller_id: i64,
    pub created_at: DateTime<Utc>,
}

// 입찰 모델
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Bid {
    pub id: i64,
    pub auction_id: i64,
    pub bidder_id: i64,
    pub bidder_name: String,
    pub amount: i64,
    pub bid_time: DateTime<Utc>,
}

// 사용자 모델
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
}

// 판매자 모델
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Seller {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

// 알림 모델
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub auction_id: i64,
    pub kind: String,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

// 리뷰 모델
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Review {
    pub id: i64,
    pub seller_id: i64,
    pub reviewer_id: i64,
    pub reviewer_name: String,
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// 경매 상세 (입찰 이력은 최신순)
#[derive(Debug, Serialize)]
pub struct AuctionDetail {
    #[serde(flatten)]
    pub auction: Auction,
    pub bids: Vec<Bid>,
}
