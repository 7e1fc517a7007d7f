// region:    --- Imports
use crate::database::DatabaseManager;
use crate::live::LiveHub;
use crate::notifier::{HttpMailer, Notifier};
use crate::sweeper::AuctionSweeper;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
// endregion: --- Imports

// region:    --- Modules
mod auction;
mod auth;
mod bidding;
mod database;
mod error;
mod handlers;
mod live;
mod notifier;
mod query;
mod sweeper;

// endregion: --- Modules

// region:    --- Main
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // logging 초기화
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .with_target(false)
        .init();

    // DatabaseManager 생성
    let db_manager = Arc::new(DatabaseManager::new().await);

    // 데이터베이스 초기화
    if let Err(e) = db_manager.initialize_database().await {
        error!("{:<12} --> 데이터베이스 초기화 실패: {:?}", "Main", e);
        return Err(e.into());
    }
    info!("{:<12} --> 데이터베이스 초기화 성공", "Main");

    // 경매별 실시간 브로드캐스트 허브
    let live_hub = Arc::new(LiveHub::new());

    // 알림 팬아웃 컴포넌트 생성 (메일 워커 포함)
    let mailer = Arc::new(HttpMailer::from_env());
    let notifier = Arc::new(Notifier::start(Arc::clone(&db_manager), mailer));

    // 마감 스위퍼 시작
    let sweeper = AuctionSweeper::new(db_manager.get_pool(), Arc::clone(&live_hub));
    sweeper.start().await;

    // 테스트 페이지를 위한 cors 설정
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // 라우터 설정
    let routes_all = Router::new()
        .route("/auctions", get(handlers::handle_list_auctions))
        .route("/auctions/bid", post(handlers::handle_bid))
        .route(
            "/auctions/close-expired",
            post(handlers::handle_close_expired),
        )
        .route("/auctions/:id", get(handlers::handle_get_auction))
        .route("/auctions/:id/bids", get(handlers::handle_get_auction_bids))
        .route("/auctions/:id/live", get(handlers::handle_live_updates))
        .route("/reviews", post(handlers::handle_post_review))
        .route(
            "/reviews/seller/:seller_id",
            get(handlers::handle_get_seller_reviews),
        )
        .route("/notifications", get(handlers::handle_get_notifications))
        .layer(cors)
        .with_state((db_manager, live_hub, notifier));

    // 리스너 생성
    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = TcpListener::bind(&bind_addr).await?;
    info!(
        "{:<12} --> Web Server: Listening on {}",
        "Main",
        listener.local_addr()?
    );

    // 서버 실행
    if let Err(err) = axum::serve(listener, routes_all.into_make_service()).await {
        error!("{:<12} --> Server error: {}", "Main", err);
    }
    Ok(())
}
// endregion: --- Main
