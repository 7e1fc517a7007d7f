use auction_market::auction::model::{Auction, Seller, User};
use auction_market::database::DatabaseManager;
use auction_market::query;
use auction_market::sweeper::AuctionSweeper;
use axum::http::StatusCode;
use chrono::{Duration, Utc};
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

const BASE_URL: &str = "http://localhost:3000";

/// 서버와 데이터베이스가 준비되지 않았으면 테스트를 건너뛴다
async fn server_available() -> bool {
    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("DATABASE_URL 미설정, 통합 테스트 건너뜀");
        return false;
    }
    if tokio::net::TcpStream::connect("127.0.0.1:3000").await.is_err() {
        eprintln!("서버가 떠 있지 않음, 통합 테스트 건너뜀");
        return false;
    }
    true
}

/// 데이터베이스 매니저 설정
async fn setup() -> Arc<DatabaseManager> {
    Arc::new(DatabaseManager::new().await)
}

/// 테스트용 사용자 생성
async fn create_test_user(db_manager: &DatabaseManager, name: &str) -> User {
    let username = format!("{}_{}", name, Utc::now().timestamp_micros());
    let email = format!("{}@example.com", username);
    db_manager
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_as::<_, User>(
                    "INSERT INTO users (username, email) VALUES ($1, $2) RETURNING *",
                )
                .bind(username)
                .bind(email)
                .fetch_one(&mut **tx)
                .await
            })
        })
        .await
        .unwrap()
}

/// 테스트용 판매자 생성
async fn create_test_seller(db_manager: &DatabaseManager, name: &str) -> Seller {
    let name = name.to_string();
    db_manager
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_as::<_, Seller>(
                    "INSERT INTO sellers (name) VALUES ($1) RETURNING *",
                )
                .bind(name)
                .fetch_one(&mut **tx)
                .await
            })
        })
        .await
        .unwrap()
}

/// 테스트용 경매 생성
async fn create_test_auction(
    db_manager: &DatabaseManager,
    title: &str,
    seller_id: i64,
    starting_bid: i64,
    ends_in: Duration,
) -> Auction {
    let title = title.to_string();
    db_manager
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_as::<_, Auction>(
                    "INSERT INTO auctions (title, description, category, image_urls, starting_bid, current_bid, end_time, seller_id)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                     RETURNING *",
                )
                .bind(&title)
                .bind("통합 테스트용 경매입니다.")
                .bind("Other")
                .bind(vec!["https://images.example.com/test.jpg".to_string()])
                .bind(starting_bid)
                .bind(starting_bid)
                .bind(Utc::now() + ends_in)
                .bind(seller_id)
                .fetch_one(&mut **tx)
                .await
            })
        })
        .await
        .unwrap()
}

/// 입찰 요청 전송
async fn place_bid(client: &Client, user_id: i64, auction_id: i64, amount: i64) -> (StatusCode, Value) {
    let response = client
        .post(format!("{}/auctions/bid", BASE_URL))
        .header("x-user-id", user_id.to_string())
        .json(&json!({ "auction_id": auction_id, "amount": amount }))
        .send()
        .await
        .expect("Failed to send request");
    let status = response.status();
    let body: Value = response.json().await.expect("Failed to parse body");
    (StatusCode::from_u16(status.as_u16()).unwrap(), body)
}

/// 입찰 시나리오: 동일 금액 거절, 상향 금액 수락
#[tokio::test]
async fn test_place_bid_flow() {
    if !server_available().await {
        return;
    }
    let db_manager = setup().await;
    let client = Client::new();

    let seller = create_test_seller(&db_manager, "입찰 테스트 판매자").await;
    let auction =
        create_test_auction(&db_manager, "입찰 테스트 경매", seller.id, 100, Duration::hours(2))
            .await;
    let bidder = create_test_user(&db_manager, "bidder").await;

    // 현재 가격과 같은 금액은 거절되고 기준가가 함께 반환된다
    let (status, body) = place_bid(&client, bidder.id, auction.id, 100).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "LOW_BID");
    assert_eq!(body["current_bid"], 100);

    // 더 높은 금액은 수락된다
    let (status, body) = place_bid(&client, bidder.id, auction.id, 110).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["current_bid"], 110);
    assert_eq!(body["bid"]["amount"], 110);

    // 경매 상태와 입찰 이력 반영 확인
    let updated = query::handlers::get_auction(&db_manager, auction.id)
        .await
        .unwrap();
    assert_eq!(updated.current_bid, 110);
    assert_eq!(updated.winner_id, Some(bidder.id));

    let history = query::handlers::get_bid_history(&db_manager, auction.id)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].amount, 110);
}

/// 인증 헤더 없는 입찰은 거절된다
#[tokio::test]
async fn test_bid_requires_identity() {
    if !server_available().await {
        return;
    }
    let db_manager = setup().await;
    let client = Client::new();

    let seller = create_test_seller(&db_manager, "인증 테스트 판매자").await;
    let auction =
        create_test_auction(&db_manager, "인증 테스트 경매", seller.id, 100, Duration::hours(2))
            .await;

    let response = client
        .post(format!("{}/auctions/bid", BASE_URL))
        .json(&json!({ "auction_id": auction.id, "amount": 200 }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 401);
}

/// 만료 경매 스윕: 상태만 전환되고 낙찰자는 유지된다
#[tokio::test]
async fn test_sweep_closes_expired() {
    if !server_available().await {
        return;
    }
    let db_manager = setup().await;
    let client = Client::new();

    let seller = create_test_seller(&db_manager, "스윕 테스트 판매자").await;
    let auction = create_test_auction(
        &db_manager,
        "스윕 테스트 경매",
        seller.id,
        100,
        Duration::seconds(-1),
    )
    .await;

    let response = client
        .post(format!("{}/auctions/close-expired", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.unwrap();
    assert!(body["closed"].as_u64().unwrap() >= 1);

    let closed = query::handlers::get_auction(&db_manager, auction.id)
        .await
        .unwrap();
    assert_eq!(closed.status, "CLOSED");
    assert_eq!(closed.winner_id, None);
    assert_eq!(closed.current_bid, 100);
}

/// closeIfExpired 멱등성: 두 번째 호출은 no-op
#[tokio::test]
async fn test_close_if_expired_idempotent() {
    if !server_available().await {
        return;
    }
    let db_manager = setup().await;

    let seller = create_test_seller(&db_manager, "멱등 테스트 판매자").await;
    let auction = create_test_auction(
        &db_manager,
        "멱등 테스트 경매",
        seller.id,
        100,
        Duration::seconds(-1),
    )
    .await;

    let first = AuctionSweeper::close_if_expired(db_manager.pool(), auction.id)
        .await
        .unwrap();
    assert_eq!(first, Some((None, 100)));

    let second = AuctionSweeper::close_if_expired(db_manager.pool(), auction.id)
        .await
        .unwrap();
    assert_eq!(second, None);

    let closed = query::handlers::get_auction(&db_manager, auction.id)
        .await
        .unwrap();
    assert_eq!(closed.status, "CLOSED");
    assert_eq!(closed.winner_id, None);
}

/// 추월 알림: 이전 선두에게 outbid 알림 기록이 생성된다
#[tokio::test]
async fn test_outbid_notification() {
    if !server_available().await {
        return;
    }
    let db_manager = setup().await;
    let client = Client::new();

    let seller = create_test_seller(&db_manager, "알림 테스트 판매자").await;
    let auction =
        create_test_auction(&db_manager, "알림 테스트 경매", seller.id, 100, Duration::hours(2))
            .await;
    let first_bidder = create_test_user(&db_manager, "first").await;
    let second_bidder = create_test_user(&db_manager, "second").await;

    let (status, _) = place_bid(&client, first_bidder.id, auction.id, 110).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = place_bid(&client, second_bidder.id, auction.id, 120).await;
    assert_eq!(status, StatusCode::OK);

    // 이전 선두의 알림함에 outbid 기록이 보인다
    let response = client
        .get(format!("{}/notifications", BASE_URL))
        .header("x-user-id", first_bidder.id.to_string())
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let notifications: Value = response.json().await.unwrap();
    let outbid = notifications
        .as_array()
        .unwrap()
        .iter()
        .find(|n| n["auction_id"] == auction.id && n["kind"] == "outbid");
    assert!(outbid.is_some(), "outbid 알림이 없음: {:?}", notifications);

    // 두 입찰자 모두 같은 최신 가격을 본다
    let updated = query::handlers::get_auction(&db_manager, auction.id)
        .await
        .unwrap();
    assert_eq!(updated.current_bid, 120);
    assert_eq!(updated.winner_id, Some(second_bidder.id));
}

/// 마감 직전 입찰이 스윕 이후에도 낙찰자로 유지된다
#[tokio::test]
async fn test_last_moment_bid_honored_by_sweep() {
    if !server_available().await {
        return;
    }
    let db_manager = setup().await;
    let client = Client::new();

    let seller = create_test_seller(&db_manager, "막판 입찰 판매자").await;
    let auction = create_test_auction(
        &db_manager,
        "막판 입찰 경매",
        seller.id,
        100,
        Duration::seconds(3),
    )
    .await;
    let bidder = create_test_user(&db_manager, "sniper").await;

    let (status, _) = place_bid(&client, bidder.id, auction.id, 150).await;
    assert_eq!(status, StatusCode::OK);

    // 마감 시간 경과 후 스윕
    tokio::time::sleep(tokio::time::Duration::from_secs(4)).await;
    let response = client
        .post(format!("{}/auctions/close-expired", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let closed = query::handlers::get_auction(&db_manager, auction.id)
        .await
        .unwrap();
    assert_eq!(closed.status, "CLOSED");
    assert_eq!(closed.current_bid, 150);
    assert_eq!(closed.winner_id, Some(bidder.id));

    // 마감된 경매에는 더 입찰할 수 없다
    let (status, body) = place_bid(&client, bidder.id, auction.id, 200).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "NOT_ACTIVE");
}

/// 리뷰 작성과 조회
#[tokio::test]
async fn test_review_flow() {
    if !server_available().await {
        return;
    }
    let db_manager = setup().await;
    let client = Client::new();

    let seller = create_test_seller(&db_manager, "리뷰 테스트 판매자").await;
    let reviewer = create_test_user(&db_manager, "reviewer").await;

    // 정상 작성
    let response = client
        .post(format!("{}/reviews", BASE_URL))
        .header("x-user-id", reviewer.id.to_string())
        .json(&json!({ "seller_id": seller.id, "rating": 5, "comment": "포장이 꼼꼼했습니다." }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 201);

    // 범위 밖 평점은 거절
    let response = client
        .post(format!("{}/reviews", BASE_URL))
        .header("x-user-id", reviewer.id.to_string())
        .json(&json!({ "seller_id": seller.id, "rating": 6, "comment": "잘못된 평점" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 400);

    // 없는 판매자는 404
    let response = client
        .post(format!("{}/reviews", BASE_URL))
        .header("x-user-id", reviewer.id.to_string())
        .json(&json!({ "seller_id": 999_999_999i64, "rating": 4, "comment": "대상 없음" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 404);

    // 최신순 조회
    let response = client
        .get(format!("{}/reviews/seller/{}", BASE_URL, seller.id))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let reviews: Value = response.json().await.unwrap();
    let reviews = reviews.as_array().unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0]["rating"], 5);
    assert_eq!(reviews[0]["reviewer_name"], reviewer.username);
}

/// 동시성 입찰 테스트: 최종 가격은 최고 수락 금액과 같고 이력은 단조 증가한다
#[tokio::test]
async fn test_concurrent_bidding() {
    if !server_available().await {
        return;
    }
    let db_manager = setup().await;

    let seller = create_test_seller(&db_manager, "동시성 테스트 판매자").await;
    let auction = create_test_auction(
        &db_manager,
        "동시성 테스트 경매",
        seller.id,
        10_000,
        Duration::hours(2),
    )
    .await;

    // 입찰자 50명 생성
    let mut bidders = Vec::with_capacity(50);
    for i in 1..=50 {
        bidders.push(create_test_user(&db_manager, &format!("racer{}", i)).await);
    }

    // 50개의 동시 입찰 생성
    let mut handles = vec![];
    for (i, bidder) in bidders.iter().enumerate() {
        let client = Client::new();
        let bid_amount = auction.current_bid + ((i as i64) + 1) * 1000;
        let auction_id = auction.id;
        let bidder_id = bidder.id;

        let handle = tokio::spawn(async move {
            place_bid(&client, bidder_id, auction_id, bid_amount).await
        });
        handles.push(handle);
    }

    // 모든 입찰 처리 대기 및 결과 확인
    let mut successful_bids = 0;
    let mut failed_bids = 0;
    for handle in handles {
        let (status, body) = handle.await.unwrap();
        if status == StatusCode::OK {
            successful_bids += 1;
        } else {
            assert_eq!(status, StatusCode::BAD_REQUEST, "예상 밖 응답: {:?}", body);
            assert_eq!(body["code"], "LOW_BID");
            failed_bids += 1;
        }
    }
    info!(
        "성공한 입찰 수: {}, 실패한 입찰 수: {}",
        successful_bids, failed_bids
    );
    assert_eq!(successful_bids + failed_bids, 50);

    // 최고 금액 입찰은 어떤 순서로 실행돼도 항상 수락된다
    let updated = query::handlers::get_auction(&db_manager, auction.id)
        .await
        .unwrap();
    assert_eq!(updated.current_bid, auction.current_bid + 50 * 1000);

    // 수락된 이력은 수락 순서 기준으로 단조 증가한다
    let history = query::handlers::get_bid_history(&db_manager, auction.id)
        .await
        .unwrap();
    assert_eq!(history.len(), successful_bids);
    let mut amounts: Vec<i64> = history.iter().map(|b| b.amount).collect();
    amounts.reverse();
    for pair in amounts.windows(2) {
        assert!(pair[0] < pair[1], "이력이 단조 증가하지 않음: {:?}", amounts);
    }
    assert_eq!(updated.winner_id, Some(bidders[49].id));
}
