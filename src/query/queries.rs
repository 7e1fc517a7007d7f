/// 경매 조회
pub const GET_AUCTION: &str =
    "SELECT id, title, description, category, image_urls, starting_bid, current_bid, end_time, status, winner_id, seller_id, created_at FROM auctions WHERE id = $1";

/// 경매 목록 조회 (필터는 QueryBuilder로 덧붙인다)
pub const LIST_AUCTIONS_BASE: &str =
    "SELECT id, title, description, category, image_urls, starting_bid, current_bid, end_time, status, winner_id, seller_id, created_at FROM auctions";

/// 입찰 이력 조회 (수락 역순)
/// bid_time은 커밋 전에 찍히므로 수락 순서는 id가 기준이다
pub const GET_BID_HISTORY: &str = r#"
    SELECT id, auction_id, bidder_id, bidder_name, amount, bid_time
    FROM bids
    WHERE auction_id = $1
    ORDER BY id DESC
"#;

/// 사용자 조회
pub const GET_USER: &str = "SELECT id, username, email FROM users WHERE id = $1";

/// 판매자 조회
pub const GET_SELLER: &str = "SELECT id, name, created_at FROM sellers WHERE id = $1";

/// 이전 선두 입찰자 확보 (행 잠금)
pub const LOCK_AUCTION_FOR_BID: &str =
    "SELECT winner_id FROM auctions WHERE id = $1 FOR UPDATE";

/// 입찰 커밋: 마감 시간과 현재 가격을 같은 문장 안에서 재검증하는 조건부 업데이트
pub const COMMIT_BID: &str = r#"
    UPDATE auctions SET current_bid = $2, winner_id = $3
    WHERE id = $1 AND status = 'ACTIVE' AND end_time > $4 AND current_bid < $2
    RETURNING current_bid
"#;

/// 입찰 기록 삽입
pub const INSERT_BID: &str = r#"
    INSERT INTO bids (auction_id, bidder_id, bidder_name, amount, bid_time)
    VALUES ($1, $2, $3, $4, $5)
    RETURNING id, auction_id, bidder_id, bidder_name, amount, bid_time
"#;

/// 마감 대상 경매 조회
pub const FIND_EXPIRED_AUCTIONS: &str =
    "SELECT id FROM auctions WHERE status = 'ACTIVE' AND end_time <= $1 ORDER BY end_time";

/// 경매 마감: 상태만 전환하고 current_bid/winner_id는 건드리지 않는다
pub const CLOSE_IF_EXPIRED: &str = r#"
    UPDATE auctions SET status = 'CLOSED'
    WHERE id = $1 AND status = 'ACTIVE' AND end_time <= $2
    RETURNING winner_id, current_bid
"#;

/// 알림 기록 삽입
pub const INSERT_NOTIFICATION: &str = r#"
    INSERT INTO notifications (user_id, auction_id, kind, message)
    VALUES ($1, $2, $3, $4)
    RETURNING id, user_id, auction_id, kind, message, read, created_at
"#;

/// 사용자 알림 조회 (최신순)
pub const LIST_NOTIFICATIONS: &str = r#"
    SELECT id, user_id, auction_id, kind, message, read, created_at
    FROM notifications
    WHERE user_id = $1
    ORDER BY created_at DESC, id DESC
"#;

/// 판매자 리뷰 조회 (최신순)
pub const LIST_SELLER_REVIEWS: &str = r#"
    SELECT id, seller_id, reviewer_id, reviewer_name, rating, comment, created_at
    FROM reviews
    WHERE seller_id = $1
    ORDER BY created_at DESC, id DESC
"#;

/// 리뷰 삽입
pub const INSERT_REVIEW: &str = r#"
    INSERT INTO reviews (seller_id, reviewer_id, reviewer_name, rating, comment)
    VALUES ($1, $2, $3, $4, $5)
    RETURNING id, seller_id, reviewer_id, reviewer_name, rating, comment, created_at
"#;
