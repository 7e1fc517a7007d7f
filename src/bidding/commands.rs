/// 입찰 커맨드 처리
/// 같은 경매에 대한 동시 입찰은 행 잠금 + 조건부 업데이트 한 문장으로 직렬화된다.
/// 조회 후 무조건 쓰기는 절대 하지 않는다.
// region:    --- Imports
use crate::auction::model::{self, Auction, Bid, User};
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::query::{handlers, queries};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
// endregion: --- Imports

// region:    --- Commands

/// 입찰 명령
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PlaceBidCommand {
    pub auction_id: i64,
    pub bidder_id: i64,
    pub amount: i64,
}

/// 입찰 확정 결과
#[derive(Debug, Clone)]
pub struct BidReceipt {
    pub bid: Bid,
    pub current_bid: i64,
    pub previous_winner_id: Option<i64>,
    pub auction: Auction,
}

/// 입찰 처리
/// 검증 순서: 경매 존재 -> 상태 -> 마감 시간 -> 금액 -> 입찰자 존재.
/// 커밋은 마감 시간과 현재 가격을 같은 원자적 업데이트 안에서 재검증한다.
pub async fn handle_place_bid(
    cmd: PlaceBidCommand,
    db_manager: &DatabaseManager,
) -> Result<BidReceipt, ApiError> {
    info!("{:<12} --> 입찰 요청 처리 시작: {:?}", "Command", cmd);

    let auction = handlers::get_auction(db_manager, cmd.auction_id)
        .await
        .map_err(|e| ApiError::from_fetch(e, "경매"))?;

    let now = Utc::now();
    validate_bid(&auction, cmd.amount, now)?;

    let bidder = handlers::get_user(db_manager, cmd.bidder_id)
        .await
        .map_err(|e| ApiError::from_fetch(e, "사용자"))?;

    match commit_bid(db_manager, &cmd, &bidder, now).await {
        Ok((bid, previous_winner_id)) => {
            info!(
                "{:<12} --> 입찰 성공: 경매 {}, 현재 가격 {}",
                "Command", cmd.auction_id, cmd.amount
            );
            Ok(BidReceipt {
                bid,
                current_bid: cmd.amount,
                previous_winner_id,
                auction,
            })
        }
        Err(CommitError::Lost) => {
            // 커밋 사이에 다른 입찰이나 마감이 끼어든 경우: 최신 상태로 거절 사유 재판정
            warn!(
                "{:<12} --> 입찰 경합 발생: 경매 {}, 금액 {}",
                "Command", cmd.auction_id, cmd.amount
            );
            let auction = handlers::get_auction(db_manager, cmd.auction_id)
                .await
                .map_err(|e| ApiError::from_fetch(e, "경매"))?;
            validate_bid(&auction, cmd.amount, Utc::now())?;
            Err(ApiError::low_bid(auction.current_bid))
        }
        Err(CommitError::Db(e)) => Err(ApiError::Internal(e)),
    }
}

/// 입찰 사전 검증 (첫 위반에서 즉시 실패)
pub fn validate_bid(auction: &Auction, amount: i64, now: DateTime<Utc>) -> Result<(), ApiError> {
    if auction.status != model::STATUS_ACTIVE {
        return Err(ApiError::not_active());
    }
    // 스위퍼가 아직 처리하지 않은 만료 경매도 여기서 걸러낸다
    if now >= auction.end_time {
        return Err(ApiError::already_ended());
    }
    if amount <= auction.current_bid {
        return Err(ApiError::low_bid(auction.current_bid));
    }
    Ok(())
}

// endregion: --- Commands

// region:    --- Atomic Commit

enum CommitError {
    /// 조건부 업데이트가 어떤 행도 바꾸지 못함
    Lost,
    Db(sqlx::Error),
}

impl From<sqlx::Error> for CommitError {
    fn from(e: sqlx::Error) -> Self {
        CommitError::Db(e)
    }
}

/// 한 트랜잭션 안에서: 행 잠금으로 이전 선두 확보 -> 조건부 업데이트 -> 입찰 기록 삽입.
/// 업데이트가 0행이면 트랜잭션 전체를 롤백하므로 부분 반영이 남지 않는다.
async fn commit_bid(
    db_manager: &DatabaseManager,
    cmd: &PlaceBidCommand,
    bidder: &User,
    now: DateTime<Utc>,
) -> Result<(Bid, Option<i64>), CommitError> {
    let auction_id = cmd.auction_id;
    let bidder_id = cmd.bidder_id;
    let amount = cmd.amount;
    let bidder_name = bidder.username.clone();

    db_manager
        .transaction(move |tx| {
            Box::pin(async move {
                let locked = sqlx::query_as::<_, (Option<i64>,)>(queries::LOCK_AUCTION_FOR_BID)
                    .bind(auction_id)
                    .fetch_optional(&mut **tx)
                    .await?;
                let Some((previous_winner_id,)) = locked else {
                    return Err(CommitError::Lost);
                };

                let updated = sqlx::query_scalar::<_, i64>(queries::COMMIT_BID)
                    .bind(auction_id)
                    .bind(amount)
                    .bind(bidder_id)
                    .bind(now)
                    .fetch_optional(&mut **tx)
                    .await?;
                if updated.is_none() {
                    return Err(CommitError::Lost);
                }

                let bid = sqlx::query_as::<_, Bid>(queries::INSERT_BID)
                    .bind(auction_id)
                    .bind(bidder_id)
                    .bind(bidder_name)
                    .bind(amount)
                    .bind(now)
                    .fetch_one(&mut **tx)
                    .await?;

                Ok((bid, previous_winner_id))
            })
        })
        .await
}

// endregion: --- Atomic Commit

// region:    --- Tests

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn test_auction(status: &str, current_bid: i64, ends_in_secs: i64) -> Auction {
        let now = Utc::now();
        Auction {
            id: 1,
            title: "테스트 경매".to_string(),
            description: "검증용".to_string(),
            category: "Other".to_string(),
            image_urls: vec!["https://images.example.com/item.jpg".to_string()],
            starting_bid: 100,
            current_bid,
            end_time: now + Duration::seconds(ends_in_secs),
            status: status.to_string(),
            winner_id: None,
            seller_id: 1,
            created_at: now,
        }
    }

    #[test]
    fn test_equal_bid_rejected_with_threshold() {
        let auction = test_auction(model::STATUS_ACTIVE, 100, 3600);
        let err = validate_bid(&auction, 100, Utc::now()).unwrap_err();
        match err {
            ApiError::InvalidBid {
                current_bid,
                message,
            } => {
                assert_eq!(current_bid, 100);
                assert!(message.contains("100"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_minimal_increment_accepted() {
        let auction = test_auction(model::STATUS_ACTIVE, 100, 3600);
        assert!(validate_bid(&auction, 101, Utc::now()).is_ok());
    }

    #[test]
    fn test_non_positive_amount_rejected() {
        let auction = test_auction(model::STATUS_ACTIVE, 100, 3600);
        assert!(matches!(
            validate_bid(&auction, 0, Utc::now()),
            Err(ApiError::InvalidBid { .. })
        ));
        assert!(matches!(
            validate_bid(&auction, -5, Utc::now()),
            Err(ApiError::InvalidBid { .. })
        ));
    }

    #[test]
    fn test_closed_auction_rejected_before_amount_check() {
        let auction = test_auction(model::STATUS_CLOSED, 100, 3600);
        // 금액이 충분히 높아도 상태 검증이 먼저다
        let err = validate_bid(&auction, 10_000, Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            ApiError::InvalidState {
                code: "NOT_ACTIVE",
                ..
            }
        ));
    }

    #[test]
    fn test_expired_but_unswept_auction_rejected() {
        // 스위퍼가 아직 닫지 않아 상태는 ACTIVE지만 마감 시간이 지난 경우
        let auction = test_auction(model::STATUS_ACTIVE, 100, -1);
        let err = validate_bid(&auction, 200, Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            ApiError::InvalidState {
                code: "ALREADY_ENDED",
                ..
            }
        ));
    }
}

// endregion: --- Tests
