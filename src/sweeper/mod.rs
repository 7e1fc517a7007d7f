/// 경매 마감 스위퍼
/// 마감 시간이 지난 ACTIVE 경매를 CLOSED로 전환한다.
/// 상태만 바꾸고 current_bid/winner_id에는 절대 쓰지 않으므로
/// 마감 직전에 커밋된 입찰의 낙찰자가 그대로 유지된다.
// region:    --- Imports
use crate::live::{LiveEvent, LiveHub};
use crate::query::queries;
use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{debug, error, info};

// endregion: --- Imports

// region:    --- Auction Sweeper

pub struct AuctionSweeper {
    pool: Arc<PgPool>,
    live_hub: Arc<LiveHub>,
    period: Duration,
}

impl AuctionSweeper {
    pub fn new(pool: Arc<PgPool>, live_hub: Arc<LiveHub>) -> Self {
        let secs = std::env::var("SWEEP_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);
        AuctionSweeper {
            pool,
            live_hub,
            period: Duration::from_secs(secs),
        }
    }

    /// 주기 실행 시작
    pub async fn start(&self) {
        let pool = Arc::clone(&self.pool);
        let live_hub = Arc::clone(&self.live_hub);
        let period = self.period;
        info!(
            "{:<12} --> 마감 스위퍼 시작: 주기 {}초",
            "Sweeper",
            period.as_secs()
        );
        tokio::spawn(async move {
            let mut ticker = interval(period);
            loop {
                ticker.tick().await;
                match Self::sweep(&pool, &live_hub).await {
                    Ok(0) => debug!("{:<12} --> 마감 대상 없음", "Sweeper"),
                    Ok(closed) => info!("{:<12} --> 경매 {}건 마감", "Sweeper", closed),
                    Err(e) => error!("{:<12} --> 스윕 중 오류 발생: {:?}", "Sweeper", e),
                }
            }
        });
    }

    /// 만료된 경매를 건별로 마감하고 마감 건수를 반환
    /// 개별 경매의 실패는 로그만 남기고 나머지 스윕을 계속한다
    pub async fn sweep(pool: &PgPool, live_hub: &LiveHub) -> Result<u64, sqlx::Error> {
        let now = Utc::now();
        let expired: Vec<i64> = sqlx::query_scalar(queries::FIND_EXPIRED_AUCTIONS)
            .bind(now)
            .fetch_all(pool)
            .await?;

        let mut closed = 0u64;
        for auction_id in expired {
            match Self::close_if_expired(pool, auction_id).await {
                Ok(Some((winner_id, final_bid))) => {
                    closed += 1;
                    live_hub.publish(
                        auction_id,
                        LiveEvent::AuctionClosed {
                            auction_id,
                            winner_id,
                            final_bid,
                        },
                    );
                }
                // 다른 스윕이 먼저 마감한 경우
                Ok(None) => {}
                Err(e) => {
                    error!(
                        "{:<12} --> 경매 {} 마감 실패: {:?}",
                        "Sweeper", auction_id, e
                    );
                }
            }
        }
        Ok(closed)
    }

    /// 마감 시간이 지났고 아직 ACTIVE인 경우에만 상태를 전환 (멱등)
    /// 마감되면 (winner_id, 최종 가격)을 반환
    pub async fn close_if_expired(
        pool: &PgPool,
        auction_id: i64,
    ) -> Result<Option<(Option<i64>, i64)>, sqlx::Error> {
        sqlx::query_as::<_, (Option<i64>, i64)>(queries::CLOSE_IF_EXPIRED)
            .bind(auction_id)
            .bind(Utc::now())
            .fetch_optional(pool)
            .await
    }
}

// endregion: --- Auction Sweeper
