/// 경매별 실시간 브로드캐스트
/// 구독자는 경매 단위 방에만 연결되며, 이벤트는 최대 한 번 전달된다.
/// 재전송 버퍼는 없다. 늦게 붙은 구독자는 다음 전체 조회에서 최신 가격을 본다.
// region:    --- Imports
use crate::auction::model::Bid;
use axum::extract::ws::{Message, WebSocket};
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

// endregion: --- Imports

// region:    --- Live Event

/// 실시간 이벤트
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveEvent {
    /// 입찰 갱신
    BidUpdate {
        auction_id: i64,
        amount: i64,
        bidder: String,
        bid: Bid,
    },
    /// 경매 마감
    AuctionClosed {
        auction_id: i64,
        winner_id: Option<i64>,
        final_bid: i64,
    },
}

// endregion: --- Live Event

// region:    --- Live Hub

/// 경매별 방을 관리하는 브로드캐스트 허브
pub struct LiveHub {
    rooms: DashMap<i64, broadcast::Sender<LiveEvent>>,
    capacity: usize,
}

impl LiveHub {
    pub fn new() -> Self {
        Self::with_capacity(64)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        LiveHub {
            rooms: DashMap::new(),
            capacity,
        }
    }

    /// 경매 방 구독 (방이 없으면 생성)
    pub fn subscribe(&self, auction_id: i64) -> broadcast::Receiver<LiveEvent> {
        self.rooms
            .entry(auction_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// 경매 방으로 이벤트 발행, 전달된 구독자 수 반환
    /// 구독자가 없으면 버린다
    pub fn publish(&self, auction_id: i64, event: LiveEvent) -> usize {
        match self.rooms.get(&auction_id) {
            Some(tx) => tx.send(event).unwrap_or(0),
            None => 0,
        }
    }

    /// 구독자가 모두 떠난 방 제거
    pub fn leave(&self, auction_id: i64) {
        self.rooms
            .remove_if(&auction_id, |_, tx| tx.receiver_count() == 0);
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

impl Default for LiveHub {
    fn default() -> Self {
        Self::new()
    }
}

// endregion: --- Live Hub

// region:    --- Subscriber Loop

/// 웹소켓 구독자 처리
/// 연결이 끊기거나 Close 프레임을 받으면 방에서 빠져나온다.
pub async fn serve_subscriber(socket: WebSocket, auction_id: i64, live_hub: Arc<LiveHub>) {
    info!(
        "{:<12} --> 구독자 연결: 경매 {}",
        "Live", auction_id
    );
    let mut events = live_hub.subscribe(auction_id);
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            incoming = receiver.next() => match incoming {
                None | Some(Err(_)) | Some(Ok(Message::Close(_))) => break,
                Some(Ok(_)) => {}
            },
            event = events.recv() => match event {
                Ok(event) => {
                    let payload = match serde_json::to_string(&event) {
                        Ok(payload) => payload,
                        Err(e) => {
                            error!("{:<12} --> 이벤트 직렬화 오류: {:?}", "Live", e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(payload)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // 버퍼를 넘긴 이벤트는 버린다
                    warn!(
                        "{:<12} --> 느린 구독자, 이벤트 {}건 유실: 경매 {}",
                        "Live", skipped, auction_id
                    );
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    live_hub.leave(auction_id);
    info!(
        "{:<12} --> 구독자 연결 종료: 경매 {}",
        "Live", auction_id
    );
}

// endregion: --- Subscriber Loop

// region:    --- Tests


// endregion: --- Tests
