/// 입찰 알림 팬아웃
/// 앱 내 알림 기록은 입찰 응답 전에 동기적으로 저장한다.
/// 이메일은 큐 뒤의 워커가 전송하며, 전송 실패는 입찰을 실패시키지 않는다.
// region:    --- Imports
use crate::auction::model::{Auction, Bid};
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::query::{handlers, queries};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

// endregion: --- Imports

/// 알림 종류
pub const KIND_OUTBID: &str = "outbid";

// region:    --- Mailer

/// 발신 이메일
#[derive(Debug, Clone)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// 이메일 전송 트레이트
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<(), String>;
}

/// HTTP 메일 API 구현체
/// 자격 증명이 없으면 전송하지 않고 로그만 남긴다 (개발 모드)
pub struct HttpMailer {
    client: reqwest::Client,
    api_url: Option<String>,
    api_key: Option<String>,
    from: String,
}

impl HttpMailer {
    pub fn from_env() -> Self {
        HttpMailer {
            client: reqwest::Client::new(),
            api_url: std::env::var("EMAIL_API_URL").ok(),
            api_key: std::env::var("EMAIL_API_KEY").ok(),
            from: std::env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "no-reply@auction.example.com".to_string()),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), String> {
        let (Some(api_url), Some(api_key)) = (&self.api_url, &self.api_key) else {
            info!(
                "{:<12} --> [개발 모드] 이메일 전송 생략: to={}, subject={}",
                "Mailer", email.to, email.subject
            );
            return Ok(());
        };

        let response = self
            .client
            .post(api_url)
            .bearer_auth(api_key)
            .json(&serde_json::json!({
                "from": self.from,
                "to": email.to,
                "subject": email.subject,
                "html": email.html,
            }))
            .send()
            .await
            .map_err(|e| e.to_string())?;

        response.error_for_status().map_err(|e| e.to_string())?;
        info!("{:<12} --> 이메일 전송 완료: to={}", "Mailer", email.to);
        Ok(())
    }
}

/// 메일 워커: 큐에서 꺼내 전송하고 실패는 로그만 남긴다
pub async fn run_mail_worker(mut mail_rx: mpsc::Receiver<OutboundEmail>, mailer: Arc<dyn Mailer>) {
    info!("{:<12} --> 메일 워커 시작", "MailWorker");
    while let Some(email) = mail_rx.recv().await {
        if let Err(e) = mailer.send(&email).await {
            error!(
                "{:<12} --> 이메일 전송 실패: to={}, 원인: {}",
                "MailWorker", email.to, e
            );
        }
    }
    info!("{:<12} --> 메일 워커 종료", "MailWorker");
}

// endregion: --- Mailer

// region:    --- Notifier

/// 이전 선두 입찰자에게 보낼 알림 메시지
pub fn outbid_message(auction_title: &str) -> String {
    format!("'{}' 경매에서 다른 입찰자에게 추월당했습니다!", auction_title)
}

/// 이전 선두 입찰자에게 보낼 이메일
pub fn outbid_email(frontend_url: &str, auction: &Auction, amount: i64, to: &str) -> OutboundEmail {
    OutboundEmail {
        to: to.to_string(),
        subject: format!("상위 입찰 알림: {}", auction.title),
        html: format!(
            "<p><b>{}</b> 경매에서 추월당했습니다. 새 입찰가는 {}입니다. <a href=\"{}/auction/{}\">지금 다시 입찰하세요!</a></p>",
            auction.title, amount, frontend_url, auction.id
        ),
    }
}

/// 알림 팬아웃 컴포넌트
pub struct Notifier {
    db_manager: Arc<DatabaseManager>,
    mail_tx: mpsc::Sender<OutboundEmail>,
    frontend_url: String,
}

impl Notifier {
    /// 알림 컴포넌트 생성 및 메일 워커 시작
    pub fn start(db_manager: Arc<DatabaseManager>, mailer: Arc<dyn Mailer>) -> Self {
        let (mail_tx, mail_rx) = mpsc::channel(256);
        tokio::spawn(run_mail_worker(mail_rx, mailer));

        Notifier {
            db_manager,
            mail_tx,
            frontend_url: std::env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
        }
    }

    /// 입찰 수락 후 팬아웃
    /// 이전 선두가 있고 새 입찰자와 다르면: 알림 기록을 동기 저장하고 이메일을 큐에 넣는다.
    pub async fn on_bid_accepted(
        &self,
        auction: &Auction,
        bid: &Bid,
        previous_winner_id: Option<i64>,
    ) -> Result<(), ApiError> {
        let Some(previous_winner_id) = previous_winner_id else {
            return Ok(());
        };
        if previous_winner_id == bid.bidder_id {
            return Ok(());
        }

        let previous_winner = match handlers::get_user(&self.db_manager, previous_winner_id).await
        {
            Ok(user) => user,
            Err(sqlx::Error::RowNotFound) => {
                warn!(
                    "{:<12} --> 이전 입찰자 {} 없음, 알림 생략",
                    "Notifier", previous_winner_id
                );
                return Ok(());
            }
            Err(e) => return Err(ApiError::Internal(e)),
        };

        // 앱 내 알림은 입찰 응답 전에 저장되어야 한다
        sqlx::query(queries::INSERT_NOTIFICATION)
            .bind(previous_winner.id)
            .bind(auction.id)
            .bind(KIND_OUTBID)
            .bind(outbid_message(&auction.title))
            .execute(self.db_manager.pool())
            .await?;
        info!(
            "{:<12} --> 알림 기록 저장: user {}, 경매 {}",
            "Notifier", previous_winner.id, auction.id
        );

        let email = outbid_email(&self.frontend_url, auction, bid.amount, &previous_winner.email);
        if let Err(e) = self.mail_tx.try_send(email) {
            warn!("{:<12} --> 메일 큐 적재 실패: {}", "Notifier", e);
        }

        Ok(())
    }
}

// endregion: --- Notifier

// region:    --- Tests


// endregion: --- Tests
