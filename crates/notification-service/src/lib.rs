mod dispatch;
mod gate;
mod smtp;
mod templates;

pub use dispatch::{AlertDispatcher, DispatchOutcome};
pub use gate::{hour_bucket, DedupKey, GateDecision, NotificationGate};
pub use smtp::SmtpNotifier;
pub use templates::EmailTemplate;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use watchlist_core::{percent_from_target, DeliveryChannel, Direction, NotificationRecord, Symbol};

/// Why an alert was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertType {
    /// Price inside the ±1% band around the target.
    CloseToTarget,
    /// Daily close crossed below a sell level.
    SupportBroken,
    /// Daily close crossed above a buy level.
    ResistanceBroken,
}

/// A notification alert to be dispatched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub alert_type: AlertType,
    pub symbol: Symbol,
    pub direction: Direction,
    pub current_price: Decimal,
    pub target_price: Decimal,
    pub timestamp: DateTime<Utc>,
    pub title: String,
    pub message: String,
}

impl Alert {
    pub fn new(
        alert_type: AlertType,
        symbol: Symbol,
        direction: Direction,
        current_price: Decimal,
        target_price: Decimal,
    ) -> Self {
        let mut alert = Self {
            alert_type,
            symbol,
            direction,
            current_price,
            target_price,
            timestamp: Utc::now(),
            title: String::new(),
            message: String::new(),
        };
        alert.title = EmailTemplate::subject(&alert);
        alert.message = EmailTemplate::summary(&alert);
        alert
    }

    pub fn close_to_target(
        symbol: Symbol,
        direction: Direction,
        current_price: Decimal,
        target_price: Decimal,
    ) -> Self {
        Self::new(
            AlertType::CloseToTarget,
            symbol,
            direction,
            current_price,
            target_price,
        )
    }

    /// Sell levels act as support, buy levels as resistance.
    pub fn breakout(
        symbol: Symbol,
        direction: Direction,
        closing_price: Decimal,
        level: Decimal,
    ) -> Self {
        let alert_type = match direction {
            Direction::Sell => AlertType::SupportBroken,
            Direction::Buy => AlertType::ResistanceBroken,
        };
        Self::new(alert_type, symbol, direction, closing_price, level)
    }

    /// Absolute distance from the target in percent.
    pub fn percent_difference(&self) -> Decimal {
        percent_from_target(self.current_price, self.target_price)
            .map(|pct| pct.abs())
            .unwrap_or(Decimal::ZERO)
    }

    pub fn to_record(&self, channel: DeliveryChannel) -> NotificationRecord {
        NotificationRecord {
            id: None,
            symbol: self.symbol.clone(),
            direction: self.direction,
            current_price: self.current_price,
            target_price: self.target_price,
            channel,
            sent_at: self.timestamp,
        }
    }
}

/// Trait for notification channels.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn send(&self, alert: &Alert) -> Result<(), NotificationError>;
    fn name(&self) -> &str;
}

/// Errors from the notification system.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("SMTP error: {0}")]
    Smtp(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("{failed} of {attempted} channels failed: {last}")]
    Delivery {
        failed: usize,
        attempted: usize,
        last: String,
    },
}

/// Configuration for the notification service.
#[derive(Debug, Clone, Default)]
pub struct NotificationConfig {
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: Option<String>,
    pub smtp_to: Vec<String>,
    pub smtp_tls: SmtpTls,
}

#[derive(Debug, Clone, Default)]
pub enum SmtpTls {
    #[default]
    StartTls,
    Tls,
    None,
}

impl NotificationConfig {
    /// Load from environment variables.
    pub fn from_env() -> Self {
        let smtp_to = std::env::var("NOTIFICATION_EMAIL_TO")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let smtp_tls = match std::env::var("SMTP_TLS").unwrap_or_default().as_str() {
            "tls" => SmtpTls::Tls,
            "none" => SmtpTls::None,
            _ => SmtpTls::StartTls,
        };

        Self {
            smtp_host: std::env::var("SMTP_HOST").ok().filter(|s| !s.is_empty()),
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(587),
            smtp_username: std::env::var("SMTP_USERNAME")
                .ok()
                .filter(|s| !s.is_empty()),
            smtp_password: std::env::var("SMTP_PASSWORD")
                .ok()
                .filter(|s| !s.is_empty()),
            smtp_from: std::env::var("SMTP_FROM_ADDRESS")
                .ok()
                .filter(|s| !s.is_empty()),
            smtp_to,
            smtp_tls,
        }
    }

    pub fn email_configured(&self) -> bool {
        self.smtp_host.is_some() && self.smtp_from.is_some() && !self.smtp_to.is_empty()
    }
}

/// Dispatches alerts to every configured channel.
pub struct NotificationService {
    channels: std::sync::Arc<Vec<Box<dyn NotificationChannel>>>,
}

impl NotificationService {
    pub fn new(config: &NotificationConfig) -> Self {
        let mut channels: Vec<Box<dyn NotificationChannel>> = Vec::new();

        if config.email_configured() {
            match SmtpNotifier::new(config) {
                Ok(notifier) => {
                    tracing::info!(
                        "Email notifications enabled (SMTP -> {} recipients)",
                        config.smtp_to.len()
                    );
                    channels.push(Box::new(notifier));
                }
                Err(e) => {
                    tracing::warn!("Failed to initialize SMTP notifier: {}", e);
                }
            }
        }

        if channels.is_empty() {
            tracing::info!(
                "No email channel configured (set SMTP_HOST, SMTP_FROM_ADDRESS and NOTIFICATION_EMAIL_TO), alerts stay in-app"
            );
        }

        Self::with_channels(channels)
    }

    pub fn with_channels(channels: Vec<Box<dyn NotificationChannel>>) -> Self {
        Self {
            channels: std::sync::Arc::new(channels),
        }
    }

    pub fn has_channels(&self) -> bool {
        !self.channels.is_empty()
    }

    /// Send to every channel, awaiting completion. Every channel is tried;
    /// any failure is reported once the loop is done.
    pub async fn send_alert_async(&self, alert: &Alert) -> Result<(), NotificationError> {
        let mut failed = 0;
        let mut last = String::new();

        for channel in self.channels.iter() {
            match channel.send(alert).await {
                Ok(()) => tracing::debug!("Sent notification via {}", channel.name()),
                Err(e) => {
                    tracing::warn!("Failed to send notification via {}: {}", channel.name(), e);
                    failed += 1;
                    last = e.to_string();
                }
            }
        }

        if failed > 0 {
            return Err(NotificationError::Delivery {
                failed,
                attempted: self.channels.len(),
                last,
            });
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::RecordingChannel;
    use super::*;
    use rust_decimal_macros::dec;
    use std::sync::atomic::Ordering;

    fn sym(s: &str) -> Symbol {
        Symbol::parse(s).unwrap()
    }

    #[test]
    fn test_breakout_reason_follows_direction() {
        let sell = Alert::breakout(sym("INFY"), Direction::Sell, dec!(1480), dec!(1500));
        assert_eq!(sell.alert_type, AlertType::SupportBroken);

        let buy = Alert::breakout(sym("INFY"), Direction::Buy, dec!(1520), dec!(1500));
        assert_eq!(buy.alert_type, AlertType::ResistanceBroken);
    }

    #[test]
    fn test_percent_difference_is_absolute() {
        let alert = Alert::close_to_target(sym("TCS"), Direction::Buy, dec!(99), dec!(100));
        assert_eq!(alert.percent_difference(), dec!(1));
    }

    #[test]
    fn test_record_carries_prices() {
        let alert = Alert::close_to_target(sym("TCS"), Direction::Sell, dec!(3490), dec!(3500));
        let record = alert.to_record(DeliveryChannel::InApp);
        assert_eq!(record.symbol.as_str(), "TCS.NS");
        assert_eq!(record.current_price, dec!(3490));
        assert_eq!(record.channel, DeliveryChannel::InApp);
        assert_eq!(record.sent_at, alert.timestamp);
    }

    #[test]
    fn test_unconfigured_email() {
        let config = NotificationConfig::default();
        assert!(!config.email_configured());
        assert!(!NotificationService::new(&config).has_channels());
    }

    #[tokio::test]
    async fn test_send_tries_every_channel() {
        let (ok, ok_count) = RecordingChannel::new(false);
        let (bad, bad_count) = RecordingChannel::new(true);
        let service = NotificationService::with_channels(vec![Box::new(bad), Box::new(ok)]);

        let alert = Alert::close_to_target(sym("TCS"), Direction::Buy, dec!(101), dec!(100));
        let err = service.send_alert_async(&alert).await.unwrap_err();

        assert!(matches!(
            err,
            NotificationError::Delivery {
                failed: 1,
                attempted: 2,
                ..
            }
        ));
        assert_eq!(ok_count.load(Ordering::SeqCst), 1);
        assert_eq!(bad_count.load(Ordering::SeqCst), 1);
    }
}
