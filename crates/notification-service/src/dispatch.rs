use std::sync::Arc;
use watchlist_core::{DeliveryChannel, NotificationLog, StoreError};

use crate::{Alert, NotificationError, NotificationService};

/// What happened to one alert that passed the gate.
#[derive(Debug)]
pub struct DispatchOutcome {
    pub channel: DeliveryChannel,
    pub record_id: Option<i64>,
    pub delivery_error: Option<NotificationError>,
    pub log_error: Option<StoreError>,
}

impl DispatchOutcome {
    pub fn delivered(&self) -> bool {
        self.delivery_error.is_none()
    }
}

/// Sends alerts that passed the gate and writes the audit record for each.
///
/// With no email channel the alert is only recorded as `InApp`.
pub struct AlertDispatcher {
    service: NotificationService,
    log: Arc<dyn NotificationLog>,
}

impl AlertDispatcher {
    pub fn new(service: NotificationService, log: Arc<dyn NotificationLog>) -> Self {
        Self { service, log }
    }

    pub fn channel(&self) -> DeliveryChannel {
        if self.service.has_channels() {
            DeliveryChannel::Email
        } else {
            DeliveryChannel::InApp
        }
    }

    pub async fn dispatch(&self, alert: &Alert) -> DispatchOutcome {
        let channel = self.channel();

        let delivery_error = match channel {
            DeliveryChannel::Email => self.service.send_alert_async(alert).await.err(),
            DeliveryChannel::InApp => None,
        };

        let record = alert.to_record(channel);
        let (record_id, log_error) = match self.log.log_notification(&record).await {
            Ok(id) => (Some(id), None),
            Err(e) => {
                tracing::warn!("Failed to log notification for {}: {}", alert.symbol, e);
                (None, Some(e))
            }
        };

        tracing::info!(
            symbol = %alert.symbol,
            direction = %alert.direction,
            channel = channel.as_str(),
            delivered = delivery_error.is_none(),
            "{}",
            alert.message
        );

        DispatchOutcome {
            channel,
            record_id,
            delivery_error,
            log_error,
        }
    }
}
