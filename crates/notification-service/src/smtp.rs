use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::templates::EmailTemplate;
use crate::{Alert, NotificationChannel, NotificationConfig, NotificationError, SmtpTls};

const USER_AGENT: &str = concat!("nse-watchlist/", env!("CARGO_PKG_VERSION"));

/// Emails each alert to every configured recipient as its own message, so
/// one bad mailbox does not hide the alert from the others.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    recipients: Vec<Mailbox>,
}

impl SmtpNotifier {
    pub fn new(config: &NotificationConfig) -> Result<Self, NotificationError> {
        let host = config
            .smtp_host
            .as_deref()
            .ok_or_else(|| NotificationError::Config("SMTP_HOST not set".into()))?;
        let from = config
            .smtp_from
            .as_deref()
            .ok_or_else(|| NotificationError::Config("SMTP_FROM_ADDRESS not set".into()))?
            .parse::<Mailbox>()
            .map_err(|e| NotificationError::Config(format!("Invalid from address: {}", e)))?;

        let recipients = parse_recipients(&config.smtp_to);
        if recipients.is_empty() {
            return Err(NotificationError::Config(
                "No valid NOTIFICATION_EMAIL_TO addresses".into(),
            ));
        }

        Ok(Self {
            transport: build_transport(config, host)?,
            from,
            recipients,
        })
    }

    /// The message one recipient receives for `alert`.
    pub fn compose(&self, alert: &Alert, recipient: &Mailbox) -> Result<Message, NotificationError> {
        Message::builder()
            .from(self.from.clone())
            .to(recipient.clone())
            .subject(EmailTemplate::subject(alert))
            .date(alert.timestamp.into())
            .user_agent(USER_AGENT.to_string())
            .header(ContentType::TEXT_PLAIN)
            .body(EmailTemplate::render(alert))
            .map_err(|e| {
                NotificationError::Smtp(format!("Failed to build email for {}: {}", alert.symbol, e))
            })
    }
}

fn parse_recipients(addresses: &[String]) -> Vec<Mailbox> {
    addresses
        .iter()
        .filter_map(|addr| match addr.parse() {
            Ok(mailbox) => Some(mailbox),
            Err(e) => {
                tracing::warn!("Skipping invalid recipient {}: {}", addr, e);
                None
            }
        })
        .collect()
}

fn build_transport(
    config: &NotificationConfig,
    host: &str,
) -> Result<AsyncSmtpTransport<Tokio1Executor>, NotificationError> {
    let builder = match config.smtp_tls {
        SmtpTls::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(host),
        SmtpTls::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host),
        SmtpTls::None => Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)),
    }
    .map_err(|e| NotificationError::Smtp(format!("SMTP transport error: {}", e)))?
    .port(config.smtp_port);

    let builder = match (&config.smtp_username, &config.smtp_password) {
        (Some(user), Some(pass)) => {
            builder.credentials(Credentials::new(user.clone(), pass.clone()))
        }
        _ => builder,
    };

    Ok(builder.build())
}

#[async_trait]
impl NotificationChannel for SmtpNotifier {
    /// Succeeds if at least one recipient accepted the alert.
    async fn send(&self, alert: &Alert) -> Result<(), NotificationError> {
        let mut failed = 0;
        let mut last = String::new();

        for recipient in &self.recipients {
            let result = match self.compose(alert, recipient) {
                Ok(email) => self
                    .transport
                    .send(email)
                    .await
                    .map(|_| ())
                    .map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };
            if let Err(e) = result {
                tracing::warn!(
                    symbol = %alert.symbol,
                    recipient = %recipient,
                    "Alert email not accepted: {}",
                    e
                );
                failed += 1;
                last = e;
            }
        }

        if failed == self.recipients.len() {
            return Err(NotificationError::Smtp(format!(
                "No recipient accepted the {} alert: {}",
                alert.symbol, last
            )));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "smtp"
    }
}
