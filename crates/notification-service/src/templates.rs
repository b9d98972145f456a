use crate::{Alert, AlertType};
use watchlist_core::Direction;

pub struct EmailTemplate;

impl EmailTemplate {
    pub fn subject(alert: &Alert) -> String {
        match alert.alert_type {
            AlertType::CloseToTarget => {
                format!("Stock Alert: {} is close to your target!", alert.symbol)
            }
            AlertType::SupportBroken => {
                format!("Stock Alert: {} broke below support", alert.symbol)
            }
            AlertType::ResistanceBroken => {
                format!("Stock Alert: {} broke above resistance", alert.symbol)
            }
        }
    }

    /// One line for logs and in-app display.
    pub fn summary(alert: &Alert) -> String {
        match alert.alert_type {
            AlertType::CloseToTarget => format!(
                "{} at ₹{:.2} is {:.2}% from your {} target ₹{:.2}",
                alert.symbol,
                alert.current_price,
                alert.percent_difference().round_dp(2),
                alert.direction,
                alert.target_price
            ),
            AlertType::SupportBroken => format!(
                "{} closed at ₹{:.2}, below support ₹{:.2}",
                alert.symbol, alert.current_price, alert.target_price
            ),
            AlertType::ResistanceBroken => format!(
                "{} closed at ₹{:.2}, above resistance ₹{:.2}",
                alert.symbol, alert.current_price, alert.target_price
            ),
        }
    }

    /// Plain-text email body.
    pub fn render(alert: &Alert) -> String {
        let details = match alert.alert_type {
            AlertType::CloseToTarget => {
                let action = match alert.direction {
                    Direction::Buy => "buying",
                    Direction::Sell => "selling",
                };
                format!(
                    "Your stock {symbol} is now close to your target price!\n\n\
                     Current Price: ₹{current:.2}\n\
                     Your Target Price: ₹{target:.2}\n\
                     Difference: {diff:.2}%\n\
                     Action: Consider {action}",
                    symbol = alert.symbol,
                    current = alert.current_price,
                    target = alert.target_price,
                    diff = alert.percent_difference().round_dp(2),
                )
            }
            AlertType::SupportBroken => format!(
                "ALERT: {symbol} has broken below its support level!\n\n\
                 Current Closing Price: ₹{current:.2}\n\
                 Support Level: ₹{level:.2}\n\
                 Action: Consider selling immediately\n\
                 Alert Type: Daily close below support",
                symbol = alert.symbol,
                current = alert.current_price,
                level = alert.target_price,
            ),
            AlertType::ResistanceBroken => format!(
                "ALERT: {symbol} has broken above its resistance level!\n\n\
                 Current Closing Price: ₹{current:.2}\n\
                 Resistance Level: ₹{level:.2}\n\
                 Action: Consider buying on momentum\n\
                 Alert Type: Daily close above resistance",
                symbol = alert.symbol,
                current = alert.current_price,
                level = alert.target_price,
            ),
        };

        format!(
            "Hi,\n\n{details}\n\nTime: {ts} UTC\n\n\
             This is an automated notification from your NSE watchlist monitor.\n",
            ts = alert.timestamp.format("%Y-%m-%d %H:%M:%S"),
        )
    }
}
