//! Plain-text tables for the terminal.

use chrono::Local;
use rust_decimal::Decimal;
use watchlist_core::{
    Direction, EvaluationResult, NotificationRecord, Status, WatchlistEntry, WatchlistStats,
};

use crate::evaluator::CycleReport;

fn money(value: Option<Decimal>) -> String {
    value
        .map(|v| format!("₹{:.2}", v.round_dp(2)))
        .unwrap_or_else(|| "-".to_string())
}

fn signed_percent(value: Option<Decimal>) -> String {
    match value {
        Some(v) if v.is_sign_negative() => format!("{:.2}%", v.round_dp(2)),
        Some(v) => format!("+{:.2}%", v.round_dp(2)),
        None => "-".to_string(),
    }
}

fn signed_money(value: Option<Decimal>) -> String {
    match value {
        Some(v) if v.is_sign_negative() => format!("-₹{:.2}", v.abs().round_dp(2)),
        Some(v) => format!("+₹{:.2}", v.round_dp(2)),
        None => "-".to_string(),
    }
}

pub fn render_results(direction: Direction, results: &[EvaluationResult]) -> String {
    let mut out = format!("{} watchlist\n", direction.title());
    if results.is_empty() {
        out.push_str(&format!(
            "  No stocks in your {} watchlist yet.\n",
            direction.as_str()
        ));
        return out;
    }

    out.push_str(&format!(
        "  {:<14} {:>12} {:>12} {:>22} {:>12}  {:<20} {}\n",
        "Symbol", "Current", "Target", "Change", "From Target", "Status", "Added"
    ));
    for r in results {
        let change = match (r.change, r.change_percent) {
            (Some(_), Some(_)) => format!(
                "{} ({})",
                signed_money(r.change),
                signed_percent(r.change_percent)
            ),
            _ => "-".to_string(),
        };
        out.push_str(&format!(
            "  {:<14} {:>12} {:>12} {:>22} {:>12}  {:<20} {}\n",
            r.symbol.as_str(),
            money(r.current_price),
            money(Some(r.target_price)),
            change,
            signed_percent(r.percent_from_target),
            r.status.label(),
            r.added_at.with_timezone(&Local).format("%Y-%m-%d")
        ));
        if let Some(error) = &r.error {
            out.push_str(&format!("      {}\n", error));
        }
    }
    out
}

pub fn render_cycle(report: &CycleReport) -> String {
    let mut out = render_results(report.direction, &report.results);
    out.push_str(&format!(
        "  {} reached, {} close, {} waiting, {} errors\n",
        report.count(Status::TargetReached),
        report.count(Status::CloseToTarget),
        report.count(Status::Waiting),
        report.count(Status::Error),
    ));
    for fired in &report.alerts {
        let note = if fired.delivered { "" } else { " (delivery failed)" };
        out.push_str(&format!("  🔔 {}{}\n", fired.alert.message, note));
    }
    for (symbol, breakout) in &report.breakouts {
        out.push_str(&format!("  📉 {} {}\n", symbol, breakout.describe()));
    }
    out
}

pub fn render_entries(direction: Direction, entries: &[WatchlistEntry]) -> String {
    let mut out = format!("{} watchlist ({})\n", direction.title(), entries.len());
    for entry in entries {
        out.push_str(&format!(
            "  {:<14} {:>12}  added {}\n",
            entry.symbol.as_str(),
            money(Some(entry.target_price)),
            entry.added_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        ));
    }
    out
}

pub fn render_stats(stats: &WatchlistStats) -> String {
    format!(
        "Buy watchlist:  {}\nSell watchlist: {}\nTotal:          {}\n",
        stats.buy_count, stats.sell_count, stats.total
    )
}

pub fn render_notifications(records: &[NotificationRecord], hours: i64) -> String {
    if records.is_empty() {
        return format!("No notifications in the last {} hours.\n", hours);
    }
    let mut out = format!("Notifications in the last {} hours\n", hours);
    for r in records {
        out.push_str(&format!(
            "  {}  {:<14} {:<4} {:>12} -> {:>12}  via {}\n",
            r.sent_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
            r.symbol.as_str(),
            r.direction.as_str(),
            money(Some(r.current_price)),
            money(Some(r.target_price)),
            r.channel.as_str()
        ));
    }
    out
}
