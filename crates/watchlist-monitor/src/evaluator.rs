use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use notification_service::Alert;
use rust_decimal::Decimal;
use technical_analysis::{check_breakout, Breakout};
use watchlist_core::{
    classify, percent_from_target, Direction, EvaluationResult, PriceSource, Status, StoreError,
    Symbol, WatchlistEntry,
};

use crate::context::MonitorContext;

/// Fetch a price for one entry and classify it. A failed fetch becomes
/// `Status::Error` on that entry only.
pub async fn evaluate_entry(source: &dyn PriceSource, entry: &WatchlistEntry) -> EvaluationResult {
    let base = EvaluationResult {
        symbol: entry.symbol.clone(),
        direction: entry.direction,
        target_price: entry.target_price,
        current_price: None,
        change: None,
        change_percent: None,
        percent_from_target: None,
        status: Status::Error,
        added_at: entry.added_at,
        error: None,
    };

    match source.fetch(&entry.symbol).await {
        Ok(snapshot) => {
            let current = snapshot.current_price;
            EvaluationResult {
                current_price: Some(current),
                change: Some(snapshot.change()),
                change_percent: Some(snapshot.change_percent()),
                percent_from_target: percent_from_target(current, entry.target_price),
                status: classify(current, entry.target_price, entry.direction),
                ..base
            }
        }
        Err(e) => {
            tracing::warn!("Price fetch failed for {}: {}", entry.symbol, e);
            EvaluationResult {
                error: Some(e.to_string()),
                ..base
            }
        }
    }
}

/// Evaluate entries with at most `concurrency` fetches in flight.
/// Results come back in the same order as `entries`.
pub async fn evaluate_entries(
    source: &dyn PriceSource,
    entries: &[WatchlistEntry],
    concurrency: usize,
) -> Vec<EvaluationResult> {
    stream::iter(entries)
        .map(|entry| evaluate_entry(source, entry))
        .buffered(concurrency.max(1))
        .collect()
        .await
}

/// An alert the gate let through, and how its delivery went.
#[derive(Debug)]
pub struct FiredAlert {
    pub alert: Alert,
    pub delivered: bool,
    pub logged: bool,
}

#[derive(Debug)]
pub struct CycleReport {
    pub direction: Direction,
    pub results: Vec<EvaluationResult>,
    pub alerts: Vec<FiredAlert>,
    /// Breakouts seen this cycle, fresh or not.
    pub breakouts: Vec<(Symbol, Breakout)>,
    pub delivery_failures: usize,
}

impl CycleReport {
    pub fn error_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.status == Status::Error)
            .count()
    }

    pub fn count(&self, status: Status) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }
}

/// One pass over a watchlist: evaluate, gate, dispatch.
///
/// Only a store failure aborts the cycle; fetch and delivery problems are
/// carried in the report.
pub async fn run_cycle(
    ctx: &mut MonitorContext,
    direction: Direction,
) -> Result<CycleReport, StoreError> {
    run_cycle_at(ctx, direction, Utc::now()).await
}

pub async fn run_cycle_at(
    ctx: &mut MonitorContext,
    direction: Direction,
    now: DateTime<Utc>,
) -> Result<CycleReport, StoreError> {
    let entries = ctx.repo.list(direction).await?;
    tracing::debug!("Evaluating {} {} entries", entries.len(), direction);

    let results = evaluate_entries(ctx.prices.as_ref(), &entries, ctx.fetch_concurrency).await;

    ctx.target_gate.prune(now);
    ctx.breakout_gate.prune(now);

    let mut report = CycleReport {
        direction,
        results: Vec::with_capacity(results.len()),
        alerts: Vec::new(),
        breakouts: Vec::new(),
        delivery_failures: 0,
    };

    for result in results {
        let current = match result.current_price {
            Some(current) => current,
            None => {
                report.results.push(result);
                continue;
            }
        };

        let decision = ctx
            .target_gate
            .should_notify(&result.symbol, direction, result.status, now);
        if decision.fire {
            let alert = Alert::close_to_target(
                result.symbol.clone(),
                direction,
                current,
                result.target_price,
            );
            fire(ctx, &mut report, alert).await;
        }

        let previous = current - result.change.unwrap_or(Decimal::ZERO);
        if let Some(breakout) = check_breakout(current, previous, result.target_price, direction) {
            if breakout.is_fresh()
                && ctx
                    .breakout_gate
                    .admit_at(&result.symbol, direction, now)
                    .fire
            {
                let alert = Alert::breakout(
                    result.symbol.clone(),
                    direction,
                    current,
                    result.target_price,
                );
                fire(ctx, &mut report, alert).await;
            }
            report.breakouts.push((result.symbol.clone(), breakout));
        }

        report.results.push(result);
    }

    tracing::info!(
        "{} cycle: {} entries, {} alerts, {} fetch errors, {} delivery failures",
        direction.title(),
        report.results.len(),
        report.alerts.len(),
        report.error_count(),
        report.delivery_failures
    );
    Ok(report)
}

async fn fire(ctx: &MonitorContext, report: &mut CycleReport, alert: Alert) {
    let outcome = ctx.dispatcher.dispatch(&alert).await;
    if !outcome.delivered() {
        report.delivery_failures += 1;
    }
    report.alerts.push(FiredAlert {
        delivered: outcome.delivered(),
        logged: outcome.log_error.is_none(),
        alert,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use chrono::TimeZone;
    use notification_service::{AlertType, NotificationService};
    use rust_decimal_macros::dec;
    use watchlist_core::{DeliveryChannel, FetchError, NotificationLog, WatchlistRepository};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 6, h, m, 0).unwrap()
    }

    #[tokio::test]
    async fn test_buy_scenarios() {
        let prices = FakePrices::new()
            .with("TCS", dec!(99), dec!(98))
            .with("INFY", dec!(100.5), dec!(101))
            .with("WIPRO", dec!(105), dec!(104));
        let mut ctx = context(prices, vec![]).await;
        for symbol in ["TCS", "INFY", "WIPRO"] {
            add(&ctx, symbol, dec!(100), Direction::Buy).await;
        }

        let report = run_cycle_at(&mut ctx, Direction::Buy, at(10, 0)).await.unwrap();
        let status = |s: &str| {
            report
                .results
                .iter()
                .find(|r| r.symbol.base() == s)
                .map(|r| r.status)
        };

        assert_eq!(status("TCS"), Some(Status::TargetReached));
        assert_eq!(status("INFY"), Some(Status::CloseToTarget));
        assert_eq!(status("WIPRO"), Some(Status::Waiting));
        assert_eq!(report.alerts.len(), 1);
        assert_eq!(report.alerts[0].alert.symbol.base(), "INFY");
    }

    #[tokio::test]
    async fn test_results_keep_store_order() {
        let prices = FakePrices::new()
            .with("A", dec!(10), dec!(10))
            .with("B", dec!(10), dec!(10))
            .with("C", dec!(10), dec!(10));
        let mut ctx = context(prices, vec![]).await;
        ctx.fetch_concurrency = 2;
        for symbol in ["A", "B", "C"] {
            add(&ctx, symbol, dec!(50), Direction::Sell).await;
        }

        let expected: Vec<String> = ctx
            .repo
            .list(Direction::Sell)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.symbol.to_string())
            .collect();
        let report = run_cycle_at(&mut ctx, Direction::Sell, at(10, 0)).await.unwrap();
        let got: Vec<String> = report.results.iter().map(|r| r.symbol.to_string()).collect();
        assert_eq!(got, expected);
    }

    #[tokio::test]
    async fn test_fetch_failure_isolated() {
        let prices = FakePrices::new()
            .with("TCS", dec!(3490), dec!(3480))
            .failing("DELISTED");
        let mut ctx = context(prices, vec![]).await;
        add(&ctx, "TCS", dec!(3500), Direction::Sell).await;
        add(&ctx, "DELISTED", dec!(10), Direction::Sell).await;

        let report = run_cycle_at(&mut ctx, Direction::Sell, at(9, 15)).await.unwrap();
        assert_eq!(report.results.len(), 2);
        assert_eq!(report.error_count(), 1);

        let failed = report
            .results
            .iter()
            .find(|r| r.status == Status::Error)
            .unwrap();
        assert!(failed.current_price.is_none());
        assert!(failed.percent_from_target.is_none());
        assert!(failed.error.as_deref().unwrap().contains("DELISTED"));
        assert_eq!(report.alerts.len(), 1);
    }

    #[tokio::test]
    async fn test_alert_deduplicated_within_hour() {
        let prices = FakePrices::new().with("TCS", dec!(3490), dec!(3480));
        let mut ctx = context(prices, vec![]).await;
        add(&ctx, "TCS", dec!(3500), Direction::Sell).await;

        let first = run_cycle_at(&mut ctx, Direction::Sell, at(10, 5)).await.unwrap();
        let second = run_cycle_at(&mut ctx, Direction::Sell, at(10, 55)).await.unwrap();
        let third = run_cycle_at(&mut ctx, Direction::Sell, at(11, 1)).await.unwrap();

        assert_eq!(first.alerts.len(), 1);
        assert!(second.alerts.is_empty());
        assert_eq!(third.alerts.len(), 1);

        let logged = ctx.log.recent_notifications(24 * 365 * 10).await.unwrap();
        assert_eq!(logged.len(), 2);
        assert!(logged.iter().all(|r| r.channel == DeliveryChannel::InApp));
    }

    #[tokio::test]
    async fn test_failed_send_still_suppresses_repeat() {
        let prices = FakePrices::new().with("TCS", dec!(100.5), dec!(100.2));
        let mut ctx = context(prices, vec![failing_channel()]).await;
        add(&ctx, "TCS", dec!(100), Direction::Buy).await;

        let first = run_cycle_at(&mut ctx, Direction::Buy, at(14, 0)).await.unwrap();
        assert_eq!(first.delivery_failures, 1);
        assert!(!first.alerts[0].delivered);
        assert!(first.alerts[0].logged);

        let second = run_cycle_at(&mut ctx, Direction::Buy, at(14, 30)).await.unwrap();
        assert!(second.alerts.is_empty());

        let logged = ctx.log.recent_notifications(24 * 365 * 10).await.unwrap();
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0].channel, DeliveryChannel::Email);
    }

    #[tokio::test]
    async fn test_support_break_alert() {
        // Closed 101 yesterday, 98 today against a 100 sell level.
        let prices = FakePrices::new().with("SBIN", dec!(98), dec!(101));
        let mut ctx = context(prices, vec![]).await;
        add(&ctx, "SBIN", dec!(100), Direction::Sell).await;

        let report = run_cycle_at(&mut ctx, Direction::Sell, at(15, 40)).await.unwrap();
        assert_eq!(report.breakouts.len(), 1);
        let kinds: Vec<AlertType> = report.alerts.iter().map(|a| a.alert.alert_type).collect();
        assert_eq!(kinds, vec![AlertType::SupportBroken]);

        let again = run_cycle_at(&mut ctx, Direction::Sell, at(15, 50)).await.unwrap();
        assert_eq!(again.breakouts.len(), 1);
        assert!(again.alerts.is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_aborts_cycle() {
        let prices = FakePrices::new();
        let mut ctx = MonitorContext::new(
            std::sync::Arc::new(BrokenStore),
            std::sync::Arc::new(BrokenStore),
            std::sync::Arc::new(prices),
            NotificationService::with_channels(vec![]),
            4,
        );
        let err = run_cycle_at(&mut ctx, Direction::Buy, at(10, 0)).await.unwrap_err();
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn test_evaluate_entries_direct() {
        let prices = FakePrices::new().with("TCS", dec!(110), dec!(100));
        let entry = WatchlistEntry {
            id: 1,
            symbol: Symbol::parse("TCS").unwrap(),
            target_price: dec!(100),
            direction: Direction::Sell,
            added_at: Utc::now(),
            active: true,
        };

        let results = evaluate_entries(&prices, &[entry], 4).await;
        assert_eq!(results[0].status, Status::TargetReached);
        assert_eq!(results[0].change, Some(dec!(10)));
        assert_eq!(results[0].change_percent, Some(dec!(10)));
        assert_eq!(results[0].percent_from_target, Some(dec!(10)));

        let err = prices.fetch(&Symbol::parse("NOPE").unwrap()).await.unwrap_err();
        assert!(matches!(err, FetchError::NoData(_)));
    }

    #[tokio::test]
    async fn test_unrepresentable_distance_does_not_abort_batch() {
        let prices = FakePrices::new()
            .with("TCS", dec!(3490), dec!(3480))
            .with("INFY", dec!(1500), dec!(1490));
        let entry = |symbol: &str, target| WatchlistEntry {
            id: 1,
            symbol: Symbol::parse(symbol).unwrap(),
            target_price: target,
            direction: Direction::Buy,
            added_at: Utc::now(),
            active: true,
        };
        // legacy rows can hold targets the store would now reject
        let entries = vec![
            entry("TCS", dec!(0.0000000000000000000000000001)),
            entry("INFY", dec!(1490)),
        ];

        let results = evaluate_entries(&prices, &entries, 2).await;
        assert_eq!(results[0].status, Status::Waiting);
        assert!(results[0].percent_from_target.is_none());
        assert_eq!(results[1].status, Status::CloseToTarget);
    }
}
