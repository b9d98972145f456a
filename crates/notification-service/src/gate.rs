use chrono::{DateTime, Duration, DurationRound, Utc};
use std::collections::HashSet;
use watchlist_core::{Direction, Status, Symbol};

/// `now` truncated to the start of its clock hour.
pub fn hour_bucket(now: DateTime<Utc>) -> DateTime<Utc> {
    now.duration_trunc(Duration::hours(1)).unwrap_or(now)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub symbol: Symbol,
    pub direction: Direction,
    pub hour_bucket: DateTime<Utc>,
}

impl DedupKey {
    pub fn new(symbol: &Symbol, direction: Direction, now: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.clone(),
            direction,
            hour_bucket: hour_bucket(now),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateDecision {
    pub fire: bool,
    pub key: DedupKey,
}

/// At most one alert per (symbol, direction) per clock hour.
///
/// State lives only as long as the gate; a restart opens a fresh window.
#[derive(Debug, Default)]
pub struct NotificationGate {
    sent: HashSet<DedupKey>,
}

impl NotificationGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only `CloseToTarget` is eligible. A firing key is recorded immediately,
    /// whatever later happens to the delivery.
    pub fn should_notify(
        &mut self,
        symbol: &Symbol,
        direction: Direction,
        status: Status,
        now: DateTime<Utc>,
    ) -> GateDecision {
        let key = DedupKey::new(symbol, direction, now);
        if status != Status::CloseToTarget {
            return GateDecision { fire: false, key };
        }
        self.admit(key)
    }

    /// Dedup only, for callers that decide eligibility themselves.
    pub fn admit_at(
        &mut self,
        symbol: &Symbol,
        direction: Direction,
        now: DateTime<Utc>,
    ) -> GateDecision {
        self.admit(DedupKey::new(symbol, direction, now))
    }

    fn admit(&mut self, key: DedupKey) -> GateDecision {
        let fire = self.sent.insert(key.clone());
        GateDecision { fire, key }
    }

    pub fn contains(&self, key: &DedupKey) -> bool {
        self.sent.contains(key)
    }

    /// Forget keys from hours before `now`'s bucket.
    pub fn prune(&mut self, now: DateTime<Utc>) {
        let current = hour_bucket(now);
        self.sent.retain(|key| key.hour_bucket >= current);
    }

    pub fn len(&self) -> usize {
        self.sent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sym(s: &str) -> Symbol {
        Symbol::parse(s).unwrap()
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, h, m, 15).unwrap()
    }

    #[test]
    fn test_hour_bucket_truncates() {
        let expected = Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap();
        assert_eq!(hour_bucket(at(10, 59)), expected);
    }

    #[test]
    fn test_fires_once_per_hour() {
        let mut gate = NotificationGate::new();
        let tcs = sym("TCS");

        let first = gate.should_notify(&tcs, Direction::Buy, Status::CloseToTarget, at(10, 5));
        assert!(first.fire);
        assert!(gate.contains(&first.key));

        let again = gate.should_notify(&tcs, Direction::Buy, Status::CloseToTarget, at(10, 50));
        assert!(!again.fire);
        assert_eq!(again.key, first.key);

        let next_hour = gate.should_notify(&tcs, Direction::Buy, Status::CloseToTarget, at(11, 0));
        assert!(next_hour.fire);
    }

    #[test]
    fn test_only_close_to_target_is_eligible() {
        let mut gate = NotificationGate::new();
        let tcs = sym("TCS");

        for status in [Status::TargetReached, Status::Waiting, Status::Error] {
            assert!(!gate.should_notify(&tcs, Direction::Sell, status, at(9, 0)).fire);
        }
        assert!(gate.is_empty());
    }

    #[test]
    fn test_key_includes_symbol_and_direction() {
        let mut gate = NotificationGate::new();
        let now = at(12, 30);

        assert!(gate.should_notify(&sym("TCS"), Direction::Buy, Status::CloseToTarget, now).fire);
        assert!(gate.should_notify(&sym("TCS"), Direction::Sell, Status::CloseToTarget, now).fire);
        assert!(gate.should_notify(&sym("INFY"), Direction::Buy, Status::CloseToTarget, now).fire);
        assert_eq!(gate.len(), 3);
    }

    #[test]
    fn test_prune_drops_past_hours() {
        let mut gate = NotificationGate::new();
        gate.admit_at(&sym("TCS"), Direction::Buy, at(9, 10));
        gate.admit_at(&sym("INFY"), Direction::Buy, at(10, 10));

        gate.prune(at(10, 45));
        assert_eq!(gate.len(), 1);
        assert!(!gate.admit_at(&sym("INFY"), Direction::Buy, at(10, 50)).fire);
    }
}
