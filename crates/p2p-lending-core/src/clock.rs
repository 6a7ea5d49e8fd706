use chrono::{DateTime, Utc};

/// Source of the current time. Only consulted when a caller leaves a date unset.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Resolve an optional caller-supplied date, falling back to the clock.
///
/// Every date field in the lifecycle goes through here so the
/// default-on-empty rule is applied the same way everywhere.
pub fn date_or_now(supplied: Option<DateTime<Utc>>, clock: &dyn Clock) -> DateTime<Utc> {
    supplied.unwrap_or_else(|| clock.now())
}
