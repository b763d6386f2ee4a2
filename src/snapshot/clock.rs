use chrono::{DateTime, TimeDelta, Utc};

/// Source of the current time for snapshot composition.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a fixed instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// 2024-01-01T12:00:00Z, a convenient reference point.
    pub fn epoch() -> Self {
        Self(DateTime::<Utc>::UNIX_EPOCH + TimeDelta::seconds(1_704_110_400))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
