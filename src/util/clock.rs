use std::time::Duration;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use crate::constants::TIMEZONE;

/// source of "now" and of waiting, so the watch loop can run against a fake clock
pub trait Clock {
    /// current time in `TIMEZONE`
    fn now(&self) -> DateTime<Tz>;

    async fn sleep(&self, duration: Duration);
}

/// wall clock and tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&TIMEZONE)
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
