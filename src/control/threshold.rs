use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use chrono_tz::Tz;
use crate::constants::{config::{keys, DEFAULT_NIGHT_HOUR, MAX_NIGHT_HOUR}, TIMEZONE};
use crate::util::config::Config;
use crate::util::error::{Result, WatchError};
use crate::util::run_log::Summary;
use crate::util::sunset_api::{self, SunsetSource};

/// computes the point in time after which a watcher fires
pub trait ThresholdProvider {
    /// read and validate variant specific config. called once at the start of every run,
    /// anything added to `summary` ends up in the startup log.
    fn configure(&mut self, _config: &Config, _summary: &mut Summary) -> Result<()> {
        Ok(())
    }

    /// threshold without offset.
    /// called on every loop iteration, must return the same value within a run.
    async fn raw_threshold(&mut self, now: DateTime<Tz>) -> Result<DateTime<Tz>>;

    /// raw threshold, moved by `offset_minutes` if `with_offset`
    async fn threshold(&mut self, now: DateTime<Tz>, offset_minutes: i64, with_offset: bool) -> Result<DateTime<Tz>> {
        let raw = self.raw_threshold(now).await?;
        Ok(if with_offset { apply_offset(raw, offset_minutes) } else { raw })
    }
}

/// `raw` moved by `offset_minutes`, which can be negative
pub fn apply_offset(raw: DateTime<Tz>, offset_minutes: i64) -> DateTime<Tz> {
    raw + Duration::seconds(offset_minutes * 60)
}

/// a fixed full hour on the day the run started.
/// the day is kept for the whole run, so a threshold past midnight is still reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NightHour {
    hour: u32,
    day: Option<NaiveDate>,
}

impl Default for NightHour {
    fn default() -> Self {
        Self { hour: DEFAULT_NIGHT_HOUR, day: None }
    }
}

/// `local` in `TIMEZONE`. a time skipped by a daylight saving change
/// becomes the first instant after the gap.
fn resolve_local(local: NaiveDateTime) -> Option<DateTime<Tz>> {
    // gaps in the zone are one hour long and start at a full hour
    local.and_local_timezone(TIMEZONE).earliest()
        .or_else(|| (local + Duration::hours(1)).and_local_timezone(TIMEZONE).earliest())
}

impl ThresholdProvider for NightHour {
    fn configure(&mut self, config: &Config, summary: &mut Summary) -> Result<()> {
        // i64 so negative values are reported as out of range, not as a type error
        let hour: i64 = config.get_or(keys::NIGHT_HOUR, i64::from(DEFAULT_NIGHT_HOUR))?;

        self.hour = u32::try_from(hour).ok()
            .filter(|hour| *hour <= MAX_NIGHT_HOUR)
            .ok_or_else(|| WatchError::Validation(format!(
                "Hour ({}) must be between 0 and {MAX_NIGHT_HOUR}, {hour} found", keys::NIGHT_HOUR
            )))?;

        self.day = None;
        summary.push("Night Hour", self.hour);
        Ok(())
    }

    /// 24 is midnight at the end of the day
    async fn raw_threshold(&mut self, now: DateTime<Tz>) -> Result<DateTime<Tz>> {
        let day = *self.day.get_or_insert_with(|| now.date_naive());
        let local = day.and_time(NaiveTime::MIN) + Duration::hours(i64::from(self.hour));

        resolve_local(local)
            .ok_or_else(|| WatchError::Validation(format!("{:02}:00 does not exist on {day}", self.hour)))
    }
}

/// today's sunset, fetched once per run
#[derive(Debug, Clone)]
pub struct Sunset<S> {
    source: S,
    cached: Option<DateTime<Tz>>,
}

impl<S: SunsetSource> Sunset<S> {
    pub const fn new(source: S) -> Self {
        Self { source, cached: None }
    }
}

impl<S: SunsetSource> ThresholdProvider for Sunset<S> {
    /// a new run fetches a new sunset
    fn configure(&mut self, _config: &Config, _summary: &mut Summary) -> Result<()> {
        self.cached = None;
        Ok(())
    }

    async fn raw_threshold(&mut self, now: DateTime<Tz>) -> Result<DateTime<Tz>> {
        if let Some(sunset) = self.cached {
            return Ok(sunset);
        }

        let response = self.source.fetch().await?;
        let sunset = sunset_api::sunset_time(&response, now.date_naive())?;
        tracing::debug!(%sunset, "fetched sunset");

        self.cached = Some(sunset);
        Ok(sunset)
    }
}
