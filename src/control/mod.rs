pub mod threshold;
pub mod variant;

use std::path::{Path, PathBuf};
use crate::util::clock::{Clock, SystemClock};
use crate::util::config::{Config, WatcherConfig};
use crate::util::error::Result;
use crate::util::hue_api::{Connector, HueConnector, LightController, LightGroup};
use crate::util::run_log::{date_string, Logger, RunLog, Summary};
use crate::util::sunset_api::SunriseSunsetApi;
use threshold::{NightHour, Sunset, ThresholdProvider};
use variant::Variant;

/// how a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// threshold passed and the trigger was sent
    Triggered,
    /// an error ended the run, it has been logged
    Failed,
}

/// everything resolved during init, held until the run ends
struct Session<L> {
    config: WatcherConfig,
    lights: L,
    group: LightGroup,
}

/// blocks until the threshold of its variant has passed, then fires the variant's trigger once.
/// waiting is fine here as there is nothing else for the process to do.
pub struct Watcher<P, C, K> {
    variant: Variant,
    config_path: PathBuf,
    provider: P,
    connector: C,
    clock: K,
    log: Logger,
    /// power state forced before waiting, `None` leaves the lights alone
    initial_power: Option<bool>,
}

impl<P: ThresholdProvider, C: Connector, K: Clock> Watcher<P, C, K> {
    pub fn new(variant: Variant, config_path: PathBuf, provider: P, connector: C, clock: K, sink: RunLog) -> Self {
        Self {
            variant,
            config_path,
            provider,
            connector,
            clock,
            log: Logger::new(variant.name(), sink),
            initial_power: Some(false),
        }
    }

    pub fn with_initial_power(mut self, initial_power: Option<bool>) -> Self {
        self.initial_power = initial_power;
        self
    }

    /// never fails, errors end the run and are logged
    pub async fn run(&mut self) -> Outcome {
        match self.watch().await {
            Ok(()) => Outcome::Triggered,
            Err(err) => {
                tracing::error!(watcher = self.variant.name(), "{err}");
                self.log.append(&format!("Error: {err}"), true);
                Outcome::Failed
            }
        }
    }

    async fn watch(&mut self) -> Result<()> {
        let (session, mut summary) = self.init().await?;
        self.init_lights(&session).await?;

        summary.extend(self.timing(&session.config).await?);
        self.log.flush(&mut summary);

        while self.waiting(&session.config).await? {
            let threshold = self.provider.threshold(self.clock.now(), session.config.offset_minutes, true).await?;
            self.log.log(&format!(
                "Waiting for {} at '{}' time now is '{}'",
                self.variant.name(), date_string(&threshold), date_string(&self.clock.now())
            ));
            self.clock.sleep(session.config.check_delay).await;
        }

        let mut summary = self.timing(&session.config).await?;
        self.log.flush(&mut summary);

        self.variant.trigger().fire(&session.lights, &session.group, &self.log).await
    }

    /// load config, connect to the bridge and resolve the group.
    /// config is fully validated before the bridge is contacted.
    async fn init(&mut self) -> Result<(Session<C::Controller>, Summary)> {
        let started = self.clock.now();
        let config = Config::load(&self.config_path)?;
        let watcher_config = WatcherConfig::from_config(&config)?;
        self.log.set_verbose(watcher_config.verbose);

        let mut variant_summary = Summary::new();
        self.provider.configure(&config, &mut variant_summary)?;

        let lights = self.connector.connect(&watcher_config.hub_ip, &watcher_config.username).await?;
        let group = lights.group(&watcher_config.group).await?;

        let name = self.variant.name();
        let mut summary = Summary::new();
        summary.push(format!("{name} watcher started at"), date_string(&started));
        summary.push("Config", config.path().display());
        summary.push("Hub", &watcher_config.hub_ip);
        summary.push("Group", format!("{} ({})", group.name, group.id));
        if watcher_config.offset_minutes != 0 {
            summary.push(format!("{name} Offset"), format!("{} minutes", watcher_config.offset_minutes));
        }
        summary.push("Verbosity", if watcher_config.verbose { "high" } else { "low" });
        summary.push("Loop Delay", format!("{} seconds", watcher_config.check_delay.as_secs()));
        summary.extend(variant_summary);

        Ok((Session { config: watcher_config, lights, group }, summary))
    }

    /// known state before waiting, regardless of what the lights were doing
    async fn init_lights(&self, session: &Session<C::Controller>) -> Result<()> {
        match self.initial_power {
            Some(on) => session.lights.set_power(&session.group, on).await,
            None => Ok(()),
        }
    }

    /// true while the threshold with offset is still ahead
    async fn waiting(&mut self, config: &WatcherConfig) -> Result<bool> {
        let now = self.clock.now();
        let threshold = self.provider.threshold(now, config.offset_minutes, true).await?;
        Ok(now < threshold)
    }

    /// real and offset threshold next to the current time.
    /// the real threshold is only ever displayed, the loop waits for the offset one.
    async fn timing(&mut self, config: &WatcherConfig) -> Result<Summary> {
        let name = self.variant.name();
        let now = self.clock.now();
        let real = self.provider.threshold(now, config.offset_minutes, false).await?;
        let offset = self.provider.threshold(now, config.offset_minutes, true).await?;

        let mut summary = Summary::new();
        summary.push(format!("Real {name}"), date_string(&real));
        summary.push(format!("Offset {name}"), format!("{} minutes", config.offset_minutes));
        summary.push(format!("Offset {name} time"), date_string(&offset));
        summary.push("Current time", date_string(&now));
        summary.push("Loop", if now < offset { "starting" } else { "finishing" });
        Ok(summary)
    }
}

/// watcher of `variant` talking to real services
pub async fn run_variant(variant: Variant, config_dir: &Path, sink: RunLog) -> Outcome {
    let config_path = config_dir.join(variant.config_file_name());
    tracing::info!(watcher = variant.name(), config = %config_path.display(), "starting watcher");

    match variant {
        Variant::Twilight => {
            let provider = Sunset::new(SunriseSunsetApi);
            Watcher::new(variant, config_path, provider, HueConnector, SystemClock, sink).run().await
        }
        Variant::Night => {
            Watcher::new(variant, config_path, NightHour::default(), HueConnector, SystemClock, sink).run().await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use chrono::{DateTime, TimeZone};
    use chrono_tz::Tz;
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use crate::constants::TIMEZONE;
    use crate::util::clock::manual::ManualClock;
    use crate::util::hue_api::recording::{Call, RecordingBridge};
    use crate::util::sunset_api::fake::FakeSunsetSource;

    fn at(hour: u32, minute: u32, second: u32) -> DateTime<Tz> {
        TIMEZONE.with_ymd_and_hms(2026, 10, 16, hour, minute, second).unwrap()
    }

    /// config file and log inside a temporary directory
    struct Setup {
        dir: TempDir,
        sink: RunLog,
    }

    impl Setup {
        fn new(variant: Variant, config: &Value) -> Self {
            let dir = tempfile::tempdir().unwrap();
            std::fs::write(dir.path().join(variant.config_file_name()), config.to_string()).unwrap();
            let sink = RunLog::new(dir.path().join("twilight.log"));
            Self { dir, sink }
        }

        fn config_path(&self, variant: Variant) -> PathBuf {
            self.dir.path().join(variant.config_file_name())
        }

        fn log(&self) -> String {
            std::fs::read_to_string(self.sink.path()).unwrap_or_default()
        }
    }

    fn night_config() -> Value {
        json!({
            "hub_ip": "10.0.0.2", "username": "abc", "group": "1",
            "night_hour": 22, "offset_minutes": 0, "check_delay_seconds": 60
        })
    }

    fn night_watcher(setup: &Setup, bridge: &RecordingBridge, clock: &ManualClock) -> Watcher<NightHour, RecordingBridge, ManualClock> {
        Watcher::new(
            Variant::Night, setup.config_path(Variant::Night), NightHour::default(),
            bridge.clone(), clock.clone(), setup.sink.clone()
        )
    }

    fn twilight_watcher(setup: &Setup, source: &FakeSunsetSource, bridge: &RecordingBridge, clock: &ManualClock)
        -> Watcher<Sunset<FakeSunsetSource>, RecordingBridge, ManualClock>
    {
        Watcher::new(
            Variant::Twilight, setup.config_path(Variant::Twilight), Sunset::new(source.clone()),
            bridge.clone(), clock.clone(), setup.sink.clone()
        )
    }

    #[tokio::test]
    async fn night_turns_lights_off_at_night_hour() {
        let setup = Setup::new(Variant::Night, &night_config());
        let bridge = RecordingBridge::default();
        let clock = ManualClock::at(at(21, 59, 0));

        let outcome = night_watcher(&setup, &bridge, &clock).run().await;

        assert_eq!(outcome, Outcome::Triggered);
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(60)]);
        assert!(clock.now() >= at(22, 0, 0));
        // initial off, then the trigger
        assert_eq!(bridge.power_calls(), vec![false, false]);
        assert_eq!(bridge.calls()[0], Call::Connect { host: "10.0.0.2".to_string(), username: "abc".to_string() });

        let log = setup.log();
        assert!(log.contains("Night: Lights OFF\nNight: Exiting\n"), "{log}");
        assert!(log.contains("Night: Waiting for Night at 'Fri Oct 16 22:00:00 CEST 2026'"), "{log}");
    }

    #[tokio::test]
    async fn night_hour_at_end_of_day_is_reached() {
        let mut config = night_config();
        config["night_hour"] = json!(24);
        let setup = Setup::new(Variant::Night, &config);
        let bridge = RecordingBridge::default();
        let clock = ManualClock::at(at(23, 59, 0));

        let outcome = night_watcher(&setup, &bridge, &clock).run().await;

        assert_eq!(outcome, Outcome::Triggered);
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(60)]);
        assert_eq!(clock.now(), TIMEZONE.with_ymd_and_hms(2026, 10, 17, 0, 0, 0).unwrap());
        assert_eq!(bridge.power_calls(), vec![false, false]);
    }

    #[tokio::test]
    async fn night_offset_past_midnight_is_reached() {
        let mut config = night_config();
        config["night_hour"] = json!(23);
        config["offset_minutes"] = json!(90);
        let setup = Setup::new(Variant::Night, &config);
        let bridge = RecordingBridge::default();
        let clock = ManualClock::at(at(23, 0, 0));

        let outcome = night_watcher(&setup, &bridge, &clock).run().await;

        assert_eq!(outcome, Outcome::Triggered);
        assert_eq!(clock.sleeps().len(), 90);
        assert_eq!(clock.now(), TIMEZONE.with_ymd_and_hms(2026, 10, 17, 0, 30, 0).unwrap());
    }

    #[tokio::test]
    async fn twilight_waits_for_offset_sunset() {
        let mut config = night_config();
        config["offset_minutes"] = json!(15);
        let setup = Setup::new(Variant::Twilight, &config);
        let source = FakeSunsetSource::new("OK", "18:30:00");
        let bridge = RecordingBridge::default();
        let clock = ManualClock::at(at(18, 0, 0));

        let outcome = twilight_watcher(&setup, &source, &bridge, &clock).run().await;

        assert_eq!(outcome, Outcome::Triggered);
        // 18:00 to 18:45 in minutes, not stopping at the real sunset
        assert_eq!(clock.sleeps().len(), 45);
        assert_eq!(clock.now(), at(18, 45, 0));
        assert_eq!(bridge.power_calls(), vec![false, true]);
        assert_eq!(source.requests(), 1);

        let log = setup.log();
        assert!(log.contains("Real Twilight:") && log.contains("Fri Oct 16 18:30:00 CEST 2026"), "{log}");
        assert!(log.contains("Twilight: Offset Twilight time:") && log.contains("Fri Oct 16 18:45:00 CEST 2026"), "{log}");
        assert!(log.contains("Twilight Offset:"), "{log}");
        assert!(log.contains("Twilight: Lights ON\nTwilight: Exiting\n"), "{log}");
    }

    #[tokio::test]
    async fn passed_threshold_skips_loop() {
        let setup = Setup::new(Variant::Night, &night_config());
        let bridge = RecordingBridge::default();
        let clock = ManualClock::at(at(23, 10, 0));

        let outcome = night_watcher(&setup, &bridge, &clock).run().await;

        assert_eq!(outcome, Outcome::Triggered);
        assert!(clock.sleeps().is_empty());
        assert_eq!(bridge.power_calls(), vec![false, false]);
        assert!(!setup.log().contains("Waiting for"));
        assert!(setup.log().contains("finishing"));
    }

    #[tokio::test]
    async fn threshold_is_reached_exactly() {
        let setup = Setup::new(Variant::Night, &night_config());
        let bridge = RecordingBridge::default();
        let clock = ManualClock::at(at(21, 58, 0));

        night_watcher(&setup, &bridge, &clock).run().await;

        // 21:58 -> 21:59 -> 22:00, no sleep once now == threshold
        assert_eq!(clock.sleeps().len(), 2);
        assert_eq!(clock.now(), at(22, 0, 0));
    }

    #[tokio::test]
    async fn missing_key_fails_before_bridge() {
        for key in ["hub_ip", "username", "group"] {
            let mut config = night_config();
            config.as_object_mut().unwrap().remove(key);
            let setup = Setup::new(Variant::Night, &config);
            let bridge = RecordingBridge::default();
            let clock = ManualClock::at(at(12, 0, 0));

            let outcome = night_watcher(&setup, &bridge, &clock).run().await;

            assert_eq!(outcome, Outcome::Failed);
            assert!(bridge.calls().is_empty(), "{key}: {:?}", bridge.calls());
            assert_eq!(setup.log(), format!("Night: Error: config node {key} is required\n"));
        }
    }

    #[tokio::test]
    async fn missing_config_file_fails() {
        let setup = Setup::new(Variant::Night, &night_config());
        let bridge = RecordingBridge::default();
        let clock = ManualClock::at(at(12, 0, 0));

        let mut watcher = Watcher::new(
            Variant::Twilight, setup.config_path(Variant::Twilight), NightHour::default(),
            bridge.clone(), clock.clone(), setup.sink.clone()
        );

        assert_eq!(watcher.run().await, Outcome::Failed);
        assert!(bridge.calls().is_empty());
        assert!(setup.log().starts_with("Twilight: Error: config file"), "{}", setup.log());
        assert!(setup.log().contains("not found"));
    }

    #[tokio::test]
    async fn night_hour_out_of_range_fails_before_loop() {
        let mut config = night_config();
        config["night_hour"] = json!(25);
        let setup = Setup::new(Variant::Night, &config);
        let bridge = RecordingBridge::default();
        let clock = ManualClock::at(at(12, 0, 0));

        let outcome = night_watcher(&setup, &bridge, &clock).run().await;

        assert_eq!(outcome, Outcome::Failed);
        assert!(bridge.calls().is_empty());
        assert!(clock.sleeps().is_empty());
        assert!(setup.log().contains("Hour (night_hour) must be between 0 and 24, 25 found"));
    }

    #[tokio::test]
    async fn sunset_status_not_ok_ends_run() {
        let setup = Setup::new(Variant::Twilight, &night_config());
        let source = FakeSunsetSource::new("INVALID_REQUEST", "");
        let bridge = RecordingBridge::default();
        let clock = ManualClock::at(at(12, 0, 0));

        let outcome = twilight_watcher(&setup, &source, &bridge, &clock).run().await;

        assert_eq!(outcome, Outcome::Failed);
        assert_eq!(source.requests(), 1);
        // lights were reset before the sunset was needed, never turned on
        assert_eq!(bridge.power_calls(), vec![false]);
        assert!(setup.log().contains("Twilight: Error: sunset service: Status not ok"));
    }

    #[tokio::test]
    async fn refused_connection_ends_run() {
        let setup = Setup::new(Variant::Night, &night_config());
        let bridge = RecordingBridge::refusing();
        let clock = ManualClock::at(at(12, 0, 0));

        let outcome = night_watcher(&setup, &bridge, &clock).run().await;

        assert_eq!(outcome, Outcome::Failed);
        assert!(bridge.power_calls().is_empty());
        assert!(setup.log().contains("Night: Error: could not connect to bridge: connection refused"));
    }

    #[tokio::test]
    async fn unknown_group_ends_run() {
        let setup = Setup::new(Variant::Night, &night_config());
        let bridge = RecordingBridge::knowing("2");
        let clock = ManualClock::at(at(12, 0, 0));

        let outcome = night_watcher(&setup, &bridge, &clock).run().await;

        assert_eq!(outcome, Outcome::Failed);
        assert!(bridge.power_calls().is_empty());
        assert!(setup.log().contains("light group 1 not found on bridge"));
    }

    #[tokio::test]
    async fn initial_power_can_be_skipped() {
        let setup = Setup::new(Variant::Night, &night_config());
        let bridge = RecordingBridge::default();
        let clock = ManualClock::at(at(23, 0, 0));

        let outcome = night_watcher(&setup, &bridge, &clock).with_initial_power(None).run().await;

        assert_eq!(outcome, Outcome::Triggered);
        assert_eq!(bridge.power_calls(), vec![false]);
    }

    #[tokio::test]
    async fn startup_summary_is_aligned() {
        let setup = Setup::new(Variant::Night, &night_config());
        let bridge = RecordingBridge::default();
        let clock = ManualClock::at(at(21, 0, 0));

        night_watcher(&setup, &bridge, &clock).run().await;

        let log = setup.log();
        let block = log.lines().take_while(|line| !line.contains("Waiting for")).collect::<Vec<_>>();
        assert!(block[0].starts_with("Night: Night watcher started at:"), "{log}");
        assert!(block.iter().any(|line| line.starts_with("Night: Night Hour:") && line.ends_with(" 22")));
        assert!(block.iter().any(|line| line.starts_with("Night: Group:") && line.ends_with("Group 1 (1)")));
        assert!(block.iter().any(|line| line.starts_with("Night: Loop:") && line.ends_with("starting")));
        // no offset configured
        assert!(!block.iter().any(|line| line.starts_with("Night: Night Offset:")));

        // values of the block start in one column
        let columns = block.iter()
            .map(|line| {
                let entry = line.strip_prefix("Night: ").unwrap();
                let colon = entry.find(": ").unwrap();
                colon + 2 + entry[colon + 2..].find(|c: char| c != ' ').unwrap()
            })
            .collect::<Vec<_>>();
        assert!(columns.windows(2).all(|pair| pair[0] == pair[1]), "{log}");
    }

    #[tokio::test]
    async fn second_run_fetches_sunset_again() {
        let setup = Setup::new(Variant::Twilight, &night_config());
        let source = FakeSunsetSource::new("OK", "18:30:00");
        let bridge = RecordingBridge::default();
        let clock = ManualClock::at(at(19, 0, 0));

        let mut watcher = twilight_watcher(&setup, &source, &bridge, &clock);
        assert_eq!(watcher.run().await, Outcome::Triggered);
        assert_eq!(watcher.run().await, Outcome::Triggered);
        assert_eq!(source.requests(), 2);
    }
}
