/// timezone in which "today" is evaluated and all times are displayed.
/// matches the coordinates of the sunset lookup.
pub const TIMEZONE: chrono_tz::Tz = chrono_tz::Europe::Madrid;

/// name of the directory inside the platform config dir
pub const APP_DIR_NAME: &str = "twilight";
/// shared by all watchers, lives next to the config files
pub const LOG_FILE_NAME: &str = "twilight.log";

/// format like "Fri Oct 16 18:30:00 CEST 2026"
pub const DATE_FORMAT: &str = "%a %b %-d %-H:%M:%S %Z %Y";

pub mod config {
    use std::time::Duration;

    pub mod keys {
        pub const HUB_IP: &str = "hub_ip";
        pub const USERNAME: &str = "username";
        pub const GROUP: &str = "group";
        pub const VERBOSE: &str = "verbose";
        pub const OFFSET_MINUTES: &str = "offset_minutes";
        pub const CHECK_DELAY: &str = "check_delay_seconds";
        pub const NIGHT_HOUR: &str = "night_hour";

        /// checked in this order before anything touches the network
        pub const REQUIRED: [&str; 3] = [HUB_IP, USERNAME, GROUP];
    }

    pub const DEFAULT_CHECK_DELAY: Duration = Duration::from_secs(60);
    pub const DEFAULT_OFFSET_MINUTES: i64 = 0;
    pub const DEFAULT_NIGHT_HOUR: u32 = 22;

    /// 24 means midnight at the end of today
    pub const MAX_NIGHT_HOUR: u32 = 24;
    /// an offset of more than a day would point at another day's threshold
    pub const MAX_OFFSET_MINUTES: i64 = 24 * 60;
}

pub mod sunset {
    /// fixed location of the lights
    pub const LATITUDE: f64 = 36.720_16;
    pub const LONGITUDE: f64 = -4.420_34;

    pub const API_URL: &str = "https://api.sunrise-sunset.org/json";
    /// `status` value of a successful response
    pub const STATUS_OK: &str = "OK";
}

pub mod net {
    use std::time::Duration;
    /// upper bound for every http request to the bridge or the sunset api
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
}
