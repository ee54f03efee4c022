use chrono::{DateTime, NaiveDate, NaiveTime};
use chrono_tz::Tz;
use serde::Deserialize;
use crate::constants::{sunset, TIMEZONE};
use crate::util::api_request::{self, Method};
use crate::util::error::{Result, WatchError};

/// body of a sunrise-sunset.org response, reduced to what is used
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SunsetResponse {
    pub status: String,
    #[serde(default)]
    pub results: Option<SunsetResults>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SunsetResults {
    pub sunset: String,
}

/// where today's sunset comes from
pub trait SunsetSource {
    async fn fetch(&self) -> Result<SunsetResponse>;
}

/// api.sunrise-sunset.org for the fixed location of the lights.
/// asked once per run, so the client is not kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct SunriseSunsetApi;

impl SunriseSunsetApi {
    /// `formatted=0` makes the api answer with rfc 3339 timestamps
    pub fn url() -> String {
        format!(
            "{}?lat={}&lng={}&date=today&formatted=0",
            sunset::API_URL, sunset::LATITUDE, sunset::LONGITUDE
        )
    }
}

impl SunsetSource for SunriseSunsetApi {
    async fn fetch(&self) -> Result<SunsetResponse> {
        let client = api_request::client()?;
        let json = api_request::send(&client, Method::Get, &Self::url()).await?;
        serde_json::from_value(json)
            .map_err(|err| WatchError::ExternalService(format!("unexpected response: {err}")))
    }
}

/// sunset of `today` from a response.
/// fails if the status is not "OK" or the time can't be read.
pub fn sunset_time(response: &SunsetResponse, today: NaiveDate) -> Result<DateTime<Tz>> {
    if response.status != sunset::STATUS_OK {
        return Err(WatchError::ExternalService(format!("Status not ok: {}", response.status)));
    }

    let Some(results) = &response.results else {
        return Err(WatchError::ExternalService("response has no results".to_string()));
    };

    parse_sunset(&results.sunset, today)
}

/// rfc 3339 timestamps, or a bare time of day which is taken as `today` in `TIMEZONE`
fn parse_sunset(sunset: &str, today: NaiveDate) -> Result<DateTime<Tz>> {
    if let Ok(time) = DateTime::parse_from_rfc3339(sunset) {
        return Ok(time.with_timezone(&TIMEZONE));
    }

    let time_of_day = ["%H:%M:%S", "%I:%M:%S %p", "%H:%M"]
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(sunset.trim(), format).ok())
        .ok_or_else(|| WatchError::ExternalService(format!("could not parse sunset time '{sunset}'")))?;

    today.and_time(time_of_day)
        .and_local_timezone(TIMEZONE)
        .earliest()
        .ok_or_else(|| WatchError::ExternalService(format!("sunset time '{sunset}' does not exist today")))
}
