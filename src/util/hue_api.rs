use serde_json::{json, Value};
use crate::util::api_request::{self, Method};
use crate::util::error::{Result, WatchError};

/// a light group on the bridge, resolved once per run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LightGroup {
    pub id: String,
    pub name: String,
}

/// opens a session with a bridge
pub trait Connector {
    type Controller: LightController;

    async fn connect(&self, host: &str, username: &str) -> Result<Self::Controller>;
}

/// what the watchers need from a connected bridge
pub trait LightController {
    async fn group(&self, id: &str) -> Result<LightGroup>;

    /// no state is cached, every call sends the new power state
    async fn set_power(&self, group: &LightGroup, on: bool) -> Result<()>;
}

/// connects to hue bridges over their local http api
#[derive(Debug, Clone, Default)]
pub struct HueConnector;

impl Connector for HueConnector {
    type Controller = HueBridge;

    async fn connect(&self, host: &str, username: &str) -> Result<HueBridge> {
        let bridge = HueBridge {
            client: api_request::client().map_err(|err| err.into_bridge_error())?,
            base_url: format!("http://{host}/api/{username}"),
            groups: Value::Null,
        };

        // the group listing doubles as credential check
        let groups = api_request::send(&bridge.client, Method::Get, &bridge.groups_url())
            .await
            .map_err(|err| err.into_bridge_error())?;
        check_errors(&groups)?;

        tracing::debug!(host, "connected to bridge");
        Ok(HueBridge { groups, ..bridge })
    }
}

#[derive(Debug, Clone)]
pub struct HueBridge {
    client: reqwest::Client,
    base_url: String,
    /// object of group id to group, fetched on connect
    groups: Value,
}

impl HueBridge {
    fn groups_url(&self) -> String {
        format!("{}/groups", self.base_url)
    }
}

impl LightController for HueBridge {
    async fn group(&self, id: &str) -> Result<LightGroup> {
        let Some(group) = self.groups.get(id) else {
            return Err(WatchError::GroupNotFound(id.to_string()));
        };

        Ok(LightGroup {
            id: id.to_string(),
            name: group["name"].as_str().unwrap_or(id).to_string(),
        })
    }

    /// only logs instead of sending if `hue_debug` is enabled.
    async fn set_power(&self, group: &LightGroup, on: bool) -> Result<()> {
        tracing::info!(group = %group.id, on, "setting group power");

        if cfg!(feature = "hue_debug") {
            return Ok(());
        }

        let url = format!("{}/{}/action", self.groups_url(), group.id);
        let response = api_request::send(&self.client, Method::Put(json!({ "on": on })), &url)
            .await
            .map_err(|err| err.into_bridge_error())?;

        check_errors(&response)
    }
}

/// the bridge answers http 200 and lists failures as `[{"error": {...}}]`.
/// returns the first one.
fn check_errors(response: &Value) -> Result<()> {
    let Some(entries) = response.as_array() else {
        return Ok(());
    };

    let first_error = entries.iter().find_map(|entry| entry.get("error"));
    match first_error {
        Some(error) => Err(WatchError::Remote(
            error["description"].as_str().unwrap_or("unknown error").to_string()
        )),
        None => Ok(()),
    }
}
